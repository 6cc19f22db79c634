use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    object_id::ObjectId,
};

use super::ObjectStore;

/// An [`ObjectStore`] that keeps uncompressed records in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn has(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.objects.contains_key(id))
    }

    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.objects.get(id).cloned().ok_or(Error::NotFound(*id))
    }

    fn put(&mut self, id: &ObjectId, record: &[u8]) -> Result<()> {
        self.objects
            .entry(*id)
            .or_insert_with(|| Vec::from(record));
        Ok(())
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let id = store.insert(b"hello, world").unwrap();
    let b: &[u8] = b"hello, world";
    assert_eq!(id, ObjectId::from(b));
    assert!(store.has(&id).unwrap());
    assert_eq!(store.get(&id).unwrap(), Vec::from(b));
    store.insert(b).unwrap();
    assert_eq!(store.len(), 1);
}
