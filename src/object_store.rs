use crate::{error::Result, object_id::ObjectId};

pub mod directory;
pub mod in_memory;

/// A key-value store of raw (uncompressed) object records keyed by the
/// hash of those same bytes. Records are never mutated or removed.
pub trait ObjectStore {
    fn has(&self, id: &ObjectId) -> Result<bool>;

    /// Fails with [`crate::Error::NotFound`] if no record is stored under `id`.
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// Stores `record` under `id`. Putting the same pair twice is a no-op.
    fn put(&mut self, id: &ObjectId, record: &[u8]) -> Result<()>;

    /// Hashes `record` and stores it under the resulting id.
    fn insert(&mut self, record: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash(record);
        self.put(&id, record)?;
        Ok(id)
    }
}
