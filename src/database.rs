use std::path::Path;

use crate::{
    commit::Commit,
    directory::{build_tree, store_blob, Ignores},
    error::{Error, Result},
    object::{decode_record, encode_record, ObjectKind},
    object_id::ObjectId,
    object_store::ObjectStore,
    tree::{Tree, TreeEntry},
};

/// Creates and reads typed objects on top of an [`ObjectStore`].
///
/// Lookups take the hash as text and validate it before the store is
/// consulted.
#[derive(Debug)]
pub struct Database<S> {
    store: S,
}

impl<S: ObjectStore> Database<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Stores the file at `path` as a blob.
    pub fn create_blob(&mut self, path: &Path) -> Result<ObjectId> {
        store_blob(path, &mut self.store)
    }

    /// Stores the directory at `dir`, and everything below it, as trees and blobs.
    pub fn create_tree(&mut self, dir: &Path, ignores: &Ignores) -> Result<ObjectId> {
        let (id, _) = build_tree(dir, ignores, &mut self.store)?;
        Ok(id)
    }

    pub fn create_commit(&mut self, commit: &Commit) -> Result<ObjectId> {
        self.store
            .insert(&encode_record(ObjectKind::Commit, &commit.encode()))
    }

    /// Fetches a record and returns its kind and content.
    pub fn read_object(&self, hash: &str) -> Result<(ObjectKind, Vec<u8>)> {
        let id: ObjectId = hash.parse()?;
        let record = self.store.get(&id)?;
        let (kind, content) = decode_record(&record)?;
        Ok((kind, content.to_vec()))
    }

    /// Like [`Database::read_object`], but fails with
    /// [`Error::TypeMismatch`] unless the object is of the `expected` kind.
    pub fn read_object_as(&self, hash: &str, expected: ObjectKind) -> Result<Vec<u8>> {
        let (found, content) = self.read_object(hash)?;
        if found != expected {
            return Err(Error::TypeMismatch { expected, found });
        }
        Ok(content)
    }

    pub fn list_tree_entries(&self, hash: &str) -> Result<Vec<TreeEntry>> {
        let content = self.read_object_as(hash, ObjectKind::Tree)?;
        Ok(Tree::decode(&content)?.entries)
    }

    pub fn read_commit(&self, hash: &str) -> Result<Commit> {
        let content = self.read_object_as(hash, ObjectKind::Commit)?;
        Commit::parse(&content)
    }
}

/// The id a file would get as a blob, without storing it.
pub fn hash_blob(path: &Path) -> Result<ObjectId> {
    let content = std::fs::read(path)?;
    Ok(ObjectId::hash(&encode_record(ObjectKind::Blob, &content)))
}

#[cfg(test)]
use crate::{
    commit::Person,
    object_store::{directory::DirectoryObjectStore, in_memory::InMemoryObjectStore},
    tree::EntryMode,
};

#[test]
fn test_blob_tree_commit() {
    let tempdir = tempfile::tempdir().unwrap();
    let work = tempdir.path().join("work");
    std::fs::create_dir_all(work.join("sub")).unwrap();
    std::fs::write(work.join("a.txt"), b"alpha\n").unwrap();
    std::fs::write(work.join("sub/b.txt"), b"beta\n").unwrap();

    let mut db = Database::new(DirectoryObjectStore::new(tempdir.path().join("objects")));
    let blob = db.create_blob(&work.join("a.txt")).unwrap();
    assert_eq!(blob, hash_blob(&work.join("a.txt")).unwrap());
    assert_eq!(
        db.read_object(&blob.to_string()).unwrap(),
        (ObjectKind::Blob, b"alpha\n".to_vec())
    );

    let tree = db.create_tree(&work, &Ignores::default()).unwrap();
    let entries = db.list_tree_entries(&tree.to_string()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], TreeEntry::new(EntryMode::REGULAR, "a.txt", blob));
    assert_eq!(entries[1].mode, EntryMode::DIRECTORY);
    assert_eq!(entries[1].name, "sub");
    let sub = db.list_tree_entries(&entries[1].id.to_string()).unwrap();
    assert_eq!(sub[0].name, "b.txt");

    let person = Person::now("Ada", "ada@example.com");
    let root = Commit {
        tree,
        parents: vec![],
        author: person.clone(),
        committer: person.clone(),
        message: String::from("root"),
    };
    let root_id = db.create_commit(&root).unwrap();
    let child = Commit {
        parents: vec![root_id],
        message: String::from("child"),
        ..root.clone()
    };
    let child_id = db.create_commit(&child).unwrap();
    assert_ne!(root_id, child_id);
    assert_eq!(db.read_commit(&child_id.to_string()).unwrap(), child);
    assert_eq!(db.read_commit(&root_id.to_string()).unwrap(), root);
}

#[test]
fn test_type_mismatch() {
    let mut db = Database::new(InMemoryObjectStore::new());
    let id = db
        .store
        .insert(&encode_record(ObjectKind::Blob, b"not a tree"))
        .unwrap();
    let err = db.list_tree_entries(&id.to_string()).unwrap_err();
    assert!(
        matches!(
            err,
            Error::TypeMismatch {
                expected: ObjectKind::Tree,
                found: ObjectKind::Blob
            }
        ),
        "{:?}",
        err
    );
}

#[test]
fn test_malformed_hash_never_reaches_store() {
    // a store rooted somewhere that does not exist
    let db = Database::new(DirectoryObjectStore::new(
        Path::new("/nonexistent/odb/objects").to_path_buf(),
    ));
    let err = db.read_object("not-a-hash").unwrap_err();
    assert!(err.is_validation(), "{:?}", err);
    let err = db
        .read_object("0123456789012345678901234567890123456789")
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{:?}", err);
}

#[test]
fn test_length_mismatch_on_read() {
    let mut db = Database::new(InMemoryObjectStore::new());
    let id = db.store.insert(b"blob 5\0abcd").unwrap();
    assert!(matches!(
        db.read_object(&id.to_string()).unwrap_err(),
        Error::LengthMismatch {
            declared: 5,
            actual: 4
        }
    ));
}
