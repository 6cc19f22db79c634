use std::{
    fs::{create_dir_all, read, File, Permissions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    compression::{compress, decompress},
    error::{Error, Result},
    object_id::ObjectId,
};

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in a directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the zlib-compressed record in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    /// Opens a store rooted at `root`. Nothing is touched on disk until
    /// the first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &ObjectId) -> PathBuf {
        self.root.join(id.relative_path())
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn has(&self, id: &ObjectId) -> Result<bool> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        Ok(self.path_of(id).try_exists()?)
    }

    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.path_of(id);
        log::info!("reading {} from {:?}", id, path);
        let compressed = match read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(Error::NotFound(*id)),
            Err(err) => return Err(err.into()),
        };
        decompress(&compressed).map_err(|err| match err {
            Error::CorruptRecord(reason) => Error::CorruptRecord(format!("{}: {}", id, reason)),
            other => other,
        })
    }

    fn put(&mut self, id: &ObjectId, record: &[u8]) -> Result<()> {
        let path = self.path_of(id);
        if path.try_exists()? {
            log::debug!("{:?} already exists", path);
            return Ok(());
        }
        let subdir_path = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.root.clone(),
        };
        // create_dir_all treats a directory that already exists as success,
        // including one created concurrently by another writer.
        log::debug!("ensuring subdir path {:?} exists", subdir_path);
        create_dir_all(&subdir_path)?;

        log::info!("inserting {} into {:?}", id, self.root);
        let compressed = compress(record)?;
        let mut staged = NamedTempFile::new_in(&subdir_path)?;
        staged.write_all(&compressed)?;
        staged.as_file().sync_all()?;
        make_read_only(staged.as_file())?;
        staged.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }
}

/// Stored records are read-only, as git keeps its loose objects.
#[cfg(unix)]
fn make_read_only(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(Permissions::from_mode(0o444))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_read_only(file: &File) -> Result<()> {
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(true);
    file.set_permissions(permissions)?;
    Ok(())
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("objects"));
    let id = store.insert(b"blob 12\0hello, world").unwrap();
    assert!(store.has(&id).unwrap());
    assert_eq!(store.get(&id).unwrap(), b"blob 12\0hello, world".to_vec());

    let (subdir, filename) = id.fanout();
    let on_disk = tempdir.path().join("objects").join(subdir).join(filename);
    assert!(on_disk.is_file());
    // stored compressed, not verbatim
    assert_ne!(std::fs::read(on_disk).unwrap(), b"blob 12\0hello, world".to_vec());
}

#[test]
fn test_put_is_idempotent() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().to_path_buf());
    let record = b"blob 2\0hi";
    let id = ObjectId::hash(record);
    store.put(&id, record).unwrap();
    let first = std::fs::read(store.path_of(&id)).unwrap();
    store.put(&id, record).unwrap();
    assert_eq!(std::fs::read(store.path_of(&id)).unwrap(), first);
    assert_eq!(store.get(&id).unwrap(), record.to_vec());

    let subdir = store.path_of(&id).parent().unwrap().to_path_buf();
    assert_eq!(std::fs::read_dir(subdir).unwrap().count(), 1);
}

#[test]
fn test_large_record_round_trip() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().to_path_buf());
    let content: Vec<u8> = b"fn main() { println!(\"hello\"); }\n"
        .iter()
        .copied()
        .cycle()
        .take(34_000)
        .collect();
    let record = crate::object::encode_record(crate::object::ObjectKind::Blob, &content);
    let id = store.insert(&record).unwrap();
    assert_eq!(store.get(&id).unwrap(), record);
}

#[cfg(unix)]
#[test]
fn test_records_are_read_only() {
    use std::os::unix::fs::PermissionsExt;

    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().to_path_buf());
    let id = store.insert(b"blob 2\0hi").unwrap();
    let mode = std::fs::metadata(store.path_of(&id))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o444);
    // a second put leaves the read-only record alone
    store.insert(b"blob 2\0hi").unwrap();
    assert_eq!(store.get(&id).unwrap(), b"blob 2\0hi".to_vec());
}

#[test]
fn test_missing_object() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = DirectoryObjectStore::new(tempdir.path().to_path_buf());
    let id = ObjectId::hash(b"blob 0\0");
    assert!(!store.has(&id).unwrap());
    assert!(matches!(store.get(&id).unwrap_err(), Error::NotFound(missing) if missing == id));
}

#[test]
fn test_corrupt_object() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = DirectoryObjectStore::new(tempdir.path().to_path_buf());
    let id = ObjectId::hash(b"blob 0\0");
    let path = store.path_of(&id);
    create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"hand edited").unwrap();
    assert!(matches!(store.get(&id).unwrap_err(), Error::CorruptRecord(_)));
}
