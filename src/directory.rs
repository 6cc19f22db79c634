use std::{
    collections::BTreeSet,
    ffi::OsString,
    fs::{read, read_dir, Metadata},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    object::{encode_record, ObjectKind},
    object_id::ObjectId,
    object_store::ObjectStore,
    tree::{EntryMode, Tree, TreeEntry},
};

/// Names of directory entries that are never recorded, at any depth.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Ignores {
    set: BTreeSet<OsString>,
}

impl Default for Ignores {
    fn default() -> Self {
        Self::new([".git"])
    }
}

impl Ignores {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Ignores {
            set: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &OsString) -> bool {
        self.set.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<OsString>) {
        self.set.insert(name.into());
    }
}

/// Stores the file at `path` as a blob and returns its id.
pub fn store_blob<S: ObjectStore>(path: &Path, store: &mut S) -> Result<ObjectId> {
    let content = read(path)?;
    store.insert(&encode_record(ObjectKind::Blob, &content))
}

/// Records the directory at `dir` into `store`, depth first.
///
/// Every blob and subtree is written before the tree that refers to it,
/// so a tree in the store never points at a missing child. On failure the
/// objects written so far stay behind, unreferenced.
pub fn build_tree<S: ObjectStore>(
    dir: &Path,
    ignores: &Ignores,
    store: &mut S,
) -> Result<(ObjectId, Tree)> {
    log::debug!("building tree for {:?}", dir);
    let mut entries = Vec::new();
    for f in read_dir(dir)? {
        let dir_entry = f?;
        let file_name = dir_entry.file_name();
        if ignores.contains(&file_name) {
            log::debug!("ignoring {:?}", dir_entry.path());
            continue;
        }
        let path = dir_entry.path();
        let name = file_name.into_string().map_err(|_| Error::InvalidPath {
            path: path.display().to_string(),
            reason: String::from("file name is not valid UTF-8"),
        })?;

        let file_type = dir_entry.file_type()?;
        if file_type.is_dir() {
            let (id, _) = build_tree(&path, ignores, store)?;
            entries.push(TreeEntry::new(EntryMode::DIRECTORY, name, id));
        } else if file_type.is_file() {
            let mode = file_mode(&dir_entry.metadata()?);
            let id = store_blob(&path, store)?;
            entries.push(TreeEntry::new(mode, name, id));
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(&path)?;
            let target = target.to_str().ok_or_else(|| Error::InvalidPath {
                path: path.display().to_string(),
                reason: String::from("symlink target is not valid UTF-8"),
            })?;
            let id = store.insert(&encode_record(ObjectKind::Blob, target.as_bytes()))?;
            entries.push(TreeEntry::new(EntryMode::SYMLINK, name, id));
        } else {
            log::warn!("skipping {:?}: not a file, directory or symlink", path);
        }
    }

    let mut tree = Tree::new(entries);
    tree.canonicalize();
    let id = store.insert(&encode_record(ObjectKind::Tree, &tree.encode()))?;
    log::info!("stored tree {} for {:?}", id, dir);
    Ok((id, tree))
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 != 0 {
        EntryMode::EXECUTABLE
    } else {
        EntryMode::REGULAR
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> EntryMode {
    EntryMode::REGULAR
}

#[cfg(test)]
use crate::object_store::{directory::DirectoryObjectStore, in_memory::InMemoryObjectStore};

#[test]
fn test_single_file() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(tempdir.path().join("hello.txt"), b"hi\n").unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join(".git").join("objects"));

    let (id, tree) = build_tree(tempdir.path(), &Ignores::default(), &mut store).unwrap();

    let blob_id = ObjectId::hash(b"blob 3\0hi\n");
    assert_eq!(
        tree.entries,
        vec![TreeEntry::new(EntryMode::REGULAR, "hello.txt", blob_id)]
    );
    assert_eq!(store.get(&blob_id).unwrap(), b"blob 3\0hi\n".to_vec());
    assert_eq!(
        store.get(&id).unwrap(),
        encode_record(ObjectKind::Tree, &tree.encode())
    );
    // matches `git write-tree` for the same directory
    assert_eq!(id.to_string(), "7a2871192d49caaff5451df37b27afc373d8298b");

    let (again, _) = build_tree(tempdir.path(), &Ignores::default(), &mut store).unwrap();
    assert_eq!(id, again);
}

#[test]
fn test_nested_directories() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    std::fs::create_dir_all(root.join("src/inner")).unwrap();
    std::fs::create_dir_all(root.join(".git/objects")).unwrap();
    std::fs::write(root.join("b.txt"), b"b").unwrap();
    std::fs::write(root.join("src/a.rs"), b"fn main() {}").unwrap();
    std::fs::write(root.join("src/inner/deep.txt"), b"deep").unwrap();
    std::fs::write(root.join(".git/HEAD"), b"ref: refs/heads/main\n").unwrap();

    let mut store = InMemoryObjectStore::new();
    let (id, tree) = build_tree(root, &Ignores::default(), &mut store).unwrap();

    let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["b.txt", "src"]);

    let src = tree.get("src").unwrap();
    assert!(src.is_dir());
    let record = store.get(&src.id).unwrap();
    let (kind, content) = crate::object::decode_record(&record).unwrap();
    assert_eq!(kind, ObjectKind::Tree);
    let src_tree = Tree::decode(content).unwrap();
    let names: Vec<&str> = src_tree.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.rs", "inner"]);

    // 3 blobs + 3 trees
    assert_eq!(store.len(), 6);
    assert!(store.has(&id).unwrap());
}

#[test]
fn test_empty_directory() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = InMemoryObjectStore::new();
    let (id, tree) = build_tree(tempdir.path(), &Ignores::default(), &mut store).unwrap();
    assert!(tree.entries.is_empty());
    assert_eq!(id.to_string(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
}

#[test]
fn test_missing_directory() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = InMemoryObjectStore::new();
    let err = build_tree(
        &tempdir.path().join("nope"),
        &Ignores::default(),
        &mut store,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(store.is_empty());
}

#[cfg(unix)]
#[test]
fn test_executable_and_symlink() {
    use std::os::unix::fs::PermissionsExt;

    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    std::fs::write(root.join("run.sh"), b"#!/bin/sh\n").unwrap();
    std::fs::set_permissions(root.join("run.sh"), std::fs::Permissions::from_mode(0o755))
        .unwrap();
    std::os::unix::fs::symlink("run.sh", root.join("link")).unwrap();

    let mut store = InMemoryObjectStore::new();
    let (_, tree) = build_tree(root, &Ignores::default(), &mut store).unwrap();

    let link = tree.get("link").unwrap();
    assert_eq!(link.mode, EntryMode::SYMLINK);
    assert_eq!(link.id, ObjectId::hash(b"blob 6\0run.sh"));
    assert_eq!(tree.get("run.sh").unwrap().mode, EntryMode::EXECUTABLE);
}

#[test]
fn test_ignores_json() {
    let mut ignores = Ignores::default();
    ignores.insert("target");
    let json = serde_json::to_string(&ignores).unwrap();
    let back: Ignores = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ignores);
    assert!(back.contains(&OsString::from("target")));
}
