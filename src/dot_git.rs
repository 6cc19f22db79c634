use std::{
    fs::{create_dir_all, read_dir, read_to_string, write, File},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    database::Database,
    directory::Ignores,
    error::Result,
    object_store::directory::DirectoryObjectStore,
};

/// The symbolic reference a fresh repository starts on.
pub const INITIAL_HEAD: &str = "ref: refs/heads/main\n";

/// A wrapper for the path of the .git directory which has a number of utilities defined on it.
#[derive(Debug, Clone)]
pub struct DotGit {
    root: PathBuf,
}

impl DotGit {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory skeleton, `HEAD` and the ignores file.
    /// Anything that already exists is left alone.
    pub fn init(root: PathBuf) -> Result<Self> {
        for dir in [root.join("objects"), root.join("refs")] {
            log::info!("creating {:?}", dir);
            create_dir_all(&dir)?;
        }

        let head = root.join("HEAD");
        if !head.try_exists()? {
            write(&head, INITIAL_HEAD)?;
        }

        let ignores_path = root.join("ignores");
        if !ignores_path.try_exists()? {
            let mut ignores = Ignores::default();
            if let Some(name) = root.file_name() {
                ignores.insert(name);
            }
            serde_json::to_writer_pretty(File::create(&ignores_path)?, &ignores)?;
        }

        Ok(DotGit { root })
    }

    pub fn existing(root: PathBuf) -> Result<Self> {
        read_dir(&root)?;
        Ok(DotGit { root })
    }

    pub fn head(&self) -> Result<String> {
        Ok(read_to_string(self.root.join("HEAD"))?)
    }

    pub fn store(&self) -> DirectoryObjectStore {
        DirectoryObjectStore::new(self.root.join("objects"))
    }

    pub fn database(&self) -> Database<DirectoryObjectStore> {
        Database::new(self.store())
    }

    /// The ignores written by [`DotGit::init`], or the defaults if there are none.
    pub fn ignores(&self) -> Result<Ignores> {
        match File::open(self.root.join("ignores")) {
            Ok(file) => Ok(serde_json::from_reader(file)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Ignores::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[test]
fn test_init_layout() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path().join(".git");
    let dot_git = DotGit::init(root.clone()).unwrap();
    assert!(root.join("objects").is_dir());
    assert!(root.join("refs").is_dir());
    assert_eq!(dot_git.head().unwrap(), INITIAL_HEAD);
    assert_eq!(dot_git.ignores().unwrap(), Ignores::default());
    assert_eq!(dot_git.store().root(), root.join("objects"));

    // idempotent
    DotGit::init(root.clone()).unwrap();
    assert_eq!(DotGit::existing(root).unwrap().head().unwrap(), INITIAL_HEAD);
}

#[test]
fn test_custom_dir_is_ignored() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_git = DotGit::init(tempdir.path().join(".odb")).unwrap();
    let ignores = dot_git.ignores().unwrap();
    assert!(ignores.contains(&".odb".into()));
    assert!(ignores.contains(&".git".into()));
}

#[test]
fn test_missing_ignores_file_uses_default() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_git = DotGit::existing(tempdir.path().to_path_buf()).unwrap();
    assert_eq!(dot_git.ignores().unwrap(), Ignores::default());
    assert!(DotGit::existing(tempdir.path().join("missing")).is_err());
}

#[test]
fn test_write_tree_through_dot_git() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(tempdir.path().join("hello.txt"), b"hi\n").unwrap();
    let dot_git = DotGit::init(tempdir.path().join(".git")).unwrap();
    let mut db = dot_git.database();
    let id = db
        .create_tree(tempdir.path(), &dot_git.ignores().unwrap())
        .unwrap();
    assert_eq!(id.to_string(), "7a2871192d49caaff5451df37b27afc373d8298b");
}
