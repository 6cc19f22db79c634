use std::{borrow::Cow, cmp::Ordering};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    object::{read_null_delimited, ObjectKind},
    object_id::{ObjectId, ID_LEN},
};

/// The mode recorded for a tree entry, kept exactly as it was written so
/// that decoding and re-encoding a tree never changes its bytes.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryMode(Cow<'static, str>);

impl EntryMode {
    pub const REGULAR: EntryMode = EntryMode(Cow::Borrowed("100644"));
    pub const EXECUTABLE: EntryMode = EntryMode(Cow::Borrowed("100755"));
    pub const SYMLINK: EntryMode = EntryMode(Cow::Borrowed("120000"));
    /// Git writes directories without a leading zero.
    pub const DIRECTORY: EntryMode = EntryMode(Cow::Borrowed("40000"));
    pub const SUBMODULE: EntryMode = EntryMode(Cow::Borrowed("160000"));

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind of object an entry with this mode points at. Anything that
    /// is not a directory or submodule mode is taken to be a blob.
    pub fn object_kind(&self) -> ObjectKind {
        match self.as_str() {
            "40000" | "040000" => ObjectKind::Tree,
            "160000" => ObjectKind::Commit,
            _ => ObjectKind::Blob,
        }
    }
}

impl From<&str> for EntryMode {
    fn from(mode: &str) -> Self {
        EntryMode(Cow::Owned(mode.to_string()))
    }
}

/// One `(mode, name, id)` line of a tree.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode.object_kind() == ObjectKind::Tree
    }

    /// `<mode> <name>\0<20 raw id bytes>`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        out.extend_from_slice(self.id.as_bytes());
    }

    /// Reads one entry off the front of `bytes`, returning it with the rest.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (mode_name, rest) = read_null_delimited(bytes)?;
        let mode_name = std::str::from_utf8(mode_name).map_err(|_| {
            Error::MalformedEntry(format!(
                "non-UTF-8 mode and name {:?}",
                String::from_utf8_lossy(mode_name)
            ))
        })?;

        // Names containing a space cannot be told apart from a third field.
        let fields: Vec<&str> = mode_name.split(' ').collect();
        let [mode, name] = fields[..] else {
            return Err(Error::MalformedEntry(format!(
                "expected \"<mode> <name>\", got {:?}",
                mode_name
            )));
        };

        if rest.len() < ID_LEN {
            return Err(Error::TruncatedEntry {
                remaining: rest.len(),
            });
        }
        let (raw_id, rest) = rest.split_at(ID_LEN);
        let id = ObjectId::from_raw(raw_id)?;

        Ok((TreeEntry::new(mode.into(), name, id), rest))
    }

    /// Git's canonical order: bytes of the name, with directories compared
    /// as though their name ended in `/`.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        fn key(entry: &TreeEntry) -> impl Iterator<Item = u8> + '_ {
            let suffix = entry.is_dir().then_some(b'/');
            entry.name.bytes().chain(suffix)
        }
        key(self).cmp(key(other))
    }
}

/// A single directory level. Subdirectories are referenced by id.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Keeps the entries in the order given.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    /// Sorts entries into git's canonical order.
    pub fn canonicalize(&mut self) {
        self.entries.sort_by(TreeEntry::canonical_cmp);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            entry.encode_into(&mut out);
        }
        out
    }

    pub fn decode(mut content: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        while !content.is_empty() {
            let (entry, rest) = TreeEntry::decode(content)?;
            entries.push(entry);
            content = rest;
        }
        Ok(Tree { entries })
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

#[cfg(test)]
fn sample_ids() -> (ObjectId, ObjectId) {
    (ObjectId::hash(b"blob 3\0hi\n"), ObjectId::hash(b"tree 0\0"))
}

#[test]
fn test_tree_round_trip() {
    let (h1, h2) = sample_ids();
    let tree = Tree::new(vec![
        TreeEntry::new(EntryMode::REGULAR, "a.txt", h1),
        TreeEntry::new(EntryMode::DIRECTORY, "sub", h2),
    ]);
    assert_eq!(Tree::decode(&tree.encode()).unwrap(), tree);
}

#[test]
fn test_decode_keeps_order() {
    let (h1, h2) = sample_ids();
    let tree = Tree::new(vec![
        TreeEntry::new(EntryMode::DIRECTORY, "zeta", h2),
        TreeEntry::new(EntryMode::REGULAR, "alpha", h1),
    ]);
    let names: Vec<String> = Tree::decode(&tree.encode())
        .unwrap()
        .entries
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
}

#[test]
fn test_entry_wire_format() {
    let (h1, _) = sample_ids();
    let mut out = Vec::new();
    TreeEntry::new(EntryMode::DIRECTORY, "sub", h1).encode_into(&mut out);
    assert!(out.starts_with(b"40000 sub\0"));
    assert_eq!(&out[10..], h1.as_bytes());
}

#[test]
fn test_truncated_entry() {
    let mut content = b"100644 a.txt\0".to_vec();
    content.extend_from_slice(&[7u8; 19]);
    let err = Tree::decode(&content).unwrap_err();
    assert!(
        matches!(err, Error::TruncatedEntry { remaining: 19 }),
        "{:?}",
        err
    );
}

#[test]
fn test_entry_missing_delimiter() {
    let err = Tree::decode(b"100644 a.txt").unwrap_err();
    assert!(matches!(err, Error::MissingDelimiter), "{:?}", err);
}

#[test]
fn test_name_with_space_is_unparseable() {
    let (h1, _) = sample_ids();
    let tree = Tree::new(vec![TreeEntry::new(EntryMode::REGULAR, "my file", h1)]);
    let err = Tree::decode(&tree.encode()).unwrap_err();
    assert!(matches!(err, Error::MalformedEntry(_)), "{:?}", err);
    assert!(err.is_validation());
}

#[test]
fn test_any_mode_survives_re_encoding() {
    let mut content = Vec::new();
    for (mode, name) in [("040000", "sub"), ("100664", "old"), ("100644", "new")] {
        content.extend_from_slice(format!("{} {}\0", mode, name).as_bytes());
        content.extend_from_slice(&[0x11u8; 20]);
    }
    let tree = Tree::decode(&content).unwrap();
    assert_eq!(tree.encode(), content);
    assert_eq!(tree.entries[0].mode.as_str(), "040000");
    assert!(tree.entries[0].is_dir());
    assert_eq!(tree.entries[1].mode.as_str(), "100664");
    assert_eq!(tree.entries[1].mode.object_kind(), ObjectKind::Blob);
}

#[test]
fn test_canonical_order() {
    let (h1, h2) = sample_ids();
    let mut tree = Tree::new(vec![
        TreeEntry::new(EntryMode::REGULAR, "foo.txt", h1),
        TreeEntry::new(EntryMode::DIRECTORY, "foo", h2),
        TreeEntry::new(EntryMode::REGULAR, "foo-bar", h1),
        TreeEntry::new(EntryMode::REGULAR, "Bar", h1),
    ]);
    tree.canonicalize();
    let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
    // '-' < '.' < '/'
    assert_eq!(names, vec!["Bar", "foo-bar", "foo.txt", "foo"]);
}

#[test]
fn test_mode_kinds() {
    assert_eq!(EntryMode::DIRECTORY.object_kind(), ObjectKind::Tree);
    assert_eq!(EntryMode::EXECUTABLE.object_kind(), ObjectKind::Blob);
    assert_eq!(EntryMode::SUBMODULE.object_kind(), ObjectKind::Commit);
    assert_eq!(EntryMode::from("040000").object_kind(), ObjectKind::Tree);
    assert_ne!(EntryMode::from("040000"), EntryMode::DIRECTORY);
    assert_eq!(EntryMode::from("100644"), EntryMode::REGULAR);
    assert_eq!(EntryMode::DIRECTORY.to_string(), "40000");
}

#[test]
fn test_entry_json() {
    let (h1, _) = sample_ids();
    let entry = TreeEntry::new(EntryMode::REGULAR, "a.txt", h1);
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["mode"], "100644");
    assert_eq!(json["id"], h1.to_string());
    assert_eq!(serde_json::from_value::<TreeEntry>(json).unwrap(), entry);
}
