use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    commit::Commit,
    error::{Error, Result},
    object_id::ObjectId,
    tree::Tree,
};

/// The three kinds of record the store knows how to hold.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[display(fmt = "blob")]
    Blob,
    #[display(fmt = "tree")]
    Tree,
    #[display(fmt = "commit")]
    Commit,
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// `"<kind> <length>\0"`
pub fn encode_header(kind: ObjectKind, content_len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, content_len).into_bytes()
}

/// Header followed by content. An object's id is the hash of exactly these
/// bytes, never of the content alone.
pub fn encode_record(kind: ObjectKind, content: &[u8]) -> Vec<u8> {
    let mut record = encode_header(kind, content.len());
    record.extend_from_slice(content);
    record
}

/// Splits a raw record into its kind and content, checking the header.
pub fn decode_record(raw: &[u8]) -> Result<(ObjectKind, &[u8])> {
    let (header, content) = read_null_delimited(raw)?;
    let header = std::str::from_utf8(header)
        .map_err(|_| Error::MalformedHeader(String::from_utf8_lossy(header).into_owned()))?;

    let fields: Vec<&str> = header.split(' ').collect();
    let [kind, declared] = fields[..] else {
        return Err(Error::MalformedHeader(header.to_string()));
    };
    if declared.is_empty() || !declared.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedHeader(header.to_string()));
    }
    let declared: usize = declared
        .parse()
        .map_err(|_| Error::MalformedHeader(header.to_string()))?;
    let kind: ObjectKind = kind.parse()?;

    if declared != content.len() {
        return Err(Error::LengthMismatch {
            declared,
            actual: content.len(),
        });
    }
    Ok((kind, content))
}

/// Returns the bytes before the first zero byte and the bytes after it,
/// neither including the zero itself.
pub fn read_null_delimited(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let at = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::MissingDelimiter)?;
    Ok((&bytes[..at], &bytes[at + 1..]))
}

/// Raw file contents.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Blob {
    pub content: Vec<u8>,
}

/// An in-memory object of any kind.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
        }
    }

    /// The kind-specific payload, without header.
    pub fn content(&self) -> Vec<u8> {
        match self {
            Object::Blob(blob) => blob.content.clone(),
            Object::Tree(tree) => tree.encode(),
            Object::Commit(commit) => commit.encode(),
        }
    }

    pub fn to_record(&self) -> Vec<u8> {
        encode_record(self.kind(), &self.content())
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::hash(&self.to_record())
    }

    /// Decodes a raw record, dispatching on the kind named in its header.
    pub fn from_record(raw: &[u8]) -> Result<Self> {
        let (kind, content) = decode_record(raw)?;
        Object::from_content(kind, content)
    }

    pub fn from_content(kind: ObjectKind, content: &[u8]) -> Result<Self> {
        Ok(match kind {
            ObjectKind::Blob => Object::Blob(Blob {
                content: content.to_vec(),
            }),
            ObjectKind::Tree => Object::Tree(Tree::decode(content)?),
            ObjectKind::Commit => Object::Commit(Commit::parse(content)?),
        })
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Object::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Object::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Object::Commit(commit)
    }
}

#[test]
fn test_encode_header() {
    assert_eq!(encode_header(ObjectKind::Blob, 3), b"blob 3\0");
    assert_eq!(encode_header(ObjectKind::Commit, 0), b"commit 0\0");
}

#[test]
fn test_record_round_trip() {
    let contents: [&[u8]; 3] = [b"", b"hi\n", b"with\0nulls\0inside"];
    for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
        for content in contents {
            let record = encode_record(kind, content);
            assert_eq!(decode_record(&record).unwrap(), (kind, content));
        }
    }
}

#[test]
fn test_id_covers_header() {
    let blob = Object::Blob(Blob {
        content: b"hi\n".to_vec(),
    });
    assert_eq!(blob.id(), ObjectId::hash(b"blob 3\0hi\n"));
    assert_ne!(blob.id(), ObjectId::hash(b"hi\n"));
    assert_eq!(
        blob.id().to_string(),
        "45b983be36b73c0788dc9cbcb76cbb80fc7bb057"
    );
}

#[test]
fn test_length_mismatch() {
    let err = decode_record(b"blob 5\0abcd").unwrap_err();
    assert!(
        matches!(
            err,
            Error::LengthMismatch {
                declared: 5,
                actual: 4
            }
        ),
        "{:?}",
        err
    );
    let err = decode_record(b"blob 3\0abcd").unwrap_err();
    assert!(matches!(err, Error::LengthMismatch { .. }), "{:?}", err);
}

#[test]
fn test_unknown_kind() {
    let err = decode_record(b"widget 3\0abc").unwrap_err();
    assert!(matches!(err, Error::UnknownKind(ref k) if k == "widget"));
    assert!(err.is_validation());
}

#[test]
fn test_malformed_headers() {
    for raw in [
        &b"blob\0"[..],
        b"blob 3 3\0abc",
        b"blob -3\0abc",
        b"blob +3\0abc",
        b"blob three\0abc",
        b"blob \0",
        b"\xff\xfe 3\0abc",
    ] {
        let err = decode_record(raw).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)), "{:?}", err);
    }
}

#[test]
fn test_missing_delimiter() {
    assert!(matches!(
        decode_record(b"blob 3abc").unwrap_err(),
        Error::MissingDelimiter
    ));
    assert!(matches!(
        read_null_delimited(b"").unwrap_err(),
        Error::MissingDelimiter
    ));
}

#[test]
fn test_read_null_delimited() {
    assert_eq!(
        read_null_delimited(b"100644 a.txt\0rest").unwrap(),
        (&b"100644 a.txt"[..], &b"rest"[..])
    );
    assert_eq!(read_null_delimited(b"\0").unwrap(), (&b""[..], &b""[..]));
}

#[test]
fn test_object_from_record_dispatch() {
    let record = encode_record(ObjectKind::Blob, b"abc");
    assert_eq!(
        Object::from_record(&record).unwrap(),
        Object::Blob(Blob {
            content: b"abc".to_vec()
        })
    );
    let record = encode_record(ObjectKind::Tree, b"");
    assert_eq!(
        Object::from_record(&record).unwrap(),
        Object::Tree(Tree::default())
    );
}
