use crate::{
    error::{Error, Result},
    hex::Hex,
};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use std::{fmt::Display, path::PathBuf, str::FromStr};

/// Number of raw bytes in an [`ObjectId`].
pub const ID_LEN: usize = 20;
/// Number of characters in the hexadecimal form of an [`ObjectId`].
pub const HEX_LEN: usize = ID_LEN * 2;

/// An identifier for a particular object record.
/// Under the hood, this is a SHA-1 digest of the full record, header included.
///
/// It is displayed in lowercase hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    /// Hashes the exact bytes given.
    pub fn hash(record: &[u8]) -> Self {
        let digest = Sha1::digest(record);
        let mut raw = [0u8; ID_LEN];
        raw.copy_from_slice(&digest);
        ObjectId(raw)
    }

    /// Reads an id from its raw 20-byte form, as found inside tree content.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ID_LEN] = bytes.try_into().map_err(|_| Error::InvalidObjectId {
            input: Hex::from(bytes).to_string(),
            reason: format!("expected {} raw bytes, got {}", ID_LEN, bytes.len()),
        })?;
        Ok(ObjectId(raw))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Splits the hex form into the two-character fan-out directory and
    /// the remaining 38-character file name.
    pub fn fanout(&self) -> (String, String) {
        let mut s = self.to_string();
        let filename = s.split_off(2);
        (s, filename)
    }

    /// The path of this object's record relative to the store root.
    pub fn relative_path(&self) -> PathBuf {
        let (subdir, filename) = self.fanout();
        PathBuf::from(subdir).join(filename)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b: &[u8] = &self.0;
        write!(f, "{}", Hex::from(b))
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidObjectId {
            input: s.to_string(),
            reason,
        };
        if s.len() != HEX_LEN {
            return Err(invalid(format!(
                "expected {} hex characters, got {}",
                HEX_LEN,
                s.len()
            )));
        }
        let hex = Hex::parse(s).map_err(|err| invalid(err.to_string()))?;
        ObjectId::from_raw(&hex.to_bytes())
    }
}

impl From<&[u8]> for ObjectId {
    fn from(record: &[u8]) -> Self {
        ObjectId::hash(record)
    }
}

impl From<&Vec<u8>> for ObjectId {
    fn from(record: &Vec<u8>) -> Self {
        ObjectId::hash(record)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let b: &[u8] = &self.0;
        Hex::from(b).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_known_digest() {
    // git hash-object of an empty file
    let id = ObjectId::hash(b"blob 0\0");
    assert_eq!(id.to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
}

#[test]
fn test_hash_deterministic_and_distinct() {
    let a = ObjectId::hash(b"blob 5\0hello");
    assert_eq!(a, ObjectId::hash(b"blob 5\0hello"));
    assert_ne!(a, ObjectId::hash(b"blob 5\0hellp"));
    assert_eq!(a.to_string().len(), HEX_LEN);
}

#[test]
fn test_fanout() {
    let id: ObjectId = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391".parse().unwrap();
    let (subdir, filename) = id.fanout();
    assert_eq!(subdir, "e6");
    assert_eq!(filename, "9de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    assert_eq!(
        id.relative_path(),
        PathBuf::from("e6/9de29bb2d1d6434b8b29ae775ad8c2e48c5391")
    );
}

#[test]
fn test_from_str_rejects_malformed() {
    for bad in [
        "not-a-hash",
        "",
        "e69de29bb2d1d6434b8b29ae775ad8c2e48c539",
        "../../../../../../../../../../etc/passwd",
        "g69de29bb2d1d6434b8b29ae775ad8c2e48c5391",
    ] {
        let err = bad.parse::<ObjectId>().unwrap_err();
        assert!(err.is_validation(), "{:?} gave {:?}", bad, err);
    }
}

#[test]
fn test_from_raw_length() {
    assert!(ObjectId::from_raw(&[0u8; 19]).is_err());
    let id = ObjectId::from_raw(&[0xab; 20]).unwrap();
    assert_eq!(id.to_string(), "ab".repeat(20));
}

#[test]
fn test_serde_as_hex() {
    let id = ObjectId::hash(b"blob 0\0");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\"");
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
