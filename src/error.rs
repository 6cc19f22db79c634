use derive_more::{Display, From};

use crate::object::ObjectKind;
use crate::object_id::ObjectId;

/// Everything that can go wrong while encoding, storing or reading objects.
#[derive(Debug, Display, From)]
pub enum Error {
    #[display(fmt = "invalid object id {:?}: {}", input, reason)]
    InvalidObjectId { input: String, reason: String },
    #[display(fmt = "malformed object header: {}", _0)]
    MalformedHeader(String),
    #[display(fmt = "unknown object kind {:?}", _0)]
    UnknownKind(String),
    #[display(fmt = "malformed tree entry: {}", _0)]
    MalformedEntry(String),
    #[display(fmt = "malformed commit: {}", _0)]
    MalformedCommit(String),
    #[display(fmt = "invalid path {:?}: {}", path, reason)]
    InvalidPath { path: String, reason: String },
    #[display(fmt = "object {} not found", _0)]
    NotFound(ObjectId),
    #[display(fmt = "corrupt record: {}", _0)]
    CorruptRecord(String),
    #[display(fmt = "content length mismatch: header declares {} bytes, found {}", declared, actual)]
    LengthMismatch { declared: usize, actual: usize },
    #[display(fmt = "truncated tree entry: need 20 hash bytes, {} remain", remaining)]
    TruncatedEntry { remaining: usize },
    #[display(fmt = "missing null delimiter")]
    MissingDelimiter,
    #[display(fmt = "expected a {} object, found a {}", expected, found)]
    TypeMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },
    #[from]
    #[display(fmt = "I/O error: {}", _0)]
    Io(std::io::Error),
    #[from]
    #[display(fmt = "serialization error: {}", _0)]
    Serde(serde_json::Error),
}

impl Error {
    /// Whether this error says the input was malformed, as opposed to
    /// missing, corrupt on disk, or an I/O failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidObjectId { .. }
                | Error::MalformedHeader(_)
                | Error::UnknownKind(_)
                | Error::MalformedEntry(_)
                | Error::MalformedCommit(_)
                | Error::InvalidPath { .. }
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_validation_family() {
    assert!(Error::UnknownKind(String::from("widget")).is_validation());
    assert!(Error::MalformedHeader(String::from("blob")).is_validation());
    assert!(!Error::MissingDelimiter.is_validation());
    assert!(!Error::LengthMismatch {
        declared: 5,
        actual: 4
    }
    .is_validation());
}

#[test]
fn test_display() {
    let err = Error::LengthMismatch {
        declared: 5,
        actual: 4,
    };
    assert_eq!(
        err.to_string(),
        "content length mismatch: header declares 5 bytes, found 4"
    );
}
