//! # Object Database
//!
//! A content-addressable store of blobs, trees and commits laid out the way
//! git lays out its loose objects: each record is `"<kind> <len>\0<content>"`,
//! named by the SHA-1 of those bytes, zlib-compressed and kept under a
//! two-character fan-out directory.

mod hex;

/// Zlib envelope around stored records.
pub mod compression;
/// Snapshots with lineage and authorship.
pub mod commit;
/// Typed creation and lookup of objects.
pub mod database;
/// Recursive conversion of a directory into trees and blobs.
pub mod directory;
/// The repository metadata directory.
pub mod dot_git;
pub mod error;
/// Object kinds and the record codec.
pub mod object;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`ObjectId`](object_id::ObjectId).
pub mod object_store;
/// Directory listings.
pub mod tree;

pub use error::{Error, Result};
