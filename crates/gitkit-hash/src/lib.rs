//! SHA-1 object identity, hex codec, and fan-out table for gitkit.
//!
//! This crate provides the `ObjectId` type, streaming hash computation, hex
//! encoding/decoding, and specialized OID collections shared by every other
//! gitkit crate.

mod error;
pub mod hex;
mod oid;
pub mod hasher;
pub mod collections;
pub mod fanout;

pub use error::HashError;
pub use hasher::Hasher;
pub use oid::{ObjectId, SHA1_HEX_LEN, SHA1_LEN};
