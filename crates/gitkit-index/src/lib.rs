//! DIRC index (staging area) decoder.
//!
//! Parses `.git/index` into an [`IndexSnapshot`]: entries in on-disk order,
//! a by-path lookup, and the set of paths that appear more than once. A
//! duplicate path means unresolved merge state; parsing never rejects it,
//! it surfaces the path in `conflicted_paths` instead (§4.6).
//!
//! Non-goals: writing the index, gitattributes/gitignore/pathspec
//! matching, clean/smudge filters, sparse checkout, and the cache-tree/
//! resolve-undo/untracked-cache extensions — nothing in this system reads
//! or writes an index file beyond decoding the entry list.

pub mod entry;
mod read;

use std::collections::HashMap;
use std::path::Path;

use bstr::BString;

pub use entry::IndexEntry;
pub use error::IndexError;

mod error {
    use std::path::PathBuf;

    #[derive(Debug, thiserror::Error)]
    pub enum IndexError {
        #[error("invalid index header: {0}")]
        InvalidHeader(String),

        #[error("unsupported index version: {0}")]
        UnsupportedVersion(u32),

        #[error("index has unresolved merge conflicts")]
        IndexConflict,

        #[error("truncated entry at index {0}")]
        TruncatedEntry(usize),

        #[error("invalid index entry at offset {offset}: {reason}")]
        InvalidEntry { offset: usize, reason: String },

        #[error("index file not found: {0}")]
        FileNotFound(PathBuf),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// A decoded `.git/index`.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    /// Entries in on-disk order (may contain duplicate paths during a merge).
    pub entries: Vec<IndexEntry>,
    /// Unique by-path lookup. When a path is conflicted, holds the last
    /// occurrence in on-disk order.
    pub entries_by_path: HashMap<BString, IndexEntry>,
    /// Paths appearing two or more times in `entries`, sorted.
    pub conflicted_paths: Vec<BString>,
    /// 2 or 3 (version 4's prefix-compressed paths are not supported).
    pub version: u32,
}

impl IndexSnapshot {
    /// Read and decode the index file at `path`.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IndexError::FileNotFound(path.to_path_buf())
            } else {
                IndexError::Io(e)
            }
        })?;
        let data = unsafe { memmap2::Mmap::map(&file) }?;
        read::parse_snapshot(&data)
    }

    /// Decode an index from raw bytes (no filesystem access).
    pub fn parse(data: &[u8]) -> Result<Self, IndexError> {
        read::parse_snapshot(data)
    }

    /// True if any path in this snapshot has unresolved merge state.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicted_paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
