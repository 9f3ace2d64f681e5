//! Object cache (§4.14): a single LRU keyed by a tagged `CacheKey`, bounded
//! by both entry count and an estimated byte size, shared by every read
//! path the facade exposes.
//!
//! Grounded on `gitkit_object::cache::ObjectCache`'s use of the `lru` crate,
//! generalized from "objects only" to the full key space §4.14 names,
//! since the facade caches ref lists, tree-path maps, and file hashes
//! alongside parsed objects, not just objects themselves.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use gitkit_hash::ObjectId;
use gitkit_index::IndexSnapshot;
use gitkit_object::{Commit, Tree};
use gitkit_ref::Ref;
use lru::LruCache;

use crate::status::FileIdentity;

/// Blobs at or above this size are never cached (§4.14).
pub const UNCACHEABLE_BLOB_SIZE: usize = 100 * 1024;

/// Where an object was found: loose storage or a pack. Mirrors §9's
/// tagged-variant guidance for `ObjectLocation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation {
    Loose,
    Packed,
}

/// Tagged cache key, one variant per cacheable read in §4.14's list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Commit(ObjectId),
    Tree(ObjectId),
    Blob(ObjectId),
    TreePaths(ObjectId),
    ObjectLocation(ObjectId),
    Refs,
    Head,
    IndexSnapshot(String),
    FileHash(FileIdentity),
}

/// A cached value, matching [`CacheKey`] one variant at a time.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Commit(Arc<Commit>),
    Tree(Arc<Tree>),
    Blob(Arc<Vec<u8>>),
    TreePaths(Arc<BTreeMap<String, ObjectId>>),
    ObjectLocation(ObjectLocation),
    Refs(Arc<Vec<Ref>>),
    Head(Option<ObjectId>),
    IndexSnapshot(Arc<IndexSnapshot>),
    FileHash(ObjectId),
}

/// Cache size bounds (§4.14's two knobs).
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: 5000,
            max_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Hit/miss/eviction counters and current size, reported for testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size_bytes: usize,
}

/// A fixed estimate used for structured records whose exact size isn't
/// worth walking field-by-field (§4.14: "structured records by a fixed
/// estimator").
const STRUCTURED_ESTIMATE: usize = 256;

pub struct Cache {
    entries: LruCache<CacheKey, (CacheValue, usize)>,
    max_bytes: usize,
    current_bytes: usize,
    stats: CacheStats,
}

impl Cache {
    pub fn new(options: CacheOptions) -> Self {
        let cap = NonZeroUsize::new(options.max_entries).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: LruCache::new(cap),
            max_bytes: options.max_bytes,
            current_bytes: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a key, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheValue> {
        match self.entries.get(key) {
            Some((value, _)) => {
                self.stats.hits += 1;
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a value, evicting least-recently-used entries to stay within
    /// both the entry-count cap (enforced by the underlying LRU) and the
    /// byte-size cap (enforced here). Blobs at or above
    /// [`UNCACHEABLE_BLOB_SIZE`] are silently not stored.
    pub fn insert(&mut self, key: CacheKey, value: CacheValue) {
        if let CacheValue::Blob(bytes) = &value {
            if bytes.len() >= UNCACHEABLE_BLOB_SIZE {
                return;
            }
        }

        let size = estimate_size(&value);
        if let Some((_, (_, old_size))) = self.entries.push(key, (value, size)) {
            self.current_bytes = self.current_bytes.saturating_sub(old_size);
            self.stats.evictions += 1;
        }
        self.current_bytes += size;

        while self.current_bytes > self.max_bytes {
            match self.entries.pop_lru() {
                Some((_, (_, evicted_size))) => {
                    self.current_bytes = self.current_bytes.saturating_sub(evicted_size);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
        self.stats.size_bytes = self.current_bytes;
    }

    /// Drop a single key, e.g. after a mutation invalidates it directly
    /// (old index-entry blob SHAs, `refs` on branch/stash ops, `head` on
    /// checkout — §4.13).
    pub fn invalidate(&mut self, key: &CacheKey) {
        if let Some((_, size)) = self.entries.pop(key) {
            self.current_bytes = self.current_bytes.saturating_sub(size);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
        self.stats.size_bytes = 0;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn estimate_size(value: &CacheValue) -> usize {
    match value {
        CacheValue::Blob(bytes) => bytes.len(),
        CacheValue::TreePaths(paths) => {
            paths.keys().map(|p| p.len() + 20).sum::<usize>() + STRUCTURED_ESTIMATE
        }
        CacheValue::Refs(refs) => {
            refs.iter().map(|r| r.name.len() + 20).sum::<usize>() + STRUCTURED_ESTIMATE
        }
        CacheValue::IndexSnapshot(snapshot) => {
            snapshot.entries.iter().map(|e| e.path.len() + 96).sum::<usize>() + STRUCTURED_ESTIMATE
        }
        CacheValue::Commit(_) | CacheValue::Tree(_) | CacheValue::ObjectLocation(_) | CacheValue::Head(_) | CacheValue::FileHash(_) => {
            STRUCTURED_ESTIMATE
        }
    }
}
