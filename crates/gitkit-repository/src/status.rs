//! Working-tree status engine (§4.12): reconciles the HEAD tree, the index,
//! and the filesystem into a per-path staged/unstaged change model.
//!
//! Grounded on the same stat-shortcut idea the index decoder's own doc
//! comment alludes to (`gitkit-index`'s `IndexEntry` carries the raw stat
//! fields this engine compares against); hashing a changed file reuses
//! `gitkit_hash::Hasher`'s streaming mode rather than `Hasher::hash_object`,
//! since files here can exceed what's comfortable to buffer whole.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use gitkit_hash::{Hasher, ObjectId};
use gitkit_index::IndexSnapshot;

const STAT_SHORTCUT_TOLERANCE_NS: i64 = 1_000_000;
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Identity of a working-tree file, used to key the blob-hash cache
/// (§4.14's `file_hash(identity)` cache key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub dev: u64,
    pub ino: u64,
    pub size: u64,
    pub mtime_ns: i64,
}

/// What kind of change a path underwent, staged or unstaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Untracked,
    Conflicted,
}

/// One path's staged/unstaged change pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub staged: Option<ChangeType>,
    pub unstaged: Option<ChangeType>,
}

/// The full reconciliation result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkingTreeStatus {
    pub files: Vec<FileStatus>,
}

/// Cache abstraction for blob hashes keyed by [`FileIdentity`], so this
/// engine doesn't need to know about the facade's cache type. `Repository`
/// supplies an implementation backed by its own LRU cache; tests can use an
/// always-miss stub.
pub trait FileHashCache {
    fn get(&mut self, identity: &FileIdentity) -> Option<ObjectId>;
    fn put(&mut self, identity: FileIdentity, hash: ObjectId);
}

/// A cache that never hits — every lookup re-hashes. Useful for tests and
/// one-shot callers that don't want to carry a cache around.
#[derive(Default)]
pub struct NoFileHashCache;

impl FileHashCache for NoFileHashCache {
    fn get(&mut self, _identity: &FileIdentity) -> Option<ObjectId> {
        None
    }
    fn put(&mut self, _identity: FileIdentity, _hash: ObjectId) {}
}

/// Compare HEAD tree ↔ index ↔ working tree and synthesize per-path status.
pub fn compute_status(
    head_tree: &BTreeMap<String, ObjectId>,
    index: &IndexSnapshot,
    work_tree: &Path,
    cache: &mut dyn FileHashCache,
) -> std::io::Result<WorkingTreeStatus> {
    let mut by_path: BTreeMap<String, FileStatus> = BTreeMap::new();

    let indexed_paths: HashSet<String> = index
        .entries_by_path
        .keys()
        .map(|p| p.to_string())
        .collect();

    // Staged: HEAD -> index.
    let mut all_paths: HashSet<&str> = indexed_paths.iter().map(String::as_str).collect();
    all_paths.extend(head_tree.keys().map(String::as_str));
    for path in all_paths {
        let in_index = indexed_paths.contains(path);
        let in_head = head_tree.contains_key(path);
        let staged = match (in_index, in_head) {
            (true, false) => Some(ChangeType::Added),
            (true, true) => {
                let index_hash = index.entries_by_path[&bstr::BString::from(path)].sha1;
                if index_hash == head_tree[path] {
                    None
                } else {
                    Some(ChangeType::Modified)
                }
            }
            (false, true) => Some(ChangeType::Deleted),
            (false, false) => None,
        };
        if staged.is_some() {
            entry(&mut by_path, path).staged = staged;
        }
    }

    // Unstaged: index -> working tree, via the stat shortcut / content hash.
    for entry_ref in &index.entries {
        let path_str = entry_ref.path.to_string();
        let full_path = work_tree.join(&path_str);
        let unstaged = match std::fs::symlink_metadata(&full_path) {
            Ok(meta) => {
                let working_hash = resolve_hash(&full_path, &meta, entry_ref, cache)?;
                if working_hash == entry_ref.sha1 {
                    None
                } else {
                    Some(ChangeType::Modified)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(ChangeType::Deleted),
            Err(e) => return Err(e),
        };
        if unstaged.is_some() {
            entry(&mut by_path, &path_str).unstaged = unstaged;
        }
    }

    // Conflicted paths override whatever unstaged state was just computed.
    for path in &index.conflicted_paths {
        entry(&mut by_path, &path.to_string()).unstaged = Some(ChangeType::Conflicted);
    }

    // Untracked scan.
    let indexed_dirs = parent_dirs(&indexed_paths);
    scan_untracked(work_tree, work_tree, &indexed_paths, &indexed_dirs, true, &mut by_path)?;

    Ok(WorkingTreeStatus {
        files: by_path.into_values().collect(),
    })
}

fn entry<'a>(map: &'a mut BTreeMap<String, FileStatus>, path: &str) -> &'a mut FileStatus {
    map.entry(path.to_string()).or_insert_with(|| FileStatus {
        path: path.to_string(),
        staged: None,
        unstaged: None,
    })
}

/// Apply the stat shortcut (size + sub-millisecond mtime match reuses the
/// index's recorded hash) and fall back to the identity-keyed cache, then a
/// streaming hash, on a miss.
fn resolve_hash(
    full_path: &Path,
    meta: &std::fs::Metadata,
    index_entry: &gitkit_index::IndexEntry,
    cache: &mut dyn FileHashCache,
) -> std::io::Result<ObjectId> {
    use std::os::unix::fs::MetadataExt;

    let working_size = meta.len();
    let working_mtime_ns = meta.mtime() * 1_000_000_000 + meta.mtime_nsec();
    let index_mtime_ns =
        i64::from(index_entry.mtime_secs) * 1_000_000_000 + i64::from(index_entry.mtime_nsecs);

    if working_size == u64::from(index_entry.size)
        && (working_mtime_ns - index_mtime_ns).abs() < STAT_SHORTCUT_TOLERANCE_NS
    {
        return Ok(index_entry.sha1);
    }

    let identity = FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
        size: working_size,
        mtime_ns: working_mtime_ns,
    };
    if let Some(hash) = cache.get(&identity) {
        return Ok(hash);
    }
    let hash = hash_file_streaming(full_path, working_size)?;
    cache.put(identity, hash);
    Ok(hash)
}

/// Stream a blob hash in `"blob <size>\0<content>"` form, reading in 64 KiB
/// chunks so status scans don't buffer whole large files.
fn hash_file_streaming(path: &Path, size: u64) -> std::io::Result<ObjectId> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Hasher::new();
    hasher.update(format!("blob {size}\0").as_bytes());
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// All proper-ancestor directories of every indexed path, as `/`-joined
/// strings, e.g. `"a/b/c.txt"` contributes `"a"` and `"a/b"`.
fn parent_dirs(indexed_paths: &HashSet<String>) -> HashSet<String> {
    let mut dirs = HashSet::new();
    for path in indexed_paths {
        let mut components: Vec<&str> = path.split('/').collect();
        components.pop();
        while !components.is_empty() {
            dirs.insert(components.join("/"));
            components.pop();
        }
    }
    dirs
}

/// Recursively walk `dir`, skipping `.git` and any directory that is itself
/// a tracked (indexed) path, recording every file not in `indexed_paths` as
/// untracked.
///
/// `may_contain_tracked` is the `indexed_dirs` short-circuit: once recursion
/// enters a directory with no indexed descendant, every file below it is
/// untracked by construction and the `indexed_paths` lookup can be skipped.
fn scan_untracked(
    root: &Path,
    dir: &Path,
    indexed_paths: &HashSet<String>,
    indexed_dirs: &HashSet<String>,
    may_contain_tracked: bool,
    by_path: &mut BTreeMap<String, FileStatus>,
) -> std::io::Result<()> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();
        if file_name == ".git" {
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if may_contain_tracked && indexed_paths.contains(&rel) {
                continue;
            }
            let sub_may_contain_tracked = may_contain_tracked && indexed_dirs.contains(&rel);
            scan_untracked(root, &path, indexed_paths, indexed_dirs, sub_may_contain_tracked, by_path)?;
        } else if file_type.is_file() || file_type.is_symlink() {
            if may_contain_tracked && indexed_paths.contains(&rel) {
                continue;
            }
            entry_mut(by_path, &rel).unstaged = Some(ChangeType::Untracked);
        }
    }
    Ok(())
}

fn entry_mut<'a>(map: &'a mut BTreeMap<String, FileStatus>, path: &str) -> &'a mut FileStatus {
    map.entry(path.to_string()).or_insert_with(|| FileStatus {
        path: path.to_string(),
        staged: None,
        unstaged: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use gitkit_index::IndexEntry;
    use gitkit_object::FileMode;

    fn oid(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = byte;
        ObjectId::from_bytes(&bytes).unwrap()
    }

    fn index_entry(path: &str, hash: ObjectId, size: u32) -> IndexEntry {
        IndexEntry {
            path: BString::from(path),
            sha1: hash,
            size,
            mtime_secs: 0,
            mtime_nsecs: 0,
            ctime: None,
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            file_mode: FileMode::Regular,
        }
    }

    fn snapshot(entries: Vec<IndexEntry>) -> IndexSnapshot {
        let entries_by_path = entries.iter().map(|e| (e.path.clone(), e.clone())).collect();
        IndexSnapshot {
            entries,
            entries_by_path,
            conflicted_paths: Vec::new(),
            version: 2,
        }
    }

    #[test]
    fn parent_dirs_collects_all_ancestors() {
        let mut paths = HashSet::new();
        paths.insert("a/b/c.txt".to_string());
        let dirs = parent_dirs(&paths);
        assert!(dirs.contains("a"));
        assert!(dirs.contains("a/b"));
        assert!(!dirs.contains("a/b/c.txt"));
    }

    #[test]
    fn added_path_is_index_present_head_absent() {
        let dir = tempfile::tempdir().unwrap();
        let hash = oid(1);
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let index = snapshot(vec![index_entry("a.txt", hash, 1)]);
        let head = BTreeMap::new();
        let mut cache = NoFileHashCache;
        let status = compute_status(&head, &index, dir.path(), &mut cache).unwrap();
        let file = status.files.iter().find(|f| f.path == "a.txt").unwrap();
        assert_eq!(file.staged, Some(ChangeType::Added));
    }

    #[test]
    fn deleted_from_head_when_absent_from_index() {
        let dir = tempfile::tempdir().unwrap();
        let hash = oid(2);
        let mut head = BTreeMap::new();
        head.insert("gone.txt".to_string(), hash);
        let index = snapshot(Vec::new());
        let mut cache = NoFileHashCache;
        let status = compute_status(&head, &index, dir.path(), &mut cache).unwrap();
        let file = status.files.iter().find(|f| f.path == "gone.txt").unwrap();
        assert_eq!(file.staged, Some(ChangeType::Deleted));
    }

    #[test]
    fn untracked_file_is_reported_unstaged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.txt"), b"hi").unwrap();
        let head = BTreeMap::new();
        let index = snapshot(Vec::new());
        let mut cache = NoFileHashCache;
        let status = compute_status(&head, &index, dir.path(), &mut cache).unwrap();
        let file = status.files.iter().find(|f| f.path == "new.txt").unwrap();
        assert_eq!(file.unstaged, Some(ChangeType::Untracked));
    }

    #[test]
    fn conflicted_path_overrides_unstaged() {
        let dir = tempfile::tempdir().unwrap();
        let hash = oid(3);
        std::fs::write(dir.path().join("c.txt"), b"data").unwrap();
        let mut index = snapshot(vec![index_entry("c.txt", hash, 4)]);
        index.conflicted_paths.push(BString::from("c.txt"));
        let head = BTreeMap::new();
        let mut cache = NoFileHashCache;
        let status = compute_status(&head, &index, dir.path(), &mut cache).unwrap();
        let file = status.files.iter().find(|f| f.path == "c.txt").unwrap();
        assert_eq!(file.unstaged, Some(ChangeType::Conflicted));
    }
}
