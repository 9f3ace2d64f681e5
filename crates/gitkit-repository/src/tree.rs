//! Tree walking (§4.15/§9): `walk_tree` takes a visitor returning a
//! continue/stop signal, and `get_tree_paths` is `walk_tree` collected into
//! a path→blob map. Grounded on `gitkit_object::tree::Tree::iter` for
//! per-level iteration; the recursive descent and visitor-stop plumbing are
//! new to this crate.

use std::collections::BTreeMap;

use bstr::ByteSlice;
use gitkit_hash::ObjectId;
use gitkit_object::{Object, Tree};
use gitkit_odb::ObjectDatabase;

use crate::RepoError;

/// A single entry visited during a tree walk, with `path` already joined
/// to its full repo-relative form.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: String,
    pub oid: ObjectId,
    pub is_tree: bool,
}

/// Returned by the visitor to control descent (§9: visitor returns
/// continue/stop rather than the walker polling a cancellation flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Stop,
}

/// Recursively walks every entry reachable from `tree_hash`, depth-first,
/// invoking `visitor` for each. Stops as soon as the visitor returns
/// [`WalkControl::Stop`].
pub fn walk_tree(
    odb: &ObjectDatabase,
    tree_hash: &ObjectId,
    mut visitor: impl FnMut(&WalkEntry) -> WalkControl,
) -> Result<(), RepoError> {
    walk_tree_inner(odb, tree_hash, "", &mut visitor)
}

fn walk_tree_inner(
    odb: &ObjectDatabase,
    tree_hash: &ObjectId,
    prefix: &str,
    visitor: &mut impl FnMut(&WalkEntry) -> WalkControl,
) -> Result<(), RepoError> {
    let tree = load_tree(odb, tree_hash)?;

    for entry in tree.iter() {
        let name = entry.name.to_str_lossy();
        let path = if prefix.is_empty() {
            name.into_owned()
        } else {
            format!("{prefix}/{name}")
        };

        let walk_entry = WalkEntry {
            path: path.clone(),
            oid: entry.oid,
            is_tree: entry.mode.is_tree(),
        };

        match visitor(&walk_entry) {
            WalkControl::Stop => return Ok(()),
            WalkControl::Continue => {}
        }

        if entry.mode.is_tree() {
            walk_tree_inner(odb, &entry.oid, &path, visitor)?;
        }
    }

    Ok(())
}

fn load_tree(odb: &ObjectDatabase, hash: &ObjectId) -> Result<Tree, RepoError> {
    match odb.read_cached(hash)? {
        Some(Object::Tree(tree)) => Ok(tree),
        Some(_) => Err(RepoError::InvalidObjectType),
        None => Err(RepoError::ObjectNotFound(*hash)),
    }
}

/// `walk_tree` collected into a flat path→blob-hash map, skipping
/// directories themselves (§6.4's `get_tree_paths`).
pub fn get_tree_paths(odb: &ObjectDatabase, tree_hash: &ObjectId) -> Result<BTreeMap<String, ObjectId>, RepoError> {
    let mut paths = BTreeMap::new();
    walk_tree(odb, tree_hash, |entry| {
        if !entry.is_tree {
            paths.insert(entry.path.clone(), entry.oid);
        }
        WalkControl::Continue
    })?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitkit_object::tree::{FileMode, TreeEntry};
    use std::io::Write as _;

    fn write_object(objects_dir: &std::path::Path, obj_type: &str, content: &[u8]) -> ObjectId {
        let oid = gitkit_hash::Hasher::hash_object(obj_type, content).unwrap();
        let path = objects_dir.join(oid.loose_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder =
            flate2::write::ZlibEncoder::new(std::fs::File::create(&path).unwrap(), flate2::Compression::default());
        encoder.write_all(format!("{obj_type} {}\0", content.len()).as_bytes()).unwrap();
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        oid
    }

    #[test]
    fn get_tree_paths_flattens_nested_trees() {
        let dir = tempfile::tempdir().unwrap();
        let objects_dir = dir.path().join("objects");
        let odb = ObjectDatabase::open(&objects_dir).unwrap();

        let blob_oid = write_object(&objects_dir, "blob", b"hello\n");

        let mut inner = Tree::new();
        inner.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "b.txt".into(),
            oid: blob_oid,
        });
        let inner_bytes = inner.serialize_content();
        let inner_oid = write_object(&objects_dir, "tree", &inner_bytes);

        let mut root = Tree::new();
        root.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "a.txt".into(),
            oid: blob_oid,
        });
        root.entries.push(TreeEntry {
            mode: FileMode::Tree,
            name: "sub".into(),
            oid: inner_oid,
        });
        let root_bytes = root.serialize_content();
        let root_oid = write_object(&objects_dir, "tree", &root_bytes);

        let paths = get_tree_paths(&odb, &root_oid).unwrap();
        assert_eq!(paths.get("a.txt"), Some(&blob_oid));
        assert_eq!(paths.get("sub/b.txt"), Some(&blob_oid));
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn walk_tree_stops_when_visitor_requests() {
        let dir = tempfile::tempdir().unwrap();
        let objects_dir = dir.path().join("objects");
        let odb = ObjectDatabase::open(&objects_dir).unwrap();

        let blob_oid = write_object(&objects_dir, "blob", b"hello\n");
        let mut root = Tree::new();
        root.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "a.txt".into(),
            oid: blob_oid,
        });
        root.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "b.txt".into(),
            oid: blob_oid,
        });
        let root_bytes = root.serialize_content();
        let root_oid = write_object(&objects_dir, "tree", &root_bytes);

        let mut seen = 0;
        walk_tree(&odb, &root_oid, |_entry| {
            seen += 1;
            WalkControl::Stop
        })
        .unwrap();
        assert_eq!(seen, 1);
    }
}
