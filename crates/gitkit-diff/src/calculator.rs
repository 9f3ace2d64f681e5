//! Commit-vs-parent path diffing: compares two path→hash maps, no object
//! database access and no hunk generation.

use std::collections::{BTreeMap, HashMap, HashSet};

use gitkit_hash::ObjectId;

/// How a path changed between a parent tree and the current tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    /// The path this file was known as in the parent tree.
    Renamed { from: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub change: ChangeType,
}

/// Diff a current tree against an optional parent tree.
///
/// Rename detection only matches on exact content (same hash under a
/// different path); there is no similarity scoring.
pub fn diff_trees(
    current: &BTreeMap<String, ObjectId>,
    parent: Option<&BTreeMap<String, ObjectId>>,
) -> Vec<ChangedFile> {
    let Some(parent) = parent else {
        return current
            .keys()
            .map(|path| ChangedFile {
                path: path.clone(),
                change: ChangeType::Added,
            })
            .collect();
    };

    let mut changed = Vec::new();
    let mut added_or_renamed: Vec<&String> = Vec::new();

    for (path, hash) in current {
        match parent.get(path) {
            Some(parent_hash) if parent_hash == hash => {}
            Some(_) => changed.push(ChangedFile {
                path: path.clone(),
                change: ChangeType::Modified,
            }),
            None => added_or_renamed.push(path),
        }
    }

    let deleted_candidates: Vec<&String> = parent
        .keys()
        .filter(|path| !current.contains_key(path.as_str()))
        .collect();

    let mut hash_to_deleted_path: HashMap<&ObjectId, &String> = HashMap::new();
    for path in &deleted_candidates {
        hash_to_deleted_path.entry(&parent[path.as_str()]).or_insert(path);
    }

    let mut consumed: HashSet<&String> = HashSet::new();
    for path in added_or_renamed {
        let hash = &current[path];
        if let Some(&old_path) = hash_to_deleted_path.get(hash) {
            if !consumed.contains(old_path) {
                changed.push(ChangedFile {
                    path: path.clone(),
                    change: ChangeType::Renamed {
                        from: old_path.clone(),
                    },
                });
                consumed.insert(old_path);
                continue;
            }
        }
        changed.push(ChangedFile {
            path: path.clone(),
            change: ChangeType::Added,
        });
    }

    for path in deleted_candidates {
        if !consumed.contains(path) {
            changed.push(ChangedFile {
                path: path.clone(),
                change: ChangeType::Deleted,
            });
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(b: u8) -> ObjectId {
        ObjectId::from_bytes(&[b; 20]).unwrap()
    }

    #[test]
    fn no_parent_everything_added() {
        let mut current = BTreeMap::new();
        current.insert("a.txt".to_string(), oid(1));
        let changed = diff_trees(&current, None);
        assert_eq!(changed, vec![ChangedFile {
            path: "a.txt".to_string(),
            change: ChangeType::Added,
        }]);
    }

    #[test]
    fn unchanged_path_is_skipped() {
        let mut current = BTreeMap::new();
        current.insert("a.txt".to_string(), oid(1));
        let mut parent = BTreeMap::new();
        parent.insert("a.txt".to_string(), oid(1));
        assert!(diff_trees(&current, Some(&parent)).is_empty());
    }

    #[test]
    fn same_path_different_hash_is_modified() {
        let mut current = BTreeMap::new();
        current.insert("a.txt".to_string(), oid(2));
        let mut parent = BTreeMap::new();
        parent.insert("a.txt".to_string(), oid(1));
        let changed = diff_trees(&current, Some(&parent));
        assert_eq!(changed, vec![ChangedFile {
            path: "a.txt".to_string(),
            change: ChangeType::Modified,
        }]);
    }

    #[test]
    fn moved_file_is_renamed_not_added_and_deleted() {
        let mut current = BTreeMap::new();
        current.insert("new/a.txt".to_string(), oid(1));
        let mut parent = BTreeMap::new();
        parent.insert("old/a.txt".to_string(), oid(1));
        let changed = diff_trees(&current, Some(&parent));
        assert_eq!(changed.len(), 1);
        assert_eq!(
            changed[0],
            ChangedFile {
                path: "new/a.txt".to_string(),
                change: ChangeType::Renamed {
                    from: "old/a.txt".to_string(),
                },
            }
        );
    }

    #[test]
    fn path_only_in_parent_is_deleted() {
        let current = BTreeMap::new();
        let mut parent = BTreeMap::new();
        parent.insert("gone.txt".to_string(), oid(1));
        let changed = diff_trees(&current, Some(&parent));
        assert_eq!(changed, vec![ChangedFile {
            path: "gone.txt".to_string(),
            change: ChangeType::Deleted,
        }]);
    }

    #[test]
    fn duplicate_hash_does_not_double_report_rename() {
        // Two paths vanish with the same content; only one new path appears
        // with that content. The second old path must surface as Deleted,
        // not be silently dropped or matched twice.
        let mut current = BTreeMap::new();
        current.insert("new.txt".to_string(), oid(1));
        let mut parent = BTreeMap::new();
        parent.insert("old1.txt".to_string(), oid(1));
        parent.insert("old2.txt".to_string(), oid(1));
        let changed = diff_trees(&current, Some(&parent));
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().any(|c| matches!(&c.change, ChangeType::Renamed { from } if from == "old1.txt" || from == "old2.txt")));
        assert!(changed.iter().any(|c| c.change == ChangeType::Deleted));
    }
}
