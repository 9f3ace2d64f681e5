//! Ref reader: loose refs, `packed-refs` with tag peeling, HEAD resolution,
//! and the stash reflog (§4.7).
//!
//! Non-goals: writing or updating refs, reflog maintenance/expiry, and
//! `@{N}`/`@{date}` revision-expression resolution — ref mutation is
//! delegated to the `git` subprocess, and this crate only ever reads what's
//! already on disk.

mod error;
mod loose;
mod packed;
mod reflog;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::RefError;
pub use reflog::ReflogEntry;

use gitkit_hash::ObjectId;
use gitkit_object::GitDate;
use loose::LooseRef;

const MAX_SYMREF_DEPTH: u32 = 10;

/// What namespace a [`Ref`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    LocalBranch,
    RemoteBranch,
    Tag,
    Stash,
}

/// A single ref: a branch, remote-tracking branch, or tag, with its category
/// prefix stripped from `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub name: String,
    pub hash: ObjectId,
    pub ref_type: RefType,
}

/// A single entry from `logs/refs/stash`. `index` is position in the
/// reflog with 0 being the most recent (last line in the file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stash {
    pub index: usize,
    pub id: ObjectId,
    pub message: String,
    pub date: GitDate,
}

/// Reads refs, HEAD, and stashes out of a `.git` directory.
pub struct RefReader {
    git_dir: PathBuf,
}

impl RefReader {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    /// All local branches, remote-tracking branches, and tags. Loose refs
    /// take precedence over a `packed-refs` entry of the same name.
    pub fn get_refs(&self) -> Result<Vec<Ref>, RefError> {
        let loose = loose::enumerate_loose_refs(&self.git_dir)?;
        let mut seen: HashSet<String> = loose.iter().map(|(name, _)| name.clone()).collect();

        let mut refs: Vec<Ref> = Vec::new();
        for (name, hash) in &loose {
            if let Some((ref_type, short)) = categorize(name) {
                refs.push(Ref {
                    name: short,
                    hash: *hash,
                    ref_type,
                });
            }
        }

        for packed in packed::load_packed_refs(&self.git_dir)? {
            if seen.contains(&packed.name) {
                continue;
            }
            if let Some((ref_type, short)) = categorize(&packed.name) {
                refs.push(Ref {
                    name: short,
                    hash: packed.hash,
                    ref_type,
                });
            }
            seen.insert(packed.name);
        }

        Ok(refs)
    }

    /// The hash HEAD resolves to, or `None` for an unborn or truncated repo.
    /// Never fails on a missing or malformed HEAD (§4.7).
    pub fn get_head(&self) -> Result<Option<ObjectId>, RefError> {
        self.resolve_head(0).map(|r| r.map(|(oid, _)| oid))
    }

    /// The branch name HEAD points to, or `None` when HEAD is detached or
    /// unresolvable.
    pub fn get_head_branch(&self) -> Result<Option<String>, RefError> {
        self.resolve_head(0).map(|r| r.and_then(|(_, branch)| branch))
    }

    fn resolve_head(&self, depth: u32) -> Result<Option<(ObjectId, Option<String>)>, RefError> {
        if depth >= MAX_SYMREF_DEPTH {
            return Ok(None);
        }

        let head_path = self.git_dir.join("HEAD");
        let contents = match fs::read(&head_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RefError::IoPath {
                    path: head_path,
                    source: e,
                })
            }
        };

        let trimmed = std::str::from_utf8(&contents).unwrap_or("").trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Some(target) = trimmed.strip_prefix("ref: ") {
            let target = target.trim();
            let branch = categorize(target).map(|(_, short)| short);
            return match self.resolve_ref_name(target, depth + 1)? {
                Some(oid) => Ok(Some((oid, branch))),
                None => Ok(None),
            };
        }

        match ObjectId::from_hex(trimmed) {
            Ok(oid) => Ok(Some((oid, None))),
            Err(_) => Ok(None),
        }
    }

    /// Resolve a full ref name to its hash: loose first, `packed-refs`
    /// fallback, following a symbolic loose ref up to [`MAX_SYMREF_DEPTH`].
    fn resolve_ref_name(&self, name: &str, depth: u32) -> Result<Option<ObjectId>, RefError> {
        if depth >= MAX_SYMREF_DEPTH {
            return Ok(None);
        }

        match loose::read_loose_ref(&self.git_dir, name)? {
            Some(LooseRef::Direct(oid)) => return Ok(Some(oid)),
            Some(LooseRef::Symbolic(target)) => return self.resolve_ref_name(&target, depth + 1),
            None => {}
        }

        let packed = packed::load_packed_refs(&self.git_dir)?;
        Ok(packed.into_iter().find(|r| r.name == name).map(|r| r.hash))
    }

    /// Stashes parsed from `logs/refs/stash`, newest-first.
    pub fn get_stashes(&self) -> Result<Vec<Stash>, RefError> {
        let path = self.git_dir.join("logs").join("refs").join("stash");
        let entries = reflog::read_reflog_lines(&path)?;
        Ok(entries
            .into_iter()
            .rev()
            .enumerate()
            .map(|(index, entry)| Stash {
                index,
                id: entry.new_oid,
                message: entry.message.to_string(),
                date: entry.identity.date,
            })
            .collect())
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}

/// Split a full ref name into its [`RefType`] and the name with its
/// category prefix trimmed. Names outside the three tracked namespaces
/// don't categorize (e.g. `refs/notes/*`, `HEAD`).
fn categorize(full_name: &str) -> Option<(RefType, String)> {
    if let Some(rest) = full_name.strip_prefix("refs/heads/") {
        Some((RefType::LocalBranch, rest.to_string()))
    } else if let Some(rest) = full_name.strip_prefix("refs/remotes/") {
        Some((RefType::RemoteBranch, rest.to_string()))
    } else if let Some(rest) = full_name.strip_prefix("refs/tags/") {
        Some((RefType::Tag, rest.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn get_refs_combines_loose_and_packed_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        let oid_a = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let oid_b = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        write(git_dir, "refs/heads/main", &format!("{oid_a}\n"));
        write(
            git_dir,
            "packed-refs",
            &format!("{oid_b} refs/heads/main\n{oid_b} refs/tags/v1\n"),
        );

        let reader = RefReader::new(git_dir);
        let refs = reader.get_refs().unwrap();
        assert_eq!(refs.len(), 2);
        let main = refs.iter().find(|r| r.name == "main").unwrap();
        assert_eq!(main.hash, ObjectId::from_hex(oid_a).unwrap());
        assert_eq!(main.ref_type, RefType::LocalBranch);
        let tag = refs.iter().find(|r| r.name == "v1").unwrap();
        assert_eq!(tag.ref_type, RefType::Tag);
    }

    #[test]
    fn peeled_tag_in_packed_refs_surfaces_dereferenced_hash() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        write(
            git_dir,
            "packed-refs",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/tags/v1\n\
             ^bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\n",
        );

        let reader = RefReader::new(git_dir);
        let refs = reader.get_refs().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "v1");
        assert_eq!(
            refs[0].hash,
            ObjectId::from_hex("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap()
        );
    }

    #[test]
    fn head_detached() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        let oid = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        write(git_dir, "HEAD", &format!("{oid}\n"));

        let reader = RefReader::new(git_dir);
        assert_eq!(
            reader.get_head().unwrap(),
            Some(ObjectId::from_hex(oid).unwrap())
        );
        assert_eq!(reader.get_head_branch().unwrap(), None);
    }

    #[test]
    fn head_symbolic_follows_loose_branch() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        let oid = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        write(git_dir, "HEAD", "ref: refs/heads/main\n");
        write(git_dir, "refs/heads/main", &format!("{oid}\n"));

        let reader = RefReader::new(git_dir);
        assert_eq!(
            reader.get_head().unwrap(),
            Some(ObjectId::from_hex(oid).unwrap())
        );
        assert_eq!(reader.get_head_branch().unwrap(), Some("main".to_string()));
    }

    #[test]
    fn head_symbolic_falls_back_to_packed_refs() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        let oid = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        write(git_dir, "HEAD", "ref: refs/heads/main\n");
        write(git_dir, "packed-refs", &format!("{oid} refs/heads/main\n"));

        let reader = RefReader::new(git_dir);
        assert_eq!(
            reader.get_head().unwrap(),
            Some(ObjectId::from_hex(oid).unwrap())
        );
    }

    #[test]
    fn unborn_repo_head_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        write(git_dir, "HEAD", "ref: refs/heads/main\n");
        // refs/heads/main doesn't exist yet: unborn branch.

        let reader = RefReader::new(git_dir);
        assert_eq!(reader.get_head().unwrap(), None);
    }

    #[test]
    fn truncated_head_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        write(git_dir, "HEAD", "");

        let reader = RefReader::new(git_dir);
        assert_eq!(reader.get_head().unwrap(), None);
    }

    #[test]
    fn missing_head_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = RefReader::new(dir.path());
        assert_eq!(reader.get_head().unwrap(), None);
    }

    #[test]
    fn stashes_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path();
        let line1 = "0000000000000000000000000000000000000000 aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa Test User <test@example.com> 1700000000 +0000\tWIP on main: first stash\n";
        let line2 = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb Test User <test@example.com> 1700001000 +0000\tWIP on main: second stash\n";
        write(git_dir, "logs/refs/stash", &format!("{line1}{line2}"));

        let reader = RefReader::new(git_dir);
        let stashes = reader.get_stashes().unwrap();
        assert_eq!(stashes.len(), 2);
        assert_eq!(stashes[0].index, 0);
        assert_eq!(stashes[0].message, "WIP on main: second stash");
        assert_eq!(stashes[1].index, 1);
        assert_eq!(stashes[1].message, "WIP on main: first stash");
    }

    #[test]
    fn no_stash_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reader = RefReader::new(dir.path());
        assert!(reader.get_stashes().unwrap().is_empty());
    }
}
