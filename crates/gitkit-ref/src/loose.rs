//! Loose ref files: one file per ref under `.git/refs/...` (or `.git/HEAD`).

use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use gitkit_hash::ObjectId;

use crate::error::RefError;

/// The three namespaces a loose ref enumeration walks (§4.7).
pub const LOOSE_NAMESPACES: &[&str] = &["refs/heads", "refs/remotes", "refs/tags"];

/// The parsed content of a single ref file, before categorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LooseRef {
    Direct(ObjectId),
    Symbolic(String),
}

/// Read and parse a single loose ref file at `git_dir.join(name)`.
pub fn read_loose_ref(git_dir: &Path, name: &str) -> Result<Option<LooseRef>, RefError> {
    let path = loose_ref_path(git_dir, name);
    read_loose_ref_file(&path)
}

/// Read and parse a ref file at an exact path (used for `HEAD` itself).
pub fn read_loose_ref_file(path: &Path) -> Result<Option<LooseRef>, RefError> {
    let contents = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RefError::IoPath {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(target) = trimmed.strip_prefix(b"ref: ") {
        let target_str = std::str::from_utf8(target.trim())
            .map_err(|_| RefError::Parse("invalid UTF-8 in symbolic ref target".into()))?;
        return Ok(Some(LooseRef::Symbolic(target_str.to_string())));
    }

    let hex = std::str::from_utf8(trimmed)
        .map_err(|_| RefError::Parse("invalid UTF-8 in ref contents".into()))?;
    let oid = ObjectId::from_hex(hex)?;
    Ok(Some(LooseRef::Direct(oid)))
}

pub fn loose_ref_path(git_dir: &Path, name: &str) -> PathBuf {
    git_dir.join(name)
}

/// Walk `refs/heads`, `refs/remotes`, `refs/tags` for loose ref files,
/// returning `(full refname, direct oid)` pairs. Symbolic loose refs under
/// these namespaces don't occur in practice and are skipped rather than
/// followed, since full symref resolution is HEAD's job only.
pub fn enumerate_loose_refs(git_dir: &Path) -> Result<Vec<(String, ObjectId)>, RefError> {
    let mut result = Vec::new();
    for namespace in LOOSE_NAMESPACES {
        let dir = git_dir.join(namespace);
        collect_recursive(git_dir, &dir, &mut result)?;
    }
    Ok(result)
}

fn collect_recursive(
    git_dir: &Path,
    dir: &Path,
    result: &mut Vec<(String, ObjectId)>,
) -> Result<(), RefError> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(RefError::IoPath {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|e| RefError::IoPath {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_recursive(git_dir, &path, result)?;
        } else if path.is_file() {
            let rel = path
                .strip_prefix(git_dir)
                .map_err(|_| RefError::Parse("ref path outside git dir".into()))?;
            let name = rel
                .to_str()
                .ok_or_else(|| RefError::Parse("non-UTF-8 ref path".into()))?
                .replace('\\', "/");

            if let Some(LooseRef::Direct(oid)) = read_loose_ref_file(&path)? {
                result.push((name, oid));
            }
        }
    }

    Ok(())
}
