//! `packed-refs`: refs packed into a single file, with annotated-tag peeling.

use std::fs;
use std::path::Path;

use bstr::ByteSlice;
use gitkit_hash::ObjectId;

use crate::error::RefError;

/// A single ref entry read from `packed-refs`.
///
/// A `^<hash>` continuation line *replaces* `hash` with the peeled commit
/// hash (§4.7) rather than recording it separately — callers never see the
/// annotated tag object's own hash, only what it ultimately points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRef {
    pub name: String,
    pub hash: ObjectId,
}

/// Parse the `packed-refs` file. Missing file parses as empty.
pub fn load_packed_refs(git_dir: &Path) -> Result<Vec<PackedRef>, RefError> {
    let path = git_dir.join("packed-refs");
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RefError::IoPath {
                path,
                source: e,
            })
        }
    };
    parse_packed_refs(&data)
}

fn parse_packed_refs(data: &[u8]) -> Result<Vec<PackedRef>, RefError> {
    let mut refs: Vec<PackedRef> = Vec::new();

    for line in data.lines() {
        if line.is_empty() || line.starts_with(b"#") {
            continue;
        }

        if let Some(hex) = line.strip_prefix(b"^") {
            let hex = std::str::from_utf8(hex)
                .map_err(|_| RefError::Parse("invalid UTF-8 in peeled OID".into()))?;
            let peeled = ObjectId::from_hex(hex.trim())?;
            if let Some(last) = refs.last_mut() {
                last.hash = peeled;
            }
            continue;
        }

        let space_pos = line
            .find_byte(b' ')
            .ok_or_else(|| RefError::Parse("invalid packed-refs line".into()))?;
        let hex = std::str::from_utf8(&line[..space_pos])
            .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs hash".into()))?;
        let hash = ObjectId::from_hex(hex)?;

        let name = std::str::from_utf8(&line[space_pos + 1..])
            .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs name".into()))?
            .trim()
            .to_string();

        refs.push(PackedRef { name, hash });
    }

    Ok(refs)
}
