//! Reflog line parsing, shared by HEAD/branch history and stash records.

use std::fs;
use std::path::Path;

use bstr::{BStr, BString, ByteSlice};
use gitkit_hash::ObjectId;
use gitkit_object::Signature;

use crate::error::RefError;

/// A single reflog entry: `<old> <new> <identity> <timestamp> <tz>\t<message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogEntry {
    pub old_oid: ObjectId,
    pub new_oid: ObjectId,
    pub identity: Signature,
    pub message: BString,
}

impl ReflogEntry {
    /// Parse a single reflog line (no trailing newline required).
    pub fn parse(line: &BStr) -> Result<Self, RefError> {
        let line = line.as_bytes();

        if line.len() < 82 {
            return Err(RefError::Parse(format!(
                "reflog line too short: {} bytes",
                line.len()
            )));
        }

        let old_hex = std::str::from_utf8(&line[..40])
            .map_err(|_| RefError::Parse("invalid UTF-8 in old OID".into()))?;
        let old_oid = ObjectId::from_hex(old_hex)?;

        if line[40] != b' ' {
            return Err(RefError::Parse("expected space after old OID".into()));
        }

        let new_hex = std::str::from_utf8(&line[41..81])
            .map_err(|_| RefError::Parse("invalid UTF-8 in new OID".into()))?;
        let new_oid = ObjectId::from_hex(new_hex)?;

        if line[81] != b' ' {
            return Err(RefError::Parse("expected space after new OID".into()));
        }

        let rest = &line[82..];
        let (identity_part, message) = if let Some(tab_pos) = rest.find_byte(b'\t') {
            (&rest[..tab_pos], &rest[tab_pos + 1..])
        } else {
            (rest, &b""[..])
        };

        let identity = Signature::parse(identity_part.as_bstr())
            .map_err(|e| RefError::Parse(format!("invalid identity in reflog: {e}")))?;

        let message = if message.ends_with(b"\n") {
            &message[..message.len() - 1]
        } else {
            message
        };

        Ok(Self {
            old_oid,
            new_oid,
            identity,
            message: BString::from(message),
        })
    }
}

/// Read every reflog entry for a ref, file-order (oldest first).
pub fn read_reflog_lines(path: &Path) -> Result<Vec<ReflogEntry>, RefError> {
    let contents = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RefError::IoPath {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        entries.push(ReflogEntry::parse(line.as_bstr())?);
    }
    Ok(entries)
}
