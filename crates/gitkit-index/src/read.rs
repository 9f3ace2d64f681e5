//! DIRC index file decoding (versions 2 and 3).

use std::collections::HashMap;

use bstr::BString;
use gitkit_object::FileMode;

use crate::entry::{normalize_file_mode, normalize_path};
use crate::{IndexEntry, IndexError, IndexSnapshot};

const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";

/// Parse a `.git/index` file's raw bytes into a snapshot.
pub fn parse_snapshot(data: &[u8]) -> Result<IndexSnapshot, IndexError> {
    if data.len() < 12 {
        return Err(IndexError::InvalidHeader("index file too short".into()));
    }

    let sig = &data[0..4];
    if sig != INDEX_SIGNATURE {
        return Err(IndexError::InvalidHeader(format!(
            "bad signature: expected DIRC, got {sig:?}"
        )));
    }

    let version = read_u32(&data[4..8]);
    if version != 2 && version != 3 {
        return Err(IndexError::UnsupportedVersion(version));
    }

    let entry_count = read_u32(&data[8..12]) as usize;

    // The trailing 20 bytes are the index checksum; this crate doesn't
    // verify it (on-disk integrity checking is out of scope), it's only
    // excluded from the entry-parsing bound.
    let content_end = data.len().saturating_sub(20);

    let mut cursor = 12;
    let mut entries = Vec::with_capacity(entry_count);

    for i in 0..entry_count {
        let (entry, new_cursor) = parse_entry(data, cursor, version, content_end, i)?;
        entries.push(entry);
        cursor = new_cursor;
    }

    let mut counts: HashMap<&BString, usize> = HashMap::new();
    for entry in &entries {
        *counts.entry(&entry.path).or_insert(0) += 1;
    }

    let mut entries_by_path = HashMap::with_capacity(entries.len());
    for entry in &entries {
        entries_by_path.insert(entry.path.clone(), entry.clone());
    }

    let mut conflicted_paths: Vec<BString> = counts
        .iter()
        .filter(|(_, &count)| count >= 2)
        .map(|(path, _)| (*path).clone())
        .collect();
    conflicted_paths.sort();

    Ok(IndexSnapshot {
        entries,
        entries_by_path,
        conflicted_paths,
        version,
    })
}

/// On-disk entry size per C git's formula:
/// `((40 + hash_size + flags_size + name_len + 8) & ~7)`.
fn ondisk_entry_size(name_len: usize, extended: bool) -> usize {
    const STAT_FIELDS: usize = 40;
    const SHA1_SIZE: usize = 20;
    let flags_size = if extended { 4 } else { 2 };
    (STAT_FIELDS + SHA1_SIZE + flags_size + name_len + 8) & !7
}

fn parse_entry(
    data: &[u8],
    start: usize,
    version: u32,
    content_end: usize,
    index: usize,
) -> Result<(IndexEntry, usize), IndexError> {
    let mut cursor = start;

    if cursor + 62 > content_end {
        return Err(IndexError::TruncatedEntry(index));
    }

    let ctime_secs = read_u32(&data[cursor..]);
    let ctime_nsecs = read_u32(&data[cursor + 4..]);
    let mtime_secs = read_u32(&data[cursor + 8..]);
    let mtime_nsecs = read_u32(&data[cursor + 12..]);
    let dev = read_u32(&data[cursor + 16..]);
    let ino = read_u32(&data[cursor + 20..]);
    let mode_raw = read_u32(&data[cursor + 24..]);
    let uid = read_u32(&data[cursor + 28..]);
    let gid = read_u32(&data[cursor + 32..]);
    let size = read_u32(&data[cursor + 36..]);
    cursor += 40;

    let sha1 = gitkit_hash::ObjectId::from_bytes(&data[cursor..cursor + 20])
        .map_err(|_| IndexError::TruncatedEntry(index))?;
    cursor += 20;

    let flags_raw = read_u16(&data[cursor..]);
    cursor += 2;

    let extended_flag = (flags_raw & 0x4000) != 0;

    if extended_flag {
        if version < 3 {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: "extended flags present in a v2 index".into(),
            });
        }
        if cursor + 2 > content_end {
            return Err(IndexError::TruncatedEntry(index));
        }
        cursor += 2;
    }

    let path_start = cursor;
    let nul_pos = data[path_start..content_end]
        .iter()
        .position(|&b| b == 0)
        .ok_or(IndexError::TruncatedEntry(index))?;
    let raw_path = BString::from(&data[path_start..path_start + nul_pos]);

    let entry_size = ondisk_entry_size(nul_pos, extended_flag);
    cursor = (start + entry_size).min(content_end);

    let ctime = if ctime_secs == 0 && ctime_nsecs == 0 {
        None
    } else {
        Some((ctime_secs, ctime_nsecs))
    };

    let entry = IndexEntry {
        path: normalize_path(raw_path),
        sha1,
        size,
        mtime_secs,
        mtime_nsecs,
        ctime,
        dev,
        ino,
        uid,
        gid,
        file_mode: normalize_file_mode(FileMode::from_raw(mode_raw)),
    };

    Ok((entry, cursor))
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

fn read_u16(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}
