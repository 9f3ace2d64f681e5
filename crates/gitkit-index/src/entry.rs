//! `IndexEntry`: a single staged file as recorded in the index.

use bstr::BString;
use gitkit_hash::ObjectId;
use gitkit_object::FileMode;

/// A single entry in the index (on-disk `cache_entry`, stat fields plus the
/// staged blob's OID).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the repo root, normalized (leading `./` stripped).
    pub path: BString,
    pub sha1: ObjectId,
    pub size: u32,
    pub mtime_secs: u32,
    pub mtime_nsecs: u32,
    /// `None` when the on-disk ctime is zeroed (e.g. synthesized entries).
    pub ctime: Option<(u32, u32)>,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    /// One of `Regular`, `Executable`, `Symlink`, `Gitlink`. Unknown on-disk
    /// modes degrade to `Regular` rather than failing parse.
    pub file_mode: FileMode,
}

/// Normalize an index path: strip a single leading `./`.
pub(crate) fn normalize_path(path: BString) -> BString {
    if let Some(stripped) = path.strip_prefix(b"./") {
        BString::from(stripped)
    } else {
        path
    }
}

/// Degrade any mode outside `{regular, executable, symlink, gitlink}` to
/// `Regular`, matching the spec's "unknown file modes degrade" policy.
pub(crate) fn normalize_file_mode(mode: FileMode) -> FileMode {
    match mode {
        FileMode::Regular | FileMode::Executable | FileMode::Symlink | FileMode::Gitlink => mode,
        FileMode::Tree | FileMode::Unknown(_) => FileMode::Regular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_leading_dot_slash() {
        assert_eq!(normalize_path(BString::from("./a.txt")), BString::from("a.txt"));
        assert_eq!(normalize_path(BString::from("a.txt")), BString::from("a.txt"));
        assert_eq!(normalize_path(BString::from("dir/./b.txt")), BString::from("dir/./b.txt"));
    }

    #[test]
    fn normalize_file_mode_degrades_unknown_and_tree() {
        assert_eq!(normalize_file_mode(FileMode::Unknown(0o100664)), FileMode::Regular);
        assert_eq!(normalize_file_mode(FileMode::Tree), FileMode::Regular);
        assert_eq!(normalize_file_mode(FileMode::Executable), FileMode::Executable);
        assert_eq!(normalize_file_mode(FileMode::Symlink), FileMode::Symlink);
        assert_eq!(normalize_file_mode(FileMode::Gitlink), FileMode::Gitlink);
    }
}
