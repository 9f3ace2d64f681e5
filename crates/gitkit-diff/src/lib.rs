//! Diff engine: commit-vs-parent path diffing, Myers line/word diff with
//! unified hunk grouping, and patch emission/parsing.
//!
//! Four independent pieces, mirroring how a caller actually uses them: the
//! [`calculator`] compares two path→hash maps with no object access; the
//! [`hunk`] generator turns a pair of file contents into hunks on demand;
//! [`patch`] renders a hunk as `git apply`-ready text (and reverses it for
//! unstage/discard); [`parser`] reads that text back.

mod binary;
mod calculator;
mod error;
mod hunk;
mod myers;
mod parser;
mod patch;
mod worddiff;

pub use calculator::{diff_trees, ChangeType, ChangedFile};
pub use error::DiffError;
pub use hunk::{generate_hunks, HunkOptions};
pub use parser::parse_patch;
pub use patch::{format_patch, reverse_patch};

/// Above this size (in bytes) the hunk generator refuses to diff a file (§4.9).
pub const MAX_DIFF_SIZE: usize = 1024 * 1024;

/// Default number of unchanged lines kept around a change (§4.9).
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Lines longer than this (in chars) skip word-level highlighting (§4.9).
pub const MAX_WORD_DIFF_LINE_LEN: usize = 500;

/// What a [`DiffLine`] represents relative to the old/new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Unchanged,
}

/// A contiguous run of text within a line, optionally word-highlighted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: u64,
    pub text: String,
    pub is_highlighted: bool,
}

/// One rendered line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub id: u64,
    pub kind: LineKind,
    pub segments: Vec<Segment>,
}

/// A unified-diff hunk: a header plus the lines it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub id: u64,
    pub header: String,
    pub lines: Vec<DiffLine>,
    pub has_no_newline_at_end: bool,
}

/// Monotonic id generator scoped to a single generation/parse call. Ids have
/// no stability guarantee across calls: callers receive a fresh tree each
/// time (§3's "Lifetimes" note), so there is nothing for a counter to be
/// stable against.
#[derive(Default)]
pub(crate) struct IdSequence(u64);

impl IdSequence {
    pub(crate) fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}
