//! Turns a pair of whole-file contents into unified-diff hunks: Myers line
//! diff, word-level highlighting for modified-line pairs, and hunk grouping
//! with a configurable context window (§4.9).

use crate::binary;
use crate::error::DiffError;
use crate::myers::{self, EditOp};
use crate::worddiff::word_diff_segments;
use crate::{
    DiffHunk, DiffLine, IdSequence, LineKind, Segment, DEFAULT_CONTEXT_LINES, MAX_DIFF_SIZE,
    MAX_WORD_DIFF_LINE_LEN,
};

#[derive(Debug, Clone, Copy)]
pub struct HunkOptions {
    pub context_lines: usize,
}

impl Default for HunkOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

/// A maximal run of non-equal edits, with the old/new positions the run
/// starts at (used as the hunk anchor when no leading context precedes it).
struct ChangeBlock {
    old_anchor: usize,
    new_anchor: usize,
    removed: Vec<usize>,
    added: Vec<usize>,
}

enum Block {
    Unchanged(usize, usize),
    Change(ChangeBlock),
}

pub fn generate_hunks(old: &str, new: &str, options: &HunkOptions) -> Result<Vec<DiffHunk>, DiffError> {
    if old == new {
        return Ok(Vec::new());
    }
    if old.is_empty() && new.is_empty() {
        return Ok(Vec::new());
    }

    let largest = old.len().max(new.len());
    if largest > MAX_DIFF_SIZE {
        return Err(DiffError::FileTooLarge(largest));
    }

    if binary::is_binary(old.as_bytes()) || binary::is_binary(new.as_bytes()) {
        let mut ids = IdSequence::default();
        return Ok(vec![DiffHunk {
            id: ids.next(),
            header: "Binary files differ".to_string(),
            lines: Vec::new(),
            has_no_newline_at_end: false,
        }]);
    }

    let old_reprs = line_reprs(old);
    let new_reprs = line_reprs(new);
    let old_lines: Vec<&str> = old_reprs.iter().map(|l| strip_newline(l)).collect();
    let new_lines: Vec<&str> = new_reprs.iter().map(|l| strip_newline(l)).collect();
    let old_byte_lines: Vec<&[u8]> = old_reprs.iter().map(|l| l.as_bytes()).collect();
    let new_byte_lines: Vec<&[u8]> = new_reprs.iter().map(|l| l.as_bytes()).collect();

    let edits = myers::diff(&old_byte_lines, &new_byte_lines);
    let blocks = to_blocks(&edits);

    let old_no_trailing_newline = !old.is_empty() && !old.ends_with('\n');
    let new_no_trailing_newline = !new.is_empty() && !new.ends_with('\n');

    let mut ids = IdSequence::default();
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut lines: Vec<DiffLine> = Vec::new();
    let mut old_start = 0usize;
    let mut new_start = 0usize;
    let mut hunk_open = false;
    let mut unchanged_buf: Vec<(usize, usize)> = Vec::new();
    let ctx = options.context_lines;

    for block in &blocks {
        match block {
            Block::Unchanged(oi, ni) => {
                unchanged_buf.push((*oi, *ni));
                if hunk_open && unchanged_buf.len() > 2 * ctx {
                    let trailing: Vec<(usize, usize)> = unchanged_buf.drain(..ctx).collect();
                    push_trimmed_context(&mut lines, &old_lines, &trailing, &mut ids);
                    hunks.push(DiffHunk {
                        id: ids.next(),
                        header: build_header(old_start, new_start, &lines),
                        has_no_newline_at_end: false,
                        lines: std::mem::take(&mut lines),
                    });
                    hunk_open = false;
                    let keep_from = unchanged_buf.len().saturating_sub(ctx);
                    unchanged_buf.drain(..keep_from);
                }
            }
            Block::Change(change) => {
                if !hunk_open {
                    let lead_from = unchanged_buf.len().saturating_sub(ctx);
                    let lead = &unchanged_buf[lead_from..];
                    if let Some(&(o, n)) = lead.first() {
                        old_start = o;
                        new_start = n;
                    } else {
                        old_start = change.old_anchor;
                        new_start = change.new_anchor;
                    }
                    for &(o, _n) in lead {
                        lines.push(context_line(&old_lines, o, &mut ids));
                    }
                    hunk_open = true;
                } else {
                    let carried = std::mem::take(&mut unchanged_buf);
                    for (o, _n) in carried {
                        lines.push(context_line(&old_lines, o, &mut ids));
                    }
                }
                unchanged_buf.clear();
                append_change_lines(change, &old_lines, &new_lines, &mut lines, &mut ids);
            }
        }
    }

    if hunk_open {
        let take_n = unchanged_buf.len().min(ctx);
        let trailing: Vec<(usize, usize)> = unchanged_buf.drain(..take_n).collect();
        push_trimmed_context(&mut lines, &old_lines, &trailing, &mut ids);
        hunks.push(DiffHunk {
            id: ids.next(),
            header: build_header(old_start, new_start, &lines),
            has_no_newline_at_end: false,
            lines: std::mem::take(&mut lines),
        });
    }

    if let Some(last) = hunks.last_mut() {
        if let Some(last_line) = last.lines.last() {
            last.has_no_newline_at_end = match last_line.kind {
                LineKind::Added => new_no_trailing_newline,
                LineKind::Removed => old_no_trailing_newline,
                LineKind::Unchanged => old_no_trailing_newline || new_no_trailing_newline,
            };
        }
    }

    Ok(hunks)
}

/// Split file content into lines with the `\n` terminator still attached
/// (a final line lacking one is kept as a shorter entry). Keeping the
/// terminator in the compared bytes means a line whose only difference is a
/// trailing newline is correctly seen as changed, matching `git diff`
/// duplicating such a line as a removed/added pair rather than hiding the
/// difference.
fn line_reprs(text: &str) -> Vec<&str> {
    myers::split_lines(text.as_bytes())
        .into_iter()
        .map(|l| std::str::from_utf8(l).expect("line boundaries are on `\\n`, always UTF-8-safe"))
        .collect()
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

fn to_blocks(edits: &[myers::Edit]) -> Vec<Block> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < edits.len() {
        if edits[i].op == EditOp::Equal {
            out.push(Block::Unchanged(edits[i].old_index, edits[i].new_index));
            i += 1;
        } else {
            let start = i;
            while i < edits.len() && edits[i].op != EditOp::Equal {
                i += 1;
            }
            let run = &edits[start..i];
            let old_anchor = run[0].old_index;
            let new_anchor = run[0].new_index;
            let removed: Vec<usize> = run
                .iter()
                .filter(|e| e.op == EditOp::Delete)
                .map(|e| e.old_index)
                .collect();
            let added: Vec<usize> = run
                .iter()
                .filter(|e| e.op == EditOp::Insert)
                .map(|e| e.new_index)
                .collect();
            out.push(Block::Change(ChangeBlock {
                old_anchor,
                new_anchor,
                removed,
                added,
            }));
        }
    }
    out
}

fn append_change_lines(
    change: &ChangeBlock,
    old_lines: &[&str],
    new_lines: &[&str],
    lines: &mut Vec<DiffLine>,
    ids: &mut IdSequence,
) {
    let pair_count = change.removed.len().min(change.added.len());
    for k in 0..pair_count {
        let old_text = old_lines[change.removed[k]];
        let new_text = new_lines[change.added[k]];
        if old_text.chars().count() <= MAX_WORD_DIFF_LINE_LEN
            && new_text.chars().count() <= MAX_WORD_DIFF_LINE_LEN
        {
            let (old_segments, new_segments) = word_diff_segments(old_text, new_text, ids);
            lines.push(DiffLine {
                id: ids.next(),
                kind: LineKind::Removed,
                segments: old_segments,
            });
            lines.push(DiffLine {
                id: ids.next(),
                kind: LineKind::Added,
                segments: new_segments,
            });
        } else {
            lines.push(whole_line(LineKind::Removed, old_text, ids));
            lines.push(whole_line(LineKind::Added, new_text, ids));
        }
    }
    for &oi in &change.removed[pair_count..] {
        lines.push(whole_line(LineKind::Removed, old_lines[oi], ids));
    }
    for &ni in &change.added[pair_count..] {
        lines.push(whole_line(LineKind::Added, new_lines[ni], ids));
    }
}

fn context_line(old_lines: &[&str], idx: usize, ids: &mut IdSequence) -> DiffLine {
    DiffLine {
        id: ids.next(),
        kind: LineKind::Unchanged,
        segments: vec![Segment {
            id: ids.next(),
            text: old_lines[idx].to_string(),
            is_highlighted: false,
        }],
    }
}

fn whole_line(kind: LineKind, text: &str, ids: &mut IdSequence) -> DiffLine {
    DiffLine {
        id: ids.next(),
        kind,
        segments: vec![Segment {
            id: ids.next(),
            text: text.to_string(),
            is_highlighted: false,
        }],
    }
}

/// Append the trailing context lines closing out a hunk, trimming any empty
/// (blank-line) entries off the end of this batch only.
fn push_trimmed_context(
    lines: &mut Vec<DiffLine>,
    old_lines: &[&str],
    entries: &[(usize, usize)],
    ids: &mut IdSequence,
) {
    let mut batch: Vec<DiffLine> = entries
        .iter()
        .map(|&(o, _n)| context_line(old_lines, o, ids))
        .collect();
    while matches!(batch.last(), Some(l) if l.segments.len() == 1 && l.segments[0].text.is_empty()) {
        batch.pop();
    }
    lines.extend(batch);
}

fn build_header(old_start: usize, new_start: usize, lines: &[DiffLine]) -> String {
    let unchanged = lines.iter().filter(|l| l.kind == LineKind::Unchanged).count();
    let removed = lines.iter().filter(|l| l.kind == LineKind::Removed).count();
    let added = lines.iter().filter(|l| l.kind == LineKind::Added).count();
    let old_count = unchanged + removed;
    let new_count = unchanged + added;
    format!(
        "@@ -{},{} +{},{} @@",
        old_start + 1,
        old_count,
        new_start + 1,
        new_count
    )
}
