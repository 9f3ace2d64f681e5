//! Unified patch emission and reversal (§4.10), grounded on the teacher's
//! `format/unified.rs` header/body layout but narrowed to exactly the
//! fields this data model carries — no mode lines, index lines, or
//! similarity headers, since nothing upstream of this crate produces them.

use crate::{DiffHunk, LineKind};

/// Emit a `git apply`-ready unified patch for one file's hunks.
pub fn format_patch(path: &str, hunks: &[DiffHunk]) -> String {
    let mut out = String::new();
    out.push_str(&format!("diff --git a/{path} b/{path}\n"));
    out.push_str(&format!("--- a/{path}\n"));
    out.push_str(&format!("+++ b/{path}\n"));
    for hunk in hunks {
        format_hunk(&mut out, hunk);
    }
    out
}

fn format_hunk(out: &mut String, hunk: &DiffHunk) {
    out.push_str(&hunk.header);
    out.push('\n');
    for line in &hunk.lines {
        let prefix = match line.kind {
            LineKind::Unchanged => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
        };
        out.push(prefix);
        out.push_str(&line_text(line));
        out.push('\n');
    }
    if hunk.has_no_newline_at_end {
        out.push_str("\\ No newline at end of file\n");
    }
}

fn line_text(line: &crate::DiffLine) -> String {
    line.segments.iter().map(|s| s.text.as_str()).collect()
}

/// Swap `(old_start,old_count)` with `(new_start,new_count)` in the header
/// and flip `+`/`-` on non-context lines. Used for unstage (`--cached`) and
/// discard.
pub fn reverse_patch(hunk: &DiffHunk) -> DiffHunk {
    let header = match parse_header(&hunk.header) {
        Some((old_start, old_count, new_start, new_count)) => {
            format!("@@ -{new_start},{new_count} +{old_start},{old_count} @@")
        }
        None => hunk.header.clone(),
    };

    let lines = hunk
        .lines
        .iter()
        .map(|line| {
            let kind = match line.kind {
                LineKind::Added => LineKind::Removed,
                LineKind::Removed => LineKind::Added,
                LineKind::Unchanged => LineKind::Unchanged,
            };
            crate::DiffLine {
                id: line.id,
                kind,
                segments: line.segments.clone(),
            }
        })
        .collect();

    DiffHunk {
        id: hunk.id,
        header,
        lines,
        has_no_newline_at_end: hunk.has_no_newline_at_end,
    }
}

/// Parse `@@ -<old_start>,<old_count> +<new_start>,<new_count> @@...` into
/// its four numbers.
fn parse_header(header: &str) -> Option<(u64, u64, u64, u64)> {
    let rest = header.strip_prefix("@@ -")?;
    let (old_part, rest) = rest.split_once(' ')?;
    let new_part = rest.strip_prefix('+')?;
    let new_part = new_part.split(" @@").next()?;

    let (old_start, old_count) = old_part.split_once(',')?;
    let (new_start, new_count) = new_part.split_once(',')?;

    Some((
        old_start.parse().ok()?,
        old_count.parse().ok()?,
        new_start.parse().ok()?,
        new_count.parse().ok()?,
    ))
}
