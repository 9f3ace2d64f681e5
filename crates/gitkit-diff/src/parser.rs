//! Parses unified-diff text (as produced by [`crate::format_patch`] or by
//! `git diff` itself) back into the [`DiffHunk`] model (§4.11).
//!
//! Lines before the first `@@` hunk header (the `diff --git`/`---`/`+++`
//! preamble) are skipped rather than rejected, since callers may hand this
//! parser either a bare hunk or a full per-file patch.

use crate::worddiff::word_diff_segments;
use crate::{DiffHunk, DiffLine, IdSequence, LineKind, Segment, MAX_WORD_DIFF_LINE_LEN};

/// Parse one file's unified-diff text into its hunks.
pub fn parse_patch(text: &str) -> Vec<DiffHunk> {
    let mut ids = IdSequence::default();
    let mut hunks = Vec::new();
    let mut lines_iter = text.lines().peekable();

    while let Some(line) = lines_iter.next() {
        if !line.starts_with("@@ ") {
            continue;
        }
        let header = line.to_string();
        let mut raw: Vec<(LineKind, &str)> = Vec::new();
        let mut has_no_newline_at_end = false;

        while let Some(&next) = lines_iter.peek() {
            if next.starts_with("@@ ") {
                break;
            }
            lines_iter.next();
            if let Some(text) = next.strip_prefix("\\ No newline at end of file") {
                let _ = text;
                has_no_newline_at_end = true;
                continue;
            }
            if let Some(rest) = next.strip_prefix('+') {
                raw.push((LineKind::Added, rest));
            } else if let Some(rest) = next.strip_prefix('-') {
                raw.push((LineKind::Removed, rest));
            } else if let Some(rest) = next.strip_prefix(' ') {
                raw.push((LineKind::Unchanged, rest));
            } else if next.is_empty() {
                raw.push((LineKind::Unchanged, ""));
            }
        }

        let lines = enhance_with_word_diff(&raw, &mut ids);
        hunks.push(DiffHunk {
            id: ids.next(),
            header,
            lines,
            has_no_newline_at_end,
        });
    }

    hunks
}

/// Turn raw `(kind, text)` pairs into [`DiffLine`]s, running the word-diff
/// enhancement over consecutive removed+added runs of equal length so a
/// parsed patch gets the same per-word highlighting a freshly generated one
/// would (§4.11).
fn enhance_with_word_diff(raw: &[(LineKind, &str)], ids: &mut IdSequence) -> Vec<DiffLine> {
    let mut lines = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        if raw[i].0 == LineKind::Removed {
            let run_start = i;
            let mut removed_end = i;
            while removed_end < raw.len() && raw[removed_end].0 == LineKind::Removed {
                removed_end += 1;
            }
            let mut added_end = removed_end;
            while added_end < raw.len() && raw[added_end].0 == LineKind::Added {
                added_end += 1;
            }
            let removed_count = removed_end - run_start;
            let added_count = added_end - removed_end;
            let pair_count = removed_count.min(added_count);

            for k in 0..pair_count {
                let old_text = raw[run_start + k].1;
                let new_text = raw[removed_end + k].1;
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
            for &(kind, text) in &raw[run_start + pair_count..removed_end] {
                lines.push(whole_line(kind, text, ids));
            }
            for &(kind, text) in &raw[removed_end + pair_count..added_end] {
                lines.push(whole_line(kind, text, ids));
            }
            i = added_end;
        } else {
            let (kind, text) = raw[i];
            lines.push(whole_line(kind, text, ids));
            i += 1;
        }
    }
    lines
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_preamble_before_first_hunk() {
        let text = "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-a\n+b\n";
        let hunks = parse_patch(text);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].header, "@@ -1,1 +1,1 @@");
    }

    #[test]
    fn parses_context_added_removed_lines() {
        let text = "@@ -1,3 +1,3 @@\n a\n-b\n+x\n c\n";
        let hunks = parse_patch(text);
        let kinds: Vec<LineKind> = hunks[0].lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Unchanged,
                LineKind::Removed,
                LineKind::Added,
                LineKind::Unchanged,
            ]
        );
    }

    #[test]
    fn honors_no_newline_marker() {
        let text = "@@ -1,1 +1,1 @@\n-a\n+b\n\\ No newline at end of file\n";
        let hunks = parse_patch(text);
        assert!(hunks[0].has_no_newline_at_end);
    }

    #[test]
    fn multiple_hunks_in_one_text_are_all_parsed() {
        let text = "@@ -1,1 +1,1 @@\n-a\n+b\n@@ -10,1 +10,1 @@\n-c\n+d\n";
        let hunks = parse_patch(text);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].header, "@@ -10,1 +10,1 @@");
    }

    #[test]
    fn paired_removed_added_lines_get_word_highlighting() {
        let text = "@@ -1,1 +1,1 @@\n-the quick fox\n+the slow fox\n";
        let hunks = parse_patch(text);
        let removed = &hunks[0].lines[0];
        let highlighted: Vec<&str> = removed
            .segments
            .iter()
            .filter(|s| s.is_highlighted)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(highlighted, vec!["quick"]);
    }

    #[test]
    fn unequal_removed_added_counts_fall_back_to_whole_lines() {
        let text = "@@ -1,2 +1,1 @@\n-a\n-b\n+x\n";
        let hunks = parse_patch(text);
        let texts: Vec<String> = hunks[0]
            .lines
            .iter()
            .map(|l| l.segments.iter().map(|s| s.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec!["a".to_string(), "x".to_string(), "b".to_string()]);
    }
}
