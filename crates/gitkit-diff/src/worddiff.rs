//! Word-level line diffing, shared by the hunk generator and the patch
//! parser's optional enhancement pass (§4.9, §4.11).

use crate::myers::{self, EditOp};
use crate::{IdSequence, Segment};

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(line.len());
    &line[..end]
}

/// Diff two lines word-by-word: split on whitespace, diff the word
/// sequences, preserve each side's leading whitespace as a non-highlighted
/// segment, and re-insert single-space separators between surviving word
/// segments.
pub(crate) fn word_diff_segments(
    old_line: &str,
    new_line: &str,
    ids: &mut IdSequence,
) -> (Vec<Segment>, Vec<Segment>) {
    let old_leading = leading_whitespace(old_line);
    let new_leading = leading_whitespace(new_line);
    let old_words: Vec<&str> = old_line[old_leading.len()..].split_whitespace().collect();
    let new_words: Vec<&str> = new_line[new_leading.len()..].split_whitespace().collect();

    let old_word_bytes: Vec<&[u8]> = old_words.iter().map(|w| w.as_bytes()).collect();
    let new_word_bytes: Vec<&[u8]> = new_words.iter().map(|w| w.as_bytes()).collect();
    let edits = myers::diff(&old_word_bytes, &new_word_bytes);

    let mut old_segments = Vec::new();
    let mut new_segments = Vec::new();
    if !old_leading.is_empty() {
        old_segments.push(plain_segment(old_leading, ids));
    }
    if !new_leading.is_empty() {
        new_segments.push(plain_segment(new_leading, ids));
    }

    let mut old_word_count = 0usize;
    let mut new_word_count = 0usize;
    for edit in &edits {
        match edit.op {
            EditOp::Equal => {
                if old_word_count > 0 {
                    old_segments.push(separator(ids));
                }
                old_segments.push(word_segment(old_words[edit.old_index], false, ids));
                old_word_count += 1;

                if new_word_count > 0 {
                    new_segments.push(separator(ids));
                }
                new_segments.push(word_segment(new_words[edit.new_index], false, ids));
                new_word_count += 1;
            }
            EditOp::Delete => {
                if old_word_count > 0 {
                    old_segments.push(separator(ids));
                }
                old_segments.push(word_segment(old_words[edit.old_index], true, ids));
                old_word_count += 1;
            }
            EditOp::Insert => {
                if new_word_count > 0 {
                    new_segments.push(separator(ids));
                }
                new_segments.push(word_segment(new_words[edit.new_index], true, ids));
                new_word_count += 1;
            }
        }
    }

    (old_segments, new_segments)
}

fn word_segment(word: &str, is_highlighted: bool, ids: &mut IdSequence) -> Segment {
    Segment {
        id: ids.next(),
        text: word.to_string(),
        is_highlighted,
    }
}

fn plain_segment(text: &str, ids: &mut IdSequence) -> Segment {
    Segment {
        id: ids.next(),
        text: text.to_string(),
        is_highlighted: false,
    }
}

fn separator(ids: &mut IdSequence) -> Segment {
    Segment {
        id: ids.next(),
        text: " ".to_string(),
        is_highlighted: false,
    }
}
