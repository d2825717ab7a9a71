//! Tail truncation of long command output.
//!
//! Displayed output must stay bounded no matter what the stack prints.
//! The transform keeps the most recent lines (the ones that matter for a
//! demo) and marks the cut with a leading ellipsis; it never summarizes
//! or samples.

/// Marker emitted as the first line when truncation occurred.
pub const ELLIPSIS: &str = "...";

/// Bound `text` to at most `max_lines` non-empty lines.
///
/// Within the limit the non-empty lines are returned unchanged and
/// unmarked, in their original order. Above it, the result is [`ELLIPSIS`]
/// followed by exactly the last `max_lines` lines. Empty input yields an
/// empty string.
pub fn compact(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();
    if lines.len() <= max_lines {
        return lines.join("\n");
    }
    let tail = &lines[lines.len() - max_lines..];
    let mut out = Vec::with_capacity(max_lines + 1);
    out.push(ELLIPSIS);
    out.extend_from_slice(tail);
    out.join("\n")
}
