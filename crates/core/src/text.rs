//! Display helpers.

const ELLIPSIS: &str = "...";

/// Shorten `s` to at most `max_len` characters, marking the cut with `...`.
///
/// Lengths count Unicode scalar values, so the cut never splits a character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= ELLIPSIS.len() {
        return ELLIPSIS[..max_len].to_string();
    }

    let mut out: String = s.chars().take(max_len - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}
