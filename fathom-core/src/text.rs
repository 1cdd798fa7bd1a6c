//! Small text helpers shared by the agent and engine crates.

/// Truncate a string to at most `max_chars` characters, respecting char
/// boundaries. Returns the original slice when it is already short enough.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
