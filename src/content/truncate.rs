/// Cuts `text` to at most `max_chars` characters
///
/// Counts Unicode scalar values, so a cut never lands inside a UTF-8
/// sequence. It can still separate a base character from a following
/// combining mark. No word-boundary adjustment is made.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Applies an optional bound, leaving the text untouched when unset
pub fn truncate_opt(text: String, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(limit) => truncate_chars(&text, limit),
        None => text,
    }
}
