//! Oversized-message trimming.

/// Returns the trimmed replacement for `message` when it exceeds
/// `max_length` characters, or `None` when the message may ship as is.
///
/// The trimmed result is exactly `max_length` characters and ends with a
/// marker recording the applied limit, e.g. `...[trimmed to 8192 chars]`.
/// Lengths are counted in characters, not bytes, so multi-byte text never
/// gets cut mid-codepoint. The caller keeps the untouched original for the
/// fallback path.
pub fn trim_message(message: &str, max_length: usize) -> Option<String> {
    let suffix = format!("...[trimmed to {max_length} chars]");
    let suffix_len = suffix.chars().count();
    let message_len = message.chars().count();
    if message_len <= max_length || message_len <= suffix_len {
        return None;
    }
    let keep = max_length.saturating_sub(suffix_len);
    let mut trimmed: String = message.chars().take(keep).collect();
    trimmed.push_str(&suffix);
    Some(trimmed)
}
