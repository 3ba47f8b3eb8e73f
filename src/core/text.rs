//! Text shaping for notifications and terminal output
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.1.0
//!
//! ## Changelog
//! - 1.0.0: UTF-8 safe truncation and whitespace collapsing

/// Maximum notification title length in bytes
pub const TITLE_LIMIT: usize = 120;
/// Maximum notification body length in bytes
pub const BODY_LIMIT: usize = 480;

/// Truncate text to `max_len` bytes, adding ellipsis if needed (UTF-8 safe)
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    if max_len < 3 {
        return ".".repeat(max_len);
    }

    // Find a safe UTF-8 boundary
    let mut end = max_len - 3; // Room for "..."
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Truncate a notification title
pub fn truncate_for_title(text: &str) -> String {
    truncate_with_ellipsis(text, TITLE_LIMIT)
}

/// Truncate a notification body
pub fn truncate_for_body(text: &str) -> String {
    truncate_with_ellipsis(text, BODY_LIMIT)
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
