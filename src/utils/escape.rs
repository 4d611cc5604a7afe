// Escaping utilities

/// Escape plain text content (escape HTML entities)
/// Use this for text that should not contain any HTML at all; content that
/// is allowed to keep safe markup goes through the sanitizer instead
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('/', "&#x2F;")
        .trim()
        .to_string()
}
