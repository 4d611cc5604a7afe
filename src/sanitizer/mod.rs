//! Allow-list HTML sanitization.
//!
//! Untrusted rich content (CMS blocks, user-authored markup, form payloads)
//! must pass through [`sanitize`] before any renderer interprets it as
//! markup rather than escaped text. The pipeline parses the input into a
//! tolerant tree, enforces the [`Policy`] allow-list over tags and
//! attributes, and re-serializes with full output escaping.
//!
//! The entry points are total: no input, however malformed, produces an
//! error or a panic. Output is deterministic for identical input and
//! policy, and idempotent: re-sanitizing already-clean output is a no-op,
//! so rendering paths may apply it more than once defensively.

pub mod filter;
pub mod parser;
pub mod policy;
pub mod serializer;

pub use policy::{default_policy, Policy};

/// Sanitize `input` against `policy`.
pub fn sanitize(input: &str, policy: &Policy) -> String {
    if input.is_empty() {
        return String::new();
    }
    let tree = parser::parse(input, policy.max_depth);
    let tree = filter::filter(tree, policy);
    serializer::serialize(&tree)
}

/// Sanitize optional input; `None` yields an empty string.
pub fn sanitize_opt(input: Option<&str>, policy: &Policy) -> String {
    match input {
        Some(s) => sanitize(s, policy),
        None => String::new(),
    }
}

/// Sanitize against the built-in default policy.
pub fn sanitize_default(input: &str) -> String {
    sanitize(input, default_policy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_none() {
        assert_eq!(sanitize_default(""), "");
        assert_eq!(sanitize_opt(None, default_policy()), "");
        assert_eq!(sanitize_opt(Some("<p>x</p>"), default_policy()), "<p>x</p>");
    }

    #[test]
    fn test_pipeline_end_to_end() {
        assert_eq!(
            sanitize_default("<div onclick=\"evil()\">text</div>"),
            "<div>text</div>"
        );
        assert_eq!(
            sanitize_default("<custom><p>hello</p></custom>"),
            "<p>hello</p>"
        );
        assert_eq!(sanitize_default("<script>alert(1)</script>safe"), "safe");
    }

    #[test]
    fn test_deterministic() {
        let input = "<div class=\"a\"><p>x &amp; y</p><img src=\"i.png\"></div>";
        assert_eq!(sanitize_default(input), sanitize_default(input));
    }

    #[test]
    fn test_idempotent() {
        let input = "<custom><p onclick=\"x\">a &amp; b</p><script>bad()</script></custom>";
        let once = sanitize_default(input);
        assert_eq!(sanitize_default(&once), once);
    }
}
