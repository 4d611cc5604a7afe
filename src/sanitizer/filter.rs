//! Policy enforcement over the parse tree.
//!
//! Pre-order, depth-first walk. Forbidden tags are dropped together with
//! their entire subtree (their content must not leak into the output, not
//! even as text). Tags that are merely unknown to the policy are unwrapped:
//! the tag goes away, its filtered children are spliced in its place.
//! Comments never survive. The forbidden check runs first, so a name listed
//! in both sets is still dropped.

use std::collections::HashSet;

use tracing::{debug, warn};
use url::Url;

use super::parser::Node;
use super::policy::Policy;

/// Attributes whose values name a resource and are subject to the policy's
/// URL scheme check.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "xlink:href"];

/// Apply `policy` to a parsed forest. Tree depth is bounded by the parser,
/// so the recursion here is bounded too.
pub fn filter(nodes: Vec<Node>, policy: &Policy) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) => out.push(Node::Text(t)),
            Node::Comment(_) => {}
            Node::Element {
                tag,
                attrs,
                children,
            } => {
                let lower = tag.to_ascii_lowercase();
                if policy.forbidden_tags.contains(&lower) {
                    debug!("Dropping forbidden element <{}> and its subtree", lower);
                    continue;
                }
                if !policy.allowed_tags.contains(&lower) {
                    // Unwrap: keep the harmless content, lose the tag
                    out.extend(filter(children, policy));
                    continue;
                }
                out.push(Node::Element {
                    tag,
                    attrs: filter_attrs(attrs, policy),
                    children: filter(children, policy),
                });
            }
        }
    }
    out
}

fn filter_attrs(attrs: Vec<(String, String)>, policy: &Policy) -> Vec<(String, String)> {
    attrs
        .into_iter()
        .filter(|(name, value)| keep_attribute(name, value, policy))
        .collect()
}

fn keep_attribute(name: &str, value: &str, policy: &Policy) -> bool {
    let lower = name.to_ascii_lowercase();
    // Event handlers are stripped no matter what the policy says
    if lower.starts_with("on") {
        return false;
    }
    if policy.forbidden_attributes.contains(&lower) {
        return false;
    }
    if !policy.allowed_attributes.contains(&lower) {
        return false;
    }
    if !policy.allow_data_attributes && lower.starts_with("data-") {
        return false;
    }
    if let Some(schemes) = &policy.url_schemes {
        if URL_ATTRIBUTES.contains(&lower.as_str()) && !scheme_permitted(value, schemes) {
            warn!("Security: stripped {} attribute with blocked URL scheme", lower);
            return false;
        }
    }
    true
}

/// Accept relative references and absolute URLs whose scheme is listed.
/// Values that fail to parse but still smuggle a scheme-like prefix are
/// rejected; over-stripping a link is cosmetic, under-stripping is not.
fn scheme_permitted(value: &str, schemes: &HashSet<String>) -> bool {
    let trimmed = value.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control());
    if trimmed.is_empty() {
        return true;
    }
    match Url::parse(trimmed) {
        Ok(url) => schemes.contains(url.scheme()),
        Err(_) => {
            let head = trimmed.split(['/', '?', '#']).next().unwrap_or("");
            !head.contains(':')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::parser::parse;
    use crate::sanitizer::policy::{default_policy, DEFAULT_MAX_DEPTH};

    fn filtered(input: &str) -> Vec<Node> {
        filter(parse(input, DEFAULT_MAX_DEPTH), default_policy())
    }

    fn tags_of(nodes: &[Node]) -> Vec<String> {
        let mut out = Vec::new();
        for node in nodes {
            if let Node::Element { tag, children, .. } = node {
                out.push(tag.to_ascii_lowercase());
                out.extend(tags_of(children));
            }
        }
        out
    }

    #[test]
    fn test_forbidden_subtree_dropped() {
        let nodes = filtered("<script>alert(1)</script>safe");
        assert_eq!(nodes, vec![Node::Text("safe".to_string())]);
    }

    #[test]
    fn test_forbidden_tag_with_allowed_descendants_dropped() {
        // Nothing inside a forbidden element survives, not even allowed tags
        let nodes = filtered("<form><p>inner</p></form>");
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_unknown_tag_unwrapped() {
        let nodes = filtered("<custom><p>hello</p></custom>");
        assert_eq!(tags_of(&nodes), vec!["p"]);
    }

    #[test]
    fn test_forbidden_wins_over_allowed() {
        let mut policy = Policy::default();
        policy.allowed_tags.insert("script".to_string());
        let nodes = filter(parse("<script>x</script>keep", DEFAULT_MAX_DEPTH), &policy);
        assert_eq!(nodes, vec![Node::Text("keep".to_string())]);
    }

    #[test]
    fn test_event_handler_stripped_even_if_allowed() {
        let mut policy = Policy::default();
        policy.allowed_attributes.insert("onclick".to_string());
        let nodes = filter(
            parse("<div onclick=\"evil()\">t</div>", DEFAULT_MAX_DEPTH),
            &policy,
        );
        match &nodes[0] {
            Node::Element { attrs, .. } => assert!(attrs.is_empty()),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_data_attributes_gated() {
        let nodes = filtered("<div data-x=\"1\" class=\"c\">t</div>");
        match &nodes[0] {
            Node::Element { attrs, .. } => {
                assert_eq!(attrs.len(), 1);
                assert_eq!(attrs[0].0, "class");
            }
            other => panic!("expected element, got {other:?}"),
        }

        let mut policy = Policy::default();
        policy.allow_data_attributes = true;
        policy.allowed_attributes.insert("data-x".to_string());
        let nodes = filter(parse("<div data-x=\"1\">t</div>", DEFAULT_MAX_DEPTH), &policy);
        match &nodes[0] {
            Node::Element { attrs, .. } => assert_eq!(attrs[0].0, "data-x"),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(filtered("a<!-- b -->c"),
            vec![Node::Text("a".to_string()), Node::Text("c".to_string())]);
    }

    #[test]
    fn test_scheme_permitted() {
        let schemes: HashSet<String> =
            ["http", "https"].iter().map(|s| s.to_string()).collect();

        assert!(scheme_permitted("https://example.com/a", &schemes));
        assert!(scheme_permitted("HTTP://EXAMPLE.COM", &schemes));
        assert!(scheme_permitted("/relative/path", &schemes));
        assert!(scheme_permitted("page.html?q=1", &schemes));
        assert!(scheme_permitted("#fragment", &schemes));
        assert!(scheme_permitted("//example.com/protocol-relative", &schemes));
        assert!(scheme_permitted("", &schemes));

        assert!(!scheme_permitted("javascript:alert(1)", &schemes));
        assert!(!scheme_permitted("JaVaScRiPt:alert(1)", &schemes));
        assert!(!scheme_permitted(" \t javascript:alert(1)", &schemes));
        assert!(!scheme_permitted("data:text/html,x", &schemes));
        assert!(!scheme_permitted("vbscript:x", &schemes));
    }

    #[test]
    fn test_javascript_href_stripped() {
        let nodes = filtered("<a href=\"javascript:alert(1)\">x</a>");
        match &nodes[0] {
            Node::Element { attrs, .. } => assert!(attrs.is_empty()),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_scheme_check_disabled_when_unrestricted() {
        let mut policy = Policy::default();
        policy.url_schemes = None;
        let nodes = filter(
            parse("<a href=\"javascript:alert(1)\">x</a>", DEFAULT_MAX_DEPTH),
            &policy,
        );
        match &nodes[0] {
            Node::Element { attrs, .. } => assert_eq!(attrs[0].0, "href"),
            other => panic!("expected element, got {other:?}"),
        }
    }
}
