use std::collections::HashSet;
use std::sync::OnceLock;

/// Nesting depth applied when a policy does not override it. Structure nested
/// deeper than this is flattened to escaped text instead of being descended
/// into, which also bounds recursion in the filter and serializer.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tags permitted in output under the default policy.
pub(crate) const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "p", "br", "ul", "ol", "li", "blockquote", "hr", "h1",
    "h2", "h3", "h4", "h5", "h6", "span", "div", "img", "table", "thead", "tbody", "tr", "th",
    "td", "pre", "code", "svg", "g", "path", "rect", "circle", "line", "polyline", "polygon",
    "defs", "clipPath", "mask", "title", "desc", "use",
];

/// Attributes permitted on any allowed tag under the default policy.
pub(crate) const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &[
    "href",
    "target",
    "rel",
    "src",
    "alt",
    "title",
    "width",
    "height",
    "class",
    "id",
    "viewBox",
    "fill",
    "stroke",
    "stroke-width",
    "stroke-linecap",
    "stroke-linejoin",
    "d",
    "x",
    "y",
    "cx",
    "cy",
    "r",
    "x1",
    "y1",
    "x2",
    "y2",
    "points",
    "transform",
    "preserveAspectRatio",
    "xmlns",
    "xmlns:xlink",
    "version",
    "aria-hidden",
    "focusable",
    "role",
    "opacity",
    "xlink:href",
];

/// Tags always dropped together with their entire subtree.
pub(crate) const DEFAULT_FORBIDDEN_TAGS: &[&str] = &[
    "script", "iframe", "object", "embed", "link", "meta", "form", "input", "button", "textarea",
    "select",
];

/// Attributes always stripped, even on allowed tags. Event handlers are also
/// caught structurally by their `on` prefix; listing the common ones here
/// keeps the contract explicit.
pub(crate) const DEFAULT_FORBIDDEN_ATTRIBUTES: &[&str] = &[
    "style",
    "onerror",
    "onload",
    "onclick",
    "onmouseover",
    "onfocus",
    "onpointerover",
];

/// URL schemes accepted in link attributes under the default policy.
pub(crate) const DEFAULT_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Immutable sanitization policy.
///
/// Constructed once (typically at process start) and shared by reference
/// across any number of concurrent `sanitize` calls. Tag and attribute sets
/// hold lowercase names; matching is ASCII-case-insensitive. The forbidden
/// sets take precedence over the allowed sets on conflict.
#[derive(Debug, Clone)]
pub struct Policy {
    pub allowed_tags: HashSet<String>,
    pub allowed_attributes: HashSet<String>,
    /// Tags whose subtree is removed outright, never unwrapped.
    pub forbidden_tags: HashSet<String>,
    /// Attributes stripped unconditionally, even on allowed tags.
    pub forbidden_attributes: HashSet<String>,
    /// When false, any `data-*` attribute is stripped.
    pub allow_data_attributes: bool,
    /// When `Some`, URL-bearing attributes (`href`, `src`, `xlink:href`)
    /// must carry one of these schemes or be relative; when `None`, values
    /// pass through with no scheme check.
    pub url_schemes: Option<HashSet<String>>,
    /// Nesting bound; structure deeper than this is flattened to text.
    pub max_depth: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            allowed_tags: lower_set(DEFAULT_ALLOWED_TAGS),
            allowed_attributes: lower_set(DEFAULT_ALLOWED_ATTRIBUTES),
            forbidden_tags: lower_set(DEFAULT_FORBIDDEN_TAGS),
            forbidden_attributes: lower_set(DEFAULT_FORBIDDEN_ATTRIBUTES),
            allow_data_attributes: false,
            url_schemes: Some(lower_set(DEFAULT_URL_SCHEMES)),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn lower_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_ascii_lowercase()).collect()
}

/// Process-wide default policy, constructed on first use.
pub fn default_policy() -> &'static Policy {
    static DEFAULT: OnceLock<Policy> = OnceLock::new();
    DEFAULT.get_or_init(Policy::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_contents() {
        let policy = default_policy();

        assert!(policy.allowed_tags.contains("p"));
        assert!(policy.allowed_tags.contains("svg"));
        // Mixed-case names are stored lowercase
        assert!(policy.allowed_tags.contains("clippath"));
        assert!(policy.allowed_attributes.contains("viewbox"));
        assert!(policy.allowed_attributes.contains("xlink:href"));

        assert!(policy.forbidden_tags.contains("script"));
        assert!(policy.forbidden_tags.contains("iframe"));
        assert!(policy.forbidden_attributes.contains("style"));
        assert!(policy.forbidden_attributes.contains("onclick"));

        assert!(!policy.allow_data_attributes);
        assert_eq!(policy.max_depth, DEFAULT_MAX_DEPTH);

        let schemes = policy.url_schemes.as_ref().unwrap();
        assert!(schemes.contains("https"));
        assert!(!schemes.contains("javascript"));
    }

    #[test]
    fn test_default_policy_is_shared() {
        let a = default_policy() as *const Policy;
        let b = default_policy() as *const Policy;
        assert_eq!(a, b);
    }
}
