//! Tolerant HTML parser.
//!
//! Converts arbitrary input into a tree of [`Node`]s without ever failing:
//! malformed markup degrades to text the way browser error recovery does.
//! Unterminated tags become literal text, stray `<` characters are kept as
//! text, close tags with no matching open element are discarded, and
//! elements still open at end of input are closed implicitly. The parser is
//! policy-agnostic; classification into allowed/forbidden happens in the
//! filter stage.
//!
//! Nesting is bounded by the `max_depth` argument. Once the open-element
//! stack reaches the bound, further open tags are not materialized as
//! elements; their source text becomes text nodes instead. This keeps the
//! tree depth bounded, so the recursive filter and serializer stages cannot
//! overflow the stack on adversarial input.

use tracing::{debug, warn};

/// A parsed markup node. The tree is ephemeral: built, filtered, and
/// serialized within a single sanitize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element {
        /// Tag name as spelled in the input; matching lowercases it.
        tag: String,
        /// Attributes in discovery order, first occurrence wins.
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
    Text(String),
    Comment(String),
}

/// Elements that never take a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching close tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

pub(crate) fn is_void(tag_lower: &str) -> bool {
    VOID_TAGS.contains(&tag_lower)
}

fn is_raw_text(tag_lower: &str) -> bool {
    RAW_TEXT_TAGS.contains(&tag_lower)
}

struct OpenElement {
    tag: String,
    lower: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl OpenElement {
    fn into_node(self) -> Node {
        Node::Element {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

struct ParsedTag {
    name: String,
    lower: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    /// Byte offset just past the closing `>`.
    end: usize,
}

/// Parse `input` into a forest of nodes. Total: always produces some tree.
pub fn parse(input: &str, max_depth: usize) -> Vec<Node> {
    let bytes = input.as_bytes();
    let mut roots: Vec<Node> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut text = String::new();
    let mut depth_warned = false;
    let mut pos = 0;

    while pos < input.len() {
        let Some(rel) = input[pos..].find('<') else {
            push_text(&mut text, &input[pos..]);
            break;
        };
        let lt = pos + rel;
        if rel > 0 {
            push_text(&mut text, &input[pos..lt]);
        }

        let rest = &bytes[lt + 1..];
        if rest.starts_with(b"!--") {
            // Comment: runs to `-->`, or to end of input
            flush_text(&mut text, &mut stack, &mut roots);
            let content_start = lt + 4;
            match input[content_start..].find("-->") {
                Some(end_rel) => {
                    let content = &input[content_start..content_start + end_rel];
                    append(Node::Comment(content.to_string()), &mut stack, &mut roots);
                    pos = content_start + end_rel + 3;
                }
                None => {
                    append(
                        Node::Comment(input[content_start..].to_string()),
                        &mut stack,
                        &mut roots,
                    );
                    pos = input.len();
                }
            }
        } else if matches!(rest.first(), Some(&b'!') | Some(&b'?')) {
            // Doctype, CDATA, or processing instruction: bogus comment to `>`
            flush_text(&mut text, &mut stack, &mut roots);
            match input[lt + 1..].find('>') {
                Some(end_rel) => {
                    let content = &input[lt + 2..lt + 1 + end_rel];
                    append(Node::Comment(content.to_string()), &mut stack, &mut roots);
                    pos = lt + 1 + end_rel + 1;
                }
                None => {
                    append(
                        Node::Comment(input[lt + 2..].to_string()),
                        &mut stack,
                        &mut roots,
                    );
                    pos = input.len();
                }
            }
        } else if rest.first() == Some(&b'/') && rest.get(1).is_some_and(|b| b.is_ascii_alphabetic())
        {
            match parse_close_tag(input, lt) {
                Some((name, end)) => {
                    flush_text(&mut text, &mut stack, &mut roots);
                    close_element(&name, &mut stack, &mut roots);
                    pos = end;
                }
                None => {
                    // No `>` before end of input: the fragment is text
                    push_text(&mut text, &input[lt..]);
                    pos = input.len();
                }
            }
        } else if rest.first().is_some_and(|b| b.is_ascii_alphabetic()) {
            match parse_open_tag(input, lt) {
                Some(tag) => {
                    let leaf = tag.self_closing || is_void(&tag.lower);
                    if !leaf && !is_raw_text(&tag.lower) && stack.len() >= max_depth {
                        if !depth_warned {
                            warn!(
                                "Security: nesting depth limit ({}) reached; flattening deeper structure to text",
                                max_depth
                            );
                            depth_warned = true;
                        }
                        push_text(&mut text, &input[lt..tag.end]);
                        pos = tag.end;
                    } else {
                        flush_text(&mut text, &mut stack, &mut roots);
                        pos = open_tag(input, tag, &mut stack, &mut roots);
                    }
                }
                None => {
                    push_text(&mut text, &input[lt..]);
                    pos = input.len();
                }
            }
        } else {
            // `<` with nothing tag-like after it is literal text
            text.push('<');
            pos = lt + 1;
        }
    }

    flush_text(&mut text, &mut stack, &mut roots);
    while let Some(open) = stack.pop() {
        let node = open.into_node();
        append(node, &mut stack, &mut roots);
    }
    roots
}

/// Materialize a parsed open tag, returning the next scan position.
fn open_tag(
    input: &str,
    tag: ParsedTag,
    stack: &mut Vec<OpenElement>,
    roots: &mut Vec<Node>,
) -> usize {
    if is_raw_text(&tag.lower) && !tag.self_closing {
        // Content runs to the matching close tag without markup
        // interpretation, so a script payload stays attached to its
        // (droppable) element instead of leaking into the tree.
        let close = format!("</{}", tag.lower);
        let (content_end, after) = match find_close_ci(input, tag.end, &close) {
            Some(close_start) => {
                let after = match input[close_start..].find('>') {
                    Some(r) => close_start + r + 1,
                    None => input.len(),
                };
                (close_start, after)
            }
            None => (input.len(), input.len()),
        };
        let content = &input[tag.end..content_end];
        let mut children = Vec::new();
        if !content.is_empty() {
            children.push(Node::Text(decode_entities(content)));
        }
        append(
            Node::Element {
                tag: tag.name,
                attrs: tag.attrs,
                children,
            },
            stack,
            roots,
        );
        return after;
    }

    if tag.self_closing || is_void(&tag.lower) {
        append(
            Node::Element {
                tag: tag.name,
                attrs: tag.attrs,
                children: Vec::new(),
            },
            stack,
            roots,
        );
        return tag.end;
    }

    stack.push(OpenElement {
        tag: tag.name,
        lower: tag.lower,
        attrs: tag.attrs,
        children: Vec::new(),
    });
    tag.end
}

fn append(node: Node, stack: &mut [OpenElement], roots: &mut Vec<Node>) {
    match stack.last_mut() {
        Some(open) => open.children.push(node),
        None => roots.push(node),
    }
}

fn push_text(buf: &mut String, raw: &str) {
    buf.push_str(&decode_entities(raw));
}

fn flush_text(text: &mut String, stack: &mut [OpenElement], roots: &mut Vec<Node>) {
    if !text.is_empty() {
        let t = std::mem::take(text);
        append(Node::Text(t), stack, roots);
    }
}

/// Pop the stack to the nearest element matching `name_lower`. Elements
/// popped on the way are closed implicitly; an unmatched close tag is
/// discarded.
fn close_element(name_lower: &str, stack: &mut Vec<OpenElement>, roots: &mut Vec<Node>) {
    if !stack.iter().any(|open| open.lower == name_lower) {
        debug!("Discarding close tag with no open element: </{}>", name_lower);
        return;
    }
    while let Some(open) = stack.pop() {
        let matched = open.lower == name_lower;
        append(open.into_node(), stack, roots);
        if matched {
            break;
        }
    }
}

fn parse_close_tag(input: &str, lt: usize) -> Option<(String, usize)> {
    let gt_rel = input[lt..].find('>')?;
    let end = lt + gt_rel;
    let name: String = input[lt + 2..end]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_'))
        .collect();
    Some((name.to_ascii_lowercase(), end + 1))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'-' | b'_')
}

/// Parse an open tag starting at the `<` at `lt`. Returns `None` when the
/// tag is not terminated before end of input, in which case the caller
/// treats the fragment as text.
fn parse_open_tag(input: &str, lt: usize) -> Option<ParsedTag> {
    let bytes = input.as_bytes();
    let mut pos = lt + 1;
    let name_start = pos;
    while pos < bytes.len() && is_name_byte(bytes[pos]) {
        pos += 1;
    }
    let name = &input[name_start..pos];

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        match bytes[pos] {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' => {
                pos += 1;
                if pos < bytes.len() && bytes[pos] == b'>' {
                    self_closing = true;
                    pos += 1;
                    break;
                }
                // stray slash inside the tag, skip it
            }
            _ => {
                let attr_start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && !matches!(bytes[pos], b'=' | b'>' | b'/')
                {
                    pos += 1;
                }
                if pos == attr_start {
                    // stray `=` with no attribute name
                    pos += 1;
                    continue;
                }
                let attr_name = &input[attr_start..pos];

                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                let mut value = String::new();
                if pos < bytes.len() && bytes[pos] == b'=' {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    if pos >= bytes.len() {
                        return None;
                    }
                    match bytes[pos] {
                        q @ (b'"' | b'\'') => {
                            pos += 1;
                            let v_start = pos;
                            while pos < bytes.len() && bytes[pos] != q {
                                pos += 1;
                            }
                            if pos >= bytes.len() {
                                // unterminated quote swallows the tag
                                return None;
                            }
                            value = decode_entities(&input[v_start..pos]);
                            pos += 1;
                        }
                        _ => {
                            let v_start = pos;
                            while pos < bytes.len()
                                && !bytes[pos].is_ascii_whitespace()
                                && bytes[pos] != b'>'
                            {
                                pos += 1;
                            }
                            value = decode_entities(&input[v_start..pos]);
                        }
                    }
                }
                if !attrs.iter().any(|(n, _)| n.eq_ignore_ascii_case(attr_name)) {
                    attrs.push((attr_name.to_string(), value));
                }
            }
        }
    }

    Some(ParsedTag {
        name: name.to_string(),
        lower: name.to_ascii_lowercase(),
        attrs,
        self_closing,
        end: pos,
    })
}

/// Case-insensitive search for a close-tag prefix (e.g. `</script`),
/// requiring a name boundary after the match so `</scripted>` does not
/// terminate a `script` element.
fn find_close_ci(input: &str, from: usize, needle_lower: &str) -> Option<usize> {
    let hay = input.as_bytes();
    let needle = needle_lower.as_bytes();
    if from >= hay.len() || hay.len() - from < needle.len() {
        return None;
    }
    let last = hay.len() - needle.len();
    for i in from..=last {
        if hay[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            match hay.get(i + needle.len()) {
                Some(b) if is_name_byte(*b) => continue,
                _ => return Some(i),
            }
        }
    }
    None
}

/// Decode the character references the serializer emits: the named set
/// `amp, lt, gt, quot, apos` and numeric references. Anything else is left
/// verbatim (its `&` gets escaped once on output, which is stable under
/// re-sanitization).
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while pos < input.len() {
        let Some(rel) = input[pos..].find('&') else {
            out.push_str(&input[pos..]);
            break;
        };
        let amp = pos + rel;
        out.push_str(&input[pos..amp]);
        match parse_reference(&input[amp..]) {
            Some((ch, len)) => {
                out.push(ch);
                pos = amp + len;
            }
            None => {
                out.push('&');
                pos = amp + 1;
            }
        }
    }
    out
}

fn parse_reference(s: &str) -> Option<(char, usize)> {
    let rest = &s[1..];
    if let Some(num) = rest.strip_prefix('#') {
        let (digits, radix, prefix_len) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (num, 10, 2),
        };
        let end = digits.find(';')?;
        if end == 0 || end > 8 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..end], radix).ok()?;
        let ch = match char::from_u32(code) {
            Some('\0') | None => '\u{FFFD}',
            Some(c) => c,
        };
        return Some((ch, prefix_len + end + 1));
    }
    for (name, ch) in [
        ("amp;", '&'),
        ("lt;", '<'),
        ("gt;", '>'),
        ("quot;", '"'),
        ("apos;", '\''),
    ] {
        if rest.starts_with(name) {
            return Some((ch, 1 + name.len()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn elem(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        Node::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    fn parse_default(input: &str) -> Vec<Node> {
        parse(input, crate::sanitizer::policy::DEFAULT_MAX_DEPTH)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_default("hello world"), vec![text("hello world")]);
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            parse_default("<p>hello</p>"),
            vec![elem("p", &[], vec![text("hello")])]
        );
    }

    #[test]
    fn test_attributes() {
        assert_eq!(
            parse_default(r#"<a href="x" target=_blank rel='nofollow' hidden>y</a>"#),
            vec![elem(
                "a",
                &[
                    ("href", "x"),
                    ("target", "_blank"),
                    ("rel", "nofollow"),
                    ("hidden", ""),
                ],
                vec![text("y")]
            )]
        );
    }

    #[test]
    fn test_duplicate_attribute_first_wins() {
        assert_eq!(
            parse_default(r#"<a href="first" HREF="second">x</a>"#),
            vec![elem("a", &[("href", "first")], vec![text("x")])]
        );
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        assert_eq!(parse_default("<div class=\"x"), vec![text("<div class=\"x")]);
        assert_eq!(parse_default("before<div"), vec![text("before<div")]);
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        assert_eq!(parse_default("a < b"), vec![text("a < b")]);
        assert_eq!(parse_default("1<2"), vec![text("1<2")]);
    }

    #[test]
    fn test_stray_close_tag_discarded() {
        assert_eq!(parse_default("a</div>b"), vec![text("a"), text("b")]);
    }

    #[test]
    fn test_implicit_close_at_eof() {
        assert_eq!(
            parse_default("<div><p>x"),
            vec![elem("div", &[], vec![elem("p", &[], vec![text("x")])])]
        );
    }

    #[test]
    fn test_mismatched_close_pops_through() {
        // </div> implicitly closes the still-open <p>
        assert_eq!(
            parse_default("<div><p>x</div>after"),
            vec![
                elem("div", &[], vec![elem("p", &[], vec![text("x")])]),
                text("after"),
            ]
        );
    }

    #[test]
    fn test_comment_node() {
        assert_eq!(
            parse_default("a<!-- note -->b"),
            vec![text("a"), Node::Comment(" note ".to_string()), text("b")]
        );
    }

    #[test]
    fn test_doctype_is_bogus_comment() {
        assert_eq!(
            parse_default("<!DOCTYPE html><p>x</p>"),
            vec![
                Node::Comment("DOCTYPE html".to_string()),
                elem("p", &[], vec![text("x")]),
            ]
        );
    }

    #[test]
    fn test_script_content_is_raw() {
        // The `<b>` inside script must not become an element
        let nodes = parse_default("<script>if (a < b) { alert('<b>') }</script>");
        assert_eq!(
            nodes,
            vec![elem(
                "script",
                &[],
                vec![text("if (a < b) { alert('<b>') }")]
            )]
        );
    }

    #[test]
    fn test_script_close_requires_name_boundary() {
        let nodes = parse_default("<script>a</scripted>b</script>");
        assert_eq!(
            nodes,
            vec![elem("script", &[], vec![text("a</scripted>b")])]
        );
    }

    #[test]
    fn test_unclosed_script_swallows_rest() {
        assert_eq!(
            parse_default("<script>alert(1)"),
            vec![elem("script", &[], vec![text("alert(1)")])]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        assert_eq!(
            parse_default("a<br>b<img src=\"x\">c"),
            vec![
                text("a"),
                elem("br", &[], vec![]),
                text("b"),
                elem("img", &[("src", "x")], vec![]),
                text("c"),
            ]
        );
        assert_eq!(
            parse_default("<svg><path d=\"M0 0\"/></svg>"),
            vec![elem("svg", &[], vec![elem("path", &[("d", "M0 0")], vec![])])]
        );
    }

    #[test]
    fn test_case_preserved_matching_insensitive() {
        assert_eq!(
            parse_default("<DIV Class=\"x\">t</div>"),
            vec![elem("DIV", &[("Class", "x")], vec![text("t")])]
        );
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(
            parse_default("a &amp; b &lt;c&gt; &#x27;d&#x27; &#65;"),
            vec![text("a & b <c> 'd' A")]
        );
        // Unknown references stay verbatim
        assert_eq!(parse_default("&nbsp;&bogus;"), vec![text("&nbsp;&bogus;")]);
        assert_eq!(
            parse_default("<a title=\"a &quot;b&quot;\">x</a>"),
            vec![elem("a", &[("title", "a \"b\"")], vec![text("x")])]
        );
    }

    #[test]
    fn test_nul_reference_replaced() {
        assert_eq!(parse_default("&#0;"), vec![text("\u{FFFD}")]);
    }

    #[test]
    fn test_depth_limit_flattens_structure() {
        let nodes = parse("<div><div><div>deep</div></div></div>", 2);
        assert_eq!(
            nodes,
            vec![elem(
                "div",
                &[],
                vec![elem("div", &[], vec![text("<div>deep")])]
            )]
        );
    }

    #[test]
    fn test_deeply_nested_input_is_bounded() {
        let mut input = String::new();
        for _ in 0..10_000 {
            input.push_str("<div>");
        }
        input.push_str("x");
        let nodes = parse(&input, crate::sanitizer::policy::DEFAULT_MAX_DEPTH);
        // Must return without exhausting the stack
        assert_eq!(nodes.len(), 1);
    }
}
