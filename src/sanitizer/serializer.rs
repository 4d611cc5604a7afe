//! Render a filtered tree back to markup.
//!
//! Text content and attribute values are entity-escaped so nothing that was
//! filtered out can be reintroduced through text and reinterpreted as markup
//! by a downstream renderer. Escaping here and entity decoding in the parser
//! are inverses over the emitted set, which is what makes sanitization
//! idempotent.

use super::parser::{is_void, Node};

/// Serialize a forest. Attribute order matches discovery order; void tags
/// are written without a closing tag, everything else balanced.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes);
    out
}

fn write_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        write_node(out, node);
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => escape_into(out, t),
        Node::Comment(_) => {}
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(out, value);
                out.push('"');
            }
            out.push('>');
            if !is_void(&tag.to_ascii_lowercase()) {
                write_nodes(out, children);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Escape for both text and double-quoted attribute contexts. NUL is
/// replaced with U+FFFD, matching what a spec-compliant parser would do.
fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\0' => out.push('\u{FFFD}'),
            _ => out.push(c),
        }
    }
}
