use super::{NodeId, NodeKind, Tree};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialize the subtree rooted at `id` as HTML.
pub fn to_html(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out, false);
    out
}

/// Serialize as XHTML (void elements self-closed), for EPUB content documents.
pub fn to_xhtml(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out, true);
    out
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String, xhtml: bool) {
    match &tree.node(id).kind {
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                out.push_str(if xhtml { " />" } else { ">" });
                return;
            }
            out.push('>');
            for child in tree.children(id) {
                write_node(tree, *child, out, xhtml);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&#160;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
