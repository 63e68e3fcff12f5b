mod edge_cases;
mod scenarios;

use super::{DecomposeOptions, Decomposition, decompose};
use crate::dom::{NodeId, Tree};
use crate::parser;
use crate::render::render_deck;

/// Render markdown and decompose it with default options.
fn decompose_markdown(markdown: &str) -> (Tree, Decomposition<NodeId>) {
    let deck = render_deck(&parser::parse(markdown));
    let mut tree = deck.tree;
    let out = decompose(&mut tree, &deck.slides, &DecomposeOptions::default());
    (tree, out)
}

/// Helper to build a figure-split slide by hand: a figure plus a paragraph
/// followed by a list with `items` entries.
fn split_slide(tree: &mut Tree, figure: &str, list_tag: &str, items: usize) -> NodeId {
    let section = tree.element("section");
    let fig = tree.element("figure");
    tree.set_attr(fig, "style", &format!("background-image:url('{figure}')"));
    tree.append(section, fig);

    let p = tree.element("p");
    let text = tree.text("Lead paragraph");
    tree.append(p, text);
    tree.append(section, p);

    let list = tree.element(list_tag);
    for i in 0..items {
        let li = tree.element("li");
        let text = tree.text(&format!("item {i}"));
        tree.append(li, text);
        tree.append(list, li);
    }
    tree.append(section, list);
    section
}

/// All `<li>` text found in the given pages, in page order.
fn item_texts(tree: &Tree, out: &Decomposition<NodeId>) -> Vec<String> {
    let mut texts = Vec::new();
    for page in &out.pages {
        collect_items(tree, page.content, &mut texts);
    }
    texts
}

fn collect_items(tree: &Tree, node: NodeId, out: &mut Vec<String>) {
    if tree.tag(node) == Some("li") {
        out.push(tree.text_content(node));
        return;
    }
    for child in tree.children(node) {
        collect_items(tree, *child, out);
    }
}

/// Assert every page index appears in exactly one header and headers cover `0..n`.
fn assert_header_coverage(out: &Decomposition<NodeId>) {
    let mut seen = vec![0usize; out.page_count()];
    for header in &out.headers {
        assert!(!header.pages.is_empty(), "empty header {header:?}");
        assert!(
            header.pages.windows(2).all(|w| w[0] < w[1]),
            "header pages not increasing: {:?}",
            header.pages
        );
        for page in &header.pages {
            seen[*page] += 1;
        }
    }
    assert!(
        seen.iter().all(|count| *count == 1),
        "page coverage counts: {seen:?}"
    );
}
