use super::*;
use crate::compact::SplitPoints;

#[test]
fn empty_deck() {
    let (_, out) = decompose_markdown("");
    assert_eq!(out.page_count(), 0);
    assert!(out.headers.is_empty());
    assert!(out.chapters().is_empty());
}

#[test]
fn skip_keeps_slide_indices() {
    let (_, out) = decompose_markdown("# A\n\n---\n\n@skip: true\n# B\n\n---\n\n# C");
    let indices: Vec<_> = out.pages.iter().map(|p| p.slide_index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(out.headers.len(), 2);
}

#[test]
fn skip_false_is_not_skipped() {
    let (_, out) = decompose_markdown("@skip_mobile: false\n# A");
    assert_eq!(out.page_count(), 1);
}

#[test]
fn figure_without_text_contributes_nothing() {
    let (_, out) = decompose_markdown("# Only a picture\n\n![bg](f.png)\n\n---\n\n# Next");
    assert_eq!(out.page_count(), 1);
    assert_eq!(out.pages[0].slide_index, 1);
    assert_header_coverage(&out);
}

#[test]
fn source_slide_is_not_modified() {
    let mut tree = Tree::new();
    let slide = split_slide(&mut tree, "f.png", "ul", 7);
    let before = crate::dom::html::to_html(&tree, slide);

    let out = decompose(&mut tree, &[slide], &DecomposeOptions::default());
    assert_eq!(out.page_count(), 2);

    // mutate a page, then compare the source
    let extra = tree.element("p");
    tree.append(out.pages[0].content, extra);
    assert_eq!(crate::dom::html::to_html(&tree, slide), before);
}

#[test]
fn malformed_splits_fall_back_to_default() {
    let mut tree = Tree::new();
    let slide = split_slide(&mut tree, "f.png", "ul", 12);
    tree.set_attr(slide, "data-list-splits", "3,zero");
    let out = decompose(&mut tree, &[slide], &DecomposeOptions::default());
    // default [5]: 5 with the paragraph, 7 on the remainder page
    assert_eq!(out.page_count(), 2);
    assert_eq!(item_texts(&tree, &out).len(), 12);
}

#[test]
fn configured_default_split_is_used() {
    let mut tree = Tree::new();
    let slide = split_slide(&mut tree, "f.png", "ol", 6);
    let options = DecomposeOptions {
        default_splits: SplitPoints::single(2),
    };
    let out = decompose(&mut tree, &[slide], &options);
    assert_eq!(out.page_count(), 2);
    assert_eq!(tree.attr(out.pages[1].content, "start"), Some("3"));
}

#[test]
fn attributes_on_nested_section_are_read() {
    let mut tree = Tree::new();
    let outer = tree.element("div");
    let inner = split_slide(&mut tree, "f.png", "ul", 3);
    tree.set_attr(inner, "data-skip-mobile", "true");
    tree.append(outer, inner);
    let out = decompose(&mut tree, &[outer], &DecomposeOptions::default());
    assert_eq!(out.page_count(), 0);
}

#[test]
fn empty_list_after_paragraph_still_yields_paragraph_page() {
    let mut tree = Tree::new();
    let slide = split_slide(&mut tree, "f.png", "ul", 0);
    let out = decompose(&mut tree, &[slide], &DecomposeOptions::default());
    assert_eq!(out.page_count(), 1);
    assert!(tree.text_content(out.pages[0].content).contains("Lead paragraph"));
}

#[test]
fn untitled_figureless_groups_open_new_headers() {
    // a figure element with no resolvable image and no headings anywhere
    let mut tree = Tree::new();
    let mut slides = Vec::new();
    for _ in 0..2 {
        let section = tree.element("section");
        let figure = tree.element("figure");
        tree.append(section, figure);
        for text in ["a", "b"] {
            let p = tree.element("p");
            let t = tree.text(text);
            tree.append(p, t);
            tree.append(section, p);
        }
        slides.push(section);
    }
    let out = decompose(&mut tree, &slides, &DecomposeOptions::default());
    assert_eq!(out.headers.len(), 2);
    assert_eq!(out.headers[0].pages, vec![0, 1]);
    assert_eq!(out.headers[1].pages, vec![2, 3]);
}

#[test]
fn figureless_groups_with_same_title_share_a_header() {
    let (_, out) = decompose_markdown(
        "# Same\n\n![bg]()\n\nOne.\n\n---\n\n# Same\n\n![bg]()\n\nTwo.",
    );
    assert_eq!(out.headers.len(), 1);
    assert_eq!(out.headers[0].figure, None);
    assert_eq!(out.headers[0].pages, vec![0, 1]);
}

#[test]
fn loose_list_keeps_every_item() {
    // loose list items wrap their text in <p>
    let (tree, out) = decompose_markdown("# T\n\n![bg](f.png)\n\n- alpha\n\n- beta\n\n- gamma");
    assert_eq!(out.page_count(), 1);
    assert_eq!(tree.tag(out.pages[0].content), Some("ul"));
    let items: Vec<String> = item_texts(&tree, &out)
        .iter()
        .map(|t| t.trim().to_string())
        .collect();
    assert_eq!(items, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn paragraph_after_loose_list_sets_the_container() {
    let (tree, out) =
        decompose_markdown("![bg](f.png)\n\n- alpha\n\n- beta\n\nAfter the list.");
    let tags: Vec<_> = out.pages.iter().map(|p| tree.tag(p.content)).collect();
    assert_eq!(tags, vec![Some("ul"), Some("p")]);
}

#[test]
fn blockquote_and_code_become_pages() {
    let (tree, out) = decompose_markdown(
        "![bg](f.png)\n\n> quoted\n\n```rust\nfn main() {}\n```\n\n## not a page",
    );
    let tags: Vec<_> = out.pages.iter().map(|p| tree.tag(p.content)).collect();
    assert_eq!(tags, vec![Some("blockquote"), Some("pre")]);
}
