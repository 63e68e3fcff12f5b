pub mod css;
pub mod fit;

use crate::compact::{Chapter, Decomposition, Header, Page};
use crate::dom::{self, Document};

pub const ROOT_CLASS: &str = "pagedeck-mobile-root";
pub const HEADERS_CLASS: &str = "pagedeck-mobile-headers";
pub const PAGES_CLASS: &str = "pagedeck-mobile-pages";
pub const SIZER_CLASS: &str = "pagedeck-mobile-sizer";
pub const SPACER_CLASS: &str = "pagedeck-mobile-spacer";
pub const CONTENT_CLASS: &str = "pagedeck-mobile-content";
pub const FULL_CLASS: &str = "pagedeck-mobile-full";
pub const IFRAME_CLASS: &str = "pagedeck-mobile-iframe";
pub const CHAPTERS_CLASS: &str = "pagedeck-mobile-chapters";
pub const SCRUBBER_CLASS: &str = "pagedeck-mobile-scrubber";
pub const HANDLE_CLASS: &str = "pagedeck-mobile-scrubber-handle";
pub const LABEL_CLASS: &str = "pagedeck-mobile-scrubber-label";

/// Stylesheet for the mobile view. Font sizes derive from
/// [`fit::FONT_SIZE_PROPERTY`].
pub const STYLESHEET: &str = include_str!("mobile.css");

/// Permissions granted to embedded iframe pages.
pub const IFRAME_ALLOW: &str = "camera; microphone; xr-spatial-tracking; speaker-selection";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chapter_nav: bool,
    pub scrubber: bool,
    /// Iframe width as a percentage of the viewport width.
    pub iframe_width_vw: u32,
    /// Iframe aspect ratio as (width, height).
    pub iframe_aspect: (u32, u32),
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            chapter_nav: true,
            scrubber: true,
            iframe_width_vw: 90,
            iframe_aspect: (16, 9),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scrubber<N> {
    pub track: N,
    pub handle: N,
    pub label: N,
}

/// Handles into the built view. Chrome that was not built is `None`.
#[derive(Debug, Clone)]
pub struct MobileView<N> {
    pub root: N,
    pub headers: N,
    pub pages: N,
    pub sizer: N,
    pub sizer_content: N,
    pub chapter_links: Vec<N>,
    pub scrubber: Option<Scrubber<N>>,
}

/// Build the mobile view. Page contents are moved into the page strip, where
/// page `i` sits at scroll offset `i * page_width`.
pub fn build<D: Document>(
    doc: &mut D,
    deck: &Decomposition<D::Node>,
    options: &BuildOptions,
) -> MobileView<D::Node> {
    let root = dom::create_with_class(doc, "div", ROOT_CLASS);

    let headers = dom::create_with_class(doc, "div", HEADERS_CLASS);
    doc.append_child(&root, &headers);
    for header in &deck.headers {
        let el = header_element(doc, header);
        doc.append_child(&headers, &el);
    }

    let pages = dom::create_with_class(doc, "div", PAGES_CLASS);
    doc.append_child(&root, &pages);

    let sizer = dom::create_with_class(doc, "section", SIZER_CLASS);
    add_spacer(doc, &sizer);
    let sizer_content = dom::create_with_class(doc, "div", CONTENT_CLASS);
    doc.append_child(&sizer, &sizer_content);
    doc.append_child(&pages, &sizer);

    for (index, page) in deck.pages.iter().enumerate() {
        let el = page_element(doc, page, index, options);
        doc.append_child(&pages, &el);
    }

    let chapters = deck.chapters();
    let chapter_links = if options.chapter_nav && !chapters.is_empty() {
        let nav = dom::create_with_class(doc, "nav", CHAPTERS_CLASS);
        let links = chapters
            .iter()
            .map(|chapter| {
                let link = chapter_link(doc, chapter);
                doc.append_child(&nav, &link);
                link
            })
            .collect();
        doc.append_child(&root, &nav);
        links
    } else {
        Vec::new()
    };

    let scrubber = (options.scrubber && deck.page_count() > 1).then(|| {
        let track = dom::create_with_class(doc, "div", SCRUBBER_CLASS);
        let handle = dom::create_with_class(doc, "div", HANDLE_CLASS);
        let label = dom::create_with_class(doc, "span", LABEL_CLASS);
        doc.append_child(&handle, &label);
        doc.append_child(&track, &handle);
        doc.append_child(&root, &track);
        Scrubber {
            track,
            handle,
            label,
        }
    });

    log::debug!(
        "built mobile view: {} headers, {} pages, {} chapters",
        deck.headers.len(),
        deck.page_count(),
        chapter_links.len()
    );

    MobileView {
        root,
        headers,
        pages,
        sizer,
        sizer_content,
        chapter_links,
        scrubber,
    }
}

fn header_element<D: Document>(doc: &mut D, header: &Header) -> D::Node {
    let el = doc.create_element("section");
    let pages: Vec<String> = header.pages.iter().map(usize::to_string).collect();
    doc.set_attribute(&el, "data-pages", &pages.join(","));

    if let Some(title) = &header.title {
        let h1 = doc.create_element("h1");
        let text = doc.create_text(title);
        doc.append_child(&h1, &text);
        doc.append_child(&el, &h1);
    }
    if let Some(figure) = &header.figure {
        let img = doc.create_element("img");
        doc.set_attribute(&img, "src", figure);
        doc.set_attribute(&img, "alt", "");
        doc.append_child(&el, &img);
    }
    el
}

fn page_element<D: Document>(
    doc: &mut D,
    page: &Page<D::Node>,
    index: usize,
    options: &BuildOptions,
) -> D::Node {
    let section = doc.create_element("section");
    doc.set_attribute(&section, "data-page", &index.to_string());

    if let Some(src) = &page.iframe {
        doc.set_attribute(&section, "class", IFRAME_CLASS);
        let frame = doc.create_element("iframe");
        let (w, h) = options.iframe_aspect;
        let width = options.iframe_width_vw;
        doc.set_attribute(&frame, "src", src);
        doc.set_attribute(&frame, "allow", IFRAME_ALLOW);
        doc.set_attribute(&frame, "allowfullscreen", "");
        doc.set_attribute(
            &frame,
            "style",
            &format!("width:{width}vw;height:calc({width}vw * {h} / {w});"),
        );
        doc.append_child(&section, &frame);
        return section;
    }

    if page.full_bleed {
        doc.set_attribute(&section, "class", FULL_CLASS);
        doc.append_child(&section, &page.content);
        return section;
    }

    add_spacer(doc, &section);
    let content = dom::create_with_class(doc, "div", CONTENT_CLASS);
    doc.append_child(&content, &page.content);
    doc.append_child(&section, &content);
    section
}

fn chapter_link<D: Document>(doc: &mut D, chapter: &Chapter) -> D::Node {
    let link = doc.create_element("a");
    doc.set_attribute(&link, "data-page", &chapter.first_page.to_string());
    doc.set_attribute(&link, "data-end", &chapter.end_page.to_string());
    let text = doc.create_text(&chapter.title);
    doc.append_child(&link, &text);
    link
}

fn add_spacer<D: Document>(doc: &mut D, parent: &D::Node) {
    let spacer = dom::create_with_class(doc, "div", SPACER_CLASS);
    let nbsp = doc.create_text("\u{a0}");
    doc.append_child(&spacer, &nbsp);
    doc.append_child(parent, &spacer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::{DecomposeOptions, decompose};
    use crate::dom::{NodeId, Tree};
    use crate::parser;
    use crate::render::render_deck;

    fn build_markdown(markdown: &str, options: &BuildOptions) -> (Tree, MobileView<NodeId>) {
        let deck = render_deck(&parser::parse(markdown));
        let mut tree = deck.tree;
        let out = decompose(&mut tree, &deck.slides, &DecomposeOptions::default());
        let view = build(&mut tree, &out, options);
        (tree, view)
    }

    fn classes(tree: &Tree, nodes: &[NodeId]) -> Vec<Option<String>> {
        nodes
            .iter()
            .map(|n| tree.attr(*n, "class").map(str::to_string))
            .collect()
    }

    const DECK: &str = "@chapter: One\n# Cover\n\n---\n\n# Story\n\n![bg](f.png)\n\nFirst.\n\nSecond.";

    #[test]
    fn test_strips_and_sizer() {
        let (tree, view) = build_markdown(DECK, &BuildOptions::default());

        let headers = tree.children(view.headers);
        assert_eq!(headers.len(), 2);
        assert_eq!(tree.attr(headers[0], "data-pages"), Some("0"));
        assert_eq!(tree.attr(headers[1], "data-pages"), Some("1,2"));

        let pages = tree.children(view.pages);
        // sizer first, then one section per page
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0], view.sizer);
        assert_eq!(tree.attr(pages[1], "data-page"), Some("0"));
        assert_eq!(tree.attr(pages[3], "data-page"), Some("2"));
    }

    #[test]
    fn test_full_bleed_pages_have_no_chrome() {
        let (tree, view) = build_markdown(DECK, &BuildOptions::default());
        let pages = tree.children(view.pages).to_vec();

        assert_eq!(tree.attr(pages[1], "class"), Some(FULL_CLASS));
        let inner = classes(&tree, tree.children(pages[1]));
        assert!(
            !inner.iter().flatten().any(|c| c == SPACER_CLASS || c == CONTENT_CLASS),
            "full-bleed page got chrome: {inner:?}"
        );

        let split = classes(&tree, tree.children(pages[2]));
        assert_eq!(
            split,
            vec![Some(SPACER_CLASS.to_string()), Some(CONTENT_CLASS.to_string())]
        );
    }

    #[test]
    fn test_header_content() {
        let (tree, view) = build_markdown(DECK, &BuildOptions::default());
        let story = tree.children(view.headers)[1];
        let children = tree.children(story);
        assert_eq!(tree.tag(children[0]), Some("h1"));
        assert_eq!(tree.text_content(children[0]), "Story");
        assert_eq!(tree.attr(children[1], "src"), Some("f.png"));
    }

    #[test]
    fn test_optional_chrome() {
        let (tree, view) = build_markdown(DECK, &BuildOptions::default());
        assert_eq!(view.chapter_links.len(), 1);
        assert_eq!(tree.attr(view.chapter_links[0], "data-end"), Some("3"));
        assert!(view.scrubber.is_some());

        let minimal = BuildOptions {
            chapter_nav: false,
            scrubber: false,
            ..BuildOptions::default()
        };
        let (_, view) = build_markdown(DECK, &minimal);
        assert!(view.chapter_links.is_empty());
        assert!(view.scrubber.is_none());
    }

    #[test]
    fn test_iframe_page() {
        let (tree, view) = build_markdown(
            "@iframe: https://example.com/demo\n# Demo",
            &BuildOptions::default(),
        );
        let page = tree.children(view.pages)[1];
        assert_eq!(tree.attr(page, "class"), Some(IFRAME_CLASS));
        let frame = tree.children(page)[0];
        assert_eq!(tree.tag(frame), Some("iframe"));
        assert_eq!(tree.attr(frame, "allow"), Some(IFRAME_ALLOW));
        assert_eq!(
            tree.attr(frame, "style"),
            Some("width:90vw;height:calc(90vw * 9 / 16);")
        );
        // a single page needs no scrubber
        assert!(view.scrubber.is_none());
    }
}
