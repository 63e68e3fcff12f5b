pub mod annotate;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::dom::{NodeId, Tree};
use crate::parser::{Presentation, Slide};

/// A rendered deck: one tree holding every slide root, in deck order.
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub tree: Tree,
    pub slides: Vec<NodeId>,
}

pub fn render_deck(presentation: &Presentation) -> RenderedDeck {
    let mut tree = Tree::new();
    let slides = presentation
        .slides
        .iter()
        .map(|slide| render_slide(&mut tree, slide))
        .collect();
    RenderedDeck { tree, slides }
}

/// Render one slide into `tree` and return its detached `<section>` root.
pub fn render_slide(tree: &mut Tree, slide: &Slide) -> NodeId {
    let section = tree.element("section");
    tree.set_attr(section, "id", &(slide.index + 1).to_string());
    tree.set_attr(section, "data-slide", &slide.index.to_string());

    let mut builder = SlideBuilder::new(tree, section);
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    for event in Parser::new_ext(&slide.body, options) {
        builder.event(event);
    }
    let figures = builder.finish();

    // figures lead the slide so the text container stays a clean run of blocks
    let content: Vec<NodeId> = tree.children(section).to_vec();
    for child in &content {
        tree.detach(*child);
    }
    for figure in figures.into_iter().chain(content) {
        tree.append(section, figure);
    }

    annotate::annotate(tree, section, slide);
    section
}

struct PendingImage {
    url: String,
    alt: String,
}

struct SlideBuilder<'a> {
    tree: &'a mut Tree,
    stack: Vec<NodeId>,
    image: Option<PendingImage>,
    figures: Vec<NodeId>,
}

impl<'a> SlideBuilder<'a> {
    fn new(tree: &'a mut Tree, root: NodeId) -> Self {
        Self {
            tree,
            stack: vec![root],
            image: None,
            figures: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        // the root is never popped
        self.stack[self.stack.len() - 1]
    }

    fn open(&mut self, tag: &str) -> NodeId {
        let el = self.tree.element(tag);
        let parent = self.current();
        self.tree.append(parent, el);
        self.stack.push(el);
        el
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn leaf(&mut self, tag: &str) {
        let el = self.tree.element(tag);
        let parent = self.current();
        self.tree.append(parent, el);
    }

    fn text(&mut self, text: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        let node = self.tree.text(text);
        let parent = self.current();
        self.tree.append(parent, node);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.open("code");
                self.text(&code);
                self.close();
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.leaf("br"),
            Event::Rule => self.leaf("hr"),
            Event::Html(html) | Event::InlineHtml(html) => {
                log::trace!("dropping raw html: {}", html.trim());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.open("p");
            }
            Tag::Heading { level, .. } => {
                self.open(heading_tag(level));
            }
            Tag::BlockQuote(_) => {
                self.open("blockquote");
            }
            Tag::CodeBlock(kind) => {
                self.open("pre");
                let code = self.open("code");
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.tree
                            .set_attr(code, "class", &format!("language-{lang}"));
                    }
                }
            }
            Tag::List(Some(start)) => {
                let ol = self.open("ol");
                if start != 1 {
                    self.tree.set_attr(ol, "start", &start.to_string());
                }
            }
            Tag::List(None) => {
                self.open("ul");
            }
            Tag::Item => {
                self.open("li");
            }
            Tag::Emphasis => {
                self.open("em");
            }
            Tag::Strong => {
                self.open("strong");
            }
            Tag::Strikethrough => {
                self.open("del");
            }
            Tag::Link { dest_url, .. } => {
                let a = self.open("a");
                self.tree.set_attr(a, "href", &dest_url);
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some(PendingImage {
                    url: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Table(_) => {
                self.open("table");
            }
            Tag::TableHead => {
                self.open("thead");
            }
            Tag::TableRow => {
                self.open("tr");
            }
            Tag::TableCell => {
                self.open("td");
            }
            _ => {
                // unsupported containers still need a stack frame for their end tag
                self.open("div");
            }
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.finish_image(image);
                }
            }
            TagEnd::CodeBlock => {
                self.close();
                self.close();
            }
            _ => self.close(),
        }
    }

    fn finish_image(&mut self, image: PendingImage) {
        let alt = image.alt.trim();
        if alt == "bg" || alt.starts_with("bg ") {
            let figure = self.tree.element("figure");
            self.tree.set_attr(
                figure,
                "style",
                &format!("background-image:url(\"{}\");", image.url),
            );
            self.figures.push(figure);
        } else {
            let img = self.tree.element("img");
            self.tree.set_attr(img, "src", &image.url);
            self.tree.set_attr(img, "alt", alt);
            let parent = self.current();
            self.tree.append(parent, img);
        }
    }

    /// Drop paragraphs emptied by background images and return the figures.
    fn finish(mut self) -> Vec<NodeId> {
        let root = self.stack[0];
        let empty: Vec<NodeId> = self
            .tree
            .children(root)
            .iter()
            .copied()
            .filter(|child| {
                self.tree.tag(*child) == Some("p")
                    && self.tree.text_content(*child).trim().is_empty()
                    && self.tree.children(*child).iter().all(|c| self.tree.tag(*c).is_none())
            })
            .collect();
        for node in empty {
            self.tree.detach(node);
        }
        self.figures
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html::to_html;
    use crate::parser;

    fn render_one(markdown: &str) -> (Tree, NodeId) {
        let pres = parser::parse(markdown);
        let deck = render_deck(&pres);
        (deck.tree, deck.slides[0])
    }

    #[test]
    fn test_renders_blocks() {
        let (tree, root) = render_one("# Title\n\nSome *text*.\n\n1. one\n2. two");
        let tags: Vec<&str> = tree
            .children(root)
            .iter()
            .filter_map(|c| tree.tag(*c))
            .collect();
        assert_eq!(tags, vec!["h1", "p", "ol"]);
        assert!(to_html(&tree, root).contains("<em>text</em>"));
    }

    #[test]
    fn test_background_image_becomes_leading_figure() {
        let (tree, root) = render_one("# Title\n\n![bg right](https://example.com/a.jpg)\n\nBody");
        let first = tree.children(root)[0];
        assert_eq!(tree.tag(first), Some("figure"));
        assert_eq!(
            tree.attr(first, "style"),
            Some("background-image:url(\"https://example.com/a.jpg\");")
        );
        // the paragraph that only held the image is gone
        let paragraphs = tree
            .children(root)
            .iter()
            .filter(|c| tree.tag(**c) == Some("p"))
            .count();
        assert_eq!(paragraphs, 1);
    }

    #[test]
    fn test_inline_image_stays_inline() {
        let (tree, root) = render_one("![diagram](d.png)");
        let html = to_html(&tree, root);
        assert!(html.contains("<img src=\"d.png\" alt=\"diagram\">"));
    }

    #[test]
    fn test_ordered_list_start_is_kept() {
        let (tree, root) = render_one("3. three\n4. four");
        let ol = tree.children(root)[0];
        assert_eq!(tree.attr(ol, "start"), Some("3"));
    }

    #[test]
    fn test_slide_index_attributes() {
        let pres = parser::parse("# A\n\n---\n\n# B");
        let deck = render_deck(&pres);
        assert_eq!(deck.tree.attr(deck.slides[1], "data-slide"), Some("1"));
        assert_eq!(deck.tree.attr(deck.slides[1], "id"), Some("2"));
    }
}
