pub mod figure;
pub mod list_split;

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::dom::{self, Document};
use crate::render::annotate::{
    ATTR_CHAPTER, ATTR_IFRAME, ATTR_LIST_SPLIT, ATTR_LIST_SPLITS, ATTR_SKIP, ATTR_SKIP_MOBILE,
};

pub use list_split::SplitPoints;

const PARAGRAPH_TAGS: &[&str] = &["p", "blockquote", "pre"];
const LIST_TAGS: &[&str] = &["ul", "ol"];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// A run of consecutive pages shown under one figure or title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub title: Option<String>,
    /// First heading of the originating slide (h1 through h6).
    pub page_title: Option<String>,
    pub figure: Option<String>,
    /// Global page indices, strictly increasing.
    pub pages: Vec<usize>,
    #[serde(skip)]
    key: HeaderKey,
}

impl Header {
    /// Label used for the document title and navigation entries.
    pub fn label(&self) -> Option<&str> {
        self.title.as_deref().or(self.page_title.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderKey {
    Figure(String),
    Title(String),
    Slide(usize),
}

/// One horizontally scrollable unit of reading content.
#[derive(Debug, Clone)]
pub struct Page<N> {
    /// Owned copy; never shares nodes with the source slide.
    pub content: N,
    pub slide_index: usize,
    pub page_within_slide: usize,
    pub full_bleed: bool,
    pub chapter: Option<String>,
    pub iframe: Option<String>,
}

/// A chapter of the deck: pages `first_page..end_page`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub first_page: usize,
    pub end_page: usize,
}

impl Chapter {
    pub fn contains(&self, position: f64) -> bool {
        position >= self.first_page as f64 && position < self.end_page as f64
    }
}

#[derive(Debug, Clone)]
pub struct Decomposition<N> {
    pub headers: Vec<Header>,
    pub pages: Vec<Page<N>>,
}

impl<N> Decomposition<N> {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the header owning each page, indexed by page.
    pub fn header_index(&self) -> Vec<usize> {
        let mut owners = vec![0; self.pages.len()];
        for (h, header) in self.headers.iter().enumerate() {
            for page in &header.pages {
                owners[*page] = h;
            }
        }
        owners
    }

    /// Label for a page: its header's label, else the page's chapter.
    pub fn page_label(&self, page: usize) -> Option<&str> {
        let header = self.headers.iter().find(|h| h.pages.contains(&page));
        header
            .and_then(Header::label)
            .or_else(|| self.pages.get(page).and_then(|p| p.chapter.as_deref()))
    }

    /// Chapters in page order. A chapter starts at every page whose chapter
    /// marker differs from the running one.
    pub fn chapters(&self) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = Vec::new();
        for (index, page) in self.pages.iter().enumerate() {
            let Some(title) = &page.chapter else { continue };
            if chapters.last().is_some_and(|c| &c.title == title) {
                continue;
            }
            if let Some(previous) = chapters.last_mut() {
                previous.end_page = index;
            }
            chapters.push(Chapter {
                title: title.clone(),
                first_page: index,
                end_page: self.pages.len(),
            });
        }
        chapters
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecomposeOptions {
    /// Split points used when a slide carries no (valid) list split directive.
    pub default_splits: SplitPoints,
}

/// Decompose rendered slide roots into headers and pages.
///
/// Page indices are positions in `pages` and double as scroll coordinates in
/// the mobile view. The source slides are only read and cloned, never modified.
pub fn decompose<D: Document>(
    doc: &mut D,
    slides: &[D::Node],
    options: &DecomposeOptions,
) -> Decomposition<D::Node> {
    let mut out = Decomposition {
        headers: Vec::new(),
        pages: Vec::new(),
    };

    for (slide_index, slide) in slides.iter().enumerate() {
        let flag = |name: &str| slide_attr(doc, slide, name).as_deref() == Some("true");
        if flag(ATTR_SKIP) || flag(ATTR_SKIP_MOBILE) {
            log::debug!("slide {slide_index}: skipped");
            continue;
        }

        let context = SlideContext {
            slide_index,
            chapter: slide_attr(doc, slide, ATTR_CHAPTER),
            iframe: slide_attr(doc, slide, ATTR_IFRAME),
            page_title: heading_title(doc, slide),
        };

        match dom::find_tag(doc, slide, "figure") {
            Some(figure) => decompose_split(doc, slide, &figure, &context, options, &mut out),
            None => {
                let content = doc.clone_subtree(slide);
                let index = out.pages.len();
                out.pages.push(context.page(content, 0, true));
                out.headers.push(Header {
                    title: None,
                    page_title: context.page_title.clone(),
                    figure: None,
                    pages: vec![index],
                    key: HeaderKey::Slide(slide_index),
                });
            }
        }
    }

    log::debug!(
        "decomposed {} slides into {} pages under {} headers",
        slides.len(),
        out.pages.len(),
        out.headers.len()
    );
    out
}

struct SlideContext {
    slide_index: usize,
    chapter: Option<String>,
    iframe: Option<String>,
    page_title: Option<String>,
}

impl SlideContext {
    fn page<N>(&self, content: N, page_within_slide: usize, full_bleed: bool) -> Page<N> {
        Page {
            content,
            slide_index: self.slide_index,
            page_within_slide,
            full_bleed,
            chapter: self.chapter.clone(),
            iframe: self.iframe.clone(),
        }
    }
}

fn decompose_split<D: Document>(
    doc: &mut D,
    slide: &D::Node,
    figure: &D::Node,
    context: &SlideContext,
    options: &DecomposeOptions,
    out: &mut Decomposition<D::Node>,
) {
    let figure_url = figure::figure_url(doc, figure);
    let Some(container) = text_container(doc, slide) else {
        log::debug!(
            "slide {}: figure without text content, no pages",
            context.slide_index
        );
        return;
    };

    let title = dom::find_tag(doc, &container, "h1")
        .map(|h1| doc.text_content(&h1).trim().to_string())
        .filter(|t| !t.is_empty());
    let key = match (&figure_url, title.as_ref().or(context.page_title.as_ref())) {
        (Some(url), _) => HeaderKey::Figure(url.clone()),
        (None, Some(title)) => HeaderKey::Title(title.clone()),
        (None, None) => HeaderKey::Slide(context.slide_index),
    };

    let splits = SplitPoints::from_attributes(
        slide_attr(doc, slide, ATTR_LIST_SPLITS).as_deref(),
        slide_attr(doc, slide, ATTR_LIST_SPLIT).as_deref(),
        &options.default_splits,
    );

    let children = dom::element_children(doc, &container);
    let mut contents: Vec<D::Node> = Vec::new();
    let mut i = 0;
    while i < children.len() {
        let child = &children[i];
        let tag = doc.tag_name(child).unwrap_or_default();
        let is_paragraph = PARAGRAPH_TAGS.contains(&tag.as_str());
        let is_list = LIST_TAGS.contains(&tag.as_str());

        if is_paragraph {
            if let Some(list) = children.get(i + 1).filter(|next| is_list_node(doc, next)) {
                contents.extend(split_list(doc, child, list, &splits));
                i += 2;
                continue;
            }
        }
        if is_paragraph || is_list {
            contents.push(doc.clone_subtree(child));
        }
        i += 1;
    }

    for (page_within_slide, content) in contents.into_iter().enumerate() {
        let index = out.pages.len();
        out.pages
            .push(context.page(content, page_within_slide, false));
        match out.headers.last_mut() {
            Some(header) if header.key == key => header.pages.push(index),
            _ => out.headers.push(Header {
                title: title.clone(),
                page_title: context.page_title.clone(),
                figure: figure_url.clone(),
                pages: vec![index],
                key: key.clone(),
            }),
        }
    }
}

fn is_list_node<D: Document>(doc: &D, node: &D::Node) -> bool {
    doc.tag_name(node)
        .is_some_and(|tag| LIST_TAGS.contains(&tag.as_str()))
}

/// Pages for a paragraph immediately followed by a list: the paragraph with the
/// first chunk of items, then one standalone list per further chunk. Every item
/// lands on exactly one page.
fn split_list<D: Document>(
    doc: &mut D,
    paragraph: &D::Node,
    list: &D::Node,
    splits: &SplitPoints,
) -> Vec<D::Node> {
    let list_tag = doc.tag_name(list).unwrap_or_else(|| "ul".to_string());
    let base_start = doc
        .attribute(list, "start")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(1);
    let items: Vec<D::Node> = dom::element_children(doc, list)
        .into_iter()
        .filter(|item| dom::has_tag(doc, item, "li"))
        .collect();

    let mut pages = Vec::new();
    let lead = doc.create_element("div");
    let paragraph_copy = doc.clone_subtree(paragraph);
    doc.append_child(&lead, &paragraph_copy);

    for (n, range) in splits.chunks(items.len()).into_iter().enumerate() {
        let sublist = doc.create_element(&list_tag);
        let start = base_start + range.start as i64;
        doc.set_attribute(&sublist, "start", &start.to_string());
        for item in &items[range] {
            let copy = doc.clone_subtree(item);
            doc.append_child(&sublist, &copy);
        }
        if n == 0 {
            doc.append_child(&lead, &sublist);
            pages.push(lead.clone());
        } else {
            pages.push(sublist);
        }
    }

    if pages.is_empty() {
        // empty list: the paragraph still gets its page
        pages.push(lead);
    }
    pages
}

/// The element holding a split slide's text: the parent of the first
/// paragraph-level block outside the figure and outside any list, else the
/// parent of the first list.
fn text_container<D: Document>(doc: &D, slide: &D::Node) -> Option<D::Node> {
    first_parent_of(doc, slide, PARAGRAPH_TAGS).or_else(|| first_parent_of(doc, slide, LIST_TAGS))
}

fn first_parent_of<D: Document>(doc: &D, root: &D::Node, tags: &[&str]) -> Option<D::Node> {
    let mut stack: Vec<(D::Node, D::Node)> = dom::element_children(doc, root)
        .into_iter()
        .rev()
        .map(|child| (child, root.clone()))
        .collect();
    while let Some((node, parent)) = stack.pop() {
        let tag = doc.tag_name(&node).unwrap_or_default();
        if tags.contains(&tag.as_str()) {
            return Some(parent);
        }
        if tag == "figure" || LIST_TAGS.contains(&tag.as_str()) {
            continue;
        }
        stack.extend(
            dom::element_children(doc, &node)
                .into_iter()
                .rev()
                .map(|child| (child, node.clone())),
        );
    }
    None
}

/// First non-empty heading text, checking h1 through h6 in order.
fn heading_title<D: Document>(doc: &D, node: &D::Node) -> Option<String> {
    HEADING_TAGS.iter().find_map(|tag| {
        dom::find_tag(doc, node, tag)
            .map(|h| doc.text_content(&h).trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Read a directive attribute from the slide root, or from a `section` inside it.
fn slide_attr<D: Document>(doc: &D, slide: &D::Node, name: &str) -> Option<String> {
    doc.attribute(slide, name).or_else(|| {
        dom::find_descendant(doc, slide, |d, n| {
            dom::has_tag(d, n, "section") && d.attribute(n, name).is_some()
        })
        .and_then(|section| doc.attribute(&section, name))
    })
}
