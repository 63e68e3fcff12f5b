pub mod directives;
pub mod frontmatter;
pub mod splitter;

#[derive(Debug, Clone)]
pub struct Presentation {
    pub meta: PresentationMeta,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default)]
pub struct PresentationMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Slide {
    /// Position in the deck, counting every slide including skipped ones.
    pub index: usize,
    pub directives: Vec<Directive>,
    /// Markdown with directive lines removed.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub value: String,
}

impl Slide {
    /// Value of the named directive; the last occurrence wins.
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives
            .iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

pub fn parse(content: &str) -> Presentation {
    let (meta, body) = frontmatter::extract(content);
    let slides = splitter::split(&body)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let (directives, body) = directives::extract(&raw);
            Slide {
                index,
                directives,
                body,
            }
        })
        .collect();
    Presentation { meta, slides }
}
