use crate::dom::{self, Document};

/// Resolve the image URL of a slide figure: the inline `background-image`
/// first, then a nested `<img src>`.
pub fn figure_url<D: Document>(doc: &D, figure: &D::Node) -> Option<String> {
    doc.attribute(figure, "style")
        .and_then(|style| background_image(&style))
        .or_else(|| {
            dom::find_tag(doc, figure, "img")
                .and_then(|img| doc.attribute(&img, "src"))
                .filter(|src| !src.trim().is_empty())
        })
}

/// Extract the URL from a `background-image` declaration in an inline style.
pub fn background_image(style: &str) -> Option<String> {
    let declaration = style
        .split(';')
        .find(|part| part.trim_start().starts_with("background-image"))?;
    let (_, value) = declaration.split_once(':')?;
    let value = value.trim();
    let value = value
        .strip_prefix("url(")
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);
    let url = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    (!url.is_empty() && url != "none").then(|| url.to_string())
}
