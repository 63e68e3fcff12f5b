use crate::dom::{NodeId, Tree};
use crate::parser::Slide;

pub const ATTR_CHAPTER: &str = "data-chapter";
pub const ATTR_IFRAME: &str = "data-iframe";
pub const ATTR_SKIP: &str = "data-skip";
pub const ATTR_SKIP_MOBILE: &str = "data-skip-mobile";
pub const ATTR_LIST_SPLIT: &str = "data-list-split";
pub const ATTR_LIST_SPLITS: &str = "data-list-splits";

pub fn annotate(tree: &mut Tree, section: NodeId, slide: &Slide) {
    for (directive, attr) in [("chapter", ATTR_CHAPTER), ("iframe", ATTR_IFRAME)] {
        if let Some(value) = slide.directive(directive).filter(|v| !v.is_empty()) {
            tree.set_attr(section, attr, value);
        }
    }

    for (directive, attr) in [("skip", ATTR_SKIP), ("skip_mobile", ATTR_SKIP_MOBILE)] {
        if slide.directive(directive) == Some("true") {
            tree.set_attr(section, attr, "true");
        }
    }

    if let Some(split) = slide
        .directive("list_split")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n != 0)
    {
        tree.set_attr(section, ATTR_LIST_SPLIT, &split.to_string());
    }

    if let Some(splits) = slide.directive("list_splits").map(str::trim) {
        if !splits.is_empty() {
            tree.set_attr(section, ATTR_LIST_SPLITS, splits);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser;
    use crate::render::render_deck;

    use super::*;

    fn attrs_of(markdown: &str) -> Vec<(String, String)> {
        let deck = render_deck(&parser::parse(markdown));
        deck.tree
            .attrs(deck.slides[0])
            .iter()
            .filter(|(k, _)| k.starts_with("data-") && k != "data-slide")
            .cloned()
            .collect()
    }

    #[test]
    fn test_writes_truthy_directives() {
        let attrs = attrs_of(
            "@chapter: Origins\n@iframe: https://example.com\n@skip_mobile: true\n@list_split: 3\n@list_splits: 3, 4\n# T",
        );
        let get = |k: &str| attrs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());
        assert_eq!(get(ATTR_CHAPTER), Some("Origins"));
        assert_eq!(get(ATTR_IFRAME), Some("https://example.com"));
        assert_eq!(get(ATTR_SKIP_MOBILE), Some("true"));
        assert_eq!(get(ATTR_LIST_SPLIT), Some("3"));
        assert_eq!(get(ATTR_LIST_SPLITS), Some("3, 4"));
        assert_eq!(get(ATTR_SKIP), None);
    }

    #[test]
    fn test_falsy_directives_leave_no_attribute() {
        let attrs = attrs_of("@skip: yes\n@skip_mobile: false\n@list_split: many\n@chapter:\n# T");
        assert!(attrs.is_empty(), "unexpected attributes: {attrs:?}");
    }

    #[test]
    fn test_zero_list_split_is_dropped() {
        assert!(attrs_of("@list_split: 0\n# T").is_empty());
    }
}
