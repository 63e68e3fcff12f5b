use super::*;

const THREE_SLIDES: &str = "\
# Welcome

---

# Origins

![bg right](https://example.com/map.jpg)

It started with a single idea.

- one
- two
- three
- four
- five
- six
- seven

---

@skip_mobile: true

# Desktop only

Nothing to see on a phone.
";

#[test]
fn title_figure_and_skipped_slide() {
    let (tree, out) = decompose_markdown(THREE_SLIDES);

    assert_eq!(out.page_count(), 3);
    assert_eq!(out.headers.len(), 2);

    let cover = &out.headers[0];
    assert_eq!(cover.figure, None);
    assert_eq!(cover.pages, vec![0]);
    assert_eq!(cover.page_title.as_deref(), Some("Welcome"));
    assert!(out.pages[0].full_bleed);

    let origins = &out.headers[1];
    assert_eq!(origins.figure.as_deref(), Some("https://example.com/map.jpg"));
    assert_eq!(origins.title.as_deref(), Some("Origins"));
    assert_eq!(origins.pages, vec![1, 2]);

    let items = item_texts(&tree, &out);
    assert_eq!(items, vec!["one", "two", "three", "four", "five", "six", "seven"]);

    // first page keeps the paragraph with five items
    let first = out.pages[1].content;
    assert_eq!(tree.tag(first), Some("div"));
    assert!(tree.text_content(first).starts_with("It started"));

    // continuation is a standalone list numbered from item six
    let second = out.pages[2].content;
    assert_eq!(tree.tag(second), Some("ul"));
    assert_eq!(tree.attr(second, "start"), Some("6"));
    assert_eq!(tree.children(second).len(), 2);

    assert_eq!(out.pages[2].slide_index, 1);
    assert_eq!(out.pages[2].page_within_slide, 1);
    assert!(out.pages.iter().all(|p| p.slide_index != 2));
}

#[test]
fn consecutive_slides_sharing_a_figure_share_a_header() {
    let (_, out) = decompose_markdown(
        "# A\n\n![bg](fig.png)\n\nFirst.\n\n---\n\n# B\n\n![bg](fig.png)\n\nSecond.\n\nThird.",
    );
    assert_eq!(out.headers.len(), 1);
    assert_eq!(out.headers[0].pages, vec![0, 1, 2]);
    assert_eq!(out.headers[0].title.as_deref(), Some("A"));
    assert_eq!(out.pages[2].slide_index, 1);
    assert_eq!(out.pages[2].page_within_slide, 1);
}

#[test]
fn different_figures_open_new_headers() {
    let (_, out) = decompose_markdown(
        "![bg](a.png)\n\nOne.\n\n---\n\n![bg](b.png)\n\nTwo.\n\n---\n\n![bg](a.png)\n\nThree.",
    );
    let figures: Vec<_> = out.headers.iter().map(|h| h.figure.as_deref()).collect();
    assert_eq!(figures, vec![Some("a.png"), Some("b.png"), Some("a.png")]);
    assert_header_coverage(&out);
}

#[test]
fn list_splits_directive_drives_continuations() {
    let (tree, out) = decompose_markdown(
        "@list_splits: 2, 3\n\n![bg](fig.png)\n\nIntro.\n\n1. a\n2. b\n3. c\n4. d\n5. e\n6. f\n7. g\n8. h",
    );
    assert_eq!(out.page_count(), 3);
    let starts: Vec<_> = out
        .pages
        .iter()
        .map(|p| {
            let list = if tree.tag(p.content) == Some("div") {
                tree.children(p.content)[1]
            } else {
                p.content
            };
            (tree.tag(list), tree.attr(list, "start"), tree.children(list).len())
        })
        .collect();
    assert_eq!(
        starts,
        vec![
            (Some("ol"), Some("1"), 2),
            (Some("ol"), Some("3"), 3),
            (Some("ol"), Some("6"), 3),
        ]
    );
}

#[test]
fn ordered_list_start_offsets_continuations() {
    let (tree, out) = decompose_markdown(
        "@list_split: 2\n\n![bg](fig.png)\n\nIntro.\n\n4. a\n5. b\n6. c",
    );
    let continuation = out.pages[1].content;
    assert_eq!(tree.attr(continuation, "start"), Some("6"));
}

#[test]
fn chapters_follow_chapter_markers() {
    let (_, out) = decompose_markdown(
        "@chapter: Part One\n# Cover\n\n---\n\n# Inside\n\n---\n\n@chapter: Part Two\n# Later",
    );
    let chapters = out.chapters();
    // the unmarked middle slide stays in Part One
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Part One");
    assert_eq!((chapters[0].first_page, chapters[0].end_page), (0, 2));
    assert_eq!((chapters[1].first_page, chapters[1].end_page), (2, 3));
    assert!(chapters[0].contains(1.5));
    assert!(!chapters[0].contains(2.0));
}

#[test]
fn iframe_marker_is_carried_to_pages() {
    let (_, out) = decompose_markdown("@iframe: https://example.com/embed\n# Live demo");
    assert_eq!(
        out.pages[0].iframe.as_deref(),
        Some("https://example.com/embed")
    );
}

#[test]
fn page_labels_fall_back_through_titles() {
    let (_, out) = decompose_markdown(
        "# Cover\n\n---\n\n![bg](f.png)\n\n## Subtitle only\n\nBody.\n\n---\n\n@chapter: Notes\n\nJust text.",
    );
    assert_eq!(out.page_label(0), Some("Cover"));
    // no h1 in the container, so the page title supplies the label
    assert_eq!(out.page_label(1), Some("Subtitle only"));
    assert_eq!(out.page_label(2), Some("Notes"));
}

#[test]
fn header_index_maps_pages_to_owners() {
    let (_, out) = decompose_markdown(THREE_SLIDES);
    assert_eq!(out.header_index(), vec![0, 1, 1]);
}
