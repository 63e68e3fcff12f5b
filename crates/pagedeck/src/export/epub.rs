use std::fmt::Write as _;
use std::io::{Seek, Write};

use anyhow::{Context, Result};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::compact::{Chapter, Decomposition, Page};
use crate::dom::html::escape_attr;
use crate::parser::PresentationMeta;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLES_CSS: &str = "body { margin: 0 5%; line-height: 1.5; }\n\
h1 { font-size: 1.6em; }\n\
figure, img { max-width: 100%; }\n";

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Book metadata with defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct BookMeta {
    pub title: String,
    pub author: String,
    pub description: String,
    pub language: String,
    pub identifier: String,
}

impl BookMeta {
    pub fn from_presentation(meta: &PresentationMeta) -> Self {
        let title = meta
            .title
            .clone()
            .unwrap_or_else(|| "Untitled deck".to_string());
        let identifier = meta
            .identifier
            .clone()
            .unwrap_or_else(|| format!("urn:pagedeck:{}", slug(&title)));
        Self {
            author: meta.author.clone().unwrap_or_default(),
            description: meta.description.clone().unwrap_or_default(),
            language: meta.language.clone().unwrap_or_else(|| "en".to_string()),
            identifier,
            title,
        }
    }

    /// Download name for the package, derived from the title.
    pub fn file_name(&self) -> String {
        match slug(&self.title) {
            s if s.is_empty() => "deck.epub".to_string(),
            s => format!("{s}.epub"),
        }
    }
}

#[derive(Debug)]
struct NavPoint {
    id: String,
    label: String,
    src: String,
    children: Vec<NavPoint>,
}

#[derive(Debug)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: &'static str,
}

/// Write an EPUB for `deck` to `writer`. `render_page` serializes a page's
/// content as XHTML body markup.
pub fn write_epub<N, W, F>(
    meta: &BookMeta,
    deck: &Decomposition<N>,
    mut render_page: F,
    writer: W,
) -> Result<W>
where
    W: Write + Seek,
    F: FnMut(&Page<N>) -> String,
{
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry, uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    let mut manifest = vec![ManifestItem {
        id: "cover".to_string(),
        href: "Text/cover.xhtml".to_string(),
        media_type: XHTML_MEDIA_TYPE,
    }];
    let mut spine: Vec<String> = Vec::new();
    let mut nav: Vec<NavPoint> = Vec::new();

    zip.start_file("OEBPS/Text/cover.xhtml", deflated)?;
    let cover = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        escape_attr(&meta.title),
        escape_attr(&meta.author)
    );
    zip.write_all(xhtml_document(&meta.title, &meta.language, &cover).as_bytes())?;

    let owners = deck.header_index();
    for (n, chapter) in book_chapters(deck, &meta.title).iter().enumerate() {
        let id = format!("chapter-{}", n + 1);
        let href = format!("Text/{id}.xhtml");
        zip.start_file(format!("OEBPS/{href}"), deflated)?;
        let body = format!("<h1>{}</h1>", escape_attr(&chapter.title));
        zip.write_all(xhtml_document(&chapter.title, &meta.language, &body).as_bytes())?;

        let mut point = NavPoint {
            id: id.clone(),
            label: chapter.title.clone(),
            src: href.clone(),
            children: Vec::new(),
        };
        manifest.push(ManifestItem {
            id: id.clone(),
            href,
            media_type: XHTML_MEDIA_TYPE,
        });
        spine.push(id);

        for page_index in chapter.first_page..chapter.end_page {
            let page = &deck.pages[page_index];
            if page.full_bleed {
                continue;
            }
            let header_index = owners[page_index];
            let header = &deck.headers[header_index];
            let title = header.label().unwrap_or(&chapter.title);
            let position = header
                .pages
                .iter()
                .position(|p| *p == page_index)
                .unwrap_or_default();
            let label = if position == 0 {
                title.to_string()
            } else {
                format!("{title} | {}", position + 1)
            };

            let name = format!("{header_index}_{page_index}");
            let href = format!("Text/{name}.xhtml");
            zip.start_file(format!("OEBPS/{href}"), deflated)?;
            let body = render_page(page);
            zip.write_all(xhtml_document(&label, &meta.language, &body).as_bytes())?;

            point.children.push(NavPoint {
                id: format!("page-{name}"),
                label,
                src: href.clone(),
                children: Vec::new(),
            });
            manifest.push(ManifestItem {
                id: format!("page-{name}"),
                href,
                media_type: XHTML_MEDIA_TYPE,
            });
            spine.push(format!("page-{name}"));
        }
        nav.push(point);
    }

    zip.start_file("OEBPS/Styles/styles.css", deflated)?;
    zip.write_all(STYLES_CSS.as_bytes())?;
    manifest.push(ManifestItem {
        id: "styles".to_string(),
        href: "Styles/styles.css".to_string(),
        media_type: "text/css",
    });

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(generate_ncx(meta, &nav).as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(generate_opf(meta, &manifest, &spine).as_bytes())?;

    log::debug!(
        "epub: {} chapters, {} manifest items",
        nav.len(),
        manifest.len()
    );
    zip.finish().context("failed to finish epub archive")
}

/// Chapters from the deck's chapter markers, or one chapter named after the
/// book when the deck has none.
fn book_chapters<N>(deck: &Decomposition<N>, title: &str) -> Vec<Chapter> {
    let mut chapters = deck.chapters();
    match chapters.first_mut() {
        // pages before the first marker belong to the first chapter
        Some(first) => first.first_page = 0,
        None => chapters.push(Chapter {
            title: title.to_string(),
            first_page: 0,
            end_page: deck.page_count(),
        }),
    }
    chapters
}

fn xhtml_document(title: &str, language: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="../Styles/styles.css"/>
</head>
<body>
{body}
</body>
</html>
"#,
        lang = escape_attr(language),
        title = escape_attr(title),
    )
}

fn generate_opf(meta: &BookMeta, manifest: &[ManifestItem], spine: &[String]) -> String {
    let mut opf = String::new();
    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );
    let _ = writeln!(opf, "    <dc:title>{}</dc:title>", escape_attr(&meta.title));
    if !meta.author.is_empty() {
        let _ = writeln!(opf, "    <dc:creator>{}</dc:creator>", escape_attr(&meta.author));
    }
    let _ = writeln!(opf, "    <dc:language>{}</dc:language>", escape_attr(&meta.language));
    let _ = writeln!(
        opf,
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>",
        escape_attr(&meta.identifier)
    );
    if !meta.description.is_empty() {
        let _ = writeln!(
            opf,
            "    <dc:description>{}</dc:description>",
            escape_attr(&meta.description)
        );
    }
    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let _ = writeln!(
            opf,
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>",
            escape_attr(&item.id),
            escape_attr(&item.href),
            item.media_type
        );
    }
    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
    for id in spine {
        let _ = writeln!(opf, "    <itemref idref=\"{}\"/>", escape_attr(id));
    }
    opf.push_str("  </spine>\n  <guide>\n");
    opf.push_str("    <reference href=\"Text/cover.xhtml\" type=\"cover\" title=\"Cover\"/>\n");
    opf.push_str("  </guide>\n</package>\n");
    opf
}

fn generate_ncx(meta: &BookMeta, nav: &[NavPoint]) -> String {
    let mut body = String::new();
    let mut play_order = 1;
    write_nav_points(&mut body, nav, &mut play_order, 2);
    let total = play_order - 1;

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="2"/>
    <meta name="dtb:totalPageCount" content="{total}"/>
    <meta name="dtb:maxPageNumber" content="{total}"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <docAuthor>
    <text>{author}</text>
  </docAuthor>
  <navMap>
{body}  </navMap>
</ncx>
"#,
        uid = escape_attr(&meta.identifier),
        title = escape_attr(&meta.title),
        author = escape_attr(&meta.author),
    )
}

fn write_nav_points(out: &mut String, points: &[NavPoint], play_order: &mut usize, depth: usize) {
    let indent = "  ".repeat(depth);
    for point in points {
        let _ = writeln!(
            out,
            "{indent}<navPoint id=\"{}\" playOrder=\"{play_order}\">",
            escape_attr(&point.id)
        );
        let _ = writeln!(
            out,
            "{indent}  <navLabel><text>{}</text></navLabel>",
            escape_attr(&point.label)
        );
        let _ = writeln!(out, "{indent}  <content src=\"{}\"/>", escape_attr(&point.src));
        *play_order += 1;
        write_nav_points(out, &point.children, play_order, depth + 1);
        let _ = writeln!(out, "{indent}</navPoint>");
    }
}

fn slug(title: &str) -> String {
    let mut out = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
