use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::LoadedDeck;
use crate::compact::{Chapter, Header};
use crate::config::Config;
use crate::nav::url::PageCodec;

#[derive(Debug, Serialize)]
pub struct PageRow {
    pub index: usize,
    pub slide: usize,
    pub page_within_slide: usize,
    pub header: usize,
    pub url: String,
    pub full_bleed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagesReport<'a> {
    pub title: &'a str,
    pub page_count: usize,
    pub headers: &'a [Header],
    pub chapters: Vec<Chapter>,
    pub pages: Vec<PageRow>,
}

pub fn report<'a>(loaded: &'a LoadedDeck, codec: &PageCodec) -> PagesReport<'a> {
    let owners = loaded.deck.header_index();
    let pages = loaded
        .deck
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| PageRow {
            index,
            slide: page.slide_index,
            page_within_slide: page.page_within_slide,
            header: owners[index],
            url: codec.encode(index),
            full_bleed: page.full_bleed,
            iframe: page.iframe.clone(),
            label: loaded.deck.page_label(index).map(str::to_string),
        })
        .collect();
    PagesReport {
        title: loaded.title(),
        page_count: loaded.deck.page_count(),
        headers: &loaded.deck.headers,
        chapters: loaded.deck.chapters(),
        pages,
    }
}

pub fn run(file: &Path, json: bool) -> Result<()> {
    let settings = Config::load_or_default().mobile_settings();
    let loaded = super::load_deck(file, &settings)?;
    let codec = PageCodec::for_pages(settings.url_mode, &loaded.deck.pages);
    let report = report(&loaded, &codec);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} pages under {} headers",
        report.title.bold(),
        report.page_count,
        report.headers.len()
    );
    let mut chapters = report.chapters.iter().peekable();
    for row in &report.pages {
        if let Some(chapter) = chapters.next_if(|c| c.first_page == row.index) {
            println!("{}", format!("== {} ==", chapter.title).cyan().bold());
        }
        let kind = if row.iframe.is_some() {
            "iframe".magenta()
        } else if row.full_bleed {
            "full".yellow()
        } else {
            "text".normal()
        };
        println!(
            "{:>4}  /{:<6} slide {:>3}.{:<2} header {:>3}  {:<6}  {}",
            row.index + 1,
            row.url,
            row.slide + 1,
            row.page_within_slide + 1,
            row.header,
            kind,
            row.label.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}
