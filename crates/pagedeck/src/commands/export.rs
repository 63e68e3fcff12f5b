use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dom::html::to_xhtml;
use crate::export::{BookMeta, write_epub};

pub fn run(file: &Path, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    let settings = Config::load_or_default().mobile_settings();
    let loaded = super::load_deck(file, &settings)?;
    if loaded.deck.page_count() == 0 {
        anyhow::bail!("No pages to export in {}", file.display());
    }

    let output = output.unwrap_or_else(|| file.with_extension("epub"));
    let writer = BufWriter::new(
        File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    let meta = BookMeta::from_presentation(&loaded.presentation.meta);
    write_epub(
        &meta,
        &loaded.deck,
        |page| to_xhtml(&loaded.tree, page.content),
        writer,
    )
    .with_context(|| format!("Failed to write {}", output.display()))?;

    if !quiet {
        println!(
            "{} {} ({} pages)",
            "Exported".green().bold(),
            output.display(),
            loaded.deck.pages.iter().filter(|p| !p.full_bleed).count()
        );
    }
    Ok(())
}
