pub mod build;
pub mod completion;
pub mod config;
pub mod export;
pub mod pages;

use anyhow::{Context, Result};
use std::path::Path;

use crate::compact::{DecomposeOptions, Decomposition, decompose};
use crate::config::MobileSettings;
use crate::dom::{NodeId, Tree};
use crate::parser::{self, Presentation};
use crate::render::render_deck;

/// A deck read from disk and decomposed into mobile pages.
pub struct LoadedDeck {
    pub presentation: Presentation,
    pub tree: Tree,
    /// Desktop slide roots, untouched by decomposition.
    pub slides: Vec<NodeId>,
    pub deck: Decomposition<NodeId>,
}

impl LoadedDeck {
    pub fn title(&self) -> &str {
        self.presentation.meta.title.as_deref().unwrap_or_default()
    }
}

pub fn load_deck(file: &Path, settings: &MobileSettings) -> Result<LoadedDeck> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(decompose_source(&content, settings))
}

pub fn decompose_source(content: &str, settings: &MobileSettings) -> LoadedDeck {
    let presentation = parser::parse(content);
    let rendered = render_deck(&presentation);
    let mut tree = rendered.tree;
    let options = DecomposeOptions {
        default_splits: settings.split_points(),
    };
    let deck = decompose(&mut tree, &rendered.slides, &options);
    LoadedDeck {
        presentation,
        tree,
        slides: rendered.slides,
        deck,
    }
}
