use anyhow::{Context, Result};
use colored::Colorize;
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use super::LoadedDeck;
use crate::config::{Config, MobileSettings};
use crate::dom::html::{escape_attr, escape_text, to_html};
use crate::mobile::css::CssText;
use crate::mobile::fit::{EstimatedProbe, FontFitter};
use crate::mobile::{self, BuildOptions, STYLESHEET};

/// Share of the viewport height left to the page strip under the header strip.
const PAGE_HEIGHT_SHARE: f64 = 0.62;

/// Chapter bar and scrubber, in CSS pixels.
const CHROME_HEIGHT_PX: f64 = 64.0;

/// Share of the viewport width left after the content padding.
const TEXT_WIDTH_SHARE: f64 = 0.88;

const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Holds the settings JSON read by the mount script.
const SETTINGS_ID: &str = "pagedeck-settings";

pub fn run(
    file: &Path,
    output: Option<PathBuf>,
    watch: bool,
    runtime: Option<String>,
    quiet: bool,
) -> Result<()> {
    let settings = Config::load_or_default().mobile_settings();
    let output = output.unwrap_or_else(|| file.with_extension("html"));

    let runtime = runtime.as_deref();
    build_once(file, &output, &settings, runtime, quiet)?;
    if !watch {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(WATCH_DEBOUNCE, tx)
        .context("Failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(file, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", file.display()))?;
    if !quiet {
        println!("Watching {} (Ctrl-C to stop)", file.display());
    }

    for result in rx {
        match result {
            Ok(events) => {
                if !events.iter().any(|e| e.kind == DebouncedEventKind::Any) {
                    continue;
                }
                log::debug!("change detected in {}", file.display());
                if let Err(e) = build_once(file, &output, &settings, runtime, quiet) {
                    eprintln!("{}", format!("Build failed: {e:#}").red());
                }
            }
            Err(e) => log::error!("File watcher error: {e}"),
        }
    }
    Ok(())
}

fn build_once(
    file: &Path,
    output: &Path,
    settings: &MobileSettings,
    runtime: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let mut loaded = super::load_deck(file, settings)?;
    if loaded.presentation.slides.is_empty() {
        anyhow::bail!("No slides found in {}", file.display());
    }

    let (html, font_size) = render_page(&mut loaded, settings, runtime)?;
    std::fs::write(output, html)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !quiet {
        println!(
            "{} {} ({} pages, {}px text)",
            "Built".green().bold(),
            output.display(),
            loaded.deck.page_count(),
            font_size
        );
    }
    Ok(())
}

/// Build the deck into a standalone HTML document.
///
/// Without a runtime the page holds the mobile view itself, with the font size
/// pre-fitted for the configured viewport. With one it holds the desktop slides
/// and a module script that mounts the live view from them, passing `settings`
/// as JSON.
pub fn render_page(
    loaded: &mut LoadedDeck,
    settings: &MobileSettings,
    runtime: Option<&str>,
) -> Result<(String, u32)> {
    let (width, height) = settings.viewport;
    let mut probe = EstimatedProbe::new(
        f64::from(width) * TEXT_WIDTH_SHARE,
        (f64::from(height) * PAGE_HEIGHT_SHARE - CHROME_HEIGHT_PX).max(1.0),
    );
    let mut sheet = CssText::parse(STYLESHEET);
    let mut fitter = FontFitter::new(settings.font_sizes.clone());
    let font_size = fitter.fit(&loaded.tree, &loaded.deck.pages, &mut probe, &mut sheet);

    let (head_extra, body) = match runtime {
        Some(runtime) => runtime_parts(loaded, settings, runtime)?,
        None => {
            let view = mobile::build(&mut loaded.tree, &loaded.deck, &BuildOptions::default());
            (
                format!("<style>\n{sheet}</style>\n"),
                format!(
                    "<body class=\"pagedeck-mobile\">\n{}\n</body>\n",
                    to_html(&loaded.tree, view.root)
                ),
            )
        }
    };

    let title = loaded.title();
    let language = loaded
        .presentation
        .meta
        .language
        .as_deref()
        .unwrap_or("en");
    let mut head_meta = String::new();
    for (name, value) in [
        ("author", &loaded.presentation.meta.author),
        ("description", &loaded.presentation.meta.description),
    ] {
        if let Some(value) = value {
            head_meta.push_str(&format!(
                "<meta name=\"{name}\" content=\"{}\">\n",
                escape_attr(value)
            ));
        }
    }
    let html = format!(
        "<!DOCTYPE html>\n\
<html lang=\"{lang}\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
{head_meta}<title>{title}</title>\n\
{head_extra}\
</head>\n\
{body}\
</html>\n",
        lang = escape_attr(language),
        title = escape_text(title),
    );
    Ok((html, font_size))
}

/// JSON that is safe inside a `<script>` element.
fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize page settings")?;
    Ok(json.replace("</", "<\\/"))
}

fn runtime_parts(
    loaded: &LoadedDeck,
    settings: &MobileSettings,
    runtime: &str,
) -> Result<(String, String)> {
    let head = format!(
        "<script type=\"application/json\" id=\"{SETTINGS_ID}\">{settings}</script>\n\
<script type=\"module\">\n\
import init, {{ mount }} from {module};\n\
await init();\n\
window.pagedeck = mount(document.getElementById(\"{SETTINGS_ID}\").textContent);\n\
</script>\n",
        settings = script_json(settings)?,
        module = script_json(runtime)?,
    );
    let mut body = String::from("<body>\n<main class=\"pagedeck-deck\">\n");
    for slide in &loaded.slides {
        body.push_str(&to_html(&loaded.tree, *slide));
        body.push('\n');
    }
    body.push_str("</main>\n</body>\n");
    Ok((head, body))
}
