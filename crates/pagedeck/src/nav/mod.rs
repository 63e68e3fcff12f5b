pub mod input;
pub mod url;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::compact::{Chapter, Decomposition};
use self::url::PageCodec;

static MOBILE_AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iPhone|iPad|iPod|Android").expect("valid regex"));

/// Whether a visitor should get the mobile view.
pub fn is_mobile(user_agent: &str, search: &str) -> bool {
    MOBILE_AGENT.is_match(user_agent) || search == "?mobile"
}

/// Frames to wait for a restoring scroll write to land before giving up on it.
const RESTORE_FRAME_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Previous,
    First,
    Last,
    GoTo(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    #[default]
    Push,
    Replace,
}

impl std::str::FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown history mode '{other}' (expected push or replace)")),
        }
    }
}

/// The page model the navigator needs, detached from any DOM.
#[derive(Debug, Clone, PartialEq)]
pub struct NavModel {
    pub deck_title: String,
    pub header_pages: Vec<Vec<usize>>,
    pub page_labels: Vec<Option<String>>,
    pub chapters: Vec<Chapter>,
}

impl NavModel {
    pub fn from_decomposition<N>(deck: &Decomposition<N>, deck_title: &str) -> Self {
        Self {
            deck_title: deck_title.to_string(),
            header_pages: deck.headers.iter().map(|h| h.pages.clone()).collect(),
            page_labels: (0..deck.page_count())
                .map(|page| deck.page_label(page).map(str::to_string))
                .collect(),
            chapters: deck.chapters(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_labels.len()
    }

    /// Document title for `page`.
    pub fn title(&self, page: usize) -> String {
        if page == 0 {
            return self.deck_title.clone();
        }
        match self.page_labels.get(page).and_then(Option::as_deref) {
            Some(label) if self.deck_title.is_empty() => label.to_string(),
            Some(label) => format!("{label} | {}", self.deck_title),
            None => self.deck_title.clone(),
        }
    }

    /// Header strip position, in header widths, for a page strip position.
    ///
    /// Between one header's last page and the next header's first page the
    /// result interpolates linearly; elsewhere it is the header whose pages
    /// have been reached.
    pub fn header_position(&self, page_x: f64) -> f64 {
        let mut position = 0.0;
        for (i, pair) in self.header_pages.windows(2).enumerate() {
            let (Some(last), Some(first)) = (pair[0].last(), pair[1].first()) else {
                continue;
            };
            let (last, first) = (*last as f64, *first as f64);
            if page_x > last && page_x < first {
                return i as f64 + (page_x - last) / (first - last);
            }
            if page_x >= first {
                position = (i + 1) as f64;
            }
        }
        position
    }
}

/// Window location split the way the navigator uses it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
}

/// The live page as the navigator sees it.
pub trait Host {
    /// Width of one page in the page strip; zero before layout.
    fn page_width(&self) -> f64;

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64, smooth: bool);

    fn header_offset(&self) -> f64;

    fn set_header_offset(&mut self, offset: f64);

    fn location(&self) -> Location;

    fn push_history(&mut self, url: &str);

    fn replace_history(&mut self, url: &str);

    fn set_title(&mut self, title: &str);

    /// Move the scrubber handle. No-op without a scrubber.
    fn set_scrubber(&mut self, _fraction: f64, _label: &str) {}

    /// Toggle a chapter entry's active state. No-op without chapter nav.
    fn set_chapter_active(&mut self, _chapter: usize, _active: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Idle,
    /// Waiting to write, or to observe, the scroll position named by the URL.
    Restoring { target: usize, written: bool, frames: u32 },
    Tracking,
}

/// The page exactly in view, allowing for sub-pixel scroll offsets.
fn snapped_page(page_x: f64, width: f64) -> Option<usize> {
    let nearest = page_x.round();
    ((page_x - nearest).abs() * width < 0.5 && nearest >= 0.0).then_some(nearest as usize)
}

/// Per-view navigation state machine, driven once per animation frame through
/// [`Navigator::tick`].
#[derive(Debug, Clone)]
pub struct Navigator {
    model: NavModel,
    codec: PageCodec,
    history: HistoryMode,
    phase: Phase,
    current_page: Option<usize>,
    active_chapters: Vec<bool>,
}

impl Navigator {
    pub fn new(model: NavModel, codec: PageCodec, history: HistoryMode) -> Self {
        let active_chapters = vec![false; model.chapters.len()];
        Self {
            model,
            codec,
            history,
            phase: Phase::Idle,
            current_page: None,
            active_chapters,
        }
    }

    pub fn model(&self) -> &NavModel {
        &self.model
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last page whose location was synchronized.
    pub fn current_page(&self) -> Option<usize> {
        self.current_page
    }

    /// Location writes are suppressed until a restore has been observed.
    pub fn is_suppressed(&self) -> bool {
        !matches!(self.phase, Phase::Tracking)
    }

    /// Start restoring from the current URL: on load, and on every `popstate`.
    pub fn restore<H: Host>(&mut self, host: &H) {
        let target = self.codec.decode_path(&host.location().path);
        log::debug!("restoring page {target} from {:?}", host.location().path);
        self.phase = Phase::Restoring {
            target,
            written: false,
            frames: 0,
        };
    }

    /// Fractional page position of the page strip.
    pub fn position<H: Host>(&self, host: &H) -> f64 {
        let width = host.page_width();
        if width <= 0.0 {
            return 0.0;
        }
        host.scroll_offset() / width
    }

    /// One frame of synchronization.
    pub fn tick<H: Host>(&mut self, host: &mut H) {
        let width = host.page_width();
        if width <= 0.0 {
            return;
        }

        if let Phase::Restoring {
            target,
            written,
            frames,
        } = self.phase
        {
            if !written {
                // the write happens one frame after the restore began, after layout
                host.set_scroll_offset(target as f64 * width, false);
                self.phase = Phase::Restoring {
                    target,
                    written: true,
                    frames: 0,
                };
                return;
            }
            let landed = snapped_page(self.position(host), width) == Some(target);
            if !landed && frames < RESTORE_FRAME_LIMIT {
                self.phase = Phase::Restoring {
                    target,
                    written,
                    frames: frames + 1,
                };
                return;
            }
            if !landed {
                log::warn!("scroll restore to page {target} never landed");
            }
            self.phase = Phase::Tracking;
            self.current_page = Some(target);
            self.sync_chrome(host, target as f64, target);
            return;
        }

        let page_x = self.position(host);
        let header_offset = (self.model.header_position(page_x) * width).floor();
        if host.header_offset() != header_offset {
            host.set_header_offset(header_offset);
        }

        if self.phase != Phase::Tracking {
            return;
        }
        let Some(page) = snapped_page(page_x, width) else {
            return;
        };
        if self.current_page == Some(page) || page >= self.model.page_count() {
            return;
        }
        self.current_page = Some(page);

        let location = host.location();
        let path = self.codec.encode_path(&location.path, page);
        let url = format!("{path}{}", location.search);
        match self.history {
            HistoryMode::Push => host.push_history(&url),
            HistoryMode::Replace => host.replace_history(&url),
        }
        self.sync_chrome(host, page_x, page);
    }

    fn sync_chrome<H: Host>(&mut self, host: &mut H, page_x: f64, page: usize) {
        host.set_title(&self.model.title(page));

        let count = self.model.page_count();
        if count > 0 {
            let label = match self.model.page_labels.get(page).and_then(Option::as_deref) {
                Some(label) => format!("{} / {count} · {label}", page + 1),
                None => format!("{} / {count}", page + 1),
            };
            host.set_scrubber(page_x / count as f64, &label);
        }

        for (i, chapter) in self.model.chapters.iter().enumerate() {
            let active = chapter.contains(page_x);
            if self.active_chapters[i] != active {
                self.active_chapters[i] = active;
                host.set_chapter_active(i, active);
            }
        }
    }

    /// Page an action leads to from the current scroll position.
    pub fn target(&self, position: f64, action: NavAction) -> usize {
        let last = self.model.page_count().saturating_sub(1);
        let here = position.round().max(0.0) as usize;
        match action {
            NavAction::Next => (here + 1).min(last),
            NavAction::Previous => here.saturating_sub(1),
            NavAction::First => 0,
            NavAction::Last => last,
            NavAction::GoTo(page) => page.min(last),
        }
    }

    /// Scroll toward the page `action` names. The location follows once the
    /// scroll settles on it.
    pub fn apply<H: Host>(&mut self, host: &mut H, action: NavAction) {
        let page = self.target(self.position(host), action);
        host.set_scroll_offset(page as f64 * host.page_width(), true);
    }

    /// Jump the page strip to a fractional position without animation.
    pub fn scrub_to<H: Host>(&mut self, host: &mut H, position: f64) {
        host.set_scroll_offset(position * host.page_width(), false);
    }
}
