use crate::compact::Page;
use crate::dom::{self, Document};

pub const FONT_SIZE_PROPERTY: &str = "--pagedeck-mobile-font-size";

pub const DEFAULT_CANDIDATES: &[u32] = &[28, 26, 24, 20, 18, 16, 14, 12, 8];

/// Appended to the probe text so a page that barely fits still has room.
pub const BUFFER_TEXT: &str = " Extra Buffer Text";

/// Overflow tolerated by the probe, in CSS pixels.
pub const OVERFLOW_SLACK_PX: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeMetrics {
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ProbeMetrics {
    pub fn fits(&self) -> bool {
        self.scroll_height <= self.client_height + OVERFLOW_SLACK_PX
    }
}

/// Renders text into the sizer at a given size and reports its extent.
pub trait SizeProbe {
    fn measure(&mut self, text: &str, font_size_px: u32) -> ProbeMetrics;
}

/// Style rules that can carry the font-size custom property.
pub trait StyleSheet {
    /// Every rule declaring `property`, as (rule index, declared value).
    fn declarations(&self, property: &str) -> Vec<(usize, String)>;

    fn set_declaration(&mut self, rule: usize, property: &str, value: &str);
}

#[derive(Debug, Clone, PartialEq)]
struct Authored {
    rule: usize,
    value: f64,
    unit: String,
}

/// Picks the largest candidate size at which the longest paragraph fits the
/// sizer, then scales every rule declaring [`FONT_SIZE_PROPERTY`] by it.
#[derive(Debug, Clone)]
pub struct FontFitter {
    candidates: Vec<u32>,
    authored: Option<Vec<Authored>>,
}

impl Default for FontFitter {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES.to_vec())
    }
}

impl FontFitter {
    /// Candidates are tried largest first whatever order they are given in.
    pub fn new(mut candidates: Vec<u32>) -> Self {
        candidates.retain(|size| *size > 0);
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        candidates.dedup();
        if candidates.is_empty() {
            candidates = DEFAULT_CANDIDATES.to_vec();
        }
        Self {
            candidates,
            authored: None,
        }
    }

    pub fn candidates(&self) -> &[u32] {
        &self.candidates
    }

    /// Pick the font size for `pages` and apply it to `sheet`. Safe to call
    /// again after a resize; scaling always starts from the authored values.
    pub fn fit<D, P, S>(
        &mut self,
        doc: &D,
        pages: &[Page<D::Node>],
        probe: &mut P,
        sheet: &mut S,
    ) -> u32
    where
        D: Document,
        P: SizeProbe,
        S: StyleSheet,
    {
        let size = match longest_paragraph(doc, pages) {
            Some(text) => self.choose(&format!("{text}{BUFFER_TEXT}"), probe),
            None => self.candidates[0],
        };
        self.apply(size, sheet);
        size
    }

    /// Largest candidate whose probe fits, else the smallest candidate.
    pub fn choose<P: SizeProbe>(&self, text: &str, probe: &mut P) -> u32 {
        for size in &self.candidates {
            if probe.measure(text, *size).fits() {
                log::debug!("font fit: {size}px for {} chars", text.chars().count());
                return *size;
            }
        }
        let smallest = self.candidates[self.candidates.len() - 1];
        log::debug!("font fit: nothing fits, using {smallest}px");
        smallest
    }

    /// Rewrite every declaration of the font-size property in proportion to
    /// the first one, which is treated as the base size.
    pub fn apply<S: StyleSheet>(&mut self, size: u32, sheet: &mut S) {
        let authored = self
            .authored
            .get_or_insert_with(|| read_authored(&*sheet));
        let Some(base) = authored.first().map(|a| a.value).filter(|v| *v > 0.0) else {
            log::debug!("no {FONT_SIZE_PROPERTY} declarations to scale");
            return;
        };
        let ratio = f64::from(size) / base;
        for entry in authored.iter() {
            let scaled = format_length(entry.value * ratio, &entry.unit);
            sheet.set_declaration(entry.rule, FONT_SIZE_PROPERTY, &scaled);
        }
    }
}

fn read_authored<S: StyleSheet>(sheet: &S) -> Vec<Authored> {
    sheet
        .declarations(FONT_SIZE_PROPERTY)
        .into_iter()
        .filter_map(|(rule, value)| match parse_length(&value) {
            Some((value, unit)) => Some(Authored { rule, value, unit }),
            None => {
                log::warn!("ignoring unparsable {FONT_SIZE_PROPERTY} value {value:?}");
                None
            }
        })
        .collect()
}

/// Split a CSS length such as `20px` or `1.25rem` into number and unit.
fn parse_length(value: &str) -> Option<(f64, String)> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;
    Some((number, unit.trim().to_string()))
}

fn format_length(value: f64, unit: &str) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}{unit}")
}

/// Text of the longest paragraph on any reading page; ties keep the first.
/// Full-bleed and iframe pages are never probed.
pub fn longest_paragraph<D: Document>(doc: &D, pages: &[Page<D::Node>]) -> Option<String> {
    let mut longest: Option<(usize, String)> = None;
    for page in pages.iter().filter(|p| !p.full_bleed && p.iframe.is_none()) {
        let mut paragraphs = Vec::new();
        if dom::has_tag(doc, &page.content, "p") {
            paragraphs.push(page.content.clone());
        }
        collect_paragraphs(doc, &page.content, &mut paragraphs);
        for paragraph in paragraphs {
            let text = doc.text_content(&paragraph);
            let len = text.chars().count();
            if longest.as_ref().is_none_or(|(best, _)| len > *best) {
                longest = Some((len, text));
            }
        }
    }
    longest.map(|(_, text)| text)
}

fn collect_paragraphs<D: Document>(doc: &D, node: &D::Node, out: &mut Vec<D::Node>) {
    for child in dom::element_children(doc, node) {
        if dom::has_tag(doc, &child, "p") {
            out.push(child.clone());
        }
        collect_paragraphs(doc, &child, out);
    }
}

/// Text-metrics estimate of the sizer, for fitting without a layout engine.
///
/// Glyphs are assumed `char_width` ems wide and lines `line_height` ems tall;
/// words wrap greedily.
#[derive(Debug, Clone, Copy)]
pub struct EstimatedProbe {
    pub width: f64,
    pub height: f64,
    pub char_width: f64,
    pub line_height: f64,
}

impl EstimatedProbe {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            char_width: 0.5,
            line_height: 1.5,
        }
    }
}

impl SizeProbe for EstimatedProbe {
    fn measure(&mut self, text: &str, font_size_px: u32) -> ProbeMetrics {
        let size = f64::from(font_size_px);
        let per_line = (self.width / (size * self.char_width)).floor().max(1.0) as usize;

        let mut lines = 1usize;
        let mut used = 0usize;
        for word in text.split_whitespace() {
            let len = word.chars().count();
            let needed = if used == 0 { len } else { used + 1 + len };
            if needed <= per_line {
                used = needed;
            } else {
                if used > 0 {
                    lines += 1;
                }
                // words longer than a line break across lines
                lines += (len - 1) / per_line;
                used = (len - 1) % per_line + 1;
            }
        }

        ProbeMetrics {
            scroll_height: lines as f64 * size * self.line_height,
            client_height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeId, Tree};

    /// Fits when `chars * size` stays under a budget.
    struct BudgetProbe {
        budget: f64,
        calls: Vec<u32>,
    }

    impl SizeProbe for BudgetProbe {
        fn measure(&mut self, text: &str, font_size_px: u32) -> ProbeMetrics {
            self.calls.push(font_size_px);
            ProbeMetrics {
                scroll_height: text.chars().count() as f64 * f64::from(font_size_px),
                client_height: self.budget - OVERFLOW_SLACK_PX,
            }
        }
    }

    #[derive(Default)]
    struct Rules(Vec<(usize, String)>);

    impl StyleSheet for Rules {
        fn declarations(&self, _property: &str) -> Vec<(usize, String)> {
            self.0.clone()
        }

        fn set_declaration(&mut self, rule: usize, _property: &str, value: &str) {
            if let Some(entry) = self.0.iter_mut().find(|(r, _)| *r == rule) {
                entry.1 = value.to_string();
            }
        }
    }

    fn page(tree: &mut Tree, text: &str, full_bleed: bool) -> Page<NodeId> {
        let div = tree.element("div");
        let p = tree.element("p");
        let t = tree.text(text);
        tree.append(p, t);
        tree.append(div, p);
        Page {
            content: div,
            slide_index: 0,
            page_within_slide: 0,
            full_bleed,
            chapter: None,
            iframe: None,
        }
    }

    #[test]
    fn test_longest_paragraph_skips_full_bleed() {
        let mut tree = Tree::new();
        let pages = vec![
            page(&mut tree, "short", false),
            page(&mut tree, "a much longer full-bleed paragraph", true),
            page(&mut tree, "medium text", false),
            page(&mut tree, "same length", false),
        ];
        assert_eq!(
            longest_paragraph(&tree, &pages).as_deref(),
            Some("medium text")
        );
    }

    #[test]
    fn test_choose_largest_fitting() {
        let fitter = FontFitter::default();
        let mut probe = BudgetProbe {
            budget: 100.0,
            calls: Vec::new(),
        };
        // 5 chars: 20 * 5 = 100 fits, 24 * 5 does not
        assert_eq!(fitter.choose("abcde", &mut probe), 20);
        assert_eq!(probe.calls, vec![28, 26, 24, 20]);
    }

    #[test]
    fn test_nothing_fits_uses_smallest() {
        let fitter = FontFitter::default();
        let mut probe = BudgetProbe {
            budget: 1.0,
            calls: Vec::new(),
        };
        assert_eq!(fitter.choose("abcde", &mut probe), 8);
    }

    #[test]
    fn test_candidates_are_sorted_descending() {
        let fitter = FontFitter::new(vec![12, 30, 0, 12, 18]);
        assert_eq!(fitter.candidates(), &[30, 18, 12]);
        assert_eq!(FontFitter::new(Vec::new()).candidates(), DEFAULT_CANDIDATES);
    }

    #[test]
    fn test_apply_scales_proportionally_without_compounding() {
        let mut sheet = Rules(vec![(0, "20px".into()), (3, "14px".into()), (5, "bogus".into())]);
        let mut fitter = FontFitter::default();

        fitter.apply(10, &mut sheet);
        assert_eq!(sheet.0[0].1, "10px");
        assert_eq!(sheet.0[1].1, "7px");
        assert_eq!(sheet.0[2].1, "bogus");

        // a second fit scales from the authored values again
        fitter.apply(30, &mut sheet);
        assert_eq!(sheet.0[0].1, "30px");
        assert_eq!(sheet.0[1].1, "21px");
    }

    #[test]
    fn test_fit_end_to_end() {
        let mut tree = Tree::new();
        let pages = vec![page(&mut tree, "x", false)];
        let mut sheet = Rules(vec![(0, "20px".into())]);
        let mut probe = BudgetProbe {
            budget: 1_000.0,
            calls: Vec::new(),
        };
        let size = FontFitter::default().fit(&tree, &pages, &mut probe, &mut sheet);
        // "x" plus the buffer is 19 chars; 28 * 19 = 532 fits
        assert_eq!(size, 28);
        assert_eq!(sheet.0[0].1, "28px");
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length(" 1.25rem "), Some((1.25, "rem".to_string())));
        assert_eq!(parse_length("16"), Some((16.0, String::new())));
        assert_eq!(parse_length("px"), None);
    }

    #[test]
    fn test_estimated_probe_wraps() {
        let mut probe = EstimatedProbe::new(100.0, 200.0);
        // 20px glyphs at 0.5em: 10 chars per line
        let one = probe.measure("hello", 20);
        assert_eq!(one.scroll_height, 30.0);
        let three = probe.measure("hello world again", 20);
        assert_eq!(three.scroll_height, 90.0);
        assert!(probe.measure("hello", 20).fits());
    }
}
