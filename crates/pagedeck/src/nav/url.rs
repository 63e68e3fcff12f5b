use serde::{Deserialize, Serialize};

use crate::compact::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    #[default]
    Decimal,
    Hex,
}

impl std::str::FromStr for UrlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decimal" => Ok(Self::Decimal),
            "hex" => Ok(Self::Hex),
            other => Err(format!("unknown url mode '{other}' (expected decimal or hex)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageCodec {
    /// Segment is `page + 1`.
    Decimal { page_count: usize },
    /// Segment is the slide index in hex (at least two digits) followed by two
    /// hex digits of the page within that slide.
    Hex { positions: Vec<(usize, usize)> },
}

impl PageCodec {
    pub fn decimal(page_count: usize) -> Self {
        Self::Decimal { page_count }
    }

    /// A codec for `pages` in the requested mode. Hex needs every page within
    /// a slide to fit two hex digits; otherwise decimal is used.
    pub fn for_pages<N>(mode: UrlMode, pages: &[Page<N>]) -> Self {
        match mode {
            UrlMode::Decimal => Self::decimal(pages.len()),
            UrlMode::Hex => {
                if let Some(page) = pages.iter().find(|p| p.page_within_slide > 0xff) {
                    log::warn!(
                        "slide {} has {} pages, too many for hex urls; using decimal",
                        page.slide_index,
                        page.page_within_slide + 1
                    );
                    return Self::decimal(pages.len());
                }
                Self::Hex {
                    positions: pages
                        .iter()
                        .map(|p| (p.slide_index, p.page_within_slide))
                        .collect(),
                }
            }
        }
    }

    pub fn page_count(&self) -> usize {
        match self {
            Self::Decimal { page_count } => *page_count,
            Self::Hex { positions } => positions.len(),
        }
    }

    /// The path segment for `page`.
    pub fn encode(&self, page: usize) -> String {
        match self {
            Self::Decimal { .. } => (page + 1).to_string(),
            Self::Hex { positions } => {
                let (slide, within) = positions.get(page).copied().unwrap_or((0, 0));
                format!("{slide:02x}{within:02x}")
            }
        }
    }

    /// The page named by a path segment, or 0.
    pub fn decode(&self, segment: &str) -> usize {
        let decoded = match self {
            Self::Decimal { page_count } => decode_decimal(segment)
                .filter(|page| page < page_count),
            Self::Hex { positions } => decode_hex(segment)
                .and_then(|pos| positions.iter().position(|p| *p == pos)),
        };
        decoded.unwrap_or_else(|| {
            if !segment.is_empty() {
                log::debug!("url segment {segment:?} names no page, using the cover");
            }
            0
        })
    }

    /// `path` with its last segment replaced by the encoding of `page`.
    pub fn encode_path(&self, path: &str, page: usize) -> String {
        let base = path.rsplit_once('/').map_or("", |(base, _)| base);
        format!("{base}/{}", self.encode(page))
    }

    pub fn decode_path(&self, path: &str) -> usize {
        let segment = path.rsplit('/').next().unwrap_or_default();
        self.decode(segment)
    }
}

fn decode_decimal(segment: &str) -> Option<usize> {
    let token = segment.split('.').next().unwrap_or_default();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<usize>().ok()?.checked_sub(1)
}

fn decode_hex(segment: &str) -> Option<(usize, usize)> {
    let token = segment.split('.').next().unwrap_or_default();
    if token.len() < 4 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let (slide, within) = token.split_at(token.len() - 2);
    Some((
        usize::from_str_radix(slide, 16).ok()?,
        usize::from_str_radix(within, 16).ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pages(shape: &[(usize, usize)]) -> Vec<Page<()>> {
        shape
            .iter()
            .map(|(slide_index, page_within_slide)| Page {
                content: (),
                slide_index: *slide_index,
                page_within_slide: *page_within_slide,
                full_bleed: false,
                chapter: None,
                iframe: None,
            })
            .collect()
    }

    #[test]
    fn test_decimal_paths() {
        let codec = PageCodec::decimal(10);
        assert_eq!(codec.encode_path("/deck/3", 0), "/deck/1");
        assert_eq!(codec.encode_path("/deck/", 4), "/deck/5");
        assert_eq!(codec.decode_path("/deck/5"), 4);
        assert_eq!(codec.decode_path("/deck/5.html"), 4);
    }

    #[test]
    fn test_decimal_invalid_is_cover() {
        let codec = PageCodec::decimal(3);
        for segment in ["", "0", "4", "abc", "-1", "+2", "99999999999999999999999"] {
            assert_eq!(codec.decode(segment), 0, "segment {segment:?}");
        }
    }

    #[test]
    fn test_hex_encoding() {
        let codec = PageCodec::for_pages(UrlMode::Hex, &pages(&[(0, 0), (2, 0), (2, 1), (17, 0)]));
        assert_eq!(codec.encode(2), "0201");
        assert_eq!(codec.encode(3), "1100");
        assert_eq!(codec.decode("0201"), 2);
        assert_eq!(codec.decode("0101"), 0);
        assert_eq!(codec.decode("zz01"), 0);
        assert_eq!(codec.decode("01"), 0);
    }

    #[test]
    fn test_hex_falls_back_when_slide_overflows() {
        let mut shape: Vec<(usize, usize)> = (0..=0x100).map(|i| (0, i)).collect();
        shape.push((1, 0));
        let codec = PageCodec::for_pages(UrlMode::Hex, &pages(&shape));
        assert_eq!(codec, PageCodec::decimal(shape.len()));
    }

    #[test]
    fn test_url_mode_from_str() {
        assert_eq!("HEX".parse::<UrlMode>(), Ok(UrlMode::Hex));
        assert!("octal".parse::<UrlMode>().is_err());
    }

    proptest! {
        #[test]
        fn decimal_round_trips(count in 1usize..500, seed in any::<usize>()) {
            let codec = PageCodec::decimal(count);
            let page = seed % count;
            prop_assert_eq!(codec.decode_path(&codec.encode_path("/talks/x", page)), page);
        }

        #[test]
        fn hex_round_trips(per_slide in prop::collection::vec(1usize..20, 1..40), seed in any::<usize>()) {
            let shape: Vec<(usize, usize)> = per_slide
                .iter()
                .enumerate()
                .flat_map(|(slide, n)| (0..*n).map(move |p| (slide * 3, p)))
                .collect();
            let codec = PageCodec::for_pages(UrlMode::Hex, &pages(&shape));
            let page = seed % shape.len();
            prop_assert_eq!(codec.decode_path(&codec.encode_path("/", page)), page);
        }
    }
}
