use std::ops::Range;

/// Item-count boundaries used to break a long list across pages.
///
/// The first point is how many items stay with the introducing paragraph; each
/// further point sizes one continuation page; whatever is left after the last
/// point lands on a final page of unlimited size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPoints(Vec<usize>);

impl SplitPoints {
    pub const DEFAULT_SPLIT: usize = 5;

    /// Every point must be at least 1 and there must be at least one.
    pub fn new(points: Vec<usize>) -> Option<Self> {
        (!points.is_empty() && points.iter().all(|p| *p > 0)).then_some(Self(points))
    }

    pub fn single(point: usize) -> Self {
        Self(vec![point.max(1)])
    }

    /// Parse a comma separated list such as `"3, 4, 4"`.
    pub fn parse(value: &str) -> Option<Self> {
        let points = value
            .split(',')
            .map(|part| part.trim().parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()?;
        Self::new(points)
    }

    /// Resolve a slide's split points from its `data-list-splits` and
    /// `data-list-split` attributes, the former taking precedence. Malformed
    /// values fall back to `fallback`.
    pub fn from_attributes(
        list_splits: Option<&str>,
        list_split: Option<&str>,
        fallback: &SplitPoints,
    ) -> SplitPoints {
        if let Some(raw) = list_splits {
            match Self::parse(raw) {
                Some(points) => return points,
                None => log::warn!("ignoring malformed list splits {raw:?}"),
            }
        }
        if let Some(raw) = list_split {
            match raw.trim().parse::<usize>() {
                Ok(point) if point > 0 => return Self::single(point),
                _ => log::warn!("ignoring malformed list split {raw:?}"),
            }
        }
        fallback.clone()
    }

    pub fn points(&self) -> &[usize] {
        &self.0
    }

    /// Partition `len` items into consecutive, non-empty ranges covering `0..len`.
    pub fn chunks(&self, len: usize) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for point in &self.0 {
            if start >= len {
                return ranges;
            }
            let end = (start + point).min(len);
            ranges.push(start..end);
            start = end;
        }
        if start < len {
            ranges.push(start..len);
        }
        ranges
    }
}

impl Default for SplitPoints {
    fn default() -> Self {
        Self::single(Self::DEFAULT_SPLIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split_of_seven() {
        assert_eq!(SplitPoints::default().chunks(7), vec![0..5, 5..7]);
    }

    #[test]
    fn test_short_list_is_one_chunk() {
        assert_eq!(SplitPoints::default().chunks(3), vec![0..3]);
        assert!(SplitPoints::default().chunks(0).is_empty());
    }

    #[test]
    fn test_multiple_points_with_remainder() {
        let splits = SplitPoints::parse("3,2").unwrap();
        assert_eq!(splits.chunks(10), vec![0..3, 3..5, 5..10]);
    }

    #[test]
    fn test_points_beyond_list_length() {
        let splits = SplitPoints::parse("2, 2, 2").unwrap();
        assert_eq!(splits.chunks(3), vec![0..2, 2..3]);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(SplitPoints::parse("3,x").is_none());
        assert!(SplitPoints::parse("0").is_none());
        assert!(SplitPoints::parse("-2").is_none());
        assert!(SplitPoints::parse("").is_none());
    }

    #[test]
    fn test_attribute_precedence_and_fallback() {
        let fallback = SplitPoints::default();
        assert_eq!(
            SplitPoints::from_attributes(Some("2,3"), Some("4"), &fallback),
            SplitPoints::parse("2,3").unwrap()
        );
        assert_eq!(
            SplitPoints::from_attributes(Some("bogus"), Some("4"), &fallback),
            SplitPoints::single(4)
        );
        assert_eq!(
            SplitPoints::from_attributes(None, Some("-1"), &fallback),
            fallback
        );
        assert_eq!(SplitPoints::from_attributes(None, None, &fallback), fallback);
    }
}
