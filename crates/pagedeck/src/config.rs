use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compact::SplitPoints;
use crate::mobile::fit::DEFAULT_CANDIDATES;
use crate::nav::HistoryMode;
use crate::nav::input::{DEFAULT_SNAP_BAND_PX, DEFAULT_WHEEL_COOLDOWN_MS};
use crate::nav::url::UrlMode;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "pagedeck";

/// Viewport assumed when fitting fonts without a browser.
pub const DEFAULT_VIEWPORT: (u32, u32) = (390, 844);

const VALID_KEYS: &str = "mobile.list_split, mobile.url_mode, mobile.history, \
mobile.wheel_cooldown_ms, mobile.snap_band_px, mobile.font_sizes, mobile.viewport";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileConfig {
    /// Default list split points, e.g. `5` or `3, 4`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_split: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_mode: Option<UrlMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_cooldown_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_band_px: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_sizes: Option<Vec<u32>>,

    /// `<width>x<height>` in CSS pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
}

/// Fully resolved runtime settings. `build --runtime` embeds these in the page
/// as JSON for `mount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileSettings {
    pub list_split: Vec<usize>,
    pub url_mode: UrlMode,
    pub history: HistoryMode,
    pub wheel_cooldown_ms: f64,
    pub snap_band_px: f64,
    pub font_sizes: Vec<u32>,
    pub viewport: (u32, u32),
}

impl Default for MobileSettings {
    fn default() -> Self {
        Self {
            list_split: vec![SplitPoints::DEFAULT_SPLIT],
            url_mode: UrlMode::default(),
            history: HistoryMode::default(),
            wheel_cooldown_ms: DEFAULT_WHEEL_COOLDOWN_MS,
            snap_band_px: DEFAULT_SNAP_BAND_PX,
            font_sizes: DEFAULT_CANDIDATES.to_vec(),
            viewport: DEFAULT_VIEWPORT,
        }
    }
}

impl MobileSettings {
    pub fn split_points(&self) -> SplitPoints {
        SplitPoints::new(self.list_split.clone()).unwrap_or_default()
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `pagedeck config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# pagedeck configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Settings with every unset key at its default.
    pub fn mobile_settings(&self) -> MobileSettings {
        let mut settings = MobileSettings::default();
        let Some(mobile) = &self.mobile else {
            return settings;
        };
        if let Some(points) = mobile.list_split.as_deref().and_then(SplitPoints::parse) {
            settings.list_split = points.points().to_vec();
        }
        if let Some(mode) = mobile.url_mode {
            settings.url_mode = mode;
        }
        if let Some(history) = mobile.history {
            settings.history = history;
        }
        if let Some(ms) = mobile.wheel_cooldown_ms {
            settings.wheel_cooldown_ms = ms;
        }
        if let Some(px) = mobile.snap_band_px {
            settings.snap_band_px = px;
        }
        if let Some(sizes) = &mobile.font_sizes {
            settings.font_sizes = sizes.clone();
        }
        if let Some(viewport) = mobile.viewport.as_deref().and_then(parse_viewport) {
            settings.viewport = viewport;
        }
        settings
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mobile = self.mobile.get_or_insert_with(MobileConfig::default);
        match key {
            "mobile.list_split" => {
                if SplitPoints::parse(value).is_none() {
                    anyhow::bail!(
                        "Invalid list_split: {value}. Must be positive integers separated by commas."
                    );
                }
                mobile.list_split = Some(value.trim().to_string());
            }
            "mobile.url_mode" => {
                mobile.url_mode = Some(value.parse().map_err(|e: String| anyhow::anyhow!(e))?);
            }
            "mobile.history" => {
                mobile.history = Some(value.parse().map_err(|e: String| anyhow::anyhow!(e))?);
            }
            "mobile.wheel_cooldown_ms" => {
                mobile.wheel_cooldown_ms = Some(parse_non_negative(key, value)?);
            }
            "mobile.snap_band_px" => {
                mobile.snap_band_px = Some(parse_non_negative(key, value)?);
            }
            "mobile.font_sizes" => {
                let sizes = value
                    .split(',')
                    .map(|part| part.trim().parse::<u32>().ok().filter(|s| *s > 0))
                    .collect::<Option<Vec<_>>>();
                match sizes {
                    Some(mut sizes) if !sizes.is_empty() => {
                        sizes.sort_unstable_by(|a, b| b.cmp(a));
                        sizes.dedup();
                        mobile.font_sizes = Some(sizes);
                    }
                    _ => anyhow::bail!(
                        "Invalid font_sizes: {value}. Must be pixel sizes separated by commas."
                    ),
                }
            }
            "mobile.viewport" => {
                if parse_viewport(value).is_none() {
                    anyhow::bail!("Invalid viewport: {value}. Must look like '390x844'.");
                }
                mobile.viewport = Some(value.trim().to_string());
            }
            _ => anyhow::bail!("Unknown config key: {key}. Valid keys: {VALID_KEYS}"),
        }
        Ok(())
    }
}

fn parse_non_negative(key: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => anyhow::bail!("Invalid {key}: {value}. Must be a non-negative number."),
    }
}

/// Parse `<width>x<height>`.
pub fn parse_viewport(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<u32>().ok().filter(|w| *w > 0)?;
    let h = h.trim().parse::<u32>().ok().filter(|h| *h > 0)?;
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_mobile_section() {
        let settings = Config::default().mobile_settings();
        assert_eq!(settings, MobileSettings::default());
        assert_eq!(settings.split_points(), SplitPoints::default());
    }

    #[test]
    fn test_set_and_resolve() {
        let mut config = Config::default();
        config.set("mobile.list_split", "3, 4").unwrap();
        config.set("mobile.url_mode", "hex").unwrap();
        config.set("mobile.history", "replace").unwrap();
        config.set("mobile.font_sizes", "12, 24,18").unwrap();
        config.set("mobile.viewport", "360x640").unwrap();
        config.set("mobile.snap_band_px", "12").unwrap();

        let settings = config.mobile_settings();
        assert_eq!(settings.list_split, vec![3, 4]);
        assert_eq!(settings.url_mode, UrlMode::Hex);
        assert_eq!(settings.history, HistoryMode::Replace);
        assert_eq!(settings.font_sizes, vec![24, 18, 12]);
        assert_eq!(settings.viewport, (360, 640));
        assert_eq!(settings.snap_band_px, 12.0);
        assert_eq!(settings.wheel_cooldown_ms, DEFAULT_WHEEL_COOLDOWN_MS);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("mobile.list_split", "0").is_err());
        assert!(config.set("mobile.url_mode", "octal").is_err());
        assert!(config.set("mobile.wheel_cooldown_ms", "-5").is_err());
        assert!(config.set("mobile.font_sizes", "").is_err());
        assert!(config.set("mobile.viewport", "wide").is_err());
        let err = config.set("mobile.theme", "dark").unwrap_err().to_string();
        assert!(err.contains("mobile.viewport"), "{err}");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILENAME);
        let mut config = Config::default();
        config.set("mobile.history", "replace").unwrap();
        config.set("mobile.wheel_cooldown_ms", "450").unwrap();
        config.save_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# pagedeck configuration"));
        assert!(written.contains("history: replace"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.mobile, config.mobile);
    }

    #[test]
    fn test_missing_file_message() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join(FILENAME)).unwrap_err();
        assert!(err.to_string().contains("pagedeck config show"));
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("390x844"), Some((390, 844)));
        assert_eq!(parse_viewport(" 800 X 600 "), Some((800, 600)));
        assert_eq!(parse_viewport("0x600"), None);
        assert_eq!(parse_viewport("800"), None);
    }
}
