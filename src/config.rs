//! Configuration structures and loading logic.
//!
//! Every section and field has a default, so a missing or partial file is
//! never an error; a malformed file logs a warning and falls back to the
//! defaults.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub font: FontConfig,
    pub shaping: ShapingConfig,
    pub drawing: DrawingConfig,
}

/// Font configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    /// Size in pixels at 96 DPI; ignored when `size_pt` is set.
    pub size_px: f32,
    /// Size in points. Takes precedence over `size_px` when present.
    pub size_pt: Option<f32>,
    pub dpi: f32,
    /// Primary font file. `None` falls back to system font discovery.
    pub file: Option<String>,
    /// Fallback font files, tried in order.
    pub fallback_files: Vec<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            size_px: 16.0,
            size_pt: None,
            dpi: 96.0,
            file: None,
            fallback_files: Vec::new(),
        }
    }
}

impl FontConfig {
    pub fn size(&self) -> crate::font::FontSize {
        match self.size_pt {
            Some(pt) => crate::font::FontSize::pt(pt, self.dpi),
            None => crate::font::FontSize::px_at(self.size_px, self.dpi),
        }
    }
}

/// Text shaping configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShapingConfig {
    /// Wrap width in pixels; negative disables wrapping.
    pub wrap_width: i32,
    /// Treat `\r\n` as a single line break.
    pub use_crlf: bool,
    pub disable_kerning: bool,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            wrap_width: -1,
            use_crlf: false,
            disable_kerning: false,
        }
    }
}

impl ShapingConfig {
    pub fn apply(&self, shaper: &mut crate::shaper::TextShaper) {
        shaper.wrap_width = self.wrap_width;
        shaper.use_crlf = self.use_crlf;
        shaper.disable_kerning = self.disable_kerning;
    }
}

/// Primitive tessellation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DrawingConfig {
    pub circle_segments: u32,
    pub bezier_segments: u32,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            circle_segments: crate::draw::primitives::CIRCLE_SEGMENTS,
            bezier_segments: crate::draw::primitives::BEZIER_SEGMENTS,
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file is the default config; a
    /// malformed one logs a warning and also falls back to defaults.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                warn!("failed to parse {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default() {
        let parsed: Config = toml::from_str("").expect("deserialize");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [font]
            size_px = 20.0

            [shaping]
            wrap_width = 640
            "#,
        )
        .expect("deserialize");
        assert_eq!(parsed.font.size_px, 20.0);
        assert_eq!(parsed.font.dpi, 96.0);
        assert_eq!(parsed.shaping.wrap_width, 640);
        assert!(!parsed.shaping.use_crlf);
        assert_eq!(parsed.drawing, DrawingConfig::default());
    }

    #[test]
    fn point_size_takes_precedence() {
        let parsed: Config = toml::from_str(
            r#"
            [font]
            size_px = 20.0
            size_pt = 12.0
            dpi = 96.0
            "#,
        )
        .expect("deserialize");
        assert!((parsed.font.size().pts() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn shaping_config_applies_to_a_shaper() {
        let config = ShapingConfig {
            wrap_width: 200,
            use_crlf: true,
            disable_kerning: true,
        };
        let mut shaper = crate::shaper::TextShaper::new();
        config.apply(&mut shaper);
        assert_eq!(shaper.wrap_width, 200);
        assert!(shaper.use_crlf);
        assert!(shaper.disable_kerning);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/scrawl.toml"));
        assert_eq!(config, Config::default());
    }
}
