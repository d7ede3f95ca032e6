//! Font handling: rasterizer faces, glyph atlas pages, fallback chains and
//! style-keyed families.
//!
//! A [`Font`] pairs one [`RasterFace`] with a set of eagerly-built
//! [`AtlasPage`]s, each covering 128 consecutive code points on one GPU
//! texture. A [`FontFallback`] chains fonts of the same size and resolves a
//! code point to the first font that has a real glyph for it. A
//! [`FontFamily`] keys four fallback chains by [`FontStyle`].

mod atlas;
mod face;
mod fallback;
mod font;

pub mod discovery;

pub use atlas::{AtlasPage, GlyphInfo, PAGE_GLYPHS};
pub use face::{FontdueFace, GlyphBitmap, RasterFace};
pub use fallback::{FontFallback, FontSlot, ResolvedGlyph};
pub use font::{Font, FontId, GlyphRender};

#[cfg(test)]
pub(crate) use face::testing::{FakeFace, FAKE_ADVANCE, FAKE_KERN};

/// Requested font size: pixels at a reference 96 DPI, or points, each paired
/// with the output DPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSize {
    value: f32,
    unit: SizeUnit,
    dpi: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeUnit {
    Px,
    Pt,
}

impl FontSize {
    /// Pixel size at the reference 96 DPI.
    pub fn px(value: f32) -> Self {
        Self::px_at(value, 96.0)
    }

    pub fn px_at(value: f32, dpi: f32) -> Self {
        assert!(value > 0.0 && dpi > 0.0);
        Self {
            value,
            unit: SizeUnit::Px,
            dpi,
        }
    }

    pub fn pt(value: f32, dpi: f32) -> Self {
        assert!(value > 0.0 && dpi > 0.0);
        Self {
            value,
            unit: SizeUnit::Pt,
            dpi,
        }
    }

    /// Device pixel size: the size glyphs are rasterized at.
    pub fn pxs(&self) -> f32 {
        match self.unit {
            SizeUnit::Px => self.value * self.dpi / 96.0,
            SizeUnit::Pt => self.value * self.dpi / 72.0,
        }
    }

    /// Point size (1 pt = 1/72 in).
    pub fn pts(&self) -> f32 {
        match self.unit {
            SizeUnit::Px => self.value * 72.0 / 96.0,
            SizeUnit::Pt => self.value,
        }
    }

    /// Ratio of the output DPI to the reference 96 DPI.
    pub fn dpi_scale(&self) -> f32 {
        self.dpi / 96.0
    }
}

/// Face-level vertical metrics in integer device pixels.
///
/// Sign conventions: `descent` and `underline_offset` are measured downward
/// from the baseline and are never positive; everything else is
/// non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
    pub line_height: i32,
    pub underline_offset: i32,
    pub underline_thickness: i32,
    pub max_advance: i32,
}

impl FontMetrics {
    /// Widen `self` to cover `other`: max of the upward/size fields, min of
    /// the downward ones. Used to maintain a fallback chain's merged metrics.
    pub fn merge(&mut self, other: &Self) {
        assert!(other.descent <= 0);
        assert!(other.underline_offset <= 0);
        self.ascent = self.ascent.max(other.ascent);
        self.line_height = self.line_height.max(other.line_height);
        self.underline_thickness = self.underline_thickness.max(other.underline_thickness);
        self.max_advance = self.max_advance.max(other.max_advance);
        self.descent = self.descent.min(other.descent);
        self.underline_offset = self.underline_offset.min(other.underline_offset);
    }
}

/// Text style, doubling as the slot index within a [`FontFamily`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular = 0,
    Bold = 1,
    Italic = 2,
    BoldItalic = 3,
}

impl FontStyle {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Four fallback chains keyed by style. Styles without a chain of their own
/// fall back to `Regular`, which must always be populated before use.
#[derive(Default)]
pub struct FontFamily {
    slots: [Option<FontFallback>; 4],
}

impl FontFamily {
    pub fn new(regular: FontFallback) -> Self {
        let mut family = Self::default();
        family.set(FontStyle::Regular, regular);
        family
    }

    pub fn set(&mut self, style: FontStyle, chain: FontFallback) {
        self.slots[style.index()] = Some(chain);
    }

    pub fn chain(&self, style: FontStyle) -> &FontFallback {
        match self.slots[style.index()]
            .as_ref()
            .or(self.slots[FontStyle::Regular.index()].as_ref())
        {
            Some(chain) => chain,
            None => panic!("font family has no regular chain"),
        }
    }

    pub fn chain_mut(&mut self, style: FontStyle) -> &mut FontFallback {
        let idx = if self.slots[style.index()].is_some() {
            style.index()
        } else {
            FontStyle::Regular.index()
        };
        match self.slots[idx].as_mut() {
            Some(chain) => chain,
            None => panic!("font family has no regular chain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_px_vs_pt() {
        let px = FontSize::px(16.0);
        assert!((px.pxs() - 16.0).abs() < 1e-6);
        assert!((px.pts() - 12.0).abs() < 1e-6);

        let pt = FontSize::pt(12.0, 96.0);
        assert!((pt.pxs() - 16.0).abs() < 1e-6);
        assert!((pt.pts() - 12.0).abs() < 1e-6);
        assert!((pt.dpi_scale() - 1.0).abs() < 1e-6);

        // Doubling the DPI doubles the device pixel size.
        let hidpi = FontSize::px_at(16.0, 192.0);
        assert!((hidpi.pxs() - 32.0).abs() < 1e-6);
        assert!((hidpi.dpi_scale() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn metrics_merge_takes_extremes() {
        let mut a = FontMetrics {
            ascent: 10,
            descent: -3,
            line_height: 14,
            underline_offset: -2,
            underline_thickness: 1,
            max_advance: 8,
        };
        let b = FontMetrics {
            ascent: 12,
            descent: -2,
            line_height: 13,
            underline_offset: -4,
            underline_thickness: 2,
            max_advance: 7,
        };
        a.merge(&b);
        assert_eq!(a.ascent, 12);
        assert_eq!(a.descent, -3);
        assert_eq!(a.line_height, 14);
        assert_eq!(a.underline_offset, -4);
        assert_eq!(a.underline_thickness, 2);
        assert_eq!(a.max_advance, 8);
    }

    #[test]
    #[should_panic]
    fn metrics_merge_rejects_positive_descent() {
        let mut a = FontMetrics::default();
        let bad = FontMetrics {
            descent: 1,
            ..FontMetrics::default()
        };
        a.merge(&bad);
    }

    #[test]
    fn font_style_indices() {
        assert_eq!(FontStyle::Regular.index(), 0);
        assert_eq!(FontStyle::BoldItalic.index(), 3);
    }
}
