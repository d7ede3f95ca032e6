//! The rasterizer seam: [`RasterFace`] is everything the atlas and shaper
//! need from a font file, and [`FontdueFace`] implements it with `fontdue`
//! (bitmaps, kerning) plus `ttf-parser` (underline metrics, kern-table
//! presence, global bounding box).

use std::path::Path;

use crate::font::FontMetrics;
use crate::geom::{Point, Vec2};

/// One rasterized glyph: a grayscale coverage bitmap plus placement metrics.
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the bitmap's top-left corner:
    /// `x` is the left side bearing, `y` the distance from the baseline up
    /// to the top row (both in device pixels).
    pub bitmap_delta: Point,
    /// Pen advance after this glyph.
    pub advance: Vec2,
    /// `width * height` coverage bytes, row-major, 0 = transparent.
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            bitmap_delta: Point::ZERO,
            advance: Vec2::ZERO,
            coverage: Vec::new(),
        }
    }
}

/// What a font backend must provide. Glyph index 0 is the undefined glyph
/// and doubles as the placeholder for unsupported code points.
pub trait RasterFace {
    /// Glyph index for a code point; 0 when the face has no glyph for it.
    fn glyph_index(&self, code_point: u32) -> u16;

    /// Rasterize one glyph at `px` device pixels. Index 0 yields the face's
    /// notdef glyph.
    fn rasterize(&self, glyph_index: u16, px: f32) -> GlyphBitmap;

    /// Face-level vertical metrics at `px` device pixels.
    fn metrics(&self, px: f32) -> FontMetrics;

    /// Whether the face carries a kerning table at all.
    fn has_kerning(&self) -> bool;

    /// Horizontal kerning adjustment between two glyph indices, in device
    /// pixels. Only meaningful when [`RasterFace::has_kerning`] is true.
    fn kerning(&self, left: u16, right: u16, px: f32) -> f32;
}

/// `fontdue`-backed [`RasterFace`]. Face-wide properties fontdue does not
/// expose are read once from `ttf-parser` at construction.
pub struct FontdueFace {
    inner: fontdue::Font,
    has_kerning: bool,
    units_per_em: f32,
    /// Underline (position, thickness) in font units; position is negative.
    underline_units: Option<(f32, f32)>,
    /// Width of the global bounding box in font units.
    bbox_width_units: f32,
}

impl FontdueFace {
    /// Parse face `index` out of `data`. Returns `None` when either parser
    /// rejects the file.
    pub fn from_bytes(data: &[u8], index: u32) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, index).ok()?;
        let has_kerning = face.tables().kern.is_some();
        let units_per_em = f32::from(face.units_per_em());
        let underline_units = face
            .underline_metrics()
            .map(|m| (f32::from(m.position), f32::from(m.thickness)));
        let bbox = face.global_bounding_box();
        let bbox_width_units = f32::from(bbox.x_max) - f32::from(bbox.x_min);

        let settings = fontdue::FontSettings {
            collection_index: index,
            ..fontdue::FontSettings::default()
        };
        let inner = fontdue::Font::from_bytes(data, settings).ok()?;

        Some(Self {
            inner,
            has_kerning,
            units_per_em,
            underline_units,
            bbox_width_units,
        })
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let data = std::fs::read(path).ok()?;
        Self::from_bytes(&data, 0)
    }
}

impl RasterFace for FontdueFace {
    fn glyph_index(&self, code_point: u32) -> u16 {
        match char::from_u32(code_point) {
            Some(ch) => self.inner.lookup_glyph_index(ch),
            None => 0,
        }
    }

    fn rasterize(&self, glyph_index: u16, px: f32) -> GlyphBitmap {
        let (m, coverage) = self.inner.rasterize_indexed(glyph_index, px);
        GlyphBitmap {
            width: m.width as u32,
            height: m.height as u32,
            // fontdue's ymin is baseline-to-bottom; the top row sits
            // ymin + height above the baseline.
            bitmap_delta: Point::new(m.xmin, m.ymin + m.height as i32),
            advance: Vec2::new(m.advance_width, 0.0),
            coverage,
        }
    }

    fn metrics(&self, px: f32) -> FontMetrics {
        let (ascent, descent, line_height) = match self.inner.horizontal_line_metrics(px) {
            Some(m) => (m.ascent, m.descent, m.new_line_size),
            // Degenerate face without horizontal metrics.
            None => (px * 0.8, -(px * 0.2), px),
        };
        let scale = px / self.units_per_em;
        let (underline_offset, underline_thickness) = self
            .underline_units
            .map_or((-(px / 14.0), px / 14.0), |(pos, thick)| {
                (pos * scale, thick * scale)
            });

        FontMetrics {
            ascent: ascent.ceil() as i32,
            descent: descent.floor().min(0.0) as i32,
            line_height: line_height.ceil() as i32,
            underline_offset: underline_offset.floor().min(0.0) as i32,
            underline_thickness: (underline_thickness.ceil() as i32).max(1),
            max_advance: (self.bbox_width_units * scale).ceil() as i32,
        }
    }

    fn has_kerning(&self) -> bool {
        self.has_kerning
    }

    fn kerning(&self, left: u16, right: u16, px: f32) -> f32 {
        self.inner
            .horizontal_kern_indexed(left, right, px)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic face for unit tests: supports code points below
    /// `max_code_point` (glyph index = code point + 1), renders every glyph
    /// as a fixed 4×6 solid block, and kerns every pair by -1 px.
    pub(crate) struct FakeFace {
        pub max_code_point: u32,
        pub kerning: bool,
    }

    impl FakeFace {
        pub fn ascii() -> Self {
            Self {
                max_code_point: 0x80,
                kerning: true,
            }
        }
    }

    pub(crate) const FAKE_ADVANCE: f32 = 5.0;
    pub(crate) const FAKE_KERN: f32 = -1.0;

    impl RasterFace for FakeFace {
        fn glyph_index(&self, code_point: u32) -> u16 {
            if code_point < self.max_code_point {
                (code_point + 1) as u16
            } else {
                0
            }
        }

        fn rasterize(&self, glyph_index: u16, _px: f32) -> GlyphBitmap {
            if glyph_index == 0 {
                // Fake notdef: a wider block so the placeholder is
                // distinguishable.
                return GlyphBitmap {
                    width: 6,
                    height: 6,
                    bitmap_delta: Point::new(0, 6),
                    advance: Vec2::new(FAKE_ADVANCE + 2.0, 0.0),
                    coverage: vec![0xff; 36],
                };
            }
            GlyphBitmap {
                width: 4,
                height: 6,
                bitmap_delta: Point::new(0, 6),
                advance: Vec2::new(FAKE_ADVANCE, 0.0),
                coverage: vec![0xff; 24],
            }
        }

        fn metrics(&self, _px: f32) -> FontMetrics {
            FontMetrics {
                ascent: 8,
                descent: -2,
                line_height: 10,
                underline_offset: -1,
                underline_thickness: 1,
                max_advance: 8,
            }
        }

        fn has_kerning(&self) -> bool {
            self.kerning
        }

        fn kerning(&self, _left: u16, _right: u16, _px: f32) -> f32 {
            FAKE_KERN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeFace;
    use super::*;

    #[test]
    fn fake_face_glyph_indices() {
        let face = FakeFace::ascii();
        assert_eq!(face.glyph_index(u32::from('A')), u32::from('A') as u16 + 1);
        assert_eq!(face.glyph_index(0x80), 0);
        assert_eq!(face.glyph_index(0x1F980), 0);
    }

    #[test]
    fn fake_face_notdef_is_distinct() {
        let face = FakeFace::ascii();
        let notdef = face.rasterize(0, 16.0);
        let real = face.rasterize(1, 16.0);
        assert_ne!(notdef.width, real.width);
        assert_eq!(notdef.coverage.len(), (notdef.width * notdef.height) as usize);
    }
}
