//! A sized font: one rasterizer face plus its grown-only set of atlas
//! pages.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::draw::{ImageFactory, TextureRef};
use crate::font::atlas::{AtlasPage, GlyphInfo, PAGE_GLYPHS};
use crate::font::face::RasterFace;
use crate::font::{FontMetrics, FontSize};
use crate::geom::{Rectf, Vec2};

static NEXT_FONT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique font identity. Survives `set_size`; used by the shaper to
/// tell whether two resolved glyphs came from the same concrete font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u64);

/// A [`GlyphInfo`] plus everything needed to draw it: the page texture and
/// the glyph's UV sub-rectangle on it.
#[derive(Debug, Clone, Copy)]
pub struct GlyphRender {
    pub info: GlyphInfo,
    pub texture: TextureRef,
    pub uv: Rectf,
}

/// One face at one size. Atlas pages are created on first use of any code
/// point in their range and never evicted; `set_size` drops them all and
/// re-seeds the ASCII page.
pub struct Font {
    face: Box<dyn RasterFace>,
    factory: ImageFactory,
    pages: Vec<AtlasPage>,
    size: FontSize,
    metrics: FontMetrics,
    id: FontId,
}

impl Font {
    pub fn new(face: Box<dyn RasterFace>, factory: ImageFactory, size: FontSize) -> Self {
        let id = FontId(NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed));
        let metrics = face.metrics(size.pxs());
        let mut font = Self {
            face,
            factory,
            pages: Vec::new(),
            size,
            metrics,
            id,
        };
        font.page_for(u32::from(' '));
        font
    }

    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn size(&self) -> FontSize {
        self.size
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Change the rasterization size: every page is dropped and the ASCII
    /// page rebuilt, since glyph bitmaps and cell sizes all change.
    pub fn set_size(&mut self, size: FontSize) {
        if size == self.size {
            return;
        }
        self.pages.clear();
        self.size = size;
        self.metrics = self.face.metrics(size.pxs());
        self.page_for(u32::from(' '));
    }

    /// Glyph index straight from the face; 0 = unsupported code point.
    pub fn glyph_index(&self, code_point: u32) -> u16 {
        self.face.glyph_index(code_point)
    }

    pub fn glyph_info(&mut self, code_point: u32) -> GlyphInfo {
        let page = self.page_for(code_point);
        *self.pages[page].glyph(code_point)
    }

    pub fn glyph_render(&mut self, code_point: u32) -> GlyphRender {
        let page = self.page_for(code_point);
        let page = &self.pages[page];
        GlyphRender {
            info: *page.glyph(code_point),
            texture: page.texture(),
            uv: page.uv_rect(code_point),
        }
    }

    /// Kerning adjustment between two glyph indices. Zero unless the face
    /// kerns and both indices are defined.
    pub fn kerning_delta(&self, left: u16, right: u16) -> Vec2 {
        if left == 0 || right == 0 || !self.face.has_kerning() {
            return Vec2::ZERO;
        }
        Vec2::new(self.face.kerning(left, right, self.size.pxs()), 0.0)
    }

    /// Index of the page covering `code_point`, building it on a miss.
    ///
    /// TODO: linear scan over pages; switch to a start-sorted index if chains
    /// ever hold more than a handful of pages.
    fn page_for(&mut self, code_point: u32) -> usize {
        if let Some(i) = self.pages.iter().position(|p| p.contains(code_point)) {
            return i;
        }
        // Center the new page around the code point so neighbors land on the
        // same texture. Pages may overlap; the first hit wins on lookup.
        let start = code_point.saturating_sub(PAGE_GLYPHS / 2);
        self.pages.push(AtlasPage::build(
            self.face.as_ref(),
            self.size.pxs(),
            start,
            &self.factory,
        ));
        self.pages.len() - 1
    }

    #[cfg(test)]
    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }
}
