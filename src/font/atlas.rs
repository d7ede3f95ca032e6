//! Glyph atlas pages: 128 consecutive code points rasterized eagerly into
//! one GPU texture, laid out on a square grid.

use log::debug;

use crate::draw::{ImageFactory, TextureRef};
use crate::font::face::{GlyphBitmap, RasterFace};
use crate::geom::{Point, Rectf, Vec2};

/// Code points per page.
pub const PAGE_GLYPHS: u32 = PAGE_COLS * PAGE_ROWS;
const PAGE_COLS: u32 = 16;
const PAGE_ROWS: u32 = 8;

/// Placement data for one glyph slot. `glyph_index == 0` means the face has
/// no glyph for the code point; the slot then holds the face's notdef
/// rendering.
#[derive(Debug, Clone, Copy)]
pub struct GlyphInfo {
    /// Bitmap size in pixels.
    pub size: Vec2,
    /// Pen-to-bitmap-top-left offset; `y` is measured up from the baseline.
    pub bitmap_delta: Point,
    /// Pen advance.
    pub advance: Vec2,
    pub glyph_index: u16,
}

/// One atlas texture covering `[code_point_start, code_point_start + 128)`.
///
/// All 128 glyphs are rasterized up front; the grid cell is square and sized
/// to the largest bitmap on the page, so every glyph's sub-rectangle starts
/// at a fixed grid origin. The texture is RGBA8: white RGB with the coverage
/// bitmap in the alpha channel.
pub struct AtlasPage {
    code_point_start: u32,
    /// Grid cell edge in pixels.
    cell: u32,
    texture: TextureRef,
    glyphs: Vec<GlyphInfo>,
}

impl AtlasPage {
    pub fn build(
        face: &dyn RasterFace,
        px: f32,
        code_point_start: u32,
        factory: &ImageFactory,
    ) -> Self {
        // First pass: rasterize everything and find the largest bitmap.
        let mut bitmaps: Vec<GlyphBitmap> = Vec::with_capacity(PAGE_GLYPHS as usize);
        let mut indices: Vec<u16> = Vec::with_capacity(PAGE_GLYPHS as usize);
        let mut cell = 1u32;
        for offset in 0..PAGE_GLYPHS {
            let glyph_index = face.glyph_index(code_point_start + offset);
            let bitmap = face.rasterize(glyph_index, px);
            cell = cell.max(bitmap.width).max(bitmap.height);
            indices.push(glyph_index);
            bitmaps.push(bitmap);
        }

        // Second pass: pack row-major into one RGBA8 image.
        let tex_w = cell * PAGE_COLS;
        let tex_h = cell * PAGE_ROWS;
        let mut pixels = vec![0u8; (tex_w * tex_h * 4) as usize];
        for (slot, bitmap) in bitmaps.iter().enumerate() {
            let origin_x = (slot as u32 % PAGE_COLS) * cell;
            let origin_y = (slot as u32 / PAGE_COLS) * cell;
            for y in 0..bitmap.height {
                for x in 0..bitmap.width {
                    let coverage = bitmap.coverage[(y * bitmap.width + x) as usize];
                    let dst = (((origin_y + y) * tex_w + origin_x + x) * 4) as usize;
                    pixels[dst] = 0xff;
                    pixels[dst + 1] = 0xff;
                    pixels[dst + 2] = 0xff;
                    pixels[dst + 3] = coverage;
                }
            }
        }

        let texture = factory(tex_w, tex_h, &pixels);
        debug!(
            "built atlas page U+{:04X}..U+{:04X}: {}x{} px, cell {}",
            code_point_start,
            code_point_start + PAGE_GLYPHS - 1,
            tex_w,
            tex_h,
            cell,
        );

        let glyphs = bitmaps
            .iter()
            .zip(&indices)
            .map(|(bitmap, &glyph_index)| GlyphInfo {
                size: Vec2::new(bitmap.width as f32, bitmap.height as f32),
                bitmap_delta: bitmap.bitmap_delta,
                advance: bitmap.advance,
                glyph_index,
            })
            .collect();

        Self {
            code_point_start,
            cell,
            texture,
            glyphs,
        }
    }

    pub fn contains(&self, code_point: u32) -> bool {
        code_point >= self.code_point_start && code_point < self.code_point_start + PAGE_GLYPHS
    }

    pub fn texture(&self) -> TextureRef {
        self.texture
    }

    pub fn glyph(&self, code_point: u32) -> &GlyphInfo {
        assert!(self.contains(code_point));
        &self.glyphs[(code_point - self.code_point_start) as usize]
    }

    /// Normalized UV sub-rectangle of a glyph's bitmap within the page
    /// texture.
    pub fn uv_rect(&self, code_point: u32) -> Rectf {
        let slot = code_point - self.code_point_start;
        let glyph = self.glyph(code_point);
        let tex_w = (self.cell * PAGE_COLS) as f32;
        let tex_h = (self.cell * PAGE_ROWS) as f32;
        let x = ((slot % PAGE_COLS) * self.cell) as f32;
        let y = ((slot / PAGE_COLS) * self.cell) as f32;
        Rectf::new(
            x / tex_w,
            y / tex_h,
            glyph.size.x / tex_w,
            glyph.size.y / tex_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::testing::counting_factory;
    use crate::font::FakeFace;

    #[test]
    fn page_covers_contiguous_range() {
        let (factory, _uploads) = counting_factory();
        let page = AtlasPage::build(&FakeFace::ascii(), 16.0, 0, &factory);
        assert!(page.contains(0));
        assert!(page.contains(127));
        assert!(!page.contains(128));
        assert_eq!(page.glyph(u32::from('A')).glyph_index, 0x41 + 1);
    }

    #[test]
    fn page_uploads_one_image_sized_by_largest_glyph() {
        let (factory, uploads) = counting_factory();
        // The fake notdef is 6x6, real glyphs 4x6, so the cell is 6 px.
        let _page = AtlasPage::build(&FakeFace::ascii(), 16.0, 0x80, &factory);
        let uploads = uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0], (6 * 16, 6 * 8));
    }

    #[test]
    fn uv_rect_is_normalized_and_disjoint_per_slot() {
        let (factory, _uploads) = counting_factory();
        let page = AtlasPage::build(&FakeFace::ascii(), 16.0, 0, &factory);
        let a = page.uv_rect(u32::from('A'));
        let b = page.uv_rect(u32::from('B'));
        assert!(a.x >= 0.0 && a.max().x <= 1.0 && a.max().y <= 1.0);
        assert_ne!(a.min(), b.min());
    }
}
