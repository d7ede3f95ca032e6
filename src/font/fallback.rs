//! Fallback chains: a primary font plus ordered fallbacks sharing one size,
//! with incrementally merged metrics.

use crate::font::atlas::GlyphInfo;
use crate::font::font::{Font, FontId, GlyphRender};
use crate::font::{FontMetrics, FontSize};
use crate::geom::Vec2;

/// Position of a font within its chain (0 = primary). Stable for the life
/// of the chain; lets callers refer back to the resolving font without
/// holding a borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSlot(pub(crate) usize);

impl FontSlot {
    pub const PRIMARY: Self = Self(0);

    pub fn is_primary(self) -> bool {
        self.0 == 0
    }
}

/// A glyph resolved through the chain, tagged with the font that supplied
/// it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedGlyph {
    pub render: GlyphRender,
    pub slot: FontSlot,
    pub font_id: FontId,
}

/// Primary font plus ordered fallbacks. Every member shares the primary's
/// [`FontSize`]; metrics are the element-wise merge over the whole chain so
/// lines reserve room for the tallest member.
pub struct FontFallback {
    fonts: Vec<Font>,
    metrics: FontMetrics,
}

impl FontFallback {
    pub fn new(primary: Font) -> Self {
        let metrics = primary.metrics();
        Self {
            fonts: vec![primary],
            metrics,
        }
    }

    /// Append a fallback. The font must already be at the chain's size.
    pub fn push_fallback(&mut self, font: Font) {
        assert!(
            font.size() == self.size(),
            "fallback font size differs from the chain's"
        );
        self.metrics.merge(&font.metrics());
        self.fonts.push(font);
    }

    pub fn size(&self) -> FontSize {
        self.fonts[0].size()
    }

    /// Merged metrics over the whole chain.
    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Chain length including the primary; never zero.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Resize every member and recompute the merged metrics.
    pub fn set_size(&mut self, size: FontSize) {
        for font in &mut self.fonts {
            font.set_size(size);
        }
        self.metrics = self.fonts[0].metrics();
        for font in &self.fonts[1..] {
            let m = font.metrics();
            self.metrics.merge(&m);
        }
    }

    pub fn font_id(&self, slot: FontSlot) -> FontId {
        self.fonts[slot.0].id()
    }

    /// Kerning between two glyph indices of the font at `slot`. The indices
    /// must both come from that font for the result to mean anything.
    pub fn kerning_delta(&self, slot: FontSlot, left: u16, right: u16) -> Vec2 {
        self.fonts[slot.0].kerning_delta(left, right)
    }

    /// Resolve a code point: the first font with a defined glyph wins; when
    /// none has one, the primary's placeholder (notdef) is used.
    pub fn glyph_render(&mut self, code_point: u32) -> ResolvedGlyph {
        let slot = self.resolve_slot(code_point);
        let font = &mut self.fonts[slot.0];
        ResolvedGlyph {
            render: font.glyph_render(code_point),
            slot,
            font_id: font.id(),
        }
    }

    /// Like [`FontFallback::glyph_render`] without touching texture data;
    /// used for measure-only shaping.
    pub fn glyph_info(&mut self, code_point: u32) -> (GlyphInfo, FontSlot, FontId) {
        let slot = self.resolve_slot(code_point);
        let font = &mut self.fonts[slot.0];
        (font.glyph_info(code_point), slot, font.id())
    }

    fn resolve_slot(&self, code_point: u32) -> FontSlot {
        FontSlot(
            self.fonts
                .iter()
                .position(|f| f.glyph_index(code_point) != 0)
                .unwrap_or(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::testing::counting_factory;
    use crate::font::{FakeFace, FontSize};

    fn font(max_code_point: u32) -> Font {
        let (factory, _uploads) = counting_factory();
        Font::new(
            Box::new(FakeFace {
                max_code_point,
                kerning: true,
            }),
            factory,
            FontSize::px(16.0),
        )
    }

    #[test]
    fn primary_wins_when_it_has_the_glyph() {
        let mut chain = FontFallback::new(font(0x80));
        chain.push_fallback(font(0x300));
        let resolved = chain.glyph_render(u32::from('A'));
        assert!(resolved.slot.is_primary());
        assert_ne!(resolved.render.info.glyph_index, 0);
    }

    #[test]
    fn fallback_supplies_missing_glyphs() {
        let mut chain = FontFallback::new(font(0x80));
        chain.push_fallback(font(0x300));
        let resolved = chain.glyph_render(0x200);
        assert_eq!(resolved.slot, FontSlot(1));
        assert_eq!(resolved.font_id, chain.font_id(FontSlot(1)));
        assert_ne!(resolved.render.info.glyph_index, 0);
    }

    #[test]
    fn unresolvable_code_point_uses_primary_placeholder() {
        let mut chain = FontFallback::new(font(0x80));
        chain.push_fallback(font(0x300));
        let resolved = chain.glyph_render(0x1F980);
        assert!(resolved.slot.is_primary());
        assert_eq!(resolved.render.info.glyph_index, 0);
    }

    #[test]
    fn merged_metrics_cover_every_member() {
        let chain_metrics = {
            let mut chain = FontFallback::new(font(0x80));
            chain.push_fallback(font(0x300));
            chain.metrics()
        };
        let solo = font(0x80).metrics();
        assert!(chain_metrics.ascent >= solo.ascent);
        assert!(chain_metrics.descent <= solo.descent);
    }

    #[test]
    #[should_panic]
    fn size_mismatch_is_rejected() {
        let mut chain = FontFallback::new(font(0x80));
        let (factory, _uploads) = counting_factory();
        let other = Font::new(
            Box::new(FakeFace::ascii()),
            factory,
            FontSize::px(20.0),
        );
        chain.push_fallback(other);
    }
}
