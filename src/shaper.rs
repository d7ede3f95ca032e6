//! Streaming text shaper: turns UTF-8 runs into positioned glyph quads and
//! decoration rectangles across three command lists (background, glyphs,
//! foreground), with line wrapping and per-run markup.
//!
//! Coordinates are baseline-relative: the first line's baseline starts at
//! the origin and later baselines step down by the line height. [`TextShaper::draw`]
//! merges the finished lists into a caller's list with a translation, so
//! the same shaped text can be stamped anywhere.

use log::debug;

use crate::draw::{primitives, ClipRect, CommandList};
use crate::font::{FontFallback, FontId, FontMetrics, FontSlot};
use crate::geom::{Color, Point, Rectf, Recti, Vec2};
use crate::utf8::CodePointStream;

/// Styling for one run of text. A decoration is enabled iff its color has
/// non-zero alpha.
#[derive(Debug, Clone, Copy)]
pub struct Markup {
    pub color: Color,
    pub underline_color: Color,
    pub overline_color: Color,
    pub strikethrough_color: Color,
    pub background_color: Color,
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            underline_color: Color::TRANSPARENT,
            overline_color: Color::TRANSPARENT,
            strikethrough_color: Color::TRANSPARENT,
            background_color: Color::TRANSPARENT,
        }
    }
}

impl Markup {
    pub fn colored(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn has_underline(&self) -> bool {
        self.underline_color.a > 0
    }

    pub fn has_overline(&self) -> bool {
        self.overline_color.a > 0
    }

    pub fn has_strikethrough(&self) -> bool {
        self.strikethrough_color.a > 0
    }

    pub fn has_background(&self) -> bool {
        self.background_color.a > 0
    }
}

/// Shaped-text bounding box in baseline-relative integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub rect: Recti,
}

impl TextMetrics {
    /// Offset that moves the box's top-left corner to the origin; add it to
    /// a draw position to top-left-align the text.
    pub fn baseline_offset(&self) -> Point {
        Point::ZERO - self.rect.min()
    }

    pub fn size(&self) -> Point {
        Point::new(self.rect.width, self.rect.height)
    }
}

/// Per-line shaping state. Lines are exposed read-only after shaping for
/// hit-testing against the covered byte ranges.
#[derive(Debug, Clone)]
pub struct ShaperLine {
    /// Pen position after the last glyph; `pen.y` is the line's baseline.
    pub pen: Point,
    /// Metrics merged over every font that contributed a glyph to the line.
    pub metrics: FontMetrics,
    /// Tight ink bounding box of the line.
    pub min_aabb: Recti,
    /// Byte offsets (into the concatenation of all added text) this line
    /// covers, terminator included.
    pub text_offset_start: usize,
    pub text_offset_end: usize,
    last_glyph_index: u16,
    last_glyph_slot: FontSlot,
    last_glyph_font: Option<FontId>,
}

/// Pen offset from a line's top edge down to its baseline, negated (the
/// baseline sits below the top). Descent is negative.
fn line_to_baseline_offset(m: &FontMetrics) -> i32 {
    let descent = -m.descent + 1;
    -(m.line_height - descent)
}

/// Streaming shaper. Feed text with [`TextShaper::text_add`] (multiple runs with
/// different markup/chains are fine), then [`TextShaper::finish`] exactly once;
/// metrics and [`TextShaper::draw`] are only valid afterwards. Adding text after
/// `finish` is a fatal contract violation.
pub struct TextShaper {
    /// Wrap lines once the pen passes this width; negative disables
    /// wrapping. A glyph is never split: wrapping happens after the glyph
    /// that crossed the limit.
    pub wrap_width: i32,
    /// Collapse `\r\n` into one line break while decoding.
    pub use_crlf: bool,
    pub disable_kerning: bool,

    emit_geometry: bool,
    finished: bool,
    lines: Vec<ShaperLine>,
    bytes_consumed: usize,
    min_aabb: Recti,
    metrics: FontMetrics,
    height_by_lines: i32,

    background_list: CommandList,
    glyph_list: CommandList,
    foreground_list: CommandList,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self {
            wrap_width: -1,
            use_crlf: false,
            disable_kerning: false,
            emit_geometry: true,
            finished: false,
            lines: Vec::new(),
            bytes_consumed: 0,
            min_aabb: Recti::default(),
            metrics: FontMetrics::default(),
            height_by_lines: 0,
            background_list: CommandList::new(),
            glyph_list: CommandList::new(),
            foreground_list: CommandList::new(),
        }
    }
}

impl TextShaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shaper that computes pens, AABBs and metrics but emits no geometry.
    pub fn measure_only() -> Self {
        Self {
            emit_geometry: false,
            ..Self::default()
        }
    }

    pub fn lines(&self) -> &[ShaperLine] {
        &self.lines
    }

    /// Total bytes consumed so far, malformed sequences included.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Shape a run of text with one markup. Decode errors are skipped but
    /// still count toward the byte offsets.
    pub fn text_add(&mut self, text: &str, chain: &mut FontFallback, markup: &Markup) {
        self.text_add_bytes(text.as_bytes(), chain, markup);
    }

    pub fn text_add_bytes(&mut self, bytes: &[u8], chain: &mut FontFallback, markup: &Markup) {
        assert!(!self.finished, "text added to a finished shaper");

        // Empty text still opens the initial line so metrics make sense.
        if self.lines.is_empty() {
            self.line_setup_new(chain.metrics());
        }

        for event in CodePointStream::new(bytes, self.use_crlf) {
            let len = event.byte_len();
            if len == 0 {
                continue;
            }
            if event.code_point == 0 && !event.is_newline {
                // Malformed sequence: no glyph, but the bytes were consumed.
                self.bytes_consumed += len;
                continue;
            }
            self.add_code_point(event.code_point, chain, markup, len);
        }
    }

    /// Shape one code point. `bytes_consumed` is its encoded length, used
    /// to maintain per-line byte ranges.
    pub fn add_code_point(
        &mut self,
        code_point: u32,
        chain: &mut FontFallback,
        markup: &Markup,
        bytes_consumed: usize,
    ) {
        assert!(!self.finished, "text added to a finished shaper");
        if self.lines.is_empty() {
            self.line_setup_new(chain.metrics());
        }
        self.bytes_consumed += bytes_consumed;

        if code_point == u32::from('\n') {
            self.line_move_to_new(chain.metrics());
            return;
        }

        let font_metrics = chain.metrics();
        let resolved = chain.glyph_render(code_point);
        let info = resolved.render.info;

        let line = self.lines.last().expect("line exists");
        // Kern only against a predecessor from the same concrete font, and
        // only when that font is still reachable through the current chain.
        let kerning = match line.last_glyph_font {
            Some(prev_font)
                if !self.disable_kerning
                    && prev_font == resolved.font_id
                    && line.last_glyph_slot.0 < chain.len()
                    && chain.font_id(line.last_glyph_slot) == prev_font =>
            {
                let delta = chain.kerning_delta(
                    line.last_glyph_slot,
                    line.last_glyph_index,
                    info.glyph_index,
                );
                Point::new(delta.x.round() as i32, delta.y.round() as i32)
            }
            _ => Point::ZERO,
        };

        let glyph_rect = Recti::new(
            line.pen.x + kerning.x + info.bitmap_delta.x,
            line.pen.y + kerning.y - info.bitmap_delta.y,
            info.size.x as i32,
            info.size.y as i32,
        );
        // Decorations kern horizontally with the glyph but stay on the
        // line's baseline; only the glyph bitmap follows a vertical kern.
        let pen_x = (line.pen.x + kerning.x) as f32;
        let baseline_y = line.pen.y as f32;

        // Geometry is recorded unclipped; clipping is applied when the
        // lists are merged in draw().
        if self.emit_geometry {
            if markup.has_background() {
                let prev_pen = self.line_pen(self.lines.len() - 1, &font_metrics);
                let top = prev_pen.y + line_to_baseline_offset(&font_metrics);
                primitives::rect_fill(
                    &mut self.background_list,
                    Rectf::new(
                        pen_x,
                        top as f32,
                        info.advance.x,
                        font_metrics.line_height as f32,
                    ),
                    markup.background_color,
                    Vec2::ONE,
                    ClipRect::NONE,
                );
            }
            if markup.has_underline() {
                assert!(font_metrics.underline_offset <= 0);
                let thickness = font_metrics.underline_thickness as f32;
                let offset = -(font_metrics.underline_offset as f32) - thickness / 2.0;
                primitives::rect_fill(
                    &mut self.background_list,
                    Rectf::new(pen_x, baseline_y + offset, info.advance.x, thickness),
                    markup.underline_color,
                    Vec2::ONE,
                    ClipRect::NONE,
                );
            }
            if markup.has_overline() {
                let thickness = font_metrics.underline_thickness as f32;
                let offset = font_metrics.ascent as f32 - thickness / 2.0;
                primitives::rect_fill(
                    &mut self.background_list,
                    Rectf::new(pen_x, baseline_y - offset, info.advance.x, thickness),
                    markup.overline_color,
                    Vec2::ONE,
                    ClipRect::NONE,
                );
            }

            primitives::image(
                &mut self.glyph_list,
                resolved.render.texture,
                Rectf::new(
                    glyph_rect.x as f32,
                    glyph_rect.y as f32,
                    glyph_rect.width as f32,
                    glyph_rect.height as f32,
                ),
                resolved.render.uv,
                markup.color,
                Vec2::ONE,
                ClipRect::NONE,
            );

            if markup.has_strikethrough() {
                let thickness = font_metrics.underline_thickness as f32;
                let offset = 0.33 * font_metrics.ascent as f32 + thickness / 2.0;
                primitives::rect_fill(
                    &mut self.foreground_list,
                    Rectf::new(pen_x, baseline_y - offset, info.advance.x, thickness),
                    markup.strikethrough_color,
                    Vec2::ONE,
                    ClipRect::NONE,
                );
            }
        }

        let line = self.lines.last_mut().expect("line exists");
        line.metrics.merge(&font_metrics);
        line.min_aabb = line.min_aabb.union(&glyph_rect);
        line.last_glyph_index = info.glyph_index;
        line.last_glyph_slot = resolved.slot;
        line.last_glyph_font = Some(resolved.font_id);
        line.pen.x += kerning.x;
        line.pen += Point::new(info.advance.x as i32, info.advance.y as i32);

        if self.wrap_required() {
            self.line_move_to_new(chain.metrics());
        }
    }

    /// Close the last line. Mandatory before metrics or drawing; calling
    /// twice is a fatal contract violation.
    pub fn finish(&mut self) {
        assert!(!self.finished, "shaper finished twice");
        assert!(!self.lines.is_empty(), "shaper finished without any text run");
        self.finished = true;
        self.close_last_line();
        debug!(
            "shaped {} bytes into {} line(s)",
            self.bytes_consumed,
            self.lines.len()
        );
    }

    /// Line-height box: full lines stacked from the first line's top edge.
    /// Always at least as tall as [`TextShaper::metrics_min`].
    pub fn metrics(&self) -> TextMetrics {
        assert!(self.finished, "metrics read before finish()");
        let top_line = &self.lines[0];
        let pen = self.line_pen(0, &top_line.metrics);
        let mut rect = self.min_aabb;
        rect.y = pen.y + line_to_baseline_offset(&top_line.metrics);
        rect.height = self.height_by_lines;
        TextMetrics { rect }
    }

    /// Tight ink box: the union of every glyph's bitmap rectangle.
    pub fn metrics_min(&self) -> TextMetrics {
        assert!(self.finished, "metrics read before finish()");
        TextMetrics {
            rect: self.min_aabb,
        }
    }

    /// Merge the three lists into `target` in paint order (background,
    /// glyphs, foreground), translating by `baseline_offset` and stamping
    /// `clip` onto every command.
    pub fn draw(&self, target: &mut CommandList, baseline_offset: Vec2, clip: ClipRect) {
        assert!(self.finished, "draw before finish()");
        assert!(self.emit_geometry, "draw on a measure-only shaper");
        target.merge(&self.background_list, Some(baseline_offset), Some(clip));
        target.merge(&self.glyph_list, Some(baseline_offset), Some(clip));
        target.merge(&self.foreground_list, Some(baseline_offset), Some(clip));
    }

    #[cfg(test)]
    pub(crate) fn command_lists(&self) -> (&CommandList, &CommandList, &CommandList) {
        (&self.background_list, &self.glyph_list, &self.foreground_list)
    }

    fn line_pen(&self, line_index: usize, metrics: &FontMetrics) -> Point {
        if line_index == 0 {
            return Point::ZERO;
        }
        assert!(line_index <= self.lines.len());
        let prev = &self.lines[line_index - 1];
        Point::new(0, prev.pen.y + metrics.line_height)
    }

    fn line_setup_new(&mut self, chain_metrics: FontMetrics) {
        let pen = self.line_pen(self.lines.len(), &chain_metrics);
        self.lines.push(ShaperLine {
            pen,
            metrics: chain_metrics,
            min_aabb: Recti::from_point(pen),
            text_offset_start: self.bytes_consumed,
            text_offset_end: self.bytes_consumed,
            last_glyph_index: 0,
            last_glyph_slot: FontSlot::PRIMARY,
            last_glyph_font: None,
        });
    }

    fn close_last_line(&mut self) {
        let last = self.lines.last_mut().expect("line exists");
        last.text_offset_end = self.bytes_consumed;
        self.height_by_lines += last.metrics.line_height;
        self.min_aabb = self.min_aabb.union(&last.min_aabb);
        let line_metrics = last.metrics;
        self.metrics.merge(&line_metrics);
    }

    fn line_move_to_new(&mut self, chain_metrics: FontMetrics) {
        assert!(!self.lines.is_empty());
        self.close_last_line();
        self.line_setup_new(chain_metrics);
    }

    fn wrap_required(&self) -> bool {
        if self.wrap_width < 0 {
            return false;
        }
        let line = self.lines.last().expect("line exists");
        line.pen.x >= self.wrap_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::testing::counting_factory;
    use crate::draw::TextureRef;
    use crate::font::{FakeFace, Font, FontSize, FAKE_ADVANCE, FAKE_KERN};

    // FakeFace: advance 5, kern -1, line_height 10, ascent 8, descent -2.
    fn chain() -> FontFallback {
        let (factory, _uploads) = counting_factory();
        FontFallback::new(Font::new(
            Box::new(FakeFace::ascii()),
            factory,
            FontSize::px(16.0),
        ))
    }

    fn chain_with_fallback() -> FontFallback {
        let (factory, _uploads) = counting_factory();
        let mut chain = FontFallback::new(Font::new(
            Box::new(FakeFace::ascii()),
            factory.clone(),
            FontSize::px(16.0),
        ));
        chain.push_fallback(Font::new(
            Box::new(FakeFace {
                max_code_point: 0x300,
                kerning: true,
            }),
            factory,
            FontSize::px(16.0),
        ));
        chain
    }

    #[test]
    fn newline_steps_baseline_by_line_height() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("ab\ncd", &mut chain, &Markup::default());
        shaper.finish();

        let lines = shaper.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].pen.y, 0);
        assert_eq!(lines[1].pen.y, 10);
        assert_eq!(shaper.metrics().rect.height, 20);
    }

    #[test]
    fn line_byte_ranges_cover_the_input() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("ab\ncd", &mut chain, &Markup::default());
        shaper.finish();

        let lines = shaper.lines();
        assert_eq!(lines[0].text_offset_start, 0);
        assert_eq!(lines[0].text_offset_end, 3); // "ab\n"
        assert_eq!(lines[1].text_offset_start, 3);
        assert_eq!(lines[1].text_offset_end, 5);
    }

    #[test]
    fn kerning_applies_within_one_font() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("AB", &mut chain, &Markup::default());
        shaper.finish();

        // First glyph has no predecessor; second kerns by -1.
        let expected = FAKE_ADVANCE as i32 + (FAKE_KERN + FAKE_ADVANCE) as i32;
        assert_eq!(shaper.lines()[0].pen.x, expected);
    }

    #[test]
    fn kerning_resets_across_a_font_switch() {
        let mut chain = chain_with_fallback();
        let mut shaper = TextShaper::new();
        // 'A' resolves from the primary, U+0100 from the fallback: no
        // kerning pair spans two fonts.
        shaper.add_code_point(u32::from('A'), &mut chain, &Markup::default(), 1);
        shaper.add_code_point(0x100, &mut chain, &Markup::default(), 2);
        shaper.finish();

        assert_eq!(shaper.lines()[0].pen.x, 2 * FAKE_ADVANCE as i32);
    }

    #[test]
    fn disable_kerning_wins() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.disable_kerning = true;
        shaper.text_add("AB", &mut chain, &Markup::default());
        shaper.finish();
        assert_eq!(shaper.lines()[0].pen.x, 2 * FAKE_ADVANCE as i32);
    }

    #[test]
    fn wrap_breaks_after_the_crossing_glyph() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.wrap_width = 8;
        shaper.text_add("ABC", &mut chain, &Markup::default());
        shaper.finish();

        // 'A' -> pen 5, 'B' -> pen 9 >= 8 wraps, 'C' lands on line 2.
        let lines = shaper.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].pen.y, 10);
        assert_eq!(lines[1].pen.x, FAKE_ADVANCE as i32);
    }

    #[test]
    fn decorations_land_in_their_lists() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        let markup = Markup {
            color: Color::WHITE,
            underline_color: Color::rgb(0xff, 0, 0),
            overline_color: Color::TRANSPARENT,
            strikethrough_color: Color::rgb(0, 0xff, 0),
            background_color: Color::rgb(0, 0, 0xff),
        };
        shaper.text_add("x", &mut chain, &markup);
        shaper.finish();

        let (bg, glyphs, fg) = shaper.command_lists();
        // Background quad + underline quad.
        assert_eq!(bg.vertices.len(), 8);
        assert_eq!(bg.cmds[0].texture, TextureRef::WHITE);
        // One textured glyph quad.
        assert_eq!(glyphs.vertices.len(), 4);
        assert_ne!(glyphs.cmds[0].texture, TextureRef::WHITE);
        // Strikethrough only.
        assert_eq!(fg.vertices.len(), 4);
    }

    #[test]
    fn underline_kerns_horizontally_but_keeps_its_row() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        let markup = Markup {
            underline_color: Color::rgb(0xff, 0, 0),
            ..Markup::default()
        };
        shaper.text_add("AB", &mut chain, &markup);
        shaper.finish();

        let (bg, _, _) = shaper.command_lists();
        // One underline quad per glyph; each quad's first vertex is its
        // top-left corner.
        assert_eq!(bg.vertices.len(), 8);
        assert_eq!(bg.vertices[0].pos.x, 0.0);
        assert_eq!(bg.vertices[4].pos.x, FAKE_ADVANCE + FAKE_KERN);
        assert_eq!(bg.vertices[0].pos.y, bg.vertices[4].pos.y);
    }

    #[test]
    fn measure_only_emits_no_geometry() {
        let mut chain = chain();
        let mut shaper = TextShaper::measure_only();
        shaper.text_add("hello", &mut chain, &Markup::default());
        shaper.finish();

        let (bg, glyphs, fg) = shaper.command_lists();
        assert!(bg.is_empty() && glyphs.is_empty() && fg.is_empty());
        assert!(shaper.metrics().rect.width > 0);
    }

    #[test]
    fn decode_errors_are_skipped_but_counted() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add_bytes(b"A\xC0\x80B", &mut chain, &Markup::default());
        shaper.finish();

        assert_eq!(shaper.bytes_consumed(), 4);
        // Only 'A' and 'B' produced glyphs.
        let (_, glyphs, _) = shaper.command_lists();
        assert_eq!(glyphs.vertices.len(), 8);
    }

    #[test]
    fn metrics_box_contains_ink_box() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("jump\nhigh", &mut chain, &Markup::default());
        shaper.finish();

        let full = shaper.metrics().rect;
        let ink = shaper.metrics_min().rect;
        assert!(full.height >= ink.height);
    }

    #[test]
    fn draw_merges_in_paint_order_with_translation() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        let markup = Markup {
            background_color: Color::rgb(0, 0, 0xff),
            strikethrough_color: Color::rgb(0, 0xff, 0),
            ..Markup::default()
        };
        shaper.text_add("ok", &mut chain, &markup);
        shaper.finish();

        let mut target = CommandList::new();
        let clip = ClipRect::new(Rectf::new(0.0, 0.0, 100.0, 100.0));
        shaper.draw(&mut target, Vec2::new(10.0, 20.0), clip);

        assert_eq!(target.cmds.len(), 3);
        assert_eq!(target.cmds[0].texture, TextureRef::WHITE);
        assert_ne!(target.cmds[1].texture, TextureRef::WHITE);
        assert_eq!(target.cmds[2].texture, TextureRef::WHITE);
        assert!(target.cmds.iter().all(|c| c.clip == clip));
        // Background starts at the translated pen.
        assert_eq!(target.vertices[0].pos.x, 10.0);
    }

    #[test]
    #[should_panic]
    fn double_finish_is_fatal() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("x", &mut chain, &Markup::default());
        shaper.finish();
        shaper.finish();
    }

    #[test]
    #[should_panic]
    fn add_after_finish_is_fatal() {
        let mut chain = chain();
        let mut shaper = TextShaper::new();
        shaper.text_add("x", &mut chain, &Markup::default());
        shaper.finish();
        shaper.text_add("y", &mut chain, &Markup::default());
    }
}
