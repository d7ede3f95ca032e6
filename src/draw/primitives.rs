//! Primitive builders: free functions appending triangle geometry to a
//! [`CommandList`], plus the [`Drawer`] convenience wrapper that owns a
//! list and fills in default state.
//!
//! Everything untextured samples the built-in white 1×1 texture so shapes
//! batch with each other regardless of color.

use crate::draw::{ClipRect, CommandList, Index, TextureRef, Vertex};
use crate::geom::{Color, Rectf, Vec2};

/// Segment count used by [`circle`]/[`circle_fill`] when the caller passes
/// none.
pub const CIRCLE_SEGMENTS: u32 = 314;
/// Segment count used by the bezier builders when the caller passes none.
pub const BEZIER_SEGMENTS: u32 = 128;

/// Center of the white 1×1 texel.
const WHITE_UV: Vec2 = Vec2 { x: 0.5, y: 0.5 };

fn white_vertex(pos: Vec2, color: Color) -> Vertex {
    Vertex::new(pos, WHITE_UV, color)
}

/// Straight line segment of `width` px: a quad split along the segment's
/// center line (6 vertices, 4 triangles). No caps, no miters; polylines
/// rely on overlap at the joints.
pub fn line(
    list: &mut CommandList,
    p1: Vec2,
    p2: Vec2,
    color: Color,
    width: f32,
    scale: Vec2,
    clip: ClipRect,
) {
    assert!(width > 0.0);

    let n = (p2 - p1).perp().normalize() * (width / 2.0);
    let vertices = [
        white_vertex(p1, color),
        white_vertex(p2, color),
        white_vertex(p1 + n, color),
        white_vertex(p2 + n, color),
        white_vertex(p1 - n, color),
        white_vertex(p2 - n, color),
    ];
    const INDICES: [Index; 12] = [0, 2, 1, 2, 3, 1, 0, 4, 1, 4, 5, 1];
    list.add_vertices(TextureRef::WHITE, clip, scale, &vertices, &INDICES);
}

/// Triangle outline: three [`line`]s.
pub fn triangle(
    list: &mut CommandList,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    color: Color,
    width: f32,
    scale: Vec2,
    clip: ClipRect,
) {
    line(list, p1, p2, color, width, scale, clip);
    line(list, p2, p3, color, width, scale, clip);
    line(list, p3, p1, color, width, scale, clip);
}

pub fn triangle_fill(
    list: &mut CommandList,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    color: Color,
    scale: Vec2,
    clip: ClipRect,
) {
    let vertices = [
        white_vertex(p1, color),
        white_vertex(p2, color),
        white_vertex(p3, color),
    ];
    const INDICES: [Index; 3] = [0, 1, 2];
    list.add_vertices(TextureRef::WHITE, clip, scale, &vertices, &INDICES);
}

/// Rectangle outline. Each edge line is inset by half the stroke width so
/// the stroke stays inside `rect`.
pub fn rect(
    list: &mut CommandList,
    rect: Rectf,
    color: Color,
    width: f32,
    scale: Vec2,
    clip: ClipRect,
) {
    let inset = Vec2::splat(width / 2.0);
    let min = rect.min() + inset;
    let max = rect.max() - inset;
    line(list, min, Vec2::new(max.x, min.y), color, width, scale, clip);
    line(list, Vec2::new(max.x, min.y), max, color, width, scale, clip);
    line(list, max, Vec2::new(min.x, max.y), color, width, scale, clip);
    line(list, Vec2::new(min.x, max.y), min, color, width, scale, clip);
}

pub fn rect_fill(list: &mut CommandList, rect: Rectf, color: Color, scale: Vec2, clip: ClipRect) {
    let min = rect.min();
    let max = rect.max();
    let vertices = [
        white_vertex(min, color),
        white_vertex(Vec2::new(min.x, max.y), color),
        white_vertex(max, color),
        white_vertex(Vec2::new(max.x, min.y), color),
    ];
    const INDICES: [Index; 6] = [0, 1, 2, 2, 3, 0];
    list.add_vertices(TextureRef::WHITE, clip, scale, &vertices, &INDICES);
}

fn circle_point(center: Vec2, radius: f32, segment: u32, segments: u32) -> Vec2 {
    let theta = std::f64::consts::TAU * f64::from(segment) / f64::from(segments);
    // Offsets are rounded to whole pixels before recentering so opposite
    // segments stay symmetric.
    let x = (f64::from(radius) * theta.cos()).round() as f32;
    let y = (f64::from(radius) * theta.sin()).round() as f32;
    center + Vec2::new(x, y)
}

/// Polygonal circle outline. `segments = None` uses [`CIRCLE_SEGMENTS`].
pub fn circle(
    list: &mut CommandList,
    center: Vec2,
    radius: f32,
    color: Color,
    width: f32,
    segments: Option<u32>,
    scale: Vec2,
    clip: ClipRect,
) {
    assert!(radius >= 0.0);
    let segments = segments.unwrap_or(CIRCLE_SEGMENTS).max(3);
    let mut prev = circle_point(center, radius, 0, segments);
    for i in 1..=segments {
        let next = circle_point(center, radius, i % segments, segments);
        line(list, prev, next, color, width, scale, clip);
        prev = next;
    }
}

/// Filled polygonal circle: a triangle fan from the center.
pub fn circle_fill(
    list: &mut CommandList,
    center: Vec2,
    radius: f32,
    color: Color,
    segments: Option<u32>,
    scale: Vec2,
    clip: ClipRect,
) {
    assert!(radius >= 0.0);
    let segments = segments.unwrap_or(CIRCLE_SEGMENTS).max(3);
    let mut prev = circle_point(center, radius, 0, segments);
    for i in 1..=segments {
        let next = circle_point(center, radius, i % segments, segments);
        triangle_fill(list, center, prev, next, color, scale, clip);
        prev = next;
    }
}

/// Textured quad over `rect`, sampling the `uv` sub-rectangle of `texture`,
/// modulated by `color`.
pub fn image(
    list: &mut CommandList,
    texture: TextureRef,
    rect: Rectf,
    uv: Rectf,
    color: Color,
    scale: Vec2,
    clip: ClipRect,
) {
    let a = rect.min();
    let c = rect.max();
    let uv_a = uv.min();
    let uv_c = uv.max();
    let vertices = [
        Vertex::new(c, uv_c, color),
        Vertex::new(Vec2::new(c.x, a.y), Vec2::new(uv_c.x, uv_a.y), color),
        Vertex::new(a, uv_a, color),
        Vertex::new(Vec2::new(a.x, c.y), Vec2::new(uv_a.x, uv_c.y), color),
    ];
    const INDICES: [Index; 6] = [0, 1, 2, 2, 3, 0];
    list.add_vertices(texture, clip, scale, &vertices, &INDICES);
}

fn bezier_cubic_point(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p1 * (u * u * u) + p2 * (3.0 * u * u * t) + p3 * (3.0 * u * t * t) + p4 * (t * t * t)
}

fn bezier_quadratic_point(p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p1 * (u * u) + p2 * (2.0 * u * t) + p3 * (t * t)
}

/// Cubic bezier flattened to a polyline of [`line`] segments.
/// `segments = None` uses [`BEZIER_SEGMENTS`].
pub fn bezier_cubic(
    list: &mut CommandList,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    p4: Vec2,
    color: Color,
    width: f32,
    segments: Option<u32>,
    scale: Vec2,
    clip: ClipRect,
) {
    let segments = segments.unwrap_or(BEZIER_SEGMENTS).max(1);
    let t_step = 1.0 / segments as f32;
    let mut prev = p1;
    for i in 1..=segments {
        let next = bezier_cubic_point(p1, p2, p3, p4, t_step * i as f32);
        line(list, prev, next, color, width, scale, clip);
        prev = next;
    }
}

/// Quadratic bezier flattened to a polyline of [`line`] segments.
pub fn bezier_quadratic(
    list: &mut CommandList,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    color: Color,
    width: f32,
    segments: Option<u32>,
    scale: Vec2,
    clip: ClipRect,
) {
    let segments = segments.unwrap_or(BEZIER_SEGMENTS).max(1);
    let t_step = 1.0 / segments as f32;
    let mut prev = p1;
    for i in 1..=segments {
        let next = bezier_quadratic_point(p1, p2, p3, t_step * i as f32);
        line(list, prev, next, color, width, scale, clip);
        prev = next;
    }
}

/// Owns a [`CommandList`] and the ambient state (stroke width, scale, clip)
/// the free functions would otherwise take on every call.
pub struct Drawer {
    list: CommandList,
    pub width: f32,
    pub scale: Vec2,
    pub clip: ClipRect,
}

impl Default for Drawer {
    fn default() -> Self {
        Self {
            list: CommandList::new(),
            width: 1.0,
            scale: Vec2::ONE,
            clip: ClipRect::NONE,
        }
    }
}

impl Drawer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &CommandList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut CommandList {
        &mut self.list
    }

    /// Take the accumulated geometry, leaving the drawer empty.
    pub fn take(&mut self) -> CommandList {
        std::mem::take(&mut self.list)
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn line(&mut self, p1: Vec2, p2: Vec2, color: Color) {
        line(&mut self.list, p1, p2, color, self.width, self.scale, self.clip);
    }

    pub fn triangle(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, color: Color) {
        triangle(&mut self.list, p1, p2, p3, color, self.width, self.scale, self.clip);
    }

    pub fn triangle_fill(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, color: Color) {
        triangle_fill(&mut self.list, p1, p2, p3, color, self.scale, self.clip);
    }

    pub fn rect(&mut self, r: Rectf, color: Color) {
        rect(&mut self.list, r, color, self.width, self.scale, self.clip);
    }

    pub fn rect_fill(&mut self, r: Rectf, color: Color) {
        rect_fill(&mut self.list, r, color, self.scale, self.clip);
    }

    pub fn circle(&mut self, center: Vec2, radius: f32, color: Color) {
        circle(
            &mut self.list,
            center,
            radius,
            color,
            self.width,
            None,
            self.scale,
            self.clip,
        );
    }

    pub fn circle_fill(&mut self, center: Vec2, radius: f32, color: Color) {
        circle_fill(&mut self.list, center, radius, color, None, self.scale, self.clip);
    }

    pub fn image(&mut self, texture: TextureRef, r: Rectf, uv: Rectf, color: Color) {
        image(&mut self.list, texture, r, uv, color, self.scale, self.clip);
    }

    pub fn bezier_cubic(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2, color: Color) {
        bezier_cubic(
            &mut self.list,
            p1,
            p2,
            p3,
            p4,
            color,
            self.width,
            None,
            self.scale,
            self.clip,
        );
    }

    pub fn bezier_quadratic(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, color: Color) {
        bezier_quadratic(
            &mut self.list,
            p1,
            p2,
            p3,
            color,
            self.width,
            None,
            self.scale,
            self.clip,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_emits_six_vertices_four_triangles() {
        let mut drawer = Drawer::new();
        drawer.line(Vec2::ZERO, Vec2::new(10.0, 0.0), Color::WHITE);
        let list = drawer.list();
        assert_eq!(list.vertices.len(), 6);
        assert_eq!(list.indices.len(), 12);
        assert_eq!(list.cmds.len(), 1);
        assert_eq!(list.cmds[0].texture, TextureRef::WHITE);
    }

    #[test]
    fn line_quad_spans_half_width_each_side() {
        let mut drawer = Drawer::new();
        drawer.width = 4.0;
        drawer.line(Vec2::ZERO, Vec2::new(10.0, 0.0), Color::WHITE);
        let ys: Vec<f32> = drawer.list().vertices.iter().map(|v| v.pos.y).collect();
        let max = ys.iter().fold(f32::MIN, |a, &b| a.max(b));
        let min = ys.iter().fold(f32::MAX, |a, &b| a.min(b));
        assert_eq!(max - min, 4.0);
    }

    #[test]
    fn untextured_primitives_batch_together() {
        let mut drawer = Drawer::new();
        drawer.line(Vec2::ZERO, Vec2::new(5.0, 5.0), Color::WHITE);
        drawer.rect_fill(Rectf::new(0.0, 0.0, 3.0, 3.0), Color::BLACK);
        drawer.circle(Vec2::new(10.0, 10.0), 4.0, Color::WHITE);
        assert_eq!(drawer.list().cmds.len(), 1);
    }

    #[test]
    fn image_breaks_the_batch() {
        let tex = TextureRef {
            id: 7,
            width: 8,
            height: 8,
        };
        let mut drawer = Drawer::new();
        drawer.rect_fill(Rectf::new(0.0, 0.0, 3.0, 3.0), Color::WHITE);
        drawer.image(
            tex,
            Rectf::new(0.0, 0.0, 8.0, 8.0),
            Rectf::new(0.0, 0.0, 1.0, 1.0),
            Color::WHITE,
        );
        assert_eq!(drawer.list().cmds.len(), 2);
        assert_eq!(drawer.list().cmds[1].texture, tex);
    }

    #[test]
    fn circle_closes_its_polyline() {
        let mut list = CommandList::new();
        circle(
            &mut list,
            Vec2::new(50.0, 50.0),
            10.0,
            Color::WHITE,
            1.0,
            Some(8),
            Vec2::ONE,
            ClipRect::NONE,
        );
        // 8 segments, each a 6-vertex line quad.
        assert_eq!(list.vertices.len(), 8 * 6);
        // Last segment's end point equals the first segment's start point.
        let first_start = list.vertices[0].pos;
        let last_end = list.vertices[list.vertices.len() - 5].pos;
        assert_eq!(first_start, last_end);
    }

    #[test]
    fn bezier_endpoints_are_exact() {
        let mut list = CommandList::new();
        let p1 = Vec2::new(0.0, 0.0);
        let p4 = Vec2::new(30.0, 0.0);
        bezier_cubic(
            &mut list,
            p1,
            Vec2::new(10.0, 20.0),
            Vec2::new(20.0, 20.0),
            p4,
            Color::WHITE,
            1.0,
            Some(4),
            Vec2::ONE,
            ClipRect::NONE,
        );
        assert_eq!(list.vertices[0].pos, p1);
        let last_line_p2 = list.vertices[list.vertices.len() - 5].pos;
        assert_eq!(last_line_p2, p4);
    }
}
