//! Draw command batching: vertices, order-preserving [`CommandList`]s and
//! the primitive builders on top of them.
//!
//! A [`CommandList`] accumulates triangle geometry and greedily coalesces
//! consecutive writes into one [`DrawCmd`] when texture, clip and scale all
//! match, so the GPU backend issues one draw per state change rather than
//! one per shape.

pub mod primitives;

pub use primitives::Drawer;

use std::rc::Rc;

use crate::geom::{Color, Rectf, Vec2};

/// Index type of every command list. Triangle lists only.
pub type Index = u16;

/// One interleaved vertex: position and UV in f32 pixels / normalized
/// texture space, color as normalized RGBA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec2,
    pub uv: Vec2,
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(pos: Vec2, uv: Vec2, color: Color) -> Self {
        Self {
            pos,
            uv,
            color: color.to_array(),
        }
    }

    /// Serialized size: 2 + 2 + 4 f32s.
    pub(crate) const SIZE_BYTES: usize = 32;
}

/// Opaque handle to an uploaded GPU image, produced by an [`ImageFactory`]
/// and resolved back to a texture at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl TextureRef {
    /// The backend's built-in 1×1 opaque white texture, used by untextured
    /// primitives so they batch with everything else bound to it.
    pub const WHITE: Self = Self {
        id: 0,
        width: 1,
        height: 1,
    };
}

/// Image-upload seam: takes `width`, `height` and tightly packed RGBA8
/// pixels, returns a handle usable in draw commands.
pub type ImageFactory = Rc<dyn Fn(u32, u32, &[u8]) -> TextureRef>;

/// Clip rectangle in logical pixels. The all-zero default means "no clip":
/// the full render target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipRect(pub Rectf);

impl ClipRect {
    pub const NONE: Self = Self(Rectf {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    });

    pub fn new(rect: Rectf) -> Self {
        Self(rect)
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Scale to device pixels (per-axis), rounding outward to whole pixels.
    pub fn scaled(&self, scale: Vec2) -> Rectf {
        let min = self.0.min();
        let max = self.0.max();
        Rectf::from_corners(
            Vec2::new((min.x * scale.x).floor(), (min.y * scale.y).floor()),
            Vec2::new((max.x * scale.x).ceil(), (max.y * scale.y).ceil()),
        )
    }
}

/// One GPU draw: a contiguous vertex/index span plus the render state it
/// needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCmd {
    pub texture: TextureRef,
    pub clip: ClipRect,
    /// Per-axis geometry scale, applied in the vertex shader.
    pub scale: Vec2,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

/// Append-only geometry buffer with greedy command coalescing.
///
/// Stored index values are absolute into `vertices` (already rebased), so a
/// backend can bind the whole buffer once and draw each command's index
/// span directly.
#[derive(Default)]
pub struct CommandList {
    pub cmds: Vec<DrawCmd>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<Index>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
        self.vertices.clear();
        self.indices.clear();
    }

    /// Append geometry. `indices` are local to `vertices` and get rebased to
    /// the buffer. Extends the last command iff texture, clip and scale all
    /// match it; otherwise opens a new command.
    pub fn add_vertices(
        &mut self,
        texture: TextureRef,
        clip: ClipRect,
        scale: Vec2,
        vertices: &[Vertex],
        indices: &[Index],
    ) {
        if vertices.is_empty() {
            return;
        }
        let base = self.vertices.len();
        assert!(
            base + vertices.len() <= usize::from(Index::MAX) + 1,
            "command list exceeds the 16-bit index space"
        );

        match self.cmds.last_mut() {
            Some(cmd) if cmd.texture == texture && cmd.clip == clip && cmd.scale == scale => {
                cmd.vertex_count += vertices.len() as u32;
                cmd.index_count += indices.len() as u32;
            }
            _ => self.cmds.push(DrawCmd {
                texture,
                clip,
                scale,
                vertex_offset: base as u32,
                vertex_count: vertices.len() as u32,
                index_offset: self.indices.len() as u32,
                index_count: indices.len() as u32,
            }),
        }

        self.vertices.extend_from_slice(vertices);
        self.indices
            .extend(indices.iter().map(|&i| i + base as Index));
    }

    /// Append every command of `source`, optionally translating vertices
    /// and/or overriding each command's clip. The greedy coalescing rule
    /// continues across the boundary; `source` is left untouched.
    pub fn merge(
        &mut self,
        source: &Self,
        translate_by: Option<Vec2>,
        override_clip: Option<ClipRect>,
    ) {
        for cmd in &source.cmds {
            let vertex_range =
                cmd.vertex_offset as usize..(cmd.vertex_offset + cmd.vertex_count) as usize;
            let index_range =
                cmd.index_offset as usize..(cmd.index_offset + cmd.index_count) as usize;

            // Source indices are absolute; relocalize against the command's
            // own vertex span before re-adding.
            let local_indices: Vec<Index> = source.indices[index_range]
                .iter()
                .map(|&i| i - cmd.vertex_offset as Index)
                .collect();
            let clip = override_clip.unwrap_or(cmd.clip);

            if let Some(offset) = translate_by {
                let moved: Vec<Vertex> = source.vertices[vertex_range]
                    .iter()
                    .map(|v| Vertex {
                        pos: v.pos + offset,
                        ..*v
                    })
                    .collect();
                self.add_vertices(cmd.texture, clip, cmd.scale, &moved, &local_indices);
            } else {
                self.add_vertices(
                    cmd.texture,
                    clip,
                    cmd.scale,
                    &source.vertices[vertex_range],
                    &local_indices,
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Image factory that records every upload's dimensions and hands out
    /// fresh non-white texture ids.
    pub(crate) fn counting_factory() -> (ImageFactory, Rc<RefCell<Vec<(u32, u32)>>>) {
        let uploads: Rc<RefCell<Vec<(u32, u32)>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&uploads);
        let next_id = RefCell::new(1u64);
        let factory: ImageFactory = Rc::new(move |width, height, pixels: &[u8]| {
            assert_eq!(pixels.len(), (width * height * 4) as usize);
            log.borrow_mut().push((width, height));
            let mut id = next_id.borrow_mut();
            *id += 1;
            TextureRef {
                id: *id,
                width,
                height,
            }
        });
        (factory, uploads)
    }
}
