//! Batched 2D drawing and styled-text shaping on wgpu.
//!
//! The pipeline runs in three stages:
//!
//! 1. [`draw::CommandList`] collects textured, vertex-colored triangles and
//!    greedily batches consecutive geometry that shares a texture, clip
//!    rectangle and scale. [`draw::primitives`] tessellates lines, rects,
//!    circles and beziers into such lists.
//! 2. [`shaper::TextShaper`] streams UTF-8 text through a [`font::FontFamily`]
//!    and emits three command lists (backgrounds, glyphs, decorations) plus
//!    layout metrics, handling wrapping, kerning and fallback fonts.
//! 3. [`gpu::FrameRenderer`] replays command lists against a wgpu render
//!    target, with per-command scissor rects and scale.
//!
//! The GPU layer is optional at every stage: command lists and the shaper
//! work against any [`draw::ImageFactory`], so layout and geometry can be
//! tested without a device.

pub mod config;
pub mod draw;
pub mod font;
pub mod geom;
pub mod gpu;
pub mod shaper;
pub mod utf8;

pub use config::Config;
pub use draw::{ClipRect, CommandList, Drawer, ImageFactory, TextureRef, Vertex};
pub use font::{Font, FontFallback, FontFamily, FontMetrics, FontSize, FontStyle};
pub use geom::{Color, Point, Rectf, Recti, Vec2};
pub use gpu::{FrameRenderer, GpuState, TextureStore};
pub use shaper::{Markup, TextMetrics, TextShaper};
pub use utf8::{CodePointEvent, CodePointStream};
