//! Frame submission: replays a finished [`CommandList`] against a render
//! target, one scissored `draw_indexed` per command.

use log::debug;

use crate::draw::{CommandList, Index, Vertex};
use crate::geom::Color;
use crate::gpu::{pipeline, GpuState, TextureStore};

/// Column-major orthographic projection mapping (0,0)..(width,height) with
/// a top-left origin onto NDC, serialized for the uniform buffer.
fn ortho_projection(width: f32, height: f32) -> [u8; 64] {
    #[rustfmt::skip]
    let m: [f32; 16] = [
        2.0 / width, 0.0,          0.0, 0.0,
        0.0,         -2.0 / height, 0.0, 0.0,
        0.0,         0.0,          1.0, 0.0,
        -1.0,        1.0,          0.0, 1.0,
    ];
    let mut bytes = [0u8; 64];
    for (i, v) in m.iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn serialize_vertices(vertices: &[Vertex]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vertices.len() * Vertex::SIZE_BYTES);
    for v in vertices {
        bytes.extend_from_slice(&v.pos.x.to_le_bytes());
        bytes.extend_from_slice(&v.pos.y.to_le_bytes());
        bytes.extend_from_slice(&v.uv.x.to_le_bytes());
        bytes.extend_from_slice(&v.uv.y.to_le_bytes());
        for c in v.color {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
    }
    bytes
}

fn serialize_indices(indices: &[Index]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(indices.len() * 2 + 2);
    for i in indices {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    // write_buffer sizes must be 4-byte aligned.
    if bytes.len() % 4 != 0 {
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes
}

/// Replays command lists. Owns the pipeline and grow-only vertex, index and
/// per-command scale buffers that are rewritten each frame.
pub struct FrameRenderer {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    scale_layout: wgpu::BindGroupLayout,
    scale_buffer: wgpu::Buffer,
    scale_bind_group: wgpu::BindGroup,
    scale_slot: u64,
    scale_capacity: u64,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_buffer: wgpu::Buffer,
    index_capacity: u64,
}

impl FrameRenderer {
    pub fn new(gpu: &GpuState, format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;

        let uniform_layout = pipeline::create_uniform_bind_group_layout(device);
        let scale_layout = pipeline::create_scale_bind_group_layout(device);
        let texture_layout = pipeline::create_texture_bind_group_layout(device);
        let render_pipeline = pipeline::create_pipeline(
            device,
            format,
            &uniform_layout,
            &scale_layout,
            &texture_layout,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("projection_uniform"),
            size: 64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("projection_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Dynamic offsets must respect the device's alignment; one slot per
        // draw command.
        let scale_slot = u64::from(device.limits().min_uniform_buffer_offset_alignment)
            .max(pipeline::SCALE_SLOT_SIZE);
        let scale_capacity = scale_slot * 16;
        let scale_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cmd_scale_uniform"),
            size: scale_capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scale_bind_group = Self::create_scale_bind_group(device, &scale_layout, &scale_buffer);

        let vertex_capacity = 4096 * Vertex::SIZE_BYTES as u64;
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cmd_list_vertices"),
            size: vertex_capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_capacity = 4096 * 6;
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cmd_list_indices"),
            size: index_capacity,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            format,
            pipeline: render_pipeline,
            uniform_buffer,
            uniform_bind_group,
            scale_layout,
            scale_buffer,
            scale_bind_group,
            scale_slot,
            scale_capacity,
            vertex_buffer,
            vertex_capacity,
            index_buffer,
            index_capacity,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn create_scale_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cmd_scale_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(pipeline::SCALE_SLOT_SIZE),
                }),
            }],
        })
    }

    fn ensure_capacity(&mut self, gpu: &GpuState, list: &CommandList) {
        let device = &gpu.device;

        let scale_needed = list.cmds.len() as u64 * self.scale_slot;
        if scale_needed > self.scale_capacity {
            self.scale_capacity = scale_needed.next_power_of_two();
            self.scale_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cmd_scale_uniform"),
                size: self.scale_capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.scale_bind_group =
                Self::create_scale_bind_group(device, &self.scale_layout, &self.scale_buffer);
        }

        let vertex_needed = (list.vertices.len() * Vertex::SIZE_BYTES) as u64;
        if vertex_needed > self.vertex_capacity {
            self.vertex_capacity = vertex_needed.next_power_of_two();
            self.vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cmd_list_vertices"),
                size: self.vertex_capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }

        let index_needed = (list.indices.len() * 2 + 2) as u64;
        if index_needed > self.index_capacity {
            self.index_capacity = index_needed.next_power_of_two();
            self.index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("cmd_list_indices"),
                size: self.index_capacity,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
    }

    /// Render `list` into `target` (`width`×`height` device pixels).
    /// `clear` fills the target first; `None` keeps its contents.
    pub fn render(
        &mut self,
        gpu: &GpuState,
        store: &TextureStore,
        list: &CommandList,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
        clear: Option<Color>,
    ) {
        assert!(width > 0 && height > 0);
        self.ensure_capacity(gpu, list);

        gpu.queue.write_buffer(
            &self.uniform_buffer,
            0,
            &ortho_projection(width as f32, height as f32),
        );

        if !list.is_empty() {
            let mut scale_bytes = vec![0u8; list.cmds.len() * self.scale_slot as usize];
            for (i, cmd) in list.cmds.iter().enumerate() {
                let at = i * self.scale_slot as usize;
                scale_bytes[at..at + 4].copy_from_slice(&cmd.scale.x.to_le_bytes());
                scale_bytes[at + 4..at + 8].copy_from_slice(&cmd.scale.y.to_le_bytes());
            }
            gpu.queue.write_buffer(&self.scale_buffer, 0, &scale_bytes);
            gpu.queue
                .write_buffer(&self.vertex_buffer, 0, &serialize_vertices(&list.vertices));
            gpu.queue
                .write_buffer(&self.index_buffer, 0, &serialize_indices(&list.indices));
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cmd_list_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cmd_list_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match clear {
                            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                                r: f64::from(c.r) / 255.0,
                                g: f64::from(c.g) / 255.0,
                                b: f64::from(c.b) / 255.0,
                                a: f64::from(c.a) / 255.0,
                            }),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if !list.is_empty() {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

                for (i, cmd) in list.cmds.iter().enumerate() {
                    let (x, y, w, h) = if cmd.clip.is_none() {
                        (0, 0, width, height)
                    } else {
                        let r = cmd.clip.scaled(cmd.scale);
                        let x0 = (r.min().x.max(0.0) as u32).min(width);
                        let y0 = (r.min().y.max(0.0) as u32).min(height);
                        let x1 = (r.max().x.max(0.0) as u32).min(width);
                        let y1 = (r.max().y.max(0.0) as u32).min(height);
                        (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
                    };
                    if w == 0 || h == 0 {
                        continue; // fully clipped out
                    }
                    pass.set_scissor_rect(x, y, w, h);
                    let offset = (i as u64 * self.scale_slot) as u32;
                    pass.set_bind_group(1, &self.scale_bind_group, &[offset]);
                    pass.set_bind_group(2, store.bind_group(cmd.texture), &[]);
                    pass.draw_indexed(
                        cmd.index_offset..cmd.index_offset + cmd.index_count,
                        0,
                        0..1,
                    );
                }
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        debug!(
            "submitted {} cmd(s), {} vertices",
            list.cmds.len(),
            list.vertices.len()
        );
    }

    /// Headless helper: render into a fresh texture of the renderer's
    /// format and return it (usable as a copy source).
    pub fn render_to_texture(
        &mut self,
        gpu: &GpuState,
        store: &TextureStore,
        list: &CommandList,
        width: u32,
        height: u32,
        clear: Color,
    ) -> wgpu::Texture {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.render(gpu, store, list, &view, width, height, Some(clear));
        texture
    }
}
