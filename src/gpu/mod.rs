//! wgpu backend: device acquisition, the texture store behind
//! [`TextureRef`] handles, and the frame renderer that replays command
//! lists.

pub mod pipeline;
mod renderer;

pub use renderer::FrameRenderer;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::info;

use crate::draw::{ImageFactory, TextureRef};

/// Instance, adapter and device/queue. Created once and shared.
pub struct GpuState {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuState {
    /// Acquire a device without a surface (offscreen rendering works on any
    /// adapter). Returns `None` when the system has no usable adapter, so
    /// GPU tests can skip instead of failing.
    pub fn try_new() -> Option<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok()?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("scrawl"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .ok()?;

        info!("GPU init: adapter={}", adapter.get_info().name);

        Some(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

struct TextureEntry {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Owns every uploaded texture and its bind group, keyed by the
/// [`TextureRef`] id handed back to callers. Id 0 is always the built-in
/// 1×1 white texture ([`TextureRef::WHITE`]).
pub struct TextureStore {
    entries: HashMap<u64, TextureEntry>,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    next_id: u64,
}

impl TextureStore {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = pipeline::create_texture_bind_group_layout(device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cmd_list_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let mut store = Self {
            entries: HashMap::new(),
            layout,
            sampler,
            next_id: 0,
        };
        let white = store.upload(device, queue, 1, 1, &[0xff, 0xff, 0xff, 0xff]);
        assert!(white == TextureRef::WHITE);
        store
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Upload a tightly packed RGBA8 image and return its handle.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> TextureRef {
        assert!(width > 0 && height > 0);
        assert_eq!(pixels.len(), (width * height * 4) as usize);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cmd_list_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cmd_list_texture_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            TextureEntry {
                _texture: texture,
                bind_group,
            },
        );
        TextureRef { id, width, height }
    }

    /// Bind group for a handle. The handle must have come from this store.
    pub fn bind_group(&self, texture: TextureRef) -> &wgpu::BindGroup {
        match self.entries.get(&texture.id) {
            Some(entry) => &entry.bind_group,
            None => panic!("unknown texture id {}", texture.id),
        }
    }
}

/// [`ImageFactory`] backed by a shared [`TextureStore`]; this is what font
/// atlases upload through.
pub fn image_factory(gpu: &Rc<GpuState>, store: &Rc<RefCell<TextureStore>>) -> ImageFactory {
    let gpu = Rc::clone(gpu);
    let store = Rc::clone(store);
    Rc::new(move |width, height, pixels| {
        store
            .borrow_mut()
            .upload(&gpu.device, &gpu.queue, width, height, pixels)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_reserves_id_zero_for_white() {
        let Some(gpu) = GpuState::try_new() else {
            return;
        };
        let mut store = TextureStore::new(&gpu.device, &gpu.queue);
        let tex = store.upload(&gpu.device, &gpu.queue, 2, 2, &[0u8; 16]);
        assert_ne!(tex, TextureRef::WHITE);
        // Both resolve to bind groups without panicking.
        let _ = store.bind_group(TextureRef::WHITE);
        let _ = store.bind_group(tex);
    }

    #[test]
    fn factory_round_trips_through_the_store() {
        let Some(gpu) = GpuState::try_new() else {
            return;
        };
        let gpu = Rc::new(gpu);
        let store = Rc::new(RefCell::new(TextureStore::new(&gpu.device, &gpu.queue)));
        let factory = image_factory(&gpu, &store);
        let tex = factory(4, 2, &[0x80u8; 32]);
        assert_eq!((tex.width, tex.height), (4, 2));
        let _ = store.borrow().bind_group(tex);
    }
}
