//! Windowed demo: draws primitives and shaped text into a winit window.
//!
//! Run with `cargo run --example window`. Requires a GPU adapter and a
//! system font (see `scrawl::font::discovery`).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use scrawl::draw::{ClipRect, Drawer};
use scrawl::font::{Font, FontFallback, FontFamily, FontSize, FontStyle, discovery};
use scrawl::geom::{Color, Rectf, Vec2};
use scrawl::gpu::{FrameRenderer, GpuState, TextureStore, image_factory};
use scrawl::shaper::{Markup, TextShaper};

struct Demo {
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    gpu: Option<Rc<GpuState>>,
    store: Option<Rc<RefCell<TextureStore>>>,
    renderer: Option<FrameRenderer>,
    family: Option<FontFamily>,
}

impl Demo {
    fn new() -> Self {
        Self {
            window: None,
            surface: None,
            surface_config: None,
            gpu: None,
            store: None,
            renderer: None,
            family: None,
        }
    }

    fn init_gpu(&mut self, window: &Arc<Window>) {
        let gpu = Rc::new(GpuState::try_new().expect("no usable GPU adapter"));

        let surface = gpu
            .instance
            .create_surface(window.clone())
            .expect("failed to create wgpu surface");
        let caps = surface.get_capabilities(&gpu.adapter);
        // Non-sRGB format so sRGB color values pass through untouched.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(caps.formats[0]);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);

        let store = Rc::new(RefCell::new(TextureStore::new(&gpu.device, &gpu.queue)));
        let renderer = FrameRenderer::new(&gpu, format);

        let factory = image_factory(&gpu, &store);
        let face = discovery::load_any().expect("no system font found");
        let font = Font::new(Box::new(face), factory, FontSize::px(18.0));
        self.family = Some(FontFamily::new(FontFallback::new(font)));

        self.gpu = Some(gpu);
        self.store = Some(store);
        self.renderer = Some(renderer);
        self.surface = Some(surface);
        self.surface_config = Some(config);
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(store), Some(renderer), Some(surface), Some(config), Some(family)) = (
            self.gpu.as_ref(),
            self.store.as_ref(),
            self.renderer.as_mut(),
            self.surface.as_ref(),
            self.surface_config.as_ref(),
            self.family.as_mut(),
        ) else {
            return;
        };

        let mut drawer = Drawer::default();
        drawer.width = 2.0;
        drawer.rect_fill(
            Rectf::new(40.0, 40.0, 320.0, 160.0),
            Color::rgba(40, 44, 52, 255),
        );
        drawer.rect(
            Rectf::new(40.0, 40.0, 320.0, 160.0),
            Color::rgba(97, 175, 239, 255),
        );
        drawer.circle_fill(
            Vec2::new(520.0, 120.0),
            60.0,
            Color::rgba(224, 108, 117, 255),
        );
        drawer.line(
            Vec2::new(40.0, 260.0),
            Vec2::new(600.0, 260.0),
            Color::rgba(152, 195, 121, 255),
        );

        let chain = family.chain_mut(FontStyle::Regular);
        let mut shaper = TextShaper::new();
        shaper.wrap_width = config.width as i32 - 120;
        shaper.text_add(
            "The quick brown fox jumps over the lazy dog.\n",
            chain,
            &Markup::colored(Color::rgba(220, 223, 228, 255)),
        );
        let mut underlined = Markup::colored(Color::rgba(97, 175, 239, 255));
        underlined.underline_color = Color::rgba(97, 175, 239, 255);
        shaper.text_add("Underlined, wrapped, kerned.", chain, &underlined);
        shaper.finish();

        let mut frame = drawer.take();
        let pen = Vec2::new(60.0, 300.0) + Vec2::from(shaper.metrics().baseline_offset());
        shaper.draw(&mut frame, pen, ClipRect::NONE);

        let output = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(_) => {
                surface.configure(&gpu.device, config);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        renderer.render(
            gpu,
            &store.borrow(),
            &frame,
            &view,
            config.width,
            config.height,
            Some(Color::rgba(30, 33, 39, 255)),
        );
        output.present();
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("scrawl demo")
            .with_inner_size(winit::dpi::LogicalSize::new(800.0, 520.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );
        self.init_gpu(&window);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let (Some(gpu), Some(surface), Some(config)) = (
                    self.gpu.as_ref(),
                    self.surface.as_ref(),
                    self.surface_config.as_mut(),
                ) {
                    config.width = size.width.max(1);
                    config.height = size.height.max(1);
                    surface.configure(&gpu.device, config);
                }
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    let event_loop = EventLoop::new().expect("failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut demo = Demo::new();
    event_loop.run_app(&mut demo).expect("event loop failed");
}
