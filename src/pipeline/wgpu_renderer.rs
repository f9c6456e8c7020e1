//! The wgpu backend of the [`FrameRenderer`] seam.

use std::sync::Arc;

use log::warn;
use winit::window::Window;

use crate::camera::Camera3d;
use crate::light::ShadowSettings;
use crate::pipeline::fxaa::FxaaPass;
use crate::pipeline::scene_pass::{ScenePass, DEPTH_FORMAT};
use crate::pipeline::{Environment, FramePass, FrameRenderer, RenderMode};
use crate::scene::SceneNode;
use crate::viewport::Viewport;

/// Offscreen color target for the anti-aliased mode: the scene pass draws
/// here and the FXAA pass samples it.
struct OffscreenTarget {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_color"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("offscreen_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler,
        }
    }
}

/// In-flight frame state between `begin_frame` and `end_frame`.
struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    surface_view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// Real GPU backend: owns the wgpu device, the window surface, the scene
/// pass and (in anti-aliased mode) the offscreen target plus FXAA pass.
pub struct WgpuFrameRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    depth_view: wgpu::TextureView,
    offscreen: Option<OffscreenTarget>,
    scene_pass: ScenePass,
    fxaa: Option<FxaaPass>,

    frame: Option<Frame>,
}

impl WgpuFrameRenderer {
    /// Initializes the adapter, device and surface for `window` and builds
    /// the pass resources for `mode`.
    pub async fn new(window: Arc<Window>, mode: RenderMode) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to find an appropriate adapter");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("stagekit device"),
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("Failed to create device");

        // Prefer a non-sRGB format; gamma is handled in the shaders, which
        // keeps behavior consistent across backends.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, width, height);
        let scene_pass = ScenePass::new(
            &device,
            surface_format,
            ShadowSettings::default().map_size,
        );
        let (offscreen, fxaa) = match mode {
            RenderMode::Direct => (None, None),
            RenderMode::AntiAliased => (
                Some(OffscreenTarget::new(&device, surface_format, width, height)),
                Some(FxaaPass::new(&device, surface_format)),
            ),
        };

        WgpuFrameRenderer {
            device,
            queue,
            surface,
            surface_config,
            depth_view,
            offscreen,
            scene_pass,
            fxaa,
            frame: None,
        }
    }
}

impl FrameRenderer for WgpuFrameRenderer {
    fn begin_frame(&mut self) -> bool {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfigure and pick the frame up next time around.
                self.surface.configure(&self.device, &self.surface_config);
                return false;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return false;
            }
        };

        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        self.frame = Some(Frame {
            surface_texture,
            surface_view,
            encoder,
        });
        true
    }

    fn run_pass(
        &mut self,
        pass: FramePass,
        scene: &SceneNode,
        camera: &dyn Camera3d,
        environment: &Environment,
    ) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        match pass {
            FramePass::Scene => {
                // Offscreen when an FXAA resolve follows, straight to the
                // surface otherwise.
                let color_view = match &self.offscreen {
                    Some(target) => &target.view,
                    None => &frame.surface_view,
                };
                self.scene_pass.render(
                    &self.device,
                    &self.queue,
                    &mut frame.encoder,
                    color_view,
                    &self.depth_view,
                    scene,
                    camera,
                    environment,
                );
            }
            FramePass::AntiAlias => {
                let (Some(fxaa), Some(target)) = (&self.fxaa, &self.offscreen) else {
                    warn!("anti-alias pass requested without an offscreen target");
                    return;
                };
                fxaa.draw(
                    &self.device,
                    &mut frame.encoder,
                    &target.view,
                    &target.sampler,
                    &frame.surface_view,
                );
            }
        }
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    fn resize(&mut self, viewport: Viewport) {
        self.surface_config.width = viewport.width;
        self.surface_config.height = viewport.height;
        self.surface.configure(&self.device, &self.surface_config);

        self.depth_view = create_depth_view(&self.device, viewport.width, viewport.height);
        if self.offscreen.is_some() {
            self.offscreen = Some(OffscreenTarget::new(
                &self.device,
                self.surface_config.format,
                viewport.width,
                viewport.height,
            ));
        }
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
