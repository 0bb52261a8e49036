use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use super::{Drawable, GpuContext, GpuInit, SurfaceErrorAction};

/// A window surface plus its active configuration.
///
/// The surface holds an `Arc<Window>`, so it is `'static` and may live next to
/// the window in the runtime's per-window state.
pub struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,
}

impl SurfaceTarget {
    pub(crate) fn configure(
        surface: wgpu::Surface<'static>,
        gpu: &GpuContext,
        size: PhysicalSize<u32>,
        init: &GpuInit,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(gpu.adapter());
        let format = choose_surface_format(&caps.formats, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = choose_alpha_mode(&caps.alpha_modes, init.alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(gpu.device(), &config);
        log::debug!("surface configured: {format:?} {}x{}", config.width, config.height);

        Ok(Self { surface, config, size })
    }

    /// Returns the active surface format (the color pixel format of each drawable).
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred.
    /// False while the window is minimized or otherwise has a zero-area client.
    pub fn is_drawable(&self) -> bool {
        is_drawable_size(self.size)
    }

    pub fn resize(&mut self, gpu: &GpuContext, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !is_drawable_size(new_size) {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(gpu.device(), &self.config);
    }

    /// Acquires the next drawable.
    pub fn acquire(&self) -> std::result::Result<Drawable, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        Ok(Drawable::new(surface_texture))
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_error(&mut self, gpu: &GpuContext, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        let action = map_surface_error(&err);
        if action == SurfaceErrorAction::Reconfigured && is_drawable_size(self.size) {
            self.surface.configure(gpu.device(), &self.config);
        }
        log::debug!("surface error {err:?} -> {action:?}");
        action
    }
}

fn is_drawable_size(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| formats.contains(f)) {
            return Some(f);
        }
    }

    formats.first().copied()
}

pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn map_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
