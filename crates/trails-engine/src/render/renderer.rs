use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::core::{AppControl, SurfaceDelegate};
use crate::device::GpuContext;
use crate::trail::{FrameCounter, FrameCounterBuffer, TrailBuffer};

use super::compute::{ComputeStage, DispatchPlan};
use super::draw::RenderStage;
use super::report::{FrameReport, FrameStats, PassOutcome, SkipReason};
use super::RenderTarget;

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of points in the trail. Fixed for the renderer's lifetime.
    pub trail_length: u32,

    /// Color the drawable is cleared to before the points are drawn.
    pub clear_color: wgpu::Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            trail_length: 15,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

// GPU storage and the bind groups that reference it. Allocated together and
// released together, so a frame either has all of it or none.
struct FrameResources {
    trail: TrailBuffer,
    frame_counter: FrameCounterBuffer,
    compute_bind: wgpu::BindGroup,
    render_bind: wgpu::BindGroup,
}

/// Orchestrates the per-frame compute → render sequence.
///
/// Owns both pipelines, the trail and frame counter buffers, and the CPU-side
/// frame counter. Each draw submits the compute pass and then the render pass
/// as two command buffers on the context's single queue; the queue runs them in
/// submission order and wgpu inserts the storage write → read barrier between
/// them, so render observes the points computed for the same frame.
pub struct Renderer {
    gpu: Arc<GpuContext>,
    config: RendererConfig,

    compute: ComputeStage,
    render: RenderStage,

    resources: Option<FrameResources>,

    counter: FrameCounter,
    next_seq: u64,
    stats: FrameStats,
}

impl Renderer {
    /// Builds pipelines and buffers for drawables of `format`.
    ///
    /// Any failure here is a misconfigured runtime and should end the process.
    pub fn new(
        gpu: Arc<GpuContext>,
        format: wgpu::TextureFormat,
        config: RendererConfig,
    ) -> Result<Self> {
        let render = RenderStage::new(&gpu, format)
            .with_context(|| format!("failed to create render pipeline for {format:?}"))?;
        let trail = TrailBuffer::new(gpu.device(), config.trail_length)
            .context("failed to create trail buffer")?;
        let frame_counter = FrameCounterBuffer::new(gpu.device());
        let compute = ComputeStage::new(&gpu, config.trail_length)
            .context("failed to create compute pipeline")?;

        let resources = FrameResources {
            compute_bind: compute.bind(gpu.device(), &trail, &frame_counter),
            render_bind: render.bind(gpu.device(), &trail),
            trail,
            frame_counter,
        };

        log::info!(
            "renderer ready: {} trail points, format {format:?}",
            config.trail_length
        );

        Ok(Self {
            gpu,
            config,
            compute,
            render,
            resources: Some(resources),
            counter: FrameCounter::new(),
            next_seq: 0,
            stats: FrameStats::default(),
        })
    }

    /// Advances the frame counter and dispatches the trail update kernel.
    ///
    /// Skipped (without touching the counter) once the buffers have been
    /// released. Does not wait for the GPU.
    pub fn perform_compute_pass(&mut self) -> PassOutcome {
        let outcome = self.encode_compute();
        self.stats.record_compute(outcome);
        if let PassOutcome::Skipped(reason) = outcome {
            log::trace!("compute pass skipped: {reason:?}");
        }
        outcome
    }

    /// Runs one frame: compute first, then draw the points into `pass_target`.
    ///
    /// When the render pass is submitted and a drawable was supplied, the
    /// drawable is presented. A missing pass target or trail buffer skips the
    /// render pass for this frame only.
    pub fn draw(
        &mut self,
        drawable: Option<wgpu::SurfaceTexture>,
        pass_target: Option<&wgpu::TextureView>,
    ) -> FrameReport {
        let compute = self.perform_compute_pass();
        let render = self.encode_render(pass_target);

        // wgpu presents after the queue submission that rendered into the texture.
        let presented = match drawable {
            Some(drawable) if render.is_submitted() => {
                drawable.present();
                true
            }
            _ => false,
        };

        self.stats.record_render(render, presented);
        if let PassOutcome::Skipped(reason) = render {
            log::trace!("frame skipped: {reason:?}");
        }

        FrameReport {
            frame: self.counter.get(),
            compute,
            render,
            presented,
        }
    }

    /// Drops the trail and frame counter buffers.
    ///
    /// Later frames are skipped until the renderer is rebuilt.
    pub fn release_buffers(&mut self) {
        if self.resources.take().is_some() {
            log::debug!("renderer buffers released");
        }
    }

    /// Resize notification. Points live in clip space, so nothing is rebuilt.
    pub fn on_resize(&mut self, size: PhysicalSize<u32>) {
        log::debug!("drawable size changed to {}x{}", size.width, size.height);
    }

    /// Current frame counter value.
    pub fn frame_counter(&self) -> u32 {
        self.counter.get()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn trail_length(&self) -> u32 {
        self.config.trail_length
    }

    pub fn dispatch_plan(&self) -> DispatchPlan {
        self.compute.plan()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.render.format()
    }

    pub fn trail_buffer(&self) -> Option<&TrailBuffer> {
        self.resources.as_ref().map(|r| &r.trail)
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn encode_compute(&mut self) -> PassOutcome {
        let Some(resources) = self.resources.as_ref() else {
            return PassOutcome::Skipped(SkipReason::MissingTrailBuffer);
        };

        self.counter.advance();
        resources.frame_counter.upload(self.gpu.queue(), self.counter);

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trails compute encoder"),
            });
        self.compute.encode(&mut encoder, &resources.compute_bind);

        self.submit(encoder)
    }

    fn encode_render(&mut self, pass_target: Option<&wgpu::TextureView>) -> PassOutcome {
        let Some(view) = pass_target else {
            return PassOutcome::Skipped(SkipReason::MissingPassTarget);
        };
        let Some(resources) = self.resources.as_ref() else {
            return PassOutcome::Skipped(SkipReason::MissingTrailBuffer);
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trails render encoder"),
            });

        // RenderTarget borrows the encoder; dropped before submit() takes it.
        {
            let mut target = RenderTarget::new(&mut encoder, view);
            self.render.encode(
                &mut target,
                &resources.render_bind,
                resources.trail.point_count(),
                self.config.clear_color,
            );
        }

        self.submit(encoder)
    }

    fn submit(&mut self, encoder: wgpu::CommandEncoder) -> PassOutcome {
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.next_seq += 1;
        PassOutcome::Submitted { seq: self.next_seq }
    }
}

impl SurfaceDelegate for Renderer {
    fn on_drawable_size_changed(&mut self, size: PhysicalSize<u32>) {
        self.on_resize(size);
    }

    fn on_draw(
        &mut self,
        drawable: Option<wgpu::SurfaceTexture>,
        pass_target: Option<&wgpu::TextureView>,
    ) -> AppControl {
        self.draw(drawable, pass_target);
        AppControl::Continue
    }
}
