use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppControl, SurfaceDelegate};
use crate::device::{GpuContext, GpuInit, SurfaceErrorAction, SurfaceTarget};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "trails".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens a window and drives `SurfaceDelegate` callbacks until it closes.
    ///
    /// `on_surface_ready` is called once the window surface and GPU context
    /// exist; it receives the shared context and the drawable color format and
    /// builds the delegate. An error from it, or from GPU initialization, stops
    /// the loop and is returned from `run`.
    pub fn run<D, F>(config: RuntimeConfig, gpu_init: GpuInit, on_surface_ready: F) -> Result<()>
    where
        D: SurfaceDelegate + 'static,
        F: FnMut(Arc<GpuContext>, wgpu::TextureFormat) -> Result<D> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, on_surface_ready);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// How long to back off after the surface declines to hand out a drawable
/// (timeout, occluded window) before asking again.
const ACQUIRE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// What the loop does before it goes back to sleep.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum RedrawPlan {
    /// Request a redraw right away.
    Now,
    /// Sleep until the retry deadline, then plan again.
    At(Instant),
    /// Sleep until a window event (e.g. a resize back to nonzero size).
    Idle,
}

fn plan_redraw(drawable: bool, retry_at: Option<Instant>, now: Instant) -> RedrawPlan {
    if !drawable {
        return RedrawPlan::Idle;
    }
    match retry_at {
        Some(deadline) if now < deadline => RedrawPlan::At(deadline),
        _ => RedrawPlan::Now,
    }
}

/// Backoff applied after a failed acquisition. Reconfigured surfaces are
/// retried on the next iteration; transient refusals wait.
fn retry_delay(action: SurfaceErrorAction) -> Option<Duration> {
    match action {
        SurfaceErrorAction::SkipFrame => Some(ACQUIRE_RETRY_DELAY),
        SurfaceErrorAction::Reconfigured | SurfaceErrorAction::Fatal => None,
    }
}

// Fields drop in order: the delegate releases its GPU resources before the
// surface, and the surface before the window it presents to.
struct WindowEntry<D> {
    delegate: D,
    surface: SurfaceTarget,
    gpu: Arc<GpuContext>,
    window: Arc<Window>,
    frames: u64,
    retry_at: Option<Instant>,
}

impl<D: SurfaceDelegate> WindowEntry<D> {
    fn size_changed(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(&self.gpu, new_size);
        self.delegate.on_drawable_size_changed(new_size);
        self.retry_at = None;
        if self.surface.is_drawable() {
            self.window.request_redraw();
        }
    }
}

struct AppState<D, F> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    on_surface_ready: F,

    entry: Option<WindowEntry<D>>,
    fatal: Option<anyhow::Error>,
}

impl<D, F> AppState<D, F>
where
    D: SurfaceDelegate + 'static,
    F: FnMut(Arc<GpuContext>, wgpu::TextureFormat) -> Result<D> + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, on_surface_ready: F) -> Self {
        Self {
            config,
            gpu_init,
            on_surface_ready,
            entry: None,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry<D>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let (gpu, surface) = pollster::block_on(GpuContext::for_window(window.clone(), &self.gpu_init))
            .context("GPU initialization failed")?;
        let gpu = Arc::new(gpu);

        let delegate = (self.on_surface_ready)(gpu.clone(), surface.format())?;

        Ok(WindowEntry {
            delegate,
            surface,
            gpu,
            window,
            frames: 0,
            retry_at: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal.get_or_insert(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = self.entry.take() {
            log::info!("window closed after {} frames", entry.frames);
        }
        event_loop.exit();
    }
}

impl<D, F> ApplicationHandler for AppState<D, F>
where
    D: SurfaceDelegate + 'static,
    F: FnMut(Arc<GpuContext>, wgpu::TextureFormat) -> Result<D> + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.fatal.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.window.request_redraw();
                self.entry = Some(entry);
            }
            Err(err) => self.fail(event_loop, err.context("failed to create initial window")),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_ref() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Continuous redraw while drawable: FIFO present paces the frames.
        match plan_redraw(entry.surface.is_drawable(), entry.retry_at, Instant::now()) {
            RedrawPlan::Now => {
                event_loop.set_control_flow(ControlFlow::Wait);
                entry.window.request_redraw();
            }
            RedrawPlan::At(deadline) => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            RedrawPlan::Idle => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        if entry.window.id() != window_id {
            return;
        }

        if entry.delegate.on_window_event(&event) == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(new_size) => entry.size_changed(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.window.inner_size();
                entry.size_changed(new_size);
            }

            WindowEvent::RedrawRequested => {
                // Minimized: drop the frame; the next nonzero resize resumes drawing.
                if !entry.surface.is_drawable() {
                    return;
                }

                let drawable = match entry.surface.acquire() {
                    Ok(drawable) => drawable,
                    Err(err) => {
                        let action = entry.surface.handle_error(&entry.gpu, err);
                        if action == SurfaceErrorAction::Fatal {
                            let err = anyhow::anyhow!("surface ran out of memory");
                            self.fail(event_loop, err);
                            return;
                        }
                        // No drawable, no frame: the delegate is not called.
                        entry.retry_at = retry_delay(action).map(|delay| Instant::now() + delay);
                        return;
                    }
                };

                entry.frames += 1;
                entry.retry_at = None;

                let (surface_texture, view) = drawable.into_parts();
                entry.window.pre_present_notify();
                let control = entry.delegate.on_draw(Some(surface_texture), Some(&view));

                if control == AppControl::Exit {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }
}
