use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

use super::GpuInit;
use super::surface::SurfaceTarget;

/// Owns the wgpu core objects shared by every GPU component.
///
/// A context is created once per renderer host and handed out as
/// `Arc<GpuContext>`. It holds exactly one device and one command queue; all
/// submissions go through that single queue, which executes them in order.
///
/// # Field drop order
/// Fields drop top to bottom. `_instance` is declared last so it outlives the
/// device-level objects that were created from it.
pub struct GpuContext {
    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// wgpu instance used to create the adapter (and surface, if any).
    _instance: wgpu::Instance,
}

impl GpuContext {
    /// Creates a context with no presentation surface.
    ///
    /// Used for offscreen rendering and tests.
    pub async fn headless(init: &GpuInit) -> Result<Self> {
        let instance = create_instance();
        Self::request(instance, None, init).await
    }

    /// Creates a context bound to a window, returning it with the configured surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn for_window(window: Arc<Window>, init: &GpuInit) -> Result<(Self, SurfaceTarget)> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = create_instance();

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let ctx = Self::request(instance, Some(&surface), init).await?;
        let target = SurfaceTarget::configure(surface, &ctx, size, init)?;

        Ok((ctx, target))
    }

    async fn request(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        init: &GpuInit,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        ensure_capabilities(&adapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("trails device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            device,
            queue,
            adapter,
            _instance: instance,
        })
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns a reference to the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Largest 1-D compute workgroup the device accepts.
    pub fn max_compute_workgroup_width(&self) -> u32 {
        let limits = self.device.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
    }

    /// Most workgroups one dispatch may launch along x.
    pub fn max_compute_workgroups(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }
}

fn create_instance() -> wgpu::Instance {
    // Use all backends to allow wgpu to select the optimal platform backend.
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// The trail pipeline has no CPU path: the adapter must run compute shaders and
/// read storage buffers from the vertex stage.
fn ensure_capabilities(adapter: &wgpu::Adapter) -> Result<()> {
    let flags = adapter.get_downlevel_capabilities().flags;

    anyhow::ensure!(
        flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
        "adapter does not support compute shaders"
    );
    anyhow::ensure!(
        flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE),
        "adapter does not support storage buffers in the vertex stage"
    );

    Ok(())
}
