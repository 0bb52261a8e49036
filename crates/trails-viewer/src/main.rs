use anyhow::Result;
use trails_engine::device::GpuInit;
use trails_engine::logging::{init_logging, LoggingConfig};
use trails_engine::render::{Renderer, RendererConfig};
use trails_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "Trails".to_string(),
        initial_size: LogicalSize::new(800.0, 800.0),
    };
    let renderer = RendererConfig::default();

    log::info!("starting trails viewer ({} points)", renderer.trail_length);

    Runtime::run(runtime, GpuInit::default(), move |gpu, format| {
        Renderer::new(gpu, format, renderer.clone())
    })
}
