//! GPU trail pipeline.
//!
//! Each frame the compute stage advances the trail points from the frame
//! counter, then the render stage draws them as a point list.
//!
//! Convention:
//! - Point positions are clip-space coordinates written by the compute kernel.
//! - Trail buffer is binding 0 for every stage; the frame counter is compute binding 1.

mod compute;
mod ctx;
mod draw;
mod renderer;
mod report;

pub use compute::{ComputeStage, DispatchPlan};
pub use ctx::RenderTarget;
pub use draw::RenderStage;
pub use renderer::{Renderer, RendererConfig};
pub use report::{FrameReport, FrameStats, PassOutcome, SkipReason};
