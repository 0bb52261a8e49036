//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (`GpuContext`)
//! - creating & configuring the window Surface (`SurfaceTarget`)
//! - acquiring drawables for the frame loop

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::GpuContext;
pub use error::SurfaceErrorAction;
pub use frame::Drawable;
pub use init::GpuInit;
pub use surface::SurfaceTarget;
