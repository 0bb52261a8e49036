//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the runtime (platform loop)
//! and the renderer it drives.

mod app;

pub use app::{AppControl, SurfaceDelegate};
