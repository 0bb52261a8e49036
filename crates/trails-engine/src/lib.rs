//! Trails engine crate.
//!
//! GPU trail animation: a compute pass advances a fixed array of points from a
//! frame counter, and a render pass draws them as points, once per frame.
//! Also owns the platform pieces (window, surface, logging) that drive it.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod trail;
pub mod window;
