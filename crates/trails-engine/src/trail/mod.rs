//! Trail data: the point record layout, the GPU point buffer, and the frame counter.

mod buffer;
mod counter;
mod point;

pub use buffer::TrailBuffer;
pub use counter::{FrameCounter, FrameCounterBuffer};
pub use point::TrailPoint;
