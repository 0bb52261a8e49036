use bytemuck::{Pod, Zeroable};

/// One element of the animated trail.
///
/// Layout (32 bytes, no padding), shared with `TrailPoint` in the WGSL programs:
///
///  offset  0  position  [f32; 4]   homogeneous clip-space position
///  offset 16  color     [f32; 4]   RGBA
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TrailPoint {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl TrailPoint {
    /// Initial pose: origin, fully-opaque red.
    pub const DEFAULT: TrailPoint = TrailPoint {
        position: [0.0, 0.0, 0.0, 1.0],
        color: [1.0, 0.0, 0.0, 1.0],
    };

    /// Byte stride of one record in the trail buffer.
    pub const STRIDE: u64 = std::mem::size_of::<TrailPoint>() as u64;
}

impl Default for TrailPoint {
    fn default() -> Self {
        Self::DEFAULT
    }
}
