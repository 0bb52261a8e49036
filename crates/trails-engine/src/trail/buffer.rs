use anyhow::Result;
use wgpu::util::DeviceExt;

use super::TrailPoint;

/// GPU storage holding the fixed-length array of trail points.
///
/// Allocated once with every record set to [`TrailPoint::DEFAULT`]; the compute
/// stage mutates it in place and the render stage reads it. It is never resized.
pub struct TrailBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

impl TrailBuffer {
    /// Allocates storage for `len` points and fills it with the default pose/color.
    pub fn new(device: &wgpu::Device, len: u32) -> Result<Self> {
        let limits = device.limits();
        let max_bytes =
            u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        Self::ensure_fits(len, max_bytes)?;

        let contents = Self::initial_contents(len);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("trails point buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        log::debug!("trail buffer allocated: {len} points, {} bytes", contents.len());

        Ok(Self { buffer, len })
    }

    /// Checks that a trail of `len` points can be bound as one storage buffer
    /// of at most `max_bytes`.
    pub fn ensure_fits(len: u32, max_bytes: u64) -> Result<()> {
        anyhow::ensure!(len > 0, "trail length must be at least 1");

        let bytes = Self::byte_size(len);
        anyhow::ensure!(
            bytes <= max_bytes,
            "trail of {len} points needs {bytes} bytes, storage binding limit is {max_bytes}"
        );
        Ok(())
    }

    fn byte_size(len: u32) -> u64 {
        TrailPoint::STRIDE * u64::from(len)
    }

    /// Initial records for a trail of `len` points.
    pub fn initial_points(len: u32) -> Vec<TrailPoint> {
        vec![TrailPoint::DEFAULT; len as usize]
    }

    /// Initial buffer bytes for a trail of `len` points.
    pub fn initial_contents(len: u32) -> Vec<u8> {
        bytemuck::cast_slice(&Self::initial_points(len)).to_vec()
    }

    /// Buffer handle for binding by the compute and render stages.
    pub fn handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of points in the trail; always at least 1.
    pub fn point_count(&self) -> u32 {
        self.len
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        Self::byte_size(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trail_has_fifteen_default_points() {
        let points = TrailBuffer::initial_points(15);
        assert_eq!(points.len(), 15);
        assert!(points.iter().all(|p| *p == TrailPoint::DEFAULT));
    }

    #[test]
    fn contents_are_sized_by_stride() {
        assert_eq!(TrailBuffer::initial_contents(15).len(), 15 * 32);
        assert_eq!(TrailBuffer::initial_contents(1).len(), 32);
    }

    #[test]
    fn trail_within_binding_limit_fits() {
        // wgpu's default storage binding limit is 128 MiB.
        let max = 128 << 20;
        assert!(TrailBuffer::ensure_fits(15, max).is_ok());
        assert!(TrailBuffer::ensure_fits(4 << 20, max).is_ok());
        assert!(TrailBuffer::ensure_fits(1, TrailPoint::STRIDE).is_ok());
    }

    #[test]
    fn oversized_trail_is_rejected() {
        let max = 128 << 20;
        assert!(TrailBuffer::ensure_fits((4 << 20) + 1, max).is_err());
        assert!(TrailBuffer::ensure_fits(u32::MAX, max).is_err());
        assert!(TrailBuffer::ensure_fits(2, TrailPoint::STRIDE).is_err());
        assert!(TrailBuffer::ensure_fits(0, max).is_err());
    }

    #[test]
    fn reinitialization_is_byte_identical() {
        let a = TrailBuffer::initial_contents(64);
        let b = TrailBuffer::initial_contents(64);
        assert_eq!(a, b);
    }
}
