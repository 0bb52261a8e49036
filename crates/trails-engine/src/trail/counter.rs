use bytemuck::{Pod, Zeroable};

/// CPU-side frame counter.
///
/// Starts at 0 and advances by exactly 1 per compute pass. Overflow wraps.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct FrameCounter(u32);

impl FrameCounter {
    /// Frames in one full loop of the trail's curve.
    ///
    /// A power of two, so `u32` wraparound lands on a period boundary and the
    /// phase stays continuous across it.
    pub const PERIOD_FRAMES: u32 = 512;

    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Position within the current period, `0..PERIOD_FRAMES`.
    ///
    /// Small enough to convert to `f32` exactly on the GPU.
    pub fn phase(self) -> u32 {
        self.0 % Self::PERIOD_FRAMES
    }

    /// Increments the counter and returns the new value.
    pub fn advance(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

/// Uniform block carrying the frame counter to the compute kernel.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct FrameUniform {
    pub frame: u32,
    pub phase: u32,
    pub _pad: [u32; 2], // 16-byte alignment
}

/// Minimal GPU buffer exposing the frame counter at compute binding 1.
pub struct FrameCounterBuffer {
    buffer: wgpu::Buffer,
}

impl FrameCounterBuffer {
    pub const SIZE: u64 = std::mem::size_of::<FrameUniform>() as u64;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trails frame counter ubo"),
            size: Self::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    /// Copies `counter` into GPU-visible memory.
    ///
    /// The write is staged on the queue and lands before the next submission.
    pub fn upload(&self, queue: &wgpu::Queue, counter: FrameCounter) {
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::bytes_of(&FrameUniform {
                frame: counter.get(),
                phase: counter.phase(),
                _pad: [0; 2],
            }),
        );
    }

    pub fn handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_zero() {
        assert_eq!(FrameCounter::new().get(), 0);
    }

    #[test]
    fn advance_increments_by_one() {
        let mut c = FrameCounter::new();
        for expected in 1..=100u32 {
            assert_eq!(c.advance(), expected);
            assert_eq!(c.get(), expected);
        }
    }

    #[test]
    fn advance_wraps_on_overflow() {
        let mut c = FrameCounter(u32::MAX);
        assert_eq!(c.advance(), 0);
    }

    #[test]
    fn phase_stays_within_period() {
        let period = FrameCounter::PERIOD_FRAMES;
        for raw in [0, 1, period - 1, period, period + 1, 1 << 24, (1 << 24) + 3, u32::MAX] {
            let c = FrameCounter(raw);
            assert!(c.phase() < period);
            assert_eq!(c.phase(), raw % period);
        }
    }

    #[test]
    fn phase_is_continuous_across_wrap() {
        let period = FrameCounter::PERIOD_FRAMES;
        let mut c = FrameCounter(u32::MAX - 2 * period);
        let mut prev = c.phase();
        for _ in 0..4 * period {
            c.advance();
            assert_eq!(c.phase(), (prev + 1) % period);
            prev = c.phase();
        }
        assert!(c.get() < u32::MAX - 2 * period);
    }

    #[test]
    fn uniform_is_sixteen_bytes() {
        assert_eq!(FrameCounterBuffer::SIZE, 16);
        let u = FrameUniform {
            frame: 7,
            phase: 7,
            _pad: [0; 2],
        };
        assert_eq!(&bytemuck::bytes_of(&u)[..4], &7u32.to_ne_bytes());
        assert_eq!(&bytemuck::bytes_of(&u)[4..8], &7u32.to_ne_bytes());
    }
}
