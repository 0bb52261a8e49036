// Tests that need a real adapter. Run with:
//   cargo test -p trails-engine -- --ignored
// They are opt-in, so a missing adapter fails them instead of passing silently.

use std::sync::Arc;
use std::sync::mpsc;

use trails_engine::device::{GpuContext, GpuInit};
use trails_engine::render::{PassOutcome, Renderer, RendererConfig, SkipReason};
use trails_engine::trail::{FrameCounter, TrailBuffer, TrailPoint};
use winit::dpi::PhysicalSize;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn renderer() -> Renderer {
    let gpu = pollster::block_on(GpuContext::headless(&GpuInit::default()))
        .expect("no usable GPU adapter");
    Renderer::new(Arc::new(gpu), FORMAT, RendererConfig::default()).unwrap()
}

fn offscreen_target(renderer: &Renderer) -> wgpu::TextureView {
    let texture = renderer
        .gpu()
        .device()
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Copies the trail buffer into a mappable staging buffer and reads it back.
///
/// Waits for every submission so far, so the bytes reflect all queued passes.
fn read_trail(renderer: &Renderer) -> Vec<u8> {
    let trail = renderer.trail_buffer().expect("trail buffer released");
    let gpu = renderer.gpu();

    let staging = gpu.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("trail readback"),
        size: trail.size(),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trail readback encoder"),
        });
    encoder.copy_buffer_to_buffer(trail.handle(), 0, &staging, 0, trail.size());
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        tx.send(r).unwrap();
    });
    gpu.device()
        .poll(wgpu::PollType::wait_indefinitely())
        .unwrap();
    rx.recv().unwrap().unwrap();

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    bytes
}

fn points(bytes: &[u8]) -> Vec<TrailPoint> {
    bytes
        .chunks_exact(TrailPoint::STRIDE as usize)
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

#[test]
#[ignore = "requires a GPU adapter"]
fn buffers_sized_for_default_trail() {
    let r = renderer();

    let trail = r.trail_buffer().unwrap();
    assert_eq!(trail.point_count(), 15);
    assert_eq!(trail.size(), 15 * TrailPoint::STRIDE);
    assert_eq!(trail.handle().size(), 15 * 32);
    assert_eq!(r.dispatch_plan().grid_width, 15);
    assert_eq!(r.surface_format(), FORMAT);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn new_trail_holds_default_points() {
    let r = renderer();

    let bytes = read_trail(&r);
    assert_eq!(bytes, TrailBuffer::initial_contents(15));
    assert!(points(&bytes).iter().all(|p| *p == TrailPoint::DEFAULT));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn one_compute_pass_advances_counter_once() {
    let mut r = renderer();
    assert_eq!(r.frame_counter(), 0);

    let outcome = r.perform_compute_pass();

    assert_eq!(outcome, PassOutcome::Submitted { seq: 1 });
    assert_eq!(r.frame_counter(), 1);
    assert_eq!(r.stats().compute_passes, 1);
    assert_eq!(r.stats().submissions, 1);

    let plan = r.dispatch_plan();
    assert_eq!(plan.grid_width, 15);
    assert!(plan.workgroup_width >= 1 && plan.workgroup_width <= 15);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn compute_pass_rewrites_every_point() {
    let mut r = renderer();
    r.perform_compute_pass();

    let bytes = read_trail(&r);
    assert_ne!(bytes, TrailBuffer::initial_contents(15));

    let pts = points(&bytes);
    assert_eq!(pts.len(), 15);

    // Head of the curve at frame 1.
    let t = std::f32::consts::TAU / FrameCounter::PERIOD_FRAMES as f32;
    let head = pts[0];
    assert!((head.position[0] - 0.7 * (3.0 * t).sin()).abs() < 1e-4);
    assert!((head.position[1] - 0.7 * (2.0 * t).sin()).abs() < 1e-4);
    assert_eq!(head.color[3], 1.0);

    for (i, p) in pts.iter().enumerate() {
        assert_eq!(p.position[2], 0.0);
        assert_eq!(p.position[3], 1.0);
        assert!(p.position[0].abs() <= 0.7 + 1e-5 && p.position[1].abs() <= 0.7 + 1e-5);

        let fade = 1.0 - i as f32 / 15.0;
        assert!((p.color[3] - fade).abs() < 1e-5, "point {i} alpha {}", p.color[3]);
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn draw_submits_compute_before_render() {
    let mut r = renderer();
    let view = offscreen_target(&r);

    for frame in 1..=5u32 {
        let report = r.draw(None, Some(&view));
        assert_eq!(report.frame, frame);
        assert!(report.compute.is_submitted());
        assert!(report.render.is_submitted());
        assert!(report.is_ordered());
        assert!(!report.presented);
    }

    let stats = r.stats();
    assert_eq!(stats.compute_passes, 5);
    assert_eq!(stats.frames_drawn, 5);
    assert_eq!(stats.submissions, 10);
    assert_eq!(stats.presents, 0);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn missing_pass_target_still_computes() {
    let mut r = renderer();

    let report = r.draw(None, None);

    assert_eq!(report.frame, 1);
    assert!(report.compute.is_submitted());
    assert_eq!(report.render, PassOutcome::Skipped(SkipReason::MissingPassTarget));
    assert_eq!(r.stats().frames_skipped, 1);
    assert_ne!(read_trail(&r), TrailBuffer::initial_contents(15));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn released_buffers_skip_without_submitting() {
    let mut r = renderer();
    let view = offscreen_target(&r);

    r.draw(None, Some(&view));
    let before = r.stats();

    r.release_buffers();
    assert!(r.trail_buffer().is_none());

    let report = r.draw(None, Some(&view));
    assert_eq!(report.compute, PassOutcome::Skipped(SkipReason::MissingTrailBuffer));
    assert_eq!(report.render, PassOutcome::Skipped(SkipReason::MissingTrailBuffer));
    assert_eq!(r.frame_counter(), 1);
    assert_eq!(r.stats().submissions, before.submissions);
    assert_eq!(r.stats().compute_skipped, 1);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn resize_leaves_renderer_untouched() {
    let mut r = renderer();
    let view = offscreen_target(&r);
    r.draw(None, Some(&view));

    let stats = r.stats();
    let plan = r.dispatch_plan();
    let counter = r.frame_counter();
    let bytes = read_trail(&r);

    for size in [PhysicalSize::new(0, 0), PhysicalSize::new(1, 1), PhysicalSize::new(4096, 2160)] {
        r.on_resize(size);
    }

    assert_eq!(r.stats(), stats);
    assert_eq!(r.dispatch_plan(), plan);
    assert_eq!(r.frame_counter(), counter);
    assert_eq!(r.trail_length(), 15);
    assert_eq!(r.surface_format(), FORMAT);
    assert_eq!(read_trail(&r), bytes);
}
