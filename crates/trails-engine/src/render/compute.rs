use anyhow::Result;

use crate::device::GpuContext;
use crate::trail::{FrameCounterBuffer, TrailBuffer, TrailPoint};

/// 1-D dispatch geometry for one compute pass over the trail.
///
/// wgpu dispatches whole workgroups, so `workgroup_width * workgroup_count` may
/// exceed `grid_width`; the kernel discards invocations past the end of the trail.
/// `workgroup_count` never exceeds the device's per-dimension dispatch limit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DispatchPlan {
    /// Invocations that do work; always the trail length.
    pub grid_width: u32,

    /// Threads per workgroup: `min(trail length, max threads per group)`.
    pub workgroup_width: u32,

    /// Workgroups dispatched along x.
    pub workgroup_count: u32,
}

impl DispatchPlan {
    pub fn new(trail_len: u32, max_threads_per_group: u32, max_workgroups: u32) -> Result<Self> {
        anyhow::ensure!(trail_len > 0, "trail length must be at least 1");
        anyhow::ensure!(
            max_threads_per_group > 0,
            "device reports no compute invocations per workgroup"
        );

        let workgroup_width = trail_len.min(max_threads_per_group);
        let workgroup_count = trail_len.div_ceil(workgroup_width);
        anyhow::ensure!(
            workgroup_count <= max_workgroups,
            "trail length {trail_len} needs {workgroup_count} workgroups of {workgroup_width}, \
             device allows {max_workgroups}"
        );

        Ok(Self {
            grid_width: trail_len,
            workgroup_width,
            workgroup_count,
        })
    }
}

/// Compute pipeline that advances the trail points once per frame.
///
/// Bindings (group 0):
/// - 0: trail points, read-write storage
/// - 1: frame counter, uniform
pub struct ComputeStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    plan: DispatchPlan,
}

impl ComputeStage {
    pub const ENTRY_POINT: &'static str = "compute_main";

    /// Compiles the compute pipeline, specializing its workgroup width for `trail_len`.
    pub fn new(gpu: &GpuContext, trail_len: u32) -> Result<Self> {
        let plan = DispatchPlan::new(
            trail_len,
            gpu.max_compute_workgroup_width(),
            gpu.max_compute_workgroups(),
        )?;
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trails compute shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/trail_compute.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trails compute bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(TrailPoint::STRIDE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(FrameCounterBuffer::SIZE),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trails compute pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let constants = [("WORKGROUP_WIDTH", plan.workgroup_width as f64)];
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trails compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(Self::ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
            cache: None,
        });

        log::debug!(
            "compute pipeline ready: grid {} / workgroup {} x {}",
            plan.grid_width,
            plan.workgroup_width,
            plan.workgroup_count
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            plan,
        })
    }

    /// Dispatch geometry used for every pass.
    pub fn plan(&self) -> DispatchPlan {
        self.plan
    }

    /// Binds the trail at slot 0 and the frame counter at slot 1.
    pub fn bind(
        &self,
        device: &wgpu::Device,
        trail: &TrailBuffer,
        counter: &FrameCounterBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trails compute bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: trail.handle().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counter.handle().as_entire_binding(),
                },
            ],
        })
    }

    /// Records one dispatch covering the whole trail.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, bind_group: &wgpu::BindGroup) {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("trails compute pass"),
            timestamp_writes: None,
        });

        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, bind_group, &[]);
        cpass.dispatch_workgroups(self.plan.workgroup_count, 1, 1);
    }
}
