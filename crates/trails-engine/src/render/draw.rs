use anyhow::Result;

use crate::device::GpuContext;
use crate::trail::{TrailBuffer, TrailPoint};

use super::RenderTarget;

/// Render pipeline drawing the trail as a point list.
///
/// The trail buffer is bound once at group 0, binding 0, visible to both the
/// vertex stage (positions) and the fragment stage (colors).
pub struct RenderStage {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
}

impl RenderStage {
    pub const VERTEX_ENTRY_POINT: &'static str = "vertex_main";
    pub const FRAGMENT_ENTRY_POINT: &'static str = "fragment_main";

    /// Compiles the render pipeline for drawables of `format`.
    ///
    /// Fails when the adapter cannot render to or alpha-blend into `format`.
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat) -> Result<Self> {
        ensure_renderable(format, gpu.adapter().get_texture_format_features(format))?;
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trails render shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/trail_render.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trails render bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(TrailPoint::STRIDE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trails render pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("trails render pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(Self::VERTEX_ENTRY_POINT),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(Self::FRAGMENT_ENTRY_POINT),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("render pipeline ready for {format:?}");

        Ok(Self {
            pipeline,
            bind_group_layout,
            format,
        })
    }

    /// Color format the pipeline was built for.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn bind(&self, device: &wgpu::Device, trail: &TrailBuffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trails render bind group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: trail.handle().as_entire_binding(),
            }],
        })
    }

    /// Clears the target and draws `point_count` points in one call.
    pub fn encode(
        &self,
        target: &mut RenderTarget<'_>,
        bind_group: &wgpu::BindGroup,
        point_count: u32,
        clear: wgpu::Color,
    ) {
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trails point pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..point_count, 0..1);
    }
}

/// The pipeline writes `format` as a blended color attachment.
fn ensure_renderable(
    format: wgpu::TextureFormat,
    features: wgpu::TextureFormatFeatures,
) -> Result<()> {
    anyhow::ensure!(
        features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT),
        "{format:?} cannot be used as a render attachment"
    );
    anyhow::ensure!(
        features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE),
        "{format:?} does not support blending"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(
        usages: wgpu::TextureUsages,
        flags: wgpu::TextureFormatFeatureFlags,
    ) -> wgpu::TextureFormatFeatures {
        wgpu::TextureFormatFeatures {
            allowed_usages: usages,
            flags,
        }
    }

    #[test]
    fn blendable_attachment_is_accepted() {
        let f = features(
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            wgpu::TextureFormatFeatureFlags::BLENDABLE,
        );
        assert!(ensure_renderable(wgpu::TextureFormat::Bgra8UnormSrgb, f).is_ok());
    }

    #[test]
    fn non_attachment_format_is_rejected() {
        let f = features(
            wgpu::TextureUsages::TEXTURE_BINDING,
            wgpu::TextureFormatFeatureFlags::BLENDABLE,
        );
        assert!(ensure_renderable(wgpu::TextureFormat::Rgba8Unorm, f).is_err());
    }

    #[test]
    fn non_blendable_format_is_rejected() {
        let f = features(
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            wgpu::TextureFormatFeatureFlags::empty(),
        );
        assert!(ensure_renderable(wgpu::TextureFormat::Rgba32Float, f).is_err());
    }
}
