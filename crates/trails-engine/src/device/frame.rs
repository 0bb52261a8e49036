/// A single acquired surface image plus the color view rendered into it.
///
/// This object is short-lived and must be finalized promptly. Holding the surface
/// texture prevents acquisition of subsequent frames.
pub struct Drawable {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl Drawable {
    pub(crate) fn new(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self { surface_texture, view }
    }

    /// Splits the frame into the presentable texture and its pass target.
    pub fn into_parts(self) -> (wgpu::SurfaceTexture, wgpu::TextureView) {
        (self.surface_texture, self.view)
    }
}
