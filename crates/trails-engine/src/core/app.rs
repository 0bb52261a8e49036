use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

/// Control directive returned by delegate callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Per-surface callbacks invoked by the runtime (the frame driver).
///
/// The runtime owns the window and its drawables; a delegate only borrows the
/// current drawable for the duration of one `on_draw` call. Construction of
/// the delegate is the "surface ready" step, see `window::Runtime::run`.
pub trait SurfaceDelegate {
    /// Called for window events before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called after the surface has been reconfigured for a new drawable size.
    fn on_drawable_size_changed(&mut self, size: PhysicalSize<u32>) {
        let _ = size;
    }

    /// Called once per display refresh that produced a drawable.
    ///
    /// The window runtime drops frames it cannot acquire a drawable for, so it
    /// always passes both arguments. Offscreen drivers may pass `None` for
    /// either. Must return once commands are submitted; GPU completion is
    /// never awaited.
    fn on_draw(
        &mut self,
        drawable: Option<wgpu::SurfaceTexture>,
        pass_target: Option<&wgpu::TextureView>,
    ) -> AppControl;
}
