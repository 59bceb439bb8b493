use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use super::FrameBuffer;

/// Presents a fixed-size [`FrameBuffer`] to the window; `pixels` scales the
/// logical buffer up to the surface.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffer_width: u32,
    buffer_height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>, buffer_width: u32, buffer_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
            buffer_width,
            buffer_height,
        )?;
        Ok(Self {
            window,
            pixels,
            buffer_width,
            buffer_height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        if let Err(error) = self.pixels.resize_surface(width, height) {
            warn!(error = %error, "renderer_surface_resize_failed_rebuilding");
            self.pixels = Self::build_pixels(
                Arc::clone(&self.window),
                width,
                height,
                self.buffer_width,
                self.buffer_height,
            )?;
        }
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        surface_width: u32,
        surface_height: u32,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(buffer_width, buffer_height, surface)
    }

    pub fn present(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        let target = self.pixels.frame_mut();
        let source = frame.as_rgba();
        let len = target.len().min(source.len());
        target[..len].copy_from_slice(&source[..len]);
        self.pixels.render()
    }
}
