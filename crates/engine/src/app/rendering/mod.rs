mod canvas;
mod font;
mod frame_buffer;
mod renderer;

pub use canvas::{Canvas, DrawOp, PixelRect, RecordingCanvas, Rgba};
pub use font::{text_width_px, GLYPH_HEIGHT, LINE_ADVANCE};
pub use frame_buffer::FrameBuffer;
pub use renderer::Renderer;
