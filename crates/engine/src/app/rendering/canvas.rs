use crate::app::ImageData;

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }
}

/// 2D drawing target for scene nodes. Coordinates are in buffer pixels;
/// anything outside the target is clipped.
pub trait Canvas {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba);
    /// Copies `src` from `image` with its top-left at `(dest_x, dest_y)`,
    /// scaled by nearest neighbour.
    fn draw_image_region(
        &mut self,
        image: &ImageData,
        src: PixelRect,
        dest_x: i32,
        dest_y: i32,
        scale: f32,
    );
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgba);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Rgba),
    FillRect(PixelRect, Rgba),
    Image {
        src: PixelRect,
        dest_x: i32,
        dest_y: i32,
        scale: f32,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
    },
}

/// Canvas that keeps the draw calls instead of rasterizing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.ops.push(DrawOp::FillRect(rect, color));
    }

    fn draw_image_region(
        &mut self,
        _image: &ImageData,
        src: PixelRect,
        dest_x: i32,
        dest_y: i32,
        scale: f32,
    ) {
        self.ops.push(DrawOp::Image {
            src,
            dest_x,
            dest_y,
            scale,
        });
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, _color: Rgba) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
        });
    }
}
