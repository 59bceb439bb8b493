use super::rendering::{text_width_px, Canvas, PixelRect, Rgba, LINE_ADVANCE};
use super::{AnimationSet, ImageHandle, Vec2};

const LABEL_COLOR: Rgba = [255, 255, 255, 255];

/// A frame of a sprite sheet drawn at an offset from its owner, optionally
/// animated and labelled.
#[derive(Debug, Clone)]
pub struct Sprite {
    image: ImageHandle,
    frame_width: u32,
    frame_height: u32,
    h_frames: u32,
    frame: u32,
    scale: f32,
    offset: Vec2,
    animations: Option<AnimationSet>,
    label: Option<String>,
    frame_map: Vec<(u32, u32)>,
}

impl Sprite {
    /// Single-frame sprite covering `frame_width` x `frame_height` from the image origin.
    pub fn new(image: ImageHandle, frame_width: u32, frame_height: u32) -> Self {
        let mut sprite = Self {
            image,
            frame_width,
            frame_height,
            h_frames: 1,
            frame: 0,
            scale: 1.0,
            offset: Vec2::ZERO,
            animations: None,
            label: None,
            frame_map: Vec::new(),
        };
        sprite.rebuild_frame_map(1);
        sprite
    }

    pub fn with_sheet(mut self, h_frames: u32, v_frames: u32) -> Self {
        self.h_frames = h_frames.max(1);
        self.rebuild_frame_map(v_frames.max(1));
        self
    }

    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_animations(mut self, animations: AnimationSet) -> Self {
        self.frame = animations.frame().unwrap_or(self.frame);
        self.animations = Some(animations);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn rebuild_frame_map(&mut self, v_frames: u32) {
        self.frame_map.clear();
        for v in 0..v_frames {
            for h in 0..self.h_frames {
                self.frame_map
                    .push((h * self.frame_width, v * self.frame_height));
            }
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: u32) {
        self.frame = frame;
    }

    pub fn frame_count(&self) -> usize {
        self.frame_map.len()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn animations(&self) -> Option<&AnimationSet> {
        self.animations.as_ref()
    }

    pub fn play(&mut self, key: &'static str) {
        if let Some(animations) = &mut self.animations {
            animations.play(key, 0.0);
        }
    }

    pub fn step(&mut self, delta_ms: f32) {
        let Some(animations) = &mut self.animations else {
            return;
        };
        animations.step(delta_ms);
        if let Some(frame) = animations.frame() {
            self.frame = frame;
        }
    }

    /// Source rectangle for the current frame, `None` past the end of the sheet.
    pub fn source_rect(&self) -> Option<PixelRect> {
        let (x, y) = self.frame_map.get(self.frame as usize).copied()?;
        Some(PixelRect::new(
            x as i32,
            y as i32,
            self.frame_width,
            self.frame_height,
        ))
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, origin: Vec2) {
        let at = origin + self.offset;
        let dest_x = at.x.round() as i32;
        let dest_y = at.y.round() as i32;

        if let (Some(image), Some(src)) = (self.image.get(), self.source_rect()) {
            canvas.draw_image_region(image, src, dest_x, dest_y, self.scale);
        }

        if let Some(label) = &self.label {
            let drawn_width = (self.frame_width as f32 * self.scale).round() as i32;
            let label_x = dest_x + drawn_width / 2 - text_width_px(label) / 2;
            canvas.draw_text(label_x, dest_y - LINE_ADVANCE, label, LABEL_COLOR);
        }
    }
}
