use crate::app::ImageData;

use super::canvas::{Canvas, PixelRect, Rgba};
use super::font::{glyph_bits, glyph_pixel_set, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Software RGBA8 render target presented by [`super::Renderer`].
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        let offset = self.byte_offset(x, y)?;
        let bytes = &self.rgba[offset..offset + 4];
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel = (y as usize).checked_mul(self.width as usize)?.checked_add(x as usize)?;
        let offset = pixel.checked_mul(4)?;
        (offset + 4 <= self.rgba.len()).then_some(offset)
    }

    fn blend_pixel_clipped(&mut self, x: i32, y: i32, color: Rgba) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        blend_into(&mut self.rgba[offset..offset + 4], color);
    }
}

fn blend_into(dst: &mut [u8], src: Rgba) {
    let alpha = src[3] as u32;
    match alpha {
        0 => {}
        255 => dst.copy_from_slice(&src),
        _ => {
            let inv = 255 - alpha;
            for channel in 0..3 {
                let mixed = (src[channel] as u32 * alpha + dst[channel] as u32 * inv + 127) / 255;
                dst[channel] = mixed as u8;
            }
            dst[3] = dst[3].max(src[3]);
        }
    }
}

fn normalized_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

impl Canvas for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let left = rect.x.max(0);
        let top = rect.y.max(0);
        let right = rect.right().min(self.width as i32);
        let bottom = rect.bottom().min(self.height as i32);
        for y in top..bottom {
            for x in left..right {
                self.blend_pixel_clipped(x, y, color);
            }
        }
    }

    fn draw_image_region(
        &mut self,
        image: &ImageData,
        src: PixelRect,
        dest_x: i32,
        dest_y: i32,
        scale: f32,
    ) {
        if src.width == 0 || src.height == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let scale = normalized_scale(scale);
        let inv_scale = scale.recip();
        let out_w = (src.width as f32 * scale).round().max(1.0) as i32;
        let out_h = (src.height as f32 * scale).round().max(1.0) as i32;

        let draw_left = dest_x.max(0);
        let draw_top = dest_y.max(0);
        let draw_right = (dest_x + out_w).min(self.width as i32);
        let draw_bottom = (dest_y + out_h).min(self.height as i32);

        for out_y in draw_top..draw_bottom {
            let dy = ((out_y - dest_y) as f32 * inv_scale).floor() as i32;
            let src_y = src.y + dy.min(src.height as i32 - 1);
            if src_y < 0 {
                continue;
            }
            for out_x in draw_left..draw_right {
                let dx = ((out_x - dest_x) as f32 * inv_scale).floor() as i32;
                let src_x = src.x + dx.min(src.width as i32 - 1);
                if src_x < 0 {
                    continue;
                }
                if let Some(color) = image.pixel(src_x as u32, src_y as u32) {
                    self.blend_pixel_clipped(out_x, out_y, color);
                }
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgba) {
        let mut pen_x = x;
        for ch in text.chars() {
            let bits = glyph_bits(ch);
            for row in 0..GLYPH_HEIGHT {
                for column in 0..GLYPH_WIDTH {
                    if glyph_pixel_set(bits, column, row) {
                        self.blend_pixel_clipped(pen_x + column, y + row, color);
                    }
                }
            }
            pen_x += GLYPH_ADVANCE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];

    #[test]
    fn fill_rect_is_clipped_to_buffer() {
        let mut frame = FrameBuffer::new(4, 4);
        frame.fill_rect(PixelRect::new(-2, 3, 10, 5), RED);

        assert_eq!(frame.pixel(0, 3), Some(RED));
        assert_eq!(frame.pixel(3, 3), Some(RED));
        assert_eq!(frame.pixel(0, 2), Some([0, 0, 0, 0]));
        assert_eq!(frame.pixel(4, 3), None);
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut frame = FrameBuffer::new(1, 1);
        frame.clear([0, 0, 0, 255]);
        frame.fill_rect(PixelRect::new(0, 0, 1, 1), [255, 0, 0, 51]);

        let pixel = frame.pixel(0, 0).expect("pixel");
        assert_eq!(pixel[0], 51);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn image_region_copies_selected_frame() {
        let mut rgba = Vec::new();
        for x in 0..4u8 {
            rgba.extend_from_slice(&[x * 10, 0, 0, 255]);
        }
        let image = ImageData::new(4, 1, rgba).expect("image");
        let mut frame = FrameBuffer::new(4, 2);

        frame.draw_image_region(&image, PixelRect::new(2, 0, 2, 1), 1, 1, 1.0);

        assert_eq!(frame.pixel(1, 1), Some([20, 0, 0, 255]));
        assert_eq!(frame.pixel(2, 1), Some([30, 0, 0, 255]));
        assert_eq!(frame.pixel(3, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn image_region_scales_by_nearest_neighbour() {
        let image = ImageData::solid(1, 1, RED);
        let mut frame = FrameBuffer::new(3, 3);

        frame.draw_image_region(&image, PixelRect::new(0, 0, 1, 1), 0, 0, 2.0);

        assert_eq!(frame.pixel(1, 1), Some(RED));
        assert_eq!(frame.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn transparent_source_pixels_are_skipped() {
        let image = ImageData::solid(1, 1, [9, 9, 9, 0]);
        let mut frame = FrameBuffer::new(1, 1);
        frame.clear(RED);

        frame.draw_image_region(&image, PixelRect::new(0, 0, 1, 1), 0, 0, 1.0);

        assert_eq!(frame.pixel(0, 0), Some(RED));
    }

    #[test]
    fn text_draws_glyph_pixels() {
        let mut frame = FrameBuffer::new(8, 6);
        frame.draw_text(0, 0, "T", RED);

        assert_eq!(frame.pixel(0, 0), Some(RED));
        assert_eq!(frame.pixel(1, 4), Some(RED));
        assert_eq!(frame.pixel(0, 4), Some([0, 0, 0, 0]));
    }
}
