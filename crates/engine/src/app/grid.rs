use super::rendering::{Canvas, PixelRect, Rgba};
use super::{CameraView, Vec2};

pub const GRID_LINE_COLOR: Rgba = [255, 0, 0, 51];

/// Debug lines every `cell_size` world pixels across the visible area.
#[derive(Debug, Clone)]
pub struct GridOverlay {
    cell_size: f32,
    camera: CameraView,
    color: Rgba,
}

impl GridOverlay {
    pub fn new(cell_size: f32, camera: CameraView) -> Self {
        Self {
            cell_size,
            camera,
            color: GRID_LINE_COLOR,
        }
    }

    /// World-space line coordinates on one axis for a view starting at `view_start`.
    fn line_positions(&self, view_start: f32, extent: u32) -> Vec<f32> {
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return Vec::new();
        }
        let first = (view_start / self.cell_size).floor() as i64;
        let last = ((view_start + extent as f32) / self.cell_size).ceil() as i64;
        (first..=last)
            .map(|index| index as f32 * self.cell_size)
            .collect()
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, origin: Vec2) {
        let (width, height) = canvas.size();
        let translation = self.camera.translation();
        for world_x in self.line_positions(-translation.x, width) {
            let x = (origin.x + world_x).round() as i32;
            canvas.fill_rect(PixelRect::new(x, 0, 1, height), self.color);
        }
        for world_y in self.line_positions(-translation.y, height) {
            let y = (origin.y + world_y).round() as i32;
            canvas.fill_rect(PixelRect::new(0, y, width, 1), self.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::{DrawOp, RecordingCanvas};

    #[test]
    fn lines_cover_visible_range_only() {
        let grid = GridOverlay::new(96.0, CameraView::default());
        let mut canvas = RecordingCanvas::new(320, 180);

        grid.draw(&mut canvas, Vec2::ZERO);

        let vertical: Vec<i32> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect(rect, _) if rect.width == 1 => Some(rect.x),
                _ => None,
            })
            .collect();
        assert_eq!(vertical, vec![0, 96, 192, 288, 384]);
    }

    #[test]
    fn lines_stay_aligned_to_world_cells_when_camera_moves() {
        let grid = GridOverlay::new(96.0, CameraView::default());
        let positions = grid.line_positions(150.0, 320);

        assert_eq!(positions.first().copied(), Some(96.0));
        assert!(positions.iter().all(|x| x % 96.0 == 0.0));
    }
}
