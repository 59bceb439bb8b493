use std::cell::Cell;
use std::rc::Rc;

use super::{NodeCore, Vec2};

/// Read-only view of the camera translation, shared with nodes that need
/// to know what part of the world is on screen.
#[derive(Debug, Clone, Default)]
pub struct CameraView {
    translation: Rc<Cell<Vec2>>,
}

impl CameraView {
    pub fn translation(&self) -> Vec2 {
        self.translation.get()
    }

    fn set(&self, translation: Vec2) {
        self.translation.set(translation);
    }
}

/// Keeps a target centred on a fixed-size viewport.
#[derive(Debug, Clone)]
pub struct CameraFollow {
    view: CameraView,
    viewport: (u32, u32),
    target_half_extent: f32,
}

impl CameraFollow {
    pub fn new(view: CameraView, viewport: (u32, u32), target_half_extent: f32) -> Self {
        Self {
            view,
            viewport,
            target_half_extent,
        }
    }

    pub fn view(&self) -> &CameraView {
        &self.view
    }

    /// Translation that puts `target` in the middle of the viewport.
    pub fn translation_for(&self, target: Vec2) -> Vec2 {
        let center_x = self.viewport.0 as f32 / 2.0 - self.target_half_extent;
        let center_y = self.viewport.1 as f32 / 2.0 - self.target_half_extent;
        Vec2::new(-target.x + center_x, -target.y + center_y)
    }

    pub fn follow(&self, core: &mut NodeCore, target: Vec2) {
        core.position = self.translation_for(target);
        self.view.set(core.position);
    }
}
