use std::time::Duration;

use super::rendering::Canvas;
use super::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Top-level game state driven by the fixed-step loop.
pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt: Duration, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, canvas: &mut dyn Canvas);
    /// Called once when the loop exits; release external resources here.
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}
