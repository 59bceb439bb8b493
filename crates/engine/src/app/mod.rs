mod animation;
mod camera;
mod events;
mod grid;
mod image_data;
mod input;
mod loop_runner;
mod metrics;
mod node;
pub mod rendering;
mod scene;
mod sprite;
mod tilemap;
mod vec2;

pub use animation::{AnimationSet, FramePattern, Keyframe, Playback};
pub use camera::{CameraFollow, CameraView};
pub use events::{Delivery, EventBus, SubscriptionId};
pub use grid::{GridOverlay, GRID_LINE_COLOR};
pub use image_data::{ImageData, ImageHandle};
pub use input::{Direction, HeldDirections, InputAction, InputSnapshot};
pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, FixedStepLoop, FrameDriver, LoopConfig,
    SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use node::{Behavior, Node, NodeCore, NodeId, Visual};
pub use rendering::{Canvas, DrawOp, FrameBuffer, PixelRect, RecordingCanvas, Renderer, Rgba};
pub use scene::{Scene, SceneCommand};
pub use sprite::Sprite;
pub use tilemap::{Tile, Tilemap, TilemapError, BASE_TILE_SIZE};
pub use vec2::Vec2;
