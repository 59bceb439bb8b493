use engine::{
    Behavior, CameraFollow, Canvas, EventBus, GridOverlay, InputSnapshot, NodeCore, NodeId, Sprite,
    Tilemap, Vec2, Visual,
};

use super::grid::WallSet;
use super::player::PlayerController;
use super::registry::SharedState;
use super::PlayerId;
use crate::app::net::OutboundMessage;

pub(crate) const HERO_POSITION: &str = "hero_position";
pub(crate) const CALL_TARGET: &str = "call_target";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GameEvent {
    HeroPosition(Vec2),
    CallTarget(Option<PlayerId>),
}

/// Everything a node may read or publish during one fixed step.
pub(crate) struct StepContext<'a> {
    pub(crate) input: &'a InputSnapshot,
    pub(crate) chat_input_active: bool,
    pub(crate) walls: &'a WallSet,
    pub(crate) cell_size: f32,
    pub(crate) bus: &'a mut EventBus<NodeId, GameEvent>,
    pub(crate) outbox: &'a mut Vec<OutboundMessage>,
    pub(crate) shared: &'a mut SharedState,
    /// Remote player positions as of the start of the tick, in registry order.
    pub(crate) remote_positions: &'a [(PlayerId, Vec2)],
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Group,
    Sprite(Sprite),
    Player(PlayerController),
    Camera(CameraFollow),
    Grid(GridOverlay),
    Tiles(Tilemap),
}

impl NodeKind {
    pub(crate) fn as_player(&self) -> Option<&PlayerController> {
        match self {
            NodeKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn as_player_mut(&mut self) -> Option<&mut PlayerController> {
        match self {
            NodeKind::Player(player) => Some(player),
            _ => None,
        }
    }
}

impl<'a> Behavior<StepContext<'a>> for NodeKind {
    fn step(&mut self, core: &mut NodeCore, delta_ms: f32, ctx: &mut StepContext<'a>) {
        match self {
            NodeKind::Player(player) => player.step(core, delta_ms, ctx),
            NodeKind::Sprite(sprite) => sprite.step(delta_ms),
            NodeKind::Camera(camera) => {
                // Children have already stepped, so the hero's move this tick is in the mailbox.
                let latest = ctx
                    .bus
                    .drain(core.id)
                    .into_iter()
                    .filter_map(|delivery| match delivery.payload {
                        GameEvent::HeroPosition(position) => Some(position),
                        GameEvent::CallTarget(_) => None,
                    })
                    .last();
                if let Some(target) = latest {
                    camera.follow(core, target);
                }
            }
            NodeKind::Group | NodeKind::Grid(_) | NodeKind::Tiles(_) => {}
        }
    }
}

impl Visual for NodeKind {
    fn draw(&self, _core: &NodeCore, canvas: &mut dyn Canvas, origin: Vec2) {
        match self {
            NodeKind::Sprite(sprite) => sprite.draw(canvas, origin),
            NodeKind::Player(player) => player.draw(canvas, origin),
            NodeKind::Grid(grid) => grid.draw(canvas, origin),
            NodeKind::Tiles(tiles) => tiles.draw(canvas, origin),
            NodeKind::Group | NodeKind::Camera(_) => {}
        }
    }
}
