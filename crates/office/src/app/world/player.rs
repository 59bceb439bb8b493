use engine::{
    AnimationSet, Canvas, Direction, FramePattern, ImageHandle, Keyframe, NodeCore, Sprite, Vec2,
};
use tracing::debug;

use super::movement::{move_towards, ARRIVAL_THRESHOLD};
use super::nodes::{GameEvent, StepContext, CALL_TARGET, HERO_POSITION};
use super::PlayerId;
use crate::app::net::OutboundMessage;

pub(crate) const PLAYER_SPEED: f32 = 1.5;
pub(crate) const CALL_DISTANCE: f32 = 32.0;

const FRAME_SIZE: u32 = 32;
const SHEET_COLUMNS: u32 = 3;
const SHEET_ROWS: u32 = 8;
const BODY_OFFSET: Vec2 = Vec2::new(-8.0, -20.0);
const SHADOW_OFFSET: Vec2 = Vec2::new(-8.0, -19.0);

const WALK_DOWN: &str = "walk-down";
const WALK_UP: &str = "walk-up";
const WALK_LEFT: &str = "walk-left";
const WALK_RIGHT: &str = "walk-right";
const STAND_DOWN: &str = "stand-down";
const STAND_UP: &str = "stand-up";
const STAND_LEFT: &str = "stand-left";
const STAND_RIGHT: &str = "stand-right";

/// First frame of each facing's row in the hero sheet.
fn root_frame(direction: Direction) -> u32 {
    match direction {
        Direction::Down => 0,
        Direction::Right => 3,
        Direction::Up => 6,
        Direction::Left => 9,
    }
}

fn walk_key(direction: Direction) -> &'static str {
    match direction {
        Direction::Down => WALK_DOWN,
        Direction::Up => WALK_UP,
        Direction::Left => WALK_LEFT,
        Direction::Right => WALK_RIGHT,
    }
}

fn stand_key(direction: Direction) -> &'static str {
    match direction {
        Direction::Down => STAND_DOWN,
        Direction::Up => STAND_UP,
        Direction::Left => STAND_LEFT,
        Direction::Right => STAND_RIGHT,
    }
}

fn walk_pattern(root: u32) -> FramePattern {
    FramePattern::looping(&[
        Keyframe::new(root + 1, 100.0),
        Keyframe::new(root, 100.0),
        Keyframe::new(root + 1, 100.0),
        Keyframe::new(root + 2, 100.0),
    ])
}

fn hero_animations() -> AnimationSet {
    let mut patterns = Vec::with_capacity(8);
    for direction in [
        Direction::Down,
        Direction::Up,
        Direction::Left,
        Direction::Right,
    ] {
        let root = root_frame(direction);
        patterns.push((walk_key(direction), walk_pattern(root)));
        patterns.push((stand_key(direction), FramePattern::still(root + 1)));
    }
    AnimationSet::new(STAND_DOWN, patterns)
}

/// Grid step for `direction` from `from`.
fn step_from(from: Vec2, direction: Direction, cell_size: f32) -> Vec2 {
    match direction {
        Direction::Up => Vec2::new(from.x, from.y - cell_size),
        Direction::Down => Vec2::new(from.x, from.y + cell_size),
        Direction::Left => Vec2::new(from.x - cell_size, from.y),
        Direction::Right => Vec2::new(from.x + cell_size, from.y),
    }
}

/// Dominant axis of travel from `position` to `destination`, horizontal first.
fn travel_direction(position: Vec2, destination: Vec2) -> Option<Direction> {
    let dx = (position.x - destination.x).floor();
    let dy = (position.y - destination.y).floor();
    if dx < 0.0 {
        Some(Direction::Right)
    } else if dx > 0.0 {
        Some(Direction::Left)
    } else if dy < 0.0 {
        Some(Direction::Down)
    } else if dy > 0.0 {
        Some(Direction::Up)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerRole {
    /// Driven by local input; publishes its moves.
    Local,
    /// Eases toward the last position the server reported.
    Remote(PlayerId),
}

/// Hero and RemoteHero behavior: body and shadow sprites plus grid movement.
#[derive(Debug, Clone)]
pub(crate) struct PlayerController {
    role: PlayerRole,
    facing: Direction,
    destination: Vec2,
    last_emitted: Option<Vec2>,
    speed: f32,
    body: Sprite,
    shadow: Sprite,
}

impl PlayerController {
    pub(crate) fn new(
        role: PlayerRole,
        spawn: Vec2,
        hero_sheet: ImageHandle,
        shadow_image: ImageHandle,
        scale: f32,
        label: impl Into<String>,
    ) -> Self {
        let body = Sprite::new(hero_sheet, FRAME_SIZE, FRAME_SIZE)
            .with_sheet(SHEET_COLUMNS, SHEET_ROWS)
            .with_frame(1)
            .with_scale(scale)
            .with_offset(BODY_OFFSET * scale)
            .with_animations(hero_animations())
            .with_label(label);
        let shadow = Sprite::new(shadow_image, FRAME_SIZE, FRAME_SIZE)
            .with_scale(scale)
            .with_offset(SHADOW_OFFSET * scale);
        Self {
            role,
            facing: Direction::Down,
            destination: spawn,
            last_emitted: None,
            speed: PLAYER_SPEED,
            body,
            shadow,
        }
    }

    pub(crate) fn role(&self) -> PlayerRole {
        self.role
    }

    pub(crate) fn facing(&self) -> Direction {
        self.facing
    }

    pub(crate) fn destination(&self) -> Vec2 {
        self.destination
    }

    /// Overwrites the point this player eases toward.
    pub(crate) fn set_destination(&mut self, destination: Vec2) {
        self.destination = destination;
    }

    /// Moves instantly, cancelling any pending step.
    pub(crate) fn teleport(&mut self, core: &mut NodeCore, position: Vec2) {
        core.position = position;
        self.destination = position;
    }

    pub(crate) fn body(&self) -> &Sprite {
        &self.body
    }

    pub(crate) fn step(&mut self, core: &mut NodeCore, delta_ms: f32, ctx: &mut StepContext<'_>) {
        match self.role {
            PlayerRole::Local => self.step_local(core, ctx),
            PlayerRole::Remote(_) => self.step_remote(core),
        }
        self.body.step(delta_ms);
    }

    pub(crate) fn draw(&self, canvas: &mut dyn Canvas, origin: Vec2) {
        self.shadow.draw(canvas, origin);
        self.body.draw(canvas, origin);
    }

    fn step_local(&mut self, core: &mut NodeCore, ctx: &mut StepContext<'_>) {
        let distance = move_towards(&mut core.position, self.destination, self.speed);
        if distance <= ARRIVAL_THRESHOLD && !ctx.chat_input_active {
            self.try_move(ctx);
        }

        if self.last_emitted != Some(core.position) {
            self.last_emitted = Some(core.position);
            ctx.bus
                .emit(HERO_POSITION, GameEvent::HeroPosition(core.position));
        }

        self.scan_proximity(core.position, ctx);
    }

    fn try_move(&mut self, ctx: &mut StepContext<'_>) {
        let Some(direction) = ctx.input.direction() else {
            self.body.play(stand_key(self.facing));
            return;
        };

        self.facing = direction;
        self.body.play(walk_key(direction));
        self.body.set_frame(root_frame(direction));

        let next = step_from(self.destination, direction, ctx.cell_size);
        if !ctx.walls.is_free(next) {
            debug!(x = next.x, y = next.y, "hero_move_blocked");
            return;
        }
        self.destination = next;
        ctx.outbox.push(OutboundMessage::Position {
            id: ctx.shared.local_id,
            position: next,
        });
    }

    /// Every remote player overwrites the result, so the last one in
    /// registry order decides.
    fn scan_proximity(&self, position: Vec2, ctx: &mut StepContext<'_>) {
        let target = ctx
            .remote_positions
            .iter()
            .fold(None, |_, (id, remote)| {
                (remote.distance(position) <= CALL_DISTANCE).then_some(*id)
            });
        if ctx.shared.set_call_target(target) {
            ctx.bus
                .emit(CALL_TARGET, GameEvent::CallTarget(target));
        }
    }

    fn step_remote(&mut self, core: &mut NodeCore) {
        let before = core.position;
        move_towards(&mut core.position, self.destination, self.speed);
        match travel_direction(before, self.destination) {
            Some(direction) => {
                self.facing = direction;
                self.body.play(walk_key(direction));
            }
            None => self.body.play(stand_key(self.facing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animations_cover_every_facing() {
        let mut set = hero_animations();
        assert_eq!(set.frame(), Some(1));

        set.play(WALK_LEFT, 0.0);
        assert_eq!(set.frame(), Some(10));
        set.step(100.0);
        assert_eq!(set.frame(), Some(9));
        set.step(200.0);
        assert_eq!(set.frame(), Some(11));

        set.play(STAND_RIGHT, 0.0);
        assert_eq!(set.frame(), Some(4));
        set.play(STAND_UP, 0.0);
        assert_eq!(set.frame(), Some(7));
    }

    #[test]
    fn grid_steps_follow_direction() {
        let from = Vec2::new(32.0, 32.0);
        assert_eq!(step_from(from, Direction::Up, 16.0), Vec2::new(32.0, 16.0));
        assert_eq!(step_from(from, Direction::Left, 16.0), Vec2::new(16.0, 32.0));
    }

    #[test]
    fn travel_prefers_horizontal_axis() {
        assert_eq!(
            travel_direction(Vec2::new(0.0, 0.0), Vec2::new(16.0, 16.0)),
            Some(Direction::Right)
        );
        assert_eq!(
            travel_direction(Vec2::new(0.0, 16.0), Vec2::new(0.0, 0.0)),
            Some(Direction::Up)
        );
        assert_eq!(travel_direction(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0)), None);
    }

    #[test]
    fn remote_player_walks_toward_destination_then_stands() {
        let mut player = PlayerController::new(
            PlayerRole::Remote(PlayerId(3)),
            Vec2::ZERO,
            ImageHandle::pending(),
            ImageHandle::pending(),
            1.0,
            "3",
        );
        let mut core = engine::Node::new(()).core().to_owned();
        player.set_destination(Vec2::new(-3.0, 0.0));

        player.step_remote(&mut core);
        assert_eq!(player.facing(), Direction::Left);
        assert_eq!(player.body().animations().map(AnimationSet::active), Some(WALK_LEFT));
        assert_eq!(core.position, Vec2::new(-1.5, 0.0));

        player.step_remote(&mut core);
        player.step_remote(&mut core);
        assert_eq!(core.position, Vec2::new(-3.0, 0.0));
        assert_eq!(player.body().animations().map(AnimationSet::active), Some(STAND_LEFT));
    }
}
