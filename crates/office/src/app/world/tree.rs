use engine::{
    CameraFollow, CameraView, Canvas, EventBus, GridOverlay, ImageHandle, InputSnapshot, LevelDef,
    Node, NodeId, Sprite, Tilemap, TilemapError, Vec2,
};
use tracing::{debug, info};

use super::grid::{cell_size, GridCell, WallSet};
use super::nodes::{GameEvent, NodeKind, StepContext, CALL_TARGET, HERO_POSITION};
use super::player::{PlayerController, PlayerRole};
use super::registry::{PlayerRegistry, SharedState};
use super::PlayerId;
use crate::app::net::OutboundMessage;

const LOCAL_LABEL: &str = "me";

/// Image handles the world draws with; any of them may still be loading.
#[derive(Debug, Clone)]
pub(crate) struct WorldImages {
    pub(crate) hero: ImageHandle,
    pub(crate) shadow: ImageHandle,
    pub(crate) tileset: ImageHandle,
    pub(crate) sky: Option<ImageHandle>,
}

impl WorldImages {
    pub(crate) fn pending() -> Self {
        Self {
            hero: ImageHandle::pending(),
            shadow: ImageHandle::pending(),
            tileset: ImageHandle::pending(),
            sky: None,
        }
    }
}

/// The scene graph plus the id index over its remote players.
///
/// Layout: root -> camera -> [tiles, grid, hero, remote players...]. The
/// camera is the parent of everything in world space, so its position is
/// the view translation. The sky, when the level has one, is the root's
/// first child so it draws unscrolled beneath the camera layer.
#[derive(Debug)]
pub(crate) struct WorldTree {
    root: Node<NodeKind>,
    camera: NodeId,
    hero: NodeId,
    registry: PlayerRegistry,
    bus: EventBus<NodeId, GameEvent>,
    walls: WallSet,
    scale: f32,
    images: WorldImages,
}

impl WorldTree {
    pub(crate) fn new(
        level: &LevelDef,
        images: WorldImages,
        scale: f32,
        viewport: (u32, u32),
    ) -> Result<Self, TilemapError> {
        let view = CameraView::default();
        let follow = CameraFollow::new(view.clone(), viewport, 8.0 * scale);

        let mut tilemap = Tilemap::new(
            level.width,
            level.height,
            images.tileset.clone(),
            level.tiles_per_row,
            scale,
        )?;
        tilemap.load_map(&level.tiles);

        let spawn = GridCell::new(level.spawn.0, level.spawn.1).to_world(scale);
        let hero = PlayerController::new(
            PlayerRole::Local,
            spawn,
            images.hero.clone(),
            images.shadow.clone(),
            scale,
            LOCAL_LABEL,
        );

        let mut camera = Node::new(NodeKind::Camera(follow));
        camera.add_child(Node::new(NodeKind::Tiles(tilemap)));
        camera.add_child(Node::new(NodeKind::Grid(GridOverlay::new(
            cell_size(scale),
            view,
        ))));
        let hero = camera.add_child(Node::at(NodeKind::Player(hero), spawn));

        let mut root = Node::new(NodeKind::Group);
        if let Some(handle) = images.sky.clone() {
            root.add_child(Node::new(NodeKind::Sprite(Sprite::new(
                handle,
                viewport.0,
                viewport.1,
            ))));
        }
        let camera_id = camera.id();
        root.add_child(camera);

        let mut bus = EventBus::new();
        bus.on(HERO_POSITION, camera_id);
        bus.on(CALL_TARGET, root.id());

        let walls = WallSet::from_cells(
            level
                .walls
                .iter()
                .map(|&(x, y)| GridCell::new(x, y)),
            scale,
        );
        info!(
            width = level.width,
            height = level.height,
            walls = walls.len(),
            scale,
            "world_built"
        );

        Ok(Self {
            root,
            camera: camera_id,
            hero,
            registry: PlayerRegistry::default(),
            bus,
            walls,
            scale,
            images,
        })
    }

    pub(crate) fn root(&self) -> &Node<NodeKind> {
        &self.root
    }

    pub(crate) fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub(crate) fn camera_translation(&self) -> Vec2 {
        self.root
            .find(self.camera)
            .map(Node::position)
            .unwrap_or(Vec2::ZERO)
    }

    pub(crate) fn hero_position(&self) -> Vec2 {
        self.root
            .find(self.hero)
            .map(Node::position)
            .unwrap_or(Vec2::ZERO)
    }

    pub(crate) fn hero(&self) -> Option<&PlayerController> {
        self.root
            .find(self.hero)
            .and_then(|node| node.behavior().as_player())
    }

    /// Places the hero on `cell`, cancelling any step in progress.
    pub(crate) fn teleport_hero(&mut self, cell: GridCell) -> Vec2 {
        let position = cell.to_world(self.scale);
        self.place_hero(position);
        info!(x = cell.x, y = cell.y, "hero_spawned");
        position
    }

    pub(crate) fn place_hero(&mut self, position: Vec2) {
        if let Some(node) = self.root.find_mut(self.hero) {
            let mut core = *node.core();
            if let Some(player) = node.behavior_mut().as_player_mut() {
                player.teleport(&mut core, position);
            }
            node.set_position(core.position);
        }
    }

    /// Returns false when `id` is already in the registry.
    pub(crate) fn add_remote(&mut self, id: PlayerId, position: Vec2, name: Option<&str>) -> bool {
        if self.registry.contains(id) {
            debug!(player_id = %id, "remote_player_known");
            return false;
        }
        let label = name.map_or_else(|| id.to_string(), str::to_string);
        let controller = PlayerController::new(
            PlayerRole::Remote(id),
            position,
            self.images.hero.clone(),
            self.images.shadow.clone(),
            self.scale,
            label,
        );
        let Some(camera) = self.root.find_mut(self.camera) else {
            return false;
        };
        let node = camera.add_child(Node::at(NodeKind::Player(controller), position));
        self.registry.insert(id, node);
        info!(player_id = %id, x = position.x, y = position.y, "remote_player_added");
        true
    }

    pub(crate) fn remove_remote(&mut self, id: PlayerId) -> bool {
        let Some(node) = self.registry.remove(id) else {
            debug!(player_id = %id, "remote_player_unknown");
            return false;
        };
        if let Some(camera) = self.root.find_mut(self.camera) {
            camera.remove_child(node);
        }
        info!(player_id = %id, "remote_player_removed");
        true
    }

    /// Removes every remote player, returning how many were dropped.
    pub(crate) fn clear_remotes(&mut self) -> usize {
        let nodes = self.registry.clear();
        if let Some(camera) = self.root.find_mut(self.camera) {
            for node in &nodes {
                camera.remove_child(*node);
            }
        }
        nodes.len()
    }

    /// Overwrites the remote's destination. Unknown ids are ignored.
    pub(crate) fn set_remote_destination(&mut self, id: PlayerId, destination: Vec2) -> bool {
        let Some(node) = self.registry.get(id) else {
            debug!(player_id = %id, "remote_position_for_unknown_player");
            return false;
        };
        match self
            .root
            .find_mut(node)
            .and_then(|node| node.behavior_mut().as_player_mut())
        {
            Some(player) => {
                player.set_destination(destination);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remote_destination(&self, id: PlayerId) -> Option<Vec2> {
        let node = self.registry.get(id)?;
        self.root
            .find(node)
            .and_then(|node| node.behavior().as_player())
            .map(PlayerController::destination)
    }

    pub(crate) fn remote_positions(&self) -> Vec<(PlayerId, Vec2)> {
        self.registry
            .iter()
            .filter_map(|(id, node)| self.root.find(node).map(|node| (id, node.position())))
            .collect()
    }

    /// Is `node` still attached below the camera?
    pub(crate) fn is_attached(&self, node: NodeId) -> bool {
        self.root
            .find(self.camera)
            .is_some_and(|camera| camera.children().iter().any(|child| child.id() == node))
    }

    /// Runs one fixed step over the whole tree and returns call-target changes.
    pub(crate) fn step(
        &mut self,
        delta_ms: f32,
        input: &InputSnapshot,
        chat_input_active: bool,
        outbox: &mut Vec<OutboundMessage>,
        shared: &mut SharedState,
    ) -> Vec<Option<PlayerId>> {
        let remote_positions = self.remote_positions();
        let mut ctx = StepContext {
            input,
            chat_input_active,
            walls: &self.walls,
            cell_size: cell_size(self.scale),
            bus: &mut self.bus,
            outbox,
            shared,
            remote_positions: &remote_positions,
        };
        self.root.step_entry(delta_ms, &mut ctx);

        self.bus
            .drain(self.root.id())
            .into_iter()
            .filter_map(|delivery| match delivery.payload {
                GameEvent::CallTarget(target) => Some(target),
                GameEvent::HeroPosition(_) => None,
            })
            .collect()
    }

    pub(crate) fn draw(&self, canvas: &mut dyn Canvas) {
        self.root.draw(canvas, 0.0, 0.0);
    }
}


#[cfg(test)]
mod tests {
    use engine::{Direction, InputAction, RecordingCanvas};

    use super::fixtures::open_level;
    use super::*;

    fn tree() -> WorldTree {
        WorldTree::new(&open_level(), WorldImages::pending(), 1.0, (320, 180)).expect("tree")
    }

    fn step(tree: &mut WorldTree, input: &InputSnapshot) -> Vec<OutboundMessage> {
        let mut outbox = Vec::new();
        let mut shared = SharedState::default();
        tree.step(16.0, input, false, &mut outbox, &mut shared);
        outbox
    }

    #[test]
    fn hero_spawns_on_level_spawn_cell() {
        let tree = tree();
        assert_eq!(tree.hero_position(), Vec2::new(32.0, 32.0));
        assert_eq!(tree.root().node_count(), 5);
    }

    #[test]
    fn camera_centres_on_hero_after_first_step() {
        let mut tree = tree();
        step(&mut tree, &InputSnapshot::empty());

        assert_eq!(tree.camera_translation(), Vec2::new(-32.0 + 152.0, -32.0 + 82.0));
    }

    #[test]
    fn committed_move_is_published_once() {
        let mut tree = tree();
        let right = InputSnapshot::empty()
            .with_direction(Some(Direction::Right))
            .with_action_down(InputAction::MoveRight, true);

        let sent = step(&mut tree, &right);
        assert_eq!(
            sent,
            vec![OutboundMessage::Position {
                id: None,
                position: Vec2::new(48.0, 32.0)
            }]
        );
        // Still walking toward the new cell: no second message yet.
        assert!(step(&mut tree, &right).is_empty());
    }

    #[test]
    fn remote_players_attach_and_detach_from_camera_layer() {
        let mut tree = tree();
        assert!(tree.add_remote(PlayerId(5), Vec2::new(64.0, 64.0), Some("ana")));
        assert!(!tree.add_remote(PlayerId(5), Vec2::ZERO, None));
        let node = tree.registry().get(PlayerId(5)).expect("registered");
        assert!(tree.is_attached(node));

        assert!(tree.remove_remote(PlayerId(5)));
        assert!(!tree.is_attached(node));
        assert!(!tree.remove_remote(PlayerId(5)));
    }

    #[test]
    fn remote_labels_are_drawn() {
        let mut tree = tree();
        tree.add_remote(PlayerId(9), Vec2::new(64.0, 64.0), None);
        let mut canvas = RecordingCanvas::new(320, 180);

        tree.draw(&mut canvas);

        assert_eq!(canvas.texts(), vec!["me", "9"]);
    }

    #[test]
    fn sky_is_drawn_beneath_the_camera_layer() {
        let mut level = open_level();
        level.sky = Some("sky".to_string());
        let images = WorldImages {
            sky: Some(ImageHandle::pending()),
            ..WorldImages::pending()
        };
        let tree = WorldTree::new(&level, images, 1.0, (320, 180)).expect("world");

        assert_eq!(tree.root().node_count(), 6);
        assert!(matches!(
            tree.root().children()[0].behavior(),
            NodeKind::Sprite(_)
        ));
        assert!(matches!(
            tree.root().children()[1].behavior(),
            NodeKind::Camera(_)
        ));
    }

    #[test]
    fn clear_removes_every_remote() {
        let mut tree = tree();
        tree.add_remote(PlayerId(1), Vec2::ZERO, None);
        tree.add_remote(PlayerId(2), Vec2::ZERO, None);

        assert_eq!(tree.clear_remotes(), 2);
        assert!(tree.registry().is_empty());
        assert_eq!(tree.root().node_count(), 5);
    }
}
