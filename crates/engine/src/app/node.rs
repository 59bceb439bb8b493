use std::sync::atomic::{AtomicU64, Ordering};

use super::rendering::Canvas;
use super::Vec2;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Per-node state every behavior can read and move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCore {
    pub id: NodeId,
    pub position: Vec2,
    pub draw_offset: Vec2,
}

/// Per-tick logic for a node kind, run after the node's children.
pub trait Behavior<C: ?Sized> {
    fn step(&mut self, _core: &mut NodeCore, _delta_ms: f32, _ctx: &mut C) {}
}

/// Drawing for a node kind, run before the node's children.
pub trait Visual {
    fn draw(&self, _core: &NodeCore, _canvas: &mut dyn Canvas, _origin: Vec2) {}
}

/// Scene graph node. A node owns its children; the tree has no other edges.
#[derive(Debug)]
pub struct Node<B> {
    core: NodeCore,
    behavior: B,
    children: Vec<Node<B>>,
}

impl<B> Node<B> {
    pub fn new(behavior: B) -> Self {
        Self::at(behavior, Vec2::ZERO)
    }

    pub fn at(behavior: B, position: Vec2) -> Self {
        Self {
            core: NodeCore {
                id: NodeId::next(),
                position,
                draw_offset: Vec2::ZERO,
            },
            behavior,
            children: Vec::new(),
        }
    }

    pub fn with_draw_offset(mut self, draw_offset: Vec2) -> Self {
        self.core.draw_offset = draw_offset;
        self
    }

    pub fn id(&self) -> NodeId {
        self.core.id
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn position(&self) -> Vec2 {
        self.core.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.core.position = position;
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn children(&self) -> &[Node<B>] {
        &self.children
    }

    pub fn add_child(&mut self, child: Node<B>) -> NodeId {
        let id = child.id();
        self.children.push(child);
        id
    }

    /// Detaches the direct child with `id`. Removal filters by id, so the
    /// remaining children keep their relative order.
    pub fn remove_child(&mut self, id: NodeId) -> Option<Node<B>> {
        let index = self.children.iter().position(|child| child.id() == id)?;
        Some(self.children.remove(index))
    }

    pub fn find(&self, id: NodeId) -> Option<&Node<B>> {
        if self.core.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node<B>> {
        if self.core.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.node_count())
            .sum::<usize>()
    }

    /// Post-order: every child subtree steps before this node.
    pub fn step_entry<C: ?Sized>(&mut self, delta_ms: f32, ctx: &mut C)
    where
        B: Behavior<C>,
    {
        for child in &mut self.children {
            child.step_entry(delta_ms, ctx);
        }
        self.behavior.step(&mut self.core, delta_ms, ctx);
    }

    /// Pre-order: draws at `(x, y) + position + draw_offset`, then children
    /// relative to that point.
    pub fn draw(&self, canvas: &mut dyn Canvas, x: f32, y: f32)
    where
        B: Visual,
    {
        let origin = Vec2::new(x, y) + self.core.position + self.core.draw_offset;
        self.behavior.draw(&self.core, canvas, origin);
        for child in &self.children {
            child.draw(canvas, origin.x, origin.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::RecordingCanvas;

    #[derive(Debug)]
    struct Probe(&'static str);

    impl Behavior<Vec<&'static str>> for Probe {
        fn step(&mut self, _core: &mut NodeCore, _delta_ms: f32, log: &mut Vec<&'static str>) {
            log.push(self.0);
        }
    }

    impl Visual for Probe {
        fn draw(&self, _core: &NodeCore, canvas: &mut dyn Canvas, origin: Vec2) {
            canvas.draw_text(origin.x as i32, origin.y as i32, self.0, [0, 0, 0, 255]);
        }
    }

    fn sample_tree() -> Node<Probe> {
        let mut root = Node::at(Probe("root"), Vec2::new(10.0, 10.0));
        let mut branch = Node::at(Probe("branch"), Vec2::new(5.0, 0.0))
            .with_draw_offset(Vec2::new(0.0, -2.0));
        branch.add_child(Node::at(Probe("leaf"), Vec2::new(1.0, 1.0)));
        root.add_child(branch);
        root.add_child(Node::new(Probe("sibling")));
        root
    }

    #[test]
    fn step_is_post_order() {
        let mut root = sample_tree();
        let mut log = Vec::new();

        root.step_entry(16.0, &mut log);

        assert_eq!(log, vec!["leaf", "branch", "sibling", "root"]);
    }

    #[test]
    fn draw_is_pre_order_with_accumulated_origin() {
        let root = sample_tree();
        let mut canvas = RecordingCanvas::new(64, 64);

        root.draw(&mut canvas, 100.0, 0.0);

        assert_eq!(canvas.texts(), vec!["root", "branch", "leaf", "sibling"]);
        let origins: Vec<(i32, i32)> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                crate::app::rendering::DrawOp::Text { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(origins, vec![(110, 10), (115, 8), (116, 9), (110, 10)]);
    }

    #[test]
    fn remove_child_filters_by_id_and_keeps_order() {
        let mut root = Node::new(Probe("root"));
        let a = root.add_child(Node::new(Probe("a")));
        let b = root.add_child(Node::new(Probe("b")));
        let c = root.add_child(Node::new(Probe("c")));

        let removed = root.remove_child(b).expect("removed");
        assert_eq!(removed.id(), b);
        assert!(root.remove_child(b).is_none());

        let ids: Vec<NodeId> = root.children().iter().map(Node::id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn find_mut_reaches_nested_nodes() {
        let mut root = sample_tree();
        let leaf_id = root.children()[0].children()[0].id();

        root.find_mut(leaf_id)
            .expect("leaf")
            .set_position(Vec2::new(9.0, 9.0));

        assert_eq!(
            root.find(leaf_id).map(Node::position),
            Some(Vec2::new(9.0, 9.0))
        );
        assert_eq!(root.node_count(), 4);
    }
}
