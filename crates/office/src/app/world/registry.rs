use std::fmt;

use engine::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct PlayerId(pub(crate) u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote players by id, pointing at the nodes that render them.
/// Iteration follows insertion order.
#[derive(Debug, Default)]
pub(crate) struct PlayerRegistry {
    entries: Vec<(PlayerId, NodeId)>,
}

impl PlayerRegistry {
    /// Returns false and leaves the registry unchanged when `id` is already known.
    pub(crate) fn insert(&mut self, id: PlayerId, node: NodeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push((id, node));
        true
    }

    pub(crate) fn remove(&mut self, id: PlayerId) -> Option<NodeId> {
        let index = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn get(&self, id: PlayerId) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, node)| *node)
    }

    pub(crate) fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PlayerId, NodeId)> + '_ {
        self.entries.iter().copied()
    }

    pub(crate) fn clear(&mut self) -> Vec<NodeId> {
        self.entries.drain(..).map(|(_, node)| node).collect()
    }
}

/// Flags shared between the hero, the network handlers and the HUD.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) local_id: Option<PlayerId>,
    pub(crate) connection_ready: bool,
    pub(crate) authenticated: bool,
    call_target: Option<PlayerId>,
}

impl SharedState {
    pub(crate) fn can_call(&self) -> bool {
        self.call_target.is_some()
    }

    pub(crate) fn call_target(&self) -> Option<PlayerId> {
        self.call_target
    }

    /// Returns true when the target changed.
    pub(crate) fn set_call_target(&mut self, target: Option<PlayerId>) -> bool {
        let changed = self.call_target != target;
        self.call_target = target;
        changed
    }
}
