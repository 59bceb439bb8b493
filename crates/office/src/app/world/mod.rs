mod grid;
mod movement;
mod nodes;
mod player;
mod registry;
mod tree;

pub(crate) use grid::GridCell;
pub(crate) use registry::{PlayerId, SharedState};
pub(crate) use tree::{WorldImages, WorldTree};

#[cfg(test)]
pub(crate) use tree::fixtures;
