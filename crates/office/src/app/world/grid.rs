use std::collections::HashSet;

use engine::{Vec2, BASE_TILE_SIZE};

/// World pixels covered by `n` grid cells at `scale`.
pub(crate) fn grid_cells(n: i32, scale: f32) -> f32 {
    n as f32 * BASE_TILE_SIZE as f32 * scale
}

pub(crate) fn cell_size(scale: f32) -> f32 {
    grid_cells(1, scale)
}

/// Grid cell index. Converted to world pixels only through `to_world`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GridCell {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl GridCell {
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_world(self, scale: f32) -> Vec2 {
        Vec2::new(grid_cells(self.x, scale), grid_cells(self.y, scale))
    }
}

/// Impassable cells keyed by their world-pixel origin, the same unit the
/// movement code uses for destinations.
#[derive(Debug, Clone, Default)]
pub(crate) struct WallSet {
    keys: HashSet<(i32, i32)>,
}

impl WallSet {
    pub(crate) fn from_cells(cells: impl IntoIterator<Item = GridCell>, scale: f32) -> Self {
        Self {
            keys: cells
                .into_iter()
                .map(|cell| world_key(cell.to_world(scale)))
                .collect(),
        }
    }

    pub(crate) fn is_free(&self, position: Vec2) -> bool {
        !self.keys.contains(&world_key(position))
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

fn world_key(position: Vec2) -> (i32, i32) {
    (position.x.round() as i32, position.y.round() as i32)
}
