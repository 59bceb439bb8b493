use thiserror::Error;

use super::rendering::{Canvas, PixelRect};
use super::{ImageHandle, Vec2};

pub const BASE_TILE_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: i32,
    pub solid: bool,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        id: -1,
        solid: false,
    };

    pub const fn new(id: i32) -> Self {
        Self { id, solid: false }
    }

    pub fn is_empty(&self) -> bool {
        self.id < 0
    }
}

/// Static tile layer drawn from a tileset image. Coordinates:
/// - tile `(x, y)` covers world pixels `[x, x+1) * tile_size` by `[y, y+1) * tile_size`.
/// - tile id `n` is read from tileset cell `(n % tiles_per_row, n / tiles_per_row)`.
#[derive(Debug, Clone)]
pub struct Tilemap {
    width: u32,
    height: u32,
    scale: f32,
    tiles_per_row: u32,
    tileset: ImageHandle,
    tiles: Vec<Tile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tilemap dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("tileset must have at least one tile per row")]
    NoTilesPerRow,
    #[error("tile ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        tileset: ImageHandle,
        tiles_per_row: u32,
        scale: f32,
    ) -> Result<Self, TilemapError> {
        if width == 0 || height == 0 {
            return Err(TilemapError::EmptyDimensions { width, height });
        }
        if tiles_per_row == 0 {
            return Err(TilemapError::NoTilesPerRow);
        }
        Ok(Self {
            width,
            height,
            scale: if scale.is_finite() && scale > 0.0 {
                scale
            } else {
                1.0
            },
            tiles_per_row,
            tileset,
            tiles: vec![Tile::EMPTY; width as usize * height as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        BASE_TILE_SIZE as f32 * self.scale
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get_tile(&self, x: i32, y: i32) -> Option<Tile> {
        self.index_of(x, y).map(|index| self.tiles[index])
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) -> Result<(), TilemapError> {
        let index = self.index_of(x, y).ok_or(TilemapError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        self.tiles[index] = tile;
        Ok(())
    }

    /// Copies ids row by row; rows or columns beyond the map are ignored.
    pub fn load_map(&mut self, rows: &[Vec<i32>]) {
        for (y, row) in rows.iter().take(self.height as usize).enumerate() {
            for (x, id) in row.iter().take(self.width as usize).enumerate() {
                let index = y * self.width as usize + x;
                self.tiles[index].id = *id;
            }
        }
    }

    pub fn pixel_to_tile(&self, position: Vec2) -> (i32, i32) {
        let size = self.tile_size();
        (
            (position.x / size).floor() as i32,
            (position.y / size).floor() as i32,
        )
    }

    pub fn tile_to_pixel(&self, x: i32, y: i32) -> Vec2 {
        let size = self.tile_size();
        Vec2::new(x as f32 * size, y as f32 * size)
    }

    pub fn source_rect(&self, id: i32) -> Option<PixelRect> {
        let id = u32::try_from(id).ok()?;
        // Ids from level files are unchecked; out-of-range rows have no source.
        let column = (id % self.tiles_per_row).checked_mul(BASE_TILE_SIZE)?;
        let row = (id / self.tiles_per_row).checked_mul(BASE_TILE_SIZE)?;
        Some(PixelRect::new(
            i32::try_from(column).ok()?,
            i32::try_from(row).ok()?,
            BASE_TILE_SIZE,
            BASE_TILE_SIZE,
        ))
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, origin: Vec2) {
        let Some(image) = self.tileset.get() else {
            return;
        };
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let Some(tile) = self.get_tile(x, y) else {
                    continue;
                };
                let Some(src) = self.source_rect(tile.id) else {
                    continue;
                };
                let at = origin + self.tile_to_pixel(x, y);
                canvas.draw_image_region(
                    image,
                    src,
                    at.x.round() as i32,
                    at.y.round() as i32,
                    self.scale,
                );
            }
        }
    }
}
