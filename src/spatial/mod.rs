//! Tile grid lookups for a single region

use std::collections::HashMap;

use crate::world::{Building, BuildingId, Tile, TileId};

/// Tile position in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

impl TilePos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Position `steps` tiles away, or `None` when it falls off the grid origin.
    pub fn step(self, direction: Direction, steps: u32) -> Option<TilePos> {
        let (dx, dy) = direction.delta();
        self.offset(dx * steps as i64, dy * steps as i64)
    }

    fn offset(self, dx: i64, dy: i64) -> Option<TilePos> {
        let x = self.x as i64 + dx;
        let y = self.y as i64 + dy;
        if x < 0 || y < 0 || x > u32::MAX as i64 || y > u32::MAX as i64 {
            return None;
        }
        Some(TilePos::new(x as u32, y as u32))
    }

    /// Surrounding ring (8-connectivity)
    pub fn surrounding(self) -> Vec<TilePos> {
        let mut out = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(pos) = self.offset(dx, dy) {
                    out.push(pos);
                }
            }
        }
        out
    }
}

/// Position index over a region's tiles and the buildings standing on them.
pub struct RegionGrid<'a> {
    tiles: HashMap<TilePos, &'a Tile>,
    positions: HashMap<TileId, TilePos>,
    building_on: HashMap<TileId, BuildingId>,
}

impl<'a> RegionGrid<'a> {
    pub fn new(tiles: &'a [Tile], buildings: &[Building]) -> Self {
        let mut by_pos = HashMap::with_capacity(tiles.len());
        let mut positions = HashMap::with_capacity(tiles.len());
        for tile in tiles {
            let pos = TilePos::new(tile.x, tile.y);
            by_pos.insert(pos, tile);
            positions.insert(tile.id, pos);
        }
        let building_on = buildings.iter().map(|b| (b.tile_id, b.id)).collect();
        Self {
            tiles: by_pos,
            positions,
            building_on,
        }
    }

    pub fn tile_at(&self, pos: TilePos) -> Option<&'a Tile> {
        self.tiles.get(&pos).copied()
    }

    pub fn position_of(&self, tile: TileId) -> Option<TilePos> {
        self.positions.get(&tile).copied()
    }

    pub fn building_at(&self, pos: TilePos) -> Option<BuildingId> {
        let tile = self.tile_at(pos)?;
        self.building_on.get(&tile.id).copied()
    }

    /// Buildings in the 8 tiles around the given tile.
    pub fn surrounding_buildings(&self, tile: TileId) -> Vec<BuildingId> {
        match self.position_of(tile) {
            Some(pos) => pos
                .surrounding()
                .into_iter()
                .filter_map(|p| self.building_at(p))
                .collect(),
            None => Vec::new(),
        }
    }
}
