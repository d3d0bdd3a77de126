//! Dirty tile tracking over the 6x4 visible tile grid.

use crate::{TILES_PER_COL, TILES_PER_ROW};
use serde::{Deserialize, Serialize};

/// A tile position. `row` counts down (0-3), `col` counts across (0-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub row: usize,
    pub col: usize,
}

impl TileCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Set of changed tiles, one byte of the mask per tile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyTiles {
    mask: u32,
}

impl DirtyTiles {
    const ROW_BITS: u32 = (1 << TILES_PER_ROW) - 1;
    const ALL: u32 = Self::ROW_BITS
        | (Self::ROW_BITS << 8)
        | (Self::ROW_BITS << 16)
        | (Self::ROW_BITS << 24);

    /// Starts fully dirty so the first drain repaints everything.
    pub fn new() -> Self {
        Self { mask: Self::ALL }
    }

    fn bit(row: usize, col: usize) -> u32 {
        1 << (row * 8 + col)
    }

    pub fn mark_all(&mut self) {
        self.mask = Self::ALL;
    }

    /// Mark one tile; coordinates outside the grid are ignored.
    pub fn mark(&mut self, row: usize, col: usize) {
        if row < TILES_PER_COL && col < TILES_PER_ROW {
            self.mask |= Self::bit(row, col);
        }
    }

    pub fn is_dirty(&self, row: usize, col: usize) -> bool {
        row < TILES_PER_COL && col < TILES_PER_ROW && self.mask & Self::bit(row, col) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Return the dirty tiles in row-major order and clear the set.
    pub fn drain(&mut self) -> Vec<TileCoord> {
        let mask = std::mem::take(&mut self.mask);
        if mask == 0 {
            return Vec::new();
        }
        (0..TILES_PER_COL)
            .flat_map(|row| (0..TILES_PER_ROW).map(move |col| TileCoord::new(row, col)))
            .filter(|tile| mask & Self::bit(tile.row, tile.col) != 0)
            .collect()
    }

    pub(crate) fn bits(&self) -> u32 {
        self.mask
    }

    /// Rebuild from a saved mask, dropping bits outside the grid.
    pub(crate) fn from_bits(mask: u32) -> Self {
        Self {
            mask: mask & Self::ALL,
        }
    }
}

impl Default for DirtyTiles {
    fn default() -> Self {
        Self::new()
    }
}
