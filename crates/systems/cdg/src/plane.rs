//! The pixel plane: palette indices for every pixel, border included, and a
//! parallel grid of resolved colours.
//!
//! Invariant: `colours[i] == table.get(indices[i])` for every pixel, for the
//! table last passed to a mutating call. Every write goes through both grids.

use crate::colour_table::ColourTable;
use crate::{BORDER_LEFT, BORDER_TOP, DISPLAY_HEIGHT, DISPLAY_WIDTH, FULL_HEIGHT, FULL_WIDTH};

const PLANE_SIZE: usize = FULL_WIDTH * FULL_HEIGHT;

#[derive(Debug, Clone)]
pub struct PixelPlane<C> {
    /// Row-major, `FULL_WIDTH` indices per row
    indices: Vec<u8>,
    colours: Vec<C>,
    scratch: Vec<u8>,
}

impl<C: Copy> PixelPlane<C> {
    /// All pixels index 0, resolved to `colour`.
    pub fn new(colour: C) -> Self {
        Self {
            indices: vec![0; PLANE_SIZE],
            colours: vec![colour; PLANE_SIZE],
            scratch: vec![0; PLANE_SIZE],
        }
    }

    #[inline]
    fn offset(x: usize, y: usize) -> usize {
        debug_assert!(x < FULL_WIDTH && y < FULL_HEIGHT);
        y * FULL_WIDTH + x
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> u8 {
        self.indices[Self::offset(x, y)]
    }

    #[inline]
    pub fn colour(&self, x: usize, y: usize) -> C {
        self.colours[Self::offset(x, y)]
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn colours(&self) -> &[C] {
        &self.colours
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, index: u8, table: &ColourTable<C>) {
        let offset = Self::offset(x, y);
        let index = index & 0x0F;
        self.indices[offset] = index;
        self.colours[offset] = table.get(index);
    }

    /// Fill a rectangle, clipped to the plane.
    pub fn fill_rect(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        index: u8,
        table: &ColourTable<C>,
    ) {
        let index = index & 0x0F;
        let colour = table.get(index);
        let x_end = (x + width).min(FULL_WIDTH);
        let y_end = (y + height).min(FULL_HEIGHT);
        if x >= x_end {
            return;
        }
        for row in y..y_end {
            let start = Self::offset(x, row);
            let end = start + (x_end - x);
            self.indices[start..end].fill(index);
            self.colours[start..end].fill(colour);
        }
    }

    pub fn fill(&mut self, index: u8, table: &ColourTable<C>) {
        self.fill_rect(0, 0, FULL_WIDTH, FULL_HEIGHT, index, table);
    }

    /// Fill everything outside the visible area.
    pub fn fill_border(&mut self, index: u8, table: &ColourTable<C>) {
        let bottom = BORDER_TOP + DISPLAY_HEIGHT;
        let right = BORDER_LEFT + DISPLAY_WIDTH;
        self.fill_rect(0, 0, FULL_WIDTH, BORDER_TOP, index, table);
        self.fill_rect(0, bottom, FULL_WIDTH, FULL_HEIGHT - bottom, index, table);
        self.fill_rect(0, BORDER_TOP, BORDER_LEFT, DISPLAY_HEIGHT, index, table);
        self.fill_rect(right, BORDER_TOP, FULL_WIDTH - right, DISPLAY_HEIGHT, index, table);
    }

    /// Recompute every resolved colour from its index.
    pub fn refresh(&mut self, table: &ColourTable<C>) {
        for (colour, &index) in self.colours.iter_mut().zip(&self.indices) {
            *colour = table.get(index);
        }
    }

    /// Rotate the index grid by (dx, dy) pixels with wrap-around.
    ///
    /// With `fill` set, the band that wrapped in on the leading edge of each
    /// scrolled axis is overwritten with that index instead. Resolved
    /// colours are not touched; call [`refresh`](Self::refresh) afterwards.
    pub fn rotate(&mut self, dx: i32, dy: i32, fill: Option<u8>) {
        let width = FULL_WIDTH as i32;
        let height = FULL_HEIGHT as i32;
        let x_inc = dx.rem_euclid(width);
        let y_inc = dy.rem_euclid(height);

        for y in 0..height {
            let dest_y = (y + y_inc) % height;
            for x in 0..width {
                let dest_x = (x + x_inc) % width;
                self.scratch[Self::offset(dest_x as usize, dest_y as usize)] =
                    self.indices[Self::offset(x as usize, y as usize)];
            }
        }

        if let Some(index) = fill {
            let index = index & 0x0F;
            let band_rows = match dy {
                d if d > 0 => 0..(d.min(height) as usize),
                d if d < 0 => ((height + d).max(0) as usize)..FULL_HEIGHT,
                _ => 0..0,
            };
            for y in band_rows {
                self.scratch[Self::offset(0, y)..Self::offset(0, y) + FULL_WIDTH].fill(index);
            }

            let band_cols = match dx {
                d if d > 0 => 0..(d.min(width) as usize),
                d if d < 0 => ((width + d).max(0) as usize)..FULL_WIDTH,
                _ => 0..0,
            };
            if !band_cols.is_empty() {
                for y in 0..FULL_HEIGHT {
                    let row = Self::offset(0, y);
                    self.scratch[row + band_cols.start..row + band_cols.end].fill(index);
                }
            }
        }

        std::mem::swap(&mut self.indices, &mut self.scratch);
    }

    /// Copy a `width` x `height` block of resolved colours starting at (x, y).
    /// The block must lie inside the plane.
    pub fn copy_colours(&self, x: usize, y: usize, width: usize, height: usize, out: &mut Vec<C>) {
        out.clear();
        out.reserve(width * height);
        for row in y..y + height {
            let start = Self::offset(x, row);
            out.extend_from_slice(&self.colours[start..start + width]);
        }
    }

    /// Replace the index grid wholesale and re-resolve it.
    ///
    /// Callers validate `indices`: `FULL_WIDTH * FULL_HEIGHT` values below 16.
    pub(crate) fn restore(&mut self, indices: &[u8], table: &ColourTable<C>) {
        self.indices.copy_from_slice(indices);
        self.refresh(table);
    }
}
