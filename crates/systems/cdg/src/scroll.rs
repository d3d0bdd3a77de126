//! Scroll command decoding and the persistent screen shift.
//!
//! A scroll instruction carries, per axis, a 2-bit command and an offset.
//! The command moves the plane one whole block (6 pixels across, 12 down)
//! with wrap-around; the offset is a persistent 0-5 / 0-11 pixel shift of
//! the visible window that is used with block scrolls to get smooth,
//! pixel-at-a-time scrolling.

use crate::config::ScrollPolicy;
use crate::{BLOCK_HEIGHT, BLOCK_WIDTH};
use serde::{Deserialize, Serialize};

/// One axis' scroll command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCode {
    /// 0 (and the unassigned 3): no block scroll
    None,
    /// 1: right, or down
    Positive,
    /// 2: left, or up
    Negative,
}

impl ScrollCode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => ScrollCode::Positive,
            2 => ScrollCode::Negative,
            _ => ScrollCode::None,
        }
    }

    fn sign(self) -> i32 {
        match self {
            ScrollCode::None => 0,
            ScrollCode::Positive => 1,
            ScrollCode::Negative => -1,
        }
    }
}

/// Decoded fields of a scroll preset or scroll copy instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollParams {
    /// Fill colour for pixels scrolled in by a preset scroll
    pub colour: u8,
    pub h_code: ScrollCode,
    /// 0-7 as encoded; only 0-5 are meaningful
    pub h_offset: u8,
    pub v_code: ScrollCode,
    /// 0-15 as encoded; only 0-11 are meaningful
    pub v_offset: u8,
}

impl ScrollParams {
    /// Pixel displacement (dx, dy) applied to the plane contents.
    pub fn displacement(&self, policy: ScrollPolicy) -> (i32, i32) {
        let magnitude = |offset: u8, block: usize| match policy {
            ScrollPolicy::Coarse if offset != 0 => offset as i32,
            _ => block as i32,
        };
        (
            self.h_code.sign() * magnitude(self.h_offset, BLOCK_WIDTH),
            self.v_code.sign() * magnitude(self.v_offset, BLOCK_HEIGHT),
        )
    }

    /// Screen shift requested by the offsets, clamped to range.
    pub fn shift(&self) -> ScrollShift {
        ScrollShift::clamped(self.h_offset, self.v_offset)
    }
}

/// Persistent sub-block offset of the visible window into the plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollShift {
    pub horizontal: u8,
    pub vertical: u8,
}

impl ScrollShift {
    pub const MAX_HORIZONTAL: u8 = (BLOCK_WIDTH - 1) as u8;
    pub const MAX_VERTICAL: u8 = (BLOCK_HEIGHT - 1) as u8;

    pub fn clamped(horizontal: u8, vertical: u8) -> Self {
        Self {
            horizontal: horizontal.min(Self::MAX_HORIZONTAL),
            vertical: vertical.min(Self::MAX_VERTICAL),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.horizontal <= Self::MAX_HORIZONTAL && self.vertical <= Self::MAX_VERTICAL
    }
}
