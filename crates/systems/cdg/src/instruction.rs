//! Instruction decoding.
//!
//! Only packets whose command field is [`GRAPHICS_COMMAND`] carry CD+G
//! graphics; everything else on the subcode channel is noise to us.

use crate::colour_table::{Rgb12, TableHalf};
use crate::packet::{Packet, FIELD_MASK};
use crate::scroll::{ScrollCode, ScrollParams};
use crate::{BLOCK_HEIGHT, BLOCK_WIDTH};

/// Command field of a CD+G graphics packet
pub const GRAPHICS_COMMAND: u8 = 0x09;

const INST_MEMORY_PRESET: u8 = 1;
const INST_BORDER_PRESET: u8 = 2;
const INST_TILE_BLOCK: u8 = 6;
const INST_SCROLL_PRESET: u8 = 20;
const INST_SCROLL_COPY: u8 = 24;
const INST_DEF_TRANSPARENT: u8 = 28;
const INST_LOAD_TABLE_LOW: u8 = 30;
const INST_LOAD_TABLE_HIGH: u8 = 31;
const INST_TILE_BLOCK_XOR: u8 = 38;

/// Bit in the second data byte that voids a tile block on some discs
const TILE_BLOCK_IGNORE_BIT: u8 = 0x20;

/// Fields of a tile block (normal or XOR) instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBlock {
    pub colour0: u8,
    pub colour1: u8,
    /// Block row, 5 bits; the block's top edge is `row * 12`
    pub row: u8,
    /// Block column, 6 bits; the block's left edge is `column * 6`
    pub column: u8,
    /// 12 rows of 6 pixels, leftmost pixel in bit 5
    pub bitmap: [u8; BLOCK_HEIGHT],
    pub ignore: bool,
}

impl TileBlock {
    fn decode(data: &[u8; 16]) -> Self {
        let mut bitmap = [0u8; BLOCK_HEIGHT];
        for (row, byte) in bitmap.iter_mut().zip(&data[4..]) {
            *row = byte & FIELD_MASK;
        }
        Self {
            colour0: data[0] & 0x0F,
            colour1: data[1] & 0x0F,
            row: data[2] & 0x1F,
            column: data[3] & FIELD_MASK,
            bitmap,
            ignore: data[1] & TILE_BLOCK_IGNORE_BIT != 0,
        }
    }

    /// Unclamped pixel position of the block's top-left corner.
    pub fn origin(&self) -> (usize, usize) {
        (
            self.column as usize * BLOCK_WIDTH,
            self.row as usize * BLOCK_HEIGHT,
        )
    }

    /// Whether the pixel at (x, y) within the block is set.
    #[inline]
    pub fn bit(&self, x: usize, y: usize) -> bool {
        (self.bitmap[y] >> (BLOCK_WIDTH - 1 - x)) & 0x01 != 0
    }
}

/// One decoded graphics instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MemoryPreset {
        colour: u8,
        /// Nonzero on deliberate repeats of a preset
        repeat: u8,
    },
    BorderPreset {
        colour: u8,
    },
    TileBlock(TileBlock),
    TileBlockXor(TileBlock),
    ScrollPreset(ScrollParams),
    ScrollCopy(ScrollParams),
    DefineTransparent {
        colour: u8,
    },
    LoadColourTable {
        half: TableHalf,
        entries: [Rgb12; 8],
    },
    /// A graphics packet with an instruction code we do not know
    Unknown(u8),
}

impl Instruction {
    /// Decode a packet; `None` if it is not a graphics packet.
    pub fn decode(packet: &Packet) -> Option<Self> {
        if packet.command & FIELD_MASK != GRAPHICS_COMMAND {
            return None;
        }
        let data = &packet.data;

        let instruction = match packet.instruction & FIELD_MASK {
            INST_MEMORY_PRESET => Instruction::MemoryPreset {
                colour: data[0] & 0x0F,
                repeat: data[1] & 0x0F,
            },
            INST_BORDER_PRESET => Instruction::BorderPreset {
                colour: data[0] & 0x0F,
            },
            INST_TILE_BLOCK => Instruction::TileBlock(TileBlock::decode(data)),
            INST_TILE_BLOCK_XOR => Instruction::TileBlockXor(TileBlock::decode(data)),
            INST_SCROLL_PRESET => Instruction::ScrollPreset(decode_scroll(data)),
            INST_SCROLL_COPY => Instruction::ScrollCopy(decode_scroll(data)),
            INST_DEF_TRANSPARENT => Instruction::DefineTransparent {
                colour: data[0] & 0x0F,
            },
            INST_LOAD_TABLE_LOW => Instruction::LoadColourTable {
                half: TableHalf::Low,
                entries: decode_table(data),
            },
            INST_LOAD_TABLE_HIGH => Instruction::LoadColourTable {
                half: TableHalf::High,
                entries: decode_table(data),
            },
            other => Instruction::Unknown(other),
        };
        Some(instruction)
    }
}

fn decode_scroll(data: &[u8; 16]) -> ScrollParams {
    let h_scroll = data[1] & FIELD_MASK;
    let v_scroll = data[2] & FIELD_MASK;
    ScrollParams {
        colour: data[0] & 0x0F,
        h_code: ScrollCode::from_bits(h_scroll >> 4),
        h_offset: h_scroll & 0x07,
        v_code: ScrollCode::from_bits(v_scroll >> 4),
        v_offset: v_scroll & 0x0F,
    }
}

fn decode_table(data: &[u8; 16]) -> [Rgb12; 8] {
    let mut entries = [Rgb12::new(0, 0, 0); 8];
    for (entry, pair) in entries.iter_mut().zip(data.chunks_exact(2)) {
        *entry = Rgb12::from_data(pair[0], pair[1]);
    }
    entries
}
