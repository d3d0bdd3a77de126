//! CD+G karaoke graphics decoder.
//!
//! CD+G streams are a sequence of 24-byte subcode packets, 300 per second
//! of audio. Graphics packets paint a 300x216 plane of 4-bit palette
//! indices, of which the centre 288x192 is meant to be visible.
//!
//! # Architecture
//!
//! - **PacketCursor**: walks an in-memory stream in 24-byte steps
//! - **Instruction**: typed decode of one packet's opcode and fields
//! - **ColourTable**: 16-entry palette loaded in halves of 8
//! - **PixelPlane**: index grid plus a resolved-colour grid kept in sync
//! - **DirtyTiles**: which of the 6x4 visible tiles changed since last drain
//! - **ScrollShift**: persistent sub-block display offset
//! - **CdgDecoder**: ties the above together and exports tiles
//!
//! ```rust
//! use karaoke_cdg::CdgDecoder;
//! use karaoke_core::palette::Argb8888;
//!
//! let stream: Vec<u8> = Vec::new();
//! let mut decoder = CdgDecoder::new(stream, Argb8888);
//! while decoder.decode_n(10) {
//!     for tile in decoder.drain_dirty_tiles() {
//!         let _pixels = decoder.export_tile(tile.row, tile.col);
//!     }
//! }
//! ```

mod colour_table;
mod config;
mod decoder;
mod dirty;
mod error;
mod instruction;
mod packet;
mod plane;
mod scroll;

pub use colour_table::{ColourTable, Rgb12, TableHalf};
pub use config::{DecoderConfig, PresetPolicy, ScrollPolicy};
pub use decoder::{CdgDecoder, DecodeStats, Tile};
pub use dirty::{DirtyTiles, TileCoord};
pub use error::CdgError;
pub use instruction::{Instruction, TileBlock, GRAPHICS_COMMAND};
pub use packet::{Packet, PacketCursor};
pub use plane::PixelPlane;
pub use scroll::{ScrollCode, ScrollParams, ScrollShift};

/// Size of one subcode packet in bytes
pub const PACKET_SIZE: usize = 24;
/// Packets per second of audio
pub const PACKETS_PER_SECOND: usize = 300;

/// Full plane, border included
pub const FULL_WIDTH: usize = 300;
pub const FULL_HEIGHT: usize = 216;

/// Visible area, offset by the border from the plane origin
pub const DISPLAY_WIDTH: usize = 288;
pub const DISPLAY_HEIGHT: usize = 192;
pub const BORDER_LEFT: usize = 6;
pub const BORDER_TOP: usize = 12;

/// Unit drawn by one tile-block command
pub const BLOCK_WIDTH: usize = 6;
pub const BLOCK_HEIGHT: usize = 12;

/// Dirty-tracking and export grid over the visible area
pub const TILES_PER_ROW: usize = 6;
pub const TILES_PER_COL: usize = 4;
pub const TILE_WIDTH: usize = DISPLAY_WIDTH / TILES_PER_ROW;
pub const TILE_HEIGHT: usize = DISPLAY_HEIGHT / TILES_PER_COL;

pub const COLOUR_TABLE_SIZE: usize = 16;
