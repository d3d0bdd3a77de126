//! The CD+G decoder state machine.

use crate::colour_table::{ColourTable, Rgb12, TableHalf};
use crate::config::{DecoderConfig, PresetPolicy, ScrollPolicy};
use crate::dirty::{DirtyTiles, TileCoord};
use crate::error::CdgError;
use crate::instruction::{Instruction, TileBlock};
use crate::packet::{Packet, PacketCursor};
use crate::plane::PixelPlane;
use crate::scroll::{ScrollParams, ScrollShift};
use crate::{
    BLOCK_HEIGHT, BLOCK_WIDTH, BORDER_LEFT, BORDER_TOP, COLOUR_TABLE_SIZE, FULL_HEIGHT,
    FULL_WIDTH, PACKET_SIZE, TILES_PER_COL, TILES_PER_ROW, TILE_HEIGHT, TILE_WIDTH,
};
use karaoke_core::logging::{log, LogCategory, LogLevel};
use karaoke_core::palette::ColourMapper;
use karaoke_core::renderer::BlitTarget;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SNAPSHOT_VERSION: u32 = 1;

/// Counters for the oddities met while decoding. Reset on rewind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Every packet handed to the decoder
    pub packets: u64,
    /// Packets on other subcode channels
    pub ignored_packets: u64,
    pub unknown_instructions: u64,
    /// Tile blocks skipped because of the ignore bit
    pub voided_blocks: u64,
    /// Tile blocks whose position had to be pulled back inside the plane
    pub clamped_blocks: u64,
    /// Memory presets skipped as repeats of the last clear
    pub redundant_presets: u64,
}

/// One exported tile of resolved colours, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<C> {
    pub row: usize,
    pub col: usize,
    pub pixels: Vec<C>,
}

impl<C: Copy> Tile<C> {
    pub const WIDTH: usize = TILE_WIDTH;
    pub const HEIGHT: usize = TILE_HEIGHT;

    pub fn pixel(&self, x: usize, y: usize) -> C {
        self.pixels[y * TILE_WIDTH + x]
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    position: usize,
    palette: [Option<Rgb12>; COLOUR_TABLE_SIZE],
    indices: Vec<u8>,
    preset_index: Option<u8>,
    border_index: Option<u8>,
    transparent_index: Option<u8>,
    last_cleared: Option<u8>,
    shift: ScrollShift,
    dirty: u32,
    stats: DecodeStats,
}

/// Decodes a CD+G stream into a palette-indexed plane and hands out the
/// tiles that changed.
pub struct CdgDecoder<M: ColourMapper> {
    mapper: M,
    config: DecoderConfig,
    cursor: PacketCursor,
    table: ColourTable<M::Colour>,
    plane: PixelPlane<M::Colour>,
    dirty: DirtyTiles,
    shift: ScrollShift,
    preset_index: Option<u8>,
    border_index: Option<u8>,
    transparent_index: Option<u8>,
    /// Colour of the last memory preset, while nothing has been drawn since
    last_cleared: Option<u8>,
    stats: DecodeStats,
}

impl<M: ColourMapper> CdgDecoder<M> {
    pub fn new(data: impl Into<Vec<u8>>, mapper: M) -> Self {
        Self::with_config(data, mapper, DecoderConfig::default())
    }

    pub fn with_config(data: impl Into<Vec<u8>>, mapper: M, config: DecoderConfig) -> Self {
        let default = mapper.default_colour();
        Self {
            mapper,
            config,
            cursor: PacketCursor::new(data),
            table: ColourTable::new(default),
            plane: PixelPlane::new(default),
            dirty: DirtyTiles::new(),
            shift: ScrollShift::default(),
            preset_index: None,
            border_index: None,
            transparent_index: None,
            last_cleared: None,
            stats: DecodeStats::default(),
        }
    }

    /// Back to the first packet with all state as freshly constructed.
    /// The mapper and configuration are kept.
    pub fn rewind(&mut self) {
        log(LogCategory::Stream, LogLevel::Debug, || {
            format!("rewind from packet {}", self.cursor.position())
        });
        let default = self.mapper.default_colour();
        self.cursor.rewind();
        self.table = ColourTable::new(default);
        self.plane = PixelPlane::new(default);
        self.dirty = DirtyTiles::new();
        self.shift = ScrollShift::default();
        self.preset_index = None;
        self.border_index = None;
        self.transparent_index = None;
        self.last_cleared = None;
        self.stats = DecodeStats::default();
    }

    /// Decode up to `count` packets.
    ///
    /// Returns false only if the stream was already exhausted before the
    /// first packet of this call.
    pub fn decode_n(&mut self, count: usize) -> bool {
        for decoded in 0..count {
            let Some(raw) = self.cursor.next_packet() else {
                log(LogCategory::Stream, LogLevel::Debug, || {
                    format!("end of stream after {} packets", self.cursor.position())
                });
                return decoded != 0;
            };
            self.process_packet(&raw);
        }
        true
    }

    /// Decode forward (rewinding first if needed) until `packet` packets
    /// have been consumed or the stream ends. Returns the new position.
    pub fn seek(&mut self, packet: usize) -> usize {
        if packet < self.cursor.position() {
            self.rewind();
        }
        while self.cursor.position() < packet {
            match self.cursor.next_packet() {
                Some(raw) => self.process_packet(&raw),
                None => break,
            }
        }
        log(LogCategory::Stream, LogLevel::Debug, || {
            format!("seek to packet {} reached {}", packet, self.cursor.position())
        });
        self.cursor.position()
    }

    /// Decode and apply one raw packet. Never fails: packets for other
    /// subcode channels are dropped and unknown instructions are reported.
    pub fn process_packet(&mut self, raw: &[u8; PACKET_SIZE]) {
        self.stats.packets += 1;
        match Instruction::decode(&Packet::parse(raw)) {
            Some(instruction) => self.execute(instruction),
            None => self.stats.ignored_packets += 1,
        }
    }

    /// Apply one decoded instruction.
    pub fn execute(&mut self, instruction: Instruction) {
        log(LogCategory::Command, LogLevel::Trace, || {
            format!("packet {}: {:?}", self.cursor.position(), instruction)
        });
        match instruction {
            Instruction::MemoryPreset { colour, .. } => self.memory_preset(colour),
            Instruction::BorderPreset { colour } => self.border_preset(colour),
            Instruction::TileBlock(block) => self.tile_block(&block, false),
            Instruction::TileBlockXor(block) => self.tile_block(&block, true),
            Instruction::ScrollPreset(params) => self.scroll(&params, false),
            Instruction::ScrollCopy(params) => self.scroll(&params, true),
            Instruction::DefineTransparent { colour } => self.transparent_index = Some(colour),
            Instruction::LoadColourTable { half, entries } => {
                self.load_colour_table(half, &entries)
            }
            Instruction::Unknown(code) => {
                self.stats.unknown_instructions += 1;
                log(LogCategory::Corrupt, LogLevel::Warn, || {
                    format!("CD+G stream may be corrupt, instruction {}", code)
                });
            }
        }
    }

    fn memory_preset(&mut self, colour: u8) {
        // Discs repeat presets in case one is damaged; clearing again to the
        // same colour changes nothing.
        if self.last_cleared == Some(colour) {
            self.stats.redundant_presets += 1;
            return;
        }
        self.last_cleared = Some(colour);
        self.preset_index = Some(colour);
        let border = *self.border_index.get_or_insert(colour);

        match self.config.preset_policy {
            PresetPolicy::WholePlane => self.plane.fill(colour, &self.table),
            PresetPolicy::RegionLimited => self.paint_region_limited(border, colour),
        }
        self.dirty.mark_all();
    }

    fn border_preset(&mut self, colour: u8) {
        self.border_index = Some(colour);
        let preset = *self.preset_index.get_or_insert(colour);

        match self.config.preset_policy {
            PresetPolicy::WholePlane => self.plane.fill_border(colour, &self.table),
            PresetPolicy::RegionLimited => self.paint_region_limited(colour, preset),
        }
        self.last_cleared = None;
        self.dirty.mark_all();
    }

    /// Top and left bands in the border colour, everything else preset.
    fn paint_region_limited(&mut self, border: u8, preset: u8) {
        let table = &self.table;
        self.plane.fill(preset, table);
        self.plane.fill_rect(0, 0, FULL_WIDTH, BORDER_TOP, border, table);
        self.plane
            .fill_rect(0, BORDER_TOP, BORDER_LEFT, FULL_HEIGHT - BORDER_TOP, border, table);
    }

    fn tile_block(&mut self, block: &TileBlock, xor: bool) {
        if block.ignore && self.config.honour_ignore_bit {
            self.stats.voided_blocks += 1;
            log(LogCategory::Corrupt, LogLevel::Debug, || {
                format!("tile block at row {} column {} voided", block.row, block.column)
            });
            return;
        }

        let (raw_x, raw_y) = block.origin();
        let x = raw_x.min(FULL_WIDTH - BLOCK_WIDTH);
        let y = raw_y.min(FULL_HEIGHT - BLOCK_HEIGHT);
        if (x, y) != (raw_x, raw_y) {
            self.stats.clamped_blocks += 1;
            log(LogCategory::Corrupt, LogLevel::Debug, || {
                format!("tile block at ({}, {}) clamped to ({}, {})", raw_x, raw_y, x, y)
            });
        }

        self.mark_block_dirty(x, y);

        for dy in 0..BLOCK_HEIGHT {
            for dx in 0..BLOCK_WIDTH {
                let colour = if block.bit(dx, dy) {
                    block.colour1
                } else {
                    block.colour0
                };
                let index = if xor {
                    self.plane.index(x + dx, y + dy) ^ colour
                } else {
                    colour
                };
                self.plane.set(x + dx, y + dy, index, &self.table);
            }
        }

        self.last_cleared = None;
    }

    /// Mark every tile whose on-screen rectangle overlaps the block at (x, y).
    fn mark_block_dirty(&mut self, x: usize, y: usize) {
        // `first` is the block's leading edge in visible-area pixels, which is
        // negative for blocks in the left or top border
        let span = |first: i32, block: usize, tile: usize, count: usize| {
            let last = first + block as i32 - 1;
            let first = first.div_euclid(tile as i32).max(0);
            let last = last.div_euclid(tile as i32).min(count as i32 - 1);
            first..=last
        };
        let left = x as i32 - BORDER_LEFT as i32 - self.shift.horizontal as i32;
        let top = y as i32 - BORDER_TOP as i32 - self.shift.vertical as i32;
        let cols = span(left, BLOCK_WIDTH, TILE_WIDTH, TILES_PER_ROW);
        let rows = span(top, BLOCK_HEIGHT, TILE_HEIGHT, TILES_PER_COL);

        for row in rows {
            for col in cols.clone() {
                self.dirty.mark(row as usize, col as usize);
            }
        }
    }

    fn scroll(&mut self, params: &ScrollParams, copy: bool) {
        let policy = self.config.scroll_policy;
        if policy == ScrollPolicy::Shifted {
            let shift = params.shift();
            if shift != self.shift {
                log(LogCategory::Scroll, LogLevel::Debug, || {
                    format!("screen shift {:?} -> {:?}", self.shift, shift)
                });
                self.shift = shift;
                self.dirty.mark_all();
            }
        }

        let (dx, dy) = params.displacement(policy);
        if dx == 0 && dy == 0 {
            return;
        }
        log(LogCategory::Scroll, LogLevel::Debug, || {
            format!(
                "scroll {} by ({}, {})",
                if copy { "copy" } else { "preset" },
                dx,
                dy
            )
        });

        let fill = if copy { None } else { Some(params.colour) };
        self.plane.rotate(dx, dy, fill);
        self.plane.refresh(&self.table);
        self.last_cleared = None;
        self.dirty.mark_all();
    }

    fn load_colour_table(&mut self, half: TableHalf, entries: &[Rgb12; 8]) {
        log(LogCategory::Palette, LogLevel::Debug, || {
            format!("load colour table {:?}: {:03X?}", half, entries.map(Rgb12::value))
        });
        self.table.load_half(half, entries, &self.mapper);
        // Presets may have run before any table load; their pixels only get
        // real colours now.
        self.plane.refresh(&self.table);
        self.dirty.mark_all();
    }

    /// Return the tiles changed since the last drain and clear the set.
    pub fn drain_dirty_tiles(&mut self) -> Vec<TileCoord> {
        let tiles = self.dirty.drain();
        log(LogCategory::Tiles, LogLevel::Trace, || {
            format!("{} dirty tiles drained", tiles.len())
        });
        tiles
    }

    /// Make the next drain return every tile.
    pub fn mark_tiles_dirty(&mut self) {
        self.dirty.mark_all();
    }

    /// Top-left plane pixel shown at the top-left of tile (row, col).
    fn tile_origin(&self, row: usize, col: usize) -> (usize, usize) {
        (
            BORDER_LEFT + self.shift.horizontal as usize + col * TILE_WIDTH,
            BORDER_TOP + self.shift.vertical as usize + row * TILE_HEIGHT,
        )
    }

    /// Resolved colours of tile (row, col), as currently shifted on screen.
    pub fn export_tile(&self, row: usize, col: usize) -> Result<Tile<M::Colour>, CdgError> {
        let mut pixels = Vec::with_capacity(TILE_WIDTH * TILE_HEIGHT);
        self.export_tile_into(row, col, &mut pixels)?;
        Ok(Tile { row, col, pixels })
    }

    /// Like [`export_tile`](Self::export_tile), reusing `out`.
    pub fn export_tile_into(
        &self,
        row: usize,
        col: usize,
        out: &mut Vec<M::Colour>,
    ) -> Result<(), CdgError> {
        if row >= TILES_PER_COL || col >= TILES_PER_ROW {
            return Err(CdgError::TileOutOfRange { row, col });
        }
        let (x, y) = self.tile_origin(row, col);
        self.plane.copy_colours(x, y, TILE_WIDTH, TILE_HEIGHT, out);
        Ok(())
    }

    /// Drain the dirty set and blit each dirty tile to its place in a
    /// 288x192 target. Returns the number of tiles written.
    pub fn blit_dirty<T: BlitTarget<M::Colour>>(&mut self, target: &mut T) -> usize {
        let tiles = self.dirty.drain();
        let mut pixels = Vec::with_capacity(TILE_WIDTH * TILE_HEIGHT);
        for tile in &tiles {
            let (x, y) = self.tile_origin(tile.row, tile.col);
            self.plane.copy_colours(x, y, TILE_WIDTH, TILE_HEIGHT, &mut pixels);
            target.blit(
                tile.col * TILE_WIDTH,
                tile.row * TILE_HEIGHT,
                TILE_WIDTH,
                TILE_HEIGHT,
                &pixels,
            );
        }
        tiles.len()
    }

    /// Resolved border colour; `None` until a preset has set it.
    pub fn border_colour(&self) -> Option<M::Colour> {
        self.border_index.map(|index| self.table.get(index))
    }

    pub fn border_colour_index(&self) -> Option<u8> {
        self.border_index
    }

    pub fn preset_colour_index(&self) -> Option<u8> {
        self.preset_index
    }

    /// Recorded only; compositing is up to the host.
    pub fn transparent_colour_index(&self) -> Option<u8> {
        self.transparent_index
    }

    pub fn scroll_shift(&self) -> ScrollShift {
        self.shift
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn colour_table(&self) -> &ColourTable<M::Colour> {
        &self.table
    }

    pub fn plane(&self) -> &PixelPlane<M::Colour> {
        &self.plane
    }

    /// Packets consumed so far.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Complete packets in the stream.
    pub fn packet_count(&self) -> usize {
        self.cursor.len()
    }

    pub fn remaining_packets(&self) -> usize {
        self.cursor.remaining()
    }

    /// Snapshot of everything but the stream bytes and resolved colours.
    pub fn save_state(&self) -> Result<Value, CdgError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            position: self.cursor.position(),
            palette: *self.table.sources(),
            indices: self.plane.indices().to_vec(),
            preset_index: self.preset_index,
            border_index: self.border_index,
            transparent_index: self.transparent_index,
            last_cleared: self.last_cleared,
            shift: self.shift,
            dirty: self.dirty.bits(),
            stats: self.stats,
        };
        Ok(serde_json::to_value(snapshot)?)
    }

    /// Restore a snapshot taken from a decoder over the same stream.
    /// Colours are re-resolved through this decoder's mapper. On error the
    /// decoder is left untouched.
    pub fn load_state(&mut self, state: &Value) -> Result<(), CdgError> {
        let snapshot = Snapshot::deserialize(state)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CdgError::InvalidState(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        if snapshot.indices.len() != FULL_WIDTH * FULL_HEIGHT {
            return Err(CdgError::InvalidState(format!(
                "expected {} pixel indices, found {}",
                FULL_WIDTH * FULL_HEIGHT,
                snapshot.indices.len()
            )));
        }
        let indices_in_range = snapshot
            .indices
            .iter()
            .chain(snapshot.preset_index.iter())
            .chain(snapshot.border_index.iter())
            .chain(snapshot.transparent_index.iter())
            .chain(snapshot.last_cleared.iter())
            .all(|&index| (index as usize) < COLOUR_TABLE_SIZE);
        if !indices_in_range {
            return Err(CdgError::InvalidState(
                "colour index out of range".to_string(),
            ));
        }
        if !snapshot.shift.is_valid() {
            return Err(CdgError::InvalidState(format!(
                "screen shift {:?} out of range",
                snapshot.shift
            )));
        }
        if snapshot.position > self.cursor.len() {
            return Err(CdgError::InvalidState(format!(
                "position {} is past the end of a {} packet stream",
                snapshot.position,
                self.cursor.len()
            )));
        }

        self.cursor.set_position(snapshot.position);
        self.table.restore(&snapshot.palette, &self.mapper);
        self.plane.restore(&snapshot.indices, &self.table);
        self.preset_index = snapshot.preset_index;
        self.border_index = snapshot.border_index;
        self.transparent_index = snapshot.transparent_index;
        self.last_cleared = snapshot.last_cleared;
        self.shift = snapshot.shift;
        self.dirty = DirtyTiles::from_bits(snapshot.dirty);
        self.stats = snapshot.stats;
        log(LogCategory::Stream, LogLevel::Debug, || {
            format!("state restored at packet {}", snapshot.position)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::GRAPHICS_COMMAND;
    use karaoke_core::palette::Argb8888;

    const BLACK: u32 = 0xFF000000;
    const WHITE: u32 = 0xFFFFFFFF;
    const RED: u32 = 0xFFFF0000;

    fn packet(instruction: u8, data: &[u8]) -> [u8; PACKET_SIZE] {
        let mut raw = [0u8; PACKET_SIZE];
        raw[0] = GRAPHICS_COMMAND;
        raw[1] = instruction;
        raw[4..4 + data.len()].copy_from_slice(data);
        raw
    }

    fn memory_preset(colour: u8) -> [u8; PACKET_SIZE] {
        packet(1, &[colour])
    }

    fn border_preset(colour: u8) -> [u8; PACKET_SIZE] {
        packet(2, &[colour])
    }

    fn tile_block(
        xor: bool,
        colour0: u8,
        colour1: u8,
        row: u8,
        column: u8,
        bitmap: [u8; 12],
    ) -> [u8; PACKET_SIZE] {
        let mut data = vec![colour0, colour1, row, column];
        data.extend_from_slice(&bitmap);
        packet(if xor { 38 } else { 6 }, &data)
    }

    fn scroll(copy: bool, colour: u8, h: u8, v: u8) -> [u8; PACKET_SIZE] {
        packet(if copy { 24 } else { 20 }, &[colour, h, v])
    }

    fn load_low(colours: &[Rgb12]) -> [u8; PACKET_SIZE] {
        let data: Vec<u8> = colours.iter().flat_map(|c| c.to_data()).collect();
        packet(30, &data)
    }

    fn decoder() -> CdgDecoder<Argb8888> {
        CdgDecoder::new(Vec::new(), Argb8888)
    }

    fn black_and_white() -> CdgDecoder<Argb8888> {
        let mut decoder = decoder();
        decoder.process_packet(&load_low(&[Rgb12::new(0, 0, 0), Rgb12::new(0xF, 0xF, 0xF)]));
        decoder
    }

    fn assert_in_sync(decoder: &CdgDecoder<Argb8888>) {
        let plane = decoder.plane();
        let table = decoder.colour_table();
        assert!(plane
            .indices()
            .iter()
            .zip(plane.colours())
            .all(|(&index, &colour)| colour == table.get(index)));
    }

    #[test]
    fn test_fresh_decoder() {
        let mut decoder = decoder();
        assert_eq!(decoder.border_colour(), None);
        assert_eq!(decoder.transparent_colour_index(), None);
        assert_eq!(decoder.scroll_shift(), ScrollShift::default());
        assert_eq!(decoder.drain_dirty_tiles().len(), 24);
        assert!(!decoder.decode_n(1));
    }

    #[test]
    fn test_non_graphics_packets_are_ignored() {
        let mut decoder = decoder();
        decoder.drain_dirty_tiles();

        let mut raw = memory_preset(3);
        raw[0] = 0x0A;
        decoder.process_packet(&raw);

        assert_eq!(decoder.preset_colour_index(), None);
        assert!(decoder.drain_dirty_tiles().is_empty());
        assert_eq!(decoder.stats().ignored_packets, 1);
    }

    #[test]
    fn test_unknown_instruction_is_counted() {
        let mut decoder = decoder();
        decoder.process_packet(&packet(0x3F, &[]));
        decoder.process_packet(&packet(3, &[]));
        assert_eq!(decoder.stats().unknown_instructions, 2);
        assert_eq!(decoder.stats().packets, 2);
    }

    #[test]
    fn test_memory_preset_sets_border_once() {
        let mut decoder = black_and_white();
        decoder.process_packet(&memory_preset(1));
        assert_eq!(decoder.preset_colour_index(), Some(1));
        assert_eq!(decoder.border_colour_index(), Some(1));
        assert_eq!(decoder.border_colour(), Some(WHITE));

        decoder.process_packet(&memory_preset(0));
        assert_eq!(decoder.preset_colour_index(), Some(0));
        assert_eq!(decoder.border_colour_index(), Some(1));
        assert!(decoder.plane().indices().iter().all(|&i| i == 0));
    }

    #[test]
    fn test_repeated_memory_preset_is_skipped() {
        let mut decoder = black_and_white();
        decoder.process_packet(&memory_preset(1));
        decoder.drain_dirty_tiles();

        decoder.process_packet(&memory_preset(1));
        assert!(decoder.drain_dirty_tiles().is_empty());
        assert_eq!(decoder.stats().redundant_presets, 1);

        // Drawing something makes the next clear count again
        decoder.process_packet(&tile_block(false, 0, 0, 1, 1, [0; 12]));
        decoder.drain_dirty_tiles();
        decoder.process_packet(&memory_preset(1));
        assert_eq!(decoder.drain_dirty_tiles().len(), 24);
        assert!(decoder.plane().indices().iter().all(|&i| i == 1));
    }

    #[test]
    fn test_border_preset() {
        let mut decoder = black_and_white();
        decoder.process_packet(&memory_preset(0));
        decoder.drain_dirty_tiles();
        decoder.process_packet(&border_preset(1));

        let plane = decoder.plane();
        assert_eq!(plane.colour(0, 0), WHITE);
        assert_eq!(plane.colour(299, 100), WHITE);
        assert_eq!(plane.colour(100, 210), WHITE);
        assert_eq!(plane.colour(6, 12), BLACK);
        assert_eq!(decoder.border_colour(), Some(WHITE));
        assert_eq!(decoder.drain_dirty_tiles().len(), 24);
    }

    #[test]
    fn test_border_preset_before_memory_preset_sets_preset_index() {
        let mut decoder = decoder();
        decoder.process_packet(&border_preset(4));
        assert_eq!(decoder.preset_colour_index(), Some(4));
        assert_eq!(decoder.border_colour_index(), Some(4));
    }

    #[test]
    fn test_region_limited_presets() {
        let config = DecoderConfig {
            preset_policy: PresetPolicy::RegionLimited,
            ..DecoderConfig::default()
        };
        let mut decoder = CdgDecoder::with_config(Vec::new(), Argb8888, config);
        decoder.process_packet(&border_preset(2));
        decoder.process_packet(&memory_preset(5));

        let plane = decoder.plane();
        assert_eq!(plane.index(100, 5), 2);
        assert_eq!(plane.index(3, 100), 2);
        assert_eq!(plane.index(6, 12), 5);
        // The older layout has no right or bottom band
        assert_eq!(plane.index(299, 215), 5);
    }

    #[test]
    fn test_tile_block_writes_bitmap() {
        let mut decoder = black_and_white();
        let mut bitmap = [0u8; 12];
        bitmap[0] = 0b100001;
        // Block row 1, column 1 is the first visible block
        decoder.process_packet(&tile_block(false, 0, 1, 1, 1, bitmap));

        let plane = decoder.plane();
        assert_eq!(plane.index(6, 12), 1);
        assert_eq!(plane.index(7, 12), 0);
        assert_eq!(plane.index(11, 12), 1);
        assert_eq!(plane.index(6, 13), 0);
        assert_eq!(plane.colour(6, 12), WHITE);
        assert_in_sync(&decoder);
    }

    #[test]
    fn test_tile_block_marks_overlapping_tiles() {
        let mut decoder = black_and_white();
        decoder.drain_dirty_tiles();

        // x = 48 * 6 = 288 -> visible x 282..287, last tile column
        decoder.process_packet(&tile_block(false, 1, 1, 1, 48, [0; 12]));
        assert_eq!(decoder.drain_dirty_tiles(), vec![TileCoord::new(0, 5)]);

        // x = 9 * 6 = 54 -> visible x 48..53, y = 5 * 12 = 60 -> visible y 48..59
        decoder.process_packet(&tile_block(false, 1, 1, 5, 9, [0; 12]));
        assert_eq!(decoder.drain_dirty_tiles(), vec![TileCoord::new(1, 1)]);

        // Entirely in the top-left border: no visible tile changes
        decoder.process_packet(&tile_block(false, 1, 1, 0, 0, [0; 12]));
        assert!(decoder.drain_dirty_tiles().is_empty());
    }

    #[test]
    fn test_tile_block_straddling_tiles_under_shift() {
        let mut decoder = black_and_white();
        // Shift right by 3 and down by 0, no block scroll
        decoder.process_packet(&scroll(true, 0, 0x03, 0x00));
        decoder.drain_dirty_tiles();

        // x = 9 * 6 = 54; shifted visible x 45..50 spans tile columns 0 and 1
        decoder.process_packet(&tile_block(false, 1, 1, 1, 9, [0; 12]));
        assert_eq!(
            decoder.drain_dirty_tiles(),
            vec![TileCoord::new(0, 0), TileCoord::new(0, 1)]
        );
    }

    #[test]
    fn test_tile_block_coordinates_are_clamped() {
        let mut decoder = black_and_white();
        // Row 31 and column 63 are far outside the plane
        decoder.process_packet(&tile_block(false, 1, 1, 31, 63, [0; 12]));

        assert_eq!(decoder.stats().clamped_blocks, 1);
        let plane = decoder.plane();
        assert_eq!(plane.index(299, 215), 1);
        assert_eq!(plane.index(294, 204), 1);
        assert_eq!(plane.index(293, 204), 0);
    }

    #[test]
    fn test_ignore_bit() {
        let mut decoder = black_and_white();
        decoder.process_packet(&tile_block(false, 1, 0x21, 1, 1, [0; 12]));
        assert_eq!(decoder.plane().index(6, 12), 0);
        assert_eq!(decoder.stats().voided_blocks, 1);

        let config = DecoderConfig {
            honour_ignore_bit: false,
            ..DecoderConfig::default()
        };
        let mut decoder = CdgDecoder::with_config(Vec::new(), Argb8888, config);
        decoder.process_packet(&tile_block(false, 1, 0x21, 1, 1, [0; 12]));
        assert_eq!(decoder.plane().index(6, 12), 1);
    }

    #[test]
    fn test_xor_block_twice_restores() {
        let mut decoder = black_and_white();
        decoder.process_packet(&tile_block(false, 2, 7, 3, 4, [0b101010; 12]));
        let before = decoder.plane().indices().to_vec();

        let xor = tile_block(true, 5, 9, 3, 4, [0b110011; 12]);
        decoder.process_packet(&xor);
        assert_ne!(decoder.plane().indices(), &before[..]);
        decoder.process_packet(&xor);
        assert_eq!(decoder.plane().indices(), &before[..]);
    }

    #[test]
    fn test_load_table_recolours_existing_pixels() {
        let mut decoder = decoder();
        decoder.process_packet(&memory_preset(1));
        assert_eq!(decoder.plane().colour(100, 100), BLACK);

        decoder.process_packet(&load_low(&[Rgb12::new(0, 0, 0), Rgb12::new(0xF, 0, 0)]));
        assert_eq!(decoder.plane().colour(100, 100), RED);
        assert_in_sync(&decoder);
    }

    #[test]
    fn test_define_transparent() {
        let mut decoder = decoder();
        decoder.process_packet(&packet(28, &[0x0B]));
        assert_eq!(decoder.transparent_colour_index(), Some(11));
    }

    #[test]
    fn test_scroll_shift_marks_dirty_without_moving_pixels() {
        let mut decoder = black_and_white();
        decoder.process_packet(&tile_block(false, 0, 1, 1, 1, [0x3F; 12]));
        let before = decoder.plane().indices().to_vec();
        decoder.drain_dirty_tiles();

        decoder.process_packet(&scroll(true, 0, 0x05, 0x0F));
        assert_eq!(
            decoder.scroll_shift(),
            ScrollShift {
                horizontal: 5,
                vertical: 11
            }
        );
        assert_eq!(decoder.plane().indices(), &before[..]);
        assert_eq!(decoder.drain_dirty_tiles().len(), 24);

        // Same shift again: nothing to repaint
        decoder.process_packet(&scroll(true, 0, 0x05, 0x0B));
        assert!(decoder.drain_dirty_tiles().is_empty());
    }

    #[test]
    fn test_export_follows_shift() {
        let mut decoder = black_and_white();
        decoder.process_packet(&tile_block(false, 0, 1, 1, 1, [0b100000; 12]));

        let tile = decoder.export_tile(0, 0).unwrap();
        assert_eq!(tile.pixel(0, 0), WHITE);
        assert_eq!(tile.pixel(1, 0), BLACK);

        // Shift one pixel right: the window starts one pixel later
        decoder.process_packet(&scroll(true, 0, 0x01, 0x00));
        let tile = decoder.export_tile(0, 0).unwrap();
        assert_eq!(tile.pixel(0, 0), BLACK);
    }

    #[test]
    fn test_scroll_copy_round_trip() {
        let mut decoder = black_and_white();
        decoder.process_packet(&tile_block(false, 0, 1, 2, 3, [0b011010; 12]));
        let before = decoder.plane().indices().to_vec();

        // Right and down, then left and up
        decoder.process_packet(&scroll(true, 0, 0x10, 0x10));
        assert_ne!(decoder.plane().indices(), &before[..]);
        decoder.process_packet(&scroll(true, 0, 0x20, 0x20));
        assert_eq!(decoder.plane().indices(), &before[..]);
        assert_in_sync(&decoder);
    }

    #[test]
    fn test_scroll_preset_fills_new_band() {
        let mut decoder = black_and_white();
        decoder.process_packet(&memory_preset(0));
        // Scroll up one block, filling with white
        decoder.process_packet(&scroll(false, 1, 0x00, 0x20));

        let plane = decoder.plane();
        assert_eq!(plane.index(100, 203), 0);
        assert_eq!(plane.index(100, 204), 1);
        assert_eq!(plane.colour(100, 215), WHITE);
        assert_in_sync(&decoder);
    }

    #[test]
    fn test_coarse_scroll_uses_offset_as_distance() {
        let config = DecoderConfig {
            scroll_policy: ScrollPolicy::Coarse,
            ..DecoderConfig::default()
        };
        let mut decoder = CdgDecoder::with_config(Vec::new(), Argb8888, config);
        let mut bitmap = [0u8; 12];
        bitmap[0] = 0b100000;
        decoder.process_packet(&tile_block(false, 0, 1, 1, 1, bitmap));
        // Down by 3 pixels
        decoder.process_packet(&scroll(true, 0, 0x00, 0x13));

        assert_eq!(decoder.scroll_shift(), ScrollShift::default());
        assert_eq!(decoder.plane().index(6, 15), 1);
        assert_eq!(decoder.plane().index(6, 12), 0);
    }

    #[test]
    fn test_export_tile_out_of_range() {
        let decoder = decoder();
        assert!(matches!(
            decoder.export_tile(4, 0),
            Err(CdgError::TileOutOfRange { row: 4, col: 0 })
        ));
        assert!(decoder.export_tile(0, 6).is_err());
        assert!(decoder.export_tile(3, 5).is_ok());
    }

    #[test]
    fn test_decode_n_and_rewind() {
        let stream: Vec<u8> = [memory_preset(1), packet(28, &[2]), memory_preset(3)].concat();
        let mut decoder = CdgDecoder::new(stream, Argb8888);

        assert!(decoder.decode_n(2));
        assert_eq!(decoder.position(), 2);
        // One packet left: partial progress still counts
        assert!(decoder.decode_n(5));
        assert_eq!(decoder.preset_colour_index(), Some(3));
        assert!(!decoder.decode_n(1));

        decoder.rewind();
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.preset_colour_index(), None);
        assert_eq!(decoder.transparent_colour_index(), None);
        assert_eq!(decoder.stats(), DecodeStats::default());
        assert_eq!(decoder.drain_dirty_tiles().len(), 24);
        assert!(decoder.decode_n(3));
    }

    #[test]
    fn test_seek() {
        let stream: Vec<u8> = (0..4u8).flat_map(|c| packet(28, &[c])).collect();
        let mut decoder = CdgDecoder::new(stream, Argb8888);

        assert_eq!(decoder.seek(3), 3);
        assert_eq!(decoder.transparent_colour_index(), Some(2));
        assert_eq!(decoder.seek(1), 1);
        assert_eq!(decoder.transparent_colour_index(), Some(0));
        assert_eq!(decoder.seek(100), 4);
    }

    #[test]
    fn test_blit_dirty_into_frame() {
        use karaoke_core::types::Frame;

        let mut decoder = black_and_white();
        decoder.process_packet(&memory_preset(1));
        let mut frame = Frame::new(288, 192);

        assert_eq!(decoder.blit_dirty(&mut frame), 24);
        assert!(frame.pixels.iter().all(|&p| p == WHITE));
        assert_eq!(decoder.blit_dirty(&mut frame), 0);
    }

    #[test]
    fn test_save_and_load_state() {
        let stream: Vec<u8> = [
            load_low(&[Rgb12::new(0, 0, 0), Rgb12::new(0xF, 0, 0)]),
            memory_preset(0),
            tile_block(false, 0, 1, 2, 2, [0x3F; 12]),
            scroll(true, 0, 0x02, 0x04),
        ]
        .concat();
        let mut decoder = CdgDecoder::new(stream.clone(), Argb8888);
        decoder.decode_n(4);
        let state = decoder.save_state().unwrap();

        let mut restored = CdgDecoder::new(stream, Argb8888);
        restored.load_state(&state).unwrap();

        assert_eq!(restored.position(), 4);
        assert_eq!(restored.plane().indices(), decoder.plane().indices());
        assert_eq!(restored.plane().colours(), decoder.plane().colours());
        assert_eq!(restored.scroll_shift(), decoder.scroll_shift());
        assert_eq!(restored.stats(), decoder.stats());
        assert_eq!(restored.colour_table().get(1), RED);
        assert_eq!(restored.colour_table().source(8), None);
    }

    #[test]
    fn test_load_state_rejects_bad_snapshots() {
        let decoder = decoder();
        let state = decoder.save_state().unwrap();

        let mut target = CdgDecoder::new(Vec::new(), Argb8888);

        let mut bad = state.clone();
        bad["indices"] = serde_json::json!([0, 1, 2]);
        assert!(matches!(target.load_state(&bad), Err(CdgError::InvalidState(_))));

        let mut bad = state.clone();
        bad["position"] = serde_json::json!(10);
        assert!(matches!(target.load_state(&bad), Err(CdgError::InvalidState(_))));

        let mut bad = state.clone();
        bad["border_index"] = serde_json::json!(16);
        assert!(matches!(target.load_state(&bad), Err(CdgError::InvalidState(_))));

        let mut bad = state;
        bad["version"] = serde_json::json!(99);
        assert!(matches!(target.load_state(&bad), Err(CdgError::InvalidState(_))));

        assert!(matches!(
            target.load_state(&serde_json::json!({ "version": 1 })),
            Err(CdgError::Serialization(_))
        ));
    }
}
