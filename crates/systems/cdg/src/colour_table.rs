//! The 16-entry colour table.

use crate::packet::FIELD_MASK;
use crate::COLOUR_TABLE_SIZE;
use karaoke_core::graphics::ColorOps;
use karaoke_core::palette::ColourMapper;
use serde::{Deserialize, Serialize};

/// A 12-bit colour, 4 bits per channel, packed as 0x0RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb12(u16);

impl Rgb12 {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self((((red & 0xF) as u16) << 8) | (((green & 0xF) as u16) << 4) | (blue & 0xF) as u16)
    }

    /// Decode one colour table entry from its two data bytes.
    ///
    /// Only the low 6 bits of each byte count: `--RRRRGG` `--GGBBBB`.
    pub fn from_data(high: u8, low: u8) -> Self {
        let high = (high & FIELD_MASK) as u16;
        let low = (low & FIELD_MASK) as u16;
        Self((high << 6) | low)
    }

    /// The two data bytes that encode this colour.
    pub fn to_data(self) -> [u8; 2] {
        [((self.0 >> 6) & 0x3F) as u8, (self.0 & 0x3F) as u8]
    }

    pub fn red(self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    pub fn green(self) -> u8 {
        ((self.0 >> 4) & 0xF) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Resolve through `mapper`, scaling each channel to 8 bits.
    pub fn resolve<M: ColourMapper>(self, mapper: &M) -> M::Colour {
        mapper.map_rgb(
            ColorOps::expand_nibble(self.red()),
            ColorOps::expand_nibble(self.green()),
            ColorOps::expand_nibble(self.blue()),
        )
    }
}

/// Which half of the table a load instruction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableHalf {
    /// Entries 0-7
    Low,
    /// Entries 8-15
    High,
}

impl TableHalf {
    pub fn first_index(self) -> usize {
        match self {
            TableHalf::Low => 0,
            TableHalf::High => 8,
        }
    }
}

/// Palette of resolved colours, with the 12-bit source of each entry kept
/// so the table can be re-resolved after a snapshot restore.
#[derive(Debug, Clone)]
pub struct ColourTable<C> {
    colours: [C; COLOUR_TABLE_SIZE],
    sources: [Option<Rgb12>; COLOUR_TABLE_SIZE],
}

impl<C: Copy> ColourTable<C> {
    /// Every entry set to `default` and marked as never loaded.
    pub fn new(default: C) -> Self {
        Self {
            colours: [default; COLOUR_TABLE_SIZE],
            sources: [None; COLOUR_TABLE_SIZE],
        }
    }

    /// Resolved colour of `index`; only the low 4 bits are used.
    #[inline]
    pub fn get(&self, index: u8) -> C {
        self.colours[(index & 0x0F) as usize]
    }

    /// The 12-bit colour last loaded into `index`, if any.
    pub fn source(&self, index: u8) -> Option<Rgb12> {
        self.sources[(index & 0x0F) as usize]
    }

    pub fn sources(&self) -> &[Option<Rgb12>; COLOUR_TABLE_SIZE] {
        &self.sources
    }

    pub fn load_half<M>(&mut self, half: TableHalf, entries: &[Rgb12; 8], mapper: &M)
    where
        M: ColourMapper<Colour = C>,
    {
        let start = half.first_index();
        for (offset, &entry) in entries.iter().enumerate() {
            self.colours[start + offset] = entry.resolve(mapper);
            self.sources[start + offset] = Some(entry);
        }
    }

    /// Rebuild from 12-bit sources; unloaded entries take the mapper default.
    pub fn restore<M>(&mut self, sources: &[Option<Rgb12>; COLOUR_TABLE_SIZE], mapper: &M)
    where
        M: ColourMapper<Colour = C>,
    {
        for (index, source) in sources.iter().enumerate() {
            self.colours[index] = match source {
                Some(rgb) => rgb.resolve(mapper),
                None => mapper.default_colour(),
            };
        }
        self.sources = *sources;
    }
}
