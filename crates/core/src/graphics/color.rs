//! Colour packing helpers.
//!
//! Stream formats carry colours as 4-bit channels; hosts want them packed
//! into 32-, 16- or 8-bit pixels. 32-bit colours are ARGB8888 (0xAARRGGBB).

/// Colour operation utilities
pub struct ColorOps;

impl ColorOps {
    /// Expand a 4-bit channel to 8 bits (0x0 -> 0x00, 0xF -> 0xFF).
    #[inline]
    pub fn expand_nibble(nibble: u8) -> u8 {
        (nibble & 0x0F) * 17
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Pack to RGB565, truncating the low bits of each channel.
    #[inline]
    pub fn to_rgb565(r: u8, g: u8, b: u8) -> u16 {
        (((r as u16) >> 3) << 11) | (((g as u16) >> 2) << 5) | ((b as u16) >> 3)
    }

    /// Pack to RGB332, truncating the low bits of each channel.
    #[inline]
    pub fn to_rgb332(r: u8, g: u8, b: u8) -> u8 {
        (r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6)
    }
}
