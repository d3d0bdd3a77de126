//! Colour resolution for indexed palettes.
//!
//! Decoders store palette entries as 8-bit RGB triples and resolve them
//! through a [`ColourMapper`] into whatever pixel value the host blits.
//! The mapper is the only place that knows the host's pixel encoding.

use crate::graphics::ColorOps;
use std::fmt::Debug;

/// Maps 8-bit RGB components to a host colour value.
pub trait ColourMapper {
    /// The resolved colour. Opaque to decoders beyond copying and comparing.
    type Colour: Copy + PartialEq + Debug;

    fn map_rgb(&self, r: u8, g: u8, b: u8) -> Self::Colour;

    /// Colour of palette entries that the stream has not loaded yet.
    fn default_colour(&self) -> Self::Colour {
        self.map_rgb(0, 0, 0)
    }
}

impl<F, C> ColourMapper for F
where
    F: Fn(u8, u8, u8) -> C,
    C: Copy + PartialEq + Debug,
{
    type Colour = C;

    fn map_rgb(&self, r: u8, g: u8, b: u8) -> C {
        self(r, g, b)
    }
}

/// Opaque ARGB8888 (0xFFRRGGBB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Argb8888;

impl ColourMapper for Argb8888 {
    type Colour = u32;

    fn map_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        ColorOps::from_rgb(r, g, b)
    }
}

/// 16-bit RGB565.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb565;

impl ColourMapper for Rgb565 {
    type Colour = u16;

    fn map_rgb(&self, r: u8, g: u8, b: u8) -> u16 {
        ColorOps::to_rgb565(r, g, b)
    }
}

/// 8-bit RGB332.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb332;

impl ColourMapper for Rgb332 {
    type Colour = u8;

    fn map_rgb(&self, r: u8, g: u8, b: u8) -> u8 {
        ColorOps::to_rgb332(r, g, b)
    }
}
