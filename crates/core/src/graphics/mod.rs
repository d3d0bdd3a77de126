//! Colour arithmetic shared by mappers and blit targets.

pub mod color;

pub use color::ColorOps;
