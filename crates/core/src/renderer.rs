//! Blit targets for exported tiles.
//!
//! Decoders hand out rectangular blocks of resolved colours; a
//! [`BlitTarget`] copies them into host-owned pixel storage. Two targets
//! are provided:
//!
//! - [`Frame`]: a plain 32-bit pixel buffer.
//! - [`Surface`]: a pitched byte buffer with 1, 2 or 4 bytes per pixel,
//!   the layout SDL-style surfaces use.

use crate::logging::{log, LogCategory, LogLevel};
use crate::types::Frame;
use thiserror::Error;

/// Surface construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlitError {
    #[error("unsupported pixel depth: {0} bytes per pixel")]
    UnsupportedDepth(usize),
    #[error("pitch {pitch} is too small for {width} pixels of {bytes_per_pixel} bytes")]
    PitchTooSmall {
        pitch: usize,
        width: usize,
        bytes_per_pixel: usize,
    },
}

/// Something a block of colours can be copied into.
pub trait BlitTarget<C> {
    /// Copy a `width` x `height` row-major block with its top-left corner at
    /// (x, y). Pixels falling outside the target are clipped.
    fn blit(&mut self, x: usize, y: usize, width: usize, height: usize, pixels: &[C]);
}

impl BlitTarget<u32> for Frame {
    fn blit(&mut self, x: usize, y: usize, width: usize, height: usize, pixels: &[u32]) {
        let frame_width = self.width as usize;
        let frame_height = self.height as usize;
        if width == 0 || x >= frame_width || y >= frame_height {
            return;
        }
        let copy_width = width.min(frame_width - x);

        for (dy, src) in pixels.chunks(width).take(height).enumerate() {
            let row = y + dy;
            if row >= frame_height {
                break;
            }
            let start = row * frame_width + x;
            let n = copy_width.min(src.len());
            self.pixels[start..start + n].copy_from_slice(&src[..n]);
        }
    }
}

/// A pitched byte buffer holding 1-, 2- or 4-byte pixels.
///
/// Colours are written little-endian, truncated to the pixel depth, so a
/// surface should be fed colours from a mapper of the matching width:
/// `u8` for 1 byte per pixel, `u16` for 2, `u32` for 4.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    pitch: usize,
    bytes_per_pixel: usize,
    data: Vec<u8>,
}

impl Surface {
    /// Create a surface with the tightest pitch for its width.
    pub fn new(width: usize, height: usize, bytes_per_pixel: usize) -> Result<Self, BlitError> {
        Self::with_pitch(width, height, bytes_per_pixel, width * bytes_per_pixel)
    }

    pub fn with_pitch(
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
        pitch: usize,
    ) -> Result<Self, BlitError> {
        if !matches!(bytes_per_pixel, 1 | 2 | 4) {
            return Err(BlitError::UnsupportedDepth(bytes_per_pixel));
        }
        if pitch < width * bytes_per_pixel {
            return Err(BlitError::PitchTooSmall {
                pitch,
                width,
                bytes_per_pixel,
            });
        }
        Ok(Self {
            width,
            height,
            pitch,
            bytes_per_pixel,
            data: vec![0; pitch * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read back the pixel at (x, y), zero-extended to 32 bits.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y * self.pitch + x * self.bytes_per_pixel;
        let mut bytes = [0u8; 4];
        bytes[..self.bytes_per_pixel]
            .copy_from_slice(&self.data[start..start + self.bytes_per_pixel]);
        Some(u32::from_le_bytes(bytes))
    }
}

impl<C: Copy + Into<u32>> BlitTarget<C> for Surface {
    fn blit(&mut self, x: usize, y: usize, width: usize, height: usize, pixels: &[C]) {
        if width == 0 {
            return;
        }
        if std::mem::size_of::<C>() > self.bytes_per_pixel {
            log(LogCategory::Tiles, LogLevel::Warn, || {
                format!(
                    "{}-byte colours truncated to a {}-byte surface",
                    std::mem::size_of::<C>(),
                    self.bytes_per_pixel
                )
            });
        }
        if x >= self.width || y >= self.height {
            log(LogCategory::Tiles, LogLevel::Debug, || {
                format!("blit at ({}, {}) lies outside the surface", x, y)
            });
            return;
        }
        let copy_width = width.min(self.width - x);
        let bpp = self.bytes_per_pixel;

        for (dy, src) in pixels.chunks(width).take(height).enumerate() {
            let row = y + dy;
            if row >= self.height {
                break;
            }
            let line = &mut self.data[row * self.pitch..];
            for (dx, &colour) in src.iter().take(copy_width).enumerate() {
                let start = (x + dx) * bpp;
                let bytes = colour.into().to_le_bytes();
                line[start..start + bpp].copy_from_slice(&bytes[..bpp]);
            }
        }
    }
}
