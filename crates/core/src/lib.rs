//! Core primitives shared by the karaoke graphics decoders.
//!
//! Nothing in here knows about a particular stream format: it covers
//! logging, colour arithmetic, the colour-mapper seam used to resolve
//! palette entries into a host's pixel encoding, and the blit targets that
//! exported tiles are copied into.

pub mod graphics;
pub mod logging;
pub mod palette;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// A packed 32-bit pixel buffer (0xAARRGGBB), row-major.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Pixel at (x, y), or `None` outside the frame.
        pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get((y * self.width + x) as usize).copied()
        }
    }
}

pub use palette::ColourMapper;
pub use renderer::BlitTarget;
