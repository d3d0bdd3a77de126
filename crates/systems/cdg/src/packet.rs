//! Packet framing.
//!
//! Byte layout of a packet:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 1    | command (low 6 bits)          |
//! | 1      | 1    | instruction (low 6 bits)      |
//! | 2      | 2    | parity Q (ignored)            |
//! | 4      | 16   | data (low 6 bits of each)     |
//! | 20     | 4    | parity P (ignored)            |

use crate::PACKET_SIZE;
use karaoke_core::logging::{log, LogCategory, LogLevel};

/// Bitmask for every 6-bit field
pub(crate) const FIELD_MASK: u8 = 0x3F;

/// Named fields of one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub command: u8,
    pub instruction: u8,
    pub data: [u8; 16],
}

impl Packet {
    /// Split a raw packet into its fields. Parity bytes are dropped and
    /// command/instruction are masked to 6 bits; data bytes are kept raw.
    pub fn parse(raw: &[u8; PACKET_SIZE]) -> Self {
        let mut data = [0u8; 16];
        data.copy_from_slice(&raw[4..20]);
        Self {
            command: raw[0] & FIELD_MASK,
            instruction: raw[1] & FIELD_MASK,
            data,
        }
    }
}

/// Sequential reader over an in-memory stream.
///
/// Trailing bytes that do not fill a whole packet are never returned.
#[derive(Debug, Clone)]
pub struct PacketCursor {
    data: Vec<u8>,
    position: usize,
}

impl PacketCursor {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Next 24 raw bytes, or `None` once fewer than 24 remain.
    pub fn next_packet(&mut self) -> Option<[u8; PACKET_SIZE]> {
        let start = self.position * PACKET_SIZE;
        let raw = self.data.get(start..start + PACKET_SIZE)?;
        let mut packet = [0u8; PACKET_SIZE];
        packet.copy_from_slice(raw);
        self.position += 1;
        Some(packet)
    }

    /// Go back to the first packet. The buffer is untouched.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Packets consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to packet `index` without decoding anything, clamped to `len()`.
    pub(crate) fn set_position(&mut self, index: usize) {
        let len = self.len();
        if index > len {
            log(LogCategory::Stream, LogLevel::Debug, || {
                format!("position {} past end of stream, clamped to {}", index, len)
            });
        }
        self.position = index.min(len);
    }

    /// Number of complete packets in the buffer.
    pub fn len(&self) -> usize {
        self.data.len() / PACKET_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.position
    }
}
