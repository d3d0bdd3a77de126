//! Decoder configuration.
//!
//! Two generations of CD+G players disagree on how presets and scrolls
//! behave. The defaults follow the later interpretation; the older one is
//! kept for streams authored against it.

use crate::error::CdgError;
use serde::{Deserialize, Serialize};

/// What a memory preset paints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetPolicy {
    /// The whole plane, border included, takes the preset colour.
    #[default]
    WholePlane,
    /// Top 12 rows and left 6 columns take the border colour, the rest of
    /// the plane the preset colour.
    RegionLimited,
}

/// How scroll offsets are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPolicy {
    /// Block scrolls move 6 or 12 pixels; offsets set a persistent shift.
    #[default]
    Shifted,
    /// A non-zero offset replaces the block size as the scroll distance
    /// and there is no persistent shift.
    Coarse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub preset_policy: PresetPolicy,
    pub scroll_policy: ScrollPolicy,
    /// Skip tile blocks whose second data byte has bit 0x20 set. Some discs
    /// use it to void a command.
    pub honour_ignore_bit: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            preset_policy: PresetPolicy::WholePlane,
            scroll_policy: ScrollPolicy::Shifted,
            honour_ignore_bit: true,
        }
    }
}

impl DecoderConfig {
    /// Settings of the older player generation.
    pub fn legacy() -> Self {
        Self {
            preset_policy: PresetPolicy::RegionLimited,
            scroll_policy: ScrollPolicy::Coarse,
            honour_ignore_bit: false,
        }
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CdgError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CdgError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
