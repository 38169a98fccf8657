//! Bitfield decoding for annunciator channels
//!
//! The controller packs many boolean status lights into a single integer per
//! channel (`bitfieldMotor`, `bitfieldBms`, `bitfieldIO`, ...). Bit `i`, counted
//! from the least significant bit, drives indicator `i` of that channel.
//!
//! Which light a bit belongs to is not fixed by the protocol; it comes from a
//! [`BitfieldLayout`] supplied with the configuration. Bits without a configured
//! name are reported under the positional id `<channel>.<bit>`.

use crate::types::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Bit-to-indicator mapping for one bitfield channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BitfieldLayout {
    /// Channel name carrying the packed value
    pub channel: String,
    /// Number of bits decoded, starting at bit 0
    pub width: u8,
    /// Indicator names by bit index; missing or empty entries fall back to positional ids
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl BitfieldLayout {
    pub fn new(channel: impl Into<String>, width: u8) -> Self {
        Self {
            channel: channel.into(),
            width,
            indicators: Vec::new(),
        }
    }

    /// Builder method: name the indicators, bit 0 first
    pub fn with_indicators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indicators = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.width) {
            return Err(DashboardError::InvalidConfig(format!(
                "bitfield '{}' width {} outside 1..=64",
                self.channel, self.width
            )));
        }
        if self.indicators.len() > self.width as usize {
            return Err(DashboardError::InvalidConfig(format!(
                "bitfield '{}' names {} indicators but is only {} bits wide",
                self.channel,
                self.indicators.len(),
                self.width
            )));
        }
        Ok(())
    }

    fn indicator_name(&self, bit: u8) -> Option<&str> {
        self.indicators
            .get(bit as usize)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Identity of one annunciator light
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorId {
    /// Resolved indicator name
    pub name: String,
    /// Bit index within its channel
    pub bit: u8,
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Turns packed bitfield values into individual indicator states
pub struct BitfieldDecoder {
    layouts: HashMap<String, BitfieldLayout>,
    default_width: u8,
}

impl BitfieldDecoder {
    /// Widths outside 1..=64 are clamped into that range
    pub fn new(layouts: Vec<BitfieldLayout>, default_width: u8) -> Self {
        Self {
            layouts: layouts
                .into_iter()
                .map(|mut layout| {
                    layout.width = layout.width.clamp(1, 64);
                    (layout.channel.clone(), layout)
                })
                .collect(),
            default_width: default_width.clamp(1, 64),
        }
    }

    /// Number of bits decoded for a channel
    pub fn width_for(&self, channel: &str) -> u8 {
        self.layouts
            .get(channel)
            .map(|layout| layout.width)
            .unwrap_or(self.default_width)
    }

    pub fn has_layout(&self, channel: &str) -> bool {
        self.layouts.contains_key(channel)
    }

    /// Configured channel names
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    /// Decode `value` into one `(indicator, on)` pair per bit of the channel's width
    ///
    /// Bits above the width are ignored.
    pub fn decode(&self, channel: &str, value: u64) -> Vec<(IndicatorId, bool)> {
        let layout = self.layouts.get(channel);
        let width = self.width_for(channel);

        (0..width)
            .map(|bit| {
                let name = layout
                    .and_then(|l| l.indicator_name(bit))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}.{}", channel, bit));
                let on = (value >> bit) & 1 != 0;
                (IndicatorId { name, bit }, on)
            })
            .collect()
    }

    /// Reassemble the integer from decoded indicator states
    pub fn pack(states: &[(IndicatorId, bool)]) -> u64 {
        states
            .iter()
            .filter(|(id, on)| *on && id.bit < 64)
            .fold(0u64, |acc, (id, _)| acc | (1u64 << id.bit))
    }
}

/// Current on/off state of every annunciator light seen so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annunciators {
    lights: BTreeMap<String, bool>,
}

impl Annunciators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register every named indicator as off
    pub fn from_layouts(layouts: &[BitfieldLayout]) -> Self {
        let lights = layouts
            .iter()
            .flat_map(|layout| layout.indicators.iter())
            .filter(|name| !name.is_empty())
            .map(|name| (name.clone(), false))
            .collect();
        Self { lights }
    }

    /// Apply decoded states, returning how many lights changed
    pub fn apply(&mut self, states: Vec<(IndicatorId, bool)>) -> usize {
        let mut changed = 0;
        for (id, on) in states {
            let previous = self.lights.insert(id.name, on);
            if previous != Some(on) {
                changed += 1;
            }
        }
        changed
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.lights.get(name).copied()
    }

    pub fn lights(&self) -> &BTreeMap<String, bool> {
        &self.lights
    }
}
