// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Control parameters shared between the control thread and the audio thread.
//!
//! Every value is stored as the bit pattern of an `f32` in an atomic, so writes
//! from the control thread never block the audio thread. The engine takes one
//! [`ParamSnapshot`] per block.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// The number of selectable regions.
pub const MAX_REGIONS: usize = 5;

const PARAM_COUNT: usize = 7;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("Unknown parameter '{0}'")]
    UnknownKey(String),

    #[error("Region index {index} out of range (max {max})")]
    RegionIndex { index: usize, max: usize },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// A control parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    GrainSize,
    Density,
    PitchShift,
    Spacing,
    RegionStart,
    RegionEnd,
    PolyphonyMode,
}

impl ParamKey {
    /// Every parameter, in display order.
    pub const ALL: [ParamKey; PARAM_COUNT] = [
        ParamKey::GrainSize,
        ParamKey::Density,
        ParamKey::PitchShift,
        ParamKey::Spacing,
        ParamKey::RegionStart,
        ParamKey::RegionEnd,
        ParamKey::PolyphonyMode,
    ];

    /// The parameter's identifier, as used in configuration files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            ParamKey::GrainSize => "GRAIN_SIZE",
            ParamKey::Density => "DENSITY",
            ParamKey::PitchShift => "PITCH_SHIFT",
            ParamKey::Spacing => "SPACING",
            ParamKey::RegionStart => "REGION_START",
            ParamKey::RegionEnd => "REGION_END",
            ParamKey::PolyphonyMode => "POLYPHONY_MODE",
        }
    }

    /// Looks a parameter up by identifier. Case-insensitive.
    pub fn from_id(id: &str) -> Option<ParamKey> {
        ParamKey::ALL
            .into_iter()
            .find(|key| key.id().eq_ignore_ascii_case(id.trim()))
    }

    /// The inclusive range of the parameter.
    pub fn range(&self) -> (f32, f32) {
        match self {
            ParamKey::GrainSize => (10.0, 500.0),
            ParamKey::Density => (1.0, 200.0),
            ParamKey::PitchShift => (-12.0, 12.0),
            ParamKey::Spacing => (0.1, 2.0),
            ParamKey::RegionStart | ParamKey::RegionEnd | ParamKey::PolyphonyMode => (0.0, 1.0),
        }
    }

    pub fn default_value(&self) -> f32 {
        match self {
            ParamKey::GrainSize => 100.0,
            ParamKey::Density => 50.0,
            ParamKey::PitchShift => 0.0,
            ParamKey::Spacing => 1.0,
            ParamKey::RegionStart => 0.0,
            ParamKey::RegionEnd => 1.0,
            ParamKey::PolyphonyMode => 1.0,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ParamKey::GrainSize => "ms",
            ParamKey::Density => "grains/s",
            ParamKey::PitchShift => "semitones",
            ParamKey::Spacing => "x",
            ParamKey::RegionStart | ParamKey::RegionEnd => "fraction",
            ParamKey::PolyphonyMode => "0=mono, 1=poly",
        }
    }

    /// Clamps a value into the parameter's range. Non-finite values become the
    /// default; the polyphony flag snaps to 0 or 1.
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default_value();
        }
        if *self == ParamKey::PolyphonyMode {
            return if value >= 0.5 { 1.0 } else { 0.0 };
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ParamKey {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamKey::from_id(s).ok_or_else(|| ParamError::UnknownKey(s.to_string()))
    }
}

/// Parses a `KEY=VALUE` assignment. Booleans are accepted for the polyphony flag.
pub fn parse_assignment(assignment: &str) -> Result<(ParamKey, f32), ParamError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| ParamError::UnknownKey(assignment.to_string()))?;
    let key: ParamKey = key.parse()?;
    let value = value.trim();

    let parsed = match (key, value.to_ascii_lowercase().as_str()) {
        (ParamKey::PolyphonyMode, "poly" | "true" | "on") => Ok(1.0),
        (ParamKey::PolyphonyMode, "mono" | "false" | "off") => Ok(0.0),
        _ => value.parse::<f32>(),
    };

    parsed.map(|v| (key, v)).map_err(|_| ParamError::InvalidValue {
        key: key.id(),
        value: value.to_string(),
    })
}

/// A region as two normalized fractions of the source buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionData {
    pub start: f32,
    pub end: f32,
    pub enabled: bool,
}

impl RegionData {
    pub fn new(start: f32, end: f32, enabled: bool) -> Self {
        Self {
            start: ParamKey::RegionStart.clamp(start),
            end: ParamKey::RegionEnd.clamp(end),
            enabled,
        }
    }

    /// The whole buffer, disabled.
    pub const fn full_disabled() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            enabled: false,
        }
    }
}

impl Default for RegionData {
    fn default() -> Self {
        Self::full_disabled()
    }
}

struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Storage for regions 1 and up. Region 0 uses REGION_START/REGION_END.
struct RegionSlot {
    start: AtomicF32,
    end: AtomicF32,
    enabled: AtomicBool,
}

impl RegionSlot {
    fn new(region: RegionData) -> Self {
        Self {
            start: AtomicF32::new(region.start),
            end: AtomicF32::new(region.end),
            enabled: AtomicBool::new(region.enabled),
        }
    }
}

/// The live parameter set.
pub struct EngineParams {
    values: [AtomicF32; PARAM_COUNT],
    region_zero_enabled: AtomicBool,
    regions: [RegionSlot; MAX_REGIONS - 1],
}

impl EngineParams {
    /// Creates a parameter set holding the defaults.
    pub fn new() -> Self {
        Self {
            values: ParamKey::ALL.map(|key| AtomicF32::new(key.default_value())),
            region_zero_enabled: AtomicBool::new(true),
            regions: std::array::from_fn(|_| RegionSlot::new(RegionData::full_disabled())),
        }
    }

    /// Reads a parameter.
    pub fn get(&self, key: ParamKey) -> f32 {
        self.values[key.index()].load()
    }

    /// Writes a parameter, clamped into range. Returns the stored value.
    pub fn set(&self, key: ParamKey, value: f32) -> f32 {
        let clamped = key.clamp(value);
        self.values[key.index()].store(clamped);
        clamped
    }

    /// True when notes are allocated across the voice pool.
    pub fn polyphonic(&self) -> bool {
        self.get(ParamKey::PolyphonyMode) >= 0.5
    }

    /// Sets a region. Index 0 writes REGION_START and REGION_END.
    pub fn set_region(
        &self,
        index: usize,
        start: f32,
        end: f32,
        enabled: bool,
    ) -> Result<(), ParamError> {
        match index {
            0 => {
                self.set(ParamKey::RegionStart, start);
                self.set(ParamKey::RegionEnd, end);
                self.region_zero_enabled.store(enabled, Ordering::Relaxed);
            }
            _ => {
                let slot = self
                    .regions
                    .get(index - 1)
                    .ok_or(ParamError::RegionIndex {
                        index,
                        max: MAX_REGIONS - 1,
                    })?;
                slot.start.store(ParamKey::RegionStart.clamp(start));
                slot.end.store(ParamKey::RegionEnd.clamp(end));
                slot.enabled.store(enabled, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reads a region.
    pub fn region(&self, index: usize) -> Option<RegionData> {
        match index {
            0 => Some(RegionData {
                start: self.get(ParamKey::RegionStart),
                end: self.get(ParamKey::RegionEnd),
                enabled: self.region_zero_enabled.load(Ordering::Relaxed),
            }),
            _ => self.regions.get(index - 1).map(|slot| RegionData {
                start: slot.start.load(),
                end: slot.end.load(),
                enabled: slot.enabled.load(Ordering::Relaxed),
            }),
        }
    }

    /// Takes a consistent-enough copy of every parameter. Values may be up to one
    /// write stale relative to each other, never torn.
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            grain_size_ms: self.get(ParamKey::GrainSize),
            density: self.get(ParamKey::Density),
            pitch_shift: self.get(ParamKey::PitchShift),
            spacing: self.get(ParamKey::Spacing),
            polyphonic: self.polyphonic(),
            regions: std::array::from_fn(|i| self.region(i).unwrap_or_default()),
        }
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineParams")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// The parameters one block renders with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSnapshot {
    pub grain_size_ms: f32,
    pub density: f32,
    pub pitch_shift: f32,
    pub spacing: f32,
    pub polyphonic: bool,
    pub regions: [RegionData; MAX_REGIONS],
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        EngineParams::new().snapshot()
    }
}
