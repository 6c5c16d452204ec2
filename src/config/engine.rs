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
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::info;

use super::error::ConfigError;
use crate::params::{EngineParams, ParamKey, MAX_REGIONS};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_MAX_VOICES: usize = 16;
const DEFAULT_MAX_GRAINS: usize = 8;
const DEFAULT_RELEASE: Duration = Duration::from_millis(10);
const DEFAULT_MAX_GRAIN_SIZE: Duration = Duration::from_millis(500);
const DEFAULT_MIN_REGION_SPAN: Duration = Duration::from_millis(10);
const DEFAULT_REGION_CROSSFADE: Duration = Duration::from_millis(5);

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Rendering sample rate in Hz (default: 44100). Samples are converted to it on load.
    sample_rate: Option<u32>,

    /// Size of the voice pool (default: 16).
    max_voices: Option<usize>,

    /// Grain slots per voice (default: 8).
    max_grains: Option<usize>,

    /// Length of the release ramp used by note-off and voice stealing (default: 10ms).
    release: Option<String>,

    /// Longest allowed grain (default: 500ms).
    max_grain_size: Option<String>,

    /// Regions shorter than this play the whole buffer instead (default: 10ms).
    min_region_span: Option<String>,

    /// Fade-in for grains after a region change (default: 5ms).
    region_crossfade: Option<String>,

    /// Seed for region selection. Random when unset.
    seed: Option<u64>,

    /// Initial parameter values, keyed by parameter id.
    #[serde(default)]
    parameters: HashMap<String, f32>,

    /// Initial regions. The first entry is region 0.
    #[serde(default)]
    regions: Vec<RegionConfig>,
}

/// A YAML representation of a region.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct RegionConfig {
    /// Display name.
    name: Option<String>,
    /// Start as a fraction of the sample.
    start: f32,
    /// End as a fraction of the sample.
    end: f32,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RegionConfig {
    pub fn new(name: Option<&str>, start: f32, end: f32, enabled: bool) -> Self {
        Self {
            name: name.map(str::to_string),
            start,
            end,
            enabled,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl EngineConfig {
    /// New will create a configuration with the given sample rate and defaults
    /// for everything else.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            ..Default::default()
        }
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!(path = ?path, "Loading engine configuration");
        let config: EngineConfig = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value. Getters fall back to defaults for anything that would
    /// fail here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == Some(0) {
            return Err(out_of_range("sample_rate", 0, "greater than 0"));
        }
        if self.max_voices == Some(0) {
            return Err(out_of_range("max_voices", 0, "at least 1"));
        }
        if self.max_grains == Some(0) {
            return Err(out_of_range("max_grains", 0, "at least 1"));
        }

        for (field, value) in [
            ("release", &self.release),
            ("max_grain_size", &self.max_grain_size),
            ("min_region_span", &self.min_region_span),
            ("region_crossfade", &self.region_crossfade),
        ] {
            if let Some(value) = value {
                parse_duration(field, value)?;
            }
        }
        if self.release() == Duration::ZERO {
            return Err(out_of_range("release", "0", "longer than 0"));
        }
        if self.max_grain_size() == Duration::ZERO {
            return Err(out_of_range("max_grain_size", "0", "longer than 0"));
        }

        for (id, value) in &self.parameters {
            let key: ParamKey = id.parse()?;
            if !value.is_finite() {
                return Err(out_of_range(key.id(), value, "a finite number"));
            }
        }

        if self.regions.len() > MAX_REGIONS {
            return Err(ConfigError::TooManyRegions {
                count: self.regions.len(),
                max: MAX_REGIONS,
            });
        }
        for (index, region) in self.regions.iter().enumerate() {
            for (bound, value) in [("start", region.start), ("end", region.end)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(out_of_range(
                        format!("regions[{}].{}", index, bound),
                        value,
                        "between 0 and 1",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the rendering sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
            .filter(|rate| *rate > 0)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the voice pool size (default: 16)
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    /// Returns the grain slots per voice (default: 8)
    pub fn max_grains(&self) -> usize {
        self.max_grains.unwrap_or(DEFAULT_MAX_GRAINS).max(1)
    }

    /// Returns the release duration (default: 10ms)
    pub fn release(&self) -> Duration {
        duration_or(&self.release, DEFAULT_RELEASE)
    }

    /// Returns the largest grain size (default: 500ms)
    pub fn max_grain_size(&self) -> Duration {
        duration_or(&self.max_grain_size, DEFAULT_MAX_GRAIN_SIZE)
    }

    /// Returns the shortest usable region (default: 10ms)
    pub fn min_region_span(&self) -> Duration {
        duration_or(&self.min_region_span, DEFAULT_MIN_REGION_SPAN)
    }

    /// Returns the region crossfade (default: 5ms)
    pub fn region_crossfade(&self) -> Duration {
        duration_or(&self.region_crossfade, DEFAULT_REGION_CROSSFADE)
    }

    /// Returns the configured seed for region selection, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    pub fn parameters(&self) -> &HashMap<String, f32> {
        &self.parameters
    }

    /// Writes the configured parameters and regions into `params`. Regions are
    /// applied after parameters, so a configured region 0 wins over
    /// REGION_START/REGION_END.
    pub fn apply(&self, params: &EngineParams) -> Result<(), ConfigError> {
        for (id, value) in &self.parameters {
            let key: ParamKey = id.parse()?;
            params.set(key, *value);
        }
        for (index, region) in self.regions.iter().enumerate() {
            params.set_region(index, region.start, region.end, region.enabled)?;
        }
        Ok(())
    }

    /// Creates a parameter set with defaults overridden by this configuration.
    pub fn build_params(&self) -> Result<EngineParams, ConfigError> {
        let params = EngineParams::new();
        self.apply(&params)?;
        Ok(params)
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Into::into)
        .map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn duration_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_deref()
        .and_then(|v| DurationString::from_string(v.to_string()).ok())
        .map(Into::into)
        .unwrap_or(default)
}

fn out_of_range(
    field: impl Into<String>,
    value: impl ToString,
    expected: &'static str,
) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.into(),
        value: value.to_string(),
        expected,
    }
}
