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

//! Per-block rendering context and the derived quantities it carries.

use std::time::Duration;

use crate::config::EngineConfig;
use crate::params::ParamSnapshot;

use super::region::RegionMap;

/// The shortest grain, in samples.
pub const MIN_GRAIN_SAMPLES: usize = 100;

/// Converts a duration to a sample count at `sample_rate`.
pub fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Grain length in samples, clamped to `[MIN_GRAIN_SAMPLES, max_samples]`.
pub fn grain_length_samples(grain_size_ms: f32, sample_rate: u32, max_samples: usize) -> usize {
    let samples = if grain_size_ms.is_finite() && grain_size_ms > 0.0 {
        (grain_size_ms as f64 / 1000.0 * sample_rate as f64).round() as usize
    } else {
        0
    };
    samples.max(MIN_GRAIN_SAMPLES).min(max_samples.max(1))
}

/// Samples between grain births for a density in grains per second. Never
/// less than one sample.
pub fn trigger_interval(sample_rate: u32, density: f32) -> usize {
    if !density.is_finite() || density <= 0.0 {
        return 1;
    }
    ((sample_rate as f64 / density as f64).round() as usize).max(1)
}

/// Playback-rate ratio for a shift in semitones.
pub fn pitch_ratio(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

/// Fixed per-engine settings, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceSettings {
    pub sample_rate: u32,
    pub max_grains: usize,
    pub max_grain_samples: usize,
    pub release_samples: usize,
    pub crossfade_samples: usize,
    pub min_region_samples: usize,
}

impl VoiceSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        let sample_rate = config.sample_rate();
        Self {
            sample_rate,
            max_grains: config.max_grains(),
            max_grain_samples: duration_to_samples(config.max_grain_size(), sample_rate)
                .max(MIN_GRAIN_SAMPLES),
            release_samples: duration_to_samples(config.release(), sample_rate).max(1),
            crossfade_samples: duration_to_samples(config.region_crossfade(), sample_rate),
            min_region_samples: duration_to_samples(config.min_region_span(), sample_rate),
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Everything a voice needs to render one block.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    /// Channel 0 of the current buffer, or None when nothing playable is loaded.
    pub source: Option<&'a [f32]>,
    pub regions: RegionMap,
    pub grain_length: usize,
    pub trigger_interval: usize,
    pub pitch_ratio: f64,
    pub spacing: f64,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        snapshot: &ParamSnapshot,
        source: Option<&'a [f32]>,
        settings: &VoiceSettings,
    ) -> Self {
        let source = source.filter(|s| !s.is_empty());
        let regions = match source {
            Some(source) => RegionMap::resolve(
                &snapshot.regions,
                source.len(),
                settings.min_region_samples,
            ),
            None => RegionMap::empty(),
        };

        Self {
            source,
            regions,
            grain_length: grain_length_samples(
                snapshot.grain_size_ms,
                settings.sample_rate,
                settings.max_grain_samples,
            ),
            trigger_interval: trigger_interval(settings.sample_rate, snapshot.density),
            pitch_ratio: pitch_ratio(snapshot.pitch_shift),
            spacing: snapshot.spacing as f64,
        }
    }

    /// Length of the source in frames, 0 with no buffer.
    pub fn frames(&self) -> usize {
        self.source.map_or(0, <[f32]>::len)
    }
}
