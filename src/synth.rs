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

//! Granular synthesis.
//!
//! This module provides:
//! - Grains, window tables and interpolated reads
//! - Region resolution and selection
//! - The voice state machine and the voice pool
//! - Output normalization and limiting
//! - The real-time engine that ties these together

mod context;
mod engine;
mod envelope;
mod grain;
mod interpolate;
mod manager;
mod output;
mod playhead;
mod region;
mod voice;
mod window;

pub use context::{
    duration_to_samples, grain_length_samples, pitch_ratio, trigger_interval, BlockContext,
    VoiceSettings, MIN_GRAIN_SAMPLES,
};
pub use engine::GranularEngine;
pub use envelope::Envelope;
pub use grain::{Grain, GrainPool};
pub use interpolate::read_linear;
pub use manager::VoiceManager;
pub use output::{OutputStage, SOFT_LIMIT_THRESHOLD};
pub use playhead::{PlayheadMonitor, PlayheadPosition};
pub use region::{RegionMap, Span};
pub use voice::{PendingNote, Voice, VoiceEvent, VoiceState};
pub use window::{hann, HannWindow};
