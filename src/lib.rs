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

//! A polyphonic granular sampler engine.
//!
//! Notes trigger voices that overlap-add short, windowed and resampled grains
//! taken from a shared sample buffer. Samples are decoded on a background
//! thread and handed to the audio thread without locks.

pub mod config;
pub mod events;
pub mod params;
pub mod samples;
pub mod synth;

#[cfg(test)]
mod test;
#[cfg(test)]
mod testutil;

pub use config::{ConfigError, EngineConfig};
pub use events::NoteEvent;
pub use params::{EngineParams, ParamKey, ParamSnapshot};
pub use samples::{sample_exchange, SampleLoader, SourceBuffer};
pub use synth::GranularEngine;
