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

//! Sample loading and the handoff of sample buffers to the audio thread.
//!
//! This module provides:
//! - Whole-file decoding and rate conversion
//! - A lock-free exchange between the loader and the audio thread
//! - Deferred disposal of replaced buffers
//! - A background loader that ties these together

mod buffer;
mod decode;
mod disposal;
mod error;
mod exchange;
mod loader;

pub use buffer::{BufferError, SourceBuffer};
pub use decode::{decode_file, transcode};
pub use disposal::DisposalQueue;
pub use error::LoadError;
pub use exchange::{sample_exchange, RetiredBuffer, SamplePublisher, SampleReader};
pub use loader::{load_file, LoadStatus, SampleInfo, SampleLoader};
