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
use std::path::PathBuf;

use super::buffer::BufferError;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported audio file '{path}': {source}")]
    Unsupported {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },

    #[error("No audio track found in {0}")]
    NoAudioTrack(PathBuf),

    #[error("Sample rate not specified in {0}")]
    UnknownSampleRate(PathBuf),

    #[error("No audio decoded from {0}")]
    Empty(PathBuf),

    #[error("Audio file error: {0}")]
    AudioError(#[from] symphonia::core::errors::Error),

    #[error("Invalid sample buffer: {0}")]
    Buffer(#[from] BufferError),

    #[error("Failed to start the sample loader: {0}")]
    Spawn(std::io::Error),

    #[error("Sample loader has shut down")]
    Disconnected,
}
