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

//! Immutable decoded audio that grains are read from.

use std::time::Duration;

/// Errors raised when constructing a source buffer.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Channel {channel} has {actual} frames, expected {expected}")]
    MismatchedChannels {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Sample rate must be non-zero")]
    ZeroSampleRate,
}

/// A decoded sample held entirely in memory in planar layout.
///
/// Once published to the real-time thread a buffer is never mutated; a new
/// load replaces it wholesale.
#[derive(Clone, PartialEq)]
pub struct SourceBuffer {
    /// One Vec per channel, all of the same length.
    channels: Vec<Vec<f32>>,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl SourceBuffer {
    /// Creates a buffer from planar channel data.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }

        let expected = channels.first().map(Vec::len).unwrap_or(0);
        for (channel, data) in channels.iter().enumerate() {
            if data.len() != expected {
                return Err(BufferError::MismatchedChannels {
                    channel,
                    expected,
                    actual: data.len(),
                });
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Creates a single channel buffer.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, BufferError> {
        Self::from_planar(vec![samples], sample_rate)
    }

    /// Creates a buffer from interleaved samples. Trailing samples that don't
    /// make up a whole frame are dropped.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: u16,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        let channel_count = channel_count as usize;
        if channel_count == 0 {
            return Self::from_planar(Vec::new(), sample_rate);
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::from_planar(channels, sample_rate)
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Returns the number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True if there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Returns the samples for one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Returns the channel grains are read from. Multichannel sources play
    /// their first channel.
    pub fn playback_channel(&self) -> &[f32] {
        self.channel(0).unwrap_or(&[])
    }

    /// Returns the duration of the buffer.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.channels.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("channels", &self.channel_count())
            .field("frames", &self.frame_count())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
