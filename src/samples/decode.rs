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

//! Whole-file decoding (WAV, FLAC, MP3, Ogg and anything else symphonia reads).

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::buffer::SourceBuffer;
use super::error::LoadError;

/// Decodes an audio file into a planar source buffer at the file's own rate.
pub fn decode_file(path: &Path) -> Result<SourceBuffer, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Give the probe a hint from the extension.
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|source| LoadError::Unsupported {
            path: path.to_path_buf(),
            source,
        })?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| LoadError::UnknownSampleRate(path.to_path_buf()))?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|source| LoadError::Unsupported {
            path: path.to_path_buf(),
            source,
        })?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet is skipped rather than failing the whole file.
                debug!(path = ?path, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        // Reuse the conversion buffer unless this packet is larger.
        let needs_new = sample_buffer
            .as_ref()
            .map_or(true, |b| b.capacity() < decoded.capacity() * channel_count);
        if needs_new {
            sample_buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        let Some(converted) = sample_buffer.as_mut() else {
            continue;
        };
        converted.copy_planar_ref(decoded);

        // Planar layout: each channel's frames are contiguous.
        for (channel, plane) in channels
            .iter_mut()
            .zip(converted.samples().chunks_exact(frames))
        {
            channel.extend_from_slice(plane);
        }
    }

    if channels.first().map_or(true, Vec::is_empty) {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    Ok(SourceBuffer::from_planar(channels, sample_rate)?)
}

/// Converts a buffer to a new sample rate with linear interpolation.
///
/// Linear interpolation is enough here: grains are resampled again on read-out
/// anyway, and the conversion happens once per load.
pub fn transcode(buffer: &SourceBuffer, target_rate: u32) -> Result<SourceBuffer, LoadError> {
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        return Ok(buffer.clone());
    }

    let source_rate = buffer.sample_rate() as u64;
    let target = target_rate as u64;
    let target_frames = (buffer.frame_count() as u64 * target).div_ceil(source_rate) as usize;

    let channels = (0..buffer.channel_count() as usize)
        .map(|index| {
            let samples = buffer.channel(index).unwrap_or(&[]);
            (0..target_frames as u64)
                .map(|target_frame| {
                    // Exact position in source frames: whole part plus a remainder
                    // over the target rate.
                    let scaled = target_frame * source_rate;
                    let source_frame = (scaled / target) as usize;
                    let frac = (scaled % target) as f32 / target as f32;

                    let s0 = samples.get(source_frame).copied().unwrap_or(0.0);
                    let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);
                    s0 + (s1 - s0) * frac
                })
                .collect()
        })
        .collect();

    Ok(SourceBuffer::from_planar(channels, target_rate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::audio::{sine, write_wav};

    #[test]
    fn test_decode_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sine.wav");
        let left = sine(440.0, 0.5, 44100, 4410);
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        write_wav(&path, &[left.clone(), right.clone()], 44100).expect("write wav");

        let buffer = decode_file(&path).expect("decode");
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 4410);
        assert_eq!(buffer.sample_rate(), 44100);

        let decoded_left = buffer.channel(0).expect("left");
        let decoded_right = buffer.channel(1).expect("right");
        for i in [0, 100, 2000, 4409] {
            assert!((decoded_left[i] - left[i]).abs() < 1e-6);
            assert!((decoded_right[i] - right[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = decode_file(&dir.path().join("missing.wav"));
        assert!(matches!(result, Err(LoadError::Open { .. })));
    }

    #[test]
    fn test_decode_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio").expect("write");

        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn test_transcode_length() {
        let source = SourceBuffer::from_mono(sine(440.0, 1.0, 44100, 4410), 44100).expect("buffer");
        let result = transcode(&source, 48000).expect("transcode");

        assert_eq!(result.frame_count(), 4800);
        assert_eq!(result.sample_rate(), 48000);
    }

    #[test]
    fn test_transcode_whole_seconds_exact() {
        for (from, to) in [(44100, 48000), (48000, 44100), (22050, 96000)] {
            let source = SourceBuffer::from_mono(vec![0.0; from as usize], from).expect("buffer");
            let result = transcode(&source, to).expect("transcode");
            assert_eq!(result.frame_count(), to as usize, "{} -> {}", from, to);
        }

        // A partial trailing frame rounds up.
        let source = SourceBuffer::from_mono(vec![0.0; 3], 48000).expect("buffer");
        assert_eq!(transcode(&source, 44100).expect("transcode").frame_count(), 3);
    }

    #[test]
    fn test_transcode_positions_land_on_source_frames() {
        // Every 160th output frame at 48k lines up with every 147th input frame at 44.1k.
        let ramp: Vec<f32> = (0..4410).map(|i| i as f32).collect();
        let source = SourceBuffer::from_mono(ramp, 44100).expect("buffer");
        let result = transcode(&source, 48000).expect("transcode");
        let data = result.channel(0).expect("channel");

        for k in 0..30 {
            assert_eq!(data[k * 160], (k * 147) as f32);
        }
    }

    #[test]
    fn test_transcode_preserves_channels() {
        let source =
            SourceBuffer::from_planar(vec![vec![1.0; 8], vec![-1.0; 8]], 44100).expect("buffer");
        let result = transcode(&source, 48000).expect("transcode");

        assert_eq!(result.channel_count(), 2);
        assert!((result.channel(0).expect("left")[0] - 1.0).abs() < 0.1);
        assert!((result.channel(1).expect("right")[0] + 1.0).abs() < 0.1);
    }

    #[test]
    fn test_transcode_same_rate() {
        let source = SourceBuffer::from_mono(vec![0.25; 16], 48000).expect("buffer");
        assert_eq!(transcode(&source, 48000).expect("transcode"), source);
    }
}
