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

//! End-to-end engine scenarios.

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::events::NoteEvent;
use crate::params::{EngineParams, ParamKey};
use crate::samples::{sample_exchange, LoadStatus, SampleLoader, SamplePublisher, SourceBuffer};
use crate::synth::{GranularEngine, OutputStage, VoiceState};
use crate::testutil::audio::{peak, rms, sine, write_wav};

const SAMPLE_RATE: u32 = 44100;

fn engine_with(config: &EngineConfig) -> (GranularEngine, SamplePublisher) {
    let (publisher, reader) = sample_exchange();
    let params = Arc::new(config.build_params().expect("params"));
    (GranularEngine::new(config, reader, params), publisher)
}

fn engine() -> (GranularEngine, SamplePublisher) {
    engine_with(&EngineConfig::new(SAMPLE_RATE))
}

fn publish(publisher: &mut SamplePublisher, samples: Vec<f32>) {
    let buffer = SourceBuffer::from_mono(samples, SAMPLE_RATE).expect("buffer");
    assert!(publisher.publish(buffer).is_none(), "publish once per engine");
}

fn render(engine: &mut GranularEngine, events: &[NoteEvent], frames: usize) -> Vec<f32> {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    engine.process_block(events, &mut left, &mut right);
    assert_eq!(left, right, "channels must match");
    left
}

/// Counts sign changes, skipping exact zeros.
fn zero_crossings(samples: &[f32]) -> usize {
    let mut crossings = 0;
    let mut last_positive = None;
    for sample in samples.iter().filter(|s| **s != 0.0) {
        let positive = *sample > 0.0;
        if last_positive.is_some_and(|last| last != positive) {
            crossings += 1;
        }
        last_positive = Some(positive);
    }
    crossings
}

#[test]
fn test_empty_buffer_is_silent() {
    let (mut engine, mut publisher) = engine();
    publish(&mut publisher, Vec::new());

    let output = render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 512);
    assert!(output.iter().all(|s| *s == 0.0));
}

#[test]
fn test_no_buffer_is_silent() {
    let (mut engine, _publisher) = engine();
    let output = render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 512);
    assert!(output.iter().all(|s| *s == 0.0));
    assert_eq!(engine.voices()[0].state(), VoiceState::Playing);
}

#[test]
fn test_release_fades_out() {
    let (mut engine, mut publisher) = engine();
    publish(&mut publisher, sine(440.0, 0.8, SAMPLE_RATE, SAMPLE_RATE as usize));
    engine.params().set(ParamKey::GrainSize, 100.0);
    engine.params().set(ParamKey::Density, 50.0);
    engine.params().set(ParamKey::PitchShift, 0.0);
    engine.params().set_region(0, 0.0, 1.0, true).expect("region");

    // Long enough for the grain overlap to reach a steady state.
    let held = render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 8820);
    assert!(rms(&held) > 0.0);

    let release = render(&mut engine, &[NoteEvent::note_off(60)], 512);
    assert!(rms(&release) > 0.0);

    let peaks: Vec<f32> = release[..400].chunks(100).map(peak).collect();
    assert!(
        peaks.windows(2).all(|w| w[1] < w[0]),
        "release peaks not decreasing: {:?}",
        peaks
    );
    assert!(release[441..].iter().all(|s| *s == 0.0));

    let voice = &engine.voices()[0];
    assert_eq!(voice.state(), VoiceState::Idle);
    assert_eq!(voice.grains().active_count(), 0);
    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn test_octave_up_doubles_zero_crossings() {
    let crossings = |semitones: f32| {
        let (mut engine, mut publisher) = engine();
        publish(&mut publisher, sine(110.0, 0.5, SAMPLE_RATE, SAMPLE_RATE as usize));
        // One grain per second, so a block holds exactly one 100ms grain.
        engine.params().set(ParamKey::Density, 1.0);
        engine.params().set(ParamKey::GrainSize, 100.0);
        engine.params().set(ParamKey::PitchShift, semitones);
        zero_crossings(&render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 4410))
    };

    let unshifted = crossings(0.0);
    let octave_up = crossings(12.0);
    assert!(unshifted >= 20);
    assert!(
        octave_up.abs_diff(2 * unshifted) <= 2,
        "expected about {} crossings, got {}",
        2 * unshifted,
        octave_up
    );
}

#[test]
fn test_mono_legato() {
    let (mut engine, mut publisher) = engine();
    publish(&mut publisher, sine(440.0, 0.8, SAMPLE_RATE, SAMPLE_RATE as usize));
    engine.params().set(ParamKey::PolyphonyMode, 0.0);

    render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 1024);
    let grains = engine.voices()[0].grains().active_count();
    assert!(grains > 0);

    engine.note_on(64, 0.5);
    let voice = &engine.voices()[0];
    assert_eq!(voice.state(), VoiceState::Playing);
    assert_eq!(voice.envelope_level(), 1.0);
    assert_eq!(voice.note(), 64);
    assert_eq!(voice.velocity(), 0.5);
    assert_eq!(voice.grains().active_count(), grains);

    // Keep playing through several blocks; the envelope never drops.
    for _ in 0..8 {
        render(&mut engine, &[], 256);
        let voice = &engine.voices()[0];
        assert_eq!(voice.state(), VoiceState::Playing);
        assert_eq!(voice.envelope_level(), 1.0);
    }
    assert_eq!(engine.active_voices(), 1);
}

#[test]
fn test_steal_waits_for_fade() {
    let config = EngineConfig::from_yaml("max_voices: 1").expect("config");
    let (mut engine, mut publisher) = engine_with(&config);
    publish(&mut publisher, sine(440.0, 0.8, SAMPLE_RATE, SAMPLE_RATE as usize));

    render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 2048);
    engine.note_on(72, 1.0);

    let threshold = 0.01;
    let mut last_level = engine.voices()[0].envelope_level();
    let mut samples = 0;
    while engine.voices()[0].note() == 60 {
        let voice = &engine.voices()[0];
        assert_eq!(voice.state(), VoiceState::Releasing);
        last_level = voice.envelope_level();
        render(&mut engine, &[], 1);
        samples += 1;
        assert!(samples < 1000, "stolen voice never handed over");
    }

    assert!(last_level <= threshold, "new note started at level {}", last_level);
    assert_eq!(engine.voices()[0].state(), VoiceState::Playing);
}

#[test]
fn test_full_pool_normalization() {
    let stage = OutputStage::new(16);
    for v in [0.1_f32, 0.2, 0.3, 0.5, -0.4] {
        let sum: f32 = (0..16).map(|_| v).sum();
        let scaled = sum * 0.25;
        let expected = if scaled.abs() > 0.95 {
            scaled.tanh()
        } else {
            scaled
        };
        assert_eq!(stage.apply(sum), expected);
    }
}

#[test]
fn test_sixteen_voices_stay_bounded() {
    let (mut engine, mut publisher) = engine();
    publish(&mut publisher, vec![1.0; SAMPLE_RATE as usize]);
    engine.params().set(ParamKey::Density, 200.0);

    let notes: Vec<NoteEvent> = (60..76).map(|n| NoteEvent::note_on(n, 1.0)).collect();
    render(&mut engine, &notes, 4410);
    assert_eq!(engine.active_voices(), 16);

    let output = render(&mut engine, &[], 4410);
    assert!(peak(&output) > 0.95);
    assert!(output.iter().all(|s| s.abs() <= 1.0));
}

#[test]
fn test_loaded_sample_plays() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tone.wav");
    write_wav(&path, &[sine(440.0, 0.8, 22050, 22050)], 22050).expect("write wav");

    let config = EngineConfig::new(SAMPLE_RATE);
    let (publisher, reader) = sample_exchange();
    let mut engine = GranularEngine::new(&config, reader, Arc::new(EngineParams::new()));
    let loader = SampleLoader::spawn(publisher, config.sample_rate()).expect("loader");

    loader.request_load(&path).expect("request");
    match loader.wait_for_status(Duration::from_secs(5)) {
        Some(LoadStatus::Loaded(info)) => {
            assert_eq!(info.sample_rate, SAMPLE_RATE);
            assert_eq!(info.frames, 44100);
        }
        other => panic!("unexpected status {:?}", other),
    }

    let output = render(&mut engine, &[NoteEvent::note_on(60, 1.0)], 2048);
    assert!(rms(&output) > 0.0);
}
