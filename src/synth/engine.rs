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

//! The granular engine: the real-time entry point.
//!
//! [`GranularEngine::process_block`] is meant to be called from the audio
//! callback. It never blocks, allocates or logs. Parameters are read once per
//! block, the source buffer is captured once per block, and note events are
//! applied before any audio is rendered.

use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::events::NoteEvent;
use crate::params::EngineParams;
use crate::samples::{SampleReader, SourceBuffer};

use super::context::{BlockContext, VoiceSettings};
use super::manager::VoiceManager;
use super::output::OutputStage;
use super::playhead::PlayheadMonitor;
use super::voice::Voice;

pub struct GranularEngine {
    settings: VoiceSettings,
    manager: VoiceManager,
    output: OutputStage,
    params: Arc<EngineParams>,
    reader: SampleReader,
    playheads: Arc<PlayheadMonitor>,
    /// Polyphony mode of the previous block.
    polyphonic: bool,
}

impl GranularEngine {
    /// Creates an engine. The voice pool, grain slots and window tables are all
    /// allocated here.
    pub fn new(config: &EngineConfig, reader: SampleReader, params: Arc<EngineParams>) -> Self {
        let settings = VoiceSettings::from_config(config);
        let seed = config.seed().unwrap_or_else(rand::random::<u64>);
        let manager = VoiceManager::new(config.max_voices(), &settings, seed);
        let output = OutputStage::new(manager.size());
        let playheads = Arc::new(PlayheadMonitor::new(manager.size()));

        info!(
            sample_rate = settings.sample_rate,
            voices = manager.size(),
            grains_per_voice = settings.max_grains,
            max_grain_samples = settings.max_grain_samples,
            release_samples = settings.release_samples,
            "Granular engine created"
        );

        Self {
            settings,
            manager,
            output,
            polyphonic: params.polyphonic(),
            params,
            reader,
            playheads,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.settings.sample_rate
    }

    pub fn params(&self) -> &Arc<EngineParams> {
        &self.params
    }

    /// Returns a handle the UI can poll for voice positions.
    pub fn playheads(&self) -> Arc<PlayheadMonitor> {
        self.playheads.clone()
    }

    pub fn voices(&self) -> &[Voice] {
        self.manager.voices()
    }

    pub fn active_voices(&self) -> usize {
        self.manager.active_count()
    }

    /// Starts a note using the current polyphony mode.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        self.handle_event(NoteEvent::note_on(note, velocity), !self.params.polyphonic());
    }

    /// Releases a note using the current polyphony mode.
    pub fn note_off(&mut self, note: u8) {
        self.handle_event(NoteEvent::note_off(note), !self.params.polyphonic());
    }

    pub fn all_notes_off(&mut self) {
        self.manager.all_notes_off();
    }

    fn handle_event(&mut self, event: NoteEvent, mono: bool) {
        match event {
            NoteEvent::NoteOn { note, velocity } => self.manager.note_on(note, velocity, mono),
            NoteEvent::NoteOff { note } => self.manager.note_off(note, mono),
            NoteEvent::AllNotesOff => self.manager.all_notes_off(),
        }
    }

    /// Renders one block. `events` are applied in order first. Output is written
    /// over `left` and `right`; if their lengths differ the extra samples are
    /// zeroed.
    pub fn process_block(&mut self, events: &[NoteEvent], left: &mut [f32], right: &mut [f32]) {
        let snapshot = self.params.snapshot();

        // Notes held under the other allocation scheme could never be released.
        if snapshot.polyphonic != self.polyphonic {
            self.manager.all_notes_off();
            self.polyphonic = snapshot.polyphonic;
        }

        let mono = !snapshot.polyphonic;
        for event in events {
            self.handle_event(*event, mono);
        }

        left.fill(0.0);
        right.fill(0.0);
        let frames = left.len().min(right.len());
        let (left, right) = (&mut left[..frames], &mut right[..frames]);

        let source = self
            .reader
            .current_buffer()
            .map(SourceBuffer::playback_channel);
        let context = BlockContext::new(&snapshot, source, &self.settings);

        self.manager.render(&context, left, right);
        self.output.process(left, right);

        let source_frames = context.frames();
        for voice in self.manager.voices() {
            let position = if source_frames > 0 {
                (voice.playhead() / source_frames as f64) as f32
            } else {
                0.0
            };
            self.playheads.update(
                voice.index(),
                position,
                voice.region().unwrap_or(0),
                !voice.is_idle(),
            );
        }
    }
}

impl std::fmt::Debug for GranularEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GranularEngine")
            .field("settings", &self.settings)
            .field("manager", &self.manager)
            .field("params", &self.params)
            .finish()
    }
}
