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

//! A single granular voice.
//!
//! Every lifecycle change goes through [`Voice::transition`]. Rendering runs per
//! sample: births new grains while playing, mixes the grains in flight and
//! applies the envelope and velocity.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::context::{BlockContext, VoiceSettings};
use super::envelope::Envelope;
use super::grain::GrainPool;
use super::window::HannWindow;

/// Lifecycle state of a voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Playing,
    Releasing,
}

/// Inputs to the voice state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceEvent {
    /// Start a note from scratch.
    NoteOn { note: u8, velocity: f32 },
    /// Change note and velocity without restarting the envelope or grains.
    Retrigger { note: u8, velocity: f32 },
    /// Begin the release.
    NoteOff,
    /// Restart the release ramp from the current level.
    QuickRelease,
    /// Fade out, then start `note`.
    Steal { note: u8, velocity: f32 },
    /// Forget a note queued by a steal.
    CancelPending,
    /// The release ramp reached zero.
    EnvelopeFinished,
}

/// A note waiting for a stolen voice to fade out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingNote {
    pub note: u8,
    pub velocity: f32,
}

/// One synthesis unit with its own grains, window table and envelope.
pub struct Voice {
    /// Position in the voice pool.
    index: usize,
    state: VoiceState,
    /// The note this voice answers note-offs for.
    note: u8,
    velocity: f32,
    envelope: Envelope,
    /// Samples until the next grain birth.
    countdown: usize,
    /// Playhead position within the active region.
    phase: f64,
    /// Absolute playhead position of the most recent birth.
    playhead: f64,
    /// Samples since the last note-on or retrigger.
    age: u64,
    grains: GrainPool,
    window: HannWindow,
    /// Region of the most recent birth. None until the first birth of a note.
    region: Option<usize>,
    crossfade_samples: usize,
    pending: Option<PendingNote>,
    rng: StdRng,
}

impl Voice {
    /// Creates an idle voice. Everything it will need while rendering is
    /// allocated here.
    pub fn new(index: usize, settings: &VoiceSettings, seed: u64) -> Self {
        Self {
            index,
            state: VoiceState::Idle,
            note: 0,
            velocity: 0.0,
            envelope: Envelope::new(settings.release_samples),
            countdown: 0,
            phase: 0.0,
            playhead: 0.0,
            age: 0,
            grains: GrainPool::new(settings.max_grains),
            window: HannWindow::new(settings.max_grain_samples),
            region: None,
            crossfade_samples: settings.crossfade_samples,
            pending: None,
            rng: StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn pending(&self) -> Option<PendingNote> {
        self.pending
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Absolute source position of the latest grain birth.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Region of the latest grain birth.
    pub fn region(&self) -> Option<usize> {
        self.region
    }

    pub fn grains(&self) -> &GrainPool {
        &self.grains
    }

    /// True if this voice is playing `note` and should answer its note-off.
    pub fn is_playing(&self, note: u8) -> bool {
        self.state == VoiceState::Playing && self.note == note
    }

    /// Applies an event to the state machine.
    pub fn transition(&mut self, event: VoiceEvent) {
        match (self.state, event) {
            (_, VoiceEvent::NoteOn { note, velocity })
            | (VoiceState::Idle, VoiceEvent::Retrigger { note, velocity })
            | (VoiceState::Idle, VoiceEvent::Steal { note, velocity }) => {
                self.start(note, velocity);
            }

            (VoiceState::Playing, VoiceEvent::Retrigger { note, velocity }) => {
                self.note = note;
                self.velocity = velocity;
                self.phase = 0.0;
                self.age = 0;
            }

            (VoiceState::Playing, VoiceEvent::NoteOff)
            | (VoiceState::Playing | VoiceState::Releasing, VoiceEvent::QuickRelease) => {
                self.state = VoiceState::Releasing;
                self.envelope.release();
            }

            (VoiceState::Playing | VoiceState::Releasing, VoiceEvent::Steal { note, velocity }) => {
                self.state = VoiceState::Releasing;
                self.envelope.release();
                self.pending = Some(PendingNote { note, velocity });
                self.age = 0;
            }

            (_, VoiceEvent::CancelPending) => {
                self.pending = None;
            }

            (VoiceState::Releasing, VoiceEvent::EnvelopeFinished) => {
                self.grains.clear();
                match self.pending.take() {
                    Some(PendingNote { note, velocity }) => self.start(note, velocity),
                    None => {
                        self.state = VoiceState::Idle;
                        self.envelope.reset();
                        self.region = None;
                    }
                }
            }

            (VoiceState::Idle, VoiceEvent::NoteOff | VoiceEvent::QuickRelease)
            | (VoiceState::Releasing, VoiceEvent::NoteOff | VoiceEvent::Retrigger { .. })
            | (VoiceState::Idle | VoiceState::Playing, VoiceEvent::EnvelopeFinished) => {}
        }
    }

    fn start(&mut self, note: u8, velocity: f32) {
        self.state = VoiceState::Playing;
        self.note = note;
        self.velocity = velocity;
        self.envelope.attack();
        self.countdown = 0;
        self.phase = 0.0;
        self.age = 0;
        self.grains.clear();
        self.region = None;
        self.pending = None;
    }

    /// Renders one block, adding into `left` and `right`.
    pub fn render(&mut self, context: &BlockContext, left: &mut [f32], right: &mut [f32]) {
        if self.is_idle() {
            return;
        }

        let Some(source) = context.source else {
            // Without a buffer the voice is silent, but a release still runs to
            // completion so the voice frees up.
            for _ in 0..left.len().min(right.len()) {
                if self.state == VoiceState::Releasing && self.envelope.advance_release() {
                    self.transition(VoiceEvent::EnvelopeFinished);
                }
                if self.is_idle() {
                    return;
                }
                self.age += 1;
            }
            return;
        };

        self.window.resize(context.grain_length);

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if self.state == VoiceState::Playing && self.countdown == 0 {
                self.birth(context);
                self.countdown = context.trigger_interval;
            }

            let mixed = self.grains.mix(source, &self.window, context.pitch_ratio);
            let sample = mixed * self.velocity * self.envelope.level();
            *l += sample;
            *r += sample;

            self.countdown = self.countdown.saturating_sub(1);
            self.age += 1;

            if self.state == VoiceState::Releasing && self.envelope.advance_release() {
                self.transition(VoiceEvent::EnvelopeFinished);
                if self.is_idle() {
                    return;
                }
            }
        }
    }

    fn birth(&mut self, context: &BlockContext) {
        let (region, span) = context.regions.pick(&mut self.rng);
        // Only a grain that opens a region change fades in.
        let fade_in = if self.region.is_some_and(|current| current != region) {
            self.crossfade_samples
        } else {
            0
        };
        self.region = Some(region);

        self.phase = span.wrap(self.phase);
        let start = span.start as f64 + self.phase;
        self.grains.birth(start, context.grain_length, region, fade_in);
        self.playhead = start;

        self.phase = span.wrap(self.phase + context.grain_length as f64 * context.spacing);
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("note", &self.note)
            .field("velocity", &self.velocity)
            .field("envelope", &self.envelope.level())
            .field("age", &self.age)
            .field("pending", &self.pending)
            .field("grains", &self.grains)
            .finish()
    }
}
