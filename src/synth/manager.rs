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
use super::context::{BlockContext, VoiceSettings};
use super::voice::{Voice, VoiceEvent, VoiceState};

/// Owns the voice pool and routes note events to it.
pub struct VoiceManager {
    voices: Box<[Voice]>,
}

impl VoiceManager {
    /// Creates a pool of `size` idle voices.
    pub fn new(size: usize, settings: &VoiceSettings, seed: u64) -> Self {
        Self {
            voices: (0..size.max(1))
                .map(|index| Voice::new(index, settings, seed))
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Number of voices that are not idle.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_idle()).count()
    }

    /// Starts a note. In mono mode voice 0 retriggers if it is playing. In poly
    /// mode a voice already playing the note is restarted, then a free voice is
    /// used, then the oldest voice is stolen.
    pub fn note_on(&mut self, note: u8, velocity: f32, mono: bool) {
        if mono {
            let voice = &mut self.voices[0];
            if voice.state() == VoiceState::Playing {
                voice.transition(VoiceEvent::Retrigger { note, velocity });
            } else {
                voice.transition(VoiceEvent::NoteOn { note, velocity });
            }
            return;
        }

        // A note already waiting on a stolen voice just updates its velocity.
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.pending().is_some_and(|p| p.note == note))
        {
            voice.transition(VoiceEvent::Steal { note, velocity });
            return;
        }

        if let Some(voice) = self.voices.iter_mut().find(|v| v.is_playing(note)) {
            voice.transition(VoiceEvent::Steal { note, velocity });
            return;
        }

        if let Some(voice) = self.voices.iter_mut().find(|v| v.is_idle()) {
            voice.transition(VoiceEvent::NoteOn { note, velocity });
            return;
        }

        // Oldest first; on a tie the lowest index wins.
        let oldest = self
            .voices
            .iter()
            .enumerate()
            .max_by(|(a_index, a), (b_index, b)| {
                a.age().cmp(&b.age()).then_with(|| b_index.cmp(a_index))
            })
            .map(|(index, _)| index)
            .unwrap_or(0);
        self.voices[oldest].transition(VoiceEvent::Steal { note, velocity });
    }

    /// Releases a note. Mono mode always releases voice 0.
    pub fn note_off(&mut self, note: u8, mono: bool) {
        if mono {
            self.voices[0].transition(VoiceEvent::NoteOff);
            return;
        }

        if let Some(voice) = self.voices.iter_mut().find(|v| v.is_playing(note)) {
            voice.transition(VoiceEvent::NoteOff);
            return;
        }

        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.pending().is_some_and(|p| p.note == note))
        {
            voice.transition(VoiceEvent::CancelPending);
        }
    }

    /// Releases every sounding voice and drops queued notes.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut().filter(|v| !v.is_idle()) {
            voice.transition(VoiceEvent::CancelPending);
            voice.transition(VoiceEvent::NoteOff);
        }
    }

    /// Renders every non-idle voice into `left` and `right`.
    pub fn render(&mut self, context: &BlockContext, left: &mut [f32], right: &mut [f32]) {
        for voice in self.voices.iter_mut().filter(|v| !v.is_idle()) {
            voice.render(context, left, right);
        }
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("size", &self.voices.len())
            .field("active", &self.active_count())
            .finish()
    }
}
