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
use midly::live::LiveEvent;
use midly::MidiMessage;

/// MIDI controller number for All Notes Off.
const ALL_NOTES_OFF_CONTROLLER: u8 = 123;

/// A note event for the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoteEvent {
    /// Start a note. Velocity is normalized to 0..1.
    NoteOn { note: u8, velocity: f32 },
    /// Release a note.
    NoteOff { note: u8 },
    /// Release every sounding voice.
    AllNotesOff,
}

impl NoteEvent {
    /// Creates a note-on, clamping velocity to 0..1.
    pub fn note_on(note: u8, velocity: f32) -> Self {
        NoteEvent::NoteOn {
            note,
            velocity: if velocity.is_finite() {
                velocity.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn note_off(note: u8) -> Self {
        NoteEvent::NoteOff { note }
    }

    /// Converts a parsed MIDI event. Messages the engine does not act on yield None.
    pub fn from_live_event(event: &LiveEvent) -> Option<Self> {
        let LiveEvent::Midi { message, .. } = event else {
            return None;
        };

        match *message {
            // Note On with a velocity of 0 is a Note Off.
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
                Some(NoteEvent::note_off(key.as_int()))
            }
            MidiMessage::NoteOn { key, vel } => Some(NoteEvent::note_on(
                key.as_int(),
                vel.as_int() as f32 / 127.0,
            )),
            MidiMessage::NoteOff { key, .. } => Some(NoteEvent::note_off(key.as_int())),
            MidiMessage::Controller { controller, .. }
                if controller.as_int() == ALL_NOTES_OFF_CONTROLLER =>
            {
                Some(NoteEvent::AllNotesOff)
            }
            _ => None,
        }
    }

    /// Parses raw MIDI bytes.
    pub fn from_midi(raw: &[u8]) -> Option<Self> {
        LiveEvent::parse(raw)
            .ok()
            .and_then(|event| Self::from_live_event(&event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        assert_eq!(
            NoteEvent::from_midi(&[0x90, 60, 127]),
            Some(NoteEvent::NoteOn {
                note: 60,
                velocity: 1.0
            })
        );
        // Channel is ignored.
        assert!(matches!(
            NoteEvent::from_midi(&[0x95, 64, 64]),
            Some(NoteEvent::NoteOn { note: 64, .. })
        ));
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        assert_eq!(
            NoteEvent::from_midi(&[0x90, 60, 0]),
            Some(NoteEvent::NoteOff { note: 60 })
        );
    }

    #[test]
    fn test_note_off() {
        assert_eq!(
            NoteEvent::from_midi(&[0x80, 61, 40]),
            Some(NoteEvent::NoteOff { note: 61 })
        );
    }

    #[test]
    fn test_all_notes_off() {
        assert_eq!(
            NoteEvent::from_midi(&[0xB0, 123, 0]),
            Some(NoteEvent::AllNotesOff)
        );
        assert_eq!(NoteEvent::from_midi(&[0xB0, 7, 100]), None);
    }

    #[test]
    fn test_ignored_and_invalid() {
        assert_eq!(NoteEvent::from_midi(&[0xE0, 0, 64]), None);
        assert_eq!(NoteEvent::from_midi(&[]), None);
    }

    #[test]
    fn test_velocity_clamped() {
        assert_eq!(
            NoteEvent::note_on(60, 2.0),
            NoteEvent::NoteOn {
                note: 60,
                velocity: 1.0
            }
        );
        assert_eq!(
            NoteEvent::note_on(60, f32::NAN),
            NoteEvent::NoteOn {
                note: 60,
                velocity: 0.0
            }
        );
    }
}
