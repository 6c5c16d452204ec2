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

//! Voice playhead positions for display.
//!
//! The audio thread writes once per block; any other thread may read at any
//! time. Values are independent relaxed atomics, so a reader can see fields
//! from two different blocks.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// A voice's playhead as last published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayheadPosition {
    pub voice: usize,
    /// Position in the source, 0..1.
    pub position: f32,
    pub region: usize,
    pub active: bool,
}

#[derive(Default)]
struct Slot {
    position: AtomicU32,
    region: AtomicUsize,
    active: AtomicBool,
}

pub struct PlayheadMonitor {
    slots: Box<[Slot]>,
}

impl PlayheadMonitor {
    pub fn new(voices: usize) -> Self {
        Self {
            slots: (0..voices).map(|_| Slot::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Publishes a voice's playhead. Unknown voice indices are ignored.
    pub fn update(&self, voice: usize, position: f32, region: usize, active: bool) {
        if let Some(slot) = self.slots.get(voice) {
            slot.position
                .store(position.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
            slot.region.store(region, Ordering::Relaxed);
            slot.active.store(active, Ordering::Relaxed);
        }
    }

    pub fn get(&self, voice: usize) -> Option<PlayheadPosition> {
        self.slots.get(voice).map(|slot| PlayheadPosition {
            voice,
            position: f32::from_bits(slot.position.load(Ordering::Relaxed)),
            region: slot.region.load(Ordering::Relaxed),
            active: slot.active.load(Ordering::Relaxed),
        })
    }

    /// Every voice's playhead.
    pub fn positions(&self) -> Vec<PlayheadPosition> {
        (0..self.slots.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Playheads of voices that are sounding.
    pub fn active(&self) -> Vec<PlayheadPosition> {
        self.positions().into_iter().filter(|p| p.active).collect()
    }
}

impl std::fmt::Debug for PlayheadMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayheadMonitor")
            .field("voices", &self.slots.len())
            .field("active", &self.active().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_read() {
        let monitor = PlayheadMonitor::new(4);
        monitor.update(2, 0.25, 3, true);

        assert_eq!(
            monitor.get(2),
            Some(PlayheadPosition {
                voice: 2,
                position: 0.25,
                region: 3,
                active: true
            })
        );
        assert_eq!(monitor.active().len(), 1);
        assert_eq!(monitor.positions().len(), 4);
    }

    #[test]
    fn test_out_of_range() {
        let monitor = PlayheadMonitor::new(1);
        monitor.update(5, 0.5, 0, true);
        assert_eq!(monitor.get(5), None);
        assert!(monitor.active().is_empty());
    }

    #[test]
    fn test_position_clamped() {
        let monitor = PlayheadMonitor::new(1);
        monitor.update(0, 1.5, 0, true);
        assert_eq!(monitor.get(0).map(|p| p.position), Some(1.0));
    }
}
