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
use super::interpolate::read_linear;
use super::window::HannWindow;

/// One windowed fragment being read out of the source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Grain {
    /// Absolute start offset into the source, fixed at birth.
    start: f64,
    /// Samples played so far.
    read_pos: usize,
    /// Samples left to play.
    remaining: usize,
    /// Total length in samples.
    length: usize,
    /// Region the grain was born from.
    region: usize,
    /// Birth order within the pool. Larger is younger.
    born: u64,
    /// Samples over which the grain ramps in from silence. Zero for no ramp.
    fade_in: usize,
}

impl Grain {
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Gain applied to the next sample.
    pub fn fade(&self) -> f32 {
        if self.read_pos >= self.fade_in {
            1.0
        } else {
            self.read_pos as f32 / self.fade_in as f32
        }
    }

    /// Produces the next windowed sample and advances. Returns 0 once finished.
    pub fn next_sample(&mut self, source: &[f32], window: &HannWindow, pitch_ratio: f64) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }

        let position = self.start + self.read_pos as f64 * pitch_ratio;
        let sample = read_linear(source, position)
            * window.value(self.read_pos, self.length)
            * self.fade();

        self.read_pos += 1;
        self.remaining -= 1;
        sample
    }
}

/// A fixed set of grain slots owned by one voice.
pub struct GrainPool {
    grains: Box<[Grain]>,
    births: u64,
}

impl GrainPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            grains: vec![Grain::default(); capacity.max(1)].into_boxed_slice(),
            births: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.grains.len()
    }

    pub fn active_count(&self) -> usize {
        self.grains.iter().filter(|g| g.is_active()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Grain> {
        self.grains.iter()
    }

    /// Starts a grain in a free slot, or over the oldest grain if every slot is busy.
    ///
    /// A non-zero `fade_in` ramps the new grain's gain from 0 to 1 over that many
    /// samples. Grains already in flight are left alone.
    pub fn birth(&mut self, start: f64, length: usize, region: usize, fade_in: usize) {
        let slot = match self.grains.iter().position(|g| !g.is_active()) {
            Some(free) => free,
            None => self
                .grains
                .iter()
                .enumerate()
                .min_by_key(|(_, g)| g.born)
                .map(|(index, _)| index)
                .unwrap_or(0),
        };

        self.births += 1;
        self.grains[slot] = Grain {
            start,
            read_pos: 0,
            remaining: length,
            length,
            region,
            born: self.births,
            fade_in,
        };
    }

    /// Mixes one sample from every active grain.
    pub fn mix(&mut self, source: &[f32], window: &HannWindow, pitch_ratio: f64) -> f32 {
        self.grains
            .iter_mut()
            .filter(|g| g.is_active())
            .map(|grain| grain.next_sample(source, window, pitch_ratio))
            .sum()
    }

    /// Deactivates every grain.
    pub fn clear(&mut self) {
        self.grains.iter_mut().for_each(|g| g.remaining = 0);
    }
}

impl std::fmt::Debug for GrainPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrainPool")
            .field("capacity", &self.grains.len())
            .field("active", &self.active_count())
            .finish()
    }
}
