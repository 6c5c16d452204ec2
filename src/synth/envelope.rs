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

/// Amplitude envelope: instant attack, linear release to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    level: f32,
    /// Level when the current release started.
    release_from: f32,
    /// Samples elapsed in the current release.
    elapsed: usize,
    /// Length of a release in samples.
    release_samples: usize,
}

impl Envelope {
    pub fn new(release_samples: usize) -> Self {
        Self {
            level: 0.0,
            release_from: 0.0,
            elapsed: 0,
            release_samples: release_samples.max(1),
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn release_samples(&self) -> usize {
        self.release_samples
    }

    /// Jumps to full level.
    pub fn attack(&mut self) {
        self.level = 1.0;
        self.elapsed = 0;
    }

    /// Starts a release ramp from the current level.
    pub fn release(&mut self) {
        self.release_from = self.level;
        self.elapsed = 0;
    }

    /// Advances the release by one sample. Returns true once the level is zero.
    pub fn advance_release(&mut self) -> bool {
        self.elapsed = (self.elapsed + 1).min(self.release_samples);
        if self.elapsed >= self.release_samples {
            self.level = 0.0;
            return true;
        }
        let remaining = 1.0 - self.elapsed as f32 / self.release_samples as f32;
        self.level = self.release_from * remaining;
        false
    }

    /// Drops straight to silence.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.release_from = 0.0;
        self.elapsed = 0;
    }
}
