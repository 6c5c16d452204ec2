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
use std::f64::consts::PI;

/// Hann window value at position `i` of an `n`-sample window.
pub fn hann(i: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    (0.5 * (1.0 - (2.0 * PI * i as f64 / (n - 1) as f64).cos())) as f32
}

/// A Hann table sized for the current grain length.
///
/// Storage is reserved for the largest grain up front, so resizing never
/// allocates.
pub struct HannWindow {
    table: Vec<f32>,
    max_len: usize,
}

impl HannWindow {
    pub fn new(max_len: usize) -> Self {
        Self {
            table: Vec::with_capacity(max_len),
            max_len,
        }
    }

    /// The length the table currently holds.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Recomputes the table for length `n` if it differs from the current length.
    pub fn resize(&mut self, n: usize) {
        let n = n.min(self.max_len);
        if n == self.table.len() {
            return;
        }
        self.table.clear();
        self.table.extend((0..n).map(|i| hann(i, n)));
    }

    /// Window value at position `i` of an `n`-sample grain. Grains born before the
    /// last resize fall back to computing the value directly.
    pub fn value(&self, i: usize, n: usize) -> f32 {
        if n == self.table.len() {
            self.table.get(i).copied().unwrap_or(0.0)
        } else {
            hann(i, n)
        }
    }
}

impl std::fmt::Debug for HannWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HannWindow")
            .field("len", &self.table.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}
