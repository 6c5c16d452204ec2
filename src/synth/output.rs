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

/// Samples above this magnitude are passed through `tanh`.
pub const SOFT_LIMIT_THRESHOLD: f32 = 0.95;

/// Pool-size normalization followed by a soft limiter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputStage {
    gain: f32,
}

impl OutputStage {
    pub fn new(pool_size: usize) -> Self {
        Self {
            gain: 1.0 / (pool_size.max(1) as f32).sqrt(),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Processes one sample.
    #[inline]
    pub fn apply(&self, sample: f32) -> f32 {
        let scaled = sample * self.gain;
        if scaled.abs() > SOFT_LIMIT_THRESHOLD {
            scaled.tanh()
        } else {
            scaled
        }
    }

    /// Processes a block in place.
    pub fn process(&self, left: &mut [f32], right: &mut [f32]) {
        for sample in left.iter_mut().chain(right.iter_mut()) {
            *sample = self.apply(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_for_sixteen_voices() {
        let stage = OutputStage::new(16);
        assert_eq!(stage.gain(), 0.25);
        assert_eq!(stage.apply(2.0), 0.5);
        assert_eq!(stage.apply(-3.6), -0.9);
    }

    #[test]
    fn test_limits_above_threshold() {
        let stage = OutputStage::new(16);
        for v in [4.0_f32, 8.0, 16.0, -6.0] {
            let result = stage.apply(v);
            assert_eq!(result, (v / 4.0).tanh());
            assert!(result.abs() < 1.0);
        }
    }

    #[test]
    fn test_process_block() {
        let stage = OutputStage::new(4);
        let mut left = vec![1.0, 0.0, 10.0];
        let mut right = vec![-1.0, 0.5, 0.0];
        stage.process(&mut left, &mut right);

        assert_eq!(left, vec![0.5, 0.0, 5.0_f32.tanh()]);
        assert_eq!(right, vec![-0.5, 0.25, 0.0]);
    }
}
