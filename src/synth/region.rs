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
use rand::Rng;

use crate::params::{RegionData, MAX_REGIONS};

/// A resolved region in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn full(frames: usize) -> Self {
        Self {
            start: 0,
            len: frames,
        }
    }

    /// Resolves a normalized region against a buffer of `frames`. Inverted regions
    /// and regions shorter than `min_span` frames widen to the whole buffer.
    pub fn resolve(region: &RegionData, frames: usize, min_span: usize) -> Self {
        if frames == 0 {
            return Self::full(0);
        }

        let start = region.start.clamp(0.0, 1.0) as f64;
        let end = region.end.clamp(0.0, 1.0) as f64;
        let span = (end - start) * frames as f64;
        if span.is_nan() || span < min_span.max(1) as f64 {
            return Self::full(frames);
        }

        let first = ((start * frames as f64).floor() as usize).min(frames - 1);
        let len = (span.round() as usize).clamp(1, frames - first);
        Self { start: first, len }
    }

    /// Wraps a phase into this span's length.
    pub fn wrap(&self, phase: f64) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let wrapped = phase.rem_euclid(self.len as f64);
        if wrapped >= self.len as f64 {
            0.0
        } else {
            wrapped
        }
    }
}

/// The regions one block plays from, resolved against the current buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionMap {
    spans: [Span; MAX_REGIONS],
    enabled: [usize; MAX_REGIONS],
    enabled_count: usize,
    full: Span,
}

impl RegionMap {
    pub fn resolve(regions: &[RegionData; MAX_REGIONS], frames: usize, min_span: usize) -> Self {
        let mut enabled = [0; MAX_REGIONS];
        let mut enabled_count = 0;
        for (index, region) in regions.iter().enumerate() {
            if region.enabled {
                enabled[enabled_count] = index;
                enabled_count += 1;
            }
        }

        Self {
            spans: regions.map(|region| Span::resolve(&region, frames, min_span)),
            enabled,
            enabled_count,
            full: Span::full(frames),
        }
    }

    /// A map with no buffer behind it.
    pub fn empty() -> Self {
        Self::resolve(&[RegionData::full_disabled(); MAX_REGIONS], 0, 0)
    }

    /// The indices of enabled regions.
    pub fn enabled(&self) -> &[usize] {
        &self.enabled[..self.enabled_count]
    }

    pub fn span(&self, index: usize) -> Span {
        self.spans.get(index).copied().unwrap_or(self.full)
    }

    /// Picks the region the next grain is born from: uniformly among enabled
    /// regions, or the whole buffer (as region 0) when none are enabled.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> (usize, Span) {
        match self.enabled() {
            [] => (0, self.full),
            [only] => (*only, self.spans[*only]),
            enabled => {
                let index = enabled[rng.gen_range(0..enabled.len())];
                (index, self.spans[index])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn regions(list: &[(f32, f32, bool)]) -> [RegionData; MAX_REGIONS] {
        let mut regions = [RegionData::full_disabled(); MAX_REGIONS];
        for (slot, (start, end, enabled)) in regions.iter_mut().zip(list) {
            *slot = RegionData::new(*start, *end, *enabled);
        }
        regions
    }

    #[test]
    fn test_resolve() {
        let span = Span::resolve(&RegionData::new(0.25, 0.5, true), 44100, 441);
        assert_eq!(span, Span { start: 11025, len: 11025 });
    }

    #[test]
    fn test_short_region_uses_full_buffer() {
        // 0.005 of a second, below a 10ms minimum at 44.1k.
        let span = Span::resolve(&RegionData::new(0.5, 0.505, true), 44100, 441);
        assert_eq!(span, Span::full(44100));
    }

    #[test]
    fn test_inverted_region_uses_full_buffer() {
        let span = Span::resolve(&RegionData::new(0.8, 0.2, true), 44100, 441);
        assert_eq!(span, Span::full(44100));
    }

    #[test]
    fn test_no_enabled_region_uses_full_buffer() {
        let map = RegionMap::resolve(&regions(&[(0.1, 0.2, false)]), 1000, 10);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(map.pick(&mut rng), (0, Span::full(1000)));
    }

    #[test]
    fn test_pick_single() {
        let map = RegionMap::resolve(
            &regions(&[(0.0, 1.0, false), (0.5, 1.0, true)]),
            1000,
            10,
        );
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(map.pick(&mut rng), (1, Span { start: 500, len: 500 }));
        }
    }

    #[test]
    fn test_pick_among_enabled() {
        let map = RegionMap::resolve(
            &regions(&[
                (0.0, 0.2, true),
                (0.2, 0.4, false),
                (0.4, 0.6, true),
                (0.6, 0.8, true),
            ]),
            1000,
            10,
        );
        assert_eq!(map.enabled(), &[0, 2, 3]);

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [0; MAX_REGIONS];
        for _ in 0..300 {
            let (index, span) = map.pick(&mut rng);
            assert_eq!(span, map.span(index));
            seen[index] += 1;
        }
        assert_eq!(seen[1], 0);
        assert_eq!(seen[4], 0);
        assert!(seen[0] > 0 && seen[2] > 0 && seen[3] > 0);
    }

    #[test]
    fn test_wrap() {
        let span = Span { start: 100, len: 50 };
        assert_eq!(span.wrap(0.0), 0.0);
        assert_eq!(span.wrap(60.0), 10.0);
        assert_eq!(span.wrap(-10.0), 40.0);
        assert_eq!(Span::full(0).wrap(12.0), 0.0);
    }

    #[test]
    fn test_empty_map() {
        let map = RegionMap::empty();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(map.pick(&mut rng), (0, Span::full(0)));
    }
}
