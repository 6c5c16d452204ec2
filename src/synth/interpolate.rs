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

/// Reads `data` at a fractional position with linear interpolation. Positions
/// wrap at both ends of the buffer, including the neighbour of the last frame.
pub fn read_linear(data: &[f32], position: f64) -> f32 {
    let len = data.len();
    if len == 0 || !position.is_finite() {
        return 0.0;
    }

    let wrapped = position.rem_euclid(len as f64);
    // rem_euclid can round up to exactly `len` for tiny negative inputs.
    let index = (wrapped.floor() as usize).min(len - 1);
    let frac = (wrapped - index as f64) as f32;

    let s0 = data[index];
    let s1 = data[(index + 1) % len];
    s0 + (s1 - s0) * frac
}
