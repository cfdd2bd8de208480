// Floe: Orchestration for a Parallel Discrete-Event Network Simulator
// Copyright (C) 2026  The Floe Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Reversible per-LP random streams.
//!
//! Reverse computation requires that every random draw a forward handler
//! makes can be undone and later replayed bit-identically. The stream keeps
//! every unit draw it ever produced in a replay cache: a forward draw past
//! the high-water mark generates a fresh value, a reverse step just moves the
//! cursor back, and a replayed draw returns the cached value.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A seeded random stream with exact rewind.
#[derive(Debug, Clone)]
pub struct ReversibleRng {
    rng: StdRng,
    cache: Vec<f64>,
    pos: usize,
}

impl ReversibleRng {
    /// Create a stream from a seed.
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), cache: Vec::new(), pos: 0 }
    }

    /// Draw a uniform value in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let unit = if self.pos < self.cache.len() {
            self.cache[self.pos]
        } else {
            let unit: f64 = self.rng.gen();
            self.cache.push(unit);
            unit
        };
        self.pos += 1;
        low + unit * (high - low)
    }

    /// Undo the most recent draw. Panics if the stream is at its origin,
    /// which means a reverse handler consumed more draws than its forward
    /// counterpart.
    pub fn reverse(&mut self) {
        assert!(self.pos > 0, "random stream reversed past its origin");
        self.pos -= 1;
    }

    /// The number of draws currently consumed (the stream position).
    pub fn position(&self) -> usize {
        self.pos
    }
}
