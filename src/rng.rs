// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

// The deterministic 32-bit generator behind every wire-visible random choice:
// row shapes, dense-row membership, deck shuffles, and the invertibility
// patch. Both peers regenerate the same matrix from the same id, so the
// output stream is a wire contract. It is pinned by the golden vectors below
// and must never change.

const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// SplitMix64 truncated to its high 32 bits per draw.
#[derive(Clone, Debug)]
pub struct WireRng {
    state: u64,
}

impl WireRng {
    pub fn new(seed: u32) -> WireRng {
        WireRng::with_key(seed, 0)
    }

    // Two-word seeding packs both words into the initial state; `new(x)` is
    // `with_key(x, 0)`.
    pub fn with_key(x: u32, y: u32) -> WireRng {
        WireRng {
            state: mix64((u64::from(y) << 32) | u64::from(x)),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GAMMA);
        (mix64(self.state) >> 32) as u32
    }
}

#[cfg(test)]
mod test {
    use super::WireRng;

    // Golden vectors generated once from the reference stream. A failure
    // here means the wire contract changed.
    #[test]
    fn golden_streams() {
        #[rustfmt::skip]
        let cases: &[(u32, u32, [u32; 8])] = &[
            (0, 0, [3793791033, 1853398634, 113532184, 4169906344, 456755562, 1405853452, 746756798, 3313767226]),
            (1, 0, [3220144176, 1599417572, 1882415043, 4097900091, 867839785, 2558803784, 1957514276, 798629651]),
            (0xDEADBEEF, 0, [664407730, 4011566591, 933431293, 2010508518, 3271118818, 1783544902, 1088991745, 2148997992]),
            (12345, 678910, [2729760803, 430785855, 3911194072, 1925074904, 3908127504, 2064105414, 338667377, 2806138819]),
            (u32::MAX, u32::MAX, [2776070187, 3028624451, 1366726749, 122719827, 3566797001, 240017074, 2025683278, 3324925522]),
        ];

        for (x, y, expect) in cases {
            let mut rng = WireRng::with_key(*x, *y);
            let got: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
            assert_eq!(got, expect, "stream mismatch for seed ({x}, {y})");
        }
    }

    #[test]
    fn single_seed_matches_two_word_form() {
        let mut a = WireRng::new(0xC0FFEE);
        let mut b = WireRng::with_key(0xC0FFEE, 0);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }
}
