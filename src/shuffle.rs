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

use crate::rng::WireRng;

// Fisher-Yates with modulo-by-i indices. The dense-row window construction
// regenerates these decks on both sides of the wire, so the draw cadence is
// contractual: decks of up to 256 entries consume one 32-bit draw per four
// entries (byte indices), larger decks one draw per two entries (16-bit
// indices).

/// Fill `deck` with a permutation of 0..deck.len().
pub fn shuffle_deck16(rng: &mut WireRng, deck: &mut [u16]) {
    assert!(!deck.is_empty());
    assert!(deck.len() <= usize::from(u16::MAX));

    deck[0] = 0;
    let count = deck.len() as u32;

    fn swap(deck: &mut [u16], ii: u32, jj: u32) {
        deck[ii as usize] = deck[jj as usize];
        deck[jj as usize] = ii as u16;
    }

    if count <= 256 {
        let mut ii: u32 = 1;
        loop {
            let rv = rng.next_u32();
            match count - ii {
                0 => return,
                1 => {
                    let jj = ((rv >> 16) & 0xFF) % ii;
                    swap(deck, ii, jj);
                    return;
                }
                2 => {
                    for shift in [8, 16] {
                        let jj = ((rv >> shift) & 0xFF) % ii;
                        swap(deck, ii, jj);
                        ii += 1;
                    }
                    return;
                }
                3 => {
                    for shift in [0, 8, 16] {
                        let jj = ((rv >> shift) & 0xFF) % ii;
                        swap(deck, ii, jj);
                        ii += 1;
                    }
                    return;
                }
                _ => {
                    for shift in [0, 8, 16, 24] {
                        let jj = ((rv >> shift) & 0xFF) % ii;
                        swap(deck, ii, jj);
                        ii += 1;
                    }
                }
            }
        }
    } else {
        let mut ii: u32 = 1;
        loop {
            let rv = rng.next_u32();
            match count - ii {
                0 => return,
                1 => {
                    let jj = (rv & 0xFFFF) % ii;
                    swap(deck, ii, jj);
                    return;
                }
                _ => {
                    for shift in [0, 16] {
                        let jj = ((rv >> shift) & 0xFFFF) % ii;
                        swap(deck, ii, jj);
                        ii += 1;
                    }
                }
            }
        }
    }
}
