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

// Known-invertible GF(2) matrix generator. XORing one of these over the mix
// columns of the check rows guarantees the Gaussian elimination square starts
// at full rank for the encoder's systematic feed.

use crate::{bitmatrix::BitMatrix, rng::WireRng};

// For each 0 < n < 512, the smallest u8 seed whose n x n generated matrix is
// invertible (verified offline against the crate PRNG; roughly 29% of random
// GF(2) matrices are invertible, so most entries are tiny). Entry 0 is
// unused.
#[rustfmt::skip]
const INVERTIBLE_MATRIX_SEEDS: [u8; 512] = [
    0, 0, 2, 2, 0, 0, 0, 5, 6, 2, 6, 2, 2, 1, 2, 2,
    0, 0, 0, 1, 4, 2, 2, 12, 5, 0, 0, 7, 8, 0, 7, 1,
    4, 4, 1, 2, 1, 0, 0, 6, 0, 1, 0, 1, 0, 0, 1, 1,
    1, 1, 2, 3, 4, 3, 2, 2, 3, 1, 1, 0, 0, 7, 4, 3,
    1, 6, 0, 6, 6, 6, 7, 1, 0, 0, 2, 0, 2, 1, 1, 1,
    0, 1, 0, 0, 2, 2, 3, 0, 0, 0, 2, 2, 2, 2, 0, 0,
    0, 0, 2, 5, 5, 8, 0, 0, 2, 1, 0, 0, 0, 4, 4, 2,
    1, 1, 0, 4, 14, 8, 0, 8, 10, 0, 1, 4, 2, 3, 0, 0,
    6, 3, 6, 1, 4, 1, 6, 5, 3, 2, 0, 0, 10, 4, 1, 1,
    1, 0, 1, 3, 3, 1, 1, 1, 0, 1, 5, 5, 0, 1, 0, 0,
    0, 0, 12, 7, 13, 9, 13, 1, 1, 0, 1, 1, 0, 0, 0, 0,
    0, 0, 0, 7, 0, 0, 2, 0, 0, 7, 0, 0, 2, 1, 2, 4,
    4, 1, 1, 4, 0, 0, 4, 2, 1, 5, 1, 3, 3, 6, 9, 1,
    6, 1, 1, 1, 4, 4, 2, 1, 1, 1, 1, 1, 2, 0, 0, 1,
    1, 1, 5, 6, 2, 0, 0, 8, 2, 7, 4, 0, 2, 0, 2, 9,
    7, 0, 3, 1, 3, 2, 11, 5, 1, 1, 1, 2, 1, 9, 0, 0,
    0, 0, 0, 1, 0, 1, 1, 1, 0, 2, 2, 2, 12, 0, 12, 1,
    0, 4, 3, 0, 5, 3, 4, 3, 2, 3, 1, 5, 5, 1, 1, 9,
    2, 7, 7, 4, 5, 8, 5, 7, 8, 0, 0, 0, 3, 4, 12, 4,
    6, 0, 1, 0, 1, 5, 0, 0, 6, 6, 3, 1, 1, 3, 3, 0,
    4, 6, 4, 4, 5, 10, 7, 7, 14, 5, 5, 3, 3, 1, 4, 1,
    0, 4, 4, 1, 1, 3, 1, 1, 0, 2, 2, 0, 3, 2, 0, 2,
    0, 0, 2, 1, 3, 3, 0, 0, 0, 0, 0, 0, 0, 1, 2, 9,
    0, 0, 0, 8, 0, 0, 2, 4, 4, 5, 7, 8, 1, 1, 1, 2,
    3, 4, 4, 4, 0, 5, 0, 1, 0, 0, 0, 1, 1, 1, 4, 6,
    1, 15, 1, 3, 1, 6, 1, 6, 16, 7, 0, 1, 1, 1, 1, 1,
    6, 3, 3, 4, 5, 4, 7, 2, 1, 8, 1, 2, 6, 1, 0, 0,
    0, 0, 1, 1, 0, 4, 1, 2, 5, 0, 0, 0, 0, 1, 4, 0,
    0, 1, 5, 1, 1, 1, 1, 1, 0, 0, 1, 12, 9, 2, 0, 0,
    4, 0, 0, 0, 1, 2, 3, 1, 0, 0, 0, 0, 3, 2, 1, 2,
    5, 3, 6, 0, 2, 1, 1, 2, 2, 2, 1, 0, 5, 5, 0, 12,
    12, 6, 1, 1, 2, 0, 1, 3, 4, 3, 4, 0, 5, 3, 9, 3,
];

/// XOR an invertible n x n matrix into rows [0, n) of `matrix` at column
/// `offset`. For n >= 512 the identity is added instead.
pub fn add_invertible_matrix(matrix: &mut BitMatrix, offset: usize, n: usize) {
    if n == 0 {
        return;
    }

    if n >= 512 {
        for i in 0..n {
            matrix.flip_bit(i, offset + i);
        }
        return;
    }

    let mut rng = WireRng::new(u32::from(INVERTIBLE_MATRIX_SEEDS[n]));
    let words_per_row = n.div_ceil(64);

    for row in 0..n {
        for w in 0..words_per_row {
            let lo = u64::from(rng.next_u32());
            let hi = u64::from(rng.next_u32());
            let mut word = (hi << 32) | lo;

            let bits_left = n - w * 64;
            if bits_left < 64 {
                word &= (1u64 << bits_left) - 1;
            }

            matrix.xor_word_at(row, offset + w * 64, word);
        }
    }
}

#[cfg(test)]
mod test {
    use super::add_invertible_matrix;
    use crate::bitmatrix::BitMatrix;

    fn rank(rows: &mut [u64], n: usize) -> usize {
        let mut rank = 0;
        for col in 0..n {
            let bit = 1u64 << col;
            let Some(piv) = (rank..n).find(|&i| rows[i] & bit != 0) else {
                continue;
            };
            rows.swap(rank, piv);
            for i in 0..n {
                if i != rank && rows[i] & bit != 0 {
                    rows[i] ^= rows[rank];
                }
            }
            rank += 1;
        }
        rank
    }

    // Seed table entries really do generate invertible matrices, checked for
    // every size that fits one u64 row.
    #[test]
    fn small_sizes_are_invertible() {
        for n in 1..=64usize {
            let mut m = BitMatrix::zeroed(n, n);
            add_invertible_matrix(&mut m, 0, n);

            let mut rows: Vec<u64> = (0..n)
                .map(|r| {
                    (0..n).fold(0u64, |acc, c| {
                        acc | (u64::from(m.bit(r, c)) << c)
                    })
                })
                .collect();
            assert_eq!(rank(&mut rows, n), n, "singular matrix for n = {n}");
        }
    }

    #[test]
    fn offset_placement_only_touches_patch_columns() {
        let n = 13;
        let mut m = BitMatrix::zeroed(n, 100);
        add_invertible_matrix(&mut m, 40, n);

        for row in 0..n {
            for col in 0..100 {
                if !(40..40 + n).contains(&col) {
                    assert!(!m.bit(row, col), "stray bit at ({row}, {col})");
                }
            }
        }
    }
}
