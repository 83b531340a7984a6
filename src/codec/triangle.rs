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

// Phase 3: Gaussian elimination over the compressed square. Rows move only
// through the `pivots` permutation; elimination masks off the bits below
// each pivot so a row keeps the record of which earlier pivot values it
// absorbed (substitution replays that record against block values).
//
// Failing to find a pivot is not an error: the decoder parks at
// `resume_pivot` and admits one more row at a time until the stuck column
// gets its pivot.

use crate::{
    codec::{block_at_mut, Codec, Mark},
    params::generate_peel_row,
};

impl Codec {
    /// Run peeling deferral, compression, and triangulation once N rows are
    /// in hand. Returns false if elimination stalled waiting for more rows.
    pub(crate) fn solve_matrix(&mut self) -> bool {
        self.greedy_peeling();

        self.allocate_matrix();
        self.set_deferred_columns();
        self.set_mixing_columns_for_deferred_rows();
        self.peel_diagonal();
        self.copy_deferred_rows();
        self.multiply_dense_rows();
        self.add_invertibility_patch();

        self.triangle()
    }

    /// Put the GE square in upper-triangular form under the pivot
    /// permutation. On failure `resume_pivot` names the first column with no
    /// pivot.
    pub(crate) fn triangle(&mut self) -> bool {
        for i in 0..self.ge_cols {
            self.pivots[i] = i as u16;
        }

        for pivot_i in 0..self.ge_cols {
            if !self.find_pivot(pivot_i) {
                self.resume_pivot = pivot_i;
                tracing::debug!(
                    pivot = pivot_i,
                    of = self.ge_cols,
                    "no pivot found; waiting for more rows"
                );
                return false;
            }
        }

        true
    }

    // Find a remaining row with `pivot_i` set, promote it, and eliminate the
    // bit from every row below it.
    fn find_pivot(&mut self, pivot_i: usize) -> bool {
        for pivot_j in pivot_i..self.ge_rows {
            let ge_row_j = usize::from(self.pivots[pivot_j]);
            if !self.ge.bit(ge_row_j, pivot_i) {
                continue;
            }

            self.pivots.swap(pivot_i, pivot_j);

            for pivot_k in pivot_j + 1..self.ge_rows {
                let ge_row_k = usize::from(self.pivots[pivot_k]);
                if self.ge.bit(ge_row_k, pivot_i) {
                    self.ge.eliminate_row(ge_row_k, ge_row_j, pivot_i);
                }
            }

            return true;
        }

        false
    }

    /// Admit one more received row into the stalled elimination. Returns true
    /// if the matrix is now fully triangular.
    pub(crate) fn resume_solve_matrix(&mut self, id: u32, block: &[u8]) -> bool {
        // Choose a GE row slot: append while spare rows remain, otherwise
        // overwrite a non-pivot row beyond the stuck column. Check rows carry
        // constraint equations and must never be displaced.
        let (ge_row_i, row_i, slot) =
            if self.used_count >= self.block_count + self.extra_count {
                let slot = (self.resume_pivot..self.ge_rows)
                    .find(|&p| usize::from(self.pivots[p]) >= self.added_count)
                    .expect("every stalled matrix keeps a non-check row past the resume pivot");
                let ge_row_i = usize::from(self.pivots[slot]);
                (ge_row_i, usize::from(self.ge_row_map[ge_row_i]), slot)
            } else {
                let ge_row_i = self.ge_rows;
                self.ge_rows += 1;
                let row_i = self.used_count;
                self.used_count += 1;
                self.pivots[ge_row_i] = ge_row_i as u16;
                self.ge_row_map[ge_row_i] = row_i as u16;
                (ge_row_i, row_i, ge_row_i)
            };

        tracing::debug!(id, ge_row = ge_row_i, slot, "resuming elimination with new row");

        let shape = generate_peel_row(
            id,
            self.p_seed,
            self.block_count as u16,
            self.added_count as u16,
        );
        {
            let row = &mut self.rows[row_i];
            row.id = id;
            row.peel_weight = shape.weight;
            row.peel_a = shape.peel_a;
            row.peel_x0 = shape.peel_x0;
            row.mix_a = shape.mix_a;
            row.mix_x0 = shape.mix_x0;
        }
        block_at_mut(&mut self.input_blocks, self.block_bytes, row_i).copy_from_slice(block);

        // Rebuild the row's dense image: mix bits, then peeled-column images
        // or deferred-column bits.
        self.ge.clear_row(ge_row_i);
        let mut x = shape.mix_x0;
        for _ in 0..3 {
            self.ge.flip_bit(ge_row_i, self.defer_count + usize::from(x));
            x = self.next_mix_column(x, shape.mix_a);
        }

        let mut weight = shape.weight;
        let mut x = shape.peel_x0;
        loop {
            let col = &self.cols[usize::from(x)];
            if col.mark == Mark::Peeled {
                self.ge
                    .xor_row_from(ge_row_i, &self.compress, usize::from(col.peel_row));
            } else {
                self.ge.flip_bit(ge_row_i, usize::from(col.ge_column));
            }

            weight -= 1;
            if weight == 0 {
                break;
            }
            x = self.next_peel_column(x, shape.peel_a);
        }

        // Replay the elimination schedule for the columns already solved.
        for pivot_j in 0..self.resume_pivot {
            if self.ge.bit(ge_row_i, pivot_j) {
                let pivot_row = usize::from(self.pivots[pivot_j]);
                self.ge.eliminate_row(ge_row_i, pivot_row, pivot_j);
            }
        }

        if !self.ge.bit(ge_row_i, self.resume_pivot) {
            // No new rank at the stuck column; the row stays parked in its
            // slot for a later attempt.
            return false;
        }

        // Promote the new row to the stuck pivot and keep triangulating.
        self.pivots.swap(slot, self.resume_pivot);

        for pivot_i in self.resume_pivot + 1..self.ge_cols {
            if !self.find_pivot(pivot_i) {
                self.resume_pivot = pivot_i;
                tracing::debug!(
                    pivot = pivot_i,
                    of = self.ge_cols,
                    "still underdetermined; waiting for more rows"
                );
                return false;
            }
        }

        true
    }
}
