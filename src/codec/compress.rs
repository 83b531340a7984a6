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

// Phase 2: compression. Inverting the (conceptually lower-triangular) peeled
// submatrix makes the deferred and mix columns of every row dense; those
// dense images accumulate in the compression matrix, deferred rows lift into
// the GE matrix, and the H check rows are generated on top. After this phase
// the GE square is ready for elimination and every peeled recovery slot
// holds its row's partially-combined block value.

use crate::{
    codec::{block_at, block_at_mut, block_pair_mut, Codec, Mark, LIST_TERM},
    invertible::add_invertible_matrix,
    rng::WireRng,
    shuffle::shuffle_deck16,
    xor_eq::{xor_eq, xor_eq_set},
};

impl Codec {
    /// Assign each deferred column its GE column (in deferred-list order,
    /// which makes the deferred part of the GE square roughly triangular)
    /// and project its row references into the compression matrix.
    pub(crate) fn set_deferred_columns(&mut self) {
        let mut ge_column: u16 = 0;
        let mut defer_i = self.defer_head_columns;
        while defer_i != LIST_TERM {
            for k in 0..usize::from(self.refs[usize::from(defer_i)].count) {
                let row_i = self.refs[usize::from(defer_i)].rows[k];
                self.compress
                    .flip_bit(usize::from(row_i), usize::from(ge_column));
            }

            self.ge_col_map[usize::from(ge_column)] = defer_i;
            let col = &mut self.cols[usize::from(defer_i)];
            col.ge_column = ge_column;

            defer_i = col.next;
            ge_column += 1;
        }

        for added_i in 0..self.added_count {
            self.ge_col_map[self.defer_count + added_i] =
                (self.block_count + added_i) as u16;
        }
    }

    /// Deferred rows never went through the peel bookkeeping, so their mix
    /// bits are implanted here.
    pub(crate) fn set_mixing_columns_for_deferred_rows(&mut self) {
        let mut row_i = self.defer_head_rows;
        while row_i != LIST_TERM {
            let (mix_a, mut x, next) = {
                let row = &mut self.rows[usize::from(row_i)];
                row.peel_column = LIST_TERM;
                (row.mix_a, row.mix_x0, row.next)
            };

            for _ in 0..3 {
                self.compress
                    .flip_bit(usize::from(row_i), self.defer_count + usize::from(x));
                x = self.next_mix_column(x, mix_a);
            }

            row_i = next;
        }
    }

    /// Walk the peeled rows in solve order, eliminating each solved column
    /// from every row that references it. Block values combine as the matrix
    /// does: a row's input block is folded in lazily on first touch
    /// (`is_copied`), fusing the copy and the first XOR.
    pub(crate) fn peel_diagonal(&mut self) {
        let m = self.block_bytes;

        let mut row_i = self.peel_head_rows;
        while row_i != LIST_TERM {
            let (peel_column, mix_a, mut x, next) = {
                let row = &self.rows[usize::from(row_i)];
                (
                    usize::from(row.peel_column),
                    row.mix_a,
                    row.mix_x0,
                    row.next,
                )
            };

            for _ in 0..3 {
                self.compress
                    .flip_bit(usize::from(row_i), self.defer_count + usize::from(x));
                x = self.next_mix_column(x, mix_a);
            }

            if !self.rows[usize::from(row_i)].is_copied {
                // First touch of this row's value; no earlier row referenced
                // it, so a plain copy seeds the slot.
                let dst = block_at_mut(&mut self.recovery_blocks, m, peel_column);
                dst.copy_from_slice(block_at(&self.input_blocks, m, usize::from(row_i)));
                self.row_ops += 1;
            }

            for k in 0..usize::from(self.refs[peel_column].count) {
                let ref_row_i = self.refs[peel_column].rows[k];
                if ref_row_i == row_i {
                    continue;
                }

                self.compress
                    .xor_rows(usize::from(ref_row_i), usize::from(row_i));

                let ref_column = self.rows[usize::from(ref_row_i)].peel_column;
                if ref_column == LIST_TERM {
                    continue;
                }

                let (dst, src) = block_pair_mut(
                    &mut self.recovery_blocks,
                    m,
                    usize::from(ref_column),
                    peel_column,
                );
                if self.rows[usize::from(ref_row_i)].is_copied {
                    xor_eq(dst, src);
                } else {
                    // Fuse the row's own input copy with this contribution.
                    xor_eq_set(
                        dst,
                        src,
                        block_at(&self.input_blocks, m, usize::from(ref_row_i)),
                    );
                    self.rows[usize::from(ref_row_i)].is_copied = true;
                }
                self.row_ops += 1;
            }

            row_i = next;
        }
    }

    /// Lift each deferred row's compressed image into the GE matrix below
    /// the check rows.
    pub(crate) fn copy_deferred_rows(&mut self) {
        let mut ge_row_i = self.added_count;
        let mut row_i = self.defer_head_rows;
        while row_i != LIST_TERM {
            self.ge
                .copy_row_from(ge_row_i, &self.compress, usize::from(row_i));
            self.ge_row_map[ge_row_i] = row_i;

            ge_row_i += 1;
            row_i = self.rows[usize::from(row_i)].next;
        }
    }

    // The image of an original column in GE space: the compressed row of its
    // solver if peeled, a single deferred-column bit otherwise.
    fn xor_column_image(&mut self, ge_row: usize, column_i: usize) {
        let col = &self.cols[column_i];
        if col.mark == Mark::Peeled {
            self.ge
                .xor_row_from(ge_row, &self.compress, usize::from(col.peel_row));
        } else {
            self.ge.flip_bit(ge_row, usize::from(col.ge_column));
        }
    }

    /// Generate the H check rows. Full windows of H columns use the shuffled
    /// low-Hamming-difference construction: the first row takes half the
    /// window's columns, every following row flips one column in and one
    /// out, and the row order is shuffled separately. Leftover columns fall
    /// back to three light-row contributions via the stride walk plus one
    /// PRNG word of dense-row membership.
    pub(crate) fn multiply_dense_rows(&mut self) {
        let mut rng = WireRng::new(self.c_seed);
        let h = self.added_count;
        let temp_row = self.ge.nrows() - 1;

        let mut rows_deck = vec![0u16; h];
        let mut bits_deck = vec![0u16; h];

        let mut column_i = 0usize;
        while column_i + h <= self.block_count {
            shuffle_deck16(&mut rng, &mut rows_deck);
            shuffle_deck16(&mut rng, &mut bits_deck);

            let set_count = (h + 1) >> 1;
            let loop_count = h >> 1;

            self.ge.clear_row(temp_row);
            for k in 0..set_count {
                self.xor_column_image(temp_row, column_i + usize::from(bits_deck[k]));
            }

            let mut ri = 0usize;
            self.ge.xor_rows(usize::from(rows_deck[ri]), temp_row);
            ri += 1;

            for ii in 0..loop_count {
                self.xor_column_image(temp_row, column_i + usize::from(bits_deck[ii]));
                self.xor_column_image(
                    temp_row,
                    column_i + usize::from(bits_deck[set_count + ii]),
                );
                self.ge.xor_rows(usize::from(rows_deck[ri]), temp_row);
                ri += 1;
            }

            if h & 1 == 1 {
                self.xor_column_image(
                    temp_row,
                    column_i + usize::from(bits_deck[loop_count]),
                );
                self.ge.xor_rows(usize::from(rows_deck[ri]), temp_row);
                ri += 1;
            }

            for ii in 0..loop_count.saturating_sub(1) {
                self.xor_column_image(temp_row, column_i + usize::from(bits_deck[ii]));
                self.xor_column_image(
                    temp_row,
                    column_i + usize::from(bits_deck[set_count + ii]),
                );
                self.ge.xor_rows(usize::from(rows_deck[ri]), temp_row);
                ri += 1;
            }

            column_i += h;
        }

        // Tail columns that don't fill a window.
        while column_i < self.block_count {
            let dense_rv = rng.next_u32();
            let light = usize::from(self.light_count);
            let mut x = (column_i % light) as u16;
            let a = (1 + (column_i / light) % (light - 1)) as u16;

            for _ in 0..3 {
                self.xor_column_image(usize::from(x), column_i);
                x = self.next_light_column(x, a);
            }

            for dense_i in 0..usize::from(self.dense_count).min(32) {
                if dense_rv >> dense_i & 1 != 0 {
                    self.xor_column_image(light + dense_i, column_i);
                }
            }

            column_i += 1;
        }
    }

    /// Patch a known-invertible H x H matrix over the mix columns of the
    /// check rows so the elimination square starts at full rank.
    pub(crate) fn add_invertibility_patch(&mut self) {
        add_invertible_matrix(&mut self.ge, self.defer_count, self.added_count);
    }
}
