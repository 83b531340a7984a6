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

// Phase 4: substitution. Pivot columns get their right-hand sides, check
// pivots absorb the dense-row block sums, the lower then upper triangles are
// folded in, and finally the peeled rows reconstruct their solved columns in
// the original peel order.

use crate::{
    codec::{block_at, block_at_mut, block_pair_mut, Codec, Mark, LIST_TERM},
    rng::WireRng,
    shuffle::shuffle_deck16,
    xor_eq::{xor_eq, xor_eq_add, xor_eq_set},
};

// Window widths for back-substitution, chosen by remaining pivot count.
const WINDOW_THRESHOLD_4: usize = 24;
const WINDOW_THRESHOLD_5: usize = 45;
const WINDOW_THRESHOLD_6: usize = 70;
const WINDOW_THRESHOLD_7: usize = 135;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Combo {
    Unused,
    First(usize),
    Accumulating,
}

impl Codec {
    /// Produce the recovery blocks after a successful triangulation.
    pub(crate) fn generate_recovery_blocks(&mut self) {
        self.initialize_column_values();
        self.add_check_values();
        self.add_subdiagonal_values();
        self.back_substitute_above_diagonal();
        self.substitute();
    }

    /// Seed every pivot column's value: zero for check-row pivots (their
    /// right-hand side is zero by construction), otherwise the pivot row's
    /// input block combined with each already-solved peeled column the row
    /// references. The first XOR is fused with the input copy.
    pub(crate) fn initialize_column_values(&mut self) {
        let m = self.block_bytes;
        self.check_dest.fill(LIST_TERM);

        for pivot_i in 0..self.ge_cols {
            let column_i = usize::from(self.ge_col_map[pivot_i]);
            let ge_row_i = usize::from(self.pivots[pivot_i]);

            if ge_row_i < self.added_count {
                self.recovery_block_mut(column_i).fill(0);
                self.check_dest[ge_row_i] = column_i as u16;
                self.row_ops += 1;
                continue;
            }

            let pivot_row_i = usize::from(self.ge_row_map[ge_row_i]);
            let (mut weight, mut x, a) = {
                let row = &self.rows[pivot_row_i];
                (row.peel_weight, row.peel_x0, row.peel_a)
            };

            let mut combo = true;
            loop {
                if self.cols[usize::from(x)].mark == Mark::Peeled {
                    let (dst, src) = block_pair_mut(
                        &mut self.recovery_blocks,
                        m,
                        column_i,
                        usize::from(x),
                    );
                    if combo {
                        xor_eq_set(dst, src, block_at(&self.input_blocks, m, pivot_row_i));
                        combo = false;
                    } else {
                        xor_eq(dst, src);
                    }
                    self.row_ops += 1;
                }

                weight -= 1;
                if weight == 0 {
                    break;
                }
                x = self.next_peel_column(x, a);
            }

            if combo {
                block_at_mut(&mut self.recovery_blocks, m, column_i)
                    .copy_from_slice(block_at(&self.input_blocks, m, pivot_row_i));
            }
        }
    }

    // temp ^= recovery[b0] / recovery[b1] for whichever of the window pair is
    // a peeled column.
    fn check_value_flip(&mut self, temp: usize, b0: usize, b1: usize) {
        let p0 = self.cols[b0].mark == Mark::Peeled;
        let p1 = self.cols[b1].mark == Mark::Peeled;

        if p0 && p1 {
            let (dst, a, b) = self.recovery_triple_mut(temp, b0, b1);
            xor_eq_add(dst, a, b);
        } else if p0 {
            let (dst, src) = self.recovery_pair_mut(temp, b0);
            xor_eq(dst, src);
        } else if p1 {
            let (dst, src) = self.recovery_pair_mut(temp, b1);
            xor_eq(dst, src);
        } else {
            return;
        }
        self.row_ops += 1;
    }

    // Install the accumulated window value into the check row's solution
    // column, if that check row is a pivot.
    fn check_value_store(&mut self, temp: usize, check_row: u16) {
        let dest = self.check_dest[usize::from(check_row)];
        if dest != LIST_TERM {
            let (dst, src) = self.recovery_pair_mut(usize::from(dest), temp);
            xor_eq(dst, src);
            self.row_ops += 1;
        }
    }

    /// Replay the dense-row recipe over block values: every check row's
    /// solution column absorbs the XOR of the original-column blocks that
    /// row was built to sum. The PRNG draw cadence matches the matrix-side
    /// construction exactly.
    pub(crate) fn add_check_values(&mut self) {
        let m = self.block_bytes;
        let mut rng = WireRng::new(self.c_seed);
        let h = self.added_count;
        let temp = self.block_count + h;

        let mut rows_deck = vec![0u16; h];
        let mut bits_deck = vec![0u16; h];

        let mut column_i = 0usize;
        while column_i + h <= self.block_count {
            shuffle_deck16(&mut rng, &mut rows_deck);
            shuffle_deck16(&mut rng, &mut bits_deck);

            let set_count = (h + 1) >> 1;
            let loop_count = h >> 1;

            // First row: combine the peeled columns of the set half, fusing
            // the first copy with the first XOR.
            let mut combo = Combo::Unused;
            self.row_ops += 1;
            for k in 0..set_count {
                let c = column_i + usize::from(bits_deck[k]);
                if self.cols[c].mark != Mark::Peeled {
                    continue;
                }
                match combo {
                    Combo::Unused => combo = Combo::First(c),
                    Combo::First(first) => {
                        let (dst, a, b) = self.recovery_triple_mut(temp, first, c);
                        xor_eq_set(dst, a, b);
                        self.row_ops += 1;
                        combo = Combo::Accumulating;
                    }
                    Combo::Accumulating => {
                        let (dst, src) = self.recovery_pair_mut(temp, c);
                        xor_eq(dst, src);
                        self.row_ops += 1;
                    }
                }
            }

            let mut ri = 0usize;
            match combo {
                Combo::Unused => {
                    self.recovery_block_mut(temp).fill(0);
                }
                _ => {
                    if let Combo::First(first) = combo {
                        let (dst, src) = self.recovery_pair_mut(temp, first);
                        dst.copy_from_slice(src);
                        self.row_ops += 1;
                    }
                    self.check_value_store(temp, rows_deck[ri]);
                }
            }
            ri += 1;

            for ii in 0..loop_count {
                self.check_value_flip(
                    temp,
                    column_i + usize::from(bits_deck[ii]),
                    column_i + usize::from(bits_deck[set_count + ii]),
                );
                self.check_value_store(temp, rows_deck[ri]);
                ri += 1;
            }

            if h & 1 == 1 {
                let c = column_i + usize::from(bits_deck[loop_count]);
                if self.cols[c].mark == Mark::Peeled {
                    let (dst, src) = self.recovery_pair_mut(temp, c);
                    xor_eq(dst, src);
                    self.row_ops += 1;
                }
                self.check_value_store(temp, rows_deck[ri]);
                ri += 1;
            }

            for ii in 0..loop_count.saturating_sub(1) {
                self.check_value_flip(
                    temp,
                    column_i + usize::from(bits_deck[ii]),
                    column_i + usize::from(bits_deck[set_count + ii]),
                );
                self.check_value_store(temp, rows_deck[ri]);
                ri += 1;
            }

            column_i += h;
        }

        // Tail columns: only peeled columns carry block values; their
        // contributions land on the light-walk rows and the dense-membership
        // rows.
        while column_i < self.block_count {
            let dense_rv = rng.next_u32();
            let light = usize::from(self.light_count);
            let mut x = (column_i % light) as u16;
            let a = (1 + (column_i / light) % (light - 1)) as u16;

            if self.cols[column_i].mark == Mark::Peeled {
                for _ in 0..3 {
                    let dest = self.check_dest[usize::from(x)];
                    if dest != LIST_TERM {
                        let (dst, src) =
                            self.recovery_pair_mut(usize::from(dest), column_i);
                        xor_eq(dst, src);
                        self.row_ops += 1;
                    }
                    x = self.next_light_column(x, a);
                }

                for dense_i in 0..usize::from(self.dense_count).min(32) {
                    if dense_rv >> dense_i & 1 != 0 {
                        let dest = self.check_dest[light + dense_i];
                        if dest != LIST_TERM {
                            let (dst, src) =
                                self.recovery_pair_mut(usize::from(dest), column_i);
                            xor_eq(dst, src);
                            self.row_ops += 1;
                        }
                    }
                }
            }

            column_i += 1;
        }
    }

    /// Fold each pivot's dependency record (the sub-diagonal bits the masked
    /// elimination left in place) into its value.
    pub(crate) fn add_subdiagonal_values(&mut self) {
        for pivot_i in 0..self.ge_cols {
            let column_i = usize::from(self.ge_col_map[pivot_i]);
            let ge_row_i = usize::from(self.pivots[pivot_i]);

            for q in 0..pivot_i {
                if self.ge.bit(ge_row_i, q) {
                    let src = usize::from(self.ge_col_map[q]);
                    let (dst, s) = self.recovery_pair_mut(column_i, src);
                    xor_eq(dst, s);
                    self.row_ops += 1;
                }
            }
        }
    }

    /// Diagonalize the upper triangle. Large remainders go through windowed
    /// back-substitution: diagonalize a w-pivot block, build the 2^w table of
    /// its block combinations, then clear each row above with a single table
    /// XOR per window.
    pub(crate) fn back_substitute_above_diagonal(&mut self) {
        let mut pivot_i = self.ge_cols as isize - 1;

        if pivot_i >= WINDOW_THRESHOLD_5 as isize {
            let (mut w, mut next_check) = if pivot_i >= WINDOW_THRESHOLD_7 as isize {
                (7usize, WINDOW_THRESHOLD_7)
            } else if pivot_i >= WINDOW_THRESHOLD_6 as isize {
                (6, WINDOW_THRESHOLD_6)
            } else {
                (5, WINDOW_THRESHOLD_5)
            };
            let mut win_lim = 1usize << w;

            // Scratch for the composite table entries comes from peeled
            // recovery slots. Their compression-phase values are fully
            // absorbed into the pivots by now and the final substitution
            // pass rewrites every one of them afterwards, so clobbering them
            // here is safe. The power-of-two entries are overwritten below
            // with the window pivots themselves.
            let mut win_table = [0u16; 128];
            let mut jj = 1usize;
            for column_i in 0..self.block_count {
                if self.cols[column_i].mark == Mark::Peeled {
                    win_table[jj] = column_i as u16;
                    jj += 1;
                    if jj >= win_lim {
                        break;
                    }
                }
            }

            if jj >= win_lim {
                loop {
                    let backsub_i = (pivot_i as usize) - w + 1;

                    // Diagonalize the w-pivot block naively.
                    for src_pivot in (backsub_i + 1..=pivot_i as usize).rev() {
                        let src_col = usize::from(self.ge_col_map[src_pivot]);
                        for dest_pivot in backsub_i..src_pivot {
                            let dest_row = usize::from(self.pivots[dest_pivot]);
                            if self.ge.bit(dest_row, src_pivot) {
                                let dst_col = usize::from(self.ge_col_map[dest_pivot]);
                                let (dst, src) = self.recovery_pair_mut(dst_col, src_col);
                                xor_eq(dst, src);
                                self.row_ops += 1;
                            }
                        }
                    }

                    self.build_window_table(&mut win_table, backsub_i, w);

                    // Clear the window columns from every pivot row above.
                    for above in 0..backsub_i {
                        let ge_row = usize::from(self.pivots[above]);
                        let bits =
                            self.ge.window_bits(ge_row, backsub_i, w) as usize;
                        if bits != 0 {
                            let dst = usize::from(self.ge_col_map[above]);
                            let src = usize::from(win_table[bits]);
                            let (d, s) = self.recovery_pair_mut(dst, src);
                            xor_eq(d, s);
                            self.row_ops += 1;
                        }
                    }

                    pivot_i -= w as isize;
                    if pivot_i < next_check as isize {
                        if pivot_i >= WINDOW_THRESHOLD_6 as isize {
                            (w, next_check) = (6, WINDOW_THRESHOLD_6);
                        } else if pivot_i >= WINDOW_THRESHOLD_5 as isize {
                            (w, next_check) = (5, WINDOW_THRESHOLD_5);
                        } else if pivot_i >= WINDOW_THRESHOLD_4 as isize {
                            (w, next_check) = (4, WINDOW_THRESHOLD_4);
                        } else {
                            break;
                        }
                        win_lim = 1 << w;
                    }
                }
            }
        }

        // Naive back-substitution over whatever remains.
        while pivot_i >= 0 {
            let src_col = usize::from(self.ge_col_map[pivot_i as usize]);

            for above in 0..pivot_i as usize {
                let ge_row = usize::from(self.pivots[above]);
                if self.ge.bit(ge_row, pivot_i as usize) {
                    let dst = usize::from(self.ge_col_map[above]);
                    let (d, s) = self.recovery_pair_mut(dst, src_col);
                    xor_eq(d, s);
                    self.row_ops += 1;
                }
            }

            pivot_i -= 1;
        }
    }

    // Fill the 2^w window table: entry k holds the XOR of the window-pivot
    // blocks selected by the bits of k. Power-of-two entries alias the pivot
    // columns directly; composites go to peeled-slot scratch.
    fn build_window_table(&mut self, win_table: &mut [u16; 128], backsub_i: usize, w: usize) {
        win_table[1] = self.ge_col_map[backsub_i];
        win_table[2] = self.ge_col_map[backsub_i + 1];
        self.table_combine(win_table, 3, 1, 2);
        self.row_ops += 1;

        win_table[4] = self.ge_col_map[backsub_i + 2];
        self.table_combine(win_table, 5, 1, 4);
        self.table_combine(win_table, 6, 2, 4);
        self.table_combine(win_table, 7, 1, 6);
        self.row_ops += 3;

        win_table[8] = self.ge_col_map[backsub_i + 3];
        for ii in 1..8 {
            self.table_combine(win_table, 8 + ii, ii, 8);
        }
        self.row_ops += 7;

        if w >= 5 {
            win_table[16] = self.ge_col_map[backsub_i + 4];
            for ii in 1..16 {
                self.table_combine(win_table, 16 + ii, ii, 16);
            }
            self.row_ops += 15;

            if w >= 6 {
                win_table[32] = self.ge_col_map[backsub_i + 5];
                for ii in 1..32 {
                    self.table_combine(win_table, 32 + ii, ii, 32);
                }
                self.row_ops += 31;

                if w >= 7 {
                    win_table[64] = self.ge_col_map[backsub_i + 6];
                    for ii in 1..64 {
                        self.table_combine(win_table, 64 + ii, ii, 64);
                    }
                    self.row_ops += 63;
                }
            }
        }
    }

    fn table_combine(&mut self, win_table: &[u16; 128], dst: usize, a: usize, b: usize) {
        let (d, x, y) = self.recovery_triple_mut(
            usize::from(win_table[dst]),
            usize::from(win_table[a]),
            usize::from(win_table[b]),
        );
        xor_eq_set(d, x, y);
    }

    /// Rebuild each peeled row's solved column in peel order: input block,
    /// three mix blocks, and the row's other peel columns (all solved by
    /// now; the topological peel order guarantees it).
    pub(crate) fn substitute(&mut self) {
        let m = self.block_bytes;

        let mut row_i = self.peel_head_rows;
        while row_i != LIST_TERM {
            let (dest_col, weight, peel_a, peel_x0, mix_a, mix_x0, next) = {
                let row = &self.rows[usize::from(row_i)];
                (
                    usize::from(row.peel_column),
                    row.peel_weight,
                    row.peel_a,
                    row.peel_x0,
                    row.mix_a,
                    row.mix_x0,
                    row.next,
                )
            };

            let mix0 = self.block_count + usize::from(mix_x0);
            let x1 = self.next_mix_column(mix_x0, mix_a);
            let mix1 = self.block_count + usize::from(x1);
            let x2 = self.next_mix_column(x1, mix_a);
            let mix2 = self.block_count + usize::from(x2);

            {
                let (dst, src) =
                    block_pair_mut(&mut self.recovery_blocks, m, dest_col, mix0);
                xor_eq_set(dst, src, block_at(&self.input_blocks, m, usize::from(row_i)));
            }
            self.row_ops += 1;

            {
                let (dst, a, b) = self.recovery_triple_mut(dest_col, mix1, mix2);
                xor_eq_add(dst, a, b);
            }
            self.row_ops += 1;

            if weight >= 2 {
                let col0 = peel_x0;
                let col1 = self.next_peel_column(col0, peel_a);

                if usize::from(col0) != dest_col {
                    if usize::from(col1) != dest_col {
                        let (dst, a, b) = self.recovery_triple_mut(
                            dest_col,
                            usize::from(col0),
                            usize::from(col1),
                        );
                        xor_eq_add(dst, a, b);
                    } else {
                        let (dst, src) = self.recovery_pair_mut(dest_col, usize::from(col0));
                        xor_eq(dst, src);
                    }
                } else {
                    let (dst, src) = self.recovery_pair_mut(dest_col, usize::from(col1));
                    xor_eq(dst, src);
                }
                self.row_ops += 1;

                let mut remaining = weight - 2;
                let mut x = col1;
                while remaining > 0 {
                    x = self.next_peel_column(x, peel_a);
                    if usize::from(x) != dest_col {
                        let (dst, src) = self.recovery_pair_mut(dest_col, usize::from(x));
                        xor_eq(dst, src);
                        self.row_ops += 1;
                    }
                    remaining -= 1;
                }
            }

            row_i = next;
        }
    }
}
