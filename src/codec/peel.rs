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

// Phase 1: peeling. Opportunistic peeling classifies each arriving row by
// how many of its columns are still unmarked; solving a column cascades
// through every row that references it. Greedy deferral then sets aside the
// columns peeling could not solve, feeding the cascade until every column is
// marked.

use crate::{
    codec::{Codec, Mark, LIST_TERM, REF_LIST_MAX},
    params::{generate_peel_row, iterate_next_column},
};

impl Codec {
    pub(crate) fn next_peel_column(&self, x: u16, a: u16) -> u16 {
        iterate_next_column(x, self.block_count as u16, self.block_next_prime, a)
    }

    pub(crate) fn next_mix_column(&self, x: u16, a: u16) -> u16 {
        iterate_next_column(x, self.added_count as u16, self.added_next_prime, a)
    }

    pub(crate) fn next_light_column(&self, x: u16, a: u16) -> u16 {
        iterate_next_column(x, self.light_count, self.light_next_prime, a)
    }

    /// Generate row `id` into slot `row_i`, register its column references,
    /// and classify it. Returns false (leaving no trace of the row) if a
    /// column's reference list would overflow.
    pub(crate) fn opportunistic_peeling(&mut self, row_i: u16, id: u32) -> bool {
        let shape = generate_peel_row(
            id,
            self.p_seed,
            self.block_count as u16,
            self.added_count as u16,
        );

        {
            let row = &mut self.rows[usize::from(row_i)];
            row.id = id;
            row.peel_weight = shape.weight;
            row.peel_a = shape.peel_a;
            row.peel_x0 = shape.peel_x0;
            row.mix_a = shape.mix_a;
            row.mix_x0 = shape.mix_x0;
            row.peel_column = LIST_TERM;
            row.is_copied = false;
        }

        tracing::trace!(id, row = row_i, weight = shape.weight, "row received");

        let mut unmarked_count: u16 = 0;
        let mut unmarked = [0u16; 2];
        let mut weight = shape.weight;
        let mut x = shape.peel_x0;
        let mut walked: u16 = 0;
        let mut overflow = false;

        loop {
            let refs = &mut self.refs[usize::from(x)];
            if usize::from(refs.count) >= REF_LIST_MAX {
                overflow = true;
                break;
            }
            refs.rows[usize::from(refs.count)] = row_i;
            refs.count += 1;
            walked += 1;

            if self.cols[usize::from(x)].mark == Mark::Todo {
                unmarked[usize::from(unmarked_count & 1)] = x;
                unmarked_count += 1;
            }

            weight -= 1;
            if weight == 0 {
                break;
            }
            x = self.next_peel_column(x, shape.peel_a);
        }

        if overflow {
            // Unregister the references appended so far; this row was pushed
            // last on each list.
            let mut x = shape.peel_x0;
            for step in 0..walked {
                let refs = &mut self.refs[usize::from(x)];
                refs.count -= 1;
                debug_assert_eq!(refs.rows[usize::from(refs.count)], row_i);
                if step + 1 < walked {
                    x = self.next_peel_column(x, shape.peel_a);
                }
            }
            tracing::debug!(id, "row dropped: column reference list overflow");
            return false;
        }

        self.rows[usize::from(row_i)].unmarked_count = unmarked_count;

        match unmarked_count {
            0 => {
                // Nothing left to solve with this row; park it for Gaussian
                // elimination.
                self.rows[usize::from(row_i)].next = self.defer_head_rows;
                self.defer_head_rows = row_i;
            }
            1 => self.peel(row_i, unmarked[0]),
            2 => {
                self.rows[usize::from(row_i)].unmarked = unmarked;
                self.cols[usize::from(unmarked[0])].w2_refs += 1;
                self.cols[usize::from(unmarked[1])].w2_refs += 1;
            }
            _ => {}
        }

        true
    }

    // Mark `column_i` solved by `row_i` and append the row to the peeled
    // list. The list order is the solve order; substitution replays it.
    fn mark_peeled(&mut self, row_i: u16, column_i: u16) {
        tracing::trace!(row = row_i, column = column_i, "peeled");

        let col = &mut self.cols[usize::from(column_i)];
        col.mark = Mark::Peeled;
        col.peel_row = row_i;

        let row = &mut self.rows[usize::from(row_i)];
        row.peel_column = column_i;
        row.next = LIST_TERM;
        row.is_copied = false;

        if self.peel_tail_rows != LIST_TERM {
            self.rows[usize::from(self.peel_tail_rows)].next = row_i;
        } else {
            self.peel_head_rows = row_i;
        }
        self.peel_tail_rows = row_i;
    }

    fn mark_deferred_row(&mut self, row_i: u16) {
        self.rows[usize::from(row_i)].next = self.defer_head_rows;
        self.defer_head_rows = row_i;
    }

    /// Solve `column_i` with `row_i` and run the avalanche it triggers.
    pub(crate) fn peel(&mut self, row_i: u16, column_i: u16) {
        self.mark_peeled(row_i, column_i);
        self.peel_avalanche(column_i);
    }

    // Walk every row referencing the newly marked column and reduce its
    // unmarked count. The explicit stack reproduces recursive order: a column
    // solved mid-walk has its own cascade run before the current column's
    // remaining references.
    pub(crate) fn peel_avalanche(&mut self, column_i: u16) {
        let mut stack = std::mem::take(&mut self.peel_stack);
        stack.clear();
        stack.push((column_i, 0));

        while let Some(&(col_i, ref_i)) = stack.last() {
            if usize::from(ref_i) >= usize::from(self.refs[usize::from(col_i)].count) {
                stack.pop();
                continue;
            }
            stack.last_mut().unwrap().1 = ref_i + 1;

            let row_i = self.refs[usize::from(col_i)].rows[usize::from(ref_i)];
            let unmarked_count = {
                let row = &mut self.rows[usize::from(row_i)];
                row.unmarked_count = row.unmarked_count.saturating_sub(1);
                row.unmarked_count
            };

            match unmarked_count {
                1 => {
                    // The weight-2 memo usually names the remaining column.
                    let memo = self.rows[usize::from(row_i)].unmarked;
                    let mut other = memo[0];
                    if other == col_i {
                        other = memo[1];
                    }

                    if self.cols[usize::from(other)].mark == Mark::Todo {
                        self.mark_peeled(row_i, other);
                        stack.push((other, 0));
                    } else if let Some(found) = self.rescan_single_unmarked(row_i) {
                        // Memo went stale; the re-walk found the survivor.
                        self.mark_peeled(row_i, found);
                        stack.push((found, 0));
                    } else {
                        self.rows[usize::from(row_i)].unmarked_count = 0;
                        self.mark_deferred_row(row_i);
                    }
                }
                2 => {
                    // Re-walk the shape to refresh the memo. The re-scan also
                    // bumps w2_refs on each unmarked column it finds, which
                    // feeds the greedy deferral heuristic.
                    let found = self.rescan_two_unmarked(row_i);
                    if found <= 1 {
                        // The count was stale; settle the row now and keep
                        // the enclosing cascade from touching it again.
                        self.rows[usize::from(row_i)].unmarked_count = 0;
                        if found == 1 {
                            let column = self.rows[usize::from(row_i)].unmarked[0];
                            self.mark_peeled(row_i, column);
                            stack.push((column, 0));
                        } else {
                            self.mark_deferred_row(row_i);
                        }
                    }
                }
                _ => {}
            }
        }

        self.peel_stack = stack;
    }

    // Re-walk a row's columns looking for the single remaining Todo column.
    fn rescan_single_unmarked(&self, row_i: u16) -> Option<u16> {
        let row = &self.rows[usize::from(row_i)];
        let mut weight = row.peel_weight;
        let mut x = row.peel_x0;
        loop {
            if self.cols[usize::from(x)].mark == Mark::Todo {
                return Some(x);
            }
            weight -= 1;
            if weight == 0 {
                return None;
            }
            x = self.next_peel_column(x, row.peel_a);
        }
    }

    // Re-walk a row's columns refreshing the two-column memo, incrementing
    // w2_refs on every Todo column found. Returns how many were found.
    fn rescan_two_unmarked(&mut self, row_i: u16) -> u16 {
        let (weight, x0, a) = {
            let row = &self.rows[usize::from(row_i)];
            (row.peel_weight, row.peel_x0, row.peel_a)
        };

        let mut found: u16 = 0;
        let mut weight = weight;
        let mut x = x0;
        loop {
            if self.cols[usize::from(x)].mark == Mark::Todo {
                if found < 2 {
                    self.rows[usize::from(row_i)].unmarked[usize::from(found)] = x;
                }
                found += 1;
                self.cols[usize::from(x)].w2_refs += 1;
            }
            weight -= 1;
            if weight == 0 {
                break;
            }
            x = self.next_peel_column(x, a);
        }

        found
    }

    /// After all N rows arrived: repeatedly defer the unmarked column with
    /// the most weight-2 references (ties broken towards the most referenced,
    /// then the highest index) and let the avalanche peel what that unlocks.
    pub(crate) fn greedy_peeling(&mut self) {
        self.defer_head_columns = LIST_TERM;
        self.defer_count = 0;

        loop {
            let mut best = LIST_TERM;
            let mut best_w2: u16 = 0;
            let mut best_refs: u16 = 0;

            for column_i in 0..self.block_count {
                let col = &self.cols[column_i];
                if col.mark != Mark::Todo {
                    continue;
                }
                let w2 = col.w2_refs;
                if w2 >= best_w2 {
                    let ref_count = self.refs[column_i].count;
                    if w2 > best_w2 || ref_count >= best_refs {
                        best = column_i as u16;
                        best_w2 = w2;
                        best_refs = ref_count;
                    }
                }
            }

            if best == LIST_TERM {
                break;
            }

            tracing::trace!(column = best, w2_refs = best_w2, "deferring column");

            let col = &mut self.cols[usize::from(best)];
            col.mark = Mark::Deferred;
            col.next = self.defer_head_columns;
            self.defer_head_columns = best;
            self.defer_count += 1;

            self.peel_avalanche(best);
        }

        self.check_peeling();
    }
}
