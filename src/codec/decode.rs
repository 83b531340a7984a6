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

use bitvec::prelude::*;

use crate::codec::{block_at_mut, Codec, CodecError, FeedOutcome};

impl Codec {
    /// Accept one received (id, block) pair. The first N rows peel
    /// opportunistically; the N-th triggers the full solve; every later row
    /// re-enters Gaussian elimination at the stuck pivot. Rows may arrive in
    /// any order and duplicate ids are tolerated (they add no rank).
    pub(crate) fn decode_feed(
        &mut self,
        id: u32,
        block: &[u8],
    ) -> Result<FeedOutcome, CodecError> {
        if block.len() != self.block_bytes {
            return Err(CodecError::BlockSizeMismatch {
                expected: self.block_bytes,
                actual: block.len(),
            });
        }

        if self.solved {
            return Ok(FeedOutcome::Solved);
        }

        if self.used_count < self.block_count {
            let row_i = self.used_count;
            if !self.opportunistic_peeling(row_i as u16, id) {
                // The row is dropped but the codec stays usable.
                return Err(CodecError::RowReferenceOverflow { id });
            }

            block_at_mut(&mut self.input_blocks, self.block_bytes, row_i)
                .copy_from_slice(block);
            self.used_count += 1;

            if self.used_count == self.block_count {
                if self.solve_matrix() {
                    self.generate_recovery_blocks();
                    self.solved = true;
                    return Ok(FeedOutcome::Solved);
                }
            }

            return Ok(FeedOutcome::NeedMoreBlocks);
        }

        if self.resume_solve_matrix(id, block) {
            self.generate_recovery_blocks();
            self.solved = true;
            return Ok(FeedOutcome::Solved);
        }

        Ok(FeedOutcome::NeedMoreBlocks)
    }

    /// Reassemble the message after a successful solve: copy every received
    /// original row into place, regenerate the rest from the recovery
    /// vector, and trim the final block to the message length.
    pub(crate) fn reconstruct_output(&self) -> Option<Vec<u8>> {
        if !self.solved {
            return None;
        }

        let m = self.block_bytes;
        let n = self.block_count;
        let mut out = vec![0u8; n * m];
        let mut copied = bitvec![0; n];

        for row_i in 0..self.used_count {
            let id = self.rows[row_i].id as usize;
            if id < n && !copied[id] {
                block_at_mut(&mut out, m, id).copy_from_slice(self.input_block(row_i));
                copied.set(id, true);
            }
        }

        for id in 0..n {
            if !copied[id] {
                self.encode_from_recovery(id as u32, block_at_mut(&mut out, m, id));
            }
        }

        out.truncate((n - 1) * m + self.output_final_bytes);
        Some(out)
    }
}
