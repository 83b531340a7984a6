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

use crate::{
    codec::{Codec, CodecError},
    params::generate_peel_row,
    xor_eq::xor_eq,
};

impl Codec {
    /// Load the message as rows 0..N (zero-padding the final partial block)
    /// and run the full solve so `encode_block` can serve any id.
    pub(crate) fn encode_feed(&mut self, message: &[u8]) -> Result<(), CodecError> {
        debug_assert_eq!(self.extra_count, 0);
        debug_assert!(message.len() <= self.input_blocks.len());

        self.input_blocks[..message.len()].copy_from_slice(message);
        self.input_blocks[message.len()..].fill(0);

        for id in 0..self.block_count {
            if !self.opportunistic_peeling(id as u16, id as u32) {
                return Err(CodecError::RowReferenceOverflow { id: id as u32 });
            }
        }
        self.used_count = self.block_count;

        // The tabulated seeds guarantee the systematic matrix solves; an
        // encoder has no resume path.
        if !self.solve_matrix() {
            return Err(CodecError::NotInvertible);
        }
        self.generate_recovery_blocks();
        self.solved = true;

        Ok(())
    }

    /// Write encoded block `id` into `out`. The first N ids are the message
    /// blocks themselves; every other id is its row shape applied to the
    /// recovery vector.
    pub(crate) fn encode_block(&self, id: u32, out: &mut [u8]) {
        debug_assert!(self.solved);
        assert_eq!(out.len(), self.block_bytes);

        if (id as usize) < self.block_count {
            out.copy_from_slice(self.input_block(id as usize));
            return;
        }

        self.encode_from_recovery(id, out);
    }

    /// Apply row `id`'s shape to the recovery vector: its weight peel
    /// columns plus its three mix columns, all XORed into `out`.
    pub(crate) fn encode_from_recovery(&self, id: u32, out: &mut [u8]) {
        let shape = generate_peel_row(
            id,
            self.p_seed,
            self.block_count as u16,
            self.added_count as u16,
        );

        let mut x = shape.peel_x0;
        out.copy_from_slice(self.recovery_block(usize::from(x)));
        for _ in 1..shape.weight {
            x = self.next_peel_column(x, shape.peel_a);
            xor_eq(out, self.recovery_block(usize::from(x)));
        }

        let mut mix_x = shape.mix_x0;
        for _ in 0..3 {
            xor_eq(out, self.recovery_block(self.block_count + usize::from(mix_x)));
            mix_x = self.next_mix_column(mix_x, shape.mix_a);
        }
    }
}
