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
    bitmatrix::BitMatrix,
    codec::{Codec, CodecError, PeelColumn, PeelRefs, PeelRow, LIST_TERM},
    params::CodeParameters,
    prime::next_prime16,
};

impl Codec {
    /// Derive the code geometry for a message of `message_bytes` split into
    /// `block_bytes` blocks and allocate the peeling workspace. `extra_count`
    /// is the decoder's resume headroom; the encoder passes zero.
    pub(crate) fn new(
        message_bytes: usize,
        block_bytes: usize,
        extra_count: usize,
    ) -> Result<Codec, CodecError> {
        if message_bytes == 0 || block_bytes == 0 {
            return Err(CodecError::EmptyInput);
        }

        let block_count = message_bytes.div_ceil(block_bytes);
        let params = CodeParameters::lookup(block_count)
            .ok_or(CodecError::UnsupportedBlockCount { block_count })?;
        let CodeParameters {
            p_seed,
            c_seed,
            light_count,
            dense_count,
        } = params;

        let added_count = usize::from(light_count) + usize::from(dense_count);

        let mut output_final_bytes = message_bytes % block_bytes;
        if output_final_bytes == 0 {
            output_final_bytes = block_bytes;
        }

        let codec = Codec {
            block_bytes,
            block_count,
            block_next_prime: next_prime16(block_count as u16),
            light_count,
            light_next_prime: next_prime16(light_count),
            dense_count,
            added_count,
            added_next_prime: next_prime16(added_count as u16),
            p_seed,
            c_seed,
            extra_count,
            output_final_bytes,

            rows: vec![PeelRow::new(); block_count + extra_count],
            cols: vec![PeelColumn::new(); block_count],
            refs: vec![PeelRefs::new(); block_count],
            peel_head_rows: LIST_TERM,
            peel_tail_rows: LIST_TERM,
            defer_head_rows: LIST_TERM,
            defer_head_columns: LIST_TERM,
            defer_count: 0,
            used_count: 0,
            peel_stack: Vec::new(),

            ge: BitMatrix::empty(),
            compress: BitMatrix::empty(),
            ge_cols: 0,
            ge_rows: 0,
            pivots: Vec::new(),
            ge_row_map: Vec::new(),
            ge_col_map: Vec::new(),
            check_dest: Vec::new(),
            resume_pivot: 0,

            input_blocks: vec![0; (block_count + extra_count) * block_bytes],
            recovery_blocks: vec![0; (block_count + added_count + 1) * block_bytes],

            row_ops: 0,
            solved: false,
        };

        tracing::debug!(
            block_count,
            block_bytes,
            light = light_count,
            dense = dense_count,
            extra = extra_count,
            "codec initialized"
        );

        Ok(codec)
    }

    /// Size the elimination matrices once the deferred count is known. The GE
    /// matrix gets `extra_count` spare rows for resume plus one scratch row
    /// used by the dense-row generator.
    pub(crate) fn allocate_matrix(&mut self) {
        self.ge_cols = self.defer_count + self.added_count;
        self.ge_rows = self.ge_cols;

        self.ge = BitMatrix::zeroed(self.ge_cols + self.extra_count + 1, self.ge_cols);
        self.compress = BitMatrix::zeroed(self.block_count, self.ge_cols);

        self.pivots = (0..self.ge_cols + self.extra_count)
            .map(|i| i as u16)
            .collect();
        self.ge_row_map = vec![LIST_TERM; self.ge_cols + self.extra_count];
        self.ge_col_map = vec![LIST_TERM; self.ge_cols];
        self.check_dest = vec![LIST_TERM; self.added_count];

        tracing::debug!(
            ge_rows = self.ge_rows,
            ge_cols = self.ge_cols,
            deferred = self.defer_count,
            "elimination matrices allocated"
        );
    }
}
