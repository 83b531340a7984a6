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

use crate::codec::{Codec, CodecError, FeedOutcome, MAX_EXTRA_ROWS};

/// Systematic rateless decoder. Feed it encoded (id, block) pairs in any
/// order; once enough rank has arrived (N blocks plus usually zero or a few
/// more), `feed` reports `Solved` and `message` reassembles the original
/// bytes.
#[derive(Debug)]
pub struct Decoder {
    codec: Codec,
}

impl Decoder {
    /// Build a decoder for a message of `message_bytes` carried in
    /// `block_bytes`-sized blocks; both must match the encoder's setup.
    pub fn new(message_bytes: usize, block_bytes: usize) -> Result<Decoder, CodecError> {
        let codec = Codec::new(message_bytes, block_bytes, MAX_EXTRA_ROWS)?;

        Ok(Decoder { codec })
    }

    /// Accept one received block. Returns `NeedMoreBlocks` until the solver
    /// reaches full rank, then `Solved`. Feeding after `Solved` is a no-op.
    pub fn feed(&mut self, id: u32, block: &[u8]) -> Result<FeedOutcome, CodecError> {
        self.codec.decode_feed(id, block)
    }

    pub fn is_solved(&self) -> bool {
        self.codec.is_solved()
    }

    pub fn block_count(&self) -> usize {
        self.codec.block_count()
    }

    pub fn block_bytes(&self) -> usize {
        self.codec.block_bytes()
    }

    /// The reconstructed message, once solved.
    pub fn message(&self) -> Option<Vec<u8>> {
        self.codec.reconstruct_output()
    }

    /// Block row operations spent solving, for throughput accounting.
    pub fn row_ops(&self) -> u64 {
        self.codec.row_ops()
    }
}
