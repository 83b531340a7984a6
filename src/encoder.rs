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

use crate::codec::{Codec, CodecError};

/// Systematic rateless encoder. Construction splits the message into
/// fixed-size blocks and solves the generator matrix; after that any 32-bit
/// id can be encoded, indefinitely. Ids below the block count reproduce the
/// message blocks themselves.
#[derive(Debug)]
pub struct Encoder {
    codec: Codec,
}

impl Encoder {
    /// Build an encoder over `message` using `block_bytes`-sized blocks.
    /// The derived block count must be one of the tabulated code sizes.
    pub fn new(message: &[u8], block_bytes: usize) -> Result<Encoder, CodecError> {
        let mut codec = Codec::new(message.len(), block_bytes, 0)?;
        codec.encode_feed(message)?;

        Ok(Encoder { codec })
    }

    pub fn block_count(&self) -> usize {
        self.codec.block_count()
    }

    pub fn block_bytes(&self) -> usize {
        self.codec.block_bytes()
    }

    /// Write encoded block `id` into `out`, which must be exactly
    /// `block_bytes` long. The final partial message block is zero-padded.
    pub fn encode(&self, id: u32, out: &mut [u8]) {
        self.codec.encode_block(id, out);
    }

    /// Block row operations spent solving, for throughput accounting.
    pub fn row_ops(&self) -> u64 {
        self.codec.row_ops()
    }
}
