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

// A systematic rateless ("fountain") erasure code over GF(2). The sender
// splits a message into N equal blocks and can emit an unbounded stream of
// encoded blocks addressed by 32-bit ids; the first N are the message itself.
// A receiver collects any N plus a small overhead of them, in any order, and
// inverts the sparse generator matrix in four phases: peeling, compression,
// Gaussian elimination, and substitution.

mod bitmatrix;
mod codec;
mod decoder;
mod encoder;
mod invertible;
mod params;
mod prime;

pub mod rng;
pub mod shuffle;
pub mod xor_eq;

pub use codec::{CodecError, FeedOutcome};
pub use decoder::Decoder;
pub use encoder::Encoder;
