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

// Exercises the underdetermined path: decoders that receive exactly N rows,
// stall at a missing pivot, and re-enter Gaussian elimination one row at a
// time.

use fountain_codec::{Decoder, Encoder, FeedOutcome};

fn pattern_message(blocks: usize, block_bytes: usize) -> Vec<u8> {
    let mut message = vec![0u8; blocks * block_bytes];
    for i in 0..blocks {
        for j in 0..block_bytes {
            message[i * block_bytes + j] = ((i * 31 + j) & 0xFF) as u8;
        }
    }
    message
}

fn drive(encoder: &Encoder, decoder: &mut Decoder, ids: impl IntoIterator<Item = u32>) -> usize {
    let mut block = vec![0u8; encoder.block_bytes()];

    for (fed, id) in ids.into_iter().enumerate() {
        encoder.encode(id, &mut block);
        if decoder.feed(id, &block).unwrap() == FeedOutcome::Solved {
            return fed + 1;
        }
    }

    panic!("decoder did not solve before the id stream ran out");
}

// No systematic ids at all: triangulation stalls on the first N parity rows
// and the resume path supplies the missing pivots.
#[test]
fn parity_only_stream_resumes_elimination() {
    // Opt-in solver diagnostics: RUST_LOG=fountain_codec=trace
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let message = pattern_message(128, 16);
    let encoder = Encoder::new(&message, 16).unwrap();
    let mut decoder = Decoder::new(message.len(), 16).unwrap();

    let solved_at = drive(&encoder, &mut decoder, 128..320);
    assert!(
        solved_at > 128,
        "expected elimination to stall on the first 128 parity rows"
    );
    assert_eq!(solved_at, 130);
    assert_eq!(decoder.message().unwrap(), message);
}

#[test]
fn parity_only_streams_across_sizes() {
    // (N, 1-based feed at which each stream solves)
    let cases = [(16usize, 16usize), (64, 66), (256, 258), (512, 515)];

    for (n, expect_solved_at) in cases {
        let message = pattern_message(n, 16);
        let encoder = Encoder::new(&message, 16).unwrap();
        let mut decoder = Decoder::new(message.len(), 16).unwrap();

        let first = n as u32;
        let solved_at = drive(&encoder, &mut decoder, first..3 * first);
        assert_eq!(solved_at, expect_solved_at, "N = {n}");
        assert_eq!(decoder.message().unwrap(), message, "N = {n}");
    }
}

// A decoder that is already solved ignores further feeds.
#[test]
fn feeding_after_solved_is_a_no_op() {
    let message = pattern_message(16, 16);
    let encoder = Encoder::new(&message, 16).unwrap();
    let mut decoder = Decoder::new(message.len(), 16).unwrap();

    let solved_at = drive(&encoder, &mut decoder, 0..16);
    assert_eq!(solved_at, 16);

    let mut block = vec![0u8; 16];
    encoder.encode(40, &mut block);
    assert_eq!(decoder.feed(40, &block).unwrap(), FeedOutcome::Solved);
    assert_eq!(decoder.message().unwrap(), message);
}

// Feeding one more row either raises the rank or leaves the decoder asking
// for more; it never wedges. Flood a stalled decoder with the same parity
// row until the spare-row headroom runs out and later feeds start
// overwriting parked rows, then let fresh rows finish.
#[test]
fn redundant_rows_leave_state_intact() {
    let message = pattern_message(128, 16);
    let encoder = Encoder::new(&message, 16).unwrap();
    let mut decoder = Decoder::new(message.len(), 16).unwrap();

    let mut block = vec![0u8; 16];

    // Exactly N rows, no systematic ids: stalls (as pinned above).
    for id in 128..256u32 {
        encoder.encode(id, &mut block);
        assert_eq!(decoder.feed(id, &block).unwrap(), FeedOutcome::NeedMoreBlocks);
    }

    // A duplicate adds no rank no matter how often it arrives. Forty copies
    // exhaust the 32 spare rows, so the last feeds exercise the
    // overwrite-a-parked-row path.
    encoder.encode(200, &mut block);
    for _ in 0..40 {
        assert_eq!(decoder.feed(200, &block).unwrap(), FeedOutcome::NeedMoreBlocks);
    }

    // Fresh rows finish the job.
    let solved_at = drive(&encoder, &mut decoder, 256..320);
    assert_eq!(solved_at, 2);
    assert_eq!(decoder.message().unwrap(), message);
}
