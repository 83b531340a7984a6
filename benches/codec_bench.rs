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

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use fountain_codec::{Decoder, Encoder, FeedOutcome};
use itertools::Itertools;
use rand::{prelude::SliceRandom, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

const BLOCK_COUNT: usize = 1024;
const BLOCK_BYTES: usize = 1024;

pub fn criterion_benchmark(c: &mut Criterion) {
    let message_size = BLOCK_COUNT * BLOCK_BYTES;
    let mut message = vec![0u8; message_size];
    ChaCha20Rng::seed_from_u64(1).fill_bytes(&mut message);

    let mut group = c.benchmark_group("encoder/decoder");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(message_size as u64));

    group.bench_function("encode", |b| {
        let mut out = vec![0u8; BLOCK_BYTES];
        b.iter(|| {
            let encoder = Encoder::new(&message, BLOCK_BYTES).unwrap();
            // One recovery-window worth of parity on top of the solve.
            for id in BLOCK_COUNT as u32..(BLOCK_COUNT + 64) as u32 {
                encoder.encode(id, &mut out);
            }
        });
    });

    group.bench_function("decode", |b| {
        let encoder = Encoder::new(&message, BLOCK_BYTES).unwrap();

        // A quarter of the systematic blocks lost, made up with parity.
        let mut ids: Vec<u32> = (0..(2 * BLOCK_COUNT) as u32).collect();
        ids.shuffle(&mut ChaCha20Rng::seed_from_u64(2));

        let blocks = ids
            .into_iter()
            .map(|id| {
                let mut block = vec![0u8; BLOCK_BYTES];
                encoder.encode(id, &mut block);
                (id, block)
            })
            .collect_vec();

        b.iter_batched(
            || blocks.clone(),
            |blocks| {
                let mut decoder = Decoder::new(message_size, BLOCK_BYTES).unwrap();
                for (id, block) in &blocks {
                    if decoder.feed(*id, block).unwrap() == FeedOutcome::Solved {
                        break;
                    }
                }
                assert!(decoder.is_solved());
                decoder.message().unwrap()
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
