// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::test_util::{chain_from, ranges, shuffle};
use extent_chain::{ExtentChain, MemHeader};

#[test]
fn test_merge_examples() {
    let chain = chain_from(&[(0, 9), (10, 19)]);
    assert_eq!(ranges(&chain), [(0, 19)]);
    assert_eq!(chain.num_extents(), 1);
    assert_eq!(chain.total_blocks(), 20);

    let chain = chain_from(&[(20, 29), (0, 9), (10, 19)]);
    assert_eq!(ranges(&chain), [(0, 29)]);
    assert_eq!(chain.num_extents(), 1);
    assert_eq!(chain.total_blocks(), 30);
}

/// Single-block ranges covering a few separate runs, inserted in many
/// different orders, always end up as one extent per run.
#[test]
fn test_single_blocks_any_order() {
    let runs = [(3, 9), (11, 11), (40, 63), (65, 70)];
    let mut blocks: Vec<u64> =
        runs.iter().flat_map(|&(start, end)| start..=end).collect();

    for seed in 1..=30 {
        shuffle(&mut blocks, seed);
        let mut chain = ExtentChain::new();
        for &block in &blocks {
            chain.add_range(block, block).unwrap();
        }

        assert_eq!(ranges(&chain), runs, "seed {seed}");
        assert_eq!(chain.total_blocks(), u64::try_from(blocks.len()).unwrap());
        assert_eq!(chain.blocks().collect::<Vec<_>>(), {
            let mut sorted = blocks.clone();
            sorted.sort_unstable();
            sorted
        });
    }
}

#[test]
fn test_round_trip() -> anyhow::Result<()> {
    let mut input = vec![];
    for i in 0..100u64 {
        input.push((i * 10, i * 10 + (i % 7)));
    }
    shuffle(&mut input, 99);
    let chain = chain_from(&input);

    let mut header = MemHeader::new();
    chain.serialize(&mut header)?;
    assert_eq!(header.as_bytes().len(), 12 + 16 * chain.extents().len());

    let loaded = ExtentChain::deserialize(&mut header)?;
    assert_eq!(loaded.extents(), chain.extents());
    assert_eq!(loaded.total_blocks(), chain.total_blocks());
    assert_eq!(loaded.num_extents(), chain.num_extents());
    assert_eq!(
        loaded.current_offset(),
        chain.extents().first().map(|e| e.start())
    );
    Ok(())
}

#[test]
fn test_clear_then_reuse() {
    let mut chain = chain_from(&[(0, 9), (20, 29)]);
    chain.clear();
    chain.clear();
    assert_eq!(chain.num_extents(), 0);
    assert_eq!(chain.total_blocks(), 0);
    assert_eq!(chain.blocks().next(), None);

    chain.add_range(20, 29).unwrap();
    chain.add_range(0, 9).unwrap();
    assert_eq!(ranges(&chain), [(0, 9), (20, 29)]);
}
