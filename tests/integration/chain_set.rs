// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::test_util::chain_set_from;
use extent_chain::TraversalMode;

#[test]
fn test_striped_example() {
    let mut set = chain_set_from(&[&[(0, 4)], &[(0, 4)], &[(0, 4)]]);
    set.reset_to_start();

    let mut stepped = vec![set.current_chain().unwrap()];
    for _ in 0..14 {
        assert!(set.advance(1, TraversalMode::Striped).is_some());
        stepped.push(set.current_chain().unwrap());
    }
    assert_eq!(set.advance(1, TraversalMode::Striped), None);

    // The chain stepped by each of the 15 calls.
    assert_eq!(stepped, [0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2]);
}

#[test]
fn test_exhaustion_single_chain() {
    for mode in [TraversalMode::Sequential, TraversalMode::Striped] {
        let mut set = chain_set_from(&[&[(0, 3), (10, 12), (20, 20)]]);
        set.reset_to_start();
        let total = set.total_blocks();

        for _ in 1..total {
            assert!(set.advance(1, mode).is_some());
            assert!(!set.is_exhausted());
        }
        assert_eq!(set.advance(1, mode), None);
        assert!(set.is_exhausted());
    }
}

fn assert_every_block_visited_once(chains: &[&[(u64, u64)]]) {
    for mode in [TraversalMode::Sequential, TraversalMode::Striped] {
        let mut set = chain_set_from(chains);
        set.reset_to_start();

        let mut visited: Vec<u64> = set.current_offset().into_iter().collect();
        while let Some(block) = set.advance(1, mode) {
            visited.push(block);
        }
        visited.sort_unstable();

        let mut expected: Vec<u64> = set
            .chains()
            .iter()
            .flat_map(|chain| chain.blocks())
            .collect();
        expected.sort_unstable();
        assert_eq!(visited, expected);
    }
}

/// Walking the whole set visits every block exactly once, in either
/// mode.
#[test]
fn test_every_block_visited_once() {
    let chains: [&[(u64, u64)]; 4] =
        [&[(0, 7), (20, 23)], &[], &[(100, 101)], &[(200, 215)]];
    assert_every_block_visited_once(&chains);

    let chains: [&[(u64, u64)]; 4] =
        [&[], &[(100, 101)], &[], &[(200, 203), (210, 211)]];
    assert_every_block_visited_once(&chains);
}

/// Requesting several blocks per step moves the cursor in whole units.
#[test]
fn test_multi_block_striped() {
    let mut set = chain_set_from(&[&[(0, 7)], &[(100, 107)]]);
    set.reset_to_start();

    let mut visited = vec![set.current_offset().unwrap()];
    while let Some(block) = set.advance(4, TraversalMode::Striped) {
        visited.push(block);
    }
    assert_eq!(visited, [0, 100, 4, 104]);
}

/// When the first chain has no blocks, the first `advance` moves to the
/// first block of the next chain that has some.
#[test]
fn test_empty_first_chain() {
    for mode in [TraversalMode::Sequential, TraversalMode::Striped] {
        let mut set = chain_set_from(&[&[], &[(100, 102)]]);
        set.reset_to_start();
        assert_eq!(set.current_chain(), Some(0));
        assert_eq!(set.current_offset(), None);
        assert!(!set.is_exhausted());

        let mut visited = vec![];
        while let Some(block) = set.advance(1, mode) {
            visited.push((set.current_chain().unwrap(), block));
        }
        assert_eq!(visited, [(1, 100), (1, 101), (1, 102)]);
        assert!(set.is_exhausted());
    }
}
