// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::test_util::{FullHeader, chain_set_from};
use extent_chain::{ChainSet, MemHeader, PositionSnapshot, TraversalMode};

/// Active chain, plus the current extent's start and the current block
/// of every chain.
type CursorState = (Option<usize>, Vec<(Option<u64>, Option<u64>)>);

fn cursor_state(set: &ChainSet) -> CursorState {
    let per_chain = set
        .chains()
        .iter()
        .map(|c| (c.current_extent().map(|e| e.start()), c.current_offset()))
        .collect();
    (set.current_chain(), per_chain)
}

#[test]
fn test_snapshot_round_trip_every_step() {
    let chains: [&[(u64, u64)]; 3] =
        [&[(0, 2), (10, 12)], &[(50, 50)], &[(80, 85)]];

    for mode in [TraversalMode::Sequential, TraversalMode::Striped] {
        let mut set = chain_set_from(&chains);
        set.reset_to_start();
        loop {
            let before = cursor_state(&set);
            let snapshot = set.save_position();
            set.restore_position(&snapshot).unwrap();
            assert_eq!(cursor_state(&set), before);

            if set.advance(1, mode).is_none() {
                break;
            }
        }
    }
}

/// Save chains and position to a header, reload both, and continue
/// traversal where it left off.
#[test]
fn test_resume_from_header() -> anyhow::Result<()> {
    let chains: [&[(u64, u64)]; 2] = [&[(0, 9), (30, 39)], &[(500, 519)]];
    let mut set = chain_set_from(&chains);
    set.reset_to_start();
    for _ in 0..13 {
        set.advance(1, TraversalMode::Striped);
    }

    let mut header = MemHeader::new();
    set.serialize(&mut header)?;
    set.save_position().write_to(&mut header)?;

    let expected: Vec<u64> =
        std::iter::from_fn(|| set.advance(1, TraversalMode::Striped)).collect();
    assert!(!expected.is_empty());

    let bytes = header.into_bytes();
    let mut header = MemHeader::from(bytes);
    let mut loaded = ChainSet::deserialize(&mut header, 2)?;
    let snapshot = PositionSnapshot::read_from(&mut header)?;
    loaded.restore_position(&snapshot)?;

    let actual: Vec<u64> =
        std::iter::from_fn(|| loaded.advance(1, TraversalMode::Striped))
            .collect();
    assert_eq!(actual, expected);
    Ok(())
}

/// A header that runs out of room mid-save reports the writer's error.
#[test]
fn test_save_to_full_header() {
    let mut set = chain_set_from(&[&[(0, 9), (30, 39)], &[(500, 519)]]);
    set.reset_to_start();
    set.advance(3, TraversalMode::Sequential);

    // Room for both chains (a summary plus one record per extent) but
    // not the position.
    let mut header = FullHeader::new(5);
    set.serialize(&mut header).unwrap();
    let err = set.save_position().write_to(&mut header).unwrap_err();
    assert_eq!(err.to_string(), "io error: header is full");

    let mut header = FullHeader::new(1);
    let err = set.serialize(&mut header).unwrap_err();
    assert!(err.as_io().is_some());
}
