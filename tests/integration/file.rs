// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::test_util::chain_set_from;
use extent_chain::{ChainSet, HeaderIo, PositionSnapshot, TraversalMode};
use std::fs::File;
use std::io::{Seek, SeekFrom};

#[test]
fn test_file_header() -> anyhow::Result<()> {
    let path = std::env::temp_dir()
        .join(format!("extent-chain-test-{}.bin", std::process::id()));

    let mut set = chain_set_from(&[&[(4, 7)], &[(40, 43), (60, 60)]]);
    set.advance(2, TraversalMode::Sequential);

    let mut file = File::create(&path)?;
    set.serialize(&mut file)?;
    set.save_position().write_to(&mut file)?;
    drop(file);

    let mut file = File::open(&path)?;
    let mut loaded = ChainSet::deserialize(&mut file, 2)?;
    loaded.restore_position(&PositionSnapshot::read_from(&mut file)?)?;
    assert_eq!(loaded.current_offset(), Some(6));

    // Nothing is left to read.
    let mut byte = [0; 1];
    assert!(file.read_chunk(&mut byte).is_err());
    file.seek(SeekFrom::Start(0))?;
    assert!(file.read_chunk(&mut byte).is_ok());

    std::fs::remove_file(&path)?;
    Ok(())
}
