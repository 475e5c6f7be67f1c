// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// In addition to being used as a regular module in lib.rs, this module
// is used in `tests` via the `include!` macro.

use super::{ChainSet, ExtentChain, HeaderIo, IoError, MemHeader};
use core::fmt::{self, Display, Formatter};

/// Create a chain by adding each of `ranges` in order.
pub(crate) fn chain_from(ranges: &[(u64, u64)]) -> ExtentChain {
    let mut chain = ExtentChain::new();
    for &(start, end) in ranges {
        chain.add_range(start, end).unwrap();
    }
    chain
}

/// Create a chain set with one chain per entry in `chains`.
pub(crate) fn chain_set_from(chains: &[&[(u64, u64)]]) -> ChainSet {
    ChainSet::new(chains.iter().map(|ranges| chain_from(ranges)).collect())
        .unwrap()
}

/// Get the extents of `chain` as `(start, end)` pairs.
pub(crate) fn ranges(chain: &ExtentChain) -> Vec<(u64, u64)> {
    chain.extents().iter().map(|e| (e.start(), e.end())).collect()
}

/// Shuffle `items` in place with a fixed-seed xorshift generator, so
/// that tests get varied but reproducible insertion orders.
pub(crate) fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut state = seed | 1;
    for i in (1..items.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = usize::try_from(state % u64::try_from(i + 1).unwrap()).unwrap();
        items.swap(i, j);
    }
}

/// Error returned by [`FullHeader`] once it has no room left.
#[derive(Debug)]
pub(crate) struct HeaderFullError;

impl Display for HeaderFullError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "header is full")
    }
}

impl IoError for HeaderFullError {}

/// Header that accepts `writes_left` chunks and then fails every
/// further write.
pub(crate) struct FullHeader {
    pub(crate) inner: MemHeader,
    pub(crate) writes_left: usize,
}

impl FullHeader {
    pub(crate) fn new(writes_left: usize) -> Self {
        Self {
            inner: MemHeader::new(),
            writes_left,
        }
    }
}

impl HeaderIo for FullHeader {
    fn write_chunk(&mut self, src: &[u8]) -> Result<(), Box<dyn IoError>> {
        if self.writes_left == 0 {
            return Err(Box::new(HeaderFullError));
        }
        self.writes_left -= 1;
        self.inner.write_chunk(src)
    }

    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<(), Box<dyn IoError>> {
        self.inner.read_chunk(dst)
    }
}
