// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::block_index::BlockIndex;
use crate::util::num_blocks_inclusive;

/// Contiguous, inclusive range of blocks assigned to a chain.
///
/// `start` is always less than or equal to `end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
    pub(crate) start: BlockIndex,
    pub(crate) end: BlockIndex,
}

impl Extent {
    /// Size of a serialized extent: start and end as little-endian
    /// `u64`s.
    pub(crate) const SERIALIZED_SIZE_IN_BYTES: usize = 16;

    /// First block of the extent.
    #[must_use]
    pub fn start(&self) -> BlockIndex {
        self.start
    }

    /// Last block of the extent (inclusive).
    #[must_use]
    pub fn end(&self) -> BlockIndex {
        self.end
    }

    /// Number of blocks in the extent.
    ///
    /// An extent spanning every `u64` block index cannot be created, so
    /// this does not overflow.
    #[must_use]
    pub fn num_blocks(&self) -> u64 {
        // OK to unwrap: `add_range` and deserialization both reject
        // ranges whose length does not fit in a `u64`.
        num_blocks_inclusive(self.start, self.end).unwrap()
    }

    /// Whether `block` falls within this extent.
    #[must_use]
    pub fn contains(&self, block: BlockIndex) -> bool {
        self.start <= block && block <= self.end
    }

    /// Whether `next` starts directly after this extent ends.
    pub(crate) fn is_adjacent_to(&self, next: &Extent) -> bool {
        self.end.checked_add(1) == Some(next.start)
    }

    pub(crate) fn to_bytes(self) -> [u8; Self::SERIALIZED_SIZE_IN_BYTES] {
        let mut bytes = [0; Self::SERIALIZED_SIZE_IN_BYTES];
        bytes[..8].copy_from_slice(&self.start.to_le_bytes());
        bytes[8..].copy_from_slice(&self.end.to_le_bytes());
        bytes
    }
}
