// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! On-disk chain layout.
//!
//! A chain is stored as a 12-byte summary followed by one 16-byte
//! record per extent. All integers are little-endian.
//!
//! | Offset | Size | Field          |
//! |--------|------|----------------|
//! | 0      | 8    | `total_blocks` |
//! | 8      | 4    | `extent_count` |
//!
//! Each extent record is `start` (8 bytes) followed by `end` (8
//! bytes), in ascending order.

use crate::chain::ExtentChain;
use crate::chain_set::{ChainSet, MAX_CHAINS};
use crate::error::{ChainError, Corrupt};
use crate::extent::Extent;
use crate::header_io::HeaderIo;
use crate::util::{num_blocks_inclusive, read_u32le, read_u64le};
use alloc::vec::Vec;
use log::{debug, error};

/// Size of the chain summary in bytes.
const SUMMARY_SIZE_IN_BYTES: usize = 12;

impl ExtentChain {
    /// Write the chain to `io`.
    ///
    /// The cursor and priority are not saved.
    pub fn serialize(&self, io: &mut dyn HeaderIo) -> Result<(), ChainError> {
        let expected = self.num_extents();

        let mut summary = [0; SUMMARY_SIZE_IN_BYTES];
        summary[..8].copy_from_slice(&self.total_blocks.to_le_bytes());
        summary[8..].copy_from_slice(&expected.to_le_bytes());
        io.write_chunk(&summary).map_err(ChainError::Io)?;

        let mut actual: u32 = 0;
        for extent in &self.extents {
            io.write_chunk(&extent.to_bytes()).map_err(ChainError::Io)?;
            actual = actual.saturating_add(1);
        }

        // Always equal while extents live in a single `Vec`; this only
        // catches a future representation that can lose count.
        if actual != expected {
            error!(
                "saved {actual} extents but chain metadata says there should be {expected}"
            );
            return Err(Corrupt::ExtentCount { expected, actual }.into());
        }

        debug!(
            "saved chain: {expected} extents, {} blocks",
            self.total_blocks
        );
        Ok(())
    }

    /// Read a chain previously written with [`ExtentChain::serialize`].
    ///
    /// The returned chain's cursor is at its first block. Its priority
    /// is zero.
    pub fn deserialize(io: &mut dyn HeaderIo) -> Result<Self, ChainError> {
        let mut summary = [0; SUMMARY_SIZE_IN_BYTES];
        io.read_chunk(&mut summary).map_err(ChainError::Io)?;
        let expected_blocks = read_u64le(&summary, 0);
        let num_extents = read_u32le(&summary, 8);

        let mut extents: Vec<Extent> = Vec::new();
        let mut total_blocks: u64 = 0;
        for ordinal in 0..num_extents {
            let mut record = [0; Extent::SERIALIZED_SIZE_IN_BYTES];
            io.read_chunk(&mut record).map_err(ChainError::Io)?;
            let extent = Extent {
                start: read_u64le(&record, 0),
                end: read_u64le(&record, 8),
            };

            let num_blocks = num_blocks_inclusive(extent.start, extent.end)
                .ok_or(Corrupt::Extent { ordinal })?;
            if let Some(prev) = extents.last() {
                if extent.start <= prev.end || prev.is_adjacent_to(&extent) {
                    return Err(Corrupt::ExtentOrder { ordinal }.into());
                }
            }
            total_blocks = total_blocks
                .checked_add(num_blocks)
                .ok_or(ChainError::TooManyBlocks)?;

            extents.try_reserve(1).map_err(|_| ChainError::Alloc)?;
            extents.push(extent);
        }

        if total_blocks != expected_blocks {
            error!(
                "loaded {total_blocks} blocks but chain metadata says there should be {expected_blocks}"
            );
            return Err(Corrupt::TotalBlocks {
                expected: expected_blocks,
                actual: total_blocks,
            }
            .into());
        }

        debug!("loaded chain: {num_extents} extents, {total_blocks} blocks");
        Ok(Self::from_parts(extents, total_blocks))
    }
}

impl ChainSet {
    /// Write every chain to `io`, in slot order.
    ///
    /// The traversal position is not saved; use
    /// [`ChainSet::save_position`] for that.
    pub fn serialize(&self, io: &mut dyn HeaderIo) -> Result<(), ChainError> {
        for chain in &self.chains {
            chain.serialize(io)?;
        }
        Ok(())
    }

    /// Read `num_chains` chains previously written with
    /// [`ChainSet::serialize`].
    ///
    /// The returned set is at the start of traversal.
    pub fn deserialize(
        io: &mut dyn HeaderIo,
        num_chains: usize,
    ) -> Result<Self, ChainError> {
        if num_chains > MAX_CHAINS {
            return Err(ChainError::TooManyChains(num_chains));
        }

        let mut chains = Vec::new();
        for _ in 0..num_chains {
            chains.push(ExtentChain::deserialize(io)?);
        }

        let mut set = Self::new(chains)?;
        set.reset_to_start();
        Ok(set)
    }
}
