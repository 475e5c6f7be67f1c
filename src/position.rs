// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::block_index::BlockIndex;
use crate::chain_set::{ChainSet, MAX_CHAINS};
use crate::checksum::Checksum;
use crate::error::{ChainError, Corrupt};
use crate::header_io::HeaderIo;
use crate::util::{read_i32le, read_u32le, read_u64le, usize_from_u32};
use alloc::vec;
use alloc::vec::Vec;
use log::debug;

/// Size of the snapshot prefix: chain index and chain count.
const PREFIX_SIZE_IN_BYTES: usize = 8;

/// Size of each per-chain record: extent ordinal and offset.
const CHAIN_RECORD_SIZE_IN_BYTES: usize = 12;

/// Size of the trailing checksum.
const CHECKSUM_SIZE_IN_BYTES: usize = 4;

/// Position of one chain's cursor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChainPosition {
    /// Number of extents before the cursor's extent. Equal to the
    /// chain's extent count if the cursor is exhausted.
    pub extent_ordinal: u32,

    /// Current block within that extent.
    pub offset: BlockIndex,
}

/// Relocatable copy of a [`ChainSet`] cursor.
///
/// Positions are stored as extent ordinals rather than references, so
/// a snapshot can be restored against a chain set that was rebuilt from
/// its serialized form, for example after the snapshot has been written
/// to an image header and read back in a different process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionSnapshot {
    /// Index of the active chain, or [`PositionSnapshot::START`] for the
    /// start of traversal.
    pub chain_index: i32,

    /// Position of each chain's cursor, in slot order. Empty when
    /// `chain_index` is [`PositionSnapshot::START`].
    pub per_chain: Vec<ChainPosition>,
}

impl PositionSnapshot {
    /// Value of `chain_index` that means "start of traversal".
    pub const START: i32 = -1;

    /// Snapshot of the start of traversal.
    #[must_use]
    pub fn start() -> Self {
        Self {
            chain_index: Self::START,
            per_chain: Vec::new(),
        }
    }

    /// Whether this snapshot is the start of traversal.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.chain_index == Self::START
    }

    /// Write the snapshot to `io`.
    ///
    /// The layout is the chain index (`i32`), the number of chains
    /// (`u32`), an extent ordinal (`u32`) and offset (`u64`) per chain,
    /// and a CRC32C of everything before it (`u32`). All integers are
    /// little-endian.
    pub fn write_to(&self, io: &mut dyn HeaderIo) -> Result<(), ChainError> {
        if self.per_chain.len() > MAX_CHAINS {
            return Err(ChainError::TooManyChains(self.per_chain.len()));
        }
        // OK to unwrap: the length is at most `MAX_CHAINS`.
        let num_chains = u32::try_from(self.per_chain.len()).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.chain_index.to_le_bytes());
        bytes.extend_from_slice(&num_chains.to_le_bytes());
        for pos in &self.per_chain {
            bytes.extend_from_slice(&pos.extent_ordinal.to_le_bytes());
            bytes.extend_from_slice(&pos.offset.to_le_bytes());
        }
        let mut checksum = Checksum::new();
        checksum.update(&bytes);
        bytes.extend_from_slice(&checksum.finalize().to_le_bytes());

        io.write_chunk(&bytes).map_err(ChainError::Io)
    }

    /// Read a snapshot written with [`PositionSnapshot::write_to`].
    pub fn read_from(io: &mut dyn HeaderIo) -> Result<Self, ChainError> {
        let mut prefix = [0; PREFIX_SIZE_IN_BYTES];
        io.read_chunk(&mut prefix).map_err(ChainError::Io)?;
        let chain_index = read_i32le(&prefix, 0);
        let num_chains = usize_from_u32(read_u32le(&prefix, 4));
        if num_chains > MAX_CHAINS {
            return Err(Corrupt::Position { chain: None }.into());
        }

        // OK to unwrap: `num_chains` is at most `MAX_CHAINS`, so the
        // size is small.
        let records_len = num_chains
            .checked_mul(CHAIN_RECORD_SIZE_IN_BYTES)
            .and_then(|n| n.checked_add(CHECKSUM_SIZE_IN_BYTES))
            .unwrap();
        let mut rest = vec![0; records_len];
        io.read_chunk(&mut rest).map_err(ChainError::Io)?;

        // OK to unwrap: `rest` always has room for the checksum.
        let checksum_offset =
            records_len.checked_sub(CHECKSUM_SIZE_IN_BYTES).unwrap();
        let mut checksum = Checksum::new();
        checksum.update(&prefix);
        checksum.update(&rest[..checksum_offset]);
        if checksum.finalize() != read_u32le(&rest, checksum_offset) {
            return Err(Corrupt::PositionChecksum.into());
        }

        let per_chain = rest[..checksum_offset]
            .chunks_exact(CHAIN_RECORD_SIZE_IN_BYTES)
            .map(|record| ChainPosition {
                extent_ordinal: read_u32le(record, 0),
                offset: read_u64le(record, 4),
            })
            .collect();

        Ok(Self {
            chain_index,
            per_chain,
        })
    }
}

impl ChainSet {
    /// Take a relocatable snapshot of the traversal position.
    ///
    /// A set that has not started, or that is exactly at the start,
    /// produces [`PositionSnapshot::start`].
    #[must_use]
    pub fn save_position(&self) -> PositionSnapshot {
        let Some(current) = self.current_chain else {
            return PositionSnapshot::start();
        };
        if self.is_at_start() {
            return PositionSnapshot::start();
        }

        let per_chain = self
            .chains
            .iter()
            .map(|chain| ChainPosition {
                extent_ordinal: chain.cursor_ordinal(),
                offset: chain.current_offset().unwrap_or(0),
            })
            .collect();

        PositionSnapshot {
            // OK to unwrap: `current` is at most `MAX_CHAINS`.
            chain_index: i32::try_from(current).unwrap(),
            per_chain,
        }
    }

    /// Restore a position taken with [`ChainSet::save_position`].
    ///
    /// The chains must hold the same extents as when the snapshot was
    /// taken, as is the case when they have been reloaded from the same
    /// serialized data. A snapshot that does not fit the chains is
    /// rejected with [`Corrupt::Position`], and the set is left
    /// unchanged.
    pub fn restore_position(
        &mut self,
        snapshot: &PositionSnapshot,
    ) -> Result<(), ChainError> {
        if snapshot.is_start() {
            self.reset_to_start();
            return Ok(());
        }

        let current = usize::try_from(snapshot.chain_index)
            .ok()
            .filter(|&i| i <= self.chains.len())
            .ok_or(Corrupt::Position { chain: None })?;
        if snapshot.per_chain.len() != self.chains.len() {
            return Err(Corrupt::Position { chain: None }.into());
        }

        let mut cursors = Vec::new();
        cursors
            .try_reserve_exact(self.chains.len())
            .map_err(|_| ChainError::Alloc)?;
        for (i, (chain, pos)) in
            self.chains.iter().zip(&snapshot.per_chain).enumerate()
        {
            let cursor = chain
                .cursor_at(pos.extent_ordinal, pos.offset)
                .ok_or_else(|| Corrupt::Position {
                    chain: u32::try_from(i).ok(),
                })?;
            cursors.push(cursor);
        }

        for (chain, cursor) in self.chains.iter_mut().zip(cursors) {
            chain.cursor = cursor;
        }
        self.current_chain = Some(current);
        debug!("restored position: chain {current}");
        Ok(())
    }
}
