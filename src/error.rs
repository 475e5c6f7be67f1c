// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::block_index::BlockIndex;
use alloc::boxed::Box;
use core::any::Any;
use core::fmt::{self, Debug, Display, Formatter};

/// Underlying error type for [`ChainError::Io`].
pub trait IoError: Any + Debug + Display + Send + Sync {}

/// Common error type for all extent chain operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum ChainError {
    /// Storage for a new extent could not be obtained. The operation
    /// that failed did not modify the chain.
    Alloc,

    /// A range passed to [`ExtentChain::add_range`] has its start
    /// after its end.
    ///
    /// [`ExtentChain::add_range`]: crate::ExtentChain::add_range
    InvalidRange {
        /// First block of the range.
        start: BlockIndex,
        /// Last block of the range.
        end: BlockIndex,
    },

    /// The total number of blocks in a chain does not fit in a [`u64`].
    TooManyBlocks,

    /// The number of extents in a chain does not fit in a [`u32`].
    TooManyExtents,

    /// A chain set was created with more than [`MAX_CHAINS`] chains.
    ///
    /// [`MAX_CHAINS`]: crate::MAX_CHAINS
    TooManyChains(
        /// Number of chains requested.
        usize,
    ),

    /// A chain index does not refer to a chain in the set.
    InvalidChainIndex(
        /// The invalid index.
        usize,
    ),

    /// An IO operation failed. This error comes from the [`HeaderIo`]
    /// passed to a serialization function.
    ///
    /// [`HeaderIo`]: crate::HeaderIo
    Io(
        /// Underlying error.
        Box<dyn IoError>,
    ),

    /// Serialized or saved data is inconsistent.
    Corrupt(Corrupt),
}

impl ChainError {
    /// If the error type is [`ChainError::Corrupt`], get the underlying error.
    pub fn as_corrupt(&self) -> Option<&Corrupt> {
        if let Self::Corrupt(err) = self {
            Some(err)
        } else {
            None
        }
    }

    /// If the error type is [`ChainError::Io`], get the underlying error.
    pub fn as_io(&self) -> Option<&dyn IoError> {
        if let Self::Io(err) = self {
            Some(&**err)
        } else {
            None
        }
    }
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc => write!(f, "unable to allocate a new extent"),
            Self::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} is after end {end}")
            }
            Self::TooManyBlocks => write!(f, "too many blocks in chain"),
            Self::TooManyExtents => write!(f, "too many extents in chain"),
            Self::TooManyChains(n) => {
                write!(f, "too many chains: {n}")
            }
            Self::InvalidChainIndex(i) => {
                write!(f, "invalid chain index: {i}")
            }
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Corrupt(c) => write!(f, "corrupt: {c}"),
        }
    }
}

impl PartialEq<Corrupt> for ChainError {
    fn eq(&self, other: &Corrupt) -> bool {
        self.as_corrupt() == Some(other)
    }
}

impl From<Corrupt> for ChainError {
    fn from(c: Corrupt) -> Self {
        Self::Corrupt(c)
    }
}

impl core::error::Error for ChainError {}

/// Error type used in [`ChainError::Corrupt`] when serialized chain
/// data or a saved position is inconsistent.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Corrupt {
    /// The number of extents written does not match the chain's
    /// recorded extent count.
    ExtentCount {
        /// Extent count in the chain summary.
        expected: u32,
        /// Number of extents actually written.
        actual: u32,
    },

    /// A serialized extent has its start after its end.
    Extent {
        /// Ordinal of the extent within its chain.
        ordinal: u32,
    },

    /// A serialized extent is not strictly after, and separated from,
    /// the previous extent.
    ExtentOrder {
        /// Ordinal of the extent within its chain.
        ordinal: u32,
    },

    /// The serialized block count does not match the sum of the
    /// serialized extent lengths.
    TotalBlocks {
        /// Block count in the chain summary.
        expected: u64,
        /// Sum of the extent lengths.
        actual: u64,
    },

    /// A saved position's checksum is invalid.
    PositionChecksum,

    /// A saved position does not fit the chain set it is restored
    /// against.
    Position {
        /// Chain index, or `None` if the chain count or chain index is
        /// wrong.
        chain: Option<u32>,
    },
}

impl Display for Corrupt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtentCount { expected, actual } => write!(
                f,
                "wrote {actual} extents but chain metadata says there should be {expected}"
            ),
            Self::Extent { ordinal } => {
                write!(f, "extent {ordinal} is invalid")
            }
            Self::ExtentOrder { ordinal } => {
                write!(f, "extent {ordinal} is out of order")
            }
            Self::TotalBlocks { expected, actual } => write!(
                f,
                "chain has {actual} blocks but chain metadata says there should be {expected}"
            ),
            Self::PositionChecksum => write!(f, "invalid position checksum"),
            Self::Position { chain: Some(chain) } => {
                write!(f, "saved position for chain {chain} is invalid")
            }
            Self::Position { chain: None } => {
                write!(f, "saved position does not match the chain set")
            }
        }
    }
}
