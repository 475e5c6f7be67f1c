// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This crate tracks which blocks on one or more backing devices have
//! been assigned to a sequential writer, such as a hibernation image
//! writer. It is `no_std` compatible.
//!
//! Blocks are stored as run-length compressed [`Extent`]s in an
//! [`ExtentChain`] per device. Adding a range merges it with its
//! neighbors where possible, so a chain is always as short as it can be.
//!
//! A [`ChainSet`] groups the chains of every device into one logical
//! stream of blocks. The stream can be walked one device at a time, or
//! striped across all devices (see [`TraversalMode`]). The traversal
//! position can be captured as a [`PositionSnapshot`], which stays
//! valid after the chains have been written out and loaded back.
//!
//! # Example
//!
//! ```
//! use extent_chain::{ChainSet, MemHeader, TraversalMode};
//!
//! let mut set = ChainSet::with_empty_chains(2)?;
//! set.chain_mut(0).unwrap().add_range(0, 3)?;
//! set.chain_mut(1).unwrap().add_range(100, 103)?;
//!
//! set.reset_to_start();
//! assert_eq!(set.current_offset(), Some(0));
//! assert_eq!(set.advance(1, TraversalMode::Striped), Some(100));
//! assert_eq!(set.advance(1, TraversalMode::Striped), Some(1));
//!
//! // Save the chains and the position, then load them again.
//! let mut header = MemHeader::new();
//! set.serialize(&mut header)?;
//! set.save_position().write_to(&mut header)?;
//!
//! let mut loaded = ChainSet::deserialize(&mut header, 2)?;
//! let position = extent_chain::PositionSnapshot::read_from(&mut header)?;
//! loaded.restore_position(&position)?;
//! assert_eq!(loaded.advance(1, TraversalMode::Striped), Some(101));
//! # Ok::<(), extent_chain::ChainError>(())
//! ```
//!
//! # Crate features
//!
//! * `std`: Enables [`HeaderIo`] for [`std::fs::File`], and [`IoError`]
//!   for [`std::io::Error`].

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(
    clippy::as_conversions,
    clippy::must_use_candidate,
    clippy::use_self
)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]

extern crate alloc;

mod block_index;
mod chain;
mod chain_set;
mod checksum;
mod error;
mod extent;
mod header_io;
mod position;
mod serialize;
mod util;

#[cfg(test)]
mod test_util;

pub use block_index::BlockIndex;
pub use chain::{Blocks, ExtentChain};
pub use chain_set::{ChainSet, MAX_CHAINS, TraversalMode};
pub use error::{ChainError, Corrupt, IoError};
pub use extent::Extent;
pub use header_io::{HeaderIo, MemHeader, MemIoError};
pub use position::{ChainPosition, PositionSnapshot};
