// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::block_index::BlockIndex;
use crate::error::ChainError;
use crate::extent::Extent;
use crate::util::{num_blocks_inclusive, usize_from_u32};
use alloc::vec::Vec;
use core::iter::FusedIterator;
use log::warn;

/// Traversal position within a chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ChainCursor {
    /// Index of the current extent in `ExtentChain::extents`.
    pub(crate) extent: usize,

    /// Current block. Always within the current extent.
    pub(crate) offset: BlockIndex,
}

/// Ordered, coalescing list of extents for one backing store.
///
/// Extents are kept sorted by start block. No two extents overlap, and
/// no two extents are adjacent: inserting a range that touches an
/// existing extent extends that extent instead of adding a new one. The
/// chain is therefore always in its most compact run-length form,
/// regardless of insertion order.
///
/// Each chain also has a traversal cursor, used by [`ChainSet`] to step
/// through the chain one block at a time.
///
/// [`ChainSet`]: crate::ChainSet
#[derive(Clone, Debug, Default)]
pub struct ExtentChain {
    /// Extents in ascending order.
    pub(crate) extents: Vec<Extent>,

    /// Sum of the lengths of all extents.
    pub(crate) total_blocks: u64,

    /// Index of the most recently inserted or extended extent.
    ///
    /// This is only a starting point for the next insertion search; it
    /// is validated before use.
    last_touched: Option<usize>,

    /// Traversal position, or `None` if the chain has not been started
    /// or has been fully consumed.
    pub(crate) cursor: Option<ChainCursor>,

    /// Ordering hint used by [`ChainSet::insert_in_priority_order`].
    ///
    /// [`ChainSet::insert_in_priority_order`]: crate::ChainSet::insert_in_priority_order
    priority: i32,
}

impl ExtentChain {
    /// Create an empty chain with priority zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chain with the given `priority`.
    #[must_use]
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Create a chain from extents that are already sorted, compact,
    /// and counted. The cursor is placed at the first block.
    pub(crate) fn from_parts(extents: Vec<Extent>, total_blocks: u64) -> Self {
        let mut chain = Self {
            extents,
            total_blocks,
            ..Self::default()
        };
        chain.goto_start();
        chain
    }

    /// Ordering hint for this chain's backing store.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Set the ordering hint for this chain's backing store.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Total number of blocks in the chain.
    #[must_use]
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Number of extents in the chain.
    #[must_use]
    pub fn num_extents(&self) -> u32 {
        // OK to unwrap: `add_range` refuses to grow the chain past
        // `u32::MAX` extents, and deserialization reads a `u32` count.
        u32::try_from(self.extents.len()).unwrap()
    }

    /// Whether the chain has no extents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Extents in ascending order.
    #[must_use]
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    /// Iterator over every block in the chain, in ascending order.
    #[must_use]
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            extents: &self.extents,
            next: self.extents.first().map(|e| (0, e.start)),
        }
    }

    /// Add the blocks `start..=end` to the chain.
    ///
    /// If the range directly follows an existing extent, that extent is
    /// extended. If that closes the gap to the following extent as
    /// well, the two are merged. If the range directly precedes an
    /// existing extent, that extent is extended backwards. Otherwise a
    /// new extent is inserted in sorted position.
    ///
    /// The range must not overlap any block already in the chain. This
    /// is not checked.
    ///
    /// On error the chain is not modified.
    pub fn add_range(
        &mut self,
        start: BlockIndex,
        end: BlockIndex,
    ) -> Result<(), ChainError> {
        if start > end {
            return Err(ChainError::InvalidRange { start, end });
        }
        let num_blocks =
            num_blocks_inclusive(start, end).ok_or(ChainError::TooManyBlocks)?;
        let total_blocks = self
            .total_blocks
            .checked_add(num_blocks)
            .ok_or(ChainError::TooManyBlocks)?;

        let pred = self.find_predecessor(start);

        if let Some(cur) = pred {
            if self.extents[cur].end.checked_add(1) == Some(start) {
                self.extents[cur].end = end;

                // The new range may also bridge the gap to the next
                // extent, in which case the two are merged.
                //
                // OK to unwrap: `cur` is an index into `extents`.
                let next = cur.checked_add(1).unwrap();
                if let Some(next_extent) = self.extents.get(next).copied() {
                    if self.extents[cur].is_adjacent_to(&next_extent) {
                        self.extents[cur].end = next_extent.end;
                        self.extents.remove(next);
                        self.fix_cursor_after_remove(next, cur);
                    }
                }

                self.last_touched = Some(cur);
                self.total_blocks = total_blocks;
                return Ok(());
            }
        }

        // OK to unwrap: `cur` is an index into `extents`, so adding one
        // cannot overflow.
        let index = pred.map_or(0, |cur| cur.checked_add(1).unwrap());

        // The range may instead end directly before the next extent.
        if let Some(next_extent) = self.extents.get_mut(index) {
            if end.checked_add(1) == Some(next_extent.start) {
                next_extent.start = start;
                self.last_touched = Some(index);
                self.total_blocks = total_blocks;
                return Ok(());
            }
        }

        if u32::try_from(self.extents.len())
            .ok()
            .and_then(|n| n.checked_add(1))
            .is_none()
        {
            return Err(ChainError::TooManyExtents);
        }
        self.extents.try_reserve(1).map_err(|_| {
            warn!("unable to append a new extent to the chain");
            ChainError::Alloc
        })?;

        self.extents.insert(index, Extent { start, end });
        self.fix_cursor_after_insert(index);

        self.last_touched = Some(index);
        self.total_blocks = total_blocks;
        Ok(())
    }

    /// Find the index of the last extent whose start is less than
    /// `start`, or `None` if the range belongs at the head of the chain.
    ///
    /// The search begins at the locality hint if it precedes `start`,
    /// otherwise at the head. When neither precedes `start` the new
    /// range goes at the head.
    fn find_predecessor(&self, start: BlockIndex) -> Option<usize> {
        let hint = self
            .last_touched
            .filter(|&i| self.extents.get(i).is_some_and(|e| e.start < start));
        let mut cur = match hint {
            Some(i) => i,
            None if self.extents.first()?.start < start => 0,
            None => return None,
        };

        while let Some(next) = self.extents.get(cur.checked_add(1)?) {
            if next.start >= start {
                break;
            }
            cur = cur.checked_add(1)?;
        }
        Some(cur)
    }

    fn fix_cursor_after_insert(&mut self, inserted: usize) {
        if let Some(cursor) = &mut self.cursor {
            if cursor.extent >= inserted {
                // OK to unwrap: the index is bounded by the vec length.
                cursor.extent = cursor.extent.checked_add(1).unwrap();
            }
        }
    }

    fn fix_cursor_after_remove(&mut self, removed: usize, merged_into: usize) {
        if let Some(cursor) = &mut self.cursor {
            if cursor.extent == removed {
                cursor.extent = merged_into;
            } else if cursor.extent > removed {
                // OK to unwrap: `extent > removed >= 0`.
                cursor.extent = cursor.extent.checked_sub(1).unwrap();
            }
        }
    }

    /// Remove every extent and reset all counts, the cursor, and the
    /// locality hint. The priority is kept.
    ///
    /// Calling this on an empty chain is a no-op.
    pub fn clear(&mut self) {
        self.extents.clear();
        self.total_blocks = 0;
        self.last_touched = None;
        self.cursor = None;
    }

    /// Current block of the traversal cursor.
    #[must_use]
    pub fn current_offset(&self) -> Option<BlockIndex> {
        self.cursor.map(|c| c.offset)
    }

    /// Extent containing the traversal cursor.
    #[must_use]
    pub fn current_extent(&self) -> Option<&Extent> {
        self.cursor.and_then(|c| self.extents.get(c.extent))
    }

    /// Place the cursor at the first block, or clear it if the chain is
    /// empty.
    pub(crate) fn goto_start(&mut self) {
        self.cursor = self.extents.first().map(|e| ChainCursor {
            extent: 0,
            offset: e.start,
        });
    }

    /// Whether the cursor is where [`ExtentChain::goto_start`] puts it.
    pub(crate) fn is_at_start(&self) -> bool {
        self.cursor
            == self.extents.first().map(|e| ChainCursor {
                extent: 0,
                offset: e.start,
            })
    }

    /// Move the cursor forward one block, hopping to the next extent at
    /// the end of the current one. The cursor is cleared after the last
    /// block.
    pub(crate) fn step(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let extent = self.extents[cursor.extent];

        self.cursor = if cursor.offset == extent.end {
            // OK to unwrap: the index is bounded by the vec length.
            let next = cursor.extent.checked_add(1).unwrap();
            self.extents.get(next).map(|e| ChainCursor {
                extent: next,
                offset: e.start,
            })
        } else {
            // OK to unwrap: `offset < extent.end`.
            Some(ChainCursor {
                extent: cursor.extent,
                offset: cursor.offset.checked_add(1).unwrap(),
            })
        };
    }

    /// Number of extents before the cursor's extent. An exhausted or
    /// unstarted cursor is one past the last extent.
    pub(crate) fn cursor_ordinal(&self) -> u32 {
        match self.cursor {
            // OK to unwrap: the extent count fits in a `u32`.
            Some(c) => u32::try_from(c.extent).unwrap(),
            None => self.num_extents(),
        }
    }

    /// Cursor for `offset` within the extent at `ordinal`, or `None` if
    /// that position does not exist in this chain.
    ///
    /// An `ordinal` equal to the extent count is the position of an
    /// exhausted cursor, so `Some(None)` is returned.
    pub(crate) fn cursor_at(
        &self,
        ordinal: u32,
        offset: BlockIndex,
    ) -> Option<Option<ChainCursor>> {
        let index = usize_from_u32(ordinal);
        if index == self.extents.len() {
            return Some(None);
        }
        let extent = self.extents.get(index)?;
        if !extent.contains(offset) {
            return None;
        }
        Some(Some(ChainCursor {
            extent: index,
            offset,
        }))
    }
}

/// Iterator over every block in an [`ExtentChain`].
///
/// Created by [`ExtentChain::blocks`].
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    extents: &'a [Extent],
    next: Option<(usize, BlockIndex)>,
}

impl Iterator for Blocks<'_> {
    type Item = BlockIndex;

    fn next(&mut self) -> Option<BlockIndex> {
        let (index, block) = self.next?;
        let extent = self.extents[index];

        self.next = if block == extent.end {
            let next = index.checked_add(1)?;
            self.extents.get(next).map(|e| (next, e.start))
        } else {
            block.checked_add(1).map(|b| (index, b))
        };
        Some(block)
    }
}

impl FusedIterator for Blocks<'_> {}
