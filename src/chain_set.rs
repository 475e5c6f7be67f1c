// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::block_index::BlockIndex;
use crate::chain::ExtentChain;
use crate::error::ChainError;
use alloc::vec::Vec;
use log::debug;

/// Maximum number of chains in a [`ChainSet`]. This matches the number
/// of swap devices the image writer can stripe across.
pub const MAX_CHAINS: usize = 32;

/// How [`ChainSet::advance`] picks the chain to continue from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraversalMode {
    /// Drain each chain completely before moving on to the next one.
    Sequential,

    /// Move to the next chain with blocks left after every step,
    /// wrapping around at the end. This spreads a single stream of
    /// blocks evenly over every backing store.
    Striped,
}

/// Array of chains treated as one logical address space.
///
/// The index of a chain is its device slot. The set has a single
/// cursor naming the active chain; each chain tracks its own position.
/// Once every chain is exhausted the set stays at the end until it is
/// reset or a position is restored.
#[derive(Clone, Debug, Default)]
pub struct ChainSet {
    pub(crate) chains: Vec<ExtentChain>,

    /// Index of the active chain.
    ///
    /// `None` means traversal has not started. `Some(chains.len())`
    /// means every chain is exhausted.
    pub(crate) current_chain: Option<usize>,

    /// Chain indices, highest priority first.
    priority_order: Vec<usize>,
}

impl ChainSet {
    /// Create a set from `chains`. Traversal has not started.
    ///
    /// Returns [`ChainError::TooManyChains`] if there are more than
    /// [`MAX_CHAINS`] chains.
    pub fn new(chains: Vec<ExtentChain>) -> Result<Self, ChainError> {
        if chains.len() > MAX_CHAINS {
            return Err(ChainError::TooManyChains(chains.len()));
        }
        Ok(Self {
            chains,
            current_chain: None,
            priority_order: Vec::new(),
        })
    }

    /// Create a set of `num_chains` empty chains.
    pub fn with_empty_chains(num_chains: usize) -> Result<Self, ChainError> {
        if num_chains > MAX_CHAINS {
            return Err(ChainError::TooManyChains(num_chains));
        }
        let mut chains = Vec::new();
        chains.resize_with(num_chains, ExtentChain::new);
        Self::new(chains)
    }

    /// Number of chains in the set.
    #[must_use]
    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    /// All chains, in slot order.
    #[must_use]
    pub fn chains(&self) -> &[ExtentChain] {
        &self.chains
    }

    /// Get the chain in slot `index`.
    #[must_use]
    pub fn chain(&self, index: usize) -> Option<&ExtentChain> {
        self.chains.get(index)
    }

    /// Get the chain in slot `index` for modification.
    ///
    /// Call [`ChainSet::reset_to_start`] after adding ranges to a chain
    /// that traversal has already visited.
    pub fn chain_mut(&mut self, index: usize) -> Option<&mut ExtentChain> {
        self.chains.get_mut(index)
    }

    /// Sum of the block counts of every chain.
    #[must_use]
    pub fn total_blocks(&self) -> u64 {
        self.chains
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.total_blocks()))
    }

    /// Index of the active chain, or `None` if traversal has not
    /// started or every chain is exhausted.
    #[must_use]
    pub fn current_chain(&self) -> Option<usize> {
        self.current_chain.filter(|&i| i < self.chains.len())
    }

    /// Whether [`ChainSet::reset_to_start`] or [`ChainSet::advance`]
    /// has been called since the set was created or cleared.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.current_chain.is_some()
    }

    /// Whether traversal has reached the end of every chain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current_chain == Some(self.chains.len())
    }

    /// Current block of the active chain.
    #[must_use]
    pub fn current_offset(&self) -> Option<BlockIndex> {
        self.chains.get(self.current_chain()?)?.current_offset()
    }

    /// Move every chain's cursor to its first block and make chain zero
    /// active.
    pub fn reset_to_start(&mut self) {
        for chain in &mut self.chains {
            chain.goto_start();
        }
        self.current_chain = Some(0);
    }

    /// Whether the set is positioned exactly as [`ChainSet::reset_to_start`]
    /// leaves it.
    pub(crate) fn is_at_start(&self) -> bool {
        self.current_chain == Some(0)
            && self.chains.iter().all(ExtentChain::is_at_start)
    }

    /// Step the active chain forward by `blocks` blocks, then pick the
    /// next active chain according to `mode`.
    ///
    /// Returns the current block of the newly active chain, or `None`
    /// once every chain is exhausted. Running out of blocks is not an
    /// error; when the image is compressed it may be shorter than the
    /// storage allocated for it.
    ///
    /// If traversal has not started, the set is first reset to the
    /// start.
    ///
    /// Chains are expected to hold a multiple of `blocks` blocks, so a
    /// step never straddles the end of a chain.
    pub fn advance(
        &mut self,
        blocks: u32,
        mode: TraversalMode,
    ) -> Option<BlockIndex> {
        let current = match self.current_chain {
            Some(current) => current,
            None => {
                self.reset_to_start();
                0
            }
        };
        let chain = self.chains.get_mut(current)?;

        for _ in 0..blocks {
            chain.step();
        }

        if mode == TraversalMode::Striped || chain.current_offset().is_none()
        {
            match mode {
                TraversalMode::Sequential => self.find_next_chain_sequential(),
                TraversalMode::Striped => self.find_next_chain_striped(),
            }
        }

        let offset = self.current_offset();
        if offset.is_none() {
            debug!("reached the end of {} chains", self.chains.len());
        }
        offset
    }

    /// Move past exhausted chains, starting each newly reached chain at
    /// its first block.
    fn find_next_chain_sequential(&mut self) {
        let Some(mut current) = self.current_chain else {
            return;
        };

        while self
            .chains
            .get(current)
            .is_some_and(|c| c.current_offset().is_none())
        {
            // OK to unwrap: `current` is a valid index into `chains`.
            current = current.checked_add(1).unwrap();
            if let Some(chain) = self.chains.get_mut(current) {
                chain.goto_start();
            }
        }
        self.current_chain = Some(current);
    }

    /// Move to the next chain, in round-robin order, that still has
    /// blocks. If no other chain has blocks, the current chain is used
    /// again. If it doesn't have blocks either, the set is exhausted.
    fn find_next_chain_striped(&mut self) {
        let Some(start) = self.current_chain() else {
            return;
        };
        let num_chains = self.chains.len();

        let mut current = start;
        loop {
            // OK to unwrap: `current` is a valid index into `chains`.
            current = current.checked_add(1).unwrap() % num_chains;
            if current == start {
                break;
            }
            if self.chains[current].current_offset().is_some() {
                self.current_chain = Some(current);
                return;
            }
        }

        if self.chains[start].current_offset().is_none() {
            self.current_chain = Some(num_chains);
        }
    }

    /// Record chain `index` in the priority list. Chains with a higher
    /// [`ExtentChain::priority`] come first; chains with equal priority
    /// stay in the order they were recorded. A chain that is already in
    /// the list is moved to match its current priority.
    ///
    /// Returns [`ChainError::InvalidChainIndex`] if `index` is not a
    /// valid chain index; the list is not modified.
    pub fn insert_in_priority_order(
        &mut self,
        index: usize,
    ) -> Result<(), ChainError> {
        let priority = self
            .chains
            .get(index)
            .ok_or(ChainError::InvalidChainIndex(index))?
            .priority();

        self.priority_order.retain(|&i| i != index);
        let pos = self
            .priority_order
            .iter()
            .position(|&i| self.chains[i].priority() < priority)
            .unwrap_or(self.priority_order.len());
        self.priority_order.insert(pos, index);
        Ok(())
    }

    /// Chain indices recorded with [`ChainSet::insert_in_priority_order`],
    /// highest priority first.
    #[must_use]
    pub fn priority_order(&self) -> &[usize] {
        &self.priority_order
    }

    /// Release every extent of every chain and return to the
    /// not-started state. The chains themselves, their priorities, and
    /// the priority list are kept.
    pub fn clear(&mut self) {
        for chain in &mut self.chains {
            chain.clear();
        }
        self.current_chain = None;
    }
}
