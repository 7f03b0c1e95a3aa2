//! # Region pools
//!
//! A [`RegionPool`] is an ordered collection of available [`Region`]s. It
//! backs the allocator's free list and can serve any subsystem that wants a
//! private supply of physical pages.
//!
//! ## Invariants
//! After every public operation returns:
//! - entries are sorted by `base_page`, ascending;
//! - no two entries overlap;
//! - no two entries are contiguous (neighbors are always merged);
//! - no entry is empty;
//! - `quantity()` equals the sum of all entries' page counts.

use crate::Region;
use alloc::vec::Vec;
use log::trace;

/// Errors returned by [`RegionPool::take_exact`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pages {base_page:#x}..{end_page:#x} are not held by a single pool entry")]
    NotContained { base_page: u64, end_page: u64 },
}

/// Sorted, disjoint, coalesced collection of available page ranges.
#[derive(Debug, Default)]
pub struct RegionPool {
    regions: Vec<Region>,
    quantity: u64,
}

impl RegionPool {
    /// An empty pool. Does not allocate until the first [`put`](Self::put).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
            quantity: 0,
        }
    }

    /// Total number of pages held.
    #[inline]
    #[must_use]
    pub const fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Number of disjoint entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Entries in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Whether every page of `region` is available in this pool.
    #[must_use]
    pub fn contains(&self, region: &Region) -> bool {
        self.regions.iter().any(|entry| entry.contains(region))
    }

    /// Carves `how_many_pages` pages off the first entry large enough (first fit,
    /// lowest address first).
    ///
    /// Returns [`Region::empty`] if no single entry is large enough.
    pub fn take(&mut self, how_many_pages: u64) -> Region {
        let Some(index) = self
            .regions
            .iter()
            .position(|entry| entry.page_count() >= how_many_pages)
        else {
            return Region::empty();
        };

        let region = self.regions[index].take(how_many_pages);
        if self.regions[index].is_empty() {
            let _ = self.regions.remove(index);
        }
        self.quantity -= region.page_count();

        trace!("Pool handed out {region}");
        region
    }

    /// Removes exactly the pages of `exact` from the pool.
    ///
    /// The caller already owns `exact` (e.g. it describes firmware-reserved
    /// memory); whatever of the containing entry lies below and above it
    /// stays in the pool.
    ///
    /// # Errors
    /// [`PoolError::NotContained`] if no entry holds all of `exact`. The pool
    /// is left unchanged.
    pub fn take_exact(&mut self, exact: &Region) -> Result<(), PoolError> {
        if exact.is_empty() {
            return Ok(());
        }

        let Some(index) = self.regions.iter().position(|entry| entry.contains(exact)) else {
            return Err(PoolError::NotContained {
                base_page: exact.base_page(),
                end_page: exact.end_page(),
            });
        };

        let entry = self.regions.remove(index);
        self.quantity -= entry.page_count();

        trace!("Pool carving {exact} out of {entry}");
        self.put(entry.half_under(exact));
        self.put(entry.half_over(exact));
        Ok(())
    }

    /// Returns `region` to the pool, coalescing it with its neighbors.
    ///
    /// Empty regions are ignored.
    ///
    /// # Panics
    /// If `region` overlaps a pooled entry: the same pages were freed twice.
    pub fn put(&mut self, region: Region) {
        if region.is_empty() {
            return;
        }

        // The list is sorted and disjoint, so only the entry just below the
        // insertion point and the one at it can overlap or touch `region`.
        let index = self
            .regions
            .partition_point(|entry| entry.base_page() < region.base_page());

        for neighbor in [index.checked_sub(1), Some(index)].into_iter().flatten() {
            if let Some(entry) = self.regions.get(neighbor) {
                assert!(
                    !entry.is_overlapping_with(&region),
                    "double free: {region} overlaps pooled {entry}"
                );
            }
        }

        let pages = region.page_count();
        let joins_left = index > 0 && self.regions[index - 1].is_contiguous_with(&region);
        let joins_right =
            index < self.regions.len() && self.regions[index].is_contiguous_with(&region);

        match (joins_left, joins_right) {
            (true, true) => {
                let right = self.regions.remove(index);
                let left = &mut self.regions[index - 1];
                left.merge(region);
                left.merge(right);
            }
            (true, false) => self.regions[index - 1].merge(region),
            (false, true) => self.regions[index].merge(region),
            (false, false) => self.regions.insert(index, region),
        }

        self.quantity += pages;
    }
}
