//! # Kernel-wide physical page allocator
//!
//! [`PhysicalAllocator`] is the single owner of all unassigned physical
//! pages. It starts out empty and *un-bootstrapped*:
//!
//! ```text
//!            free_region(r)                     free_region(r)
//!  ┌────────────────┐  (first, outside kernel)  ┌──────────────────┐
//!  │ un-bootstrapped│ ─────────────────────────►│   bootstrapped   │◄──┐
//!  └────────────────┘   r becomes `bootstrap`   └──────────────────┘   │
//!          │                                       │  r merges into   │
//!          │ alloc_region(n): fatal                │  the free list ──┘
//! ```
//!
//! The first region freed that lies outside the kernel image becomes the
//! *bootstrap* region. Allocations carve from it first and fall back to the
//! free list once it is too small. A later free that borders what is left of
//! the bootstrap region grows it back; every other free is coalesced into
//! the free list.
//!
//! Whatever part of a freed region coincides with the kernel image is
//! silently withheld, so the pages of the running kernel are never handed
//! out, no matter what the firmware memory map claims.

use crate::{Region, RegionPool};
use kernel_sync::SpinLock;
use log::{info, trace, warn};

/// Errors returned by [`PhysicalAllocator::try_alloc_region`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("physical allocator not bootstrapped: no memory has been freed into it yet")]
    NotBootstrapped,
    #[error("zero-page allocation requested")]
    ZeroPages,
    #[error("out of memory: {requested} pages requested, {available} pages free")]
    OutOfMemory { requested: u64, available: u64 },
}

/// Something that hands out and takes back physical page ranges.
///
/// This is the seam through which owners of physical memory (stacks, for
/// one) return their pages on destruction without naming a concrete
/// allocator instance.
pub trait RegionAllocator: Send + Sync {
    /// Allocates `page_count` contiguous pages.
    ///
    /// # Panics
    /// Implementations panic when the request cannot be served.
    fn alloc_region(&self, page_count: u64) -> Region;

    /// Returns a region previously obtained from [`alloc_region`](Self::alloc_region).
    fn free_region(&self, region: Region);
}

/// Bootstrap region + free list, with the kernel image carved out.
#[derive(Debug)]
pub struct PhysicalAllocator {
    kernel_region: Region,
    bootstrapped: bool,
    bootstrap: Region,
    free_list: RegionPool,
}

impl PhysicalAllocator {
    /// Creates an un-bootstrapped allocator that will never hand out the
    /// pages of `kernel_region`.
    #[must_use]
    pub const fn new(kernel_region: Region) -> Self {
        Self {
            kernel_region,
            bootstrapped: false,
            bootstrap: Region::empty(),
            free_list: RegionPool::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// The pages this allocator withholds.
    #[inline]
    #[must_use]
    pub const fn kernel_region(&self) -> &Region {
        &self.kernel_region
    }

    /// What is left of the bootstrap region.
    #[inline]
    #[must_use]
    pub const fn bootstrap_region(&self) -> &Region {
        &self.bootstrap
    }

    #[inline]
    #[must_use]
    pub const fn free_list(&self) -> &RegionPool {
        &self.free_list
    }

    /// Pages currently available for allocation.
    #[inline]
    #[must_use]
    pub const fn available_pages(&self) -> u64 {
        self.bootstrap.page_count() + self.free_list.quantity()
    }

    /// Allocates `page_count` contiguous pages.
    ///
    /// # Errors
    /// - [`AllocError::NotBootstrapped`] before the first successful free,
    /// - [`AllocError::ZeroPages`] for an empty request,
    /// - [`AllocError::OutOfMemory`] if neither the bootstrap region nor any
    ///   free-list entry can hold the request.
    pub fn try_alloc_region(&mut self, page_count: u64) -> Result<Region, AllocError> {
        if !self.bootstrapped {
            return Err(AllocError::NotBootstrapped);
        }
        if page_count == 0 {
            return Err(AllocError::ZeroPages);
        }

        let region = if self.bootstrap.page_count() >= page_count {
            let region = self.bootstrap.take(page_count);
            if self.bootstrap.is_empty() {
                info!("The bootstrap region is now empty");
            }
            region
        } else {
            self.free_list.take(page_count)
        };

        if region.is_empty() {
            return Err(AllocError::OutOfMemory {
                requested: page_count,
                available: self.available_pages(),
            });
        }

        trace!("Allocated {region}");
        Ok(region)
    }

    /// Allocates `page_count` contiguous pages.
    ///
    /// # Panics
    /// On every condition [`try_alloc_region`](Self::try_alloc_region)
    /// reports as an error; in the kernel these are unrecoverable.
    pub fn alloc_region(&mut self, page_count: u64) -> Region {
        match self.try_alloc_region(page_count) {
            Ok(region) => region,
            Err(e) => panic!("alloc_region({page_count}): {e}"),
        }
    }

    /// Hands `region` to the allocator.
    ///
    /// # Panics
    /// If `region` overlaps memory the allocator already holds (double free).
    pub fn free_region(&mut self, region: Region) {
        if region.is_empty() {
            return;
        }

        if region.is_overlapping_with(&self.kernel_region) {
            let below = region.half_under(&self.kernel_region);
            let above = region.half_over(&self.kernel_region);
            warn!(
                "Withholding kernel image {} from {region}",
                self.kernel_region
            );

            self.free_region(below);
            self.free_region(above);
        } else if !self.bootstrapped {
            info!("Bootstrapping with {region}");
            self.bootstrap = region;
            self.bootstrapped = true;
        } else {
            assert!(
                !region.is_overlapping_with(&self.bootstrap),
                "double free: {region} overlaps the bootstrap {}",
                self.bootstrap
            );

            if region.is_contiguous_with(&self.bootstrap) {
                trace!("Returning {region} to the bootstrap {}", self.bootstrap);
                self.bootstrap.merge(region);
            } else {
                trace!("Freeing {region}");
                self.free_list.put(region);
            }
        }
    }

    /// Frees every usable range of a boot memory map, in order.
    ///
    /// The first range that is not entirely kernel image bootstraps the
    /// allocator.
    pub fn free_usable(&mut self, regions: impl IntoIterator<Item = Region>) {
        for region in regions {
            self.free_region(region);
        }
    }
}

impl RegionAllocator for SpinLock<PhysicalAllocator> {
    fn alloc_region(&self, page_count: u64) -> Region {
        self.lock_irq().alloc_region(page_count)
    }

    fn free_region(&self, region: Region) {
        self.lock_irq().free_region(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_free_bootstraps() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        assert!(!pmm.is_bootstrapped());

        pmm.free_region(Region::from_page(16, 64));
        assert!(pmm.is_bootstrapped());
        assert_eq!(pmm.bootstrap_region(), &Region::from_page(16, 64));
        assert!(pmm.free_list().is_empty());
    }

    #[test]
    fn bootstrap_round_trip_returns_the_same_region() {
        let mut pmm = PhysicalAllocator::new(Region::from_page(0x100, 0x80));
        pmm.free_region(Region::from_page(0x400, 32));

        let region = pmm.alloc_region(32);
        assert_eq!(region, Region::from_page(0x400, 32));
        assert_eq!(pmm.available_pages(), 0);
    }

    #[test]
    fn kernel_image_is_withheld() {
        let mut pmm = PhysicalAllocator::new(Region::from_page(100, 50));
        pmm.free_region(Region::from_page(80, 100));

        assert_eq!(pmm.bootstrap_region(), &Region::from_page(80, 20));
        let pooled: alloc::vec::Vec<_> = pmm
            .free_list()
            .iter()
            .map(|r| (r.base_page(), r.page_count()))
            .collect();
        assert_eq!(pooled, [(150, 30)]);
        assert_eq!(pmm.available_pages(), 50);
    }

    #[test]
    fn region_entirely_inside_the_kernel_does_not_bootstrap() {
        let mut pmm = PhysicalAllocator::new(Region::from_page(100, 50));
        pmm.free_region(Region::from_page(110, 10));
        assert!(!pmm.is_bootstrapped());
        assert_eq!(pmm.available_pages(), 0);
    }

    #[test]
    fn allocations_fall_back_to_the_free_list() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 4));
        pmm.free_region(Region::from_page(32, 16));

        let big = pmm.alloc_region(8);
        assert_eq!(big, Region::from_page(32, 8));

        let small = pmm.alloc_region(4);
        assert_eq!(small, Region::from_page(0, 4));
        assert!(pmm.bootstrap_region().is_empty());
    }

    #[test]
    fn freed_neighbors_coalesce_in_the_free_list() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 1));
        pmm.free_region(Region::from_page(20, 4));
        pmm.free_region(Region::from_page(10, 4));
        pmm.free_region(Region::from_page(14, 6));

        assert_eq!(pmm.free_list().len(), 1);
        assert_eq!(pmm.alloc_region(14), Region::from_page(10, 14));
    }

    #[test]
    fn pages_returned_to_the_bootstrap_are_allocatable_as_one_run() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 16));

        let head = pmm.alloc_region(4);
        pmm.free_region(head);
        assert_eq!(pmm.bootstrap_region(), &Region::from_page(0, 16));
        assert!(pmm.free_list().is_empty());

        assert_eq!(pmm.alloc_region(16), Region::from_page(0, 16));
    }

    #[test]
    fn bootstrap_grows_on_either_side() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(8, 8));
        pmm.free_region(Region::from_page(16, 4));
        pmm.free_region(Region::from_page(4, 4));

        assert_eq!(pmm.bootstrap_region(), &Region::from_page(4, 16));
        assert!(pmm.free_list().is_empty());
        assert_eq!(pmm.available_pages(), 16);
    }

    #[test]
    fn exhausted_bootstrap_does_not_absorb_frees() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 4));
        let all = pmm.alloc_region(4);
        pmm.free_region(all);

        assert!(pmm.bootstrap_region().is_empty());
        assert_eq!(pmm.free_list().len(), 1);
        assert_eq!(pmm.alloc_region(4), Region::from_page(0, 4));
    }

    #[test]
    fn errors_are_reported_by_the_checked_path() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        assert_eq!(pmm.try_alloc_region(1), Err(AllocError::NotBootstrapped));

        pmm.free_region(Region::from_page(0, 2));
        assert_eq!(pmm.try_alloc_region(0), Err(AllocError::ZeroPages));
        assert_eq!(
            pmm.try_alloc_region(3),
            Err(AllocError::OutOfMemory {
                requested: 3,
                available: 2
            })
        );
    }

    #[test]
    #[should_panic(expected = "not bootstrapped")]
    fn alloc_before_bootstrap_is_fatal() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        let _ = pmm.alloc_region(1);
    }

    #[test]
    #[should_panic(expected = "out of memory")]
    fn exhaustion_is_fatal() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 2));
        let _ = pmm.alloc_region(2);
        let _ = pmm.alloc_region(1);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn freeing_into_the_bootstrap_is_fatal() {
        let mut pmm = PhysicalAllocator::new(Region::empty());
        pmm.free_region(Region::from_page(0, 16));
        pmm.free_region(Region::from_page(8, 1));
    }
}
