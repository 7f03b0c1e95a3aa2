//! # Page-granular physical memory ranges
//!
//! A [`Region`] describes a contiguous run of physical pages by its first
//! page index and its length in pages:
//!
//! ```text
//!  base_page                      end_page
//!  ▼                              ▼
//!  ┌──────┬──────┬──────┬──────┐
//!  │  p0  │  p1  │  p2  │  p3  │   page_count = 4
//!  └──────┴──────┴──────┴──────┘
//!  ▲                              ▲
//!  base_address()                 end_address() (exclusive)
//! ```
//!
//! A region with `page_count == 0` is the canonical *empty* region. It
//! carries no ownership claim, never overlaps anything and is never
//! contiguous with anything.
//!
//! Regions are deliberately neither `Copy` nor `Clone`: holding a `Region`
//! means owning the pages it names.

use core::fmt;
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE};
use kernel_memory_addresses::PhysicalAddress;

/// Largest `end_page` a region may have; its end address still fits a `u64`.
pub const PAGE_LIMIT: u64 = u64::MAX >> PAGE_SHIFT;

/// A contiguous span of physical pages.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "a Region owns its pages; hand it back to the allocator instead of dropping it"]
pub struct Region {
    base_page: u64,
    page_count: u64,
}

impl Region {
    /// The empty region.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            base_page: 0,
            page_count: 0,
        }
    }

    /// Describes `page_count` pages starting at page index `base_page`.
    ///
    /// The caller is responsible for not creating two live claims on the
    /// same pages.
    ///
    /// # Panics
    /// If the region would end beyond [`PAGE_LIMIT`], i.e. its byte
    /// addresses would not fit a `u64`.
    #[inline]
    pub const fn from_page(base_page: u64, page_count: u64) -> Self {
        let in_range = match base_page.checked_add(page_count) {
            Some(end_page) => end_page <= PAGE_LIMIT,
            None => false,
        };
        assert!(in_range, "region extends past the end of the physical address space");
        Self {
            base_page,
            page_count,
        }
    }

    /// Describes the whole pages inside the byte range `[address, address + length)`.
    ///
    /// The start is rounded up and the end rounded down, so partially covered
    /// pages at either edge are excluded. Yields [`Region::empty`] if no
    /// whole page fits.
    pub const fn from_address_range(address: PhysicalAddress, length: u64) -> Self {
        let first = address.as_u64().div_ceil(PAGE_SIZE);
        let last = address.as_u64().saturating_add(length) >> PAGE_SHIFT;
        if last <= first {
            return Self::empty();
        }
        Self::from_page(first, last - first)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.page_count == 0
    }

    #[inline]
    #[must_use]
    pub const fn base_page(&self) -> u64 {
        self.base_page
    }

    #[inline]
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.page_count
    }

    /// One past the last page of the region.
    #[inline]
    #[must_use]
    pub const fn end_page(&self) -> u64 {
        self.base_page + self.page_count
    }

    #[inline]
    #[must_use]
    pub const fn base_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base_page * PAGE_SIZE)
    }

    /// One past the last byte of the region.
    #[inline]
    #[must_use]
    pub const fn end_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.end_page() * PAGE_SIZE)
    }

    /// Size of the region in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.page_count * PAGE_SIZE
    }

    /// Splits the lowest `page_count` pages off this region and returns them.
    ///
    /// `self` keeps the remaining upper part.
    ///
    /// # Panics
    /// If `page_count` exceeds the size of this region.
    pub fn take(&mut self, page_count: u64) -> Self {
        assert!(
            page_count <= self.page_count,
            "cannot take {page_count} pages from {self}"
        );

        let taken = Self::from_page(self.base_page, page_count);
        self.base_page += page_count;
        self.page_count -= page_count;
        taken
    }

    /// Whether both regions share at least one page.
    #[inline]
    #[must_use]
    pub const fn is_overlapping_with(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.base_page < other.end_page()
            && other.base_page < self.end_page()
    }

    /// Whether one region ends exactly where the other begins.
    #[inline]
    #[must_use]
    pub const fn is_contiguous_with(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.end_page() == other.base_page || other.end_page() == self.base_page)
    }

    /// Whether every page of `other` lies inside this region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        !other.is_empty()
            && self.base_page <= other.base_page
            && other.end_page() <= self.end_page()
    }

    /// Grows this region by a contiguous neighbor on either side.
    ///
    /// # Panics
    /// If the regions are not contiguous.
    pub fn merge(&mut self, other: Self) {
        assert!(
            self.is_contiguous_with(&other),
            "cannot merge {other} into non-contiguous {self}"
        );

        self.base_page = self.base_page.min(other.base_page);
        self.page_count += other.page_count;
    }

    /// The part of this region strictly below `other.base_page()`.
    pub const fn half_under(&self, other: &Self) -> Self {
        if self.is_empty() || self.base_page >= other.base_page {
            return Self::empty();
        }

        let end = if self.end_page() < other.base_page {
            self.end_page()
        } else {
            other.base_page
        };
        Self::from_page(self.base_page, end - self.base_page)
    }

    /// The part of this region at or above `other.end_page()`.
    pub const fn half_over(&self, other: &Self) -> Self {
        if self.is_empty() || self.end_page() <= other.end_page() {
            return Self::empty();
        }

        let base = if self.base_page > other.end_page() {
            self.base_page
        } else {
            other.end_page()
        };
        Self::from_page(base, self.end_page() - base)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Region(empty)");
        }
        write!(
            f,
            "Region({}-{}, {} pages)",
            self.base_address(),
            self.end_address(),
            self.page_count
        )
    }
}
