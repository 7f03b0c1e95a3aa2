//! # Physical Memory Manager
//!
//! This crate owns every unassigned page of physical memory. It hands out
//! page-granular [`Region`]s and takes them back, and it guarantees that the
//! pages the running kernel image occupies are never handed out.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Process-wide singleton ([`global`])      │
//! │    • SyncOnceCell<SpinLock<PhysicalAllocator>>      │
//! │    • every access with interrupts masked            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │          Physical Allocator ([`phys_alloc`])        │
//! │    • bootstrap region, consumed first               │
//! │    • free list for everything freed afterwards      │
//! │    • kernel image withheld on every free            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │   Region Pool ([`region_pool`]) / Region ([`region`])│
//! │    • sorted, disjoint, coalesced page ranges        │
//! │    • first-fit carving and exact-range removal      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Model
//!
//! A [`Region`] is neither `Copy` nor `Clone`. Whoever holds one owns the
//! pages it describes, and the only way to give them back is to move the
//! region into [`PhysicalAllocator::free_region`] (or a [`RegionPool`]). The
//! type system therefore rules out the "two owners of one page range" class
//! of bugs at the API boundary; the pool rejects the rest (an overlapping
//! insert is a double free and panics).
//!
//! ## Error Tiers
//!
//! * **Checked absence**: [`RegionPool::take`] yields [`Region::empty`] when
//!   nothing fits; [`PhysicalAllocator::try_alloc_region`] and
//!   [`RegionPool::take_exact`] return `Result`s.
//! * **Fatal**: geometry precondition violations, double frees and running
//!   out of memory in [`PhysicalAllocator::alloc_region`] panic with the
//!   offending region in the message.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_pmm::{PhysicalAllocator, Region};
//!
//! // The kernel image occupies pages 256..512.
//! let mut pmm = PhysicalAllocator::new(Region::from_page(256, 256));
//!
//! // Boot memory map: pages 0..1024 are usable RAM.
//! pmm.free_region(Region::from_page(0, 1024));
//! assert_eq!(pmm.available_pages(), 768);
//!
//! let stack = pmm.alloc_region(4);
//! assert_eq!(stack.base_page(), 0);
//! pmm.free_region(stack);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod global;
pub mod phys_alloc;
pub mod phys_mapper;
pub mod region;
pub mod region_pool;

pub use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
pub use phys_alloc::{AllocError, PhysicalAllocator, RegionAllocator};
pub use phys_mapper::{HhdmPhysMapper, IdentityPhysMapper, PhysMapper};
pub use region::Region;
pub use region_pool::{PoolError, RegionPool};
