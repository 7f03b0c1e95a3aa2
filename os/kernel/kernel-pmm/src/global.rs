//! # Process-wide physical allocator
//!
//! The kernel has exactly one [`PhysicalAllocator`]. It is built once during
//! early boot by [`init`] and lives for the rest of the kernel's lifetime.
//! Every access masks interrupts for its duration, so code running from an
//! interrupt handler can never observe it half-updated.
//!
//! ## Lock order
//! The allocator lock is a leaf: it is taken last and nothing is locked
//! while holding it. Dropping a thread stack takes it, so a thread must not
//! be released from inside [`with_allocator`]. The scheduler releases
//! retired threads only after dropping its own lock.

use crate::{PhysicalAllocator, Region, RegionAllocator};
use kernel_sync::{SpinLock, SyncOnceCell};
use log::warn;

static PMM: SyncOnceCell<SpinLock<PhysicalAllocator>> = SyncOnceCell::new();

/// Builds the kernel-wide allocator. Call once in very early boot, before
/// freeing the boot memory map into it.
///
/// Later calls are ignored.
pub fn init(kernel_region: Region) {
    if let Err(rejected) = PMM.set(SpinLock::new(PhysicalAllocator::new(kernel_region))) {
        warn!(
            "Physical allocator already initialized; ignoring kernel region {}",
            rejected.into_inner().kernel_region()
        );
    }
}

/// Whether [`init`] has run.
#[must_use]
pub fn is_initialized() -> bool {
    PMM.is_initialized()
}

/// Runs `f` on the kernel-wide allocator with interrupts masked.
///
/// `f` must not drop anything that frees physical memory (such as a stack);
/// that would re-enter the allocator lock (see the lock order above).
///
/// # Panics
/// If [`init`] has not run.
pub fn with_allocator<R>(f: impl FnOnce(&mut PhysicalAllocator) -> R) -> R {
    let Some(pmm) = PMM.get() else {
        panic!("physical allocator used before init");
    };
    pmm.with_lock_irq(f)
}

/// Allocates from the kernel-wide allocator.
///
/// # Panics
/// If [`init`] has not run or the request cannot be served.
pub fn alloc_region(page_count: u64) -> Region {
    with_allocator(|pmm| pmm.alloc_region(page_count))
}

/// Returns pages to the kernel-wide allocator.
///
/// # Panics
/// If [`init`] has not run or `region` is already free.
pub fn free_region(region: Region) {
    with_allocator(|pmm| pmm.free_region(region));
}

/// [`RegionAllocator`] handle onto the kernel-wide allocator.
#[derive(Debug, Default, Copy, Clone)]
pub struct GlobalPhysAlloc;

impl RegionAllocator for GlobalPhysAlloc {
    fn alloc_region(&self, page_count: u64) -> Region {
        alloc_region(page_count)
    }

    fn free_region(&self, region: Region) {
        free_region(region);
    }
}
