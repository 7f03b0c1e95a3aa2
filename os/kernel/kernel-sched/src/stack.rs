//! # Thread stacks
//!
//! A [`Stack`] owns one physical [`Region`] and a stack pointer that starts
//! at the region's upper end and grows downward. All addresses a stack
//! exposes are *virtual*: the region is translated once, through a
//! [`PhysMapper`], into the range the CPU uses when it runs on the stack.
//!
//! ```text
//! base()                                     top()
//! ▼                                          ▼
//! ┌──────────────────────────────┬───────────┐
//! │            free              │  pushed   │   phys: region.base_address()..region.end_address()
//! └──────────────────────────────┴───────────┘
//!                                ▲
//!                                pointer()
//! ```
//!
//! While the thread is suspended, the pointer is where its register snapshot
//! lives; the scheduler persists and restores it across switches.

use alloc::sync::Arc;
use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_memory_addresses::VirtualAddress;
use kernel_pmm::{PhysMapper, Region, RegionAllocator};
use log::trace;

pub struct Stack {
    region: Region,
    base: VirtualAddress,
    top: VirtualAddress,
    pointer: AtomicU64,
    allocator: Arc<dyn RegionAllocator>,
}

impl Stack {
    /// Allocates `page_count` pages from `allocator` and maps them through
    /// `mapper`; the pointer starts at the top of the mapped range.
    ///
    /// # Panics
    /// If the allocator cannot serve the request.
    pub fn new(
        allocator: Arc<dyn RegionAllocator>,
        mapper: &dyn PhysMapper,
        page_count: u64,
    ) -> Self {
        let region = allocator.alloc_region(page_count);
        let base = mapper.phys_to_virt(region.base_address());
        let top = base + region.size();
        trace!("Stack at {region}, mapped at {base}..{top}");

        Self {
            region,
            base,
            top,
            pointer: AtomicU64::new(top.as_u64()),
            allocator,
        }
    }

    /// The physical pages backing this stack.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Lowest usable address.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    /// One past the highest usable address; where an empty stack's pointer sits.
    #[inline]
    #[must_use]
    pub const fn top(&self) -> VirtualAddress {
        self.top
    }

    /// The saved stack pointer.
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> VirtualAddress {
        VirtualAddress::new(self.pointer.load(Ordering::Relaxed))
    }

    /// Persists the stack pointer of a thread being switched away from.
    #[inline]
    pub fn set_pointer(&self, pointer: VirtualAddress) {
        self.pointer.store(pointer.as_u64(), Ordering::Relaxed);
    }

    /// Moves the pointer down by `size_of::<T>()` and writes `value` there.
    ///
    /// Returns the new pointer, i.e. the address `value` now lives at.
    ///
    /// # Panics
    /// If `value` does not fit between the pointer and the bottom of the stack.
    pub fn push<T: Copy>(&mut self, value: T) -> VirtualAddress {
        let size = mem::size_of::<T>() as u64;
        let current = VirtualAddress::new(*self.pointer.get_mut());

        let Some(next) = current.checked_sub(size).filter(|&next| next >= self.base) else {
            panic!(
                "stack overflow: pushing {size} bytes at {current} onto {}",
                self.region
            );
        };

        // SAFETY: `next..next + size` lies inside `base..top`, the mapping of
        // the region this stack owns exclusively; the mapper contract makes
        // it writable.
        unsafe {
            ptr::write_unaligned(next.as_mut_ptr::<T>(), value);
        }

        *self.pointer.get_mut() = next.as_u64();
        next
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let region = mem::replace(&mut self.region, Region::empty());
        trace!("Releasing stack {region}");
        self.allocator.free_region(region);
    }
}
