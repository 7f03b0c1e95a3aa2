//! # Physical memory access
//!
//! Code can only dereference virtual addresses. Whoever needs to write into
//! a physical page the allocator handed out (a thread's initial stack frame,
//! for instance), or hand such a page to the CPU as a stack, goes through a
//! [`PhysMapper`], which turns a [`PhysicalAddress`] into the
//! [`VirtualAddress`] it is reachable at in the current address space.
//!
//! The strategy differs between environments:
//! - **Kernel**: [`HhdmPhysMapper`] adds the higher-half direct map base.
//! - **Early boot / identity-mapped low memory**: [`IdentityPhysMapper`].
//! - **Tests**: a heap-backed fake RAM that maps physical addresses onto a buffer.

use kernel_info::memory::{HHDM_BASE, IDENTITY_LOW_BYTES};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Translates physical addresses into the current address space.
///
/// # Safety
/// Implementors guarantee that for every region obtained from the physical
/// allocator, [`phys_to_virt`](Self::phys_to_virt) maps its pages to one
/// contiguous virtual range that is valid for reads and writes and usable by
/// the CPU (as a stack, for instance), for as long as the mapper is alive.
pub unsafe trait PhysMapper: Send + Sync {
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress;
}

/// [`PhysMapper`] for kernels with a higher-half direct map (HHDM).
///
/// Every physical address `pa` is visible at `HHDM_BASE + pa`.
#[derive(Debug, Default, Copy, Clone)]
pub struct HhdmPhysMapper;

// SAFETY: the kernel maps all of physical memory at HHDM_BASE before the
// allocator hands out its first region.
unsafe impl PhysMapper for HhdmPhysMapper {
    #[inline]
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        VirtualAddress::new(HHDM_BASE + pa.as_u64())
    }
}

/// [`PhysMapper`] for identity-mapped physical memory.
///
/// Only low memory up to [`IDENTITY_LOW_BYTES`] is identity mapped; asking
/// for anything above it is a bug.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityPhysMapper;

// SAFETY: the boot environment identity maps `0..IDENTITY_LOW_BYTES`, and
// addresses beyond it are rejected.
unsafe impl PhysMapper for IdentityPhysMapper {
    #[inline]
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        // The window end itself is valid as an exclusive bound (a stack top).
        assert!(
            pa.as_u64() <= IDENTITY_LOW_BYTES,
            "{pa} is outside the identity-mapped window"
        );
        VirtualAddress::new(pa.as_u64())
    }
}
