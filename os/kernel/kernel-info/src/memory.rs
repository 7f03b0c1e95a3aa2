//! # Memory Layout

/// Size of a physical page in bytes; the allocation granule of the PMM.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Number of pages backing the stack of every newly created thread.
pub const THREAD_STACK_PAGES: u64 = 4;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Low physical memory that stays identity mapped during early boot; the
/// identity mapper refuses anything above it.
pub const IDENTITY_LOW_BYTES: u64 = 0x4000_0000; // 1 GiB

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(THREAD_STACK_PAGES > 0);
    assert!(IDENTITY_LOW_BYTES.is_multiple_of(PAGE_SIZE));
};
