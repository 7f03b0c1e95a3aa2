//! # Physical and Virtual Addresses
//!
//! Two zero-cost `u64` wrappers that keep the two address spaces apart at
//! compile time:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A location in RAM as the allocator sees it. Never dereferenced directly. |
//! | [`VirtualAddress`] | A location the CPU can use in the current address space: pointers, stack pointers, `RSP` in an interrupt frame. |
//!
//! The only way from one to the other is a `PhysMapper` (in `kernel-pmm`),
//! which knows how physical memory is mapped.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x20_0000);
//! let va = VirtualAddress::new(0xffff_8880_0000_0000 + pa.as_u64());
//!
//! assert_eq!((va + 0x10).as_u64() - va.as_u64(), 0x10);
//! assert_eq!(pa.checked_sub(0x1000), Some(PhysicalAddress::new(0x1f_f000)));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical_address;
mod virtual_address;

pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;
