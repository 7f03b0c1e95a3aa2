//! # CPU State for New Threads
//!
//! Selector values match the GDT layout the kernel installs:
//! null, kernel code, kernel data, user data, user code, TSS.

/// Kernel code segment selector (GDT index 1, RPL 0).
pub const KERNEL_CS: u16 = 0x08;

/// Kernel data segment selector (GDT index 2, RPL 0).
pub const KERNEL_DS: u16 = 0x10;

/// User data segment selector (GDT index 3, RPL 3).
pub const USER_DS: u16 = 0x1b;

/// User code segment selector (GDT index 4, RPL 3).
pub const USER_CS: u16 = 0x23;

/// `RFLAGS` a thread starts with: reserved bit 1 and `IF` set.
pub const INITIAL_RFLAGS: u64 = 0x202;

/// Requested privilege level mask of a selector.
pub const RPL_MASK: u16 = 0b11;

const _: () = {
    assert!(KERNEL_CS & RPL_MASK == 0);
    assert!(KERNEL_DS & RPL_MASK == 0);
    assert!(USER_CS & RPL_MASK == 3);
    assert!(USER_DS & RPL_MASK == 3);
    assert!(INITIAL_RFLAGS & (1 << 9) != 0);
};
