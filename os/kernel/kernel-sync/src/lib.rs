//! # Kernel synchronization primitives
//!
//! The allocator and scheduler state are process-wide singletons that are
//! only ever touched with interrupts masked on a single core. The types in
//! here make that discipline explicit:
//!
//! * [`SpinLock`] guards the state, and [`SpinLock::lock_irq`] masks
//!   interrupts for as long as the guard lives.
//! * [`SyncOnceCell`] holds the singleton once kernel init has built it.
//! * [`IrqGuard`] saves and masks the interrupt flag, restoring it on drop.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
mod sync_once_cell;

pub use irq::IrqGuard;
pub use spin_lock::{IrqSpinLockGuard, SpinLock};
pub use sync_once_cell::SyncOnceCell;
