//! # Threads, Processes and the Round-Robin Scheduler
//!
//! This crate decides *which* thread runs next. It never touches CPU
//! registers itself: the timer interrupt trampoline hands the scheduler the
//! stack pointer of the interrupted thread and receives the stack pointer
//! to resume, and the trampoline performs the actual switch.
//!
//! ```text
//!   Process ──create_thread──► ThreadBuilder (arch) ──► Thread { Stack }
//!                                                           │
//!                                   register_thread ◄───────┘
//!                                          │
//!   timer IRQ ──► trampoline ──schedule(sp)──► Scheduler ──► next sp
//! ```
//!
//! ## Ownership
//! - A [`Stack`] exclusively owns its physical [`Region`](kernel_pmm::Region)
//!   and returns it to its allocator when dropped.
//! - A [`Thread`] exclusively owns its `Stack`.
//! - Threads are shared through [`Arc`](alloc::sync::Arc) between their
//!   [`Process`] and the [`Scheduler`]'s run queue; the thread (and with it
//!   the stack memory) is released when the last of them lets go.
//!
//! ## Modules
//! - [`stack`], [`thread`], [`process`], [`promotion`]: the execution
//!   containers.
//! - [`builder`]: the seam to the architecture that lays out a new thread's
//!   initial context.
//! - [`scheduler`]: the run queue and the round-robin state machine.
//! - [`arch`]: the `x86_64` context layout and the timer trampoline.
//! - [`global`]: the process-wide scheduler instance the trampoline calls.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod arch;
pub mod builder;
pub mod global;
pub mod process;
pub mod promotion;
pub mod scheduler;
pub mod stack;
pub mod thread;

pub use builder::{ThreadBuilder, ThreadEntry};
pub use process::{Process, ProcessId};
pub use promotion::Promotion;
pub use scheduler::{SchedError, SchedState, Scheduler};
pub use stack::Stack;
pub use thread::{Thread, ThreadId};
