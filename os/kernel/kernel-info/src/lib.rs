//! # Kernel Configuration
//!
//! Compile-time configuration shared by the physical memory manager and the
//! scheduler. Everything in here is a `const`, so the values are baked into
//! each consumer and checked at compile time where a relation between them
//! must hold.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Page granularity**: [`PAGE_SIZE`](memory::PAGE_SIZE) and its shift
//! * **Thread stacks**: how many pages a freshly created thread receives
//! * **Physical memory access**: the HHDM base and the identity-mapped window
//!
//! ### CPU State ([`cpu`])
//! * **Segment selectors** used when building an initial `iretq` frame
//! * **Initial `RFLAGS`** for new threads
//!
//! ```text
//! Physical memory as seen by the allocator:
//!
//! 0x0000_0000 ┌──────────────────────┐ page 0
//!             │   free / reserved    │
//!             ├──────────────────────┤
//!             │    kernel image      │ never handed out
//!             ├──────────────────────┤
//!             │   free / reserved    │
//!             └──────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod cpu;
pub mod memory;
