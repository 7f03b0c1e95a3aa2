//! # `x86_64` thread contexts
//!
//! A suspended thread's stack pointer points at its register snapshot, laid
//! out exactly as the timer trampoline leaves it:
//!
//! ```text
//! higher addresses
//!   ┌──────────────┐ ◄── stack top
//!   │ SS           │ ┐
//!   │ RSP          │ │
//!   │ RFLAGS       │ │ InterruptFrame (pushed by the CPU)
//!   │ CS           │ │
//!   │ RIP          │ ┘
//!   ├──────────────┤
//!   │ RAX .. R15   │   SavedRegisters (pushed by the trampoline)
//!   └──────────────┘ ◄── saved stack pointer
//! lower addresses
//! ```
//!
//! [`X86_64ThreadBuilder`] fabricates this snapshot for a new thread so that
//! the first switch to it "returns" into its entry point. Every address in
//! the snapshot is a virtual one, as produced by the builder's
//! [`PhysMapper`].

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod trampoline;

use crate::{Process, Promotion, Stack, Thread, ThreadBuilder, ThreadEntry};
use alloc::sync::Arc;
use kernel_info::cpu::INITIAL_RFLAGS;
use kernel_info::memory::THREAD_STACK_PAGES;
use kernel_pmm::{PhysMapper, RegionAllocator};
use log::trace;

/// General-purpose registers as pushed by the trampoline; `r15` is pushed
/// last and therefore sits at the lowest address.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SavedRegisters {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
}

/// The frame the CPU pushes on interrupt entry and `iretq` consumes.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct InterruptFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

const _: () = {
    assert!(size_of::<SavedRegisters>() == 15 * 8);
    assert!(size_of::<InterruptFrame>() == 5 * 8);
};

/// Bytes of initial context on a freshly built thread's stack.
pub const INITIAL_CONTEXT_SIZE: u64 =
    (size_of::<SavedRegisters>() + size_of::<InterruptFrame>()) as u64;

/// Creates threads whose stacks start with a synthetic interrupt context.
pub struct X86_64ThreadBuilder {
    allocator: Arc<dyn RegionAllocator>,
    mapper: Arc<dyn PhysMapper>,
    stack_pages: u64,
}

impl X86_64ThreadBuilder {
    /// A builder allocating [`THREAD_STACK_PAGES`] pages per stack.
    pub fn new(allocator: Arc<dyn RegionAllocator>, mapper: Arc<dyn PhysMapper>) -> Self {
        Self::with_stack_pages(allocator, mapper, THREAD_STACK_PAGES)
    }

    /// # Panics
    /// If `stack_pages` cannot hold the initial context.
    pub fn with_stack_pages(
        allocator: Arc<dyn RegionAllocator>,
        mapper: Arc<dyn PhysMapper>,
        stack_pages: u64,
    ) -> Self {
        assert!(stack_pages > 0, "thread stacks need at least one page");
        Self {
            allocator,
            mapper,
            stack_pages,
        }
    }

    #[must_use]
    pub const fn stack_pages(&self) -> u64 {
        self.stack_pages
    }
}

impl ThreadBuilder for X86_64ThreadBuilder {
    fn create_thread(&self, process: &Process, promotion: Promotion, entry: ThreadEntry) -> Thread {
        let mut stack = Stack::new(
            Arc::clone(&self.allocator),
            self.mapper.as_ref(),
            self.stack_pages,
        );

        // `iretq` loads RSP as is, so it must be the mapped top, not the
        // physical end of the region.
        let frame = InterruptFrame {
            rip: entry as usize as u64,
            cs: u64::from(promotion.code_selector()),
            rflags: INITIAL_RFLAGS,
            rsp: stack.top().as_u64(),
            ss: u64::from(promotion.stack_selector()),
        };
        stack.push(frame);
        let pointer = stack.push(SavedRegisters::default());

        trace!(
            "Initial {promotion} context for {process} at {pointer}, entry {:#x}",
            frame.rip
        );
        Thread::new(process.id(), promotion, stack)
    }
}
