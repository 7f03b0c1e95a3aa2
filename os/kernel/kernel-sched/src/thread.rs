//! Schedulable execution contexts.

use crate::{ProcessId, Promotion, Stack};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use log::trace;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    fn next() -> Self {
        Self(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// A thread: an identity plus the stack its suspended context lives on.
///
/// Threads are built by a [`ThreadBuilder`](crate::ThreadBuilder) and shared
/// via `Arc` between their process and the scheduler. Dropping the last
/// reference releases the stack's pages.
pub struct Thread {
    id: ThreadId,
    process: ProcessId,
    promotion: Promotion,
    stack: Stack,
}

impl Thread {
    /// Wraps a stack whose initial context has already been laid out.
    #[must_use]
    pub fn new(process: ProcessId, promotion: Promotion, stack: Stack) -> Self {
        let id = ThreadId::next();
        trace!("Constructing {id} of {process} on {}", stack.region());
        Self {
            id,
            process,
            promotion,
            stack,
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ThreadId {
        self.id
    }

    /// The process this thread was created by.
    #[inline]
    #[must_use]
    pub const fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    #[must_use]
    pub const fn promotion(&self) -> Promotion {
        self.promotion
    }

    #[inline]
    #[must_use]
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id.0)
            .field("process", &self.process)
            .field("promotion", &self.promotion)
            .field("stack_pointer", &format_args!("{:#x}", self.stack.pointer().as_u64()))
            .finish()
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        trace!("Destructing {}", self.id);
    }
}
