//! # Processes
//!
//! A [`Process`] is an execution container: it has an identity, an optional
//! parent, a [`Promotion`] and the list of threads it created. Threads are
//! created through the process's [`ThreadBuilder`], which lays out the
//! architecture-specific initial context.
//!
//! Tearing a process down does not touch the scheduler. Its threads must be
//! unregistered from the scheduler by the owner first; a thread still in
//! the run queue stays alive through the queue's reference.

use crate::{Promotion, Thread, ThreadBuilder, ThreadEntry, ThreadId};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_sync::SpinLock;
use log::{info, trace};

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

pub struct Process {
    id: ProcessId,
    parent: Option<Weak<Process>>,
    promotion: Promotion,
    builder: Arc<dyn ThreadBuilder>,
    threads: SpinLock<Vec<Arc<Thread>>>,
}

impl Process {
    /// Creates a process. The root process has no parent.
    ///
    /// The parent link does not keep the parent alive.
    pub fn new(
        parent: Option<&Arc<Self>>,
        promotion: Promotion,
        builder: Arc<dyn ThreadBuilder>,
    ) -> Arc<Self> {
        let process = Arc::new(Self {
            id: ProcessId::next(),
            parent: parent.map(Arc::downgrade),
            promotion,
            builder,
            threads: SpinLock::new(Vec::new()),
        });
        info!("Constructing {process}");
        process
    }

    /// Creates a child of this process using the same thread builder.
    pub fn spawn_child(self: &Arc<Self>, promotion: Promotion) -> Arc<Self> {
        Self::new(Some(self), promotion, Arc::clone(&self.builder))
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ProcessId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn promotion(&self) -> Promotion {
        self.promotion
    }

    /// The parent process, if there is one and it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Creates a thread that starts at `entry` and attaches it to this process.
    ///
    /// The caller registers the returned thread with the scheduler.
    pub fn create_thread(&self, entry: ThreadEntry) -> Arc<Thread> {
        trace!("{self} is creating a new thread");

        let thread = Arc::new(self.builder.create_thread(self, self.promotion, entry));
        info!("Attaching {thread} to {self}");

        self.threads.lock_irq().push(Arc::clone(&thread));
        thread
    }

    /// Detaches a thread from this process, handing back the process's reference.
    pub fn detach_thread(&self, id: ThreadId) -> Option<Arc<Thread>> {
        let mut threads = self.threads.lock_irq();
        let index = threads.iter().position(|t| t.id() == id)?;
        Some(threads.remove(index))
    }

    /// Snapshot of the threads attached to this process, in creation order.
    #[must_use]
    pub fn threads(&self) -> Vec<Arc<Thread>> {
        self.threads.lock_irq().clone()
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.lock_irq().len()
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        info!("Destructing {self}");
    }
}
