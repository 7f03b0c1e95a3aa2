//! # Round-robin scheduler
//!
//! The run queue holds every registered thread in registration order. The
//! running thread is always the front of the queue; each scheduling event
//! moves it to the back and resumes the next one.
//!
//! ## States
//!
//! ```text
//!            register_thread                 unregister_thread(running)
//!  ┌───────┐ ───────────────► ┌─────────┐ ─────────────────────────► ┌─────────┐
//!  │ Empty │                  │ Running │                            │ Vacated │
//!  └───────┘                  └─────────┘ ◄───────────────────────── └─────────┘
//!                                          schedule (queue non-empty)
//! ```
//!
//! * **Empty**: nothing has been registered yet; `schedule` returns its
//!   argument unchanged.
//! * **Running**: `schedule` saves the interrupted stack pointer into the
//!   running thread, rotates the queue and resumes the new front.
//! * **Vacated**: the running thread unregistered itself. The CPU is still
//!   executing on that thread's stack, so the scheduler keeps it alive and
//!   the next `schedule` resumes the queue front without saving into (or
//!   rotating past) anybody. The retired thread is released one scheduling
//!   event later, once nothing runs on its stack anymore.
//!
//! Every method is expected to run with interrupts masked.
//!
//! Releasing a thread frees its stack through the physical allocator. A
//! caller that holds a lock around the scheduler can move the reaped thread
//! out with [`Scheduler::take_reaped`] and drop it after unlocking.

use crate::{Thread, ThreadId};
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use kernel_memory_addresses::VirtualAddress;
use log::{info, trace, warn};

/// Errors returned by [`Scheduler::unregister_thread`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    #[error("{0} is not registered with the scheduler")]
    NotRegistered(ThreadId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedState {
    Empty,
    Running,
    Vacated,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    running: Option<Arc<Thread>>,
    threads: VecDeque<Arc<Thread>>,
    /// Set when the running thread was unregistered and nothing has been
    /// resumed since.
    vacated: bool,
    /// The unregistered thread whose stack the CPU is still executing on.
    retired: Option<Arc<Thread>>,
    /// A retired thread that was switched away from during the last event.
    reaped: Option<Arc<Thread>>,
}

impl Scheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: None,
            threads: VecDeque::new(),
            vacated: false,
            retired: None,
            reaped: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SchedState {
        if self.running.is_some() {
            SchedState::Running
        } else if self.vacated {
            SchedState::Vacated
        } else {
            SchedState::Empty
        }
    }

    /// The thread whose context is currently live, if any.
    #[must_use]
    pub const fn running_thread(&self) -> Option<&Arc<Thread>> {
        self.running.as_ref()
    }

    /// Number of entries in the run queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// The run queue, front (running) first.
    pub fn threads(&self) -> impl Iterator<Item = &Arc<Thread>> {
        self.threads.iter()
    }

    /// Appends `thread` to the run queue.
    ///
    /// The first thread registered into an empty scheduler becomes the
    /// running thread: it adopts whatever context is live when the first
    /// `schedule` happens (the boot context, typically).
    pub fn register_thread(&mut self, thread: Arc<Thread>) {
        trace!("Registering {thread}");

        if self.state() == SchedState::Empty {
            info!("Using {thread} as running thread");
            self.running = Some(Arc::clone(&thread));
        }
        self.threads.push_back(thread);
    }

    /// Removes every run-queue entry of `thread`.
    ///
    /// If `thread` is the running thread, the scheduler becomes
    /// [`SchedState::Vacated`] and holds on to it until its stack is no
    /// longer in use.
    ///
    /// # Errors
    /// [`SchedError::NotRegistered`] if `thread` was not in the run queue.
    pub fn unregister_thread(&mut self, thread: &Arc<Thread>) -> Result<(), SchedError> {
        let before = self.threads.len();
        self.threads.retain(|queued| !Arc::ptr_eq(queued, thread));
        if self.threads.len() == before {
            warn!("Unregistering {thread}, which is not registered");
            return Err(SchedError::NotRegistered(thread.id()));
        }

        trace!("Unregistering {thread}");

        if self
            .running
            .as_ref()
            .is_some_and(|running| Arc::ptr_eq(running, thread))
        {
            info!("Running {thread} unregistered; vacating");
            self.retired = self.running.take();
            self.vacated = true;
        }
        Ok(())
    }

    /// Hands out the retired thread that the last [`schedule`](Self::schedule)
    /// switched away from. Nothing runs on its stack anymore.
    ///
    /// If nobody takes it, the next `schedule` drops it.
    pub const fn take_reaped(&mut self) -> Option<Arc<Thread>> {
        self.reaped.take()
    }

    /// Makes a scheduling decision.
    ///
    /// `stack_pointer` is the stack pointer of the interrupted context; the
    /// return value is the stack pointer of the context to resume.
    pub fn schedule(&mut self, stack_pointer: VirtualAddress) -> VirtualAddress {
        // Whatever was reaped last time is no longer anybody's live stack.
        self.reaped = None;

        let next = match self.running.take() {
            Some(current) => {
                current.stack().set_pointer(stack_pointer);
                self.threads.rotate_left(1);
                match self.threads.front() {
                    Some(next) => Arc::clone(next),
                    None => panic!("{current} is running but the run queue is empty"),
                }
            }
            None if self.vacated => {
                let Some(next) = self.threads.front() else {
                    return stack_pointer;
                };
                let next = Arc::clone(next);
                self.vacated = false;
                self.reaped = self.retired.take();
                next
            }
            None => return stack_pointer,
        };

        let resume = next.stack().pointer();
        trace!("Running thread is now {next} (sp {resume})");
        self.running = Some(next);
        resume
    }
}
