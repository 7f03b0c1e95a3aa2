//! # Process-wide scheduler
//!
//! The timer trampoline has no way to carry state, so the scheduler it
//! drives lives in a static. All access masks interrupts, which keeps the
//! timer from preempting a half-done queue update.
//!
//! ## Lock order
//!
//! The scheduler lock is never held while the allocator lock is taken.
//! Dropping the last reference to a thread frees its stack, so [`schedule`]
//! moves the reaped thread out of the scheduler and releases it only after
//! the scheduler guard is gone.

use crate::{SchedError, SchedState, Scheduler, Thread};
use alloc::sync::Arc;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::{SpinLock, SyncOnceCell};
use log::{info, trace, warn};

static SCHEDULER: SyncOnceCell<SpinLock<Scheduler>> = SyncOnceCell::new();

/// Brings up the kernel-wide scheduler. Later calls are ignored.
pub fn init() {
    if SCHEDULER.set(SpinLock::new(Scheduler::new())).is_ok() {
        info!("Initializing scheduling");
    } else {
        warn!("Scheduler already initialized");
    }
}

/// Whether [`init`] has run.
#[must_use]
pub fn is_initialized() -> bool {
    SCHEDULER.is_initialized()
}

/// Runs `f` on the kernel-wide scheduler with interrupts masked.
///
/// # Panics
/// If [`init`] has not run.
pub fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let Some(scheduler) = SCHEDULER.get() else {
        panic!("scheduler used before init");
    };
    scheduler.with_lock_irq(f)
}

/// See [`Scheduler::register_thread`].
///
/// # Panics
/// If [`init`] has not run.
pub fn register_thread(thread: Arc<Thread>) {
    with_scheduler(|scheduler| scheduler.register_thread(thread));
}

/// See [`Scheduler::unregister_thread`].
///
/// # Errors
/// [`SchedError::NotRegistered`] if `thread` is not in the run queue.
///
/// # Panics
/// If [`init`] has not run.
pub fn unregister_thread(thread: &Arc<Thread>) -> Result<(), SchedError> {
    with_scheduler(|scheduler| scheduler.unregister_thread(thread))
}

/// The current scheduler state, or [`SchedState::Empty`] before [`init`].
#[must_use]
pub fn state() -> SchedState {
    SCHEDULER
        .get()
        .map_or(SchedState::Empty, |scheduler| scheduler.lock_irq().state())
}

/// Entry point of the timer trampoline.
///
/// Ticks that arrive before [`init`] resume the interrupted context.
pub fn schedule(stack_pointer: VirtualAddress) -> VirtualAddress {
    let Some(scheduler) = SCHEDULER.get() else {
        return stack_pointer;
    };

    let (resume, reaped) = {
        let mut scheduler = scheduler.lock_irq();
        let reaped = scheduler.take_reaped();
        (scheduler.schedule(stack_pointer), reaped)
    };

    if let Some(thread) = reaped {
        trace!("Releasing {thread}");
        drop(thread);
    }
    resume
}
