//! The seam to the architecture layer that creates threads.

use crate::{Process, Promotion, Thread};

/// Function a new thread starts executing. It never returns; a finished
/// thread is unregistered and parked by its owner.
pub type ThreadEntry = extern "C" fn() -> !;

/// Builds a thread whose stack holds an initial context that, when resumed
/// by the scheduler, starts executing `entry`.
pub trait ThreadBuilder: Send + Sync {
    fn create_thread(&self, process: &Process, promotion: Promotion, entry: ThreadEntry) -> Thread;
}
