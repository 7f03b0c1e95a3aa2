use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// A write-once cell for kernel singletons such as the physical allocator
/// and the scheduler: built once during init, read for the rest of the
/// kernel's lifetime.
///
/// ```
/// use kernel_sync::SyncOnceCell;
///
/// static TICKS_PER_SLICE: SyncOnceCell<u32> = SyncOnceCell::new();
///
/// assert_eq!(TICKS_PER_SLICE.get(), None);
/// assert_eq!(TICKS_PER_SLICE.set(10), Ok(()));
/// assert_eq!(TICKS_PER_SLICE.set(20), Err(20));
/// assert_eq!(TICKS_PER_SLICE.get(), Some(&10));
/// ```
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// The stored value, if initialization has completed.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: READY is only published after the value was written.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Stores `value` if the cell is still empty.
    ///
    /// Readers see the value only once it is completely written; until then
    /// [`get`](Self::get) keeps returning `None`.
    ///
    /// # Errors
    /// Hands `value` back if the cell is already initialized or another
    /// writer is in the middle of initializing it.
    pub fn set(&self, value: T) -> Result<(), T> {
        if !self.claim() {
            return Err(value);
        }
        self.publish(value);
        Ok(())
    }

    /// Moves the cell from EMPTY to WRITING. Only one caller ever succeeds.
    fn claim(&self) -> bool {
        self.state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Writes the value and marks the cell READY. Only called after `claim`.
    fn publish(&self, value: T) {
        // SAFETY: `claim` made us the only writer, and no reader looks at
        // the value before READY is stored.
        unsafe {
            (*self.value.get()).write(value);
        }
        self.state.store(READY, Ordering::Release);
    }

    /// # Safety
    /// The cell must be READY.
    unsafe fn get_unchecked(&self) -> &T {
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means the value was written and not yet dropped.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: the value is written once before READY and only shared afterwards.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
