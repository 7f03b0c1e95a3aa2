use crate::IrqGuard;
use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A spin lock for state shared with interrupt handlers.
///
/// The only way in is [`lock_irq`](Self::lock_irq): interrupts are masked
/// before the lock is taken, so the timer can never preempt a holder and
/// spin forever on the same lock.
pub struct SpinLock<T> {
    held: AtomicBool,
    inner: UnsafeCell<T>,
}

// SAFETY: `held` serializes every access to `inner`.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            held: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Masks interrupts, then acquires the lock.
    ///
    /// The lock is released before the interrupt state is restored.
    #[inline]
    pub fn lock_irq(&self) -> IrqSpinLockGuard<'_, T> {
        let irq = IrqGuard::new();
        while self
            .held
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        IrqSpinLockGuard {
            lock: self,
            _irq: irq,
        }
    }

    /// Runs `f` under [`lock_irq`](Self::lock_irq).
    #[inline]
    pub fn with_lock_irq<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock_irq())
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard returned by [`SpinLock::lock_irq`].
///
/// `Drop` releases the lock; the interrupt guard field drops afterwards and
/// restores the interrupt flag.
pub struct IrqSpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    _irq: IrqGuard,
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held, and `&mut self` makes
        // this the only reference handed out.
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for IrqSpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
