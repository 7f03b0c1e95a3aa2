use kernel_sync::{IrqGuard, SpinLock, SyncOnceCell};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn guard_gives_exclusive_mutable_access() {
    let pages = SpinLock::new(Vec::<u64>::new());
    {
        let mut guard = pages.lock_irq();
        guard.push(0x100);
        guard.push(0x200);
    }
    assert_eq!(*pages.lock_irq(), [0x100, 0x200]);
}

#[test]
fn closure_runs_under_the_lock_and_returns_its_result() {
    let counter = SpinLock::new(40_u32);
    let seen = counter.with_lock_irq(|n| {
        *n += 2;
        *n
    });
    assert_eq!(seen, 42);
    assert_eq!(counter.into_inner(), 42);
}

#[test]
fn nested_locks_release_independently() {
    let outer = SpinLock::new(1);
    let inner = SpinLock::new(2);

    let sum = outer.with_lock_irq(|a| inner.with_lock_irq(|b| *a + *b));
    assert_eq!(sum, 3);

    // Both are free again.
    assert_eq!(*outer.lock_irq() + *inner.lock_irq(), 3);
}

#[test]
fn irq_guard_can_be_stacked() {
    let _outer = IrqGuard::new();
    let _inner = IrqGuard::new();
}

#[test]
fn concurrent_updates_are_not_lost() {
    const WORKERS: usize = 4;
    const ROUNDS: u64 = 2_000;

    let pool = Arc::new(SpinLock::new(Vec::new()));
    let start = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS as u64)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for round in 0..ROUNDS {
                    pool.lock_irq().push(worker * ROUNDS + round);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut pages = Arc::try_unwrap(pool).ok().unwrap().into_inner();
    pages.sort_unstable();
    assert_eq!(pages, (0..WORKERS as u64 * ROUNDS).collect::<Vec<_>>());
}

#[test]
fn panicking_holder_releases_the_lock() {
    let lock = SpinLock::new(0_u32);

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        lock.with_lock_irq(|value| {
            *value = 7;
            panic!("allocator invariant broken");
        });
    }));
    assert!(result.is_err());

    assert_eq!(lock.with_lock_irq(|value| *value), 7);
}

#[test]
fn once_cell_is_empty_until_set() {
    let cell = SyncOnceCell::<u32>::new();
    assert!(!cell.is_initialized());
    assert_eq!(cell.get(), None);

    assert_eq!(cell.set(5), Ok(()));
    assert!(cell.is_initialized());
    assert_eq!(cell.get(), Some(&5));
}

#[test]
fn once_cell_rejects_a_second_value() {
    let cell = SyncOnceCell::new();
    assert_eq!(cell.set("first"), Ok(()));
    assert_eq!(cell.set("second"), Err("second"));
    assert_eq!(cell.get(), Some(&"first"));
}

#[test]
fn exactly_one_racing_set_wins() {
    let cell = Arc::new(SyncOnceCell::new());
    let start = Arc::new(Barrier::new(8));

    let winners: usize = (0..8)
        .map(|i| {
            let cell = Arc::clone(&cell);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                usize::from(cell.set(i).is_ok())
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum();

    assert_eq!(winners, 1);
    assert!(cell.get().is_some_and(|v| (0..8).contains(v)));
}

#[test]
fn once_cell_holding_a_lock_works_as_a_singleton() {
    static STATE: SyncOnceCell<SpinLock<Vec<u8>>> = SyncOnceCell::new();

    assert!(STATE.set(SpinLock::new(Vec::new())).is_ok());
    let Some(state) = STATE.get() else {
        panic!("singleton missing after set");
    };
    state.with_lock_irq(|v| v.push(1));
    assert_eq!(STATE.get().map(|s| s.lock_irq().len()), Some(1));
}

#[test]
fn once_cell_drops_its_value() {
    let value = Arc::new(5);
    {
        let cell = SyncOnceCell::new();
        assert!(cell.set(Arc::clone(&value)).is_ok());
        assert_eq!(Arc::strong_count(&value), 2);
    }
    assert_eq!(Arc::strong_count(&value), 1);
}
