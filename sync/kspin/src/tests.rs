// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Test suite for kspin

#[cfg(feature = "smp")]
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::channel,
    },
    thread,
    time::Duration,
};

use super::*;

#[test]
fn raw_acquire_release() {
    let lock = RawSpinLock::new();
    lock.acquire();
    lock.release();
    lock.acquire();
    lock.release();
    assert!(!lock.is_locked());
}

#[test]
fn debug_shows_state() {
    let lock = RawSpinLock::default();
    assert!(format!("{lock:?}").contains("locked: false"));
}

#[test]
#[cfg(not(feature = "smp"))]
fn uniprocessor_lock_is_free() {
    let lock = RawSpinLock::new();
    lock.acquire();
    assert!(!lock.is_locked());
    assert!(lock.try_acquire());
    lock.release();
}

#[test]
#[cfg(feature = "smp")]
fn try_acquire_fails_while_held() {
    let lock = RawSpinLock::new();
    assert!(lock.try_acquire());
    assert!(lock.is_locked());
    assert!(!lock.try_acquire());
    lock.release();
    assert!(lock.try_acquire());
    lock.release();
}

#[test]
#[cfg(feature = "smp")]
fn release_from_another_thread() {
    let lock = Arc::new(RawSpinLock::new());
    lock.acquire();

    let remote = lock.clone();
    thread::spawn(move || remote.release()).join().unwrap();

    assert!(!lock.is_locked());
    assert!(lock.try_acquire());
}

#[test]
#[cfg(feature = "smp")]
fn double_release_is_harmless() {
    let lock = RawSpinLock::new();
    lock.acquire();
    lock.release();
    lock.release();
    assert!(lock.try_acquire());
    assert!(!lock.try_acquire());
    lock.release();
}

/// The holder hands the lock to a third party, which releases it and lets a
/// spinning waiter through, as the scheduler does across a context switch.
#[test]
#[cfg(feature = "smp")]
fn handed_off_release_wakes_spinner() {
    let lock = Arc::new(RawSpinLock::new());
    let entered = Arc::new(AtomicBool::new(false));
    lock.acquire();

    let waiter = {
        let lock = lock.clone();
        let entered = entered.clone();
        thread::spawn(move || {
            lock.acquire();
            entered.store(true, Ordering::Release);
            lock.release();
        })
    };

    thread::sleep(Duration::from_millis(20));
    assert!(!entered.load(Ordering::Acquire));

    let (tx, rx) = channel::<Arc<RawSpinLock>>();
    let releaser = thread::spawn(move || rx.recv().unwrap().release());
    tx.send(lock.clone()).unwrap();

    releaser.join().unwrap();
    waiter.join().unwrap();
    assert!(entered.load(Ordering::Acquire));
    assert!(!lock.is_locked());
}

#[test]
#[cfg(feature = "smp")]
fn concurrent_increments() {
    static LOCK: RawSpinLock = RawSpinLock::new();
    static CNT: AtomicUsize = AtomicUsize::new(0);
    const INCREMENTS_PER_THREAD: usize = 1000;
    const NUM_THREADS: usize = 6;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..INCREMENTS_PER_THREAD {
                    LOCK.acquire();
                    // Non-atomic read-modify-write under the lock.
                    let v = CNT.load(Ordering::Relaxed);
                    CNT.store(v + 1, Ordering::Relaxed);
                    LOCK.release();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(CNT.load(Ordering::Relaxed), INCREMENTS_PER_THREAD * NUM_THREADS);
}
