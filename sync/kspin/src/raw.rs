// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Guard-less spinlock.

#[cfg(feature = "smp")]
use core::sync::atomic::{AtomicBool, Ordering};
use core::fmt;

/// A spinlock without an RAII guard.
///
/// Acquire and release are separate calls. Ownership is not tracked: any
/// context may release the lock, which is what the scheduler relies on when
/// a lock taken by the outgoing thread is dropped by the incoming one.
///
/// # Single-core optimization
///
/// Without the `smp` feature the lock state is optimized away, since local
/// interrupt masking is already enough for exclusion.
pub struct RawSpinLock {
    #[cfg(feature = "smp")]
    lock: AtomicBool,
}

impl RawSpinLock {
    /// Creates an unlocked lock.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            #[cfg(feature = "smp")]
            lock: AtomicBool::new(false),
        }
    }

    /// Acquires the lock, spinning until it becomes available.
    ///
    /// Re-acquiring from the holder deadlocks.
    #[inline(always)]
    pub fn acquire(&self) {
        #[cfg(feature = "smp")]
        {
            // Try to acquire using weak CAS in a loop
            while self
                .lock
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                // Spin until lock appears available
                while self.is_locked() {
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Tries to acquire the lock once.
    ///
    /// Returns `true` on success.
    #[inline(always)]
    pub fn try_acquire(&self) -> bool {
        cfg_if::cfg_if! {
            if #[cfg(feature = "smp")] {
                self.lock
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            } else {
                true
            }
        }
    }

    /// Releases the lock.
    ///
    /// Releasing an unlocked lock is a no-op.
    #[inline(always)]
    pub fn release(&self) {
        #[cfg(feature = "smp")]
        self.lock.store(false, Ordering::Release);
    }

    /// Check if lock is currently held (heuristic only).
    ///
    /// # Warning
    ///
    /// This provides no synchronization guarantees. The result
    /// may be stale immediately. Do not use for synchronization.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        cfg_if::cfg_if! {
            if #[cfg(feature = "smp")] {
                self.lock.load(Ordering::Relaxed)
            } else {
                false
            }
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawSpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
