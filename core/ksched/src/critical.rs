// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Critical sections and the coupled interrupt-disable primitive.
//!
//! Two locks and two per-thread counters cooperate here:
//!
//! - `kernel_nest` counts [`Scheduler::interrupt_disable`] nesting. The
//!   outermost disable takes the kernel lock and also bumps
//!   `scheduler_nest`, so code running with interrupts disabled is never
//!   preempted.
//! - `scheduler_nest` counts preemption-disabling nesting. The critical
//!   lock is taken by [`Scheduler::enter_critical`] only when the two
//!   counters are equal before the increment, i.e. at the outermost critical
//!   section relative to the interrupt-disable nesting, and released when
//!   they become equal again.
//!
//! The kernel lock is handed across context switches: the thread that takes
//! it may be switched out before releasing it, in which case
//! [`Scheduler::post_switch`] drops it on behalf of the incoming thread.
//!
//! `scheduler_nest >= kernel_nest` does not always hold (two nested
//! interrupt disables raise only `kernel_nest` a second time), so nothing
//! here relies on it.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{arch, sched::Scheduler};

/// Per-thread lock nesting counters.
///
/// Only the CPU running the owning thread modifies them, with local
/// interrupts masked, so relaxed ordering is enough.
#[derive(Debug)]
pub struct LockNest {
    scheduler: AtomicU32,
    kernel: AtomicU32,
}

/// Outcome of leaving one critical-section level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CriticalExit {
    /// The critical lock must be released.
    pub release: bool,
    /// Nesting depth after the exit.
    pub level: u32,
}

impl LockNest {
    /// Both counters at zero.
    pub const fn new() -> Self {
        Self {
            scheduler: AtomicU32::new(0),
            kernel: AtomicU32::new(0),
        }
    }

    /// Critical-section depth.
    pub fn scheduler_nest(&self) -> u32 {
        self.scheduler.load(Ordering::Relaxed)
    }

    /// Interrupt-disable depth.
    pub fn kernel_nest(&self) -> u32 {
        self.kernel.load(Ordering::Relaxed)
    }

    /// Enters a critical section. Returns `true` if the critical lock must be
    /// acquired.
    pub(crate) fn enter_critical(&self) -> bool {
        let sched = self.scheduler_nest();
        let acquire = sched == self.kernel_nest();
        self.scheduler.store(sched + 1, Ordering::Relaxed);
        acquire
    }

    /// Leaves a critical section. `None` if there was none to leave.
    pub(crate) fn exit_critical(&self) -> Option<CriticalExit> {
        let sched = self.scheduler_nest().checked_sub(1)?;
        self.scheduler.store(sched, Ordering::Relaxed);
        Some(CriticalExit {
            release: sched == self.kernel_nest(),
            level: sched,
        })
    }

    /// Enters an interrupt-disabled region. Returns `true` on the outermost
    /// entry, when the kernel lock must be acquired.
    pub(crate) fn kernel_enter(&self) -> bool {
        let kernel = self.kernel_nest();
        self.kernel.store(kernel + 1, Ordering::Relaxed);
        if kernel == 0 {
            self.scheduler.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Leaves an interrupt-disabled region. Returns `true` on the outermost
    /// exit, when the kernel lock must be released.
    pub(crate) fn kernel_exit(&self) -> bool {
        match self.kernel_nest() {
            0 => false,
            1 => {
                self.kernel.store(0, Ordering::Relaxed);
                self.scheduler.fetch_sub(1, Ordering::Relaxed);
                true
            }
            kernel => {
                self.kernel.store(kernel - 1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Drops the levels an interrupt epilogue raised on a thread that is
    /// being switched out from interrupt context. The epilogue will run on
    /// the incoming thread instead.
    pub(crate) fn unwind_interrupt(&self) {
        let kernel = self.kernel_nest();
        let sched = self.scheduler_nest();
        debug_assert!(kernel > 0 && sched > 0, "interrupt switch without nesting");
        self.kernel.store(kernel.saturating_sub(1), Ordering::Relaxed);
        self.scheduler.store(sched.saturating_sub(1), Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.scheduler.store(0, Ordering::Relaxed);
        self.kernel.store(0, Ordering::Relaxed);
    }
}

impl Default for LockNest {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII form of [`Scheduler::interrupt_disable`].
pub struct IrqNestGuard<'a> {
    sched: &'a Scheduler,
    level: usize,
}

impl<'a> IrqNestGuard<'a> {
    /// Disables local interrupts on `sched`'s behalf until dropped.
    pub fn new(sched: &'a Scheduler) -> Self {
        Self {
            level: sched.interrupt_disable(),
            sched,
        }
    }
}

impl Drop for IrqNestGuard<'_> {
    fn drop(&mut self) {
        self.sched.interrupt_enable(self.level);
    }
}

impl Scheduler {
    /// Counters of whoever runs on this CPU: the current thread, or the
    /// CPU's boot context before the first thread is switched in.
    pub(crate) fn current_nest(&self) -> &LockNest {
        let cpu = self.cpu(arch::this_cpu_id());
        match cpu.current() {
            Some(thread) => &thread.nest,
            None => &cpu.boot_nest,
        }
    }

    /// Disables local interrupts for scheduling-sensitive work and returns
    /// the level to restore.
    ///
    /// The outermost call on a thread also takes the kernel lock and
    /// disables preemption.
    pub fn interrupt_disable(&self) -> usize {
        let level = arch::local_irq_save_and_disable();
        if self.current_nest().kernel_enter() {
            self.kernel_lock.acquire();
        }
        level
    }

    /// Undoes one [`Scheduler::interrupt_disable`].
    pub fn interrupt_enable(&self, level: usize) {
        if self.current_nest().kernel_exit() {
            self.kernel_lock.release();
        }
        arch::local_irq_restore(level);
    }

    /// Returns a guard that keeps interrupts disabled until dropped.
    pub fn irq_guard(&self) -> IrqNestGuard<'_> {
        IrqNestGuard::new(self)
    }

    /// Disables preemption of the calling thread. Nests without bound.
    pub fn enter_critical(&self) {
        let level = arch::local_irq_save_and_disable();
        if self.current_nest().enter_critical() {
            self.critical_lock.acquire();
        }
        arch::local_irq_restore(level);
    }

    /// Leaves one critical-section level. Leaving the last one runs
    /// [`Scheduler::schedule`], so a preemption requested inside the section
    /// takes effect here.
    pub fn exit_critical(&self) {
        let level = arch::local_irq_save_and_disable();
        let Some(exit) = self.current_nest().exit_critical() else {
            arch::local_irq_restore(level);
            warn!("exit_critical without matching enter_critical");
            return;
        };
        if exit.release {
            self.critical_lock.release();
        }
        arch::local_irq_restore(level);

        if exit.level == 0 {
            self.schedule();
        }
    }

    /// Critical-section depth of the calling thread; 0 means preemptible.
    pub fn critical_level(&self) -> u32 {
        self.current_nest().scheduler_nest()
    }
}
