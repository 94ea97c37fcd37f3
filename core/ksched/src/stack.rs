// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Stack overflow detection on switch targets.

use crate::{
    config::{STACK_GUARD_MARGIN, STACK_SENTINEL},
    thread::Thread,
};

/// Result of inspecting a thread's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// Sentinel intact and the saved stack pointer comfortably in bounds.
    Ok,
    /// In bounds, but within [`STACK_GUARD_MARGIN`] bytes of the limit.
    NearLimit,
    /// Sentinel overwritten or stack pointer out of bounds.
    Overflow,
    /// No stack region recorded; nothing to check.
    Unchecked,
}

/// Inspects `thread`'s stack.
///
/// Stacks grow down, so the sentinel sits at `base` and a valid saved
/// pointer satisfies `base < sp <= base + size`.
pub fn inspect(thread: &Thread) -> StackStatus {
    let stack = thread.stack();
    if stack.size == 0 {
        return StackStatus::Unchecked;
    }
    let sp = thread.saved_sp();
    // SAFETY: `base..base + size` is the thread's stack, which outlives it.
    let sentinel = unsafe { core::ptr::read_volatile(stack.base as *const u8) };

    if sentinel != STACK_SENTINEL || sp <= stack.base || sp > stack.top() {
        StackStatus::Overflow
    } else if sp <= stack.base + STACK_GUARD_MARGIN {
        StackStatus::NearLimit
    } else {
        StackStatus::Ok
    }
}

#[cfg(feature = "overflow-check")]
impl crate::sched::Scheduler {
    /// Checks a thread about to be switched in. An overflow is fatal.
    pub(crate) fn check_stack(&self, thread: &Thread) {
        match inspect(thread) {
            StackStatus::Overflow => self.stack_overflow(thread),
            StackStatus::NearLimit => {
                warn!(
                    "warning: {} stack is close to end of stack address.",
                    thread.name()
                );
            }
            StackStatus::Ok | StackStatus::Unchecked => {}
        }
    }

    fn stack_overflow(&self, thread: &Thread) -> ! {
        error!(
            "thread:{} stack overflow (sp: {:#x}, stack: {:#x}..{:#x})",
            thread.name(),
            thread.saved_sp(),
            thread.stack().base,
            thread.stack().top()
        );
        self.dump_ready_queues();
        // Leave interrupts off for good; the panic handler halts the CPU.
        let _ = crate::arch::local_irq_save_and_disable();
        panic!("thread:{} stack overflow", thread.name());
    }
}
