// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Switch observer.

use crate::{sched::Scheduler, thread::Thread};

/// Observer notified right before every committed thread switch.
///
/// Called with local interrupts disabled and the scheduler locked: it must
/// not block, reschedule, or touch the ready queues. It exists for tracing
/// and never influences the decision.
pub trait SchedulerHook: Sync {
    /// `from` is about to give its CPU to `to`.
    fn on_switch(&self, from: &Thread, to: &Thread);
}

impl Scheduler {
    /// Installs `hook`, replacing any previous one. `None` removes it.
    pub fn set_hook(&self, hook: Option<&'static dyn SchedulerHook>) {
        let _guard = self.irq_guard();
        // SAFETY: kernel lock held.
        unsafe { *self.hook.get() = hook };
    }

    /// Caller holds the kernel lock.
    pub(crate) fn call_hook(&self, from: &Thread, to: &Thread) {
        let hook = unsafe { *self.hook.get() };
        if let Some(hook) = hook {
            hook.on_switch(from, to);
        }
    }
}
