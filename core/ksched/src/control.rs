// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Thread control operations built on the ready queues.
//!
//! None of these reschedule by themselves: after suspending or retiring the
//! running thread, or lowering its priority, the caller invokes
//! [`Scheduler::schedule`].

use axerrno::{AxResult, ax_err};

use crate::{
    config::{CPU_NUM, MAX_PRIORITY},
    list,
    run_queue::Scope,
    sched::Scheduler,
    thread::{CpuAffinity, Thread, ThreadState},
};

impl Scheduler {
    /// Returns `true` if `thread` sits on a ready queue.
    pub fn is_queued(&self, thread: &Thread) -> bool {
        let _guard = self.irq_guard();
        thread.state() == ThreadState::Ready && list::is_linked(thread)
    }

    /// Sets the current priority of `thread`, requeueing it at the tail of
    /// its new level if it is waiting to run.
    pub fn change_priority(&self, thread: &'static Thread, priority: u8) -> AxResult {
        if priority as usize >= MAX_PRIORITY {
            return ax_err!(InvalidInput, "priority out of range");
        }

        let _guard = self.irq_guard();
        if thread.state() == ThreadState::Ready && list::is_linked(thread) {
            self.remove_locked(thread);
            thread.set_priority_raw(priority);
            self.insert_locked(thread);
        } else {
            thread.set_priority_raw(priority);
        }
        debug!("thread[{}] priority -> {}", thread.name(), priority);
        Ok(())
    }

    /// Binds `thread` to `affinity`, moving it to the matching ready queue
    /// if it is waiting to run.
    pub fn bind_cpu(&self, thread: &'static Thread, affinity: CpuAffinity) -> AxResult {
        let raw = affinity.checked_raw()?;

        let _guard = self.irq_guard();
        if thread.state() == ThreadState::Ready && list::is_linked(thread) {
            self.remove_locked(thread);
            thread.set_bind_cpu_raw(raw);
            self.insert_locked(thread);
        } else {
            thread.set_bind_cpu_raw(raw);
        }
        debug!("thread[{}] bound to {:?}", thread.name(), affinity);
        Ok(())
    }

    /// Takes a ready `thread` out of scheduling.
    pub fn suspend(&self, thread: &'static Thread) -> AxResult {
        let _guard = self.irq_guard();
        if thread.state() != ThreadState::Ready {
            return ax_err!(BadState, "suspend: thread is not ready");
        }
        if list::is_linked(thread) {
            self.remove_locked(thread);
        }
        thread.set_state(ThreadState::Suspended);
        debug!("thread[{}] suspended", thread.name());
        Ok(())
    }

    /// Marks `thread` as terminated and hands it to the reclaimer through
    /// the defunct list.
    pub fn retire(&self, thread: &'static Thread) -> AxResult {
        let _guard = self.irq_guard();
        if thread.state() == ThreadState::Closing {
            return ax_err!(AlreadyExists, "thread already retired");
        }
        if thread.state() == ThreadState::Ready && list::is_linked(thread) {
            self.remove_locked(thread);
        }
        thread.set_state(ThreadState::Closing);
        // SAFETY: kernel lock held.
        unsafe { (*self.defunct.get()).push_back(thread) };
        debug!("thread[{}] retired", thread.name());
        Ok(())
    }

    /// Oldest retired thread that has left its CPU, for the reclaimer.
    pub fn pop_defunct(&self) -> Option<&'static Thread> {
        let _guard = self.irq_guard();
        // SAFETY: kernel lock held.
        let defunct = unsafe { &mut *self.defunct.get() };
        let thread = defunct.iter().find(|t| !t.on_cpu())?;
        defunct.remove(thread);
        Some(thread)
    }

    /// Logs every non-empty ready list of every scope.
    pub fn dump_ready_queues(&self) {
        let _guard = self.irq_guard();
        let scopes = core::iter::once(Scope::Global).chain((0..CPU_NUM).map(Scope::Cpu));
        for scope in scopes {
            // SAFETY: kernel lock held; the borrow ends with this iteration.
            let queue = unsafe { self.queue(scope) };
            if queue.is_empty() {
                continue;
            }
            info!("ready queue {:?}: {} threads", scope, queue.len());
            for (prio, list) in queue.levels() {
                for thread in list.iter() {
                    info!(
                        "  [{:3}] {:<16} sp: {:#x} stack: {:#x}..{:#x}",
                        prio,
                        thread.name(),
                        thread.saved_sp(),
                        thread.stack().base,
                        thread.stack().top()
                    );
                }
            }
        }
    }
}
