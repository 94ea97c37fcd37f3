// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Scheduler APIs over the kernel's single scheduler instance.

use axerrno::AxResult;

use crate::{
    critical::IrqNestGuard,
    hook::SchedulerHook,
    run_queue::Scope,
    sched::Scheduler,
    thread::{CpuAffinity, Thread},
};

static SCHEDULER: Scheduler = Scheduler::new();

/// The kernel's scheduler instance.
pub fn scheduler() -> &'static Scheduler {
    &SCHEDULER
}

/// Initializes the scheduler. Called once on the boot CPU.
pub fn scheduler_init() {
    SCHEDULER.init();
}

/// Switches this CPU to its first thread.
pub fn scheduler_start() -> ! {
    SCHEDULER.start()
}

/// Makes `thread` ready.
pub fn schedule_insert_thread(thread: &'static Thread) {
    SCHEDULER.insert_thread(thread);
}

/// Takes `thread` off its ready queue.
pub fn schedule_remove_thread(thread: &'static Thread) {
    SCHEDULER.remove_thread(thread);
}

/// Voluntary reschedule of the current thread.
pub fn schedule() {
    SCHEDULER.schedule();
}

/// Reschedule from the interrupt epilogue.
pub fn interrupt_check_schedule() {
    SCHEDULER.interrupt_check_schedule();
}

/// Disables preemption of the current thread.
pub fn enter_critical() {
    SCHEDULER.enter_critical();
}

/// Leaves one critical-section level, rescheduling at the last one.
pub fn exit_critical() {
    SCHEDULER.exit_critical();
}

/// Critical-section depth of the current thread.
pub fn critical_level() -> u32 {
    SCHEDULER.critical_level()
}

/// Switch trampoline bookkeeping for [`SchedArchIf::context_switch`].
///
/// [`SchedArchIf::context_switch`]: crate::SchedArchIf::context_switch
pub fn post_switch(thread: &'static Thread) {
    SCHEDULER.post_switch(thread);
}

/// Switch trampoline bookkeeping for
/// [`SchedArchIf::context_switch_interrupt`].
///
/// [`SchedArchIf::context_switch_interrupt`]: crate::SchedArchIf::context_switch_interrupt
pub fn post_switch_int(thread: &'static Thread) {
    SCHEDULER.post_switch_int(thread);
}

/// Installs or removes the switch observer.
pub fn set_scheduler_hook(hook: Option<&'static dyn SchedulerHook>) {
    SCHEDULER.set_hook(hook);
}

/// Disables local interrupts and takes the kernel lock at the outermost
/// level. Returns the level for [`interrupt_enable`].
pub fn interrupt_disable() -> usize {
    SCHEDULER.interrupt_disable()
}

/// Undoes one [`interrupt_disable`].
pub fn interrupt_enable(level: usize) {
    SCHEDULER.interrupt_enable(level);
}

/// RAII form of [`interrupt_disable`].
pub fn irq_guard() -> IrqNestGuard<'static> {
    SCHEDULER.irq_guard()
}

/// See [`Scheduler::change_priority`].
pub fn change_priority(thread: &'static Thread, priority: u8) -> AxResult {
    SCHEDULER.change_priority(thread, priority)
}

/// See [`Scheduler::bind_cpu`].
pub fn bind_cpu(thread: &'static Thread, affinity: CpuAffinity) -> AxResult {
    SCHEDULER.bind_cpu(thread, affinity)
}

/// See [`Scheduler::suspend`].
pub fn suspend(thread: &'static Thread) -> AxResult {
    SCHEDULER.suspend(thread)
}

/// See [`Scheduler::retire`].
pub fn retire(thread: &'static Thread) -> AxResult {
    SCHEDULER.retire(thread)
}

/// See [`Scheduler::pop_defunct`].
pub fn pop_defunct() -> Option<&'static Thread> {
    SCHEDULER.pop_defunct()
}

/// Logs the contents of every ready queue.
pub fn dump_ready_queues() {
    SCHEDULER.dump_ready_queues();
}

/// Thread running on `cpu`.
pub fn current_thread(cpu: usize) -> Option<&'static Thread> {
    SCHEDULER.current_thread(cpu)
}

/// Priority of the thread running on `cpu`.
pub fn current_priority(cpu: usize) -> u8 {
    SCHEDULER.current_priority(cpu)
}

/// Highest ready priority in `scope`.
pub fn highest_ready(scope: Scope) -> Option<u8> {
    SCHEDULER.highest_ready(scope)
}
