// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Services the scheduler consumes from the platform.
//!
//! The platform crate implements [`SchedArchIf`] once with
//! `#[crate_interface::impl_interface]`; the scheduler calls it through the
//! thin wrappers below.

/// Low-level hooks provided by the architecture / platform layer.
#[crate_interface::def_interface]
pub trait SchedArchIf {
    /// Save and disable local interrupts, returning saved flags.
    fn local_irq_save_and_disable() -> usize;

    /// Restore local interrupts from saved flags.
    fn local_irq_restore(flags: usize);

    /// Logical index of the executing CPU, in `0..CPU_NUM`.
    fn this_cpu_id() -> usize;

    /// Returns `true` while an interrupt handler is running on this CPU.
    fn in_interrupt() -> bool;

    /// Load `to` with no context to save. Used once per CPU at start.
    ///
    /// The platform code does not return from this call.
    fn context_switch_to(to: &'static crate::thread::Thread);

    /// Save the running context into `from` and resume `to`.
    ///
    /// Returns when some later switch resumes `from`. The trampoline calls
    /// [`crate::post_switch`] on the new thread before it continues.
    fn context_switch(from: &'static crate::thread::Thread, to: &'static crate::thread::Thread);

    /// Arrange for `to` to be resumed on interrupt return.
    ///
    /// The trampoline calls [`crate::post_switch_int`] on the new thread.
    fn context_switch_interrupt(
        from: &'static crate::thread::Thread,
        to: &'static crate::thread::Thread,
    );

    /// Deliver pending signals to `thread`, which has just resumed.
    ///
    /// Only called while [`ThreadFlags::SIGNAL_PENDING`] is set; the
    /// implementation clears it once the signals are handled.
    ///
    /// [`ThreadFlags::SIGNAL_PENDING`]: crate::thread::ThreadFlags::SIGNAL_PENDING
    fn handle_signal(thread: &'static crate::thread::Thread);
}

#[inline]
pub(crate) fn local_irq_save_and_disable() -> usize {
    crate_interface::call_interface!(SchedArchIf::local_irq_save_and_disable)
}

#[inline]
pub(crate) fn local_irq_restore(flags: usize) {
    crate_interface::call_interface!(SchedArchIf::local_irq_restore, flags)
}

#[inline]
pub(crate) fn this_cpu_id() -> usize {
    crate_interface::call_interface!(SchedArchIf::this_cpu_id)
}

#[inline]
pub(crate) fn in_interrupt() -> bool {
    crate_interface::call_interface!(SchedArchIf::in_interrupt)
}

#[inline]
pub(crate) fn context_switch_to(to: &'static crate::thread::Thread) {
    crate_interface::call_interface!(SchedArchIf::context_switch_to, to)
}

#[inline]
pub(crate) fn context_switch(
    from: &'static crate::thread::Thread,
    to: &'static crate::thread::Thread,
) {
    crate_interface::call_interface!(SchedArchIf::context_switch, from, to)
}

#[inline]
pub(crate) fn context_switch_interrupt(
    from: &'static crate::thread::Thread,
    to: &'static crate::thread::Thread,
) {
    crate_interface::call_interface!(SchedArchIf::context_switch_interrupt, from, to)
}

#[cfg(feature = "signals")]
#[inline]
pub(crate) fn handle_signal(thread: &'static crate::thread::Thread) {
    crate_interface::call_interface!(SchedArchIf::handle_signal, thread)
}
