// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Thread selection and switch orchestration.

use core::{
    cell::UnsafeCell,
    ptr,
    sync::atomic::{AtomicPtr, AtomicU8, Ordering},
};

use kspin::RawSpinLock;

use crate::{
    arch,
    config::{CPU_NUM, LOWEST_PRIORITY, MAX_PRIORITY},
    critical::LockNest,
    hook::SchedulerHook,
    list::ThreadList,
    run_queue::{ReadyQueue, Scope, tie_break},
    thread::{Thread, ThreadState},
};
#[cfg(feature = "signals")]
use crate::thread::ThreadFlags;

/// State owned by one CPU.
pub(crate) struct PerCpu {
    current: AtomicPtr<Thread>,
    current_priority: AtomicU8,
    ready: UnsafeCell<ReadyQueue>,
    /// Lock nesting of the boot context, used until a thread runs here.
    pub(crate) boot_nest: LockNest,
}

impl PerCpu {
    const fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
            current_priority: AtomicU8::new(LOWEST_PRIORITY),
            ready: UnsafeCell::new(ReadyQueue::new()),
            boot_nest: LockNest::new(),
        }
    }

    pub(crate) fn current(&self) -> Option<&'static Thread> {
        let thread = self.current.load(Ordering::Acquire);
        // SAFETY: only `'static` threads are ever stored.
        unsafe { thread.as_ref() }
    }

    fn set_current(&self, thread: &'static Thread) {
        self.current
            .store(thread as *const Thread as *mut Thread, Ordering::Release);
    }
}

/// The SMP scheduler: a global ready queue, one ready queue per CPU, the
/// defunct list, and the locks guarding them.
///
/// Ready queues and the defunct list are only touched with local interrupts
/// disabled through [`Scheduler::interrupt_disable`], which serializes CPUs
/// on the kernel lock.
pub struct Scheduler {
    global: UnsafeCell<ReadyQueue>,
    cpus: [PerCpu; CPU_NUM],
    pub(crate) defunct: UnsafeCell<ThreadList>,
    pub(crate) critical_lock: RawSpinLock,
    pub(crate) kernel_lock: RawSpinLock,
    pub(crate) hook: UnsafeCell<Option<&'static dyn SchedulerHook>>,
}

// Queues, the defunct list and the hook slot are only touched under the
// kernel lock with local IRQs masked.
unsafe impl Sync for Scheduler {}
unsafe impl Send for Scheduler {}

impl Scheduler {
    /// Creates a scheduler with empty queues. Call [`Scheduler::init`]
    /// before use.
    pub const fn new() -> Self {
        Self {
            global: UnsafeCell::new(ReadyQueue::new()),
            cpus: [const { PerCpu::new() }; CPU_NUM],
            defunct: UnsafeCell::new(ThreadList::new()),
            critical_lock: RawSpinLock::new(),
            kernel_lock: RawSpinLock::new(),
            hook: UnsafeCell::new(None),
        }
    }

    /// Empties every ready queue and the defunct list, and resets each CPU
    /// to "no current thread" at the lowest priority.
    ///
    /// Must run before any thread is inserted.
    pub fn init(&self) {
        info!("start scheduler: max priority {:#04x}, {} cpus", MAX_PRIORITY, CPU_NUM);

        // SAFETY: single-threaded boot; nothing else references the queues.
        unsafe {
            (*self.global.get()).reset();
            (*self.defunct.get()).clear();
        }
        for cpu in &self.cpus {
            unsafe { (*cpu.ready.get()).reset() };
            cpu.current.store(ptr::null_mut(), Ordering::Release);
            cpu.current_priority.store(LOWEST_PRIORITY, Ordering::Relaxed);
            cpu.boot_nest.reset();
        }
        self.critical_lock.release();
        self.kernel_lock.release();
    }

    pub(crate) fn cpu(&self, cpu: usize) -> &PerCpu {
        &self.cpus[cpu]
    }

    /// # Safety
    ///
    /// Caller holds the kernel lock with local interrupts disabled, and does
    /// not keep another reference to the same queue alive.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn queue(&self, scope: Scope) -> &mut ReadyQueue {
        match scope {
            Scope::Global => unsafe { &mut *self.global.get() },
            Scope::Cpu(cpu) => unsafe { &mut *self.cpus[cpu].ready.get() },
        }
    }

    /// Makes `thread` ready and queues it at the tail of its priority level.
    ///
    /// A thread that is on a CPU only has its state updated: it is in the
    /// middle of a switch and must not be queued twice.
    pub fn insert_thread(&self, thread: &'static Thread) {
        let _guard = self.irq_guard();
        self.insert_locked(thread);
    }

    /// Takes `thread` off its ready queue.
    pub fn remove_thread(&self, thread: &'static Thread) {
        let _guard = self.irq_guard();
        self.remove_locked(thread);
    }

    pub(crate) fn insert_locked(&self, thread: &'static Thread) {
        thread.set_state(ThreadState::Ready);
        if thread.on_cpu() {
            return;
        }

        let scope = Scope::of(thread);
        let slot = thread.priority_slot();
        debug!(
            "insert thread[{}], the priority: {} ({:?}) {:#x} {:#x} {:#x}",
            thread.name(),
            thread.current_priority(),
            scope,
            slot.number,
            slot.number_mask,
            slot.high_mask
        );
        // SAFETY: kernel lock held by the caller.
        unsafe { self.queue(scope) }.push(thread);
    }

    pub(crate) fn remove_locked(&self, thread: &Thread) {
        let scope = Scope::of(thread);
        debug!(
            "remove thread[{}], the priority: {} ({:?})",
            thread.name(),
            thread.current_priority(),
            scope
        );
        // SAFETY: kernel lock held by the caller.
        if !unsafe { self.queue(scope) }.remove(thread) {
            debug!("remove thread[{}]: not queued", thread.name());
        }
    }

    /// Highest ready priority of `scope`.
    pub fn highest_ready(&self, scope: Scope) -> Option<u8> {
        let _guard = self.irq_guard();
        unsafe { self.queue(scope) }.highest()
    }

    /// Best candidate for `cpu` across the global and the CPU's own queue.
    fn select(&self, cpu: usize) -> Option<(&'static Thread, u8)> {
        // SAFETY: kernel lock held by the caller; each borrow ends here.
        let global = unsafe { self.queue(Scope::Global) }.highest();
        let local = unsafe { self.queue(Scope::Cpu(cpu)) }.highest();
        let (scope, prio) = tie_break(global, local, cpu)?;
        let thread = unsafe { self.queue(scope) }.front(prio)?;
        Some((thread, prio))
    }

    fn has_ready(&self, cpu: usize) -> bool {
        // SAFETY: kernel lock held by the caller.
        unsafe { !self.queue(Scope::Global).is_empty() || !self.queue(Scope::Cpu(cpu)).is_empty() }
    }

    /// Decides whether `current` keeps `cpu`, committing the decision in the
    /// ready queues. Returns the thread to switch to, if any.
    fn pick_next(&self, cpu: usize, current: &'static Thread) -> Option<&'static Thread> {
        if !self.has_ready(cpu) {
            return None;
        }

        current.set_on_cpu(false);
        if current.state() == ThreadState::Ready {
            self.insert_locked(current);
        }

        let Some((to, prio)) = self.select(cpu) else {
            // Nothing runnable after all; the caller keeps running.
            current.set_on_cpu(true);
            return None;
        };

        if ptr::eq(to, current) {
            current.set_on_cpu(true);
            self.remove_locked(current);
            return None;
        }

        self.cpus[cpu].current_priority.store(prio, Ordering::Relaxed);
        self.call_hook(current, to);

        to.set_on_cpu(true);
        self.remove_locked(to);

        debug!(
            "[{}]switch to priority#{} thread:{}(sp:{:#x}), from thread:{}(sp: {:#x})",
            cpu,
            prio,
            to.name(),
            to.saved_sp(),
            current.name(),
            current.saved_sp()
        );

        #[cfg(feature = "overflow-check")]
        self.check_stack(to);

        Some(to)
    }

    /// Voluntary reschedule.
    ///
    /// Does nothing unless the caller is preemptible (its only lock level is
    /// the one taken here) and not in interrupt context. If a better or
    /// equal-priority thread is ready, the caller is requeued (when still
    /// ready) and the CPU switches away; this call returns once the caller
    /// is switched back in.
    pub fn schedule(&self) {
        let level = self.interrupt_disable();
        let cpu = arch::this_cpu_id();

        let Some(current) = self.cpus[cpu].current() else {
            self.interrupt_enable(level);
            return;
        };
        if current.scheduler_lock_nest() != 1 || arch::in_interrupt() {
            self.interrupt_enable(level);
            return;
        }

        match self.pick_next(cpu, current) {
            Some(to) => {
                arch::context_switch(current, to);

                // Back on `current`, possibly on another CPU.
                self.interrupt_enable(level);
                #[cfg(feature = "signals")]
                if current.flags().contains(ThreadFlags::SIGNAL_PENDING) {
                    arch::handle_signal(current);
                }
            }
            None => self.interrupt_enable(level),
        }
    }

    /// Reschedule on interrupt return.
    ///
    /// The interrupt epilogue already masks interrupts and holds the
    /// matching lock level; this only decides and requests the switch.
    /// Signals are left to the next voluntary reschedule.
    pub fn interrupt_check_schedule(&self) {
        let cpu = arch::this_cpu_id();
        let Some(current) = self.cpus[cpu].current() else {
            return;
        };
        if current.scheduler_lock_nest() != 1 || arch::in_interrupt() {
            return;
        }

        if let Some(to) = self.pick_next(cpu, current) {
            debug!("switch in interrupt");
            arch::context_switch_interrupt(current, to);
        }
    }

    /// Commits the first thread of this CPU: the tie-break winner is marked
    /// on-CPU and dequeued.
    pub(crate) fn switch_in_first(&self) -> &'static Thread {
        let cpu = arch::this_cpu_id();
        let Some((to, prio)) = self.select(cpu) else {
            panic!("no ready thread to start on CPU {cpu}");
        };
        self.cpus[cpu].current_priority.store(prio, Ordering::Relaxed);
        to.set_on_cpu(true);
        self.remove_locked(to);
        info!("CPU {} starts thread {} at priority {}", cpu, to.name(), prio);
        to
    }

    /// Switches this CPU to its first thread. Called once per CPU at boot.
    pub fn start(&self) -> ! {
        // Restored by the incoming thread's own context.
        let _level = self.interrupt_disable();
        let to = self.switch_in_first();
        arch::context_switch_to(to);
        unreachable!("initial context switch returned");
    }

    /// Bookkeeping run by the switch trampoline once `thread` owns the CPU.
    ///
    /// Releases the kernel lock the switching thread took, unless `thread`
    /// was itself switched out holding a level of it.
    pub fn post_switch(&self, thread: &'static Thread) {
        let cpu = arch::this_cpu_id();
        self.cpus[cpu].set_current(thread);
        if thread.kernel_lock_nest() == 0 {
            self.kernel_lock.release();
        }
    }

    /// [`Scheduler::post_switch`] for switches requested on interrupt return.
    ///
    /// The preempted thread gives up the lock levels the interrupt epilogue
    /// raised, since that epilogue finishes on `thread`.
    pub fn post_switch_int(&self, thread: &'static Thread) {
        let cpu = arch::this_cpu_id();
        if let Some(prev) = self.cpus[cpu].current() {
            prev.nest.unwind_interrupt();
        }
        self.cpus[cpu].set_current(thread);
        if thread.kernel_lock_nest() == 0 {
            self.kernel_lock.release();
        }
    }

    /// Thread running on `cpu`.
    pub fn current_thread(&self, cpu: usize) -> Option<&'static Thread> {
        self.cpus[cpu].current()
    }

    /// Priority of the thread last switched in on `cpu`.
    pub fn current_priority(&self, cpu: usize) -> u8 {
        self.cpus[cpu].current_priority.load(Ordering::Relaxed)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
