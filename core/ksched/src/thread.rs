// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Scheduling view of a thread.
//!
//! The scheduler never allocates or frees a [`Thread`]. Whoever creates one
//! keeps it alive (statically or leaked) for as long as the scheduler may
//! reference it, which is why every entry point takes `&'static Thread`.

use core::{
    cell::UnsafeCell,
    fmt,
    sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
};

use axerrno::{AxResult, ax_err};
use bitflags::bitflags;

use crate::{
    bitmap::{PriorityBitmap, PrioritySlot},
    config::{CPU_NUM, CPU_UNBOUND, MAX_PRIORITY, ReadyBitmap, STACK_SENTINEL},
    critical::LockNest,
    list::ListLink,
};

/// Mask selecting the [`ThreadState`] bits of the packed status byte.
const STAT_MASK: u8 = 0x0f;

/// Scheduling state of a thread.
///
/// "Running" is not stored: a running thread is [`ThreadState::Ready`] with
/// its `on_cpu` flag set.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Created, never made ready.
    Init = 0x00,
    /// Runnable, queued or on a CPU.
    Ready = 0x01,
    /// Blocked on something outside the scheduler.
    Suspended = 0x02,
    /// Terminated, waiting on the defunct list.
    Closing = 0x04,
}

impl ThreadState {
    fn from_bits(bits: u8) -> Self {
        match bits & STAT_MASK {
            0x01 => Self::Ready,
            0x02 => Self::Suspended,
            0x04 => Self::Closing,
            _ => Self::Init,
        }
    }
}

bitflags! {
    /// Auxiliary status bits stored next to the [`ThreadState`].
    ///
    /// State transitions made by the scheduler preserve them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadFlags: u8 {
        /// Signal delivery is set up for this thread.
        const SIGNAL = 0x10;
        /// Suspended waiting for a signal.
        const SIGNAL_WAIT = 0x20;
        /// A signal is pending delivery.
        const SIGNAL_PENDING = 0x40;
    }
}

/// Where a thread may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuAffinity {
    /// Any CPU; the thread lives in the global ready queue.
    Unbound,
    /// Only this CPU; the thread lives in that CPU's ready queue.
    Cpu(usize),
}

impl CpuAffinity {
    /// Encodes the affinity with [`CPU_UNBOUND`] as the "any CPU" sentinel.
    pub const fn as_raw(self) -> usize {
        match self {
            Self::Unbound => CPU_UNBOUND,
            Self::Cpu(cpu) => cpu,
        }
    }

    /// Encodes the affinity, rejecting CPU indices out of range.
    pub fn checked_raw(self) -> AxResult<usize> {
        match self {
            Self::Cpu(cpu) if cpu >= CPU_NUM => ax_err!(InvalidInput, "cpu index out of range"),
            _ => Ok(self.as_raw()),
        }
    }

    /// Decodes a raw affinity value.
    pub fn from_raw(raw: usize) -> AxResult<Self> {
        if raw == CPU_UNBOUND {
            Ok(Self::Unbound)
        } else if raw < CPU_NUM {
            Ok(Self::Cpu(raw))
        } else {
            ax_err!(InvalidInput, "cpu index out of range")
        }
    }
}

/// Bounds of a thread stack. Stacks grow downwards from `base + size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    /// Lowest address; holds [`STACK_SENTINEL`].
    pub base: usize,
    /// Size in bytes.
    pub size: usize,
}

impl StackRegion {
    /// Describes `buf` as a stack and fills it with [`STACK_SENTINEL`].
    pub fn from_buffer(buf: &'static mut [u8]) -> Self {
        buf.fill(STACK_SENTINEL);
        Self {
            base: buf.as_ptr() as usize,
            size: buf.len(),
        }
    }

    /// One past the highest address.
    pub const fn top(&self) -> usize {
        self.base + self.size
    }
}

/// The scheduling-relevant part of a thread control block.
pub struct Thread {
    name: &'static str,
    init_priority: u8,
    current_priority: AtomicU8,
    slot: UnsafeCell<PrioritySlot>,
    stat: AtomicU8,
    on_cpu: AtomicBool,
    bind_cpu: AtomicUsize,
    sp: AtomicUsize,
    stack: StackRegion,
    pub(crate) nest: LockNest,
    pub(crate) link: UnsafeCell<ListLink>,
}

// `slot` and `link` are only touched with local IRQs masked and the kernel
// lock held.
unsafe impl Sync for Thread {}
unsafe impl Send for Thread {}

impl Thread {
    /// Creates an unbound thread in [`ThreadState::Init`].
    ///
    /// The saved stack pointer starts at the top of `stack`; the arch layer
    /// builds the initial frame and stores the real value with
    /// [`Thread::set_saved_sp`].
    pub fn new(name: &'static str, priority: u8, stack: StackRegion) -> AxResult<Self> {
        if priority as usize >= MAX_PRIORITY {
            return ax_err!(InvalidInput, "priority out of range");
        }
        Ok(Self {
            name,
            init_priority: priority,
            current_priority: AtomicU8::new(priority),
            slot: UnsafeCell::new(ReadyBitmap::slot(priority)),
            stat: AtomicU8::new(ThreadState::Init as u8),
            on_cpu: AtomicBool::new(false),
            bind_cpu: AtomicUsize::new(CPU_UNBOUND),
            sp: AtomicUsize::new(stack.top()),
            stack,
            nest: LockNest::new(),
            link: UnsafeCell::new(ListLink::new()),
        })
    }

    /// Creates a thread bound to `affinity`.
    pub fn with_affinity(
        name: &'static str,
        priority: u8,
        stack: StackRegion,
        affinity: CpuAffinity,
    ) -> AxResult<Self> {
        let raw = affinity.checked_raw()?;
        let thread = Self::new(name, priority, stack)?;
        thread.bind_cpu.store(raw, Ordering::Relaxed);
        Ok(thread)
    }

    /// Thread name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Priority the thread was created with.
    pub fn init_priority(&self) -> u8 {
        self.init_priority
    }

    /// Current effective priority.
    pub fn current_priority(&self) -> u8 {
        self.current_priority.load(Ordering::Relaxed)
    }

    /// Pre-decomposed current priority.
    pub fn priority_slot(&self) -> PrioritySlot {
        unsafe { *self.slot.get() }
    }

    /// Updates the current priority and its decomposition.
    ///
    /// Caller holds the scheduler and the thread is not queued.
    pub(crate) fn set_priority_raw(&self, priority: u8) {
        self.current_priority.store(priority, Ordering::Relaxed);
        unsafe { *self.slot.get() = ReadyBitmap::slot(priority) };
    }

    /// Scheduling state, without auxiliary flags.
    pub fn state(&self) -> ThreadState {
        ThreadState::from_bits(self.stat.load(Ordering::Acquire))
    }

    /// Auxiliary status flags.
    pub fn flags(&self) -> ThreadFlags {
        ThreadFlags::from_bits_truncate(self.stat.load(Ordering::Acquire))
    }

    /// Replaces the state, keeping the auxiliary flags.
    pub(crate) fn set_state(&self, state: ThreadState) {
        let _ = self
            .stat
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |stat| {
                Some(state as u8 | (stat & !STAT_MASK))
            });
    }

    /// Sets auxiliary flags, keeping the state.
    pub fn insert_flags(&self, flags: ThreadFlags) {
        self.stat.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Clears auxiliary flags, keeping the state.
    pub fn remove_flags(&self, flags: ThreadFlags) {
        self.stat.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Returns `true` if the thread is physically executing on some CPU.
    pub fn on_cpu(&self) -> bool {
        self.on_cpu.load(Ordering::Acquire)
    }

    pub(crate) fn set_on_cpu(&self, on_cpu: bool) {
        self.on_cpu.store(on_cpu, Ordering::Release);
    }

    /// Returns `true` if the thread is ready and on a CPU.
    pub fn is_running(&self) -> bool {
        self.on_cpu() && self.state() == ThreadState::Ready
    }

    /// Raw affinity: a CPU index, or [`CPU_UNBOUND`].
    pub fn bind_cpu(&self) -> usize {
        self.bind_cpu.load(Ordering::Relaxed)
    }

    /// Decoded affinity.
    pub fn affinity(&self) -> CpuAffinity {
        match self.bind_cpu() {
            CPU_UNBOUND => CpuAffinity::Unbound,
            cpu => CpuAffinity::Cpu(cpu),
        }
    }

    /// Caller holds the scheduler and the thread is not queued.
    pub(crate) fn set_bind_cpu_raw(&self, raw: usize) {
        self.bind_cpu.store(raw, Ordering::Relaxed);
    }

    /// Saved stack pointer.
    pub fn saved_sp(&self) -> usize {
        self.sp.load(Ordering::Relaxed)
    }

    /// Stores the saved stack pointer.
    pub fn set_saved_sp(&self, sp: usize) {
        self.sp.store(sp, Ordering::Relaxed);
    }

    /// Location the context-switch code saves into and restores from.
    pub fn saved_sp_ptr(&self) -> *mut usize {
        self.sp.as_ptr()
    }

    /// Stack bounds.
    pub fn stack(&self) -> StackRegion {
        self.stack
    }

    /// Critical-section nesting depth.
    pub fn scheduler_lock_nest(&self) -> u32 {
        self.nest.scheduler_nest()
    }

    /// Interrupt-disable nesting depth.
    pub fn kernel_lock_nest(&self) -> u32 {
        self.nest.kernel_nest()
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("priority", &self.current_priority())
            .field("state", &self.state())
            .field("on_cpu", &self.on_cpu())
            .field("bind_cpu", &self.bind_cpu())
            .field("sp", &format_args!("{:#x}", self.saved_sp()))
            .finish()
    }
}
