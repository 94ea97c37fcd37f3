// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Preemptive fixed-priority SMP scheduler core.
//!
//! Threads live in intrusive FIFO lists, one per priority level, with a
//! bitmap over the levels for O(1) lookup of the highest ready priority.
//! Lower numbers are higher priority. Unbound threads share a global ready
//! queue; threads bound to a CPU live in that CPU's own queue. When a CPU
//! reschedules it compares the best of both, and the global candidate wins
//! ties.
//!
//! Preemption is disabled with nested critical sections
//! ([`enter_critical`] / [`exit_critical`]); a reschedule requested inside
//! one is deferred until the outermost section is left. The scheduler never
//! switches stacks itself: it decides, and asks the platform through
//! [`SchedArchIf`].
//!
//! # Cargo Features
//!
//! - `smp`: Real spinlocks between CPUs. Enabled by default.
//! - `overflow-check`: Check the stack sentinel and saved stack pointer of
//!   every thread about to be switched in. Enabled by default.
//! - `signals`: Deliver pending signals to a thread right after it is
//!   switched back in. Enabled by default.
//! - `prio-8` / `prio-256`: 8 or 256 priority levels instead of 32. The
//!   256-level space uses a two-level bitmap.
//!
//! The number of CPUs comes from the `KSCHED_CPU_NUM` environment variable
//! at build time (default 2).

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

mod api;
mod arch;
mod bitmap;
mod config;
mod control;
mod critical;
mod hook;
mod list;
mod run_queue;
mod sched;
mod stack;
mod thread;


pub use self::{
    api::*,
    arch::SchedArchIf,
    bitmap::{BitScan, GroupBitmap, PriorityBitmap, PrioritySlot, WordBitmap},
    config::{CPU_NUM, CPU_UNBOUND, LOWEST_PRIORITY, MAX_PRIORITY, ReadyBitmap},
    critical::{IrqNestGuard, LockNest},
    hook::SchedulerHook,
    run_queue::{Scope, tie_break},
    sched::Scheduler,
    stack::{StackStatus, inspect as inspect_stack},
    thread::{CpuAffinity, StackRegion, Thread, ThreadFlags, ThreadState},
};
