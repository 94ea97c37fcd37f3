// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Raw spinlocks used underneath the scheduler.
//!
//! [`RawSpinLock`] is a bare acquire/release primitive with no RAII guard.
//! The scheduler needs this shape because its locks are taken and released
//! at different call sites, and sometimes by different threads on the same
//! CPU (a lock taken before a context switch is dropped by the thread that
//! is switched in).
//!
//! It does not touch IRQs or preemption; callers mask local interrupts
//! first.
//!
//! # Feature Flags
//!
//! - `smp`: Enable for multi-core systems (adds atomic lock state). Without
//!   it every lock operation compiles to nothing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kspin::RawSpinLock;
//!
//! static SCHED_LOCK: RawSpinLock = RawSpinLock::new();
//!
//! fn enter() {
//!     SCHED_LOCK.acquire();
//! }
//!
//! fn leave() {
//!     SCHED_LOCK.release();
//! }
//! ```

mod raw;

#[cfg(test)]
mod tests;

pub use raw::RawSpinLock;
