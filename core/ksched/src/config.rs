// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Compile-time scheduler configuration.
//!
//! `CPU_NUM` is generated by the build script from `KSCHED_CPU_NUM`; the
//! priority space is selected with the `prio-8` / `prio-256` features.

include!(concat!(env!("OUT_DIR"), "/config.rs"));

cfg_if::cfg_if! {
    if #[cfg(all(feature = "prio-8", feature = "prio-256"))] {
        compile_error!("features `prio-8` and `prio-256` are mutually exclusive");
    } else if #[cfg(feature = "prio-256")] {
        /// Number of priority levels.
        pub const MAX_PRIORITY: usize = 256;
        /// Bitmap type indexing the per-priority ready lists.
        pub type ReadyBitmap = crate::bitmap::GroupBitmap;
    } else if #[cfg(feature = "prio-8")] {
        /// Number of priority levels.
        pub const MAX_PRIORITY: usize = 8;
        /// Bitmap type indexing the per-priority ready lists.
        pub type ReadyBitmap = crate::bitmap::WordBitmap;
    } else {
        /// Number of priority levels.
        pub const MAX_PRIORITY: usize = 32;
        /// Bitmap type indexing the per-priority ready lists.
        pub type ReadyBitmap = crate::bitmap::WordBitmap;
    }
}

/// Lowest priority, given to an idle CPU slot.
pub const LOWEST_PRIORITY: u8 = (MAX_PRIORITY - 1) as u8;

/// Affinity sentinel meaning "may run on any CPU".
pub const CPU_UNBOUND: usize = CPU_NUM;

/// Byte written at the lowest address of every thread stack.
pub const STACK_SENTINEL: u8 = b'#';

/// A saved stack pointer this close to the stack limit triggers a warning.
pub const STACK_GUARD_MARGIN: usize = 32;
