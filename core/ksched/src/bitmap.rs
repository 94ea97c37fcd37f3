// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Priority bitmaps with O(1) highest-ready lookup.
//!
//! Bit `p` is set iff the ready list for priority `p` is non-empty. Since a
//! lower number means a higher priority, the highest ready priority is the
//! lowest set bit.
//!
//! Two layouts are provided:
//!
//! - [`WordBitmap`]: a single `u32`, for up to 32 levels.
//! - [`GroupBitmap`]: a `u32` group word over a 32-byte table, for up to 256
//!   levels. Bit `g` of the group word is set iff byte `g` of the table is
//!   non-zero, so a lookup is two bit scans.

/// Portable find-first-set.
///
/// Returns the index of the lowest set bit, or `None` for zero. This is the
/// same answer as a hardware `ffs` minus one; `trailing_zeros` lowers to the
/// native instruction where the target has one.
pub trait BitScan: Copy {
    /// Index of the lowest set bit.
    fn lowest_set(self) -> Option<u32>;
}

macro_rules! impl_bit_scan {
    ($($ty:ty),*) => {
        $(
            impl BitScan for $ty {
                #[inline(always)]
                fn lowest_set(self) -> Option<u32> {
                    if self == 0 {
                        None
                    } else {
                        Some(self.trailing_zeros())
                    }
                }
            }
        )*
    };
}

impl_bit_scan!(u8, u32, u64, usize);

/// A priority pre-decomposed for bitmap updates.
///
/// Computed once whenever a thread's priority changes, so that insert and
/// remove never have to divide or shift by a variable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrioritySlot {
    /// Group index (byte of the secondary table). Always 0 for word bitmaps.
    pub number: u8,
    /// Bit to set in the group word.
    pub number_mask: u32,
    /// Bit to set in the secondary table byte. Unused by word bitmaps.
    pub high_mask: u8,
}

/// Operations shared by every bitmap layout.
pub trait PriorityBitmap {
    /// Number of priority levels this layout can index.
    const LEVELS: usize;

    /// Decomposes `priority` for this layout.
    fn slot(priority: u8) -> PrioritySlot;

    /// Marks the level of `slot` as non-empty.
    fn set(&mut self, slot: PrioritySlot);

    /// Marks the level of `slot` as empty.
    fn clear(&mut self, slot: PrioritySlot);

    /// Highest ready priority, i.e. the lowest set level.
    fn highest(&self) -> Option<u8>;

    /// Returns `true` if no level is set.
    fn is_empty(&self) -> bool;

    /// Returns `true` if `priority` is set.
    fn contains(&self, priority: u8) -> bool;
}

/// Single-word bitmap for up to 32 priority levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordBitmap {
    group: u32,
}

impl WordBitmap {
    /// Creates an empty bitmap.
    pub const fn new() -> Self {
        Self { group: 0 }
    }
}

impl PriorityBitmap for WordBitmap {
    const LEVELS: usize = 32;

    #[inline]
    fn slot(priority: u8) -> PrioritySlot {
        debug_assert!((priority as usize) < Self::LEVELS);
        PrioritySlot {
            number: 0,
            number_mask: 1 << priority,
            high_mask: 0,
        }
    }

    #[inline]
    fn set(&mut self, slot: PrioritySlot) {
        self.group |= slot.number_mask;
    }

    #[inline]
    fn clear(&mut self, slot: PrioritySlot) {
        self.group &= !slot.number_mask;
    }

    #[inline]
    fn highest(&self) -> Option<u8> {
        self.group.lowest_set().map(|bit| bit as u8)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.group == 0
    }

    #[inline]
    fn contains(&self, priority: u8) -> bool {
        self.group & Self::slot(priority).number_mask != 0
    }
}

/// Two-level bitmap for up to 256 priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupBitmap {
    group: u32,
    table: [u8; 32],
}

impl GroupBitmap {
    /// Creates an empty bitmap.
    pub const fn new() -> Self {
        Self {
            group: 0,
            table: [0; 32],
        }
    }
}

impl Default for GroupBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityBitmap for GroupBitmap {
    const LEVELS: usize = 256;

    #[inline]
    fn slot(priority: u8) -> PrioritySlot {
        let number = priority >> 3;
        PrioritySlot {
            number,
            number_mask: 1 << number,
            high_mask: 1 << (priority & 0x07),
        }
    }

    #[inline]
    fn set(&mut self, slot: PrioritySlot) {
        self.table[slot.number as usize] |= slot.high_mask;
        self.group |= slot.number_mask;
    }

    #[inline]
    fn clear(&mut self, slot: PrioritySlot) {
        let byte = &mut self.table[slot.number as usize];
        *byte &= !slot.high_mask;
        if *byte == 0 {
            self.group &= !slot.number_mask;
        }
    }

    #[inline]
    fn highest(&self) -> Option<u8> {
        let number = self.group.lowest_set()?;
        let bit = self.table[number as usize].lowest_set()?;
        Some(((number << 3) + bit) as u8)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.group == 0
    }

    #[inline]
    fn contains(&self, priority: u8) -> bool {
        let slot = Self::slot(priority);
        self.table[slot.number as usize] & slot.high_mask != 0
    }
}
