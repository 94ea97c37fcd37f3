// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Ready queues: one list per priority level plus a bitmap over them.
//!
//! There is one [`ReadyQueue`] for unbound threads and one per CPU for
//! threads bound to that CPU. Every mutation keeps bitmap bit `p` set iff
//! list `p` is non-empty.

use crate::{
    bitmap::PriorityBitmap,
    config::{CPU_UNBOUND, MAX_PRIORITY, ReadyBitmap},
    list::ThreadList,
    thread::Thread,
};

/// Which ready queue a thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Unbound threads, runnable anywhere.
    Global,
    /// Threads bound to this CPU.
    Cpu(usize),
}

impl Scope {
    /// The scope `thread` is queued in, from its affinity.
    pub fn of(thread: &Thread) -> Self {
        match thread.bind_cpu() {
            CPU_UNBOUND => Self::Global,
            cpu => Self::Cpu(cpu),
        }
    }
}

/// Picks between the best global and the best local priority.
///
/// The global candidate wins ties: unbound threads can run anywhere, so
/// draining them first keeps work mobile across CPUs.
pub fn tie_break(global: Option<u8>, local: Option<u8>, cpu: usize) -> Option<(Scope, u8)> {
    match (global, local) {
        (Some(g), Some(l)) if g <= l => Some((Scope::Global, g)),
        (_, Some(l)) => Some((Scope::Cpu(cpu), l)),
        (Some(g), None) => Some((Scope::Global, g)),
        (None, None) => None,
    }
}

pub(crate) struct ReadyQueue {
    lists: [ThreadList; MAX_PRIORITY],
    bitmap: ReadyBitmap,
}

impl ReadyQueue {
    pub(crate) const fn new() -> Self {
        Self {
            lists: [const { ThreadList::new() }; MAX_PRIORITY],
            bitmap: ReadyBitmap::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        for list in self.lists.iter_mut() {
            list.clear();
        }
        self.bitmap = ReadyBitmap::new();
    }

    /// Appends `thread` at the tail of its priority level.
    pub(crate) fn push(&mut self, thread: &'static Thread) {
        let prio = thread.current_priority() as usize;
        self.lists[prio].push_back(thread);
        self.bitmap.set(thread.priority_slot());
    }

    /// Unlinks `thread` from its priority level. Returns `false` if it was
    /// not queued.
    pub(crate) fn remove(&mut self, thread: &Thread) -> bool {
        let prio = thread.current_priority() as usize;
        let list = &mut self.lists[prio];
        if !list.remove(thread) {
            return false;
        }
        if list.is_empty() {
            self.bitmap.clear(thread.priority_slot());
        }
        true
    }

    pub(crate) fn highest(&self) -> Option<u8> {
        self.bitmap.highest()
    }

    pub(crate) fn front(&self, prio: u8) -> Option<&'static Thread> {
        self.lists[prio as usize].front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.iter().map(ThreadList::len).sum()
    }

    /// Non-empty levels, highest priority first.
    pub(crate) fn levels(&self) -> impl Iterator<Item = (u8, &ThreadList)> {
        self.lists
            .iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .map(|(prio, list)| (prio as u8, list))
    }

    /// Checks bit `p` is set iff list `p` is non-empty.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.lists
            .iter()
            .enumerate()
            .all(|(prio, list)| self.bitmap.contains(prio as u8) != list.is_empty())
    }
}
