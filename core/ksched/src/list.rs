// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Intrusive doubly linked thread list.
//!
//! The links live inside [`Thread`], so linking and unlinking never
//! allocate. A thread carries one link, hence it is on at most one list.
//!
//! None of this is synchronized; every list belongs to a scheduler scope and
//! is only touched with local IRQs masked and the kernel lock held.

use core::ptr::NonNull;

use crate::thread::Thread;

/// Link fields embedded in every [`Thread`].
#[derive(Debug)]
pub(crate) struct ListLink {
    prev: Option<NonNull<Thread>>,
    next: Option<NonNull<Thread>>,
    linked: bool,
}

impl ListLink {
    pub(crate) const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            linked: false,
        }
    }
}

#[inline(always)]
fn link_of(thread: NonNull<Thread>) -> *mut ListLink {
    unsafe { thread.as_ref().link.get() }
}

/// FIFO list of `'static` threads.
pub(crate) struct ThreadList {
    head: Option<NonNull<Thread>>,
    tail: Option<NonNull<Thread>>,
    len: usize,
}

// Lists hold `'static` threads and are only touched under the kernel lock.
unsafe impl Send for ThreadList {}

impl ThreadList {
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn front(&self) -> Option<&'static Thread> {
        self.head.map(|t| unsafe { t.as_ref() })
    }

    /// Appends `thread`; it must not be on any list.
    pub(crate) fn push_back(&mut self, thread: &'static Thread) {
        let node = NonNull::from(thread);
        let link = unsafe { &mut *link_of(node) };
        debug_assert!(!link.linked, "thread {} is already linked", thread.name());

        link.prev = self.tail;
        link.next = None;
        link.linked = true;
        match self.tail {
            Some(tail) => unsafe { (*link_of(tail)).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
    }

    /// Unlinks `thread`, which must be on this list.
    ///
    /// Returns `false` without touching anything if the thread is not linked
    /// at all.
    pub(crate) fn remove(&mut self, thread: &Thread) -> bool {
        let node = NonNull::from(thread);
        let link = unsafe { &mut *link_of(node) };
        if !link.linked {
            return false;
        }

        match link.prev {
            Some(prev) => unsafe { (*link_of(prev)).next = link.next },
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => unsafe { (*link_of(next)).prev = link.prev },
            None => self.tail = link.prev,
        }
        *link = ListLink::new();
        self.len -= 1;
        true
    }

    pub(crate) fn pop_front(&mut self) -> Option<&'static Thread> {
        let front = self.front()?;
        self.remove(front);
        Some(front)
    }

    /// Forgets every member, leaving their links in the unlinked state.
    pub(crate) fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            _list: self,
        }
    }
}

/// Returns `true` if `thread` is on some list.
pub(crate) fn is_linked(thread: &Thread) -> bool {
    unsafe { (*thread.link.get()).linked }
}

pub(crate) struct Iter<'a> {
    next: Option<NonNull<Thread>>,
    _list: &'a ThreadList,
}

impl Iterator for Iter<'_> {
    type Item = &'static Thread;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = unsafe { (*link_of(node)).next };
        Some(unsafe { node.as_ref() })
    }
}
