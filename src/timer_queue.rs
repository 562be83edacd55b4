// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::event::TimerCategory;
use crate::handler::TimerHandler;

//==============================================================================
// Constants & Structures
//==============================================================================

/// Opaque handle returned by [crate::reactor::Reactor::schedule], the typed-rewrite
/// stand-in for the original's callback-pointer identity (Design Notes §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A pending deadline: absolute wall-clock seconds, callback, and category (§3).
pub struct Timer {
    handle: TimerHandle,
    deadline: f64,
    category: TimerCategory,
    callback: Option<TimerHandler>,
}

/// Time-ordered queue of pending timers; head is the nearest future deadline.
/// Realized as a sorted `Vec`, per §4.2's explicit allowance for O(n) insertion
/// at this scale (Design Notes §9 treats the backing "list" as an out-of-scope
/// collaborator, so there is no bespoke priority-queue structure here).
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_handle: u64,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [Timer].
impl Timer {
    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn category(&self) -> TimerCategory {
        self.category
    }

    pub fn take_callback(&mut self) -> Option<TimerHandler> {
        self.callback.take()
    }
}

/// Associate functions for [TimerQueue].
impl TimerQueue {
    /// Creates an empty timer queue.
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_handle: 0,
        }
    }

    /// Inserts a timer, preserving deadline order; ties keep insertion order (stable).
    /// `callback` is `None` for the internal await-deadline category, which is
    /// matched on `category` alone and never invoked as a handler.
    pub fn insert(
        &mut self,
        deadline: f64,
        category: TimerCategory,
        callback: Option<TimerHandler>,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let pos = self
            .timers
            .iter()
            .position(|t| t.deadline > deadline)
            .unwrap_or(self.timers.len());

        self.timers.insert(
            pos,
            Timer {
                handle,
                deadline,
                category,
                callback,
            },
        );
        handle
    }

    /// Returns the earliest deadline, if any timer is pending.
    pub fn peek(&self) -> Option<f64> {
        self.timers.first().map(Timer::deadline)
    }

    /// Removes and returns the head timer.
    pub fn pop(&mut self) -> Option<Timer> {
        if self.timers.is_empty() {
            None
        } else {
            Some(self.timers.remove(0))
        }
    }

    /// Removes the first UserTimer entry matching `handle`; no-op if absent.
    pub fn remove_matching(&mut self, handle: TimerHandle) {
        if let Some(pos) = self.timers.iter().position(|t| t.handle == handle) {
            self.timers.remove(pos);
        }
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Default trait implementation for [TimerQueue].
impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_deadline() {
        let mut q = TimerQueue::new();
        q.insert(3.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        q.insert(1.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        q.insert(2.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        assert_eq!(q.peek(), Some(1.0));
        assert_eq!(q.pop().unwrap().deadline(), 1.0);
        assert_eq!(q.pop().unwrap().deadline(), 2.0);
        assert_eq!(q.pop().unwrap().deadline(), 3.0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let mut q = TimerQueue::new();
        let first = q.insert(1.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        let second = q.insert(1.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        assert_eq!(q.pop().unwrap().handle(), first);
        assert_eq!(q.pop().unwrap().handle(), second);
    }

    #[test]
    fn cancel_by_handle() {
        let mut q = TimerQueue::new();
        let handle = q.insert(1.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        q.insert(2.0, TimerCategory::UserTimer, Some(Box::new(|_| {})));
        q.remove_matching(handle);
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek(), Some(2.0));
    }
}
