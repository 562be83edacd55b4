// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::handler::MessageHandler;
use std::collections::HashMap;

//==============================================================================
// Structures
//==============================================================================

/// Mapping from message type to handler, at most one subscriber per type (§4.5).
#[derive(Default)]
pub struct SubscriberTable {
    subscribers: HashMap<u32, MessageHandler>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [SubscriberTable].
impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the subscriber for `kind`.
    pub fn subscribe(&mut self, kind: u32, handler: MessageHandler) {
        self.subscribers.insert(kind, handler);
    }

    /// Removes the subscriber for `kind`; no-op if absent.
    pub fn drop(&mut self, kind: u32) {
        self.subscribers.remove(&kind);
    }

    /// Removes and returns the subscriber for `kind`, if any. Paired with
    /// [SubscriberTable::subscribe] to invoke a handler that itself needs
    /// `&mut` access to whatever owns this table (see [crate::dispatch]).
    pub fn take(&mut self, kind: u32) -> Option<MessageHandler> {
        self.subscribers.remove(&kind)
    }

    pub fn contains(&self, kind: u32) -> bool {
        self.subscribers.contains_key(&kind)
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn replace_keeps_a_single_subscriber_per_type() {
        let calls = Rc::new(RefCell::new(0));
        let mut table = SubscriberTable::new();

        let c1 = calls.clone();
        table.subscribe(1, Box::new(move |_, _, _, _, _| *c1.borrow_mut() += 1));

        let c2 = calls.clone();
        table.subscribe(1, Box::new(move |_, _, _, _, _| *c2.borrow_mut() += 10));

        assert!(table.contains(1));
        assert!(!table.contains(2));
    }

    #[test]
    fn drop_is_a_no_op_when_absent() {
        let mut table = SubscriberTable::new();
        table.drop(99);
        assert!(!table.contains(99));
    }
}
