// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! MX event dispatch and the synchronous `await` primitive (§4.6-§4.7). Both
//! operate on the same [Reactor] the CX main loop drives; see that module's
//! header comment for why there is no separate wrapper type.

use crate::event::{Event, TimerCategory};
use crate::fail::Fail;
use crate::file_table::{Fd, Role};
use crate::reactor::Reactor;
use bytes::Bytes;
use log::debug;

//==============================================================================
// Associate Functions
//==============================================================================

/// Dispatch-related associate functions for [Reactor].
impl Reactor {
    /// Routes one event to its handler, per §4.6 step 3's per-tag dispatch.
    pub(crate) fn dispatch_one(&mut self, event: Event) {
        match event {
            Event::DataReady(fd) => self.dispatch_data_ready(fd),
            Event::Accepted(fd) => self.dispatch_accepted(fd),
            Event::Message { fd, kind, version, payload } => {
                self.dispatch_message(fd, kind, version, payload)
            }
            Event::TimerFired { category, callback, .. } => {
                self.dispatch_timer_fired(category, callback)
            }
            Event::Disconnect { fd, origin } => self.dispatch_disconnect(fd, origin),
            Event::Error { fd, origin, fail } => self.dispatch_error(fd, origin, fail),
        }
    }

    fn dispatch_data_ready(&mut self, fd: Fd) {
        let bytes = match self.fd_table.get_mut(fd) {
            Some(conn) => {
                let bytes = conn.ingress().to_vec();
                conn.ingress_mut().clear();
                bytes
            }
            None => return,
        };

        match self.fd_table.get_mut(fd).and_then(|c| c.take_on_data()) {
            Some(mut handler) => {
                handler(self, fd, &bytes);
                if let Some(conn) = self.fd_table.get_mut(fd) {
                    conn.set_on_data(handler);
                }
            }
            None => {
                let owned = self.fd_table.get(fd).map(|c| c.owned()).unwrap_or(false);
                if owned {
                    if let Some(mut hook) = self.on_socket.take() {
                        hook(self, fd, &bytes);
                        self.on_socket = Some(hook);
                    }
                }
            }
        }
    }

    fn dispatch_accepted(&mut self, fd: Fd) {
        if let Some(mut hook) = self.on_connect.take() {
            hook(self, fd);
            self.on_connect = Some(hook);
        }
    }

    fn dispatch_message(&mut self, fd: Fd, kind: u32, version: u32, payload: Bytes) {
        match self.subscribers.take(kind) {
            Some(mut handler) => {
                handler(self, fd, kind, version, &payload);
                self.subscribers.subscribe(kind, handler);
            }
            None => debug!("no subscriber for message type {}, dropping payload", kind),
        }
    }

    fn dispatch_timer_fired(
        &mut self,
        category: TimerCategory,
        callback: Option<crate::handler::TimerHandler>,
    ) {
        if category == TimerCategory::UserTimer {
            if let Some(mut callback) = callback {
                callback(self);
            }
        }
        // An AwaitDeadline TimerFired reaching here means the matching
        // await() already returned through a different path (the message
        // arrived first, cancelling this timer) before this stale event was
        // drained; nothing to do.
    }

    fn dispatch_disconnect(&mut self, fd: Fd, origin: &'static str) {
        if let Some(mut hook) = self.on_disconnect.take() {
            hook(self, fd, origin);
            self.on_disconnect = Some(hook);
        }
    }

    fn dispatch_error(&mut self, fd: Fd, origin: &'static str, fail: Fail) {
        if let Some(mut hook) = self.on_error.take() {
            hook(self, fd, origin, fail);
            self.on_error = Some(hook);
        }
    }

    // -- Await primitive (§4.7) -------------------------------------------

    /// Blocks the caller synchronously until a `kind` message arrives on
    /// `fd`, or `deadline` (absolute wall-clock seconds) elapses, servicing
    /// every other event normally in the meantime. Unlike [Reactor::run],
    /// this is not re-entrancy-guarded: it is meant to be called from inside
    /// a handler while `run()` is already on the stack, re-entering the same
    /// collect/dispatch loop rather than recursing into `run()` itself.
    ///
    /// Per §4.7 step 2a, only events collected by *this* call's own
    /// `collect()` invocations are candidates for the match: whatever was
    /// already sitting in `pending` when `await_message` was entered (e.g.
    /// a sibling message decoded in the same batch as the one currently
    /// being dispatched) is set aside untouched and restored ahead of
    /// everything else once `await_message` returns, so it is still
    /// delivered via ordinary dispatch in its original order.
    pub fn await_message(&mut self, fd: Fd, kind: u32, deadline: f64) -> Result<(u32, Bytes), Fail> {
        let role = self.fd_table.get(fd).map(|c| c.role());
        if role != Some(Role::MessageStream) {
            return Err(Fail::InvalidFd { fd });
        }

        let handle = self.timers.insert(deadline, TimerCategory::AwaitDeadline, None);
        let mut preexisting = std::mem::take(&mut self.pending);

        let outcome = loop {
            let mut matched = None;
            while let Some(event) = self.pending.pop_front() {
                match event {
                    Event::Message { fd: mfd, kind: mkind, version, payload }
                        if mfd == fd && mkind == kind =>
                    {
                        matched = Some(Ok((version, payload)));
                        break;
                    }
                    Event::TimerFired {
                        category: TimerCategory::AwaitDeadline,
                        deadline: fired_deadline,
                        ..
                    } if fired_deadline == deadline => {
                        matched = Some(Err(Fail::AwaitTimedOut));
                        break;
                    }
                    other => self.waiting.push_back(other),
                }
            }

            if let Some(result) = matched {
                break result;
            }

            match self.collect() {
                Ok(true) => {}
                Ok(false) => break Err(Fail::AwaitTimedOut),
                Err(fail) => break Err(fail),
            }
        };

        self.timers.remove_matching(handle);
        while let Some(event) = self.waiting.pop_back() {
            self.pending.push_front(event);
        }
        while let Some(event) = preexisting.pop_back() {
            self.pending.push_front(event);
        }
        outcome
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
