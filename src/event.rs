// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::fail::Fail;
use crate::file_table::Fd;
use crate::handler::TimerHandler;
use bytes::Bytes;
use std::fmt;

//==============================================================================
// Structures
//==============================================================================

/// Category of a fired timer, per §3. Distinguishes a caller-scheduled
/// [crate::timer_queue::TimerQueue] entry from the internal await deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCategory {
    UserTimer,
    AwaitDeadline,
}

/// A tagged internal event (§3 "Event (internal)"). Owned: a `Message` event
/// owns its payload outright, transferring it to whichever handler consumes it.
///
/// `TimerFired` carries the fired timer's callback directly (taken out of the
/// [crate::timer_queue::TimerQueue] at pop time) rather than a handle the
/// dispatch step would have to look back up; an `AwaitDeadline` timer carries
/// no callback; the await primitive matches on `category` alone.
pub enum Event {
    DataReady(Fd),
    Accepted(Fd),
    Message {
        fd: Fd,
        kind: u32,
        version: u32,
        payload: Bytes,
    },
    TimerFired {
        deadline: f64,
        category: TimerCategory,
        callback: Option<TimerHandler>,
    },
    Disconnect {
        fd: Fd,
        origin: &'static str,
    },
    Error {
        fd: Fd,
        origin: &'static str,
        fail: Fail,
    },
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Hand-written: `TimerFired` carries a boxed closure, which has no `Debug`.
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::DataReady(fd) => f.debug_tuple("DataReady").field(fd).finish(),
            Event::Accepted(fd) => f.debug_tuple("Accepted").field(fd).finish(),
            Event::Message { fd, kind, version, payload } => f
                .debug_struct("Message")
                .field("fd", fd)
                .field("kind", kind)
                .field("version", version)
                .field("len", &payload.len())
                .finish(),
            Event::TimerFired { deadline, category, .. } => f
                .debug_struct("TimerFired")
                .field("deadline", deadline)
                .field("category", category)
                .finish(),
            Event::Disconnect { fd, origin } => f
                .debug_struct("Disconnect")
                .field("fd", fd)
                .field("origin", origin)
                .finish(),
            Event::Error { fd, origin, fail } => f
                .debug_struct("Error")
                .field("fd", fd)
                .field("origin", origin)
                .field("fail", fail)
                .finish(),
        }
    }
}
