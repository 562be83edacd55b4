// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! `cxmx`: a single-threaded, non-preemptive event reactor (CX) and, built on
//! the same machinery, a length-prefixed typed message exchange (MX).
//!
//! A [Reactor] multiplexes fds and timers behind one blocking readiness call
//! per iteration. Used directly it is CX: raw reads/writes delivered through
//! [Reactor::set_on_socket] and [Reactor::watch_fd]. Call
//! [Reactor::use_message_exchange] once before opening any sockets and it
//! becomes MX: accepted/connected stream sockets are framed into whole
//! messages, routed to per-type subscribers, and can be awaited synchronously
//! with [Reactor::await_message].

pub mod clock;
pub mod codec;
pub mod config;
mod dispatch;
pub mod event;
pub mod fail;
pub mod file_table;
pub mod framer;
pub mod handler;
pub mod logging;
pub mod net;
mod reactor;
pub mod subscriber_table;
pub mod timer_queue;

pub use clock::{Clock, SystemClock};
pub use config::ReactorConfig;
pub use event::{Event, TimerCategory};
pub use fail::Fail;
pub use file_table::{Fd, Role};
pub use reactor::Reactor;
pub use timer_queue::TimerHandle;
