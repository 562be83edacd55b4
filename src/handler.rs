// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Polymorphic handler abstraction (Design Notes §9): the original's opaque
//! callback-plus-`udata` pairs collapse into boxed `FnMut` closures that
//! capture whatever state they need by value.

use crate::fail::Fail;
use crate::file_table::Fd;
use crate::reactor::Reactor;

/// Invoked when a watched fd (role [crate::file_table::Role::FileData]) has bytes ready.
pub type DataHandler = Box<dyn FnMut(&mut Reactor, Fd, &[u8])>;

/// Invoked when a user timer's deadline elapses.
pub type TimerHandler = Box<dyn FnMut(&mut Reactor)>;

/// Invoked after a reactor-owned listener accepts a new connection.
pub type ConnectHandler = Box<dyn FnMut(&mut Reactor, Fd)>;

/// Invoked when a reactor-owned fd disconnects (origin label per §3/§7).
pub type DisconnectHandler = Box<dyn FnMut(&mut Reactor, Fd, &'static str)>;

/// Invoked when a reactor-owned fd reports an I/O error.
pub type ErrorHandler = Box<dyn FnMut(&mut Reactor, Fd, &'static str, Fail)>;

/// Invoked for data arriving on a socket opened via the reactor's own
/// `listen_*`/`connect_*` (the CX "raw socket hook" named in §4.3).
pub type SocketHandler = Box<dyn FnMut(&mut Reactor, Fd, &[u8])>;

/// Invoked for a decoded typed message (MX subscriber, §4.5).
pub type MessageHandler = Box<dyn FnMut(&mut Reactor, Fd, u32, u32, &[u8])>;
