// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The CX reactor: readiness multiplexing, timers, and raw fd I/O (§4.1-§4.3).
//! `Reactor` also hosts the MX layer (subscriber table, event queues, await)
//! defined in [crate::dispatch] -- per §3's ownership summary these are not a
//! separate wrapper object, just a second set of operations over the same
//! struct, the way the original's `Engine`/`LibOS` split collapses here.

use crate::clock::{Clock, SystemClock};
use crate::config::ReactorConfig;
use crate::event::{Event, TimerCategory};
use crate::fail::Fail;
use crate::file_table::{Fd, FdTable, Role};
use crate::framer;
use crate::handler::{
    ConnectHandler, DataHandler, DisconnectHandler, ErrorHandler, SocketHandler, TimerHandler,
};
use crate::net;
use crate::subscriber_table::SubscriberTable;
use crate::timer_queue::{TimerHandle, TimerQueue};
use log::{debug, error, trace, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use std::collections::VecDeque;

/// Default backlog passed to `listen()` for reactor-opened TCP listeners.
const LISTEN_BACKLOG: usize = 128;

//==============================================================================
// Structures
//==============================================================================

/// Single-threaded reactor: owns every fd, timer, subscriber, and queued event
/// (§3). Not `Send`/`Sync` -- built from `Rc`/`RefCell`-friendly interior
/// state and meant to live on the thread that calls [Reactor::run].
pub struct Reactor {
    pub(crate) fd_table: FdTable,
    pub(crate) timers: TimerQueue,
    pub(crate) subscribers: SubscriberTable,
    pub(crate) pending: VecDeque<Event>,
    pub(crate) waiting: VecDeque<Event>,
    config: ReactorConfig,
    clock: Box<dyn Clock>,
    message_mode: bool,
    running: bool,
    shutting_down: bool,

    pub(crate) on_connect: Option<ConnectHandler>,
    pub(crate) on_disconnect: Option<DisconnectHandler>,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) on_socket: Option<SocketHandler>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [Reactor].
impl Reactor {
    /// Creates a reactor with the default (`SystemClock`-backed) clock.
    pub fn new(config: ReactorConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Creates a reactor with an explicit [Clock], for deterministic tests.
    pub fn with_clock(config: ReactorConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            fd_table: FdTable::new(
                config.initial_fd_table_capacity(),
                config.initial_buffer_capacity(),
            ),
            timers: TimerQueue::new(),
            subscribers: SubscriberTable::new(),
            pending: VecDeque::new(),
            waiting: VecDeque::new(),
            config,
            clock,
            message_mode: false,
            running: false,
            shutting_down: false,
            on_connect: None,
            on_disconnect: None,
            on_error: None,
            on_socket: None,
        }
    }

    /// Switches accepted/connected stream and datagram sockets from raw CX
    /// delivery (the global socket hook) to MX framing and subscriber
    /// dispatch. Mirrors the original engine's own whole-instance mode
    /// switch; there is no per-listener mix of the two.
    pub fn use_message_exchange(&mut self) {
        self.message_mode = true;
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    fn now(&self) -> f64 {
        self.clock.now_seconds()
    }

    // -- Hooks ---------------------------------------------------------

    pub fn set_on_connect(&mut self, handler: ConnectHandler) {
        self.on_connect = Some(handler);
    }

    pub fn set_on_disconnect(&mut self, handler: DisconnectHandler) {
        self.on_disconnect = Some(handler);
    }

    pub fn set_on_error(&mut self, handler: ErrorHandler) {
        self.on_error = Some(handler);
    }

    pub fn set_on_socket(&mut self, handler: SocketHandler) {
        self.on_socket = Some(handler);
    }

    // -- fd registration -------------------------------------------------

    /// Registers (or replaces the handler for) an arbitrary caller-owned fd,
    /// implicitly adding it as role `FileData` if absent (§4.3). The reactor
    /// never closes this fd itself.
    pub fn watch_fd(&mut self, fd: Fd, on_data: DataHandler) {
        self.fd_table.ensure(fd, Role::FileData, false);
        if let Some(conn) = self.fd_table.get_mut(fd) {
            conn.set_on_data(on_data);
        }
    }

    /// Unregisters `fd`. For a reactor-owned fd this also closes the
    /// underlying descriptor; for a caller-owned fd (added via [watch_fd])
    /// only the table entry is dropped.
    pub fn drop_fd(&mut self, fd: Fd) {
        let owned = self.fd_table.get(fd).map(|c| c.owned()).unwrap_or(false);
        self.fd_table.drop(fd);
        if owned {
            net::close(fd);
        }
    }

    // -- Timers ------------------------------------------------------------

    /// Schedules `on_time` to run once the clock passes `deadline` (absolute
    /// wall-clock seconds).
    pub fn schedule(&mut self, deadline: f64, on_time: TimerHandler) -> TimerHandle {
        self.timers
            .insert(deadline, TimerCategory::UserTimer, Some(on_time))
    }

    /// Cancels a pending timer; no-op if it already fired or was never valid.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove_matching(handle);
    }

    // -- Listening / connecting ----------------------------------------

    pub fn listen_stream(&mut self, host: Option<&str>, port: u16) -> Result<Fd, Fail> {
        let fd = net::tcp_listen(host, port, LISTEN_BACKLOG)?;
        self.fd_table.ensure(fd, Role::ListenStream, true);
        debug!("listening for stream connections on fd {}", fd);
        Ok(fd)
    }

    pub fn listen_datagram(&mut self, host: Option<&str>, port: u16) -> Result<Fd, Fail> {
        let fd = net::udp_bind(host, port)?;
        self.fd_table.ensure(fd, Role::Datagram, true);
        debug!("listening for datagrams on fd {}", fd);
        Ok(fd)
    }

    pub fn connect_stream(&mut self, host: &str, port: u16) -> Result<Fd, Fail> {
        let fd = net::tcp_connect(host, port)?;
        let role = self.accepted_role();
        self.fd_table.ensure(fd, role, true);
        trace!("connecting stream fd {} to {}:{}", fd, host, port);
        Ok(fd)
    }

    pub fn connect_datagram(&mut self, host: &str, port: u16) -> Result<Fd, Fail> {
        let fd = net::udp_connect(host, port)?;
        self.fd_table.ensure(fd, Role::Datagram, true);
        trace!("connecting datagram fd {} to {}:{}", fd, host, port);
        Ok(fd)
    }

    fn accepted_role(&self) -> Role {
        if self.message_mode {
            Role::MessageStream
        } else {
            Role::FileData
        }
    }

    /// Queues `bytes` for egress on `fd`. Never performs I/O synchronously;
    /// the next writable readiness drains it (§4.3 step 7).
    pub fn send(&mut self, fd: Fd, bytes: &[u8]) -> Result<(), Fail> {
        match self.fd_table.get_mut(fd) {
            Some(conn) => {
                conn.egress_mut().extend_from_slice(bytes);
                Ok(())
            }
            None => Err(Fail::InvalidFd { fd }),
        }
    }

    // -- Subscriber table (MX, §4.5) --------------------------------------

    pub fn subscribe(&mut self, kind: u32, handler: crate::handler::MessageHandler) {
        self.subscribers.subscribe(kind, handler);
    }

    pub fn drop_subscriber(&mut self, kind: u32) {
        self.subscribers.drop(kind);
    }

    // -- Shutdown ------------------------------------------------------

    /// Requests that [Reactor::run] return on its next loop iteration. Closes
    /// every reactor-owned fd and drops all pending timers immediately;
    /// caller-owned fds registered via [watch_fd] are left untouched.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        let owned_fds: Vec<Fd> = self
            .fd_table
            .iter()
            .filter(|(_, c)| c.owned())
            .map(|(fd, _)| fd)
            .collect();
        for fd in owned_fds {
            self.fd_table.drop(fd);
            net::close(fd);
        }
        self.timers = TimerQueue::new();
        self.pending.clear();
        self.waiting.clear();
    }

    // -- Main loop (§4.3 + §4.6, a single loop described at two altitudes) --

    /// Runs the reactor until [shutdown] is called or there is nothing left
    /// to wait on. Returns `0` on clean exit, `-1` on an unrecoverable
    /// readiness failure. Nested calls are refused: a handler that calls
    /// `run()` again gets `-1` back instead of corrupting loop state.
    pub fn run(&mut self) -> i32 {
        if self.running {
            error!("run() called re-entrantly");
            return -1;
        }
        self.running = true;
        self.shutting_down = false;

        let result = self.run_loop();

        self.running = false;
        result
    }

    fn run_loop(&mut self) -> i32 {
        loop {
            if self.shutting_down {
                return 0;
            }

            while let Some(event) = self.waiting.pop_front() {
                self.pending.push_back(event);
            }

            if self.pending.is_empty() {
                match self.collect() {
                    Ok(true) => {}
                    Ok(false) => return 0,
                    Err(_) => return -1,
                }
                if self.pending.is_empty() {
                    continue;
                }
            }

            while let Some(event) = self.pending.pop_front() {
                self.dispatch_one(event);
                if self.shutting_down {
                    break;
                }
            }
        }
    }

    /// Blocks on a single readiness call, pushing whatever happened onto
    /// `pending`. Returns `Ok(true)` if the caller should keep looping,
    /// `Ok(false)` if there is nothing left to wait on (clean exit),
    /// `Err` on an unrecoverable readiness failure.
    pub(crate) fn collect(&mut self) -> Result<bool, Fail> {
        if self.fd_table.size() == 0 && self.timers.is_empty() {
            return Ok(false);
        }

        let fds = self.fd_table.all_fds();
        let writable: std::collections::HashSet<Fd> =
            self.fd_table.writable_fds().into_iter().collect();

        let mut pollfds: Vec<PollFd> = fds
            .iter()
            .map(|&fd| {
                let mut flags = PollFlags::POLLIN;
                if writable.contains(&fd) {
                    flags |= PollFlags::POLLOUT;
                }
                PollFd::new(fd, flags)
            })
            .collect();

        let timeout_ms = self.poll_timeout_ms();

        let ready = loop {
            match poll(&mut pollfds, timeout_ms) {
                Ok(n) => break n,
                Err(nix::Error::Sys(Errno::EINTR)) => continue,
                Err(e) => {
                    let code = e.as_errno().map(|e| e as i32).unwrap_or(-1);
                    return Err(Fail::ReadinessFailed { code });
                }
            }
        };

        if ready == 0 {
            self.fire_due_timer();
            return Ok(true);
        }

        for pollfd in &pollfds {
            let fd = pollfd.fd();
            let revents = match pollfd.revents() {
                Some(r) => r,
                None => continue,
            };
            if revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR) {
                self.service_readable(fd);
            }
            if self.fd_table.contains(fd)
                && revents.intersects(PollFlags::POLLOUT)
            {
                self.service_writable(fd);
            }
        }

        Ok(true)
    }

    /// Milliseconds until the nearest timer deadline, capped by
    /// `poll_timeout_cap` so `shutdown()` called from another iteration's
    /// handler is noticed promptly even with no timer pending. `-1` (block
    /// indefinitely) only when there is truly nothing to wake up for.
    fn poll_timeout_ms(&self) -> libc::c_int {
        let cap_ms = self.config.poll_timeout_cap().as_millis() as i64;
        let wait_ms = match self.timers.peek() {
            Some(deadline) => {
                let remaining = deadline - self.now();
                if remaining <= 0.0 {
                    0
                } else {
                    (remaining * 1000.0).ceil() as i64
                }
            }
            None => cap_ms,
        };
        wait_ms.min(cap_ms).max(0) as libc::c_int
    }

    fn fire_due_timer(&mut self) {
        let now = self.now();
        if let Some(deadline) = self.timers.peek() {
            if deadline <= now {
                if let Some(mut timer) = self.timers.pop() {
                    let callback = timer.take_callback();
                    self.pending.push_back(Event::TimerFired {
                        deadline: timer.deadline(),
                        category: timer.category(),
                        callback,
                    });
                }
            }
        }
    }

    fn service_readable(&mut self, fd: Fd) {
        let role = match self.fd_table.get(fd).map(|c| c.role()) {
            Some(r) => r,
            None => return,
        };

        match role {
            Role::ListenStream => self.accept_all(fd),
            Role::Datagram => self.read_datagram(fd),
            Role::MessageStream => self.read_stream(fd, true),
            Role::FileData => self.read_stream(fd, false),
        }
    }

    fn accept_all(&mut self, listener: Fd) {
        loop {
            match net::accept(listener) {
                Ok(new_fd) => {
                    let role = self.accepted_role();
                    self.fd_table.ensure(new_fd, role, true);
                    trace!("accepted fd {} on listener {}", new_fd, listener);
                    self.pending.push_back(Event::Accepted(new_fd));
                }
                Err(Fail::IoError { code, .. }) if code == Errno::EWOULDBLOCK as i32 => break,
                Err(fail) => {
                    warn!("accept on fd {} failed: {}", listener, fail);
                    break;
                }
            }
        }
    }

    fn read_stream(&mut self, fd: Fd, framed: bool) {
        let mut scratch = vec![0u8; self.config.initial_buffer_capacity()];
        match net::read(fd, &mut scratch) {
            Ok(0) => self.close_with_event(fd, "read", None),
            Ok(n) => {
                if let Some(conn) = self.fd_table.get_mut(fd) {
                    conn.ingress_mut().extend_from_slice(&scratch[..n]);
                }
                if framed {
                    self.drain_message_stream(fd);
                } else {
                    self.pending.push_back(Event::DataReady(fd));
                }
            }
            Err(None) => {}
            Err(Some(fail)) => self.close_with_event(fd, "read", Some(fail)),
        }
    }

    fn drain_message_stream(&mut self, fd: Fd) {
        let max_frame_size = self.config.max_frame_size();
        let mut events = Vec::new();
        let result = match self.fd_table.get_mut(fd) {
            Some(conn) => framer::drain_frames(fd, conn.ingress_mut(), max_frame_size, &mut events),
            None => return,
        };
        match result {
            Ok(()) => self.pending.extend(events),
            Err(fail) => self.close_with_event(fd, "framer", Some(fail)),
        }
    }

    fn read_datagram(&mut self, fd: Fd) {
        let mut scratch = vec![0u8; self.config.initial_buffer_capacity().max(65536)];
        match net::read(fd, &mut scratch) {
            Ok(0) => {}
            Ok(n) => {
                if self.message_mode {
                    match framer::parse_datagram(&scratch[..n]) {
                        Ok((kind, version, payload)) => {
                            self.pending.push_back(Event::Message { fd, kind, version, payload });
                        }
                        Err(fail) => {
                            self.pending.push_back(Event::Error { fd, origin: "framer", fail });
                        }
                    }
                } else {
                    if let Some(conn) = self.fd_table.get_mut(fd) {
                        conn.ingress_mut().clear();
                        conn.ingress_mut().extend_from_slice(&scratch[..n]);
                    }
                    self.pending.push_back(Event::DataReady(fd));
                }
            }
            Err(None) => {}
            Err(Some(fail)) => self.close_with_event(fd, "read", Some(fail)),
        }
    }

    fn service_writable(&mut self, fd: Fd) {
        let egress_snapshot = match self.fd_table.get(fd) {
            Some(conn) => conn.egress().to_vec(),
            None => return,
        };
        if egress_snapshot.is_empty() {
            return;
        }
        match net::write(fd, &egress_snapshot) {
            Ok(0) => self.close_with_event(fd, "write", None),
            Ok(n) => {
                if let Some(conn) = self.fd_table.get_mut(fd) {
                    let _ = conn.egress_mut().split_to(n);
                }
            }
            Err(None) => {}
            Err(Some(fail)) => self.close_with_event(fd, "write", Some(fail)),
        }
    }

    fn close_with_event(&mut self, fd: Fd, origin: &'static str, fail: Option<Fail>) {
        let owned = self.fd_table.get(fd).map(|c| c.owned()).unwrap_or(false);
        self.fd_table.drop(fd);
        if owned {
            net::close(fd);
        }
        match fail {
            Some(fail) => self.pending.push_back(Event::Error { fd, origin, fail }),
            None => {
                debug!("{}", Fail::PeerClosed { origin });
                self.pending.push_back(Event::Disconnect { fd, origin });
            }
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
