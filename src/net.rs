// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Thin BSD-socket wrappers (§6 `net_primitives` collaborator). No framing,
//! no retry policy, no backoff: every call here maps to a single syscall, in
//! the idiom already used by the teacher's `protocols/posix/{peer,futures}.rs`.

use crate::fail::Fail;
use crate::file_table::Fd;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::socket::{
    self, AddressFamily, InetAddr, IpAddr, SockAddr, SockFlag, SockProtocol, SockType,
};
use nix::unistd;
use std::net::Ipv4Addr;

//==============================================================================
// Associate Functions
//==============================================================================

fn io_fail(origin: &'static str, err: nix::Error) -> Fail {
    match err {
        nix::Error::Sys(Errno::EMFILE) => Fail::TooManyOpenedFiles {
            details: "process fd limit reached",
        },
        nix::Error::Sys(Errno::ENFILE) => Fail::TooManyOpenedFiles {
            details: "system-wide fd limit reached",
        },
        other => {
            let code = other.as_errno().map(|e| e as i32).unwrap_or(-1);
            Fail::IoError { origin, code }
        }
    }
}

fn bind_fail(err: nix::Error) -> Fail {
    match err {
        nix::Error::Sys(Errno::EADDRINUSE) => Fail::AddressInUse,
        other => io_fail("bind", other),
    }
}

fn resolve(host: Option<&str>) -> Result<Ipv4Addr, Fail> {
    match host {
        None => Ok(Ipv4Addr::UNSPECIFIED),
        Some(h) => h.parse::<Ipv4Addr>().map_err(|_| Fail::Malformed {
            details: "host must be a dotted-quad IPv4 address or null",
        }),
    }
}

fn sockaddr(host: Option<&str>, port: u16) -> Result<SockAddr, Fail> {
    let addr = resolve(host)?;
    let inet = InetAddr::new(IpAddr::new_v4(addr.octets()[0], addr.octets()[1], addr.octets()[2], addr.octets()[3]), port);
    Ok(SockAddr::new_inet(inet))
}

/// Opens a non-blocking TCP listening socket bound to `(host, port)`.
///
/// `port = 0` asks the OS for an ephemeral port; the bound port can be read
/// back with [local_port]. `host = None` binds all interfaces.
pub fn tcp_listen(host: Option<&str>, port: u16, backlog: usize) -> Result<Fd, Fail> {
    let fd = socket::socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK,
        SockProtocol::Tcp,
    )
    .map_err(|e| io_fail("socket", e))?;

    socket::setsockopt(fd, socket::sockopt::ReuseAddr, &true).map_err(|e| io_fail("setsockopt", e))?;

    let addr = sockaddr(host, port)?;
    socket::bind(fd, &addr).map_err(|e| {
        let _ = unistd::close(fd);
        bind_fail(e)
    })?;
    socket::listen(fd, backlog).map_err(|e| {
        let _ = unistd::close(fd);
        io_fail("listen", e)
    })?;
    Ok(fd)
}

/// Opens a non-blocking UDP socket bound to `(host, port)`.
pub fn udp_bind(host: Option<&str>, port: u16) -> Result<Fd, Fail> {
    let fd = socket::socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_NONBLOCK,
        SockProtocol::Udp,
    )
    .map_err(|e| io_fail("socket", e))?;

    let addr = sockaddr(host, port)?;
    socket::bind(fd, &addr).map_err(|e| {
        let _ = unistd::close(fd);
        bind_fail(e)
    })?;
    Ok(fd)
}

/// Opens a non-blocking TCP socket and begins connecting to `(host, port)`.
/// The connection completes asynchronously; the reactor observes it becoming
/// writable.
pub fn tcp_connect(host: &str, port: u16) -> Result<Fd, Fail> {
    let fd = socket::socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK,
        SockProtocol::Tcp,
    )
    .map_err(|e| io_fail("socket", e))?;

    let addr = sockaddr(Some(host), port)?;
    match socket::connect(fd, &addr) {
        Ok(()) => Ok(fd),
        Err(nix::Error::Sys(Errno::EINPROGRESS)) => Ok(fd),
        Err(e) => {
            let _ = unistd::close(fd);
            Err(io_fail("connect", e))
        }
    }
}

/// Opens a non-blocking UDP socket "connected" to `(host, port)` so that
/// `send`/`recv` (rather than `sendto`/`recvfrom`) may be used.
pub fn udp_connect(host: &str, port: u16) -> Result<Fd, Fail> {
    let fd = socket::socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_NONBLOCK,
        SockProtocol::Udp,
    )
    .map_err(|e| io_fail("socket", e))?;

    let addr = sockaddr(Some(host), port)?;
    socket::connect(fd, &addr).map_err(|e| {
        let _ = unistd::close(fd);
        io_fail("connect", e)
    })?;
    Ok(fd)
}

/// Accepts a pending connection on a listening fd, setting it non-blocking.
pub fn accept(fd: Fd) -> Result<Fd, Fail> {
    let newfd = socket::accept(fd).map_err(|e| io_fail("accept", e))?;
    let flags = fcntl(newfd, FcntlArg::F_GETFL).map_err(|e| io_fail("accept", e))?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(newfd, FcntlArg::F_SETFL(flags)).map_err(|e| io_fail("accept", e))?;
    Ok(newfd)
}

/// The port this fd is bound to (useful after binding with `port = 0`).
pub fn local_port(fd: Fd) -> Result<u16, Fail> {
    match socket::getsockname(fd).map_err(|e| io_fail("getsockname", e))? {
        SockAddr::Inet(inet) => Ok(inet.to_std().port()),
        _ => Err(Fail::Malformed {
            details: "fd is not an inet socket",
        }),
    }
}

/// Non-blocking read. Returns `Ok(0)` on peer-closed, `Ok(n)` on `n` bytes read,
/// `Err(None)` on "would block" (no data ready, not an error), `Err(Some(fail))`
/// on a genuine I/O error.
pub fn read(fd: Fd, buf: &mut [u8]) -> Result<usize, Option<Fail>> {
    match unistd::read(fd, buf) {
        Ok(n) => Ok(n),
        Err(nix::Error::Sys(Errno::EWOULDBLOCK)) | Err(nix::Error::Sys(Errno::EINTR)) => {
            Err(None)
        }
        Err(e) => Err(Some(io_fail("read", e))),
    }
}

/// Non-blocking write. Same `Err(None)` = would-block convention as [read].
pub fn write(fd: Fd, buf: &[u8]) -> Result<usize, Option<Fail>> {
    match unistd::write(fd, buf) {
        Ok(n) => Ok(n),
        Err(nix::Error::Sys(Errno::EWOULDBLOCK)) | Err(nix::Error::Sys(Errno::EINTR)) => {
            Err(None)
        }
        Err(e) => Err(Some(io_fail("write", e))),
    }
}

/// Closes a reactor-owned fd. Never called on fds the caller registered itself.
pub fn close(fd: Fd) {
    let _ = unistd::close(fd);
}
