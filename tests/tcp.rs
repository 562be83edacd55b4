// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Stream-socket scenarios against real loopback TCP, driving a [Reactor] the
//! way an external peer would: raw CX delivery (S2) and framed MX messages
//! with a synchronous `await` (S3/S4).

use cxmx::config::ReactorConfig;
use cxmx::fail::Fail;
use cxmx::{Clock, Reactor, SystemClock};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::rc::Rc;
use std::time::Duration;

fn local_port(fd: cxmx::Fd) -> u16 {
    cxmx::net::local_port(fd).unwrap()
}

/// S2: a raw CX echo server. The client writes "Quit" and the server's
/// on_socket hook sees it verbatim, then calls shutdown().
#[test]
fn raw_socket_hook_sees_unframed_bytes() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    let listener = reactor.listen_stream(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(listener);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_hook = seen.clone();
    reactor.set_on_socket(Box::new(move |reactor, fd, data| {
        seen_hook.borrow_mut().extend_from_slice(data);
        if data == b"Quit" {
            let _ = reactor.send(fd, b"Bye");
            reactor.shutdown();
        }
    }));

    let client = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(b"Quit").unwrap();
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).ok();
    });

    let result = reactor.run();
    client.join().unwrap();

    assert_eq!(result, 0);
    assert_eq!(&seen.borrow()[..], b"Quit");
}

/// S3: a peer connects and sends one typed message; the subscriber for that
/// message type receives it.
#[test]
fn typed_message_reaches_its_subscriber() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    reactor.use_message_exchange();
    let listener = reactor.listen_stream(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(listener);

    let received = Rc::new(RefCell::new(None));
    let received_handler = received.clone();
    reactor.subscribe(
        42,
        Box::new(move |reactor, _fd, kind, version, payload| {
            *received_handler.borrow_mut() = Some((kind, version, payload.to_vec()));
            reactor.shutdown();
        }),
    );

    let client = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut frame = Vec::new();
        frame.extend_from_slice(&42u32.to_be_bytes());
        frame.extend_from_slice(&1u32.to_be_bytes());
        frame.extend_from_slice(&5u32.to_be_bytes());
        frame.extend_from_slice(b"hello");
        stream.write_all(&frame).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let result = reactor.run();
    client.join().unwrap();

    assert_eq!(result, 0);
    let (kind, version, payload) = received.borrow_mut().take().unwrap();
    assert_eq!(kind, 42);
    assert_eq!(version, 1);
    assert_eq!(payload, b"hello");
}

/// S4: awaiting a specific message type blocks the caller but still lets an
/// unrelated message on the same connection queue for later dispatch.
#[test]
fn await_message_intercepts_the_matching_type_only() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    reactor.use_message_exchange();
    let listener = reactor.listen_stream(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(listener);

    let other_seen = Rc::new(RefCell::new(false));
    let other_seen_handler = other_seen.clone();
    reactor.subscribe(
        2,
        Box::new(move |_reactor, _fd, _kind, _version, _payload| {
            *other_seen_handler.borrow_mut() = true;
        }),
    );

    let result = Rc::new(RefCell::new(None));
    let result_handler = result.clone();
    reactor.set_on_connect(Box::new(move |reactor, fd| {
        let deadline = SystemClock.now_seconds() + 5.0;
        let outcome = reactor.await_message(fd, 1, deadline);
        *result_handler.borrow_mut() = Some(outcome.map(|(_, payload)| payload.to_vec()));
        reactor.shutdown();
    }));

    let client = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut frame = Vec::new();
        frame.extend_from_slice(&2u32.to_be_bytes());
        frame.extend_from_slice(&0u32.to_be_bytes());
        frame.extend_from_slice(&3u32.to_be_bytes());
        frame.extend_from_slice(b"low");
        frame.extend_from_slice(&1u32.to_be_bytes());
        frame.extend_from_slice(&0u32.to_be_bytes());
        frame.extend_from_slice(&4u32.to_be_bytes());
        frame.extend_from_slice(b"high");
        stream.write_all(&frame).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let run_result = reactor.run();
    client.join().unwrap();

    assert_eq!(run_result, 0);
    assert_eq!(result.borrow_mut().take().unwrap().unwrap(), b"high");
}

#[test]
fn connecting_to_a_closed_port_surfaces_as_a_fail() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    let result = reactor.listen_stream(Some("not-an-ip"), 0);
    assert!(matches!(result, Err(Fail::Malformed { .. })));
}
