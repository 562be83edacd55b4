// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Datagram scenarios against real loopback UDP (§6: "on UDP, one datagram is
//! one message"): raw CX delivery and a framed MX datagram in a single call.

use cxmx::config::ReactorConfig;
use cxmx::Reactor;
use std::cell::RefCell;
use std::net::UdpSocket;
use std::rc::Rc;
use std::time::Duration;

fn local_port(fd: cxmx::Fd) -> u16 {
    cxmx::net::local_port(fd).unwrap()
}

/// S1-style raw datagram delivery: whatever one `recv` returns is handed to
/// the socket hook verbatim, no framing.
#[test]
fn raw_datagram_is_delivered_whole() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    let fd = reactor.listen_datagram(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(fd);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_hook = seen.clone();
    reactor.set_on_socket(Box::new(move |reactor, _fd, data| {
        seen_hook.borrow_mut().extend_from_slice(data);
        reactor.shutdown();
    }));

    let client = std::thread::spawn(move || {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(b"ping", ("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let result = reactor.run();
    client.join().unwrap();

    assert_eq!(result, 0);
    assert_eq!(&seen.borrow()[..], b"ping");
}

/// S5: one UDP datagram carrying exactly one framed message.
#[test]
fn framed_datagram_reaches_its_subscriber() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    reactor.use_message_exchange();
    let fd = reactor.listen_datagram(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(fd);

    let received = Rc::new(RefCell::new(None));
    let received_handler = received.clone();
    reactor.subscribe(
        9,
        Box::new(move |reactor, _fd, kind, version, payload| {
            *received_handler.borrow_mut() = Some((kind, version, payload.to_vec()));
            reactor.shutdown();
        }),
    );

    let client = std::thread::spawn(move || {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut frame = Vec::new();
        frame.extend_from_slice(&9u32.to_be_bytes());
        frame.extend_from_slice(&0u32.to_be_bytes());
        frame.extend_from_slice(&3u32.to_be_bytes());
        frame.extend_from_slice(b"udp");
        socket.send_to(&frame, ("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let result = reactor.run();
    client.join().unwrap();

    assert_eq!(result, 0);
    let (kind, version, payload) = received.borrow_mut().take().unwrap();
    assert_eq!(kind, 9);
    assert_eq!(version, 0);
    assert_eq!(payload, b"udp");
}

/// A truncated framed datagram is reported as an Error, not silently dropped.
#[test]
fn malformed_framed_datagram_surfaces_an_error() {
    let mut reactor = Reactor::new(ReactorConfig::default());
    reactor.use_message_exchange();
    let fd = reactor.listen_datagram(Some("127.0.0.1"), 0).unwrap();
    let port = local_port(fd);

    let saw_error = Rc::new(RefCell::new(false));
    let saw_error_hook = saw_error.clone();
    reactor.set_on_error(Box::new(move |reactor, _fd, _origin, _fail| {
        *saw_error_hook.borrow_mut() = true;
        reactor.shutdown();
    }));

    let client = std::thread::spawn(move || {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(b"short", ("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let result = reactor.run();
    client.join().unwrap();

    assert_eq!(result, 0);
    assert!(*saw_error.borrow());
}
