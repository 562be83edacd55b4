// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Manual smoke test: a raw CX echo server (S2) on port 9292. Connect with
//! `nc 127.0.0.1 9292`, type a line, see it echoed back; type "quit" to stop
//! the server.

use cxmx::config::ReactorConfig;
use cxmx::logging;
use cxmx::Reactor;
use log::info;

fn main() {
    let _logger = logging::init(log::LevelFilter::Debug);

    let mut reactor = Reactor::new(ReactorConfig::default());
    let listener = reactor
        .listen_stream(Some("127.0.0.1"), 9292)
        .expect("failed to bind the echo listener");
    info!("echo_demo listening on 127.0.0.1:9292 (fd {})", listener);

    reactor.set_on_connect(Box::new(|_reactor, fd| {
        info!("accepted connection on fd {}", fd);
    }));

    reactor.set_on_socket(Box::new(|reactor, fd, data| {
        info!("fd {} sent {} bytes", fd, data.len());
        if data.trim_ascii() == b"quit" {
            reactor.shutdown();
            return;
        }
        let _ = reactor.send(fd, data);
    }));

    reactor.set_on_disconnect(Box::new(|_reactor, fd, origin| {
        info!("fd {} disconnected during {}", fd, origin);
    }));

    reactor.set_on_error(Box::new(|_reactor, fd, origin, fail| {
        info!("fd {} errored during {}: {}", fd, origin, fail);
    }));

    let status = reactor.run();
    info!("echo_demo exiting with status {}", status);
    std::process::exit(if status == 0 { 0 } else { 1 });
}
