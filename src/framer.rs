// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Length-prefixed message codec on message sockets (§4.4). Turns the ingress
//! buffer of a [crate::file_table::Role::MessageStream] into zero or more
//! whole [crate::event::Event::Message] events, never decoding the payload.

use crate::event::Event;
use crate::fail::Fail;
use crate::file_table::Fd;
use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

/// Size, in bytes, of the fixed `type:u32, version:u32, size:u32` header.
pub const HEADER_SIZE: usize = 12;

//==============================================================================
// Associate Functions
//==============================================================================

/// Drains zero or more whole frames out of `ingress`, appending a
/// [Event::Message] for each to `out`. Stops as soon as fewer than
/// `HEADER_SIZE + size` bytes remain buffered, leaving the partial frame in
/// place for the next read. `max_frame_size` bounds the accepted payload
/// size (§4.4's "recommended safety knob", made concrete via
/// [crate::config::ReactorConfig::max_frame_size]); a header claiming more is
/// reported back as `Err` so the caller can close the fd as malformed.
pub fn drain_frames(
    fd: Fd,
    ingress: &mut BytesMut,
    max_frame_size: u32,
    out: &mut Vec<Event>,
) -> Result<(), Fail> {
    loop {
        if ingress.len() < HEADER_SIZE {
            return Ok(());
        }

        let kind = BigEndian::read_u32(&ingress[0..4]);
        let version = BigEndian::read_u32(&ingress[4..8]);
        let size = BigEndian::read_u32(&ingress[8..12]);

        if size > max_frame_size {
            return Err(Fail::MalformedFrame {
                details: "frame size exceeds the configured maximum",
            });
        }

        let size = size as usize;
        let frame_len = HEADER_SIZE + size;
        if ingress.len() < frame_len {
            return Ok(());
        }

        let mut frame = ingress.split_to(frame_len);
        let payload = frame.split_off(HEADER_SIZE).freeze();

        out.push(Event::Message {
            fd,
            kind,
            version,
            payload,
        });
    }
}

/// Parses exactly one frame out of a single UDP datagram (§6: "one datagram is
/// one message"). Unlike [drain_frames], there is no partial-frame case: a
/// short header, a size that doesn't match the datagram's remaining bytes, or
/// leftover bytes after the payload are all `Malformed`, since a second read
/// will never arrive to complete this datagram.
pub fn parse_datagram(bytes: &[u8]) -> Result<(u32, u32, bytes::Bytes), Fail> {
    if bytes.len() < HEADER_SIZE {
        return Err(Fail::MalformedFrame {
            details: "datagram shorter than the frame header",
        });
    }
    let kind = BigEndian::read_u32(&bytes[0..4]);
    let version = BigEndian::read_u32(&bytes[4..8]);
    let size = BigEndian::read_u32(&bytes[8..12]) as usize;

    if HEADER_SIZE + size != bytes.len() {
        return Err(Fail::MalformedFrame {
            details: "datagram length does not match the frame header's size field",
        });
    }
    Ok((kind, version, bytes::Bytes::from(bytes[HEADER_SIZE..].to_vec())))
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: u32, version: u32, size: u32) -> Vec<u8> {
        let mut h = Vec::with_capacity(HEADER_SIZE);
        h.extend_from_slice(&kind.to_be_bytes());
        h.extend_from_slice(&version.to_be_bytes());
        h.extend_from_slice(&size.to_be_bytes());
        h
    }

    #[test]
    fn waits_for_a_full_header() {
        let mut ingress = BytesMut::from(&b"\x00\x00\x00"[..]);
        let mut out = Vec::new();
        drain_frames(3, &mut ingress, 1 << 20, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(ingress.len(), 3);
    }

    #[test]
    fn waits_for_the_full_payload() {
        let mut ingress = BytesMut::new();
        ingress.extend_from_slice(&header(1, 2, 10));
        ingress.extend_from_slice(b"Hello");
        let mut out = Vec::new();
        drain_frames(3, &mut ingress, 1 << 20, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(ingress.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn emits_a_zero_length_payload() {
        let mut ingress = BytesMut::new();
        ingress.extend_from_slice(&header(7, 0, 0));
        let mut out = Vec::new();
        drain_frames(3, &mut ingress, 1 << 20, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        match &out[0] {
            Event::Message { kind, version, payload, .. } => {
                assert_eq!(*kind, 7);
                assert_eq!(*version, 0);
                assert!(payload.is_empty());
            }
            _ => panic!("expected a Message event"),
        }
        assert!(ingress.is_empty());
    }

    #[test]
    fn drains_multiple_concatenated_frames() {
        let mut ingress = BytesMut::new();
        ingress.extend_from_slice(&header(1, 0, 2));
        ingress.extend_from_slice(b"ab");
        ingress.extend_from_slice(&header(2, 0, 3));
        ingress.extend_from_slice(b"xyz");
        let mut out = Vec::new();
        drain_frames(3, &mut ingress, 1 << 20, &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert!(ingress.is_empty());
    }

    #[test]
    fn rejects_oversized_header() {
        let mut ingress = BytesMut::new();
        ingress.extend_from_slice(&header(1, 0, 100));
        let mut out = Vec::new();
        let result = drain_frames(3, &mut ingress, 10, &mut out);
        assert!(result.is_err());
    }

    #[test]
    fn parses_one_complete_datagram() {
        let mut bytes = header(4, 1, 3);
        bytes.extend_from_slice(b"hey");
        let (kind, version, payload) = parse_datagram(&bytes).unwrap();
        assert_eq!(kind, 4);
        assert_eq!(version, 1);
        assert_eq!(&payload[..], b"hey");
    }

    #[test]
    fn datagram_with_trailing_garbage_is_malformed() {
        let mut bytes = header(4, 1, 3);
        bytes.extend_from_slice(b"heyyy");
        assert!(parse_datagram(&bytes).is_err());
    }

    #[test]
    fn truncated_datagram_is_malformed() {
        let bytes = header(4, 1, 3);
        assert!(parse_datagram(&bytes).is_err());
    }
}
