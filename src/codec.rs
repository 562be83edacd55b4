// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Payload codec used by `pack`/`unpack` helpers (§6 of the collaborator
//! contract). The framer never looks inside a payload; this module is what an
//! application reaches for once it owns one.
//!
//! Supports 1/2/4/8-byte big-endian integers, big-endian IEEE-754 32- and
//! 64-bit floats, length-prefixed strings and opaque data (4-byte length
//! prefix), and raw fixed-length byte spans. Endianness and widths are fixed.

use crate::fail::Fail;
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};

//==============================================================================
// Structures
//==============================================================================

/// Appends big-endian-encoded values to a growable buffer.
#[derive(Default)]
pub struct Packer {
    buf: BytesMut,
}

/// Reads big-endian-encoded values off the front of a byte slice.
pub struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [Packer].
impl Packer {
    /// Creates an empty packer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32(v);
        self
    }

    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    /// Length-prefixed (4-byte big-endian length) UTF-8 string.
    pub fn put_string(&mut self, s: &str) -> &mut Self {
        self.put_data(s.as_bytes())
    }

    /// Length-prefixed (4-byte big-endian length) opaque data.
    pub fn put_data(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    /// Raw fixed-length bytes, no length prefix.
    pub fn put_raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_slice(data);
        self
    }

    /// Consumes the packer, returning the encoded bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }
}

/// Associate functions for [Unpacker].
impl<'a> Unpacker<'a> {
    /// Wraps a byte slice for sequential big-endian decoding.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes remaining to be consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Fail> {
        if self.remaining() < n {
            return Err(Fail::Malformed {
                details: "unpacker ran past the end of the buffer",
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, Fail> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, Fail> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn get_u32(&mut self) -> Result<u32, Fail> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn get_u64(&mut self) -> Result<u64, Fail> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn get_f32(&mut self) -> Result<f32, Fail> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    pub fn get_f64(&mut self) -> Result<f64, Fail> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// Length-prefixed UTF-8 string; the length prefix is the implicit terminator.
    pub fn get_string(&mut self) -> Result<String, Fail> {
        let data = self.get_data()?;
        String::from_utf8(data).map_err(|_| Fail::Malformed {
            details: "string payload was not valid UTF-8",
        })
    }

    /// Length-prefixed opaque data.
    pub fn get_data(&mut self) -> Result<Vec<u8>, Fail> {
        let len = self.get_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Raw fixed-length bytes, no length prefix.
    pub fn get_raw(&mut self, len: usize) -> Result<&'a [u8], Fail> {
        self.take(len)
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
