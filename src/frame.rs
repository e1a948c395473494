//! Frame construction and reply validation.
//!
//! Wire format (request and reply are the same length, exchanged full-duplex):
//! ```text
//! request: ADDR OPCODE PAYLOAD... [00 padding]
//! reply:   xx   xx     xx  A5  DATA...
//! ```
//!
//! The protocol is not length-prefixed. Each opcode has a fixed reply width,
//! so the request is padded with zeros until it is long enough to clock the
//! whole reply back.

use crate::error::{ProtocolError, Result};
use crate::protocol::{Opcode, SENTINEL, SENTINEL_INDEX};

/// Bytes in front of the reply data: three echo bytes plus the sentinel.
pub const REPLY_HEADER_LEN: usize = SENTINEL_INDEX + 1;

/// An outgoing frame before the device address is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
    /// Reply data bytes expected after the sentinel. `None` for write-only
    /// commands, whose reply carries nothing and is not validated.
    pub reply_data_len: Option<usize>,
}

impl Request {
    /// A write-only command.
    pub fn command(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            payload,
            reply_data_len: None,
        }
    }

    /// A read with no payload and `data_len` reply bytes after the sentinel.
    pub fn query(opcode: Opcode, data_len: usize) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
            reply_data_len: Some(data_len),
        }
    }

    /// Attach a payload to a query (used by I2C start, which both sends
    /// bytes and reports a status).
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Total frame length on the wire.
    pub fn wire_len(&self) -> usize {
        let request = 2 + self.payload.len();
        match self.reply_data_len {
            Some(n) => request.max(REPLY_HEADER_LEN + n),
            None => request,
        }
    }

    /// Encode for the given device address, zero-padded to the reply width.
    pub fn encode(&self, address: u8) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.wire_len());
        wire.push(address);
        wire.push(self.opcode.as_byte());
        wire.extend_from_slice(&self.payload);
        wire.resize(self.wire_len(), 0);
        wire
    }
}

/// A validated reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub opcode: Opcode,
    /// The whole reply buffer, including echo bytes and sentinel.
    pub raw: Vec<u8>,
}

impl Reply {
    /// Validate a reply buffer: byte 3 must be the sentinel.
    pub fn parse(opcode: Opcode, raw: Vec<u8>) -> Result<Self> {
        if raw.get(SENTINEL_INDEX) != Some(&SENTINEL) {
            return Err(ProtocolError::NoResponse { opcode, raw }.into());
        }
        Ok(Self { opcode, raw })
    }

    /// Bytes after the sentinel.
    pub fn data(&self) -> &[u8] {
        &self.raw[REPLY_HEADER_LEN..]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
