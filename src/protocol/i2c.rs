//! I2C passthrough start frames and settle timing.
//!
//! A transaction is started with one frame carrying
//! `[address << 1, in_len, out_len, out...]`. The firmware clocks the bus on
//! its own; the result is fetched later through the generic grove-value read
//! on the same port, sized for `in_len` bytes.

use std::time::Duration;

use crate::error::{Error, I2cError, ProtocolError, Result};
use crate::port::GrovePort;
use crate::protocol::Opcode;

/// Most bytes one transaction can carry in either direction.
pub const GROVE_I2C_LENGTH_LIMIT: usize = 16;

/// Approximate time to clock one byte at ~100 kbit/s.
pub const BYTE_TIME: Duration = Duration::from_micros(115);

/// Reply data for a start frame: one status byte.
pub const START_REPLY_LEN: usize = 1;

/// One passthrough transaction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cTransaction {
    /// 7-bit device address.
    pub address: u8,
    pub out: Vec<u8>,
    pub in_len: usize,
}

impl I2cTransaction {
    pub fn new(address: u8, out: &[u8], in_len: usize) -> Self {
        Self {
            address,
            out: out.to_vec(),
            in_len,
        }
    }

    /// Reject transfers the firmware cannot carry. Runs before any bus traffic.
    pub fn validate(&self) -> Result<()> {
        if self.in_len > GROVE_I2C_LENGTH_LIMIT {
            return Err(Error::LengthLimit {
                direction: "read",
                len: self.in_len,
                limit: GROVE_I2C_LENGTH_LIMIT,
            });
        }
        if self.out.len() > GROVE_I2C_LENGTH_LIMIT {
            return Err(Error::LengthLimit {
                direction: "write",
                len: self.out.len(),
                limit: GROVE_I2C_LENGTH_LIMIT,
            });
        }
        Ok(())
    }

    /// Address byte on the wire. The low bit is left clear; the firmware
    /// owns the read/write direction bit.
    pub fn address_byte(&self) -> u8 {
        (self.address & 0x7F) << 1
    }

    /// Start frame payload. Call [`validate`](Self::validate) first.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.out.len());
        buf.push(self.address_byte());
        buf.push(self.in_len as u8);
        buf.push(self.out.len() as u8);
        buf.extend_from_slice(&self.out);
        buf
    }

    /// Minimum wait between start and the first result poll, at
    /// `byte_time` per clocked byte.
    pub fn settle_delay(&self, byte_time: Duration) -> Duration {
        byte_time * settle_bytes(self.out.len(), self.in_len)
    }
}

/// `115 µs × (1 + out) + 115 µs × (1 + in)`, each term only when that
/// direction carries bytes.
pub fn settle_delay(out_len: usize, in_len: usize) -> Duration {
    BYTE_TIME * settle_bytes(out_len, in_len)
}

/// Byte times the settle delay covers.
pub fn settle_bytes(out_len: usize, in_len: usize) -> u32 {
    let mut bytes = 0;
    if out_len > 0 {
        bytes += 1 + out_len as u32;
    }
    if in_len > 0 {
        bytes += 1 + in_len as u32;
    }
    bytes
}

/// Interpret the start reply's status byte: zero means accepted.
pub fn decode_start(data: &[u8]) -> Result<()> {
    match data.first() {
        Some(0) => Ok(()),
        Some(&status) => Err(I2cError::NotReady { status }.into()),
        None => Err(ProtocolError::ReplyTooShort {
            field: "I2C start status",
            need: 1,
            got: 0,
        }
        .into()),
    }
}

pub fn start_opcode(port: GrovePort) -> Opcode {
    match port {
        GrovePort::One => Opcode::StartGroveI2c1,
        GrovePort::Two => Opcode::StartGroveI2c2,
    }
}
