use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::codec;
use crate::protocol::Opcode;
use crate::protocol::grove::GroveType;
use crate::protocol::identity::{Version, VersionReq};

/// Communication-level failures. Fatal to the current call.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no SPI response to {opcode}{}", format_raw_suffix(raw))]
    NoResponse {
        opcode: Opcode,
        /// Full reply buffer for debug context.
        raw: Vec<u8>,
    },

    #[error("reply too short for {field}: need {need} bytes, got {got}")]
    ReplyTooShort {
        field: &'static str,
        need: usize,
        got: usize,
    },

    #[error("no SPI response; GoPiGo3 with address {address} not connected")]
    DeviceUnreachable {
        address: u8,
        #[source]
        source: Box<Error>,
    },

    #[error("GoPiGo3 with address {address} not connected (manufacturer {manufacturer:?}, board {board:?})")]
    WrongDevice {
        address: u8,
        manufacturer: String,
        board: String,
    },

    #[error("GoPiGo3 firmware needs to be version {required} but is currently version {found}")]
    FirmwareMismatch { required: VersionReq, found: Version },

    #[error("{what} 0x{mask:02X} unsupported; must target exactly one")]
    UnsupportedTarget { what: &'static str, mask: u8 },
}

/// I2C passthrough failures. Usually transient; callers may retry.
#[derive(Debug, Error)]
pub enum I2cError {
    #[error("not ready to start I2C transaction (status {status})")]
    NotReady { status: u8 },

    #[error("timeout after {timeout:?} trying to start I2C transaction")]
    StartTimeout { timeout: Duration },

    #[error("I2C bus error")]
    Bus,
}

/// Data-level failures, distinct from communication failures.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("object not detected within range")]
    NoObject,

    #[error("invalid value from {opcode} (status {status})")]
    InvalidValue { opcode: Opcode, status: u8 },

    #[error("timeout after {timeout:?} waiting for I2C data")]
    ReadTimeout { timeout: Duration },
}

/// Hardware-level sensor failures.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor not responding")]
    NotResponding,

    #[error("grove type mismatch: configured {expected}, device reports {got}")]
    TypeMismatch { expected: GroveType, got: u8 },

    #[error("invalid {kind} reply (type echo {echo}, status {status})")]
    InvalidReply { kind: GroveType, echo: u8, status: u8 },
}

/// Failures of the underlying full-duplex exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("SPI error: {0:?}")]
    Spi(embedded_hal::spi::ErrorKind),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the lock primitive itself. Contention is never an error.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("bus lock {} unavailable: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bus lock {} still held after {timeout:?}", path.display())]
    Timeout { path: PathBuf, timeout: Duration },
}

/// Any failure surfaced by the driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    I2c(#[from] I2cError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// Caller asked for more than one I2C transaction can carry.
    #[error("I2C {direction} length {len} exceeds the {limit}-byte limit")]
    LengthLimit {
        direction: &'static str,
        len: usize,
        limit: usize,
    },
}

impl Error {
    /// Errors worth another attempt within a bounded retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Protocol(ProtocolError::NoResponse { .. })
                | Error::I2c(I2cError::NotReady { .. })
                | Error::Value(ValueError::InvalidValue { .. })
        )
    }
}

/// Format raw bytes as a suffix like " | 00 00 00 FF ..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let ellipsis = if raw.len() > limit { " ..." } else { "" };
    format!(" | {}{ellipsis}", codec::hex_dump(&raw[..raw.len().min(limit)]))
}

pub type Result<T> = std::result::Result<T, Error>;
