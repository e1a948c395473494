//! Identity replies: manufacturer, board name, versions, serial id.

use std::fmt;

use crate::codec;
use crate::error::Result;

/// Manufacturer string reported by a genuine board.
pub const MANUFACTURER: &str = "Dexter Industries";

/// Board name reported by a genuine board.
pub const BOARD: &str = "GoPiGo3";

/// Firmware line this driver speaks.
pub const FIRMWARE_REQUIRED: VersionReq = VersionReq::new(0, 3);

/// Width of the manufacturer and board name slots.
pub const NAME_LEN: usize = 20;

/// Serial id length in bytes (rendered as 32 hex digits).
pub const ID_LEN: usize = 16;

/// Hardware or firmware version, packed on the wire as
/// `major * 1_000_000 + minor * 1_000 + patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn from_u32(packed: u32) -> Self {
        Self {
            major: packed / 1_000_000,
            minor: (packed / 1_000) % 1_000,
            patch: packed % 1_000,
        }
    }

    /// True if major and minor match; patch is free.
    pub fn compatible_with(&self, req: VersionReq) -> bool {
        self.major == req.major && self.minor == req.minor
    }

    /// Decode from a 4-byte reply data field.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self::from_u32(codec::read32(data, 0)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A `major.minor.x` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionReq {
    pub major: u32,
    pub minor: u32,
}

impl VersionReq {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.x", self.major, self.minor)
    }
}

/// Decode a name slot (manufacturer or board).
pub fn decode_name(data: &[u8]) -> Result<String> {
    codec::read_cstr(data, 0, NAME_LEN)
}

/// Decode the serial id as 32 lowercase hex digits.
pub fn decode_id(data: &[u8]) -> Result<String> {
    codec::read_hex(data, 0, ID_LEN)
}
