//! Opcodes and per-operation payload codecs.
//!
//! - [`Opcode`]: the message type byte at frame index 1
//! - [`identity`]: manufacturer, board, versions, serial id
//! - [`motor`]: motor status decode and tick/degree scaling
//! - [`grove`]: grove sensor types, pin modes, and value decode variants
//! - [`i2c`]: I2C passthrough start frames and settle timing
//!
//! Opcode values are assigned in declaration order starting from `None = 0`
//! and form a contract with the board firmware. Append only; never reorder.

pub mod grove;
pub mod i2c;
pub mod identity;
pub mod motor;

use std::fmt;

/// Reply byte at index 3 that marks a valid response.
pub const SENTINEL: u8 = 0xA5;

/// Index of [`SENTINEL`] in every reply; data starts right after it.
pub const SENTINEL_INDEX: usize = 3;

/// Message type byte sent at frame index 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    None = 0,

    GetManufacturer,
    GetName,
    GetHardwareVersion,
    GetFirmwareVersion,
    GetId,

    SetLed,

    GetVoltage5v,
    GetVoltageVcc,

    SetServo,

    SetMotorPwm,

    SetMotorPosition,
    SetMotorPositionKp,
    SetMotorPositionKd,

    SetMotorDps,

    SetMotorLimits,

    OffsetMotorEncoder,

    GetMotorEncoderLeft,
    GetMotorEncoderRight,

    GetMotorStatusLeft,
    GetMotorStatusRight,

    SetGroveType,
    SetGroveMode,
    SetGroveState,
    SetGrovePwmDuty,
    SetGrovePwmFrequency,

    GetGroveValue1,
    GetGroveValue2,
    GetGroveState1_1,
    GetGroveState1_2,
    GetGroveState2_1,
    GetGroveState2_2,
    GetGroveVoltage1_1,
    GetGroveVoltage1_2,
    GetGroveVoltage2_1,
    GetGroveVoltage2_2,
    GetGroveAnalog1_1,
    GetGroveAnalog1_2,
    GetGroveAnalog2_1,
    GetGroveAnalog2_2,

    StartGroveI2c1,
    StartGroveI2c2,
}

impl Opcode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (0x{:02X})", self.as_byte())
    }
}
