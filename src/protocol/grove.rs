//! Grove sensor types, pin modes, and value decode variants.
//!
//! A generic grove-value read returns bytes whose layout depends on what the
//! port was last configured as. [`decode_value`] is the one place that
//! interprets them; it is a pure function of the configured type and the
//! reply data, so every variant can be tested without a bus.

use std::fmt;

use crate::codec;
use crate::error::{I2cError, Result, SensorError, ValueError};
use crate::port::{GrovePin, GrovePort};
use crate::protocol::Opcode;

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// What a grove port is configured to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroveType {
    Custom = 1,
    IrDiRemote = 2,
    IrEv3Remote = 3,
    Ultrasonic = 4,
    I2c = 5,
}

impl GroveType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Custom),
            2 => Some(Self::IrDiRemote),
            3 => Some(Self::IrEv3Remote),
            4 => Some(Self::Ultrasonic),
            5 => Some(Self::I2c),
            _ => None,
        }
    }

    /// Reply data bytes after the sentinel for a grove-value read.
    pub fn value_data_len(self, i2c_in_bytes: usize) -> usize {
        match self {
            Self::Custom => 1,
            Self::IrDiRemote => 3,
            Self::IrEv3Remote => 6,
            Self::Ultrasonic => 4,
            Self::I2c => 2 + i2c_in_bytes,
        }
    }
}

impl fmt::Display for GroveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Custom => "CUSTOM",
            Self::IrDiRemote => "IR_DI_REMOTE",
            Self::IrEv3Remote => "IR_EV3_REMOTE",
            Self::Ultrasonic => "US",
            Self::I2c => "I2C",
        };
        f.write_str(name)
    }
}

/// Electrical mode of a single grove pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroveMode {
    InputDigital = 0,
    OutputDigital = 1,
    InputDigitalPullup = 2,
    InputDigitalPulldown = 3,
    InputAnalog = 4,
    OutputPwm = 5,
    InputAnalogPullup = 6,
    InputAnalogPulldown = 7,
}

impl GroveMode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn is_input(self) -> bool {
        !matches!(self, Self::OutputDigital | Self::OutputPwm)
    }
}

/// Status byte the firmware attaches to pin and I2C reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GroveState {
    ValidData = 0,
    NotConfigured = 1,
    Configuring = 2,
    NoData = 3,
    I2cError = 4,
}

impl GroveState {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::ValidData),
            1 => Some(Self::NotConfigured),
            2 => Some(Self::Configuring),
            3 => Some(Self::NoData),
            4 => Some(Self::I2cError),
            _ => None,
        }
    }
}

/// Digital output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroveLevel {
    Low = 0,
    High = 1,
}

impl GroveLevel {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl From<bool> for GroveLevel {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

// ---------------------------------------------------------------------------
// Remote keys
// ---------------------------------------------------------------------------

/// Button on the Dexter IR remote. Codes are 1-based in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RemoteKey {
    Up,
    Left,
    Ok,
    Right,
    Down,
    Digit(u8),
    Star,
    Hash,
}

const REMOTE_KEYS: [RemoteKey; 17] = [
    RemoteKey::Up,
    RemoteKey::Left,
    RemoteKey::Ok,
    RemoteKey::Right,
    RemoteKey::Down,
    RemoteKey::Digit(1),
    RemoteKey::Digit(2),
    RemoteKey::Digit(3),
    RemoteKey::Digit(4),
    RemoteKey::Digit(5),
    RemoteKey::Digit(6),
    RemoteKey::Digit(7),
    RemoteKey::Digit(8),
    RemoteKey::Digit(9),
    RemoteKey::Star,
    RemoteKey::Digit(0),
    RemoteKey::Hash,
];

impl RemoteKey {
    /// Map a raw code to a key. 0 and out-of-range codes mean no key.
    pub fn from_code(code: u8) -> Option<Self> {
        let idx = usize::from(code).checked_sub(1)?;
        REMOTE_KEYS.get(idx).copied()
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Left => f.write_str("left"),
            Self::Ok => f.write_str("ok"),
            Self::Right => f.write_str("right"),
            Self::Down => f.write_str("down"),
            Self::Digit(d) => write!(f, "{d}"),
            Self::Star => f.write_str("*"),
            Self::Hash => f.write_str("#"),
        }
    }
}

// ---------------------------------------------------------------------------
// Value decode
// ---------------------------------------------------------------------------

/// A decoded grove-value reply. The variant follows the port's configured type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GroveValue {
    /// CUSTOM (or unconfigured) port: one plain byte.
    Raw(u8),
    IrRemote { code: u8, key: Option<RemoteKey> },
    Ev3Remote([u8; 4]),
    /// Ultrasonic distance in millimeters.
    Distance(u16),
    /// Bytes read back by an I2C passthrough transaction.
    I2c(Vec<u8>),
}

/// Interpret grove-value reply data for a port configured as `kind`.
///
/// `opcode` is only used for error context.
pub fn decode_value(kind: GroveType, opcode: Opcode, data: &[u8]) -> Result<GroveValue> {
    match kind {
        GroveType::Custom => Ok(GroveValue::Raw(codec::read8(data, 0)?)),
        GroveType::IrDiRemote => {
            check_echo(kind, data)?;
            let code = codec::read8(data, 2)?;
            Ok(GroveValue::IrRemote {
                code,
                key: RemoteKey::from_code(code),
            })
        }
        GroveType::IrEv3Remote => {
            check_echo(kind, data)?;
            let mut raw = [0u8; 4];
            for (i, b) in raw.iter_mut().enumerate() {
                *b = codec::read8(data, 2 + i)?;
            }
            Ok(GroveValue::Ev3Remote(raw))
        }
        GroveType::Ultrasonic => {
            check_echo(kind, data)?;
            match codec::read16(data, 2)? {
                0 => Err(SensorError::NotResponding.into()),
                1 => Err(ValueError::NoObject.into()),
                mm => Ok(GroveValue::Distance(mm)),
            }
        }
        GroveType::I2c => {
            let echo = codec::read8(data, 0)?;
            let status = codec::read8(data, 1)?;
            if echo != kind.as_byte() {
                return Err(SensorError::TypeMismatch {
                    expected: kind,
                    got: echo,
                }
                .into());
            }
            match GroveState::from_byte(status) {
                Some(GroveState::ValidData) => Ok(GroveValue::I2c(data[2..].to_vec())),
                Some(GroveState::I2cError) => Err(I2cError::Bus.into()),
                _ => Err(ValueError::InvalidValue { opcode, status }.into()),
            }
        }
    }
}

/// Sensor replies lead with `[type-echo, status]`; both must check out.
fn check_echo(kind: GroveType, data: &[u8]) -> Result<()> {
    let echo = codec::read8(data, 0)?;
    let status = codec::read8(data, 1)?;
    if echo == kind.as_byte() && status == GroveState::ValidData as u8 {
        Ok(())
    } else {
        Err(SensorError::InvalidReply { kind, echo, status }.into())
    }
}

// ---------------------------------------------------------------------------
// Pin reads
// ---------------------------------------------------------------------------

/// Reply data for a pin state read: `[status, level]`.
pub const GROVE_STATE_LEN: usize = 2;

/// Reply data for pin voltage and analog reads: `[status, u16]`.
pub const GROVE_ANALOG_LEN: usize = 3;

/// Decode a pin state reply.
pub fn decode_state(opcode: Opcode, data: &[u8]) -> Result<u8> {
    check_status(opcode, data)?;
    codec::read8(data, 1)
}

/// Decode a pin voltage reply (millivolts on the wire) into volts.
pub fn decode_voltage(opcode: Opcode, data: &[u8]) -> Result<f64> {
    check_status(opcode, data)?;
    Ok(f64::from(codec::read16(data, 1)?) / 1000.0)
}

/// Decode a 12-bit raw ADC reply.
pub fn decode_analog(opcode: Opcode, data: &[u8]) -> Result<u16> {
    check_status(opcode, data)?;
    codec::read16(data, 1)
}

fn check_status(opcode: Opcode, data: &[u8]) -> Result<()> {
    let status = codec::read8(data, 0)?;
    if status == GroveState::ValidData as u8 {
        Ok(())
    } else {
        Err(ValueError::InvalidValue { opcode, status }.into())
    }
}

// ---------------------------------------------------------------------------
// Opcode selection
// ---------------------------------------------------------------------------

pub fn value_opcode(port: GrovePort) -> Opcode {
    match port {
        GrovePort::One => Opcode::GetGroveValue1,
        GrovePort::Two => Opcode::GetGroveValue2,
    }
}

pub fn state_opcode(pin: GrovePin) -> Opcode {
    match pin {
        GrovePin::Pin1_1 => Opcode::GetGroveState1_1,
        GrovePin::Pin1_2 => Opcode::GetGroveState1_2,
        GrovePin::Pin2_1 => Opcode::GetGroveState2_1,
        GrovePin::Pin2_2 => Opcode::GetGroveState2_2,
    }
}

pub fn voltage_opcode(pin: GrovePin) -> Opcode {
    match pin {
        GrovePin::Pin1_1 => Opcode::GetGroveVoltage1_1,
        GrovePin::Pin1_2 => Opcode::GetGroveVoltage1_2,
        GrovePin::Pin2_1 => Opcode::GetGroveVoltage2_1,
        GrovePin::Pin2_2 => Opcode::GetGroveVoltage2_2,
    }
}

pub fn analog_opcode(pin: GrovePin) -> Opcode {
    match pin {
        GrovePin::Pin1_1 => Opcode::GetGroveAnalog1_1,
        GrovePin::Pin1_2 => Opcode::GetGroveAnalog1_2,
        GrovePin::Pin2_1 => Opcode::GetGroveAnalog2_1,
        GrovePin::Pin2_2 => Opcode::GetGroveAnalog2_2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
