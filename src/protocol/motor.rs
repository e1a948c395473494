//! Motor status decode and tick/degree scaling.
//!
//! The firmware counts in encoder ticks at the output shaft. Host-facing
//! values are degrees; conversion truncates toward zero in both directions.

use crate::codec;
use crate::error::Result;

pub const MOTOR_GEAR_RATIO: u32 = 120;
pub const ENCODER_TICKS_PER_ROTATION: u32 = 6;

/// Encoder ticks per degree of wheel rotation.
pub const MOTOR_TICKS_PER_DEGREE: f64 =
    (MOTOR_GEAR_RATIO * ENCODER_TICKS_PER_ROTATION) as f64 / 360.0;

/// Power value that lets the motor coast instead of braking at zero.
pub const MOTOR_FLOAT: i8 = -128;

/// Wheel diameter in millimeters.
pub const WHEEL_DIAMETER: f64 = 66.5;

/// Distance between the wheels in millimeters.
pub const WHEEL_BASE_WIDTH: f64 = 117.0;

pub const WHEEL_CIRCUMFERENCE: f64 = WHEEL_DIAMETER * std::f64::consts::PI;

/// Circle traced by a wheel when the robot spins in place.
pub const WHEEL_BASE_CIRCUMFERENCE: f64 = WHEEL_BASE_WIDTH * std::f64::consts::PI;

/// Status reply data width: flags, power, encoder, dps.
pub const MOTOR_STATUS_LEN: usize = 8;

pub fn degrees_to_ticks(degrees: f64) -> f64 {
    (degrees * MOTOR_TICKS_PER_DEGREE).trunc()
}

pub fn ticks_to_degrees(ticks: i32) -> i32 {
    (f64::from(ticks) / MOTOR_TICKS_PER_DEGREE) as i32
}

/// Bit flags reported alongside motor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorFlags(pub u8);

impl MotorFlags {
    /// Motors disabled because the battery voltage is too low.
    pub fn low_voltage_float(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// Motor is not keeping up with its position or speed target.
    pub fn overloaded(self) -> bool {
        self.0 & 0x02 != 0
    }
}

/// Decoded motor status.
///
/// `[flags, power i8, encoder i32 BE, dps i16 BE]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MotorStatus {
    pub flags: MotorFlags,
    /// Raw PWM power in percent, or [`MOTOR_FLOAT`].
    pub power: i8,
    /// Encoder position in degrees.
    pub encoder: i32,
    /// Speed in degrees per second.
    pub dps: i32,
}

impl MotorStatus {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let flags = codec::read8(data, 0)?;
        let power = codec::sign8(codec::read8(data, 1)?);
        let encoder = codec::sign32(codec::read32(data, 2)?);
        let dps = codec::sign16(codec::read16(data, 6)?);
        Ok(Self {
            flags: MotorFlags(flags),
            power,
            encoder: ticks_to_degrees(encoder),
            dps: ticks_to_degrees(i32::from(dps)),
        })
    }
}

/// Clamp a power percentage into the wire's signed byte, passing
/// [`MOTOR_FLOAT`] through untouched.
pub fn clamp_power(power: i16) -> i8 {
    if power == i16::from(MOTOR_FLOAT) {
        return MOTOR_FLOAT;
    }
    power.clamp(-100, 100) as i8
}
