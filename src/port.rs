//! Port, pin, and actuator identifiers.
//!
//! Every identifier on the wire is a bit flag so that one field can address
//! several targets at once. Set/configure operations take a mask (any OR
//! combination); get/read operations take a single-target enum, so a
//! multi-target read cannot be expressed. Raw masks coming from elsewhere
//! convert through `TryFrom`, which rejects anything but exactly one target.

use std::fmt;
use std::ops::BitOr;

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Single targets
// ---------------------------------------------------------------------------

/// One of the two grove connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GrovePort {
    One,
    Two,
}

impl GrovePort {
    pub const ALL: [GrovePort; 2] = [GrovePort::One, GrovePort::Two];

    /// Pin mask covering both pins of this port.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::One => 0x03,
            Self::Two => 0x0C,
        }
    }

    /// Registry slot index (0 or 1).
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// The port's first (signal) and second pin.
    pub fn pins(self) -> [GrovePin; 2] {
        match self {
            Self::One => [GrovePin::Pin1_1, GrovePin::Pin1_2],
            Self::Two => [GrovePin::Pin2_1, GrovePin::Pin2_2],
        }
    }
}

impl fmt::Display for GrovePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "GROVE_1"),
            Self::Two => write!(f, "GROVE_2"),
        }
    }
}

/// One grove pin. Each port exposes two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GrovePin {
    Pin1_1 = 0x01,
    Pin1_2 = 0x02,
    Pin2_1 = 0x04,
    Pin2_2 = 0x08,
}

impl GrovePin {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn port(self) -> GrovePort {
        match self {
            Self::Pin1_1 | Self::Pin1_2 => GrovePort::One,
            Self::Pin2_1 | Self::Pin2_2 => GrovePort::Two,
        }
    }

    /// 0 for the first pin of a port, 1 for the second.
    pub fn index_in_port(self) -> usize {
        match self {
            Self::Pin1_1 | Self::Pin2_1 => 0,
            Self::Pin1_2 | Self::Pin2_2 => 1,
        }
    }
}

impl fmt::Display for GrovePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin1_1 => write!(f, "GROVE_1_1"),
            Self::Pin1_2 => write!(f, "GROVE_1_2"),
            Self::Pin2_1 => write!(f, "GROVE_2_1"),
            Self::Pin2_2 => write!(f, "GROVE_2_2"),
        }
    }
}

/// Drive motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Motor {
    Left = 0x01,
    Right = 0x02,
}

impl Motor {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "MOTOR_LEFT"),
            Self::Right => write!(f, "MOTOR_RIGHT"),
        }
    }
}

/// Servo header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Servo {
    One = 0x01,
    Two = 0x02,
}

impl Servo {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// On-board LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Led {
    EyeRight = 0x01,
    EyeLeft = 0x02,
    BlinkerLeft = 0x04,
    BlinkerRight = 0x08,
    /// Owned by the WiFi status service; leave it alone.
    Wifi = 0x80,
}

impl Led {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Masks
// ---------------------------------------------------------------------------

macro_rules! target_mask {
    ($(#[$meta:meta])* $mask:ident, $single:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $mask(u8);

        impl $mask {
            pub const fn from_bits(bits: u8) -> Self {
                Self(bits)
            }

            pub const fn bits(self) -> u8 {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl From<$single> for $mask {
            fn from(target: $single) -> Self {
                Self(target.as_byte())
            }
        }

        impl BitOr for $mask {
            type Output = $mask;

            fn bitor(self, rhs: $mask) -> $mask {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOr for $single {
            type Output = $mask;

            fn bitor(self, rhs: $single) -> $mask {
                $mask(self.as_byte() | rhs.as_byte())
            }
        }

        impl BitOr<$single> for $mask {
            type Output = $mask;

            fn bitor(self, rhs: $single) -> $mask {
                Self(self.0 | rhs.as_byte())
            }
        }

        impl fmt::Display for $mask {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:02X}", self.0)
            }
        }
    };
}

target_mask!(
    /// Any OR combination of grove pins. A port is both of its pins.
    GroveMask,
    GrovePin
);
target_mask!(
    /// Any OR combination of motors.
    MotorMask,
    Motor
);
target_mask!(
    /// Any OR combination of servos.
    ServoMask,
    Servo
);
target_mask!(
    /// Any OR combination of LEDs.
    LedMask,
    Led
);

impl GroveMask {
    pub const BOTH_PORTS: GroveMask = GroveMask(0x0F);

    /// Ports whose two pins are both present in the mask.
    pub fn full_ports(self) -> impl Iterator<Item = GrovePort> {
        GrovePort::ALL
            .into_iter()
            .filter(move |p| self.0 & p.as_byte() == p.as_byte())
    }

    /// Individual pins present in the mask.
    pub fn pins(self) -> impl Iterator<Item = GrovePin> {
        [GrovePin::Pin1_1, GrovePin::Pin1_2, GrovePin::Pin2_1, GrovePin::Pin2_2]
            .into_iter()
            .filter(move |p| self.0 & p.as_byte() != 0)
    }
}

impl From<GrovePort> for GroveMask {
    fn from(port: GrovePort) -> Self {
        Self(port.as_byte())
    }
}

impl BitOr for GrovePort {
    type Output = GroveMask;

    fn bitor(self, rhs: GrovePort) -> GroveMask {
        GroveMask(self.as_byte() | rhs.as_byte())
    }
}

impl MotorMask {
    pub const BOTH: MotorMask = MotorMask(0x03);
}

impl ServoMask {
    pub const BOTH: ServoMask = ServoMask(0x03);
}

impl LedMask {
    /// Eyes and blinkers; excludes the WiFi LED.
    pub const USER: LedMask = LedMask(0x0F);
}

// ---------------------------------------------------------------------------
// Mask → single target
// ---------------------------------------------------------------------------

impl TryFrom<GroveMask> for GrovePort {
    type Error = ProtocolError;

    fn try_from(mask: GroveMask) -> Result<Self, Self::Error> {
        match mask.bits() {
            0x03 => Ok(Self::One),
            0x0C => Ok(Self::Two),
            other => Err(ProtocolError::UnsupportedTarget { what: "grove port", mask: other }),
        }
    }
}

impl TryFrom<GroveMask> for GrovePin {
    type Error = ProtocolError;

    fn try_from(mask: GroveMask) -> Result<Self, Self::Error> {
        match mask.bits() {
            0x01 => Ok(Self::Pin1_1),
            0x02 => Ok(Self::Pin1_2),
            0x04 => Ok(Self::Pin2_1),
            0x08 => Ok(Self::Pin2_2),
            other => Err(ProtocolError::UnsupportedTarget { what: "grove pin", mask: other }),
        }
    }
}

impl TryFrom<MotorMask> for Motor {
    type Error = ProtocolError;

    fn try_from(mask: MotorMask) -> Result<Self, Self::Error> {
        match mask.bits() {
            0x01 => Ok(Self::Left),
            0x02 => Ok(Self::Right),
            other => Err(ProtocolError::UnsupportedTarget { what: "motor port", mask: other }),
        }
    }
}
