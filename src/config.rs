//! Driver configuration.
//!
//! Defaults match the board firmware contract, so `DriverConfig::default()`
//! is right for a stock GoPiGo3 on a Raspberry Pi.

use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::i2c::BYTE_TIME;

/// SPI address the firmware answers to unless reconfigured.
pub const DEFAULT_ADDRESS: u8 = 8;

/// Lock file shared by every process that drives grove I2C on this host.
pub const DEFAULT_LOCK_PATH: &str = "/run/lock/DexterLockI2C";

/// Bus parameters the board expects. This crate does not open the bus
/// itself; platform code uses these when building the SPI device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiSettings {
    pub device: PathBuf,
    pub speed_hz: u32,
    /// SPI mode 0..=3 (CPOL/CPHA).
    pub mode: u8,
    pub bits_per_word: u8,
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/spidev0.1"),
            speed_hz: 500_000,
            mode: 0,
            bits_per_word: 8,
        }
    }
}

/// Bounded waits of the I2C passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I2cTiming {
    /// How long to keep retrying a start the firmware is not ready for.
    pub start_timeout: Duration,
    /// How long to keep polling for the result after the settle delay.
    pub poll_timeout: Duration,
    /// Bus time per byte, the unit of the settle delay.
    pub byte_time: Duration,
    /// How long to wait for the bus lock, when one is configured.
    pub lock_timeout: Duration,
}

impl Default for I2cTiming {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_millis(5),
            poll_timeout: Duration::from_millis(5),
            byte_time: BYTE_TIME,
            lock_timeout: Duration::from_secs(1),
        }
    }
}

/// Everything [`Driver::new`](crate::Driver::new) needs besides the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriverConfig {
    /// Byte 0 of every frame.
    pub address: u8,
    /// Verify manufacturer, board name and firmware version on construction.
    pub detect: bool,
    pub spi: SpiSettings,
    /// Cross-process lock taken around I2C passthrough. `None` disables it.
    pub lock_path: Option<PathBuf>,
    pub i2c: I2cTiming,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            detect: true,
            spi: SpiSettings::default(),
            lock_path: None,
            i2c: I2cTiming::default(),
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Skip the identity and firmware check. For bring-up and tests.
    pub fn without_detect(mut self) -> Self {
        self.detect = false;
        self
    }

    pub fn with_spi(mut self, spi: SpiSettings) -> Self {
        self.spi = spi;
        self
    }

    /// Take the bus lock at `path` around every I2C passthrough.
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Take the bus lock at [`DEFAULT_LOCK_PATH`].
    pub fn with_default_lock(self) -> Self {
        self.with_lock(DEFAULT_LOCK_PATH)
    }

    pub fn with_i2c_timing(mut self, i2c: I2cTiming) -> Self {
        self.i2c = i2c;
        self
    }
}
