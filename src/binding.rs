//! A single grove pin bound to a mode.
//!
//! Higher-level sensor and actuator code holds one of these and passes the
//! driver in on each call, so one driver can serve any number of bindings.
//! Everything here goes through the driver's public operations.

use crate::driver::Driver;
use crate::error::Result;
use crate::port::{GrovePin, GrovePort};
use crate::protocol::grove::{GroveLevel, GroveMode, GroveType};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortBinding {
    pub port: GrovePort,
    pub pin: GrovePin,
    pub mode: GroveMode,
}

impl PortBinding {
    pub fn new(pin: GrovePin, mode: GroveMode) -> Self {
        Self {
            port: pin.port(),
            pin,
            mode,
        }
    }

    /// Put the port in custom mode and the pin in this binding's mode.
    pub fn configure<T: Transport>(&self, gpg: &mut Driver<T>) -> Result<()> {
        gpg.set_grove_type(self.port, GroveType::Custom)?;
        gpg.set_grove_mode(self.pin, self.mode)
    }

    pub fn read_digital<T: Transport>(&self, gpg: &mut Driver<T>) -> Result<bool> {
        Ok(gpg.get_grove_state(self.pin)? != 0)
    }

    pub fn write_digital<T: Transport>(&self, gpg: &mut Driver<T>, high: bool) -> Result<()> {
        gpg.set_grove_state(self.pin, GroveLevel::from(high))
    }

    /// Raw 12-bit reading.
    pub fn read_analog<T: Transport>(&self, gpg: &mut Driver<T>) -> Result<u16> {
        gpg.get_grove_analog(self.pin)
    }

    /// Volts.
    pub fn read_voltage<T: Transport>(&self, gpg: &mut Driver<T>) -> Result<f64> {
        gpg.get_grove_voltage(self.pin)
    }

    /// Percent, clamped by the driver.
    pub fn write_pwm_duty<T: Transport>(&self, gpg: &mut Driver<T>, duty: f64) -> Result<()> {
        gpg.set_grove_pwm_duty(self.pin, duty)
    }
}
