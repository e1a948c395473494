//! Multi-step routines built from single driver exchanges.
//!
//! - [`i2c_transfer`]: start, settle, poll. Both bounded waits are wall-clock
//!   deadlines, so a slow host shortens the number of attempts rather than
//!   stretching the wait.
//! - [`reset_all`]: return every output to its power-up state.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::driver::Driver;
use crate::error::{I2cError, Result, SensorError, ValueError};
use crate::lock::BusLock;
use crate::port::{GroveMask, GrovePort, LedMask, MotorMask, ServoMask};
use crate::protocol::grove::{GroveMode, GroveType, GroveValue};
use crate::protocol::i2c::I2cTransaction;
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// I2C passthrough
// ---------------------------------------------------------------------------

/// Run one I2C transaction through a grove port and return the bytes read.
///
/// The port must already be configured as [`GroveType::I2c`]. If the driver
/// has a lock path configured, the whole transaction runs under the bus lock.
pub fn i2c_transfer<T: Transport>(
    gpg: &mut Driver<T>,
    port: GrovePort,
    tx: &I2cTransaction,
) -> Result<Vec<u8>> {
    tx.validate()?;
    let kind = gpg.registry().kind(port);
    if kind != GroveType::I2c {
        return Err(SensorError::TypeMismatch {
            expected: GroveType::I2c,
            got: kind.as_byte(),
        }
        .into());
    }

    let timing = gpg.config().i2c;
    let _guard = match gpg.config().lock_path.clone() {
        Some(path) => Some(BusLock::new(path).acquire_timeout(timing.lock_timeout)?),
        None => None,
    };

    start(gpg, port, tx, timing.start_timeout)?;
    thread::sleep(tx.settle_delay(timing.byte_time));

    match poll(gpg, port, timing.poll_timeout)? {
        GroveValue::I2c(bytes) => Ok(bytes),
        other => {
            // Decode follows the registry type checked above.
            debug!(%port, ?other, "unexpected grove value during I2C poll");
            Err(SensorError::TypeMismatch {
                expected: GroveType::I2c,
                got: gpg.registry().kind(port).as_byte(),
            }
            .into())
        }
    }
}

/// Retry the start frame until the firmware accepts it.
fn start<T: Transport>(
    gpg: &mut Driver<T>,
    port: GrovePort,
    tx: &I2cTransaction,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match gpg.grove_i2c_start(port, tx) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() => {
                if Instant::now() >= deadline {
                    debug!(%port, attempts, "I2C start gave up");
                    return Err(I2cError::StartTimeout { timeout }.into());
                }
                debug!(%port, attempts, error = %e, "I2C start retry");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read the port until the result is in. Bus errors are final.
fn poll<T: Transport>(gpg: &mut Driver<T>, port: GrovePort, timeout: Duration) -> Result<GroveValue> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match gpg.get_grove_value(port) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if Instant::now() >= deadline {
                    debug!(%port, attempts, "I2C poll gave up");
                    return Err(ValueError::ReadTimeout { timeout }.into());
                }
                debug!(%port, attempts, error = %e, "I2C poll retry");
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

/// Grove ports custom and digital input, motors floating with limits
/// cleared, servos off, user LEDs off. The WiFi LED is left alone.
pub fn reset_all<T: Transport>(gpg: &mut Driver<T>) -> Result<()> {
    gpg.set_grove_type(GroveMask::BOTH_PORTS, GroveType::Custom)?;
    gpg.set_grove_mode(GroveMask::BOTH_PORTS, GroveMode::InputDigital)?;
    gpg.set_motor_float(MotorMask::BOTH)?;
    gpg.set_motor_limits(MotorMask::BOTH, 0, 0.0)?;
    gpg.set_servo(ServoMask::BOTH, 0)?;
    gpg.set_led(LedMask::USER, 0, 0, 0)?;
    debug!("board reset");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
