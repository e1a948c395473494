//! The GoPiGo3 device driver.
//!
//! Owns the transport and the grove registry. One method per firmware
//! operation; no sequencing beyond a single exchange lives here, see
//! [`seq`](crate::seq) for the multi-step routines.

use tracing::{debug, trace};

use crate::codec;
use crate::config::DriverConfig;
use crate::error::{ProtocolError, Result};
use crate::frame::{Reply, Request};
use crate::port::{GroveMask, GrovePin, GrovePort, LedMask, Motor, MotorMask, ServoMask};
use crate::protocol::Opcode;
use crate::protocol::grove::{self, GroveLevel, GroveMode, GroveType, GroveValue};
use crate::protocol::i2c::{self, I2cTransaction};
use crate::protocol::identity::{self, BOARD, FIRMWARE_REQUIRED, ID_LEN, MANUFACTURER, NAME_LEN, Version};
use crate::protocol::motor::{self, MOTOR_FLOAT, MOTOR_STATUS_LEN, MotorStatus};
use crate::registry::GroveRegistry;
use crate::seq;
use crate::transport::Transport;

/// Longest servo pulse the firmware accepts, in microseconds.
pub const SERVO_MAX_US: u16 = 16_666;

/// Grove PWM frequency range in Hz.
pub const PWM_FREQUENCY_MIN: u32 = 3;
pub const PWM_FREQUENCY_MAX: u32 = 48_000;
pub const PWM_FREQUENCY_DEFAULT: u32 = 24_000;

/// One request/reply pair as seen on the wire, for the exchange hook.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub opcode: Opcode,
    pub request: &'a [u8],
    pub reply: &'a [u8],
}

/// What detection found on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub board: String,
    pub firmware: Version,
}

type ExchangeHook = Box<dyn FnMut(&Exchange<'_>) + Send>;

/// A GoPiGo3 on some transport.
///
/// Every bus operation takes `&mut self`. To share one board between
/// threads, put the whole driver behind a `Mutex`.
///
/// # Example
///
/// ```
/// # use gopigo3::{Driver, DriverConfig, Transport, TransportError};
/// # struct Bus;
/// # impl Transport for Bus {
/// #     fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
/// #         buf.fill(0);
/// #         buf[3] = 0xA5;
/// #         Ok(())
/// #     }
/// # }
/// use gopigo3::{GrovePort, GroveType, Motor, MotorMask};
///
/// let mut gpg = Driver::new(Bus, DriverConfig::new().without_detect())?;
/// gpg.set_motor_dps(MotorMask::BOTH, 180.0)?;
/// let status = gpg.get_motor_status(Motor::Left)?;
/// gpg.set_grove_type(GrovePort::One, GroveType::Ultrasonic)?;
/// # let _ = status;
/// # Ok::<(), gopigo3::Error>(())
/// ```
pub struct Driver<T> {
    transport: T,
    config: DriverConfig,
    registry: GroveRegistry,
    /// Called after every exchange with the raw request and reply.
    on_exchange: Option<ExchangeHook>,
}

impl<T: Transport> Driver<T> {
    /// Wrap a transport. Runs detection unless `config.detect` is off.
    pub fn new(transport: T, config: DriverConfig) -> Result<Self> {
        let mut driver = Self {
            transport,
            config,
            registry: GroveRegistry::new(),
            on_exchange: None,
        };
        if driver.config.detect {
            driver.detect()?;
        }
        Ok(driver)
    }

    /// Confirm a genuine board on a compatible firmware line.
    pub fn detect(&mut self) -> Result<DeviceInfo> {
        let address = self.config.address;
        let info = self.read_device_info().map_err(|e| ProtocolError::DeviceUnreachable {
            address,
            source: Box::new(e),
        })?;
        debug!(
            address,
            manufacturer = %info.manufacturer,
            board = %info.board,
            firmware = %info.firmware,
            "detected board"
        );

        if info.manufacturer != MANUFACTURER || info.board != BOARD {
            return Err(ProtocolError::WrongDevice {
                address,
                manufacturer: info.manufacturer,
                board: info.board,
            }
            .into());
        }
        if !info.firmware.compatible_with(FIRMWARE_REQUIRED) {
            return Err(ProtocolError::FirmwareMismatch {
                required: FIRMWARE_REQUIRED,
                found: info.firmware,
            }
            .into());
        }
        Ok(info)
    }

    fn read_device_info(&mut self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            manufacturer: self.get_manufacturer()?,
            board: self.get_board()?,
            firmware: self.get_version_firmware()?,
        })
    }

    /// Register a callback invoked after every exchange.
    pub fn set_on_exchange(&mut self, f: impl FnMut(&Exchange<'_>) + Send + 'static) {
        self.on_exchange = Some(Box::new(f));
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registry(&self) -> &GroveRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // -----------------------------------------------------------------------
    // Identity and power
    // -----------------------------------------------------------------------

    pub fn get_manufacturer(&mut self) -> Result<String> {
        let reply = self.query(Opcode::GetManufacturer, NAME_LEN)?;
        identity::decode_name(reply.data())
    }

    pub fn get_board(&mut self) -> Result<String> {
        let reply = self.query(Opcode::GetName, NAME_LEN)?;
        identity::decode_name(reply.data())
    }

    pub fn get_version_hardware(&mut self) -> Result<Version> {
        let reply = self.query(Opcode::GetHardwareVersion, 4)?;
        Version::decode(reply.data())
    }

    pub fn get_version_firmware(&mut self) -> Result<Version> {
        let reply = self.query(Opcode::GetFirmwareVersion, 4)?;
        Version::decode(reply.data())
    }

    /// Serial number as 32 lowercase hex digits.
    pub fn get_id(&mut self) -> Result<String> {
        let reply = self.query(Opcode::GetId, ID_LEN)?;
        identity::decode_id(reply.data())
    }

    /// 5 V rail in volts.
    pub fn get_voltage_5v(&mut self) -> Result<f64> {
        Ok(f64::from(self.read16(Opcode::GetVoltage5v)?) / 1000.0)
    }

    /// Battery (VCC) in volts.
    pub fn get_voltage_battery(&mut self) -> Result<f64> {
        Ok(f64::from(self.read16(Opcode::GetVoltageVcc)?) / 1000.0)
    }

    // -----------------------------------------------------------------------
    // LEDs and servos
    // -----------------------------------------------------------------------

    pub fn set_led(&mut self, leds: impl Into<LedMask>, red: u8, green: u8, blue: u8) -> Result<()> {
        let leds: LedMask = leds.into();
        self.command(Opcode::SetLed, vec![leds.bits(), red, green, blue])
    }

    /// Pulse width in microseconds, clamped to [`SERVO_MAX_US`]. 0 turns
    /// the output off.
    pub fn set_servo(&mut self, servos: impl Into<ServoMask>, us: u16) -> Result<()> {
        let servos: ServoMask = servos.into();
        let mut payload = vec![servos.bits()];
        codec::write_u16(&mut payload, us.min(SERVO_MAX_US));
        self.command(Opcode::SetServo, payload)
    }

    // -----------------------------------------------------------------------
    // Motors
    // -----------------------------------------------------------------------

    /// PWM power in percent, clamped to -100..=100. [`MOTOR_FLOAT`] coasts.
    pub fn set_motor_power(&mut self, motors: impl Into<MotorMask>, power: i16) -> Result<()> {
        let motors: MotorMask = motors.into();
        let mut payload = vec![motors.bits()];
        codec::write_i8(&mut payload, motor::clamp_power(power));
        self.command(Opcode::SetMotorPwm, payload)
    }

    /// Let the motors coast.
    pub fn set_motor_float(&mut self, motors: impl Into<MotorMask>) -> Result<()> {
        self.set_motor_power(motors, i16::from(MOTOR_FLOAT))
    }

    /// Target position in degrees.
    pub fn set_motor_position(&mut self, motors: impl Into<MotorMask>, degrees: f64) -> Result<()> {
        let motors: MotorMask = motors.into();
        let mut payload = vec![motors.bits()];
        codec::write_i32(&mut payload, motor::degrees_to_ticks(degrees) as i32);
        self.command(Opcode::SetMotorPosition, payload)
    }

    /// Proportional gain of the position controller.
    pub fn set_motor_position_kp(&mut self, motors: impl Into<MotorMask>, kp: u8) -> Result<()> {
        let motors: MotorMask = motors.into();
        self.command(Opcode::SetMotorPositionKp, vec![motors.bits(), kp])
    }

    /// Derivative gain of the position controller.
    pub fn set_motor_position_kd(&mut self, motors: impl Into<MotorMask>, kd: u8) -> Result<()> {
        let motors: MotorMask = motors.into();
        self.command(Opcode::SetMotorPositionKd, vec![motors.bits(), kd])
    }

    /// Target speed in degrees per second.
    pub fn set_motor_dps(&mut self, motors: impl Into<MotorMask>, dps: f64) -> Result<()> {
        let motors: MotorMask = motors.into();
        let mut payload = vec![motors.bits()];
        codec::write_i16(&mut payload, motor::degrees_to_ticks(dps) as i16);
        self.command(Opcode::SetMotorDps, payload)
    }

    /// Power limit in percent (0 = none) and speed limit in degrees per
    /// second (0 = none).
    pub fn set_motor_limits(&mut self, motors: impl Into<MotorMask>, power: u8, dps: f64) -> Result<()> {
        let motors: MotorMask = motors.into();
        let mut payload = vec![motors.bits(), power.min(100)];
        codec::write_u16(&mut payload, motor::degrees_to_ticks(dps) as u16);
        self.command(Opcode::SetMotorLimits, payload)
    }

    pub fn get_motor_status(&mut self, motor: Motor) -> Result<MotorStatus> {
        let opcode = match motor {
            Motor::Left => Opcode::GetMotorStatusLeft,
            Motor::Right => Opcode::GetMotorStatusRight,
        };
        let reply = self.query(opcode, MOTOR_STATUS_LEN)?;
        MotorStatus::decode(reply.data())
    }

    /// Encoder position in degrees.
    pub fn get_motor_encoder(&mut self, motor: Motor) -> Result<i32> {
        let opcode = match motor {
            Motor::Left => Opcode::GetMotorEncoderLeft,
            Motor::Right => Opcode::GetMotorEncoderRight,
        };
        let ticks = codec::sign32(self.read32(opcode)?);
        Ok(motor::ticks_to_degrees(ticks))
    }

    /// Shift the encoder zero by `degrees`. Offsetting by the current
    /// reading zeroes it.
    pub fn offset_motor_encoder(&mut self, motors: impl Into<MotorMask>, degrees: f64) -> Result<()> {
        let motors: MotorMask = motors.into();
        let mut payload = vec![motors.bits()];
        codec::write_i32(&mut payload, motor::degrees_to_ticks(degrees) as i32);
        self.command(Opcode::OffsetMotorEncoder, payload)
    }

    // -----------------------------------------------------------------------
    // Grove configuration
    // -----------------------------------------------------------------------

    /// Configure what a port talks to. Only ports with both pins in `mask`
    /// are recorded in the registry; the frame goes out regardless. Nothing
    /// is recorded if the frame could not be sent.
    pub fn set_grove_type(&mut self, mask: impl Into<GroveMask>, kind: GroveType) -> Result<()> {
        let mask: GroveMask = mask.into();
        self.command(Opcode::SetGroveType, vec![mask.bits(), kind.as_byte()])?;
        let ports = self.registry.set_type(mask, kind);
        debug!(%mask, %kind, ?ports, "grove type");
        Ok(())
    }

    pub fn set_grove_mode(&mut self, mask: impl Into<GroveMask>, mode: GroveMode) -> Result<()> {
        let mask: GroveMask = mask.into();
        self.command(Opcode::SetGroveMode, vec![mask.bits(), mode.as_byte()])?;
        self.registry.set_mode(mask, mode);
        Ok(())
    }

    pub fn set_grove_state(&mut self, mask: impl Into<GroveMask>, level: GroveLevel) -> Result<()> {
        let mask: GroveMask = mask.into();
        self.command(Opcode::SetGroveState, vec![mask.bits(), level.as_byte()])
    }

    /// Duty cycle in percent, clamped to 0..=100, sent in tenths.
    pub fn set_grove_pwm_duty(&mut self, mask: impl Into<GroveMask>, duty: f64) -> Result<()> {
        let mask: GroveMask = mask.into();
        let tenths = (duty.clamp(0.0, 100.0) * 10.0) as u16;
        let mut payload = vec![mask.bits()];
        codec::write_u16(&mut payload, tenths);
        self.command(Opcode::SetGrovePwmDuty, payload)
    }

    /// PWM frequency in Hz, clamped to 3..=48000.
    pub fn set_grove_pwm_frequency(&mut self, mask: impl Into<GroveMask>, hz: u32) -> Result<()> {
        let mask: GroveMask = mask.into();
        let hz = hz.clamp(PWM_FREQUENCY_MIN, PWM_FREQUENCY_MAX) as u16;
        let mut payload = vec![mask.bits()];
        codec::write_u16(&mut payload, hz);
        self.command(Opcode::SetGrovePwmFrequency, payload)
    }

    // -----------------------------------------------------------------------
    // Grove reads
    // -----------------------------------------------------------------------

    /// Read a port, decoded according to its configured type.
    pub fn get_grove_value(&mut self, port: GrovePort) -> Result<GroveValue> {
        let kind = self.registry.kind(port);
        let in_bytes = self.registry.slot(port).i2c_in_bytes;
        let opcode = grove::value_opcode(port);
        let reply = self.query(opcode, kind.value_data_len(in_bytes))?;
        grove::decode_value(kind, opcode, reply.data())
    }

    /// Digital level of an input pin (0 or 1).
    pub fn get_grove_state(&mut self, pin: GrovePin) -> Result<u8> {
        let opcode = grove::state_opcode(pin);
        let reply = self.query(opcode, grove::GROVE_STATE_LEN)?;
        grove::decode_state(opcode, reply.data())
    }

    /// Pin voltage in volts.
    pub fn get_grove_voltage(&mut self, pin: GrovePin) -> Result<f64> {
        let opcode = grove::voltage_opcode(pin);
        let reply = self.query(opcode, grove::GROVE_ANALOG_LEN)?;
        grove::decode_voltage(opcode, reply.data())
    }

    /// Raw 12-bit ADC reading.
    pub fn get_grove_analog(&mut self, pin: GrovePin) -> Result<u16> {
        let opcode = grove::analog_opcode(pin);
        let reply = self.query(opcode, grove::GROVE_ANALOG_LEN)?;
        grove::decode_analog(opcode, reply.data())
    }

    // -----------------------------------------------------------------------
    // Grove I2C
    // -----------------------------------------------------------------------

    /// Send one I2C start frame. Fails with `I2cError::NotReady` if the
    /// firmware is still busy; most callers want
    /// [`grove_i2c_transfer`](Self::grove_i2c_transfer) instead.
    pub fn grove_i2c_start(&mut self, port: GrovePort, tx: &I2cTransaction) -> Result<()> {
        tx.validate()?;
        let opcode = i2c::start_opcode(port);
        let request = Request::query(opcode, i2c::START_REPLY_LEN).with_payload(tx.encode());
        let raw = self.exchange(&request)?;
        let reply = Reply::parse(opcode, raw)?;
        i2c::decode_start(reply.data())?;
        self.registry.set_i2c_in_bytes(port, tx.in_len);
        Ok(())
    }

    /// Write `out` to the device at `address` on `port`, then read `in_len`
    /// bytes back. The port must be configured as [`GroveType::I2c`].
    pub fn grove_i2c_transfer(
        &mut self,
        port: GrovePort,
        address: u8,
        out: &[u8],
        in_len: usize,
    ) -> Result<Vec<u8>> {
        seq::i2c_transfer(self, port, &I2cTransaction::new(address, out, in_len))
    }

    /// Put the board back in its power-up state: grove ports custom and
    /// digital input, motors floating with no limits, servos and user LEDs off.
    pub fn reset_all(&mut self) -> Result<()> {
        seq::reset_all(self)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Clock one frame through the transport and hand back the raw reply.
    fn exchange(&mut self, request: &Request) -> Result<Vec<u8>> {
        let wire = request.encode(self.config.address);
        let mut buf = wire.clone();
        self.transport.transfer(&mut buf)?;
        trace!(
            opcode = %request.opcode,
            tx = %codec::hex_dump(&wire),
            rx = %codec::hex_dump(&buf),
            "spi exchange"
        );
        if let Some(cb) = self.on_exchange.as_mut() {
            cb(&Exchange {
                opcode: request.opcode,
                request: &wire,
                reply: &buf,
            });
        }
        Ok(buf)
    }

    /// Write-only command. The reply carries nothing and is not checked.
    fn command(&mut self, opcode: Opcode, payload: Vec<u8>) -> Result<()> {
        self.exchange(&Request::command(opcode, payload))?;
        Ok(())
    }

    /// Read with `data_len` bytes expected after the sentinel.
    fn query(&mut self, opcode: Opcode, data_len: usize) -> Result<Reply> {
        let raw = self.exchange(&Request::query(opcode, data_len))?;
        Reply::parse(opcode, raw)
    }

    fn read16(&mut self, opcode: Opcode) -> Result<u16> {
        let reply = self.query(opcode, 2)?;
        codec::read16(reply.data(), 0)
    }

    fn read32(&mut self, opcode: Opcode) -> Result<u32> {
        let reply = self.query(opcode, 4)?;
        codec::read32(reply.data(), 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::{Error, I2cError, SensorError, ValueError};
    use crate::port::{Led, Servo};
    use crate::transport::mock::{MockBus, name};

    fn driver() -> Driver<MockBus> {
        Driver::new(MockBus::new(), DriverConfig::new().without_detect()).unwrap()
    }

    fn last(gpg: &Driver<MockBus>) -> Vec<u8> {
        gpg.transport().sent.last().cloned().unwrap()
    }

    // --- detection ---

    #[test]
    fn detects_genuine_board() {
        let mut gpg = Driver::new(MockBus::genuine(), DriverConfig::default()).unwrap();
        assert_eq!(gpg.transport().opcodes(), vec![1, 2, 4]);
        assert_eq!(gpg.transport().sent[0].len(), 24);

        gpg.transport_mut().reply(Opcode::GetManufacturer, &name(MANUFACTURER));
        gpg.transport_mut().reply(Opcode::GetName, &name(BOARD));
        gpg.transport_mut().reply(Opcode::GetFirmwareVersion, &3_004u32.to_be_bytes());
        let info = gpg.detect().unwrap();
        assert_eq!(info.firmware, Version::new(0, 3, 4));
    }

    #[test]
    fn detection_can_be_skipped() {
        let gpg = driver();
        assert!(gpg.transport().sent.is_empty());
    }

    #[test]
    fn wrong_board_rejected() {
        let mut bus = MockBus::new();
        bus.reply(Opcode::GetManufacturer, &name(MANUFACTURER));
        bus.reply(Opcode::GetName, &name("BrickPi3"));
        bus.reply(Opcode::GetFirmwareVersion, &3_004u32.to_be_bytes());
        let err = Driver::new(bus, DriverConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::WrongDevice { address: 8, ref board, .. }) if board == "BrickPi3"
        ));
    }

    #[test]
    fn firmware_major_minor_must_match() {
        let mut bus = MockBus::new();
        bus.reply(Opcode::GetManufacturer, &name(MANUFACTURER));
        bus.reply(Opcode::GetName, &name(BOARD));
        bus.reply(Opcode::GetFirmwareVersion, &1_000_002u32.to_be_bytes());
        let err = Driver::new(bus, DriverConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::FirmwareMismatch { found, .. }) if found == Version::new(1, 0, 2)
        ));
    }

    #[test]
    fn silent_bus_is_unreachable() {
        let mut bus = MockBus::new();
        bus.reply_raw(Opcode::GetManufacturer, &[0xFF; 24]);
        let err = Driver::new(bus, DriverConfig::new().with_address(10)).err().unwrap();
        match err {
            Error::Protocol(ProtocolError::DeviceUnreachable { address, source }) => {
                assert_eq!(address, 10);
                assert!(matches!(
                    *source,
                    Error::Protocol(ProtocolError::NoResponse { opcode: Opcode::GetManufacturer, .. })
                ));
            }
            other => panic!("expected DeviceUnreachable, got {other:?}"),
        }
    }

    #[test]
    fn transport_failure_is_unreachable() {
        let mut bus = MockBus::new();
        bus.fail(Opcode::GetManufacturer);
        assert!(matches!(
            Driver::new(bus, DriverConfig::default()),
            Err(Error::Protocol(ProtocolError::DeviceUnreachable { .. }))
        ));
    }

    // --- frames ---

    #[test]
    fn address_is_byte_zero() {
        let mut gpg =
            Driver::new(MockBus::new(), DriverConfig::new().with_address(0x0A).without_detect()).unwrap();
        gpg.set_led(Led::Wifi, 0, 0, 255).unwrap();
        assert_eq!(last(&gpg), vec![0x0A, 6, 0x80, 0, 0, 255]);
    }

    #[test]
    fn query_without_sentinel_fails() {
        let mut gpg = driver();
        gpg.transport_mut().reply_raw(Opcode::GetVoltageVcc, &[0, 0, 0, 0x00, 0x2E, 0xE0]);
        assert!(matches!(
            gpg.get_voltage_battery(),
            Err(Error::Protocol(ProtocolError::NoResponse { opcode: Opcode::GetVoltageVcc, .. }))
        ));
    }

    fn is_no_response<V>(result: Result<V>, expected: Opcode) -> bool {
        matches!(
            result,
            Err(Error::Protocol(ProtocolError::NoResponse { opcode, .. })) if opcode == expected
        )
    }

    #[test]
    fn typed_reads_check_sentinel_first() {
        let mut gpg = driver();
        gpg.set_grove_type(GrovePort::One, GroveType::Ultrasonic).unwrap();
        gpg.set_grove_type(GrovePort::Two, GroveType::I2c).unwrap();
        // A plausible distance and a valid I2C payload, but no sentinel.
        gpg.transport_mut()
            .reply_raw(Opcode::GetGroveValue1, &[0, 0, 0, 0x00, 4, 0, 0, 250])
            .reply_raw(Opcode::GetGroveValue2, &[0, 0, 0, 0x5A, 5, 0, 0xAB])
            .reply_raw(Opcode::GetMotorStatusLeft, &[0, 0, 0, 0xFF, 0, 50])
            .reply_raw(Opcode::GetId, &[0; 20])
            .reply_raw(Opcode::GetMotorEncoderRight, &[0, 0, 0, 0xA4, 0, 0, 0, 2]);

        assert!(is_no_response(gpg.get_grove_value(GrovePort::One), Opcode::GetGroveValue1));
        assert!(is_no_response(gpg.get_grove_value(GrovePort::Two), Opcode::GetGroveValue2));
        assert!(is_no_response(gpg.get_motor_status(Motor::Left), Opcode::GetMotorStatusLeft));
        assert!(is_no_response(gpg.get_id(), Opcode::GetId));
        assert!(is_no_response(gpg.get_motor_encoder(Motor::Right), Opcode::GetMotorEncoderRight));
    }

    #[test]
    fn i2c_start_checks_sentinel() {
        let mut gpg = driver();
        // Status 0 would mean accepted if the reply were trusted.
        gpg.transport_mut().reply_raw(Opcode::StartGroveI2c1, &[0; 8]);
        let tx = I2cTransaction::new(0x24, &[0x01], 4);
        assert!(is_no_response(gpg.grove_i2c_start(GrovePort::One, &tx), Opcode::StartGroveI2c1));
        assert_eq!(gpg.registry().slot(GrovePort::One).i2c_in_bytes, 0);
    }

    #[test]
    fn voltages_in_volts() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::GetVoltage5v, &[0x13, 0x88]);
        gpg.transport_mut().reply(Opcode::GetVoltageVcc, &[0x2E, 0xE0]);
        assert_eq!(gpg.get_voltage_5v().unwrap(), 5.0);
        assert_eq!(gpg.get_voltage_battery().unwrap(), 12.0);
    }

    #[test]
    fn serial_id() {
        let mut gpg = driver();
        let id: Vec<u8> = (0xF0..=0xFF).collect();
        gpg.transport_mut().reply(Opcode::GetId, &id);
        assert_eq!(gpg.get_id().unwrap(), "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
        assert_eq!(last(&gpg).len(), 20);
    }

    #[test]
    fn hardware_version() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::GetHardwareVersion, &3_001_000u32.to_be_bytes());
        assert_eq!(gpg.get_version_hardware().unwrap(), Version::new(3, 1, 0));
    }

    #[test]
    fn servo_pulse_clamped() {
        let mut gpg = driver();
        gpg.set_servo(Servo::One | Servo::Two, 20_000).unwrap();
        assert_eq!(last(&gpg), vec![8, 9, 0x03, 0x41, 0x1A]);
        gpg.set_servo(Servo::Two, 1500).unwrap();
        assert_eq!(last(&gpg), vec![8, 9, 0x02, 0x05, 0xDC]);
    }

    #[test]
    fn motor_power_clamped() {
        let mut gpg = driver();
        gpg.set_motor_power(Motor::Left, 250).unwrap();
        assert_eq!(last(&gpg), vec![8, 10, 1, 100]);
        gpg.set_motor_power(Motor::Right, -250).unwrap();
        assert_eq!(last(&gpg), vec![8, 10, 2, (-100i8) as u8]);
        gpg.set_motor_float(MotorMask::BOTH).unwrap();
        assert_eq!(last(&gpg), vec![8, 10, 3, 0x80]);
    }

    #[test]
    fn motor_targets_in_ticks() {
        let mut gpg = driver();
        gpg.set_motor_position(Motor::Left, 90.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 11, 1, 0, 0, 0, 180]);
        gpg.set_motor_position(Motor::Left, -1.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 11, 1, 0xFF, 0xFF, 0xFF, 0xFE]);
        gpg.set_motor_dps(MotorMask::BOTH, -90.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 14, 3, 0xFF, 0x4C]);
        gpg.offset_motor_encoder(Motor::Right, 360.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 16, 2, 0, 0, 0x02, 0xD0]);
    }

    #[test]
    fn position_gains() {
        let mut gpg = driver();
        gpg.set_motor_position_kp(MotorMask::BOTH, 25).unwrap();
        assert_eq!(last(&gpg), vec![8, 12, 3, 25]);
        gpg.set_motor_position_kd(Motor::Left, 70).unwrap();
        assert_eq!(last(&gpg), vec![8, 13, 1, 70]);
    }

    #[test]
    fn cleared_limits_then_idle_status() {
        let mut gpg = driver();
        gpg.set_motor_limits(MotorMask::BOTH, 0, 0.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 15, 3, 0, 0, 0]);

        let status = gpg.get_motor_status(Motor::Left).unwrap();
        assert_eq!(last(&gpg).len(), 12);
        assert_eq!(status.encoder, 0);
        assert_eq!(status.dps, 0);
        assert!((-100..=100).contains(&status.power));
    }

    #[test]
    fn motor_limits_clamped() {
        let mut gpg = driver();
        gpg.set_motor_limits(Motor::Left, 200, 500.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 15, 1, 100, 0x03, 0xE8]);
    }

    #[test]
    fn motor_status_decoded() {
        let mut gpg = driver();
        let mut data = vec![0x01, 50];
        codec::write_i32(&mut data, -720);
        codec::write_i16(&mut data, 360);
        gpg.transport_mut().reply(Opcode::GetMotorStatusRight, &data);
        let status = gpg.get_motor_status(Motor::Right).unwrap();
        assert!(status.flags.low_voltage_float());
        assert_eq!(status.power, 50);
        assert_eq!(status.encoder, -360);
        assert_eq!(status.dps, 180);
    }

    #[test]
    fn encoder_uses_dedicated_opcode() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::GetMotorEncoderLeft, &(-10i32).to_be_bytes());
        assert_eq!(gpg.get_motor_encoder(Motor::Left).unwrap(), -5);
        assert_eq!(last(&gpg), vec![8, 17, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn pwm_duty_and_frequency_clamped() {
        let mut gpg = driver();
        gpg.set_grove_pwm_duty(GrovePin::Pin1_1, 150.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 24, 0x01, 0x03, 0xE8]);
        gpg.set_grove_pwm_duty(GrovePin::Pin1_1, -3.0).unwrap();
        assert_eq!(last(&gpg), vec![8, 24, 0x01, 0, 0]);
        gpg.set_grove_pwm_duty(GrovePin::Pin2_1, 12.34).unwrap();
        assert_eq!(last(&gpg), vec![8, 24, 0x04, 0, 123]);

        gpg.set_grove_pwm_frequency(GrovePort::One, 1).unwrap();
        assert_eq!(last(&gpg), vec![8, 25, 0x03, 0, 3]);
        gpg.set_grove_pwm_frequency(GrovePort::Two, 100_000).unwrap();
        assert_eq!(last(&gpg), vec![8, 25, 0x0C, 0xBB, 0x80]);
    }

    #[test]
    fn grove_state_frame() {
        let mut gpg = driver();
        gpg.set_grove_state(GrovePin::Pin1_1 | GrovePin::Pin2_1, GroveLevel::High).unwrap();
        assert_eq!(last(&gpg), vec![8, 23, 0x05, 1]);
    }

    // --- grove reads ---

    #[test]
    fn unconfigured_port_reads_one_byte() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::GetGroveValue2, &[42]);
        assert_eq!(gpg.get_grove_value(GrovePort::Two).unwrap(), GroveValue::Raw(42));
        assert_eq!(last(&gpg).len(), 5);
    }

    #[test]
    fn ultrasonic_port() {
        let mut gpg = driver();
        gpg.set_grove_type(GrovePort::One, GroveType::Ultrasonic).unwrap();
        assert_eq!(last(&gpg), vec![8, 21, 0x03, 4]);

        gpg.transport_mut()
            .reply(Opcode::GetGroveValue1, &[4, 0, 0, 250])
            .reply(Opcode::GetGroveValue1, &[4, 0, 0, 1])
            .reply(Opcode::GetGroveValue1, &[4, 0, 0, 0]);
        assert_eq!(gpg.get_grove_value(GrovePort::One).unwrap(), GroveValue::Distance(250));
        assert_eq!(last(&gpg).len(), 8);
        assert!(matches!(
            gpg.get_grove_value(GrovePort::One),
            Err(Error::Value(ValueError::NoObject))
        ));
        assert!(matches!(
            gpg.get_grove_value(GrovePort::One),
            Err(Error::Sensor(SensorError::NotResponding))
        ));
    }

    #[test]
    fn half_port_type_not_recorded() {
        let mut gpg = driver();
        gpg.set_grove_type(GrovePin::Pin1_1, GroveType::Ultrasonic).unwrap();
        assert_eq!(gpg.registry().kind(GrovePort::One), GroveType::Custom);
        assert_eq!(last(&gpg), vec![8, 21, 0x01, 4]);
    }

    #[test]
    fn pin_reads() {
        let mut gpg = driver();
        gpg.transport_mut()
            .reply(Opcode::GetGroveState2_1, &[0, 1])
            .reply(Opcode::GetGroveVoltage1_1, &[0, 0x0C, 0xE4])
            .reply(Opcode::GetGroveAnalog1_2, &[0, 0x08, 0x00])
            .reply(Opcode::GetGroveAnalog1_2, &[3, 0, 0]);
        assert_eq!(gpg.get_grove_state(GrovePin::Pin2_1).unwrap(), 1);
        assert_eq!(last(&gpg).len(), 6);
        assert_eq!(gpg.get_grove_voltage(GrovePin::Pin1_1).unwrap(), 3.3);
        assert_eq!(last(&gpg).len(), 7);
        assert_eq!(gpg.get_grove_analog(GrovePin::Pin1_2).unwrap(), 2048);
        assert!(matches!(
            gpg.get_grove_analog(GrovePin::Pin1_2),
            Err(Error::Value(ValueError::InvalidValue { status: 3, .. }))
        ));
    }

    #[test]
    fn mode_recorded() {
        let mut gpg = driver();
        gpg.set_grove_mode(GrovePin::Pin1_2, GroveMode::InputAnalog).unwrap();
        assert_eq!(last(&gpg), vec![8, 22, 0x02, 4]);
        assert_eq!(gpg.registry().mode(GrovePin::Pin1_2), Some(GroveMode::InputAnalog));
    }

    #[test]
    fn failed_configure_leaves_registry_alone() {
        let mut gpg = driver();
        gpg.set_grove_type(GrovePort::Two, GroveType::I2c).unwrap();
        gpg.transport_mut()
            .fail(Opcode::SetGroveType)
            .fail(Opcode::SetGroveMode);

        assert!(matches!(
            gpg.set_grove_type(GrovePort::One | GrovePort::Two, GroveType::Ultrasonic),
            Err(Error::Transport(_))
        ));
        assert_eq!(gpg.registry().slot(GrovePort::One).kind, None);
        assert_eq!(gpg.registry().kind(GrovePort::One), GroveType::Custom);
        assert_eq!(gpg.registry().kind(GrovePort::Two), GroveType::I2c);

        assert!(gpg.set_grove_mode(GrovePin::Pin1_1, GroveMode::OutputPwm).is_err());
        assert_eq!(gpg.registry().mode(GrovePin::Pin1_1), None);

        // Reads are still sized for the type the board actually has.
        gpg.transport_mut().reply(Opcode::GetGroveValue1, &[7]);
        assert_eq!(gpg.get_grove_value(GrovePort::One).unwrap(), GroveValue::Raw(7));
        assert_eq!(last(&gpg).len(), 5);
    }

    // --- I2C start ---

    #[test]
    fn i2c_start_frame() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::StartGroveI2c2, &[0]);
        let tx = I2cTransaction::new(0x24, &[0xAA, 0xBB], 3);
        gpg.grove_i2c_start(GrovePort::Two, &tx).unwrap();
        assert_eq!(last(&gpg), vec![8, 41, 0x48, 3, 2, 0xAA, 0xBB]);
        assert_eq!(gpg.registry().slot(GrovePort::Two).i2c_in_bytes, 3);
    }

    #[test]
    fn i2c_start_not_ready() {
        let mut gpg = driver();
        gpg.transport_mut().reply(Opcode::StartGroveI2c1, &[1]);
        let tx = I2cTransaction::new(0x24, &[], 1);
        assert!(matches!(
            gpg.grove_i2c_start(GrovePort::One, &tx),
            Err(Error::I2c(I2cError::NotReady { status: 1 }))
        ));
    }

    #[test]
    fn i2c_length_checked_before_traffic() {
        let mut gpg = driver();
        let tx = I2cTransaction::new(0x24, &[0; 17], 0);
        assert!(matches!(
            gpg.grove_i2c_start(GrovePort::One, &tx),
            Err(Error::LengthLimit { .. })
        ));
        assert!(gpg.transport().sent.is_empty());
    }

    // --- hook ---

    #[test]
    fn exchange_hook_sees_every_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut gpg = driver();
        let sink = Arc::clone(&seen);
        gpg.set_on_exchange(move |ex| {
            sink.lock().unwrap().push((ex.opcode, ex.request.to_vec(), ex.reply[3]));
        });
        gpg.set_led(Led::EyeLeft, 1, 2, 3).unwrap();
        gpg.transport_mut().reply(Opcode::GetVoltage5v, &[0x13, 0x88]);
        gpg.get_voltage_5v().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (Opcode::SetLed, vec![8, 6, 0x02, 1, 2, 3], 0xA5));
        assert_eq!(seen[1].0, Opcode::GetVoltage5v);
    }
}
