//! Host-side driver for the GoPiGo3 robot board over SPI.

pub mod binding;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod lock;
pub mod port;
pub mod protocol;
pub mod registry;
pub mod seq;
pub mod transport;

pub use binding::PortBinding;
pub use config::{DriverConfig, I2cTiming, SpiSettings};
pub use driver::{DeviceInfo, Driver, Exchange};
pub use error::{Error, I2cError, LockError, ProtocolError, Result, SensorError, TransportError, ValueError};
pub use lock::{BusLock, BusLockGuard};
pub use port::{GroveMask, GrovePin, GrovePort, Led, LedMask, Motor, MotorMask, Servo, ServoMask};
pub use protocol::Opcode;
pub use protocol::grove::{GroveLevel, GroveMode, GroveType, GroveValue, RemoteKey};
pub use protocol::i2c::I2cTransaction;
pub use protocol::identity::Version;
pub use protocol::motor::MotorStatus;
pub use registry::GroveRegistry;
pub use transport::{SpiTransport, Transport};
