//! Per-port sensor configuration as last sent to the board.
//!
//! The firmware does not report a port's type back, so the host keeps its
//! own record and uses it to size and decode grove-value reads.

use crate::port::{GroveMask, GrovePin, GrovePort};
use crate::protocol::grove::{GroveMode, GroveType};

/// What the host last configured on one grove port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GroveSlot {
    /// `None` until the port has been given a type.
    pub kind: Option<GroveType>,
    /// Mode of each pin, `None` until set.
    pub modes: [Option<GroveMode>; 2],
    /// Inbound byte count of the last I2C start on this port.
    pub i2c_in_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroveRegistry {
    slots: [GroveSlot; 2],
}

impl GroveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, port: GrovePort) -> &GroveSlot {
        &self.slots[port.index()]
    }

    /// Decode type for a port. Unconfigured ports read as CUSTOM.
    pub fn kind(&self, port: GrovePort) -> GroveType {
        self.slot(port).kind.unwrap_or(GroveType::Custom)
    }

    pub fn mode(&self, pin: GrovePin) -> Option<GroveMode> {
        self.slot(pin.port()).modes[pin.index_in_port()]
    }

    /// Record a type for every port with both pins in `mask`. Returns the
    /// ports updated.
    pub fn set_type(&mut self, mask: GroveMask, kind: GroveType) -> Vec<GrovePort> {
        let ports: Vec<_> = mask.full_ports().collect();
        for &port in &ports {
            self.slots[port.index()].kind = Some(kind);
        }
        ports
    }

    /// Record a mode for every pin in `mask`.
    pub fn set_mode(&mut self, mask: GroveMask, mode: GroveMode) {
        for pin in mask.pins() {
            self.slots[pin.port().index()].modes[pin.index_in_port()] = Some(mode);
        }
    }

    pub fn set_i2c_in_bytes(&mut self, port: GrovePort, n: usize) {
        self.slots[port.index()].i2c_in_bytes = n;
    }

    /// Forget everything, as after a fresh power-up.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
