//! The byte-exchange seam under the driver.
//!
//! One call clocks `buf.len()` bytes out and the same number back in, in
//! place. Nothing here knows about opcodes or sentinels.

use embedded_hal::spi::{Error as _, SpiDevice};

use crate::error::TransportError;

/// A synchronous full-duplex exchange.
pub trait Transport {
    /// Send `buf` and overwrite it with the bytes received.
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).transfer(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).transfer(buf)
    }
}

/// Adapts any `embedded-hal` SPI device.
///
/// The device must already be configured for the board: 500 kHz, mode 0,
/// 8-bit words, chip select held for the whole transfer (see
/// [`SpiSettings`](crate::config::SpiSettings)).
#[derive(Debug)]
pub struct SpiTransport<D> {
    device: D,
}

impl<D: SpiDevice> SpiTransport<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: SpiDevice> Transport for SpiTransport<D> {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.device
            .transfer_in_place(buf)
            .map_err(|e| TransportError::Spi(e.kind()))
    }
}

// ---------------------------------------------------------------------------
// Test mock
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::io;

    use super::Transport;
    use crate::error::TransportError;
    use crate::protocol::identity::{BOARD, MANUFACTURER, NAME_LEN};
    use crate::protocol::{Opcode, SENTINEL, SENTINEL_INDEX};

    /// Scripted reply for one exchange.
    #[derive(Debug, Clone)]
    pub(crate) enum Scripted {
        /// Valid reply: sentinel plus these data bytes.
        Data(Vec<u8>),
        /// Whole reply buffer, sentinel included (or not).
        Raw(Vec<u8>),
        /// Transport failure.
        Fail,
    }

    /// Records every outgoing frame and answers from per-opcode scripts.
    /// Unscripted exchanges get an empty valid reply.
    #[derive(Debug, Default)]
    pub(crate) struct MockBus {
        pub sent: Vec<Vec<u8>>,
        scripts: HashMap<u8, VecDeque<Scripted>>,
        /// Used once an opcode's script runs dry.
        sticky: HashMap<u8, Scripted>,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// A bus answering detection like a genuine board on firmware 0.3.4.
        pub fn genuine() -> Self {
            let mut bus = Self::new();
            bus.reply(Opcode::GetManufacturer, &name(MANUFACTURER));
            bus.reply(Opcode::GetName, &name(BOARD));
            bus.reply(Opcode::GetFirmwareVersion, &3_004u32.to_be_bytes());
            bus
        }

        pub fn push(&mut self, opcode: Opcode, reply: Scripted) -> &mut Self {
            self.scripts
                .entry(opcode.as_byte())
                .or_default()
                .push_back(reply);
            self
        }

        /// Answer every unscripted exchange of `opcode` with `reply`.
        pub fn always(&mut self, opcode: Opcode, reply: Scripted) -> &mut Self {
            self.sticky.insert(opcode.as_byte(), reply);
            self
        }

        pub fn reply(&mut self, opcode: Opcode, data: &[u8]) -> &mut Self {
            self.push(opcode, Scripted::Data(data.to_vec()))
        }

        pub fn reply_raw(&mut self, opcode: Opcode, raw: &[u8]) -> &mut Self {
            self.push(opcode, Scripted::Raw(raw.to_vec()))
        }

        pub fn fail(&mut self, opcode: Opcode) -> &mut Self {
            self.push(opcode, Scripted::Fail)
        }

        /// Opcode byte of every frame sent, in order.
        pub fn opcodes(&self) -> Vec<u8> {
            self.sent.iter().map(|f| f[1]).collect()
        }

        /// Frames sent with the given opcode.
        pub fn frames(&self, opcode: Opcode) -> Vec<&Vec<u8>> {
            self.sent
                .iter()
                .filter(|f| f[1] == opcode.as_byte())
                .collect()
        }
    }

    impl Transport for MockBus {
        fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
            self.sent.push(buf.to_vec());
            let next = self
                .scripts
                .get_mut(&buf[1])
                .and_then(|q| q.pop_front())
                .or_else(|| self.sticky.get(&buf[1]).cloned());
            buf.fill(0);
            match next {
                Some(Scripted::Fail) => {
                    return Err(TransportError::Io(io::Error::other("mock bus failure")));
                }
                Some(Scripted::Raw(raw)) => {
                    let n = raw.len().min(buf.len());
                    buf[..n].copy_from_slice(&raw[..n]);
                }
                Some(Scripted::Data(data)) => {
                    if buf.len() > SENTINEL_INDEX {
                        buf[SENTINEL_INDEX] = SENTINEL;
                        let body = &mut buf[SENTINEL_INDEX + 1..];
                        let n = data.len().min(body.len());
                        body[..n].copy_from_slice(&data[..n]);
                    }
                }
                None => {
                    if buf.len() > SENTINEL_INDEX {
                        buf[SENTINEL_INDEX] = SENTINEL;
                    }
                }
            }
            Ok(())
        }
    }

    /// A zero-padded name slot.
    pub(crate) fn name(s: &str) -> Vec<u8> {
        let mut data = s.as_bytes().to_vec();
        data.resize(NAME_LEN, 0);
        data
    }
}
