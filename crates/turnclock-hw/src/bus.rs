//! I2C bus channel.
//!
//! Owns the physical bus handle and exposes raw byte writes to the
//! fixed expander address. Retry policy lives in the display driver,
//! not here: a failed write simply surfaces as a transport fault.

use std::thread;
use std::time::Duration;

use rppal::i2c::I2c;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Expander settle time after each bus write.
const POST_WRITE_SETTLE: Duration = Duration::from_micros(100);

/// Raw byte transport to a single bus device.
///
/// Implemented by [`I2cChannel`] for real hardware and by test fakes
/// for fault injection.
pub trait BusChannel {
    /// Sends one byte to the device. Fails with [`Error::Transport`]
    /// on any I/O error.
    fn write_byte(&mut self, value: u8) -> Result<()>;

    /// Releases the current bus handle and acquires a fresh one.
    ///
    /// Never fails: if the underlying open fails, the fault surfaces
    /// on the next [`BusChannel::write_byte`].
    fn reopen(&mut self);
}

/// I2C channel bound to a fixed bus index and 7-bit device address.
#[derive(Debug)]
pub struct I2cChannel {
    bus_index: u8,
    address: u8,
    // Replaced wholesale on reopen; None after a failed reopen.
    handle: Option<I2c>,
}

impl I2cChannel {
    /// Opens the given I2C bus and binds the device address.
    pub fn open(bus_index: u8, address: u8) -> Result<Self> {
        if address >= 0x80 {
            return Err(Error::InvalidAddress(address));
        }
        let handle = Self::acquire(bus_index, address)?;
        debug!("I2C channel open (bus {}, address {:#04x})", bus_index, address);
        Ok(Self {
            bus_index,
            address,
            handle: Some(handle),
        })
    }

    /// Returns the bound device address.
    pub fn address(&self) -> u8 {
        self.address
    }

    fn acquire(bus_index: u8, address: u8) -> Result<I2c> {
        let mut i2c = I2c::with_bus(bus_index).map_err(Error::transport)?;
        i2c.set_slave_address(u16::from(address))
            .map_err(Error::transport)?;
        Ok(i2c)
    }
}

impl BusChannel for I2cChannel {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::transport("bus handle unavailable after failed reopen"))?;
        handle.smbus_send_byte(value).map_err(Error::transport)?;
        thread::sleep(POST_WRITE_SETTLE);
        Ok(())
    }

    fn reopen(&mut self) {
        // Dropping the old handle releases it; rppal close is infallible.
        self.handle = None;
        match Self::acquire(self.bus_index, self.address) {
            Ok(handle) => {
                debug!("I2C channel reopened (bus {})", self.bus_index);
                self.handle = Some(handle);
            }
            Err(e) => {
                // Leave the handle empty; the next write reports the fault.
                warn!("I2C reopen failed (bus {}): {}", self.bus_index, e);
            }
        }
    }
}
