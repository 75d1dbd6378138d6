//! Character LCD module.
//!
//! Provides the 16x2 HD44780 display driver over a PCF8574 I2C
//! backpack, in 4-bit mode with bounded fault recovery.

mod device;
pub mod protocol;

pub use device::CharLcd;
pub use protocol::{Register, Row};
