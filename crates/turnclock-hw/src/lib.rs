//! Turnclock Hardware Library
//!
//! Provides hardware abstraction for the turn timer peripherals: a 16x2
//! HD44780 character LCD behind a PCF8574 I2C backpack, a three-LED
//! indicator bank, and a debounced push-button trigger.

pub mod bus;
pub mod button;
pub mod error;
pub mod lcd;
pub mod leds;

pub use bus::{BusChannel, I2cChannel};
pub use button::TriggerButton;
pub use error::{Error, Result};
pub use lcd::{CharLcd, Row};
pub use leds::{Band, GpioLine, IndicatorBank, IndicatorLine, Thresholds};

/// LCD display dimensions
pub const LCD_COLS: usize = 16;
pub const LCD_ROWS: usize = 2;

/// Common PCF8574 backpack addresses
pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;
pub const ALT_I2C_ADDRESS: u8 = 0x3F;
