//! HD44780 protocol definitions and 4-bit nibble framing.
//!
//! The controller sits behind a PCF8574 expander, so every transmitted
//! byte carries both a 4-bit data nibble and the control lines:
//!
//! - bits 7..4: data nibble
//! - bit 3: backlight (always set; latched through the same byte)
//! - bit 2: enable strobe
//! - bit 1: read/write (always write, never set)
//! - bit 0: register select (0 = command, 1 = character data)

use std::time::Duration;

/// Controller commands.
pub const CLEAR_DISPLAY: u8 = 0x01;
pub const RETURN_HOME: u8 = 0x02;
pub const ENTRY_MODE_SET: u8 = 0x04;
pub const DISPLAY_CONTROL: u8 = 0x08;
pub const FUNCTION_SET: u8 = 0x20;
pub const SET_DDRAM_ADDR: u8 = 0x80;

/// Entry mode: increment cursor position on write. The display-shift
/// bit (0x01) must stay clear or text scrolls on every character.
pub const ENTRY_INCREMENT: u8 = 0x02;

/// Display control flags.
pub const DISPLAY_ON: u8 = 0x04;
pub const CURSOR_OFF: u8 = 0x00;
pub const BLINK_OFF: u8 = 0x00;

/// Function set flags.
pub const FOUR_BIT_MODE: u8 = 0x00;
pub const TWO_LINE: u8 = 0x08;
pub const FONT_5X8: u8 = 0x00;

/// Expander control bits.
pub const BACKLIGHT: u8 = 0x08;
pub const ENABLE: u8 = 0x04;
pub const READ_WRITE: u8 = 0x02;
pub const REGISTER_SELECT: u8 = 0x01;

/// Enable pulse width; the controller samples the nibble on the
/// falling edge and needs the line held this long.
pub const STROBE_HOLD: Duration = Duration::from_micros(500);

/// Settle time after the enable line is deasserted.
pub const STROBE_SETTLE: Duration = Duration::from_micros(100);

/// Busy time of the clear/home commands; a write during this window
/// is undefined behavior on real hardware.
pub const CLEAR_SETTLE: Duration = Duration::from_millis(2);

/// Worst-case vendor power-on requirement after initialization.
pub const INIT_SETTLE: Duration = Duration::from_millis(200);

/// One of the two fixed 16-character text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    One,
    Two,
}

impl Row {
    /// DDRAM base address of this row.
    pub fn base_address(self) -> u8 {
        match self {
            Row::One => 0x00,
            Row::Two => 0x40,
        }
    }
}

/// Register the framed byte targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Instruction register.
    Command,
    /// Character data register.
    Data,
}

impl Register {
    fn select_bit(self) -> u8 {
        match self {
            Register::Command => 0,
            Register::Data => REGISTER_SELECT,
        }
    }
}

/// Frames one logical byte as the six bus bytes that carry it in 4-bit
/// mode: high nibble then low nibble, each written plain, with the
/// enable strobe asserted, and with the strobe cleared. The backlight
/// bit is set on every byte.
pub fn encode_byte(value: u8, register: Register) -> [u8; 6] {
    let high = (value & 0xF0) | register.select_bit();
    let low = ((value << 4) & 0xF0) | register.select_bit();
    [
        high | BACKLIGHT,
        high | ENABLE | BACKLIGHT,
        high | BACKLIGHT,
        low | BACKLIGHT,
        low | ENABLE | BACKLIGHT,
        low | BACKLIGHT,
    ]
}

/// Pads or truncates text to exactly one 16-character row.
///
/// Always emitting the full row guarantees no stale characters persist
/// from a shorter previous write.
pub fn pad_row(text: &str) -> [u8; crate::LCD_COLS] {
    let mut row = [b' '; crate::LCD_COLS];
    for (slot, ch) in row.iter_mut().zip(text.bytes()) {
        *slot = ch;
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command_byte() {
        // Clear-display: high nibble 0x00, low nibble 0x10.
        let frames = encode_byte(CLEAR_DISPLAY, Register::Command);
        assert_eq!(
            frames,
            [0x08, 0x0C, 0x08, 0x18, 0x1C, 0x18],
        );
    }

    #[test]
    fn test_encode_data_byte() {
        // 'H' = 0x48: high nibble 0x40, low nibble 0x80, RS set.
        let frames = encode_byte(b'H', Register::Data);
        assert_eq!(
            frames,
            [0x49, 0x4D, 0x49, 0x89, 0x8D, 0x89],
        );
    }

    #[test]
    fn test_backlight_always_set_read_write_never_set() {
        for value in [0x00u8, 0x5A, 0xFF] {
            for register in [Register::Command, Register::Data] {
                for byte in encode_byte(value, register) {
                    assert_ne!(byte & BACKLIGHT, 0);
                    assert_eq!(byte & READ_WRITE, 0);
                }
            }
        }
    }

    #[test]
    fn test_enable_strobed_once_per_nibble() {
        let frames = encode_byte(0xA5, Register::Data);
        let strobed: Vec<_> = frames.iter().filter(|b| *b & ENABLE != 0).collect();
        assert_eq!(strobed.len(), 2);
    }

    #[test]
    fn test_row_base_addresses() {
        assert_eq!(Row::One.base_address(), 0x00);
        assert_eq!(Row::Two.base_address(), 0x40);
    }

    #[test]
    fn test_pad_row_short_input() {
        let row = pad_row("Hi");
        assert_eq!(&row[..2], b"Hi");
        assert!(row[2..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_pad_row_long_input() {
        let row = pad_row("exactly eighteen!?");
        assert_eq!(&row, b"exactly eighteen");
    }

    #[test]
    fn test_pad_row_exact_width() {
        let row = pad_row("0123456789abcdef");
        assert_eq!(&row, b"0123456789abcdef");
    }
}
