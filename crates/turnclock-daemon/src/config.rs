//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use turnclock_hw::Thresholds;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Length of one turn in seconds
    #[serde(default = "default_turn_seconds")]
    pub turn_seconds: u64,

    /// Render loop poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// LCD configuration
    #[serde(default)]
    pub lcd: LcdConfig,

    /// Trigger button configuration
    #[serde(default)]
    pub button: ButtonConfig,

    /// Indicator LED configuration
    #[serde(default)]
    pub leds: LedConfig,

    /// Audio cue configuration
    #[serde(default)]
    pub audio: AudioConfig,
}

/// LCD device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcdConfig {
    /// I2C bus index (0 on very old Pi models, otherwise 1)
    #[serde(default = "default_i2c_bus")]
    pub bus: u8,

    /// PCF8574 backpack address (0x27, or 0x3F on some backpacks)
    #[serde(default = "default_i2c_address")]
    pub address: u8,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            bus: default_i2c_bus(),
            address: default_i2c_address(),
        }
    }
}

/// Trigger button configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// BCM pin of the button input
    #[serde(default = "default_button_pin")]
    pub pin: u8,

    /// Debounce window in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pin: default_button_pin(),
            debounce_ms: default_debounce(),
        }
    }
}

/// Indicator LED configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    /// BCM pin of the normal (green) LED
    #[serde(default = "default_normal_pin")]
    pub normal_pin: u8,

    /// BCM pin of the warning (yellow) LED
    #[serde(default = "default_warning_pin")]
    pub warning_pin: u8,

    /// BCM pin of the critical (red) LED
    #[serde(default = "default_critical_pin")]
    pub critical_pin: u8,

    /// Remaining seconds at or below which the warning band holds
    #[serde(default = "default_warning_secs")]
    pub warning_secs: u64,

    /// Remaining seconds at or below which the critical band holds
    #[serde(default = "default_critical_secs")]
    pub critical_secs: u64,

    /// Alarm blink half-period in milliseconds
    #[serde(default = "default_blink")]
    pub blink_ms: u64,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            normal_pin: default_normal_pin(),
            warning_pin: default_warning_pin(),
            critical_pin: default_critical_pin(),
            warning_secs: default_warning_secs(),
            critical_secs: default_critical_secs(),
            blink_ms: default_blink(),
        }
    }
}

/// Audio cue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Whether to play audio cues at all
    #[serde(default = "default_audio_enable")]
    pub enable: bool,

    /// Directory holding the cue WAV files
    #[serde(default = "default_audio_dir")]
    pub dir: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enable: default_audio_enable(),
            dir: default_audio_dir(),
        }
    }
}

// Default value functions
fn default_turn_seconds() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    50
}

fn default_i2c_bus() -> u8 {
    1
}

fn default_i2c_address() -> u8 {
    turnclock_hw::DEFAULT_I2C_ADDRESS
}

fn default_button_pin() -> u8 {
    17
}

fn default_debounce() -> u64 {
    50
}

fn default_normal_pin() -> u8 {
    23
}

fn default_warning_pin() -> u8 {
    24
}

fn default_critical_pin() -> u8 {
    25
}

fn default_warning_secs() -> u64 {
    20
}

fn default_critical_secs() -> u64 {
    5
}

fn default_blink() -> u64 {
    150
}

fn default_audio_enable() -> bool {
    true
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Validates the configuration before any hardware is touched.
    ///
    /// Threshold ordering and the bus address are fatal at startup,
    /// never at runtime.
    pub fn validate(&self) -> Result<Thresholds> {
        if self.lcd.address >= 0x80 {
            anyhow::bail!(
                "LCD address {:#04x} is not a 7-bit I2C address",
                self.lcd.address
            );
        }
        let thresholds = Thresholds::new(self.leds.warning_secs, self.leds.critical_secs)
            .context("Invalid indicator thresholds")?;
        if self.turn_seconds == 0 {
            anyhow::bail!("turn_seconds must be at least 1");
        }
        Ok(thresholds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            turn_seconds: default_turn_seconds(),
            poll_interval_ms: default_poll_interval(),
            lcd: LcdConfig::default(),
            button: ButtonConfig::default(),
            leds: LedConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_wiring() {
        let config = Config::default();
        assert_eq!(config.turn_seconds, 60);
        assert_eq!(config.lcd.bus, 1);
        assert_eq!(config.lcd.address, 0x27);
        assert_eq!(config.button.pin, 17);
        assert_eq!(
            (
                config.leds.normal_pin,
                config.leds.warning_pin,
                config.leds.critical_pin
            ),
            (23, 24, 25)
        );
        assert_eq!(config.leds.warning_secs, 20);
        assert_eq!(config.leds.critical_secs, 5);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            turn_seconds = 10

            [leds]
            warning_secs = 4
            critical_secs = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.turn_seconds, 10);
        assert_eq!(config.leds.warning_secs, 4);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.lcd.address, 0x27);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.leds.warning_secs = 2;
        config.leds.critical_secs = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wide_address() {
        let mut config = Config::default();
        config.lcd.address = 0x90;
        assert!(config.validate().is_err());
    }
}
