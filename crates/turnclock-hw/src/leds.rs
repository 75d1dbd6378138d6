//! Indicator LED bank.
//!
//! Maps remaining time to one of three exclusive bands and drives the
//! matching output line, plus a self-sustaining alarm blink on the
//! critical line for the timeout phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rppal::gpio::OutputPin;
use tracing::debug;

use crate::{Error, Result};

/// Remaining-time severity band. Exactly one band holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Normal,
    Warning,
    Critical,
}

impl Band {
    /// Band for a remaining-time value against the configured
    /// thresholds.
    pub fn for_remaining(remaining: u64, thresholds: &Thresholds) -> Self {
        if remaining > thresholds.warning {
            Band::Normal
        } else if remaining > thresholds.critical {
            Band::Warning
        } else {
            Band::Critical
        }
    }
}

/// Band thresholds in remaining seconds.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    warning: u64,
    critical: u64,
}

impl Thresholds {
    /// Validates that the warning threshold exceeds the critical one.
    pub fn new(warning: u64, critical: u64) -> Result<Self> {
        if warning <= critical {
            return Err(Error::InvalidThresholds { warning, critical });
        }
        Ok(Self { warning, critical })
    }

    pub fn warning(&self) -> u64 {
        self.warning
    }

    pub fn critical(&self) -> u64 {
        self.critical
    }
}

/// One physical indicator output.
pub trait IndicatorLine: Send {
    fn set_active(&mut self);
    fn set_inactive(&mut self);
}

/// Indicator line backed by a GPIO output pin.
pub struct GpioLine(OutputPin);

impl GpioLine {
    /// Acquires the given BCM pin as an output, initially inactive.
    pub fn new(gpio: &rppal::gpio::Gpio, pin: u8) -> Result<Self> {
        let mut out = gpio.get(pin)?.into_output();
        out.set_low();
        Ok(Self(out))
    }
}

impl IndicatorLine for GpioLine {
    fn set_active(&mut self) {
        self.0.set_high();
    }

    fn set_inactive(&mut self) {
        self.0.set_low();
    }
}

impl Drop for GpioLine {
    fn drop(&mut self) {
        self.0.set_low();
    }
}

struct Lines {
    normal: Box<dyn IndicatorLine>,
    warning: Box<dyn IndicatorLine>,
    critical: Box<dyn IndicatorLine>,
}

impl Lines {
    fn set_band(&mut self, band: Band) {
        match band {
            Band::Normal => {
                self.normal.set_active();
                self.warning.set_inactive();
                self.critical.set_inactive();
            }
            Band::Warning => {
                self.normal.set_inactive();
                self.warning.set_active();
                self.critical.set_inactive();
            }
            Band::Critical => {
                self.normal.set_inactive();
                self.warning.set_inactive();
                self.critical.set_active();
            }
        }
    }

    fn all_inactive(&mut self) {
        self.normal.set_inactive();
        self.warning.set_inactive();
        self.critical.set_inactive();
    }
}

/// Tri-color indicator bank.
///
/// Cheap to clone; all clones drive the same lines. The alarm pattern
/// runs on its own task and is superseded by the next
/// [`IndicatorBank::render`].
#[derive(Clone)]
pub struct IndicatorBank {
    lines: Arc<Mutex<Lines>>,
    alarm_active: Arc<AtomicBool>,
}

impl IndicatorBank {
    /// Builds the bank from its three output lines.
    pub fn new(
        normal: Box<dyn IndicatorLine>,
        warning: Box<dyn IndicatorLine>,
        critical: Box<dyn IndicatorLine>,
    ) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Lines {
                normal,
                warning,
                critical,
            })),
            alarm_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drives the line for the given band, deactivating the others.
    /// Idempotent, and supersedes a running alarm pattern.
    pub fn render(&self, band: Band) {
        self.alarm_active.store(false, Ordering::SeqCst);
        // Taking the lines lock after clearing the flag serializes
        // against the blink task, which re-checks the flag under the
        // same lock before each toggle.
        let mut lines = self.lines.lock().unwrap();
        lines.set_band(band);
    }

    /// Starts the sustained alarm blink on the critical line. A second
    /// call while the pattern is running is a no-op.
    pub fn alarm(&self, blink_period: Duration) {
        if self.alarm_active.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Starting alarm blink ({:?} period)", blink_period);
        {
            let mut lines = self.lines.lock().unwrap();
            lines.all_inactive();
        }
        let lines = Arc::clone(&self.lines);
        let active = Arc::clone(&self.alarm_active);
        tokio::spawn(async move {
            let mut on = false;
            loop {
                {
                    let mut lines = lines.lock().unwrap();
                    if !active.load(Ordering::SeqCst) {
                        break;
                    }
                    on = !on;
                    if on {
                        lines.critical.set_active();
                    } else {
                        lines.critical.set_inactive();
                    }
                }
                tokio::time::sleep(blink_period).await;
            }
        });
    }

    /// Stops any alarm pattern without driving a new band.
    pub fn stop_alarm(&self) {
        self.alarm_active.store(false, Ordering::SeqCst);
        let mut lines = self.lines.lock().unwrap();
        lines.critical.set_inactive();
    }

    /// Deactivates every line (shutdown path).
    pub fn all_off(&self) {
        self.alarm_active.store(false, Ordering::SeqCst);
        let mut lines = self.lines.lock().unwrap();
        lines.all_inactive();
    }
}
