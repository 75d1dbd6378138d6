//! Push-button trigger input.
//!
//! Delivers one debounced logical trigger event per physical press via
//! a falling-edge GPIO interrupt. The interrupt callback runs on its
//! own thread, so the handler must be `Send` and cheap.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Trigger};
use tracing::{debug, trace};

use crate::Result;

/// Debounced trigger button on a pull-up GPIO input.
pub struct TriggerButton {
    // Held for the lifetime of the interrupt registration.
    _pin: InputPin,
}

impl TriggerButton {
    /// Acquires the pin and registers `handler` for debounced presses.
    ///
    /// Edges arriving within `debounce` of the last accepted press are
    /// contact bounce and are dropped.
    pub fn new<F>(gpio: &Gpio, pin: u8, debounce: Duration, handler: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let mut input = gpio.get(pin)?.into_input_pullup();

        let last_press: Mutex<Option<Instant>> = Mutex::new(None);
        input.set_async_interrupt(Trigger::FallingEdge, move |_| {
            let now = Instant::now();
            let mut last = last_press.lock().unwrap();
            if let Some(at) = *last {
                if now.duration_since(at) < debounce {
                    trace!("Trigger edge dropped (bounce)");
                    return;
                }
            }
            *last = Some(now);
            handler();
        })?;

        debug!("Trigger button registered on GPIO {}", pin);
        Ok(Self { _pin: input })
    }
}
