//! Turnclock Daemon
//!
//! Two-player turn timer for Raspberry Pi: 16x2 I2C character LCD,
//! three-LED indicator bank, push-button trigger, audio cues.

mod audio;
mod config;
mod controller;
mod session;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rppal::gpio::Gpio;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use turnclock_hw::{CharLcd, GpioLine, I2cChannel, IndicatorBank, TriggerButton};

use audio::CuePlayer;
use config::Config;
use controller::SessionController;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    // Fail on bad thresholds or addresses before any hardware opens.
    let thresholds = config.validate().context("Invalid configuration")?;

    // Display path: a faulty display is not fatal, the recovery path
    // retries on every tick.
    let channel = I2cChannel::open(config.lcd.bus, config.lcd.address)
        .context("Failed to open I2C bus")?;
    let mut lcd = CharLcd::new(channel);
    if let Err(e) = lcd.initialize() {
        warn!("LCD initialization failed (display runs degraded): {}", e);
    }

    let gpio = Gpio::new().context("Failed to open GPIO")?;
    let leds = IndicatorBank::new(
        Box::new(GpioLine::new(&gpio, config.leds.normal_pin)?),
        Box::new(GpioLine::new(&gpio, config.leds.warning_pin)?),
        Box::new(GpioLine::new(&gpio, config.leds.critical_pin)?),
    );

    let audio = CuePlayer::new(&config.audio.dir, config.audio.enable);

    let controller = Arc::new(SessionController::new(
        lcd,
        leds,
        audio.clone(),
        thresholds,
        Duration::from_millis(config.leds.blink_ms),
        Duration::from_secs(config.turn_seconds),
    ));

    // The trigger is the only input; without it the timer is unusable.
    let trigger_controller = Arc::clone(&controller);
    let _button = TriggerButton::new(
        &gpio,
        config.button.pin,
        Duration::from_millis(config.button.debounce_ms),
        move || trigger_controller.handle_trigger(Instant::now()),
    )
    .context("Failed to register trigger button")?;

    audio.intro();
    if let Err(e) = controller.show_idle() {
        warn!("Idle splash failed: {}", e);
    }
    info!("Turn timer ready. Press the button to start.");

    // Start render loop
    let render_controller = Arc::clone(&controller);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    tokio::spawn(async move {
        render_loop(render_controller, poll_interval).await;
    });

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }

    audio.outro();
    controller.shutdown();
    info!("Cleaned up display and indicator outputs");

    Ok(())
}

async fn render_loop(controller: Arc<SessionController<I2cChannel>>, poll_interval: Duration) {
    let mut consecutive_errors: u32 = 0;
    let mut last_error_log = Instant::now();

    loop {
        if let Err(e) = controller.tick(Instant::now()) {
            consecutive_errors += 1;
            // Only log errors once per minute or on first error
            let elapsed = last_error_log.elapsed();
            if consecutive_errors == 1 || elapsed >= Duration::from_secs(60) {
                if consecutive_errors > 1 {
                    warn!(
                        "Display error (repeated {} times in {:?}): {}",
                        consecutive_errors, elapsed, e
                    );
                } else {
                    warn!("Display error: {}", e);
                }
                last_error_log = Instant::now();
                consecutive_errors = 0;
            }
        } else {
            consecutive_errors = 0;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
