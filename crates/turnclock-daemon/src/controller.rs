//! Session controller.
//!
//! Orchestrates the timer session against the display, the indicator
//! bank, and the audio cues. Exactly two actors touch the session: the
//! button callback ([`SessionController::handle_trigger`]) and the
//! render loop ([`SessionController::tick`]); both go through the
//! single session mutex, so phase and deadline are always read and
//! written together.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use turnclock_hw::bus::BusChannel;
use turnclock_hw::{Band, CharLcd, IndicatorBank, Result, Row, Thresholds};

use crate::audio::CuePlayer;
use crate::session::{Phase, Snapshot, TimerSession};

/// Idle splash lines.
const IDLE_TOP: &str = "Press to start";
const IDLE_BOTTOM: &str = "   Game Timer";

/// Timeout screen lines.
const TIMEOUT_TOP: &str = "   TIME IS UP";
const TIMEOUT_BOTTOM: &str = "Press for next";

/// Drives a [`TimerSession`] through the hardware outputs.
pub struct SessionController<B: BusChannel> {
    session: Mutex<TimerSession>,
    lcd: Mutex<CharLcd<B>>,
    leds: IndicatorBank,
    audio: CuePlayer,
    thresholds: Thresholds,
    blink_period: Duration,
}

impl<B: BusChannel> SessionController<B> {
    pub fn new(
        lcd: CharLcd<B>,
        leds: IndicatorBank,
        audio: CuePlayer,
        thresholds: Thresholds,
        blink_period: Duration,
        turn_length: Duration,
    ) -> Self {
        Self {
            session: Mutex::new(TimerSession::new(turn_length)),
            lcd: Mutex::new(lcd),
            leds,
            audio,
            thresholds,
            blink_period,
        }
    }

    /// Applies the trigger: starts or advances a turn.
    ///
    /// Called from the button interrupt thread. The session mutation
    /// is one atomic step; the output side effects (alarm stop,
    /// display wipe, start cue) happen outside the lock and never
    /// block or fail the transition.
    pub fn handle_trigger(&self, now: Instant) {
        let party = self.session.lock().unwrap().trigger(now);
        info!("Turn started for player {}", party.number());

        self.leds.stop_alarm();
        if let Err(e) = self.lcd.lock().unwrap().clear_recovering() {
            warn!("Display wipe failed on turn start: {}", e);
        }
        self.audio.start_beeps(party);
    }

    /// One rendering tick.
    ///
    /// While a turn is running: renders the indicator band, writes the
    /// party label and remaining seconds, and fires the timeout
    /// transition once the deadline elapses. Outside a turn the
    /// display is static and the tick does nothing.
    ///
    /// A display fault that survives recovery is returned for logging;
    /// deadline tracking and indicator output have already been
    /// applied by then, so the session is never stalled by a broken
    /// screen.
    pub fn tick(&self, now: Instant) -> Result<()> {
        let snapshot = self.session.lock().unwrap().snapshot(now);
        let (party, remaining) = match snapshot {
            Snapshot {
                phase: Phase::Turn(party),
                remaining: Some(remaining),
            } => (party, remaining),
            _ => return Ok(()),
        };

        self.leds
            .render(Band::for_remaining(remaining, &self.thresholds));

        let display = {
            let mut lcd = self.lcd.lock().unwrap();
            lcd.write_row_recovering(Row::One, &format!("Player {}", party.number()))
                .and_then(|()| {
                    lcd.write_row_recovering(Row::Two, &format!("Time: {remaining:>3}s"))
                })
        };

        if remaining == 0 {
            self.expire(now);
        }

        display
    }

    /// Timeout transition, detected by the polling loop.
    fn expire(&self, now: Instant) {
        {
            let mut session = self.session.lock().unwrap();
            // A trigger may have raced the final tick and started a
            // fresh turn; the trigger wins.
            match session.snapshot(now) {
                Snapshot {
                    phase: Phase::Turn(party),
                    remaining: Some(0),
                } => {
                    session.mark_timeout();
                    info!("Player {} ran out of time", party.number());
                }
                _ => return,
            }
        }

        self.audio.timeout_alarm();
        self.leds.alarm(self.blink_period);
        if let Err(e) = self.write_screen(TIMEOUT_TOP, TIMEOUT_BOTTOM) {
            warn!("Display fault on timeout screen: {}", e);
        }
    }

    /// Shows the idle splash.
    pub fn show_idle(&self) -> Result<()> {
        self.write_screen(IDLE_TOP, IDLE_BOTTOM)
    }

    /// Clears the display and darkens every indicator; every exit path
    /// runs through here.
    pub fn shutdown(&self) {
        self.leds.all_off();
        if let Err(e) = self.lcd.lock().unwrap().clear_recovering() {
            warn!("Display wipe failed on shutdown: {}", e);
        }
    }

    fn write_screen(&self, top: &str, bottom: &str) -> Result<()> {
        let mut lcd = self.lcd.lock().unwrap();
        lcd.clear_recovering()?;
        lcd.write_row_recovering(Row::One, top)?;
        lcd.write_row_recovering(Row::Two, bottom)
    }
}

#[cfg(test)]
impl<B: BusChannel> SessionController<B> {
    fn session_phase(&self) -> Phase {
        self.session.lock().unwrap().phase()
    }

    fn session_snapshot(&self, now: Instant) -> Snapshot {
        self.session.lock().unwrap().snapshot(now)
    }

    fn session_invariant_holds(&self) -> bool {
        self.session.lock().unwrap().invariant_holds()
    }

    fn session_deadline(&self) -> Option<Instant> {
        self.session.lock().unwrap().deadline()
    }
}
