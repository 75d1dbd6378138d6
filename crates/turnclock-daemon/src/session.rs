//! Turn timer session state machine.
//!
//! Pure data and transition logic; no I/O. The session lives for the
//! process lifetime and cycles IDLE -> TURN -> TIMEOUT -> TURN -> ...
//! indefinitely. The single invariant: a deadline exists exactly while
//! a turn is running.

use std::time::{Duration, Instant};

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    One,
    Two,
}

impl Party {
    /// The opposing player.
    pub fn other(self) -> Self {
        match self {
            Party::One => Party::Two,
            Party::Two => Party::One,
        }
    }

    /// Display number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Party::One => 1,
            Party::Two => 2,
        }
    }
}

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first trigger.
    Idle,
    /// A turn is running for the given party.
    Turn(Party),
    /// The deadline elapsed; waiting for the next trigger.
    Timeout,
}

/// Consistent (phase, remaining) view taken under one borrow, so phase
/// and deadline can never be observed mismatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub remaining: Option<u64>,
}

/// Session state: phase, active party, deadline.
#[derive(Debug)]
pub struct TimerSession {
    phase: Phase,
    active_party: Party,
    deadline: Option<Instant>,
    turn_length: Duration,
}

impl TimerSession {
    /// New session in the idle phase with no deadline.
    pub fn new(turn_length: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            active_party: Party::One,
            deadline: None,
            turn_length,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_party(&self) -> Party {
        self.active_party
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Applies the trigger: starts the first turn from idle, advances
    /// to the other party from a running turn (with a fresh deadline)
    /// or from timeout. Returns the party whose turn begins.
    ///
    /// This is the single mutation the input callback performs, and it
    /// is atomic relative to any snapshot.
    pub fn trigger(&mut self, now: Instant) -> Party {
        let next = match self.phase {
            Phase::Idle => Party::One,
            Phase::Turn(party) => party.other(),
            Phase::Timeout => self.active_party.other(),
        };
        self.active_party = next;
        self.deadline = Some(now + self.turn_length);
        self.phase = Phase::Turn(next);
        next
    }

    /// Remaining whole seconds, rounded to nearest, floored at zero.
    /// `None` outside a running turn.
    pub fn remaining(&self, now: Instant) -> Option<u64> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now).as_secs_f64().round() as u64)
    }

    /// Marks the running turn as expired, keeping the active party so
    /// the next trigger hands the turn to the opponent.
    pub fn mark_timeout(&mut self) {
        debug_assert!(matches!(self.phase, Phase::Turn(_)));
        self.phase = Phase::Timeout;
        self.deadline = None;
    }

    /// Consistent view of phase and remaining time.
    pub fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot {
            phase: self.phase,
            remaining: self.remaining(now),
        }
    }

    /// Deadline-present-iff-turn invariant; checked by tests.
    pub fn invariant_holds(&self) -> bool {
        self.deadline.is_some() == matches!(self.phase, Phase::Turn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURN: Duration = Duration::from_secs(60);

    #[test]
    fn test_starts_idle_without_deadline() {
        let session = TimerSession::new(TURN);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.deadline(), None);
        assert!(session.invariant_holds());
    }

    #[test]
    fn test_first_trigger_starts_party_one() {
        let mut session = TimerSession::new(TURN);
        let now = Instant::now();
        assert_eq!(session.trigger(now), Party::One);
        assert_eq!(session.phase(), Phase::Turn(Party::One));
        assert_eq!(session.deadline(), Some(now + TURN));
        assert!(session.invariant_holds());
    }

    #[test]
    fn test_early_advance_resets_deadline() {
        let mut session = TimerSession::new(TURN);
        let start = Instant::now();
        session.trigger(start);

        // Second press 40s in: the other party gets a full fresh turn,
        // not a continuation of party one's remaining time.
        let later = start + Duration::from_secs(40);
        assert_eq!(session.trigger(later), Party::Two);
        assert_eq!(session.phase(), Phase::Turn(Party::Two));
        assert_eq!(session.deadline(), Some(later + TURN));
        assert_eq!(session.remaining(later), Some(60));
    }

    #[test]
    fn test_timeout_keeps_active_party() {
        let mut session = TimerSession::new(TURN);
        session.trigger(Instant::now());
        session.mark_timeout();
        assert_eq!(session.phase(), Phase::Timeout);
        assert_eq!(session.active_party(), Party::One);
        assert_eq!(session.deadline(), None);
        assert!(session.invariant_holds());
    }

    #[test]
    fn test_trigger_after_timeout_hands_turn_to_opponent() {
        let mut session = TimerSession::new(TURN);
        session.trigger(Instant::now());
        session.mark_timeout();
        assert_eq!(session.trigger(Instant::now()), Party::Two);

        session.mark_timeout();
        assert_eq!(session.trigger(Instant::now()), Party::One);
    }

    #[test]
    fn test_remaining_rounds_to_nearest_second() {
        let mut session = TimerSession::new(TURN);
        let start = Instant::now();
        session.trigger(start);

        assert_eq!(session.remaining(start), Some(60));
        assert_eq!(session.remaining(start + Duration::from_millis(400)), Some(60));
        assert_eq!(session.remaining(start + Duration::from_millis(600)), Some(59));
        assert_eq!(session.remaining(start + Duration::from_secs(60)), Some(0));
        // Never negative, however late the poll arrives.
        assert_eq!(session.remaining(start + Duration::from_secs(90)), Some(0));
    }

    #[test]
    fn test_thousand_interleaved_triggers_never_tear_state() {
        use std::sync::{Arc, Mutex};

        let session = Arc::new(Mutex::new(TimerSession::new(TURN)));
        let base = Instant::now();

        let presses = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for i in 0..1000u64 {
                    session
                        .lock()
                        .unwrap()
                        .trigger(base + Duration::from_micros(i));
                }
            })
        };

        for i in 0..1000u64 {
            let now = base + Duration::from_micros(i);
            let guard = session.lock().unwrap();
            let snapshot = guard.snapshot(now);
            assert!(guard.invariant_holds());
            // Phase and deadline must always be observed as a pair.
            assert_eq!(
                snapshot.remaining.is_some(),
                matches!(snapshot.phase, Phase::Turn(_)),
                "mismatched pair: {snapshot:?}"
            );
            if let Some(remaining) = snapshot.remaining {
                assert!(remaining <= 60);
            }
        }
        presses.join().unwrap();
    }

    #[test]
    fn test_snapshot_pairs_phase_with_remaining() {
        let mut session = TimerSession::new(TURN);
        let now = Instant::now();
        assert_eq!(
            session.snapshot(now),
            Snapshot {
                phase: Phase::Idle,
                remaining: None
            }
        );
        session.trigger(now);
        assert_eq!(
            session.snapshot(now),
            Snapshot {
                phase: Phase::Turn(Party::One),
                remaining: Some(60)
            }
        );
    }
}
