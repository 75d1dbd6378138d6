//! Audio cue playback.
//!
//! Cues are played through ALSA's `aplay`. A cue prefers its WAV file
//! under the audio directory; when the file (or `aplay` itself) is
//! missing, a synthesized tone sequence stands in. Audio is strictly
//! best-effort: failures are logged and never reach the session.

use std::f64::consts::TAU;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::session::Party;

/// Synthesized tone sample rate.
const SAMPLE_RATE: u32 = 44_100;

/// Named audio cues and their WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Played once at startup.
    Intro,
    /// Played at shutdown.
    Outro,
    /// Turn-start beeps (same file for both parties).
    StartBeeps,
    /// Deadline-expired alarm.
    Timeout,
}

impl Cue {
    fn file_name(self) -> &'static str {
        match self {
            Cue::Intro => "start-cd.wav",
            Cue::Outro => "outro-cd.wav",
            Cue::StartBeeps => "start_beeps.wav",
            Cue::Timeout => "time-up-cd.wav",
        }
    }
}

/// Plays named cues and synthesized tones via `aplay`.
#[derive(Clone)]
pub struct CuePlayer {
    dir: PathBuf,
    enabled: bool,
}

impl CuePlayer {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// A player that never makes a sound.
    pub fn disabled() -> Self {
        Self::new("", false)
    }

    /// Plays the cue's WAV file to completion. Returns false if the
    /// file is absent or `aplay` is unavailable.
    fn play_file(&self, cue: Cue) -> bool {
        let path = self.dir.join(cue.file_name());
        if !path.exists() {
            return false;
        }
        match Command::new("aplay")
            .arg("-q")
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => true,
            Err(e) => {
                warn!("aplay unavailable for {:?}: {}", path, e);
                false
            }
        }
    }

    /// Launches the cue's WAV file in the background. Returns false if
    /// it could not be started.
    fn spawn_file(&self, cue: Cue) -> bool {
        let path = self.dir.join(cue.file_name());
        if !path.exists() {
            return false;
        }
        match Command::new("aplay")
            .arg("-q")
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => true,
            Err(e) => {
                warn!("aplay unavailable for {:?}: {}", path, e);
                false
            }
        }
    }

    /// Plays the startup cue without blocking the splash screen.
    pub fn intro(&self) {
        if !self.enabled {
            return;
        }
        if !self.spawn_file(Cue::Intro) {
            debug!("No intro cue available");
        }
    }

    /// Plays the shutdown cue to completion.
    pub fn outro(&self) {
        if !self.enabled {
            return;
        }
        let _ = self.play_file(Cue::Outro);
    }

    /// Turn-start cue for the given party, in the background:
    /// party one gets 2 beeps at 1200 Hz, party two 3 beeps at 900 Hz,
    /// unless a start-beeps WAV overrides both.
    pub fn start_beeps(&self, party: Party) {
        if !self.enabled {
            return;
        }
        let player = self.clone();
        thread::spawn(move || {
            if player.play_file(Cue::StartBeeps) {
                return;
            }
            let (count, freq) = match party {
                Party::One => (2, 1200.0),
                Party::Two => (3, 900.0),
            };
            for _ in 0..count {
                player.tone(freq, Duration::from_millis(80), 0.6);
                thread::sleep(Duration::from_millis(70));
            }
        });
    }

    /// Descending timeout alarm, in the background.
    pub fn timeout_alarm(&self) {
        if !self.enabled {
            return;
        }
        let player = self.clone();
        thread::spawn(move || {
            if player.play_file(Cue::Timeout) {
                return;
            }
            for freq in [1200.0, 1000.0, 800.0, 600.0, 400.0] {
                player.tone(freq, Duration::from_millis(120), 0.7);
                thread::sleep(Duration::from_millis(30));
            }
        });
    }

    /// Synthesizes one tone and plays it to completion through a
    /// temporary WAV file.
    fn tone(&self, freq: f64, length: Duration, volume: f64) {
        let wav = tone_wav_bytes(freq, length, volume);
        let result = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .and_then(|mut file| {
                file.write_all(&wav)?;
                Ok(file)
            });
        let file = match result {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to stage tone WAV: {}", e);
                return;
            }
        };
        if let Err(e) = Command::new("aplay")
            .arg("-q")
            .arg(file.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            warn!("aplay unavailable for synthesized tone: {}", e);
        }
    }
}

/// Renders a sine tone as 16-bit stereo WAV bytes.
fn tone_wav_bytes(freq: f64, length: Duration, volume: f64) -> Vec<u8> {
    let frames = (SAMPLE_RATE as f64 * length.as_secs_f64()) as u32;
    let amplitude = 32767.0 * volume.clamp(0.0, 1.0);

    let channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = SAMPLE_RATE * u32::from(block_align);
    let data_len = frames * u32::from(block_align);

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    // fmt chunk (PCM)
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        let sample =
            (amplitude * (TAU * freq * f64::from(i) / f64::from(SAMPLE_RATE)).sin()) as i16;
        let bytes = sample.to_le_bytes();
        // Same sample on both channels.
        wav.extend_from_slice(&bytes);
        wav.extend_from_slice(&bytes);
    }
    wav
}
