//! Pitch values and note-name parsing

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reference tuning: A4 in Hz
pub const A4_HZ: f64 = 440.0;

/// MIDI note number of A4
const A4_NOTE: i32 = 69;

/// Rejected pitch input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PitchError {
    #[error("frequency must be positive and finite, got {0}")]
    NotPositive(f64),

    #[error("not a note name or frequency: {0:?}")]
    Unrecognized(String),
}

/// A frequency in Hz, always positive and finite
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pitch(f64);

impl Pitch {
    /// Create a pitch from a frequency in Hz
    pub fn new(hz: f64) -> Result<Self, PitchError> {
        if hz.is_finite() && hz > 0.0 {
            Ok(Self(hz))
        } else {
            Err(PitchError::NotPositive(hz))
        }
    }

    /// Equal-tempered pitch of a MIDI note number (69 = A4 = 440 Hz)
    pub fn from_midi(note: i32) -> Self {
        Self(A4_HZ * 2f64.powf((note - A4_NOTE) as f64 / 12.0))
    }

    /// Parse scientific pitch notation such as `C4`, `F#3` or `Bb-1`
    pub fn from_note(name: &str) -> Result<Self, PitchError> {
        let unrecognized = || PitchError::Unrecognized(name.to_string());

        let mut chars = name.trim().chars();
        let semitone = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(unrecognized()),
        };

        let rest = chars.as_str();
        let (accidental, octave) = if let Some(octave) = rest.strip_prefix('#') {
            (1, octave)
        } else if let Some(octave) = rest.strip_prefix('b') {
            (-1, octave)
        } else {
            (0, rest)
        };

        let octave: i32 = octave.parse().map_err(|_| unrecognized())?;
        if !(-1..=9).contains(&octave) {
            return Err(unrecognized());
        }

        Ok(Self::from_midi((octave + 1) * 12 + semitone + accidental))
    }

    /// Frequency in Hz
    pub fn hz(self) -> f64 {
        self.0
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    /// Accepts either a note name or a bare frequency in Hz
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(hz) => Self::new(hz),
            Err(_) => Self::from_note(s),
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} Hz", self.0)
    }
}
