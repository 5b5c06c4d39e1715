//! Computer keyboard to piano key mapping
//!
//! The home row plays white keys and the row above plays black keys,
//! starting from C on `a`.

use keytone::Pitch;

/// Keys in semitone order from C
const KEYS: &str = "awsedftgyhujkolp;";

const MIN_OCTAVE: i32 = 1;
const MAX_OCTAVE: i32 = 7;

/// Maps key presses to pitches, with a movable octave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardLayout {
    octave: i32,
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self { octave: 4 }
    }
}

impl KeyboardLayout {
    /// Octave of the `a` key
    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn octave_down(&mut self) {
        self.octave = (self.octave - 1).max(MIN_OCTAVE);
    }

    pub fn octave_up(&mut self) {
        self.octave = (self.octave + 1).min(MAX_OCTAVE);
    }

    /// Pitch played by `key`, if it is a piano key
    pub fn pitch(&self, key: char) -> Option<Pitch> {
        let offset = KEYS.find(key.to_ascii_lowercase())? as i32;
        Some(Pitch::from_midi((self.octave + 1) * 12 + offset))
    }

    /// One-line reminder of the layout
    pub fn legend(&self) -> String {
        format!(
            "keys {} play C{}..E{}, z/x octave down/up, q or Esc quits",
            KEYS,
            self.octave,
            self.octave + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hz(pitch: Option<Pitch>) -> f64 {
        pitch.unwrap().hz()
    }

    #[test]
    fn test_home_row_from_middle_c() {
        let layout = KeyboardLayout::default();
        assert!((hz(layout.pitch('a')) - 261.63).abs() < 0.01);
        assert!((hz(layout.pitch('h')) - 440.0).abs() < 0.01);
        assert!((hz(layout.pitch('k')) - 523.25).abs() < 0.01);
        assert!((hz(layout.pitch('A')) - 261.63).abs() < 0.01);
    }

    #[test]
    fn test_non_piano_keys() {
        let layout = KeyboardLayout::default();
        for key in ['q', 'z', 'x', '1', ' '] {
            assert!(layout.pitch(key).is_none());
        }
    }

    #[test]
    fn test_octave_shift_is_clamped() {
        let mut layout = KeyboardLayout::default();
        layout.octave_up();
        assert!((hz(layout.pitch('h')) - 880.0).abs() < 0.01);

        for _ in 0..10 {
            layout.octave_down();
        }
        assert_eq!(layout.octave(), MIN_OCTAVE);

        for _ in 0..10 {
            layout.octave_up();
        }
        assert_eq!(layout.octave(), MAX_OCTAVE);
    }
}
