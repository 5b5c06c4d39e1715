//! keytone - polyphonic tone engine for tap-to-play keyboards
//!
//! Every trigger renders a short plucked-sounding sine tone and plays it on
//! one of a fixed number of voices. When all voices are busy the oldest in
//! rotation is cut off for the new note, so fast playing never blocks or
//! drops a note.

pub mod config;
pub mod synth;
pub mod engine;

pub use config::KeytoneConfig;
pub use engine::{Engine, EngineHandle};
pub use synth::{Pitch, WaveformSynthesizer};
