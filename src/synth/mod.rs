//! Tone synthesis
//!
//! Contains pitch handling, the tone envelope, and the waveform synthesizer.

mod envelope;
mod pitch;
mod waveform;

pub use envelope::{EnvelopeStage, ToneEnvelope};
pub use pitch::{Pitch, PitchError, A4_HZ};
pub use waveform::{ToneBuffer, WaveformSynthesizer};
