//! Enveloped sine tone rendering

use std::f64::consts::PI;

use super::envelope::ToneEnvelope;
use super::pitch::Pitch;
use crate::config::{ConfigError, ToneConfig};

/// A rendered tone: fixed-length mono samples at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    pitch: Pitch,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl ToneBuffer {
    /// Pitch this tone was rendered at
    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Give the sample storage back for reuse
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Renders enveloped sine tones of a fixed length
///
/// Rendering is a pure function of the pitch and the settings fixed at
/// construction, so one synthesizer can be shared freely.
#[derive(Debug, Clone)]
pub struct WaveformSynthesizer {
    sample_rate: u32,
    peak_amplitude: f64,
    envelope: ToneEnvelope,
}

impl WaveformSynthesizer {
    /// Create a synthesizer, rejecting tone shapes that cannot be rendered
    pub fn new(tone: &ToneConfig, sample_rate: u32) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::SampleRate(sample_rate));
        }
        tone.validate(sample_rate as f64)?;

        Ok(Self {
            sample_rate,
            peak_amplitude: tone.peak_amplitude,
            envelope: ToneEnvelope::new(tone, sample_rate as f64),
        })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Peak gain of a rendered tone
    pub fn peak_amplitude(&self) -> f64 {
        self.peak_amplitude
    }

    /// Number of samples in every rendered tone
    pub fn tone_samples(&self) -> usize {
        self.envelope.total_samples()
    }

    pub fn envelope(&self) -> &ToneEnvelope {
        &self.envelope
    }

    /// Render a tone into freshly allocated storage
    pub fn render(&self, pitch: Pitch) -> ToneBuffer {
        self.render_into(pitch, Vec::new())
    }

    /// Render a tone, reusing `storage` for the samples
    pub fn render_into(&self, pitch: Pitch, mut storage: Vec<f32>) -> ToneBuffer {
        let total = self.envelope.total_samples();
        let step = 2.0 * PI * pitch.hz() / self.sample_rate as f64;

        storage.clear();
        storage.reserve_exact(total);
        storage.extend((0..total).map(|i| {
            // Phase from the index, not accumulated, so rounding error can't build up
            let raw = (step * i as f64).sin();
            (raw * self.peak_amplitude * self.envelope.gain(i)) as f32
        }));

        ToneBuffer {
            pitch,
            sample_rate: self.sample_rate,
            samples: storage,
        }
    }
}
