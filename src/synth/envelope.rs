//! Attack/decay envelope baked into every tone
//!
//! A short power-curve ramp-in followed by an exponential decay that runs
//! over the rest of the tone. There is no sustain or release stage: the
//! decay brings the tail close enough to silence that the tone can simply
//! end.

use crate::config::ToneConfig;

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
}

/// Two-segment amplitude envelope over a fixed number of samples
#[derive(Debug, Clone, PartialEq)]
pub struct ToneEnvelope {
    attack_samples: usize,
    total_samples: usize,
    attack_curve: f64,
    decay_rate: f64,
}

impl ToneEnvelope {
    /// Build the envelope for a validated tone shape
    pub fn new(tone: &ToneConfig, sample_rate: f64) -> Self {
        Self {
            attack_samples: tone.attack_samples(sample_rate),
            total_samples: tone.total_samples(sample_rate),
            attack_curve: tone.attack_curve,
            decay_rate: tone.decay_rate,
        }
    }

    /// Samples in the attack segment
    pub fn attack_samples(&self) -> usize {
        self.attack_samples
    }

    /// Samples in the whole tone
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Stage that sample `index` falls in
    pub fn stage(&self, index: usize) -> EnvelopeStage {
        if index < self.attack_samples {
            EnvelopeStage::Attack
        } else {
            EnvelopeStage::Decay
        }
    }

    /// Gain at sample `index`, in [0.0, 1.0]
    pub fn gain(&self, index: usize) -> f64 {
        match self.stage(index) {
            EnvelopeStage::Attack => {
                (index as f64 / self.attack_samples as f64).powf(self.attack_curve)
            }
            EnvelopeStage::Decay => {
                let decay_len = (self.total_samples - self.attack_samples) as f64;
                let t = (index - self.attack_samples) as f64 / decay_len;
                (-self.decay_rate * t).exp()
            }
        }
    }
}
