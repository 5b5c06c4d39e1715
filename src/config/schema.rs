//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest voice pool the engine will build
pub const MAX_VOICES: usize = 64;

/// Longest tone the synthesizer will render: one minute at 192 kHz
pub const MAX_TONE_SAMPLES: usize = 60 * 192_000;

/// Invalid engine parameters, rejected before the engine is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be between 8000 and 192000 Hz, got {0}")]
    SampleRate(u32),

    #[error("buffer size must be between 64 and 8192, got {0}")]
    BufferSize(usize),

    #[error("tone duration must be a positive number of seconds, got {0}")]
    Duration(f64),

    #[error("attack must be a non-negative number of seconds, got {0}")]
    Attack(f64),

    #[error("tone of {0} samples is longer than the limit of {max}", max = MAX_TONE_SAMPLES)]
    TooLong(f64),

    #[error("tone of {total} samples is too short for an attack of {attack} samples")]
    TooShortForAttack { total: usize, attack: usize },

    #[error("peak amplitude must be in (0.0, 1.0], got {0}")]
    PeakAmplitude(f64),

    #[error("{name} must be positive and finite, got {value}")]
    Shape { name: &'static str, value: f64 },

    #[error("voice count must be between 1 and {max}, got {0}", max = MAX_VOICES)]
    VoiceCount(usize),

    #[error("master volume must be between 0.0 and 1.0, got {0}")]
    Volume(f32),
}

/// Main configuration for keytone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeytoneConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Tone shape
    #[serde(default)]
    pub tone: ToneConfig,

    /// Voice pool settings
    #[serde(default)]
    pub voices: VoicesConfig,

    /// Master settings
    #[serde(default)]
    pub master: MasterConfig,
}

impl KeytoneConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8000..=192_000).contains(&self.audio.sample_rate) {
            return Err(ConfigError::SampleRate(self.audio.sample_rate));
        }
        if !(64..=8192).contains(&self.audio.buffer_size) {
            return Err(ConfigError::BufferSize(self.audio.buffer_size));
        }

        self.tone.validate(self.audio.sample_rate as f64)?;

        if !(1..=MAX_VOICES).contains(&self.voices.count) {
            return Err(ConfigError::VoiceCount(self.voices.count));
        }
        if !(0.0..=1.0).contains(&self.master.volume) {
            return Err(ConfigError::Volume(self.master.volume));
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in frames requested from the device (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

/// Shape of every synthesized tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Tone length in seconds (default: 1.2)
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Attack length in seconds (default: 0.008)
    #[serde(default = "default_attack")]
    pub attack: f64,

    /// Peak gain of a single voice (default: 0.32)
    #[serde(default = "default_peak_amplitude")]
    pub peak_amplitude: f64,

    /// Exponent of the attack ramp (default: 0.3)
    #[serde(default = "default_attack_curve")]
    pub attack_curve: f64,

    /// Exponential decay rate over the tail (default: 2.4)
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
}

impl ToneConfig {
    /// Number of samples in a rendered tone
    pub fn total_samples(&self, sample_rate: f64) -> usize {
        (self.duration * sample_rate).round() as usize
    }

    /// Number of samples in the attack segment, never zero
    pub fn attack_samples(&self, sample_rate: f64) -> usize {
        ((sample_rate * self.attack).round() as usize).max(1)
    }

    /// Check the tone shape against a sample rate
    pub fn validate(&self, sample_rate: f64) -> Result<(), ConfigError> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ConfigError::Duration(self.duration));
        }
        if !self.attack.is_finite() || self.attack < 0.0 {
            return Err(ConfigError::Attack(self.attack));
        }
        if !(self.peak_amplitude > 0.0 && self.peak_amplitude <= 1.0) {
            return Err(ConfigError::PeakAmplitude(self.peak_amplitude));
        }
        let shape = [("attack curve", self.attack_curve), ("decay rate", self.decay_rate)];
        for (name, value) in shape {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Shape { name, value });
            }
        }

        // Checked before the float-to-usize casts below, which saturate
        let samples = (self.duration * sample_rate).round();
        if samples.is_nan() || samples > MAX_TONE_SAMPLES as f64 {
            return Err(ConfigError::TooLong(samples));
        }

        // The decay segment needs at least one sample
        let total = self.total_samples(sample_rate);
        let attack = self.attack_samples(sample_rate);
        if total <= attack {
            return Err(ConfigError::TooShortForAttack { total, attack });
        }

        Ok(())
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            attack: default_attack(),
            peak_amplitude: default_peak_amplitude(),
            attack_curve: default_attack_curve(),
            decay_rate: default_decay_rate(),
        }
    }
}

fn default_duration() -> f64 { 1.2 }
fn default_attack() -> f64 { 0.008 }
fn default_peak_amplitude() -> f64 { 0.32 }
fn default_attack_curve() -> f64 { 0.3 }
fn default_decay_rate() -> f64 { 2.4 }

/// Voice pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicesConfig {
    /// Number of simultaneous voices (default: 5)
    #[serde(default = "default_voice_count")]
    pub count: usize,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self { count: default_voice_count() }
    }
}

fn default_voice_count() -> usize { 5 }

/// Master settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self { volume: default_volume() }
    }
}

fn default_volume() -> f32 { 1.0 }
