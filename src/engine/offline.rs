//! Offline rendering to WAV
//!
//! Runs the same dispatch, stealing and mixing as the live engine, but
//! synchronously and into a file instead of a device.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use std::time::Duration;

use super::dispatch::Dispatcher;
use super::mixer::VoiceMixer;
use super::pool::VoicePool;
use super::sink::CompletionNotifier;
use super::Command;
use crate::config::KeytoneConfig;
use crate::synth::{Pitch, WaveformSynthesizer};

/// What a bounce produced
#[derive(Debug, Clone, PartialEq)]
pub struct BounceSummary {
    pub samples_written: u64,
    pub sample_rate: u32,
    /// Notes that cut off an earlier note
    pub voices_stolen: usize,
}

impl BounceSummary {
    /// Get the duration written in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }
}

/// Render `pitches` to a mono 32-bit float WAV file
///
/// Note `k` starts `k * gap` into the file; a zero gap plays them all at
/// once. The file ends when the last voice has finished.
pub fn bounce(
    config: &KeytoneConfig,
    pitches: &[Pitch],
    gap: Duration,
    path: &Path,
) -> Result<BounceSummary> {
    config.validate()?;
    let sample_rate = config.audio.sample_rate;
    let synth = WaveformSynthesizer::new(&config.tone, sample_rate)?;
    let pool = VoicePool::new(config.voices.count)?;
    let mut dispatcher = Dispatcher::new(synth, pool);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut mixer = VoiceMixer::new(
        config.voices.count,
        config.master.volume,
        CompletionNotifier::new(tx),
    );

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file: {:?}", path))?;

    let gap_samples = (gap.as_secs_f64() * sample_rate as f64).round() as u64;
    let mut samples_written = 0u64;
    let mut voices_stolen = 0;

    for (k, &pitch) in pitches.iter().enumerate() {
        let start = k as u64 * gap_samples;
        while samples_written < start {
            writer
                .write_sample(mixer.next_sample())
                .context("failed to write sample")?;
            samples_written += 1;
        }

        drain(&rx, &mut dispatcher);
        let playback = dispatcher.dispatch(pitch);
        if playback.interrupt {
            voices_stolen += 1;
        }
        mixer.play(playback);
    }

    while !mixer.is_idle() {
        writer
            .write_sample(mixer.next_sample())
            .context("failed to write sample")?;
        samples_written += 1;
    }

    writer.finalize().context("failed to finalize WAV file")?;

    Ok(BounceSummary {
        samples_written,
        sample_rate,
        voices_stolen,
    })
}

/// Apply everything the mixer reported since the last call
fn drain(events: &Receiver<Command>, dispatcher: &mut Dispatcher) {
    for event in events.try_iter() {
        match event {
            Command::Completed { voice, id } => {
                dispatcher.completed(voice, id);
            }
            Command::Recycle(samples) => dispatcher.recycle(samples),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config(voices: usize) -> KeytoneConfig {
        let mut config = KeytoneConfig::default();
        config.audio.sample_rate = 8000;
        config.tone.duration = 0.1;
        config.voices.count = voices;
        config
    }

    fn pitches(hz: &[f64]) -> Vec<Pitch> {
        hz.iter().map(|&f| Pitch::new(f).unwrap()).collect()
    }

    fn read_samples(path: &Path) -> Vec<f32> {
        let reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        reader.into_samples().map(|s| s.unwrap()).collect()
    }

    #[test]
    fn test_bounce_single_tone() {
        let file = NamedTempFile::new().unwrap();
        let config = config(5);
        let summary = bounce(&config, &pitches(&[440.0]), Duration::ZERO, file.path()).unwrap();

        assert_eq!(summary.samples_written, 800);
        assert_eq!(summary.voices_stolen, 0);
        assert!((summary.duration_secs() - 0.1).abs() < 1e-9);

        let synth = WaveformSynthesizer::new(&config.tone, 8000).unwrap();
        let expected = synth.render(Pitch::new(440.0).unwrap());
        assert_eq!(read_samples(file.path()), expected.samples());
    }

    #[test]
    fn test_bounce_staggered_notes() {
        let file = NamedTempFile::new().unwrap();
        let summary = bounce(
            &config(5),
            &pitches(&[261.63, 329.63, 392.0]),
            Duration::from_millis(50),
            file.path(),
        )
        .unwrap();

        // Last note starts at 2 * 400 samples and lasts 800
        assert_eq!(summary.samples_written, 1600);
        assert_eq!(read_samples(file.path()).len(), 1600);
    }

    #[test]
    fn test_bounce_steals_when_saturated() {
        let file = NamedTempFile::new().unwrap();
        let summary = bounce(
            &config(2),
            &pitches(&[220.0, 330.0, 440.0, 550.0]),
            Duration::from_millis(10),
            file.path(),
        )
        .unwrap();

        assert_eq!(summary.voices_stolen, 2);
        let samples = read_samples(file.path());
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_bounce_reuses_finished_voices() {
        let file = NamedTempFile::new().unwrap();
        // Each note has ended before the next starts
        let summary = bounce(
            &config(1),
            &pitches(&[220.0, 330.0, 440.0]),
            Duration::from_millis(150),
            file.path(),
        )
        .unwrap();

        assert_eq!(summary.voices_stolen, 0);
        assert_eq!(summary.samples_written, 2 * 1200 + 800);
    }

    #[test]
    fn test_bounce_rejects_invalid_config() {
        let file = NamedTempFile::new().unwrap();
        let mut config = config(2);
        config.tone.duration = 0.0;
        assert!(bounce(&config, &pitches(&[440.0]), Duration::ZERO, file.path()).is_err());
    }
}
