//! Output sink abstraction
//!
//! A sink owns one playback channel per voice and mixes them into a shared
//! destination. The engine submits rendered tones to it and hears back,
//! through a [`CompletionNotifier`], when a tone has finished playing.

use crossbeam_channel::Sender;
use thiserror::Error;

use super::pool::BufferId;
use super::Command;
use crate::synth::ToneBuffer;

/// Output device and session failures
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no output device available")]
    NoDevice,

    #[error("output device {0:?} not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("output pipeline is not running")]
    NotRunning,

    #[error("output stream failed after starting")]
    StreamFailed,
}

/// A tone headed for one voice channel
#[derive(Debug)]
pub struct Playback {
    pub voice: usize,
    pub id: BufferId,
    pub buffer: ToneBuffer,
    /// The voice was stolen, so its channel should still hold a tone to cut off
    ///
    /// A channel only holds one tone, so sinks replace it either way; this
    /// flags the cases where the pool and the sink disagree.
    pub interrupt: bool,
}

/// Channel back to the engine for finished tones
///
/// Sending never blocks, so it is safe to call from an audio callback.
#[derive(Clone)]
pub struct CompletionNotifier {
    commands: Sender<Command>,
}

impl CompletionNotifier {
    pub(crate) fn new(commands: Sender<Command>) -> Self {
        Self { commands }
    }

    /// Report that `id` played to the end on `voice`
    pub fn completed(&self, voice: usize, id: BufferId) {
        // The engine may already be gone during teardown
        let _ = self.commands.send(Command::Completed { voice, id });
    }

    /// Hand sample storage back for reuse by later tones
    pub fn recycle(&self, samples: Vec<f32>) {
        let _ = self.commands.send(Command::Recycle(samples));
    }
}

/// Destination for rendered tones
pub trait OutputSink {
    /// Short name for logs and status output
    fn name(&self) -> &str;

    /// Attach `voices` channels and start the output pipeline
    ///
    /// Returns the sample rate the sink actually runs at, which may differ
    /// from the requested one when the device can't honour it.
    fn start(
        &mut self,
        voices: usize,
        sample_rate: u32,
        notifier: CompletionNotifier,
    ) -> Result<u32, SinkError>;

    /// Start streaming a tone on its voice channel
    ///
    /// An error means the tone will never complete. The engine then stops
    /// using this sink and carries on silently.
    fn submit(&mut self, playback: Playback) -> Result<(), SinkError>;

    /// Stop the output pipeline
    fn stop(&mut self);
}

/// Sink that plays nothing
///
/// Used when no audio device can be opened. Every tone completes as soon
/// as it is submitted, so voices never stay busy.
#[derive(Default)]
pub struct SilentSink {
    notifier: Option<CompletionNotifier>,
}

impl SilentSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for SilentSink {
    fn name(&self) -> &str {
        "silent"
    }

    fn start(
        &mut self,
        _voices: usize,
        sample_rate: u32,
        notifier: CompletionNotifier,
    ) -> Result<u32, SinkError> {
        self.notifier = Some(notifier);
        Ok(sample_rate)
    }

    fn submit(&mut self, playback: Playback) -> Result<(), SinkError> {
        let notifier = self.notifier.as_ref().ok_or(SinkError::NotRunning)?;
        notifier.completed(playback.voice, playback.id);
        notifier.recycle(playback.buffer.into_samples());
        Ok(())
    }

    fn stop(&mut self) {
        self.notifier = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToneConfig;
    use crate::engine::VoicePool;
    use crate::synth::{Pitch, WaveformSynthesizer};

    fn playback(pool: &mut VoicePool) -> Playback {
        let synth = WaveformSynthesizer::new(&ToneConfig::default(), 8000).unwrap();
        let alloc = pool.allocate();
        Playback {
            voice: alloc.voice,
            id: alloc.buffer,
            buffer: synth.render(Pitch::new(440.0).unwrap()),
            interrupt: false,
        }
    }

    #[test]
    fn test_silent_sink_requires_start() {
        let mut pool = VoicePool::new(1).unwrap();
        let mut sink = SilentSink::new();
        assert!(matches!(sink.submit(playback(&mut pool)), Err(SinkError::NotRunning)));
    }

    #[test]
    fn test_silent_sink_completes_immediately() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = VoicePool::new(2).unwrap();
        let mut sink = SilentSink::new();

        assert_eq!(sink.start(2, 22050, CompletionNotifier::new(tx)).unwrap(), 22050);

        let playback = playback(&mut pool);
        let (voice, id) = (playback.voice, playback.id);
        sink.submit(playback).unwrap();

        match rx.try_recv().unwrap() {
            Command::Completed { voice: v, id: i } => assert_eq!((v, i), (voice, id)),
            _ => panic!("expected completion first"),
        }
        match rx.try_recv().unwrap() {
            Command::Recycle(samples) => assert_eq!(samples.len(), 9600),
            _ => panic!("expected recycled storage"),
        }
    }

    #[test]
    fn test_silent_sink_stop() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut pool = VoicePool::new(1).unwrap();
        let mut sink = SilentSink::new();
        sink.start(1, 44100, CompletionNotifier::new(tx)).unwrap();
        sink.stop();
        assert!(sink.submit(playback(&mut pool)).is_err());
    }
}
