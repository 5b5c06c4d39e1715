//! Real-time audio playback using cpal

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::mixer::VoiceMixer;
use super::session;
use super::sink::{CompletionNotifier, OutputSink, Playback, SinkError};
use crate::config::AudioConfig;

/// Output sink that plays through a cpal device
///
/// Tones are handed to the audio callback over a channel and drained at the
/// start of every callback, so submitting never waits on the audio thread.
pub struct CpalSink {
    audio: AudioConfig,
    volume: f32,
    name: String,
    stream: Option<Stream>,
    playbacks: Option<Sender<Playback>>,
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl CpalSink {
    /// Create a sink for the configured device; nothing is opened until `start`
    pub fn new(audio: AudioConfig, volume: f32) -> Self {
        Self {
            audio,
            volume,
            name: "cpal".to_string(),
            stream: None,
            playbacks: None,
            running: Arc::new(AtomicBool::new(false)),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        &self,
        device: &Device,
        config: &StreamConfig,
        mut mixer: VoiceMixer,
        playbacks: Receiver<Playback>,
    ) -> Result<Stream, SinkError> {
        let channels = config.channels as usize;
        let running = self.running.clone();
        let failed = self.failed.clone();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::SeqCst) {
                    // Fill with silence when stopped
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                }

                while let Ok(playback) = playbacks.try_recv() {
                    mixer.play(playback);
                }

                for frame in data.chunks_mut(channels) {
                    let sample = mixer.next_sample();
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                // The callback may never run again, so stop taking tones
                failed.store(true, Ordering::SeqCst);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl OutputSink for CpalSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(
        &mut self,
        voices: usize,
        _sample_rate: u32,
        notifier: CompletionNotifier,
    ) -> Result<u32, SinkError> {
        let output = session::activate(&self.audio)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let mixer = VoiceMixer::new(voices, self.volume, notifier);

        self.running.store(true, Ordering::SeqCst);
        self.failed.store(false, Ordering::SeqCst);

        let (device, config) = (&output.device, &output.config);
        let stream = match output.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(device, config, mixer, rx),
            SampleFormat::I16 => self.build_stream::<i16>(device, config, mixer, rx),
            SampleFormat::U16 => self.build_stream::<u16>(device, config, mixer, rx),
            other => Err(SinkError::UnsupportedFormat(other)),
        };
        let stream = match stream.and_then(|s| s.play().map(|_| s).map_err(SinkError::from)) {
            Ok(stream) => stream,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        log::info!(
            "Playing through {} ({} Hz, {} ch, {} voices)",
            output.device_name,
            output.config.sample_rate.0,
            output.config.channels,
            voices
        );

        self.name = output.device_name;
        self.stream = Some(stream);
        self.playbacks = Some(tx);
        Ok(output.config.sample_rate.0)
    }

    fn submit(&mut self, playback: Playback) -> Result<(), SinkError> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(SinkError::StreamFailed);
        }
        let playbacks = self.playbacks.as_ref().ok_or(SinkError::NotRunning)?;
        playbacks.send(playback).map_err(|_| SinkError::NotRunning)
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.playbacks = None;
        self.stream = None;
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.stop();
    }
}
