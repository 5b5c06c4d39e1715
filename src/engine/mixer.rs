//! Mixer for summing voice channels
//!
//! Each voice channel streams at most one tone at a time. The mixer sums
//! the channels sample by sample, applies the master volume, and reports
//! every tone that plays to its end. Interrupted tones are never reported
//! as completed; only their storage is handed back.

use log::warn;

use super::pool::BufferId;
use super::sink::{CompletionNotifier, Playback};
use crate::synth::ToneBuffer;

/// A tone in flight on one channel
struct Playing {
    id: BufferId,
    buffer: ToneBuffer,
    position: usize,
}

/// Sums one tone per voice channel into a mono stream
pub struct VoiceMixer {
    channels: Vec<Option<Playing>>,
    volume: f32,
    notifier: CompletionNotifier,
}

impl VoiceMixer {
    /// Create a mixer with `voices` empty channels
    pub fn new(voices: usize, volume: f32, notifier: CompletionNotifier) -> Self {
        Self {
            channels: (0..voices).map(|_| None).collect(),
            volume,
            notifier,
        }
    }

    /// Number of channels currently streaming
    pub fn active_voices(&self) -> usize {
        self.channels.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.active_voices() == 0
    }

    /// Start streaming a tone on its channel
    ///
    /// A channel only ever holds one tone, so a tone still playing there is
    /// cut off whether or not the playback asked for it. Cutting one off
    /// unasked means the pool thought the voice was idle, which is logged.
    pub fn play(&mut self, playback: Playback) {
        let (voice, interrupt) = (playback.voice, playback.interrupt);
        let Some(channel) = self.channels.get_mut(playback.voice) else {
            self.notifier.recycle(playback.buffer.into_samples());
            return;
        };

        let previous = channel.replace(Playing {
            id: playback.id,
            buffer: playback.buffer,
            position: 0,
        });
        if let Some(previous) = previous {
            if !interrupt {
                warn!(
                    "voice {} was still playing buffer {} when given an idle-voice tone",
                    voice,
                    previous.id.get()
                );
            }
            self.notifier.recycle(previous.buffer.into_samples());
        }
    }

    /// Generate the next mixed sample
    pub fn next_sample(&mut self) -> f32 {
        let mut output = 0.0;

        for (voice, channel) in self.channels.iter_mut().enumerate() {
            let Some(playing) = channel.as_mut() else { continue };

            if let Some(&sample) = playing.buffer.samples().get(playing.position) {
                output += sample;
                playing.position += 1;
            }

            if playing.position >= playing.buffer.len() {
                if let Some(done) = channel.take() {
                    self.notifier.completed(voice, done.id);
                    self.notifier.recycle(done.buffer.into_samples());
                }
            }
        }

        (output * self.volume).clamp(-1.0, 1.0)
    }

    /// Fill a buffer with mixed samples
    pub fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
