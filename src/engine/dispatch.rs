//! Turning pitches into playbacks
//!
//! The dispatcher renders a tone, picks a voice for it, and keeps spent
//! sample storage around so steady playing doesn't allocate.

use log::debug;

use super::pool::{BufferId, VoicePool};
use super::sink::Playback;
use crate::synth::{Pitch, WaveformSynthesizer};

/// Renders tones and assigns them to voices
pub struct Dispatcher {
    synth: WaveformSynthesizer,
    pool: VoicePool,
    spare: Vec<Vec<f32>>,
}

impl Dispatcher {
    pub fn new(synth: WaveformSynthesizer, pool: VoicePool) -> Self {
        let spare = Vec::with_capacity(pool.voice_count() + 1);
        Self { synth, pool, spare }
    }

    pub fn synth(&self) -> &WaveformSynthesizer {
        &self.synth
    }

    /// Swap the synthesizer, e.g. when the device runs at another rate
    pub fn set_synth(&mut self, synth: WaveformSynthesizer) {
        self.synth = synth;
        // Old storage is sized for the old tone length
        self.spare.clear();
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Render a tone for `pitch` and claim a voice for it
    pub fn dispatch(&mut self, pitch: Pitch) -> Playback {
        let storage = self.spare.pop().unwrap_or_default();
        let buffer = self.synth.render_into(pitch, storage);
        let alloc = self.pool.allocate();

        match alloc.stolen {
            Some(old) => debug!(
                "{} -> voice {} (stole buffer {})",
                pitch,
                alloc.voice,
                old.get()
            ),
            None => debug!("{} -> voice {}", pitch, alloc.voice),
        }

        Playback {
            voice: alloc.voice,
            id: alloc.buffer,
            buffer,
            interrupt: alloc.stolen.is_some(),
        }
    }

    /// Release a voice whose tone finished; stale reports are ignored
    pub fn completed(&mut self, voice: usize, id: BufferId) -> bool {
        let released = self.pool.complete(voice, id);
        if !released {
            debug!("ignoring stale completion of buffer {} on voice {}", id.get(), voice);
        }
        released
    }

    /// Free every voice after the output went away
    pub fn release_all(&mut self) -> usize {
        let released = self.pool.release_all();
        if released > 0 {
            debug!("released {} voices", released);
        }
        released
    }

    /// Keep spent storage for the next tone
    pub fn recycle(&mut self, samples: Vec<f32>) {
        let fits = samples.capacity() >= self.synth.tone_samples();
        if fits && self.spare.len() <= self.pool.voice_count() {
            self.spare.push(samples);
        }
    }

    pub fn spare_buffers(&self) -> usize {
        self.spare.len()
    }
}
