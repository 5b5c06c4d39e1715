//! Audio engine for keytone
//!
//! The engine owns one worker thread. Every state change (a trigger, a
//! finished tone, a status query) is a command on a single channel, so
//! the worker applies them one at a time and two near-simultaneous
//! triggers can never claim the same voice. Callers only ever enqueue.

mod dispatch;
mod mixer;
mod offline;
mod player;
mod pool;
pub mod session;
mod sink;

pub use dispatch::Dispatcher;
pub use mixer::VoiceMixer;
pub use offline::{bounce, BounceSummary};
pub use player::CpalSink;
pub use pool::{Allocation, BufferId, PoolSnapshot, VoicePool, VoiceState};
pub use sink::{CompletionNotifier, OutputSink, Playback, SilentSink, SinkError};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::thread::JoinHandle;
use thiserror::Error;

use crate::config::{ConfigError, KeytoneConfig, ToneConfig};
use crate::synth::{Pitch, WaveformSynthesizer};

/// Work for the engine's worker thread
pub(crate) enum Command {
    Trigger(Pitch),
    Completed { voice: usize, id: BufferId },
    Recycle(Vec<f32>),
    Status(Sender<EngineStatus>),
    Shutdown,
}

/// Failures while building an engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn voice worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Where tones are going
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Playing through the named sink
    Audible(String),
    /// No output is running; tones are rendered and dropped
    Silent,
}

/// Engine state as seen by the worker at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub pool: PoolSnapshot,
    pub output: OutputMode,
    pub sample_rate: u32,
}

/// Cheap, cloneable way to trigger notes on an engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: Sender<Command>,
}

impl EngineHandle {
    /// Play a tone at `frequency` Hz as soon as possible
    ///
    /// Never blocks and never fails; frequencies that aren't positive and
    /// finite are logged and dropped.
    pub fn trigger(&self, frequency: f64) {
        match Pitch::new(frequency) {
            Ok(pitch) => self.trigger_pitch(pitch),
            Err(e) => warn!("Dropping trigger: {}", e),
        }
    }

    /// Play a tone at `pitch` as soon as possible
    pub fn trigger_pitch(&self, pitch: Pitch) {
        if self.commands.send(Command::Trigger(pitch)).is_err() {
            debug!("Engine stopped, dropping {}", pitch);
        }
    }

    /// Ask the worker for its current state
    ///
    /// Waits for every command queued before it, so it also acts as a
    /// barrier. Returns None once the engine has shut down.
    pub fn status(&self) -> Option<EngineStatus> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.commands.send(Command::Status(tx)).ok()?;
        rx.recv().ok()
    }
}

/// The tone engine: a voice pool, a synthesizer and an output sink
pub struct Engine {
    handle: EngineHandle,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create an engine playing through the configured audio device
    ///
    /// If the device can't be opened the engine still runs, silently.
    pub fn new(config: &KeytoneConfig) -> Result<Self, EngineError> {
        let audio = config.audio.clone();
        let volume = config.master.volume;
        Self::with_sink(config, move || Box::new(CpalSink::new(audio, volume)))
    }

    /// Create an engine around a custom output sink
    ///
    /// The sink is built on the worker thread, so it doesn't need to be
    /// `Send` itself.
    pub fn with_sink<F>(config: &KeytoneConfig, make_sink: F) -> Result<Self, EngineError>
    where
        F: FnOnce() -> Box<dyn OutputSink> + Send + 'static,
    {
        config.validate()?;
        let synth = WaveformSynthesizer::new(&config.tone, config.audio.sample_rate)?;
        let pool = VoicePool::new(config.voices.count)?;
        let tone = config.tone.clone();

        let (tx, rx) = crossbeam_channel::unbounded();
        let notifier = CompletionNotifier::new(tx.clone());

        let worker = std::thread::Builder::new()
            .name("keytone-voices".to_string())
            .spawn(move || {
                let dispatcher = Dispatcher::new(synth, pool);
                Worker::start(dispatcher, tone, make_sink(), notifier).run(rx);
            })?;

        Ok(Self {
            handle: EngineHandle { commands: tx },
            worker: Some(worker),
        })
    }

    /// Get a handle for triggering from elsewhere
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Play a tone at `frequency` Hz as soon as possible
    pub fn trigger(&self, frequency: f64) {
        self.handle.trigger(frequency);
    }

    /// Play a tone at `pitch` as soon as possible
    pub fn trigger_pitch(&self, pitch: Pitch) {
        self.handle.trigger_pitch(pitch);
    }

    /// Current engine state
    pub fn status(&self) -> Option<EngineStatus> {
        self.handle.status()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Voice worker panicked");
            }
        }
    }
}

/// State owned by the worker thread
struct Worker {
    dispatcher: Dispatcher,
    sink: Box<dyn OutputSink>,
    output: OutputMode,
    notifier: CompletionNotifier,
}

impl Worker {
    /// Start the sink, falling back to silence if it won't start
    fn start(
        mut dispatcher: Dispatcher,
        tone: ToneConfig,
        mut sink: Box<dyn OutputSink>,
        notifier: CompletionNotifier,
    ) -> Self {
        let voices = dispatcher.pool().voice_count();
        let requested = dispatcher.synth().sample_rate();

        let output = match sink.start(voices, requested, notifier.clone()) {
            Ok(rate) => {
                if rate != requested {
                    match WaveformSynthesizer::new(&tone, rate) {
                        Ok(synth) => dispatcher.set_synth(synth),
                        Err(e) => warn!("Keeping {} Hz tones: {}", requested, e),
                    }
                }
                OutputMode::Audible(sink.name().to_string())
            }
            Err(e) => {
                warn!("Audio output unavailable ({}); continuing without sound", e);
                sink = silent_sink(voices, requested, &notifier);
                OutputMode::Silent
            }
        };

        info!("Engine ready: {} voices, output {:?}", voices, output);

        Self {
            dispatcher,
            sink,
            output,
            notifier,
        }
    }

    fn run(mut self, commands: Receiver<Command>) {
        for command in commands.iter() {
            match command {
                Command::Trigger(pitch) => self.trigger(pitch),
                Command::Completed { voice, id } => {
                    self.dispatcher.completed(voice, id);
                }
                Command::Recycle(samples) => self.dispatcher.recycle(samples),
                Command::Status(reply) => {
                    let _ = reply.send(EngineStatus {
                        pool: self.dispatcher.pool().snapshot(),
                        output: self.output.clone(),
                        sample_rate: self.dispatcher.synth().sample_rate(),
                    });
                }
                Command::Shutdown => break,
            }
        }

        self.sink.stop();
        debug!("Voice worker stopped");
    }

    fn trigger(&mut self, pitch: Pitch) {
        let playback = self.dispatcher.dispatch(pitch);
        let (voice, id) = (playback.voice, playback.id);

        if let Err(e) = self.sink.submit(playback) {
            // Nothing will ever report this tone finished
            warn!("Failed to submit {} to voice {}: {}", pitch, voice, e);
            self.dispatcher.completed(voice, id);
            self.go_silent();
        }
    }

    /// Replace a sink that stopped taking tones
    ///
    /// Tones already handed to it will never complete, so their voices are
    /// freed here instead of waiting to be stolen.
    fn go_silent(&mut self) {
        if self.output == OutputMode::Silent {
            return;
        }

        warn!("Audio output lost; continuing without sound");
        self.sink.stop();
        let voices = self.dispatcher.pool().voice_count();
        let rate = self.dispatcher.synth().sample_rate();
        self.sink = silent_sink(voices, rate, &self.notifier);
        self.dispatcher.release_all();
        self.output = OutputMode::Silent;
    }
}

fn silent_sink(
    voices: usize,
    sample_rate: u32,
    notifier: &CompletionNotifier,
) -> Box<dyn OutputSink> {
    let mut sink = SilentSink::new();
    // Starting a silent sink can't fail
    let _ = sink.start(voices, sample_rate, notifier.clone());
    Box::new(sink)
}
