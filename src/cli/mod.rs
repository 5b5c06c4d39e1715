//! CLI interface for keytone

mod keys;

pub use keys::KeyboardLayout;

use clap::{Parser, Subcommand};
use keytone::Pitch;
use std::path::PathBuf;

/// Config file used when `--config` isn't given
pub const DEFAULT_CONFIG: &str = "keytone.yaml";

/// Polyphonic tone engine with voice stealing
#[derive(Parser)]
#[command(name = "keytone")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play the computer keyboard like a piano
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Trigger a sequence of notes through the audio device
    Notes {
        /// Configuration file path
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Milliseconds between notes
        #[arg(short, long, default_value = "250")]
        gap_ms: u64,

        /// Note names (C4, F#3) or frequencies in Hz
        #[arg(required = true)]
        notes: Vec<Pitch>,
    },

    /// Render notes to a WAV file
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Milliseconds between note starts (0 plays them together)
        #[arg(short, long, default_value = "0")]
        gap_ms: u64,

        /// Note names (C4, F#3) or frequencies in Hz
        #[arg(required = true)]
        notes: Vec<Pitch>,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
