//! keytone - polyphonic tone engine with voice stealing

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use keytone::config::{self, KeytoneConfig, EXAMPLE_CONFIG};
use keytone::engine::{self, session, Engine, OutputMode};
use std::path::Path;
use std::thread;
use std::time::Duration;

mod cli;

use cli::{Cli, Commands, KeyboardLayout, DEFAULT_CONFIG};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = load(&config_path)?;
            let engine = Engine::new(&cfg)?;
            report_output(&engine);

            play_keyboard(&engine)?;
        }

        Commands::Notes {
            config: config_path,
            gap_ms,
            notes,
        } => {
            let cfg = load(&config_path)?;
            let engine = Engine::new(&cfg)?;
            report_output(&engine);

            for pitch in &notes {
                println!("  {}", pitch);
                engine.trigger_pitch(*pitch);
                thread::sleep(Duration::from_millis(gap_ms));
            }

            // Let the last tone ring out
            thread::sleep(Duration::from_secs_f64(cfg.tone.duration));
        }

        Commands::Render {
            config: config_path,
            output,
            gap_ms,
            notes,
        } => {
            let cfg = load(&config_path)?;

            println!("Rendering {} notes to {:?}...", notes.len(), output);
            let summary = engine::bounce(&cfg, &notes, Duration::from_millis(gap_ms), &output)?;

            println!(
                "Wrote {:.2}s at {} Hz ({} voices stolen)",
                summary.duration_secs(),
                summary.sample_rate,
                summary.voices_stolen
            );
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = session::default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            for (name, config) in session::list_output_devices() {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!(
                        "  Device: {}",
                        cfg.audio.device.as_deref().unwrap_or("(default)")
                    );
                    println!("  Voices: {}", cfg.voices.count);
                    println!(
                        "  Tone: {:.3}s, attack {:.1}ms, peak {:.2}",
                        cfg.tone.duration,
                        cfg.tone.attack * 1000.0,
                        cfg.tone.peak_amplitude
                    );
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = DEFAULT_CONFIG;
            if Path::new(path).exists() {
                println!("{} already exists. Not overwriting.", path);
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)
                    .with_context(|| format!("failed to write {}", path))?;
                println!("Created {} with example configuration.", path);
            }
        }
    }

    Ok(())
}

/// Load a config file, using defaults when the default file doesn't exist
fn load(path: &Path) -> Result<KeytoneConfig> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        return Ok(KeytoneConfig::default());
    }
    config::load_config(path)
}

fn report_output(engine: &Engine) {
    if let Some(status) = engine.status() {
        match status.output {
            OutputMode::Audible(name) => println!(
                "Playing through {} ({} voices, {} Hz)",
                name,
                status.pool.voices.len(),
                status.sample_rate
            ),
            OutputMode::Silent => println!("No audio output available; notes will be silent"),
        }
    }
}

/// Restores the terminal when dropped
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enter raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn play_keyboard(engine: &Engine) -> Result<()> {
    let mut layout = KeyboardLayout::default();
    println!("{}", layout.legend());

    let _raw = RawMode::enable()?;

    loop {
        let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        match code {
            KeyCode::Esc | KeyCode::Char('q') => break,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Char('z') => {
                layout.octave_down();
                print!("octave {}\r\n", layout.octave());
            }
            KeyCode::Char('x') => {
                layout.octave_up();
                print!("octave {}\r\n", layout.octave());
            }
            KeyCode::Char(key) => {
                if let Some(pitch) = layout.pitch(key) {
                    engine.trigger_pitch(pitch);
                }
            }
            _ => {}
        }
    }

    Ok(())
}
