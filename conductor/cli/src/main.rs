//! Parley - Terminal Chat Surface
//!
//! A line-oriented terminal front end for the parley conversation core.
//! Typed lines are sent to the simulated assistant; replies are revealed one
//! character at a time. The conversation is saved between runs.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! parley
//!
//! # Reproducible replies, custom storage location
//! parley --seed 42 --data-dir /tmp/parley
//!
//! # Exercise the failure path
//! parley --failure-rate 0.5
//!
//! # Verbose logging (goes to stderr)
//! RUST_LOG=debug parley 2>parley.log
//! ```

mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use parley_core::config::default_config_path;
use parley_core::{
    load_config_from_path, ConfigOverrides, FileBackend, PersistentStore, ScriptedDictation,
    SessionController, SimulatedResponder, StaticTheme, SurfaceEvent, SurfaceMessage,
    ThemeCapability,
};

use commands::{Command, HELP};
use render::Renderer;

/// Parley - chat with a simulated assistant in your terminal
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "PARLEY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the saved conversation
    #[arg(short = 'd', long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Fixed RNG seed for reproducible replies
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Probability (0.0-1.0) that a reply fails
    #[arg(long, value_name = "RATE")]
    failure_rate: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PARLEY_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never interleave with the transcript.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("parley={level},parley_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Write surface messages and local command output to stdout
///
/// Runs until both the controller and the input loop have gone away. Queued
/// surface messages are written before local output so command replies land
/// after the transcript lines that preceded them.
async fn run_renderer(
    mut surface: mpsc::UnboundedReceiver<SurfaceMessage>,
    mut local: mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    let mut renderer = Renderer::new();
    let mut stdout = tokio::io::stdout();

    loop {
        let text = tokio::select! {
            biased;
            Some(message) = surface.recv() => renderer.render(&message),
            Some(line) = local.recv() => renderer.text(&line),
            else => break,
        };
        if !text.is_empty() {
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

/// Queue a line of local output behind the transcript
fn say(out: &mpsc::UnboundedSender<String>, text: impl Into<String>) {
    if out.send(text.into()).is_err() {
        tracing::debug!("Renderer stopped, dropping local output");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    // Resolve configuration: file, then environment, then flags
    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(dir) = args.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if let Some(seed) = args.seed {
        overrides = overrides.with_seed(seed);
    }
    if let Some(rate) = args.failure_rate {
        overrides = overrides.with_failure_rate(rate);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line option")?;

    let data_dir = config
        .resolved_data_dir()
        .context("No data directory available; pass --data-dir")?;
    info!(data_dir = ?data_dir, source = %config.source(), "Configuration resolved");

    let responder = match config.seed {
        Some(seed) => SimulatedResponder::seeded(seed),
        None => SimulatedResponder::from_entropy(),
    }
    .with_delay(config.delay_window())
    .with_failure_rate(config.failure_rate);

    let store = PersistentStore::new(FileBackend::new(data_dir), config.storage_key.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    let (out, local_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(run_renderer(rx, local_rx));

    let mut controller =
        SessionController::new(config.session_config(), Arc::new(responder), store, tx);
    let theme = StaticTheme::default();
    let dictation = ScriptedDictation::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    controller.handle_event(SurfaceEvent::QuitRequested);
                    break;
                };

                match Command::parse(&line) {
                    Command::Say(text) => {
                        controller.handle_event(SurfaceEvent::typed(text));
                    }
                    Command::Clear => {
                        controller.handle_event(SurfaceEvent::ClearRequested);
                    }
                    Command::Quit => {
                        controller.handle_event(SurfaceEvent::QuitRequested);
                        break;
                    }
                    Command::Theme => {
                        say(&out, format!("theme: {:?}", theme.toggle()));
                    }
                    Command::Dictate(text) => {
                        dictation.push(text);
                        controller.dictate(&dictation).await;
                    }
                    Command::History => {
                        say(&out, render::history(&controller.view()));
                    }
                    Command::Help => {
                        say(&out, HELP);
                    }
                    Command::Unknown(name) => {
                        say(&out, format!("unknown command /{name} (try /help)"));
                    }
                }
            }
            Some(event) = controller.next_scheduled() => {
                controller.handle_scheduled(event);
            }
        }
    }

    // Dropping both senders lets the renderer finish
    drop(controller);
    drop(out);
    renderer.await.context("Renderer task panicked")??;

    info!("Goodbye");
    Ok(())
}
