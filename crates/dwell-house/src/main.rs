//! Wakes the resident of the house for one day.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//! Transcripts, letters and room state live under `--home`.
//!
//! # Examples
//!
//! ```sh
//! # A default day
//! dwell
//!
//! # A short day for a named resident, with verbose logs
//! dwell --agent wren --budget 100000 --log-level debug
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dwell::prelude::*;
use dwell_house::rooms::{load_states, save_states};
use dwell_house::{HouseConfig, LetterBox};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Wake the resident of the house for one session.
#[derive(Parser)]
#[command(name = "dwell")]
struct Cli {
    /// Resident's name and agent id.
    #[arg(long, default_value = "resident")]
    agent: String,

    /// Model to use for completions.
    #[arg(long, default_value = "anthropic/claude-sonnet-4")]
    model: String,

    /// Directory for transcripts, letters and room state.
    #[arg(long, default_value = ".dwell")]
    home: PathBuf,

    /// Token budget for the day.
    #[arg(long, default_value_t = 500_000)]
    budget: u64,

    /// Remaining tokens at which the resident is told to wind down.
    #[arg(long, default_value_t = 50_000)]
    warning_threshold: u64,

    /// Maximum tokens per model response.
    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    /// Room to wake up in.
    #[arg(long, default_value = "bedroom")]
    start_room: String,

    /// Log filter, used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = HouseConfig {
        agent_id: cli.agent,
        model: cli.model,
        total_budget: cli.budget,
        warning_threshold: cli.warning_threshold,
        max_tokens: cli.max_tokens,
        start_room: cli.start_room,
        home: cli.home,
        ..Default::default()
    };

    let api_key = match std::env::var("OPENROUTER_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: OPENROUTER_KEY environment variable is not set");
            return ExitCode::FAILURE;
        }
    };
    let client = match OpenRouterClient::new(api_key, config.model.clone()) {
        Ok(c) => c
            .with_max_tokens(config.max_tokens)
            .with_headers("https://github.com/tacryt-socryp/dwell", "dwell"),
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store = match FileStore::new(config.transcripts_dir()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "Error: cannot open transcript store at {}: {e}",
                config.transcripts_dir().display()
            );
            return ExitCode::FAILURE;
        }
    };

    let mut rooms = config.build_rooms();
    let rooms_file = config.rooms_file();
    if let Err(e) = load_states(&mut rooms, &rooms_file).await {
        warn!("Starting with an untouched house: {e}");
    }

    let host = AgentHost::new(
        config.agent_id.clone(),
        Arc::new(client),
        Arc::new(store),
        rooms,
        config.build_session_config(),
    )
    .with_event_handler(Arc::new(LoggingHandler))
    .with_inbox(Arc::new(LetterBox::new(config.letters_dir())));

    let result = host.wake().await;

    // Room state changes even when the day ends in an error.
    if let Err(e) = save_states(&*host.rooms().await, &rooms_file).await {
        warn!("Could not save room state: {e}");
    }

    match result {
        Ok(outcome) => {
            info!(
                "Day {} over: {} after {} turns in the {} ({})",
                outcome.session_number,
                outcome.end_reason,
                outcome.turns,
                outcome.final_room,
                outcome.budget.to_log_string()
            );
            if let Some(summary) = outcome.summary {
                println!("{summary}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("The day ended badly: {e}");
            ExitCode::FAILURE
        }
    }
}
