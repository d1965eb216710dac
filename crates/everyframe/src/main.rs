//! Everyframe: posts every frame of a movie, in order, on a fixed schedule.
//!
//! Subcommands:
//! - `run`: the posting daemon
//! - `status`: print per-movie progress and time estimates
//! - `reset`: rewind every cursor to the start

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod daemon;
mod engine;
mod status;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

const DEFAULT_INTERVAL: u64 = 1800;

#[derive(Parser)]
#[command(name = "everyframe")]
#[command(about = "Posts every frame of a movie, in order, on a fixed schedule", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the posting daemon
    Run {
        /// Movie source, `NAME=DIR` or bare `DIR` (repeatable; posting order)
        #[arg(long = "movie", value_name = "SPEC", required = true)]
        movies: Vec<String>,

        /// Progress state file
        #[arg(long, env = "EVERYFRAME_STATE_FILE", default_value = "progress.json")]
        state_file: PathBuf,

        /// Seconds between posts for a fresh state file. An existing state
        /// file's stored interval wins; edit the file to change it.
        #[arg(long, env = "EVERYFRAME_INTERVAL", default_value_t = DEFAULT_INTERVAL)]
        interval: u64,

        /// Hashtag block appended to every caption
        #[arg(long, env = "EVERYFRAME_HASHTAGS", default_value = "")]
        hashtags: String,

        /// Social platform base URL
        #[arg(long, env = "EVERYFRAME_PLATFORM_URL")]
        platform_url: String,

        /// Social platform access token
        #[arg(long, env = "EVERYFRAME_PLATFORM_TOKEN")]
        platform_token: String,

        /// Rewind every cursor to the start before running
        #[arg(long, env = "EVERYFRAME_RESET", value_parser = parse_bool_env, default_value = "false")]
        reset: bool,

        /// Seconds to pause after an unexpected posting error
        #[arg(long, default_value = "540")]
        cooldown: u64,

        /// Send email alerts for skips, errors, and completion
        #[arg(long, env = "EVERYFRAME_EMAIL_ENABLED", value_parser = parse_bool_env, default_value = "false")]
        email_enabled: bool,

        /// Mail provider API base URL
        #[arg(long, env = "EVERYFRAME_EMAIL_API_URL")]
        email_api_url: Option<String>,

        /// Mail provider API key
        #[arg(long, env = "EVERYFRAME_EMAIL_API_KEY")]
        email_api_key: Option<String>,

        /// Alert sender address
        #[arg(long, env = "EVERYFRAME_EMAIL_FROM")]
        email_from: Option<String>,

        /// Alert recipient address
        #[arg(long, env = "EVERYFRAME_EMAIL_TO")]
        email_to: Option<String>,
    },

    /// Print per-movie progress and time estimates
    Status {
        /// Movie source, `NAME=DIR` or bare `DIR` (repeatable; posting order)
        #[arg(long = "movie", value_name = "SPEC", required = true)]
        movies: Vec<String>,

        /// Progress state file
        #[arg(long, env = "EVERYFRAME_STATE_FILE", default_value = "progress.json")]
        state_file: PathBuf,
    },

    /// Rewind every cursor to the start
    Reset {
        /// Progress state file
        #[arg(long, env = "EVERYFRAME_STATE_FILE", default_value = "progress.json")]
        state_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "everyframe=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            movies,
            state_file,
            interval,
            hashtags,
            platform_url,
            platform_token,
            reset,
            cooldown,
            email_enabled,
            email_api_url,
            email_api_key,
            email_from,
            email_to,
        } => {
            let config = config::Config::build(
                &movies,
                state_file,
                interval,
                hashtags,
                platform_url,
                platform_token,
                reset,
                cooldown,
                email_enabled,
                email_api_url,
                email_api_key,
                email_from,
                email_to,
            )?;
            daemon::run(config).await
        }

        Commands::Status { movies, state_file } => {
            status::print_status(&state_file, &movies, DEFAULT_INTERVAL)
        }

        Commands::Reset { state_file } => status::reset_state(&state_file, DEFAULT_INTERVAL),
    }
}
