//! CLI binary for scorebot.
//!
//! A thin shim over the library crate that resolves the bot token, runs the
//! startup checks, and hands off to the polling loop.

use anyhow::{Context, Result};
use clap::Parser;
use scorebot::{bot, config, BotConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run with the default token location
  scorebot

  # Run with an explicit token file
  scorebot --token ./token.txt

  # Debug logging
  scorebot --verbose

TOKEN FILE:
  A plain text file containing the bot token issued by @BotFather.
  Surrounding whitespace is ignored. Default location:
    POSIX:    ~/.config/scorebot/token.txt
    Windows:  %APPDATA%\scorebot\token.txt

REQUIREMENTS:
  The external renderer is invoked as `npx --yes dl-librescore@latest`,
  so Node.js (with npx on PATH) must be installed. The first render pays
  a one-off npm download; later renders reuse the npx cache.
"#;

/// Telegram bot that renders musescore.com scores to mp3/midi/pdf.
#[derive(Parser, Debug)]
#[command(
    name = "scorebot",
    version,
    about = "Telegram bot that renders musescore.com scores to mp3/midi/pdf",
    long_about = "Runs a Telegram bot: users send a musescore.com score link, pick a \
format (mp3, midi, pdf), and receive the rendered file back in the chat. \
Conversion is delegated to the dl-librescore tool via npx.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Read the bot token from this file instead of the default location.
    #[arg(short, long, env = "SCOREBOT_TOKEN_FILE")]
    token: Option<PathBuf>,

    /// Upper bound on a single render's runtime, in seconds.
    #[arg(long, env = "SCOREBOT_RENDER_TIMEOUT", default_value_t = 300)]
    render_timeout: u64,

    /// Telegram long-poll window, in seconds (1–50).
    #[arg(long, env = "SCOREBOT_POLL_TIMEOUT", default_value_t = 30)]
    poll_timeout: u64,

    /// Telegram API base URL (override for testing against a stub).
    #[arg(long, env = "SCOREBOT_API_BASE", default_value = "https://api.telegram.org")]
    api_base: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCOREBOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCOREBOT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Token resolution ─────────────────────────────────────────────────
    let token_path = match cli.token {
        Some(path) => path,
        None => config::default_token_path().context("Failed to resolve token location")?,
    };
    let token = config::load_token(&token_path)
        .with_context(|| format!("Failed to load bot token from {}", token_path.display()))?;

    // ── Build config & startup checks ────────────────────────────────────
    let config = BotConfig::builder(token)
        .api_base(cli.api_base)
        .render_timeout_secs(cli.render_timeout)
        .poll_timeout_secs(cli.poll_timeout)
        .build()
        .context("Invalid configuration")?;

    bot::ensure_renderer_available(&config).context("Startup check failed")?;

    // ── Serve ────────────────────────────────────────────────────────────
    eprintln!("Bot starting...");
    bot::run(config).await.context("Bot stopped with an error")?;

    Ok(())
}
