//! # scorebot
//!
//! A Telegram bot that turns public musescore.com score links into files:
//! send a link, pick a format (mp3, midi, pdf), get the rendered file back
//! in the chat. The actual conversion is done by the external
//! [`dl-librescore`](https://www.npmjs.com/package/dl-librescore) tool,
//! invoked as a subprocess via `npx`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inbound message
//!  │
//!  ├─ 1. Session  look up the user's conversation state
//!  ├─ 2. Dialog   validate link / format for that state
//!  ├─ 3. Render   spawn dl-librescore into a scoped temp dir
//!  ├─ 4. Relay    upload the artifact (audio or document attachment)
//!  └─ 5. Settle   FileDelivered on success, reset on failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scorebot::{bot, BotConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = scorebot::config::load_token(&scorebot::config::default_token_path()?)?;
//!     let config = BotConfig::builder(token).build()?;
//!     bot::ensure_renderer_available(&config)?;
//!     bot::run(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scorebot` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library to avoid pulling in CLI-only deps:
//! ```toml
//! scorebot = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bot;
pub mod config;
pub mod dialog;
pub mod error;
pub mod render;
pub mod score;
pub mod session;
pub mod telegram;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{default_token_path, load_token, BotConfig, BotConfigBuilder};
pub use dialog::{handle, handle_start, handle_text, DialogOutcome};
pub use error::{BotError, RequestError};
pub use render::{render, RenderedScore};
pub use score::{ScoreFormat, ScoreRequest, ScoreUrl};
pub use session::{Session, SessionState, SessionStore, UserId};
pub use telegram::TelegramClient;
