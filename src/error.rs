//! Error types for the scorebot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BotError`] — **Fatal**: the bot cannot start or keep serving at all
//!   (missing token file, `npx` not on PATH, transport breakdown). Returned
//!   as `Err(BotError)` from startup and the top-level run loop.
//!
//! * [`RequestError`] — **Non-fatal**: a single user's request failed (bad
//!   link, unknown format token, renderer exited non-zero) but every other
//!   conversation is fine. Converted into a chat reply via
//!   [`RequestError::user_message`] rather than propagated upward.
//!
//! The separation lets the run loop stay alive through any number of bad
//! requests while still refusing to start in a configuration that can never
//! serve one.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scorebot library.
///
/// Per-request failures use [`RequestError`] and are reported back to the
/// requesting chat rather than propagated here.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// Token file was not found at the given path.
    #[error("Token file not found: '{path}'\nCreate it, or point at one with --token <PATH>.")]
    TokenNotFound { path: PathBuf },

    /// Token file exists but could not be read.
    #[error("Failed to read token file '{path}': {source}")]
    TokenUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Token file was read but contains nothing usable.
    #[error("Token file '{path}' is empty")]
    TokenEmpty { path: PathBuf },

    /// The renderer launcher executable is not on the search path.
    #[error("'{program}' not found in PATH\nThe external renderer is invoked via '{program}'; install Node.js/npm to get it.")]
    RendererMissing { program: String },

    /// The per-OS config directory could not be determined or created.
    #[error("Failed to prepare config directory '{path}': {detail}")]
    ConfigDir { path: PathBuf, detail: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// An HTTP call to the Telegram API failed at the network level.
    #[error("Telegram API request '{method}' failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The Telegram API answered but rejected the call (`ok: false`).
    #[error("Telegram API '{method}' rejected: {description}")]
    ApiRejected { method: String, description: String },

    /// The Telegram API answered with a body we could not decode.
    #[error("Telegram API '{method}' returned an undecodable body: {detail}")]
    BadApiResponse { method: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single user request.
///
/// Every variant maps to a chat message via [`RequestError::user_message`];
/// nothing here ever takes the bot down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The text did not parse as an absolute URL at all.
    #[error("malformed URL: {input}")]
    MalformedUrl { input: String },

    /// The URL parsed but its host is not the expected score host.
    #[error("incorrect domain: expected {expected}, got {got}")]
    WrongDomain { expected: String, got: String },

    /// The URL host matched but its path fits none of the accepted shapes.
    #[error("unrecognised score path: {path}")]
    BadScorePath { path: String },

    /// The format token is not one of the supported formats.
    #[error("'{token}' is not a valid choice")]
    UnknownFormat { token: String },

    /// The external renderer exited with a non-zero status.
    #[error("renderer exited with status {code}")]
    RendererFailed { code: i32 },

    /// The external renderer ran past the configured deadline.
    #[error("renderer timed out after {secs}s")]
    RendererTimeout { secs: u64 },

    /// The renderer exited zero but wrote no artifact into the output dir.
    #[error("renderer produced no output file")]
    NoArtifact,

    /// Anything unexpected at the per-request boundary (I/O, spawn failure).
    #[error("request failed: {0}")]
    Internal(String),
}

impl RequestError {
    /// The chat reply shown to the user for this failure.
    ///
    /// Validation errors tell the user what to fix; dispatch errors carry
    /// the renderer's status so a report is actionable.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::MalformedUrl { .. } => "Malformed URL!".to_string(),
            RequestError::WrongDomain { .. } => "Incorrect domain name!".to_string(),
            RequestError::BadScorePath { .. } => "Malformed URL!".to_string(),
            RequestError::UnknownFormat { token } => {
                format!("`{token}` is not a valid choice!")
            }
            RequestError::RendererFailed { code } => {
                format!("Operation Failed: `dl-librescore` exited with status {code}")
            }
            RequestError::RendererTimeout { secs } => {
                format!("Operation Failed: the renderer took longer than {secs}s")
            }
            RequestError::NoArtifact | RequestError::Internal(_) => {
                "Operation Failed: something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}
