//! Configuration types for the bot.
//!
//! All runtime behaviour is controlled through [`BotConfig`], built via its
//! [`BotConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share the config across the polling loop and spawned render tasks, and to
//! point the whole bot at a stub Telegram server or stub renderer in tests.
//!
//! Token handling lives here too: the per-OS default location
//! (`~/.config/scorebot/token.txt` on POSIX, `%APPDATA%\scorebot\token.txt`
//! on Windows) and the file-reading rules (trimmed, must be non-empty).

use crate::error::BotError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used under the platform config directory.
const APP_DIR: &str = "scorebot";

/// File name the bot token is read from by default.
const TOKEN_FILE: &str = "token.txt";

/// Configuration for a running bot.
///
/// Built via [`BotConfig::builder`].
///
/// # Example
/// ```rust
/// use scorebot::BotConfig;
///
/// let config = BotConfig::builder("123456:ABC-token")
///     .render_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.renderer_program, "npx");
/// ```
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram bot token, as issued by BotFather.
    pub token: String,

    /// Telegram API base URL. Default: `https://api.telegram.org`.
    ///
    /// Overridable so tests can point the client at a local stub server.
    pub api_base: String,

    /// Launcher executable for the external renderer. Default: `npx`.
    ///
    /// The renderer itself is an npm package, so the invocation goes through
    /// the Node package runner. Tests substitute a local stub script here.
    pub renderer_program: String,

    /// Arguments placed before the `-i/-t/-o` triple. Default:
    /// `["--yes", "dl-librescore@latest"]`.
    ///
    /// `--yes` suppresses npx's install prompt; pinning `@latest` matches the
    /// upstream tool's own install advice. Empty when `renderer_program` is
    /// already the renderer binary (as in tests).
    pub renderer_args: Vec<String>,

    /// Upper bound on a single render's runtime. Default: 300 s.
    ///
    /// The first invocation pays an npm package download on top of the
    /// conversion itself, so the bound is generous. A render that exceeds it
    /// is reported to the user as a dispatch failure, never retried.
    pub render_timeout_secs: u64,

    /// Long-poll timeout passed to Telegram `getUpdates`. Default: 30 s.
    ///
    /// Telegram holds the HTTP request open for up to this long, so the loop
    /// idles server-side instead of hammering the API with empty polls.
    pub poll_timeout_secs: u64,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The token is a credential; never let it leak through Debug logging.
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("renderer_program", &self.renderer_program)
            .field("renderer_args", &self.renderer_args)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl BotConfig {
    /// Create a new builder with the given bot token.
    pub fn builder(token: impl Into<String>) -> BotConfigBuilder {
        BotConfigBuilder {
            config: BotConfig {
                token: token.into(),
                api_base: "https://api.telegram.org".to_string(),
                renderer_program: "npx".to_string(),
                renderer_args: vec!["--yes".to_string(), "dl-librescore@latest".to_string()],
                render_timeout_secs: 300,
                poll_timeout_secs: 30,
            },
        }
    }

    /// The render timeout as a [`Duration`].
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

/// Builder for [`BotConfig`].
#[derive(Debug)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn renderer_program(mut self, program: impl Into<String>) -> Self {
        self.config.renderer_program = program.into();
        self
    }

    pub fn renderer_args(mut self, args: Vec<String>) -> Self {
        self.config.renderer_args = args;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs.clamp(1, 50);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BotConfig, BotError> {
        let c = &self.config;
        if c.token.trim().is_empty() {
            return Err(BotError::InvalidConfig("Bot token must not be empty".into()));
        }
        if c.renderer_program.trim().is_empty() {
            return Err(BotError::InvalidConfig(
                "Renderer program must not be empty".into(),
            ));
        }
        if c.api_base.trim_end_matches('/').is_empty() {
            return Err(BotError::InvalidConfig("API base must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Token file handling ──────────────────────────────────────────────────

/// The per-OS default token file location, creating the app's config
/// directory if it does not exist yet.
///
/// Resolves to `<config dir>/scorebot/token.txt`, where `<config dir>` is
/// `~/.config` on POSIX and `%APPDATA%` on Windows.
pub fn default_token_path() -> Result<PathBuf, BotError> {
    let base = dirs::config_dir().ok_or_else(|| BotError::ConfigDir {
        path: PathBuf::from(APP_DIR),
        detail: "no platform config directory available".to_string(),
    })?;

    let dir = base.join(APP_DIR);
    std::fs::create_dir_all(&dir).map_err(|e| BotError::ConfigDir {
        path: dir.clone(),
        detail: e.to_string(),
    })?;

    Ok(dir.join(TOKEN_FILE))
}

/// Read and trim the bot token from `path`.
///
/// # Errors
/// [`BotError::TokenNotFound`] when the file is absent,
/// [`BotError::TokenUnreadable`] on any other read failure, and
/// [`BotError::TokenEmpty`] when the file trims to nothing.
pub fn load_token(path: &Path) -> Result<String, BotError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BotError::TokenNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(BotError::TokenUnreadable {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err(BotError::TokenEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(token.to_string())
}
