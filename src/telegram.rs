//! Minimal Telegram Bot API client: long polling in, text and files out.
//!
//! Only the four methods the bot needs are implemented (`getUpdates`,
//! `sendMessage`, `sendAudio`, `sendDocument`); each is a thin wrapper over
//! one HTTPS call. JSON methods go through [`TelegramClient::call`]; the two
//! file uploads use multipart bodies because the Bot API only accepts local
//! files that way.

use crate::config::BotConfig;
use crate::error::BotError;
use crate::render::RenderedScore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An incoming update from `getUpdates`.
///
/// Fields the bot does not consume (edits, callbacks, inline queries) are
/// left undeclared; serde skips them.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// A chat message. `text` is `None` for stickers, photos, and the like.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// The Bot API's uniform response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesParams {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
}

/// HTTPS client bound to one bot token.
///
/// Cheap to clone (the inner `reqwest::Client` is an `Arc`), so spawned
/// render tasks each carry their own copy.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_base>/bot<token>` — method names are appended per call.
    base: String,
}

impl TelegramClient {
    /// Build a client from the bot configuration.
    ///
    /// The HTTP timeout leaves headroom over the long-poll window so a full
    /// `getUpdates` hold never trips the client-side deadline.
    pub fn new(config: &BotConfig) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 30))
            .build()
            .map_err(|e| BotError::Internal(format!("failed to build HTTP client: {e}")))?;

        let base = format!(
            "{}/bot{}",
            config.api_base.trim_end_matches('/'),
            config.token
        );
        Ok(Self { http, base })
    }

    /// Long-poll for updates past `offset`.
    ///
    /// Returns an empty vec when the window elapses with nothing new.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, BotError> {
        self.call(
            "getUpdates",
            &GetUpdatesParams {
                offset,
                timeout: timeout_secs,
                allowed_updates: ["message"],
            },
        )
        .await
    }

    /// Send a plain text reply into a chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        let _: Message = self
            .call("sendMessage", &SendMessageParams { chat_id, text })
            .await?;
        Ok(())
    }

    /// Relay a rendered score into a chat.
    ///
    /// mp3 goes out as an audio attachment, everything else as a generic
    /// document, matching how Telegram clients present each.
    pub async fn send_rendered(
        &self,
        chat_id: i64,
        rendered: &RenderedScore,
    ) -> Result<(), BotError> {
        let (method, field) = if rendered.format().is_audio() {
            ("sendAudio", "audio")
        } else {
            ("sendDocument", "document")
        };

        let bytes = tokio::fs::read(rendered.path()).await.map_err(|e| {
            BotError::Internal(format!(
                "failed to read artifact '{}': {e}",
                rendered.path().display()
            ))
        })?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(rendered.file_name());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part);

        let response = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BotError::Transport {
                method: method.to_string(),
                source: e,
            })?;

        let _: Message = Self::decode(method, response).await?;
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    /// POST a JSON-parameter method and unwrap the response envelope.
    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<T, BotError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| BotError::Transport {
                method: method.to_string(),
                source: e,
            })?;

        Self::decode(method, response).await
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, BotError> {
        let envelope: ApiResponse<T> =
            response
                .json()
                .await
                .map_err(|e| BotError::BadApiResponse {
                    method: method.to_string(),
                    detail: e.to_string(),
                })?;

        if !envelope.ok {
            return Err(BotError::ApiRejected {
                method: method.to_string(),
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope.result.ok_or_else(|| BotError::BadApiResponse {
            method: method.to_string(),
            detail: "ok response with no result".to_string(),
        })
    }
}
