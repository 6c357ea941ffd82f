//! The polling loop: updates in, replies and files out.
//!
//! ## Concurrency model
//!
//! The loop itself only long-polls `getUpdates` and hands each message to a
//! spawned task. Everything slow — the render subprocess, the multipart
//! upload — happens inside those tasks, so one user's five-minute render
//! never delays anyone else's messages. The session store is the only
//! shared state; per-user transitions are atomic under its lock
//! ([`SessionStore::update`]).
//!
//! A panic inside a handler is caught at the task boundary, logged, and
//! answered with a generic failure message; the loop itself never goes down
//! for a bad request.

use crate::config::BotConfig;
use crate::dialog::{self, DialogOutcome, UPLOADED};
use crate::error::{BotError, RequestError};
use crate::render;
use crate::score::ScoreRequest;
use crate::session::SessionStore;
use crate::telegram::{Message, TelegramClient};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Pause before re-polling after a transport error, so a flaky network or a
/// Telegram hiccup does not turn the loop into a busy spin.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Verify the renderer launcher is on the search path.
///
/// Called at startup so a missing `npx` is a fatal configuration error
/// before the first request, not a per-request surprise.
pub fn ensure_renderer_available(config: &BotConfig) -> Result<(), BotError> {
    which::which(&config.renderer_program).map_err(|_| BotError::RendererMissing {
        program: config.renderer_program.clone(),
    })?;
    Ok(())
}

/// Run the bot until the process is stopped.
///
/// Polls `getUpdates` with the configured long-poll window, spawning one
/// task per inbound message. Transport errors are logged and retried;
/// only construction failures are fatal.
pub async fn run(config: BotConfig) -> Result<(), BotError> {
    let client = TelegramClient::new(&config)?;
    let config = Arc::new(config);
    let store = Arc::new(SessionStore::new());

    info!("bot starting, long-poll window {}s", config.poll_timeout_secs);

    let mut offset: i64 = 0;
    loop {
        let updates = match client.get_updates(offset, config.poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };

            let client = client.clone();
            let config = Arc::clone(&config);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let chat_id = message.chat.id;
                let handled =
                    AssertUnwindSafe(handle_message(&client, &store, &config, message))
                        .catch_unwind()
                        .await;
                if handled.is_err() {
                    error!(chat_id, "message handler panicked");
                    let generic = RequestError::Internal("handler panicked".into());
                    if let Err(e) = client.send_message(chat_id, &generic.user_message()).await {
                        warn!(chat_id, error = %e, "failed to send panic reply");
                    }
                }
            });
        }
    }
}

/// Handle one inbound message end to end.
///
/// Send failures are logged, never propagated: there is nobody upstream who
/// could do better than retry, and the user will simply re-send.
async fn handle_message(
    client: &TelegramClient,
    store: &SessionStore,
    config: &BotConfig,
    message: Message,
) {
    let chat_id = message.chat.id;
    let Some(text) = message.text.as_deref() else {
        // Stickers, photos, voice notes: nothing for the tracker to do.
        return;
    };
    // Group messages can lack a sender; fall back to the chat id so the
    // session key stays stable either way.
    let user_id = message.from.as_ref().map(|u| u.id).unwrap_or(chat_id);

    // Commands other than /start are dropped silently by the router.
    let Some(outcome) = dialog::handle(store, user_id, text) else {
        return;
    };

    match outcome {
        DialogOutcome::Reply(reply) => {
            send_text(client, chat_id, &reply).await;
        }
        DialogOutcome::Dispatch(request) => {
            run_render(client, store, config, user_id, chat_id, request).await;
        }
    }
}

/// Render and relay, then settle the session.
///
/// The `RenderedScore` (and with it the temp directory) is dropped before
/// this function returns on every path, upload failure included.
async fn run_render(
    client: &TelegramClient,
    store: &SessionStore,
    config: &BotConfig,
    user_id: i64,
    chat_id: i64,
    request: ScoreRequest,
) {
    match render::render(&request, config).await {
        Ok(rendered) => {
            if let Err(e) = client.send_rendered(chat_id, &rendered).await {
                warn!(chat_id, error = %e, "file upload failed");
                dialog::finish_render(store, user_id, false);
                let failure = RequestError::Internal(e.to_string());
                send_text(client, chat_id, &failure.user_message()).await;
                return;
            }
            dialog::finish_render(store, user_id, true);
            send_text(client, chat_id, UPLOADED).await;
        }
        Err(e) => {
            warn!(chat_id, error = %e, "render failed");
            dialog::finish_render(store, user_id, false);
            send_text(client, chat_id, &e.user_message()).await;
        }
    }
}

async fn send_text(client: &TelegramClient, chat_id: i64, text: &str) {
    if let Err(e) = client.send_message(chat_id, text).await {
        warn!(chat_id, error = %e, "failed to send reply");
    }
}
