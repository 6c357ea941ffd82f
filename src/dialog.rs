//! The conversation tracker: one inbound text in, one outcome out.
//!
//! This module is deliberately transport-free. It knows nothing about
//! Telegram or subprocesses — it reads the user's [`Session`], validates the
//! text against what the current state expects, mutates the session, and
//! tells the caller what to do next ([`DialogOutcome`]). That keeps the
//! whole state machine testable without a network or a renderer.
//!
//! ## State machine
//!
//! ```text
//! AwaitingLink   ──valid link──▶ AwaitingFormat ──valid format──▶ (dispatch)
//!      ▲  │invalid: error reply       │invalid: error reply           │
//!      │  ▼ (stay)                    ▼ (stay)                        │
//!      │                                              success         ▼
//!      └────────render failed (reset)────────────── FileDelivered ◀───┘
//!                                                     │  │
//!                            new valid link ──────────┘  └── bare format
//!                            (restart cycle)                 (re-render)
//! ```

use crate::score::{ScoreFormat, ScoreRequest, ScoreUrl};
use crate::session::{Session, SessionState, SessionStore, UserId};
use tracing::debug;

/// Greeting sent for `/start`.
pub const GREETING: &str = "Hi! To download sheet music, please send a musescore link.";

/// Prompt listing the supported format tokens.
pub const FORMAT_PROMPT: &str =
    "Type the file format you'd like to download the score in:\nmp3\nmidi\npdf";

/// Reply once a file has been relayed.
pub const UPLOADED: &str = "File uploaded. Enjoy!";

/// Nudge for unusable input in the post-delivery state.
pub const DELIVERED_NUDGE: &str = "Error: Please send a musescore link to start another \
download or choose another format to download.";

/// What the transport layer should do after a message was tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Send this text back to the chat; no render involved.
    Reply(String),
    /// Both inputs are in: run a render, then report back via
    /// [`finish_render`].
    Dispatch(ScoreRequest),
}

/// Route one inbound text message.
///
/// `/start` greets and resets; any other command is ignored entirely
/// (commands are not conversation input, same as stickers or photos);
/// everything else goes through the state machine.
pub fn handle(store: &SessionStore, user: UserId, text: &str) -> Option<DialogOutcome> {
    let trimmed = text.trim();
    if trimmed == "/start" {
        return Some(handle_start(store, user));
    }
    if trimmed.starts_with('/') {
        return None;
    }
    Some(handle_text(store, user, text))
}

/// Handle `/start`: greet and reset the session.
pub fn handle_start(store: &SessionStore, user: UserId) -> DialogOutcome {
    store.update(user, |s| s.reset());
    DialogOutcome::Reply(GREETING.to_string())
}

/// Advance the user's conversation with one inbound text message.
///
/// Validation failures never advance the state; they only produce an error
/// reply so the user can retry.
pub fn handle_text(store: &SessionStore, user: UserId, text: &str) -> DialogOutcome {
    store.update(user, |s| {
        let outcome = match s.state {
            SessionState::AwaitingLink => on_link(s, text),
            SessionState::AwaitingFormat => on_format(s, text),
            SessionState::FileDelivered => on_delivered(s, text),
        };
        debug!(user, state = ?s.state, ?outcome, "dialog step");
        outcome
    })
}

/// Record a finished render: success parks the session in
/// [`SessionState::FileDelivered`] (link kept for re-renders), failure
/// resets it so the user starts over with a fresh link.
pub fn finish_render(store: &SessionStore, user: UserId, success: bool) {
    store.update(user, |s| {
        if success {
            s.state = SessionState::FileDelivered;
        } else {
            s.reset();
        }
    });
}

fn on_link(s: &mut Session, text: &str) -> DialogOutcome {
    match ScoreUrl::parse(text.trim()) {
        Ok(url) => {
            s.link = Some(url);
            s.format = None;
            s.state = SessionState::AwaitingFormat;
            DialogOutcome::Reply(FORMAT_PROMPT.to_string())
        }
        Err(e) => DialogOutcome::Reply(e.user_message()),
    }
}

fn on_format(s: &mut Session, text: &str) -> DialogOutcome {
    let format = match ScoreFormat::parse(text) {
        Ok(f) => f,
        Err(e) => return DialogOutcome::Reply(e.user_message()),
    };

    // `link` is always set on entry to AwaitingFormat; a missing one means
    // the session was clobbered, so start the cycle over.
    let Some(link) = s.link.clone() else {
        s.reset();
        return DialogOutcome::Reply(GREETING.to_string());
    };

    s.format = Some(format);
    DialogOutcome::Dispatch(ScoreRequest { link, format })
}

fn on_delivered(s: &mut Session, text: &str) -> DialogOutcome {
    // A new link restarts the cycle; a bare format re-renders the last link.
    if ScoreUrl::parse(text.trim()).is_ok() {
        s.state = SessionState::AwaitingLink;
        return on_link(s, text);
    }
    if ScoreFormat::parse(text).is_ok() {
        s.state = SessionState::AwaitingFormat;
        return on_format(s, text);
    }
    DialogOutcome::Reply(DELIVERED_NUDGE.to_string())
}
