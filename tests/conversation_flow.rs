//! Integration tests: full conversation cycles through the public API,
//! with renders performed by stub renderer scripts.
//!
//! The Telegram transport is not exercised here — the dialog layer is
//! transport-free by design, and the dispatcher accepts any executable as
//! its renderer, so a complete link → format → file → re-render cycle can
//! run hermetically.

#![cfg(unix)]

use scorebot::{
    dialog, render, BotConfig, DialogOutcome, RequestError, ScoreFormat, SessionState,
    SessionStore,
};
use std::path::{Path, PathBuf};

const LINK: &str = "https://musescore.com/user/12345/scores/67890";

// ── Test helpers ─────────────────────────────────────────────────────────

/// Write an executable stub that behaves like the renderer CLI: it scans
/// argv for `-o <dir>` and `-t <format>`, then runs `body`.
fn stub_renderer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("renderer.sh");
    let contents = format!(
        "#!/bin/sh\nout=\"\"\nfmt=\"\"\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    -o) out=\"$2\" ;;\n    -t) fmt=\"$2\" ;;\n  esac\n  shift\ndone\n{body}\n"
    );
    std::fs::write(&script, contents).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn config_for(script: &Path) -> BotConfig {
    BotConfig::builder("integration-test-token")
        .renderer_program(script.to_string_lossy().to_string())
        .renderer_args(Vec::new())
        .render_timeout_secs(30)
        .build()
        .unwrap()
}

/// Drive the dialog until it dispatches, then run the render and settle the
/// session the way the bot loop does.
async fn render_cycle(
    store: &SessionStore,
    config: &BotConfig,
    user: i64,
    format_token: &str,
) -> Result<PathBuf, RequestError> {
    let outcome = dialog::handle_text(store, user, format_token);
    let DialogOutcome::Dispatch(request) = outcome else {
        panic!("expected a dispatch, got {outcome:?}");
    };

    match render::render(&request, config).await {
        Ok(rendered) => {
            let path = rendered.path().to_path_buf();
            assert!(path.is_file());
            dialog::finish_render(store, user, true);
            // Relay would happen here; dropping the artifact stands in for
            // "uploaded and discarded".
            drop(rendered);
            Ok(path)
        }
        Err(e) => {
            dialog::finish_render(store, user, false);
            Err(e)
        }
    }
}

// ── Full-cycle tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn link_format_file_cycle_cleans_up_and_parks_in_delivered() {
    let scripts = tempfile::tempdir().unwrap();
    let script = stub_renderer(
        scripts.path(),
        "printf fake-midi > \"$out/etude.$fmt\"",
    );
    let config = config_for(&script);
    let store = SessionStore::new();

    assert_eq!(
        dialog::handle_text(&store, 1, LINK),
        DialogOutcome::Reply(dialog::FORMAT_PROMPT.into())
    );

    let artifact = render_cycle(&store, &config, 1, "midi").await.unwrap();
    assert!(artifact.to_string_lossy().ends_with("etude.midi"));
    assert!(!artifact.exists(), "artifact must be gone after the cycle");

    let session = store.get(1).unwrap();
    assert_eq!(session.state, SessionState::FileDelivered);
    assert_eq!(session.format, Some(ScoreFormat::Midi));
}

#[tokio::test]
async fn rerender_in_a_new_format_reuses_the_stored_link() {
    let scripts = tempfile::tempdir().unwrap();
    let script = stub_renderer(scripts.path(), "printf x > \"$out/score.$fmt\"");
    let config = config_for(&script);
    let store = SessionStore::new();

    dialog::handle_text(&store, 1, LINK);
    render_cycle(&store, &config, 1, "mp3").await.unwrap();

    // From FileDelivered, a bare format token re-renders the same link.
    let outcome = dialog::handle_text(&store, 1, "pdf");
    let DialogOutcome::Dispatch(request) = outcome else {
        panic!("expected a re-render dispatch, got {outcome:?}");
    };
    assert_eq!(request.link.as_str(), LINK);
    assert_eq!(request.format, ScoreFormat::Pdf);
}

#[tokio::test]
async fn renderer_failure_reports_code_and_resets_session() {
    let scripts = tempfile::tempdir().unwrap();
    // Record the output dir the renderer was handed so the cleanup can be
    // asserted from outside after the failure.
    let side = scripts.path().join("handed-out-dir");
    let script = stub_renderer(
        scripts.path(),
        &format!("printf %s \"$out\" > \"{}\"\nexit 2", side.display()),
    );
    let config = config_for(&script);
    let store = SessionStore::new();

    dialog::handle_text(&store, 1, LINK);
    let err = render_cycle(&store, &config, 1, "pdf").await.unwrap_err();

    assert_eq!(err, RequestError::RendererFailed { code: 2 });
    assert!(err.user_message().contains('2'));

    let session = store.get(1).unwrap();
    assert_eq!(session.state, SessionState::AwaitingLink);
    assert!(session.link.is_none(), "failed cycle must not keep the link");

    let out_dir = PathBuf::from(std::fs::read_to_string(&side).unwrap().trim().to_string());
    assert!(
        !out_dir.exists(),
        "temp output dir must be gone after a failed render"
    );
}

#[tokio::test]
async fn concurrent_users_render_independently() {
    let scripts = tempfile::tempdir().unwrap();
    let script = stub_renderer(scripts.path(), "printf x > \"$out/out.$fmt\"");
    let config = config_for(&script);
    let store = std::sync::Arc::new(SessionStore::new());
    let config = std::sync::Arc::new(config);

    let mut handles = Vec::new();
    for user in 1..=4i64 {
        let store = std::sync::Arc::clone(&store);
        let config = std::sync::Arc::clone(&config);
        handles.push(tokio::spawn(async move {
            let link = format!("https://musescore.com/user/{user}/scores/{user}");
            dialog::handle_text(&store, user, &link);
            let token = ScoreFormat::ALL[(user % 3) as usize].as_str();
            render_cycle(&store, &config, user, token).await.unwrap();
            link
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let user = (i + 1) as i64;
        let link = handle.await.unwrap();
        let session = store.get(user).unwrap();
        assert_eq!(session.state, SessionState::FileDelivered);
        assert_eq!(
            session.link.unwrap().as_str(),
            link,
            "user {user} must keep their own link"
        );
    }
}

// ── Validation scenarios (spec'd end to end) ─────────────────────────────

#[test]
fn wrong_domain_is_rejected_without_advancing() {
    let store = SessionStore::new();
    let outcome = dialog::handle_text(&store, 1, "https://example.com/user/1/scores/2");
    assert_eq!(outcome, DialogOutcome::Reply("Incorrect domain name!".into()));
    assert_eq!(store.get(1).unwrap().state, SessionState::AwaitingLink);
}

#[test]
fn messy_format_token_normalises_before_dispatch() {
    let store = SessionStore::new();
    dialog::handle_text(&store, 1, LINK);
    let DialogOutcome::Dispatch(request) = dialog::handle_text(&store, 1, " MP3 ") else {
        panic!("expected dispatch");
    };
    assert_eq!(request.format.as_str(), "mp3");
}

#[test]
fn start_command_resets_mid_conversation() {
    let store = SessionStore::new();
    dialog::handle_text(&store, 1, LINK);
    assert_eq!(store.get(1).unwrap().state, SessionState::AwaitingFormat);

    let outcome = dialog::handle_start(&store, 1);
    assert_eq!(outcome, DialogOutcome::Reply(dialog::GREETING.into()));
    assert_eq!(store.get(1).unwrap().state, SessionState::AwaitingLink);
}
