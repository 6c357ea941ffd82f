//! The render dispatcher: invoke the external renderer, hand back its file.
//!
//! ## Why a TempDir inside the result?
//!
//! The renderer writes its artifact to a directory we hand it, and that
//! artifact must outlive this call just long enough to be uploaded to the
//! chat. Returning the `TempDir` inside [`RenderedScore`] ties the artifact's
//! lifetime to the value: when the caller drops the result — after a
//! successful relay, on an upload error, or during a panic unwind — the
//! directory and everything in it is removed. No request ever leaves a
//! directory behind, so disk use stays flat across any number of renders.
//!
//! ## Injection safety
//!
//! The link is user-supplied text. It is passed to the subprocess as one
//! element of an argument vector; no shell ever interprets it.

use crate::config::BotConfig;
use crate::error::RequestError;
use crate::score::{ScoreFormat, ScoreRequest};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A rendered artifact, alive until dropped.
///
/// The `TempDir` is kept to prevent cleanup until the file has been relayed
/// (the teacher contract: exactly one artifact per invocation).
#[derive(Debug)]
pub struct RenderedScore {
    path: PathBuf,
    format: ScoreFormat,
    _temp_dir: TempDir,
}

impl RenderedScore {
    /// Path to the artifact on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The format this artifact was rendered in.
    pub fn format(&self) -> ScoreFormat {
        self.format
    }

    /// Filename to tag the upload with.
    ///
    /// Prefers the renderer's own name (it usually embeds the score title);
    /// falls back to `score.<ext>` if that name is unusable.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("score.{}", self.format.extension()))
    }
}

/// Render `request` with the external tool.
///
/// Invocation: `<program> <args..> -i <link> -t <format> -o <temp dir>`,
/// bounded by `config.render_timeout()`. The subprocess is killed if the
/// deadline passes or this future is dropped.
///
/// # Errors
/// * [`RequestError::RendererFailed`] — non-zero exit, carrying the code.
/// * [`RequestError::RendererTimeout`] — deadline exceeded.
/// * [`RequestError::NoArtifact`] — exit zero but nothing written.
/// * [`RequestError::Internal`] — spawn or I/O failure.
///
/// All failure paths drop the temp directory before returning.
pub async fn render(
    request: &ScoreRequest,
    config: &BotConfig,
) -> Result<RenderedScore, RequestError> {
    let out_dir = TempDir::new()
        .map_err(|e| RequestError::Internal(format!("failed to create temp dir: {e}")))?;

    info!(
        link = %request.link,
        format = %request.format,
        "starting render"
    );

    let mut cmd = Command::new(&config.renderer_program);
    cmd.args(&config.renderer_args)
        .arg("-i")
        .arg(request.link.as_str())
        .arg("-t")
        .arg(request.format.as_str())
        .arg("-o")
        .arg(out_dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| RequestError::Internal(format!("failed to spawn renderer: {e}")))?;

    let output = match timeout(config.render_timeout(), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(RequestError::Internal(format!("renderer I/O error: {e}")));
        }
        Err(_elapsed) => {
            warn!(
                secs = config.render_timeout_secs,
                "renderer exceeded deadline, killed"
            );
            return Err(RequestError::RendererTimeout {
                secs: config.render_timeout_secs,
            });
        }
    };

    if !output.status.success() {
        // Signal-terminated processes have no exit code on unix.
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(code, stderr = %stderr.trim(), "renderer failed");
        return Err(RequestError::RendererFailed { code });
    }

    let artifact = first_file_in(out_dir.path())?;
    debug!(artifact = %artifact.display(), "render complete");

    Ok(RenderedScore {
        path: artifact,
        format: request.format,
        _temp_dir: out_dir,
    })
}

/// Locate the single artifact the renderer wrote.
fn first_file_in(dir: &Path) -> Result<PathBuf, RequestError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RequestError::Internal(format!("failed to read output dir: {e}")))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| RequestError::Internal(format!("failed to read output dir: {e}")))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            return Ok(entry.path());
        }
    }
    Err(RequestError::NoArtifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreUrl;

    const LINK: &str = "https://musescore.com/user/12345/scores/67890";

    fn request(format: ScoreFormat) -> ScoreRequest {
        ScoreRequest {
            link: ScoreUrl::parse(LINK).unwrap(),
            format,
        }
    }

    /// Write an executable stub renderer script and return its path.
    ///
    /// The stub understands the real invocation shape: it scans its argv for
    /// `-o <dir>` and behaves per `body`.
    #[cfg(unix)]
    fn stub_renderer(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("stub-renderer.sh");
        let contents = format!(
            "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n  shift\ndone\n{body}\n"
        );
        std::fs::write(&script, contents).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    fn config_with(script: &Path, timeout_secs: u64) -> BotConfig {
        BotConfig::builder("test-token")
            .renderer_program(script.to_string_lossy().to_string())
            .renderer_args(Vec::new())
            .render_timeout_secs(timeout_secs)
            .build()
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_returns_artifact_and_cleans_up_on_drop() {
        let scripts = tempfile::tempdir().unwrap();
        let script = stub_renderer(scripts.path(), "printf score-bytes > \"$out/sonata.pdf\"");
        let config = config_with(&script, 30);

        let rendered = render(&request(ScoreFormat::Pdf), &config).await.unwrap();
        assert_eq!(rendered.file_name(), "sonata.pdf");
        assert_eq!(rendered.format(), ScoreFormat::Pdf);
        assert!(rendered.path().is_file());

        let artifact = rendered.path().to_path_buf();
        let temp_root = artifact.parent().unwrap().to_path_buf();
        drop(rendered);
        assert!(!artifact.exists(), "artifact must be deleted on drop");
        assert!(!temp_root.exists(), "temp dir must be deleted on drop");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_surfaces_the_code() {
        let scripts = tempfile::tempdir().unwrap();
        let script = stub_renderer(scripts.path(), "exit 2");
        let config = config_with(&script, 30);

        let err = render(&request(ScoreFormat::Mp3), &config).await.unwrap_err();
        assert_eq!(err, RequestError::RendererFailed { code: 2 });
        assert!(err.user_message().contains('2'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_render_leaves_no_temp_dir_behind() {
        let scripts = tempfile::tempdir().unwrap();
        // The stub records the output dir it was handed, then fails; the
        // recording is the only way to observe the dir from outside.
        let side = scripts.path().join("handed-out-dir");
        let script = stub_renderer(
            scripts.path(),
            &format!("printf %s \"$out\" > \"{}\"\nexit 3", side.display()),
        );
        let config = config_with(&script, 30);

        let err = render(&request(ScoreFormat::Pdf), &config).await.unwrap_err();
        assert_eq!(err, RequestError::RendererFailed { code: 3 });

        let recorded = std::fs::read_to_string(&side).unwrap();
        let out_dir = PathBuf::from(recorded.trim());
        assert!(
            !out_dir.exists(),
            "temp output dir must be cleaned up after a failed render"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_without_artifact_is_an_error() {
        let scripts = tempfile::tempdir().unwrap();
        let script = stub_renderer(scripts.path(), "true");
        let config = config_with(&script, 30);

        let err = render(&request(ScoreFormat::Midi), &config).await.unwrap_err();
        assert_eq!(err, RequestError::NoArtifact);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_renderer_times_out() {
        let scripts = tempfile::tempdir().unwrap();
        let script = stub_renderer(scripts.path(), "sleep 30");
        let config = config_with(&script, 1);

        let err = render(&request(ScoreFormat::Pdf), &config).await.unwrap_err();
        assert_eq!(err, RequestError::RendererTimeout { secs: 1 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_program_is_an_internal_error() {
        let config = BotConfig::builder("test-token")
            .renderer_program("/nonexistent/renderer-binary")
            .renderer_args(Vec::new())
            .build()
            .unwrap();

        let err = render(&request(ScoreFormat::Pdf), &config).await.unwrap_err();
        assert!(matches!(err, RequestError::Internal(_)));
    }
}
