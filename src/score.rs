//! Domain types: validated score links, render formats, render requests.
//!
//! ## Why validate eagerly?
//!
//! The link text is user-supplied and eventually lands on the external
//! renderer's command line. Parsing it into a [`ScoreUrl`] up front means the
//! rest of the crate only ever handles links that are known to point at the
//! score host, and the dispatcher can pass the original string through as a
//! plain argument-vector element with no shell involved.

use crate::error::RequestError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only host scores are accepted from.
pub const SCORE_HOST: &str = "musescore.com";

/// Canonical score path: `/user/<id>/scores/<id>`.
static USER_SCORE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^/user/\d+/scores/\d+").expect("valid regex"));

/// Short share path: `/<slug>/<slug>`.
static SLUG_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^/[\w-]+/[\w-]+").expect("valid regex"));

/// A link that has been checked against the score-host URL policy.
///
/// The inner string is the user's input verbatim — no normalisation — so the
/// renderer sees exactly what the user pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUrl(String);

impl ScoreUrl {
    /// Validate `input` as a score link.
    ///
    /// Policy: absolute URL, host exactly [`SCORE_HOST`], path matching the
    /// numeric `/user/<id>/scores/<id>` shape or the two-segment slug shape.
    ///
    /// # Errors
    /// [`RequestError::MalformedUrl`] when the text is not an absolute URL,
    /// [`RequestError::WrongDomain`] on a host mismatch, and
    /// [`RequestError::BadScorePath`] when the path fits neither shape.
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let url = reqwest::Url::parse(input).map_err(|_| RequestError::MalformedUrl {
            input: input.to_string(),
        })?;

        let host = url.host_str().ok_or_else(|| RequestError::MalformedUrl {
            input: input.to_string(),
        })?;
        if !host.eq_ignore_ascii_case(SCORE_HOST) {
            return Err(RequestError::WrongDomain {
                expected: SCORE_HOST.to_string(),
                got: host.to_string(),
            });
        }

        let path = url.path();
        if !USER_SCORE_PATH.is_match(path) && !SLUG_PATH.is_match(path) {
            return Err(RequestError::BadScorePath {
                path: path.to_string(),
            });
        }

        Ok(Self(input.to_string()))
    }

    /// The original link text, unchanged.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output format a score can be rendered to.
///
/// The token names follow the external renderer's `-t` argument; the
/// Telegram relay method (audio vs document attachment) hangs off
/// [`ScoreFormat::is_audio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreFormat {
    /// Rendered audio (`.mp3`), relayed as an audio attachment.
    Mp3,
    /// MIDI file (`.mid`), relayed as a document.
    Midi,
    /// Engraved PDF (`.pdf`), relayed as a document.
    Pdf,
}

impl ScoreFormat {
    /// Every supported format, in the order shown to users.
    pub const ALL: [ScoreFormat; 3] = [ScoreFormat::Mp3, ScoreFormat::Midi, ScoreFormat::Pdf];

    /// The renderer's format token.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreFormat::Mp3 => "mp3",
            ScoreFormat::Midi => "midi",
            ScoreFormat::Pdf => "pdf",
        }
    }

    /// File extension of the produced artifact.
    pub fn extension(self) -> &'static str {
        match self {
            ScoreFormat::Mp3 => "mp3",
            ScoreFormat::Midi => "mid",
            ScoreFormat::Pdf => "pdf",
        }
    }

    /// Whether the artifact is relayed as an audio attachment
    /// (everything else goes out as a generic document).
    pub fn is_audio(self) -> bool {
        matches!(self, ScoreFormat::Mp3)
    }

    /// Parse a user-typed token: whitespace-trimmed, case-insensitive.
    ///
    /// # Errors
    /// [`RequestError::UnknownFormat`] naming the offending token.
    pub fn parse(token: &str) -> Result<Self, RequestError> {
        let normalised = token.trim().to_ascii_lowercase();
        match normalised.as_str() {
            "mp3" => Ok(ScoreFormat::Mp3),
            "midi" => Ok(ScoreFormat::Midi),
            "pdf" => Ok(ScoreFormat::Pdf),
            _ => Err(RequestError::UnknownFormat {
                token: token.trim().to_string(),
            }),
        }
    }
}

impl FromStr for ScoreFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScoreFormat::parse(s)
    }
}

impl fmt::Display for ScoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully validated render request, handed to the dispatcher.
///
/// Ephemeral: built when both inputs are in, dropped once the render
/// completes. Never stored in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRequest {
    pub link: ScoreUrl,
    pub format: ScoreFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_user_score_path() {
        let input = "https://musescore.com/user/12345/scores/67890";
        let url = ScoreUrl::parse(input).unwrap();
        assert_eq!(url.as_str(), input); // preserved verbatim
    }

    #[test]
    fn accepts_slug_path() {
        assert!(ScoreUrl::parse("https://musescore.com/someone/moonlight-sonata").is_ok());
    }

    #[test]
    fn host_check_is_case_insensitive() {
        assert!(ScoreUrl::parse("https://MuseScore.com/user/1/scores/2").is_ok());
    }

    #[test]
    fn rejects_wrong_domain() {
        let err = ScoreUrl::parse("https://example.com/user/1/scores/2").unwrap_err();
        assert!(matches!(err, RequestError::WrongDomain { .. }));
        assert!(err.user_message().to_lowercase().contains("domain"));
    }

    #[test]
    fn rejects_non_url_text() {
        let err = ScoreUrl::parse("hello there").unwrap_err();
        assert!(matches!(err, RequestError::MalformedUrl { .. }));
    }

    #[test]
    fn rejects_bad_path_shape() {
        let err = ScoreUrl::parse("https://musescore.com/").unwrap_err();
        assert!(matches!(err, RequestError::BadScorePath { .. }));
    }

    #[test]
    fn format_parse_trims_and_lowercases() {
        assert_eq!(ScoreFormat::parse("MP3 ").unwrap(), ScoreFormat::Mp3);
        assert_eq!(ScoreFormat::parse("  Midi").unwrap(), ScoreFormat::Midi);
        assert_eq!(ScoreFormat::parse("pdf").unwrap(), ScoreFormat::Pdf);
    }

    #[test]
    fn format_parse_rejects_unknown_token() {
        let err = ScoreFormat::parse(" flac ").unwrap_err();
        assert_eq!(
            err,
            RequestError::UnknownFormat {
                token: "flac".into()
            }
        );
    }

    #[test]
    fn format_metadata_matches_relay_rules() {
        assert!(ScoreFormat::Mp3.is_audio());
        assert!(!ScoreFormat::Midi.is_audio());
        assert!(!ScoreFormat::Pdf.is_audio());
        assert_eq!(ScoreFormat::Midi.extension(), "mid");
    }
}
