// Subtitle source providers
//
// A source lists the caption tracks of a video and fetches one of them as SRT
// text. The translation core never talks to a source directly; the workflow
// fetches the original track and hands its text to a job.

pub mod local;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

pub use local::LocalSubtitleSource;

use crate::error::{Result, SubweaveError};
use crate::language;

static VIDEO_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:https?://)?(?:www\.|m\.)?youtube\.com/watch\?(?:.*&)?v=([^&#]+)",
        r"(?:https?://)?(?:www\.)?youtu\.be/([^?&#/]+)",
        r"(?:https?://)?(?:www\.)?youtube\.com/embed/([^?&#/]+)",
        r"(?:https?://)?(?:www\.)?youtube\.com/v/([^?&#/]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("video url regex is valid"))
    .collect()
});

static VIDEO_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{6,}$").expect("video id regex is valid")
});

/// A video identified by its platform id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoRef {
    id: String,
}

impl VideoRef {
    /// Accept a watch/short/embed URL or a bare video id
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        for pattern in VIDEO_URL_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(input) {
                return Ok(Self { id: captures[1].to_string() });
            }
        }

        if VIDEO_ID_REGEX.is_match(input) {
            return Ok(Self { id: input.to_string() });
        }

        Err(SubweaveError::InvalidVideoRef(input.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTrack {
    pub name: String,
    pub code: String,
    pub is_generated: bool,
}

/// Provider of caption tracks
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Tracks available for a video
    async fn list_languages(&self, video: &VideoRef) -> Result<Vec<LanguageTrack>>;

    /// Raw SRT text of one track
    async fn fetch(&self, video: &VideoRef, language_code: &str) -> Result<String>;
}

/// Ask `primary` first and `fallback` whenever `primary` fails
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P: SubtitleSource, F: SubtitleSource> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: SubtitleSource, F: SubtitleSource> SubtitleSource for FallbackSource<P, F> {
    async fn list_languages(&self, video: &VideoRef) -> Result<Vec<LanguageTrack>> {
        match self.primary.list_languages(video).await {
            Ok(tracks) => Ok(tracks),
            Err(e) => {
                warn!("Primary subtitle source failed to list tracks for {}: {}; trying fallback", video, e);
                self.fallback.list_languages(video).await
            }
        }
    }

    async fn fetch(&self, video: &VideoRef, language_code: &str) -> Result<String> {
        match self.primary.fetch(video, language_code).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!("Primary subtitle source failed to fetch {} ({}): {}; trying fallback", video, language_code, e);
                self.fallback.fetch(video, language_code).await
            }
        }
    }
}

/// Pick the track for a requested source language.
///
/// Matching order: exact code, language name, primary subtag. The subtag
/// rule only widens a bare request (`en` matches `en-US`); a regional
/// request never falls back to another region. Within a matching rule a
/// manually created track beats an auto-generated one.
pub fn select_track<'t>(tracks: &'t [LanguageTrack], requested: &str) -> Result<&'t LanguageTrack> {
    let requested = requested.trim();
    let requested_code = language::code_for(requested).unwrap_or(requested);
    let requested_is_bare = language::primary_subtag(requested_code).len() == requested_code.len();

    let rules: [&dyn Fn(&LanguageTrack) -> bool; 3] = [
        &|t: &LanguageTrack| t.code.eq_ignore_ascii_case(requested_code),
        &|t: &LanguageTrack| t.name.eq_ignore_ascii_case(requested),
        &|t: &LanguageTrack| {
            requested_is_bare && language::primary_subtag(&t.code).eq_ignore_ascii_case(requested_code)
        },
    ];

    for rule in rules {
        let mut candidates: Vec<&LanguageTrack> = tracks.iter().filter(|t| rule(t)).collect();
        candidates.sort_by_key(|t| t.is_generated);
        if let Some(track) = candidates.first() {
            info!(
                "Selected subtitle track {} ({}){}",
                track.name,
                track.code,
                if track.is_generated { " [auto-generated]" } else { "" }
            );
            return Ok(*track);
        }
    }

    let available = tracks.iter().map(|t| t.code.as_str()).collect::<Vec<_>>().join(", ");
    Err(SubweaveError::Precondition(format!(
        "source language '{}' is not among the available tracks: [{}]",
        requested, available
    )))
}
