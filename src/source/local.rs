use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SubweaveError};
use crate::language;
use super::{LanguageTrack, SubtitleSource, VideoRef};

const AUTO_SUFFIX: &str = ".auto";

/// Caption tracks previously downloaded into a directory.
///
/// Files are named `<video_id>.<code>.srt` for manually created tracks and
/// `<video_id>.<code>.auto.srt` for auto-generated ones.
pub struct LocalSubtitleSource {
    dir: PathBuf,
}

impl LocalSubtitleSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn track_path(&self, video: &VideoRef, code: &str, generated: bool) -> PathBuf {
        let suffix = if generated { AUTO_SUFFIX } else { "" };
        self.dir.join(format!("{}.{}{}.srt", video.id(), code, suffix))
    }
}

/// Split `<video_id>.<code>[.auto].srt` into its code and generated flag
fn parse_track_file_name(file_name: &str, video_id: &str) -> Option<(String, bool)> {
    let middle = file_name
        .strip_prefix(video_id)?
        .strip_prefix('.')?
        .strip_suffix(".srt")?;

    let (code, generated) = match middle.strip_suffix(AUTO_SUFFIX) {
        Some(code) => (code, true),
        None => (middle, false),
    };

    if code.is_empty() || code.contains('.') {
        return None;
    }
    Some((code.to_string(), generated))
}

#[async_trait]
impl SubtitleSource for LocalSubtitleSource {
    async fn list_languages(&self, video: &VideoRef) -> Result<Vec<LanguageTrack>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            SubweaveError::Source(format!("Cannot read subtitle directory {}: {}", self.dir.display(), e))
        })?;

        let mut tracks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((code, is_generated)) = parse_track_file_name(file_name, video.id()) {
                debug!("Found local track {} for {}", file_name, video);
                tracks.push(LanguageTrack {
                    name: language::display_name(&code),
                    code,
                    is_generated,
                });
            }
        }

        if tracks.is_empty() {
            return Err(SubweaveError::SourceNotFound(format!(
                "no subtitle tracks for video {} in {}",
                video,
                self.dir.display()
            )));
        }

        tracks.sort_by(|a, b| a.code.cmp(&b.code).then(a.is_generated.cmp(&b.is_generated)));
        Ok(tracks)
    }

    async fn fetch(&self, video: &VideoRef, language_code: &str) -> Result<String> {
        for generated in [false, true] {
            let path = self.track_path(video, language_code, generated);
            if path.exists() {
                debug!("Reading local track {}", path.display());
                return Ok(tokio::fs::read_to_string(&path).await?);
            }
        }

        Err(SubweaveError::SourceNotFound(format!(
            "no '{}' subtitles for video {} in {}",
            language_code,
            video,
            self.dir.display()
        )))
    }
}
