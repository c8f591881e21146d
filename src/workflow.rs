use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubweaveError};
use crate::inference::{InferenceClient, InferenceClientFactory};
use crate::language;
use crate::source::{SubtitleSource, VideoRef, select_track};
use crate::subtitle::{self, read_srt, write_srt};
use crate::translate::{JobReport, JobSettings, ProgressSink, TranslationJob};

/// A finished translation and where it was written
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub output_path: PathBuf,
    pub report: JobReport,
}

pub struct Workflow {
    config: Config,
    client: Box<dyn InferenceClient>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = InferenceClientFactory::create(&config.inference)?;
        Ok(Self { config, client })
    }

    /// Build a workflow around an existing inference client
    pub fn with_client(config: Config, client: Box<dyn InferenceClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the inference service can be used
    pub async fn check_service(&self) -> Result<()> {
        self.client.check_availability().await
    }

    /// Target language from the argument, falling back to the configuration
    pub fn target_language(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.config.translate.target_language.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SubweaveError::Precondition("no target language given".to_string()))
    }

    /// `<dir>/<stem>_<target-tag>.srt`
    pub fn output_path(&self, input_path: &Path, target_language: &str, output_dir: Option<&Path>) -> Result<PathBuf> {
        let stem = input_path
            .file_stem()
            .ok_or_else(|| SubweaveError::Config(format!("Invalid subtitle filename: {}", input_path.display())))?
            .to_string_lossy();

        let dir = match output_dir.or(self.config.output.directory.as_deref()) {
            Some(dir) => dir.to_path_buf(),
            None => input_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        Ok(dir.join(format!("{}_{}.srt", stem, language::file_tag(target_language))))
    }

    /// Translate one SRT file and write the result next to it (or into `output_dir`)
    pub async fn translate_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        target_language: &str,
        output_dir: Option<&Path>,
        progress: &dyn ProgressSink,
    ) -> Result<TranslationOutcome> {
        let input_path = input_path.as_ref();
        info!("Translating {} into {}", input_path.display(), target_language);

        let output_path = self.output_path(input_path, target_language, output_dir)?;
        if output_path.exists() && !self.config.output.overwrite {
            return Err(SubweaveError::OutputExists(output_path.display().to_string()));
        }

        let cues = read_srt(input_path).await?;
        let settings = JobSettings::from_config(&self.config.translate, target_language)?;
        let report = TranslationJob::new(self.client.as_ref(), settings)
            .with_progress(progress)
            .run(cues)
            .await?;

        write_srt(&report.cues, &output_path).await?;
        if report.untranslated_chunks() > 0 {
            warn!(
                "{} of {} chunks kept their original text in {}",
                report.untranslated_chunks(),
                report.chunks.len(),
                output_path.display()
            );
        }
        info!("Translated subtitles saved to {}", output_path.display());

        Ok(TranslationOutcome { output_path, report })
    }

    /// Translate every SRT file under a directory; failures are logged and skipped
    pub async fn translate_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        target_language: &str,
        output_dir: Option<&Path>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<TranslationOutcome>> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SubweaveError::Config("Input path is not a directory".to_string()));
        }

        let output_suffix = format!("_{}", language::file_tag(target_language));
        let mut subtitle_files = Vec::new();
        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_srt = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"));
            let is_own_output = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.ends_with(&output_suffix));
            if entry.file_type().is_file() && is_srt && !is_own_output {
                subtitle_files.push(path.to_path_buf());
            }
        }
        subtitle_files.sort();

        info!("Found {} subtitle files to translate", subtitle_files.len());

        let mut outcomes = Vec::new();
        for path in subtitle_files {
            match self.translate_file(&path, target_language, output_dir, progress).await {
                Ok(outcome) => {
                    info!("Successfully translated: {}", path.display());
                    outcomes.push(outcome);
                }
                Err(e) => warn!("Failed to translate {}: {}", path.display(), e),
            }
        }

        Ok(outcomes)
    }

    /// Fetch a video's caption track from `source` and translate it.
    ///
    /// The original track is saved as `<video_id>_<code>.srt` in `output_dir`
    /// and the translation is written beside it.
    pub async fn translate_video(
        &self,
        source: &dyn SubtitleSource,
        video: &VideoRef,
        source_language: &str,
        target_language: &str,
        output_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<TranslationOutcome> {
        info!("Fetching subtitles for video {}", video);

        let tracks = source.list_languages(video).await?;
        let track = select_track(&tracks, source_language)?;
        let raw = source.fetch(video, &track.code).await?;

        let cues = subtitle::parse(&raw);
        fs::create_dir_all(output_dir).await?;
        let original_path = output_dir.join(format!("{}_{}.srt", video.id(), track.code));
        write_srt(&cues, &original_path).await?;
        info!("Original subtitles ({} cues) saved to {}", cues.len(), original_path.display());

        self.translate_file(&original_path, target_language, Some(output_dir), progress).await
    }
}
