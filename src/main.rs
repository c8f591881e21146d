//! Subweave - Chunked Subtitle Translation
//!
//! Command line entry point: loads configuration, sets up logging and
//! dispatches to the translation workflow.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subweave::cli::{Args, Commands, JobArgs};
use subweave::config::Config;
use subweave::error::SubweaveError;
use subweave::progress::BarProgress;
use subweave::source::{FallbackSource, LocalSubtitleSource, SubtitleSource, VideoRef};
use subweave::workflow::{TranslationOutcome, Workflow};

const DEFAULT_CONFIG_FILE: &str = "subweave.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    info!("Starting Subweave - Chunked Subtitle Translation");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(SubweaveError::OutputExists(path.display().to_string()).into());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Languages { video, subs_dir } => {
            let video = VideoRef::parse(&video)?;
            let tracks = LocalSubtitleSource::new(&subs_dir).list_languages(&video).await?;

            println!("\nSubtitle tracks for {}:", video);
            println!("{:<12} {:<30} {:<10}", "Code", "Name", "Kind");
            println!("{}", "-".repeat(52));
            for track in tracks {
                let kind = if track.is_generated { "auto" } else { "manual" };
                println!("{:<12} {:<30} {:<10}", track.code, track.name, kind);
            }
        }
        Commands::Translate { input, job } => {
            apply_job_overrides(&mut config, &job);
            let workflow = Workflow::new(config)?;
            let target = workflow.target_language(job.target.as_deref())?;
            workflow.check_service().await?;

            let progress = BarProgress::new();
            let outcome = workflow
                .translate_file(&input, &target, job.output_dir.as_deref(), &progress)
                .await?;
            print_outcome(&outcome);
        }
        Commands::Batch { input_dir, job } => {
            apply_job_overrides(&mut config, &job);
            let workflow = Workflow::new(config)?;
            let target = workflow.target_language(job.target.as_deref())?;
            workflow.check_service().await?;

            let progress = BarProgress::new();
            let outcomes = workflow
                .translate_directory(&input_dir, &target, job.output_dir.as_deref(), &progress)
                .await?;
            for outcome in &outcomes {
                print_outcome(outcome);
            }
            println!("Translated {} file(s)", outcomes.len());
        }
        Commands::Video { video, source_lang, subs_dir, fallback_dir, job } => {
            apply_job_overrides(&mut config, &job);
            let source_language = source_lang
                .or_else(|| config.translate.source_language.clone())
                .ok_or_else(|| SubweaveError::Precondition("no source language given".to_string()))?;
            let output_dir = job
                .output_dir
                .clone()
                .or_else(|| config.output.directory.clone())
                .unwrap_or_else(|| PathBuf::from("."));

            let workflow = Workflow::new(config)?;
            let target = workflow.target_language(job.target.as_deref())?;
            let video = VideoRef::parse(&video)?;
            workflow.check_service().await?;

            let progress = BarProgress::new();
            let primary = LocalSubtitleSource::new(&subs_dir);
            let outcome = match fallback_dir {
                Some(dir) => {
                    let source = FallbackSource::new(primary, LocalSubtitleSource::new(dir));
                    workflow
                        .translate_video(&source, &video, &source_language, &target, &output_dir, &progress)
                        .await?
                }
                None => {
                    workflow
                        .translate_video(&primary, &video, &source_language, &target, &output_dir, &progress)
                        .await?
                }
            };
            print_outcome(&outcome);
        }
    }

    info!("Subweave completed successfully");
    Ok(())
}

/// Command line values take precedence over the configuration file
fn apply_job_overrides(config: &mut Config, job: &JobArgs) {
    if let Some(chunk_size) = job.chunk_size {
        config.translate.chunk_size = chunk_size;
    }
    if let Some(max_retries) = job.max_retries {
        config.translate.max_retries = max_retries;
    }
    if job.force {
        config.output.overwrite = true;
    }
}

fn print_outcome(outcome: &TranslationOutcome) {
    let report = &outcome.report;
    println!(
        "Saved {} ({} cues, {} chunks, {} untranslated, job {})",
        outcome.output_path.display(),
        report.cues.len(),
        report.chunks.len(),
        report.untranslated_chunks(),
        report.job_id
    );
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subweave").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subweave.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("subweave.log").display());

    Ok(())
}
