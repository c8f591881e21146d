use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that runs a translation job
#[derive(clap::Args, Debug, Clone)]
pub struct JobArgs {
    /// Target language, as a code (fr) or a name (French)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Output directory for translated files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of cues per translation chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum re-translations of a chunk with malformed output
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Overwrite existing translated files
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a single SRT file
    Translate {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Translate all SRT files in a directory
    Batch {
        /// Input directory containing subtitle files
        #[arg(short, long)]
        input_dir: PathBuf,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Fetch a video's caption track and translate it
    Video {
        /// Video URL or id
        #[arg(long)]
        video: String,

        /// Source caption language (must be one of the listed tracks)
        #[arg(short, long)]
        source_lang: Option<String>,

        /// Directory holding downloaded tracks (<video_id>.<code>[.auto].srt)
        #[arg(long)]
        subs_dir: PathBuf,

        /// Second track directory consulted when the first one fails
        #[arg(long)]
        fallback_dir: Option<PathBuf>,

        #[command(flatten)]
        job: JobArgs,
    },

    /// List the caption tracks available for a video
    Languages {
        /// Video URL or id
        #[arg(long)]
        video: String,

        /// Directory holding downloaded tracks
        #[arg(long)]
        subs_dir: PathBuf,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = "subweave.toml")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
