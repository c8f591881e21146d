//! Subweave - Chunked Subtitle Translation
//!
//! Translates SRT caption tracks with an LLM: the full transcript is
//! summarized into a translation memory, then translated chunk by chunk
//! with format validation and bounded retries.

pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod language;
pub mod progress;
pub mod source;
pub mod subtitle;
pub mod translate;
pub mod workflow;
