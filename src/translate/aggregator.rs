use tracing::{info, warn};

use crate::error::{Result, SubweaveError};
use super::state::JobState;
use super::validator::Validation;

/// Prefix of the marker line that tags an untranslated chunk in the output
pub const FAILURE_MARKER_PREFIX: &str = "[[UNTRANSLATED CHUNK";

/// Marker line for the chunk at `position`
pub fn failure_marker(position: usize) -> String {
    format!("{} {}]]", FAILURE_MARKER_PREFIX, position + 1)
}

pub fn is_failure_marker(line: &str) -> bool {
    line.trim_start().starts_with(FAILURE_MARKER_PREFIX)
}

/// Placeholder for a chunk that could not be translated: marker plus original lines
pub fn placeholder(position: usize, original_text: &str) -> String {
    format!("{}\n{}", failure_marker(position), original_text)
}

/// Fold the final validation result of the current chunk into the job.
///
/// This is the only place the chunk cursor advances, so each chunk is
/// aggregated exactly once however many attempts it took.
pub fn aggregate(state: &mut JobState, validation: Validation) -> Result<()> {
    let chunk = state.current_chunk().ok_or_else(|| {
        SubweaveError::Precondition(format!("no chunk at cursor {} to aggregate", state.cursor))
    })?;
    let position = chunk.position;

    let output = match validation {
        Validation::Valid(text) => {
            info!("Chunk {} translated", position + 1);
            text
        }
        Validation::MaxRetriesExceeded => {
            warn!("Chunk {} kept in original language", position + 1);
            placeholder(position, &chunk.text)
        }
        Validation::NeedsRetry(_) => {
            return Err(SubweaveError::Precondition(format!(
                "chunk {} cannot be aggregated while a retry is pending",
                position + 1
            )));
        }
    };

    state.outputs.push(output);
    state.cursor += 1;
    state.retry_count = 0;
    Ok(())
}
