use std::fmt;

use crate::subtitle::Cue;
use super::chunk::Chunk;
use super::context::TranslationMemory;

/// Phases of a translation job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Init,
    Partitioning,
    ContextSynthesis,
    Translating,
    Validating,
    Aggregating,
    Finalizing,
    Done,
    Error,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobPhase::Init => "INIT",
            JobPhase::Partitioning => "PARTITIONING",
            JobPhase::ContextSynthesis => "CONTEXT_SYNTHESIS",
            JobPhase::Translating => "TRANSLATING",
            JobPhase::Validating => "VALIDATING",
            JobPhase::Aggregating => "AGGREGATING",
            JobPhase::Finalizing => "FINALIZING",
            JobPhase::Done => "DONE",
            JobPhase::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Mutable state of one job, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct JobState {
    pub cues: Vec<Cue>,
    pub chunks: Vec<Chunk>,
    /// Next chunk to translate; only ever moves forward
    pub cursor: usize,
    /// Retries spent on the chunk under the cursor
    pub retry_count: u32,
    /// One finalized text per chunk already aggregated, in chunk order
    pub outputs: Vec<String>,
    pub memory: Option<TranslationMemory>,
}

impl JobState {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self {
            cues,
            chunks: Vec::new(),
            cursor: 0,
            retry_count: 0,
            outputs: Vec::new(),
            memory: None,
        }
    }

    pub fn current_chunk(&self) -> Option<&Chunk> {
        self.chunks.get(self.cursor)
    }

    pub fn has_pending_chunks(&self) -> bool {
        self.cursor < self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_labels() {
        assert_eq!(JobPhase::ContextSynthesis.to_string(), "CONTEXT_SYNTHESIS");
        assert_eq!(JobPhase::Done.to_string(), "DONE");
    }

    #[test]
    fn test_new_state_has_nothing_pending() {
        let state = JobState::new(Vec::new());
        assert!(!state.has_pending_chunks());
        assert!(state.current_chunk().is_none());
        assert!(state.memory.is_none());
    }
}
