// Chunked subtitle translation
//
// The pipeline for one job, in order:
// - chunk: split cues into numbered-line chunks
// - context: build the shared translation memory from the full text
// - translator / validator: translate a chunk, check the answer, retry on fences
// - aggregator: fold each chunk's final text (or a placeholder) into the job
// - orchestrator: the state machine sequencing all of the above, plus finalization

pub mod aggregator;
pub mod chunk;
pub mod context;
pub mod orchestrator;
pub mod prompts;
pub mod state;
pub mod translator;
pub mod validator;

pub use chunk::{Chunk, partition};
pub use context::{ContextSynthesizer, TranslationMemory};
pub use orchestrator::{
    ChunkReport, JobEvent, JobReport, JobSettings, NoProgress, ProgressSink, TranslationJob, finalize,
};
pub use state::{JobPhase, JobState};
pub use translator::{ChunkTranslationAttempt, ChunkTranslator, ValidationStatus};
pub use validator::{FormatValidator, Validation};
