use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::TranslateConfig;
use crate::error::{Result, SubweaveError};
use crate::inference::InferenceClient;
use crate::subtitle::{self, Cue};
use super::aggregator::{self, is_failure_marker};
use super::chunk::{partition, parse_numbered_line};
use super::context::ContextSynthesizer;
use super::state::{JobPhase, JobState};
use super::translator::{ChunkTranslationAttempt, ChunkTranslator, ValidationStatus};
use super::validator::{FormatValidator, Validation};

/// Per-job settings, resolved once from configuration
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub chunk_size: NonZeroUsize,
    pub max_retries: u32,
    pub max_steps: usize,
    pub target_language: String,
}

impl JobSettings {
    pub fn new(target_language: &str) -> Result<Self> {
        Self::from_config(&TranslateConfig::default(), target_language)
    }

    pub fn from_config(config: &TranslateConfig, target_language: &str) -> Result<Self> {
        let chunk_size = NonZeroUsize::new(config.chunk_size)
            .ok_or_else(|| SubweaveError::Config("chunk_size must be a positive integer".to_string()))?;
        if config.max_steps == 0 {
            return Err(SubweaveError::Config("max_steps must be a positive integer".to_string()));
        }
        if target_language.trim().is_empty() {
            return Err(SubweaveError::Precondition("target language is not set".to_string()));
        }

        Ok(Self {
            chunk_size,
            max_retries: config.max_retries,
            max_steps: config.max_steps,
            target_language: target_language.trim().to_string(),
        })
    }

    /// Step ceiling for a job over `cue_count` cues.
    ///
    /// Never below the steps a job needs when every chunk spends all of its
    /// retries: three setup steps, `2 * (max_retries + 1) + 1` per chunk and
    /// one finalizing step. `max_steps` only raises it.
    pub fn step_ceiling(&self, cue_count: usize) -> usize {
        let chunks = cue_count.div_ceil(self.chunk_size.get());
        let per_chunk = (self.max_retries as usize).saturating_add(1).saturating_mul(2).saturating_add(1);
        let required = chunks.saturating_mul(per_chunk).saturating_add(4);
        required.max(self.max_steps)
    }
}

/// Progress notifications emitted while a job runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    ContextReady { chunks: usize },
    ChunkStarted { position: usize, total: usize },
    AttemptRejected { position: usize, attempt: u32 },
    ChunkFinished { position: usize, translated: bool },
    Finalized { cues: usize },
    /// The job entered ERROR from `phase`; `trace` ends with ERROR
    Failed { phase: JobPhase, trace: Vec<JobPhase> },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &JobEvent);
}

/// Progress sink that ignores everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &JobEvent) {}
}

/// How one chunk ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub position: usize,
    pub attempts: u32,
    pub status: ValidationStatus,
}

/// Result of a job that reached DONE
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    /// Translated cues, one per original cue, in original order
    pub cues: Vec<Cue>,
    /// `cues` serialized as SRT
    pub srt: String,
    pub chunks: Vec<ChunkReport>,
    /// Phases visited, in order
    pub trace: Vec<JobPhase>,
    pub steps: usize,
}

impl JobReport {
    /// Chunks kept in the original language after exhausting their retries
    pub fn untranslated_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.status == ValidationStatus::MaxRetriesExceeded)
            .count()
    }
}

/// Drives one subtitle translation from cues to translated cues.
///
/// Chunks are processed strictly one after another: the translation memory
/// must exist before the first chunk, and a chunk's retries are exhausted
/// before the cursor moves on.
pub struct TranslationJob<'a> {
    client: &'a dyn InferenceClient,
    settings: JobSettings,
    progress: &'a dyn ProgressSink,
}

impl<'a> TranslationJob<'a> {
    pub fn new(client: &'a dyn InferenceClient, settings: JobSettings) -> Self {
        Self {
            client,
            settings,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, cues: Vec<Cue>) -> Result<JobReport> {
        let job_id = Uuid::new_v4();
        let span = info_span!("job", id = %job_id, target = %self.settings.target_language);
        self.run_inner(job_id, cues).instrument(span).await
    }

    async fn run_inner(&self, job_id: Uuid, cues: Vec<Cue>) -> Result<JobReport> {
        info!("Starting translation job: {} cues", cues.len());
        let ceiling = self.settings.step_ceiling(cues.len());

        let mut run = JobRun {
            phase: JobPhase::Init,
            state: JobState::new(cues),
            pending: None,
            decision: None,
            reports: Vec::new(),
            translated: Vec::new(),
            trace: Vec::new(),
            steps: 0,
        };

        loop {
            run.trace.push(run.phase);
            if run.phase == JobPhase::Done {
                break;
            }

            run.steps += 1;
            let outcome = if run.steps > ceiling {
                Err(SubweaveError::StepLimitExceeded(ceiling))
            } else {
                self.step(&mut run).await
            };

            match outcome {
                Ok(next) => {
                    debug!("{} -> {}", run.phase, next);
                    run.phase = next;
                }
                Err(e) => {
                    error!("Job failed in phase {}: {}", run.phase, e);
                    self.enter_error(&mut run);
                    return Err(e);
                }
            }
        }

        let srt = subtitle::serialize(&run.translated);
        let report = JobReport {
            job_id,
            cues: run.translated,
            srt,
            chunks: run.reports,
            trace: run.trace,
            steps: run.steps,
        };
        info!(
            "Translation job done: {} chunks, {} untranslated, {} steps",
            report.chunks.len(),
            report.untranslated_chunks(),
            report.steps
        );
        Ok(report)
    }

    async fn step(&self, run: &mut JobRun) -> Result<JobPhase> {
        match run.phase {
            JobPhase::Init => Ok(JobPhase::Partitioning),

            JobPhase::Partitioning => {
                run.state.chunks = partition(&run.state.cues, self.settings.chunk_size);
                info!("Partitioned {} cues into {} chunks", run.state.cues.len(), run.state.chunks.len());
                Ok(JobPhase::ContextSynthesis)
            }

            JobPhase::ContextSynthesis => {
                let memory = ContextSynthesizer::new(self.client)
                    .synthesize(&run.state.cues, &self.settings.target_language)
                    .await?;
                run.state.memory = Some(memory);
                self.progress.on_event(&JobEvent::ContextReady { chunks: run.state.chunks.len() });
                Ok(self.next_chunk_or_finalize(&run.state))
            }

            JobPhase::Translating => {
                let chunk = run.state.current_chunk().ok_or_else(|| {
                    SubweaveError::Precondition(format!("no chunk at cursor {}", run.state.cursor))
                })?;
                let memory = run.state.memory.as_ref().ok_or_else(|| {
                    SubweaveError::Precondition("translation memory missing before chunk translation".to_string())
                })?;

                if run.state.retry_count == 0 {
                    self.progress.on_event(&JobEvent::ChunkStarted {
                        position: chunk.position,
                        total: run.state.chunks.len(),
                    });
                }

                let attempt = ChunkTranslator::new(self.client, &self.settings.target_language)
                    .translate(chunk, memory, run.state.retry_count + 1, run.state.retry_count > 0)
                    .await?;
                run.pending = Some(attempt);
                Ok(JobPhase::Validating)
            }

            JobPhase::Validating => {
                let mut attempt = run.pending.take().ok_or_else(|| {
                    SubweaveError::Precondition("no translation attempt to validate".to_string())
                })?;

                let validator = FormatValidator::new(self.settings.max_retries);
                let decision = validator.validate(attempt.raw_output.as_deref(), run.state.retry_count);
                attempt.status = decision.status();
                debug!("Chunk {} attempt {}: {:?}", attempt.chunk_position + 1, attempt.attempt, attempt.status);

                match decision {
                    Validation::NeedsRetry(retry_count) => {
                        run.state.retry_count = retry_count;
                        self.progress.on_event(&JobEvent::AttemptRejected {
                            position: attempt.chunk_position,
                            attempt: attempt.attempt,
                        });
                        Ok(JobPhase::Translating)
                    }
                    accepted_or_exhausted => {
                        run.decision = Some(accepted_or_exhausted);
                        Ok(JobPhase::Aggregating)
                    }
                }
            }

            JobPhase::Aggregating => {
                let decision = run.decision.take().ok_or_else(|| {
                    SubweaveError::Precondition("no validation result to aggregate".to_string())
                })?;
                let position = run.state.cursor;
                let status = decision.status();

                run.reports.push(ChunkReport {
                    position,
                    attempts: run.state.retry_count + 1,
                    status,
                });
                aggregator::aggregate(&mut run.state, decision)?;
                self.progress.on_event(&JobEvent::ChunkFinished {
                    position,
                    translated: status == ValidationStatus::Valid,
                });
                Ok(self.next_chunk_or_finalize(&run.state))
            }

            JobPhase::Finalizing => {
                run.translated = finalize(&run.state.cues, &run.state.outputs);
                self.progress.on_event(&JobEvent::Finalized { cues: run.translated.len() });
                Ok(JobPhase::Done)
            }

            JobPhase::Done | JobPhase::Error => Err(SubweaveError::Precondition(format!(
                "job cannot step from terminal phase {}",
                run.phase
            ))),
        }
    }

    /// ERROR is absorbing: it is recorded once and the loop stops
    fn enter_error(&self, run: &mut JobRun) {
        let failed = run.phase;
        debug!("{} -> {}", failed, JobPhase::Error);
        run.phase = JobPhase::Error;
        run.trace.push(JobPhase::Error);
        self.progress.on_event(&JobEvent::Failed { phase: failed, trace: run.trace.clone() });
    }

    fn next_chunk_or_finalize(&self, state: &JobState) -> JobPhase {
        if state.has_pending_chunks() {
            JobPhase::Translating
        } else {
            JobPhase::Finalizing
        }
    }
}

/// Mutable bookkeeping of one `run` call
struct JobRun {
    phase: JobPhase,
    state: JobState,
    pending: Option<ChunkTranslationAttempt>,
    decision: Option<Validation>,
    reports: Vec<ChunkReport>,
    translated: Vec<Cue>,
    trace: Vec<JobPhase>,
    steps: usize,
}

/// Rebuild the cue list from the aggregated chunk outputs.
///
/// Every original cue appears exactly once, in original order, with its
/// original index and timings. Cues whose index has no usable translated
/// line keep their original text.
pub fn finalize(cues: &[Cue], outputs: &[String]) -> Vec<Cue> {
    let known: HashSet<u32> = cues.iter().map(|cue| cue.index).collect();
    let mut translated: HashMap<u32, String> = HashMap::new();

    let joined = outputs.join("\n");
    for line in joined.lines() {
        let line = line.trim();
        if line.is_empty() || is_failure_marker(line) {
            continue;
        }

        match parse_numbered_line(line) {
            Some((index, _)) if !known.contains(&index) => {
                warn!("Ignoring translated line for unknown index {}: {}", index, line);
            }
            Some((index, text)) if text.is_empty() => {
                warn!("Ignoring empty translation for index {}", index);
            }
            Some((index, text)) => {
                if translated.contains_key(&index) {
                    warn!("Duplicate translated line for index {}, keeping the first", index);
                } else {
                    translated.insert(index, text);
                }
            }
            None => warn!("Skipping unparseable translated line: {}", line),
        }
    }

    let missing = cues.iter().filter(|cue| !translated.contains_key(&cue.index)).count();
    if missing > 0 {
        warn!("{} cues fall back to their original text", missing);
    }

    cues.iter()
        .map(|cue| match translated.get(&cue.index) {
            Some(text) => cue.with_text(text),
            None => cue.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockInferenceClient;
    use crate::subtitle::{Timestamp, parse};
    use std::sync::Mutex;

    const THREE_CUES: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n\n3\n00:00:05,000 --> 00:00:06,500\nEnd\n";

    fn settings(chunk_size: usize, max_retries: u32) -> JobSettings {
        let config = TranslateConfig {
            chunk_size,
            max_retries,
            ..TranslateConfig::default()
        };
        JobSettings::from_config(&config, "French").unwrap()
    }

    fn is_context_call(system: &str) -> bool {
        system.contains("translation memory that keeps")
    }

    /// Mock answering context synthesis with a fixed memory and each chunk via `answer`
    fn scripted_client<F>(answer: F) -> MockInferenceClient
    where
        F: Fn(&str, bool) -> String + Send + 'static,
    {
        let mut client = MockInferenceClient::new();
        client.expect_complete().returning(move |system, user| {
            if is_context_call(system) {
                Ok("Basis: a greeting\nGlossary:\n- World: Monde".to_string())
            } else {
                Ok(answer(user, system.contains("previous answer was rejected")))
            }
        });
        client
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<JobEvent>>);

    impl ProgressSink for RecordingSink {
        fn on_event(&self, event: &JobEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_translates_all_chunks_in_order() {
        let client = scripted_client(|user, _| {
            if user.contains("1. Hello") {
                "1. Bonjour\n2. Monde".to_string()
            } else {
                "3. Fin".to_string()
            }
        });
        let cues = parse(THREE_CUES);

        let report = TranslationJob::new(&client, settings(2, 2)).run(cues.clone()).await.unwrap();

        let texts: Vec<&str> = report.cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Bonjour", "Monde", "Fin"]);
        for (translated, original) in report.cues.iter().zip(&cues) {
            assert_eq!(translated.index, original.index);
            assert_eq!(translated.start, original.start);
            assert_eq!(translated.end, original.end);
        }
        assert_eq!(report.chunks.len(), 2);
        assert!(report.chunks.iter().all(|c| c.attempts == 1 && c.status == ValidationStatus::Valid));
        assert_eq!(report.untranslated_chunks(), 0);
        assert!(report.srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\nBonjour\n"));
        assert_eq!(
            report.trace,
            vec![
                JobPhase::Init,
                JobPhase::Partitioning,
                JobPhase::ContextSynthesis,
                JobPhase::Translating,
                JobPhase::Validating,
                JobPhase::Aggregating,
                JobPhase::Translating,
                JobPhase::Validating,
                JobPhase::Aggregating,
                JobPhase::Finalizing,
                JobPhase::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_fenced_chunk_exhausts_retries_and_keeps_original() {
        let chunk_one_calls = std::sync::Arc::new(Mutex::new(0u32));
        let counter = chunk_one_calls.clone();
        let client = scripted_client(move |user, _| {
            if user.contains("1. Hello") {
                *counter.lock().unwrap() += 1;
                "```\n1. Bonjour\n2. Monde\n```".to_string()
            } else {
                "3. Fin".to_string()
            }
        });

        let report = TranslationJob::new(&client, settings(2, 2))
            .run(parse(THREE_CUES))
            .await
            .unwrap();

        assert_eq!(*chunk_one_calls.lock().unwrap(), 3);
        assert_eq!(
            report.chunks[0],
            ChunkReport { position: 0, attempts: 3, status: ValidationStatus::MaxRetriesExceeded }
        );
        assert_eq!(
            report.chunks[1],
            ChunkReport { position: 1, attempts: 1, status: ValidationStatus::Valid }
        );
        let texts: Vec<&str> = report.cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "World", "Fin"]);
        assert_eq!(report.untranslated_chunks(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_when_model_complies() {
        let client = scripted_client(|_, is_retry| {
            if is_retry {
                "1. Bonjour\n2. Monde\n3. Fin".to_string()
            } else {
                "```1. Bonjour```".to_string()
            }
        });

        let report = TranslationJob::new(&client, settings(50, 2))
            .run(parse(THREE_CUES))
            .await
            .unwrap();
        assert_eq!(
            report.chunks,
            vec![ChunkReport { position: 0, attempts: 2, status: ValidationStatus::Valid }]
        );
        assert_eq!(report.cues[2].text, "Fin");
    }

    #[tokio::test]
    async fn test_always_fenced_output_makes_max_retries_plus_one_attempts() {
        for max_retries in [0u32, 1, 3] {
            let calls = std::sync::Arc::new(Mutex::new(0u32));
            let counter = calls.clone();
            let client = scripted_client(move |_, _| {
                *counter.lock().unwrap() += 1;
                "```".to_string()
            });

            let report = TranslationJob::new(&client, settings(50, max_retries))
                .run(parse(THREE_CUES))
                .await
                .unwrap();
            assert_eq!(*calls.lock().unwrap(), max_retries + 1);
            assert_eq!(report.chunks[0].attempts, max_retries + 1);
        }
    }

    #[tokio::test]
    async fn test_empty_input_never_reaches_translator() {
        let mut client = MockInferenceClient::new();
        client.expect_complete().never();

        let result = TranslationJob::new(&client, settings(50, 2)).run(parse("")).await;
        assert!(matches!(result, Err(SubweaveError::ContextGeneration(_))));
    }

    #[tokio::test]
    async fn test_service_error_fails_the_job() {
        let mut client = MockInferenceClient::new();
        client.expect_complete().returning(|system, _| {
            if is_context_call(system) {
                Ok("memory".to_string())
            } else {
                Err(SubweaveError::TranslationService("connection reset".to_string()))
            }
        });

        let sink = RecordingSink::default();
        let result = TranslationJob::new(&client, settings(2, 2))
            .with_progress(&sink)
            .run(parse(THREE_CUES))
            .await;
        assert!(matches!(result, Err(SubweaveError::TranslationService(_))));

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(
            events.last(),
            Some(&JobEvent::Failed {
                phase: JobPhase::Translating,
                trace: vec![
                    JobPhase::Init,
                    JobPhase::Partitioning,
                    JobPhase::ContextSynthesis,
                    JobPhase::Translating,
                    JobPhase::Error,
                ],
            })
        );
    }

    #[test]
    fn test_step_ceiling_covers_worst_case_job() {
        let config = TranslateConfig {
            chunk_size: 1,
            max_retries: 5,
            max_steps: 8,
            ..TranslateConfig::default()
        };
        let settings = JobSettings::from_config(&config, "fr").unwrap();
        assert_eq!(settings.step_ceiling(3), 4 + 3 * 13);
        assert_eq!(settings.step_ceiling(0), 8);

        let settings = self::settings(50, 2);
        assert_eq!(settings.step_ceiling(120), 10_000);
    }

    #[tokio::test]
    async fn test_exhausted_retries_stay_under_small_step_ceiling() {
        let client = scripted_client(|_, _| "```".to_string());
        let config = TranslateConfig {
            chunk_size: 1,
            max_retries: 5,
            max_steps: 8,
            ..TranslateConfig::default()
        };
        let settings = JobSettings::from_config(&config, "fr").unwrap();

        let report = TranslationJob::new(&client, settings).run(parse(THREE_CUES)).await.unwrap();
        assert_eq!(report.steps, 4 + 3 * 13);
        assert_eq!(report.untranslated_chunks(), 3);
    }

    #[tokio::test]
    async fn test_many_single_cue_chunks_exceed_configured_steps() {
        let client = scripted_client(|user, _| {
            user.split("---")
                .nth(1)
                .unwrap_or_default()
                .lines()
                .filter_map(parse_numbered_line)
                .map(|(index, text)| format!("{}. FR:{}", index, text))
                .collect::<Vec<_>>()
                .join("\n")
        });
        let cues: Vec<Cue> = (1..=3400)
            .map(|i| Cue::new(i, Timestamp::from_millis(i as u64 * 1_000), Timestamp::from_millis(i as u64 * 1_000 + 500), "line"))
            .collect();

        let report = TranslationJob::new(&client, settings(1, 2)).run(cues).await.unwrap();
        assert_eq!(report.steps, 4 + 3400 * 3);
        assert!(report.steps > TranslateConfig::default().max_steps);
        assert_eq!(report.untranslated_chunks(), 0);
        assert_eq!(report.cues[3399].text, "FR:line");
    }

    #[tokio::test]
    async fn test_progress_events() {
        let client = scripted_client(|user, _| {
            if user.contains("1. Hello") { "```".to_string() } else { "3. Fin".to_string() }
        });
        let sink = RecordingSink::default();

        TranslationJob::new(&client, settings(2, 1))
            .with_progress(&sink)
            .run(parse(THREE_CUES))
            .await
            .unwrap();

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                JobEvent::ContextReady { chunks: 2 },
                JobEvent::ChunkStarted { position: 0, total: 2 },
                JobEvent::AttemptRejected { position: 0, attempt: 1 },
                JobEvent::ChunkFinished { position: 0, translated: false },
                JobEvent::ChunkStarted { position: 1, total: 2 },
                JobEvent::ChunkFinished { position: 1, translated: true },
                JobEvent::Finalized { cues: 3 },
            ]
        );
    }

    #[test]
    fn test_settings_require_target_language() {
        let result = JobSettings::from_config(&TranslateConfig::default(), " ");
        assert!(matches!(result, Err(SubweaveError::Precondition(_))));
    }

    #[test]
    fn test_settings_reject_zero_chunk_size() {
        let config = TranslateConfig { chunk_size: 0, ..TranslateConfig::default() };
        assert!(matches!(JobSettings::from_config(&config, "fr"), Err(SubweaveError::Config(_))));
    }

    fn cue(index: u32, text: &str) -> Cue {
        Cue::new(index, Timestamp::from_millis(index as u64 * 1_000), Timestamp::from_millis(index as u64 * 1_000 + 900), text)
    }

    #[test]
    fn test_finalize_falls_back_per_cue() {
        let cues = vec![cue(1, "one"), cue(2, "two"), cue(3, "three"), cue(4, "four")];
        let outputs = vec![
            "Sure! Here is the translation:\n1. un\n2.\n99. invented".to_string(),
            "[[UNTRANSLATED CHUNK 2]]\n3. three\n4. quatre\n4. encore".to_string(),
        ];

        let finalized = finalize(&cues, &outputs);
        let pairs: Vec<(u32, &str)> = finalized.iter().map(|c| (c.index, c.text.as_str())).collect();
        assert_eq!(pairs, vec![(1, "un"), (2, "two"), (3, "three"), (4, "quatre")]);
        for (out, original) in finalized.iter().zip(&cues) {
            assert_eq!(out.start, original.start);
            assert_eq!(out.end, original.end);
        }
    }

    #[test]
    fn test_finalize_with_no_outputs_keeps_everything() {
        let cues = vec![cue(5, "five"), cue(6, "six")];
        assert_eq!(finalize(&cues, &[]), cues);
    }
}
