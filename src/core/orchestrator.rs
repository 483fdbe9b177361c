//! Drives every document through acquire → prompt → invoke → extract →
//! match → aggregate, one independent state machine per document.

use crate::core::acquirer::TextAcquirer;
use crate::core::aggregator::{DocumentOutcome, RecordAggregator};
use crate::core::experience::estimate_experience_years;
use crate::core::extractor::ResponseExtractor;
use crate::core::prompt::{PromptBuilder, PromptSpec};
use crate::core::skills::SkillMatcher;
use crate::domain::model::{BatchResult, TableRow};
use crate::domain::ports::{DocumentSource, ModelClient};
use crate::utils::error::{DocumentError, EtlError, Result};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Bounded retry for model invocation failures. Zero retries by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Read-only configuration shared by every document of a run.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub prompt: PromptSpec,
    pub model_id: String,
    pub temperature: f32,
    pub desired_skills: Vec<String>,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Divergence (in years) between the model's figure and the computed
    /// one above which a warning is logged.
    pub experience_tolerance_years: f64,
}

pub struct Orchestrator<M: ModelClient> {
    client: Arc<M>,
    settings: Arc<OrchestratorSettings>,
    matcher: SkillMatcher,
    abort: Arc<AtomicBool>,
}

impl<M: ModelClient> Orchestrator<M> {
    pub fn new(client: M, settings: OrchestratorSettings) -> Self {
        let matcher = SkillMatcher::new(settings.desired_skills.clone());
        Self {
            client: Arc::new(client),
            settings: Arc::new(settings),
            matcher,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each document starts. Setting it stops new
    /// documents from being processed; in-flight ones finish.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub async fn run(&self, documents: Vec<Arc<dyn DocumentSource>>) -> Result<BatchResult> {
        if documents.is_empty() {
            return Err(EtlError::NoDocuments);
        }

        let total = documents.len();
        let concurrency = self.settings.concurrency.max(1);
        tracing::info!(
            "Processing {} document(s) with concurrency {}",
            total,
            concurrency
        );

        // `buffered` yields results in input order regardless of completion order
        let rows: Vec<TableRow> = stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| {
                let span = tracing::info_span!(
                    "document",
                    index = index + 1,
                    name = %document.display_name()
                );
                self.process(document).instrument(span)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let batch = BatchResult { rows };
        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            batch.succeeded(),
            batch.failed()
        );
        Ok(batch)
    }

    /// Runs one document to a row. Never fails: errors become error rows.
    pub async fn process(&self, document: Arc<dyn DocumentSource>) -> TableRow {
        let name = document.display_name().to_string();

        let result = if self.abort.load(Ordering::SeqCst) {
            Err(DocumentError::Aborted)
        } else {
            self.run_stages(document).await
        };

        let outcome = result.unwrap_or_else(|error| {
            let stage = error.stage();
            if error != DocumentError::Aborted {
                tracing::warn!("Failed while {}: {}", stage, error);
            }
            if let Some(raw) = error.raw_response() {
                tracing::debug!("Raw model response: {}", raw);
            }
            DocumentOutcome::Failed { stage, error }
        });

        RecordAggregator::new().to_row(&name, &outcome)
    }

    async fn run_stages(
        &self,
        document: Arc<dyn DocumentSource>,
    ) -> std::result::Result<DocumentOutcome, DocumentError> {
        let settings = &self.settings;

        // PDF parsing is CPU-bound; keep it off the async executor
        let text = tokio::task::spawn_blocking(move || TextAcquirer::new().extract(document.as_ref()))
            .await
            .map_err(|e| DocumentError::acquisition(format!("extraction task failed: {}", e)))
            .and_then(|result| result)?;
        if text.is_blank() {
            tracing::warn!("Document has no extractable text");
        }

        let prompt = PromptBuilder::new().build(&text.text(), &settings.prompt);

        let raw = self.invoke(&prompt).await?;

        let record = ResponseExtractor::new()
            .extract(&raw, &settings.prompt)?;

        let skills = self.matcher.match_skills(&record.skills);

        let computed = estimate_experience_years(&record.experience, settings.prompt.reference_month);
        if let Some(computed) = computed {
            let difference = (computed - record.total_experience_years).abs();
            if difference > settings.experience_tolerance_years {
                tracing::warn!(
                    "Model reported {} years of experience, date ranges add up to {}",
                    record.total_experience_years,
                    computed
                );
            }
        }

        tracing::info!(
            "Parsed: {} skill(s), {} matched, {} years",
            record.skills.len(),
            skills.matched.len(),
            record.total_experience_years
        );

        Ok(DocumentOutcome::Parsed {
            record,
            skills,
            computed_experience_years: computed,
        })
    }

    async fn invoke(&self, prompt: &str) -> std::result::Result<String, DocumentError> {
        let settings = &self.settings;
        let mut attempt = 0;

        loop {
            match self
                .client
                .complete(prompt, &settings.model_id, settings.temperature)
                .await
            {
                Ok(raw) => return Ok(raw),
                Err(error) if error.is_retryable() && attempt < settings.retry.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Model call failed ({}), retry {}/{} in {}ms",
                        error,
                        attempt,
                        settings.retry.max_retries,
                        settings.retry.delay.as_millis()
                    );
                    tokio::time::sleep(settings.retry.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
