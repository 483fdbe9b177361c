use crate::core::export::ResultWriter;
use crate::core::orchestrator::Orchestrator;
use crate::domain::model::BatchResult;
use crate::domain::ports::{DocumentSource, ModelClient, Storage};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub batch: BatchResult,
    pub written_files: Vec<String>,
    pub elapsed: Duration,
}

/// Extract (documents → rows) then load (rows → files).
pub struct EtlEngine<M: ModelClient, S: Storage> {
    orchestrator: Orchestrator<M>,
    writer: ResultWriter<S>,
}

impl<M: ModelClient, S: Storage> EtlEngine<M, S> {
    pub fn new(orchestrator: Orchestrator<M>, writer: ResultWriter<S>) -> Self {
        Self {
            orchestrator,
            writer,
        }
    }

    pub async fn run(&self, documents: Vec<Arc<dyn DocumentSource>>) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!("Starting résumé extraction");

        let batch = self.orchestrator.run(documents).await?;

        tracing::info!("Writing {} row(s)", batch.rows.len());
        let written_files = self.writer.write(&batch).await?;
        for file in &written_files {
            tracing::info!("📁 Output saved to: {}", file);
        }

        let elapsed = started.elapsed();
        tracing::info!("Run finished in {:.1}s", elapsed.as_secs_f64());

        Ok(RunReport {
            batch,
            written_files,
            elapsed,
        })
    }
}
