pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, RunConfig};

pub use core::acquirer::{document_from_path, PdfBytes, PdfFile, TextDocument, TextFile};
pub use core::etl::{EtlEngine, RunReport};
pub use core::export::{OutputFormat, ResultWriter};
pub use core::llm_client::{ChatCompletionClient, ModelConfig};
pub use core::orchestrator::{Orchestrator, OrchestratorSettings, RetryPolicy};
pub use domain::model::{BatchResult, ParsedRecord, ReferenceMonth, TableRow};
pub use domain::ports::{DocumentSource, ModelClient, Storage};
pub use utils::error::{DocumentError, EtlError, Result};
