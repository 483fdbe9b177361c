pub mod acquirer;
pub mod aggregator;
pub mod etl;
pub mod experience;
pub mod export;
pub mod extractor;
pub mod llm_client;
pub mod orchestrator;
pub mod prompt;
pub mod skills;

pub use crate::domain::model::{BatchResult, ParsedRecord, SkillMatch, TableRow};
pub use crate::domain::ports::{DocumentSource, ModelClient, PageSource, Storage};
pub use crate::utils::error::Result;
