pub mod cli;
pub mod toml_config;

pub use cli::LocalStorage;
pub use toml_config::RunConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Accepted résumé file types.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "resume-etl")]
#[command(about = "Extract structured candidate data from résumés with an LLM")]
pub struct CliConfig {
    /// Résumé files (PDF or plain text)
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Directory for the result table")]
    pub output_path: Option<String>,

    #[arg(long = "format", value_delimiter = ',', help = "Output formats: csv, tsv, json")]
    pub formats: Vec<String>,

    #[arg(long, help = "OpenAI-compatible API base URL")]
    pub endpoint: Option<String>,

    #[arg(long, help = "Model identifier")]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Résumé characters sent to the model (3000-4000)")]
    pub char_limit: Option<usize>,

    #[arg(long, value_name = "YYYY-MM", help = "Month that open-ended roles run to")]
    pub reference_date: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Desired skills, comma separated")]
    pub skills: Vec<String>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long, help = "Print the result table as JSON")]
    pub print_json: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// CLI flags take precedence over file and environment values.
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.model.endpoint = Some(endpoint.clone());
        }
        if let Some(model) = &self.model {
            config.model.model_id = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            config.model.temperature = Some(temperature);
        }
        if let Some(timeout) = self.timeout_seconds {
            config.model.timeout_seconds = Some(timeout);
        }
        if let Some(limit) = self.char_limit {
            config.prompt.char_limit = Some(limit);
        }
        if let Some(reference) = &self.reference_date {
            config.prompt.reference_date = Some(reference.clone());
        }
        if !self.skills.is_empty() {
            config.skills.desired = Some(self.skills.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.batch.concurrency = Some(concurrency);
        }
        if let Some(retries) = self.max_retries {
            config.batch.max_retries = Some(retries);
        }
        if let Some(path) = &self.output_path {
            config.output.output_path = Some(path.clone());
        }
        if !self.formats.is_empty() {
            config.output.formats = Some(self.formats.clone());
        }
    }

    pub fn is_single_document(&self) -> bool {
        self.files.len() == 1
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        for file in &self.files {
            validation::validate_file_extension("files", file, &SUPPORTED_EXTENSIONS)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = CliConfig::parse_from([
            "resume-etl",
            "--model",
            "openai/gpt-4o-mini",
            "--skills",
            "Rust,Go",
            "--format",
            "csv,json",
            "--reference-date",
            "2024-12",
            "a.pdf",
            "b.txt",
        ]);
        let mut config = RunConfig::from_toml_str(
            "[model]\nmodel_id = \"from-file\"\ntemperature = 0.3\n",
        )
        .unwrap();

        cli.apply_to(&mut config);

        assert_eq!(config.model_id(), "openai/gpt-4o-mini");
        assert_eq!(config.temperature(), 0.3);
        assert_eq!(config.desired_skills(), vec!["Rust", "Go"]);
        assert_eq!(config.output.formats.as_ref().unwrap().len(), 2);
        assert_eq!(config.reference_month().unwrap().label(), "December 2024");
        assert!(!cli.is_single_document());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let cli = CliConfig::parse_from(["resume-etl", "resume.docx"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_files_are_required() {
        assert!(CliConfig::try_parse_from(["resume-etl"]).is_err());
    }
}
