use crate::core::export::OutputFormat;
use crate::core::llm_client::{ModelConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::core::orchestrator::{OrchestratorSettings, RetryPolicy};
use crate::core::prompt::{PromptSpec, DEFAULT_CHAR_LIMIT, MAX_CHAR_LIMIT, MIN_CHAR_LIMIT};
use crate::core::skills::default_desired_skills;
use crate::domain::model::ReferenceMonth;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const API_BASE_ENV: &str = "OPENROUTER_API_BASE";

const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_EXPERIENCE_TOLERANCE: f64 = 0.5;
const DEFAULT_OUTPUT_PATH: &str = "./output";

/// Run configuration. Every section and key is optional; unset values fall
/// back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelSection,
    pub prompt: PromptSection,
    pub skills: SkillsSection,
    pub batch: BatchSection,
    pub output: OutputSection,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for ModelSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSection")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_id", &self.model_id)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    pub char_limit: Option<usize>,
    /// `YYYY-MM`; defaults to the month the run starts in.
    pub reference_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsSection {
    pub desired: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub experience_tolerance_years: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub output_path: Option<String>,
    pub formats: Option<Vec<String>>,
}

impl RunConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| EtlError::ConfigError {
                message: format!("Cannot read {}: {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENROUTER_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
            return content.to_string();
        };

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Fills credential and endpoint from the environment when the file did
    /// not set them.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if self.api_key().is_none() {
            if let Some(key) = lookup(API_KEY_ENV) {
                self.model.api_key = Some(key);
            }
        }
        if self.model.endpoint.is_none() {
            self.model.endpoint = lookup(API_BASE_ENV);
        }
    }

    /// Credential, ignoring blanks and unresolved `${VAR}` placeholders.
    pub fn api_key(&self) -> Option<&str> {
        self.model
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }

    pub fn endpoint(&self) -> &str {
        self.model.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.model.temperature.unwrap_or(0.0)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn char_limit(&self) -> usize {
        self.prompt.char_limit.unwrap_or(DEFAULT_CHAR_LIMIT)
    }

    pub fn reference_month(&self) -> Result<ReferenceMonth> {
        match &self.prompt.reference_date {
            None => Ok(ReferenceMonth::current()),
            Some(value) => value
                .parse()
                .map_err(|reason| EtlError::InvalidConfigValueError {
                    field: "prompt.reference_date".to_string(),
                    value: value.clone(),
                    reason,
                }),
        }
    }

    pub fn desired_skills(&self) -> Vec<String> {
        self.skills
            .desired
            .clone()
            .unwrap_or_else(default_desired_skills)
    }

    pub fn concurrency(&self) -> usize {
        self.batch.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.batch.max_retries.unwrap_or(0),
            delay: Duration::from_millis(
                self.batch.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }

    pub fn output_path(&self) -> &str {
        self.output
            .output_path
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    pub fn output_formats(&self) -> Result<Vec<OutputFormat>> {
        match &self.output.formats {
            None => Ok(vec![OutputFormat::Csv]),
            Some(formats) => formats.iter().map(|f| f.parse()).collect(),
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            endpoint: self.endpoint().to_string(),
            api_key: self.api_key().map(str::to_string),
            model_id: self.model_id().to_string(),
            temperature: self.temperature(),
            timeout: self.timeout(),
        }
    }

    /// Resolves the read-only settings for one run. The reference month is
    /// fixed here, once.
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings> {
        Ok(OrchestratorSettings {
            prompt: PromptSpec::new(self.char_limit(), self.reference_month()?),
            model_id: self.model_id().to_string(),
            temperature: self.temperature(),
            desired_skills: self.desired_skills(),
            concurrency: self.concurrency(),
            retry: self.retry_policy(),
            experience_tolerance_years: self
                .batch
                .experience_tolerance_years
                .unwrap_or(DEFAULT_EXPERIENCE_TOLERANCE),
        })
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("model.endpoint", self.endpoint())?;
        validation::validate_non_empty_string("model.model_id", self.model_id())?;
        validation::validate_range("model.temperature", self.temperature(), 0.0, 2.0)?;
        validation::validate_positive_number(
            "model.timeout_seconds",
            self.model.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS) as usize,
            1,
        )?;
        validation::validate_range(
            "prompt.char_limit",
            self.char_limit(),
            MIN_CHAR_LIMIT,
            MAX_CHAR_LIMIT,
        )?;
        self.reference_month()?;
        validation::validate_non_empty_list("skills.desired", &self.desired_skills())?;
        validation::validate_positive_number("batch.concurrency", self.concurrency(), 1)?;
        if let Some(tolerance) = self.batch.experience_tolerance_years {
            validation::validate_range("batch.experience_tolerance_years", tolerance, 0.0, 50.0)?;
        }
        if let Some(formats) = &self.output.formats {
            for format in formats {
                validation::validate_one_of("output.formats", format, &OutputFormat::NAMES)?;
            }
        }
        validation::validate_non_empty_string("output.output_path", self.output_path())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RunConfig::from_toml_str("").unwrap();

        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.model_id(), DEFAULT_MODEL);
        assert_eq!(config.temperature(), 0.0);
        assert_eq!(config.char_limit(), 3000);
        assert_eq!(config.desired_skills().len(), 10);
        assert_eq!(config.output_formats().unwrap(), vec![OutputFormat::Csv]);
        assert!(config.api_key().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[model]
endpoint = "http://localhost:9000/v1"
api_key = "sk-test"
model_id = "openai/gpt-4o-mini"
temperature = 0.2
timeout_seconds = 30

[prompt]
char_limit = 4000
reference_date = "2025-06"

[skills]
desired = ["Rust", "Kubernetes"]

[batch]
concurrency = 4
max_retries = 2
retry_delay_ms = 250

[output]
output_path = "./results"
formats = ["csv", "json"]
"#;

        let config = RunConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        let settings = config.orchestrator_settings().unwrap();
        assert_eq!(settings.prompt.char_limit, 4000);
        assert_eq!(settings.prompt.reference_month.label(), "June 2025");
        assert_eq!(settings.desired_skills, vec!["Rust", "Kubernetes"]);
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.retry.delay, Duration::from_millis(250));

        let model = config.model_config();
        assert_eq!(model.endpoint, "http://localhost:9000/v1");
        assert_eq!(model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(model.timeout, Duration::from_secs(30));
        assert_eq!(
            config.output_formats().unwrap(),
            vec![OutputFormat::Csv, OutputFormat::Json]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RESUME_ETL_TEST_MODEL", "meta/llama-3");

        let config = RunConfig::from_toml_str(
            r#"
[model]
model_id = "${RESUME_ETL_TEST_MODEL}"
api_key = "${RESUME_ETL_TEST_UNSET_KEY}"
"#,
        )
        .unwrap();

        assert_eq!(config.model_id(), "meta/llama-3");
        // unresolved placeholders never count as a credential
        assert!(config.api_key().is_none());

        std::env::remove_var("RESUME_ETL_TEST_MODEL");
    }

    #[test]
    fn test_apply_env_fills_missing_values_only() {
        let lookup = |key: &str| match key {
            API_KEY_ENV => Some("sk-from-env".to_string()),
            API_BASE_ENV => Some("https://example.com/api/v1".to_string()),
            _ => None,
        };

        let mut empty = RunConfig::default();
        empty.apply_env_with(lookup);
        assert_eq!(empty.api_key(), Some("sk-from-env"));
        assert_eq!(empty.endpoint(), "https://example.com/api/v1");

        let mut explicit = RunConfig::from_toml_str("[model]\napi_key = \"sk-file\"").unwrap();
        explicit.apply_env_with(lookup);
        assert_eq!(explicit.api_key(), Some("sk-file"));
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let cases = [
            "[model]\nendpoint = \"not-a-url\"",
            "[model]\ntemperature = 3.0",
            "[prompt]\nchar_limit = 100",
            "[prompt]\nreference_date = \"June 2025\"",
            "[skills]\ndesired = []",
            "[batch]\nconcurrency = 0",
            "[output]\nformats = [\"xlsx\"]",
        ];
        for toml_content in cases {
            let config = RunConfig::from_toml_str(toml_content).unwrap();
            assert!(config.validate().is_err(), "accepted: {}", toml_content);
        }
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RunConfig::from_toml_str("[model\nendpoint =").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[batch]\nconcurrency = 3\n")
            .unwrap();

        let config = RunConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.concurrency(), 3);
    }
}
