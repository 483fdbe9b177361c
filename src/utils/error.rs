use crate::domain::model::Stage;
use thiserror::Error;

/// Failures scoped to a single document. These never abort a batch; the
/// orchestrator turns them into an error row and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Could not read document: {message}")]
    Acquisition { message: String },

    #[error("Model invocation failed: {message}")]
    ModelInvocation { message: String, status: Option<u16> },

    #[error("Malformed JSON in model response: {reason}")]
    MalformedJson { reason: String, raw: String },

    #[error("Field '{field}' has an unusable value: {reason}")]
    Schema {
        field: String,
        reason: String,
        raw: String,
    },

    #[error("Processing aborted before this document was started")]
    Aborted,
}

impl DocumentError {
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition {
            message: message.into(),
        }
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::ModelInvocation {
            message: message.into(),
            status: None,
        }
    }

    /// The stage a failure of this kind belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Acquisition { .. } => Stage::Acquiring,
            Self::ModelInvocation { .. } => Stage::Invoking,
            Self::MalformedJson { .. } | Self::Schema { .. } => Stage::Extracting,
            Self::Aborted => Stage::Pending,
        }
    }

    /// Raw model output kept for diagnostics, when the failure happened after
    /// the model answered.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedJson { raw, .. } | Self::Schema { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Only transport-level failures are worth another attempt; a model
    /// that answered with garbage is not retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelInvocation { .. })
    }
}

/// Run-level failures. Anything here stops the whole run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration file error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("No documents were given to process")]
    NoDocuments,

    #[error("Document '{name}' not found")]
    DocumentNotFound { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::HttpError(_) => ErrorCategory::Network,
            EtlError::CsvError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Output
            }
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::NoDocuments | EtlError::DocumentNotFound { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Output => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::MissingConfigError { .. } => {
                "Set OPENROUTER_API_KEY in the environment or a .env file, or add api_key under [model]"
            }
            EtlError::InvalidConfigValueError { .. } | EtlError::ConfigValidationError { .. } => {
                "Check the configuration file and command-line flags"
            }
            EtlError::ConfigError { .. } => "Review the configuration and try again",
            EtlError::HttpError(_) => "Check network connectivity and the model endpoint",
            EtlError::NoDocuments => "Pass at least one résumé file (PDF or TXT)",
            EtlError::DocumentNotFound { .. } => "Check the file path",
            EtlError::IoError(_) | EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Make sure the output directory is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            EtlError::DocumentNotFound { name } => format!("File not found: {}", name),
            other => other.to_string(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
