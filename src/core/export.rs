use crate::domain::model::{BatchResult, TableRow};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use std::fmt;
use std::str::FromStr;

pub const OUTPUT_STEM: &str = "parsed_resumes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["csv", "tsv", "json"];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", OUTPUT_STEM, self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: other.to_string(),
                reason: format!("Supported formats: {}", OutputFormat::NAMES.join(", ")),
            }),
        }
    }
}

fn delimited(rows: &[TableRow], delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub fn render(batch: &BatchResult, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => delimited(&batch.rows, b','),
        OutputFormat::Tsv => delimited(&batch.rows, b'\t'),
        OutputFormat::Json => Ok(serde_json::to_vec_pretty(&batch.rows)?),
    }
}

/// Writes a batch in every configured format through a [`Storage`].
pub struct ResultWriter<S: Storage> {
    storage: S,
    formats: Vec<OutputFormat>,
}

impl<S: Storage> ResultWriter<S> {
    pub fn new(storage: S, formats: Vec<OutputFormat>) -> Self {
        Self { storage, formats }
    }

    /// Returns the written file names, in format order.
    pub async fn write(&self, batch: &BatchResult) -> Result<Vec<String>> {
        let mut written = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let data = render(batch, *format)?;
            let file_name = format.file_name();
            tracing::debug!("Writing {} ({} bytes)", file_name, data.len());
            self.storage.write_file(&file_name, &data).await?;
            written.push(file_name);
        }
        Ok(written)
    }
}
