use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plain text of a document, one entry per page in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pages: Vec<String>,
}

impl ExtractedText {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages joined with `\n`. Empty pages still contribute their separator.
    pub fn text(&self) -> String {
        self.pages.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }
}

/// Candidate details as returned by the model, after defaulting and coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub skills: Vec<String>,
    pub education: Vec<String>,
    pub experience: Vec<String>,
    pub certifications: Vec<String>,
    pub links: Vec<String>,
    pub total_experience_years: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}

/// Pipeline stage of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Pending,
    Acquiring,
    Prompting,
    Invoking,
    Extracting,
    Matching,
    Aggregated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Pending => "pending",
            Stage::Acquiring => "acquiring",
            Stage::Prompting => "prompting",
            Stage::Invoking => "invoking",
            Stage::Extracting => "extracting",
            Stage::Matching => "matching",
            Stage::Aggregated => "aggregated",
        };
        f.write_str(label)
    }
}

/// One output row per input document, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Phone")]
    pub phone: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Reported Skills")]
    pub reported_skills: Option<String>,
    #[serde(rename = "Matched Skills")]
    pub matched_skills: Option<String>,
    #[serde(rename = "Unmatched Skills")]
    pub unmatched_skills: Option<String>,
    #[serde(rename = "Experience (Years)")]
    pub experience_years: Option<f64>,
    #[serde(rename = "Computed Experience (Years)")]
    pub computed_experience_years: Option<f64>,
    #[serde(rename = "Education")]
    pub education: Option<String>,
    #[serde(rename = "Experience")]
    pub experience: Option<String>,
    #[serde(rename = "Certifications")]
    pub certifications: Option<String>,
    #[serde(rename = "Links")]
    pub links: Option<String>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl TableRow {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub rows: Vec<TableRow>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|row| row.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    pub fn all_failed(&self) -> bool {
        !self.rows.is_empty() && self.succeeded() == 0
    }
}

/// Anchor month for open-ended experience ranges ("Present", "Ongoing").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceMonth(NaiveDate);

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn current() -> Self {
        let today = chrono::Local::now().date_naive();
        Self(today.with_day(1).unwrap_or(today))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Months since year 0, for range arithmetic.
    pub fn month_index(&self) -> i64 {
        i64::from(self.year()) * 12 + i64::from(self.month()) - 1
    }

    /// Human label used in the prompt, e.g. "June 2025".
    pub fn label(&self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for ReferenceMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| format!("expected YYYY-MM: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_text_keeps_empty_pages() {
        let text = ExtractedText::from_pages(vec![
            "page one".to_string(),
            String::new(),
            "page three".to_string(),
        ]);
        assert_eq!(text.page_count(), 3);
        assert_eq!(text.text(), "page one\n\npage three");
        assert!(!text.is_blank());
    }

    #[test]
    fn test_reference_month_parse_and_label() {
        let month: ReferenceMonth = "2025-06".parse().unwrap();
        assert_eq!(month.year(), 2025);
        assert_eq!(month.month(), 6);
        assert_eq!(month.label(), "June 2025");
        assert_eq!(month.to_string(), "2025-06");
        assert!("2025-13".parse::<ReferenceMonth>().is_err());
        assert!("June".parse::<ReferenceMonth>().is_err());
    }

    #[test]
    fn test_batch_result_counts() {
        let batch = BatchResult {
            rows: vec![
                TableRow {
                    file: "a.pdf".to_string(),
                    ..Default::default()
                },
                TableRow {
                    file: "b.pdf".to_string(),
                    error: Some("acquiring: broken".to_string()),
                    ..Default::default()
                },
            ],
        };
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        assert!(!batch.all_failed());
    }
}
