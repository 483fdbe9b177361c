use crate::domain::model::{ParsedRecord, SkillMatch, Stage, TableRow};
use crate::utils::error::DocumentError;

pub const SKILL_SEPARATOR: &str = ", ";
pub const ENTRY_SEPARATOR: &str = "; ";

/// Result of running one document through the pipeline.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Parsed {
        record: ParsedRecord,
        skills: SkillMatch,
        computed_experience_years: Option<f64>,
    },
    Failed {
        stage: Stage,
        error: DocumentError,
    },
}

/// Empty lists become `None`.
fn joined(items: &[String], separator: &str) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(separator))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordAggregator;

impl RecordAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn to_row(&self, document_name: &str, outcome: &DocumentOutcome) -> TableRow {
        match outcome {
            DocumentOutcome::Parsed {
                record,
                skills,
                computed_experience_years,
            } => TableRow {
                file: document_name.to_string(),
                name: record.name.clone(),
                email: record.email.clone(),
                phone: record.phone.clone(),
                address: record.address.clone(),
                reported_skills: joined(&record.skills, SKILL_SEPARATOR),
                matched_skills: joined(&skills.matched, SKILL_SEPARATOR),
                unmatched_skills: joined(&skills.unmatched, SKILL_SEPARATOR),
                experience_years: Some(record.total_experience_years),
                computed_experience_years: *computed_experience_years,
                education: joined(&record.education, ENTRY_SEPARATOR),
                experience: joined(&record.experience, ENTRY_SEPARATOR),
                certifications: joined(&record.certifications, ENTRY_SEPARATOR),
                links: joined(&record.links, ENTRY_SEPARATOR),
                error: None,
            },
            DocumentOutcome::Failed { stage, error } => TableRow {
                file: document_name.to_string(),
                error: Some(format!("{}: {}", stage, error)),
                ..TableRow::default()
            },
        }
    }
}
