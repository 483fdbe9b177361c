//! The fixed extraction schema and the prompt built from it.

use crate::domain::model::ReferenceMonth;

pub const DEFAULT_CHAR_LIMIT: usize = 3000;
pub const MIN_CHAR_LIMIT: usize = 3000;
pub const MAX_CHAR_LIMIT: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
    Years,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub guidance: &'static str,
}

/// Ordered schema shared by the prompt and the response extractor.
pub const SCHEMA: [FieldSpec; 10] = [
    FieldSpec {
        name: "name",
        kind: FieldKind::Text,
        guidance: "full name of the candidate as a string, or null",
    },
    FieldSpec {
        name: "email",
        kind: FieldKind::Text,
        guidance: "primary email address as a string, or null",
    },
    FieldSpec {
        name: "phone",
        kind: FieldKind::Text,
        guidance: "primary phone number as written, or null",
    },
    FieldSpec {
        name: "address",
        kind: FieldKind::Text,
        guidance: "postal address or city/country as a single string, or null",
    },
    FieldSpec {
        name: "skills",
        kind: FieldKind::List,
        guidance: "list of strings, one skill, tool or language per entry",
    },
    FieldSpec {
        name: "education",
        kind: FieldKind::List,
        guidance: "list of strings, one degree per entry with institution and period",
    },
    FieldSpec {
        name: "experience",
        kind: FieldKind::List,
        guidance: "list of strings, one role per entry with organisation and period exactly as stated",
    },
    FieldSpec {
        name: "certifications",
        kind: FieldKind::List,
        guidance: "list of strings, one certification or course per entry",
    },
    FieldSpec {
        name: "links",
        kind: FieldKind::List,
        guidance: "list of strings, URLs such as LinkedIn, GitHub or a personal site",
    },
    FieldSpec {
        name: "total_experience_years",
        kind: FieldKind::Years,
        guidance: "a number (float), computed as described below",
    },
];

/// Run-wide prompt parameters. One value per run; never changes between
/// documents.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub char_limit: usize,
    pub reference_month: ReferenceMonth,
}

impl PromptSpec {
    pub fn new(char_limit: usize, reference_month: ReferenceMonth) -> Self {
        Self {
            char_limit,
            reference_month,
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        &SCHEMA
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        SCHEMA.iter().map(|field| field.name).collect()
    }
}

/// First `limit` characters (Unicode scalar values) of `text`.
pub fn truncate_head(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, text: &str, spec: &PromptSpec) -> String {
        let resume = truncate_head(text, spec.char_limit);
        let keys = spec
            .field_names()
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ");
        let guidance = spec
            .fields()
            .iter()
            .map(|field| format!("- \"{}\": {}", field.name, field.guidance))
            .collect::<Vec<_>>()
            .join("\n");
        let reference = spec.reference_month.label();

        format!(
            r#"You are a professional resume parser.

From the resume text below, extract the following fields as a single JSON object with exactly these keys:
[{keys}]

Field guidance:
{guidance}

Computing "total_experience_years":
- Find every time range in experience-like sections: employment, internships, research positions, dissertations and any other entry with a stated period.
- Sum the durations of all those ranges.
- Treat an open-ended end such as "Present", "Ongoing", "Till date" or "Currently pursuing" as ending in {reference}.
- Round the final sum to 2 decimal places. Use 0 when no ranges are found.

Use null for missing text fields and [] for missing lists.

Resume:
"""
{resume}
"""

Return ONLY the JSON object, with no explanations, markdown or any other text before or after it."#
        )
    }
}
