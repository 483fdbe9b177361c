use crate::domain::model::SkillMatch;

pub const DEFAULT_DESIRED_SKILLS: [&str; 10] = [
    "Python",
    "Machine Learning",
    "Streamlit",
    "Data Analysis",
    "Deep Learning",
    "Shell scripting",
    "FORTRAN",
    "HPC",
    "Oceanography",
    "Climate Science",
];

pub fn default_desired_skills() -> Vec<String> {
    DEFAULT_DESIRED_SKILLS.iter().map(|s| s.to_string()).collect()
}

/// Case-insensitive substring matching of reported skills against a fixed
/// desired list.
#[derive(Debug, Clone)]
pub struct SkillMatcher {
    desired: Vec<String>,
    // lowercased copies of `desired`; blanks and case-insensitive repeats removed
    terms: Vec<(usize, String)>,
}

impl SkillMatcher {
    pub fn new(desired: Vec<String>) -> Self {
        let mut terms: Vec<(usize, String)> = Vec::with_capacity(desired.len());
        for (index, skill) in desired.iter().enumerate() {
            let term = skill.trim().to_lowercase();
            if term.is_empty() || terms.iter().any(|(_, seen)| *seen == term) {
                continue;
            }
            terms.push((index, term));
        }
        Self { desired, terms }
    }

    pub fn match_skills(&self, reported: &[String]) -> SkillMatch {
        let reported_lower: Vec<String> = reported.iter().map(|s| s.to_lowercase()).collect();

        let matched = self
            .terms
            .iter()
            .filter(|(_, term)| reported_lower.iter().any(|skill| skill.contains(term)))
            .map(|(index, _)| self.desired[*index].clone())
            .collect();

        let unmatched = reported
            .iter()
            .zip(&reported_lower)
            .filter(|(_, lower)| !self.terms.iter().any(|(_, term)| lower.contains(term)))
            .map(|(original, _)| original.clone())
            .collect();

        SkillMatch { matched, unmatched }
    }
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(default_desired_skills())
    }
}
