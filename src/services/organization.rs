// src/services/organization.rs
//! Issuing-organization classification.
//!
//! Maps a free-text document name to an organization label using an ordered
//! keyword table. Matching is a case-insensitive substring test and the first
//! matching rule wins, so institution keywords are listed before the generic
//! category keywords ("board", "result").

use serde::{Deserialize, Serialize};

/// Label returned when no rule matches.
pub const UNKNOWN_ORGANIZATION: &str = "Unknown Organization";

/// Built-in rules, in precedence order.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("mzu", "Mizoram University"),
    ("mizoram", "Mizoram University"),
    ("cbse", "Central Board of Secondary Education"),
    ("amu", "Aligarh Muslim University"),
    ("jamia", "Jamia Millia Islamia"),
    ("aicte", "AICTE / Technical Board"),
    ("btech", "AICTE / Technical Board"),
    ("engineering", "AICTE / Technical Board"),
    ("board", "State Education Board"),
    ("result", "State Education Board"),
    ("marksheet", "State Education Board"),
];

/// One `(keyword, label)` row of the classification table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRule {
    pub keyword: String,
    pub label: String,
}

impl OrganizationRule {
    pub fn new(keyword: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationClassifier {
    rules: Vec<OrganizationRule>,
}

impl OrganizationClassifier {
    /// Builds a classifier over `rules`, evaluated in the given order.
    ///
    /// Rules with a blank keyword are dropped; they would match every name.
    pub fn new(rules: impl IntoIterator<Item = OrganizationRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| OrganizationRule::new(rule.keyword.trim(), rule.label))
                .filter(|rule| !rule.keyword.is_empty())
                .collect(),
        }
    }

    /// Returns the label of the first rule whose keyword occurs in `document_name`.
    pub fn classify(&self, document_name: &str) -> &str {
        let name = document_name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| name.contains(&rule.keyword))
            .map(|rule| rule.label.as_str())
            .unwrap_or(UNKNOWN_ORGANIZATION)
    }

    pub fn rules(&self) -> &[OrganizationRule] {
        &self.rules
    }
}

impl Default for OrganizationClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_RULES
                .iter()
                .map(|(keyword, label)| OrganizationRule::new(*keyword, *label)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_institutions() {
        let classifier = OrganizationClassifier::default();
        assert_eq!(classifier.classify("MZU Marksheet"), "Mizoram University");
        assert_eq!(classifier.classify("CBSE Result"), "Central Board of Secondary Education");
        assert_eq!(classifier.classify("Jamia Degree"), "Jamia Millia Islamia");
        assert_eq!(classifier.classify("BTech Final Year"), "AICTE / Technical Board");
        assert_eq!(classifier.classify("HSLC Result"), "State Education Board");
        assert_eq!(classifier.classify("random.pdf"), UNKNOWN_ORGANIZATION);
        assert_eq!(classifier.classify(""), UNKNOWN_ORGANIZATION);
    }

    #[test]
    fn institution_rules_take_precedence() {
        let classifier = OrganizationClassifier::default();
        // both "cbse" and "board" occur; the earlier rule wins
        assert_eq!(
            classifier.classify("CBSE Board Certificate"),
            "Central Board of Secondary Education"
        );
        assert_eq!(classifier.classify("Mizoram Board Marksheet"), "Mizoram University");
    }

    #[test]
    fn custom_tables_keep_match_semantics() {
        let classifier = OrganizationClassifier::new(vec![
            OrganizationRule::new("NIT", "National Institute of Technology"),
            OrganizationRule::new("  ", "matches nothing"),
            OrganizationRule::new("tech", "Generic Tech"),
        ]);
        assert_eq!(classifier.rules().len(), 2);
        assert_eq!(classifier.classify("nit silchar btech"), "National Institute of Technology");
        assert_eq!(classifier.classify("Biotech Diploma"), "Generic Tech");
        assert_eq!(classifier.classify("Diploma"), UNKNOWN_ORGANIZATION);
    }
}
