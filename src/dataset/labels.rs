// src/dataset/labels.rs — The closed set of class labels for a run

use serde::{Deserialize, Serialize};

/// Distinct ground-truth values, kept in order of first appearance.
///
/// Computed once when a run starts and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels: Vec<String> = Vec::new();
        for v in values {
            let v = v.as_ref();
            if !labels.iter().any(|l| l == v) {
                labels.push(v.to_string());
            }
        }
        Self(labels)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Same members regardless of order.
    pub fn same_members(&self, other: &LabelSet) -> bool {
        self.len() == other.len() && self.iter().all(|l| other.contains(l))
    }
}

impl std::fmt::Display for LabelSet {
    /// Renders like a JSON list so prompts show exact label spellings.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let quoted = self
            .0
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| std::fmt::Error)?;
        write!(f, "[{}]", quoted.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_dedups() {
        let labels = LabelSet::from_values(["A", "B", "A", "C"]);
        assert_eq!(labels.len(), 3);
        assert!(labels.same_members(&LabelSet::from_values(["C", "B", "A"])));
        assert_eq!(labels.as_slice(), &["A", "B", "C"]);
    }

    #[test]
    fn test_same_members_detects_difference() {
        let a = LabelSet::from_values(["A", "B"]);
        assert!(!a.same_members(&LabelSet::from_values(["A", "C"])));
        assert!(!a.same_members(&LabelSet::from_values(["A"])));
    }

    #[test]
    fn test_empty_value_is_a_label() {
        let labels = LabelSet::from_values(["", "x"]);
        assert!(labels.contains(""));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_display_quotes_labels() {
        let labels = LabelSet::from_values(["Subjective", "Objective"]);
        assert_eq!(labels.to_string(), r#"["Subjective", "Objective"]"#);
        assert_eq!(LabelSet::default().to_string(), "[]");
    }

    #[test]
    fn test_display_is_valid_json() {
        let labels = LabelSet::from_values(["tab\there", "line\nbreak", "say \"hi\""]);
        let shown = labels.to_string();
        let parsed: Vec<String> = serde_json::from_str(&shown).unwrap();
        assert_eq!(parsed, labels.as_slice());
        assert!(shown.contains(r#""line\nbreak""#));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let labels = LabelSet::from_values(["A", "B"]);
        assert_eq!(serde_json::to_string(&labels).unwrap(), r#"["A","B"]"#);
    }
}
