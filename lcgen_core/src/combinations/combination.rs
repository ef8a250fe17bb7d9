//! Combination records
//!
//! A [`Combination`] is created only by a
//! [`CombinationContainer`](super::CombinationContainer), which assigns its id
//! and name; it cannot be mutated afterwards. The generator hands the
//! container [`DraftCombination`]s.

use serde::{Deserialize, Serialize};

use crate::situation::Situation;

/// One `(action, coefficient)` pair of a combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationTerm {
    #[serde(rename = "action")]
    pub action_name: String,
    #[serde(rename = "coef")]
    pub coefficient: f64,
}

impl CombinationTerm {
    pub fn new(action_name: impl Into<String>, coefficient: f64) -> Self {
        CombinationTerm {
            action_name: action_name.into(),
            coefficient,
        }
    }
}

/// Identity of a combination for deduplication: situation plus the
/// name-sorted `(action, coefficient bits)` pairs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombinationKey {
    situation: Situation,
    terms: Vec<(String, u64)>,
}

impl CombinationKey {
    fn new(situation: Situation, terms: &[CombinationTerm]) -> Self {
        let mut terms: Vec<(String, u64)> = terms
            .iter()
            .map(|t| (t.action_name.clone(), normalised_bits(t.coefficient)))
            .collect();
        terms.sort();
        CombinationKey { situation, terms }
    }
}

fn normalised_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// A combination before it is numbered
#[derive(Debug, Clone, PartialEq)]
pub struct DraftCombination {
    pub(crate) situation: Situation,
    pub(crate) terms: Vec<CombinationTerm>,
    pub(crate) description: String,
}

impl DraftCombination {
    /// Terms are stable-sorted by action name
    pub fn new(situation: Situation, mut terms: Vec<CombinationTerm>, description: impl Into<String>) -> Self {
        terms.sort_by(|a, b| a.action_name.cmp(&b.action_name));
        DraftCombination {
            situation,
            terms,
            description: description.into(),
        }
    }

    pub fn situation(&self) -> Situation {
        self.situation
    }

    pub fn terms(&self) -> &[CombinationTerm] {
        &self.terms
    }

    pub fn key(&self) -> CombinationKey {
        CombinationKey::new(self.situation, &self.terms)
    }
}

/// A numbered design load combination
///
/// # JSON Format
/// ```json
/// {"id": 1, "name": "ULS01", "situation": "ULS-Persistent",
///  "terms": [{"action": "G1", "coef": 1.35}, {"action": "Q1", "coef": 1.5}],
///  "description": "Q1 leading"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Combination {
    id: u32,
    name: String,
    situation: Situation,
    terms: Vec<CombinationTerm>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

impl Combination {
    pub(crate) fn from_draft(id: u32, name: String, draft: DraftCombination) -> Self {
        Combination {
            id,
            name,
            situation: draft.situation,
            terms: draft.terms,
            description: draft.description,
        }
    }

    pub(crate) fn into_draft(self) -> DraftCombination {
        DraftCombination {
            situation: self.situation,
            terms: self.terms,
            description: self.description,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn situation(&self) -> Situation {
        self.situation
    }

    /// Terms sorted by action name
    pub fn terms(&self) -> &[CombinationTerm] {
        &self.terms
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Coefficient of an action (0.0 if absent)
    pub fn coefficient(&self, action: &str) -> f64 {
        self.terms
            .iter()
            .find(|t| t.action_name == action)
            .map(|t| t.coefficient)
            .unwrap_or(0.0)
    }

    /// Whether an action is present
    pub fn contains(&self, action: &str) -> bool {
        self.terms.iter().any(|t| t.action_name == action)
    }

    /// Names of the present actions
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.action_name.as_str())
    }

    /// Expression for reports, e.g. `1.35*G1 + 1.5*Q1 + 0.9*W`
    pub fn expression(&self) -> String {
        self.terms
            .iter()
            .map(|t| {
                if t.coefficient == 1.0 {
                    t.action_name.clone()
                } else {
                    format!("{}*{}", t.coefficient, t.action_name)
                }
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn key(&self) -> CombinationKey {
        CombinationKey::new(self.situation, &self.terms)
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.situation, self.expression())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Combination {
        let draft = DraftCombination::new(
            Situation::UlsPersistent,
            vec![
                CombinationTerm::new("W", 0.9),
                CombinationTerm::new("G1", 1.35),
                CombinationTerm::new("Q1", 1.5),
            ],
            "Q1 leading",
        );
        Combination::from_draft(1, "ULS01".to_string(), draft)
    }

    #[test]
    fn test_terms_sorted_by_name() {
        let combo = sample();
        let names: Vec<_> = combo.action_names().collect();
        assert_eq!(names, vec!["G1", "Q1", "W"]);
    }

    #[test]
    fn test_coefficient_lookup() {
        let combo = sample();
        assert_eq!(combo.coefficient("G1"), 1.35);
        assert_eq!(combo.coefficient("Q9"), 0.0);
        assert!(combo.contains("W"));
        assert!(!combo.contains("Q9"));
    }

    #[test]
    fn test_expression() {
        let draft = DraftCombination::new(
            Situation::SlsRare,
            vec![CombinationTerm::new("G1", 1.0), CombinationTerm::new("Q1", 0.7)],
            "",
        );
        let combo = Combination::from_draft(4, "SLSR01".to_string(), draft);
        assert_eq!(combo.expression(), "G1 + 0.7*Q1");
        assert_eq!(combo.to_string(), "SLSR01 (SLS-Rare): G1 + 0.7*Q1");
    }

    #[test]
    fn test_key_ignores_term_order_and_numbering() {
        let a = DraftCombination::new(
            Situation::UlsPersistent,
            vec![CombinationTerm::new("G1", 1.35), CombinationTerm::new("Q1", 1.5)],
            "Q1 leading",
        );
        let b = DraftCombination::new(
            Situation::UlsPersistent,
            vec![CombinationTerm::new("Q1", 1.5), CombinationTerm::new("G1", 1.35)],
            "other path",
        );
        assert_eq!(a.key(), b.key());

        let c = DraftCombination::new(Situation::SlsRare, a.terms().to_vec(), "");
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"situation\":\"ULS-Persistent\""));
        assert!(json.contains("{\"action\":\"G1\",\"coef\":1.35}"));

        let empty = Combination::from_draft(
            2,
            "ULS02".to_string(),
            DraftCombination::new(Situation::UlsPersistent, vec![CombinationTerm::new("G1", 1.0)], ""),
        );
        assert!(!serde_json::to_string(&empty).unwrap().contains("description"));
    }
}
