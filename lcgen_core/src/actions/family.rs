//! Action families per EN 1990 4.1.1
//!
//! The family decides which coefficient roles an action can take in a
//! combination: permanent actions get a favorable/unfavorable γ, variable
//! actions lead or accompany, accidental and seismic actions only appear in
//! their own situation.

use serde::{Deserialize, Serialize};

/// Classification of an action by its variation in time
///
/// # Example
/// ```
/// use lcgen_core::actions::ActionFamily;
///
/// let g = ActionFamily::Permanent;
/// assert_eq!(g.code(), "G");
/// assert_eq!(ActionFamily::Seismic.to_string(), "AE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionFamily {
    /// G - self-weight, fixed equipment, prestress, shrinkage
    Permanent,
    /// Q - imposed loads, traffic, wind, snow, thermal
    Variable,
    /// A - impact, fire, explosion
    Accidental,
    /// AE - earthquake
    Seismic,
}

impl ActionFamily {
    /// Standard symbol (G, Q, A, AE)
    pub fn code(&self) -> &'static str {
        match self {
            ActionFamily::Permanent => "G",
            ActionFamily::Variable => "Q",
            ActionFamily::Accidental => "A",
            ActionFamily::Seismic => "AE",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ActionFamily::Permanent => "Permanent action",
            ActionFamily::Variable => "Variable action",
            ActionFamily::Accidental => "Accidental action",
            ActionFamily::Seismic => "Seismic action",
        }
    }
}

impl std::fmt::Display for ActionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
