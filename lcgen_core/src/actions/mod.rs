//! Actions and the per-project action catalogue
//!
//! An [`Action`] is a named load source (self-weight, traffic, wind, impact)
//! with references into the factor tables and declarative relationships to
//! other actions. The [`ActionCatalogue`] is the ordered, name-unique set of
//! actions of one project; the generator only borrows it.
//!
//! # Example
//!
//! ```
//! use lcgen_core::actions::{Action, ActionCatalogue};
//!
//! let mut catalogue = ActionCatalogue::new();
//! catalogue.add(Action::permanent("G1", "en1990.set_b.permanent")).unwrap();
//! catalogue
//!     .add(
//!         Action::variable("Q1", "en1990.set_b.variable", "en1990.category_f")
//!             .with_incompatible("Q2.*"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(catalogue.len(), 2);
//! assert!(catalogue.add(Action::permanent("G1", "en1990.set_b.permanent")).is_err());
//! ```

pub mod family;

pub use family::ActionFamily;

use serde::{Deserialize, Serialize};

use crate::errors::{CombError, CombResult};

/// A named, typed load source
///
/// # JSON Format
/// ```json
/// {
///   "name": "Q1a",
///   "family": "variable",
///   "description": "Centrifugal force",
///   "safety_factor_set": "en1990.set_b.variable",
///   "combination_factors": "en1990.category_f",
///   "depends_on": "Q1",
///   "incompatible_with": ["Q2.*"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier within the project
    pub name: String,

    pub family: ActionFamily,

    /// Free text for reports
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Key into the safety factor table
    pub safety_factor_set: String,

    /// Key into the combination factor table (variable actions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combination_factors: Option<String>,

    /// Only allowed as an accompanying action, never as the leading one
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_determinant: bool,

    /// This action can only be present together with the named one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,

    /// Regular expressions matched against whole action names; matching
    /// actions never share a combination with this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incompatible_with: Vec<String>,

    /// Construction stage / origin of a permanent action. Actions sharing a
    /// group take the favorable or unfavorable γ together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_group: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Action {
    /// Create an action with no relationships
    pub fn new(name: impl Into<String>, family: ActionFamily, safety_factor_set: impl Into<String>) -> Self {
        Action {
            name: name.into(),
            family,
            description: String::new(),
            safety_factor_set: safety_factor_set.into(),
            combination_factors: None,
            not_determinant: false,
            depends_on: None,
            incompatible_with: Vec::new(),
            permanent_group: None,
        }
    }

    /// Permanent action (G)
    pub fn permanent(name: impl Into<String>, safety_factor_set: impl Into<String>) -> Self {
        Action::new(name, ActionFamily::Permanent, safety_factor_set)
    }

    /// Variable action (Q) with its ψ category
    pub fn variable(
        name: impl Into<String>,
        safety_factor_set: impl Into<String>,
        combination_factors: impl Into<String>,
    ) -> Self {
        let mut action = Action::new(name, ActionFamily::Variable, safety_factor_set);
        action.combination_factors = Some(combination_factors.into());
        action
    }

    /// Accidental action (A), using the built-in accidental γ set
    pub fn accidental(name: impl Into<String>) -> Self {
        Action::new(name, ActionFamily::Accidental, crate::factors::safety::ACCIDENTAL_SET)
    }

    /// Seismic action (AE), using the built-in accidental γ set
    pub fn seismic(name: impl Into<String>) -> Self {
        Action::new(name, ActionFamily::Seismic, crate::factors::safety::ACCIDENTAL_SET)
    }

    /// Set the description (builder pattern)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare the action this one depends on
    pub fn with_depends_on(mut self, action: impl Into<String>) -> Self {
        self.depends_on = Some(action.into());
        self
    }

    /// Add an incompatibility pattern
    pub fn with_incompatible(mut self, pattern: impl Into<String>) -> Self {
        self.incompatible_with.push(pattern.into());
        self
    }

    /// Mark the action as never leading
    pub fn not_determinant(mut self) -> Self {
        self.not_determinant = true;
        self
    }

    /// Put a permanent action into a construction-stage group
    pub fn in_permanent_group(mut self, group: impl Into<String>) -> Self {
        self.permanent_group = Some(group.into());
        self
    }

    /// Permanent group key; ungrouped actions form their own group
    pub fn group_key(&self) -> &str {
        self.permanent_group.as_deref().unwrap_or(&self.name)
    }

    /// Validate the fields that do not depend on other actions
    pub fn validate(&self) -> CombResult<()> {
        if self.name.trim().is_empty() {
            return Err(CombError::invalid_input("name", &self.name, "Action name cannot be empty"));
        }
        if self.safety_factor_set.trim().is_empty() {
            return Err(CombError::invalid_input(
                format!("{}.safety_factor_set", self.name),
                &self.safety_factor_set,
                "Safety factor set reference cannot be empty",
            ));
        }
        if self.permanent_group.is_some() && self.family != ActionFamily::Permanent {
            return Err(CombError::invalid_input(
                format!("{}.permanent_group", self.name),
                self.family.description(),
                "Only permanent actions belong to a permanent group",
            ));
        }
        Ok(())
    }
}

/// Ordered, name-unique collection of the actions of one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionCatalogue {
    actions: Vec<Action>,
}

impl ActionCatalogue {
    /// Create an empty catalogue
    pub fn new() -> Self {
        ActionCatalogue::default()
    }

    /// Add an action, rejecting empty and duplicate names
    pub fn add(&mut self, action: Action) -> CombResult<()> {
        action.validate()?;
        if self.get(&action.name).is_some() {
            return Err(CombError::DuplicateAction { name: action.name });
        }
        self.actions.push(action);
        Ok(())
    }

    /// Add an action (builder pattern)
    pub fn with(mut self, action: Action) -> CombResult<Self> {
        self.add(action)?;
        Ok(self)
    }

    /// Look up an action by name
    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Actions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Actions of one family, in insertion order
    pub fn of_family(&self, family: ActionFamily) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.family == family)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }
}

impl TryFrom<Vec<Action>> for ActionCatalogue {
    type Error = CombError;

    fn try_from(actions: Vec<Action>) -> Result<Self, Self::Error> {
        let mut catalogue = ActionCatalogue::new();
        for action in actions {
            catalogue.add(action)?;
        }
        Ok(catalogue)
    }
}

impl From<ActionCatalogue> for Vec<Action> {
    fn from(catalogue: ActionCatalogue) -> Self {
        catalogue.actions
    }
}
