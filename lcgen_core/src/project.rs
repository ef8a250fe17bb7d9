//! # Project Data Structures
//!
//! The `Project` struct is the root container for one combination study.
//! Projects serialize to `.lcg` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (version, engineer, job info, timestamps)
//! ├── settings: GenerationSettings (situations, sign policy, parallelism)
//! ├── tables: FactorTables (γ sets, ψ categories, national choices)
//! └── actions: ActionCatalogue (the actions and their relationships)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use lcgen_core::actions::Action;
//! use lcgen_core::project::Project;
//!
//! let mut project = Project::new("Jane Engineer", "25-042", "Footbridge");
//! project.add_action(Action::permanent("G1", "en1990.set_b.permanent"))?;
//! project.add_action(Action::variable("Q1", "en1990.set_b.variable", "en1990.category_c"))?;
//!
//! let outcome = project.generate()?;
//! assert!(!outcome.container.is_empty());
//!
//! // Serialize to JSON (see file_io for atomic saves)
//! let json = serde_json::to_string_pretty(&project)?;
//! # Ok::<(), lcgen_core::errors::CombError>(())
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::{Action, ActionCatalogue};
use crate::combinations::{generate, GenerationOutcome, GenerationSettings};
use crate::errors::CombResult;
use crate::factors::FactorTables;

/// Current schema version for .lcg files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
///
/// This is the top-level struct that gets serialized to `.lcg` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project metadata (version, engineer, job info)
    pub meta: ProjectMetadata,

    /// What to generate
    #[serde(default)]
    pub settings: GenerationSettings,

    /// Factor tables; the EN 1990 recommended values when omitted
    #[serde(default)]
    pub tables: FactorTables,

    /// Actions on the structure
    #[serde(default)]
    pub actions: ActionCatalogue,
}

impl Project {
    /// Create a new project with the EN 1990 tables and no actions.
    ///
    /// # Arguments
    ///
    /// * `engineer` - Name of the responsible engineer
    /// * `job_id` - Job/project number (e.g., "25-001")
    /// * `title` - Structure or study title
    ///
    /// # Example
    ///
    /// ```rust
    /// use lcgen_core::project::Project;
    ///
    /// let project = Project::new("John Doe", "25-001", "Station roof");
    /// assert_eq!(project.meta.engineer, "John Doe");
    /// assert!(project.actions.is_empty());
    /// ```
    pub fn new(engineer: impl Into<String>, job_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                id: Uuid::new_v4(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                title: title.into(),
                design_code: default_design_code(),
                created: now,
                modified: now,
            },
            settings: GenerationSettings::default(),
            tables: FactorTables::en1990(),
            actions: ActionCatalogue::new(),
        }
    }

    /// Add an action; rejects invalid and duplicate actions.
    pub fn add_action(&mut self, action: Action) -> CombResult<()> {
        self.actions.add(action)?;
        self.touch();
        Ok(())
    }

    /// Generate the combinations of this project with its own settings.
    pub fn generate(&self) -> CombResult<GenerationOutcome> {
        generate(&self.actions, &self.tables, &self.settings)
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("", "", "")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Stable project identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Name of the responsible engineer
    pub engineer: String,

    /// Job/project number
    pub job_id: String,

    /// Structure or study title
    pub title: String,

    /// Design code and annex the tables follow (e.g., "EN 1990:2002+A1")
    #[serde(default = "default_design_code")]
    pub design_code: String,

    /// When the project was created
    pub created: DateTime<Utc>,

    /// When the project was last modified
    pub modified: DateTime<Utc>,
}

fn default_design_code() -> String {
    "EN 1990:2002+A1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::PermanentSignRule;
    use crate::situation::Situation;

    #[test]
    fn test_project_creation() {
        let project = Project::new("John Doe", "25-001", "Station roof");
        assert_eq!(project.meta.engineer, "John Doe");
        assert_eq!(project.meta.job_id, "25-001");
        assert_eq!(project.meta.title, "Station roof");
        assert_eq!(project.meta.version, SCHEMA_VERSION);
        assert_eq!(project.tables, FactorTables::en1990());
        assert!(project.settings.parallel);
    }

    #[test]
    fn test_project_serialization() {
        let mut project = Project::new("Jane Engineer", "25-042", "Footbridge");
        project
            .add_action(Action::permanent("G1", "en1990.set_b.permanent"))
            .unwrap();
        project.settings.permanent_signs = PermanentSignRule::OneGroupFavorable;
        let json = serde_json::to_string_pretty(&project).unwrap();

        assert!(json.contains("Jane Engineer"));
        assert!(json.contains("\"OneGroupFavorable\""));
        assert!(json.contains("en1990.set_b.permanent"));

        let roundtrip: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, project);
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "engineer": "E",
                "job_id": "J",
                "title": "T",
                "created": "2025-01-01T00:00:00Z",
                "modified": "2025-01-01T00:00:00Z"
            },
            "actions": [
                {"name": "G1", "family": "permanent", "safety_factor_set": "en1990.set_b.permanent"}
            ]
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.meta.design_code, "EN 1990:2002+A1");
        assert_eq!(project.settings.situations, Situation::ALL.to_vec());
        assert_eq!(project.tables, FactorTables::en1990());
        assert_eq!(project.actions.len(), 1);
    }

    #[test]
    fn test_duplicate_action_rejected_in_file() {
        let mut project = Project::new("E", "J", "T");
        project.add_action(Action::permanent("G1", "en1990.set_b.permanent")).unwrap();
        let mut value = serde_json::to_value(&project).unwrap();
        let duplicate = value["actions"][0].clone();
        value["actions"].as_array_mut().unwrap().push(duplicate);
        assert!(serde_json::from_value::<Project>(value).is_err());
    }

    #[test]
    fn test_generate_uses_settings() {
        let mut project = Project::new("E", "J", "T");
        project.add_action(Action::permanent("G1", "en1990.set_b.permanent")).unwrap();
        project.settings.situations = vec![Situation::UlsPersistent];

        let outcome = project.generate().unwrap();
        assert_eq!(outcome.container.len(), 1);
        assert_eq!(outcome.container.by_id(1).unwrap().name(), "ULS01");
    }
}
