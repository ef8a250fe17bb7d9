//! # lcgen_core - Load Combination Generator
//!
//! `lcgen_core` turns a catalogue of actions (self-weight, imposed loads,
//! wind, accidents, earthquakes) and the partial-safety and combination
//! factor tables of a design code into the complete, de-duplicated list of
//! design load combinations for every design situation. All inputs and
//! outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: identical input gives byte-identical output
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//! - **Tables as data**: national annexes are factor tables, not code
//!
//! ## Quick Start
//!
//! ```rust
//! use lcgen_core::actions::{Action, ActionCatalogue};
//! use lcgen_core::combinations::{generate, GenerationSettings};
//! use lcgen_core::factors::FactorTables;
//!
//! let catalogue = ActionCatalogue::new()
//!     .with(Action::permanent("G1", "en1990.set_b.permanent"))?
//!     .with(Action::variable("Q1", "en1990.set_b.variable", "en1990.category_b"))?
//!     .with(Action::variable("S", "en1990.set_b.variable", "en1990.snow"))?;
//!
//! let outcome = generate(&catalogue, &FactorTables::en1990(), &GenerationSettings::default())?;
//! for combination in outcome.container.iter() {
//!     println!("{}", combination);
//! }
//!
//! let json = lcgen_core::serializer::write(&outcome.container)?;
//! assert!(json.starts_with("{\n  \"combinations\""));
//! # Ok::<(), lcgen_core::errors::CombError>(())
//! ```
//!
//! ## Modules
//!
//! - [`situation`] - The six design situations
//! - [`actions`] - Actions and the action catalogue
//! - [`factors`] - Safety (γ) and combination (ψ) factor tables
//! - [`graph`] - Resolved incompatibility and dependency relations
//! - [`combinations`] - Generator, container and combination records
//! - [`serializer`] - Stable JSON export and import
//! - [`project`] - Project file container, metadata and settings
//! - [`errors`] - Structured error types
//! - [`file_io`] - File operations with atomic saves and locking

pub mod actions;
pub mod combinations;
pub mod errors;
pub mod factors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod graph;
pub mod project;
pub mod serializer;
pub mod situation;

// Re-export commonly used types at crate root for convenience
pub use actions::{Action, ActionCatalogue, ActionFamily};
pub use combinations::{generate, Combination, CombinationContainer, GenerationOutcome, GenerationSettings};
pub use errors::{CombError, CombResult};
pub use factors::FactorTables;
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_project, save_project, FileLock};
pub use project::{Project, ProjectMetadata};
pub use situation::Situation;
