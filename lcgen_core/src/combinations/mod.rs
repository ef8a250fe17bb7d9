//! # Load Combinations
//!
//! - [`generator`] - enumerates leading/accompanying assignments per situation
//! - [`container`] - numbers, de-duplicates and owns the result
//! - [`combination`] - the combination records themselves
//! - [`policy`] - favorable/unfavorable patterns for permanent groups

pub mod combination;
pub mod container;
pub mod generator;
pub mod policy;

pub use combination::{Combination, CombinationKey, CombinationTerm, DraftCombination};
pub use container::CombinationContainer;
pub use generator::{
    generate, CombinationGenerator, GenerationOutcome, GenerationSettings, GenerationWarning,
};
pub use policy::{AllPatterns, OneGroupFavorable, PermanentSignPolicy, PermanentSignRule, UnfavorableOnly};
