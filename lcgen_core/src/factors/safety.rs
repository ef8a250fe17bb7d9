//! Partial safety factors (γ) per EN 1990 Annex A1, Table A1.2
//!
//! | Set | Use | γG,sup | γG,inf | γQ |
//! |-----|-----|--------|--------|----|
//! | A   | Static equilibrium (EQU) | 1.10 | 0.90 | 1.50 |
//! | B   | Structural members (STR) | 1.35 | 1.00 | 1.50 |
//! | C   | Geotechnical (GEO)       | 1.00 | 1.00 | 1.30 |
//!
//! Accidental and seismic situations use γ = 1.0 for permanent actions and
//! for the variable actions present; favorable variable actions are 0.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CombError, CombResult};

/// Set B, permanent actions
pub const SET_B_PERMANENT: &str = "en1990.set_b.permanent";
/// Set B, variable actions
pub const SET_B_VARIABLE: &str = "en1990.set_b.variable";
/// γ = 1.0 throughout, for accidental and seismic actions
pub const ACCIDENTAL_SET: &str = "en1990.accidental";

/// γ values of one action class in every situation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyFactorSet {
    pub uls_favorable: f64,
    pub uls_unfavorable: f64,
    pub uls_accidental_favorable: f64,
    pub uls_accidental_unfavorable: f64,
    pub sls_favorable: f64,
    pub sls_unfavorable: f64,
}

impl SafetyFactorSet {
    /// Permanent-action set: ULS favorable/unfavorable, 1.0 elsewhere
    pub const fn permanent(uls_favorable: f64, uls_unfavorable: f64) -> Self {
        SafetyFactorSet {
            uls_favorable,
            uls_unfavorable,
            uls_accidental_favorable: 1.0,
            uls_accidental_unfavorable: 1.0,
            sls_favorable: 1.0,
            sls_unfavorable: 1.0,
        }
    }

    /// Variable-action set: favorable values are 0 in every situation
    pub const fn variable(uls_unfavorable: f64) -> Self {
        SafetyFactorSet {
            uls_favorable: 0.0,
            uls_unfavorable,
            uls_accidental_favorable: 0.0,
            uls_accidental_unfavorable: 1.0,
            sls_favorable: 0.0,
            sls_unfavorable: 1.0,
        }
    }

    /// All values 1.0
    pub const fn unity() -> Self {
        SafetyFactorSet::permanent(1.0, 1.0)
    }

    /// Check that every γ is finite and non-negative
    pub fn validate(&self, id: &str) -> CombResult<()> {
        let values = [
            ("uls_favorable", self.uls_favorable),
            ("uls_unfavorable", self.uls_unfavorable),
            ("uls_accidental_favorable", self.uls_accidental_favorable),
            ("uls_accidental_unfavorable", self.uls_accidental_unfavorable),
            ("sls_favorable", self.sls_favorable),
            ("sls_unfavorable", self.sls_unfavorable),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(CombError::invalid_input(
                    format!("{}.{}", id, field),
                    value.to_string(),
                    "Partial safety factor must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

/// Safety factor sets keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafetyFactorTable {
    sets: BTreeMap<String, SafetyFactorSet>,
}

impl SafetyFactorTable {
    pub fn new() -> Self {
        SafetyFactorTable::default()
    }

    /// Add or replace a set (builder pattern)
    pub fn with_set(mut self, id: impl Into<String>, set: SafetyFactorSet) -> Self {
        self.sets.insert(id.into(), set);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, set: SafetyFactorSet) {
        self.sets.insert(id.into(), set);
    }

    pub fn get(&self, id: &str) -> Option<&SafetyFactorSet> {
        self.sets.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn validate(&self) -> CombResult<()> {
        self.sets.iter().try_for_each(|(id, set)| set.validate(id))
    }
}

/// EN 1990 Table A1.2 sets A, B and C plus the accidental set
pub static EN1990_SAFETY_FACTORS: Lazy<SafetyFactorTable> = Lazy::new(|| {
    SafetyFactorTable::new()
        .with_set("en1990.set_a.permanent", SafetyFactorSet::permanent(0.90, 1.10))
        .with_set("en1990.set_a.variable", SafetyFactorSet::variable(1.50))
        .with_set(SET_B_PERMANENT, SafetyFactorSet::permanent(1.00, 1.35))
        .with_set(SET_B_VARIABLE, SafetyFactorSet::variable(1.50))
        .with_set("en1990.set_c.permanent", SafetyFactorSet::permanent(1.00, 1.00))
        .with_set("en1990.set_c.variable", SafetyFactorSet::variable(1.30))
        .with_set(ACCIDENTAL_SET, SafetyFactorSet::unity())
});
