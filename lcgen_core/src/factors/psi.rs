//! Combination factors (ψ) per EN 1990 Annex A1, Table A1.1

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CombError, CombResult};
use crate::situation::PsiKind;

/// ψ0 (combination), ψ1 (frequent) and ψ2 (quasi-permanent) values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinationFactors {
    pub psi0: f64,
    pub psi1: f64,
    pub psi2: f64,
}

impl CombinationFactors {
    pub const fn new(psi0: f64, psi1: f64, psi2: f64) -> Self {
        CombinationFactors { psi0, psi1, psi2 }
    }

    /// Select one of the three values
    pub fn get(&self, kind: PsiKind) -> f64 {
        match kind {
            PsiKind::Psi0 => self.psi0,
            PsiKind::Psi1 => self.psi1,
            PsiKind::Psi2 => self.psi2,
        }
    }

    /// Check that every ψ lies in [0, 1]
    pub fn validate(&self, id: &str) -> CombResult<()> {
        for kind in [PsiKind::Psi0, PsiKind::Psi1, PsiKind::Psi2] {
            let value = self.get(kind);
            if !(0.0..=1.0).contains(&value) {
                return Err(CombError::invalid_input(
                    format!("{}.{}", id, kind.symbol()),
                    value.to_string(),
                    "Combination factor must lie in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// Combination factor categories keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombinationFactorTable {
    categories: BTreeMap<String, CombinationFactors>,
}

impl CombinationFactorTable {
    pub fn new() -> Self {
        CombinationFactorTable::default()
    }

    /// Add or replace a category (builder pattern)
    pub fn with_category(mut self, id: impl Into<String>, factors: CombinationFactors) -> Self {
        self.categories.insert(id.into(), factors);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, factors: CombinationFactors) {
        self.categories.insert(id.into(), factors);
    }

    pub fn get(&self, id: &str) -> Option<&CombinationFactors> {
        self.categories.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn validate(&self) -> CombResult<()> {
        self.categories.iter().try_for_each(|(id, factors)| factors.validate(id))
    }
}

/// EN 1990 Table A1.1 (buildings)
pub static EN1990_COMBINATION_FACTORS: Lazy<CombinationFactorTable> = Lazy::new(|| {
    CombinationFactorTable::new()
        // Imposed loads in buildings
        .with_category("en1990.category_a", CombinationFactors::new(0.7, 0.5, 0.3))
        .with_category("en1990.category_b", CombinationFactors::new(0.7, 0.5, 0.3))
        .with_category("en1990.category_c", CombinationFactors::new(0.7, 0.7, 0.6))
        .with_category("en1990.category_d", CombinationFactors::new(0.7, 0.7, 0.6))
        .with_category("en1990.category_e", CombinationFactors::new(1.0, 0.9, 0.8))
        // Traffic areas, vehicle weight <= 30 kN and 30..160 kN
        .with_category("en1990.category_f", CombinationFactors::new(0.7, 0.7, 0.6))
        .with_category("en1990.category_g", CombinationFactors::new(0.7, 0.5, 0.3))
        // Roofs
        .with_category("en1990.category_h", CombinationFactors::new(0.0, 0.0, 0.0))
        // Snow, sites above 1000 m a.s.l. (and Finland, Iceland, Norway, Sweden)
        .with_category("en1990.snow_high_altitude", CombinationFactors::new(0.7, 0.5, 0.2))
        .with_category("en1990.snow", CombinationFactors::new(0.5, 0.2, 0.0))
        .with_category("en1990.wind", CombinationFactors::new(0.6, 0.2, 0.0))
        .with_category("en1990.temperature", CombinationFactors::new(0.6, 0.5, 0.0))
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_wind() {
        let wind = EN1990_COMBINATION_FACTORS.get("en1990.wind").unwrap();
        assert_eq!(wind.get(PsiKind::Psi0), 0.6);
        assert_eq!(wind.get(PsiKind::Psi1), 0.2);
        assert_eq!(wind.get(PsiKind::Psi2), 0.0);
    }

    #[test]
    fn test_builtin_table_valid() {
        assert!(EN1990_COMBINATION_FACTORS.validate().is_ok());
        assert_eq!(EN1990_COMBINATION_FACTORS.len(), 12);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let table = CombinationFactorTable::new().with_category("bad", CombinationFactors::new(0.7, 1.2, 0.3));
        let err = table.validate().unwrap_err();
        match err {
            CombError::InvalidInput { field, .. } => assert_eq!(field, "bad.psi1"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_nan_rejected() {
        let factors = CombinationFactors::new(f64::NAN, 0.0, 0.0);
        assert!(factors.validate("nan").is_err());
    }
}
