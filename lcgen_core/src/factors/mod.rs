//! Safety factor and combination factor tables
//!
//! [`FactorTables`] bundles the γ table, the ψ table and the national choices
//! of one design-code annex, and implements the per-situation coefficient
//! selection rule:
//!
//! | Situation | Permanent | Leading variable | Other variable | Accidental/seismic |
//! |---|---|---|---|---|
//! | ULS-Persistent | γG,sup / γG,inf | γQ · 1.0 | γQ · ψ0 | - |
//! | ULS-Accidental | γGA | 1.0, ψ1 or ψ2 (national choice) | ψ2 | 1.0 |
//! | ULS-Seismic | γGA | - | ψ2 | 1.0 |
//! | SLS-Rare | 1.0 | 1.0 | ψ0 | - |
//! | SLS-Frequent | 1.0 | ψ1 | ψ2 | - |
//! | SLS-QuasiPermanent | 1.0 | - | ψ2 | - |
//!
//! # Example
//!
//! ```
//! use lcgen_core::actions::Action;
//! use lcgen_core::factors::{CoefficientRole, FactorTables};
//! use lcgen_core::situation::Situation;
//!
//! let tables = FactorTables::en1990();
//! let wind = Action::variable("W", "en1990.set_b.variable", "en1990.wind");
//!
//! let c = tables.coefficient(Situation::UlsPersistent, &wind, CoefficientRole::Accompanying).unwrap();
//! assert!((c - 0.9).abs() < 1e-12); // 1.5 * 0.6
//!
//! let c = tables.coefficient(Situation::SlsFrequent, &wind, CoefficientRole::Leading).unwrap();
//! assert!((c - 0.2).abs() < 1e-12);
//! ```

pub mod psi;
pub mod safety;

pub use psi::{CombinationFactorTable, CombinationFactors, EN1990_COMBINATION_FACTORS};
pub use safety::{SafetyFactorSet, SafetyFactorTable, EN1990_SAFETY_FACTORS};

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionFamily};
use crate::errors::{CombError, CombResult};
use crate::situation::{PsiKind, Situation};

/// Decimal places kept on every generated coefficient
const COEFFICIENT_DECIMALS: i32 = 10;

/// Round a coefficient so products like `1.5 * 0.6` compare and print as `0.9`
pub fn round_coefficient(value: f64) -> f64 {
    let scale = 10f64.powi(COEFFICIENT_DECIMALS);
    let rounded = (value * scale).round() / scale;
    // normalise -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Whether a permanent action increases or reduces the effect under study
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermanentSign {
    Favorable,
    Unfavorable,
}

impl PermanentSign {
    fn pick(&self, favorable: f64, unfavorable: f64) -> f64 {
        match self {
            PermanentSign::Favorable => favorable,
            PermanentSign::Unfavorable => unfavorable,
        }
    }
}

/// Role an action plays in one combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoefficientRole {
    Permanent(PermanentSign),
    Leading,
    Accompanying,
    /// The accidental or seismic action of its own situation
    Accidental,
}

/// Factor on the leading variable action in the accidental situation
/// (EN 1990 6.11b leaves the choice to the National Annex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccidentalLeadingFactor {
    #[default]
    Unity,
    Psi1,
    Psi2,
}

/// γ table, ψ table and national choices of one design-code annex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTables {
    pub safety_factors: SafetyFactorTable,
    pub combination_factors: CombinationFactorTable,
    #[serde(default)]
    pub accidental_leading: AccidentalLeadingFactor,
}

impl FactorTables {
    /// Tables built from caller-supplied data
    pub fn new(safety_factors: SafetyFactorTable, combination_factors: CombinationFactorTable) -> Self {
        FactorTables {
            safety_factors,
            combination_factors,
            accidental_leading: AccidentalLeadingFactor::default(),
        }
    }

    /// EN 1990 Annex A1 recommended values
    pub fn en1990() -> Self {
        FactorTables::new(EN1990_SAFETY_FACTORS.clone(), EN1990_COMBINATION_FACTORS.clone())
    }

    /// Set the accidental-situation leading factor (builder pattern)
    pub fn with_accidental_leading(mut self, choice: AccidentalLeadingFactor) -> Self {
        self.accidental_leading = choice;
        self
    }

    pub fn validate(&self) -> CombResult<()> {
        self.safety_factors.validate()?;
        self.combination_factors.validate()
    }

    /// Coefficient of `action` playing `role` in `situation`.
    ///
    /// Fails with `MissingFactor` when the action's family cannot play the
    /// role or when a referenced table entry is absent.
    pub fn coefficient(&self, situation: Situation, action: &Action, role: CoefficientRole) -> CombResult<f64> {
        let value = match role {
            CoefficientRole::Permanent(sign) => {
                require_family(situation, action, ActionFamily::Permanent, "permanent gamma")?;
                let set = self.safety_set(situation, action)?;
                match situation {
                    Situation::UlsPersistent => sign.pick(set.uls_favorable, set.uls_unfavorable),
                    Situation::UlsAccidental | Situation::UlsSeismic => {
                        sign.pick(set.uls_accidental_favorable, set.uls_accidental_unfavorable)
                    }
                    Situation::SlsRare | Situation::SlsFrequent | Situation::SlsQuasiPermanent => {
                        sign.pick(set.sls_favorable, set.sls_unfavorable)
                    }
                }
            }
            CoefficientRole::Leading => {
                require_family(situation, action, ActionFamily::Variable, "leading factor")?;
                let factor = match situation {
                    Situation::UlsPersistent | Situation::SlsRare => 1.0,
                    Situation::UlsAccidental => match self.accidental_leading {
                        AccidentalLeadingFactor::Unity => 1.0,
                        AccidentalLeadingFactor::Psi1 => self.psi(situation, action, PsiKind::Psi1)?,
                        AccidentalLeadingFactor::Psi2 => self.psi(situation, action, PsiKind::Psi2)?,
                    },
                    Situation::SlsFrequent => self.psi(situation, action, PsiKind::Psi1)?,
                    Situation::UlsSeismic | Situation::SlsQuasiPermanent => {
                        return Err(CombError::missing_factor(
                            &action.name,
                            situation.label(),
                            "situation has no leading variable action",
                        ));
                    }
                };
                self.variable_gamma(situation, action)? * factor
            }
            CoefficientRole::Accompanying => {
                require_family(situation, action, ActionFamily::Variable, "accompanying factor")?;
                let psi = self.psi(situation, action, situation.accompanying_psi())?;
                self.variable_gamma(situation, action)? * psi
            }
            CoefficientRole::Accidental => {
                match situation.required_family() {
                    Some(family) if family == action.family => 1.0,
                    _ => {
                        return Err(CombError::missing_factor(
                            &action.name,
                            situation.label(),
                            format!("{} does not act in this situation", action.family.description()),
                        ));
                    }
                }
            }
        };
        Ok(round_coefficient(value))
    }

    /// ψ an accompanying variable action gets in `situation`
    pub fn accompanying_psi(&self, situation: Situation, action: &Action) -> CombResult<f64> {
        require_family(situation, action, ActionFamily::Variable, "accompanying factor")?;
        self.psi(situation, action, situation.accompanying_psi())
    }

    fn safety_set(&self, situation: Situation, action: &Action) -> CombResult<&SafetyFactorSet> {
        self.safety_factors.get(&action.safety_factor_set).ok_or_else(|| {
            CombError::missing_factor(
                &action.name,
                situation.label(),
                format!("safety factor set '{}' is not in the table", action.safety_factor_set),
            )
        })
    }

    fn variable_gamma(&self, situation: Situation, action: &Action) -> CombResult<f64> {
        let set = self.safety_set(situation, action)?;
        Ok(match situation {
            Situation::UlsPersistent => set.uls_unfavorable,
            Situation::UlsAccidental | Situation::UlsSeismic => set.uls_accidental_unfavorable,
            Situation::SlsRare | Situation::SlsFrequent | Situation::SlsQuasiPermanent => set.sls_unfavorable,
        })
    }

    fn psi(&self, situation: Situation, action: &Action, kind: PsiKind) -> CombResult<f64> {
        let category = action.combination_factors.as_deref().ok_or_else(|| {
            CombError::missing_factor(
                &action.name,
                situation.label(),
                format!("{} needed but the action has no combination factor category", kind.symbol()),
            )
        })?;
        let factors = self.combination_factors.get(category).ok_or_else(|| {
            CombError::missing_factor(
                &action.name,
                situation.label(),
                format!("{} category '{}' is not in the table", kind.symbol(), category),
            )
        })?;
        Ok(factors.get(kind))
    }
}

impl Default for FactorTables {
    fn default() -> Self {
        FactorTables::en1990()
    }
}

fn require_family(situation: Situation, action: &Action, family: ActionFamily, factor: &str) -> CombResult<()> {
    if action.family == family {
        Ok(())
    } else {
        Err(CombError::missing_factor(
            &action.name,
            situation.label(),
            format!("{} is not defined for a {}", factor, action.family.description().to_lowercase()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn g1() -> Action {
        Action::permanent("G1", safety::SET_B_PERMANENT)
    }

    fn q1() -> Action {
        Action::variable("Q1", safety::SET_B_VARIABLE, "en1990.category_a")
    }

    #[test]
    fn test_round_coefficient() {
        assert_eq!(round_coefficient(1.5 * 0.6), 0.9);
        assert_eq!(round_coefficient(-0.0), 0.0);
        assert!(round_coefficient(-0.0).is_sign_positive());
        assert_eq!(round_coefficient(1.35), 1.35);
    }

    #[test]
    fn test_permanent_uls() {
        let tables = FactorTables::en1990();
        let unfav = CoefficientRole::Permanent(PermanentSign::Unfavorable);
        let fav = CoefficientRole::Permanent(PermanentSign::Favorable);
        assert_eq!(tables.coefficient(Situation::UlsPersistent, &g1(), unfav).unwrap(), 1.35);
        assert_eq!(tables.coefficient(Situation::UlsPersistent, &g1(), fav).unwrap(), 1.0);
        assert_eq!(tables.coefficient(Situation::UlsAccidental, &g1(), unfav).unwrap(), 1.0);
        assert_eq!(tables.coefficient(Situation::SlsRare, &g1(), unfav).unwrap(), 1.0);
    }

    #[test]
    fn test_variable_roles() {
        let tables = FactorTables::en1990();
        let q = q1();
        assert_eq!(tables.coefficient(Situation::UlsPersistent, &q, CoefficientRole::Leading).unwrap(), 1.5);
        assert_relative_eq!(
            tables.coefficient(Situation::UlsPersistent, &q, CoefficientRole::Accompanying).unwrap(),
            1.05
        );
        assert_eq!(tables.coefficient(Situation::SlsRare, &q, CoefficientRole::Accompanying).unwrap(), 0.7);
        assert_eq!(tables.coefficient(Situation::SlsFrequent, &q, CoefficientRole::Leading).unwrap(), 0.5);
        assert_eq!(tables.coefficient(Situation::SlsFrequent, &q, CoefficientRole::Accompanying).unwrap(), 0.3);
        assert_eq!(
            tables.coefficient(Situation::SlsQuasiPermanent, &q, CoefficientRole::Accompanying).unwrap(),
            0.3
        );
        assert_eq!(tables.coefficient(Situation::UlsSeismic, &q, CoefficientRole::Accompanying).unwrap(), 0.3);
    }

    #[test]
    fn test_accidental_leading_national_choice() {
        let q = q1();
        let unity = FactorTables::en1990();
        assert_eq!(unity.coefficient(Situation::UlsAccidental, &q, CoefficientRole::Leading).unwrap(), 1.0);

        let psi1 = FactorTables::en1990().with_accidental_leading(AccidentalLeadingFactor::Psi1);
        assert_eq!(psi1.coefficient(Situation::UlsAccidental, &q, CoefficientRole::Leading).unwrap(), 0.5);

        let psi2 = FactorTables::en1990().with_accidental_leading(AccidentalLeadingFactor::Psi2);
        assert_eq!(psi2.coefficient(Situation::UlsAccidental, &q, CoefficientRole::Leading).unwrap(), 0.3);
    }

    #[test]
    fn test_permanent_has_no_psi() {
        let tables = FactorTables::en1990();
        let err = tables
            .coefficient(Situation::SlsFrequent, &g1(), CoefficientRole::Leading)
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FACTOR");
    }

    #[test]
    fn test_no_leading_role_in_quasi_permanent() {
        let tables = FactorTables::en1990();
        let err = tables
            .coefficient(Situation::SlsQuasiPermanent, &q1(), CoefficientRole::Leading)
            .unwrap_err();
        assert!(matches!(err, CombError::MissingFactor { .. }));
    }

    #[test]
    fn test_missing_category() {
        let tables = FactorTables::en1990();
        let q = Action::variable("Q", safety::SET_B_VARIABLE, "national.bridges");
        let err = tables
            .coefficient(Situation::SlsRare, &q, CoefficientRole::Accompanying)
            .unwrap_err();
        assert!(err.to_string().contains("national.bridges"));

        // ULS leading needs no ψ
        assert_eq!(tables.coefficient(Situation::UlsPersistent, &q, CoefficientRole::Leading).unwrap(), 1.5);
    }

    #[test]
    fn test_missing_safety_set() {
        let tables = FactorTables::en1990();
        let g = Action::permanent("G", "national.set_x");
        assert!(tables
            .coefficient(Situation::UlsPersistent, &g, CoefficientRole::Permanent(PermanentSign::Unfavorable))
            .is_err());
    }

    #[test]
    fn test_accidental_only_in_own_situation() {
        let tables = FactorTables::en1990();
        let a = Action::accidental("A1");
        let e = Action::seismic("E1");
        assert_eq!(tables.coefficient(Situation::UlsAccidental, &a, CoefficientRole::Accidental).unwrap(), 1.0);
        assert_eq!(tables.coefficient(Situation::UlsSeismic, &e, CoefficientRole::Accidental).unwrap(), 1.0);
        assert!(tables.coefficient(Situation::UlsSeismic, &a, CoefficientRole::Accidental).is_err());
        assert!(tables.coefficient(Situation::UlsPersistent, &a, CoefficientRole::Accidental).is_err());
    }

    #[test]
    fn test_tables_serialization_defaults_national_choice() {
        let tables = FactorTables::en1990();
        let mut value = serde_json::to_value(&tables).unwrap();
        value.as_object_mut().unwrap().remove("accidental_leading");
        let parsed: FactorTables = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, tables);
    }
}
