//! Limit-state design situations
//!
//! A [`Situation`] fixes which coefficient role applies to which action
//! family. The enumeration is closed: every `match` over it is exhaustive, and
//! its declaration order is the order in which the generator numbers
//! combinations and the serializer writes them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actions::ActionFamily;
use crate::errors::CombError;

/// Limit-state design situation
///
/// # Example
/// ```
/// use lcgen_core::situation::Situation;
///
/// let s: Situation = "SLS-Frequent".parse().unwrap();
/// assert_eq!(s, Situation::SlsFrequent);
/// assert_eq!(s.label(), "SLS-Frequent");
/// assert!(s.has_leading_role());
/// assert!(!Situation::SlsQuasiPermanent.has_leading_role());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Situation {
    /// Fundamental combination, EN 1990 6.10
    #[serde(rename = "ULS-Persistent")]
    UlsPersistent,
    /// Accidental design situation, EN 1990 6.11b
    #[serde(rename = "ULS-Accidental")]
    UlsAccidental,
    /// Seismic design situation, EN 1990 6.12b
    #[serde(rename = "ULS-Seismic")]
    UlsSeismic,
    /// Characteristic (rare) combination, EN 1990 6.14b
    #[serde(rename = "SLS-Rare")]
    SlsRare,
    /// Frequent combination, EN 1990 6.15b
    #[serde(rename = "SLS-Frequent")]
    SlsFrequent,
    /// Quasi-permanent combination, EN 1990 6.16b
    #[serde(rename = "SLS-QuasiPermanent")]
    SlsQuasiPermanent,
}

/// Which ψ factor a situation applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PsiKind {
    /// ψ0, combination value
    Psi0,
    /// ψ1, frequent value
    Psi1,
    /// ψ2, quasi-permanent value
    Psi2,
}

impl PsiKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            PsiKind::Psi0 => "psi0",
            PsiKind::Psi1 => "psi1",
            PsiKind::Psi2 => "psi2",
        }
    }
}

impl Situation {
    /// All situations in generation order
    pub const ALL: [Situation; 6] = [
        Situation::UlsPersistent,
        Situation::UlsAccidental,
        Situation::UlsSeismic,
        Situation::SlsRare,
        Situation::SlsFrequent,
        Situation::SlsQuasiPermanent,
    ];

    /// External name, as written to combination files
    pub fn label(&self) -> &'static str {
        match self {
            Situation::UlsPersistent => "ULS-Persistent",
            Situation::UlsAccidental => "ULS-Accidental",
            Situation::UlsSeismic => "ULS-Seismic",
            Situation::SlsRare => "SLS-Rare",
            Situation::SlsFrequent => "SLS-Frequent",
            Situation::SlsQuasiPermanent => "SLS-QuasiPermanent",
        }
    }

    /// Prefix of the combination names generated for this situation
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Situation::UlsPersistent => "ULS",
            Situation::UlsAccidental => "ULSA",
            Situation::UlsSeismic => "ULSS",
            Situation::SlsRare => "SLSR",
            Situation::SlsFrequent => "SLSF",
            Situation::SlsQuasiPermanent => "SLSQP",
        }
    }

    /// Whether one variable action is taken as leading
    pub fn has_leading_role(&self) -> bool {
        !matches!(self, Situation::UlsSeismic | Situation::SlsQuasiPermanent)
    }

    /// ψ applied to accompanying variable actions
    pub fn accompanying_psi(&self) -> PsiKind {
        match self {
            Situation::UlsPersistent | Situation::SlsRare => PsiKind::Psi0,
            Situation::UlsAccidental
            | Situation::UlsSeismic
            | Situation::SlsFrequent
            | Situation::SlsQuasiPermanent => PsiKind::Psi2,
        }
    }

    /// The accidental-type family a situation is built around, if any.
    ///
    /// Combinations of these situations always contain exactly one action
    /// of that family.
    pub fn required_family(&self) -> Option<ActionFamily> {
        match self {
            Situation::UlsAccidental => Some(ActionFamily::Accidental),
            Situation::UlsSeismic => Some(ActionFamily::Seismic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Situation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Situation {
    type Err = CombError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Situation::ALL
            .iter()
            .copied()
            .find(|situation| situation.label() == s)
            .ok_or_else(|| CombError::parse(format!("unknown situation '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip() {
        for situation in Situation::ALL {
            assert_eq!(situation.label().parse::<Situation>().unwrap(), situation);
        }
        assert!("ULS".parse::<Situation>().is_err());
    }

    #[test]
    fn test_serialization_uses_labels() {
        let json = serde_json::to_string(&Situation::SlsQuasiPermanent).unwrap();
        assert_eq!(json, "\"SLS-QuasiPermanent\"");
        let parsed: Situation = serde_json::from_str("\"ULS-Seismic\"").unwrap();
        assert_eq!(parsed, Situation::UlsSeismic);
        assert!(serde_json::from_str::<Situation>("\"UlsSeismic\"").is_err());
    }

    #[test]
    fn test_order_matches_all() {
        let mut sorted = Situation::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Situation::ALL.to_vec());
    }

    #[test]
    fn test_prefixes_unique() {
        let mut prefixes: Vec<_> = Situation::ALL.iter().map(|s| s.name_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), 6);
    }

    #[test]
    fn test_psi_roles() {
        assert_eq!(Situation::UlsPersistent.accompanying_psi(), PsiKind::Psi0);
        assert_eq!(Situation::SlsFrequent.accompanying_psi(), PsiKind::Psi2);
        assert_eq!(Situation::UlsAccidental.required_family(), Some(ActionFamily::Accidental));
        assert_eq!(Situation::SlsRare.required_family(), None);
    }
}
