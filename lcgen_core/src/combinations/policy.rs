//! Favorable/unfavorable enumeration of permanent-action groups
//!
//! The strict reading of EN 1990 checks every group of permanent actions at
//! both its favorable and unfavorable γ, which is exponential in the number of
//! groups. A [`PermanentSignPolicy`] decides which sign patterns the
//! generator enumerates, so a national annex can tighten or relax that
//! without touching the enumeration itself.

use serde::{Deserialize, Serialize};

use crate::errors::{CombError, CombResult};
use crate::factors::PermanentSign;

/// Largest group count [`AllPatterns`] enumerates (`2^16` patterns)
pub const MAX_ALL_PATTERN_GROUPS: usize = 16;

/// Chooses the sign patterns enumerated for the permanent groups.
///
/// Every returned pattern holds one sign per group, in group order. An
/// implementation must return at least one pattern, or `InvalidInput` when it
/// cannot handle `group_count` groups.
pub trait PermanentSignPolicy: Send + Sync {
    fn sign_patterns(&self, group_count: usize) -> CombResult<Vec<Vec<PermanentSign>>>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Every group unfavorable: one pattern
#[derive(Debug, Clone, Copy, Default)]
pub struct UnfavorableOnly;

impl PermanentSignPolicy for UnfavorableOnly {
    fn sign_patterns(&self, group_count: usize) -> CombResult<Vec<Vec<PermanentSign>>> {
        Ok(vec![vec![PermanentSign::Unfavorable; group_count]])
    }

    fn name(&self) -> &'static str {
        "unfavorable-only"
    }
}

/// All groups unfavorable, plus one pattern per group in which only that
/// group is favorable: `group_count + 1` patterns
#[derive(Debug, Clone, Copy, Default)]
pub struct OneGroupFavorable;

impl PermanentSignPolicy for OneGroupFavorable {
    fn sign_patterns(&self, group_count: usize) -> CombResult<Vec<Vec<PermanentSign>>> {
        let all_unfavorable = vec![PermanentSign::Unfavorable; group_count];
        let mut patterns = vec![all_unfavorable.clone()];
        for group in 0..group_count {
            let mut pattern = all_unfavorable.clone();
            pattern[group] = PermanentSign::Favorable;
            patterns.push(pattern);
        }
        Ok(patterns)
    }

    fn name(&self) -> &'static str {
        "one-group-favorable"
    }
}

/// Every combination of signs: `2^group_count` patterns, for at most
/// [`MAX_ALL_PATTERN_GROUPS`] groups
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPatterns;

impl PermanentSignPolicy for AllPatterns {
    fn sign_patterns(&self, group_count: usize) -> CombResult<Vec<Vec<PermanentSign>>> {
        if group_count > MAX_ALL_PATTERN_GROUPS {
            return Err(CombError::invalid_input(
                "permanent_signs",
                "AllPatterns",
                format!(
                    "{} permanent groups exceed the limit of {}; group permanent actions or use OneGroupFavorable",
                    group_count, MAX_ALL_PATTERN_GROUPS
                ),
            ));
        }
        let patterns = (0..1usize << group_count)
            .map(|mask| {
                (0..group_count)
                    .map(|group| {
                        if mask & (1 << group) == 0 {
                            PermanentSign::Unfavorable
                        } else {
                            PermanentSign::Favorable
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(patterns)
    }

    fn name(&self) -> &'static str {
        "all-patterns"
    }
}

/// Serializable selector for the built-in policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermanentSignRule {
    #[default]
    UnfavorableOnly,
    OneGroupFavorable,
    AllPatterns,
}

impl PermanentSignRule {
    pub fn policy(&self) -> &'static dyn PermanentSignPolicy {
        match self {
            PermanentSignRule::UnfavorableOnly => &UnfavorableOnly,
            PermanentSignRule::OneGroupFavorable => &OneGroupFavorable,
            PermanentSignRule::AllPatterns => &AllPatterns,
        }
    }
}
