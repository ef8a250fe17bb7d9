//! # Combination Serializer
//!
//! Byte-stable JSON export of a [`CombinationContainer`] and its inverse.
//!
//! ## Format
//!
//! ```json
//! {
//!   "combinations": [
//!     {
//!       "id": 1,
//!       "name": "ULS01",
//!       "situation": "ULS-Persistent",
//!       "terms": [
//!         { "action": "G1", "coef": 1.35 },
//!         { "action": "Q1", "coef": 1.5 }
//!       ],
//!       "description": "Q1 leading"
//!     }
//!   ]
//! }
//! ```
//!
//! Combinations are written by situation and then by id, terms by action
//! name. Identical containers always produce identical text.

use serde::{Deserialize, Serialize};

use crate::combinations::{Combination, CombinationContainer};
use crate::errors::{CombError, CombResult};

#[derive(Serialize)]
struct DocumentRef<'a> {
    combinations: Vec<&'a Combination>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    combinations: Vec<Combination>,
}

/// Write a container as pretty-printed JSON with a trailing newline.
///
/// # Example
///
/// ```rust
/// use lcgen_core::combinations::{CombinationContainer, CombinationTerm, DraftCombination};
/// use lcgen_core::serializer;
/// use lcgen_core::situation::Situation;
///
/// let mut container = CombinationContainer::new();
/// container.push(DraftCombination::new(
///     Situation::UlsPersistent,
///     vec![CombinationTerm::new("G1", 1.35), CombinationTerm::new("Q1", 1.5)],
///     "",
/// ));
///
/// let text = serializer::write(&container)?;
/// assert_eq!(serializer::read(&text)?, container);
/// # Ok::<(), lcgen_core::errors::CombError>(())
/// ```
pub fn write(container: &CombinationContainer) -> CombResult<String> {
    let document = DocumentRef {
        combinations: container.iter().collect(),
    };
    let mut text = serde_json::to_string_pretty(&document)?;
    text.push('\n');
    Ok(text)
}

/// Read a container written by [`write`].
///
/// Ids and names are kept as written. Unknown situations, non-numeric or
/// non-finite coefficients, empty action names, unsorted or repeated terms,
/// and repeated ids, names or combinations are rejected with `Parse`.
pub fn read(text: &str) -> CombResult<CombinationContainer> {
    let document: Document = serde_json::from_str(text).map_err(|e| CombError::parse(e.to_string()))?;

    let mut container = CombinationContainer::new();
    for combination in document.combinations {
        validate(&combination)?;
        container.insert_numbered(combination)?;
    }
    Ok(container)
}

fn validate(combination: &Combination) -> CombResult<()> {
    if combination.name().trim().is_empty() {
        return Err(CombError::parse(format!("combination {} has an empty name", combination.id())));
    }
    if combination.terms().is_empty() {
        return Err(CombError::parse(format!("combination '{}' has no terms", combination.name())));
    }
    for term in combination.terms() {
        if term.action_name.is_empty() {
            return Err(CombError::parse(format!(
                "combination '{}' has a term without an action",
                combination.name()
            )));
        }
        if !term.coefficient.is_finite() {
            return Err(CombError::parse(format!(
                "combination '{}': coefficient of '{}' is not finite",
                combination.name(),
                term.action_name
            )));
        }
    }
    for pair in combination.terms().windows(2) {
        if pair[0].action_name >= pair[1].action_name {
            return Err(CombError::parse(format!(
                "combination '{}': terms must be sorted by action and unique ('{}' before '{}')",
                combination.name(),
                pair[0].action_name,
                pair[1].action_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::{CombinationTerm, DraftCombination};
    use crate::situation::Situation;

    fn sample() -> CombinationContainer {
        let mut container = CombinationContainer::new();
        container.push(DraftCombination::new(
            Situation::UlsPersistent,
            vec![CombinationTerm::new("G1", 1.35), CombinationTerm::new("Q1", 1.5)],
            "Q1 leading",
        ));
        container.push(DraftCombination::new(
            Situation::SlsRare,
            vec![CombinationTerm::new("G1", 1.0), CombinationTerm::new("Q1", 1.0)],
            "",
        ));
        container
    }

    const GOLDEN: &str = r#"{
  "combinations": [
    {
      "id": 1,
      "name": "ULS01",
      "situation": "ULS-Persistent",
      "terms": [
        {
          "action": "G1",
          "coef": 1.35
        },
        {
          "action": "Q1",
          "coef": 1.5
        }
      ],
      "description": "Q1 leading"
    },
    {
      "id": 2,
      "name": "SLSR01",
      "situation": "SLS-Rare",
      "terms": [
        {
          "action": "G1",
          "coef": 1.0
        },
        {
          "action": "Q1",
          "coef": 1.0
        }
      ]
    }
  ]
}
"#;

    #[test]
    fn test_write_golden() {
        assert_eq!(write(&sample()).unwrap(), GOLDEN);
    }

    #[test]
    fn test_roundtrip() {
        let container = sample();
        let text = write(&container).unwrap();
        let read_back = read(&text).unwrap();
        assert_eq!(read_back, container);
        assert_eq!(write(&read_back).unwrap(), text);
        assert_eq!(read_back.next_id(), 3);
    }

    #[test]
    fn test_empty_container() {
        let text = write(&CombinationContainer::new()).unwrap();
        assert_eq!(text, "{\n  \"combinations\": []\n}\n");
        assert!(read(&text).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unknown_situation() {
        let text = GOLDEN.replace("SLS-Rare", "SLS-Characteristic");
        assert_eq!(read(&text).unwrap_err().error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_rejects_non_numeric_coefficient() {
        let text = GOLDEN.replace("\"coef\": 1.35", "\"coef\": \"1.35\"");
        assert_eq!(read(&text).unwrap_err().error_code(), "PARSE_ERROR");

        let text = GOLDEN.replace("\"coef\": 1.35", "\"coef\": null");
        assert_eq!(read(&text).unwrap_err().error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_rejects_unsorted_terms() {
        let text = GOLDEN.replacen("\"action\": \"G1\"", "\"action\": \"R1\"", 1);
        let err = read(&text).unwrap_err();
        assert!(matches!(err, CombError::Parse { .. }));
    }

    #[test]
    fn test_rejects_duplicate_ids_and_garbage() {
        let text = GOLDEN.replace("\"id\": 2", "\"id\": 1");
        assert_eq!(read(&text).unwrap_err().error_code(), "PARSE_ERROR");

        assert!(read("not json").is_err());
        assert!(read("{}").is_err());
        assert!(read(r#"{"combinations": [], "extra": 1}"#).is_err());
    }

    #[test]
    fn test_write_after_merge_is_sorted_by_situation() {
        let mut container = sample();
        let mut other = CombinationContainer::new();
        other.push(DraftCombination::new(
            Situation::UlsPersistent,
            vec![CombinationTerm::new("G1", 1.0)],
            "",
        ));
        container.merge(other);

        let text = write(&container).unwrap();
        let uls02 = text.find("\"ULS02\"").unwrap();
        let slsr01 = text.find("\"SLSR01\"").unwrap();
        assert!(uls02 < slsr01);
        assert_eq!(read(&text).unwrap(), container);
    }
}
