//! The numbered, de-duplicated output of a generation run

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use super::combination::{Combination, CombinationKey, DraftCombination};
use crate::errors::{CombError, CombResult};
use crate::situation::Situation;

/// Owns every combination of a run, partitioned by situation.
///
/// Ids come from one counter shared by all situations and never restart;
/// names are numbered per situation (`ULS01`, `ULS02`, ..., `SLSR01`, ...).
/// A combination equal to one already held (same situation, same action and
/// coefficient pairs) is dropped.
///
/// # Example
/// ```
/// use lcgen_core::combinations::{CombinationContainer, CombinationTerm, DraftCombination};
/// use lcgen_core::situation::Situation;
///
/// let mut container = CombinationContainer::new();
/// let terms = vec![CombinationTerm::new("G1", 1.35), CombinationTerm::new("Q1", 1.5)];
///
/// let first = container.push(DraftCombination::new(Situation::UlsPersistent, terms.clone(), "")).unwrap();
/// assert_eq!((first.id(), first.name()), (1, "ULS01"));
///
/// // the same combination reached a second time is dropped
/// assert!(container.push(DraftCombination::new(Situation::UlsPersistent, terms, "")).is_none());
/// assert_eq!(container.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationContainer {
    by_situation: BTreeMap<Situation, Vec<Combination>>,
    next_id: u32,
    keys: HashSet<CombinationKey>,
    /// id -> situation; lists are sorted by id, so lookups binary search
    ids: HashMap<u32, Situation>,
    names: HashMap<String, u32>,
}

impl CombinationContainer {
    pub fn new() -> Self {
        CombinationContainer {
            by_situation: BTreeMap::new(),
            next_id: 1,
            keys: HashSet::new(),
            ids: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Number and store a draft. Returns `None` if it duplicates a held combination.
    pub fn push(&mut self, draft: DraftCombination) -> Option<&Combination> {
        let key = draft.key();
        if self.keys.contains(&key) {
            debug!("Dropping duplicate {} combination: {}", draft.situation, draft.description);
            return None;
        }

        let situation = draft.situation;
        let id = self.next_id;
        self.next_id += 1;
        let name = self.next_name(situation);
        self.keys.insert(key);
        self.ids.insert(id, situation);
        self.names.insert(name.clone(), id);

        let list = self.by_situation.entry(situation).or_default();
        list.push(Combination::from_draft(id, name, draft));
        list.last()
    }

    /// Store an already-numbered combination, keeping its id and name.
    ///
    /// Used when reading a container back; rejects repeated ids, names or
    /// combinations with `Parse`.
    pub fn insert_numbered(&mut self, combination: Combination) -> CombResult<()> {
        if self.ids.contains_key(&combination.id()) {
            return Err(CombError::parse(format!("duplicate combination id {}", combination.id())));
        }
        if self.names.contains_key(combination.name()) {
            return Err(CombError::parse(format!("duplicate combination name '{}'", combination.name())));
        }
        let key = combination.key();
        if self.keys.contains(&key) {
            return Err(CombError::parse(format!(
                "combination '{}' duplicates an earlier one",
                combination.name()
            )));
        }

        self.keys.insert(key);
        self.ids.insert(combination.id(), combination.situation());
        self.names.insert(combination.name().to_string(), combination.id());
        self.next_id = self.next_id.max(combination.id() + 1);
        let list = self.by_situation.entry(combination.situation()).or_default();
        let position = list.partition_point(|c| c.id() < combination.id());
        list.insert(position, combination);
        Ok(())
    }

    /// Append the combinations of `other`, renumbering them to continue this
    /// container's id counter and per-situation name sequences. Exact
    /// duplicates of held combinations are dropped; returns how many were.
    pub fn merge(&mut self, other: CombinationContainer) -> usize {
        let mut dropped = 0;
        for (_, combinations) in other.by_situation {
            for combination in combinations {
                if self.push(combination.into_draft()).is_none() {
                    dropped += 1;
                }
            }
        }
        debug!("Merged containers, {} duplicates dropped", dropped);
        dropped
    }

    /// Combinations of one situation, in id order
    pub fn by_situation(&self, situation: Situation) -> &[Combination] {
        self.by_situation.get(&situation).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_id(&self, id: u32) -> Option<&Combination> {
        let list = self.by_situation(*self.ids.get(&id)?);
        list.binary_search_by_key(&id, Combination::id)
            .ok()
            .map(|position| &list[position])
    }

    pub fn by_name(&self, name: &str) -> Option<&Combination> {
        self.by_id(*self.names.get(name)?)
    }

    /// All combinations, by situation and then by id
    pub fn iter(&self) -> impl Iterator<Item = &Combination> {
        self.by_situation.values().flatten()
    }

    /// Situations holding at least one combination
    pub fn situations(&self) -> impl Iterator<Item = Situation> + '_ {
        self.by_situation
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(situation, _)| *situation)
    }

    /// Id the next stored combination will receive
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_name(&self, situation: Situation) -> String {
        let mut sequence = self.by_situation(situation).len() + 1;
        loop {
            let name = format!("{}{:02}", situation.name_prefix(), sequence);
            if !self.names.contains_key(&name) {
                return name;
            }
            sequence += 1;
        }
    }
}

impl Default for CombinationContainer {
    fn default() -> Self {
        CombinationContainer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::CombinationTerm;

    fn draft(situation: Situation, terms: &[(&str, f64)]) -> DraftCombination {
        DraftCombination::new(
            situation,
            terms.iter().map(|(name, c)| CombinationTerm::new(*name, *c)).collect(),
            "",
        )
    }

    #[test]
    fn test_ids_continue_across_situations() {
        let mut container = CombinationContainer::new();
        container.push(draft(Situation::UlsPersistent, &[("G1", 1.35)]));
        container.push(draft(Situation::SlsRare, &[("G1", 1.0)]));
        container.push(draft(Situation::UlsPersistent, &[("G1", 1.0)]));

        let uls: Vec<_> = container
            .by_situation(Situation::UlsPersistent)
            .iter()
            .map(|c| (c.id(), c.name().to_string()))
            .collect();
        assert_eq!(uls, vec![(1, "ULS01".to_string()), (3, "ULS02".to_string())]);
        assert_eq!(container.by_name("SLSR01").unwrap().id(), 2);
        assert_eq!(container.next_id(), 4);
    }

    #[test]
    fn test_lookup() {
        let mut container = CombinationContainer::new();
        container.push(draft(Situation::SlsFrequent, &[("G1", 1.0), ("Q1", 0.5)]));
        assert_eq!(container.by_id(1).unwrap().name(), "SLSF01");
        assert!(container.by_id(2).is_none());
        assert!(container.by_name("ULS01").is_none());
        assert!(container.by_situation(Situation::UlsSeismic).is_empty());
        assert_eq!(container.situations().collect::<Vec<_>>(), vec![Situation::SlsFrequent]);
    }

    #[test]
    fn test_same_terms_other_situation_kept() {
        let mut container = CombinationContainer::new();
        assert!(container.push(draft(Situation::SlsRare, &[("G1", 1.0)])).is_some());
        assert!(container.push(draft(Situation::SlsFrequent, &[("G1", 1.0)])).is_some());
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_merge_renumbers_and_drops_duplicates() {
        let mut railway = CombinationContainer::new();
        railway.push(draft(Situation::UlsPersistent, &[("G1", 1.35), ("LM71", 1.45)]));
        railway.push(draft(Situation::UlsPersistent, &[("G1", 1.35)]));

        let mut roadway = CombinationContainer::new();
        roadway.push(draft(Situation::UlsPersistent, &[("G1", 1.35)]));
        roadway.push(draft(Situation::UlsPersistent, &[("G1", 1.35), ("LM1", 1.35)]));
        roadway.push(draft(Situation::SlsRare, &[("G1", 1.0)]));

        let dropped = railway.merge(roadway);
        assert_eq!(dropped, 1);
        assert_eq!(railway.len(), 4);

        let lm1 = railway
            .iter()
            .find(|c| c.contains("LM1"))
            .unwrap();
        assert_eq!(lm1.id(), 3);
        assert_eq!(lm1.name(), "ULS03");
        assert_eq!(railway.by_name("SLSR01").unwrap().id(), 4);
    }

    #[test]
    fn test_insert_numbered_keeps_numbering() {
        let mut source = CombinationContainer::new();
        source.push(draft(Situation::UlsPersistent, &[("G1", 1.35)]));
        source.push(draft(Situation::SlsRare, &[("G1", 1.0)]));

        let mut copy = CombinationContainer::new();
        for combination in source.iter().cloned().collect::<Vec<_>>().into_iter().rev() {
            copy.insert_numbered(combination).unwrap();
        }
        assert_eq!(copy, source);
    }

    #[test]
    fn test_lookup_after_out_of_order_insert() {
        let mut source = CombinationContainer::new();
        for i in 0..5 {
            source.push(draft(Situation::UlsPersistent, &[("G1", 1.0 + f64::from(i))]));
        }
        let mut copy = CombinationContainer::new();
        for id in [4, 1, 5, 2, 3] {
            copy.insert_numbered(source.by_id(id).unwrap().clone()).unwrap();
        }
        for id in 1..=5 {
            assert_eq!(copy.by_id(id).unwrap().name(), format!("ULS{:02}", id));
            assert_eq!(copy.by_name(&format!("ULS{:02}", id)).unwrap().id(), id);
        }
        assert_eq!(copy.len(), 5);
    }

    #[test]
    fn test_many_pushes_stay_indexed() {
        let mut container = CombinationContainer::new();
        for i in 0..20_000u32 {
            container.push(draft(Situation::SlsRare, &[("G1", 1.0 + f64::from(i) / 1000.0)]));
        }
        assert_eq!(container.len(), 20_000);
        assert_eq!(container.by_name("SLSR20000").unwrap().id(), 20_000);
        assert_eq!(container.by_id(12_345).unwrap().name(), "SLSR12345");
    }

    #[test]
    fn test_insert_numbered_rejects_repeats() {
        let mut source = CombinationContainer::new();
        source.push(draft(Situation::UlsPersistent, &[("G1", 1.35)]));
        let combination = source.by_id(1).unwrap().clone();

        let mut copy = CombinationContainer::new();
        copy.insert_numbered(combination.clone()).unwrap();
        let err = copy.insert_numbered(combination).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }
}
