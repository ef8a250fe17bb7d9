//! Combination generator
//!
//! For every requested [`Situation`] the generator enumerates
//!
//! 1. the accidental or seismic action of the situation (ULS-Accidental and
//!    ULS-Seismic run once per such action and yield nothing without one),
//! 2. the leading variable action: every member of every exclusion group
//!    that is not `not_determinant` takes a turn; situations without a
//!    leading role, or without an eligible leader, run once with none,
//! 3. the sign pattern of the permanent groups, as chosen by the
//!    [`PermanentSignPolicy`],
//!
//! and completes each assignment with one accompanying action per remaining
//! exclusion group. The `depends_on` chains of the leading and special
//! actions claim their groups first; an accompanying candidate whose chain
//! cannot join the assignment gives way to the next best member of its
//! group. The assignment is then priced with the
//! [`FactorTables`], filtered on `depends_on`, checked for incompatible
//! pairs and handed to the [`CombinationContainer`], which drops duplicates.
//!
//! Situations are independent and may run on the rayon pool; numbering and
//! deduplication always happen afterwards on the calling thread, in
//! situation order, so the result does not depend on the `parallel` flag.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::combination::{CombinationTerm, DraftCombination};
use super::container::CombinationContainer;
use super::policy::{PermanentSignPolicy, PermanentSignRule};
use crate::actions::{ActionCatalogue, ActionFamily};
use crate::errors::{CombError, CombResult};
use crate::factors::{CoefficientRole, FactorTables, PermanentSign};
use crate::graph::{ActionId, ExclusionGroup, RelationshipGraph};
use crate::situation::Situation;

/// What to generate and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Situations to generate; order is irrelevant, output follows `Situation` order
    #[serde(default = "all_situations")]
    pub situations: Vec<Situation>,

    /// Permanent-group sign enumeration
    #[serde(default)]
    pub permanent_signs: PermanentSignRule,

    /// Run situations on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn all_situations() -> Vec<Situation> {
    Situation::ALL.to_vec()
}

fn default_parallel() -> bool {
    true
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            situations: all_situations(),
            permanent_signs: PermanentSignRule::default(),
            parallel: default_parallel(),
        }
    }
}

/// A recoverable condition met during generation (a missing γ or ψ).
/// The branches it affected were not generated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationWarning {
    pub situation: Situation,
    pub action: String,
    pub message: String,
}

impl GenerationWarning {
    fn new(situation: Situation, action: &str, error: &CombError) -> Self {
        GenerationWarning {
            situation,
            action: action.to_string(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}: {}", self.situation, self.action, self.message)
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub container: CombinationContainer,
    /// De-duplicated and sorted
    pub warnings: Vec<GenerationWarning>,
}

/// Drafts and warnings of one situation, produced without touching shared state
struct SituationBatch {
    situation: Situation,
    drafts: Vec<DraftCombination>,
    warnings: BTreeSet<GenerationWarning>,
}

/// One enumerated choice before pricing
struct Assignment<'p> {
    special: Option<ActionId>,
    leader: Option<(usize, ActionId)>,
    signs: &'p [PermanentSign],
}

/// Generates the combinations of one action catalogue.
///
/// # Example
/// ```
/// use lcgen_core::actions::{Action, ActionCatalogue};
/// use lcgen_core::combinations::CombinationGenerator;
/// use lcgen_core::factors::FactorTables;
/// use lcgen_core::situation::Situation;
///
/// let catalogue = ActionCatalogue::new()
///     .with(Action::permanent("G1", "en1990.set_b.permanent"))?
///     .with(Action::variable("Q1", "en1990.set_b.variable", "en1990.category_b"))?
///     .with(Action::variable("W", "en1990.set_b.variable", "en1990.wind"))?;
/// let tables = FactorTables::en1990();
///
/// let outcome = CombinationGenerator::new(&catalogue, &tables)
///     .with_situations(&[Situation::UlsPersistent])
///     .run()?;
///
/// let uls = outcome.container.by_situation(Situation::UlsPersistent);
/// assert_eq!(uls.len(), 2);
/// assert_eq!(uls[0].expression(), "1.35*G1 + 1.5*Q1 + 0.9*W");
/// assert_eq!(uls[1].expression(), "1.35*G1 + 1.05*Q1 + 1.5*W");
/// # Ok::<(), lcgen_core::errors::CombError>(())
/// ```
pub struct CombinationGenerator<'a> {
    catalogue: &'a ActionCatalogue,
    tables: &'a FactorTables,
    policy: &'a dyn PermanentSignPolicy,
    situations: Vec<Situation>,
    parallel: bool,
}

impl<'a> CombinationGenerator<'a> {
    /// Generator for all situations, sequential, permanent actions unfavorable
    pub fn new(catalogue: &'a ActionCatalogue, tables: &'a FactorTables) -> Self {
        CombinationGenerator {
            catalogue,
            tables,
            policy: PermanentSignRule::default().policy(),
            situations: all_situations(),
            parallel: false,
        }
    }

    /// Apply project settings
    pub fn with_settings(mut self, settings: &GenerationSettings) -> Self {
        self.policy = settings.permanent_signs.policy();
        self.situations = settings.situations.clone();
        self.parallel = settings.parallel;
        self
    }

    /// Use a custom sign policy
    pub fn with_policy(mut self, policy: &'a dyn PermanentSignPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_situations(mut self, situations: &[Situation]) -> Self {
        self.situations = situations.to_vec();
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the generation.
    ///
    /// # Errors
    ///
    /// Invalid tables, unresolvable relationships and a sign policy that
    /// refuses the permanent groups (`InvalidInput`, `UnknownReference`,
    /// `CyclicDependency`) abort the run. Missing factors
    /// only skip branches and are returned as warnings.
    pub fn run(&self) -> CombResult<GenerationOutcome> {
        self.tables.validate()?;
        let graph = RelationshipGraph::build(self.catalogue)?;

        let mut situations = self.situations.clone();
        situations.sort();
        situations.dedup();

        let permanent_groups = self.permanent_groups(&graph);
        let patterns = self.policy.sign_patterns(permanent_groups.len())?;

        debug!(
            "Generating {} situations for {} actions ({} exclusion groups, policy {})",
            situations.len(),
            self.catalogue.len(),
            graph.exclusion_groups().len(),
            self.policy.name()
        );

        let batches: Vec<SituationBatch> = if self.parallel {
            situations
                .par_iter()
                .map(|situation| self.enumerate_situation(&graph, &permanent_groups, &patterns, *situation))
                .collect()
        } else {
            situations
                .iter()
                .map(|situation| self.enumerate_situation(&graph, &permanent_groups, &patterns, *situation))
                .collect()
        };

        let mut container = CombinationContainer::new();
        let mut warnings = BTreeSet::new();
        for batch in batches {
            let candidates = batch.drafts.len();
            let before = container.len();
            for draft in batch.drafts {
                container.push(draft);
            }
            info!(
                "{}: {} combinations from {} candidates",
                batch.situation,
                container.len() - before,
                candidates
            );
            warnings.extend(batch.warnings);
        }

        for warning in &warnings {
            warn!("Skipped branches: {}", warning);
        }
        info!(
            "Generated {} combinations with {} warnings",
            container.len(),
            warnings.len()
        );

        Ok(GenerationOutcome {
            container,
            warnings: warnings.into_iter().collect(),
        })
    }

    fn enumerate_situation(
        &self,
        graph: &RelationshipGraph,
        permanent_groups: &[(String, Vec<ActionId>)],
        patterns: &[Vec<PermanentSign>],
        situation: Situation,
    ) -> SituationBatch {
        let mut batch = SituationBatch {
            situation,
            drafts: Vec::new(),
            warnings: BTreeSet::new(),
        };

        let specials: Vec<Option<ActionId>> = match situation.required_family() {
            Some(family) => {
                let ids = self.ids_of_family(graph, family);
                if ids.is_empty() {
                    debug!("{}: no {} in the catalogue", situation, family.description().to_lowercase());
                    return batch;
                }
                ids.into_iter().map(Some).collect()
            }
            None => vec![None],
        };

        let leaders = self.leader_choices(graph, situation);

        for special in &specials {
            for leader in &leaders {
                for signs in patterns {
                    let assignment = Assignment {
                        special: *special,
                        leader: *leader,
                        signs,
                    };
                    if let Some(draft) =
                        self.build(graph, situation, permanent_groups, &assignment, &mut batch.warnings)
                    {
                        batch.drafts.push(draft);
                    }
                }
            }
        }
        batch
    }

    /// Every eligible leader as `(group index, action)`, or a single `None`
    fn leader_choices(&self, graph: &RelationshipGraph, situation: Situation) -> Vec<Option<(usize, ActionId)>> {
        if !situation.has_leading_role() {
            return vec![None];
        }
        let eligible: Vec<Option<(usize, ActionId)>> = graph
            .exclusion_groups()
            .iter()
            .enumerate()
            .flat_map(|(index, group)| {
                group
                    .members()
                    .iter()
                    .filter(move |id| !graph.is_not_determinant(**id))
                    .map(move |id| Some((index, *id)))
            })
            .collect();
        if eligible.is_empty() {
            vec![None]
        } else {
            eligible
        }
    }

    /// Permanent actions grouped by `group_key`, groups in key order
    fn permanent_groups(&self, graph: &RelationshipGraph) -> Vec<(String, Vec<ActionId>)> {
        let mut groups: BTreeMap<String, Vec<ActionId>> = BTreeMap::new();
        for action in self.catalogue.of_family(ActionFamily::Permanent) {
            if let Some(id) = graph.id(&action.name) {
                groups.entry(action.group_key().to_string()).or_default().push(id);
            }
        }
        groups.into_iter().collect()
    }

    fn ids_of_family(&self, graph: &RelationshipGraph, family: ActionFamily) -> Vec<ActionId> {
        self.catalogue
            .of_family(family)
            .filter_map(|action| graph.id(&action.name))
            .collect()
    }

    fn build(
        &self,
        graph: &RelationshipGraph,
        situation: Situation,
        permanent_groups: &[(String, Vec<ActionId>)],
        assignment: &Assignment<'_>,
        warnings: &mut BTreeSet<GenerationWarning>,
    ) -> Option<DraftCombination> {
        let actions = self.catalogue.as_slice();

        let mut roles: Vec<(ActionId, CoefficientRole)> = Vec::new();
        for ((_, members), sign) in permanent_groups.iter().zip(assignment.signs) {
            roles.extend(members.iter().map(|id| (*id, CoefficientRole::Permanent(*sign))));
        }
        let mut filled = vec![false; graph.exclusion_groups().len()];
        if let Some(special) = assignment.special {
            roles.push((special, CoefficientRole::Accidental));
        }
        if let Some((index, leader)) = assignment.leader {
            roles.push((leader, CoefficientRole::Leading));
            filled[index] = true;
        }

        let mut required: Vec<ActionId> = assignment
            .special
            .into_iter()
            .chain(assignment.leader.map(|(_, id)| id))
            .collect();

        // the dependencies of the special and leading actions take their groups first
        for root in required.clone() {
            let chain = match self.missing_dependencies(graph, situation, root, &roles, &filled, warnings) {
                Some(chain) => chain,
                None => {
                    debug!(
                        "{}: dependency of '{}' cannot be present, branch rejected",
                        situation,
                        graph.name(root)
                    );
                    return None;
                }
            };
            for dependency in chain {
                if let Some(index) = graph.group_of(dependency) {
                    filled[index] = true;
                }
                roles.push((dependency, CoefficientRole::Accompanying));
                required.push(dependency);
            }
        }

        for (index, group) in graph.exclusion_groups().iter().enumerate() {
            if filled[index] {
                continue;
            }
            if let Some((member, chain)) =
                self.accompanying_member(graph, situation, group, &roles, &filled, warnings)
            {
                filled[index] = true;
                roles.push((member, CoefficientRole::Accompanying));
                for dependency in chain {
                    if let Some(index) = graph.group_of(dependency) {
                        filled[index] = true;
                    }
                    roles.push((dependency, CoefficientRole::Accompanying));
                }
            }
        }

        // price every role; a zero coefficient means "not present"
        let mut priced: Vec<(ActionId, f64)> = Vec::with_capacity(roles.len());
        for (id, role) in &roles {
            let action = &actions[id.index()];
            match self.tables.coefficient(situation, action, *role) {
                Ok(coefficient) if coefficient == 0.0 => {
                    if required.contains(id) {
                        debug!("{}: '{}' has a zero coefficient, branch rejected", situation, action.name);
                        return None;
                    }
                }
                Ok(coefficient) => priced.push((*id, coefficient)),
                Err(error) => {
                    warnings.insert(GenerationWarning::new(situation, &action.name, &error));
                    return None;
                }
            }
        }

        // drop actions whose dependency is absent, repeating for chains
        let mut present: BTreeSet<ActionId> = priced.iter().map(|(id, _)| *id).collect();
        loop {
            let unsatisfied: Vec<ActionId> = present
                .iter()
                .filter(|id| !graph.is_satisfied_by(**id, &present))
                .copied()
                .collect();
            if unsatisfied.is_empty() {
                break;
            }
            for id in unsatisfied {
                if required.contains(&id) {
                    debug!(
                        "{}: '{}' lacks its dependency, branch rejected",
                        situation,
                        graph.name(id)
                    );
                    return None;
                }
                present.remove(&id);
            }
        }
        priced.retain(|(id, _)| present.contains(id));

        for (i, (a, _)) in priced.iter().enumerate() {
            if let Some((b, _)) = priced[i + 1..].iter().find(|(b, _)| graph.incompatible(*a, *b)) {
                debug!(
                    "{}: '{}' and '{}' are incompatible, branch rejected",
                    situation,
                    graph.name(*a),
                    graph.name(*b)
                );
                return None;
            }
        }

        if priced.is_empty() {
            return None;
        }

        let terms = priced
            .iter()
            .map(|(id, coefficient)| CombinationTerm::new(graph.name(*id), *coefficient))
            .collect();
        let description = describe(graph, situation, permanent_groups, assignment);
        Some(DraftCombination::new(situation, terms, description))
    }

    /// The group member with the largest non-zero ψ that is compatible with
    /// everything already assigned and whose dependencies can join it; ties
    /// go to the first name. Returns the member with its missing dependencies.
    fn accompanying_member(
        &self,
        graph: &RelationshipGraph,
        situation: Situation,
        group: &ExclusionGroup,
        assigned: &[(ActionId, CoefficientRole)],
        filled: &[bool],
        warnings: &mut BTreeSet<GenerationWarning>,
    ) -> Option<(ActionId, Vec<ActionId>)> {
        let actions = self.catalogue.as_slice();
        let mut best: Option<(ActionId, f64, Vec<ActionId>)> = None;
        for id in group.members() {
            if assigned.iter().any(|(other, _)| graph.incompatible(*other, *id)) {
                continue;
            }
            let action = &actions[id.index()];
            match self.tables.accompanying_psi(situation, action) {
                Ok(psi) if psi > 0.0 => {
                    if best.as_ref().map_or(true, |(_, best_psi, _)| psi > *best_psi) {
                        match self.missing_dependencies(graph, situation, *id, assigned, filled, warnings) {
                            Some(chain) => best = Some((*id, psi, chain)),
                            None => debug!(
                                "{}: '{}' cannot accompany without its dependency",
                                situation, action.name
                            ),
                        }
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warnings.insert(GenerationWarning::new(situation, &action.name, &error));
                }
            }
        }
        best.map(|(id, _, chain)| (id, chain))
    }

    /// The `depends_on` chain of `id` that is not assigned yet, nearest
    /// first, or `None` if it cannot join as accompanying actions. Every
    /// link must be a variable action with ψ > 0, compatible with the
    /// assignment, with `id` and with the rest of the chain, and must come
    /// from an exclusion group that holds nothing yet.
    fn missing_dependencies(
        &self,
        graph: &RelationshipGraph,
        situation: Situation,
        id: ActionId,
        assigned: &[(ActionId, CoefficientRole)],
        filled: &[bool],
        warnings: &mut BTreeSet<GenerationWarning>,
    ) -> Option<Vec<ActionId>> {
        let actions = self.catalogue.as_slice();
        let mut chain: Vec<ActionId> = Vec::new();
        let mut current = id;
        while let Some(dependency) = graph.dependency(current) {
            if assigned.iter().any(|(other, _)| *other == dependency) {
                break;
            }
            let index = graph.group_of(dependency)?;
            let taken = filled[index]
                || graph.group_of(id) == Some(index)
                || chain.iter().any(|link| graph.group_of(*link) == Some(index));
            if taken {
                return None;
            }
            let clashes = assigned.iter().any(|(other, _)| graph.incompatible(*other, dependency))
                || std::iter::once(&id)
                    .chain(&chain)
                    .any(|other| graph.incompatible(*other, dependency));
            if clashes {
                return None;
            }
            let action = &actions[dependency.index()];
            match self.tables.accompanying_psi(situation, action) {
                Ok(psi) if psi > 0.0 => {}
                Ok(_) => return None,
                Err(error) => {
                    warnings.insert(GenerationWarning::new(situation, &action.name, &error));
                    return None;
                }
            }
            chain.push(dependency);
            current = dependency;
        }
        Some(chain)
    }
}

fn describe(
    graph: &RelationshipGraph,
    situation: Situation,
    permanent_groups: &[(String, Vec<ActionId>)],
    assignment: &Assignment<'_>,
) -> String {
    let mut parts = Vec::new();
    if let Some(special) = assignment.special {
        let role = match situation {
            Situation::UlsSeismic => "seismic",
            _ => "accidental",
        };
        parts.push(format!("{} {}", graph.name(special), role));
    }
    if let Some((_, leader)) = assignment.leader {
        parts.push(format!("{} leading", graph.name(leader)));
    }
    let favorable: Vec<&str> = permanent_groups
        .iter()
        .zip(assignment.signs)
        .filter(|(_, sign)| **sign == PermanentSign::Favorable)
        .map(|((key, _), _)| key.as_str())
        .collect();
    if !favorable.is_empty() {
        parts.push(format!("favorable {}", favorable.join(", ")));
    }
    if parts.is_empty() {
        "no leading action".to_string()
    } else {
        parts.join(", ")
    }
}

/// Generate the combinations of `catalogue` with the given tables and settings
///
/// # Example
/// ```
/// use lcgen_core::actions::{Action, ActionCatalogue};
/// use lcgen_core::combinations::{generate, GenerationSettings};
/// use lcgen_core::factors::FactorTables;
/// use lcgen_core::situation::Situation;
///
/// let catalogue = ActionCatalogue::new()
///     .with(Action::permanent("G1", "en1990.set_b.permanent"))?;
/// let outcome = generate(&catalogue, &FactorTables::en1990(), &GenerationSettings::default())?;
///
/// // permanent-only baseline in every non-accidental situation
/// assert_eq!(outcome.container.len(), 4);
/// assert_eq!(outcome.container.by_name("ULS01").unwrap().coefficient("G1"), 1.35);
/// assert!(outcome.container.by_situation(Situation::UlsAccidental).is_empty());
/// # Ok::<(), lcgen_core::errors::CombError>(())
/// ```
pub fn generate(
    catalogue: &ActionCatalogue,
    tables: &FactorTables,
    settings: &GenerationSettings,
) -> CombResult<GenerationOutcome> {
    CombinationGenerator::new(catalogue, tables)
        .with_settings(settings)
        .run()
}
