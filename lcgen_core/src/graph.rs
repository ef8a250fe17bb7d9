//! Relationship graph between actions
//!
//! Built once from the declarative fields of the catalogue:
//!
//! - `incompatible_with` patterns are compiled and matched against every
//!   action name here, and nowhere else. The result is a symmetric adjacency
//!   set over resolved [`ActionId`]s.
//! - `depends_on` names are resolved to ids; cycles are rejected with a
//!   topological sort over the dependency edges.
//! - Variable actions connected (directly or transitively) by
//!   incompatibility edges are partitioned into [`ExclusionGroup`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::warn;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use petgraph::unionfind::UnionFind;
use regex::Regex;

use crate::actions::{ActionCatalogue, ActionFamily};
use crate::errors::{CombError, CombResult};

/// Position of an action in the catalogue it was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(usize);

impl ActionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Variable actions of which at most one is present per combination.
/// Members are sorted by action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionGroup {
    members: Vec<ActionId>,
}

impl ExclusionGroup {
    pub fn members(&self) -> &[ActionId] {
        &self.members
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.members.contains(&id)
    }
}

/// Resolved incompatibility, dependency and determinance relations
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    names: Vec<String>,
    index: HashMap<String, ActionId>,
    incompatible: Vec<BTreeSet<ActionId>>,
    depends_on: Vec<Option<ActionId>>,
    not_determinant: BTreeSet<ActionId>,
    exclusion_groups: Vec<ExclusionGroup>,
    group_of: Vec<Option<usize>>,
}

impl RelationshipGraph {
    /// Resolve the relationships declared in `catalogue`.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if a `depends_on` names a missing action
    /// - `CyclicDependency` if `depends_on` edges form a cycle
    /// - `InvalidInput` if an incompatibility pattern is not a valid regex
    ///
    /// A pattern that matches no action is only logged.
    ///
    /// # Example
    /// ```
    /// use lcgen_core::actions::{Action, ActionCatalogue};
    /// use lcgen_core::graph::RelationshipGraph;
    ///
    /// let catalogue = ActionCatalogue::new()
    ///     .with(Action::variable("Q1", "en1990.set_b.variable", "en1990.category_f").with_incompatible("Q2.*"))?
    ///     .with(Action::variable("Q2a", "en1990.set_b.variable", "en1990.category_f"))?
    ///     .with(Action::variable("W", "en1990.set_b.variable", "en1990.wind"))?;
    ///
    /// let graph = RelationshipGraph::build(&catalogue)?;
    /// assert!(graph.incompatible_names("Q2a", "Q1"));
    /// assert!(!graph.incompatible_names("Q1", "W"));
    /// assert_eq!(graph.exclusion_groups().len(), 2);
    /// # Ok::<(), lcgen_core::errors::CombError>(())
    /// ```
    pub fn build(catalogue: &ActionCatalogue) -> CombResult<Self> {
        let actions = catalogue.as_slice();
        let names: Vec<String> = actions.iter().map(|a| a.name.clone()).collect();
        let index: HashMap<String, ActionId> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), ActionId(i)))
            .collect();

        let mut depends_on = Vec::with_capacity(actions.len());
        for action in actions {
            let target = match &action.depends_on {
                Some(target) => Some(
                    *index
                        .get(target)
                        .ok_or_else(|| CombError::unknown_reference(&action.name, "depends on", target))?,
                ),
                None => None,
            };
            depends_on.push(target);
        }

        let mut incompatible = vec![BTreeSet::new(); actions.len()];
        for (i, action) in actions.iter().enumerate() {
            for pattern in &action.incompatible_with {
                let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                    CombError::invalid_input(
                        format!("{}.incompatible_with", action.name),
                        pattern,
                        format!("Invalid pattern: {}", e),
                    )
                })?;
                let mut matched = 0;
                for (j, other) in names.iter().enumerate() {
                    if i != j && regex.is_match(other) {
                        incompatible[i].insert(ActionId(j));
                        incompatible[j].insert(ActionId(i));
                        matched += 1;
                    }
                }
                if matched == 0 {
                    warn!(
                        "Incompatibility pattern '{}' of action '{}' matches no other action",
                        pattern, action.name
                    );
                }
            }
        }

        check_acyclic(&names, &depends_on)?;

        for (i, target) in depends_on.iter().enumerate() {
            if let Some(target) = target {
                if incompatible[i].contains(target) {
                    warn!(
                        "Action '{}' depends on '{}' but is incompatible with it; it can never be present",
                        names[i], names[target.0]
                    );
                }
            }
        }

        let not_determinant = actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.not_determinant)
            .map(|(i, _)| ActionId(i))
            .collect();

        let variables: Vec<usize> = actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.family == ActionFamily::Variable)
            .map(|(i, _)| i)
            .collect();
        let exclusion_groups = partition_groups(&names, &variables, &incompatible);
        let mut group_of = vec![None; names.len()];
        for (index, group) in exclusion_groups.iter().enumerate() {
            for member in &group.members {
                group_of[member.0] = Some(index);
            }
        }

        Ok(RelationshipGraph {
            names,
            index,
            incompatible,
            depends_on,
            not_determinant,
            exclusion_groups,
            group_of,
        })
    }

    /// Symmetric, never true for an action with itself
    pub fn incompatible(&self, a: ActionId, b: ActionId) -> bool {
        a != b && self.incompatible[a.0].contains(&b)
    }

    /// Name-based variant of [`RelationshipGraph::incompatible`]; unknown names are compatible
    pub fn incompatible_names(&self, a: &str, b: &str) -> bool {
        match (self.id(a), self.id(b)) {
            (Some(a), Some(b)) => self.incompatible(a, b),
            _ => false,
        }
    }

    /// Whether the dependency of `action` (if any) is in `present`
    pub fn is_satisfied_by(&self, action: ActionId, present: &BTreeSet<ActionId>) -> bool {
        self.depends_on[action.0].map_or(true, |dep| present.contains(&dep))
    }

    pub fn dependency(&self, action: ActionId) -> Option<ActionId> {
        self.depends_on[action.0]
    }

    pub fn is_not_determinant(&self, action: ActionId) -> bool {
        self.not_determinant.contains(&action)
    }

    pub fn id(&self, name: &str) -> Option<ActionId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: ActionId) -> &str {
        &self.names[id.0]
    }

    /// Groups of variable actions, ordered by their first member's name
    pub fn exclusion_groups(&self) -> &[ExclusionGroup] {
        &self.exclusion_groups
    }

    /// Index into [`RelationshipGraph::exclusion_groups`]; `None` for non-variable actions
    pub fn group_of(&self, action: ActionId) -> Option<usize> {
        self.group_of[action.0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn check_acyclic(names: &[String], depends_on: &[Option<ActionId>]) -> CombResult<()> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..names.len()).map(|i| graph.add_node(i)).collect();
    for (i, target) in depends_on.iter().enumerate() {
        if let Some(target) = target {
            graph.add_edge(nodes[i], nodes[target.0], ());
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| CombError::cyclic_dependency(&names[graph[cycle.node_id()]]))
}

fn partition_groups(
    names: &[String],
    variables: &[usize],
    incompatible: &[BTreeSet<ActionId>],
) -> Vec<ExclusionGroup> {
    let mut sets = UnionFind::<usize>::new(names.len());
    for &i in variables {
        for other in &incompatible[i] {
            if variables.contains(&other.0) {
                sets.union(i, other.0);
            }
        }
    }

    let mut by_root: BTreeMap<usize, Vec<ActionId>> = BTreeMap::new();
    for &i in variables {
        by_root.entry(sets.find(i)).or_default().push(ActionId(i));
    }

    let mut groups: Vec<ExclusionGroup> = by_root
        .into_values()
        .map(|mut members| {
            members.sort_by(|a, b| names[a.0].cmp(&names[b.0]));
            ExclusionGroup { members }
        })
        .collect();
    groups.sort_by(|a, b| names[a.members[0].0].cmp(&names[b.members[0].0]));
    groups
}
