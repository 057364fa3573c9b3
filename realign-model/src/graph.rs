//! Table dependency graph and topological ranking.
//!
//! Nodes are the tables being scripted; an edge runs from a referencing
//! (child) table to its referenced (parent) table for every foreign key whose
//! both ends are nodes. Ranks are assigned level by level: parentless tables
//! get rank 1 and every other table `1 + max(parent rank)`. The ranks drive
//! `CREATE TABLE` order, foreign key re-creation, parent-first inserts and
//! child-first deletes.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::model::{MetadataModel, QualifiedName};

/// "`source` requires `target` to exist first."
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyEdge {
    /// Referencing table.
    pub source: QualifiedName,
    /// Referenced table.
    pub target: QualifiedName,
}

/// Directed graph of table dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<QualifiedName>,
    parents: BTreeMap<QualifiedName, BTreeSet<QualifiedName>>,
}

impl DependencyGraph {
    /// Build the graph from the scripted tables and `(child, parent)` pairs.
    ///
    /// Self-references and pairs with an end outside `tables` are ignored.
    pub fn build<'a, T, F>(tables: T, foreign_keys: F) -> Self
    where
        T: IntoIterator<Item = &'a QualifiedName>,
        F: IntoIterator<Item = (&'a QualifiedName, &'a QualifiedName)>,
    {
        let nodes: BTreeSet<QualifiedName> = tables.into_iter().cloned().collect();
        let mut parents: BTreeMap<QualifiedName, BTreeSet<QualifiedName>> = nodes
            .iter()
            .map(|n| (n.clone(), BTreeSet::new()))
            .collect();

        for (child, parent) in foreign_keys {
            if child == parent || !nodes.contains(child) || !nodes.contains(parent) {
                continue;
            }
            if let Some(set) = parents.get_mut(child) {
                set.insert(parent.clone());
            }
        }

        Self { nodes, parents }
    }

    /// Build the graph for a subset of a model's tables.
    pub fn from_model(model: &MetadataModel, tables: &[QualifiedName]) -> Self {
        let pairs = tables
            .iter()
            .filter_map(|t| model.table(t))
            .flat_map(|t| t.foreign_keys.iter().map(move |fk| (&t.name, &fk.referenced)));
        Self::build(tables, pairs)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tables.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All edges in deterministic order.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.parents
            .iter()
            .flat_map(|(child, parents)| {
                parents.iter().map(move |parent| DependencyEdge {
                    source: child.clone(),
                    target: parent.clone(),
                })
            })
            .collect()
    }

    /// Tables `table` directly depends on.
    pub fn parents_of(&self, table: &QualifiedName) -> impl Iterator<Item = &QualifiedName> {
        self.parents.get(table).into_iter().flatten()
    }

    /// Compute level ranks, falling back to a flat order on cycles.
    pub fn topological_order(&self) -> Ordering {
        let mut children: BTreeMap<&QualifiedName, Vec<&QualifiedName>> = BTreeMap::new();
        let mut pending: BTreeMap<&QualifiedName, usize> = BTreeMap::new();
        for (child, parents) in &self.parents {
            pending.insert(child, parents.len());
            for parent in parents {
                children.entry(parent).or_default().push(child);
            }
        }

        let mut ranks: BTreeMap<QualifiedName, u32> = BTreeMap::new();
        let mut level: Vec<&QualifiedName> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut rank = 1;

        while !level.is_empty() {
            let mut next = BTreeSet::new();
            for table in &level {
                ranks.insert((*table).clone(), rank);
                for child in children.get(table).into_iter().flatten() {
                    if let Some(count) = pending.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            next.insert(*child);
                        }
                    }
                }
            }
            level = next.into_iter().collect();
            rank += 1;
        }

        if ranks.len() < self.nodes.len() {
            let cycle: Vec<QualifiedName> = self
                .nodes
                .iter()
                .filter(|n| !ranks.contains_key(*n))
                .cloned()
                .collect();
            warn!(
                tables = cycle.len(),
                "Foreign key cycle detected, falling back to flat table order"
            );
            return Ordering::flat(self.nodes.iter().cloned(), cycle);
        }

        debug!(tables = ranks.len(), levels = rank - 1, "Computed table ranks");
        Ordering::from_ranks(ranks, Vec::new())
    }
}

/// Result of ranking: one rank per table plus any cycle members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    ordered: Vec<(QualifiedName, u32)>,
    cycle: Vec<QualifiedName>,
}

impl Ordering {
    fn from_ranks(ranks: BTreeMap<QualifiedName, u32>, cycle: Vec<QualifiedName>) -> Self {
        let mut ordered: Vec<(QualifiedName, u32)> = ranks.into_iter().collect();
        ordered.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Self { ordered, cycle }
    }

    fn flat(tables: impl Iterator<Item = QualifiedName>, cycle: Vec<QualifiedName>) -> Self {
        Self::from_ranks(tables.map(|t| (t, 1)).collect(), cycle)
    }

    /// Rank of a table.
    pub fn rank(&self, table: &QualifiedName) -> Option<u32> {
        self.ordered.iter().find(|(t, _)| t == table).map(|(_, r)| *r)
    }

    /// Tables parent-first, ties by name.
    pub fn tables(&self) -> impl DoubleEndedIterator<Item = &QualifiedName> {
        self.ordered.iter().map(|(t, _)| t)
    }

    /// `(table, rank)` pairs parent-first.
    pub fn ranked(&self) -> &[(QualifiedName, u32)] {
        &self.ordered
    }

    /// Highest table rank, `0` when there are no tables.
    pub fn max_rank(&self) -> u32 {
        self.ordered.iter().map(|(_, r)| *r).max().unwrap_or(0)
    }

    /// Rank given to every non-table entity.
    pub fn entity_rank(&self) -> u32 {
        if self.has_cycle() {
            2
        } else {
            self.max_rank() + 1
        }
    }

    /// Whether ranking fell back because of a cycle.
    pub fn has_cycle(&self) -> bool {
        !self.cycle.is_empty()
    }

    /// Tables that could not be ranked.
    pub fn cycle(&self) -> &[QualifiedName] {
        &self.cycle
    }
}
