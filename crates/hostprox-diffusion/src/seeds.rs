//! Named seed sets and their indicator vectors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use hostprox_graph::{NodeOrder, ProteinId};

use crate::error::DiffusionError;

// ─────────────────────────────────────────────
// SeedSet
// ─────────────────────────────────────────────

/// Frozen, named set of canonical ids used as diffusion sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSet {
    name:    String,
    members: BTreeSet<ProteinId>,
}

impl SeedSet {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = ProteinId>) -> Self {
        Self { name: name.into(), members: members.into_iter().collect() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline] pub fn len(&self) -> usize { self.members.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Members in canonical id order.
    pub fn iter(&self) -> impl Iterator<Item = &ProteinId> {
        self.members.iter()
    }
}

/// Accumulates members while edge sources are ingested.
#[derive(Debug, Clone)]
pub struct SeedSetBuilder {
    name:    String,
    members: BTreeSet<ProteinId>,
}

impl SeedSetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: BTreeSet::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `false` when `id` was already a member.
    pub fn insert(&mut self, id: ProteinId) -> bool {
        self.members.insert(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn build(self) -> SeedSet {
        SeedSet { name: self.name, members: self.members }
    }
}

// ─────────────────────────────────────────────
// SeedRegistry
// ─────────────────────────────────────────────

/// Seed sets by unique name, iterated in name order.
#[derive(Debug, Default, Clone)]
pub struct SeedRegistry {
    sets: BTreeMap<String, SeedSet>,
}

impl SeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: SeedSet) -> Result<(), DiffusionError> {
        if self.sets.contains_key(set.name()) {
            return Err(DiffusionError::DuplicateSeedSet(set.name().to_string()));
        }
        self.sets.insert(set.name().to_string(), set);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SeedSet> {
        self.sets.get(name)
    }

    #[inline] pub fn len(&self) -> usize { self.sets.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.sets.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &SeedSet> {
        self.sets.values()
    }
}

// ─────────────────────────────────────────────
// SeedVector
// ─────────────────────────────────────────────

/// Indicator vector of a seed set over one node order.
#[derive(Debug, Clone)]
pub struct SeedVector {
    pub name:    String,
    pub order:   Arc<NodeOrder>,
    /// 1.0 at member indices, 0.0 elsewhere.
    pub values:  Vec<f64>,
    /// Members present in the order.
    pub matched: usize,
    /// Members absent from the graph.
    pub missing: Vec<ProteinId>,
}

/// `1.0` at each member's index in `order`, `0.0` elsewhere.
///
/// Members absent from the graph are reported in [`SeedVector::missing`];
/// an all-absent set yields the zero vector.
pub fn make_seed_vector(order: &Arc<NodeOrder>, seeds: &SeedSet) -> SeedVector {
    let mut values = vec![0.0; order.len()];
    let mut matched = 0;
    let mut missing = Vec::new();

    for id in seeds.iter() {
        match order.index_of(id.as_str()) {
            Some(i) => {
                values[i] = 1.0;
                matched += 1;
            }
            None => missing.push(id.clone()),
        }
    }

    if !missing.is_empty() {
        warn!(
            seed_set = seeds.name(),
            missing  = missing.len(),
            matched,
            "seed members absent from the graph"
        );
    }
    if matched == 0 {
        warn!(seed_set = seeds.name(), "seed vector is all zero");
    }
    debug!(seed_set = seeds.name(), matched, nodes = order.len(), "seed vector built");

    SeedVector {
        name: seeds.name().to_string(),
        order: Arc::clone(order),
        values,
        matched,
        missing,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
