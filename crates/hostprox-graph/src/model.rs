use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// ProteinId
// ─────────────────────────────────────────────

/// Canonical protein identifier.
///
/// Cheap to clone (shared `Arc<str>`); ordered lexically, which is the
/// tie-break order for every ranking produced downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProteinId(Arc<str>);

impl ProteinId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProteinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProteinId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProteinId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for ProteinId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProteinId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d).map(Self::new)
    }
}

// ─────────────────────────────────────────────
// Organism
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Organism {
    Host,
    Pathogen,
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host     => "host",
            Self::Pathogen => "pathogen",
        })
    }
}

// ─────────────────────────────────────────────
// NamespaceId / SourceTag
// ─────────────────────────────────────────────

/// Handle for a namespace registered in an [`IdResolver`](crate::IdResolver).
///
/// Only the resolver hands these out, so a `NamespaceId` always refers to an
/// existing namespace of that resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub(crate) u16);

impl NamespaceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Provenance label of an edge source (e.g. `"string"`, `"covid-human"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ─────────────────────────────────────────────
// MergePolicy
// ─────────────────────────────────────────────

/// How a second contribution for an already-present node pair is merged.
///
/// No `Default`: every graph build names its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the weight that was inserted first.
    KeepExisting,
    /// Replace with the newest weight.
    LastWrite,
    /// Keep the larger weight.
    Max,
    /// Accumulate weights.
    Sum,
}

impl MergePolicy {
    pub fn merge(self, existing: f64, incoming: f64) -> f64 {
        match self {
            Self::KeepExisting => existing,
            Self::LastWrite    => incoming,
            Self::Max          => existing.max(incoming),
            Self::Sum          => existing + incoming,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::KeepExisting => "keep_existing",
            Self::LastWrite    => "last_write",
            Self::Max          => "max",
            Self::Sum          => "sum",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep_existing" | "keep-existing" | "first" => Ok(Self::KeepExisting),
            "last_write" | "last-write" | "last"         => Ok(Self::LastWrite),
            "max"                                        => Ok(Self::Max),
            "sum"                                        => Ok(Self::Sum),
            other => Err(format!(
                "unknown merge policy '{other}' (expected keep_existing, last_write, max or sum)"
            )),
        }
    }
}

// ─────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────

/// A canonical protein in the reconciled graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id:         ProteinId,
    pub organism:   Organism,
    /// Every namespace this protein was referenced under.
    pub namespaces: BTreeSet<NamespaceId>,
}

impl Node {
    pub fn new(id: ProteinId, organism: Organism, namespace: NamespaceId) -> Self {
        let mut namespaces = BTreeSet::new();
        namespaces.insert(namespace);
        Self { id, organism, namespaces }
    }
}

// ─────────────────────────────────────────────
// Edge
// ─────────────────────────────────────────────

/// Undirected edge between node indices `a < b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub a:       usize,
    pub b:       usize,
    pub weight:  f64,
    /// Sources that contributed to this pair, in first-contribution order.
    pub sources: Vec<SourceTag>,
    /// Number of accepted contributions merged into this edge.
    pub contributions: u32,
}

impl Edge {
    pub fn new(i: usize, j: usize, weight: f64, source: SourceTag) -> Self {
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        Self { a, b, weight, sources: vec![source], contributions: 1 }
    }

    /// The endpoint opposite `i`.
    #[inline]
    pub fn other(&self, i: usize) -> usize {
        if self.a == i { self.b } else { self.a }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_policies() {
        assert_eq!(MergePolicy::KeepExisting.merge(0.4, 0.9), 0.4);
        assert_eq!(MergePolicy::LastWrite.merge(0.4, 0.9), 0.9);
        assert_eq!(MergePolicy::Max.merge(0.4, 0.9), 0.9);
        assert_eq!(MergePolicy::Max.merge(0.9, 0.4), 0.9);
        assert!((MergePolicy::Sum.merge(0.4, 0.9) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn merge_policy_parses_labels() {
        for p in [MergePolicy::KeepExisting, MergePolicy::LastWrite, MergePolicy::Max, MergePolicy::Sum] {
            assert_eq!(p.label().parse::<MergePolicy>().unwrap(), p);
        }
        assert!("average".parse::<MergePolicy>().is_err());
    }

    #[test]
    fn edge_endpoints_are_normalized() {
        let e = Edge::new(7, 2, 1.0, SourceTag::from("s"));
        assert_eq!((e.a, e.b), (2, 7));
        assert_eq!(e.other(2), 7);
        assert_eq!(e.other(7), 2);
    }

    #[test]
    fn protein_id_orders_lexically() {
        let mut ids = vec![ProteinId::new("P2"), ProteinId::new("A9"), ProteinId::new("P10")];
        ids.sort();
        let s: Vec<&str> = ids.iter().map(|p| p.as_str()).collect();
        assert_eq!(s, ["A9", "P10", "P2"]);
    }
}
