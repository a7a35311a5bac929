//! Incremental construction of the canonical PPI graph.
//!
//! Every raw edge record goes through the same pipeline:
//!
//! ```text
//! weight check → resolve both endpoints → self-loop check
//!              → confidence threshold → organism check → insert / merge
//! ```
//!
//! A record that fails any step is dropped and counted under exactly one
//! [`DropReason`]; nothing in this module aborts a build.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::GraphError;
use crate::graph::PpiGraph;
use crate::idmap::IdResolver;
use crate::model::{Edge, MergePolicy, NamespaceId, Node, Organism, ProteinId, SourceTag};

// ─────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────

/// Graph-wide build settings.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub merge_policy:   MergePolicy,
    /// Records whose raw score is below this cutoff are dropped.
    pub min_confidence: Option<f64>,
}

impl BuildConfig {
    pub fn new(merge_policy: MergePolicy) -> Self {
        Self { merge_policy, min_confidence: None }
    }

    pub fn min_confidence(mut self, cutoff: f64) -> Self {
        self.min_confidence = Some(cutoff);
        self
    }
}

/// Per-source overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRules {
    /// Replaces the global cutoff for this source when set.
    pub min_confidence: Option<f64>,
    /// Stored weight = raw score / `scale`.
    pub scale:          f64,
}

impl Default for SourceRules {
    fn default() -> Self {
        Self { min_confidence: None, scale: 1.0 }
    }
}

// ─────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// An endpoint did not resolve in the given namespace.
    Unresolved { namespace: NamespaceId },
    SelfLoop,
    BelowThreshold,
    /// Negative or non-finite score.
    InvalidWeight,
    /// The canonical id is already a node of the other organism.
    OrganismConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A new edge between node indices `a < b`.
    Inserted { a: usize, b: usize },
    /// The pair already existed; its weight was merged.
    Merged { a: usize, b: usize },
    Dropped(DropReason),
}

impl EdgeOutcome {
    /// Endpoint indices when the record made it into the graph.
    pub fn endpoints(&self) -> Option<(usize, usize)> {
        match *self {
            Self::Inserted { a, b } | Self::Merged { a, b } => Some((a, b)),
            Self::Dropped(_) => None,
        }
    }
}

// ─────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────

/// Record counters for one source (or the totals across sources).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub records:            u64,
    pub inserted:           u64,
    pub merged:             u64,
    pub unresolved:         u64,
    pub self_loops:         u64,
    pub below_threshold:    u64,
    pub invalid_weight:     u64,
    pub organism_conflicts: u64,
    /// Lines the table reader could not parse (counted by the ingest layer).
    pub malformed:          u64,
}

impl SourceReport {
    pub fn dropped(&self) -> u64 {
        self.unresolved
            + self.self_loops
            + self.below_threshold
            + self.invalid_weight
            + self.organism_conflicts
    }

    fn record(&mut self, outcome: &EdgeOutcome) {
        self.records += 1;
        match outcome {
            EdgeOutcome::Inserted { .. } => self.inserted += 1,
            EdgeOutcome::Merged { .. }   => self.merged += 1,
            EdgeOutcome::Dropped(reason) => match reason {
                DropReason::Unresolved { .. } => self.unresolved += 1,
                DropReason::SelfLoop          => self.self_loops += 1,
                DropReason::BelowThreshold    => self.below_threshold += 1,
                DropReason::InvalidWeight     => self.invalid_weight += 1,
                DropReason::OrganismConflict  => self.organism_conflicts += 1,
            },
        }
    }
}

/// Diagnostics for a finished build: enough to judge whether the graph is
/// trustworthy.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub merge_policy:            String,
    pub totals:                  SourceReport,
    pub sources:                 BTreeMap<String, SourceReport>,
    /// Endpoint resolution misses, keyed by namespace name.
    pub unresolved_by_namespace: BTreeMap<String, u64>,
    pub nodes:                   usize,
    pub edges:                   usize,
    pub host_nodes:              usize,
    pub pathogen_nodes:          usize,
    pub isolated_nodes:          usize,
    pub components:              usize,
    pub largest_component:       usize,
}

impl BuildReport {
    pub fn source(&self, tag: &str) -> Option<&SourceReport> {
        self.sources.get(tag)
    }
}

// ─────────────────────────────────────────────
// GraphBuilder
// ─────────────────────────────────────────────

/// Single-writer graph accumulator.
///
/// Node indices are assigned in first-reference order; that order becomes the
/// graph's [`NodeOrder`](crate::NodeOrder) when the builder is finished.
#[derive(Debug)]
pub struct GraphBuilder<'r> {
    resolver:   &'r IdResolver,
    config:     BuildConfig,
    rules:      HashMap<SourceTag, SourceRules>,
    nodes:      Vec<Node>,
    index:      HashMap<ProteinId, usize>,
    edges:      Vec<Edge>,
    edge_index: HashMap<(usize, usize), usize>,
    report:     BuildReport,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(resolver: &'r IdResolver, config: BuildConfig) -> Result<Self, GraphError> {
        if let Some(c) = config.min_confidence {
            check_cutoff(c)?;
        }
        let report = BuildReport {
            merge_policy: config.merge_policy.label().to_string(),
            ..BuildReport::default()
        };
        Ok(Self {
            resolver,
            config,
            rules:      HashMap::new(),
            nodes:      Vec::new(),
            index:      HashMap::new(),
            edges:      Vec::new(),
            edge_index: HashMap::new(),
            report,
        })
    }

    /// Install per-source threshold / scale overrides.
    pub fn set_source_rules(&mut self, source: SourceTag, rules: SourceRules) -> Result<(), GraphError> {
        if let Some(c) = rules.min_confidence {
            check_cutoff(c)?;
        }
        if !rules.scale.is_finite() || rules.scale <= 0.0 {
            return Err(GraphError::InvalidScale {
                source_tag: source.to_string(),
                scale:      rules.scale,
            });
        }
        self.rules.insert(source, rules);
        Ok(())
    }

    #[inline] pub fn node_count(&self) -> usize { self.nodes.len() }
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    /// Add one raw edge record.
    pub fn add_edge(
        &mut self,
        raw_1:  &str,
        raw_2:  &str,
        ns_1:   NamespaceId,
        ns_2:   NamespaceId,
        weight: f64,
        source: &SourceTag,
    ) -> EdgeOutcome {
        let outcome = self.try_add_edge(raw_1, raw_2, ns_1, ns_2, weight, source);

        if let EdgeOutcome::Dropped(DropReason::Unresolved { namespace }) = outcome {
            *self.report
                .unresolved_by_namespace
                .entry(self.resolver.name(namespace).to_string())
                .or_default() += 1;
        }
        self.report.totals.record(&outcome);
        self.source_report(source).record(&outcome);
        outcome
    }

    fn try_add_edge(
        &mut self,
        raw_1:  &str,
        raw_2:  &str,
        ns_1:   NamespaceId,
        ns_2:   NamespaceId,
        weight: f64,
        source: &SourceTag,
    ) -> EdgeOutcome {
        if !weight.is_finite() || weight < 0.0 {
            return EdgeOutcome::Dropped(DropReason::InvalidWeight);
        }

        let Some(p1) = self.resolver.resolve_full(ns_1, raw_1) else {
            return EdgeOutcome::Dropped(DropReason::Unresolved { namespace: ns_1 });
        };
        let Some(p2) = self.resolver.resolve_full(ns_2, raw_2) else {
            return EdgeOutcome::Dropped(DropReason::Unresolved { namespace: ns_2 });
        };

        if p1.id == p2.id {
            return EdgeOutcome::Dropped(DropReason::SelfLoop);
        }

        let rules = self.rules.get(source).copied().unwrap_or_default();
        if let Some(cutoff) = rules.min_confidence.or(self.config.min_confidence) {
            if weight < cutoff {
                return EdgeOutcome::Dropped(DropReason::BelowThreshold);
            }
        }

        if self.conflicts(&p1.id, p1.organism) || self.conflicts(&p2.id, p2.organism) {
            return EdgeOutcome::Dropped(DropReason::OrganismConflict);
        }

        let i = self.intern(p1.id, p1.organism, ns_1);
        let j = self.intern(p2.id, p2.organism, ns_2);
        let key = if i < j { (i, j) } else { (j, i) };
        let stored = weight / rules.scale;

        match self.edge_index.get(&key) {
            Some(&pos) => {
                let edge = &mut self.edges[pos];
                edge.weight = self.config.merge_policy.merge(edge.weight, stored);
                edge.contributions += 1;
                if !edge.sources.contains(source) {
                    edge.sources.push(source.clone());
                }
                EdgeOutcome::Merged { a: key.0, b: key.1 }
            }
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(Edge::new(key.0, key.1, stored, source.clone()));
                EdgeOutcome::Inserted { a: key.0, b: key.1 }
            }
        }
    }

    /// Add a node without edges (it will be dangling / isolated).
    ///
    /// Returns the node index, or `None` when the id does not resolve or is
    /// already a node of the other organism.
    pub fn add_node(&mut self, raw: &str, ns: NamespaceId) -> Option<usize> {
        let p = self.resolver.resolve_full(ns, raw)?;
        if self.conflicts(&p.id, p.organism) {
            return None;
        }
        Some(self.intern(p.id, p.organism, ns))
    }

    /// Count lines of `source` that the table reader rejected.
    pub fn record_malformed(&mut self, source: &SourceTag, count: u64) {
        self.report.totals.malformed += count;
        self.source_report(source).malformed += count;
    }

    /// Freeze the builder into an immutable graph plus its diagnostics.
    pub fn finish(self) -> (PpiGraph, BuildReport) {
        let mut report = self.report;
        let graph = PpiGraph::new(self.nodes, self.edges);

        let components = graph.components();
        report.nodes             = graph.node_count();
        report.edges             = graph.edge_count();
        report.host_nodes        = graph.organism_count(Organism::Host);
        report.pathogen_nodes    = graph.organism_count(Organism::Pathogen);
        report.isolated_nodes    = graph.isolated_count();
        report.components        = components.count();
        report.largest_component = components.largest();

        info!(
            nodes             = report.nodes,
            edges             = report.edges,
            records           = report.totals.records,
            merged            = report.totals.merged,
            dropped           = report.totals.dropped(),
            unresolved        = report.totals.unresolved,
            below_threshold   = report.totals.below_threshold,
            components        = report.components,
            largest_component = report.largest_component,
            "graph built"
        );

        (graph, report)
    }

    fn source_report(&mut self, source: &SourceTag) -> &mut SourceReport {
        self.report.sources.entry(source.to_string()).or_default()
    }

    fn conflicts(&self, id: &ProteinId, organism: Organism) -> bool {
        self.index
            .get(id)
            .is_some_and(|&i| self.nodes[i].organism != organism)
    }

    fn intern(&mut self, id: ProteinId, organism: Organism, ns: NamespaceId) -> usize {
        if let Some(&i) = self.index.get(&id) {
            self.nodes[i].namespaces.insert(ns);
            return i;
        }
        let i = self.nodes.len();
        debug!(node = %id, %organism, "new node");
        self.index.insert(id.clone(), i);
        self.nodes.push(Node::new(id, organism, ns));
        i
    }
}

fn check_cutoff(c: f64) -> Result<(), GraphError> {
    if c.is_finite() { Ok(()) } else { Err(GraphError::InvalidThreshold(c)) }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
