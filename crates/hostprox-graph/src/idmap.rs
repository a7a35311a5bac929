//! Identifier reconciliation across namespaces.
//!
//! Every raw identifier is only meaningful together with the namespace it was
//! read from. The [`IdResolver`] owns one entry per namespace and answers
//! `resolve(namespace, raw) -> Option<ProteinId>`:
//!
//! | Kind        | Resolution                                        |
//! |-------------|---------------------------------------------------|
//! | `Mapped`    | normalized raw id looked up in an [`IdentifierMap`] |
//! | `Canonical` | normalized raw id *is* the canonical id           |
//!
//! The resolver is assembled through [`IdResolverBuilder`] and is immutable
//! once built; a miss is `None`, never an error.

use std::collections::HashMap;

use crate::error::GraphError;
use crate::model::{NamespaceId, Organism, ProteinId};

// ─────────────────────────────────────────────
// IdentifierMap
// ─────────────────────────────────────────────

/// One-directional `source id → canonical id` table for a single namespace.
#[derive(Debug, Default, Clone)]
pub struct IdentifierMap {
    entries:   HashMap<String, ProteinId>,
    conflicts: u64,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mapping. The first mapping for a source id wins; later rows
    /// for the same id are counted as conflicts and ignored.
    pub fn insert(&mut self, source_id: impl Into<String>, canonical: impl AsRef<str>) -> bool {
        let source_id = source_id.into();
        if let Some(existing) = self.entries.get(&source_id) {
            if existing.as_str() != canonical.as_ref() {
                self.conflicts += 1;
            }
            return false;
        }
        self.entries.insert(source_id, ProteinId::new(canonical));
        true
    }

    pub fn get(&self, source_id: &str) -> Option<&ProteinId> {
        self.entries.get(source_id)
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Rows that tried to remap an already-mapped source id.
    #[inline] pub fn conflicts(&self) -> u64 { self.conflicts }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for IdentifierMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ─────────────────────────────────────────────
// NamespaceSpec
// ─────────────────────────────────────────────

/// Static description of a namespace: name, organism and normalization rules.
#[derive(Debug, Clone)]
pub struct NamespaceSpec {
    pub name:     String,
    pub organism: Organism,
    /// Prefix removed from raw ids before lookup (`"9606."`, `"uniprotkb:"`).
    pub strip_prefix: Option<String>,
    /// Replace interior whitespace with `_` (pathogen protein names).
    pub underscore_whitespace: bool,
    /// Raw ids ending with this suffix are pathogen proteins regardless of
    /// the namespace organism (`"_CVHSA"` inside UniProt).
    pub pathogen_suffix: Option<String>,
    /// Canonical namespaces only: prefix resolved ids with `"<name>:"`.
    pub qualify: bool,
}

impl NamespaceSpec {
    pub fn new(name: impl Into<String>, organism: Organism) -> Self {
        Self {
            name: name.into(),
            organism,
            strip_prefix: None,
            underscore_whitespace: false,
            pathogen_suffix: None,
            qualify: false,
        }
    }

    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = Some(prefix.into());
        self
    }

    pub fn underscore_whitespace(mut self) -> Self {
        self.underscore_whitespace = true;
        self
    }

    pub fn pathogen_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.pathogen_suffix = Some(suffix.into());
        self
    }

    pub fn qualified(mut self) -> Self {
        self.qualify = true;
        self
    }

    /// Apply prefix stripping and whitespace rules to a raw id.
    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        let raw = match &self.strip_prefix {
            Some(p) => raw.strip_prefix(p.as_str()).unwrap_or(raw),
            None    => raw,
        };
        if self.underscore_whitespace {
            raw.split_whitespace().collect::<Vec<_>>().join("_")
        } else {
            raw.to_string()
        }
    }

    /// Organism of a raw id seen in this namespace.
    pub fn organism_of(&self, normalized: &str) -> Organism {
        match &self.pathogen_suffix {
            Some(sfx) if normalized.ends_with(sfx.as_str()) => Organism::Pathogen,
            _ => self.organism,
        }
    }
}

#[derive(Debug)]
enum Resolution {
    Canonical,
    Mapped(IdentifierMap),
}

#[derive(Debug)]
struct NamespaceEntry {
    spec:       NamespaceSpec,
    resolution: Resolution,
}

// ─────────────────────────────────────────────
// IdResolverBuilder
// ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct IdResolverBuilder {
    entries: Vec<NamespaceEntry>,
}

impl IdResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace whose normalized ids are already canonical.
    pub fn canonical(self, spec: NamespaceSpec) -> Result<Self, GraphError> {
        self.push(spec, Resolution::Canonical)
    }

    /// Register a namespace resolved through `map`.
    pub fn mapped(self, spec: NamespaceSpec, map: IdentifierMap) -> Result<Self, GraphError> {
        self.push(spec, Resolution::Mapped(map))
    }

    fn push(mut self, spec: NamespaceSpec, resolution: Resolution) -> Result<Self, GraphError> {
        if self.entries.iter().any(|e| e.spec.name == spec.name) {
            return Err(GraphError::DuplicateNamespace(spec.name));
        }
        if self.entries.len() >= u16::MAX as usize {
            return Err(GraphError::NamespaceLimit(spec.name));
        }
        self.entries.push(NamespaceEntry { spec, resolution });
        Ok(self)
    }

    pub fn build(self) -> IdResolver {
        let by_name = self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.spec.name.clone(), NamespaceId(i as u16)))
            .collect();
        IdResolver { entries: self.entries, by_name }
    }
}

// ─────────────────────────────────────────────
// IdResolver
// ─────────────────────────────────────────────

/// Immutable, fully-built lookup over every registered namespace.
#[derive(Debug)]
pub struct IdResolver {
    entries: Vec<NamespaceEntry>,
    by_name: HashMap<String, NamespaceId>,
}

/// A successful resolution: canonical id plus the organism it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id:       ProteinId,
    pub organism: Organism,
}

impl IdResolver {
    pub fn builder() -> IdResolverBuilder {
        IdResolverBuilder::new()
    }

    /// Handle for a namespace name; unknown names are a configuration error.
    pub fn namespace(&self, name: &str) -> Result<NamespaceId, GraphError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownNamespace(name.to_string()))
    }

    pub fn spec(&self, ns: NamespaceId) -> &NamespaceSpec {
        &self.entries[ns.index()].spec
    }

    pub fn name(&self, ns: NamespaceId) -> &str {
        &self.entries[ns.index()].spec.name
    }

    /// Resolve `raw` from namespace `ns` to its canonical id.
    pub fn resolve(&self, ns: NamespaceId, raw: &str) -> Option<ProteinId> {
        self.resolve_full(ns, raw).map(|r| r.id)
    }

    /// Like [`resolve`](Self::resolve) but also reports the organism.
    pub fn resolve_full(&self, ns: NamespaceId, raw: &str) -> Option<Resolved> {
        let entry = self.entries.get(ns.index())?;
        let spec = &entry.spec;
        let normalized = spec.normalize(raw);
        if normalized.is_empty() {
            return None;
        }
        let organism = spec.organism_of(&normalized);

        let id = match &entry.resolution {
            Resolution::Canonical if spec.qualify => {
                ProteinId::new(format!("{}:{}", spec.name, normalized))
            }
            Resolution::Canonical   => ProteinId::new(normalized),
            Resolution::Mapped(map) => map.get(&normalized)?.clone(),
        };
        Some(Resolved { id, organism })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
