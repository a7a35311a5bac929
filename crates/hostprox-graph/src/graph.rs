//! The finished, immutable PPI graph.
//!
//! A [`PpiGraph`] is produced once by [`GraphBuilder::finish`](crate::GraphBuilder::finish)
//! and never mutated afterwards. Its [`NodeOrder`] is the basis ordering for
//! every vector and matrix built from it; downstream operators and seed vectors
//! hold the same `Arc<NodeOrder>` and compare it before combining.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Edge, Node, Organism, ProteinId};

// ─────────────────────────────────────────────
// NodeOrder: ProteinId ↔ usize bijection
// ─────────────────────────────────────────────

/// Frozen bijection between canonical ids and dense indices.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeOrder {
    idx_to_id: Vec<ProteinId>,
    id_to_idx: HashMap<ProteinId, usize>,
}

impl NodeOrder {
    /// Order over `ids`; `None` if an id repeats.
    pub fn new(ids: Vec<ProteinId>) -> Option<Self> {
        let order = Self::from_ids(ids);
        (order.id_to_idx.len() == order.idx_to_id.len()).then_some(order)
    }

    pub(crate) fn from_ids(idx_to_id: Vec<ProteinId>) -> Self {
        let id_to_idx = idx_to_id
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self { idx_to_id, id_to_idx }
    }

    #[inline] pub fn len(&self) -> usize { self.idx_to_id.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.idx_to_id.is_empty() }

    #[inline]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    #[inline]
    pub fn id(&self, idx: usize) -> &ProteinId {
        &self.idx_to_id[idx]
    }

    pub fn ids(&self) -> &[ProteinId] {
        &self.idx_to_id
    }

    /// True when both orders describe the same basis (same ids, same positions).
    pub fn same_basis(a: &Arc<NodeOrder>, b: &Arc<NodeOrder>) -> bool {
        Arc::ptr_eq(a, b) || a.idx_to_id == b.idx_to_id
    }
}

// ─────────────────────────────────────────────
// PpiGraph
// ─────────────────────────────────────────────

/// Simple undirected weighted graph over canonical proteins.
#[derive(Debug)]
pub struct PpiGraph {
    order: Arc<NodeOrder>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// `adj[i]` = `[(j, w_ij)]`, both directions, sorted by `j`.
    adj:   Vec<Vec<(usize, f64)>>,
}

impl PpiGraph {
    pub(crate) fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let order = Arc::new(NodeOrder::from_ids(nodes.iter().map(|n| n.id.clone()).collect()));

        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nodes.len()];
        for e in &edges {
            adj[e.a].push((e.b, e.weight));
            adj[e.b].push((e.a, e.weight));
        }
        for list in adj.iter_mut() {
            list.sort_by_key(|&(j, _)| j);
        }

        Self { order, nodes, edges, adj }
    }

    /// The node ordering shared with every operator built from this graph.
    pub fn order(&self) -> &Arc<NodeOrder> {
        &self.order
    }

    #[inline] pub fn node_count(&self) -> usize { self.nodes.len() }
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Nodes in basis order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in first-insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.order.index_of(id).map(|i| &self.nodes[i])
    }

    /// `[(neighbor_index, weight)]` of node `i`, sorted by neighbor index.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[(usize, f64)] {
        &self.adj[i]
    }

    #[inline]
    pub fn degree(&self, i: usize) -> usize {
        self.adj[i].len()
    }

    /// Weight of edge `{i, j}` if present.
    pub fn weight(&self, i: usize, j: usize) -> Option<f64> {
        let list = self.adj.get(i)?;
        list.binary_search_by_key(&j, |&(k, _)| k)
            .ok()
            .map(|pos| list[pos].1)
    }

    /// Weight of the edge between two canonical ids.
    pub fn weight_between(&self, a: &str, b: &str) -> Option<f64> {
        self.weight(self.order.index_of(a)?, self.order.index_of(b)?)
    }

    pub fn organism_count(&self, organism: Organism) -> usize {
        self.nodes.iter().filter(|n| n.organism == organism).count()
    }

    pub fn isolated_count(&self) -> usize {
        self.adj.iter().filter(|l| l.is_empty()).count()
    }

    /// Connected-component label per node (labels in first-seen order).
    pub fn components(&self) -> Components {
        let n = self.nodes.len();
        let mut uf = UnionFind::new(n);
        for e in &self.edges {
            uf.union(e.a, e.b);
        }

        let mut root_label: HashMap<usize, usize> = HashMap::new();
        let mut sizes: Vec<usize> = Vec::new();
        let labels = (0..n)
            .map(|i| {
                let root = uf.find(i);
                let next = root_label.len();
                let label = *root_label.entry(root).or_insert(next);
                if label == sizes.len() {
                    sizes.push(0);
                }
                sizes[label] += 1;
                label
            })
            .collect();

        Components { labels, sizes }
    }
}

/// Output of [`PpiGraph::components`].
#[derive(Debug, Clone)]
pub struct Components {
    /// Component label of each node, in basis order.
    pub labels: Vec<usize>,
    /// Size of each component, indexed by label.
    pub sizes:  Vec<usize>,
}

impl Components {
    #[inline] pub fn count(&self) -> usize { self.sizes.len() }

    pub fn largest(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }
}

// ── Union-Find ──────────────────────────────────────────────────────────────

struct UnionFind {
    parent: Vec<usize>,
    rank:   Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        // path halving
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry { return; }
        if self.rank[rx] < self.rank[ry] {
            self.parent[rx] = ry;
        } else if self.rank[rx] > self.rank[ry] {
            self.parent[ry] = rx;
        } else {
            self.parent[ry] = rx;
            self.rank[rx] += 1;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
