//! Small graph fixtures shared by the unit tests.

use hostprox_graph::{
    BuildConfig, GraphBuilder, IdResolver, MergePolicy, NamespaceSpec, Organism, PpiGraph,
    SourceTag,
};

/// Graph over canonical ids; ids ending in `_CVHSA` are pathogen proteins.
///
/// Node order is first reference: edge endpoints in order, then `isolated`.
pub(crate) fn graph(edges: &[(&str, &str, f64)], isolated: &[&str]) -> PpiGraph {
    let resolver = IdResolver::builder()
        .canonical(NamespaceSpec::new("uniprot", Organism::Host).pathogen_suffix("_CVHSA"))
        .unwrap()
        .build();
    let ns = resolver.namespace("uniprot").unwrap();
    let tag = SourceTag::from("test");

    let mut builder = GraphBuilder::new(&resolver, BuildConfig::new(MergePolicy::Max)).unwrap();
    for (a, b, w) in edges {
        assert!(builder.add_edge(a, b, ns, ns, *w, &tag).endpoints().is_some());
    }
    for id in isolated {
        builder.add_node(id, ns).unwrap();
    }
    builder.finish().0
}

/// Cycle `P0 – P1 – … – P{n-1} – P0` with unit weights.
pub(crate) fn ring(n: usize) -> PpiGraph {
    let ids: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
    let edges: Vec<(&str, &str, f64)> = (0..n)
        .map(|i| (ids[i].as_str(), ids[(i + 1) % n].as_str(), 1.0))
        .collect();
    graph(&edges, &[])
}

pub(crate) fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{a} != {b} (tol {tol})");
}
