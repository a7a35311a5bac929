//! # hostprox-graph
//!
//! Identifier reconciliation and canonical graph construction for host–pathogen
//! PPI proximity analysis.
//!
//! - [`idmap::IdResolver`]    : immutable `resolve(namespace, raw) -> Option<ProteinId>`
//! - [`builder::GraphBuilder`]: resolve, filter and merge raw edge records
//! - [`graph::PpiGraph`]      : the finished simple undirected weighted graph
//! - [`graph::NodeOrder`]     : frozen basis ordering shared with every operator
//! - [`import`]               : delimited table readers (maps, edges, id lists)

pub mod builder;
pub mod error;
pub mod graph;
pub mod idmap;
pub mod import;
pub mod model;

pub use builder::{
    BuildConfig, BuildReport, DropReason, EdgeOutcome, GraphBuilder, SourceReport, SourceRules,
};
pub use error::GraphError;
pub use graph::{Components, NodeOrder, PpiGraph};
pub use idmap::{IdResolver, IdResolverBuilder, IdentifierMap, NamespaceSpec, Resolved};
pub use import::{EdgeRecord, EdgeTable, TableFormat, TableStats};
pub use model::{Edge, MergePolicy, NamespaceId, Node, Organism, ProteinId, SourceTag};
