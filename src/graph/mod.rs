pub(crate) mod compact;
mod csr;
mod dataset;
pub(crate) mod symmetrize;
mod weights;

pub use compact::{compact_indptr, count_positive, expand_indptr, prune_nonpositive_edges};
pub use csr::CsrGraph;
pub use dataset::{Dataset, PrepareOptions};
pub use symmetrize::{Symmetrized, symmetrize};
pub use weights::NodeWeights;

/// Vertex id stored in `indices`.
pub type VertexId = u64;

/// Offset into the edge arrays stored in `indptr`.
pub type EdgeOffset = u64;

/// Node or edge weight; signed so that non-positive weights can be pruned.
pub type Weight = i64;
