#![doc = "csrshard public API"]
mod dist;
mod error;
mod graph;
mod partition;
mod pipeline;

pub mod io;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use graph::{
    CsrGraph, Dataset, EdgeOffset, NodeWeights, PrepareOptions, Symmetrized, VertexId, Weight,
    compact_indptr, count_positive, expand_indptr, prune_nonpositive_edges, symmetrize,
};

#[doc(inline)]
pub use dist::{
    Balance, Communicator, EdgeDistribution, Element, LocalComm, LocalGroup, LocalShard, Payload,
    ROOT, RecvRequest, SendRequest, ShardLayout, Tag, VertexDistribution, gather_partition,
    reassemble, scatter_graph,
};

#[doc(inline)]
pub use partition::{
    BlockEngine, Objective, PartId, PartitionEngine, PartitionOptions, PartitionReport,
    PartitionRequest, check_assignment,
};

#[doc(inline)]
#[cfg(feature = "mpi")]
pub use dist::MpiComm;
pub use pipeline::{
    DatasetPaths, EDGE_WEIGHT_SYM, INDICES_SYM, INDPTR_SYM, export_symmetrized, partition_distributed,
    partition_local, partition_on_rank, save_partition, save_report,
};
