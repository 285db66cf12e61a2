//! Error taxonomy for graph preparation and shard distribution.
//!
//! Every variant is fatal for a partitioning job: nothing in this crate
//! retries, and the distributed protocol has no way to renegotiate shard
//! boundaries once they are broadcast.

use thiserror::Error;

use crate::dist::Tag;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed CSR arrays.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Vertex id outside `[0, vertex_count)`.
    #[error("vertex {vertex} out of range (vertex count {count})")]
    OutOfRange { vertex: usize, count: usize },

    /// Node or edge weight array with the wrong length.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// A compacted offset array disagrees with the number of kept edges.
    #[error("compaction mismatch: indptr ends at {actual}, expected {expected} edges")]
    CompactionMismatch { expected: u64, actual: u64 },

    /// Vertex distribution violates its invariants.
    #[error("invalid vertex distribution: {0}")]
    InvalidDistribution(String),

    /// A received buffer length differs from the pre-sized receive.
    #[error("rank {rank}: {tag:?} from rank {from} has {actual} elements, expected {expected}")]
    ProtocolSizeMismatch {
        rank: usize,
        from: usize,
        tag: Tag,
        expected: usize,
        actual: usize,
    },

    /// A rank without vertex-range coverage took part in an exchange.
    #[error("rank {rank} has no vertex range (distribution covers {covered} ranks)")]
    ProtocolCoverage { rank: usize, covered: usize },

    /// A payload carried a different element type than the receiver expects.
    #[error("{tag:?} payload holds {found}, expected {expected}")]
    ProtocolPayload {
        tag: Tag,
        expected: &'static str,
        found: &'static str,
    },

    /// A transport delivered bytes that do not decode to a payload.
    #[error("rank {rank}: malformed {tag:?} message from rank {from}")]
    MalformedMessage { rank: usize, from: usize, tag: Tag },

    /// A peer rank failed and aborted the group.
    #[error("rank {rank} aborted the group")]
    Aborted { rank: usize },

    /// The message channel to a peer closed unexpectedly.
    #[error("channel to rank {rank} disconnected")]
    Disconnected { rank: usize },

    /// The partition engine rejected its input.
    #[error("partitioner input error: {0}")]
    PartitionerInput(String),

    /// The partition engine ran out of memory.
    #[error("partitioner memory error: {0}")]
    PartitionerMemory(String),
}
