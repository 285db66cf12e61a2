pub(crate) mod comm;
mod local;
#[cfg(feature = "mpi")]
mod mpi_comm;
mod protocol;
pub(crate) mod shard;
mod vtxdist;

pub use comm::{Communicator, Element, Payload, RecvRequest, SendRequest, Tag};
pub use local::{LocalComm, LocalGroup};
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;
pub use protocol::{ROOT, ShardLayout, gather_partition, scatter_graph};
pub use shard::{LocalShard, reassemble};
pub use vtxdist::{Balance, EdgeDistribution, VertexDistribution};
