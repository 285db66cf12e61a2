//! Shard distribution: rank 0 slices the global graph and ships every rank
//! its block; partition ids travel back the same way.
//!
//! Phases are synchronous across the group: metadata broadcast, shard
//! transfer, barrier. Every receive is pre-sized from the broadcast
//! metadata, so a length disagreement is a fatal protocol error.

use std::time::Instant;

use tracing::{debug, info};

use crate::dist::comm::{Communicator, Element, Payload, RecvRequest, SendRequest, Tag};
use crate::dist::{Balance, EdgeDistribution, LocalShard, VertexDistribution};
use crate::error::{Error, Result};
use crate::graph::{CsrGraph, EdgeOffset, VertexId, Weight};
use crate::partition::PartId;

/// The rank that owns the global graph and collects the results.
pub const ROOT: usize = 0;

/// Vertex and edge ownership agreed on by every rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardLayout {
    pub vtxdist: VertexDistribution,
    pub edgedist: EdgeDistribution,
}

/// Weight presence, known to every rank before any transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct WeightFlags {
    num_nodes: u64,
    ncon: u64,
    node_weights: bool,
    edge_weights: bool,
}

impl WeightFlags {
    const LEN: usize = 4;

    fn of(graph: &CsrGraph) -> Self {
        Self {
            num_nodes: graph.vertex_count() as u64,
            ncon: graph.ncon() as u64,
            node_weights: graph.node_weights().is_some(),
            edge_weights: graph.edge_weights().is_some(),
        }
    }

    fn encode(&self) -> Vec<u64> {
        vec![self.num_nodes, self.ncon, self.node_weights as u64, self.edge_weights as u64]
    }

    fn decode(values: &[u64]) -> Self {
        Self {
            num_nodes: values[0],
            ncon: values[1],
            node_weights: values[2] != 0,
            edge_weights: values[3] != 0,
        }
    }
}

fn send<T: Element>(comm: &impl Communicator, dest: usize, tag: Tag, values: Vec<T>) -> Result<SendRequest> {
    comm.isend(dest, tag, T::wrap(values))
}

fn ensure_covered(comm: &impl Communicator, vtxdist: &VertexDistribution) -> Result<()> {
    if vtxdist.world_size() != comm.size() {
        return Err(Error::ProtocolCoverage { rank: comm.rank(), covered: vtxdist.world_size() });
    }
    Ok(())
}

/// Broadcast the layout and weight flags from rank 0.
fn broadcast_metadata(
    comm: &impl Communicator,
    graph: Option<&CsrGraph>,
    balance: Balance,
) -> Result<(ShardLayout, WeightFlags)> {
    let world_size = comm.size();

    let (vtx, edge, flags) = if comm.rank() == ROOT {
        let graph = graph.ok_or_else(|| Error::InvalidGraph("root rank holds no graph".into()))?;
        let vtxdist = VertexDistribution::compute(graph.indptr(), world_size, balance)?;
        let edgedist = EdgeDistribution::from_indptr(&vtxdist, graph.indptr())?;
        (vtxdist.bounds().to_vec(), edgedist.bounds().to_vec(), WeightFlags::of(graph).encode())
    } else {
        (vec![0; world_size + 1], vec![0; world_size + 1], vec![0; WeightFlags::LEN])
    };

    let vtx = comm.broadcast(ROOT, Tag::Vtxdist, Payload::U64(vtx))?.into_vec::<VertexId>(Tag::Vtxdist)?;
    let edge = comm.broadcast(ROOT, Tag::Edgedist, Payload::U64(edge))?.into_vec::<EdgeOffset>(Tag::Edgedist)?;
    let flags = comm.broadcast(ROOT, Tag::WeightFlags, Payload::U64(flags))?.into_vec::<u64>(Tag::WeightFlags)?;
    let flags = WeightFlags::decode(&flags);

    let vtxdist = VertexDistribution::from_bounds(vtx, flags.num_nodes as usize)?;
    let edgedist = EdgeDistribution::from_bounds(edge, &vtxdist)?;
    ensure_covered(comm, &vtxdist)?;

    debug!("[protocol] rank {} vtxdist {:?} edgedist {:?}", comm.rank(), vtxdist.bounds(), edgedist.bounds());
    Ok((ShardLayout { vtxdist, edgedist }, flags))
}

/// Rank 0: post the sends of every rank's block, itself included.
fn send_shards(comm: &impl Communicator, graph: &CsrGraph, layout: &ShardLayout) -> Result<Vec<SendRequest>> {
    let mut requests = Vec::new();
    for dest in 0..comm.size() {
        let shard = LocalShard::slice(graph, &layout.vtxdist, &layout.edgedist, dest)?;
        requests.push(send(comm, dest, Tag::Indptr, shard.indptr)?);
        requests.push(send(comm, dest, Tag::Indices, shard.indices)?);
        if let Some(weights) = shard.node_weights {
            requests.push(send(comm, dest, Tag::NodeWeight, weights)?);
        }
        if let Some(weights) = shard.edge_weights {
            requests.push(send(comm, dest, Tag::EdgeWeight, weights)?);
        }
    }
    Ok(requests)
}

/// Post pre-sized receives for this rank's block.
fn post_receives(comm: &impl Communicator, layout: &ShardLayout, flags: &WeightFlags) -> Result<Vec<RecvRequest>> {
    let rank = comm.rank();
    let num_nodes = layout.vtxdist.owned_count(rank)?;
    let num_edges = layout.edgedist.owned_count(rank)?;

    let mut requests = vec![
        comm.irecv(ROOT, Tag::Indptr, num_nodes + 1),
        comm.irecv(ROOT, Tag::Indices, num_edges),
    ];
    if flags.node_weights {
        requests.push(comm.irecv(ROOT, Tag::NodeWeight, num_nodes * flags.ncon as usize));
    }
    if flags.edge_weights {
        requests.push(comm.irecv(ROOT, Tag::EdgeWeight, num_edges));
    }
    Ok(requests)
}

/// Distribute the global graph held by rank 0; every rank gets its own shard.
///
/// Only rank 0 needs to pass `Some(graph)`; other ranks' arguments are ignored.
pub fn scatter_graph(
    comm: &impl Communicator,
    graph: Option<&CsrGraph>,
    balance: Balance,
) -> Result<(LocalShard, ShardLayout)> {
    let (layout, flags) = broadcast_metadata(comm, graph, balance)?;
    let rank = comm.rank();
    let start = Instant::now();

    let sends = match (rank, graph) {
        (ROOT, Some(graph)) => send_shards(comm, graph, &layout)?,
        _ => Vec::new(),
    };

    let mut received = comm.wait_all_recv(post_receives(comm, &layout, &flags)?)?.into_iter();
    comm.wait_all_send(sends)?;

    let mut next = |tag: Tag| received.next()
        .ok_or(Error::ProtocolSizeMismatch { rank, from: ROOT, tag, expected: 1, actual: 0 });
    let indptr = next(Tag::Indptr)?.into_vec::<EdgeOffset>(Tag::Indptr)?;
    let indices = next(Tag::Indices)?.into_vec::<VertexId>(Tag::Indices)?;
    let node_weights = match flags.node_weights {
        true => Some(next(Tag::NodeWeight)?.into_vec::<Weight>(Tag::NodeWeight)?),
        false => None,
    };
    let edge_weights = match flags.edge_weights {
        true => Some(next(Tag::EdgeWeight)?.into_vec::<Weight>(Tag::EdgeWeight)?),
        false => None,
    };

    let first_vertex = layout.vtxdist.owned(rank)?.start;
    let ncon = if flags.node_weights { flags.ncon as usize } else { 0 };
    let shard = LocalShard::new(first_vertex, indptr, indices, ncon, node_weights, edge_weights)?;

    let elapsed = start.elapsed().as_secs_f64();
    let mb = shard.byte_size() as f64 / 1e6;
    info!(
        "[protocol] rank {rank} received {} vertices, {} edges ({mb:.2} MB) in {elapsed:.3} secs, bandwidth {:.2} MB/s",
        shard.vertex_count(), shard.edge_count(), if elapsed > 0.0 { mb / elapsed } else { 0.0 }
    );

    comm.barrier()?;
    Ok((shard, layout))
}

/// Collect every rank's partition ids on rank 0, placed at its vertex range.
/// Returns `Some(map)` on rank 0 and `None` elsewhere.
pub fn gather_partition(
    comm: &impl Communicator,
    vtxdist: &VertexDistribution,
    local_parts: Vec<PartId>,
) -> Result<Option<Vec<PartId>>> {
    ensure_covered(comm, vtxdist)?;
    let rank = comm.rank();
    let expected = vtxdist.owned_count(rank)?;
    if local_parts.len() != expected {
        return Err(Error::ProtocolSizeMismatch {
            rank, from: rank, tag: Tag::PartitionMap, expected, actual: local_parts.len(),
        });
    }

    let request = send(comm, ROOT, Tag::PartitionMap, local_parts)?;

    let map = if rank == ROOT {
        let mut map = vec![0 as PartId; vtxdist.vertex_count()];
        for source in 0..comm.size() {
            let owned = vtxdist.owned(source)?;
            let payload = comm.wait_recv(comm.irecv(source, Tag::PartitionMap, owned.len()))?;
            map[owned].copy_from_slice(&payload.into_vec::<PartId>(Tag::PartitionMap)?);
        }
        Some(map)
    } else {
        None
    };

    comm.wait_send(request)?;
    comm.barrier()?;
    Ok(map)
}
