use std::ops::Range;

use crate::dist::{EdgeDistribution, VertexDistribution};
use crate::error::{Error, Result};
use crate::graph::{CsrGraph, EdgeOffset, VertexId, Weight, compact::exclusive_scan};

/// A rank's slice of the global graph.
///
/// `indptr` is re-based to start at 0. `indices` keep global vertex ids, so
/// edges leaving the owned range point at foreign vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalShard {
    pub(crate) first_vertex: usize,
    pub(crate) indptr: Vec<EdgeOffset>,
    pub(crate) indices: Vec<VertexId>,
    pub(crate) ncon: usize,
    pub(crate) node_weights: Option<Vec<Weight>>,
    pub(crate) edge_weights: Option<Vec<Weight>>,
}

impl LocalShard {
    /// Assemble a shard from received arrays and check it.
    pub fn new(
        first_vertex: usize,
        indptr: Vec<EdgeOffset>,
        indices: Vec<VertexId>,
        ncon: usize,
        node_weights: Option<Vec<Weight>>,
        edge_weights: Option<Vec<Weight>>,
    ) -> Result<Self> {
        let shard = Self { first_vertex, indptr, indices, ncon, node_weights, edge_weights };
        shard.validate()?;
        Ok(shard)
    }

    /// Copy the block of `graph` owned by `rank`, re-basing its offsets.
    pub fn slice(graph: &CsrGraph, vtxdist: &VertexDistribution, edgedist: &EdgeDistribution, rank: usize) -> Result<Self> {
        let nodes = vtxdist.owned(rank)?;
        let edges = edgedist.owned(rank)?;
        let base = edges.start as EdgeOffset;

        let indptr = graph.indptr()[nodes.start..=nodes.end].iter().map(|&o| o - base).collect();
        let node_weights = graph.node_weights().map(|w| w.rows(nodes.clone()).to_vec());
        let edge_weights = graph.edge_weights().map(|w| w[edges.clone()].to_vec());

        Self::new(
            nodes.start,
            indptr,
            graph.indices()[edges].to_vec(),
            graph.ncon(),
            node_weights,
            edge_weights,
        )
    }

    /// A shard covering the whole graph.
    pub fn whole(graph: &CsrGraph) -> Result<Self> {
        Self::new(
            0,
            graph.indptr().to_vec(),
            graph.indices().to_vec(),
            graph.ncon(),
            graph.node_weights().map(|w| w.as_flat().to_vec()),
            graph.edge_weights().map(<[Weight]>::to_vec),
        )
    }

    fn validate(&self) -> Result<()> {
        match (self.indptr.first(), self.indptr.last()) {
            (Some(&0), Some(&last)) if last as usize == self.indices.len() => {}
            _ => return Err(Error::InvalidGraph(format!(
                "shard at vertex {} is not re-based: indptr {:?}..{:?} for {} indices",
                self.first_vertex, self.indptr.first(), self.indptr.last(), self.indices.len()
            ))),
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidGraph(format!("shard at vertex {} has decreasing offsets", self.first_vertex)));
        }
        if let Some(w) = &self.node_weights {
            if w.len() != self.vertex_count() * self.ncon {
                return Err(Error::InvalidWeights(format!(
                    "{} node weights for {} vertices with ncon={}", w.len(), self.vertex_count(), self.ncon
                )));
            }
        }
        if let Some(w) = &self.edge_weights {
            if w.len() != self.indices.len() {
                return Err(Error::InvalidWeights(format!(
                    "{} edge weights for {} edges", w.len(), self.indices.len()
                )));
            }
        }
        Ok(())
    }

    /// Number of owned vertices.
    #[inline] pub fn vertex_count(&self) -> usize { self.indptr.len() - 1 }

    /// Number of edge slots of owned vertices.
    #[inline] pub fn edge_count(&self) -> usize { self.indices.len() }

    /// Global ids of the owned vertices.
    #[inline]
    pub fn vertices(&self) -> Range<usize> {
        self.first_vertex..self.first_vertex + self.vertex_count()
    }

    #[inline] pub fn indptr(&self) -> &[EdgeOffset] { &self.indptr }

    #[inline] pub fn indices(&self) -> &[VertexId] { &self.indices }

    #[inline] pub fn ncon(&self) -> usize { self.ncon }

    #[inline] pub fn node_weights(&self) -> Option<&[Weight]> { self.node_weights.as_deref() }

    #[inline] pub fn edge_weights(&self) -> Option<&[Weight]> { self.edge_weights.as_deref() }

    /// Neighbors (global ids) of the `i`th owned vertex.
    pub fn neighbors(&self, local: usize) -> Result<&[VertexId]> {
        if local >= self.vertex_count() {
            return Err(Error::OutOfRange { vertex: local, count: self.vertex_count() });
        }
        Ok(&self.indices[self.indptr[local] as usize..self.indptr[local + 1] as usize])
    }

    /// Approximate payload size in bytes, for transfer statistics.
    pub fn byte_size(&self) -> usize {
        let elements = self.indptr.len() + self.indices.len()
            + self.node_weights.as_ref().map_or(0, Vec::len)
            + self.edge_weights.as_ref().map_or(0, Vec::len);
        elements * std::mem::size_of::<u64>()
    }
}

/// Merge shards in rank order back into one global graph.
pub fn reassemble(shards: &[LocalShard]) -> Result<CsrGraph> {
    let degrees: Vec<EdgeOffset> = shards.iter()
        .flat_map(|s| s.indptr.windows(2).map(|w| w[1] - w[0]))
        .collect();
    let indptr = exclusive_scan(&degrees);
    let indices = shards.iter().flat_map(|s| s.indices.iter().copied()).collect();

    let node_weights = shards.iter().all(|s| s.node_weights.is_some()).then(|| {
        shards.iter().flat_map(|s| s.node_weights.iter().flatten().copied()).collect()
    });
    let edge_weights = shards.iter().all(|s| s.edge_weights.is_some()).then(|| {
        shards.iter().flat_map(|s| s.edge_weights.iter().flatten().copied()).collect()
    });
    CsrGraph::with_weights(indptr, indices, node_weights, edge_weights)
}
