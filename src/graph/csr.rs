use std::ops::Range;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::graph::{EdgeOffset, NodeWeights, VertexId, Weight};

/// A directed graph in compressed sparse row format with optional weights.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsrGraph {
    indptr: Vec<EdgeOffset>,
    indices: Vec<VertexId>,
    node_weights: Option<NodeWeights>,
    edge_weights: Option<Vec<Weight>>,
}

impl CsrGraph {
    /// Construct an unweighted graph, validating the CSR invariants.
    pub fn new(indptr: Vec<EdgeOffset>, indices: Vec<VertexId>) -> Result<Self> {
        Self::with_weights(indptr, indices, None, None)
    }

    /// Construct a graph with optional flat node weights (`V * ncon`) and edge weights (`E`).
    pub fn with_weights(
        indptr: Vec<EdgeOffset>,
        indices: Vec<VertexId>,
        node_weights: Option<Vec<Weight>>,
        edge_weights: Option<Vec<Weight>>,
    ) -> Result<Self> {
        validate_csr(&indptr, &indices)?;
        let num_nodes = indptr.len() - 1;

        let node_weights = node_weights
            .map(|values| NodeWeights::from_flat(values, num_nodes))
            .transpose()?;

        if let Some(weights) = &edge_weights {
            if weights.len() != indices.len() {
                return Err(Error::InvalidWeights(format!(
                    "edge weight length {} != edge count {}", weights.len(), indices.len()
                )));
            }
        }

        Ok(Self { indptr, indices, node_weights, edge_weights })
    }

    /// Get the number of vertices in the graph.
    #[inline] pub fn vertex_count(&self) -> usize { self.indptr.len().saturating_sub(1) }

    /// Get the number of directed edge slots in the graph.
    #[inline] pub fn edge_count(&self) -> usize { self.indices.len() }

    #[inline] pub fn indptr(&self) -> &[EdgeOffset] { &self.indptr }

    #[inline] pub fn indices(&self) -> &[VertexId] { &self.indices }

    #[inline] pub fn node_weights(&self) -> Option<&NodeWeights> { self.node_weights.as_ref() }

    #[inline] pub fn edge_weights(&self) -> Option<&[Weight]> { self.edge_weights.as_deref() }

    /// Number of weights per vertex, 0 when the graph has no node weights.
    #[inline]
    pub fn ncon(&self) -> usize {
        self.node_weights.as_ref().map_or(0, NodeWeights::ncon)
    }

    /// Get the range of edge slots for a given vertex.
    #[inline]
    fn range(&self, node: usize) -> Range<usize> {
        self.indptr[node] as usize..self.indptr[node + 1] as usize
    }

    fn check(&self, node: usize) -> Result<()> {
        if node >= self.vertex_count() {
            return Err(Error::OutOfRange { vertex: node, count: self.vertex_count() });
        }
        Ok(())
    }

    /// Get the neighbors of a given vertex.
    pub fn neighbors(&self, node: usize) -> Result<&[VertexId]> {
        self.check(node)?;
        Ok(&self.indices[self.range(node)])
    }

    /// Get the degree (number of edge slots) of a given vertex.
    pub fn degree(&self, node: usize) -> Result<usize> {
        self.check(node)?;
        Ok(self.range(node).len())
    }

    /// Get an iterator over the neighbors and edge weights of a given vertex.
    /// Unweighted graphs report a weight of 1 for every edge.
    pub fn neighbors_with_weights(&self, node: usize) -> Result<impl Iterator<Item = (VertexId, Weight)> + '_> {
        self.check(node)?;
        let range = self.range(node);
        Ok(range.map(move |i| {
            let weight = self.edge_weights.as_ref().map_or(1, |w| w[i]);
            (self.indices[i], weight)
        }))
    }

    /// Get the global edge-slot range owned by a contiguous vertex range.
    pub fn edge_range(&self, nodes: Range<usize>) -> Result<Range<usize>> {
        if nodes.start > nodes.end || nodes.end > self.vertex_count() {
            return Err(Error::OutOfRange { vertex: nodes.end, count: self.vertex_count() });
        }
        Ok(self.indptr[nodes.start] as usize..self.indptr[nodes.end] as usize)
    }

    /// Whether every edge `(v, u, w)` is matched by an edge `(u, v, w)`,
    /// counting multiplicity.
    pub fn is_symmetric(&self) -> bool {
        let mut forward = Vec::with_capacity(self.edge_count());
        for v in 0..self.vertex_count() {
            for i in self.range(v) {
                let weight = self.edge_weights.as_ref().map_or(1, |w| w[i]);
                forward.push((v as VertexId, self.indices[i], weight));
            }
        }
        let mut backward: Vec<_> = forward.par_iter().map(|&(v, u, w)| (u, v, w)).collect();
        forward.par_sort_unstable();
        backward.par_sort_unstable();
        forward == backward
    }

    /// Decompose into `(indptr, indices, node_weights, edge_weights)`.
    pub fn into_parts(self) -> (Vec<EdgeOffset>, Vec<VertexId>, Option<NodeWeights>, Option<Vec<Weight>>) {
        (self.indptr, self.indices, self.node_weights, self.edge_weights)
    }

    /// Reassemble from parts whose weights were already validated.
    pub(crate) fn from_parts(
        indptr: Vec<EdgeOffset>,
        indices: Vec<VertexId>,
        node_weights: Option<NodeWeights>,
        edge_weights: Option<Vec<Weight>>,
    ) -> Result<Self> {
        validate_csr(&indptr, &indices)?;
        if let Some(weights) = &node_weights {
            if weights.len() != indptr.len() - 1 {
                return Err(Error::InvalidWeights(format!(
                    "{} weighted vertices for a graph of {}", weights.len(), indptr.len() - 1
                )));
            }
        }
        Self::with_weights(indptr, indices, None, edge_weights)
            .map(|graph| Self { node_weights, ..graph })
    }
}

/// Check the offset array shape and that every index names a vertex of the graph.
pub(crate) fn validate_csr(indptr: &[EdgeOffset], indices: &[VertexId]) -> Result<()> {
    validate_indptr(indptr, indices.len())?;
    let num_nodes = (indptr.len() - 1) as VertexId;
    if let Some(pos) = indices.iter().position(|&v| v >= num_nodes) {
        return Err(Error::InvalidGraph(format!(
            "indices[{pos}] = {} is not a vertex of a graph with {num_nodes} vertices", indices[pos]
        )));
    }
    Ok(())
}

/// Check that `indptr` is a non-decreasing offset array from 0 to `num_edges`.
pub(crate) fn validate_indptr(indptr: &[EdgeOffset], num_edges: usize) -> Result<()> {
    let (Some(&first), Some(&last)) = (indptr.first(), indptr.last()) else {
        return Err(Error::InvalidGraph("indptr must hold at least one offset".into()));
    };
    if first != 0 {
        return Err(Error::InvalidGraph(format!("indptr[0] = {first}, expected 0")));
    }
    if let Some(pos) = indptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(Error::InvalidGraph(format!(
            "indptr decreases at {}: {} > {}", pos + 1, indptr[pos], indptr[pos + 1]
        )));
    }
    if last as usize != num_edges {
        return Err(Error::InvalidGraph(format!(
            "indptr ends at {last} but there are {num_edges} indices"
        )));
    }
    Ok(())
}
