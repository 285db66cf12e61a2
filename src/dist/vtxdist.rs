use std::ops::Range;

use crate::error::{Error, Result};
use crate::graph::{EdgeOffset, VertexId};

/// How vertex ranges are sized across ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Balance {
    /// Equal vertex counts; the last rank absorbs the remainder.
    #[default]
    Vertices,
    /// Near-equal edge counts, possibly unequal vertex counts.
    Edges,
}

/// Contiguous vertex ranges owned by each rank (`vtxdist`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexDistribution {
    bounds: Vec<VertexId>,
}

impl VertexDistribution {
    /// Split the vertices of `indptr` across `world_size` ranks.
    pub fn compute(indptr: &[EdgeOffset], world_size: usize, balance: Balance) -> Result<Self> {
        if world_size == 0 {
            return Err(Error::InvalidDistribution("world size must be at least 1".into()));
        }
        if indptr.is_empty() {
            return Err(Error::InvalidGraph("indptr must hold at least one offset".into()));
        }
        let num_nodes = (indptr.len() - 1) as VertexId;
        let num_edges = indptr[indptr.len() - 1];
        let ranks = world_size as u64;

        let mut bounds = Vec::with_capacity(world_size + 1);
        bounds.push(0);
        for r in 0..ranks {
            let bound = if r == ranks - 1 {
                num_nodes
            } else {
                match balance {
                    Balance::Vertices => num_nodes / ranks * (r + 1),
                    Balance::Edges => {
                        let target = num_edges / ranks * (r + 1);
                        indptr.partition_point(|&offset| offset < target) as VertexId
                    }
                }
            };
            bounds.push(bound);
        }

        Self::from_bounds(bounds, num_nodes as usize)
            .map_err(|e| Error::InvalidDistribution(format!("internal error computing ranges: {e}")))
    }

    /// Wrap boundaries received from elsewhere, checking every invariant.
    pub fn from_bounds(bounds: Vec<VertexId>, num_nodes: usize) -> Result<Self> {
        if bounds.len() < 2 {
            return Err(Error::InvalidDistribution(format!("{} boundaries, need at least 2", bounds.len())));
        }
        if bounds[0] != 0 {
            return Err(Error::InvalidDistribution(format!("first boundary is {}, expected 0", bounds[0])));
        }
        if bounds[bounds.len() - 1] != num_nodes as VertexId {
            return Err(Error::InvalidDistribution(format!(
                "last boundary is {}, expected {num_nodes}", bounds[bounds.len() - 1]
            )));
        }
        if let Some(pos) = bounds.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::InvalidDistribution(format!("boundaries decrease at rank {pos}")));
        }
        Ok(Self { bounds })
    }

    /// Number of ranks covered.
    #[inline] pub fn world_size(&self) -> usize { self.bounds.len() - 1 }

    /// Total number of vertices covered.
    #[inline] pub fn vertex_count(&self) -> usize { self.bounds[self.bounds.len() - 1] as usize }

    #[inline] pub fn bounds(&self) -> &[VertexId] { &self.bounds }

    /// Vertices owned by `rank`.
    pub fn owned(&self, rank: usize) -> Result<Range<usize>> {
        if rank >= self.world_size() {
            return Err(Error::ProtocolCoverage { rank, covered: self.world_size() });
        }
        Ok(self.bounds[rank] as usize..self.bounds[rank + 1] as usize)
    }

    pub fn owned_count(&self, rank: usize) -> Result<usize> {
        self.owned(rank).map(|r| r.len())
    }

    /// Rank owning vertex `v`.
    pub fn owner_of(&self, v: usize) -> Result<usize> {
        if v >= self.vertex_count() {
            return Err(Error::OutOfRange { vertex: v, count: self.vertex_count() });
        }
        // Last rank whose range starts at or before v; empty ranges are skipped.
        Ok(self.bounds.partition_point(|&b| b <= v as VertexId) - 1)
    }
}

/// Edge-slot ranges owned by each rank (`edgedist`), derived from a vertex distribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeDistribution {
    bounds: Vec<EdgeOffset>,
}

impl EdgeDistribution {
    /// `edgedist[r] = indptr[vtxdist[r]]`, ending with the total edge count.
    pub fn from_indptr(vtxdist: &VertexDistribution, indptr: &[EdgeOffset]) -> Result<Self> {
        if indptr.len() != vtxdist.vertex_count() + 1 {
            return Err(Error::InvalidDistribution(format!(
                "vtxdist covers {} vertices but indptr has {} entries",
                vtxdist.vertex_count(), indptr.len()
            )));
        }
        let bounds = vtxdist.bounds().iter().map(|&v| indptr[v as usize]).collect();
        Ok(Self { bounds })
    }

    /// Wrap boundaries received from elsewhere.
    pub fn from_bounds(bounds: Vec<EdgeOffset>, vtxdist: &VertexDistribution) -> Result<Self> {
        if bounds.len() != vtxdist.world_size() + 1 {
            return Err(Error::InvalidDistribution(format!(
                "{} edge boundaries for {} ranks", bounds.len(), vtxdist.world_size()
            )));
        }
        if bounds[0] != 0 || bounds.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidDistribution("edge boundaries must be non-decreasing from 0".into()));
        }
        Ok(Self { bounds })
    }

    #[inline] pub fn bounds(&self) -> &[EdgeOffset] { &self.bounds }

    #[inline] pub fn edge_count(&self) -> usize { self.bounds[self.bounds.len() - 1] as usize }

    /// Edge slots owned by `rank`.
    pub fn owned(&self, rank: usize) -> Result<Range<usize>> {
        if rank + 1 >= self.bounds.len() {
            return Err(Error::ProtocolCoverage { rank, covered: self.bounds.len() - 1 });
        }
        Ok(self.bounds[rank] as usize..self.bounds[rank + 1] as usize)
    }

    pub fn owned_count(&self, rank: usize) -> Result<usize> {
        self.owned(rank).map(|r| r.len())
    }
}
