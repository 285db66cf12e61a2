use tracing::debug;

use crate::dist::{LocalShard, VertexDistribution};
use crate::error::{Error, Result};
use crate::partition::PartId;

/// Quantity the partitioner minimizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    EdgeCut,
    #[default]
    CommunicationVolume,
}

/// Tuning knobs forwarded to a partition engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PartitionOptions {
    pub num_partitions: u32,
    pub num_iterations: u32,
    pub num_init_parts: u32,
    /// Allowed ratio of the heaviest part to the mean part.
    pub imbalance: f64,
    pub objective: Objective,
    pub seed: u64,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            num_partitions: 4,
            num_iterations: 10,
            num_init_parts: 1,
            imbalance: 1.05,
            objective: Objective::CommunicationVolume,
            seed: 42,
        }
    }
}

impl PartitionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.num_partitions == 0 {
            return Err(Error::PartitionerInput("num_partitions must be at least 1".into()));
        }
        if self.num_iterations == 0 {
            return Err(Error::PartitionerInput("num_iterations must be at least 1".into()));
        }
        if self.num_init_parts == 0 {
            return Err(Error::PartitionerInput("num_init_parts must be at least 1".into()));
        }
        if !(1.0..=self.num_partitions as f64).contains(&self.imbalance) {
            return Err(Error::PartitionerInput(format!(
                "imbalance {} must lie in [1, {}]", self.imbalance, self.num_partitions
            )));
        }
        Ok(())
    }
}

/// Everything a rank hands to its engine.
#[derive(Clone, Copy, Debug)]
pub struct PartitionRequest<'a> {
    pub options: &'a PartitionOptions,
    pub vtxdist: &'a VertexDistribution,
    pub shard: &'a LocalShard,
}

impl PartitionRequest<'_> {
    /// Check that the shard is the block `vtxdist` assigns to it.
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        let vertices = self.shard.vertices();
        let owned = (0..self.vtxdist.world_size())
            .any(|r| self.vtxdist.owned(r).is_ok_and(|range| range == vertices));
        if !owned {
            return Err(Error::PartitionerInput(format!(
                "shard covering vertices {:?} is not a range of vtxdist {:?}",
                self.shard.vertices(), self.vtxdist.bounds()
            )));
        }
        Ok(())
    }
}

/// A graph partitioner running on one rank's shard.
///
/// Every rank calls `assign` with its own shard; the returned vector holds
/// one part id per owned vertex, in local order.
pub trait PartitionEngine: Send + Sync {
    fn name(&self) -> &str;

    fn assign(&self, request: &PartitionRequest<'_>) -> Result<Vec<PartId>>;
}

/// Splits the global vertex order into `k` equal blocks.
///
/// Vertex `g` goes to part `g * k / V`. The result does not depend on the
/// number of ranks, which makes it useful as a baseline and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockEngine;

impl PartitionEngine for BlockEngine {
    fn name(&self) -> &str { "block" }

    fn assign(&self, request: &PartitionRequest<'_>) -> Result<Vec<PartId>> {
        request.validate()?;
        let num_nodes = request.vtxdist.vertex_count() as u64;
        let k = request.options.num_partitions as u64;
        if num_nodes > 0 && k > num_nodes {
            return Err(Error::PartitionerInput(format!(
                "{k} partitions requested for {num_nodes} vertices"
            )));
        }

        let vertices = request.shard.vertices();
        debug!("[block] assigning vertices {vertices:?} to {k} parts");
        Ok(vertices.map(|g| (g as u64 * k / num_nodes) as PartId).collect())
    }
}

/// Check an engine's output: one id per vertex, every id below `num_partitions`.
pub fn check_assignment(parts: &[PartId], len: usize, num_partitions: u32) -> Result<()> {
    if parts.len() != len {
        return Err(Error::PartitionerInput(format!(
            "engine returned {} part ids for {len} vertices", parts.len()
        )));
    }
    if let Some((v, &p)) = parts.iter().enumerate().find(|&(_, &p)| p >= num_partitions) {
        return Err(Error::PartitionerInput(format!(
            "vertex {v} assigned to part {p}, only {num_partitions} parts exist"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::{Balance, EdgeDistribution};
    use crate::graph::CsrGraph;

    fn make_test_graph(num_nodes: usize) -> CsrGraph {
        let indptr = (0..=num_nodes as u64).collect();
        let indices = (0..num_nodes as u64).map(|v| (v + 1) % num_nodes as u64).collect();
        CsrGraph::new(indptr, indices).unwrap()
    }

    fn assign_all(graph: &CsrGraph, world_size: usize, options: &PartitionOptions) -> Result<Vec<PartId>> {
        let vtxdist = VertexDistribution::compute(graph.indptr(), world_size, Balance::Vertices)?;
        let edgedist = EdgeDistribution::from_indptr(&vtxdist, graph.indptr())?;
        let mut parts = Vec::new();
        for rank in 0..world_size {
            let shard = LocalShard::slice(graph, &vtxdist, &edgedist, rank)?;
            parts.extend(BlockEngine.assign(&PartitionRequest { options, vtxdist: &vtxdist, shard: &shard })?);
        }
        Ok(parts)
    }

    #[test]
    fn default_options() {
        let options = PartitionOptions::default();
        assert_eq!(options.num_partitions, 4);
        assert_eq!(options.num_iterations, 10);
        assert_eq!(options.num_init_parts, 1);
        assert_eq!(options.imbalance, 1.05);
        assert_eq!(options.objective, Objective::CommunicationVolume);
        assert_eq!(options.seed, 42);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn invalid_options() {
        let bad = [
            PartitionOptions { num_partitions: 0, ..Default::default() },
            PartitionOptions { num_iterations: 0, ..Default::default() },
            PartitionOptions { num_init_parts: 0, ..Default::default() },
            PartitionOptions { imbalance: 0.9, ..Default::default() },
            PartitionOptions { imbalance: 4.5, ..Default::default() },
        ];
        for options in bad {
            assert!(matches!(options.validate(), Err(Error::PartitionerInput(_))));
        }
    }

    #[test]
    fn block_assignment_is_independent_of_rank_count() {
        let graph = make_test_graph(10);
        let options = PartitionOptions { num_partitions: 3, ..Default::default() };
        let expected = vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2];
        for world_size in 1..=4 {
            assert_eq!(assign_all(&graph, world_size, &options).unwrap(), expected);
        }
        assert!(check_assignment(&expected, 10, 3).is_ok());
    }

    #[test]
    fn block_rejects_more_parts_than_vertices() {
        let graph = make_test_graph(3);
        let options = PartitionOptions { num_partitions: 4, ..Default::default() };
        assert!(matches!(assign_all(&graph, 1, &options), Err(Error::PartitionerInput(_))));
    }

    #[test]
    fn mismatched_shard_is_rejected() {
        let graph = make_test_graph(6);
        let options = PartitionOptions { num_partitions: 2, ..Default::default() };
        let vtxdist = VertexDistribution::from_bounds(vec![0, 3, 6], 6).unwrap();
        let shard = LocalShard::whole(&graph).unwrap();
        let request = PartitionRequest { options: &options, vtxdist: &vtxdist, shard: &shard };
        assert!(matches!(BlockEngine.assign(&request), Err(Error::PartitionerInput(_))));
    }

    #[test]
    fn check_assignment_catches_bad_output() {
        assert!(check_assignment(&[0, 1], 3, 2).is_err());
        assert!(check_assignment(&[0, 2, 1], 3, 2).is_err());
        assert!(check_assignment(&[], 0, 1).is_ok());
    }
}
