use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{CsrGraph, Weight};
use crate::partition::{PartId, check_assignment};

/// Quality summary of a partition map.
///
/// Directed inputs are measured on their symmetrized view, so an edge
/// stored in one direction only is still counted once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionReport {
    pub num_partitions: u32,
    pub num_vertices: usize,
    pub num_edges: usize,
    /// Total weight of edges whose endpoints lie in different parts.
    pub edge_cut: Weight,
    /// Sum over vertices of the number of distinct foreign parts among their neighbors.
    pub communication_volume: u64,
    pub part_sizes: Vec<usize>,
    /// Largest part size over the mean part size.
    pub imbalance: f64,
    /// Mean edge weight; 1 for unweighted graphs.
    pub edge_weight_scale: f64,
}

impl PartitionReport {
    /// Evaluate `parts` (one id per vertex) against `graph`.
    pub fn evaluate(graph: &CsrGraph, parts: &[PartId], num_partitions: u32) -> Result<Self> {
        check_assignment(parts, graph.vertex_count(), num_partitions)?;

        let (cut, volume) = match graph.is_symmetric() {
            true => cut_and_volume(graph, parts)?,
            false => {
                debug!("[report] graph is not symmetric, measuring its symmetrized view");
                cut_and_volume(&graph.symmetrized()?, parts)?
            }
        };

        let mut part_sizes = vec![0; num_partitions as usize];
        for &p in parts {
            part_sizes[p as usize] += 1;
        }
        let mean = graph.vertex_count() as f64 / num_partitions as f64;
        let largest = part_sizes.iter().copied().max().unwrap_or(0);
        let imbalance = if mean > 0.0 { largest as f64 / mean } else { 1.0 };

        let edge_weight_scale = match graph.edge_weights() {
            Some(w) if !w.is_empty() => w.iter().map(|&w| w as f64).sum::<f64>() / w.len() as f64,
            _ => 1.0,
        };

        Ok(Self {
            num_partitions,
            num_vertices: graph.vertex_count(),
            num_edges: graph.edge_count(),
            edge_cut: cut,
            communication_volume: volume,
            part_sizes,
            imbalance,
            edge_weight_scale,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn overflow() -> Error {
    Error::InvalidWeights("edge cut overflows".into())
}

/// Cut weight and communication volume of a symmetric graph.
fn cut_and_volume(graph: &CsrGraph, parts: &[PartId]) -> Result<(Weight, u64)> {
    let (cut, volume) = (0..graph.vertex_count())
        .into_par_iter()
        .map(|v| -> Result<(Weight, u64)> {
            let own = parts[v];
            let mut cut: Weight = 0;
            let mut foreign = BTreeSet::new();
            for (u, w) in graph.neighbors_with_weights(v)? {
                let other = parts[u as usize];
                if other != own {
                    cut = cut.checked_add(w).ok_or_else(overflow)?;
                    foreign.insert(other);
                }
            }
            Ok((cut, foreign.len() as u64))
        })
        .try_reduce(|| (0, 0), |a, b| Ok((a.0.checked_add(b.0).ok_or_else(overflow)?, a.1 + b.1)))?;

    // Each undirected edge is stored in both directions.
    Ok((cut / 2, volume))
}
