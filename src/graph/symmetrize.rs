//! Conversion of a directed CSR graph into an undirected one.
//!
//! Every edge `(v, u)` is emitted in both directions, the candidates are
//! sorted by `(src, dst)`, and equal keys are merged by summing their
//! weights. A pair present in both directions therefore ends up with
//! `w(v, u) + w(u, v)` on both sides.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{CsrGraph, EdgeOffset, VertexId, Weight, compact::{exclusive_scan, expand_indptr}, csr::validate_csr};

/// A candidate undirected edge. Ordering and equality ignore the weight.
#[derive(Clone, Copy, Debug, Default)]
struct Candidate {
    src: VertexId,
    dst: VertexId,
    weight: Weight,
}

impl Candidate {
    #[inline] fn key(&self) -> (VertexId, VertexId) { (self.src, self.dst) }
    #[inline] fn is_loop(&self) -> bool { self.src == self.dst }
}

/// Offsets, neighbors and (when the input was weighted) merged weights of an undirected graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Symmetrized {
    pub indptr: Vec<EdgeOffset>,
    pub indices: Vec<VertexId>,
    pub weights: Option<Vec<Weight>>,
}

/// Symmetrize raw CSR arrays. Edge weights whose length differs from the
/// number of indices are treated as absent.
pub fn symmetrize(indptr: &[EdgeOffset], indices: &[VertexId], edge_weights: Option<&[Weight]>) -> Result<Symmetrized> {
    validate_csr(indptr, indices)?;
    let num_nodes = indptr.len() - 1;

    let edge_weights = match edge_weights {
        Some(w) if w.len() == indices.len() => Some(w),
        Some(w) => {
            warn!("[symmetrize] ignoring {} edge weights for {} edges", w.len(), indices.len());
            None
        }
        None => None,
    };
    info!("[symmetrize] vertices: {num_nodes} | edges: {}", indices.len());

    // 1. Two candidates per edge slot, each slot pair written by exactly one task.
    let sources = expand_indptr(indptr);
    let mut candidates = vec![Candidate::default(); indices.len() * 2];
    candidates.par_chunks_mut(2).enumerate().for_each(|(i, pair)| {
        let (v, u) = (sources[i], indices[i]);
        let weight = edge_weights.map_or(0, |w| w[i]);
        pair[0] = Candidate { src: v, dst: u, weight };
        pair[1] = Candidate { src: u, dst: v, weight };
    });
    drop(sources);

    // 2. Group every (src, dst) pair, both input directions included.
    debug!("[symmetrize] sorting {} candidates", candidates.len());
    candidates.par_sort_unstable_by_key(Candidate::key);

    // 3. Merge duplicates into the first occurrence.
    let mut overflow = None;
    candidates.dedup_by(|later, kept| {
        if later.key() != kept.key() {
            return false;
        }
        match kept.weight.checked_add(later.weight) {
            Some(sum) => kept.weight = sum,
            None => { overflow.get_or_insert(kept.key()); }
        }
        true
    });
    if let Some((v, u)) = overflow {
        return Err(Error::InvalidWeights(format!("merged weight of edge ({v}, {u}) overflows")));
    }

    // 4. Drop self-loops, both the input's and the mirrored ones.
    candidates.retain(|c| !c.is_loop());
    candidates.shrink_to_fit();
    let num_edges = candidates.len();

    // 5. Degree histogram, offsets, then per-slot extraction.
    debug!("[symmetrize] computing degrees");
    let histogram: Vec<AtomicU64> = (0..num_nodes).map(|_| AtomicU64::new(0)).collect();
    candidates.par_iter().for_each(|c| {
        histogram[c.src as usize].fetch_add(1, Ordering::Relaxed);
    });
    let degrees: Vec<EdgeOffset> = histogram.into_iter().map(AtomicU64::into_inner).collect();
    let new_indptr = exclusive_scan(&degrees);

    let actual = new_indptr.last().copied().unwrap_or(0);
    if actual != num_edges as EdgeOffset {
        return Err(Error::CompactionMismatch { expected: num_edges as u64, actual });
    }

    let new_indices = candidates.par_iter().map(|c| c.dst).collect();
    let new_weights = edge_weights.map(|_| candidates.par_iter().map(|c| c.weight).collect());
    info!("[symmetrize] edges after conversion: {num_edges}");

    Ok(Symmetrized { indptr: new_indptr, indices: new_indices, weights: new_weights })
}

impl CsrGraph {
    /// Build the undirected version of this graph; node weights are carried over.
    pub fn symmetrized(&self) -> Result<CsrGraph> {
        let sym = symmetrize(self.indptr(), self.indices(), self.edge_weights())?;
        CsrGraph::from_parts(sym.indptr, sym.indices, self.node_weights().cloned(), sym.weights)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn edge_set(graph: &CsrGraph) -> BTreeSet<(usize, VertexId)> {
        (0..graph.vertex_count())
            .flat_map(|v| graph.neighbors(v).unwrap().iter().map(move |&u| (v, u)))
            .collect()
    }

    fn weight_map(graph: &CsrGraph) -> BTreeMap<(usize, VertexId), Weight> {
        (0..graph.vertex_count())
            .flat_map(|v| graph.neighbors_with_weights(v).unwrap().map(move |(u, w)| ((v, u), w)))
            .collect()
    }

    fn random_graph(rng: &mut StdRng, num_nodes: usize, max_degree: usize) -> CsrGraph {
        let mut indptr = vec![0];
        let mut indices = vec![];
        let mut weights = vec![];
        for _ in 0..num_nodes {
            for _ in 0..rng.random_range(0..=max_degree) {
                indices.push(rng.random_range(0..num_nodes) as VertexId);
                weights.push(rng.random_range(1..10));
            }
            indptr.push(indices.len() as EdgeOffset);
        }
        CsrGraph::with_weights(indptr, indices, None, Some(weights)).unwrap()
    }

    #[test]
    fn directed_graph_becomes_undirected() {
        let graph = CsrGraph::new(vec![0, 2, 3, 3, 5, 6], vec![1, 2, 2, 0, 1, 0]).unwrap();
        let sym = graph.symmetrized().unwrap();

        assert_eq!(sym.indptr(), &[0, 4, 7, 9, 11, 12]);
        assert_eq!(sym.neighbors(0).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(sym.neighbors(1).unwrap(), &[0, 2, 3]);
        assert_eq!(sym.neighbors(2).unwrap(), &[0, 1]);
        assert_eq!(sym.neighbors(3).unwrap(), &[0, 1]);
        assert_eq!(sym.neighbors(4).unwrap(), &[0]);
        assert!(sym.edge_weights().is_none());
    }

    #[test]
    fn self_loops_are_removed() {
        let graph = CsrGraph::new(vec![0, 2, 3], vec![0, 1, 1]).unwrap();
        let sym = graph.symmetrized().unwrap();
        assert_eq!(sym.indptr(), &[0, 1, 2]);
        assert_eq!(sym.indices(), &[1, 0]);
    }

    #[test]
    fn reciprocal_weights_are_summed() {
        // 0 -> 1 (3), 1 -> 0 (4), 1 -> 2 (5)
        let graph = CsrGraph::with_weights(vec![0, 1, 3, 3], vec![1, 0, 2], None, Some(vec![3, 4, 5])).unwrap();
        let sym = graph.symmetrized().unwrap();

        assert_eq!(sym.indptr(), &[0, 1, 3, 4]);
        assert_eq!(sym.indices(), &[1, 0, 2, 1]);
        assert_eq!(sym.edge_weights().unwrap(), &[7, 7, 5, 5]);
    }

    #[test]
    fn duplicate_edges_are_summed() {
        // 0 -> 1 twice (2, 3), 1 -> 0 (4)
        let sym = symmetrize(&[0, 2, 3], &[1, 1, 0], Some(&[2, 3, 4])).unwrap();
        assert_eq!(sym.indptr, vec![0, 1, 2]);
        assert_eq!(sym.indices, vec![1, 0]);
        assert_eq!(sym.weights, Some(vec![9, 9]));
    }

    #[test]
    fn merged_weight_overflow_is_an_error() {
        let big = Weight::MAX / 2 + 1;
        let err = symmetrize(&[0, 1, 2], &[1, 0], Some(&[big, big])).unwrap_err();
        assert!(matches!(err, Error::InvalidWeights(_)));
    }

    #[test]
    fn misaligned_weights_are_treated_as_absent() {
        let sym = symmetrize(&[0, 1, 1], &[1], Some(&[1, 2, 3])).unwrap();
        assert_eq!(sym.indices, vec![1, 0]);
        assert!(sym.weights.is_none());
    }

    #[test]
    fn empty_graphs_are_valid() {
        let sym = symmetrize(&[0], &[], None).unwrap();
        assert_eq!(sym.indptr, vec![0]);

        let sym = symmetrize(&[0, 0, 0], &[], Some(&[])).unwrap();
        assert_eq!(sym.indptr, vec![0, 0, 0]);
        assert_eq!(sym.weights, Some(vec![]));
    }

    #[test]
    fn node_weights_pass_through() {
        let graph = CsrGraph::with_weights(vec![0, 1, 1], vec![1], Some(vec![2, 3]), None).unwrap();
        let sym = graph.symmetrized().unwrap();
        assert_eq!(sym.node_weights(), graph.node_weights());
    }

    #[test]
    fn random_graphs_are_symmetric_and_idempotent() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let graph = random_graph(&mut rng, 50, 6);
            let once = graph.symmetrized().unwrap();
            let twice = once.symmetrized().unwrap();
            assert_eq!(edge_set(&once), edge_set(&twice));

            let input = weight_map(&graph);
            let edges = edge_set(&once);
            for (v, u) in &edges {
                assert_ne!(*v as VertexId, *u);
                assert!(edges.contains(&(*u as usize, *v as VertexId)));
            }
            // Every non-loop input edge survives, in both directions.
            for &(v, u) in input.keys() {
                if v as VertexId != u {
                    assert!(edges.contains(&(v, u)) && edges.contains(&(u as usize, v as VertexId)));
                }
            }
        }
    }

    #[test]
    fn merged_weight_is_sum_of_both_directions() {
        let mut rng = StdRng::seed_from_u64(7);
        // Distinct targets per vertex so each direction has a single weight.
        let num_nodes = 30;
        let mut indptr = vec![0];
        let mut indices = vec![];
        let mut weights = vec![];
        for v in 0..num_nodes {
            for u in 0..num_nodes {
                if u != v && rng.random_bool(0.2) {
                    indices.push(u as VertexId);
                    weights.push(rng.random_range(1..100));
                }
            }
            indptr.push(indices.len() as EdgeOffset);
        }
        let graph = CsrGraph::with_weights(indptr, indices, None, Some(weights)).unwrap();
        let input = weight_map(&graph);
        let sym = weight_map(&graph.symmetrized().unwrap());

        for (&(v, u), &w) in &sym {
            let forward = input.get(&(v, u)).copied().unwrap_or(0);
            let backward = input.get(&(u as usize, v as VertexId)).copied().unwrap_or(0);
            assert_eq!(w, forward + backward);
        }
    }
}
