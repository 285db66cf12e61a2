//! Index compaction: rebuilding CSR offsets after dropping edge slots.

use rayon::prelude::*;
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{CsrGraph, EdgeOffset, VertexId, Weight, csr::validate_indptr};

/// Exclusive prefix sum of per-vertex degrees, `degrees.len() + 1` entries long.
pub(crate) fn exclusive_scan(degrees: &[EdgeOffset]) -> Vec<EdgeOffset> {
    std::iter::once(0).chain(
        degrees.iter().scan(0, |acc, &d| { *acc += d; Some(*acc) })
    ).collect()
}

/// Compute the offsets of the graph that keeps only the flagged edge slots.
pub fn compact_indptr(indptr: &[EdgeOffset], keep: &[bool]) -> Result<Vec<EdgeOffset>> {
    validate_indptr(indptr, keep.len())?;

    let mut degrees = vec![0 as EdgeOffset; indptr.len() - 1];
    degrees.par_iter_mut().enumerate().for_each(|(v, degree)| {
        let range = indptr[v] as usize..indptr[v + 1] as usize;
        *degree = keep[range].iter().filter(|&&k| k).count() as EdgeOffset;
    });
    let compacted = exclusive_scan(&degrees);

    let kept = keep.par_iter().filter(|&&k| k).count() as EdgeOffset;
    let actual = compacted.last().copied().unwrap_or(0);
    if actual != kept {
        return Err(Error::CompactionMismatch { expected: kept, actual });
    }
    Ok(compacted)
}

/// Get the source vertex of every edge slot.
pub fn expand_indptr(indptr: &[EdgeOffset]) -> Vec<VertexId> {
    let num_edges = indptr.last().copied().unwrap_or(0) as usize;
    let mut sources = vec![0 as VertexId; num_edges];

    let mut chunks = Vec::with_capacity(indptr.len().saturating_sub(1));
    let mut rest = sources.as_mut_slice();
    for w in indptr.windows(2) {
        let (head, tail) = rest.split_at_mut((w[1] - w[0]) as usize);
        chunks.push(head);
        rest = tail;
    }
    chunks.into_par_iter().enumerate().for_each(|(v, chunk)| chunk.fill(v as VertexId));

    sources
}

/// Count the strictly positive weights.
pub fn count_positive(weights: &[Weight]) -> usize {
    weights.par_iter().filter(|&&w| w > 0).count()
}

/// Drop every edge whose weight is not positive, preserving per-vertex edge order.
/// A graph without edge weights is returned unchanged.
pub fn prune_nonpositive_edges(graph: CsrGraph) -> Result<CsrGraph> {
    let Some(weights) = graph.edge_weights() else { return Ok(graph) };

    let total = weights.len();
    let kept = count_positive(weights);
    info!(
        "[compact] pruning zero-weight edges: {total} -> {kept} ({:.2}%)",
        if total == 0 { 100.0 } else { kept as f64 / total as f64 * 100.0 }
    );

    let keep: Vec<bool> = weights.par_iter().map(|&w| w > 0).collect();
    let new_indptr = compact_indptr(graph.indptr(), &keep)?;

    let (_, indices, node_weights, edge_weights) = graph.into_parts();
    let edge_weights = edge_weights.unwrap_or_default();
    let (new_indices, new_weights): (Vec<VertexId>, Vec<Weight>) = indices.into_iter()
        .zip(edge_weights)
        .zip(&keep)
        .filter_map(|(pair, &k)| k.then_some(pair))
        .unzip();

    CsrGraph::from_parts(new_indptr, new_indices, node_weights, Some(new_weights))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_true_mask_is_identity() {
        let indptr = vec![0, 2, 3, 3, 5, 6];
        let keep = vec![true; 6];
        assert_eq!(compact_indptr(&indptr, &keep).unwrap(), indptr);
    }

    #[test]
    fn compaction_counts_kept_edges_per_vertex() {
        let indptr = vec![0, 2, 3, 3, 5, 6];
        let keep = vec![true, false, false, true, true, true];
        assert_eq!(compact_indptr(&indptr, &keep).unwrap(), vec![0, 1, 1, 1, 3, 4]);
    }

    #[test]
    fn all_false_mask_empties_graph() {
        let indptr = vec![0, 2, 4];
        assert_eq!(compact_indptr(&indptr, &[false; 4]).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn mask_length_must_match_edge_count() {
        assert!(matches!(compact_indptr(&[0, 2], &[true]), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn expand_indptr_repeats_sources() {
        assert_eq!(expand_indptr(&[0, 2, 3, 3, 5, 6]), vec![0, 0, 1, 3, 3, 4]);
        assert!(expand_indptr(&[0]).is_empty());
    }

    #[test]
    fn count_positive_ignores_zero_and_negative() {
        assert_eq!(count_positive(&[3, 0, -1, 7, 0]), 2);
        assert_eq!(count_positive(&[]), 0);
    }

    #[test]
    fn prune_drops_nonpositive_edges_in_order() {
        let graph = CsrGraph::with_weights(
            vec![0, 3, 4, 6],
            vec![1, 2, 0, 2, 0, 1],
            Some(vec![5, 6, 7]),
            Some(vec![4, 0, 2, -1, 9, 3]),
        ).unwrap();

        let pruned = prune_nonpositive_edges(graph).unwrap();
        assert_eq!(pruned.indptr(), &[0, 2, 2, 4]);
        assert_eq!(pruned.indices(), &[1, 0, 0, 1]);
        assert_eq!(pruned.edge_weights().unwrap(), &[4, 2, 9, 3]);
        assert_eq!(pruned.node_weights().unwrap().as_flat(), &[5, 6, 7]);
    }

    #[test]
    fn prune_without_weights_is_noop() {
        let graph = CsrGraph::new(vec![0, 1, 2], vec![1, 0]).unwrap();
        assert_eq!(prune_nonpositive_edges(graph.clone()).unwrap(), graph);
    }
}
