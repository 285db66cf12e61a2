use tracing::{info, warn};

use crate::error::Result;
use crate::graph::{CsrGraph, EdgeOffset, VertexId, Weight, compact::prune_nonpositive_edges, symmetrize::symmetrize};

/// Preprocessing stages applied to a freshly loaded dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Convert the graph to an undirected one.
    pub symmetrize: bool,
    /// Drop edges with non-positive weight. Runs before symmetrization.
    pub prune_zero_weights: bool,
}

/// Raw CSR arrays as read from storage. Empty weight arrays mean "absent".
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub indptr: Vec<EdgeOffset>,
    pub indices: Vec<VertexId>,
    pub node_weight: Vec<Weight>,
    pub edge_weight: Vec<Weight>,
}

impl Dataset {
    fn node_weight(&self) -> Option<Vec<Weight>> {
        (!self.node_weight.is_empty()).then(|| self.node_weight.clone())
    }

    /// Turn the raw arrays into a validated graph, running the requested stages.
    pub fn prepare(self, options: PrepareOptions) -> Result<CsrGraph> {
        let weights_aligned = !self.edge_weight.is_empty() && self.edge_weight.len() == self.indices.len();
        if !self.edge_weight.is_empty() && !weights_aligned {
            warn!(
                "[dataset] {} edge weights for {} edges",
                self.edge_weight.len(), self.indices.len()
            );
        }

        if options.symmetrize && !weights_aligned {
            // Misaligned weights are dropped rather than rejected when converting.
            let sym = symmetrize(&self.indptr, &self.indices, None)?;
            if options.prune_zero_weights {
                warn!("[dataset] skipping zero-weight pruning without aligned edge weights");
            }
            return CsrGraph::with_weights(sym.indptr, sym.indices, self.node_weight(), None);
        }

        let node_weight = self.node_weight();
        let edge_weight = (!self.edge_weight.is_empty()).then_some(self.edge_weight);
        let mut graph = CsrGraph::with_weights(self.indptr, self.indices, node_weight, edge_weight)?;

        if options.prune_zero_weights {
            if graph.edge_weights().is_some() {
                graph = prune_nonpositive_edges(graph)?;
            } else {
                warn!("[dataset] no edge weights to prune");
            }
        }
        if options.symmetrize {
            graph = graph.symmetrized()?;
        }

        info!(
            "[dataset] prepared graph: {} vertices, {} edges, ncon={}, edge weights: {}",
            graph.vertex_count(), graph.edge_count(), graph.ncon(), graph.edge_weights().is_some()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn make_dataset() -> Dataset {
        Dataset {
            indptr: vec![0, 2, 3, 3],
            indices: vec![1, 2, 2],
            node_weight: vec![1, 1, 1],
            edge_weight: vec![0, 4, 6],
        }
    }

    #[test]
    fn raw_dataset_is_validated_unchanged() {
        let graph = make_dataset().prepare(PrepareOptions::default()).unwrap();
        assert_eq!(graph.indices(), &[1, 2, 2]);
        assert_eq!(graph.edge_weights().unwrap(), &[0, 4, 6]);
        assert_eq!(graph.ncon(), 1);
    }

    #[test]
    fn pruning_runs_before_symmetrization() {
        let options = PrepareOptions { symmetrize: true, prune_zero_weights: true };
        let graph = make_dataset().prepare(options).unwrap();

        // The zero-weight edge 0 -> 1 is gone before it can be mirrored.
        assert_eq!(graph.indptr(), &[0, 1, 2, 4]);
        assert_eq!(graph.indices(), &[2, 2, 0, 1]);
        assert_eq!(graph.edge_weights().unwrap(), &[4, 6, 4, 6]);
    }

    #[test]
    fn misaligned_weights_are_dropped_when_symmetrizing() {
        let dataset = Dataset { edge_weight: vec![1], ..make_dataset() };
        let options = PrepareOptions { symmetrize: true, prune_zero_weights: true };
        let graph = dataset.prepare(options).unwrap();
        assert!(graph.edge_weights().is_none());
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn misaligned_weights_are_rejected_without_symmetrization() {
        let dataset = Dataset { edge_weight: vec![1], ..make_dataset() };
        assert!(matches!(dataset.prepare(PrepareOptions::default()), Err(Error::InvalidWeights(_))));
    }
}
