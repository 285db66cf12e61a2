use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Error, Result};
use crate::graph::Weight;

/// Per-vertex weights stored as an `(n, ncon)` matrix, one column per balance constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeWeights {
    values: Array2<Weight>,
}

impl NodeWeights {
    /// Build from a flat row-major array holding `num_nodes * ncon` values.
    pub fn from_flat(values: Vec<Weight>, num_nodes: usize) -> Result<Self> {
        if num_nodes == 0 {
            if !values.is_empty() {
                return Err(Error::InvalidWeights(format!(
                    "{} node weights for an empty graph", values.len()
                )));
            }
            return Ok(Self { values: Array2::zeros((0, 1)) });
        }
        if values.len() % num_nodes != 0 || values.is_empty() {
            return Err(Error::InvalidWeights(format!(
                "node weight length {} is not a positive multiple of vertex count {}",
                values.len(), num_nodes
            )));
        }
        let ncon = values.len() / num_nodes;
        let values = Array2::from_shape_vec((num_nodes, ncon), values)
            .map_err(|e| Error::InvalidWeights(e.to_string()))?;
        Ok(Self { values })
    }

    /// Number of weighted vertices.
    #[inline] pub fn len(&self) -> usize { self.values.nrows() }

    #[inline] pub fn is_empty(&self) -> bool { self.values.nrows() == 0 }

    /// Number of weights carried by every vertex.
    #[inline] pub fn ncon(&self) -> usize { self.values.ncols() }

    /// Get the weights of one vertex.
    #[inline] pub fn row(&self, node: usize) -> ArrayView1<'_, Weight> { self.values.row(node) }

    /// Flat row-major weights of a contiguous vertex range.
    pub fn rows(&self, nodes: std::ops::Range<usize>) -> &[Weight] {
        let ncon = self.ncon();
        &self.as_flat()[nodes.start * ncon..nodes.end * ncon]
    }

    /// Flat row-major view of every weight.
    #[inline]
    pub fn as_flat(&self) -> &[Weight] {
        // Built from a standard-layout vec and never transposed.
        self.values.as_slice().unwrap_or(&[])
    }

    /// Sum of every column.
    pub fn column_sums(&self) -> Vec<Weight> {
        self.values.sum_axis(Axis(0)).to_vec()
    }

    pub fn into_flat(self) -> Vec<Weight> {
        self.values.into_raw_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_infers_ncon() {
        let weights = NodeWeights::from_flat(vec![1, 2, 3, 4, 5, 6], 3).unwrap();
        assert_eq!(weights.len(), 3);
        assert_eq!(weights.ncon(), 2);
        assert_eq!(weights.row(1).to_vec(), vec![3, 4]);
        assert_eq!(weights.rows(1..3), &[3, 4, 5, 6]);
        assert_eq!(weights.column_sums(), vec![9, 12]);
    }

    #[test]
    fn from_flat_rejects_ragged_length() {
        assert!(matches!(NodeWeights::from_flat(vec![1, 2, 3], 2), Err(Error::InvalidWeights(_))));
        assert!(matches!(NodeWeights::from_flat(vec![], 2), Err(Error::InvalidWeights(_))));
    }

    #[test]
    fn empty_graph_accepts_only_empty_weights() {
        assert!(NodeWeights::from_flat(vec![], 0).unwrap().is_empty());
        assert!(NodeWeights::from_flat(vec![1], 0).is_err());
    }
}
