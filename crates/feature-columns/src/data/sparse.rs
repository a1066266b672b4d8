//! Sparse tensors in coordinate (COO) form.

use ndarray::{Array2, ArrayView1};

use super::Tensor;
use crate::error::{ColumnError, Result};

/// Sparse tensor: `indices[k]` is the coordinate of `values[k]`.
///
/// For feature data the first coordinate is the example (row) index and
/// `dense_shape[0]` is the batch size.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    indices: Array2<usize>,
    values: Tensor,
    dense_shape: Vec<usize>,
}

impl SparseTensor {
    /// Create a sparse tensor, validating that the three parts agree.
    ///
    /// # Errors
    ///
    /// [`ColumnError::ShapeMismatch`] if `values` is not one-dimensional, the
    /// number of index rows differs from the number of values, the index rank
    /// differs from the dense rank, an index lies outside `dense_shape`, or
    /// `dense_shape` is empty.
    pub fn new(indices: Array2<usize>, values: impl Into<Tensor>, dense_shape: Vec<usize>) -> Result<Self> {
        let values = values.into();
        if dense_shape.is_empty() {
            return Err(ColumnError::shape("sparse tensor", "dense shape must have a batch dimension"));
        }
        if values.ndim() != 1 {
            return Err(ColumnError::shape(
                "sparse tensor",
                format!("values must be one-dimensional, got shape {:?}", values.shape()),
            ));
        }
        if indices.nrows() != values.len() {
            return Err(ColumnError::shape(
                "sparse tensor",
                format!("{} index rows for {} values", indices.nrows(), values.len()),
            ));
        }
        if indices.ncols() != dense_shape.len() {
            return Err(ColumnError::shape(
                "sparse tensor",
                format!("indices have rank {}, dense shape has rank {}", indices.ncols(), dense_shape.len()),
            ));
        }
        for row in indices.rows() {
            if row.iter().zip(&dense_shape).any(|(&i, &d)| i >= d) {
                return Err(ColumnError::shape(
                    "sparse tensor",
                    format!("index {:?} out of bounds for dense shape {:?}", row.to_vec(), dense_shape),
                ));
            }
        }
        Ok(Self {
            indices,
            values,
            dense_shape,
        })
    }

    /// Build from row-major coordinate pairs `(example, position)`.
    pub fn from_coords(coords: &[[usize; 2]], values: impl Into<Tensor>, dense_shape: [usize; 2]) -> Result<Self> {
        let flat: Vec<usize> = coords.iter().flatten().copied().collect();
        let indices = Array2::from_shape_vec((coords.len(), 2), flat)
            .map_err(|e| ColumnError::shape("sparse tensor", e.to_string()))?;
        Self::new(indices, values, dense_shape.to_vec())
    }

    /// Build without validation; callers guarantee the invariants.
    pub(crate) fn from_parts(indices: Array2<usize>, values: Tensor, dense_shape: Vec<usize>) -> Self {
        debug_assert_eq!(indices.nrows(), values.len());
        debug_assert_eq!(indices.ncols(), dense_shape.len());
        Self {
            indices,
            values,
            dense_shape,
        }
    }

    #[inline]
    pub fn indices(&self) -> &Array2<usize> {
        &self.indices
    }

    #[inline]
    pub fn values(&self) -> &Tensor {
        &self.values
    }

    #[inline]
    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Leading dense dimension, or 0 for a rank-0 shape.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.dense_shape.first().copied().unwrap_or(0)
    }

    /// Coordinate of entry `k`.
    #[inline]
    pub fn index(&self, k: usize) -> ArrayView1<'_, usize> {
        self.indices.row(k)
    }

    /// Same coordinates and shape with replacement values.
    #[cfg(test)]
    pub(crate) fn with_values(&self, values: Tensor) -> Self {
        Self::from_parts(self.indices.clone(), values, self.dense_shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn from_coords_builds_two_dimensional_indices() {
        let sp = SparseTensor::from_coords(&[[0, 0], [1, 0], [1, 1]], array!["omar", "stringer", "marlo"], [2, 2])
            .unwrap();
        assert_eq!(sp.nnz(), 3);
        assert_eq!(sp.batch_size(), 2);
        assert_eq!(sp.index(2).to_vec(), vec![1, 1]);
    }

    #[test]
    fn rejects_rank_zero_shape() {
        let err = SparseTensor::new(Array2::<usize>::zeros((1, 0)), array!["omar"], vec![]).unwrap_err();
        assert!(matches!(err, ColumnError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let err = SparseTensor::from_coords(&[[2, 0]], array![1i64], [2, 2]).unwrap_err();
        assert!(matches!(err, ColumnError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_count_mismatch() {
        let err = SparseTensor::from_coords(&[[0, 0], [1, 0]], array![1i64], [2, 1]).unwrap_err();
        assert!(matches!(err, ColumnError::ShapeMismatch { .. }));
    }
}
