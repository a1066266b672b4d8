//! Raw input handling shared by the categorical columns.

use ndarray::{Array1, Array2};

use crate::data::{DType, Feature, SparseTensor, Tensor};
use crate::error::{ColumnError, Result};

/// Categorical values in raw input order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CategoricalValues {
    Strings(Vec<String>),
    Ints(Vec<i64>),
}

/// Raw categorical input as a 2-D coordinate list, padding removed.
#[derive(Debug, Clone)]
pub(crate) struct CategoricalInput {
    indices: Array2<usize>,
    dense_shape: Vec<usize>,
    values: CategoricalValues,
}

impl CategoricalInput {
    /// Check the raw dtype against `column_dtype` and normalize to sparse form.
    ///
    /// Dense input of rank 1 is one value per example; higher ranks are
    /// flattened to `[batch, positions]`. Padding (`""` or `-1`) is dropped.
    pub(crate) fn from_feature(raw: &Feature, column: &str, column_dtype: DType) -> Result<Self> {
        let raw_dtype = raw.dtype();
        let extract = |tensor: &Tensor| {
            values_of(tensor).ok_or_else(|| {
                ColumnError::dtype(column, format!("input dtype must be string or integer, got {raw_dtype}"))
            })
        };
        let values = match raw {
            Feature::Sparse(sparse) => extract(sparse.values())?,
            Feature::Dense(tensor) => extract(tensor)?,
        };
        if !column_dtype.is_compatible_with(raw_dtype) {
            return Err(ColumnError::dtype(
                column,
                format!("column dtype must be compatible with input dtype: {column_dtype} vs {raw_dtype}"),
            ));
        }

        match raw {
            Feature::Sparse(sparse) if sparse.dense_shape().is_empty() => {
                Err(ColumnError::shape(column, "categorical input must have a batch dimension"))
            }
            Feature::Sparse(sparse) => Ok(Self {
                indices: sparse.indices().clone(),
                dense_shape: sparse.dense_shape().to_vec(),
                values,
            }),
            Feature::Dense(tensor) => Self::from_dense(tensor.shape(), values, column),
        }
    }

    fn from_dense(shape: &[usize], all: CategoricalValues, column: &str) -> Result<Self> {
        let (batch, width) = match shape {
            [] => return Err(ColumnError::shape(column, "categorical input must have a batch dimension")),
            [batch] => (*batch, 1),
            [batch, rest @ ..] => (*batch, rest.iter().product()),
        };

        let mut indices = Vec::new();
        let values = match all {
            CategoricalValues::Strings(v) => CategoricalValues::Strings(
                keep_non_padding(v, width, &mut indices, |s: &String| s.is_empty()),
            ),
            CategoricalValues::Ints(v) => {
                CategoricalValues::Ints(keep_non_padding(v, width, &mut indices, |&i: &i64| i == -1))
            }
        };
        let nnz = indices.len() / 2;
        let indices =
            Array2::from_shape_vec((nnz, 2), indices).map_err(|e| ColumnError::shape(column, e.to_string()))?;
        Ok(Self {
            indices,
            dense_shape: vec![batch, width],
            values,
        })
    }

    /// Replace each value by its id, keeping coordinates.
    pub(crate) fn into_ids(
        self,
        mut string_id: impl FnMut(&str) -> i64,
        mut int_id: impl FnMut(i64) -> i64,
    ) -> SparseTensor {
        let ids: Vec<i64> = match &self.values {
            CategoricalValues::Strings(v) => v.iter().map(|s| string_id(s)).collect(),
            CategoricalValues::Ints(v) => v.iter().map(|&i| int_id(i)).collect(),
        };
        SparseTensor::from_parts(self.indices, Tensor::Int64(Array1::from(ids).into_dyn()), self.dense_shape)
    }
}

fn values_of(tensor: &Tensor) -> Option<CategoricalValues> {
    match tensor {
        Tensor::String(a) => Some(CategoricalValues::Strings(a.iter().cloned().collect())),
        Tensor::Int32(a) => Some(CategoricalValues::Ints(a.iter().map(|&v| i64::from(v)).collect())),
        Tensor::Int64(a) => Some(CategoricalValues::Ints(a.iter().copied().collect())),
        Tensor::Float32(_) | Tensor::Float64(_) => None,
    }
}

fn keep_non_padding<T>(
    values: Vec<T>,
    width: usize,
    indices: &mut Vec<usize>,
    is_padding: impl Fn(&T) -> bool,
) -> Vec<T> {
    let mut kept = Vec::with_capacity(values.len());
    for (k, value) in values.into_iter().enumerate() {
        if is_padding(&value) {
            continue;
        }
        indices.extend([k / width, k % width]);
        kept.push(value);
    }
    kept
}
