//! Dense tensors.

use ndarray::{Array, Array2, ArrayD, Dimension};

use super::DType;
use crate::error::{ColumnError, Result};

/// A dense, n-dimensional tensor of one element type.
///
/// The leading axis is the batch axis whenever a tensor represents one
/// feature for a batch of examples.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    String(ArrayD<String>),
}

impl Tensor {
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::Float32(_) => DType::Float32,
            Tensor::Float64(_) => DType::Float64,
            Tensor::Int32(_) => DType::Int32,
            Tensor::Int64(_) => DType::Int64,
            Tensor::String(_) => DType::String,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Float32(a) => a.shape(),
            Tensor::Float64(a) => a.shape(),
            Tensor::Int32(a) => a.shape(),
            Tensor::Int64(a) => a.shape(),
            Tensor::String(a) => a.shape(),
        }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert numeric elements to `f32`. Returns `None` for string tensors.
    pub fn to_f32(&self) -> Option<ArrayD<f32>> {
        match self {
            Tensor::Float32(a) => Some(a.clone()),
            Tensor::Float64(a) => Some(a.mapv(|v| v as f32)),
            Tensor::Int32(a) => Some(a.mapv(|v| v as f32)),
            Tensor::Int64(a) => Some(a.mapv(|v| v as f32)),
            Tensor::String(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Tensor::Float32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            Tensor::Int64(a) => Some(a),
            _ => None,
        }
    }
}

impl<D: Dimension> From<Array<f32, D>> for Tensor {
    fn from(a: Array<f32, D>) -> Self {
        Tensor::Float32(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<f64, D>> for Tensor {
    fn from(a: Array<f64, D>) -> Self {
        Tensor::Float64(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<i32, D>> for Tensor {
    fn from(a: Array<i32, D>) -> Self {
        Tensor::Int32(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<i64, D>> for Tensor {
    fn from(a: Array<i64, D>) -> Self {
        Tensor::Int64(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<String, D>> for Tensor {
    fn from(a: Array<String, D>) -> Self {
        Tensor::String(a.into_dyn())
    }
}

impl<'a, D: Dimension> From<Array<&'a str, D>> for Tensor {
    fn from(a: Array<&'a str, D>) -> Self {
        Tensor::String(a.mapv(str::to_owned).into_dyn())
    }
}

/// Reshape a batch-major tensor into `[batch, width]`.
///
/// The batch size is the tensor's leading dimension. Fails with
/// [`ColumnError::ShapeMismatch`] when the element count is not
/// `batch * width`.
pub(crate) fn flatten_batch(values: &ArrayD<f32>, width: usize, column: &str) -> Result<Array2<f32>> {
    let Some(&batch) = values.shape().first() else {
        return Err(ColumnError::shape(column, "expected a tensor with a batch dimension, got a scalar"));
    };
    let expected = batch * width;
    if values.len() != expected {
        return Err(ColumnError::shape(
            column,
            format!(
                "cannot reshape tensor of {} values into [{batch}, {width}]: requested shape has {expected}",
                values.len()
            ),
        ));
    }
    let flat: Vec<f32> = values.iter().copied().collect();
    Array2::from_shape_vec((batch, width), flat).map_err(|e| ColumnError::shape(column, e.to_string()))
}
