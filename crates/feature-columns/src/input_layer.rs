//! Dense feature-vector assembly.

use std::sync::Arc;

use ndarray::{concatenate, Array2, Axis};

use crate::cache::TransformCache;
use crate::column::{check_unique_names, DenseColumn, FeatureColumn};
use crate::data::{flatten_batch, Features};
use crate::error::{ColumnError, Result};

/// Concatenate the flattened dense outputs of `columns` into `[batch, width]`.
///
/// Columns are laid out left to right in the given order; `width` is the sum
/// of their dense widths. No weights and no bias are involved.
///
/// # Errors
///
/// - [`ColumnError::Config`] if `columns` is empty or a column has no dense view
/// - [`ColumnError::DuplicateColumn`] if two columns share a name
/// - [`ColumnError::ShapeMismatch`] if a column cannot be reshaped to
///   `[batch, width]` or columns disagree on the batch size
/// - any transform error of the columns
pub fn make_input_layer(features: &Features, columns: &[Arc<dyn FeatureColumn>]) -> Result<Array2<f32>> {
    let dense = columns
        .iter()
        .map(|column| {
            column.as_dense().ok_or_else(|| {
                ColumnError::config(format!(
                    "input layer requires dense columns, {} has no dense view",
                    column.name()
                ))
            })
        })
        .collect::<Result<Vec<&dyn DenseColumn>>>()?;
    check_unique_names(columns)?;

    let mut cache = TransformCache::new(features);
    let mut blocks = Vec::with_capacity(dense.len());
    for column in dense {
        let values = column.dense_tensor(&mut cache)?;
        let block = flatten_batch(&values, column.dense_width(), column.name())?;
        if let Some(first) = blocks.first().map(Array2::nrows) {
            if block.nrows() != first {
                return Err(ColumnError::shape(
                    column.name(),
                    format!("batch size {} differs from {first} of preceding columns", block.nrows()),
                ));
            }
        }
        blocks.push(block);
    }

    let views: Vec<_> = blocks.iter().map(Array2::view).collect();
    concatenate(Axis(1), &views).map_err(|e| ColumnError::shape("input_layer", e.to_string()))
}
