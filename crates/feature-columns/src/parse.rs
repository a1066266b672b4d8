//! In-memory records to a [`Features`] table.
//!
//! A record maps raw keys to a flat list of values. [`parse_examples`] turns a
//! batch of records into the tensors the columns expect, driven by the
//! [`ParseConfig`] the columns declare:
//!
//! - `FixedLen { shape, .. }`: dense tensor `[n, shape...]`; a record without
//!   the key takes the default, if any
//! - `VarLen { .. }`: sparse tensor with indices `(example, position)` and
//!   dense shape `[n, max_len]`
//!
//! Keys not named by the config are ignored.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use feature_columns::column::{parse_config_for, FeatureColumn, HashedCategoricalColumn, NumericColumn};
//! use feature_columns::parse::parse_json_examples;
//!
//! let columns: Vec<Arc<dyn FeatureColumn>> = vec![
//!     Arc::new(NumericColumn::builder().key("price").default_value(0.0).build().unwrap()),
//!     Arc::new(HashedCategoricalColumn::builder().key("wire").hash_bucket_size(4).build().unwrap()),
//! ];
//! let config = parse_config_for(&columns).unwrap();
//! let features = parse_json_examples(
//!     r#"[{"price": [1.5], "wire": ["omar"]}, {"wire": ["stringer", "marlo"]}]"#,
//!     &config,
//! )
//! .unwrap();
//! assert_eq!(features.get("price").unwrap().as_dense().unwrap().shape(), &[2, 1]);
//! assert_eq!(features.get("wire").unwrap().as_sparse().unwrap().dense_shape(), &[2, 2]);
//! ```

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::column::{ParseConfig, ParseSpec};
use crate::data::{DType, Features, SparseTensor, Tensor};
use crate::error::{ColumnError, Result};

/// Values of one key in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValues {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl FeatureValues {
    pub fn len(&self) -> usize {
        match self {
            FeatureValues::Ints(v) => v.len(),
            FeatureValues::Floats(v) => v.len(),
            FeatureValues::Strings(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<i64>> for FeatureValues {
    fn from(values: Vec<i64>) -> Self {
        FeatureValues::Ints(values)
    }
}

impl From<Vec<f64>> for FeatureValues {
    fn from(values: Vec<f64>) -> Self {
        FeatureValues::Floats(values)
    }
}

impl From<Vec<String>> for FeatureValues {
    fn from(values: Vec<String>) -> Self {
        FeatureValues::Strings(values)
    }
}

impl From<Vec<&str>> for FeatureValues {
    fn from(values: Vec<&str>) -> Self {
        FeatureValues::Strings(values.into_iter().map(str::to_owned).collect())
    }
}

/// One example: raw key to values.
pub type Example = BTreeMap<String, FeatureValues>;

// =============================================================================
// Typed accumulation
// =============================================================================

/// Row-major values of one key, accumulated in the storage class of its dtype.
enum Column {
    Floats(Vec<f64>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl Column {
    fn for_dtype(dtype: DType) -> Self {
        if dtype.is_floating() {
            Column::Floats(Vec::new())
        } else if dtype.is_integer() {
            Column::Ints(Vec::new())
        } else {
            Column::Strings(Vec::new())
        }
    }

    fn extend(&mut self, values: &FeatureValues, key: &str) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        match (self, values) {
            (Column::Floats(out), FeatureValues::Floats(v)) => out.extend_from_slice(v),
            (Column::Floats(out), FeatureValues::Ints(v)) => out.extend(v.iter().map(|&i| i as f64)),
            (Column::Ints(out), FeatureValues::Ints(v)) => out.extend_from_slice(v),
            (Column::Ints(out), FeatureValues::Floats(v)) => out.extend(integral(v, key)?),
            (Column::Strings(out), FeatureValues::Strings(v)) => out.extend(v.iter().cloned()),
            _ => {
                return Err(ColumnError::dtype(
                    key,
                    "record values do not match the declared dtype",
                ));
            }
        }
        Ok(())
    }

    fn extend_default(&mut self, default: &[f64], key: &str) -> Result<()> {
        match self {
            Column::Floats(out) => out.extend_from_slice(default),
            Column::Ints(out) => out.extend(integral(default, key)?),
            Column::Strings(_) => return Err(ColumnError::dtype(key, "string keys cannot take a numeric default")),
        }
        Ok(())
    }

    fn into_tensor(self, dtype: DType, shape: &[usize], key: &str) -> Result<Tensor> {
        let shape = IxDyn(shape);
        let tensor = match (self, dtype) {
            (Column::Floats(v), DType::Float32) => {
                Tensor::Float32(from_shape(shape, v.into_iter().map(|x| x as f32).collect(), key)?)
            }
            (Column::Floats(v), _) => Tensor::Float64(from_shape(shape, v, key)?),
            (Column::Ints(v), DType::Int32) => {
                let narrowed = v
                    .into_iter()
                    .map(|x| {
                        i32::try_from(x).map_err(|_| ColumnError::dtype(key, format!("{x} does not fit in int32")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Tensor::Int32(from_shape(shape, narrowed, key)?)
            }
            (Column::Ints(v), _) => Tensor::Int64(from_shape(shape, v, key)?),
            (Column::Strings(v), _) => Tensor::String(from_shape(shape, v, key)?),
        };
        Ok(tensor)
    }
}

fn integral(values: &[f64], key: &str) -> Result<Vec<i64>> {
    values
        .iter()
        .map(|&v| {
            if v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(ColumnError::dtype(key, format!("{v} is not an integer")))
            }
        })
        .collect()
}

fn from_shape<T>(shape: IxDyn, values: Vec<T>, key: &str) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(shape, values).map_err(|e| ColumnError::shape(key, e.to_string()))
}

// =============================================================================
// Parsing
// =============================================================================

/// Convert `records` into the raw tensors described by `config`.
///
/// # Errors
///
/// - [`ColumnError::KeyNotFound`] if a fixed-length key without default is
///   missing from a record
/// - [`ColumnError::ShapeMismatch`] if a fixed-length key has the wrong
///   number of values
/// - [`ColumnError::DtypeMismatch`] if values cannot be stored as the
///   declared dtype
pub fn parse_examples(records: &[Example], config: &ParseConfig) -> Result<Features> {
    let mut features = Features::new();
    for (key, spec) in config {
        match spec {
            ParseSpec::FixedLen {
                shape,
                dtype,
                default_value,
            } => {
                let tensor = parse_fixed_len(records, key, shape, *dtype, default_value.as_deref())?;
                features.insert(key.clone(), tensor);
            }
            ParseSpec::VarLen { dtype } => {
                let sparse = parse_var_len(records, key, *dtype)?;
                features.insert(key.clone(), sparse);
            }
        }
    }
    Ok(features)
}

/// Decode a JSON array of records and parse it with [`parse_examples`].
///
/// # Errors
///
/// [`ColumnError::InvalidRecord`] if the JSON is not an array of objects
/// mapping keys to homogeneous value lists, plus the errors of
/// [`parse_examples`].
pub fn parse_json_examples(json: &str, config: &ParseConfig) -> Result<Features> {
    let records: Vec<Example> = serde_json::from_str(json)?;
    parse_examples(&records, config)
}

fn parse_fixed_len(
    records: &[Example],
    key: &str,
    shape: &[usize],
    dtype: DType,
    default_value: Option<&[f64]>,
) -> Result<Tensor> {
    let width: usize = shape.iter().product();
    if let Some(default) = default_value {
        if default.len() != width {
            return Err(ColumnError::shape(
                key,
                format!("default_value has {} values, expected {width}", default.len()),
            ));
        }
    }

    let mut column = Column::for_dtype(dtype);
    for record in records {
        match (record.get(key), default_value) {
            (Some(values), _) if values.len() != width => {
                return Err(ColumnError::shape(
                    key,
                    format!("expected {width} values per example, got {}", values.len()),
                ));
            }
            (Some(values), _) => column.extend(values, key)?,
            (None, Some(default)) => column.extend_default(default, key)?,
            (None, None) => return Err(ColumnError::KeyNotFound { key: key.to_owned() }),
        }
    }

    let full_shape: Vec<usize> = std::iter::once(records.len()).chain(shape.iter().copied()).collect();
    column.into_tensor(dtype, &full_shape, key)
}

fn parse_var_len(records: &[Example], key: &str, dtype: DType) -> Result<SparseTensor> {
    let mut column = Column::for_dtype(dtype);
    let mut coords = Vec::new();
    let mut max_len = 0;
    for (row, record) in records.iter().enumerate() {
        let Some(values) = record.get(key) else {
            continue;
        };
        column.extend(values, key)?;
        coords.extend((0..values.len()).flat_map(|pos| [row, pos]));
        max_len = max_len.max(values.len());
    }

    let nnz = coords.len() / 2;
    let indices = Array2::from_shape_vec((nnz, 2), coords).map_err(|e| ColumnError::shape(key, e.to_string()))?;
    let values = column.into_tensor(dtype, &[nnz], key)?;
    SparseTensor::new(indices, values, vec![records.len(), max_len])
}
