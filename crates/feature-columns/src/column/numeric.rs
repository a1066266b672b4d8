//! Numeric (real-valued) column.

use std::fmt;
use std::sync::Arc;

use bon::bon;
use ndarray::{Array, ArrayD, Dimension, IxDyn};

use super::{cached_dense_f32, ColumnId, DenseColumn, FeatureColumn, ParseConfig, ParseSpec};
use crate::cache::TransformCache;
use crate::data::{DType, Feature, Tensor};
use crate::error::{ColumnError, Result};

/// Default filling missing values of a [`NumericColumn`].
///
/// A scalar broadcasts to the declared shape; anything else must match it.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue(pub ArrayD<f64>);

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue(ArrayD::from_elem(IxDyn(&[]), v))
    }
}

impl From<Vec<f64>> for DefaultValue {
    fn from(v: Vec<f64>) -> Self {
        DefaultValue(Array::from_vec(v).into_dyn())
    }
}

impl<D: Dimension> From<Array<f64, D>> for DefaultValue {
    fn from(a: Array<f64, D>) -> Self {
        DefaultValue(a.into_dyn())
    }
}

/// Element-wise function applied to the float32 input tensor of one batch.
#[derive(Clone)]
pub struct Normalizer(Arc<dyn Fn(ArrayD<f32>) -> ArrayD<f32> + Send + Sync>);

impl Normalizer {
    pub fn new(f: impl Fn(ArrayD<f32>) -> ArrayD<f32> + Send + Sync + 'static) -> Self {
        Normalizer(Arc::new(f))
    }

    #[inline]
    pub fn apply(&self, values: ArrayD<f32>) -> ArrayD<f32> {
        (self.0)(values)
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Normalizer(..)")
    }
}

/// Real-valued dense feature read from one raw key.
///
/// # Example
///
/// ```
/// use feature_columns::column::NumericColumn;
///
/// let price = NumericColumn::builder()
///     .key("price")
///     .shape(vec![2, 3])
///     .default_value(2.0)
///     .build()
///     .unwrap();
/// assert_eq!(price.default_value().unwrap().shape(), &[2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct NumericColumn {
    id: ColumnId,
    key: String,
    shape: Vec<usize>,
    default_value: Option<ArrayD<f64>>,
    dtype: DType,
    normalizer: Option<Normalizer>,
}

#[bon]
impl NumericColumn {
    /// Validate arguments and create the column.
    ///
    /// # Errors
    ///
    /// - [`ColumnError::Config`] if a shape dimension is zero
    /// - [`ColumnError::DtypeMismatch`] if `dtype` is not numeric, or an
    ///   integer dtype gets a non-integral default
    /// - [`ColumnError::ShapeMismatch`] if a non-scalar default does not match `shape`
    #[builder]
    pub fn new(
        #[builder(into)] key: String,
        #[builder(default = vec![1])] shape: Vec<usize>,
        #[builder(into)] default_value: Option<DefaultValue>,
        #[builder(default = DType::Float32)] dtype: DType,
        normalizer: Option<Normalizer>,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(ColumnError::config("numeric column key must not be empty"));
        }
        if shape.iter().any(|&d| d == 0) {
            return Err(ColumnError::config(format!(
                "shape dimensions must be greater than 0, got {shape:?} for {key}"
            )));
        }
        if !dtype.is_numeric() {
            return Err(ColumnError::dtype(
                &key,
                format!("dtype must be convertible to float, got {dtype}"),
            ));
        }

        let default_value = default_value
            .map(|DefaultValue(value)| {
                let value = if value.ndim() == 0 {
                    ArrayD::from_elem(IxDyn(&shape), value.iter().copied().next().unwrap_or_default())
                } else if value.shape() == shape.as_slice() {
                    value
                } else {
                    return Err(ColumnError::shape(
                        &key,
                        format!(
                            "the shape of default_value must be equal to given shape {shape:?}, got {:?}",
                            value.shape()
                        ),
                    ));
                };
                if dtype.is_integer() && value.iter().any(|v| v.fract() != 0.0) {
                    return Err(ColumnError::dtype(
                        &key,
                        format!("default_value must be compatible with dtype {dtype}"),
                    ));
                }
                Ok(value)
            })
            .transpose()?;

        Ok(Self {
            id: ColumnId::next(),
            key,
            shape,
            default_value,
            dtype,
            normalizer,
        })
    }
}

impl NumericColumn {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Default broadcast to [`NumericColumn::shape`].
    #[inline]
    pub fn default_value(&self) -> Option<&ArrayD<f64>> {
        self.default_value.as_ref()
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn normalizer(&self) -> Option<&Normalizer> {
        self.normalizer.as_ref()
    }
}

impl FeatureColumn for NumericColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn parse_config(&self) -> ParseConfig {
        let spec = ParseSpec::FixedLen {
            shape: self.shape.clone(),
            dtype: self.dtype,
            default_value: self.default_value.as_ref().map(|v| v.iter().copied().collect()),
        };
        ParseConfig::from([(self.key.clone(), spec)])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let raw = cache.get_raw(&self.key)?;
        let Feature::Dense(tensor) = raw.as_ref() else {
            return Err(ColumnError::InvalidInputType { key: self.key.clone() });
        };
        let values = tensor.to_f32().ok_or_else(|| {
            ColumnError::dtype(
                &self.key,
                format!("input must be numeric, got {}", tensor.dtype()),
            )
        })?;
        let values = match &self.normalizer {
            Some(normalizer) => normalizer.apply(values),
            None => values,
        };
        Ok(Some(Feature::Dense(Tensor::Float32(values))))
    }

    fn as_dense(&self) -> Option<&dyn DenseColumn> {
        Some(self)
    }
}

impl DenseColumn for NumericColumn {
    fn variable_shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn dense_tensor(&self, cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>> {
        cached_dense_f32(self, cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Capability;
    use crate::data::{Features, SparseTensor};
    use ndarray::array;

    #[test]
    fn defaults() {
        let a = NumericColumn::builder().key("aaa").build().unwrap();
        assert_eq!(a.name(), "aaa");
        assert_eq!(a.shape(), &[1]);
        assert!(a.default_value().is_none());
        assert_eq!(a.dtype(), DType::Float32);
        assert!(a.normalizer().is_none());
        assert_eq!(a.capability(), Some(Capability::Dense));
    }

    #[test]
    fn scalar_default_fills_the_shape() {
        let a = NumericColumn::builder()
            .key("aaa")
            .shape(vec![2, 3])
            .default_value(2.0)
            .build()
            .unwrap();
        assert_eq!(a.default_value().unwrap(), &ArrayD::from_elem(IxDyn(&[2, 3]), 2.0));
    }

    #[test]
    fn default_shape_must_match() {
        assert!(NumericColumn::builder()
            .key("aaa")
            .shape(vec![2])
            .default_value(vec![1.0, 2.0])
            .build()
            .is_ok());
        let err = NumericColumn::builder()
            .key("aaa")
            .shape(vec![2])
            .default_value(vec![1.0, 2.0, 3.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnError::ShapeMismatch { .. }));
        let err = NumericColumn::builder()
            .key("aaa")
            .shape(vec![3, 1])
            .default_value(array![[2.0, 3.0], [1.0, 2.0], [2.0, 3.0]])
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnError::ShapeMismatch { .. }));
    }

    #[test]
    fn integer_dtype_requires_integral_default() {
        assert!(NumericColumn::builder()
            .key("aaa")
            .shape(vec![2])
            .default_value(vec![1.0, 2.0])
            .dtype(DType::Int32)
            .build()
            .is_ok());
        let err = NumericColumn::builder()
            .key("aaa")
            .shape(vec![2])
            .default_value(vec![1.0, 2.5])
            .dtype(DType::Int32)
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnError::DtypeMismatch { .. }));
    }

    #[test]
    fn rejects_zero_dimension_and_string_dtype() {
        let err = NumericColumn::builder().key("aaa").shape(vec![0]).build().unwrap_err();
        assert!(matches!(err, ColumnError::Config(_)));
        let err = NumericColumn::builder()
            .key("aaa")
            .dtype(DType::String)
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnError::DtypeMismatch { .. }));
    }

    #[test]
    fn parse_config_is_fixed_len() {
        let a = NumericColumn::builder()
            .key("aaa")
            .shape(vec![2, 3])
            .dtype(DType::Int32)
            .build()
            .unwrap();
        let expected = ParseSpec::FixedLen {
            shape: vec![2, 3],
            dtype: DType::Int32,
            default_value: None,
        };
        assert_eq!(a.parse_config().get("aaa"), Some(&expected));
    }

    #[test]
    fn normalizer_transforms_feature() {
        let price = NumericColumn::builder()
            .key("price")
            .shape(vec![2])
            .normalizer(Normalizer::new(|x| x + 2.0))
            .build()
            .unwrap();
        let features = Features::new().with("price", Tensor::from(array![[1.0f32, 2.0], [5.0, 6.0]]));
        let mut cache = TransformCache::new(&features);
        let output = cache.get_column(&price).unwrap();
        assert_eq!(output.dense_f32().unwrap(), &array![[3.0f32, 4.0], [7.0, 8.0]].into_dyn());
        assert_eq!(&price.dense_tensor(&mut cache).unwrap(), output.dense_f32().unwrap());
    }

    #[test]
    fn sparse_input_is_rejected() {
        let price = NumericColumn::builder().key("price").build().unwrap();
        let sparse = SparseTensor::from_coords(&[[0, 0]], array![0.3f32], [1, 1]).unwrap();
        let features = Features::new().with("price", sparse);
        let mut cache = TransformCache::new(&features);
        let err = price.transform(&mut cache).unwrap_err();
        assert!(matches!(err, ColumnError::InvalidInputType { .. }));
    }

    #[test]
    fn clone_preserves_declared_parameters() {
        let a = NumericColumn::builder()
            .key("aaa")
            .shape(vec![1, 2])
            .default_value(array![[3.0, 2.0]])
            .build()
            .unwrap();
        let copy = a.clone();
        assert_eq!(copy.name(), "aaa");
        assert_eq!(copy.id(), a.id());
        assert_eq!(copy.shape(), &[1, 2]);
        assert_eq!(copy.default_value().unwrap(), &array![[3.0, 2.0]].into_dyn());
    }
}
