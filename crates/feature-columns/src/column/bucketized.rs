//! Bucketized numeric column.

use ndarray::{Array1, Array2, ArrayD, IxDyn};

use super::{
    cached_dense_f32, CategoricalColumn, ColumnId, DenseColumn, FeatureColumn, IdWeightPair, NumericColumn,
    ParseConfig,
};
use crate::cache::TransformCache;
use crate::data::{Feature, SparseTensor, Tensor};
use crate::error::{ColumnError, Result};

/// Discretizes a one-dimensional [`NumericColumn`] by `boundaries`.
///
/// Value `v` lands in bucket `#{b in boundaries : b <= v}`, so there are
/// `boundaries.len() + 1` buckets per source dimension. The column offers
/// both a one-hot dense view and a sparse id view; in the sparse view the id
/// of dimension `j` is offset by `j * (boundaries.len() + 1)`.
#[derive(Debug, Clone)]
pub struct BucketizedColumn {
    id: ColumnId,
    name: String,
    source: NumericColumn,
    boundaries: Vec<f64>,
}

impl BucketizedColumn {
    /// # Errors
    ///
    /// [`ColumnError::Config`] if the source is not one-dimensional or the
    /// boundaries are empty or not strictly increasing.
    pub fn new(source: NumericColumn, boundaries: impl Into<Vec<f64>>) -> Result<Self> {
        let boundaries = boundaries.into();
        if source.shape().len() != 1 {
            return Err(ColumnError::config(format!(
                "source_column must be one-dimensional column, got shape {:?} for {}",
                source.shape(),
                source.name()
            )));
        }
        if boundaries.is_empty() || boundaries.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(ColumnError::config(format!(
                "boundaries must be a sorted list of unique values, got {boundaries:?}"
            )));
        }
        Ok(Self {
            id: ColumnId::next(),
            name: format!("{}_bucketized", source.name()),
            source,
            boundaries,
        })
    }

    #[inline]
    pub fn source(&self) -> &NumericColumn {
        &self.source
    }

    #[inline]
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Buckets per source dimension.
    #[inline]
    pub fn buckets_per_dimension(&self) -> usize {
        self.boundaries.len() + 1
    }

    #[inline]
    fn source_dims(&self) -> usize {
        self.source.shape()[0]
    }

    /// Bucket of a single value.
    #[inline]
    pub fn bucket(&self, value: f64) -> usize {
        self.boundaries.partition_point(|&b| b <= value)
    }

    fn bucket_ids(&self, cache: &mut TransformCache<'_>) -> Result<ArrayD<i64>> {
        let output = cache.get_column(self)?;
        output
            .dense_i64()
            .cloned()
            .ok_or_else(|| ColumnError::dtype(&self.name, "expected dense int64 bucket ids"))
    }
}

impl FeatureColumn for BucketizedColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parse_config(&self) -> ParseConfig {
        self.source.parse_config()
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let values = cached_dense_f32(&self.source, cache)?;
        let ids = values.mapv(|v| self.bucket(f64::from(v)) as i64);
        Ok(Some(Feature::Dense(Tensor::Int64(ids))))
    }

    fn as_dense(&self) -> Option<&dyn DenseColumn> {
        Some(self)
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        Some(self)
    }
}

impl DenseColumn for BucketizedColumn {
    fn variable_shape(&self) -> Vec<usize> {
        vec![self.source_dims(), self.buckets_per_dimension()]
    }

    /// One-hot encoding `[batch, dims, buckets_per_dimension]`.
    fn dense_tensor(&self, cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>> {
        let ids = self.bucket_ids(cache)?;
        let per = self.buckets_per_dimension();
        let mut shape = ids.shape().to_vec();
        shape.push(per);
        let mut one_hot = ArrayD::<f32>::zeros(IxDyn(&shape));
        let flat = one_hot
            .as_slice_mut()
            .ok_or_else(|| ColumnError::shape(&self.name, "one-hot buffer is not contiguous"))?;
        for (k, &id) in ids.iter().enumerate() {
            flat[k * per + id as usize] = 1.0;
        }
        Ok(one_hot)
    }
}

impl CategoricalColumn for BucketizedColumn {
    fn num_buckets(&self) -> usize {
        self.source_dims() * self.buckets_per_dimension()
    }

    fn sparse_tensors(&self, cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
        let ids = self.bucket_ids(cache)?;
        let Some(&batch) = ids.shape().first() else {
            return Err(ColumnError::shape(&self.name, "bucket ids have no batch dimension"));
        };
        let dims = if batch == 0 { self.source_dims() } else { ids.len() / batch };
        let per = self.buckets_per_dimension() as i64;

        let mut indices = Vec::with_capacity(ids.len() * 2);
        let mut values = Vec::with_capacity(ids.len());
        for (k, &id) in ids.iter().enumerate() {
            let (row, dim) = (k / dims, k % dims);
            indices.extend([row, dim]);
            values.push(dim as i64 * per + id);
        }
        let indices = Array2::from_shape_vec((values.len(), 2), indices)
            .map_err(|e| ColumnError::shape(&self.name, e.to_string()))?;
        let values = Tensor::Int64(Array1::from(values).into_dyn());
        let ids = SparseTensor::from_parts(indices, values, vec![batch, dims]);
        Ok(IdWeightPair { ids, weights: None })
    }
}
