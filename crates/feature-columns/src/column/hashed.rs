//! Hashed categorical column.

use bon::bon;

use super::categorical::CategoricalInput;
use super::{cached_sparse_ids, CategoricalColumn, ColumnId, FeatureColumn, IdWeightPair, ParseConfig, ParseSpec};
use crate::cache::TransformCache;
use crate::data::{DType, Feature};
use crate::error::{ColumnError, Result};
use crate::hashing::{int_bucket, string_bucket};

/// Maps string or integer values to `fingerprint64(text) % hash_bucket_size`.
#[derive(Debug, Clone)]
pub struct HashedCategoricalColumn {
    id: ColumnId,
    key: String,
    hash_bucket_size: usize,
    dtype: DType,
}

#[bon]
impl HashedCategoricalColumn {
    /// # Errors
    ///
    /// - [`ColumnError::Config`] if `hash_bucket_size` is zero
    /// - [`ColumnError::DtypeMismatch`] if `dtype` is neither string nor integer
    #[builder]
    pub fn new(
        #[builder(into)] key: String,
        hash_bucket_size: usize,
        #[builder(default = DType::String)] dtype: DType,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(ColumnError::config("hashed column key must not be empty"));
        }
        if hash_bucket_size < 1 {
            return Err(ColumnError::config(format!(
                "hash_bucket_size must be at least 1, got {hash_bucket_size} for {key}"
            )));
        }
        if !dtype.is_categorical() {
            return Err(ColumnError::dtype(&key, format!("dtype must be string or integer, got {dtype}")));
        }
        Ok(Self {
            id: ColumnId::next(),
            key,
            hash_bucket_size,
            dtype,
        })
    }
}

impl HashedCategoricalColumn {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn hash_bucket_size(&self) -> usize {
        self.hash_bucket_size
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }
}

impl FeatureColumn for HashedCategoricalColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::from([(self.key.clone(), ParseSpec::VarLen { dtype: self.dtype })])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let raw = cache.get_raw(&self.key)?;
        let input = CategoricalInput::from_feature(&raw, &self.key, self.dtype)?;
        let buckets = self.hash_bucket_size as u64;
        let ids = input.into_ids(
            |s| string_bucket(s, buckets) as i64,
            |i| int_bucket(i, buckets) as i64,
        );
        Ok(Some(Feature::Sparse(ids)))
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        Some(self)
    }
}

impl CategoricalColumn for HashedCategoricalColumn {
    fn num_buckets(&self) -> usize {
        self.hash_bucket_size
    }

    fn sparse_tensors(&self, cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
        cached_sparse_ids(self, cache)
    }
}
