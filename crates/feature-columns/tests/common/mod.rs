//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use feature_columns::cache::TransformCache;
use feature_columns::column::{
    CategoricalColumn, ColumnId, DenseColumn, FeatureColumn, IdWeightPair, ParseConfig, ParseSpec,
};
use feature_columns::data::{DType, Feature, SparseTensor};
use feature_columns::{ColumnError, Result};
use ndarray::{array, ArrayD};

// =============================================================================
// Fixtures
// =============================================================================

/// Path of a file under `tests/testdata`.
pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata").join(name)
}

/// `[["omar"], ["stringer", "marlo"]]` as a sparse string tensor.
pub fn wire_cast() -> SparseTensor {
    SparseTensor::from_coords(&[[0, 0], [1, 0], [1, 1]], array!["omar", "stringer", "marlo"], [2, 2]).unwrap()
}

/// Route `tracing` events to the test output, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn as_columns<const N: usize>(columns: [Arc<dyn FeatureColumn>; N]) -> Vec<Arc<dyn FeatureColumn>> {
    columns.into()
}

// =============================================================================
// Test Columns
// =============================================================================

/// Dense column that passes its raw float input through and counts transforms.
#[derive(Debug)]
pub struct CountingColumn {
    id: ColumnId,
    key: String,
    pub calls: AtomicUsize,
}

impl CountingColumn {
    pub fn new(key: &str) -> Self {
        Self {
            id: ColumnId::next(),
            key: key.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeatureColumn for CountingColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::from([(
            self.key.clone(),
            ParseSpec::FixedLen {
                shape: vec![1],
                dtype: DType::Float32,
                default_value: None,
            },
        )])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let raw = cache.get_raw(&self.key)?;
        Ok(Some(raw.as_ref().clone()))
    }

    fn as_dense(&self) -> Option<&dyn DenseColumn> {
        Some(self)
    }
}

impl DenseColumn for CountingColumn {
    fn variable_shape(&self) -> Vec<usize> {
        vec![1]
    }

    fn dense_tensor(&self, cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>> {
        let output = cache.get_column(self)?;
        output
            .dense_f32()
            .cloned()
            .ok_or_else(|| ColumnError::Config(format!("{} expects float32 input", self.key)))
    }
}

/// Column offering both views; only its categorical view may be used.
///
/// Its ids are fixed to `[[2], [0, 3]]` over four buckets.
#[derive(Debug)]
pub struct DenseAndSparseColumn {
    id: ColumnId,
}

impl DenseAndSparseColumn {
    pub const NAME: &'static str = "dense_and_sparse_column";

    pub fn new() -> Self {
        Self { id: ColumnId::next() }
    }
}

impl FeatureColumn for DenseAndSparseColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::from([(Self::NAME.to_owned(), ParseSpec::VarLen { dtype: DType::String })])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let raw = cache.get_raw(Self::NAME)?;
        Ok(Some(raw.as_ref().clone()))
    }

    fn as_dense(&self) -> Option<&dyn DenseColumn> {
        Some(self)
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        Some(self)
    }
}

impl DenseColumn for DenseAndSparseColumn {
    fn variable_shape(&self) -> Vec<usize> {
        unreachable!("dense view of {} must not be used", Self::NAME)
    }

    fn dense_tensor(&self, _cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>> {
        unreachable!("dense view of {} must not be used", Self::NAME)
    }
}

impl CategoricalColumn for DenseAndSparseColumn {
    fn num_buckets(&self) -> usize {
        4
    }

    fn sparse_tensors(&self, _cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
        let ids = SparseTensor::from_coords(&[[0, 0], [1, 0], [1, 1]], array![2i64, 0, 3], [2, 2])?;
        Ok(IdWeightPair { ids, weights: None })
    }
}
