//! Feature column descriptors.
//!
//! A column is an immutable description of one named feature transformation.
//! Every column implements [`FeatureColumn`]; columns that yield a fixed-width
//! numeric vector per example also implement [`DenseColumn`], and columns that
//! yield a variable-length set of bucket ids implement [`CategoricalColumn`].
//! [`Capability`] summarizes which of the two a column offers, and the
//! assemblers switch on it.
//!
//! # Column Kinds
//!
//! | column | capability | output of `transform` |
//! |---|---|---|
//! | [`NumericColumn`] | dense | float32 tensor `[batch, shape...]` |
//! | [`BucketizedColumn`] | both | int64 bucket ids `[batch, dims]` |
//! | [`HashedCategoricalColumn`] | categorical | sparse int64 ids |
//! | [`VocabularyFileCategoricalColumn`] | categorical | sparse int64 ids |
//! | [`VocabularyListCategoricalColumn`] | categorical | sparse int64 ids |
//!
//! Columns are cheap to clone; a clone is a deep copy that keeps the
//! [`ColumnId`], so the clone and the original share cache entries.

mod bucketized;
mod categorical;
mod hashed;
mod numeric;
mod vocabulary;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::cache::TransformCache;
use crate::data::{DType, Feature, SparseTensor};
use crate::error::{ColumnError, Result};

pub use bucketized::BucketizedColumn;
pub use hashed::HashedCategoricalColumn;
pub use numeric::{DefaultValue, Normalizer, NumericColumn};
pub use vocabulary::{LookupTable, Vocabulary, VocabularyFileCategoricalColumn, VocabularyListCategoricalColumn};

// =============================================================================
// Identity
// =============================================================================

/// Identity of a column for memoization.
///
/// Allocated once per constructed column and preserved by `clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ColumnId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which output views a column offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Dense,
    Categorical,
    Both,
}

impl Capability {
    fn of(dense: bool, categorical: bool) -> Option<Self> {
        match (dense, categorical) {
            (true, true) => Some(Capability::Both),
            (true, false) => Some(Capability::Dense),
            (false, true) => Some(Capability::Categorical),
            (false, false) => None,
        }
    }

    /// The linear assembler takes the categorical path whenever it exists.
    #[inline]
    pub fn prefers_categorical(self) -> bool {
        matches!(self, Capability::Categorical | Capability::Both)
    }
}

// =============================================================================
// Parse configuration
// =============================================================================

/// Expected raw shape/dtype of one input key, consumed by record parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseSpec {
    /// A fixed number of values per example, optionally defaulted.
    FixedLen {
        shape: Vec<usize>,
        dtype: DType,
        /// Row-major default filling `shape`.
        default_value: Option<Vec<f64>>,
    },
    /// Any number of values per example, produced as a sparse tensor.
    VarLen { dtype: DType },
}

/// Raw key to [`ParseSpec`].
pub type ParseConfig = BTreeMap<String, ParseSpec>;

/// Merge the parse configs of several columns.
///
/// # Errors
///
/// [`ColumnError::Config`] if two columns need different specs for one key.
pub fn parse_config_for(columns: &[Arc<dyn FeatureColumn>]) -> Result<ParseConfig> {
    let mut merged = ParseConfig::new();
    for column in columns {
        for (key, spec) in column.parse_config() {
            match merged.get(&key) {
                Some(existing) if existing != &spec => {
                    return Err(ColumnError::config(format!(
                        "conflicting parse specs for key {key}: {existing:?} vs {spec:?}"
                    )));
                }
                Some(_) => {}
                None => {
                    merged.insert(key, spec);
                }
            }
        }
    }
    Ok(merged)
}

// =============================================================================
// Column traits
// =============================================================================

/// Sparse ids with optional per-id weights.
#[derive(Debug, Clone, PartialEq)]
pub struct IdWeightPair {
    /// int64 bucket ids; the first index coordinate is the example.
    pub ids: SparseTensor,
    /// float32 weights with the same indices as `ids`.
    pub weights: Option<SparseTensor>,
}

/// A named feature transformation.
///
/// `transform` receives the per-batch cache so a column may request the
/// output of other columns (`cache.get_column(&source)`); the cache guarantees
/// that each column is transformed at most once per batch.
pub trait FeatureColumn: fmt::Debug + Send + Sync {
    /// Memoization identity.
    fn id(&self) -> ColumnId;

    /// Unique name, also the deduplication key of the assemblers.
    fn name(&self) -> &str;

    /// Raw keys this column reads and how they are expected to look.
    fn parse_config(&self) -> ParseConfig;

    /// Compute this column's output for one batch.
    ///
    /// Returning `Ok(None)` marks the column as malformed; the cache turns it
    /// into [`ColumnError::UnsupportedColumn`].
    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>>;

    /// Dense view, if the column has one.
    fn as_dense(&self) -> Option<&dyn DenseColumn> {
        None
    }

    /// Categorical view, if the column has one.
    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        None
    }

    fn capability(&self) -> Option<Capability> {
        Capability::of(self.as_dense().is_some(), self.as_categorical().is_some())
    }
}

/// A column yielding a fixed-width numeric vector per example.
pub trait DenseColumn: FeatureColumn {
    /// Per-example shape of [`DenseColumn::dense_tensor`] (batch axis excluded).
    fn variable_shape(&self) -> Vec<usize>;

    /// Dense float32 tensor `[batch, variable_shape...]`.
    fn dense_tensor(&self, cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>>;

    /// Flattened per-example width.
    fn dense_width(&self) -> usize {
        self.variable_shape().iter().product()
    }
}

/// A column yielding bucket ids in `[0, num_buckets)` per example.
pub trait CategoricalColumn: FeatureColumn {
    fn num_buckets(&self) -> usize;

    fn sparse_tensors(&self, cache: &mut TransformCache<'_>) -> Result<IdWeightPair>;
}

/// Reject empty column lists and duplicate names.
pub(crate) fn check_unique_names(columns: &[Arc<dyn FeatureColumn>]) -> Result<()> {
    if columns.is_empty() {
        return Err(ColumnError::config("feature_columns must not be empty"));
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name()) {
            return Err(ColumnError::DuplicateColumn {
                name: column.name().to_owned(),
            });
        }
    }
    Ok(())
}

/// Fetch a column's cached output and require it to be dense float32.
pub(crate) fn cached_dense_f32(column: &dyn FeatureColumn, cache: &mut TransformCache<'_>) -> Result<ArrayD<f32>> {
    let output = cache.get_column(column)?;
    output.dense_f32().cloned().ok_or_else(|| {
        ColumnError::dtype(
            column.name(),
            format!("expected a dense float32 output, got {}", output.dtype()),
        )
    })
}

/// Fetch a column's cached output and require it to be sparse ids.
pub(crate) fn cached_sparse_ids(column: &dyn FeatureColumn, cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
    let output = cache.get_column(column)?;
    match output.as_sparse() {
        Some(ids) if ids.values().dtype() == DType::Int64 => Ok(IdWeightPair {
            ids: ids.clone(),
            weights: None,
        }),
        _ => Err(ColumnError::dtype(column.name(), "expected sparse int64 ids from transform")),
    }
}
