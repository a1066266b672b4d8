//! Memoization behavior of the per-batch transform cache.

mod common;

use std::sync::Arc;

use feature_columns::cache::{CacheKey, CacheStats, TransformCache};
use feature_columns::column::{BucketizedColumn, ColumnId, FeatureColumn, NumericColumn, ParseConfig};
use feature_columns::data::{Feature, Features, Tensor};
use feature_columns::linear::{LinearModel, LinearModelConfig};
use feature_columns::{ColumnError, Result};
use ndarray::array;

use common::{init_tracing, CountingColumn};

// =============================================================================
// Test Columns
// =============================================================================

/// Requests the output of `source` twice and doubles it.
#[derive(Debug)]
struct DoublingColumn {
    id: ColumnId,
    source: Arc<CountingColumn>,
}

impl FeatureColumn for DoublingColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        "doubled"
    }

    fn parse_config(&self) -> ParseConfig {
        self.source.parse_config()
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let first = cache.get_column(self.source.as_ref())?;
        let second = cache.get_column(self.source.as_ref())?;
        assert!(Arc::ptr_eq(&first, &second));
        let values = first.dense_f32().cloned().unwrap_or_default();
        Ok(Some(Tensor::Float32(values * 2.0).into()))
    }
}

/// Asks the cache for its own output.
#[derive(Debug)]
struct SelfReferentialColumn {
    id: ColumnId,
}

impl FeatureColumn for SelfReferentialColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        "ouroboros"
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::new()
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let own = cache.get_column(self)?;
        Ok(Some(own.as_ref().clone()))
    }
}

/// Produces nothing.
#[derive(Debug)]
struct SilentColumn {
    id: ColumnId,
}

impl FeatureColumn for SilentColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        "silent"
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::new()
    }

    fn transform(&self, _cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        Ok(None)
    }
}

fn price_features() -> Features {
    Features::new().with("price", Tensor::from(array![[1.0f32], [5.0]]))
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_raw_keys_resolve_to_inputs() {
    let features = price_features();
    let mut cache = TransformCache::new(&features);
    let raw = cache.get("price").unwrap();
    assert!(Arc::ptr_eq(&raw, features.get("price").unwrap()));
    assert_eq!(cache.stats(), CacheStats::default());
}

#[test]
fn test_missing_raw_key() {
    let features = price_features();
    let mut cache = TransformCache::new(&features);
    let err = cache.get("wire").unwrap_err();
    assert!(matches!(err, ColumnError::KeyNotFound { key } if key == "wire"));
}

#[test]
fn test_shared_source_is_transformed_once() {
    init_tracing();
    let source = Arc::new(CountingColumn::new("price"));
    let doubled = DoublingColumn {
        id: ColumnId::next(),
        source: Arc::clone(&source),
    };
    let features = price_features();
    let mut cache = TransformCache::new(&features);

    let output = cache.get_column(&doubled).unwrap();
    assert_eq!(output.dense_f32().unwrap(), &array![[2.0f32], [10.0]].into_dyn());
    cache.get_column(source.as_ref()).unwrap();
    cache.get(CacheKey::Column(&doubled)).unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(cache.stats(), CacheStats { hits: 3, computations: 2 });
}

#[test]
fn test_fresh_cache_recomputes() {
    let source = CountingColumn::new("price");
    let features = price_features();
    for _ in 0..2 {
        let mut cache = TransformCache::new(&features);
        cache.get_column(&source).unwrap();
    }
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_bucketized_source_shares_cache_entry() {
    let price = NumericColumn::builder().key("price").build().unwrap();
    let bucketized = BucketizedColumn::new(price.clone(), vec![2.0, 4.0]).unwrap();
    let features = price_features();
    let mut cache = TransformCache::new(&features);

    cache.get_column(&bucketized).unwrap();
    let direct = cache.get_column(&price).unwrap();
    assert_eq!(direct.dense_f32().unwrap(), &array![[1.0f32], [5.0]].into_dyn());
    assert_eq!(cache.stats(), CacheStats { hits: 1, computations: 2 });
}

#[test]
fn test_linear_model_transforms_each_column_once() {
    init_tracing();
    let counting = Arc::new(CountingColumn::new("price"));
    let columns: Vec<Arc<dyn FeatureColumn>> = vec![counting.clone()];
    let model = LinearModel::new(columns, LinearModelConfig::default()).unwrap();

    model.predict(&price_features()).unwrap();
    assert_eq!(counting.calls(), 1);
    model.predict(&price_features()).unwrap();
    assert_eq!(counting.calls(), 2);
}

#[test]
fn test_cycle_is_reported() {
    let column = SelfReferentialColumn { id: ColumnId::next() };
    let features = Features::new();
    let mut cache = TransformCache::new(&features);
    let err = cache.get_column(&column).unwrap_err();
    assert!(matches!(err, ColumnError::CyclicDependency { column } if column == "ouroboros"));
}

#[test]
fn test_missing_output_is_unsupported() {
    let column = SilentColumn { id: ColumnId::next() };
    let features = Features::new();
    let mut cache = TransformCache::new(&features);
    let err = cache.get_column(&column).unwrap_err();
    assert!(matches!(err, ColumnError::UnsupportedColumn { column } if column == "silent"));
}
