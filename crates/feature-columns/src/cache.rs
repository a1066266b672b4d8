//! Per-batch memoization of column transformations.
//!
//! A [`TransformCache`] wraps the read-only input table of one batch. Raw keys
//! resolve to the input tensors; columns resolve to their transformed output,
//! computed on first request and shared afterwards. Because columns ask the
//! cache for their sources, a column used both directly and as the source of
//! another column is still transformed exactly once per batch.
//!
//! The cache is single-batch and single-threaded: create one per assembly
//! call and drop it when the call returns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::column::{ColumnId, FeatureColumn};
use crate::data::{Feature, Features};
use crate::error::{ColumnError, Result};

/// Lookup key: a raw input name or a column.
#[derive(Debug, Clone, Copy)]
pub enum CacheKey<'k> {
    Raw(&'k str),
    Column(&'k dyn FeatureColumn),
}

impl<'k> From<&'k str> for CacheKey<'k> {
    fn from(key: &'k str) -> Self {
        CacheKey::Raw(key)
    }
}

impl<'k> From<&'k String> for CacheKey<'k> {
    fn from(key: &'k String) -> Self {
        CacheKey::Raw(key.as_str())
    }
}

impl<'k> From<&'k dyn FeatureColumn> for CacheKey<'k> {
    fn from(column: &'k dyn FeatureColumn) -> Self {
        CacheKey::Column(column)
    }
}

/// Counters for cache activity within one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Column requests answered from a previous computation.
    pub hits: u64,
    /// Column transforms actually run.
    pub computations: u64,
}

/// Memoizing view over one batch of input features.
#[derive(Debug)]
pub struct TransformCache<'a> {
    features: &'a Features,
    computed: HashMap<ColumnId, Arc<Feature>>,
    in_progress: HashSet<ColumnId>,
    stats: CacheStats,
}

impl<'a> TransformCache<'a> {
    pub fn new(features: &'a Features) -> Self {
        Self {
            features,
            computed: HashMap::new(),
            in_progress: HashSet::new(),
            stats: CacheStats::default(),
        }
    }

    /// Resolve a raw key or a column.
    pub fn get<'k>(&mut self, key: impl Into<CacheKey<'k>>) -> Result<Arc<Feature>> {
        match key.into() {
            CacheKey::Raw(name) => self.get_raw(name),
            CacheKey::Column(column) => self.get_column(column),
        }
    }

    /// Input tensor for a raw key.
    ///
    /// # Errors
    ///
    /// [`ColumnError::KeyNotFound`] if the key is not in the input table.
    pub fn get_raw(&self, key: &str) -> Result<Arc<Feature>> {
        self.features
            .get(key)
            .cloned()
            .ok_or_else(|| ColumnError::KeyNotFound { key: key.to_owned() })
    }

    /// Transformed output of a column, computing it on first request.
    ///
    /// # Errors
    ///
    /// - Any error of the column's transform
    /// - [`ColumnError::UnsupportedColumn`] if the transform yields nothing
    /// - [`ColumnError::CyclicDependency`] if the column is requested again
    ///   while its own transform is running
    pub fn get_column(&mut self, column: &dyn FeatureColumn) -> Result<Arc<Feature>> {
        let id = column.id();
        if let Some(output) = self.computed.get(&id) {
            self.stats.hits += 1;
            tracing::trace!(column = column.name(), "transform cache hit");
            return Ok(Arc::clone(output));
        }

        if !self.in_progress.insert(id) {
            return Err(ColumnError::CyclicDependency {
                column: column.name().to_owned(),
            });
        }
        let result = column.transform(self);
        self.in_progress.remove(&id);

        let output = result?.ok_or_else(|| ColumnError::UnsupportedColumn {
            column: column.name().to_owned(),
        })?;
        let output = Arc::new(output);
        self.computed.insert(id, Arc::clone(&output));
        self.stats.computations += 1;
        tracing::trace!(column = column.name(), dtype = %output.dtype(), "computed column transform");
        Ok(output)
    }

    #[inline]
    pub fn features(&self) -> &'a Features {
        self.features
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
