//! Raw input features keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::ArrayD;

use super::{DType, SparseTensor, Tensor};

/// One raw or transformed feature: a dense tensor or a sparse triple.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Dense(Tensor),
    Sparse(SparseTensor),
}

impl Feature {
    pub fn dtype(&self) -> DType {
        match self {
            Feature::Dense(t) => t.dtype(),
            Feature::Sparse(s) => s.values().dtype(),
        }
    }

    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self, Feature::Sparse(_))
    }

    pub fn as_dense(&self) -> Option<&Tensor> {
        match self {
            Feature::Dense(t) => Some(t),
            Feature::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseTensor> {
        match self {
            Feature::Sparse(s) => Some(s),
            Feature::Dense(_) => None,
        }
    }

    /// Dense `f32` values, if this is a dense float32 tensor.
    pub fn dense_f32(&self) -> Option<&ArrayD<f32>> {
        self.as_dense().and_then(Tensor::as_f32)
    }

    /// Dense `i64` values, if this is a dense int64 tensor.
    pub fn dense_i64(&self) -> Option<&ArrayD<i64>> {
        self.as_dense().and_then(Tensor::as_i64)
    }
}

impl From<Tensor> for Feature {
    fn from(t: Tensor) -> Self {
        Feature::Dense(t)
    }
}

impl From<SparseTensor> for Feature {
    fn from(s: SparseTensor) -> Self {
        Feature::Sparse(s)
    }
}

/// The input feature table for one batch.
///
/// Values are reference counted so the transformation cache can hand out the
/// raw input without copying it. The cache never inserts into or mutates this
/// table.
///
/// # Example
///
/// ```
/// use feature_columns::data::{Features, Tensor};
/// use ndarray::array;
///
/// let features = Features::new()
///     .with("price", Tensor::from(array![[1.0f32], [5.0]]));
/// assert_eq!(features.len(), 1);
/// assert!(features.contains_key("price"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Features {
    entries: HashMap<String, Arc<Feature>>,
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Feature>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a feature.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Feature>) {
        self.entries.insert(key.into(), Arc::new(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Feature>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Feature>> FromIterator<(K, V)> for Features {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut features = Features::new();
        for (k, v) in iter {
            features.insert(k, v);
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn insert_replaces_existing_key() {
        let mut features = Features::new().with("a", Tensor::from(array![[1.0f32]]));
        features.insert("a", Tensor::from(array![[2.0f32]]));
        assert_eq!(features.len(), 1);
        assert_eq!(
            features.get("a").unwrap().dense_f32().unwrap(),
            &array![[2.0f32]].into_dyn()
        );
    }

    #[test]
    fn collects_from_pairs() {
        let features: Features = vec![
            ("a", Tensor::from(array![[1i64]])),
            ("b", Tensor::from(array![["x"]])),
        ]
        .into_iter()
        .collect();
        let mut keys: Vec<_> = features.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(features.get("b").unwrap().dtype(), DType::String);
    }
}
