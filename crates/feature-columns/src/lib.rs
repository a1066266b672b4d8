//! feature-columns: declarative feature transformations for linear models.
//!
//! Raw features arrive as a keyed table of dense and sparse tensors. Feature
//! columns describe how each raw key becomes model input: numeric passthrough,
//! bucketization, string hashing or vocabulary lookup. Assemblers evaluate a
//! set of columns over one batch, transforming every column at most once.
//!
//! # Key Types
//!
//! - [`Features`] / [`Tensor`] / [`SparseTensor`] - Raw input table of one batch
//! - [`NumericColumn`], [`BucketizedColumn`], [`HashedCategoricalColumn`],
//!   [`VocabularyFileCategoricalColumn`], [`VocabularyListCategoricalColumn`] - Columns
//! - [`TransformCache`] - Per-batch memoization of column outputs
//! - [`LinearModel`] / [`LinearModelConfig`] - Weighted sum of columns plus bias
//!
//! # Assembly
//!
//! Use [`make_linear_model`] for predictions and [`make_input_layer`] for a
//! concatenated dense feature vector. Record batches can be turned into
//! [`Features`] with [`parse::parse_examples`] and the merged
//! [`column::parse_config_for`] of the columns.

pub mod cache;
pub mod column;
pub mod data;
pub mod error;
pub mod hashing;
pub mod input_layer;
pub mod linear;
pub mod parse;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Columns
pub use column::{
    BucketizedColumn, CategoricalColumn, DenseColumn, FeatureColumn, HashedCategoricalColumn, NumericColumn,
    VocabularyFileCategoricalColumn, VocabularyListCategoricalColumn,
};

// Data types
pub use data::{DType, Feature, Features, SparseTensor, Tensor};

// Assemblers
pub use input_layer::make_input_layer;
pub use linear::{make_linear_model, LinearModel, LinearModelConfig, SparseCombiner};

pub use cache::TransformCache;
pub use error::{ColumnError, Result};
pub use utils::Parallelism;
