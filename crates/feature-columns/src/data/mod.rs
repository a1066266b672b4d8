//! Tensor containers for raw and transformed features.
//!
//! # Overview
//!
//! - [`Tensor`]: dense n-dimensional array of one [`DType`], batch axis first
//! - [`SparseTensor`]: coordinate-form sparse tensor (indices, values, dense shape)
//! - [`Feature`]: either of the above
//! - [`Features`]: the read-only input table for one batch, keyed by raw name
//!
//! Arrays are plain `ndarray` types; the enums only add the element-type tag
//! needed to check inputs against column declarations.

mod dtype;
mod features;
mod sparse;
mod tensor;

pub use dtype::DType;
pub use features::{Feature, Features};
pub use sparse::SparseTensor;
pub use tensor::Tensor;

pub(crate) use tensor::flatten_batch;
