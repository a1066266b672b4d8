//! Linear model assembly.
//!
//! [`LinearModel`] owns one weight variable per column plus a bias and
//! predicts `[batch, units]` from a table of raw features. Dense columns are
//! multiplied with their weights; categorical columns select weight rows by id
//! and reduce them with a [`SparseCombiner`].

mod combiner;
mod config;
mod model;

pub use config::{LinearModelConfig, SparseCombiner};
pub use model::{make_linear_model, LinearModel, Variable, SCOPE};
