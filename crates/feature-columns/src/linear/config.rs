//! Linear model configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use feature_columns::linear::{LinearModelConfig, SparseCombiner};
//!
//! // All defaults: one output unit, sum combiner, trainable
//! let config = LinearModelConfig::builder().build().unwrap();
//! assert_eq!(config.units, 1);
//!
//! let config = LinearModelConfig::builder()
//!     .units(3)
//!     .sparse_combiner(SparseCombiner::Mean)
//!     .weight_collections(vec!["my_vars".to_string()])
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{ColumnError, Result};
use crate::utils::Parallelism;

// =============================================================================
// SparseCombiner
// =============================================================================

/// Reduction over the ids of one example in a categorical column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparseCombiner {
    /// Weighted sum of the selected rows.
    #[default]
    Sum,
    /// Weighted sum divided by the sum of weights.
    Mean,
    /// Weighted sum divided by the root of the sum of squared weights.
    Sqrtn,
}

impl SparseCombiner {
    pub fn as_str(self) -> &'static str {
        match self {
            SparseCombiner::Sum => "sum",
            SparseCombiner::Mean => "mean",
            SparseCombiner::Sqrtn => "sqrtn",
        }
    }
}

impl fmt::Display for SparseCombiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SparseCombiner {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(SparseCombiner::Sum),
            "mean" => Ok(SparseCombiner::Mean),
            "sqrtn" => Ok(SparseCombiner::Sqrtn),
            other => Err(ColumnError::config(format!(
                "sparse_combiner must be one of sum, mean, sqrtn; got {other:?}"
            ))),
        }
    }
}

// =============================================================================
// LinearModelConfig
// =============================================================================

/// Options of a linear model assembly call.
///
/// Deserialization runs the same validation as [`LinearModelConfigBuilder::build`].
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(try_from = "LinearModelConfigFields")]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct LinearModelConfig {
    /// Output units per example. Default: 1.
    #[builder(default = 1)]
    pub units: usize,

    /// Extra collections every created variable is registered into.
    #[builder(default)]
    pub weight_collections: Vec<String>,

    /// Whether created variables are listed as trainable. Default: true.
    #[builder(default = true)]
    pub trainable: bool,

    /// Reduction for categorical columns. Default: `Sum`.
    #[builder(default)]
    pub sparse_combiner: SparseCombiner,

    /// Row-level parallelism of prediction. Default: `Sequential`.
    #[builder(default)]
    pub parallelism: Parallelism,
}

/// Unvalidated serialized form of [`LinearModelConfig`].
#[derive(Deserialize)]
struct LinearModelConfigFields {
    #[serde(default = "default_units")]
    units: usize,
    #[serde(default)]
    weight_collections: Vec<String>,
    #[serde(default = "default_trainable")]
    trainable: bool,
    #[serde(default)]
    sparse_combiner: SparseCombiner,
    #[serde(default)]
    parallelism: Parallelism,
}

fn default_units() -> usize {
    1
}

fn default_trainable() -> bool {
    true
}

impl TryFrom<LinearModelConfigFields> for LinearModelConfig {
    type Error = ColumnError;

    fn try_from(fields: LinearModelConfigFields) -> Result<Self> {
        LinearModelConfig::builder()
            .units(fields.units)
            .weight_collections(fields.weight_collections)
            .trainable(fields.trainable)
            .sparse_combiner(fields.sparse_combiner)
            .parallelism(fields.parallelism)
            .build()
    }
}

impl<S: linear_model_config_builder::IsComplete> LinearModelConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// [`ColumnError::Config`] if `units == 0` or a collection name is empty.
    pub fn build(self) -> Result<LinearModelConfig> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl LinearModelConfig {
    fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(ColumnError::config("units must be at least 1"));
        }
        if self.weight_collections.iter().any(String::is_empty) {
            return Err(ColumnError::config("weight collection names must not be empty"));
        }
        Ok(())
    }
}

impl Default for LinearModelConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
