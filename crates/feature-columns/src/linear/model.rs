//! Linear model over feature columns.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array, Array1, Array2, ArrayD, ArrayView2, Axis, Dimension, Ix1, Ix2, IxDyn};
use rayon::prelude::*;

use super::combiner::combine_sparse;
use super::LinearModelConfig;
use crate::cache::TransformCache;
use crate::column::{check_unique_names, CategoricalColumn, DenseColumn, FeatureColumn};
use crate::data::{flatten_batch, Features};
use crate::error::{ColumnError, Result};
use crate::utils::Parallelism;

/// Name scope of every variable created by a linear model.
pub const SCOPE: &str = "linear_model";

/// A named, shaped, mutable weight array.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: ArrayD<f32>,
    trainable: bool,
}

impl Variable {
    fn zeros(name: String, shape: &[usize], trainable: bool) -> Self {
        Self {
            name,
            value: ArrayD::zeros(IxDyn(shape)),
            trainable,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &ArrayD<f32> {
        &self.value
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    #[inline]
    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    fn matrix(&self) -> Result<ArrayView2<'_, f32>> {
        self.value
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| ColumnError::shape(&self.name, e.to_string()))
    }
}

/// How the linear model reads one column.
enum LinearView<'c> {
    Dense(&'c dyn DenseColumn),
    Categorical(&'c dyn CategoricalColumn),
}

impl<'c> LinearView<'c> {
    /// Categorical when available, dense otherwise.
    fn of(column: &'c dyn FeatureColumn) -> Result<Self> {
        let view = match column.capability() {
            Some(capability) if capability.prefers_categorical() => {
                column.as_categorical().map(LinearView::Categorical)
            }
            Some(_) => column.as_dense().map(LinearView::Dense),
            None => None,
        };
        view.ok_or_else(|| {
            ColumnError::config(format!(
                "feature column {} must be either a dense or categorical column",
                column.name()
            ))
        })
    }

    fn input_width(&self) -> usize {
        match self {
            LinearView::Dense(dense) => dense.dense_width(),
            LinearView::Categorical(categorical) => categorical.num_buckets(),
        }
    }
}

/// Weighted sum of feature columns plus a bias.
///
/// Creating the model allocates one zero-initialized variable per column,
/// shaped `[input_width, units]`, named `linear_model/<column>/weights` and
/// registered in caller order, followed by the bias
/// `linear_model/bias_weights` shaped `[units]`. The input width is the
/// flattened dense width for dense columns and `num_buckets` for categorical
/// ones; a column offering both is always read through its categorical view.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use feature_columns::column::{FeatureColumn, NumericColumn};
/// use feature_columns::data::{Features, Tensor};
/// use feature_columns::linear::{LinearModel, LinearModelConfig};
/// use ndarray::array;
///
/// let price = NumericColumn::builder().key("price").build().unwrap();
/// let columns: Vec<Arc<dyn FeatureColumn>> = vec![Arc::new(price)];
/// let mut model = LinearModel::new(columns, LinearModelConfig::default()).unwrap();
/// model.assign("linear_model/price/weights", array![[10.0f32]]).unwrap();
/// model.assign("linear_model/bias_weights", array![5.0f32]).unwrap();
///
/// let features = Features::new().with("price", Tensor::from(array![[1.0f32], [5.0]]));
/// assert_eq!(model.predict(&features).unwrap(), array![[15.0], [55.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct LinearModel {
    columns: Vec<Arc<dyn FeatureColumn>>,
    /// Column variables in column order, bias last.
    variables: Vec<Variable>,
    collections: BTreeMap<String, Vec<usize>>,
    config: LinearModelConfig,
}

impl LinearModel {
    /// Validate the columns and create zero-initialized variables.
    ///
    /// # Errors
    ///
    /// - [`ColumnError::Config`] if `columns` is empty or a column is neither
    ///   dense nor categorical
    /// - [`ColumnError::DuplicateColumn`] if two columns share a name
    pub fn new(columns: Vec<Arc<dyn FeatureColumn>>, config: LinearModelConfig) -> Result<Self> {
        let widths = columns
            .iter()
            .map(|c| LinearView::of(c.as_ref()).map(|view| view.input_width()))
            .collect::<Result<Vec<_>>>()?;
        check_unique_names(&columns)?;

        let units = config.units;
        let mut variables: Vec<Variable> = columns
            .iter()
            .zip(&widths)
            .map(|(column, &width)| {
                Variable::zeros(
                    format!("{SCOPE}/{}/weights", column.name()),
                    &[width, units],
                    config.trainable,
                )
            })
            .collect();
        variables.push(Variable::zeros(format!("{SCOPE}/bias_weights"), &[units], config.trainable));

        let collections = config
            .weight_collections
            .iter()
            .map(|name| (name.clone(), (0..variables.len()).collect()))
            .collect();

        tracing::debug!(
            columns = columns.len(),
            units,
            trainable = config.trainable,
            collections = config.weight_collections.len(),
            "registered linear model variables"
        );

        Ok(Self {
            columns,
            variables,
            collections,
            config,
        })
    }

    #[inline]
    pub fn columns(&self) -> &[Arc<dyn FeatureColumn>] {
        &self.columns
    }

    #[inline]
    pub fn config(&self) -> &LinearModelConfig {
        &self.config
    }

    #[inline]
    pub fn units(&self) -> usize {
        self.config.units
    }

    /// All variables in registration order.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variables listed as trainable, in registration order.
    pub fn trainable_variables(&self) -> Vec<&Variable> {
        self.variables.iter().filter(|v| v.trainable).collect()
    }

    /// Variables registered into `name`; empty for an unknown collection.
    pub fn collection(&self, name: &str) -> Vec<&Variable> {
        self.collections
            .get(name)
            .map(|indices| indices.iter().map(|&i| &self.variables[i]).collect())
            .unwrap_or_default()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Weights of the column called `column`.
    pub fn column_variable(&self, column: &str) -> Option<&Variable> {
        self.columns
            .iter()
            .position(|c| c.name() == column)
            .map(|i| &self.variables[i])
    }

    pub fn bias(&self) -> &Variable {
        &self.variables[self.variables.len() - 1]
    }

    /// Overwrite a variable's value.
    ///
    /// # Errors
    ///
    /// - [`ColumnError::Config`] if no variable is called `name`
    /// - [`ColumnError::ShapeMismatch`] if `value` has a different shape
    pub fn assign<D: Dimension>(&mut self, name: &str, value: Array<f32, D>) -> Result<()> {
        let variable = self
            .variables
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| ColumnError::config(format!("no variable named {name}")))?;
        if value.shape() != variable.value.shape() {
            return Err(ColumnError::shape(
                name,
                format!(
                    "cannot assign value of shape {:?} to variable of shape {:?}",
                    value.shape(),
                    variable.value.shape()
                ),
            ));
        }
        variable.value = value.into_dyn();
        Ok(())
    }

    /// Predict `[batch, units]` with the configured parallelism.
    pub fn predict(&self, features: &Features) -> Result<Array2<f32>> {
        self.predict_with(features, self.config.parallelism)
    }

    /// Predict with explicit parallelism control.
    ///
    /// Every column is transformed at most once, through one cache shared by
    /// all columns of this call.
    ///
    /// # Errors
    ///
    /// Any transform error, [`ColumnError::ShapeMismatch`] when a dense column
    /// cannot be reshaped to `[batch, width]` or columns disagree on the batch
    /// size, and [`ColumnError::IdOutOfRange`] for ids past a weight table.
    pub fn predict_with(&self, features: &Features, parallelism: Parallelism) -> Result<Array2<f32>> {
        let mut cache = TransformCache::new(features);
        let mut output: Option<Array2<f32>> = None;

        for (column, variable) in self.columns.iter().zip(&self.variables) {
            let weights = variable.matrix()?;
            let contribution = match LinearView::of(column.as_ref())? {
                LinearView::Categorical(categorical) => {
                    let pair = categorical.sparse_tensors(&mut cache)?;
                    combine_sparse(&pair, weights, self.config.sparse_combiner, parallelism, column.name())?
                }
                LinearView::Dense(dense) => {
                    let values = dense.dense_tensor(&mut cache)?;
                    flatten_batch(&values, dense.dense_width(), column.name())?.dot(&weights)
                }
            };

            match output.as_mut() {
                None => output = Some(contribution),
                Some(acc) if acc.nrows() != contribution.nrows() => {
                    return Err(ColumnError::shape(
                        column.name(),
                        format!(
                            "batch size {} differs from {} of preceding columns",
                            contribution.nrows(),
                            acc.nrows()
                        ),
                    ));
                }
                Some(acc) => *acc += &contribution,
            }
        }

        let mut output = output.ok_or_else(|| ColumnError::config("feature_columns must not be empty"))?;
        let bias: Array1<f32> = self
            .bias()
            .value
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|e| ColumnError::shape(&self.bias().name, e.to_string()))?
            .to_owned();

        match parallelism {
            Parallelism::Sequential => {
                for mut row in output.rows_mut() {
                    row += &bias;
                }
            }
            Parallelism::Parallel => {
                output.axis_iter_mut(Axis(0)).into_par_iter().for_each(|mut row| {
                    row += &bias;
                });
            }
        }

        tracing::trace!(batch = output.nrows(), units = output.ncols(), "linear model prediction");
        Ok(output)
    }
}

/// Build a [`LinearModel`] over `columns` and predict `features` with it.
///
/// The returned model holds the zero-initialized variables, so the returned
/// prediction is the (zero) bias broadcast to `[batch, units]`.
pub fn make_linear_model(
    features: &Features,
    columns: Vec<Arc<dyn FeatureColumn>>,
    config: LinearModelConfig,
) -> Result<(LinearModel, Array2<f32>)> {
    let model = LinearModel::new(columns, config)?;
    let predictions = model.predict(features)?;
    Ok((model, predictions))
}
