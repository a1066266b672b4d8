//! Weighted row lookup for categorical columns.
//!
//! For example `i` with ids `j_1..j_k` and weights `w_1..w_k`,
//!
//! ```text
//! out[i] = sum_t w_t * W[j_t] / denom
//! denom  = 1 (sum) | sum_t w_t (mean) | sqrt(sum_t w_t^2) (sqrtn)
//! ```
//!
//! Negative ids are skipped and do not count towards the denominator. An
//! example without ids, or with a zero denominator, yields a zero row.

use ndarray::{Array2, ArrayView2};

use super::SparseCombiner;
use crate::column::IdWeightPair;
use crate::error::{ColumnError, Result};
use crate::utils::Parallelism;

/// Combine the rows of `table` selected by `pair` into `[batch, units]`.
pub(crate) fn combine_sparse(
    pair: &IdWeightPair,
    table: ArrayView2<'_, f32>,
    combiner: SparseCombiner,
    parallelism: Parallelism,
    column: &str,
) -> Result<Array2<f32>> {
    let ids = pair
        .ids
        .values()
        .as_i64()
        .ok_or_else(|| ColumnError::dtype(column, "sparse ids must be int64"))?;
    let id_weights = match &pair.weights {
        Some(w) => {
            if w.nnz() != pair.ids.nnz() {
                return Err(ColumnError::shape(
                    column,
                    format!("{} weights for {} ids", w.nnz(), pair.ids.nnz()),
                ));
            }
            let values = w
                .values()
                .as_f32()
                .ok_or_else(|| ColumnError::dtype(column, "sparse weights must be float32"))?;
            Some(values.iter().copied().collect::<Vec<f32>>())
        }
        None => None,
    };

    let batch = pair.ids.batch_size();
    let num_buckets = table.nrows();
    let units = table.ncols();

    let mut rows: Vec<Vec<(usize, f32)>> = vec![Vec::new(); batch];
    for (k, &id) in ids.iter().enumerate() {
        if id < 0 {
            continue;
        }
        if id as usize >= num_buckets {
            return Err(ColumnError::IdOutOfRange {
                column: column.to_owned(),
                id,
                num_buckets,
            });
        }
        let row = pair.ids.index(k)[0];
        let weight = id_weights.as_ref().map_or(1.0, |w| w[k]);
        rows[row].push((id as usize, weight));
    }

    let combined = parallelism.maybe_par_map(rows, |entries| {
        let mut out = vec![0.0f32; units];
        let denom = match combiner {
            SparseCombiner::Sum => 1.0,
            SparseCombiner::Mean => entries.iter().map(|&(_, w)| w).sum::<f32>(),
            SparseCombiner::Sqrtn => entries.iter().map(|&(_, w)| w * w).sum::<f32>().sqrt(),
        };
        if entries.is_empty() || denom == 0.0 {
            return out;
        }
        for &(id, w) in &entries {
            for (o, &v) in out.iter_mut().zip(table.row(id)) {
                *o += w * v;
            }
        }
        if combiner != SparseCombiner::Sum {
            out.iter_mut().for_each(|o| *o /= denom);
        }
        out
    });

    let flat: Vec<f32> = combined.into_iter().flatten().collect();
    Array2::from_shape_vec((batch, units), flat).map_err(|e| ColumnError::shape(column, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SparseTensor;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use rstest::rstest;

    fn pair(weights: Option<Vec<f32>>) -> IdWeightPair {
        let ids = SparseTensor::from_coords(&[[0, 0], [0, 1], [1, 0]], array![0i64, 2, -1], [3, 2]).unwrap();
        let weights = weights.map(|w| ids.with_values(Array1::from(w).into()));
        IdWeightPair { ids, weights }
    }

    #[rstest]
    #[case(SparseCombiner::Sum, 15.0)]
    #[case(SparseCombiner::Mean, 7.5)]
    #[case(SparseCombiner::Sqrtn, 15.0 / 2f32.sqrt())]
    fn unweighted_combiners(#[case] combiner: SparseCombiner, #[case] expected: f32) {
        let table = array![[5.0f32], [7.0], [10.0]];
        let out = combine_sparse(&pair(None), table.view(), combiner, Parallelism::Sequential, "c").unwrap();
        assert_eq!(out.dim(), (3, 1));
        assert_abs_diff_eq!(out[[0, 0]], expected, epsilon = 1e-5);
        // Only a pruned id, and no ids at all.
        assert_eq!(out[[1, 0]], 0.0);
        assert_eq!(out[[2, 0]], 0.0);
    }

    #[test]
    fn weighted_mean_divides_by_weight_sum() {
        let table = array![[5.0f32], [7.0], [10.0]];
        let out = combine_sparse(
            &pair(Some(vec![1.0, 3.0, 2.0])),
            table.view(),
            SparseCombiner::Mean,
            Parallelism::Sequential,
            "c",
        )
        .unwrap();
        assert_abs_diff_eq!(out[[0, 0]], (5.0 + 30.0) / 4.0, epsilon = 1e-5);
    }

    #[test]
    fn id_out_of_range_is_rejected() {
        let table = array![[5.0f32], [7.0]];
        let err = combine_sparse(&pair(None), table.view(), SparseCombiner::Sum, Parallelism::Sequential, "c")
            .unwrap_err();
        assert!(matches!(err, ColumnError::IdOutOfRange { id: 2, num_buckets: 2, .. }));
    }

    #[test]
    fn parallel_matches_sequential() {
        let table = array![[5.0f32, 1.0], [7.0, 2.0], [10.0, 3.0]];
        let seq = combine_sparse(&pair(None), table.view(), SparseCombiner::Sqrtn, Parallelism::Sequential, "c")
            .unwrap();
        let par = combine_sparse(&pair(None), table.view(), SparseCombiner::Sqrtn, Parallelism::Parallel, "c")
            .unwrap();
        assert_eq!(seq, par);
    }
}
