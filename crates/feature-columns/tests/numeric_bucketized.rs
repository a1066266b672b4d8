//! Numeric columns and their bucketization through the transform cache.

use feature_columns::cache::TransformCache;
use feature_columns::column::{BucketizedColumn, CategoricalColumn, DenseColumn, Normalizer, NumericColumn};
use feature_columns::data::{Features, SparseTensor, Tensor};
use feature_columns::ColumnError;
use ndarray::array;

fn price(shape: Vec<usize>) -> NumericColumn {
    NumericColumn::builder().key("price").shape(shape).build().unwrap()
}

#[test]
fn test_numeric_dense_tensor_is_float32() {
    let column = price(vec![2]);
    let features = Features::new().with("price", Tensor::from(array![[1i64, 2], [5, 6]]));
    let mut cache = TransformCache::new(&features);
    let dense = column.dense_tensor(&mut cache).unwrap();
    assert_eq!(dense, array![[1.0f32, 2.0], [5.0, 6.0]].into_dyn());
}

#[test]
fn test_normalizer_applies_before_bucketization() {
    let source = NumericColumn::builder()
        .key("price")
        .normalizer(Normalizer::new(|x| x * 10.0))
        .build()
        .unwrap();
    let bucketized = BucketizedColumn::new(source, vec![0.0, 2.0, 4.0, 6.0]).unwrap();
    let features = Features::new().with("price", Tensor::from(array![[0.1f32], [0.5]]));
    let mut cache = TransformCache::new(&features);
    let output = cache.get_column(&bucketized).unwrap();
    assert_eq!(output.dense_i64().unwrap(), &array![[1i64], [3]].into_dyn());
}

#[test]
fn test_sparse_input_is_rejected() {
    let column = price(vec![1]);
    let sparse = SparseTensor::from_coords(&[[0, 0]], array![1.0f32], [1, 1]).unwrap();
    let features = Features::new().with("price", sparse);
    let mut cache = TransformCache::new(&features);
    let err = column.dense_tensor(&mut cache).unwrap_err();
    assert!(matches!(err, ColumnError::InvalidInputType { key } if key == "price"));
}

#[test]
fn test_bucketized_views() {
    let bucketized = BucketizedColumn::new(price(vec![2]), vec![0.0, 2.0, 4.0, 6.0]).unwrap();
    let features = Features::new().with("price", Tensor::from(array![[-1.0f32, 1.0], [5.0, 6.0]]));
    let mut cache = TransformCache::new(&features);

    let ids = bucketized.sparse_tensors(&mut cache).unwrap().ids;
    assert_eq!(ids.indices(), &array![[0, 0], [0, 1], [1, 0], [1, 1]]);
    assert_eq!(ids.values().as_i64().unwrap(), &array![0i64, 6, 3, 9].into_dyn());
    assert_eq!(ids.dense_shape(), &[2, 2]);

    let one_hot = bucketized.dense_tensor(&mut cache).unwrap();
    assert_eq!(one_hot.shape(), &[2, 2, 5]);
    assert_eq!(one_hot.sum(), 4.0);
    assert_eq!(one_hot[[1, 1, 4]], 1.0);
    assert_eq!(cache.stats().computations, 2);
}
