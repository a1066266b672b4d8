//! Vocabulary-backed categorical columns.
//!
//! Both columns map values through a [`LookupTable`]: the `i`-th vocabulary
//! entry gets id `i`, and unknown values resolve to, in order of precedence,
//! the configured default id, an out-of-vocabulary bucket
//! `vocabulary_size + fingerprint64(text) % num_oov_buckets`, or `-1`.
//!
//! The list column builds its table at construction. The file column defers
//! reading the file to the first lookup, so a missing file or a file shorter
//! than `vocabulary_size` is reported by the first transform, not by the
//! constructor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use bon::bon;

use super::categorical::CategoricalInput;
use super::{cached_sparse_ids, CategoricalColumn, ColumnId, FeatureColumn, IdWeightPair, ParseConfig, ParseSpec};
use crate::cache::TransformCache;
use crate::data::{DType, Feature};
use crate::error::{ColumnError, Result};
use crate::hashing::{int_bucket, string_bucket};

// =============================================================================
// Vocabulary and lookup table
// =============================================================================

/// Ordered vocabulary entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vocabulary {
    Strings(Vec<String>),
    Ints(Vec<i64>),
}

impl Vocabulary {
    /// Natural dtype of the entries.
    pub fn dtype(&self) -> DType {
        match self {
            Vocabulary::Strings(_) => DType::String,
            Vocabulary::Ints(_) => DType::Int64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Vocabulary::Strings(v) => v.len(),
            Vocabulary::Ints(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(v: Vec<String>) -> Self {
        Vocabulary::Strings(v)
    }
}

impl From<Vec<&str>> for Vocabulary {
    fn from(v: Vec<&str>) -> Self {
        Vocabulary::Strings(v.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<i64>> for Vocabulary {
    fn from(v: Vec<i64>) -> Self {
        Vocabulary::Ints(v)
    }
}

impl From<Vec<i32>> for Vocabulary {
    fn from(v: Vec<i32>) -> Self {
        Vocabulary::Ints(v.into_iter().map(i64::from).collect())
    }
}

/// Value to id mapping with out-of-vocabulary handling.
#[derive(Debug, Clone)]
pub struct LookupTable {
    strings: HashMap<String, i64>,
    ints: HashMap<i64, i64>,
    vocabulary_size: usize,
    num_oov_buckets: usize,
    default_value: Option<i64>,
}

impl LookupTable {
    /// # Errors
    ///
    /// [`ColumnError::Config`] on a duplicate entry.
    pub fn new(vocabulary: &Vocabulary, num_oov_buckets: usize, default_value: Option<i64>) -> Result<Self> {
        let mut table = Self {
            strings: HashMap::new(),
            ints: HashMap::new(),
            vocabulary_size: vocabulary.len(),
            num_oov_buckets,
            default_value,
        };
        let duplicate = match vocabulary {
            Vocabulary::Strings(entries) => entries
                .iter()
                .enumerate()
                .find(|&(i, s)| table.strings.insert(s.clone(), i as i64).is_some())
                .map(|(_, s)| s.clone()),
            Vocabulary::Ints(entries) => entries
                .iter()
                .enumerate()
                .find(|&(i, &v)| table.ints.insert(v, i as i64).is_some())
                .map(|(_, v)| v.to_string()),
        };
        match duplicate {
            Some(entry) => Err(ColumnError::config(format!("duplicate vocabulary entry: {entry}"))),
            None => Ok(table),
        }
    }

    /// Read the first `vocabulary_size` lines of `path`, one entry per line.
    ///
    /// # Errors
    ///
    /// [`ColumnError::VocabularyInit`] if the file cannot be read, has fewer
    /// than `vocabulary_size` lines, holds a non-integer entry for an integer
    /// `dtype`, or repeats an entry.
    pub fn from_file(
        path: &Path,
        vocabulary_size: usize,
        dtype: DType,
        num_oov_buckets: usize,
        default_value: Option<i64>,
    ) -> Result<Self> {
        let init_error = |reason: String| ColumnError::VocabularyInit {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| init_error(e.to_string()))?;
        let lines: Vec<&str> = content.lines().take(vocabulary_size).collect();
        if lines.len() < vocabulary_size {
            return Err(init_error(format!(
                "Invalid vocab_size {vocabulary_size}: file has only {} lines",
                lines.len()
            )));
        }

        let vocabulary = if dtype.is_integer() {
            let ints = lines
                .iter()
                .map(|line| {
                    line.trim()
                        .parse::<i64>()
                        .map_err(|e| init_error(format!("invalid integer entry {line:?}: {e}")))
                })
                .collect::<Result<Vec<_>>>()?;
            Vocabulary::Ints(ints)
        } else {
            Vocabulary::from(lines)
        };
        Self::new(&vocabulary, num_oov_buckets, default_value).map_err(|e| init_error(e.to_string()))
    }

    #[inline]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    #[inline]
    pub fn num_oov_buckets(&self) -> usize {
        self.num_oov_buckets
    }

    pub fn lookup_str(&self, value: &str) -> i64 {
        match self.strings.get(value) {
            Some(&id) => id,
            None => self.unknown(|n| string_bucket(value, n)),
        }
    }

    pub fn lookup_int(&self, value: i64) -> i64 {
        match self.ints.get(&value) {
            Some(&id) => id,
            None => self.unknown(|n| int_bucket(value, n)),
        }
    }

    #[inline]
    fn unknown(&self, bucket: impl FnOnce(u64) -> u64) -> i64 {
        if let Some(default) = self.default_value {
            default
        } else if self.num_oov_buckets > 0 {
            (self.vocabulary_size as u64 + bucket(self.num_oov_buckets as u64)) as i64
        } else {
            -1
        }
    }
}

fn check_oov_args(key: &str, num_oov_buckets: usize, default_value: Option<i64>) -> Result<()> {
    if num_oov_buckets > 0 && default_value.is_some() {
        return Err(ColumnError::config(format!(
            "can't specify both num_oov_buckets and default_value in {key}"
        )));
    }
    Ok(())
}

fn lookup_ids(table: &LookupTable, input: CategoricalInput) -> Feature {
    Feature::Sparse(input.into_ids(|s| table.lookup_str(s), |i| table.lookup_int(i)))
}

// =============================================================================
// File vocabulary
// =============================================================================

/// Categorical column whose vocabulary is the first lines of a text file.
#[derive(Debug, Clone)]
pub struct VocabularyFileCategoricalColumn {
    id: ColumnId,
    key: String,
    vocabulary_file: PathBuf,
    vocabulary_size: usize,
    num_oov_buckets: usize,
    default_value: Option<i64>,
    dtype: DType,
    table: OnceLock<Arc<LookupTable>>,
}

#[bon]
impl VocabularyFileCategoricalColumn {
    /// Validate local arguments; the file itself is not touched.
    ///
    /// # Errors
    ///
    /// - [`ColumnError::Config`] for an empty path, a zero `vocabulary_size`,
    ///   or both `num_oov_buckets > 0` and `default_value`
    /// - [`ColumnError::DtypeMismatch`] if `dtype` is neither string nor integer
    #[builder]
    pub fn new(
        #[builder(into)] key: String,
        #[builder(into)] vocabulary_file: PathBuf,
        vocabulary_size: usize,
        #[builder(default)] num_oov_buckets: usize,
        default_value: Option<i64>,
        #[builder(default = DType::String)] dtype: DType,
    ) -> Result<Self> {
        if vocabulary_file.as_os_str().is_empty() {
            return Err(ColumnError::config(format!("Missing vocabulary_file in {key}")));
        }
        if vocabulary_size < 1 {
            return Err(ColumnError::config(format!(
                "Invalid vocabulary_size in {key}: must be at least 1"
            )));
        }
        check_oov_args(&key, num_oov_buckets, default_value)?;
        if !dtype.is_categorical() {
            return Err(ColumnError::dtype(&key, format!("dtype must be string or integer, got {dtype}")));
        }
        Ok(Self {
            id: ColumnId::next(),
            key,
            vocabulary_file,
            vocabulary_size,
            num_oov_buckets,
            default_value,
            dtype,
            table: OnceLock::new(),
        })
    }
}

impl VocabularyFileCategoricalColumn {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn vocabulary_file(&self) -> &Path {
        &self.vocabulary_file
    }

    #[inline]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    #[inline]
    pub fn num_oov_buckets(&self) -> usize {
        self.num_oov_buckets
    }

    #[inline]
    pub fn default_value(&self) -> Option<i64> {
        self.default_value
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The lookup table, reading the vocabulary file on first call.
    ///
    /// A failed read is not cached; the next call retries.
    pub fn lookup_table(&self) -> Result<Arc<LookupTable>> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }
        let table = LookupTable::from_file(
            &self.vocabulary_file,
            self.vocabulary_size,
            self.dtype,
            self.num_oov_buckets,
            self.default_value,
        )?;
        tracing::debug!(
            column = %self.key,
            path = %self.vocabulary_file.display(),
            vocabulary_size = self.vocabulary_size,
            num_oov_buckets = self.num_oov_buckets,
            "initialized vocabulary table"
        );
        Ok(Arc::clone(self.table.get_or_init(|| Arc::new(table))))
    }
}

impl FeatureColumn for VocabularyFileCategoricalColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::from([(self.key.clone(), ParseSpec::VarLen { dtype: self.dtype })])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        // Input dtype errors take precedence over a broken vocabulary file.
        let raw = cache.get_raw(&self.key)?;
        let input = CategoricalInput::from_feature(&raw, &self.key, self.dtype)?;
        let table = self.lookup_table()?;
        Ok(Some(lookup_ids(&table, input)))
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        Some(self)
    }
}

impl CategoricalColumn for VocabularyFileCategoricalColumn {
    fn num_buckets(&self) -> usize {
        self.vocabulary_size + self.num_oov_buckets
    }

    fn sparse_tensors(&self, cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
        cached_sparse_ids(self, cache)
    }
}

// =============================================================================
// In-memory vocabulary
// =============================================================================

/// Categorical column with an in-memory vocabulary.
#[derive(Debug, Clone)]
pub struct VocabularyListCategoricalColumn {
    id: ColumnId,
    key: String,
    vocabulary: Vocabulary,
    dtype: DType,
    num_oov_buckets: usize,
    default_value: Option<i64>,
    table: Arc<LookupTable>,
}

#[bon]
impl VocabularyListCategoricalColumn {
    /// # Errors
    ///
    /// - [`ColumnError::Config`] for an empty or duplicated vocabulary, or
    ///   both `num_oov_buckets > 0` and `default_value`
    /// - [`ColumnError::DtypeMismatch`] if `dtype` is given and is not a
    ///   categorical dtype matching the vocabulary entries
    #[builder]
    pub fn new(
        #[builder(into)] key: String,
        #[builder(into)] vocabulary_list: Vocabulary,
        dtype: Option<DType>,
        #[builder(default)] num_oov_buckets: usize,
        default_value: Option<i64>,
    ) -> Result<Self> {
        if vocabulary_list.is_empty() {
            return Err(ColumnError::config(format!("vocabulary_list for {key} must not be empty")));
        }
        let inferred = vocabulary_list.dtype();
        let dtype = match dtype {
            None => inferred,
            Some(dtype) if !dtype.is_categorical() => {
                return Err(ColumnError::dtype(&key, format!("dtype must be string or integer, got {dtype}")));
            }
            Some(dtype) if !dtype.is_compatible_with(inferred) => {
                return Err(ColumnError::dtype(
                    &key,
                    format!("dtype {dtype} does not match vocabulary_list of {inferred}"),
                ));
            }
            Some(dtype) => dtype,
        };
        check_oov_args(&key, num_oov_buckets, default_value)?;
        let table = LookupTable::new(&vocabulary_list, num_oov_buckets, default_value)
            .map_err(|e| ColumnError::config(format!("invalid vocabulary_list for {key}: {e}")))?;
        Ok(Self {
            id: ColumnId::next(),
            key,
            vocabulary: vocabulary_list,
            dtype,
            num_oov_buckets,
            default_value,
            table: Arc::new(table),
        })
    }
}

impl VocabularyListCategoricalColumn {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn vocabulary_list(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn num_oov_buckets(&self) -> usize {
        self.num_oov_buckets
    }

    #[inline]
    pub fn default_value(&self) -> Option<i64> {
        self.default_value
    }

    #[inline]
    pub fn lookup_table(&self) -> &LookupTable {
        &self.table
    }
}

impl FeatureColumn for VocabularyListCategoricalColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn parse_config(&self) -> ParseConfig {
        ParseConfig::from([(self.key.clone(), ParseSpec::VarLen { dtype: self.dtype })])
    }

    fn transform(&self, cache: &mut TransformCache<'_>) -> Result<Option<Feature>> {
        let raw = cache.get_raw(&self.key)?;
        let input = CategoricalInput::from_feature(&raw, &self.key, self.dtype)?;
        Ok(Some(lookup_ids(&self.table, input)))
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalColumn> {
        Some(self)
    }
}

impl CategoricalColumn for VocabularyListCategoricalColumn {
    fn num_buckets(&self) -> usize {
        self.vocabulary.len() + self.num_oov_buckets
    }

    fn sparse_tensors(&self, cache: &mut TransformCache<'_>) -> Result<IdWeightPair> {
        cached_sparse_ids(self, cache)
    }
}
