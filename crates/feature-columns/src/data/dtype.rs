//! Element types of tensors and column declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a tensor, or the declared input type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Float64,
    Int32,
    Int64,
    String,
}

impl DType {
    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, DType::Int32 | DType::Int64)
    }

    #[inline]
    pub fn is_string(self) -> bool {
        matches!(self, DType::String)
    }

    /// Numeric columns accept anything that converts to float.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_floating() || self.is_integer()
    }

    /// Categorical columns accept strings and integers only.
    #[inline]
    pub fn is_categorical(self) -> bool {
        self.is_string() || self.is_integer()
    }

    /// Whether values of `other` may feed a categorical column declared as `self`.
    ///
    /// Integer widths are interchangeable; strings only match strings.
    pub fn is_compatible_with(self, other: DType) -> bool {
        (self.is_string() && other.is_string()) || (self.is_integer() && other.is_integer())
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::String => "string",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
