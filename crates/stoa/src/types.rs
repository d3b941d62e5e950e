//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Element types, the tagged value variant, and row addressing.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Result, StoaError};

/// Index of a chunk within a table.
pub type ChunkId = u32;
/// Row offset within a chunk.
pub type ChunkOffset = u32;
/// Dense index of a column within a table or plan node output.
pub type ColumnId = u16;
/// Index into a dictionary column's dictionary.
pub type ValueId = u32;

/// The closed set of column element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int32 => "int",
            DataType::Int64 => "long",
            DataType::Float32 => "float",
            DataType::Float64 => "double",
            DataType::Text => "text",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, DataType::Text)
    }

    /// Numeric promotion: the wider of two numeric types.
    pub fn promote(self, other: DataType) -> Result<DataType> {
        fn rank(t: DataType) -> u8 {
            match t {
                DataType::Int32 => 0,
                DataType::Int64 => 1,
                DataType::Float32 => 2,
                DataType::Float64 => 3,
                DataType::Text => 4,
            }
        }
        if self == other {
            return Ok(self);
        }
        if !self.is_numeric() || !other.is_numeric() {
            return Err(StoaError::Evaluation(format!(
                "cannot combine {} and {}",
                self.name(),
                other.name()
            )));
        }
        // Int mixed with float widens to double.
        let wide = if rank(self) >= rank(other) { self } else { other };
        if wide == DataType::Float32 && matches!(self, DataType::Int64)
            || wide == DataType::Float32 && matches!(other, DataType::Int64)
        {
            return Ok(DataType::Float64);
        }
        Ok(wide)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value: a concrete instance of one element type, or NULL.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The element type of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Text(_) => Some(DataType::Text),
        }
    }

    /// Convert into the given element type. NULL converts to NULL; numeric
    /// widening and narrowing are allowed, text only to text.
    pub fn coerce(self, target: DataType) -> Result<Value> {
        let err = |v: &Value| {
            StoaError::Evaluation(format!("cannot convert {v} to {}", target.name()))
        };
        match (&self, target) {
            (Value::Null, _) => Ok(Value::Null),
            (_, t) if self.data_type() == Some(t) => Ok(self),
            (Value::Int32(v), DataType::Int64) => Ok(Value::Int64(*v as i64)),
            (Value::Int32(v), DataType::Float32) => Ok(Value::Float32(*v as f32)),
            (Value::Int32(v), DataType::Float64) => Ok(Value::Float64(*v as f64)),
            (Value::Int64(v), DataType::Int32) => i32::try_from(*v)
                .map(Value::Int32)
                .map_err(|_| err(&self)),
            (Value::Int64(v), DataType::Float32) => Ok(Value::Float32(*v as f32)),
            (Value::Int64(v), DataType::Float64) => Ok(Value::Float64(*v as f64)),
            (Value::Float32(v), DataType::Float64) => Ok(Value::Float64(*v as f64)),
            (Value::Float64(v), DataType::Float32) => Ok(Value::Float32(*v as f32)),
            _ => Err(err(&self)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Total order over values: NULL first, then by type, floats via
    /// `total_cmp`. Used by sort, dictionary construction and set
    /// operations; distinct from SQL three-valued comparison.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int32(_) => 1,
                Value::Int64(_) => 2,
                Value::Float32(_) => 3,
                Value::Float64(_) => 4,
                Value::Text(_) => 5,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.total_cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// SQL three-valued comparison: NULL against anything is unknown.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.total_cmp(other))
    }
}

// Structural equality: floats compare by bit pattern so that expression
// equality stays reflexive. SQL equality lives in `sql_cmp`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Int32(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Int64(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Value::Float32(v) => {
                3u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Float64(v) => {
                4u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Text(v) => {
                5u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// The stable address of a row within a table, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId {
    pub chunk_id: ChunkId,
    pub offset: ChunkOffset,
}

impl RowId {
    /// Marks the padded side of an outer join; reads as NULL.
    pub const NULL: RowId = RowId {
        chunk_id: ChunkId::MAX,
        offset: ChunkOffset::MAX,
    };

    pub fn new(chunk_id: ChunkId, offset: ChunkOffset) -> RowId {
        RowId { chunk_id, offset }
    }

    pub fn is_null(self) -> bool {
        self == RowId::NULL
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.chunk_id, self.offset)
    }
}

/// A scan parameter: a typed value, a column reference, or a positional
/// placeholder bound by `recreate`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue<C> {
    Literal(Value),
    Column(C),
    Placeholder(u16),
}

/// Join modes supported by join plan nodes and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    Inner,
    Left,
    Right,
    Outer,
    Natural,
    Cross,
}

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}
