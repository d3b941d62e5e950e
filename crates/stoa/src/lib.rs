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

//! stoa: a research column-oriented, in-memory relational engine.
//!
//! Tables are split into bounded row groups ("chunks") of typed columns.
//! Columns are stored plain or re-encoded (dictionary, run-length) over
//! compressed integer vectors, and query operators produce reference
//! columns that address base data through shared position lists.

pub mod chunk;
pub mod column;
pub mod expression;
pub mod operators;
pub mod statistics;
pub mod storage;
pub mod table;
pub mod types;
pub mod zs;

pub use chunk::Chunk;
pub use column::{Column, ColumnVisitor};
pub use expression::{
    AggregateKind, ArithmeticOp, Expression, ExpressionKind, LogicalOp, OpExpression, ScanType,
};
pub use storage::StorageManager;
pub use table::{ChunkEncoding, Table, TableKind};
pub use types::{
    ChunkId, ChunkOffset, ColumnId, DataType, JoinMode, ParamValue, RowId, SortOrder, Value,
};

/// Errors produced by the engine.
///
/// Translation and schema errors are raised before any operator executes;
/// evaluation and resource errors abort the running query. Invariant
/// violations are debug assertions, not values of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoaError {
    /// Unresolved, ambiguous or mistyped name; column-count mismatch.
    Schema(String),
    /// Runtime type mismatch, forbidden overflow, division by zero.
    Evaluation(String),
    /// Allocation failure or other resource exhaustion.
    Resource(String),
    /// The query was cancelled cooperatively.
    Cancelled,
}

impl std::fmt::Display for StoaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoaError::Schema(msg) => write!(f, "schema error: {msg}"),
            StoaError::Evaluation(msg) => write!(f, "evaluation error: {msg}"),
            StoaError::Resource(msg) => write!(f, "resource error: {msg}"),
            StoaError::Cancelled => f.write_str("query cancelled"),
        }
    }
}

impl std::error::Error for StoaError {}

pub type Result<T> = std::result::Result<T, StoaError>;
