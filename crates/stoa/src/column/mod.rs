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

//! Columns: typed, immutable-after-publish value sequences in one of
//! four physical forms. Operators dispatch over the form through
//! `ColumnVisitor`.

mod dictionary;
mod reference;
mod run_length;
mod typed;
mod value;

pub use dictionary::DictionaryColumn;
pub use reference::{PosList, ReferenceColumn};
pub use run_length::RunLengthColumn;
pub use typed::TypedValues;
pub use value::ValueColumn;

use crate::types::{DataType, Value};
use crate::{Result, StoaError};

#[derive(Debug, Clone)]
pub enum Column {
    Value(ValueColumn),
    Dictionary(DictionaryColumn),
    RunLength(RunLengthColumn),
    Reference(ReferenceColumn),
}

impl Column {
    pub fn data_type(&self) -> DataType {
        match self {
            Column::Value(c) => c.data_type(),
            Column::Dictionary(c) => c.data_type(),
            Column::RunLength(c) => c.data_type(),
            Column::Reference(c) => c.data_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Value(c) => c.len(),
            Column::Dictionary(c) => c.len(),
            Column::RunLength(c) => c.len(),
            Column::Reference(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Value {
        match self {
            Column::Value(c) => c.get(row),
            Column::Dictionary(c) => c.get(row),
            Column::RunLength(c) => c.get(row),
            Column::Reference(c) => c.get(row),
        }
    }

    /// Append to a plain column; encoded and reference columns are
    /// immutable.
    pub fn append(&mut self, value: &Value) -> Result<()> {
        match self {
            Column::Value(c) => c.append(value),
            _ => Err(StoaError::Schema(
                "cannot append to an encoded or reference column".into(),
            )),
        }
    }

    /// Dispatch on the physical form.
    pub fn visit<V: ColumnVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        match self {
            Column::Value(c) => visitor.visit_value(c),
            Column::Dictionary(c) => visitor.visit_dictionary(c),
            Column::RunLength(c) => visitor.visit_run_length(c),
            Column::Reference(c) => visitor.visit_reference(c),
        }
    }
}

/// Handler over the physical column forms; the implementor carries its
/// own context.
pub trait ColumnVisitor {
    fn visit_value(&mut self, column: &ValueColumn) -> Result<()>;
    fn visit_dictionary(&mut self, column: &DictionaryColumn) -> Result<()>;
    fn visit_run_length(&mut self, column: &RunLengthColumn) -> Result<()>;
    fn visit_reference(&mut self, column: &ReferenceColumn) -> Result<()>;
}
