//! Plain (unencoded) columns: a contiguous typed sequence plus an
//! optional parallel null bitmap, appendable until the chunk is sealed.

use crate::column::typed::TypedValues;
use crate::types::{DataType, Value};
use crate::{Result, StoaError};

#[derive(Debug, Clone)]
pub struct ValueColumn {
    data: TypedValues,
    nulls: Option<Vec<bool>>,
}

impl ValueColumn {
    pub fn new(data_type: DataType, nullable: bool) -> ValueColumn {
        ValueColumn {
            data: TypedValues::new(data_type),
            nulls: nullable.then(Vec::new),
        }
    }

    /// Build a column from already-typed values; NULLs require
    /// `nullable`.
    pub fn from_values(data_type: DataType, values: &[Value], nullable: bool) -> Result<ValueColumn> {
        let mut column = ValueColumn::new(data_type, nullable);
        for value in values {
            column.append(value)?;
        }
        Ok(column)
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    pub fn append(&mut self, value: &Value) -> Result<()> {
        if value.is_null() && self.nulls.is_none() {
            return Err(StoaError::Schema(
                "cannot append NULL to a non-nullable column".into(),
            ));
        }
        self.data.push(value)?;
        if let Some(nulls) = &mut self.nulls {
            nulls.push(value.is_null());
        }
        Ok(())
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.nulls.as_ref().is_some_and(|nulls| nulls[index])
    }

    pub fn get(&self, index: usize) -> Value {
        if self.is_null(index) {
            Value::Null
        } else {
            self.data.get(index)
        }
    }

    pub fn values(&self) -> &TypedValues {
        &self.data
    }
}
