//! Run-length columns: one entry per run of equal values, with inclusive
//! end positions. NULL runs are flagged in a parallel vector (the typed
//! rendition of a NULL sentinel value).

use crate::column::typed::TypedValues;
use crate::column::value::ValueColumn;
use crate::types::{DataType, Value};

#[derive(Debug, Clone)]
pub struct RunLengthColumn {
    values: TypedValues,
    null_runs: Vec<bool>,
    // Strictly increasing; the last entry is row count - 1.
    end_positions: Vec<u32>,
}

impl RunLengthColumn {
    pub fn from_value_column(column: &ValueColumn) -> RunLengthColumn {
        let mut values = TypedValues::new(column.data_type());
        let mut null_runs = Vec::new();
        let mut end_positions: Vec<u32> = Vec::new();

        let mut current: Option<Value> = None;
        for row in 0..column.len() {
            let value = column.get(row);
            if current.as_ref() == Some(&value) {
                *end_positions.last_mut().unwrap() = row as u32;
            } else {
                let _ = values.push(&value);
                null_runs.push(value.is_null());
                end_positions.push(row as u32);
                current = Some(value);
            }
        }

        RunLengthColumn {
            values,
            null_runs,
            end_positions,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn len(&self) -> usize {
        match self.end_positions.last() {
            Some(&end) => end as usize + 1,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end_positions.is_empty()
    }

    pub fn run_count(&self) -> usize {
        self.end_positions.len()
    }

    /// Index of the run covering `row`: the first entry of
    /// `end_positions` that is >= `row`.
    pub fn run_for_row(&self, row: usize) -> usize {
        self.end_positions.partition_point(|&end| (end as usize) < row)
    }

    pub fn get(&self, row: usize) -> Value {
        let run = self.run_for_row(row);
        if self.null_runs[run] {
            Value::Null
        } else {
            self.values.get(run)
        }
    }

    pub fn run_value(&self, run: usize) -> Value {
        if self.null_runs[run] {
            Value::Null
        } else {
            self.values.get(run)
        }
    }

    pub fn values(&self) -> &TypedValues {
        &self.values
    }

    pub fn null_runs(&self) -> &[bool] {
        &self.null_runs
    }

    pub fn end_positions(&self) -> &[u32] {
        &self.end_positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_column(values: &[Option<i32>]) -> ValueColumn {
        let typed: Vec<Value> = values
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Int32))
            .collect();
        ValueColumn::from_values(DataType::Int32, &typed, true).unwrap()
    }

    #[test]
    fn collapses_runs() {
        let column = int_column(&[
            Some(4),
            Some(4),
            Some(4),
            None,
            None,
            Some(7),
            Some(4),
            Some(4),
        ]);
        let encoded = RunLengthColumn::from_value_column(&column);
        assert_eq!(encoded.run_count(), 4);
        assert_eq!(encoded.end_positions(), &[2, 4, 5, 7]);
        assert_eq!(encoded.null_runs(), &[false, true, false, false]);
        assert_eq!(encoded.len(), 8);
        for (row, expected) in [
            Value::Int32(4),
            Value::Int32(4),
            Value::Int32(4),
            Value::Null,
            Value::Null,
            Value::Int32(7),
            Value::Int32(4),
            Value::Int32(4),
        ]
        .iter()
        .enumerate()
        {
            assert_eq!(&encoded.get(row), expected, "row {row}");
        }
    }

    #[test]
    fn end_positions_strictly_increase() {
        let column = int_column(&[Some(1), Some(1), Some(2), Some(3), Some(3), Some(3)]);
        let encoded = RunLengthColumn::from_value_column(&column);
        let ends = encoded.end_positions();
        assert!(ends.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*ends.last().unwrap() as usize, encoded.len() - 1);
    }

    #[test]
    fn empty_input() {
        let column = int_column(&[]);
        let encoded = RunLengthColumn::from_value_column(&column);
        assert_eq!(encoded.len(), 0);
        assert_eq!(encoded.run_count(), 0);
    }
}
