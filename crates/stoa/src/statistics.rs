//! Table statistics: row counts and per-column summaries consumed by an
//! optimizer layer. The engine only ever reads this object through its
//! fields; how an optimizer uses them is out of scope here.

use crate::table::Table;
use crate::types::Value;

#[derive(Debug, Clone)]
pub struct ColumnStatistics {
    pub distinct_count: usize,
    pub min: Value,
    pub max: Value,
}

#[derive(Debug, Clone)]
pub struct TableStatistics {
    pub row_count: f64,
    pub columns: Vec<ColumnStatistics>,
}

impl TableStatistics {
    pub fn generate(table: &Table) -> TableStatistics {
        let mut columns = Vec::with_capacity(table.column_count());
        for id in 0..table.column_count() {
            let mut values: Vec<Value> = Vec::new();
            for chunk in table.chunks() {
                let column = chunk.column(id as u16);
                for row in 0..column.len() {
                    let value = column.get(row);
                    if !value.is_null() {
                        values.push(value);
                    }
                }
            }
            values.sort_by(|a, b| a.total_cmp(b));
            let min = values.first().cloned().unwrap_or(Value::Null);
            let max = values.last().cloned().unwrap_or(Value::Null);
            values.dedup();
            columns.push(ColumnStatistics {
                distinct_count: values.len(),
                min,
                max,
            });
        }
        TableStatistics {
            row_count: table.row_count() as f64,
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn summarizes_columns() {
        let mut table = Table::new(2);
        table.add_column("a", DataType::Int32, true).unwrap();
        for v in [Value::Int32(3), Value::Int32(1), Value::Null, Value::Int32(3)] {
            table.append(vec![v]).unwrap();
        }
        let stats = table.statistics();
        assert_eq!(stats.row_count, 4.0);
        assert_eq!(stats.columns[0].distinct_count, 2);
        assert_eq!(stats.columns[0].min, Value::Int32(1));
        assert_eq!(stats.columns[0].max, Value::Int32(3));
    }
}
