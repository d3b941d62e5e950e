//! Insert: appends the input table's rows to a stored table. The swap
//! happens under the target table's exclusive lock; concurrent readers
//! keep their snapshot.

use std::sync::Arc;

use tracing::debug;

use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, Value};
use crate::{Result, StoaError};

pub struct Insert {
    table_name: String,
    input: Box<dyn PhysicalOperator>,
}

impl Insert {
    pub fn new(table_name: impl Into<String>, input: Box<dyn PhysicalOperator>) -> Insert {
        Insert {
            table_name: table_name.into(),
            input,
        }
    }
}

impl PhysicalOperator for Insert {
    fn name(&self) -> &'static str {
        "Insert"
    }

    fn description(&self) -> String {
        format!("Insert into {}", self.table_name)
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Insert::new(
            self.table_name.clone(),
            self.input.recreate(params),
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        ctx.storage.update_table(&self.table_name, |current| {
            if input.column_count() != current.column_count() {
                return Err(StoaError::Schema(format!(
                    "insert width {} does not match table width {}",
                    input.column_count(),
                    current.column_count()
                )));
            }
            let mut next = current.clone();
            for chunk in input.chunks() {
                ctx.cancel.check()?;
                for row in 0..chunk.size() {
                    let values = (0..input.column_count())
                        .map(|c| chunk.column(c as ColumnId).get(row))
                        .collect();
                    next.append(values)?;
                }
            }
            Ok(next)
        })?;
        debug!(table = %self.table_name, rows = input.row_count(), "insert");
        Ok(input)
    }
}
