//! Update: delete-plus-insert over one pipeline. The update expression
//! list is sized to the target width; untouched columns carry identity
//! column references, assigned columns carry the translated value
//! expressions.

use std::sync::Arc;

use tracing::debug;

use crate::expression::OpExpression;
use crate::operators::delete::{mark_deleted, target_rows};
use crate::operators::eval::evaluate;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, Value};
use crate::{Result, StoaError};

pub struct Update {
    table_name: String,
    input: Box<dyn PhysicalOperator>,
    expressions: Vec<OpExpression>,
}

impl Update {
    pub fn new(
        table_name: impl Into<String>,
        input: Box<dyn PhysicalOperator>,
        expressions: Vec<OpExpression>,
    ) -> Update {
        Update {
            table_name: table_name.into(),
            input,
            expressions,
        }
    }
}

impl PhysicalOperator for Update {
    fn name(&self) -> &'static str {
        "Update"
    }

    fn description(&self) -> String {
        let list: Vec<String> = self.expressions.iter().map(|e| e.to_string()).collect();
        format!("Update {} set [{}]", self.table_name, list.join(", "))
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        let expressions = self
            .expressions
            .iter()
            .map(|e| e.bind_placeholders(params))
            .collect();
        Box::new(Update::new(
            self.table_name.clone(),
            self.input.recreate(params),
            expressions,
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;

        // Evaluate replacements against the selected rows first; the
        // swap below must not observe a half-applied update.
        let mut replacements: Vec<Vec<Value>> = Vec::with_capacity(input.row_count());
        for chunk in input.chunks() {
            ctx.cancel.check()?;
            for row in 0..chunk.size() {
                let read = |c: ColumnId| chunk.column(c).get(row);
                let values = self
                    .expressions
                    .iter()
                    .map(|e| evaluate(e, &read))
                    .collect::<Result<Vec<_>>>()?;
                replacements.push(values);
            }
        }
        let rows = target_rows(&input)?;

        ctx.storage.update_table(&self.table_name, |current| {
            if self.expressions.len() != current.column_count() {
                return Err(StoaError::Schema(format!(
                    "update expression list width {} does not match table width {}",
                    self.expressions.len(),
                    current.column_count()
                )));
            }
            let mut next = current.clone();
            mark_deleted(&mut next, &rows)?;
            for values in replacements.iter().cloned() {
                next.append(values)?;
            }
            Ok(next)
        })?;
        debug!(table = %self.table_name, rows = rows.len(), "update");
        Ok(input)
    }
}
