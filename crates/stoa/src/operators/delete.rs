//! Delete: marks the input's rows deleted in a stored table. The input
//! is a references table over the target produced by Validate and any
//! scans; row ids stay addressable so older snapshots are unaffected.

use std::sync::Arc;

use tracing::debug;

use crate::operators::view::SegmentedInput;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::{Table, TableKind};
use crate::types::{RowId, Value};
use crate::{Result, StoaError};

pub struct Delete {
    table_name: String,
    input: Box<dyn PhysicalOperator>,
}

impl Delete {
    pub fn new(table_name: impl Into<String>, input: Box<dyn PhysicalOperator>) -> Delete {
        Delete {
            table_name: table_name.into(),
            input,
        }
    }
}

/// The row ids addressed by a references input; all segments address
/// the same rows of the mutation target, so the first segment decides.
pub(crate) fn target_rows(input: &Arc<Table>) -> Result<Vec<RowId>> {
    if input.kind() != TableKind::References {
        return Err(StoaError::Schema(
            "mutation operators expect a references input".into(),
        ));
    }
    let view = SegmentedInput::analyze(input)?;
    Ok(view.positions.first().cloned().unwrap_or_default())
}

pub(crate) fn mark_deleted(table: &mut Table, rows: &[RowId]) -> Result<()> {
    for &row in rows {
        if row.chunk_id as usize >= table.chunk_count()
            || row.offset as usize >= table.chunk(row.chunk_id).size()
        {
            return Err(StoaError::Schema(format!(
                "row {row} does not address the target table"
            )));
        }
        table.chunk_mut(row.chunk_id).mark_deleted(row.offset);
    }
    Ok(())
}

impl PhysicalOperator for Delete {
    fn name(&self) -> &'static str {
        "Delete"
    }

    fn description(&self) -> String {
        format!("Delete from {}", self.table_name)
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Delete::new(
            self.table_name.clone(),
            self.input.recreate(params),
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        let rows = target_rows(&input)?;
        ctx.storage.update_table(&self.table_name, |current| {
            let mut next = current.clone();
            mark_deleted(&mut next, &rows)?;
            Ok(next)
        })?;
        debug!(table = %self.table_name, rows = rows.len(), "delete");
        Ok(input)
    }
}
