//! Stable multi-key sort. Keys apply in declared order; NULLs sort
//! first within an ascending key. The result is a references table in
//! fully sorted order.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::operators::view::{materialize_column, SegmentedInput};
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, SortOrder, Value};
use crate::Result;

pub struct Sort {
    input: Box<dyn PhysicalOperator>,
    keys: Vec<(ColumnId, SortOrder)>,
}

impl Sort {
    pub fn new(input: Box<dyn PhysicalOperator>, keys: Vec<(ColumnId, SortOrder)>) -> Sort {
        Sort { input, keys }
    }
}

impl PhysicalOperator for Sort {
    fn name(&self) -> &'static str {
        "Sort"
    }

    fn description(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|(c, order)| format!("#{c} {order:?}"))
            .collect();
        format!("Sort by [{}]", keys.join(", "))
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Sort::new(self.input.recreate(params), self.keys.clone()))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        let view = SegmentedInput::analyze(&input)?;

        let key_values: Vec<Vec<Value>> = self
            .keys
            .iter()
            .map(|&(c, _)| materialize_column(&input, c))
            .collect();
        ctx.cancel.check()?;

        let mut order: Vec<usize> = (0..view.row_count).collect();
        // Vec::sort_by is stable, so equal keys keep their input order.
        order.sort_by(|&a, &b| {
            for (values, &(_, direction)) in key_values.iter().zip(&self.keys) {
                let ordering = values[a].total_cmp(&values[b]);
                let ordering = match direction {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        debug!(rows = order.len(), keys = self.keys.len(), "sort");
        Ok(Arc::new(view.emit_selection(&order, input.chunk_size())?))
    }
}
