//! Leaf operator producing a table with zero columns; the placeholder
//! input of `INSERT ... VALUES` projections.

use std::sync::Arc;

use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::Value;
use crate::Result;

pub struct DummyTable;

impl PhysicalOperator for DummyTable {
    fn name(&self) -> &'static str {
        "DummyTable"
    }

    fn num_in_tables(&self) -> usize {
        0
    }

    fn recreate(&self, _params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(DummyTable)
    }

    fn execute(&self, _ctx: &ExecutionContext) -> Result<Arc<Table>> {
        Ok(Arc::new(Table::new(0)))
    }
}
