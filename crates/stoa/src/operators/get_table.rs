//! Leaf operator resolving a stored table through the storage manager.

use std::sync::Arc;

use tracing::debug;

use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::Value;
use crate::Result;

pub struct GetTable {
    table_name: String,
}

impl GetTable {
    pub fn new(table_name: impl Into<String>) -> GetTable {
        GetTable {
            table_name: table_name.into(),
        }
    }
}

impl PhysicalOperator for GetTable {
    fn name(&self) -> &'static str {
        "GetTable"
    }

    fn description(&self) -> String {
        format!("GetTable {}", self.table_name)
    }

    fn num_in_tables(&self) -> usize {
        0
    }

    fn recreate(&self, _params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(GetTable::new(self.table_name.clone()))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        debug!(table = %self.table_name, "get table");
        ctx.storage.get_table(&self.table_name)
    }
}
