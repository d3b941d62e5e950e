//! Limit: the first n rows in input chunk order.

use std::sync::Arc;

use crate::operators::view::SegmentedInput;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::Value;
use crate::Result;

pub struct Limit {
    input: Box<dyn PhysicalOperator>,
    count: u64,
}

impl Limit {
    pub fn new(input: Box<dyn PhysicalOperator>, count: u64) -> Limit {
        Limit { input, count }
    }
}

impl PhysicalOperator for Limit {
    fn name(&self) -> &'static str {
        "Limit"
    }

    fn description(&self) -> String {
        format!("Limit {}", self.count)
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Limit::new(self.input.recreate(params), self.count))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        let view = SegmentedInput::analyze(&input)?;
        let take = (self.count as usize).min(view.row_count);
        let selected: Vec<usize> = (0..take).collect();
        Ok(Arc::new(view.emit_selection(&selected, input.chunk_size())?))
    }
}
