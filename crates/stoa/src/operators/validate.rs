//! Visibility filter: emits the rows of a stored table that are visible
//! to the reading query, i.e. not marked deleted by a committed
//! Delete/Update. Output is a references table with one shared position
//! list per chunk.

use std::sync::Arc;

use tracing::debug;

use crate::operators::view::SegmentedInput;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::{Table, TableKind};
use crate::types::Value;
use crate::{Result, StoaError};

pub struct Validate {
    input: Box<dyn PhysicalOperator>,
}

impl Validate {
    pub fn new(input: Box<dyn PhysicalOperator>) -> Validate {
        Validate { input }
    }
}

impl PhysicalOperator for Validate {
    fn name(&self) -> &'static str {
        "Validate"
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Validate::new(self.input.recreate(params)))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        if input.kind() != TableKind::Data {
            return Err(StoaError::Schema(
                "validate expects a data table input".into(),
            ));
        }
        let view = SegmentedInput::analyze(&input)?;
        let mut selected = Vec::with_capacity(view.row_count);
        let mut base = 0usize;
        for chunk in input.chunks() {
            ctx.cancel.check()?;
            for offset in 0..chunk.size() {
                if !chunk.is_deleted(offset as u32) {
                    selected.push(base + offset);
                }
            }
            base += chunk.size();
        }
        debug!(
            visible = selected.len(),
            total = view.row_count,
            "validate"
        );
        Ok(Arc::new(view.emit_selection(&selected, input.chunk_size())?))
    }
}
