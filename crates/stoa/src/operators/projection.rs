//! Projection: evaluates one expression per output column, row-wise.
//!
//! Literal subtrees are folded once per query. When every expression is
//! a bare column over a references input, the operator forwards the
//! input's reference columns (shared position lists included) instead of
//! materializing values.

use std::sync::Arc;

use tracing::debug;

use crate::chunk::Chunk;
use crate::expression::{ExpressionKind, OpExpression};
use crate::operators::eval::{evaluate, fold_constants, infer_type};
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::{Table, TableKind};
use crate::types::{ColumnId, DataType, Value};
use crate::Result;

pub struct Projection {
    input: Box<dyn PhysicalOperator>,
    expressions: Vec<OpExpression>,
}

impl Projection {
    pub fn new(input: Box<dyn PhysicalOperator>, expressions: Vec<OpExpression>) -> Projection {
        Projection { input, expressions }
    }

    fn output_name(expression: &OpExpression, input: &Table) -> String {
        match (&expression.alias, &expression.kind) {
            (Some(alias), _) => alias.clone(),
            (None, ExpressionKind::Column(c)) => input.column_name(*c).to_string(),
            _ => expression.to_string(),
        }
    }
}

impl PhysicalOperator for Projection {
    fn name(&self) -> &'static str {
        "Projection"
    }

    fn description(&self) -> String {
        let list: Vec<String> = self.expressions.iter().map(|e| e.to_string()).collect();
        format!("Projection [{}]", list.join(", "))
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
        Box::new(Projection::new(self.input.recreate(params), expressions))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        let expressions: Vec<OpExpression> = self
            .expressions
            .iter()
            .map(fold_constants)
            .collect::<Result<_>>()?;
        debug!(width = expressions.len(), rows = input.row_count(), "projection");

        // Pass-through fast path: reference columns can be forwarded,
        // keeping their shared position lists.
        let bare_columns = expressions
            .iter()
            .all(|e| matches!(e.kind, ExpressionKind::Column(_)));
        if input.kind() == TableKind::References && bare_columns {
            return Ok(Arc::new(self.forward_references(&input, &expressions)?));
        }

        let mut names = Vec::with_capacity(expressions.len());
        let mut types = Vec::with_capacity(expressions.len());
        for expression in &expressions {
            let data_type = match &expression.kind {
                ExpressionKind::Literal(Value::Null) => DataType::Int32,
                _ => infer_type(expression, &input)?,
            };
            names.push(Projection::output_name(expression, &input));
            types.push(data_type);
        }
        let nullable = vec![true; expressions.len()];
        let mut out = Table::new_data_schema(names, types, nullable, input.chunk_size());

        // A zero-column input (DummyTable) carries one implicit row so
        // that literal projections produce it.
        if input.column_count() == 0 {
            let row = expressions
                .iter()
                .map(|e| evaluate(e, &|_| Value::Null))
                .collect::<Result<Vec<_>>>()?;
            out.append(row)?;
            return Ok(Arc::new(out));
        }

        for chunk in input.chunks() {
            ctx.cancel.check()?;
            for row in 0..chunk.size() {
                let read = |c: ColumnId| chunk.column(c).get(row);
                let values = expressions
                    .iter()
                    .map(|e| evaluate(e, &read))
                    .collect::<Result<Vec<_>>>()?;
                out.append(values)?;
            }
        }
        Ok(Arc::new(out))
    }
}

impl Projection {
    fn forward_references(
        &self,
        input: &Arc<Table>,
        expressions: &[OpExpression],
    ) -> Result<Table> {
        let mut names = Vec::with_capacity(expressions.len());
        let mut types = Vec::with_capacity(expressions.len());
        let mut nullable = Vec::with_capacity(expressions.len());
        let column_ids: Vec<ColumnId> = expressions
            .iter()
            .map(|e| match e.kind {
                ExpressionKind::Column(c) => c,
                _ => unreachable!("pass-through projection over non-column"),
            })
            .collect();
        for (expression, &c) in expressions.iter().zip(&column_ids) {
            names.push(Projection::output_name(expression, input));
            types.push(input.column_type(c));
            nullable.push(input.column_is_nullable(c));
        }
        let mut out = Table::new_references_schema(names, types, nullable, input.chunk_size());
        for chunk in input.chunks() {
            let columns = column_ids
                .iter()
                .map(|&c| chunk.column(c).clone())
                .collect();
            out.add_chunk(Chunk::new(columns))?;
        }
        Ok(out)
    }
}
