//! Logical-plan to operator-pipeline translation.
//!
//! Column origins are resolved to the dense output column ids of each
//! node's child here; past this point the operators know nothing about
//! provenance.

use stoa::expression::{Expression, ExpressionKind, OpExpression};
use stoa::operators::{
    Aggregate, AggregateSpec, Delete, DummyTable, GetTable, HashJoin, Insert, Limit,
    NestedLoopJoin, PhysicalOperator, Projection, SetUnion, Sort, TableScan, Update, Validate,
};
use stoa::types::{ColumnId, JoinMode, ParamValue};
use stoa::ScanType;

use crate::lqp::{ColumnOrigin, LogicalPlan, LqpExpression, LqpNodeKind, NodeId, UnionMode};
use crate::SqlError;

type Result<T> = std::result::Result<T, SqlError>;

pub fn build_operators(
    plan: &LogicalPlan,
    node: NodeId,
) -> Result<Box<dyn PhysicalOperator>> {
    let left = || plan.node(node).left.expect("plan node is missing its input");
    let right = || {
        plan.node(node)
            .right
            .expect("plan node is missing its right input")
    };
    match &plan.node(node).kind {
        LqpNodeKind::StoredTable { name, .. } => Ok(Box::new(GetTable::new(name.clone()))),
        LqpNodeKind::DummyTable => Ok(Box::new(DummyTable)),
        LqpNodeKind::Validate => Ok(Box::new(Validate::new(build_operators(plan, left())?))),
        LqpNodeKind::Predicate {
            column,
            scan_type,
            value,
            value2,
        } => {
            let input = left();
            let column_id = resolve(plan, input, *column)?;
            let value = match value {
                ParamValue::Literal(v) => ParamValue::Literal(v.clone()),
                ParamValue::Column(origin) => ParamValue::Column(resolve(plan, input, *origin)?),
                ParamValue::Placeholder(i) => ParamValue::Placeholder(*i),
            };
            Ok(Box::new(TableScan::new(
                build_operators(plan, input)?,
                column_id,
                *scan_type,
                value,
                value2.clone(),
            )))
        }
        LqpNodeKind::Projection { expressions } => {
            let input = left();
            let expressions = expressions
                .iter()
                .map(|e| convert_expression(plan, input, e))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Projection::new(
                build_operators(plan, input)?,
                expressions,
            )))
        }
        LqpNodeKind::Aggregate {
            aggregates,
            group_by,
        } => {
            let input = left();
            let group_by = group_by
                .iter()
                .map(|&origin| resolve(plan, input, origin))
                .collect::<Result<Vec<_>>>()?;
            let specs = aggregates
                .iter()
                .map(|expression| aggregate_spec(plan, input, expression))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Aggregate::new(
                build_operators(plan, input)?,
                group_by,
                specs,
            )))
        }
        LqpNodeKind::Join { mode, predicate } => {
            let left_node = left();
            let right_node = right();
            let left_op = build_operators(plan, left_node)?;
            let right_op = build_operators(plan, right_node)?;
            match (mode, predicate) {
                (JoinMode::Cross, _) => {
                    Ok(Box::new(NestedLoopJoin::new(left_op, right_op, JoinMode::Cross, None)))
                }
                (JoinMode::Natural, _) => Err(SqlError::Translate(
                    "natural joins are lowered before operator translation".into(),
                )),
                (mode, Some((left_origin, right_origin, scan_type))) => {
                    let left_id = resolve(plan, left_node, *left_origin)?;
                    let right_id = resolve(plan, right_node, *right_origin)?;
                    if *scan_type == ScanType::Equals {
                        Ok(Box::new(HashJoin::new(
                            left_op, right_op, *mode, left_id, right_id,
                        )))
                    } else {
                        Ok(Box::new(NestedLoopJoin::new(
                            left_op,
                            right_op,
                            *mode,
                            Some((left_id, right_id, *scan_type)),
                        )))
                    }
                }
                (mode, None) => Err(SqlError::Translate(format!(
                    "{mode:?} join requires a predicate"
                ))),
            }
        }
        LqpNodeKind::Sort { keys } => {
            let input = left();
            let keys = keys
                .iter()
                .map(|&(origin, order)| Ok((resolve(plan, input, origin)?, order)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Sort::new(build_operators(plan, input)?, keys)))
        }
        LqpNodeKind::Limit { count } => Ok(Box::new(Limit::new(
            build_operators(plan, left())?,
            *count,
        ))),
        LqpNodeKind::Union {
            mode: UnionMode::Positions,
        } => Ok(Box::new(SetUnion::new(
            build_operators(plan, left())?,
            build_operators(plan, right())?,
        ))),
        LqpNodeKind::Insert { table } => Ok(Box::new(Insert::new(
            table.clone(),
            build_operators(plan, left())?,
        ))),
        LqpNodeKind::Update { table, expressions } => {
            let input = left();
            let expressions = expressions
                .iter()
                .map(|e| convert_expression(plan, input, e))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Update::new(
                table.clone(),
                build_operators(plan, input)?,
                expressions,
            )))
        }
        LqpNodeKind::Delete { table } => Ok(Box::new(Delete::new(
            table.clone(),
            build_operators(plan, left())?,
        ))),
        LqpNodeKind::Show { .. } => Err(SqlError::Translate(
            "SHOW is executed by the session, not the operator pipeline".into(),
        )),
    }
}

fn resolve(plan: &LogicalPlan, input: NodeId, origin: ColumnOrigin) -> Result<ColumnId> {
    plan.find_output_column_id_by_column_origin(input, origin)
        .ok_or_else(|| {
            SqlError::Translate(format!(
                "column {} is not produced by its input",
                plan.origin_name(origin)
            ))
        })
}

/// Rewrite provenance column references into the child's dense ids.
fn convert_expression(
    plan: &LogicalPlan,
    input: NodeId,
    expression: &LqpExpression,
) -> Result<OpExpression> {
    let kind = match &expression.kind {
        ExpressionKind::Column(origin) => ExpressionKind::Column(resolve(plan, input, *origin)?),
        ExpressionKind::Literal(value) => ExpressionKind::Literal(value.clone()),
        ExpressionKind::Placeholder(index) => ExpressionKind::Placeholder(*index),
        ExpressionKind::Star => ExpressionKind::Star,
        ExpressionKind::Aggregate(kind) => ExpressionKind::Aggregate(*kind),
        ExpressionKind::Arithmetic(op) => ExpressionKind::Arithmetic(*op),
        ExpressionKind::Comparison(scan_type) => ExpressionKind::Comparison(*scan_type),
        ExpressionKind::Logical(op) => ExpressionKind::Logical(*op),
    };
    let children = expression
        .children
        .iter()
        .map(|child| convert_expression(plan, input, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(Expression {
        kind,
        alias: expression.alias.clone(),
        children,
    })
}

fn aggregate_spec(
    plan: &LogicalPlan,
    input: NodeId,
    expression: &LqpExpression,
) -> Result<AggregateSpec> {
    let kind = match &expression.kind {
        ExpressionKind::Aggregate(kind) => *kind,
        _ => {
            return Err(SqlError::Translate(format!(
                "aggregate node carries a non-aggregate expression {expression}"
            )))
        }
    };
    let argument = expression
        .children
        .first()
        .ok_or_else(|| SqlError::Translate("aggregate without an argument".into()))?;
    let column = match &argument.kind {
        ExpressionKind::Star => None,
        ExpressionKind::Column(origin) => Some(resolve(plan, input, *origin)?),
        _ => {
            return Err(SqlError::Translate(
                "aggregate arguments must be plain columns".into(),
            ))
        }
    };
    Ok(AggregateSpec {
        kind,
        column,
        output_name: output_name(plan, expression),
    })
}

fn output_name(plan: &LogicalPlan, expression: &LqpExpression) -> String {
    if let Some(alias) = &expression.alias {
        return alias.clone();
    }
    if let ExpressionKind::Column(origin) = &expression.kind {
        return plan.origin_name(*origin);
    }
    expression.to_string()
}
