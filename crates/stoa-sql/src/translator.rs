//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! SQL to logical-plan translation over the `sqlparser` AST.
//!
//! The translator is stateful only in `validate`, which wraps every
//! stored-table read in a Validate node so queries see committed rows
//! only. Everything else is a pure mapping: schema and unsupported-
//! syntax errors are raised here, before any operator runs.

use sqlparser::ast::{
    Assignment, AssignmentTarget, BinaryOperator, Delete, Expr, FromTable, FunctionArg,
    FunctionArgExpr, FunctionArguments, GroupByExpr, Ident, Insert, Join, JoinConstraint,
    JoinOperator, ObjectName, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins, Value as AstValue,
};

use stoa::expression::{AggregateKind, ArithmeticOp, ExpressionKind, ScanType};
use stoa::types::{ColumnId, JoinMode, ParamValue, SortOrder, Value};
use stoa::StorageManager;

use crate::lqp::{
    ColumnOrigin, LogicalPlan, LqpExpression, LqpNodeKind, LqpParamValue, NodeId, ShowKind,
    UnionMode,
};
use crate::SqlError;

type Result<T> = std::result::Result<T, SqlError>;

pub struct SqlTranslator<'a> {
    storage: &'a StorageManager,
    validate: bool,
}

impl<'a> SqlTranslator<'a> {
    pub fn new(storage: &'a StorageManager, validate: bool) -> SqlTranslator<'a> {
        SqlTranslator { storage, validate }
    }

    pub fn translate_statement(
        &self,
        statement: &Statement,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        match statement {
            Statement::Query(query) => self.translate_query(query, plan),
            Statement::Insert(insert) => self.translate_insert(insert, plan),
            Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                if from.is_some() {
                    return Err(SqlError::Translate(
                        "UPDATE ... FROM is not supported".into(),
                    ));
                }
                self.translate_update(table, assignments, selection.as_ref(), plan)
            }
            Statement::Delete(delete) => self.translate_delete(delete, plan),
            Statement::ShowTables { .. } => Ok(plan.add_node(LqpNodeKind::Show {
                kind: ShowKind::Tables,
            })),
            Statement::ShowColumns { show_options, .. } => {
                let table = show_options
                    .show_in
                    .as_ref()
                    .and_then(|show_in| show_in.parent_name.as_ref())
                    .map(object_name_to_string)
                    .ok_or_else(|| {
                        SqlError::Translate("SHOW COLUMNS requires a table name".into())
                    })?;
                if !self.storage.has_table(&table) {
                    return Err(SqlError::Translate(format!(
                        "no table named \"{table}\""
                    )));
                }
                Ok(plan.add_node(LqpNodeKind::Show {
                    kind: ShowKind::Columns(table),
                }))
            }
            other => Err(SqlError::Translate(format!(
                "unsupported statement: {other}"
            ))),
        }
    }

    // ---- SELECT -----------------------------------------------------------

    pub fn translate_query(&self, query: &Query, plan: &mut LogicalPlan) -> Result<NodeId> {
        if query.with.is_some() {
            return Err(SqlError::Translate("WITH is not supported".into()));
        }
        if query.offset.is_some() || query.fetch.is_some() {
            return Err(SqlError::Translate(
                "OFFSET and FETCH are not supported".into(),
            ));
        }
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            SetExpr::SetOperation { .. } => {
                return Err(SqlError::Translate(
                    "set operations are not supported".into(),
                ))
            }
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported query body: {other}"
                )))
            }
        };
        let mut node = self.translate_select(select, plan)?;
        node = self.translate_order_by(query, node, plan)?;
        node = translate_limit(query, node, plan)?;
        Ok(node)
    }

    fn translate_select(&self, select: &Select, plan: &mut LogicalPlan) -> Result<NodeId> {
        let mut node = self.translate_table_ref(&select.from, plan)?;
        if let Some(selection) = &select.selection {
            node = self.translate_where(selection, node, plan)?;
        }

        let group_by = group_by_expressions(&select.group_by)?;
        let aggregating = !group_by.is_empty()
            || select.projection.iter().any(|item| match item {
                SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
                    contains_aggregate_function(e)
                }
                _ => false,
            });

        if aggregating {
            self.translate_aggregate(select, &group_by, node, plan)
        } else {
            if select.having.is_some() {
                return Err(SqlError::Translate(
                    "HAVING requires GROUP BY or aggregates".into(),
                ));
            }
            self.translate_projection(&select.projection, node, plan)
        }
    }

    // ---- FROM -------------------------------------------------------------

    fn translate_table_ref(
        &self,
        from: &[TableWithJoins],
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        if from.is_empty() {
            return Err(SqlError::Translate("missing FROM clause".into()));
        }
        let mut node = self.translate_table_with_joins(&from[0], plan)?;
        // Additional FROM entries form a left-associative cross product.
        for entry in &from[1..] {
            let right = self.translate_table_with_joins(entry, plan)?;
            node = plan.add_binary(
                LqpNodeKind::Join {
                    mode: JoinMode::Cross,
                    predicate: None,
                },
                node,
                right,
            );
        }
        Ok(node)
    }

    fn translate_table_with_joins(
        &self,
        entry: &TableWithJoins,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        let mut node = self.translate_table_factor(&entry.relation, plan)?;
        for join in &entry.joins {
            node = self.translate_join(node, join, plan)?;
        }
        Ok(node)
    }

    fn translate_table_factor(
        &self,
        factor: &TableFactor,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table_name = object_name_to_string(name);
                let table = self.storage.get_table(&table_name)?;
                let node = plan.add_node(LqpNodeKind::StoredTable {
                    name: table_name,
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                    column_names: table.column_names().to_vec(),
                    column_types: table.column_types().to_vec(),
                });
                if self.validate {
                    Ok(plan.add_unary(LqpNodeKind::Validate, node))
                } else {
                    Ok(node)
                }
            }
            TableFactor::Derived { subquery, .. } => self.translate_query(subquery, plan),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.translate_table_with_joins(table_with_joins, plan),
            other => Err(SqlError::Translate(format!(
                "unsupported table reference: {other}"
            ))),
        }
    }

    fn translate_join(
        &self,
        left: NodeId,
        join: &Join,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        let right = self.translate_table_factor(&join.relation, plan)?;
        let (mode, constraint) = match &join.join_operator {
            JoinOperator::CrossJoin => {
                return Ok(plan.add_binary(
                    LqpNodeKind::Join {
                        mode: JoinMode::Cross,
                        predicate: None,
                    },
                    left,
                    right,
                ))
            }
            JoinOperator::Inner(constraint) => (JoinMode::Inner, constraint),
            JoinOperator::LeftOuter(constraint) => (JoinMode::Left, constraint),
            JoinOperator::RightOuter(constraint) => (JoinMode::Right, constraint),
            JoinOperator::FullOuter(constraint) => (JoinMode::Outer, constraint),
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported join type: {other:?}"
                )))
            }
        };
        match constraint {
            JoinConstraint::On(condition) => {
                let predicate = self.translate_join_condition(condition, left, right, plan)?;
                Ok(plan.add_binary(
                    LqpNodeKind::Join {
                        mode,
                        predicate: Some(predicate),
                    },
                    left,
                    right,
                ))
            }
            JoinConstraint::Natural => self.translate_natural_join(left, right, plan),
            other => Err(SqlError::Translate(format!(
                "unsupported join constraint: {other:?}"
            ))),
        }
    }

    /// The join condition must be a simple comparison of two column
    /// references, one per input sub-plan.
    fn translate_join_condition(
        &self,
        condition: &Expr,
        left: NodeId,
        right: NodeId,
        plan: &LogicalPlan,
    ) -> Result<(ColumnOrigin, ColumnOrigin, ScanType)> {
        let (lhs, op, rhs) = match condition {
            Expr::BinaryOp { left, op, right } => (left.as_ref(), op, right.as_ref()),
            Expr::Nested(inner) => {
                return self.translate_join_condition(inner, left, right, plan)
            }
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported join condition: {other}"
                )))
            }
        };
        let scan_type = comparison_scan_type(op).ok_or_else(|| {
            SqlError::Translate(format!("unsupported join condition operator: {op}"))
        })?;

        let resolve = |expr: &Expr, node: NodeId| -> Result<Option<ColumnOrigin>> {
            let (name, prefix) = match column_name_parts(expr) {
                Some(parts) => parts,
                None => return Ok(None),
            };
            plan.find_column_origin_by_named_column_reference(node, &name, prefix.as_deref())
        };

        // Each operand must resolve in exactly one of the two inputs.
        let bind = |expr: &Expr| -> Result<(ColumnOrigin, bool)> {
            let in_left = resolve(expr, left)?;
            let in_right = resolve(expr, right)?;
            match (in_left, in_right) {
                (Some(origin), None) => Ok((origin, true)),
                (None, Some(origin)) => Ok((origin, false)),
                (Some(_), Some(_)) => Err(SqlError::Translate(format!(
                    "join condition operand {expr} is ambiguous"
                ))),
                (None, None) => Err(SqlError::Translate(format!(
                    "join condition operand {expr} resolves in neither input"
                ))),
            }
        };
        let (first, first_is_left) = bind(lhs)?;
        let (second, second_is_left) = bind(rhs)?;
        if first_is_left == second_is_left {
            return Err(SqlError::Translate(
                "join condition must reference both inputs".into(),
            ));
        }
        if first_is_left {
            Ok((first, second, scan_type))
        } else {
            Ok((second, first, scan_type.flipped()))
        }
    }

    /// NATURAL JOIN: cross product, one equality predicate per shared
    /// column name, then a projection that drops the duplicated right
    /// columns.
    fn translate_natural_join(
        &self,
        left: NodeId,
        right: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        let left_names = plan.output_column_names(left);
        let right_names = plan.output_column_names(right);
        let shared: Vec<&String> = left_names
            .iter()
            .filter(|name| right_names.contains(name))
            .collect();
        if shared.is_empty() {
            return Err(SqlError::Translate(
                "NATURAL JOIN inputs share no column names".into(),
            ));
        }

        let mut node = plan.add_binary(
            LqpNodeKind::Join {
                mode: JoinMode::Cross,
                predicate: None,
            },
            left,
            right,
        );
        let mut duplicated = Vec::new();
        for name in &shared {
            let left_origin = plan
                .find_column_origin_by_named_column_reference(left, name, None)?
                .expect("shared name resolves on the left");
            let right_origin = plan
                .find_column_origin_by_named_column_reference(right, name, None)?
                .expect("shared name resolves on the right");
            duplicated.push(right_origin);
            node = plan.add_unary(
                LqpNodeKind::Predicate {
                    column: left_origin,
                    scan_type: ScanType::Equals,
                    value: ParamValue::Column(right_origin),
                    value2: None,
                },
                node,
            );
        }

        let names = plan.output_column_names(node);
        let expressions: Vec<LqpExpression> = plan
            .output_column_origins(node)
            .into_iter()
            .zip(names)
            .filter(|(origin, _)| !duplicated.contains(origin))
            .map(|(origin, name)| LqpExpression::column(origin).with_alias(name))
            .collect();
        Ok(plan.add_unary(LqpNodeKind::Projection { expressions }, node))
    }

    // ---- WHERE ------------------------------------------------------------

    /// OR splits into a positions union over the same input; AND chains
    /// predicates; leaves become scan nodes.
    fn translate_where(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let node = self.translate_where(left, input, plan)?;
                self.translate_where(right, node, plan)
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                let left_node = self.translate_where(left, input, plan)?;
                let right_node = self.translate_where(right, input, plan)?;
                Ok(plan.add_binary(
                    LqpNodeKind::Union {
                        mode: UnionMode::Positions,
                    },
                    left_node,
                    right_node,
                ))
            }
            Expr::Nested(inner) => self.translate_where(inner, input, plan),
            _ => self.translate_predicate(expr, input, plan),
        }
    }

    fn translate_predicate(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        match expr {
            Expr::Between {
                expr: probe,
                negated,
                low,
                high,
            } => {
                if *negated {
                    return Err(SqlError::Translate("NOT BETWEEN is not supported".into()));
                }
                let column = self.resolve_column_expr(probe, input, plan)?;
                let value = self.translate_param_value(low, input, plan)?;
                let value2 = literal_value(high)?;
                Ok(plan.add_unary(
                    LqpNodeKind::Predicate {
                        column,
                        scan_type: ScanType::Between,
                        value,
                        value2: Some(value2),
                    },
                    input,
                ))
            }
            Expr::Like {
                negated,
                expr: probe,
                pattern,
                ..
            } => {
                let column = self.resolve_column_expr(probe, input, plan)?;
                let value = self.translate_param_value(pattern, input, plan)?;
                Ok(plan.add_unary(
                    LqpNodeKind::Predicate {
                        column,
                        scan_type: if *negated {
                            ScanType::NotLike
                        } else {
                            ScanType::Like
                        },
                        value,
                        value2: None,
                    },
                    input,
                ))
            }
            Expr::BinaryOp { left, op, right } => {
                let scan_type = comparison_scan_type(op).ok_or_else(|| {
                    SqlError::Translate(format!("unsupported predicate operator: {op}"))
                })?;
                let left_column = self.try_resolve_column_expr(left, input, plan)?;
                // Exactly one side names the scanned column; a column on
                // the right swaps operands and remaps the scan type.
                let (column, scan_type, value_expr) = match left_column {
                    Some(column) => (column, scan_type, right.as_ref()),
                    None => {
                        let column = self
                            .try_resolve_column_expr(right, input, plan)?
                            .ok_or_else(|| {
                                SqlError::Translate(format!(
                                    "predicate {expr} does not reference a column"
                                ))
                            })?;
                        (column, scan_type.flipped(), left.as_ref())
                    }
                };
                let value = self.translate_param_value(value_expr, input, plan)?;
                Ok(plan.add_unary(
                    LqpNodeKind::Predicate {
                        column,
                        scan_type,
                        value,
                        value2: None,
                    },
                    input,
                ))
            }
            Expr::Nested(inner) => self.translate_predicate(inner, input, plan),
            other => Err(SqlError::Translate(format!(
                "unsupported predicate: {other}"
            ))),
        }
    }

    // ---- Aggregation ------------------------------------------------------

    /// Builds the aggregation sandwich: an optional aliasing projection,
    /// the aggregate node, HAVING predicates (appending hidden
    /// aggregates as needed), and a reordering projection.
    fn translate_aggregate(
        &self,
        select: &Select,
        group_by: &[Expr],
        input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        // Aliasing projection: SELECT-list aliases on plain columns take
        // effect before grouping.
        let aliased_columns: Vec<(&Expr, &Ident)> = select
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::ExprWithAlias { expr, alias }
                    if column_name_parts(expr).is_some() =>
                {
                    Some((expr, alias))
                }
                _ => None,
            })
            .collect();
        let input = if aliased_columns.is_empty() {
            input
        } else {
            let mut expressions: Vec<LqpExpression> = plan
                .output_column_origins(input)
                .into_iter()
                .zip(plan.output_column_names(input))
                .map(|(origin, name)| LqpExpression::column(origin).with_alias(name))
                .collect();
            for (expr, alias) in &aliased_columns {
                let origin = self.resolve_column_expr(expr, input, plan)?;
                if let Some(target) = expressions.iter_mut().find(|e| {
                    matches!(&e.kind, ExpressionKind::Column(o) if *o == origin)
                }) {
                    target.alias = Some(alias.value.clone());
                }
            }
            plan.add_unary(LqpNodeKind::Projection { expressions }, input)
        };

        // Group-by columns resolve against the (possibly aliased) input.
        let mut group_origins = Vec::with_capacity(group_by.len());
        for expr in group_by {
            group_origins.push(self.resolve_column_expr(expr, input, plan)?);
        }

        // Collect the SELECT list: every item must be an aggregate, a
        // star, or a group-by column.
        enum OutputItem {
            Group(ColumnOrigin, Option<String>),
            Aggregate(usize, Option<String>),
            Star,
        }
        let mut aggregates: Vec<LqpExpression> = Vec::new();
        let mut outputs: Vec<OutputItem> = Vec::new();
        for item in &select.projection {
            let (expr, alias) = match item {
                SelectItem::UnnamedExpr(expr) => (expr, None),
                SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
                SelectItem::Wildcard(_) => {
                    outputs.push(OutputItem::Star);
                    continue;
                }
                other => {
                    return Err(SqlError::Translate(format!(
                        "unsupported SELECT item: {other}"
                    )))
                }
            };
            if let Expr::Function(function) = expr {
                let aggregate = self.translate_aggregate_function(function, input, plan)?;
                let index = match aggregates
                    .iter()
                    .position(|e| e.kind == aggregate.kind && e.children == aggregate.children)
                {
                    Some(index) => index,
                    None => {
                        aggregates.push(aggregate);
                        aggregates.len() - 1
                    }
                };
                outputs.push(OutputItem::Aggregate(index, alias));
                continue;
            }
            match column_name_parts(expr) {
                Some(_) => {
                    // An aliased column was renamed by the aliasing
                    // projection; resolve the alias when the original
                    // name is gone.
                    let origin = match self.try_resolve_column_expr(expr, input, plan)? {
                        Some(origin) => origin,
                        None => match &alias {
                            Some(name) => plan
                                .find_column_origin_by_named_column_reference(input, name, None)?
                                .ok_or_else(|| {
                                    SqlError::Translate(format!("unknown column \"{expr}\""))
                                })?,
                            None => {
                                return Err(SqlError::Translate(format!(
                                    "unknown column \"{expr}\""
                                )))
                            }
                        },
                    };
                    if !group_origins.contains(&origin) {
                        return Err(SqlError::Translate(format!(
                            "column \"{expr}\" must appear in the GROUP BY clause or be used in an aggregate function"
                        )));
                    }
                    outputs.push(OutputItem::Group(origin, alias));
                }
                None => {
                    return Err(SqlError::Translate(format!(
                        "SELECT item {expr} must be an aggregate, a star, or a grouped column"
                    )))
                }
            }
        }
        let select_aggregate_count = aggregates.len();

        let aggregate_node = plan.add_unary(
            LqpNodeKind::Aggregate {
                aggregates,
                group_by: group_origins.clone(),
            },
            input,
        );

        // HAVING may reference aggregates not in the select list; those
        // are appended to the aggregate node but stay hidden from the
        // final projection.
        let mut node = aggregate_node;
        if let Some(having) = &select.having {
            node = self.translate_having(having, node, aggregate_node, input, plan)?;
        }

        // Reordering projection: the select-list order over the
        // aggregate's outputs.
        let mut expressions: Vec<LqpExpression> = Vec::new();
        for output in outputs {
            match output {
                OutputItem::Group(origin, alias) => {
                    let name = alias.unwrap_or_else(|| plan.origin_name(origin));
                    expressions.push(LqpExpression::column(origin).with_alias(name));
                }
                OutputItem::Aggregate(index, alias) => {
                    let origin = ColumnOrigin::new(
                        aggregate_node,
                        (group_origins.len() + index) as ColumnId,
                    );
                    let name = alias.unwrap_or_else(|| plan.origin_name(origin));
                    expressions.push(LqpExpression::column(origin).with_alias(name));
                }
                OutputItem::Star => {
                    // Star expands to the group-by columns and the
                    // select-listed aggregates; HAVING-only aggregates
                    // stay hidden.
                    for origin in plan
                        .output_column_origins(aggregate_node)
                        .into_iter()
                        .take(group_origins.len() + select_aggregate_count)
                    {
                        let name = plan.origin_name(origin);
                        expressions.push(LqpExpression::column(origin).with_alias(name));
                    }
                }
            }
        }
        Ok(plan.add_unary(LqpNodeKind::Projection { expressions }, node))
    }

    fn translate_aggregate_function(
        &self,
        function: &sqlparser::ast::Function,
        input: NodeId,
        plan: &LogicalPlan,
    ) -> Result<LqpExpression> {
        let name = function.name.to_string().to_uppercase();
        let kind = match name.as_str() {
            "COUNT" => AggregateKind::Count,
            "SUM" => AggregateKind::Sum,
            "MIN" => AggregateKind::Min,
            "MAX" => AggregateKind::Max,
            "AVG" => AggregateKind::Avg,
            other => {
                return Err(SqlError::Translate(format!(
                    "unknown aggregate function {other}"
                )))
            }
        };
        let args = match &function.args {
            FunctionArguments::List(list) => &list.args,
            _ => {
                return Err(SqlError::Translate(format!(
                    "aggregate {name} requires an argument list"
                )))
            }
        };
        if args.len() != 1 {
            return Err(SqlError::Translate(format!(
                "aggregate {name} takes exactly one argument"
            )));
        }
        let argument = match &args[0] {
            FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => LqpExpression::star(),
            FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => {
                let origin = self.resolve_column_expr(expr, input, plan)?;
                LqpExpression::column(origin).with_alias(plan.origin_name(origin))
            }
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported aggregate argument: {other}"
                )))
            }
        };
        Ok(LqpExpression::aggregate(kind, argument))
    }

    /// HAVING splits on AND/OR like WHERE; leaf comparisons bind to the
    /// aggregate node's outputs.
    fn translate_having(
        &self,
        expr: &Expr,
        input: NodeId,
        aggregate_node: NodeId,
        aggregate_input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let node =
                    self.translate_having(left, input, aggregate_node, aggregate_input, plan)?;
                self.translate_having(right, node, aggregate_node, aggregate_input, plan)
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                let left_node =
                    self.translate_having(left, input, aggregate_node, aggregate_input, plan)?;
                let right_node =
                    self.translate_having(right, input, aggregate_node, aggregate_input, plan)?;
                Ok(plan.add_binary(
                    LqpNodeKind::Union {
                        mode: UnionMode::Positions,
                    },
                    left_node,
                    right_node,
                ))
            }
            Expr::Nested(inner) => {
                self.translate_having(inner, input, aggregate_node, aggregate_input, plan)
            }
            Expr::BinaryOp { left, op, right } => {
                let scan_type = comparison_scan_type(op).ok_or_else(|| {
                    SqlError::Translate(format!("unsupported HAVING operator: {op}"))
                })?;
                let (column_expr, scan_type, value_expr) = if matches!(left.as_ref(), Expr::Function(_))
                    || column_name_parts(left).is_some()
                {
                    (left.as_ref(), scan_type, right.as_ref())
                } else {
                    (right.as_ref(), scan_type.flipped(), left.as_ref())
                };
                let column = self.resolve_having_operand(
                    column_expr,
                    aggregate_node,
                    aggregate_input,
                    plan,
                )?;
                let value = self.translate_param_value(value_expr, input, plan)?;
                Ok(plan.add_unary(
                    LqpNodeKind::Predicate {
                        column,
                        scan_type,
                        value,
                        value2: None,
                    },
                    input,
                ))
            }
            other => Err(SqlError::Translate(format!(
                "unsupported HAVING predicate: {other}"
            ))),
        }
    }

    fn resolve_having_operand(
        &self,
        expr: &Expr,
        aggregate_node: NodeId,
        aggregate_input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<ColumnOrigin> {
        if let Expr::Function(function) = expr {
            let aggregate =
                self.translate_aggregate_function(function, aggregate_input, plan)?;
            if let Some(origin) = plan.column_origin_for_expression(aggregate_node, &aggregate) {
                return Ok(origin);
            }
            // A HAVING-only aggregate: append it to the aggregate node.
            if let LqpNodeKind::Aggregate {
                aggregates,
                group_by,
            } = &mut plan.node_mut(aggregate_node).kind
            {
                aggregates.push(aggregate);
                let column_id = (group_by.len() + aggregates.len() - 1) as ColumnId;
                return Ok(ColumnOrigin::new(aggregate_node, column_id));
            }
            unreachable!("aggregate node changed kind");
        }
        self.resolve_column_expr(expr, aggregate_node, plan)
    }

    // ---- Plain projection -------------------------------------------------

    fn translate_projection(
        &self,
        items: &[SelectItem],
        input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        let mut expressions = Vec::new();
        for item in items {
            match item {
                SelectItem::Wildcard(_) => {
                    for (origin, name) in plan
                        .output_column_origins(input)
                        .into_iter()
                        .zip(plan.output_column_names(input))
                    {
                        expressions.push(LqpExpression::column(origin).with_alias(name));
                    }
                }
                SelectItem::UnnamedExpr(expr) => {
                    expressions.push(self.translate_scalar(expr, input, plan)?);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    expressions.push(
                        self.translate_scalar(expr, input, plan)?
                            .with_alias(alias.value.clone()),
                    );
                }
                other => {
                    return Err(SqlError::Translate(format!(
                        "unsupported SELECT item: {other}"
                    )))
                }
            }
        }
        if expressions.is_empty() {
            return Err(SqlError::Translate("empty SELECT list".into()));
        }
        Ok(plan.add_unary(LqpNodeKind::Projection { expressions }, input))
    }

    fn translate_scalar(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &LogicalPlan,
    ) -> Result<LqpExpression> {
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                let origin = self.resolve_column_expr(expr, input, plan)?;
                Ok(LqpExpression::column(origin).with_alias(plan.origin_name(origin)))
            }
            Expr::Value(value) => Ok(LqpExpression::literal(ast_literal(value)?)),
            Expr::UnaryOp {
                op: sqlparser::ast::UnaryOperator::Minus,
                expr: inner,
            } => match literal_value(inner)? {
                Value::Int64(v) => Ok(LqpExpression::literal(Value::Int64(-v))),
                Value::Float64(v) => Ok(LqpExpression::literal(Value::Float64(-v))),
                other => Err(SqlError::Translate(format!("cannot negate {other}"))),
            },
            Expr::BinaryOp { left, op, right } => {
                let arithmetic = match op {
                    BinaryOperator::Plus => ArithmeticOp::Add,
                    BinaryOperator::Minus => ArithmeticOp::Sub,
                    BinaryOperator::Multiply => ArithmeticOp::Mul,
                    BinaryOperator::Divide => ArithmeticOp::Div,
                    BinaryOperator::Modulo => ArithmeticOp::Mod,
                    other => {
                        return Err(SqlError::Translate(format!(
                            "unsupported operator in SELECT list: {other}"
                        )))
                    }
                };
                Ok(LqpExpression::arithmetic(
                    arithmetic,
                    self.translate_scalar(left, input, plan)?,
                    self.translate_scalar(right, input, plan)?,
                ))
            }
            Expr::Nested(inner) => self.translate_scalar(inner, input, plan),
            other => Err(SqlError::Translate(format!(
                "unsupported expression: {other}"
            ))),
        }
    }

    // ---- ORDER BY / LIMIT -------------------------------------------------

    fn translate_order_by(
        &self,
        query: &Query,
        input: NodeId,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        let order_by = match &query.order_by {
            None => return Ok(input),
            Some(order_by) => order_by,
        };
        let mut keys = Vec::with_capacity(order_by.exprs.len());
        for item in &order_by.exprs {
            let origin = self.resolve_column_expr(&item.expr, input, plan)?;
            let order = match item.asc {
                Some(false) => SortOrder::Descending,
                _ => SortOrder::Ascending,
            };
            keys.push((origin, order));
        }
        Ok(plan.add_unary(LqpNodeKind::Sort { keys }, input))
    }

    // ---- INSERT / UPDATE / DELETE ----------------------------------------

    fn translate_insert(&self, insert: &Insert, plan: &mut LogicalPlan) -> Result<NodeId> {
        let table_name = object_name_to_string(&insert.table_name);
        let table = self.storage.get_table(&table_name)?;
        let width = table.column_count();

        let source = insert.source.as_ref().ok_or_else(|| {
            SqlError::Translate("INSERT requires a source".into())
        })?;

        let source_node = match source.body.as_ref() {
            SetExpr::Values(values) => {
                if values.rows.len() != 1 {
                    return Err(SqlError::Translate(
                        "multi-row INSERT is not supported".into(),
                    ));
                }
                let row = &values.rows[0];
                let dummy = plan.add_node(LqpNodeKind::DummyTable);
                let expressions = self.insert_expressions(&table, &insert.columns, row)?;
                plan.add_unary(LqpNodeKind::Projection { expressions }, dummy)
            }
            _ => {
                // INSERT ... SELECT: the select is the source.
                let select_node = self.translate_query(source, plan)?;
                let select_width = plan.output_column_count(select_node);
                if insert.columns.is_empty() {
                    if select_width != width {
                        return Err(SqlError::Translate(format!(
                            "INSERT source has {select_width} columns but \"{table_name}\" has {width}"
                        )));
                    }
                    select_node
                } else {
                    if insert.columns.len() != select_width {
                        return Err(SqlError::Translate(format!(
                            "INSERT column list has {} entries but the source has {select_width}",
                            insert.columns.len()
                        )));
                    }
                    let mut expressions: Vec<LqpExpression> =
                        vec![LqpExpression::literal(Value::Null); width];
                    let origins = plan.output_column_origins(select_node);
                    for (column, origin) in insert.columns.iter().zip(origins) {
                        let index = table.column_id_by_name(&column.value)? as usize;
                        expressions[index] = LqpExpression::column(origin);
                    }
                    plan.add_unary(LqpNodeKind::Projection { expressions }, select_node)
                }
            }
        };

        Ok(plan.add_unary(
            LqpNodeKind::Insert { table: table_name },
            source_node,
        ))
    }

    /// A width-matching expression list prefilled with NULL literals;
    /// named columns overwrite their slots.
    fn insert_expressions(
        &self,
        table: &stoa::Table,
        columns: &[Ident],
        row: &[Expr],
    ) -> Result<Vec<LqpExpression>> {
        let width = table.column_count();
        if columns.is_empty() {
            if row.len() != width {
                return Err(SqlError::Translate(format!(
                    "INSERT supplies {} values for {width} columns",
                    row.len()
                )));
            }
            return row.iter().map(|e| self.literal_expression(e)).collect();
        }
        if columns.len() != row.len() {
            return Err(SqlError::Translate(format!(
                "INSERT column list has {} entries but {} values",
                columns.len(),
                row.len()
            )));
        }
        let mut expressions: Vec<LqpExpression> =
            vec![LqpExpression::literal(Value::Null); width];
        for (column, expr) in columns.iter().zip(row) {
            let index = table.column_id_by_name(&column.value)? as usize;
            expressions[index] = self.literal_expression(expr)?;
        }
        Ok(expressions)
    }

    fn literal_expression(&self, expr: &Expr) -> Result<LqpExpression> {
        match expr {
            Expr::Value(AstValue::Placeholder(text)) => {
                Ok(LqpExpression::placeholder(placeholder_index(text)?))
            }
            _ => Ok(LqpExpression::literal(literal_value(expr)?)),
        }
    }

    fn translate_update(
        &self,
        table: &TableWithJoins,
        assignments: &[Assignment],
        selection: Option<&Expr>,
        plan: &mut LogicalPlan,
    ) -> Result<NodeId> {
        if !table.joins.is_empty() {
            return Err(SqlError::Translate("UPDATE over a join is not supported".into()));
        }
        let table_name = match &table.relation {
            TableFactor::Table { name, .. } => object_name_to_string(name),
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported UPDATE target: {other}"
                )))
            }
        };
        let stored = self.storage.get_table(&table_name)?;

        let mut source = self.translate_table_factor(&table.relation, plan)?;
        if let Some(selection) = selection {
            source = self.translate_where(selection, source, plan)?;
        }
        // The update pipeline rewires rows through reference columns; a
        // bare stored table is not a valid input.
        if matches!(plan.node(source).kind, LqpNodeKind::StoredTable { .. }) {
            return Err(SqlError::Translate(
                "unconditional UPDATE of a stored table is not supported".into(),
            ));
        }

        // Identity expressions for every column, then the assignments
        // overwrite their targets.
        let origins = plan.output_column_origins(source);
        let mut expressions: Vec<LqpExpression> = origins
            .iter()
            .enumerate()
            .map(|(i, &origin)| {
                LqpExpression::column(origin).with_alias(stored.column_name(i as ColumnId))
            })
            .collect();
        for assignment in assignments {
            let column = match &assignment.target {
                AssignmentTarget::ColumnName(name) => object_name_to_string(name),
                other => {
                    return Err(SqlError::Translate(format!(
                        "unsupported assignment target: {other}"
                    )))
                }
            };
            let index = stored.column_id_by_name(&column)? as usize;
            expressions[index] = self
                .translate_scalar(&assignment.value, source, plan)?
                .with_alias(column);
        }

        Ok(plan.add_unary(
            LqpNodeKind::Update {
                table: table_name,
                expressions,
            },
            source,
        ))
    }

    fn translate_delete(&self, delete: &Delete, plan: &mut LogicalPlan) -> Result<NodeId> {
        let tables = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        if tables.len() != 1 || !tables[0].joins.is_empty() {
            return Err(SqlError::Translate(
                "DELETE supports a single table".into(),
            ));
        }
        let table_name = match &tables[0].relation {
            TableFactor::Table { name, .. } => object_name_to_string(name),
            other => {
                return Err(SqlError::Translate(format!(
                    "unsupported DELETE target: {other}"
                )))
            }
        };
        let table = self.storage.get_table(&table_name)?;

        // StoredTable -> Validate -> predicates -> Delete.
        let stored = plan.add_node(LqpNodeKind::StoredTable {
            name: table_name.clone(),
            alias: None,
            column_names: table.column_names().to_vec(),
            column_types: table.column_types().to_vec(),
        });
        let mut node = plan.add_unary(LqpNodeKind::Validate, stored);
        if let Some(selection) = &delete.selection {
            node = self.translate_where(selection, node, plan)?;
        }
        Ok(plan.add_unary(LqpNodeKind::Delete { table: table_name }, node))
    }

    // ---- Shared helpers ---------------------------------------------------

    fn try_resolve_column_expr(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &LogicalPlan,
    ) -> Result<Option<ColumnOrigin>> {
        let (name, prefix) = match column_name_parts(expr) {
            Some(parts) => parts,
            None => return Ok(None),
        };
        plan.find_column_origin_by_named_column_reference(input, &name, prefix.as_deref())
    }

    fn resolve_column_expr(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &LogicalPlan,
    ) -> Result<ColumnOrigin> {
        self.try_resolve_column_expr(expr, input, plan)?
            .ok_or_else(|| SqlError::Translate(format!("unknown column \"{expr}\"")))
    }

    fn translate_param_value(
        &self,
        expr: &Expr,
        input: NodeId,
        plan: &LogicalPlan,
    ) -> Result<LqpParamValue> {
        if let Expr::Value(AstValue::Placeholder(text)) = expr {
            return Ok(ParamValue::Placeholder(placeholder_index(text)?));
        }
        if let Some(origin) = self.try_resolve_column_expr(expr, input, plan)? {
            return Ok(ParamValue::Column(origin));
        }
        Ok(ParamValue::Literal(literal_value(expr)?))
    }
}

// ---------------------------------------------------------------------------
// AST helpers
// ---------------------------------------------------------------------------

fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}

/// `(column, optional table prefix)` of a column reference expression.
fn column_name_parts(expr: &Expr) -> Option<(String, Option<String>)> {
    match expr {
        Expr::Identifier(ident) => Some((ident.value.clone(), None)),
        Expr::CompoundIdentifier(parts) if parts.len() == 2 => Some((
            parts[1].value.clone(),
            Some(parts[0].value.clone()),
        )),
        Expr::Nested(inner) => column_name_parts(inner),
        _ => None,
    }
}

fn comparison_scan_type(op: &BinaryOperator) -> Option<ScanType> {
    match op {
        BinaryOperator::Eq => Some(ScanType::Equals),
        BinaryOperator::NotEq => Some(ScanType::NotEquals),
        BinaryOperator::Lt => Some(ScanType::LessThan),
        BinaryOperator::LtEq => Some(ScanType::LessThanEquals),
        BinaryOperator::Gt => Some(ScanType::GreaterThan),
        BinaryOperator::GtEq => Some(ScanType::GreaterThanEquals),
        _ => None,
    }
}

fn ast_literal(value: &AstValue) -> Result<Value> {
    match value {
        AstValue::Number(text, _) => {
            if let Ok(v) = text.parse::<i64>() {
                Ok(Value::Int64(v))
            } else {
                text.parse::<f64>()
                    .map(Value::Float64)
                    .map_err(|_| SqlError::Parse(format!("invalid number literal: {text}")))
            }
        }
        AstValue::SingleQuotedString(text) => Ok(Value::Text(text.clone())),
        AstValue::Null => Ok(Value::Null),
        other => Err(SqlError::Translate(format!(
            "unsupported literal: {other}"
        ))),
    }
}

/// A plain typed value; anything else is a translation error.
fn literal_value(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Value(value) => ast_literal(value),
        Expr::UnaryOp {
            op: sqlparser::ast::UnaryOperator::Minus,
            expr: inner,
        } => match literal_value(inner)? {
            Value::Int64(v) => Ok(Value::Int64(-v)),
            Value::Float64(v) => Ok(Value::Float64(-v)),
            other => Err(SqlError::Translate(format!("cannot negate {other}"))),
        },
        Expr::Nested(inner) => literal_value(inner),
        other => Err(SqlError::Translate(format!(
            "expected a literal, found {other}"
        ))),
    }
}

/// `$N` placeholders are 1-based in the text, 0-based internally.
fn placeholder_index(text: &str) -> Result<u16> {
    let digits = text.trim_start_matches(['$', '?']);
    if digits.is_empty() {
        return Err(SqlError::Translate(
            "placeholders must be numbered ($1, $2, ...)".into(),
        ));
    }
    let index: u16 = digits
        .parse()
        .map_err(|_| SqlError::Translate(format!("invalid placeholder {text}")))?;
    if index == 0 {
        return Err(SqlError::Translate("placeholders are 1-based".into()));
    }
    Ok(index - 1)
}

fn group_by_expressions(group_by: &GroupByExpr) -> Result<Vec<Expr>> {
    match group_by {
        GroupByExpr::Expressions(exprs, _) => Ok(exprs.clone()),
        GroupByExpr::All(_) => Err(SqlError::Translate("GROUP BY ALL is not supported".into())),
    }
}

fn contains_aggregate_function(expr: &Expr) -> bool {
    match expr {
        Expr::Function(function) => matches!(
            function.name.to_string().to_uppercase().as_str(),
            "COUNT" | "SUM" | "MIN" | "MAX" | "AVG"
        ),
        Expr::Nested(inner) => contains_aggregate_function(inner),
        Expr::BinaryOp { left, right, .. } => {
            contains_aggregate_function(left) || contains_aggregate_function(right)
        }
        Expr::UnaryOp { expr, .. } => contains_aggregate_function(expr),
        _ => false,
    }
}

fn translate_limit(query: &Query, input: NodeId, plan: &mut LogicalPlan) -> Result<NodeId> {
    let limit = match &query.limit {
        None => return Ok(input),
        Some(expr) => expr,
    };
    match limit {
        Expr::Value(AstValue::Number(text, _)) => {
            let count: u64 = text
                .parse()
                .map_err(|_| SqlError::Translate(format!("invalid LIMIT: {text}")))?;
            Ok(plan.add_unary(LqpNodeKind::Limit { count }, input))
        }
        other => Err(SqlError::Translate(format!(
            "LIMIT must be an integer literal, found {other}"
        ))),
    }
}
