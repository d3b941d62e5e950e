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

//! The logical query plan: a mutable DAG of typed plan nodes.
//!
//! Nodes live in an arena owned by `LogicalPlan`; children are `NodeId`
//! indices and parents are back-edges maintained by the child setters.
//! A shared sub-plan is the same `NodeId` appearing under two parents.
//! Column provenance (`ColumnOrigin`) is the stable identity of a
//! column across plan rewrites: leaves and column-creating nodes
//! (projection expressions, aggregates) originate columns, everything
//! else forwards its child's origins.

use std::fmt;

use stoa::expression::{Expression, ScanType};
use stoa::statistics::TableStatistics;
use stoa::types::{ColumnId, DataType, JoinMode, ParamValue, SortOrder, Value};
use stoa::StorageManager;

use crate::SqlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// `(defining node, output column id)`: the identity of a logical
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnOrigin {
    pub node: NodeId,
    pub column_id: ColumnId,
}

impl ColumnOrigin {
    pub fn new(node: NodeId, column_id: ColumnId) -> ColumnOrigin {
        ColumnOrigin { node, column_id }
    }
}

impl fmt::Display for ColumnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.column_id)
    }
}

/// Plan-side expressions carry provenance for column references.
pub type LqpExpression = Expression<ColumnOrigin>;
/// Plan-side scan parameters.
pub type LqpParamValue = ParamValue<ColumnOrigin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMode {
    /// Set union on row ids, not values.
    Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowKind {
    Tables,
    Columns(String),
}

#[derive(Debug, Clone)]
pub enum LqpNodeKind {
    StoredTable {
        name: String,
        alias: Option<String>,
        column_names: Vec<String>,
        column_types: Vec<DataType>,
    },
    /// Zero-column leaf standing in for `INSERT ... VALUES` sources.
    DummyTable,
    Validate,
    Predicate {
        column: ColumnOrigin,
        scan_type: ScanType,
        value: LqpParamValue,
        value2: Option<Value>,
    },
    Projection {
        expressions: Vec<LqpExpression>,
    },
    Aggregate {
        aggregates: Vec<LqpExpression>,
        group_by: Vec<ColumnOrigin>,
    },
    Join {
        mode: JoinMode,
        predicate: Option<(ColumnOrigin, ColumnOrigin, ScanType)>,
    },
    Sort {
        keys: Vec<(ColumnOrigin, SortOrder)>,
    },
    Limit {
        count: u64,
    },
    Union {
        mode: UnionMode,
    },
    Insert {
        table: String,
    },
    Update {
        table: String,
        expressions: Vec<LqpExpression>,
    },
    Delete {
        table: String,
    },
    Show {
        kind: ShowKind,
    },
}

#[derive(Debug, Clone)]
pub struct LqpNode {
    pub kind: LqpNodeKind,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parents: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct LogicalPlan {
    nodes: Vec<LqpNode>,
}

impl LogicalPlan {
    pub fn new() -> LogicalPlan {
        LogicalPlan::default()
    }

    pub fn add_node(&mut self, kind: LqpNodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(LqpNode {
            kind,
            left: None,
            right: None,
            parents: Vec::new(),
        });
        id
    }

    pub fn add_unary(&mut self, kind: LqpNodeKind, left: NodeId) -> NodeId {
        let id = self.add_node(kind);
        self.set_left_child(id, Some(left));
        id
    }

    pub fn add_binary(&mut self, kind: LqpNodeKind, left: NodeId, right: NodeId) -> NodeId {
        let id = self.add_node(kind);
        self.set_left_child(id, Some(left));
        self.set_right_child(id, Some(right));
        id
    }

    pub fn node(&self, id: NodeId) -> &LqpNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut LqpNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Setting a child maintains the child's parent back-pointer;
    /// clearing resets it.
    pub fn set_left_child(&mut self, id: NodeId, child: Option<NodeId>) {
        let old = self.node(id).left;
        if let Some(old) = old {
            self.node_mut(old).parents.retain(|&p| p != id);
        }
        self.node_mut(id).left = child;
        if let Some(child) = child {
            self.node_mut(child).parents.push(id);
        }
    }

    pub fn set_right_child(&mut self, id: NodeId, child: Option<NodeId>) {
        let old = self.node(id).right;
        if let Some(old) = old {
            self.node_mut(old).parents.retain(|&p| p != id);
        }
        self.node_mut(id).right = child;
        if let Some(child) = child {
            self.node_mut(child).parents.push(id);
        }
    }

    fn left_of(&self, id: NodeId) -> NodeId {
        self.node(id)
            .left
            .expect("plan node is missing its left child")
    }

    // ---- Output columns ---------------------------------------------------

    pub fn output_column_count(&self, id: NodeId) -> usize {
        self.output_column_origins(id).len()
    }

    /// The provenance of each output column, dense `[0..k)`.
    pub fn output_column_origins(&self, id: NodeId) -> Vec<ColumnOrigin> {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable { column_names, .. } => (0..column_names.len())
                .map(|i| ColumnOrigin::new(id, i as ColumnId))
                .collect(),
            LqpNodeKind::DummyTable => Vec::new(),
            LqpNodeKind::Projection { expressions } => expressions
                .iter()
                .enumerate()
                .map(|(i, e)| match &e.kind {
                    stoa::expression::ExpressionKind::Column(origin) => *origin,
                    _ => ColumnOrigin::new(id, i as ColumnId),
                })
                .collect(),
            LqpNodeKind::Aggregate {
                aggregates,
                group_by,
            } => {
                let mut origins = group_by.clone();
                origins.extend(
                    (0..aggregates.len())
                        .map(|i| ColumnOrigin::new(id, (group_by.len() + i) as ColumnId)),
                );
                origins
            }
            LqpNodeKind::Join { .. } => {
                let node = self.node(id);
                let mut origins = self.output_column_origins(node.left.unwrap());
                origins.extend(self.output_column_origins(node.right.unwrap()));
                origins
            }
            LqpNodeKind::Show { kind } => {
                let width = match kind {
                    ShowKind::Tables => 1,
                    ShowKind::Columns(_) => 3,
                };
                (0..width)
                    .map(|i| ColumnOrigin::new(id, i as ColumnId))
                    .collect()
            }
            LqpNodeKind::Insert { .. }
            | LqpNodeKind::Update { .. }
            | LqpNodeKind::Delete { .. } => Vec::new(),
            // Validate, Predicate, Sort, Limit, Union forward their
            // input columns untouched.
            _ => self.output_column_origins(self.left_of(id)),
        }
    }

    pub fn output_column_names(&self, id: NodeId) -> Vec<String> {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable { column_names, .. } => column_names.clone(),
            LqpNodeKind::DummyTable => Vec::new(),
            LqpNodeKind::Projection { expressions } => expressions
                .iter()
                .map(|e| self.expression_name(e))
                .collect(),
            LqpNodeKind::Aggregate {
                aggregates,
                group_by,
            } => {
                let mut names: Vec<String> = group_by
                    .iter()
                    .map(|&origin| self.origin_name(origin))
                    .collect();
                names.extend(aggregates.iter().map(|e| self.expression_name(e)));
                names
            }
            LqpNodeKind::Join { .. } => {
                let node = self.node(id);
                let mut names = self.output_column_names(node.left.unwrap());
                names.extend(self.output_column_names(node.right.unwrap()));
                names
            }
            LqpNodeKind::Show { kind } => match kind {
                ShowKind::Tables => vec!["table_name".to_string()],
                ShowKind::Columns(_) => vec![
                    "column_name".to_string(),
                    "column_type".to_string(),
                    "nullable".to_string(),
                ],
            },
            LqpNodeKind::Insert { .. }
            | LqpNodeKind::Update { .. }
            | LqpNodeKind::Delete { .. } => Vec::new(),
            _ => self.output_column_names(self.left_of(id)),
        }
    }

    /// The display name a column carries at its defining node.
    pub fn origin_name(&self, origin: ColumnOrigin) -> String {
        self.output_column_names(origin.node)
            .get(origin.column_id as usize)
            .cloned()
            .unwrap_or_else(|| origin.to_string())
    }

    fn expression_name(&self, expression: &LqpExpression) -> String {
        if let Some(alias) = &expression.alias {
            return alias.clone();
        }
        if let stoa::expression::ExpressionKind::Column(origin) = &expression.kind {
            return self.origin_name(*origin);
        }
        expression.to_string()
    }

    pub fn find_column_origin_by_output_column_id(
        &self,
        id: NodeId,
        column: ColumnId,
    ) -> Option<ColumnOrigin> {
        self.output_column_origins(id)
            .get(column as usize)
            .copied()
    }

    pub fn find_output_column_id_by_column_origin(
        &self,
        id: NodeId,
        origin: ColumnOrigin,
    ) -> Option<ColumnId> {
        self.output_column_origins(id)
            .iter()
            .position(|&o| o == origin)
            .map(|i| i as ColumnId)
    }

    // ---- Name resolution --------------------------------------------------

    /// Resolve a (possibly table-qualified) column name against a
    /// node's output. Ambiguity is a hard error; an unknown name is
    /// `Ok(None)`.
    pub fn find_column_origin_by_named_column_reference(
        &self,
        id: NodeId,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<Option<ColumnOrigin>, SqlError> {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable {
                name: table_name,
                alias,
                column_names,
                ..
            } => {
                if let Some(prefix) = prefix {
                    let label = alias.as_deref().unwrap_or(table_name);
                    if prefix != label {
                        return Ok(None);
                    }
                }
                Ok(column_names
                    .iter()
                    .position(|n| n == name)
                    .map(|i| ColumnOrigin::new(id, i as ColumnId)))
            }
            LqpNodeKind::DummyTable
            | LqpNodeKind::Show { .. }
            | LqpNodeKind::Insert { .. }
            | LqpNodeKind::Update { .. }
            | LqpNodeKind::Delete { .. } => Ok(None),
            LqpNodeKind::Join { .. } => {
                let node = self.node(id);
                let left =
                    self.find_column_origin_by_named_column_reference(node.left.unwrap(), name, prefix)?;
                let right = self.find_column_origin_by_named_column_reference(
                    node.right.unwrap(),
                    name,
                    prefix,
                )?;
                match (left, right) {
                    (Some(_), Some(_)) => Err(SqlError::Translate(format!(
                        "column reference \"{name}\" is ambiguous"
                    ))),
                    (left, right) => Ok(left.or(right)),
                }
            }
            LqpNodeKind::Projection { .. } | LqpNodeKind::Aggregate { .. } => {
                self.resolve_in_outputs(id, name, prefix)
            }
            _ => {
                self.find_column_origin_by_named_column_reference(self.left_of(id), name, prefix)
            }
        }
    }

    /// Column-creating nodes define their own namespace: unqualified
    /// names match output names, qualified names resolve through the
    /// child and must be forwarded by this node.
    fn resolve_in_outputs(
        &self,
        id: NodeId,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<Option<ColumnOrigin>, SqlError> {
        let origins = self.output_column_origins(id);
        match prefix {
            None => {
                let names = self.output_column_names(id);
                let mut hits: Vec<ColumnOrigin> = names
                    .iter()
                    .zip(&origins)
                    .filter(|(n, _)| n.as_str() == name)
                    .map(|(_, &o)| o)
                    .collect();
                hits.dedup();
                match hits.len() {
                    0 => Ok(None),
                    1 => Ok(Some(hits[0])),
                    _ => Err(SqlError::Translate(format!(
                        "column reference \"{name}\" is ambiguous"
                    ))),
                }
            }
            Some(_) => {
                let child = self.left_of(id);
                match self.find_column_origin_by_named_column_reference(child, name, prefix)? {
                    Some(origin) if origins.contains(&origin) => Ok(Some(origin)),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Bind an expression (typically a HAVING aggregate) to an
    /// aggregate node's output column.
    pub fn column_origin_for_expression(
        &self,
        aggregate: NodeId,
        expression: &LqpExpression,
    ) -> Option<ColumnOrigin> {
        match &self.node(aggregate).kind {
            LqpNodeKind::Aggregate {
                aggregates,
                group_by,
            } => aggregates
                .iter()
                .position(|e| e.kind == expression.kind && e.children == expression.children)
                .map(|i| ColumnOrigin::new(aggregate, (group_by.len() + i) as ColumnId)),
            _ => None,
        }
    }

    // ---- Introspection ----------------------------------------------------

    /// Whether this node reads or writes the named stored table.
    pub fn manages_table(&self, id: NodeId, table: &str) -> bool {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable { name, .. } => name == table,
            LqpNodeKind::Insert { table: t }
            | LqpNodeKind::Update { table: t, .. }
            | LqpNodeKind::Delete { table: t } => t == table,
            _ => false,
        }
    }

    /// Statistics are exposed on stored-table leaves only.
    pub fn statistics(
        &self,
        id: NodeId,
        storage: &StorageManager,
    ) -> Result<TableStatistics, SqlError> {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable { name, .. } => {
                Ok(storage.get_table(name)?.statistics())
            }
            _ => Err(SqlError::Translate(
                "statistics are only available on stored-table leaves".into(),
            )),
        }
    }

    pub fn describe(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            LqpNodeKind::StoredTable { name, .. } => format!("[StoredTable] {name}"),
            LqpNodeKind::DummyTable => "[DummyTable]".to_string(),
            LqpNodeKind::Validate => "[Validate]".to_string(),
            LqpNodeKind::Predicate {
                column,
                scan_type,
                value,
                value2,
            } => {
                let value = match value {
                    ParamValue::Literal(v) => v.to_string(),
                    ParamValue::Column(origin) => self.origin_name(*origin),
                    ParamValue::Placeholder(i) => format!("${}", i + 1),
                };
                match value2 {
                    Some(high) => format!(
                        "[Predicate] {} BETWEEN {value} AND {high}",
                        self.origin_name(*column)
                    ),
                    None => format!(
                        "[Predicate] {} {scan_type} {value}",
                        self.origin_name(*column)
                    ),
                }
            }
            LqpNodeKind::Projection { expressions } => {
                let list: Vec<String> =
                    expressions.iter().map(|e| self.expression_name(e)).collect();
                format!("[Projection] {}", list.join(", "))
            }
            LqpNodeKind::Aggregate {
                aggregates,
                group_by,
            } => {
                let aggregates: Vec<String> =
                    aggregates.iter().map(|e| e.to_string()).collect();
                let keys: Vec<String> =
                    group_by.iter().map(|&o| self.origin_name(o)).collect();
                format!(
                    "[Aggregate] {} group by [{}]",
                    aggregates.join(", "),
                    keys.join(", ")
                )
            }
            LqpNodeKind::Join { mode, predicate } => match predicate {
                Some((left, right, scan_type)) => format!(
                    "[Join] {mode:?} {} {scan_type} {}",
                    self.origin_name(*left),
                    self.origin_name(*right)
                ),
                None => format!("[Join] {mode:?}"),
            },
            LqpNodeKind::Sort { keys } => {
                let keys: Vec<String> = keys
                    .iter()
                    .map(|&(o, order)| format!("{} {order:?}", self.origin_name(o)))
                    .collect();
                format!("[Sort] {}", keys.join(", "))
            }
            LqpNodeKind::Limit { count } => format!("[Limit] {count}"),
            LqpNodeKind::Union { mode } => format!("[Union] {mode:?}"),
            LqpNodeKind::Insert { table } => format!("[Insert] {table}"),
            LqpNodeKind::Update { table, .. } => format!("[Update] {table}"),
            LqpNodeKind::Delete { table } => format!("[Delete] {table}"),
            LqpNodeKind::Show { kind } => format!("[Show] {kind:?}"),
        }
    }
}
