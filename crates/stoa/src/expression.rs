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

//! The expression tree shared by plan nodes and operators.
//!
//! `Expression<C>` is generic over its column-reference payload: plan
//! expressions carry a column provenance, operator expressions carry a
//! bare `ColumnId`. The two share structure but not identity.

use std::fmt;

use crate::types::{ColumnId, Value};

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::Avg => "AVG",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
            ArithmeticOp::Pow => "^",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Exists,
}

/// Predicate comparison kinds shared by scans and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Like,
    NotLike,
    Between,
}

impl ScanType {
    /// The scan type after swapping comparison operands so the column
    /// ends up on the left. Equality kinds are commutative and stay put.
    pub fn flipped(self) -> ScanType {
        match self {
            ScanType::LessThan => ScanType::GreaterThan,
            ScanType::LessThanEquals => ScanType::GreaterThanEquals,
            ScanType::GreaterThan => ScanType::LessThan,
            ScanType::GreaterThanEquals => ScanType::LessThanEquals,
            other => other,
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanType::Equals => "=",
            ScanType::NotEquals => "<>",
            ScanType::LessThan => "<",
            ScanType::LessThanEquals => "<=",
            ScanType::GreaterThan => ">",
            ScanType::GreaterThanEquals => ">=",
            ScanType::Like => "LIKE",
            ScanType::NotLike => "NOT LIKE",
            ScanType::Between => "BETWEEN",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind<C> {
    Literal(Value),
    Placeholder(u16),
    Column(C),
    Star,
    Aggregate(AggregateKind),
    Arithmetic(ArithmeticOp),
    Comparison(ScanType),
    Logical(LogicalOp),
}

/// An expression node: a kind, an optional alias, and child expressions.
/// Deep copy is `Clone`; structural equality covers kind, alias and
/// children.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression<C> {
    pub kind: ExpressionKind<C>,
    pub alias: Option<String>,
    pub children: Vec<Expression<C>>,
}

/// Operator-side expressions reference columns by dense id.
pub type OpExpression = Expression<ColumnId>;

impl<C> Expression<C> {
    fn node(kind: ExpressionKind<C>, children: Vec<Expression<C>>) -> Expression<C> {
        Expression {
            kind,
            alias: None,
            children,
        }
    }

    pub fn literal(value: Value) -> Expression<C> {
        Expression::node(ExpressionKind::Literal(value), Vec::new())
    }

    pub fn placeholder(index: u16) -> Expression<C> {
        Expression::node(ExpressionKind::Placeholder(index), Vec::new())
    }

    pub fn column(reference: C) -> Expression<C> {
        Expression::node(ExpressionKind::Column(reference), Vec::new())
    }

    pub fn star() -> Expression<C> {
        Expression::node(ExpressionKind::Star, Vec::new())
    }

    pub fn aggregate(kind: AggregateKind, argument: Expression<C>) -> Expression<C> {
        Expression::node(ExpressionKind::Aggregate(kind), vec![argument])
    }

    pub fn arithmetic(
        op: ArithmeticOp,
        left: Expression<C>,
        right: Expression<C>,
    ) -> Expression<C> {
        Expression::node(ExpressionKind::Arithmetic(op), vec![left, right])
    }

    pub fn comparison(
        scan_type: ScanType,
        left: Expression<C>,
        right: Expression<C>,
    ) -> Expression<C> {
        Expression::node(ExpressionKind::Comparison(scan_type), vec![left, right])
    }

    pub fn between(
        probe: Expression<C>,
        low: Expression<C>,
        high: Expression<C>,
    ) -> Expression<C> {
        Expression::node(
            ExpressionKind::Comparison(ScanType::Between),
            vec![probe, low, high],
        )
    }

    pub fn logical(op: LogicalOp, children: Vec<Expression<C>>) -> Expression<C> {
        Expression::node(ExpressionKind::Logical(op), children)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Expression<C> {
        self.alias = Some(alias.into());
        self
    }

    // ---- Classifiers ------------------------------------------------------

    pub fn is_operator(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Arithmetic(_)
                | ExpressionKind::Comparison(_)
                | ExpressionKind::Logical(_)
        )
    }

    pub fn is_arithmetic_operator(&self) -> bool {
        matches!(self.kind, ExpressionKind::Arithmetic(_))
    }

    pub fn is_logical_operator(&self) -> bool {
        matches!(self.kind, ExpressionKind::Logical(_))
    }

    pub fn is_binary_operator(&self) -> bool {
        match self.kind {
            ExpressionKind::Arithmetic(_) => true,
            ExpressionKind::Comparison(st) => st != ScanType::Between,
            ExpressionKind::Logical(op) => matches!(op, LogicalOp::And | LogicalOp::Or),
            _ => false,
        }
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Logical(LogicalOp::Not) | ExpressionKind::Logical(LogicalOp::Exists)
        )
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Literal(Value::Null))
    }

    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Literal(_)
                | ExpressionKind::Column(_)
                | ExpressionKind::Placeholder(_)
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, ExpressionKind::Aggregate(_))
    }

    /// Whether any node in the tree is an aggregate function.
    pub fn contains_aggregate(&self) -> bool {
        self.is_aggregate() || self.children.iter().any(Expression::contains_aggregate)
    }
}

impl<C: Clone> Expression<C> {
    /// Structure- and alias-preserving copy.
    pub fn deep_copy(&self) -> Expression<C> {
        self.clone()
    }

    /// Substitute positional placeholders with bound values.
    pub fn bind_placeholders(&self, params: &[Value]) -> Expression<C> {
        let mut copy = self.clone();
        copy.bind_in_place(params);
        copy
    }

    fn bind_in_place(&mut self, params: &[Value]) {
        if let ExpressionKind::Placeholder(index) = self.kind {
            if let Some(value) = params.get(index as usize) {
                self.kind = ExpressionKind::Literal(value.clone());
            }
        }
        for child in &mut self.children {
            child.bind_in_place(params);
        }
    }
}

impl<C: fmt::Display> Expression<C> {
    /// The column name this expression produces: its alias, or its
    /// printed form.
    pub fn output_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.to_string(),
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, root: bool) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Literal(Value::Text(text)) => write!(f, "'{text}'"),
            ExpressionKind::Literal(value) => write!(f, "{value}"),
            ExpressionKind::Placeholder(_) => f.write_str("?"),
            // A column prints as its resolved name when one is known.
            ExpressionKind::Column(reference) => match &self.alias {
                Some(alias) => f.write_str(alias),
                None => write!(f, "{reference}"),
            },
            ExpressionKind::Star => f.write_str("*"),
            ExpressionKind::Aggregate(kind) => {
                write!(f, "{kind}(")?;
                self.children[0].fmt_node(f, true)?;
                f.write_str(")")
            }
            ExpressionKind::Arithmetic(op) => {
                self.fmt_binary(f, root, &format!("{op}"))
            }
            ExpressionKind::Comparison(ScanType::Between) => {
                if !root {
                    f.write_str("(")?;
                }
                self.children[0].fmt_node(f, false)?;
                f.write_str(" BETWEEN ")?;
                self.children[1].fmt_node(f, false)?;
                f.write_str(" AND ")?;
                self.children[2].fmt_node(f, false)?;
                if !root {
                    f.write_str(")")?;
                }
                Ok(())
            }
            ExpressionKind::Comparison(scan_type) => {
                self.fmt_binary(f, root, &format!("{scan_type}"))
            }
            ExpressionKind::Logical(LogicalOp::And) => self.fmt_binary(f, root, "AND"),
            ExpressionKind::Logical(LogicalOp::Or) => self.fmt_binary(f, root, "OR"),
            ExpressionKind::Logical(LogicalOp::Not) => {
                f.write_str("NOT ")?;
                self.children[0].fmt_node(f, false)
            }
            ExpressionKind::Logical(LogicalOp::Exists) => {
                f.write_str("EXISTS (")?;
                self.children[0].fmt_node(f, true)?;
                f.write_str(")")
            }
        }
    }

    // Non-root binary operators are parenthesized.
    fn fmt_binary(&self, f: &mut fmt::Formatter<'_>, root: bool, op: &str) -> fmt::Result {
        if !root {
            f.write_str("(")?;
        }
        self.children[0].fmt_node(f, false)?;
        write!(f, " {op} ")?;
        self.children[1].fmt_node(f, false)?;
        if !root {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl<C: fmt::Display> fmt::Display for Expression<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> OpExpression {
        Expression::column(0).with_alias(name)
    }

    #[test]
    fn display_parenthesizes_non_root_operators() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Mul,
            Expression::arithmetic(ArithmeticOp::Add, col("a"), Expression::literal(Value::Int32(1))),
            col("b"),
        );
        assert_eq!(expr.to_string(), "(a + 1) * b");
    }

    #[test]
    fn display_aggregates_and_between() {
        let sum = Expression::aggregate(AggregateKind::Sum, col("b"));
        assert_eq!(sum.to_string(), "SUM(b)");
        let between = Expression::between(
            col("a"),
            Expression::literal(Value::Int32(1)),
            Expression::literal(Value::Int32(9)),
        );
        assert_eq!(between.to_string(), "a BETWEEN 1 AND 9");
    }

    #[test]
    fn deep_copy_preserves_structure_and_alias() {
        let expr = Expression::comparison(ScanType::LessThan, col("a"), col("b"))
            .with_alias("lt");
        let copy = expr.deep_copy();
        assert_eq!(expr, copy);
        assert_eq!(copy.alias.as_deref(), Some("lt"));
    }

    #[test]
    fn classifiers() {
        let cmp: OpExpression =
            Expression::comparison(ScanType::Equals, col("a"), Expression::literal(Value::Int32(1)));
        assert!(cmp.is_operator() && cmp.is_binary_operator());
        assert!(!cmp.is_arithmetic_operator());
        let not: OpExpression = Expression::logical(LogicalOp::Not, vec![cmp.clone()]);
        assert!(not.is_unary_operator() && not.is_logical_operator());
        assert!(Expression::<u16>::literal(Value::Null).is_null_literal());
        assert!(col("a").is_operand());
        let between: OpExpression = Expression::between(
            col("a"),
            Expression::literal(Value::Int32(0)),
            Expression::literal(Value::Int32(1)),
        );
        assert!(!between.is_binary_operator());
    }

    #[test]
    fn placeholder_binding() {
        let expr: OpExpression = Expression::comparison(
            ScanType::Equals,
            col("a"),
            Expression::placeholder(0),
        );
        let bound = expr.bind_placeholders(&[Value::Int32(42)]);
        assert_eq!(
            bound.children[1].kind,
            ExpressionKind::Literal(Value::Int32(42))
        );
        // Copy-on-bind: the original still carries the placeholder.
        assert_eq!(expr.children[1].kind, ExpressionKind::Placeholder(0));
    }

    #[test]
    fn flipped_scan_types() {
        assert_eq!(ScanType::LessThan.flipped(), ScanType::GreaterThan);
        assert_eq!(ScanType::GreaterThanEquals.flipped(), ScanType::LessThanEquals);
        assert_eq!(ScanType::Equals.flipped(), ScanType::Equals);
        assert_eq!(ScanType::NotEquals.flipped(), ScanType::NotEquals);
    }
}
