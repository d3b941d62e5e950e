//! Row-wise expression evaluation and SQL comparison semantics.
//!
//! Integer division truncates toward zero and modulo follows the sign
//! of the dividend (Rust's native semantics). Floating math is IEEE-754;
//! integer division by zero and forbidden overflow abort the query.
//! Comparisons involving NULL are unknown, and an unknown predicate
//! result filters the row out.

use std::cmp::Ordering;

use crate::expression::{ArithmeticOp, ExpressionKind, OpExpression, ScanType};
use crate::table::Table;
use crate::types::{ColumnId, DataType, Value};
use crate::{Result, StoaError};

/// The result type of a row-wise expression over `input`'s columns.
pub(crate) fn infer_type(expr: &OpExpression, input: &Table) -> Result<DataType> {
    match &expr.kind {
        ExpressionKind::Literal(value) => Ok(value.data_type().unwrap_or(DataType::Int32)),
        ExpressionKind::Column(c) => Ok(input.column_type(*c)),
        ExpressionKind::Placeholder(_) => {
            Err(StoaError::Evaluation("unbound placeholder".into()))
        }
        ExpressionKind::Arithmetic(_) => {
            let left = infer_type(&expr.children[0], input)?;
            let right = infer_type(&expr.children[1], input)?;
            left.promote(right)
        }
        _ => Err(StoaError::Evaluation(format!(
            "expression {expr} has no row-wise value"
        ))),
    }
}

/// Evaluate an expression against one row; `row` resolves column ids.
pub(crate) fn evaluate(
    expr: &OpExpression,
    row: &dyn Fn(ColumnId) -> Value,
) -> Result<Value> {
    match &expr.kind {
        ExpressionKind::Literal(value) => Ok(value.clone()),
        ExpressionKind::Column(c) => Ok(row(*c)),
        ExpressionKind::Placeholder(_) => {
            Err(StoaError::Evaluation("unbound placeholder".into()))
        }
        ExpressionKind::Arithmetic(op) => {
            let left = evaluate(&expr.children[0], row)?;
            let right = evaluate(&expr.children[1], row)?;
            arithmetic(*op, left, right)
        }
        _ => Err(StoaError::Evaluation(format!(
            "cannot evaluate {expr} row-wise"
        ))),
    }
}

/// Replace all-literal arithmetic subtrees with their value.
pub(crate) fn fold_constants(expr: &OpExpression) -> Result<OpExpression> {
    fn is_literal_tree(expr: &OpExpression) -> bool {
        match expr.kind {
            ExpressionKind::Literal(_) => true,
            ExpressionKind::Arithmetic(_) => expr.children.iter().all(is_literal_tree),
            _ => false,
        }
    }
    if matches!(expr.kind, ExpressionKind::Arithmetic(_)) && is_literal_tree(expr) {
        let value = evaluate(expr, &|_| Value::Null)?;
        let mut folded = OpExpression::literal(value);
        folded.alias = expr.alias.clone();
        return Ok(folded);
    }
    let mut folded = expr.clone();
    folded.children = expr
        .children
        .iter()
        .map(fold_constants)
        .collect::<Result<_>>()?;
    Ok(folded)
}

fn arithmetic(op: ArithmeticOp, left: Value, right: Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    // Unwraps are safe: both sides are non-null here.
    let target = left
        .data_type()
        .unwrap()
        .promote(right.data_type().unwrap())?;
    match target {
        DataType::Int32 | DataType::Int64 => {
            let a = int_operand(&left);
            let b = int_operand(&right);
            Value::Int64(int_arithmetic(op, a, b)?).coerce(target)
        }
        DataType::Float32 | DataType::Float64 => {
            let a = left.as_f64().unwrap();
            let b = right.as_f64().unwrap();
            Value::Float64(float_arithmetic(op, a, b)).coerce(target)
        }
        DataType::Text => unreachable!("promote rejects text operands"),
    }
}

fn int_operand(value: &Value) -> i64 {
    match value {
        Value::Int32(v) => *v as i64,
        Value::Int64(v) => *v,
        _ => unreachable!("integer arithmetic over non-integer value"),
    }
}

fn int_arithmetic(op: ArithmeticOp, a: i64, b: i64) -> Result<i64> {
    let overflow = || StoaError::Evaluation("integer overflow".into());
    match op {
        ArithmeticOp::Add => a.checked_add(b).ok_or_else(overflow),
        ArithmeticOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        ArithmeticOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        ArithmeticOp::Div => {
            if b == 0 {
                return Err(StoaError::Evaluation("division by zero".into()));
            }
            a.checked_div(b).ok_or_else(overflow)
        }
        ArithmeticOp::Mod => {
            if b == 0 {
                return Err(StoaError::Evaluation("division by zero".into()));
            }
            a.checked_rem(b).ok_or_else(overflow)
        }
        ArithmeticOp::Pow => {
            let exponent = u32::try_from(b).map_err(|_| {
                StoaError::Evaluation("integer exponent must fit 0..2^32".into())
            })?;
            a.checked_pow(exponent).ok_or_else(overflow)
        }
    }
}

fn float_arithmetic(op: ArithmeticOp, a: f64, b: f64) -> f64 {
    match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Mod => a % b,
        ArithmeticOp::Pow => a.powf(b),
    }
}

/// SQL comparison: unknown when either side is NULL; mixed numeric types
/// compare after promotion.
pub(crate) fn sql_compare(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    let lt = left.data_type().unwrap();
    let rt = right.data_type().unwrap();
    if lt == rt {
        return Ok(Some(left.total_cmp(right)));
    }
    let target = lt.promote(rt).map_err(|_| {
        StoaError::Evaluation(format!("cannot compare {} and {}", lt.name(), rt.name()))
    })?;
    let l = left.clone().coerce(target)?;
    let r = right.clone().coerce(target)?;
    Ok(Some(l.total_cmp(&r)))
}

/// Whether `probe` passes the scan predicate. An unknown comparison
/// result filters the row.
pub(crate) fn scan_matches(
    scan_type: ScanType,
    probe: &Value,
    search: &Value,
    search2: Option<&Value>,
) -> Result<bool> {
    let matched = match scan_type {
        ScanType::Equals => sql_compare(probe, search)?.map(|o| o == Ordering::Equal),
        ScanType::NotEquals => sql_compare(probe, search)?.map(|o| o != Ordering::Equal),
        ScanType::LessThan => sql_compare(probe, search)?.map(|o| o == Ordering::Less),
        ScanType::LessThanEquals => {
            sql_compare(probe, search)?.map(|o| o != Ordering::Greater)
        }
        ScanType::GreaterThan => sql_compare(probe, search)?.map(|o| o == Ordering::Greater),
        ScanType::GreaterThanEquals => {
            sql_compare(probe, search)?.map(|o| o != Ordering::Less)
        }
        ScanType::Between => {
            let high = search2.ok_or_else(|| {
                StoaError::Evaluation("BETWEEN requires an upper bound".into())
            })?;
            match (sql_compare(probe, search)?, sql_compare(probe, high)?) {
                (Some(lo), Some(hi)) => {
                    Some(lo != Ordering::Less && hi != Ordering::Greater)
                }
                _ => None,
            }
        }
        ScanType::Like | ScanType::NotLike => match (probe, search) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Text(text), Value::Text(pattern)) => {
                let hit = like_match(text, pattern);
                Some(if scan_type == ScanType::NotLike { !hit } else { hit })
            }
            _ => {
                return Err(StoaError::Evaluation(
                    "LIKE requires text operands".into(),
                ))
            }
        },
    };
    Ok(matched.unwrap_or(false))
}

/// SQL LIKE: `%` matches any run of characters, `_` exactly one.
pub(crate) fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let mut matched = vec![vec![false; pattern.len() + 1]; text.len() + 1];
    matched[0][0] = true;
    for j in 1..=pattern.len() {
        if pattern[j - 1] == '%' {
            matched[0][j] = matched[0][j - 1];
        }
    }
    for i in 1..=text.len() {
        for j in 1..=pattern.len() {
            matched[i][j] = match pattern[j - 1] {
                '%' => matched[i][j - 1] || matched[i - 1][j],
                '_' => matched[i - 1][j - 1],
                c => matched[i - 1][j - 1] && text[i - 1] == c,
            };
        }
    }
    matched[text.len()][pattern.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    #[test]
    fn integer_division_truncates_toward_zero() {
        assert_eq!(int_arithmetic(ArithmeticOp::Div, 7, 2).unwrap(), 3);
        assert_eq!(int_arithmetic(ArithmeticOp::Div, -7, 2).unwrap(), -3);
        assert_eq!(int_arithmetic(ArithmeticOp::Mod, -7, 2).unwrap(), -1);
        assert_eq!(int_arithmetic(ArithmeticOp::Mod, 7, -2).unwrap(), 1);
        assert!(int_arithmetic(ArithmeticOp::Div, 1, 0).is_err());
        assert!(int_arithmetic(ArithmeticOp::Mul, i64::MAX, 2).is_err());
    }

    #[test]
    fn null_propagates_through_arithmetic() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Add,
            Expression::literal(Value::Null),
            Expression::literal(Value::Int32(1)),
        );
        assert_eq!(evaluate(&expr, &|_| Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn mixed_numeric_comparison_promotes() {
        assert_eq!(
            sql_compare(&Value::Int32(5), &Value::Int64(5)).unwrap(),
            Some(Ordering::Equal)
        );
        assert_eq!(
            sql_compare(&Value::Int32(5), &Value::Float64(5.5)).unwrap(),
            Some(Ordering::Less)
        );
        assert!(sql_compare(&Value::Int32(5), &Value::Text("5".into())).is_err());
    }

    #[test]
    fn between_is_inclusive_and_null_filters() {
        let five = Value::Int32(5);
        assert!(scan_matches(ScanType::Between, &five, &Value::Int32(5), Some(&Value::Int32(9))).unwrap());
        assert!(scan_matches(ScanType::Between, &five, &Value::Int32(1), Some(&Value::Int32(5))).unwrap());
        assert!(!scan_matches(ScanType::Between, &five, &Value::Int32(6), Some(&Value::Int32(9))).unwrap());
        assert!(!scan_matches(ScanType::Equals, &Value::Null, &five, None).unwrap());
        assert!(!scan_matches(ScanType::NotEquals, &Value::Null, &five, None).unwrap());
    }

    #[test]
    fn like_patterns() {
        assert!(like_match("hello", "he%"));
        assert!(like_match("hello", "%llo"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("hello", "%"));
        assert!(!like_match("hello", "h_lo"));
        assert!(!like_match("", "_"));
        assert!(like_match("", "%"));
    }

    #[test]
    fn constant_folding_preserves_alias() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Mul,
            Expression::literal(Value::Int32(6)),
            Expression::literal(Value::Int32(7)),
        )
        .with_alias("x");
        let folded = fold_constants(&expr).unwrap();
        assert_eq!(folded.kind, ExpressionKind::Literal(Value::Int32(42)));
        assert_eq!(folded.alias.as_deref(), Some("x"));
    }
}
