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

//! Operator pipeline tests over small hand-built tables.

use std::sync::Arc;

use stoa::column::{Column, ReferenceColumn};
use stoa::expression::{AggregateKind, ArithmeticOp, Expression, OpExpression, ScanType};
use stoa::operators::{
    Aggregate, AggregateSpec, Delete, ExecutionContext, HashJoin, Insert, Limit, NestedLoopJoin,
    PhysicalOperator, Projection, SetUnion, Sort, TableScan, Update, Validate,
};
use stoa::{
    Chunk, ChunkEncoding, DataType, JoinMode, ParamValue, RowId, SortOrder, StorageManager,
    StoaError, Table, TableKind, Value,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Leaf operator wrapping a prebuilt table.
struct Static(Arc<Table>);

impl PhysicalOperator for Static {
    fn name(&self) -> &'static str {
        "Static"
    }
    fn num_in_tables(&self) -> usize {
        0
    }
    fn recreate(&self, _params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Static(self.0.clone()))
    }
    fn execute(&self, _ctx: &ExecutionContext) -> stoa::Result<Arc<Table>> {
        Ok(self.0.clone())
    }
}

fn wrap(table: Arc<Table>) -> Box<dyn PhysicalOperator> {
    Box::new(Static(table))
}

fn context() -> ExecutionContext {
    ExecutionContext::new(Arc::new(StorageManager::new()))
}

/// `a int, b text` with rows (i % 4, words cycling) over `rows` rows.
fn sample_table(chunk_size: u32, rows: i32) -> Table {
    let words = ["ash", "birch", "cedar", "doum", "elm"];
    let mut table = Table::new(chunk_size);
    table.add_column("a", DataType::Int32, false).unwrap();
    table.add_column("b", DataType::Text, true).unwrap();
    for i in 0..rows {
        table
            .append(vec![
                Value::Int32(i % 4),
                Value::Text(words[i as usize % words.len()].into()),
            ])
            .unwrap();
    }
    table
}

fn column_values(table: &Table, column: u16) -> Vec<Value> {
    let mut out = Vec::new();
    for chunk in table.chunks() {
        let col = chunk.column(column);
        for row in 0..col.len() {
            out.push(col.get(row));
        }
    }
    out
}

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int32).collect()
}

/// A single-chunk references table over `base` with an explicit
/// position list shared by every column.
fn refs_over(base: &Arc<Table>, positions: Vec<RowId>) -> Table {
    let mut table = Table::new_references(base);
    let positions = Arc::new(positions);
    let columns = (0..base.column_count())
        .map(|c| {
            Arc::new(Column::Reference(ReferenceColumn::new(
                base.clone(),
                c as u16,
                positions.clone(),
            )))
        })
        .collect();
    table.add_chunk(Chunk::new(columns)).unwrap();
    table
}

fn scan(
    input: Box<dyn PhysicalOperator>,
    column: u16,
    scan_type: ScanType,
    value: Value,
) -> TableScan {
    TableScan::new(input, column, scan_type, ParamValue::Literal(value), None)
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

#[test]
fn scan_matches_across_encodings() {
    // Chunk 0 dictionary-encoded, chunk 1 run-length, chunk 2 plain.
    let mut table = sample_table(4, 12);
    table.compress_chunk(0, ChunkEncoding::Dictionary).unwrap();
    table.compress_chunk(1, ChunkEncoding::RunLength).unwrap();
    let table = Arc::new(table);

    let ctx = context();
    let out = scan(wrap(table.clone()), 0, ScanType::GreaterThan, Value::Int32(1))
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.kind(), TableKind::References);
    assert_eq!(
        column_values(&out, 0),
        ints(&[2, 3, 2, 3, 2, 3])
    );

    let out = scan(wrap(table), 0, ScanType::Equals, Value::Int32(0))
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.row_count(), 3);
}

#[test]
fn scan_between_is_inclusive() {
    let table = Arc::new(sample_table(0, 12));
    let ctx = context();
    let out = TableScan::new(
        wrap(table),
        0,
        ScanType::Between,
        ParamValue::Literal(Value::Int32(1)),
        Some(Value::Int32(2)),
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(column_values(&out, 0), ints(&[1, 2, 1, 2, 1, 2]));
}

#[test]
fn scan_like_over_dictionary_and_plain() {
    let mut dict = sample_table(0, 10);
    dict.compress_chunk(0, ChunkEncoding::Dictionary).unwrap();
    let plain = Arc::new(sample_table(0, 10));
    let dict = Arc::new(dict);

    let ctx = context();
    for table in [dict, plain] {
        let out = scan(
            wrap(table),
            1,
            ScanType::Like,
            Value::Text("%d%".into()),
        )
        .execute(&ctx)
        .unwrap();
        // cedar and doum contain a "d".
        assert_eq!(out.row_count(), 4);
    }
}

#[test]
fn scan_over_reference_input_recurses_to_base() {
    let table = Arc::new(sample_table(3, 12));
    let ctx = context();
    let first = scan(wrap(table), 0, ScanType::GreaterThanEquals, Value::Int32(2))
        .execute(&ctx)
        .unwrap();
    let second = scan(
        wrap(first),
        0,
        ScanType::Equals,
        Value::Int32(3),
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(column_values(&second, 0), ints(&[3, 3, 3]));
    assert_eq!(second.kind(), TableKind::References);
}

#[test]
fn scan_with_null_search_matches_nothing() {
    let table = Arc::new(sample_table(0, 8));
    let ctx = context();
    let out = scan(wrap(table), 0, ScanType::Equals, Value::Null)
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.row_count(), 0);
}

#[test]
fn scan_column_against_column() {
    let mut table = Table::new(0);
    table.add_column("x", DataType::Int32, false).unwrap();
    table.add_column("y", DataType::Int32, false).unwrap();
    for (x, y) in [(1, 2), (3, 3), (5, 4)] {
        table
            .append(vec![Value::Int32(x), Value::Int32(y)])
            .unwrap();
    }
    let ctx = context();
    let out = TableScan::new(
        wrap(Arc::new(table)),
        0,
        ScanType::GreaterThan,
        ParamValue::Column(1),
        None,
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(column_values(&out, 0), ints(&[5]));
}

#[test]
fn recreate_binds_placeholders() {
    let table = Arc::new(sample_table(0, 8));
    let ctx = context();
    let prepared = TableScan::new(
        wrap(table),
        0,
        ScanType::Equals,
        ParamValue::Placeholder(0),
        None,
    );
    assert!(matches!(
        prepared.execute(&ctx),
        Err(StoaError::Evaluation(_))
    ));
    let bound = prepared.recreate(&[Value::Int32(2)]);
    assert_eq!(bound.execute(&ctx).unwrap().row_count(), 2);
}

#[test]
fn cancellation_aborts_the_scan() {
    let table = Arc::new(sample_table(2, 10));
    let ctx = context();
    ctx.cancel.cancel();
    let result = scan(wrap(table), 0, ScanType::Equals, Value::Int32(0)).execute(&ctx);
    assert_eq!(result.unwrap_err(), StoaError::Cancelled);
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[test]
fn projection_evaluates_and_folds() {
    let table = Arc::new(sample_table(0, 4));
    let ctx = context();
    let doubled = Expression::arithmetic(
        ArithmeticOp::Mul,
        OpExpression::column(0).with_alias("a"),
        Expression::arithmetic(
            ArithmeticOp::Add,
            Expression::literal(Value::Int32(1)),
            Expression::literal(Value::Int32(1)),
        ),
    )
    .with_alias("a2");
    let out = Projection::new(wrap(table), vec![doubled])
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.column_names(), &["a2".to_string()]);
    assert_eq!(column_values(&out, 0), ints(&[0, 2, 4, 6]));
}

#[test]
fn projection_passthrough_shares_position_lists() {
    let table = Arc::new(sample_table(0, 8));
    let ctx = context();
    let filtered = scan(wrap(table), 0, ScanType::LessThan, Value::Int32(2))
        .execute(&ctx)
        .unwrap();
    let out = Projection::new(
        wrap(filtered),
        vec![
            OpExpression::column(1).with_alias("b"),
            OpExpression::column(0).with_alias("a"),
        ],
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(out.kind(), TableKind::References);
    assert_eq!(out.column_names(), &["b".to_string(), "a".to_string()]);
    let chunk = out.chunk(0);
    match (chunk.column(0).as_ref(), chunk.column(1).as_ref()) {
        (Column::Reference(x), Column::Reference(y)) => {
            assert!(x.shares_positions_with(y));
        }
        _ => panic!("expected reference columns"),
    }
}

#[test]
fn projection_division_by_zero_aborts() {
    let table = Arc::new(sample_table(0, 4));
    let ctx = context();
    let expr = Expression::arithmetic(
        ArithmeticOp::Div,
        Expression::literal(Value::Int32(1)),
        OpExpression::column(0).with_alias("a"),
    );
    let result = Projection::new(wrap(table), vec![expr]).execute(&ctx);
    assert!(matches!(result, Err(StoaError::Evaluation(_))));
}

// ---------------------------------------------------------------------------
// Joins
// ---------------------------------------------------------------------------

fn orders_and_customers() -> (Arc<Table>, Arc<Table>) {
    let mut customers = Table::new(0);
    customers.add_column("id", DataType::Int32, false).unwrap();
    customers
        .add_column("name", DataType::Text, false)
        .unwrap();
    for (id, name) in [(1, "ada"), (2, "bob"), (3, "cyd")] {
        customers
            .append(vec![Value::Int32(id), Value::Text(name.into())])
            .unwrap();
    }
    let mut orders = Table::new(0);
    orders.add_column("customer", DataType::Int32, false).unwrap();
    orders.add_column("total", DataType::Int64, false).unwrap();
    for (customer, total) in [(1, 10), (1, 20), (3, 30), (4, 40)] {
        orders
            .append(vec![Value::Int32(customer), Value::Int64(total)])
            .unwrap();
    }
    (Arc::new(customers), Arc::new(orders))
}

#[test]
fn hash_join_inner() {
    let (customers, orders) = orders_and_customers();
    let ctx = context();
    let out = HashJoin::new(wrap(customers), wrap(orders), JoinMode::Inner, 0, 0)
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.column_count(), 4);
    assert_eq!(out.row_count(), 3);
    let names: Vec<Value> = column_values(&out, 1);
    assert!(names.contains(&Value::Text("ada".into())));
    assert!(!names.contains(&Value::Text("bob".into())));
}

#[test]
fn hash_join_outer_pads_with_null() {
    let (customers, orders) = orders_and_customers();
    let ctx = context();
    let out = HashJoin::new(wrap(customers), wrap(orders), JoinMode::Outer, 0, 0)
        .execute(&ctx)
        .unwrap();
    // 3 matches + unmatched bob + unmatched order for customer 4.
    assert_eq!(out.row_count(), 5);
    let names = column_values(&out, 1);
    let totals = column_values(&out, 3);
    assert!(names.contains(&Value::Null));
    assert!(totals.contains(&Value::Null));
}

#[test]
fn nested_loop_join_supports_inequalities_and_cross() {
    let (customers, orders) = orders_and_customers();
    let ctx = context();
    let cross = NestedLoopJoin::new(
        wrap(customers.clone()),
        wrap(orders.clone()),
        JoinMode::Cross,
        None,
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(cross.row_count(), 12);

    let lt = NestedLoopJoin::new(
        wrap(customers),
        wrap(orders),
        JoinMode::Inner,
        Some((0, 0, ScanType::LessThan)),
    )
    .execute(&ctx)
    .unwrap();
    // Pairs where customers.id < orders.customer.
    assert_eq!(lt.row_count(), 5);
}

// ---------------------------------------------------------------------------
// Aggregate, sort, limit
// ---------------------------------------------------------------------------

#[test]
fn aggregate_groups_and_ignores_nulls_in_avg() {
    let mut table = Table::new(0);
    table.add_column("g", DataType::Text, false).unwrap();
    table.add_column("v", DataType::Int32, true).unwrap();
    for (g, v) in [
        ("x", Some(1)),
        ("x", None),
        ("x", Some(3)),
        ("y", Some(10)),
    ] {
        table
            .append(vec![
                Value::Text(g.into()),
                v.map_or(Value::Null, Value::Int32),
            ])
            .unwrap();
    }
    let ctx = context();
    let out = Aggregate::new(
        wrap(Arc::new(table)),
        vec![0],
        vec![
            AggregateSpec {
                kind: AggregateKind::Avg,
                column: Some(1),
                output_name: "AVG(v)".into(),
            },
            AggregateSpec {
                kind: AggregateKind::Count,
                column: None,
                output_name: "COUNT(*)".into(),
            },
            AggregateSpec {
                kind: AggregateKind::Sum,
                column: Some(1),
                output_name: "SUM(v)".into(),
            },
        ],
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(out.column_names(), &["g", "AVG(v)", "COUNT(*)", "SUM(v)"]);
    assert_eq!(
        column_values(&out, 1),
        vec![Value::Float64(2.0), Value::Float64(10.0)]
    );
    assert_eq!(
        column_values(&out, 2),
        vec![Value::Int64(3), Value::Int64(1)]
    );
    assert_eq!(
        column_values(&out, 3),
        vec![Value::Int64(4), Value::Int64(10)]
    );
}

#[test]
fn ungrouped_aggregate_over_empty_input_yields_identities() {
    let table = Arc::new(sample_table(0, 0));
    let ctx = context();
    let out = Aggregate::new(
        wrap(table),
        vec![],
        vec![
            AggregateSpec {
                kind: AggregateKind::Count,
                column: None,
                output_name: "COUNT(*)".into(),
            },
            AggregateSpec {
                kind: AggregateKind::Sum,
                column: Some(0),
                output_name: "SUM(a)".into(),
            },
        ],
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(out.row_count(), 1);
    assert_eq!(column_values(&out, 0), vec![Value::Int64(0)]);
    assert_eq!(column_values(&out, 1), vec![Value::Null]);
}

#[test]
fn grouped_aggregate_over_empty_input_yields_no_rows() {
    let table = Arc::new(sample_table(0, 0));
    let ctx = context();
    let out = Aggregate::new(
        wrap(table),
        vec![0],
        vec![AggregateSpec {
            kind: AggregateKind::Count,
            column: None,
            output_name: "COUNT(*)".into(),
        }],
    )
    .execute(&ctx)
    .unwrap();
    assert_eq!(out.row_count(), 0);
}

#[test]
fn sort_is_stable_across_keys() {
    let mut table = Table::new(2);
    table.add_column("k", DataType::Int32, true).unwrap();
    table.add_column("tag", DataType::Text, false).unwrap();
    for (k, tag) in [
        (Some(2), "first"),
        (Some(1), "a"),
        (None, "null-row"),
        (Some(2), "second"),
        (Some(1), "b"),
    ] {
        table
            .append(vec![
                k.map_or(Value::Null, Value::Int32),
                Value::Text(tag.into()),
            ])
            .unwrap();
    }
    let ctx = context();
    let out = Sort::new(wrap(Arc::new(table)), vec![(0, SortOrder::Ascending)])
        .execute(&ctx)
        .unwrap();
    let tags: Vec<Value> = column_values(&out, 1);
    // NULL first; ties keep input order.
    assert_eq!(
        tags,
        vec![
            Value::Text("null-row".into()),
            Value::Text("a".into()),
            Value::Text("b".into()),
            Value::Text("first".into()),
            Value::Text("second".into()),
        ]
    );

    let desc = Sort::new(
        wrap(out),
        vec![(0, SortOrder::Descending)],
    )
    .execute(&ctx)
    .unwrap();
    // Descending reverses the whole ordering, so NULL lands last.
    assert_eq!(column_values(&desc, 0).first(), Some(&Value::Int32(2)));
    assert_eq!(column_values(&desc, 0).last(), Some(&Value::Null));
}

#[test]
fn limit_keeps_input_chunk_order() {
    let table = Arc::new(sample_table(3, 10));
    let ctx = context();
    let out = Limit::new(wrap(table), 4).execute(&ctx).unwrap();
    assert_eq!(column_values(&out, 0), ints(&[0, 1, 2, 3]));
    let empty = Limit::new(wrap(Arc::new(sample_table(0, 0))), 4)
        .execute(&ctx)
        .unwrap();
    assert_eq!(empty.row_count(), 0);
}

// ---------------------------------------------------------------------------
// Mutations through the storage manager
// ---------------------------------------------------------------------------

fn stored_context(rows: i32) -> ExecutionContext {
    let storage = Arc::new(StorageManager::new());
    storage.add_table("t", sample_table(3, rows)).unwrap();
    ExecutionContext::new(storage)
}

#[test]
fn validate_filters_deleted_rows() {
    let ctx = stored_context(6);
    let get = stoa::operators::GetTable::new("t");
    let matches = scan(
        Box::new(Validate::new(Box::new(get))),
        0,
        ScanType::Equals,
        Value::Int32(1),
    );
    let delete = Delete::new("t", Box::new(matches));
    delete.execute(&ctx).unwrap();

    let visible = Validate::new(Box::new(stoa::operators::GetTable::new("t")))
        .execute(&ctx)
        .unwrap();
    assert_eq!(column_values(&visible, 0), ints(&[0, 2, 3, 0]));
}

#[test]
fn insert_appends_through_registry_swap() {
    let ctx = stored_context(2);
    let before = ctx.storage.get_table("t").unwrap();
    let extra = Arc::new(sample_table(0, 3));
    Insert::new("t", wrap(extra)).execute(&ctx).unwrap();
    assert_eq!(before.row_count(), 2);
    assert_eq!(ctx.storage.get_table("t").unwrap().row_count(), 5);
}

#[test]
fn update_is_delete_plus_insert() {
    let ctx = stored_context(4);
    let selected = scan(
        Box::new(Validate::new(Box::new(stoa::operators::GetTable::new("t")))),
        0,
        ScanType::Equals,
        Value::Int32(2),
    );
    // Set a = 99, keep b.
    let update = Update::new(
        "t",
        Box::new(selected),
        vec![
            Expression::literal(Value::Int32(99)),
            OpExpression::column(1).with_alias("b"),
        ],
    );
    update.execute(&ctx).unwrap();

    let visible = Validate::new(Box::new(stoa::operators::GetTable::new("t")))
        .execute(&ctx)
        .unwrap();
    let a = column_values(&visible, 0);
    assert!(a.contains(&Value::Int32(99)));
    assert!(!a.contains(&Value::Int32(2)));
    assert_eq!(visible.row_count(), 4);
}

// ---------------------------------------------------------------------------
// Set union
// ---------------------------------------------------------------------------

#[test]
fn set_union_merges_position_lists() {
    let base = Arc::new(sample_table(0, 6));
    let left = Arc::new(refs_over(
        &base,
        vec![RowId::new(0, 0), RowId::new(0, 2)],
    ));
    let right = Arc::new(refs_over(
        &base,
        vec![RowId::new(0, 2), RowId::new(0, 5)],
    ));
    let ctx = context();
    let out = SetUnion::new(wrap(left), wrap(right))
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.row_count(), 3);
    match out.chunk(0).column(0).as_ref() {
        Column::Reference(r) => {
            assert_eq!(
                r.positions().as_slice(),
                &[RowId::new(0, 0), RowId::new(0, 2), RowId::new(0, 5)]
            );
        }
        _ => panic!("expected a reference column"),
    }
}

#[test]
fn set_union_is_commutative_and_idempotent() {
    let base = Arc::new(sample_table(0, 6));
    let a = Arc::new(refs_over(
        &base,
        vec![RowId::new(0, 1), RowId::new(0, 3)],
    ));
    let b = Arc::new(refs_over(
        &base,
        vec![RowId::new(0, 0), RowId::new(0, 3)],
    ));
    let ctx = context();
    let ab = SetUnion::new(wrap(a.clone()), wrap(b.clone()))
        .execute(&ctx)
        .unwrap();
    let ba = SetUnion::new(wrap(b), wrap(a.clone()))
        .execute(&ctx)
        .unwrap();
    assert_eq!(column_values(&ab, 0), column_values(&ba, 0));

    let aa = SetUnion::new(wrap(a.clone()), wrap(a.clone()))
        .execute(&ctx)
        .unwrap();
    assert_eq!(aa.row_count(), a.row_count());
}

#[test]
fn set_union_with_an_empty_side_returns_the_other() {
    let base = Arc::new(sample_table(0, 4));
    let empty = Arc::new(refs_over(&base, vec![]));
    let full = Arc::new(refs_over(
        &base,
        vec![RowId::new(0, 1), RowId::new(0, 2)],
    ));
    let ctx = context();
    let out = SetUnion::new(wrap(empty.clone()), wrap(full.clone()))
        .execute(&ctx)
        .unwrap();
    assert!(Arc::ptr_eq(&out, &full));
    let out = SetUnion::new(wrap(empty.clone()), wrap(empty.clone()))
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.row_count(), 0);
}

#[test]
fn set_union_rejects_schema_mismatch() {
    let base = Arc::new(sample_table(0, 4));
    let mut other = Table::new(0);
    other.add_column("z", DataType::Int32, false).unwrap();
    other.append(vec![Value::Int32(1)]).unwrap();
    let other = Arc::new(other);
    let left = Arc::new(refs_over(&base, vec![RowId::new(0, 0)]));
    let right = Arc::new(refs_over(&other, vec![RowId::new(0, 0)]));
    let ctx = context();
    let result = SetUnion::new(wrap(left), wrap(right)).execute(&ctx);
    assert!(matches!(result, Err(StoaError::Schema(_))));
}

#[test]
fn set_union_chunks_at_the_larger_input_chunk_size() {
    let base = Arc::new(sample_table(0, 6));
    let mut left = Table::new_references_schema(
        base.column_names().to_vec(),
        base.column_types().to_vec(),
        vec![false, true],
        2,
    );
    let positions = Arc::new(vec![RowId::new(0, 0), RowId::new(0, 1), RowId::new(0, 2)]);
    let columns = (0..2)
        .map(|c| {
            Arc::new(Column::Reference(ReferenceColumn::new(
                base.clone(),
                c as u16,
                positions.clone(),
            )))
        })
        .collect();
    left.add_chunk(Chunk::new(columns)).unwrap();
    let right = refs_over(&base, vec![RowId::new(0, 4), RowId::new(0, 5)]);

    let ctx = context();
    let out = SetUnion::new(wrap(Arc::new(left)), wrap(Arc::new(right)))
        .execute(&ctx)
        .unwrap();
    assert_eq!(out.row_count(), 5);
    // max(2, 0) = 2 rows per output chunk.
    assert_eq!(out.chunk_count(), 3);
}
