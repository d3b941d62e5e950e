//! Plan-shape tests: SQL in, logical-plan structure out.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use stoa::expression::{AggregateKind, ExpressionKind, ScanType};
use stoa::types::{DataType, JoinMode, ParamValue, Value};
use stoa::StorageManager;
use stoa_sql::lqp::{LogicalPlan, LqpNodeKind, NodeId, UnionMode};
use stoa_sql::translator::SqlTranslator;
use stoa_sql::SqlError;

fn storage() -> StorageManager {
    let storage = StorageManager::new();
    let mut t = stoa::Table::new(0);
    t.add_column("a", DataType::Int32, false).unwrap();
    t.add_column("b", DataType::Int32, true).unwrap();
    storage.add_table("t", t).unwrap();

    let mut t1 = stoa::Table::new(0);
    t1.add_column("a", DataType::Int32, false).unwrap();
    t1.add_column("b", DataType::Int32, false).unwrap();
    storage.add_table("t1", t1).unwrap();

    let mut t2 = stoa::Table::new(0);
    t2.add_column("b", DataType::Int32, false).unwrap();
    t2.add_column("c", DataType::Int32, false).unwrap();
    storage.add_table("t2", t2).unwrap();
    storage
}

fn parse(sql: &str) -> Statement {
    Parser::parse_sql(&GenericDialect {}, sql)
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}

/// Translate without Validate wrapping so plan shapes stay minimal.
fn translate(storage: &StorageManager, sql: &str) -> (LogicalPlan, NodeId) {
    let mut plan = LogicalPlan::new();
    let root = SqlTranslator::new(storage, false)
        .translate_statement(&parse(sql), &mut plan)
        .unwrap();
    (plan, root)
}

fn translate_err(storage: &StorageManager, sql: &str) -> SqlError {
    let mut plan = LogicalPlan::new();
    SqlTranslator::new(storage, false)
        .translate_statement(&parse(sql), &mut plan)
        .unwrap_err()
}

#[test]
fn reversed_comparison_swaps_operands_and_scan_type() {
    let storage = storage();
    let (plan, root) = translate(&storage, "SELECT a FROM t WHERE 5 > a");
    // Projection over the predicate.
    let predicate = plan.node(root).left.unwrap();
    match &plan.node(predicate).kind {
        LqpNodeKind::Predicate {
            column,
            scan_type,
            value,
            value2,
        } => {
            assert_eq!(plan.origin_name(*column), "a");
            assert_eq!(*scan_type, ScanType::LessThan);
            assert_eq!(*value, ParamValue::Literal(Value::Int64(5)));
            assert!(value2.is_none());
        }
        other => panic!("expected a predicate, got {other:?}"),
    }
    // <> stays put under the swap.
    let (plan, root) = translate(&storage, "SELECT a FROM t WHERE 5 <> a");
    let predicate = plan.node(root).left.unwrap();
    match &plan.node(predicate).kind {
        LqpNodeKind::Predicate { scan_type, .. } => {
            assert_eq!(*scan_type, ScanType::NotEquals)
        }
        other => panic!("expected a predicate, got {other:?}"),
    }
}

#[test]
fn between_carries_a_plain_second_value() {
    let storage = storage();
    let (plan, root) = translate(&storage, "SELECT a FROM t WHERE a BETWEEN 2 AND 7");
    let predicate = plan.node(root).left.unwrap();
    match &plan.node(predicate).kind {
        LqpNodeKind::Predicate {
            scan_type,
            value,
            value2,
            ..
        } => {
            assert_eq!(*scan_type, ScanType::Between);
            assert_eq!(*value, ParamValue::Literal(Value::Int64(2)));
            assert_eq!(*value2, Some(Value::Int64(7)));
        }
        other => panic!("expected a predicate, got {other:?}"),
    }
}

#[test]
fn or_splits_into_a_positions_union_over_the_same_input() {
    let storage = storage();
    let (plan, root) = translate(&storage, "SELECT a FROM t WHERE a = 1 OR b = 2");
    let union = plan.node(root).left.unwrap();
    let (left, right) = match &plan.node(union).kind {
        LqpNodeKind::Union { mode } => {
            assert_eq!(*mode, UnionMode::Positions);
            let node = plan.node(union);
            (node.left.unwrap(), node.right.unwrap())
        }
        other => panic!("expected a union, got {other:?}"),
    };
    // Both branches are predicates over the same stored-table node.
    assert_eq!(plan.node(left).left, plan.node(right).left);
    // The shared input carries both parents.
    let shared = plan.node(left).left.unwrap();
    assert_eq!(plan.node(shared).parents.len(), 2);
}

#[test]
fn natural_join_lowers_to_cross_predicate_projection() {
    let storage = storage();
    let (plan, root) = translate(&storage, "SELECT * FROM t1 NATURAL JOIN t2");
    // Outer projection from SELECT *.
    assert_eq!(plan.output_column_names(root), vec!["a", "b", "c"]);
    // Natural-join lowering: dedup projection over a predicate over a
    // cross join.
    let dedup = plan.node(root).left.unwrap();
    match &plan.node(dedup).kind {
        LqpNodeKind::Projection { expressions } => assert_eq!(expressions.len(), 3),
        other => panic!("expected the dedup projection, got {other:?}"),
    }
    let predicate = plan.node(dedup).left.unwrap();
    match &plan.node(predicate).kind {
        LqpNodeKind::Predicate {
            column,
            scan_type,
            value,
            ..
        } => {
            assert_eq!(plan.origin_name(*column), "b");
            assert_eq!(*scan_type, ScanType::Equals);
            assert!(matches!(value, ParamValue::Column(_)));
        }
        other => panic!("expected the shared-name predicate, got {other:?}"),
    }
    let cross = plan.node(predicate).left.unwrap();
    match &plan.node(cross).kind {
        LqpNodeKind::Join { mode, predicate } => {
            assert_eq!(*mode, JoinMode::Cross);
            assert!(predicate.is_none());
        }
        other => panic!("expected a cross join, got {other:?}"),
    }
}

#[test]
fn join_condition_resolves_one_operand_per_side() {
    let storage = storage();
    let (plan, root) = translate(&storage, "SELECT a FROM t1 JOIN t2 ON t2.b > t1.a");
    let join = plan.node(plan.node(root).left.unwrap()).kind.clone();
    match join {
        LqpNodeKind::Join {
            mode,
            predicate: Some((left, right, scan_type)),
        } => {
            assert_eq!(mode, JoinMode::Inner);
            // t2.b was on the left of `>`, so operands swap and the
            // comparison flips.
            assert_eq!(plan.origin_name(left), "a");
            assert_eq!(plan.origin_name(right), "b");
            assert_eq!(scan_type, ScanType::LessThan);
        }
        other => panic!("expected a join with a predicate, got {other:?}"),
    }

    let err = translate_err(&storage, "SELECT a FROM t1 JOIN t2 ON t1.a = t1.b");
    assert!(matches!(err, SqlError::Translate(_)));
}

#[test]
fn having_appends_hidden_aggregates() {
    let storage = storage();
    let (plan, root) = translate(
        &storage,
        "SELECT a, SUM(b) FROM t GROUP BY a HAVING AVG(b) > 0",
    );
    // Final projection exposes only the select list.
    assert_eq!(plan.output_column_names(root), vec!["a", "SUM(b)"]);

    // Walk down to the aggregate node.
    let mut node = plan.node(root).left.unwrap();
    while !matches!(plan.node(node).kind, LqpNodeKind::Aggregate { .. }) {
        node = plan.node(node).left.unwrap();
    }
    match &plan.node(node).kind {
        LqpNodeKind::Aggregate {
            aggregates,
            group_by,
        } => {
            assert_eq!(group_by.len(), 1);
            let kinds: Vec<AggregateKind> = aggregates
                .iter()
                .map(|e| match e.kind {
                    ExpressionKind::Aggregate(kind) => kind,
                    _ => panic!("non-aggregate in aggregate list"),
                })
                .collect();
            assert_eq!(kinds, vec![AggregateKind::Sum, AggregateKind::Avg]);
        }
        other => panic!("expected the aggregate node, got {other:?}"),
    }
}

#[test]
fn select_list_outside_group_by_is_rejected() {
    let storage = storage();
    let err = translate_err(&storage, "SELECT b, COUNT(*) FROM t GROUP BY a");
    match err {
        SqlError::Translate(msg) => {
            assert!(msg.contains("GROUP BY"), "unexpected message: {msg}")
        }
        other => panic!("expected a translation error, got {other:?}"),
    }
}

#[test]
fn insert_values_projects_over_a_dummy_table() {
    let storage = storage();
    let (plan, root) = translate(&storage, "INSERT INTO t (b) VALUES (42)");
    let projection = plan.node(root).left.unwrap();
    match &plan.node(projection).kind {
        LqpNodeKind::Projection { expressions } => {
            // Width matches the table; unnamed columns are NULL
            // literals.
            assert_eq!(expressions.len(), 2);
            assert!(expressions[0].is_null_literal());
            assert_eq!(
                expressions[1].kind,
                ExpressionKind::Literal(Value::Int64(42))
            );
        }
        other => panic!("expected a projection, got {other:?}"),
    }
    let dummy = plan.node(projection).left.unwrap();
    assert!(matches!(plan.node(dummy).kind, LqpNodeKind::DummyTable));
    assert!(plan.manages_table(root, "t"));
}

#[test]
fn unconditional_update_of_a_stored_table_is_rejected() {
    let storage = storage();
    let err = translate_err(&storage, "UPDATE t SET b = 1");
    match err {
        SqlError::Translate(msg) => assert!(msg.contains("UPDATE"), "unexpected: {msg}"),
        other => panic!("expected a translation error, got {other:?}"),
    }
    // A WHERE clause makes the input a reference-producing plan.
    let (plan, root) = translate(&storage, "UPDATE t SET b = 1 WHERE a = 3");
    match &plan.node(root).kind {
        LqpNodeKind::Update { table, expressions } => {
            assert_eq!(table, "t");
            assert_eq!(expressions.len(), 2);
            // Identity reference for a, literal for b.
            assert!(matches!(expressions[0].kind, ExpressionKind::Column(_)));
            assert_eq!(
                expressions[1].kind,
                ExpressionKind::Literal(Value::Int64(1))
            );
        }
        other => panic!("expected an update node, got {other:?}"),
    }
}

#[test]
fn delete_builds_validate_then_predicates() {
    let storage = storage();
    let (plan, root) = translate(&storage, "DELETE FROM t WHERE a = 1");
    assert!(matches!(plan.node(root).kind, LqpNodeKind::Delete { .. }));
    let predicate = plan.node(root).left.unwrap();
    assert!(matches!(
        plan.node(predicate).kind,
        LqpNodeKind::Predicate { .. }
    ));
    let validate = plan.node(predicate).left.unwrap();
    assert!(matches!(plan.node(validate).kind, LqpNodeKind::Validate));
    let stored = plan.node(validate).left.unwrap();
    assert!(matches!(
        plan.node(stored).kind,
        LqpNodeKind::StoredTable { .. }
    ));
}

#[test]
fn set_operations_are_rejected() {
    let storage = storage();
    let err = translate_err(&storage, "SELECT a FROM t UNION SELECT a FROM t1");
    assert!(matches!(err, SqlError::Translate(_)));
}

#[test]
fn ambiguous_names_are_hard_errors() {
    let storage = storage();
    // b exists in both t1 and t2.
    let err = translate_err(&storage, "SELECT b FROM t1 JOIN t2 ON t1.a = t2.c");
    match err {
        SqlError::Translate(msg) => assert!(msg.contains("ambiguous"), "unexpected: {msg}"),
        other => panic!("expected a translation error, got {other:?}"),
    }
}

#[test]
fn origins_and_output_ids_round_trip() {
    let storage = storage();
    let (plan, _root) = translate(
        &storage,
        "SELECT t1.a, SUM(c) FROM t1 JOIN t2 ON t1.b = t2.b GROUP BY t1.a ORDER BY t1.a LIMIT 3",
    );
    for raw in 0..plan.node_count() {
        let id = NodeId(raw as u32);
        for column in 0..plan.output_column_count(id) {
            let origin = plan
                .find_column_origin_by_output_column_id(id, column as u16)
                .expect("every output column has an origin");
            assert_eq!(
                plan.find_output_column_id_by_column_origin(id, origin),
                Some(column as u16),
                "origin round-trip failed at {id} column {column}"
            );
        }
    }
}

#[test]
fn stored_table_leaves_expose_statistics() {
    let storage = StorageManager::new();
    let mut t = stoa::Table::new(0);
    t.add_column("a", DataType::Int32, false).unwrap();
    for i in [5, 1, 5, 9] {
        t.append(vec![Value::Int32(i)]).unwrap();
    }
    storage.add_table("t", t).unwrap();
    let (plan, root) = translate(&storage, "SELECT a FROM t");
    let stored = plan.node(plan.node(root).left.unwrap()).left;
    // Without Validate wrapping, the predicate-free plan is
    // projection -> stored table.
    let stored = stored.unwrap_or_else(|| plan.node(root).left.unwrap());
    let stats = plan.statistics(stored, &storage).unwrap();
    assert_eq!(stats.row_count, 4.0);
    assert_eq!(stats.columns[0].distinct_count, 3);
    assert_eq!(stats.columns[0].min, Value::Int32(1));
    assert_eq!(stats.columns[0].max, Value::Int32(9));
}
