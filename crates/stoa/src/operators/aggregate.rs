//! Hash aggregation: groups rows by the group-by tuple and folds each
//! aggregate over its input column. Group output order is first-seen
//! (deterministic for a given input order). Output columns are the
//! group-by columns first, then the aggregates.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::expression::AggregateKind;
use crate::operators::view::materialize_column;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, DataType, Value};
use crate::{Result, StoaError};

/// One aggregate to compute: the function, its input column (`None` for
/// `COUNT(*)`), and the output column name.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    pub kind: AggregateKind,
    pub column: Option<ColumnId>,
    pub output_name: String,
}

pub struct Aggregate {
    input: Box<dyn PhysicalOperator>,
    group_by: Vec<ColumnId>,
    aggregates: Vec<AggregateSpec>,
}

impl Aggregate {
    pub fn new(
        input: Box<dyn PhysicalOperator>,
        group_by: Vec<ColumnId>,
        aggregates: Vec<AggregateSpec>,
    ) -> Aggregate {
        Aggregate {
            input,
            group_by,
            aggregates,
        }
    }
}

impl PhysicalOperator for Aggregate {
    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn description(&self) -> String {
        let aggregates: Vec<&str> = self
            .aggregates
            .iter()
            .map(|a| a.output_name.as_str())
            .collect();
        format!(
            "Aggregate group by {:?} computing [{}]",
            self.group_by,
            aggregates.join(", ")
        )
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(Aggregate::new(
            self.input.recreate(params),
            self.group_by.clone(),
            self.aggregates.clone(),
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;

        let key_columns: Vec<Vec<Value>> = self
            .group_by
            .iter()
            .map(|&c| materialize_column(&input, c))
            .collect();
        let agg_columns: Vec<Option<Vec<Value>>> = self
            .aggregates
            .iter()
            .map(|spec| spec.column.map(|c| materialize_column(&input, c)))
            .collect();

        let mut group_index: FxHashMap<Vec<Value>, usize> = FxHashMap::default();
        let mut group_keys: Vec<Vec<Value>> = Vec::new();
        let mut states: Vec<Vec<Accumulator>> = Vec::new();

        let row_count = input.row_count();
        for row in 0..row_count {
            if row % 4096 == 0 {
                ctx.cancel.check()?;
            }
            let key: Vec<Value> = key_columns.iter().map(|col| col[row].clone()).collect();
            let group = match group_index.get(&key) {
                Some(&g) => g,
                None => {
                    let g = states.len();
                    group_index.insert(key.clone(), g);
                    group_keys.push(key);
                    states.push(
                        self.aggregates
                            .iter()
                            .map(|spec| Accumulator::new(spec.kind))
                            .collect(),
                    );
                    g
                }
            };
            for (accumulator, column) in states[group].iter_mut().zip(&agg_columns) {
                let value = column.as_ref().map(|col| &col[row]);
                accumulator.update(value)?;
            }
        }

        // Ungrouped aggregation over an empty input still yields one row
        // of identities.
        if self.group_by.is_empty() && states.is_empty() {
            group_keys.push(Vec::new());
            states.push(
                self.aggregates
                    .iter()
                    .map(|spec| Accumulator::new(spec.kind))
                    .collect(),
            );
        }

        debug!(groups = states.len(), rows = row_count, "aggregate");

        let mut names = Vec::new();
        let mut types = Vec::new();
        for &c in &self.group_by {
            names.push(input.column_name(c).to_string());
            types.push(input.column_type(c));
        }
        for spec in &self.aggregates {
            names.push(spec.output_name.clone());
            types.push(spec.result_type(&input));
        }
        let nullable = vec![true; names.len()];
        let mut out = Table::new_data_schema(names, types, nullable, 0);

        for (key, accumulators) in group_keys.into_iter().zip(states) {
            let mut row = key;
            for accumulator in accumulators {
                row.push(accumulator.finish());
            }
            out.append(row)?;
        }
        Ok(Arc::new(out))
    }
}

impl AggregateSpec {
    fn result_type(&self, input: &Table) -> DataType {
        let input_type = self.column.map(|c| input.column_type(c));
        match self.kind {
            AggregateKind::Count => DataType::Int64,
            AggregateKind::Avg => DataType::Float64,
            AggregateKind::Sum => match input_type {
                Some(DataType::Int32) | Some(DataType::Int64) => DataType::Int64,
                _ => DataType::Float64,
            },
            AggregateKind::Min | AggregateKind::Max => input_type.unwrap_or(DataType::Int64),
        }
    }
}

#[derive(Clone, Copy)]
enum SumState {
    Empty,
    Int(i64),
    Float(f64),
}

impl SumState {
    /// Integer sums overflow-check; the first float input switches the
    /// representation.
    fn add(self, value: &Value) -> Result<SumState> {
        let as_float = |v: &Value| {
            v.as_f64()
                .ok_or_else(|| StoaError::Evaluation("SUM over non-numeric input".into()))
        };
        let checked = |sum: i64, add: i64| {
            sum.checked_add(add)
                .ok_or_else(|| StoaError::Evaluation("integer overflow in SUM".into()))
        };
        Ok(match (self, value) {
            (SumState::Empty, Value::Int32(v)) => SumState::Int(*v as i64),
            (SumState::Empty, Value::Int64(v)) => SumState::Int(*v),
            (SumState::Empty, v) => SumState::Float(as_float(v)?),
            (SumState::Int(sum), Value::Int32(v)) => SumState::Int(checked(sum, *v as i64)?),
            (SumState::Int(sum), Value::Int64(v)) => SumState::Int(checked(sum, *v)?),
            (SumState::Int(sum), v) => SumState::Float(sum as f64 + as_float(v)?),
            (SumState::Float(sum), v) => SumState::Float(sum + as_float(v)?),
        })
    }
}

enum Accumulator {
    Count(i64),
    Sum(SumState),
    Min(Option<Value>),
    Max(Option<Value>),
    Avg { sum: f64, count: i64 },
}

impl Accumulator {
    fn new(kind: AggregateKind) -> Accumulator {
        match kind {
            AggregateKind::Count => Accumulator::Count(0),
            AggregateKind::Sum => Accumulator::Sum(SumState::Empty),
            AggregateKind::Min => Accumulator::Min(None),
            AggregateKind::Max => Accumulator::Max(None),
            AggregateKind::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    /// Fold one row. `value` is `None` for `COUNT(*)`, which counts
    /// rows; every other aggregate ignores NULL inputs.
    fn update(&mut self, value: Option<&Value>) -> Result<()> {
        let value = match value {
            None => {
                if let Accumulator::Count(n) = self {
                    *n += 1;
                }
                return Ok(());
            }
            Some(v) => v,
        };
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(state) => *state = state.add(value)?,
            Accumulator::Min(state) => {
                if state
                    .as_ref()
                    .map_or(true, |best| value.total_cmp(best) == std::cmp::Ordering::Less)
                {
                    *state = Some(value.clone());
                }
            }
            Accumulator::Max(state) => {
                if state
                    .as_ref()
                    .map_or(true, |best| value.total_cmp(best) == std::cmp::Ordering::Greater)
                {
                    *state = Some(value.clone());
                }
            }
            Accumulator::Avg { sum, count } => {
                let add = value
                    .as_f64()
                    .ok_or_else(|| StoaError::Evaluation("AVG over non-numeric input".into()))?;
                *sum += add;
                *count += 1;
            }
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Int64(n),
            Accumulator::Sum(SumState::Empty) => Value::Null,
            Accumulator::Sum(SumState::Int(sum)) => Value::Int64(sum),
            Accumulator::Sum(SumState::Float(sum)) => Value::Float64(sum),
            Accumulator::Min(state) | Accumulator::Max(state) => state.unwrap_or(Value::Null),
            Accumulator::Avg { sum, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Float64(sum / count as f64)
                }
            }
        }
    }
}
