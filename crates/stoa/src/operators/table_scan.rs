//! Table scan: filters one column against a search value, emitting the
//! matching positions as a references table.
//!
//! Dispatch over the physical column form goes through `ColumnVisitor`:
//! plain and reference columns compare row values, dictionary columns
//! resolve the search term to dictionary index bounds and scan the
//! attribute vector, run-length columns evaluate once per run. Chunks
//! are scanned in parallel and collected in input order.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::chunk::Chunk;
use crate::column::{
    Column, ColumnVisitor, DictionaryColumn, ReferenceColumn, RunLengthColumn, ValueColumn,
};
use crate::expression::ScanType;
use crate::operators::eval::{like_match, scan_matches};
use crate::operators::view::SegmentedInput;
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, ParamValue, Value, ValueId};
use crate::{Result, StoaError};

pub struct TableScan {
    input: Box<dyn PhysicalOperator>,
    column_id: ColumnId,
    scan_type: ScanType,
    value: ParamValue<ColumnId>,
    value2: Option<Value>,
}

impl TableScan {
    pub fn new(
        input: Box<dyn PhysicalOperator>,
        column_id: ColumnId,
        scan_type: ScanType,
        value: ParamValue<ColumnId>,
        value2: Option<Value>,
    ) -> TableScan {
        TableScan {
            input,
            column_id,
            scan_type,
            value,
            value2,
        }
    }
}

impl PhysicalOperator for TableScan {
    fn name(&self) -> &'static str {
        "TableScan"
    }

    fn description(&self) -> String {
        let value = match &self.value {
            ParamValue::Literal(v) => v.to_string(),
            ParamValue::Column(c) => format!("column #{c}"),
            ParamValue::Placeholder(i) => format!("${i}"),
        };
        format!(
            "TableScan column #{} {} {value}",
            self.column_id, self.scan_type
        )
    }

    fn num_in_tables(&self) -> usize {
        1
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        let value = match &self.value {
            ParamValue::Placeholder(i) => match params.get(*i as usize) {
                Some(v) => ParamValue::Literal(v.clone()),
                None => ParamValue::Placeholder(*i),
            },
            other => other.clone(),
        };
        Box::new(TableScan::new(
            self.input.recreate(params),
            self.column_id,
            self.scan_type,
            value,
            self.value2.clone(),
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let input = self.input.execute(ctx)?;
        let view = SegmentedInput::analyze(&input)?;

        let search = match &self.value {
            ParamValue::Literal(v) => Search::Value(v.clone()),
            ParamValue::Column(c) => Search::Column(*c),
            ParamValue::Placeholder(_) => {
                return Err(StoaError::Evaluation("unbound placeholder".into()))
            }
        };

        // A NULL search value makes every comparison unknown.
        if matches!(&search, Search::Value(Value::Null)) {
            return Ok(Arc::new(view.emit_selection(&[], input.chunk_size())?));
        }

        let per_chunk: Vec<Vec<usize>> = input
            .chunks()
            .par_iter()
            .map(|chunk| -> Result<Vec<usize>> {
                ctx.cancel.check()?;
                self.scan_chunk(chunk, &search)
            })
            .collect::<Result<_>>()?;

        let mut selected = Vec::new();
        let mut base = 0usize;
        for (chunk, matches) in input.chunks().iter().zip(per_chunk) {
            selected.extend(matches.into_iter().map(|offset| base + offset));
            base += chunk.size();
        }
        debug!(matched = selected.len(), rows = view.row_count, "table scan");
        Ok(Arc::new(view.emit_selection(&selected, input.chunk_size())?))
    }
}

enum Search {
    Value(Value),
    Column(ColumnId),
}

impl TableScan {
    fn scan_chunk(&self, chunk: &Chunk, search: &Search) -> Result<Vec<usize>> {
        match search {
            Search::Value(value) => {
                let mut visitor = ScanVisitor {
                    scan_type: self.scan_type,
                    search: value,
                    search2: self.value2.as_ref(),
                    matches: Vec::new(),
                };
                chunk.column(self.column_id).visit(&mut visitor)?;
                Ok(visitor.matches)
            }
            Search::Column(other) => {
                let probe = chunk.column(self.column_id);
                let against = chunk.column(*other);
                let mut matches = Vec::new();
                for row in 0..probe.len() {
                    if scan_matches(
                        self.scan_type,
                        &probe.get(row),
                        &against.get(row),
                        self.value2.as_ref(),
                    )? {
                        matches.push(row);
                    }
                }
                Ok(matches)
            }
        }
    }
}

struct ScanVisitor<'a> {
    scan_type: ScanType,
    search: &'a Value,
    search2: Option<&'a Value>,
    matches: Vec<usize>,
}

impl ScanVisitor<'_> {
    fn scan_rows(&mut self, len: usize, get: impl Fn(usize) -> Value) -> Result<()> {
        for row in 0..len {
            if scan_matches(self.scan_type, &get(row), self.search, self.search2)? {
                self.matches.push(row);
            }
        }
        Ok(())
    }
}

impl ColumnVisitor for ScanVisitor<'_> {
    fn visit_value(&mut self, column: &ValueColumn) -> Result<()> {
        self.scan_rows(column.len(), |row| column.get(row))
    }

    fn visit_dictionary(&mut self, column: &DictionaryColumn) -> Result<()> {
        // The fast path needs the search term in the dictionary's own
        // type; mixed-type comparisons fall back to row values.
        let coerced = self.search.clone().coerce(column.data_type());
        let coerced2 = match self.search2 {
            Some(v) => match v.clone().coerce(column.data_type()) {
                Ok(v) => Some(v),
                Err(_) => return self.scan_rows(column.len(), |row| column.get(row)),
            },
            None => None,
        };
        let search = match coerced {
            Ok(v) if !v.is_null() => v,
            _ => return self.scan_rows(column.len(), |row| column.get(row)),
        };

        let predicate = id_predicate(self.scan_type, column, &search, coerced2.as_ref())?;
        if matches!(predicate, IdPredicate::None) {
            return Ok(());
        }
        let null_id = column.null_value_id();
        let attributes = column.attribute_vector();
        for (row, id) in attributes.iter().enumerate() {
            if id != null_id && predicate.matches(id) {
                self.matches.push(row);
            }
        }
        Ok(())
    }

    fn visit_run_length(&mut self, column: &RunLengthColumn) -> Result<()> {
        let mut start = 0usize;
        for run in 0..column.run_count() {
            let end = column.end_positions()[run] as usize;
            if scan_matches(
                self.scan_type,
                &column.run_value(run),
                self.search,
                self.search2,
            )? {
                self.matches.extend(start..=end);
            }
            start = end + 1;
        }
        Ok(())
    }

    fn visit_reference(&mut self, column: &ReferenceColumn) -> Result<()> {
        // Reads recurse through the position list into the base column.
        self.scan_rows(column.len(), |row| column.get(row))
    }
}

enum IdPredicate {
    None,
    All,
    Range(ValueId, ValueId),
    Not(ValueId),
    Mask(Vec<bool>),
}

impl IdPredicate {
    fn matches(&self, id: ValueId) -> bool {
        match self {
            IdPredicate::None => false,
            IdPredicate::All => true,
            IdPredicate::Range(lo, hi) => *lo <= id && id < *hi,
            IdPredicate::Not(x) => id != *x,
            IdPredicate::Mask(mask) => mask.get(id as usize).copied().unwrap_or(false),
        }
    }
}

/// Resolve a search term to a predicate over dictionary value ids.
fn id_predicate(
    scan_type: ScanType,
    column: &DictionaryColumn,
    search: &Value,
    search2: Option<&Value>,
) -> Result<IdPredicate> {
    let dict_len = column.unique_values_count() as ValueId;
    let exact = |v: &Value| {
        let lb = column.lower_bound(v);
        (lb < dict_len && &column.dictionary().get(lb as usize) == v).then_some(lb)
    };
    Ok(match scan_type {
        ScanType::Equals => match exact(search) {
            Some(id) => IdPredicate::Range(id, id + 1),
            None => IdPredicate::None,
        },
        ScanType::NotEquals => match exact(search) {
            Some(id) => IdPredicate::Not(id),
            None => IdPredicate::All,
        },
        ScanType::LessThan => IdPredicate::Range(0, column.lower_bound(search)),
        ScanType::LessThanEquals => IdPredicate::Range(0, column.upper_bound(search)),
        ScanType::GreaterThan => IdPredicate::Range(column.upper_bound(search), dict_len),
        ScanType::GreaterThanEquals => {
            IdPredicate::Range(column.lower_bound(search), dict_len)
        }
        ScanType::Between => {
            let high = search2.ok_or_else(|| {
                StoaError::Evaluation("BETWEEN requires an upper bound".into())
            })?;
            IdPredicate::Range(column.lower_bound(search), column.upper_bound(high))
        }
        ScanType::Like | ScanType::NotLike => {
            let pattern = match search {
                Value::Text(p) => p,
                _ => {
                    return Err(StoaError::Evaluation(
                        "LIKE requires text operands".into(),
                    ))
                }
            };
            let negate = scan_type == ScanType::NotLike;
            let mask = (0..dict_len as usize)
                .map(|id| match column.dictionary().get(id) {
                    Value::Text(entry) => like_match(&entry, pattern) != negate,
                    _ => false,
                })
                .collect();
            IdPredicate::Mask(mask)
        }
    })
}
