//! Joins. `HashJoin` handles equality predicates by building a hash map
//! over the smaller input; `NestedLoopJoin` handles the remaining scan
//! types and cross products. Both emit references tables whose chunks
//! carry one position list per input side and segment; outer modes pad
//! the unmatched side with NULL row ids.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::chunk::Chunk;
use crate::column::{Column, PosList, ReferenceColumn};
use crate::expression::ScanType;
use crate::operators::eval::scan_matches;
use crate::operators::view::{materialize_column, SegmentedInput};
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::Table;
use crate::types::{ColumnId, JoinMode, RowId, Value};
use crate::{Result, StoaError};

pub struct HashJoin {
    left: Box<dyn PhysicalOperator>,
    right: Box<dyn PhysicalOperator>,
    mode: JoinMode,
    left_column: ColumnId,
    right_column: ColumnId,
}

impl HashJoin {
    pub fn new(
        left: Box<dyn PhysicalOperator>,
        right: Box<dyn PhysicalOperator>,
        mode: JoinMode,
        left_column: ColumnId,
        right_column: ColumnId,
    ) -> HashJoin {
        HashJoin {
            left,
            right,
            mode,
            left_column,
            right_column,
        }
    }
}

impl PhysicalOperator for HashJoin {
    fn name(&self) -> &'static str {
        "HashJoin"
    }

    fn description(&self) -> String {
        format!(
            "HashJoin {:?} on #{} = #{}",
            self.mode, self.left_column, self.right_column
        )
    }

    fn num_in_tables(&self) -> usize {
        2
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(HashJoin::new(
            self.left.recreate(params),
            self.right.recreate(params),
            self.mode,
            self.left_column,
            self.right_column,
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        if matches!(self.mode, JoinMode::Cross | JoinMode::Natural) {
            return Err(StoaError::Schema(
                "hash join requires an equality predicate".into(),
            ));
        }
        let left = self.left.execute(ctx)?;
        let right = self.right.execute(ctx)?;
        let left_view = SegmentedInput::analyze(&left)?;
        let right_view = SegmentedInput::analyze(&right)?;

        let left_keys = normalized_keys(&left, self.left_column, &right, self.right_column)?;
        let right_keys = normalized_keys(&right, self.right_column, &left, self.left_column)?;

        // Probe-build on the smaller side.
        let build_left = left_keys.len() <= right_keys.len();
        let (build_keys, probe_keys) = if build_left {
            (&left_keys, &right_keys)
        } else {
            (&right_keys, &left_keys)
        };

        let mut table: FxHashMap<&Value, Vec<usize>> = FxHashMap::default();
        for (index, key) in build_keys.iter().enumerate() {
            if !key.is_null() {
                table.entry(key).or_default().push(index);
            }
        }

        let mut matched_build = vec![false; build_keys.len()];
        let mut matched_probe = vec![false; probe_keys.len()];
        let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
        for (probe_index, key) in probe_keys.iter().enumerate() {
            ctx.cancel.check()?;
            if key.is_null() {
                continue;
            }
            if let Some(hits) = table.get(key) {
                matched_probe[probe_index] = true;
                for &build_index in hits {
                    matched_build[build_index] = true;
                    pairs.push(if build_left {
                        (Some(build_index), Some(probe_index))
                    } else {
                        (Some(probe_index), Some(build_index))
                    });
                }
            }
        }

        let (matched_left, matched_right) = if build_left {
            (&matched_build, &matched_probe)
        } else {
            (&matched_probe, &matched_build)
        };
        pad_unmatched(self.mode, matched_left, matched_right, &mut pairs);

        debug!(pairs = pairs.len(), mode = ?self.mode, "hash join");
        Ok(Arc::new(join_output(&left_view, &right_view, &pairs)?))
    }
}

pub struct NestedLoopJoin {
    left: Box<dyn PhysicalOperator>,
    right: Box<dyn PhysicalOperator>,
    mode: JoinMode,
    predicate: Option<(ColumnId, ColumnId, ScanType)>,
}

impl NestedLoopJoin {
    pub fn new(
        left: Box<dyn PhysicalOperator>,
        right: Box<dyn PhysicalOperator>,
        mode: JoinMode,
        predicate: Option<(ColumnId, ColumnId, ScanType)>,
    ) -> NestedLoopJoin {
        NestedLoopJoin {
            left,
            right,
            mode,
            predicate,
        }
    }
}

impl PhysicalOperator for NestedLoopJoin {
    fn name(&self) -> &'static str {
        "NestedLoopJoin"
    }

    fn description(&self) -> String {
        match self.predicate {
            Some((l, r, scan_type)) => {
                format!("NestedLoopJoin {:?} on #{l} {scan_type} #{r}", self.mode)
            }
            None => format!("NestedLoopJoin {:?}", self.mode),
        }
    }

    fn num_in_tables(&self) -> usize {
        2
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(NestedLoopJoin::new(
            self.left.recreate(params),
            self.right.recreate(params),
            self.mode,
            self.predicate,
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let left = self.left.execute(ctx)?;
        let right = self.right.execute(ctx)?;
        let left_view = SegmentedInput::analyze(&left)?;
        let right_view = SegmentedInput::analyze(&right)?;

        let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
        if self.mode == JoinMode::Cross {
            for li in 0..left_view.row_count {
                ctx.cancel.check()?;
                for ri in 0..right_view.row_count {
                    pairs.push((Some(li), Some(ri)));
                }
            }
        } else {
            let (lc, rc, scan_type) = self.predicate.ok_or_else(|| {
                StoaError::Schema("nested loop join requires a predicate".into())
            })?;
            let left_keys = materialize_column(&left, lc);
            let right_keys = materialize_column(&right, rc);
            let mut matched_left = vec![false; left_keys.len()];
            let mut matched_right = vec![false; right_keys.len()];
            for (li, lk) in left_keys.iter().enumerate() {
                ctx.cancel.check()?;
                for (ri, rk) in right_keys.iter().enumerate() {
                    if scan_matches(scan_type, lk, rk, None)? {
                        matched_left[li] = true;
                        matched_right[ri] = true;
                        pairs.push((Some(li), Some(ri)));
                    }
                }
            }
            pad_unmatched(self.mode, &matched_left, &matched_right, &mut pairs);
        }

        debug!(pairs = pairs.len(), mode = ?self.mode, "nested loop join");
        Ok(Arc::new(join_output(&left_view, &right_view, &pairs)?))
    }
}

/// Coerce one side's join keys to the promoted common key type so
/// hashing agrees across sides.
fn normalized_keys(
    table: &Arc<Table>,
    column: ColumnId,
    other: &Arc<Table>,
    other_column: ColumnId,
) -> Result<Vec<Value>> {
    let target = table
        .column_type(column)
        .promote(other.column_type(other_column))
        .map_err(|_| {
            StoaError::Schema(format!(
                "cannot join {} with {}",
                table.column_type(column).name(),
                other.column_type(other_column).name()
            ))
        })?;
    materialize_column(table, column)
        .into_iter()
        .map(|v| v.coerce(target))
        .collect()
}

/// Append padding rows for the outer modes, in input order.
fn pad_unmatched(
    mode: JoinMode,
    matched_left: &[bool],
    matched_right: &[bool],
    pairs: &mut Vec<(Option<usize>, Option<usize>)>,
) {
    if matches!(mode, JoinMode::Left | JoinMode::Outer) {
        for (li, &hit) in matched_left.iter().enumerate() {
            if !hit {
                pairs.push((Some(li), None));
            }
        }
    }
    if matches!(mode, JoinMode::Right | JoinMode::Outer) {
        for (ri, &hit) in matched_right.iter().enumerate() {
            if !hit {
                pairs.push((None, Some(ri)));
            }
        }
    }
}

/// Assemble the output: left columns then right columns, two reference
/// column groups per chunk, padded side reads as NULL.
fn join_output(
    left: &SegmentedInput,
    right: &SegmentedInput,
    pairs: &[(Option<usize>, Option<usize>)],
) -> Result<Table> {
    let mut names = left.input.column_names().to_vec();
    names.extend(right.input.column_names().iter().cloned());
    let mut types = left.input.column_types().to_vec();
    types.extend(right.input.column_types().iter().copied());
    let nullable = vec![true; names.len()];
    let chunk_size = left.input.chunk_size().max(right.input.chunk_size());
    let mut out = Table::new_references_schema(names, types, nullable, chunk_size);

    let batch_size = if chunk_size == 0 {
        pairs.len().max(1)
    } else {
        chunk_size as usize
    };
    for batch in pairs.chunks(batch_size) {
        let mut columns: Vec<Arc<Column>> = Vec::with_capacity(out.column_count());
        append_side(&mut columns, left, batch, |pair| pair.0);
        append_side(&mut columns, right, batch, |pair| pair.1);
        out.add_chunk(Chunk::new(columns))?;
    }
    Ok(out)
}

fn append_side(
    columns: &mut Vec<Arc<Column>>,
    view: &SegmentedInput,
    batch: &[(Option<usize>, Option<usize>)],
    pick: impl Fn(&(Option<usize>, Option<usize>)) -> Option<usize>,
) {
    for segment in 0..view.segment_count() {
        let positions: Arc<PosList> = Arc::new(
            batch
                .iter()
                .map(|pair| match pick(pair) {
                    Some(row) => view.positions[segment][row],
                    None => RowId::NULL,
                })
                .collect(),
        );
        for c in view.segment_columns(segment) {
            columns.push(Arc::new(Column::Reference(ReferenceColumn::new(
                view.sources[c].table.clone(),
                view.sources[c].column_id,
                positions.clone(),
            ))));
        }
    }
}
