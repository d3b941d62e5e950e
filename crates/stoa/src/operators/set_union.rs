//! Set union over references tables: the union of two row-id sets, not
//! a value union.
//!
//! Both inputs must share schema and layout. Segments are recognized by
//! shared position-list identity on the first chunk of each input (all
//! chunks must agree; asserted in debug builds), and the two inputs'
//! segmentations are merged. Each input then becomes a segments x rows
//! matrix of row ids; a virtual index list per input is sorted by
//! lexicographic comparison of the matrix columns, and the two sorted
//! sequences are merged with the standard set-union rule: advance the
//! smaller side, emit equal row-id tuples once. Output chunks are cut
//! at max(left chunk size, right chunk size); 0 disables chunking.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::chunk::Chunk;
use crate::column::{Column, PosList, ReferenceColumn};
use crate::operators::view::{ColumnSource, SegmentedInput};
use crate::operators::{ExecutionContext, PhysicalOperator};
use crate::table::{Table, TableKind};
use crate::types::{RowId, Value};
use crate::{Result, StoaError};

pub struct SetUnion {
    left: Box<dyn PhysicalOperator>,
    right: Box<dyn PhysicalOperator>,
}

impl SetUnion {
    pub fn new(left: Box<dyn PhysicalOperator>, right: Box<dyn PhysicalOperator>) -> SetUnion {
        SetUnion { left, right }
    }
}

impl PhysicalOperator for SetUnion {
    fn name(&self) -> &'static str {
        "SetUnion"
    }

    fn num_in_tables(&self) -> usize {
        2
    }

    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator> {
        Box::new(SetUnion::new(
            self.left.recreate(params),
            self.right.recreate(params),
        ))
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>> {
        let left = self.left.execute(ctx)?;
        let right = self.right.execute(ctx)?;

        // 1. Schema validation.
        if left.column_names() != right.column_names()
            || left.column_types() != right.column_types()
        {
            return Err(StoaError::Schema(
                "set union inputs must share column names and types".into(),
            ));
        }
        if left.kind() != TableKind::References || right.kind() != TableKind::References {
            return Err(StoaError::Schema(
                "set union expects references tables".into(),
            ));
        }
        if left.row_count() == 0 {
            return Ok(right);
        }
        if right.row_count() == 0 {
            return Ok(left);
        }

        // 2. Segment identification, merged across both inputs.
        let left_view = SegmentedInput::analyze(&left)?;
        let right_view = SegmentedInput::analyze(&right)?;
        let mut merged_starts: Vec<usize> = left_view
            .segment_starts
            .iter()
            .chain(right_view.segment_starts.iter())
            .copied()
            .collect();
        merged_starts.sort_unstable();
        merged_starts.dedup();

        // 3. Reference matrices at the merged granularity.
        let left_matrix = matrix_for(&left_view, &merged_starts);
        let right_matrix = matrix_for(&right_view, &merged_starts);

        // 4. Virtual position lists: indices sorted by row-id tuples.
        let left_order = sorted_order(&left_matrix, left_view.row_count);
        let right_order = sorted_order(&right_matrix, right_view.row_count);

        // 5. Merge.
        let chunk_rows = left.chunk_size().max(right.chunk_size());
        let mut emitter = Emitter::new(
            &left,
            &left_view.sources,
            &merged_starts,
            chunk_rows,
        );
        let mut li = 0;
        let mut ri = 0;
        while li < left_order.len() && ri < right_order.len() {
            if (li + ri) % 4096 == 0 {
                ctx.cancel.check()?;
            }
            match compare_rows(&left_matrix, left_order[li], &right_matrix, right_order[ri]) {
                Ordering::Less => {
                    emitter.push(&left_matrix, left_order[li])?;
                    li += 1;
                }
                Ordering::Greater => {
                    emitter.push(&right_matrix, right_order[ri])?;
                    ri += 1;
                }
                Ordering::Equal => {
                    emitter.push(&left_matrix, left_order[li])?;
                    li += 1;
                    ri += 1;
                }
            }
        }
        while li < left_order.len() {
            emitter.push(&left_matrix, left_order[li])?;
            li += 1;
        }
        while ri < right_order.len() {
            emitter.push(&right_matrix, right_order[ri])?;
            ri += 1;
        }

        let out = emitter.finish()?;
        debug!(
            left = left_view.row_count,
            right = right_view.row_count,
            rows = out.row_count(),
            "set union"
        );
        Ok(Arc::new(out))
    }
}

/// Per merged segment, the concatenated position list of the input
/// segment containing it.
fn matrix_for<'a>(view: &'a SegmentedInput, merged_starts: &[usize]) -> Vec<&'a Vec<RowId>> {
    merged_starts
        .iter()
        .map(|&column| {
            let segment = match view.segment_starts.binary_search(&column) {
                Ok(s) => s,
                Err(s) => s - 1,
            };
            &view.positions[segment]
        })
        .collect()
}

fn compare_tuple(matrix: &[&Vec<RowId>], a: usize, b: usize) -> Ordering {
    for segment in matrix {
        let ordering = segment[a].cmp(&segment[b]);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_rows(
    left: &[&Vec<RowId>],
    li: usize,
    right: &[&Vec<RowId>],
    ri: usize,
) -> Ordering {
    for (l, r) in left.iter().zip(right) {
        let ordering = l[li].cmp(&r[ri]);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sorting swaps indices only; row ids are never moved.
fn sorted_order(matrix: &[&Vec<RowId>], rows: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows).collect();
    order.sort_unstable_by(|&a, &b| compare_tuple(matrix, a, b));
    order
}

/// Accumulates merged rows per segment and cuts output chunks at the
/// configured row limit.
struct Emitter<'a> {
    out: Table,
    pending: Vec<Vec<RowId>>,
    chunk_rows: usize,
    sources: &'a [ColumnSource],
    merged_starts: &'a [usize],
    column_count: usize,
}

impl<'a> Emitter<'a> {
    fn new(
        prototype: &Table,
        sources: &'a [ColumnSource],
        merged_starts: &'a [usize],
        chunk_rows: u32,
    ) -> Emitter<'a> {
        let out = Table::new_references_schema(
            prototype.column_names().to_vec(),
            prototype.column_types().to_vec(),
            (0..prototype.column_count())
                .map(|c| prototype.column_is_nullable(c as u16))
                .collect(),
            chunk_rows,
        );
        Emitter {
            out,
            pending: vec![Vec::new(); merged_starts.len()],
            chunk_rows: chunk_rows as usize,
            sources,
            merged_starts,
            column_count: prototype.column_count(),
        }
    }

    fn push(&mut self, matrix: &[&Vec<RowId>], index: usize) -> Result<()> {
        for (segment, rows) in matrix.iter().zip(self.pending.iter_mut()) {
            rows.push(segment[index]);
        }
        if self.chunk_rows > 0 && self.pending[0].len() >= self.chunk_rows {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending[0].is_empty() {
            return Ok(());
        }
        let mut columns: Vec<Arc<Column>> = Vec::with_capacity(self.column_count);
        for (segment, rows) in self.pending.iter_mut().enumerate() {
            let positions: Arc<PosList> = Arc::new(std::mem::take(rows));
            let begin = self.merged_starts[segment];
            let end = self
                .merged_starts
                .get(segment + 1)
                .copied()
                .unwrap_or(self.column_count);
            for c in begin..end {
                columns.push(Arc::new(Column::Reference(ReferenceColumn::new(
                    self.sources[c].table.clone(),
                    self.sources[c].column_id,
                    positions.clone(),
                ))));
            }
        }
        self.out.add_chunk(Chunk::new(columns))
    }

    fn finish(mut self) -> Result<Table> {
        self.flush()?;
        Ok(self.out)
    }
}
