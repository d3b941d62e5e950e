//! Flattened views of operator inputs.
//!
//! Reference-producing operators need the same two facts about an input
//! table: which base column every column resolves to, and the
//! concatenated position matrix of each segment. `SegmentedInput`
//! computes both; a `Data` input becomes one identity segment over
//! itself.

use std::sync::Arc;

use crate::chunk::Chunk;
use crate::column::{Column, PosList, ReferenceColumn};
use crate::table::{Table, TableKind};
use crate::types::{ColumnId, RowId, Value};
use crate::{Result, StoaError};

pub(crate) struct ColumnSource {
    pub table: Arc<Table>,
    pub column_id: ColumnId,
}

pub(crate) struct SegmentedInput {
    pub input: Arc<Table>,
    /// Per column: the base column it reads through.
    pub sources: Vec<ColumnSource>,
    /// First column id of each segment, ascending, beginning with 0.
    pub segment_starts: Vec<usize>,
    /// Per segment: position lists of all chunks, concatenated. The
    /// outer index is the segment, the inner index a global row index.
    pub positions: Vec<Vec<RowId>>,
    pub row_count: usize,
}

impl SegmentedInput {
    pub fn analyze(input: &Arc<Table>) -> Result<SegmentedInput> {
        match input.kind() {
            TableKind::Data => Ok(SegmentedInput::identity(input)),
            TableKind::References => SegmentedInput::from_references(input),
        }
    }

    fn identity(input: &Arc<Table>) -> SegmentedInput {
        let sources = (0..input.column_count())
            .map(|c| ColumnSource {
                table: input.clone(),
                column_id: c as ColumnId,
            })
            .collect();
        let mut rows = Vec::with_capacity(input.row_count());
        for (chunk_id, chunk) in input.chunks().iter().enumerate() {
            for offset in 0..chunk.size() {
                rows.push(RowId::new(chunk_id as u32, offset as u32));
            }
        }
        let row_count = rows.len();
        SegmentedInput {
            input: input.clone(),
            sources,
            segment_starts: vec![0],
            positions: vec![rows],
            row_count,
        }
    }

    fn from_references(input: &Arc<Table>) -> Result<SegmentedInput> {
        let column_count = input.column_count();
        if input.chunk_count() == 0 {
            // Nothing to read sources from; the placeholders are never
            // dereferenced because there are no rows to select.
            let sources = (0..column_count)
                .map(|c| ColumnSource {
                    table: input.clone(),
                    column_id: c as ColumnId,
                })
                .collect();
            return Ok(SegmentedInput {
                input: input.clone(),
                sources,
                segment_starts: vec![0],
                positions: vec![Vec::new()],
                row_count: 0,
            });
        }

        // Segment boundaries come from the first chunk: a segment starts
        // wherever the shared position list changes identity.
        let first = input.chunk(0);
        let mut sources = Vec::with_capacity(column_count);
        let mut segment_starts = Vec::new();
        let mut previous: Option<&ReferenceColumn> = None;
        for c in 0..column_count {
            let column = reference_column(first, c)?;
            if previous.map_or(true, |p| !column.shares_positions_with(p)) {
                segment_starts.push(c);
            }
            sources.push(ColumnSource {
                table: column.referenced_table().clone(),
                column_id: column.referenced_column_id(),
            });
            previous = Some(column);
        }

        let mut positions = vec![Vec::new(); segment_starts.len()];
        let mut row_count = 0;
        for chunk in input.chunks() {
            debug_assert!(
                segmentation_matches(chunk, &segment_starts),
                "all chunks of a references table must share the segmentation"
            );
            row_count += chunk.size();
            for (segment, &begin) in segment_starts.iter().enumerate() {
                let column = reference_column(chunk, begin)?;
                debug_assert!(Arc::ptr_eq(
                    column.referenced_table(),
                    &sources[begin].table
                ));
                positions[segment].extend_from_slice(column.positions());
            }
        }

        Ok(SegmentedInput {
            input: input.clone(),
            sources,
            segment_starts,
            positions,
            row_count,
        })
    }

    pub fn segment_count(&self) -> usize {
        self.segment_starts.len()
    }

    /// The column id range of one segment.
    pub fn segment_columns(&self, segment: usize) -> std::ops::Range<usize> {
        let begin = self.segment_starts[segment];
        let end = self
            .segment_starts
            .get(segment + 1)
            .copied()
            .unwrap_or(self.sources.len());
        begin..end
    }

    /// Assemble a references table holding `selected` input rows, in
    /// order, re-chunked at `chunk_size` (0 keeps a single chunk).
    pub fn emit_selection(&self, selected: &[usize], chunk_size: u32) -> Result<Table> {
        let mut out = Table::new_references_schema(
            self.input.column_names().to_vec(),
            self.input.column_types().to_vec(),
            (0..self.input.column_count())
                .map(|c| self.input.column_is_nullable(c as ColumnId))
                .collect(),
            chunk_size,
        );
        for batch in batches(selected, chunk_size) {
            let mut columns = Vec::with_capacity(self.sources.len());
            for segment in 0..self.segment_count() {
                let pos: Arc<PosList> = Arc::new(
                    batch
                        .iter()
                        .map(|&row| self.positions[segment][row])
                        .collect(),
                );
                for c in self.segment_columns(segment) {
                    columns.push(Arc::new(Column::Reference(ReferenceColumn::new(
                        self.sources[c].table.clone(),
                        self.sources[c].column_id,
                        pos.clone(),
                    ))));
                }
            }
            out.add_chunk(Chunk::new(columns))?;
        }
        Ok(out)
    }
}

/// Split a selection into emission batches; chunk size 0 disables
/// chunking. Empty selections produce no chunks.
pub(crate) fn batches<'a>(
    selected: &'a [usize],
    chunk_size: u32,
) -> impl Iterator<Item = &'a [usize]> + 'a {
    let size = if chunk_size == 0 {
        selected.len().max(1)
    } else {
        chunk_size as usize
    };
    selected.chunks(size)
}

fn reference_column(chunk: &Chunk, column: usize) -> Result<&ReferenceColumn> {
    match chunk.column(column as ColumnId).as_ref() {
        Column::Reference(r) => Ok(r),
        _ => Err(StoaError::Schema(
            "expected a references table but found an unencoded column".into(),
        )),
    }
}

#[cfg(debug_assertions)]
fn segmentation_matches(chunk: &Chunk, segment_starts: &[usize]) -> bool {
    let mut expected = Vec::new();
    let mut previous: Option<&ReferenceColumn> = None;
    for c in 0..chunk.column_count() {
        let column = match chunk.column(c as ColumnId).as_ref() {
            Column::Reference(r) => r,
            _ => return false,
        };
        if previous.map_or(true, |p| !column.shares_positions_with(p)) {
            expected.push(c);
        }
        previous = Some(column);
    }
    expected == segment_starts
}

#[cfg(not(debug_assertions))]
fn segmentation_matches(_chunk: &Chunk, _segment_starts: &[usize]) -> bool {
    true
}

/// Read one column of a table into plain values, in chunk order.
pub(crate) fn materialize_column(table: &Table, column_id: ColumnId) -> Vec<Value> {
    let mut out = Vec::with_capacity(table.row_count());
    for chunk in table.chunks() {
        let column = chunk.column(column_id);
        for row in 0..column.len() {
            out.push(column.get(row));
        }
    }
    out
}
