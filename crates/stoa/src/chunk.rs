//! Chunks: bounded, column-aligned row groups. A chunk of plain columns
//! accepts appends until its table seals it; encoded and reference
//! chunks are immutable.

use std::sync::Arc;

use crate::column::Column;
use crate::types::{ChunkOffset, ColumnId, Value};
use crate::{Result, StoaError};

#[derive(Debug, Clone)]
pub struct Chunk {
    columns: Vec<Arc<Column>>,
    // Visibility vector: rows removed by Delete/Update stay addressable
    // (row ids are stable) but are filtered out by Validate.
    deleted: Vec<bool>,
}

impl Chunk {
    pub fn new(columns: Vec<Arc<Column>>) -> Chunk {
        let rows = columns.first().map_or(0, |c| c.len());
        debug_assert!(
            columns.iter().all(|c| c.len() == rows),
            "chunk columns must be row-aligned"
        );
        Chunk {
            columns,
            deleted: vec![false; rows],
        }
    }

    pub fn size(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, id: ColumnId) -> &Arc<Column> {
        &self.columns[id as usize]
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Append one row across all columns. The caller has already coerced
    /// the values to the column types.
    pub fn append_row(&mut self, row: &[Value]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(StoaError::Schema(format!(
                "row width {} does not match chunk width {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            Arc::make_mut(column).append(value)?;
        }
        self.deleted.push(false);
        Ok(())
    }

    /// Replace the column set, keeping row count and visibility. Used
    /// when a sealed chunk is swapped for a re-encoded version.
    pub fn with_columns(&self, columns: Vec<Arc<Column>>) -> Chunk {
        debug_assert!(columns.iter().all(|c| c.len() == self.size()));
        Chunk {
            columns,
            deleted: self.deleted.clone(),
        }
    }

    pub fn is_deleted(&self, offset: ChunkOffset) -> bool {
        self.deleted[offset as usize]
    }

    pub fn mark_deleted(&mut self, offset: ChunkOffset) {
        self.deleted[offset as usize] = true;
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.iter().filter(|&&d| d).count()
    }
}
