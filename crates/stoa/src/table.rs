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

//! Tables: an ordered column schema plus a list of chunks. `Data` tables
//! own rows; `References` tables are assembled by operators from
//! reference columns and borrow their rows from base tables.

use std::sync::Arc;

use crate::chunk::Chunk;
use crate::column::{Column, ValueColumn};
use crate::statistics::TableStatistics;
use crate::types::{ChunkId, ColumnId, DataType, RowId, Value};
use crate::{Result, StoaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Data,
    References,
}

/// Target encoding for `Table::compress_chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEncoding {
    Dictionary,
    RunLength,
}

#[derive(Debug, Clone)]
pub struct Table {
    column_names: Vec<String>,
    column_types: Vec<DataType>,
    column_nullable: Vec<bool>,
    // 0 disables chunking: a single unbounded chunk.
    chunk_size: u32,
    chunks: Vec<Arc<Chunk>>,
    kind: TableKind,
}

impl Table {
    /// An empty `Data` table; declare columns with `add_column` before
    /// appending rows.
    pub fn new(chunk_size: u32) -> Table {
        Table {
            column_names: Vec::new(),
            column_types: Vec::new(),
            column_nullable: Vec::new(),
            chunk_size,
            chunks: Vec::new(),
            kind: TableKind::Data,
        }
    }

    /// A `References` table with the schema of `prototype`; chunks are
    /// assembled by operators via `add_chunk`.
    pub fn new_references(prototype: &Table) -> Table {
        Table::new_references_schema(
            prototype.column_names.clone(),
            prototype.column_types.clone(),
            prototype.column_nullable.clone(),
            prototype.chunk_size,
        )
    }

    /// A `Data` table with an explicit schema. Unlike `add_column` this
    /// skips the duplicate-name check: operator outputs may legally
    /// repeat a name (`SELECT a, a`).
    pub fn new_data_schema(
        column_names: Vec<String>,
        column_types: Vec<DataType>,
        column_nullable: Vec<bool>,
        chunk_size: u32,
    ) -> Table {
        Table {
            column_names,
            column_types,
            column_nullable,
            chunk_size,
            chunks: Vec::new(),
            kind: TableKind::Data,
        }
    }

    /// A `References` table with an explicit schema; used by operators
    /// whose output combines or re-chunks inputs.
    pub fn new_references_schema(
        column_names: Vec<String>,
        column_types: Vec<DataType>,
        column_nullable: Vec<bool>,
        chunk_size: u32,
    ) -> Table {
        Table {
            column_names,
            column_types,
            column_nullable,
            chunk_size,
            chunks: Vec::new(),
            kind: TableKind::References,
        }
    }

    pub fn add_column(&mut self, name: &str, data_type: DataType, nullable: bool) -> Result<()> {
        if self.row_count() > 0 {
            return Err(StoaError::Schema(
                "cannot add a column to a table that already has rows".into(),
            ));
        }
        if self.column_names.iter().any(|n| n == name) {
            return Err(StoaError::Schema(format!("duplicate column name \"{name}\"")));
        }
        self.column_names.push(name.to_string());
        self.column_types.push(data_type);
        self.column_nullable.push(nullable);
        Ok(())
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_name(&self, id: ColumnId) -> &str {
        &self.column_names[id as usize]
    }

    pub fn column_type(&self, id: ColumnId) -> DataType {
        self.column_types[id as usize]
    }

    pub fn column_types(&self) -> &[DataType] {
        &self.column_types
    }

    pub fn column_is_nullable(&self, id: ColumnId) -> bool {
        self.column_nullable[id as usize]
    }

    pub fn column_id_by_name(&self, name: &str) -> Result<ColumnId> {
        self.column_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as ColumnId)
            .ok_or_else(|| StoaError::Schema(format!("no column named \"{name}\"")))
    }

    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(|c| c.size()).sum()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, id: ChunkId) -> &Arc<Chunk> {
        &self.chunks[id as usize]
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Mutable access for visibility updates (Delete); clones shared
    /// chunks on write.
    pub fn chunk_mut(&mut self, id: ChunkId) -> &mut Chunk {
        Arc::make_mut(&mut self.chunks[id as usize])
    }

    /// Append a typed row, coercing values to the declared column
    /// types. Extends the open chunk, sealing it and opening a new one
    /// when the chunk limit is reached.
    pub fn append(&mut self, row: Vec<Value>) -> Result<()> {
        if self.kind != TableKind::Data {
            return Err(StoaError::Schema(
                "cannot append rows to a references table".into(),
            ));
        }
        if row.len() != self.column_count() {
            return Err(StoaError::Schema(format!(
                "row width {} does not match table width {}",
                row.len(),
                self.column_count()
            )));
        }
        let mut coerced = Vec::with_capacity(row.len());
        for (value, &data_type) in row.into_iter().zip(&self.column_types) {
            coerced.push(value.coerce(data_type)?);
        }
        if !self.has_open_chunk() {
            self.open_chunk();
        }
        let last = self.chunks.len() - 1;
        Arc::make_mut(&mut self.chunks[last]).append_row(&coerced)
    }

    fn has_open_chunk(&self) -> bool {
        match self.chunks.last() {
            None => false,
            Some(chunk) => {
                let open = chunk
                    .columns()
                    .iter()
                    .all(|c| matches!(c.as_ref(), Column::Value(_)));
                open && (self.chunk_size == 0 || chunk.size() < self.chunk_size as usize)
            }
        }
    }

    fn open_chunk(&mut self) {
        let columns = self
            .column_types
            .iter()
            .zip(&self.column_nullable)
            .map(|(&data_type, &nullable)| {
                Arc::new(Column::Value(ValueColumn::new(data_type, nullable)))
            })
            .collect();
        self.chunks.push(Arc::new(Chunk::new(columns)));
    }

    /// Attach an operator-built chunk. `References` tables accept only
    /// reference columns.
    pub fn add_chunk(&mut self, chunk: Chunk) -> Result<()> {
        if chunk.column_count() != self.column_count() {
            return Err(StoaError::Schema(format!(
                "chunk width {} does not match table width {}",
                chunk.column_count(),
                self.column_count()
            )));
        }
        if self.kind == TableKind::References
            && !chunk
                .columns()
                .iter()
                .all(|c| matches!(c.as_ref(), Column::Reference(_)))
        {
            return Err(StoaError::Schema(
                "references tables may only contain reference columns".into(),
            ));
        }
        self.chunks.push(Arc::new(chunk));
        Ok(())
    }

    pub fn value_at(&self, column: ColumnId, row: RowId) -> Value {
        self.chunks[row.chunk_id as usize]
            .column(column)
            .get(row.offset as usize)
    }

    /// Swap a sealed chunk for a re-encoded version; row ids are
    /// unchanged.
    pub fn compress_chunk(&mut self, chunk_id: ChunkId, encoding: ChunkEncoding) -> Result<()> {
        use crate::column::{DictionaryColumn, RunLengthColumn};

        let chunk = self
            .chunks
            .get(chunk_id as usize)
            .ok_or_else(|| StoaError::Schema(format!("no chunk {chunk_id}")))?;
        let mut columns = Vec::with_capacity(chunk.column_count());
        for column in chunk.columns() {
            let plain = match column.as_ref() {
                Column::Value(c) => c,
                _ => {
                    return Err(StoaError::Schema(format!(
                        "chunk {chunk_id} is already encoded"
                    )))
                }
            };
            let encoded = match encoding {
                ChunkEncoding::Dictionary => {
                    Column::Dictionary(DictionaryColumn::from_value_column(plain))
                }
                ChunkEncoding::RunLength => {
                    Column::RunLength(RunLengthColumn::from_value_column(plain))
                }
            };
            columns.push(Arc::new(encoded));
        }
        let replacement = chunk.with_columns(columns);
        self.chunks[chunk_id as usize] = Arc::new(replacement);
        Ok(())
    }

    pub fn statistics(&self) -> TableStatistics {
        TableStatistics::generate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table(chunk_size: u32) -> Table {
        let mut table = Table::new(chunk_size);
        table.add_column("a", DataType::Int32, false).unwrap();
        table.add_column("b", DataType::Text, true).unwrap();
        table
    }

    #[test]
    fn append_seals_and_opens_chunks() {
        let mut table = sample_table(3);
        for i in 0..7 {
            table
                .append(vec![Value::Int32(i), Value::Text(format!("r{i}"))])
                .unwrap();
        }
        assert_eq!(table.row_count(), 7);
        assert_eq!(table.chunk_count(), 3);
        assert_eq!(table.chunk(0).size(), 3);
        assert_eq!(table.chunk(2).size(), 1);
        assert_eq!(table.value_at(0, RowId::new(1, 2)), Value::Int32(5));
    }

    #[test]
    fn chunk_size_zero_disables_chunking() {
        let mut table = sample_table(0);
        for i in 0..100 {
            table
                .append(vec![Value::Int32(i), Value::Null])
                .unwrap();
        }
        assert_eq!(table.chunk_count(), 1);
    }

    #[test]
    fn append_coerces_to_declared_types() {
        let mut table = sample_table(0);
        table
            .append(vec![Value::Int64(9), Value::Text("x".into())])
            .unwrap();
        assert_eq!(table.value_at(0, RowId::new(0, 0)), Value::Int32(9));
        assert!(table
            .append(vec![Value::Text("no".into()), Value::Null])
            .is_err());
        assert!(table.append(vec![Value::Int32(1)]).is_err());
    }

    #[test]
    fn compress_chunk_keeps_row_ids() {
        let mut table = sample_table(4);
        for i in 0..8 {
            table
                .append(vec![Value::Int32(i % 2), Value::Text("t".into())])
                .unwrap();
        }
        table.compress_chunk(0, ChunkEncoding::Dictionary).unwrap();
        table.compress_chunk(1, ChunkEncoding::RunLength).unwrap();
        assert!(matches!(
            table.chunk(0).column(0).as_ref(),
            Column::Dictionary(_)
        ));
        assert!(matches!(
            table.chunk(1).column(0).as_ref(),
            Column::RunLength(_)
        ));
        for i in 0..8u32 {
            assert_eq!(
                table.value_at(0, RowId::new(i / 4, i % 4)),
                Value::Int32((i % 2) as i32)
            );
        }
        // Re-encoding an encoded chunk is rejected.
        assert!(table.compress_chunk(0, ChunkEncoding::RunLength).is_err());
    }

    #[test]
    fn appending_after_compression_opens_a_new_chunk() {
        let mut table = sample_table(0);
        table.append(vec![Value::Int32(1), Value::Null]).unwrap();
        table.compress_chunk(0, ChunkEncoding::Dictionary).unwrap();
        table.append(vec![Value::Int32(2), Value::Null]).unwrap();
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.value_at(0, RowId::new(1, 0)), Value::Int32(2));
    }
}
