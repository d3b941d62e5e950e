//! Reference columns: views into a base table through a shared position
//! list. They own no rows and never nest; several reference columns
//! sharing one position list (by `Arc` identity) form a segment.

use std::sync::Arc;

use crate::table::{Table, TableKind};
use crate::types::{ColumnId, DataType, RowId, Value};

/// An ordered sequence of row ids carried by reference columns.
pub type PosList = Vec<RowId>;

#[derive(Debug, Clone)]
pub struct ReferenceColumn {
    table: Arc<Table>,
    column_id: ColumnId,
    positions: Arc<PosList>,
}

impl ReferenceColumn {
    pub fn new(table: Arc<Table>, column_id: ColumnId, positions: Arc<PosList>) -> ReferenceColumn {
        debug_assert_eq!(
            table.kind(),
            TableKind::Data,
            "reference columns must not nest"
        );
        debug_assert!((column_id as usize) < table.column_count());
        ReferenceColumn {
            table,
            column_id,
            positions,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.table.column_type(self.column_id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Value {
        let row = self.positions[index];
        if row.is_null() {
            return Value::Null;
        }
        self.table.value_at(self.column_id, row)
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn referenced_column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn positions(&self) -> &Arc<PosList> {
        &self.positions
    }

    /// Segment membership test: shared position lists are recognized by
    /// pointer identity, not by value equality.
    pub fn shares_positions_with(&self, other: &ReferenceColumn) -> bool {
        Arc::ptr_eq(&self.positions, &other.positions)
    }
}
