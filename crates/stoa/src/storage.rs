//! The storage manager: a process-wide registry of tables by name.
//! Read-only during query execution; Insert/Update/Delete swap a table
//! for a rebuilt copy under that table's own exclusive lock, so readers
//! holding the old `Arc` keep a consistent snapshot and mutations of
//! unrelated tables proceed in parallel. The registry map's lock is
//! held only to look an entry up or to add/drop one.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::table::Table;
use crate::{Result, StoaError};

/// One registry entry: the per-table lock around the published table.
type TableSlot = Arc<RwLock<Arc<Table>>>;

#[derive(Debug, Default)]
pub struct StorageManager {
    tables: RwLock<FxHashMap<String, TableSlot>>,
}

impl StorageManager {
    pub fn new() -> StorageManager {
        StorageManager::default()
    }

    /// Register a table. Names are case-sensitive; duplicates are an
    /// error.
    pub fn add_table(&self, name: &str, table: Table) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.contains_key(name) {
            return Err(StoaError::Schema(format!(
                "a table named \"{name}\" already exists"
            )));
        }
        tables.insert(name.to_string(), Arc::new(RwLock::new(Arc::new(table))));
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<TableSlot> {
        self.tables
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StoaError::Schema(format!("no table named \"{name}\"")))
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        Ok(self.slot(name)?.read().unwrap().clone())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().unwrap().contains_key(name)
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.tables
            .write()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoaError::Schema(format!("no table named \"{name}\"")))
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Atomically replace a table with a rebuilt copy. The closure runs
    /// under the table's exclusive lock; concurrent mutations of other
    /// tables are not blocked.
    pub fn update_table(
        &self,
        name: &str,
        rebuild: impl FnOnce(&Table) -> Result<Table>,
    ) -> Result<()> {
        let slot = self.slot(name)?;
        let mut current = slot.write().unwrap();
        let rebuilt = rebuild(&current)?;
        *current = Arc::new(rebuilt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};

    fn int_table() -> Table {
        let mut t = Table::new(0);
        t.add_column("a", DataType::Int32, false).unwrap();
        t
    }

    #[test]
    fn registry_is_case_sensitive_and_rejects_duplicates() {
        let storage = StorageManager::new();
        let t = int_table();
        storage.add_table("t", t.clone()).unwrap();
        assert!(storage.add_table("t", t.clone()).is_err());
        storage.add_table("T", t).unwrap();
        assert!(storage.has_table("t") && storage.has_table("T"));
        assert!(storage.get_table("u").is_err());
        storage.drop_table("T").unwrap();
        assert!(!storage.has_table("T"));
    }

    #[test]
    fn snapshots_survive_replacement() {
        let storage = StorageManager::new();
        storage.add_table("t", int_table()).unwrap();
        let before = storage.get_table("t").unwrap();
        storage
            .update_table("t", |old| {
                let mut next = old.clone();
                next.append(vec![Value::Int32(1)])?;
                Ok(next)
            })
            .unwrap();
        assert_eq!(before.row_count(), 0);
        assert_eq!(storage.get_table("t").unwrap().row_count(), 1);
    }

    #[test]
    fn updates_lock_per_table() {
        let storage = Arc::new(StorageManager::new());
        storage.add_table("a", int_table()).unwrap();
        storage.add_table("b", int_table()).unwrap();

        // While "a" is mutated, "b" stays freely readable and writable:
        // the rebuild closure for "a" runs inside b's update without
        // deadlocking on a registry-wide lock.
        storage
            .update_table("a", |old| {
                storage
                    .update_table("b", |other| {
                        let mut next = other.clone();
                        next.append(vec![Value::Int32(2)])?;
                        Ok(next)
                    })
                    .unwrap();
                assert_eq!(storage.get_table("b").unwrap().row_count(), 1);
                let mut next = old.clone();
                next.append(vec![Value::Int32(1)])?;
                Ok(next)
            })
            .unwrap();
        assert_eq!(storage.get_table("a").unwrap().row_count(), 1);
        assert_eq!(storage.get_table("b").unwrap().row_count(), 1);
    }
}
