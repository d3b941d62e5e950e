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

//! Physical operators: consume tables, emit tables.
//!
//! Operators form a tree; `execute` runs children first and materializes
//! one result table. Reference-preserving operators (scan, sort, limit,
//! set union, joins) emit `References` tables addressing base data
//! through shared position lists; projection and aggregation materialize
//! `Data` tables. Cancellation is cooperative: operators poll the
//! context's token between chunks.

mod aggregate;
mod delete;
mod dummy_table;
mod eval;
mod get_table;
mod insert;
mod join;
mod limit;
mod projection;
mod set_union;
mod sort;
mod table_scan;
mod update;
mod validate;
mod view;

pub use aggregate::{Aggregate, AggregateSpec};
pub use delete::Delete;
pub use dummy_table::DummyTable;
pub use get_table::GetTable;
pub use insert::Insert;
pub use join::{HashJoin, NestedLoopJoin};
pub use limit::Limit;
pub use projection::Projection;
pub use set_union::SetUnion;
pub use sort::Sort;
pub use table_scan::TableScan;
pub use update::Update;
pub use validate::Validate;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::storage::StorageManager;
use crate::table::Table;
use crate::types::Value;
use crate::{Result, StoaError};

/// Cooperative cancellation handle shared between a query and its
/// issuer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out of the current operator if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StoaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything an operator needs besides its inputs.
#[derive(Clone)]
pub struct ExecutionContext {
    pub storage: Arc<StorageManager>,
    pub cancel: CancelToken,
}

impl ExecutionContext {
    pub fn new(storage: Arc<StorageManager>) -> ExecutionContext {
        ExecutionContext {
            storage,
            cancel: CancelToken::new(),
        }
    }
}

/// The common operator surface. Operators are shared across worker
/// threads while their chunks are processed in parallel.
pub trait PhysicalOperator: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> String {
        self.name().to_string()
    }

    fn num_in_tables(&self) -> usize;

    fn num_out_tables(&self) -> usize {
        1
    }

    /// Rebuild the operator tree with positional parameter values bound
    /// in place of placeholders; used by prepared statements.
    fn recreate(&self, params: &[Value]) -> Box<dyn PhysicalOperator>;

    /// Run children, then materialize this operator's result table.
    fn execute(&self, ctx: &ExecutionContext) -> Result<Arc<Table>>;
}
