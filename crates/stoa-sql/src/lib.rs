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

//! stoa-sql: SQL front-end for the stoa engine.
//!
//! SQL text is parsed by `sqlparser`, translated into a logical query
//! plan, and lowered into a physical operator pipeline. A `Session`
//! owns a storage manager and handles DDL (CREATE/DROP TABLE) at its
//! own layer.

pub mod lqp;
pub mod pipeline;
pub mod translator;

use std::sync::Arc;

use sqlparser::ast::{ColumnOption, CreateTable, ObjectType, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use stoa::operators::ExecutionContext;
use stoa::types::{ColumnId, DataType, Value};
use stoa::{StoaError, StorageManager, Table};

use crate::lqp::{LogicalPlan, LqpNodeKind, ShowKind};
use crate::pipeline::build_operators;
use crate::translator::SqlTranslator;

/// Errors produced by the SQL layer.
#[derive(Debug)]
pub enum SqlError {
    /// SQL syntax error from the parser.
    Parse(String),
    /// Translation error: unresolved name, unsupported construct.
    Translate(String),
    /// Engine execution error.
    Engine(StoaError),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(msg) => write!(f, "SQL parse error: {msg}"),
            SqlError::Translate(msg) => write!(f, "SQL translation error: {msg}"),
            SqlError::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for SqlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SqlError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoaError> for SqlError {
    fn from(err: StoaError) -> SqlError {
        SqlError::Engine(err)
    }
}

/// Result of a query that produced a table.
pub struct QueryResult {
    pub table: Arc<Table>,
    /// Column names as they appear in the SELECT list.
    pub columns: Vec<String>,
}

/// Result of executing one SQL statement.
pub enum ExecResult {
    Query(QueryResult),
    /// DDL and mutations report a status message.
    Ddl(String),
}

const DEFAULT_CHUNK_SIZE: u32 = 65_535;

/// A stateful SQL session: a storage manager plus execution settings.
pub struct Session {
    storage: Arc<StorageManager>,
    /// Wrap stored-table reads in Validate nodes so queries only see
    /// committed rows.
    validate: bool,
    chunk_size: u32,
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Session {
        Session::with_storage(Arc::new(StorageManager::new()))
    }

    pub fn with_storage(storage: Arc<StorageManager>) -> Session {
        Session {
            storage,
            validate: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn set_chunk_size(&mut self, chunk_size: u32) {
        self.chunk_size = chunk_size;
    }

    /// Execute one SQL statement.
    pub fn execute(&mut self, sql: &str) -> Result<ExecResult, SqlError> {
        let dialect = GenericDialect {};
        let statements =
            Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
        let statement = statements
            .into_iter()
            .next()
            .ok_or_else(|| SqlError::Parse("empty statement".into()))?;
        debug!(%statement, "execute");

        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::Drop {
                object_type: ObjectType::Table,
                names,
                if_exists,
                ..
            } => self.drop_tables(&names, if_exists),
            other => self.run_statement(&other),
        }
    }

    fn run_statement(&self, statement: &Statement) -> Result<ExecResult, SqlError> {
        let mut plan = LogicalPlan::new();
        let translator = SqlTranslator::new(&self.storage, self.validate);
        let root = translator.translate_statement(statement, &mut plan)?;

        if let LqpNodeKind::Show { kind } = &plan.node(root).kind {
            return self.execute_show(kind, &plan, root);
        }

        let operator = build_operators(&plan, root)?;
        let ctx = ExecutionContext::new(self.storage.clone());
        let result = operator.execute(&ctx)?;

        match &plan.node(root).kind {
            LqpNodeKind::Insert { table } => Ok(ExecResult::Ddl(format!(
                "{} row(s) inserted into \"{table}\"",
                result.row_count()
            ))),
            LqpNodeKind::Update { table, .. } => Ok(ExecResult::Ddl(format!(
                "{} row(s) updated in \"{table}\"",
                result.row_count()
            ))),
            LqpNodeKind::Delete { table } => Ok(ExecResult::Ddl(format!(
                "{} row(s) deleted from \"{table}\"",
                result.row_count()
            ))),
            _ => Ok(ExecResult::Query(QueryResult {
                table: result,
                columns: plan.output_column_names(root),
            })),
        }
    }

    fn execute_show(
        &self,
        kind: &ShowKind,
        plan: &LogicalPlan,
        root: lqp::NodeId,
    ) -> Result<ExecResult, SqlError> {
        let columns = plan.output_column_names(root);
        let mut table = Table::new(0);
        match kind {
            ShowKind::Tables => {
                table.add_column("table_name", DataType::Text, false)?;
                for name in self.storage.table_names() {
                    table.append(vec![Value::Text(name)])?;
                }
            }
            ShowKind::Columns(name) => {
                table.add_column("column_name", DataType::Text, false)?;
                table.add_column("column_type", DataType::Text, false)?;
                table.add_column("nullable", DataType::Text, false)?;
                let shown = self.storage.get_table(name)?;
                for id in 0..shown.column_count() {
                    let id = id as ColumnId;
                    table.append(vec![
                        Value::Text(shown.column_name(id).to_string()),
                        Value::Text(shown.column_type(id).name().to_string()),
                        Value::Text(
                            if shown.column_is_nullable(id) { "yes" } else { "no" }.to_string(),
                        ),
                    ])?;
                }
            }
        }
        Ok(ExecResult::Query(QueryResult {
            table: Arc::new(table),
            columns,
        }))
    }

    fn create_table(&mut self, create: CreateTable) -> Result<ExecResult, SqlError> {
        let name = create
            .name
            .0
            .iter()
            .map(|ident| ident.value.clone())
            .collect::<Vec<_>>()
            .join(".");
        if self.storage.has_table(&name) {
            if create.if_not_exists {
                return Ok(ExecResult::Ddl(format!(
                    "table \"{name}\" already exists (skipped)"
                )));
            }
            if create.or_replace {
                self.storage.drop_table(&name)?;
            } else {
                return Err(SqlError::Translate(format!(
                    "a table named \"{name}\" already exists"
                )));
            }
        }

        let table = if let Some(query) = &create.query {
            // CREATE TABLE AS SELECT: materialize the query result.
            let result = match self.run_statement(&Statement::Query(query.clone()))? {
                ExecResult::Query(result) => result,
                ExecResult::Ddl(_) => unreachable!("a query produces a result set"),
            };
            let mut table = Table::new(self.chunk_size);
            for (column, &data_type) in result.columns.iter().zip(result.table.column_types()) {
                table.add_column(column, data_type, true)?;
            }
            for chunk in result.table.chunks() {
                for row in 0..chunk.size() {
                    let values = (0..result.table.column_count())
                        .map(|c| chunk.column(c as ColumnId).get(row))
                        .collect();
                    table.append(values)?;
                }
            }
            table
        } else {
            if create.columns.is_empty() {
                return Err(SqlError::Translate(
                    "CREATE TABLE requires a column list or AS SELECT".into(),
                ));
            }
            let mut table = Table::new(self.chunk_size);
            for column in &create.columns {
                let data_type = map_sql_type(&column.data_type)?;
                let not_null = column
                    .options
                    .iter()
                    .any(|option| matches!(option.option, ColumnOption::NotNull));
                table.add_column(&column.name.value, data_type, !not_null)?;
            }
            table
        };

        let rows = table.row_count();
        self.storage.add_table(&name, table)?;
        Ok(ExecResult::Ddl(format!(
            "created table \"{name}\" ({rows} rows)"
        )))
    }

    fn drop_tables(
        &mut self,
        names: &[sqlparser::ast::ObjectName],
        if_exists: bool,
    ) -> Result<ExecResult, SqlError> {
        let mut messages = Vec::new();
        for name in names {
            let name = name
                .0
                .iter()
                .map(|ident| ident.value.clone())
                .collect::<Vec<_>>()
                .join(".");
            if self.storage.has_table(&name) {
                self.storage.drop_table(&name)?;
                messages.push(format!("dropped table \"{name}\""));
            } else if if_exists {
                messages.push(format!("table \"{name}\" not found (skipped)"));
            } else {
                return Err(SqlError::Translate(format!("no table named \"{name}\"")));
            }
        }
        Ok(ExecResult::Ddl(messages.join("\n")))
    }
}

fn map_sql_type(data_type: &sqlparser::ast::DataType) -> Result<DataType, SqlError> {
    use sqlparser::ast::DataType as SqlType;
    match data_type {
        SqlType::Int(_) | SqlType::Integer(_) => Ok(DataType::Int32),
        SqlType::BigInt(_) => Ok(DataType::Int64),
        SqlType::Real | SqlType::Float4 => Ok(DataType::Float32),
        SqlType::Double | SqlType::DoublePrecision | SqlType::Float8 => Ok(DataType::Float64),
        SqlType::Float(_) => Ok(DataType::Float64),
        SqlType::Text | SqlType::String(_) | SqlType::Varchar(_) | SqlType::Char(_) => {
            Ok(DataType::Text)
        }
        other => Err(SqlError::Translate(format!(
            "unsupported column type: {other}"
        ))),
    }
}
