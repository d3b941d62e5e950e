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

mod prompt;
mod validator;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use nu_ansi_term::Color;
use reedline::{FileBackedHistory, Reedline, Signal};

use stoa::{ChunkEncoding, Value};
use stoa_sql::{ExecResult, QueryResult, Session, SqlError};

use prompt::SqlPrompt;
use validator::SqlValidator;

#[derive(Parser)]
#[command(name = "stoa", version, about = "Columnar in-memory SQL engine")]
struct Args {
    /// Execute a single SQL statement and exit
    query: Option<String>,
    /// Execute SQL statements from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Show statement execution time
    #[arg(short, long)]
    timer: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut session = Session::new();

    if let Some(file) = &args.file {
        run_script(&mut session, file, args.timer);
        if args.query.is_none() {
            return;
        }
    }

    if let Some(query) = &args.query {
        match session.execute(query) {
            Ok(result) => print_exec_result(result),
            Err(e) => {
                eprintln!("{}", Color::Red.paint(format!("error: {e}")));
                std::process::exit(1);
            }
        }
        return;
    }

    run_repl(session, args.timer);
}

fn run_script(session: &mut Session, path: &PathBuf, timer: bool) {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("error reading {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    for statement in contents.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        let start = Instant::now();
        match session.execute(sql) {
            Ok(result) => {
                print_exec_result(result);
                if timer {
                    eprintln!("time: {:.3}s", start.elapsed().as_secs_f64());
                }
            }
            Err(e) => eprintln!("{}", Color::Red.paint(format!("error: {e}"))),
        }
    }
}

fn run_repl(mut session: Session, mut timer: bool) {
    println!(
        "{} {} in-memory columnar SQL. Statements end with ';', {} lists commands.",
        Color::Cyan.bold().paint("stoa"),
        env!("CARGO_PKG_VERSION"),
        Color::Cyan.paint(".help"),
    );

    let mut editor = Reedline::create().with_validator(Box::new(SqlValidator));
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".stoa_history");
        if let Ok(history) = FileBackedHistory::with_file(500, path) {
            editor = editor.with_history(Box::new(history));
        }
    }

    loop {
        match editor.read_line(&SqlPrompt) {
            Ok(Signal::Success(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with('.') {
                    if !run_dot_command(&mut session, trimmed, &mut timer) {
                        break;
                    }
                    continue;
                }
                let sql = trimmed.trim_end_matches(';').trim();
                if sql.is_empty() {
                    continue;
                }
                let start = Instant::now();
                match session.execute(sql) {
                    Ok(result) => {
                        print_exec_result(result);
                        if timer {
                            eprintln!("time: {:.3}s", start.elapsed().as_secs_f64());
                        }
                    }
                    Err(e) => eprintln!("{}", Color::Red.paint(format!("error: {e}"))),
                }
            }
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => break,
            Err(e) => {
                eprintln!("input error: {e}");
                break;
            }
        }
    }
}

/// Returns false when the REPL should exit.
fn run_dot_command(session: &mut Session, command: &str, timer: &mut bool) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        ".quit" | ".exit" => return false,
        ".help" => {
            println!(".tables              list stored tables");
            println!(".schema <table>      show a table's columns");
            println!(".compress <table> [dict|rle]   re-encode sealed chunks");
            println!(".timer               toggle statement timing");
            println!(".quit                leave the shell");
        }
        ".timer" => {
            *timer = !*timer;
            println!("timer {}", if *timer { "on" } else { "off" });
        }
        ".tables" => match session.execute("SHOW TABLES") {
            Ok(result) => print_exec_result(result),
            Err(e) => eprintln!("error: {e}"),
        },
        ".schema" => match parts.next() {
            Some(table) => match session.execute(&format!("SHOW COLUMNS FROM {table}")) {
                Ok(result) => print_exec_result(result),
                Err(e) => eprintln!("error: {e}"),
            },
            None => eprintln!("usage: .schema <table>"),
        },
        ".compress" => {
            let Some(table) = parts.next() else {
                eprintln!("usage: .compress <table> [dict|rle]");
                return true;
            };
            let encoding = match parts.next() {
                None | Some("dict") => ChunkEncoding::Dictionary,
                Some("rle") => ChunkEncoding::RunLength,
                Some(other) => {
                    eprintln!("unknown encoding \"{other}\" (expected dict or rle)");
                    return true;
                }
            };
            match compress_table(session, table, encoding) {
                Ok(encoded) => println!("re-encoded {encoded} chunk(s) of \"{table}\""),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        other => eprintln!("unknown command {other} (try .help)"),
    }
    true
}

fn compress_table(
    session: &Session,
    table: &str,
    encoding: ChunkEncoding,
) -> Result<usize, SqlError> {
    let mut encoded = 0;
    session.storage().update_table(table, |current| {
        let mut next = current.clone();
        for chunk_id in 0..next.chunk_count() as u32 {
            // Already-encoded chunks are left alone.
            if next.compress_chunk(chunk_id, encoding).is_ok() {
                encoded += 1;
            }
        }
        Ok(next)
    })?;
    Ok(encoded)
}

fn print_exec_result(result: ExecResult) {
    match result {
        ExecResult::Ddl(message) => println!("{message}"),
        ExecResult::Query(result) => print_table(&result),
    }
}

fn print_table(result: &QueryResult) {
    let rows = collect_rows(result);
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &width)| format!("{name:width$}"))
        .collect();
    println!("{}", Color::Cyan.paint(header.join("  ")));
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:width$}"))
            .collect();
        println!("{}", line.join("  "));
    }
    println!(
        "({} row{})",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );
}

fn collect_rows(result: &QueryResult) -> Vec<Vec<String>> {
    let table = &result.table;
    let mut rows = Vec::with_capacity(table.row_count());
    for chunk in table.chunks() {
        for row in 0..chunk.size() {
            rows.push(
                (0..table.column_count())
                    .map(|c| match chunk.column(c as u16).get(row) {
                        Value::Null => "NULL".to_string(),
                        value => value.to_string(),
                    })
                    .collect(),
            );
        }
    }
    rows
}
