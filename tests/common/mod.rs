// ABOUTME: In-memory catalog and row streamer shared by the pipeline tests
// ABOUTME: Records every call so tests can assert on ordering and side effects

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clickhouse_transfer::catalog::{Catalog, VIEW_ENGINE};
use clickhouse_transfer::client::RowStreamer;
use clickhouse_transfer::error::TransferError;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// Call log shared between a catalog and a streamer
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub name: String,
    pub engine: String,
    pub ddl: String,
    pub rows: Vec<String>,
}

impl FakeTable {
    /// MergeTree table with `rows` numbered rows
    pub fn base(name: &str, rows: usize) -> Self {
        Self {
            name: name.to_string(),
            engine: "MergeTree".to_string(),
            ddl: format!(
                "CREATE TABLE shop.{} (id UInt64, label String) ENGINE = MergeTree ORDER BY id",
                name
            ),
            rows: (0..rows).map(|i| format!("{}\t{}_{}", i, name, i)).collect(),
        }
    }

    pub fn view(name: &str) -> Self {
        Self {
            name: name.to_string(),
            engine: VIEW_ENGINE.to_string(),
            ddl: format!("CREATE VIEW shop.{} AS SELECT id FROM shop.users", name),
            rows: Vec::new(),
        }
    }
}

/// TSV rendering of `rows`, one line each
pub fn tsv(rows: &[String]) -> String {
    rows.iter().map(|row| format!("{}\n", row)).collect()
}

/// Catalog backed by a fixed table list
pub struct FakeCatalog {
    pub tables: Vec<FakeTable>,
    pub events: EventLog,
    pub fail_list: bool,
    pub fail_count: HashSet<String>,
    pub fail_show_create: HashSet<String>,
    /// Any executed statement containing this marker fails
    pub fail_execute_containing: Option<String>,
    pub executed: Mutex<Vec<String>>,
    pub databases: Mutex<HashSet<String>>,
}

impl FakeCatalog {
    pub fn new(tables: Vec<FakeTable>, events: EventLog) -> Self {
        Self {
            tables,
            events,
            fail_list: false,
            fail_count: HashSet::new(),
            fail_show_create: HashSet::new(),
            fail_execute_containing: None,
            executed: Mutex::new(Vec::new()),
            databases: Mutex::new(HashSet::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn table(&self, table: &str, statement: &str) -> Result<&FakeTable> {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| {
                TransferError::query(statement, format!("unknown table {}", table)).into()
            })
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        self.record(format!("list:{}", database));
        if self.fail_list {
            return Err(TransferError::query("SHOW TABLES", "listing refused").into());
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn show_create_table(&self, _database: &str, table: &str) -> Result<String> {
        self.record(format!("show_create:{}", table));
        if self.fail_show_create.contains(table) {
            return Err(TransferError::query("SHOW CREATE TABLE", "access denied").into());
        }
        Ok(self.table(table, "SHOW CREATE TABLE")?.ddl.clone())
    }

    async fn count_rows(&self, _database: &str, table: &str) -> Result<u64> {
        self.record(format!("count:{}", table));
        if self.fail_count.contains(table) {
            return Err(TransferError::query("SELECT count()", "table is broken").into());
        }
        Ok(self.table(table, "SELECT count()")?.rows.len() as u64)
    }

    async fn table_engine(&self, _database: &str, table: &str) -> Result<String> {
        self.record(format!("engine:{}", table));
        Ok(self.table(table, "SELECT engine FROM system.tables")?.engine.clone())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        self.record(format!("execute:{}", statement));
        if let Some(marker) = &self.fail_execute_containing {
            if statement.contains(marker.as_str()) {
                return Err(TransferError::query(statement, "syntax error").into());
            }
        }

        if let Some(name) = statement.strip_prefix("CREATE DATABASE IF NOT EXISTS ") {
            self.databases
                .lock()
                .unwrap()
                .insert(name.trim_matches('`').to_string());
        } else if let Some(name) = statement.strip_prefix("CREATE DATABASE ") {
            let created = self
                .databases
                .lock()
                .unwrap()
                .insert(name.trim_matches('`').to_string());
            if !created {
                return Err(TransferError::query(statement, "database already exists").into());
            }
        }

        self.executed.lock().unwrap().push(statement.to_string());
        Ok(())
    }
}

/// Row streamer serving batches from in-memory rows and capturing inserts
pub struct FakeStreamer {
    pub source: BTreeMap<String, Vec<String>>,
    pub events: EventLog,
    /// (table, offset) of a batch that fails
    pub fail_batch: Option<(String, u64)>,
    pub fail_insert: HashSet<String>,
    pub inserted: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FakeStreamer {
    pub fn new(events: EventLog) -> Self {
        Self {
            source: BTreeMap::new(),
            events,
            fail_batch: None,
            fail_insert: HashSet::new(),
            inserted: Mutex::new(BTreeMap::new()),
        }
    }

    /// Streamer serving the rows of every table in `catalog`
    pub fn serving(catalog: &FakeCatalog) -> Self {
        let mut streamer = Self::new(catalog.events.clone());
        streamer.source = catalog
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.rows.clone()))
            .collect();
        streamer
    }

    pub fn inserted(&self, table: &str) -> Option<String> {
        self.inserted
            .lock()
            .unwrap()
            .get(table)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

/// Table, size and offset of a `SELECT * FROM db.t LIMIT n OFFSET o` query
pub fn parse_batch_query(query: &str) -> Option<(String, u64, u64)> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    match tokens.as_slice() {
        ["SELECT", "*", "FROM", target, "LIMIT", size, "OFFSET", offset] => Some((
            unqualified(target),
            size.parse().ok()?,
            offset.parse().ok()?,
        )),
        _ => None,
    }
}

fn parse_insert(statement: &str) -> Option<String> {
    let tokens: Vec<&str> = statement.split_whitespace().collect();
    match tokens.as_slice() {
        ["INSERT", "INTO", target, "FORMAT", "TSV"] => Some(unqualified(target)),
        _ => None,
    }
}

fn unqualified(target: &str) -> String {
    target
        .rsplit('.')
        .next()
        .unwrap_or(target)
        .trim_matches('`')
        .to_string()
}

impl RowStreamer for FakeStreamer {
    fn fetch_batch(&self, query: &str) -> Result<Vec<u8>> {
        let (table, size, offset) =
            parse_batch_query(query).ok_or_else(|| anyhow!("unexpected query: {}", query))?;
        self.record(format!("query:{}:{}:{}", table, offset, size));

        if self.fail_batch.as_ref() == Some(&(table.clone(), offset)) {
            return Err(TransferError::ExternalProcess {
                program: "fake-client".to_string(),
                reason: "exited with exit status: 60".to_string(),
                source: None,
            }
            .into());
        }

        let rows = self.source.get(&table).cloned().unwrap_or_default();
        let batch: Vec<String> = rows
            .into_iter()
            .skip(offset as usize)
            .take(size as usize)
            .collect();
        Ok(tsv(&batch).into_bytes())
    }

    fn stream_insert(&self, insert: &str, mut source: File) -> Result<()> {
        let table = parse_insert(insert).ok_or_else(|| anyhow!("unexpected insert: {}", insert))?;
        self.record(format!("insert:{}", table));

        if self.fail_insert.contains(&table) {
            return Err(TransferError::ExternalProcess {
                program: "fake-client".to_string(),
                reason: "exited with exit status: 27".to_string(),
                source: None,
            }
            .into());
        }

        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        self.inserted
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .extend(bytes);
        Ok(())
    }
}
