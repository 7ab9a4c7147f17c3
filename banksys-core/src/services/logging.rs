//! Event log - session and sync events in logs.duckdb
//!
//! Only event names, slice names, command names and error kinds/messages are
//! stored: never tokens, CPFs, names, balances or amounts.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::log_migrations::LOG_MIGRATIONS;

/// File name of the event log inside the banksys directory
pub const LOG_DB_FILE: &str = "logs.duckdb";

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Which front end produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Embedded,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Embedded => "embedded",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Error kind (`auth`, `network`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            slice: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Set the snapshot slice the event concerns
    pub fn with_slice(mut self, slice: impl Into<String>) -> Self {
        self.slice = Some(slice.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub slice: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Which entries a listing returns, newest first
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub event: Option<String>,
    pub slice: Option<String>,
    /// Only entries that carry an error
    pub failures_only: bool,
    pub limit: usize,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            event: None,
            slice: None,
            failures_only: false,
            limit: 50,
        }
    }
}

/// Number of failures recorded for one event and slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCount {
    pub event: String,
    pub slice: Option<String>,
    pub count: u64,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
     event, slice, command, error_message, error_details";

fn read_entry(row: &duckdb::Row<'_>) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        slice: row.get(6)?,
        command: row.get(7)?,
        error_message: row.get(8)?,
        error_details: row.get(9)?,
    })
}

/// Bring the schema up to date. The bookkeeping migration runs every time.
fn migrate(conn: &Connection) -> Result<()> {
    let mut migrations = LOG_MIGRATIONS.iter();
    if let Some((_, bookkeeping)) = migrations.next() {
        conn.execute_batch(bookkeeping)?;
    }

    for (name, sql) in migrations {
        let applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sys_migrations WHERE migration_name = ?",
            [name],
            |row| row.get(0),
        )?;
        if applied {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        debug!(migration = name, "event log migrated");
    }
    Ok(())
}

/// Structured event log shared by the session manager, the cache and the CLI
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open or create the event log in `banksys_dir`
    pub fn new(
        banksys_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        std::fs::create_dir_all(banksys_dir)?;
        let db_path = banksys_dir.join(LOG_DB_FILE);
        let conn = Connection::open(&db_path)?;
        migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event, stamped with this service's entry point and version
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_logs (timestamp, entry_point, app_version, platform, \
             event, slice, command, error_message, error_details) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.slice,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    /// Entries matching `filter`, newest first
    pub fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<&dyn ToSql> = Vec::new();

        if let Some(event) = &filter.event {
            clauses.push("event = ?");
            params.push(event);
        }
        if let Some(slice) = &filter.slice {
            clauses.push("slice = ?");
            params.push(slice);
        }
        if filter.failures_only {
            clauses.push("error_message IS NOT NULL");
        }
        params.push(&limit);

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM sys_logs{} ORDER BY id DESC LIMIT ?",
            ENTRY_COLUMNS, where_clause
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params.as_slice(), read_entry)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Failures grouped by event and slice, most frequent first
    pub fn failure_counts(&self) -> Result<Vec<FailureCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event, slice, COUNT(*) AS n FROM sys_logs \
             WHERE error_message IS NOT NULL \
             GROUP BY event, slice ORDER BY n DESC, event, slice",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(FailureCount {
                    event: row.get(0)?,
                    slice: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(counts)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete entries older than `timestamp_ms`; returns how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn service(dir: &Path) -> LoggingService {
        LoggingService::new(dir, EntryPoint::Cli, "0.1.0").unwrap()
    }

    fn refresh_failed(slice: &str, kind: &str) -> LogEvent {
        LogEvent::new("refresh_failed")
            .with_slice(slice)
            .with_error("Network error: timed out")
            .with_error_details(kind)
    }

    #[test]
    fn test_reopen_keeps_entries_and_schema() {
        let dir = tempdir().unwrap();
        {
            let log = service(dir.path());
            assert!(log.db_path().exists());
            log.log(LogEvent::new("logout")).unwrap();
        }
        let log = service(dir.path());
        log.log(LogEvent::new("login_succeeded")).unwrap();
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_entries_carry_entry_point_and_slice() {
        let dir = tempdir().unwrap();
        let log = LoggingService::new(dir.path(), EntryPoint::Embedded, "0.2.0").unwrap();
        log.log(refresh_failed("credit_cards", "network").with_command("cards"))
            .unwrap();

        let entries = log.query(&LogFilter::default()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.event, "refresh_failed");
        assert_eq!(entry.slice.as_deref(), Some("credit_cards"));
        assert_eq!(entry.command.as_deref(), Some("cards"));
        assert_eq!(entry.entry_point, "embedded");
        assert_eq!(entry.app_version, "0.2.0");
        assert_eq!(entry.platform, std::env::consts::OS);
        assert!(entry.is_failure());
    }

    #[test]
    fn test_query_filters_by_event_slice_and_failure() {
        let dir = tempdir().unwrap();
        let log = service(dir.path());
        log.log(LogEvent::new("login_succeeded")).unwrap();
        log.log(refresh_failed("balance", "network")).unwrap();
        log.log(refresh_failed("transactions", "server")).unwrap();
        log.log(
            LogEvent::new("login_failed")
                .with_error("Invalid CPF or password")
                .with_error_details("auth"),
        )
        .unwrap();

        let all = log.query(&LogFilter::default()).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].event, "login_failed");

        let failures = log
            .query(&LogFilter { failures_only: true, ..LogFilter::default() })
            .unwrap();
        assert_eq!(failures.len(), 3);

        let balance = log
            .query(&LogFilter {
                event: Some("refresh_failed".to_string()),
                slice: Some("balance".to_string()),
                ..LogFilter::default()
            })
            .unwrap();
        assert_eq!(balance.len(), 1);
        assert_eq!(balance[0].error_details.as_deref(), Some("network"));

        let limited = log.query(&LogFilter { limit: 2, ..LogFilter::default() }).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_failure_counts_group_by_event_and_slice() {
        let dir = tempdir().unwrap();
        let log = service(dir.path());
        log.log(refresh_failed("balance", "network")).unwrap();
        log.log(refresh_failed("balance", "network")).unwrap();
        log.log(refresh_failed("credit_cards", "auth")).unwrap();
        log.log(LogEvent::new("logout")).unwrap();

        let counts = log.failure_counts().unwrap();
        assert_eq!(
            counts,
            vec![
                FailureCount {
                    event: "refresh_failed".to_string(),
                    slice: Some("balance".to_string()),
                    count: 2,
                },
                FailureCount {
                    event: "refresh_failed".to_string(),
                    slice: Some("credit_cards".to_string()),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_delete_before() {
        let dir = tempdir().unwrap();
        let log = service(dir.path());
        log.log(LogEvent::new("login_succeeded")).unwrap();
        log.log(LogEvent::new("logout")).unwrap();

        assert_eq!(log.delete_before(0).unwrap(), 0);
        assert_eq!(log.delete_before(now_ms() + 1000).unwrap(), 2);
        assert_eq!(log.count().unwrap(), 0);
    }
}
