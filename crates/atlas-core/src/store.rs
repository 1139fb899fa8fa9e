//! Store seam between the data provider and the relational backend.

use crate::error::{AtlasError, AtlasResult, ResultExt};
use crate::query::{SqlQuery, SqlValue, TABLE_NAME};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// One result row
pub type SqlRow = Vec<SqlValue>;

/// Executes compiled queries. Implementations must be safe to share; the
/// provider never issues overlapping queries itself.
pub trait CountryStore: Send + Sync {
    /// Run `query` to completion and return every row
    fn query(&self, query: &SqlQuery) -> AtlasResult<Vec<SqlRow>>;
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null | ValueRef::Blob(_) => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(r) => SqlValue::Real(r),
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Open an existing database read-only.
    ///
    /// A missing file or a database without a `country` table is a
    /// configuration error.
    pub fn open(path: impl AsRef<Path>) -> AtlasResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AtlasError::configuration(
                "store.path",
                format!("Country database not found at {}", path.display()),
            ));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|err| {
            AtlasError::configuration("store.path", format!("Failed to open {}: {err}", path.display()))
        })?;

        let has_table: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [TABLE_NAME],
                |row| row.get(0),
            )
            .map_err(|err| AtlasError::configuration("store.path", format!("Malformed database: {err}")))?;
        if has_table == 0 {
            return Err(AtlasError::configuration(
                "store.path",
                format!("Database {} has no '{TABLE_NAME}' table", path.display()),
            ));
        }

        info!(path = %path.display(), "Opened country store");
        Ok(Self { conn: Mutex::new(conn), location: path.display().to_string() })
    }

    /// Writable in-memory database, for fixtures and tests
    pub fn open_in_memory() -> AtlasResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| AtlasError::configuration("store.path", format!("In-memory store: {err}")))?;
        Ok(Self { conn: Mutex::new(conn), location: ":memory:".to_string() })
    }

    /// Run raw statements, used to load fixtures
    pub fn execute_batch(&self, sql: &str) -> AtlasResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(AtlasError::from).with_query_context("execute_batch", sql)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn lock(&self) -> AtlasResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AtlasError::store("lock", "Connection mutex poisoned"))
    }
}

impl CountryStore for SqliteStore {
    fn query(&self, query: &SqlQuery) -> AtlasResult<Vec<SqlRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query.sql).map_err(AtlasError::from).with_query_context("prepare", &query.sql)?;
        let column_count = stmt.column_count();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(query.params.iter()))
            .map_err(AtlasError::from)
            .with_query_context("query", &query.sql)?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for index in 0..column_count {
                cells.push(SqlValue::from(row.get_ref(index)?));
            }
            result.push(cells);
        }

        debug!(sql = %query.sql, rows = result.len(), "Executed store query");
        Ok(result)
    }
}
