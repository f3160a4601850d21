//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! over a single sqlx connection, and the `MySqlConnector` that opens one per
//! request.

use crate::config::Credentials;
use crate::db::{Connector, DatabaseClient, QueryResult, Row, Value};
use crate::error::{WikiError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Connection, MySql, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// A single MySQL connection.
pub struct MySqlClient {
    conn: Option<MySqlConnection>,
    query_timeout: Duration,
}

impl MySqlClient {
    /// Wraps an open connection.
    pub fn new(conn: MySqlConnection, query_timeout: Duration) -> Self {
        Self {
            conn: Some(conn),
            query_timeout,
        }
    }

    fn connection(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| WikiError::internal("Connection already closed"))
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let timeout = self.query_timeout;
        let conn = self.connection()?;
        let start = Instant::now();

        let rows = tokio::time::timeout(timeout, sqlx::query(sql).fetch_all(&mut *conn))
            .await
            .map_err(|_| timed_out(timeout))?
            .map_err(|e| WikiError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();
        debug!("Query returned {} rows in {:?}", rows.len(), execution_time);

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_rows(rows).with_execution_time(execution_time))
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let timeout = self.query_timeout;
        let conn = self.connection()?;

        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| bind_value(query, param));

        let row = tokio::time::timeout(timeout, query.fetch_optional(&mut *conn))
            .await
            .map_err(|_| timed_out(timeout))?
            .map_err(|e| WikiError::query(format_query_error(e)))?;

        Ok(row.as_ref().map(convert_row))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| WikiError::connection(format!("Failed to close connection: {e}")))?;
        }
        Ok(())
    }
}

/// Opens one MySQL connection per call.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(QUERY_TIMEOUT_SECS),
        )
    }
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration, query_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            query_timeout,
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn open(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn DatabaseClient>> {
        let mut options = MySqlConnectOptions::new()
            .host(address)
            .port(credentials.port)
            .username(&credentials.user)
            .database(&credentials.database);
        if let Some(password) = &credentials.password {
            options = options.password(password);
        }

        debug!("Connecting to {}", credentials.display_string(address));

        let conn = tokio::time::timeout(self.connect_timeout, MySqlConnection::connect_with(&options))
            .await
            .map_err(|_| {
                WikiError::connection(format!(
                    "Connection to {address}:{} timed out after {} seconds",
                    credentials.port,
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| map_connection_error(e, address, credentials))?;

        Ok(Box::new(MySqlClient::new(conn, self.query_timeout)))
    }
}

fn timed_out(timeout: Duration) -> WikiError {
    WikiError::query(format!(
        "Query timed out after {} seconds",
        timeout.as_secs()
    ))
}

/// Binds one parameter with the sqlx type matching its variant.
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::UInt(u) => query.bind(*u),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Timestamp(ts) => query.bind(*ts),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|col| {
            let value = convert_value(row, col.ordinal(), col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Unwraps a decoded column. Decode failures are logged and read as NULL.
fn decoded<T>(
    result: std::result::Result<Option<T>, sqlx::Error>,
    index: usize,
    type_name: &str,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("Failed to decode column {} ({}), returning NULL: {}", index, type_name, e);
            None
        }
    }
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => decoded(row.try_get::<Option<bool>, _>(index), index, type_name)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => decoded(row.try_get::<Option<i64>, _>(index), index, type_name)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => decoded(row.try_get::<Option<u64>, _>(index), index, type_name)
            .map(Value::UInt)
            .unwrap_or(Value::Null),

        "YEAR" => decoded(row.try_get_unchecked::<Option<u16>, _>(index), index, type_name)
            .map(|v| Value::UInt(v as u64))
            .unwrap_or(Value::Null),

        "FLOAT" => decoded(row.try_get::<Option<f32>, _>(index), index, type_name)
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => decoded(row.try_get::<Option<f64>, _>(index), index, type_name)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DATETIME" | "TIMESTAMP" => decoded(row.try_get::<Option<NaiveDateTime>, _>(index), index, type_name)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),

        "DATE" => decoded(row.try_get::<Option<NaiveDate>, _>(index), index, type_name)
            .map(Value::Date)
            .unwrap_or(Value::Null),

        "TIME" => decoded(row.try_get::<Option<NaiveTime>, _>(index), index, type_name)
            .map(Value::Time)
            .unwrap_or(Value::Null),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => decoded(row.try_get::<Option<Vec<u8>>, _>(index), index, type_name)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "BIT" => decoded(row.try_get_unchecked::<Option<Vec<u8>>, _>(index), index, type_name)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "NULL" => Value::Null,

        // DECIMAL, JSON, ENUM, SET and the character types arrive as text
        _ => decoded(
            row.try_get::<Option<String>, _>(index)
                .or_else(|_| row.try_get_unchecked::<Option<String>, _>(index)),
            index,
            type_name,
        )
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to operator-friendly messages.
fn map_connection_error(error: sqlx::Error, address: &str, credentials: &Credentials) -> WikiError {
    let port = credentials.port;
    let user = &credentials.user;
    let database = &credentials.database;

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        WikiError::connection(format!(
            "Cannot connect to {address}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        WikiError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        WikiError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        WikiError::connection(format!(
            "Connection to {address}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        WikiError::connection(error.to_string())
    }
}

/// Formats a query error with the server's error code if available.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR {}: {}", code, db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
