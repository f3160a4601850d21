//! Mock database connections for testing.
//!
//! Provides an in-memory connector and client that serve canned rows and
//! count connection lifecycle events.

use super::{Connector, DatabaseClient, QueryResult, Row, Value};
use crate::config::Credentials;
use crate::error::{WikiError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lifecycle counters shared by a mock connector and its clients.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    queries: AtomicUsize,
    addresses: Mutex<Vec<String>>,
}

impl ConnectionStats {
    /// Connections successfully opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Connections explicitly closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Queries executed across all connections.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Opened connections that were never closed.
    pub fn leaked(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    /// Addresses connections were opened against, in order.
    pub fn addresses(&self) -> Vec<String> {
        self.addresses
            .lock()
            .map(|addresses| addresses.clone())
            .unwrap_or_default()
    }
}

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    rows: Vec<Row>,
    query_error: Option<String>,
    stats: Arc<ConnectionStats>,
    closed: bool,
}

impl MockDatabaseClient {
    /// Creates a mock client with no rows.
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Creates a mock client whose queries return `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            query_error: None,
            stats: Arc::new(ConnectionStats::default()),
            closed: false,
        }
    }

    /// Creates a mock client whose queries fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            query_error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Lifecycle counters for this client.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    fn record_query(&self) -> Result<()> {
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        match &self.query_error {
            Some(message) => Err(WikiError::query(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&mut self, _sql: &str) -> Result<QueryResult> {
        self.record_query()?;

        Ok(QueryResult::with_rows(self.rows.clone())
            .with_execution_time(Duration::from_millis(1)))
    }

    /// Returns the first row whose first column equals the first parameter.
    async fn fetch_optional(&mut self, _sql: &str, params: &[Value]) -> Result<Option<Row>> {
        self.record_query()?;

        let row = match params.first() {
            Some(param) => self.rows.iter().find(|row| {
                row.iter()
                    .next()
                    .is_some_and(|(_, value)| values_match(value, param))
            }),
            None => self.rows.first(),
        };

        Ok(row.cloned())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Text and binary values compare by their bytes.
fn values_match(stored: &Value, param: &Value) -> bool {
    match (stored, param) {
        (Value::Text(s), Value::Bytes(b)) | (Value::Bytes(b), Value::Text(s)) => {
            s.as_bytes() == b.as_slice()
        }
        _ => stored == param,
    }
}

/// A connector that hands out mock clients sharing one set of counters.
pub struct MockConnector {
    rows: Vec<Row>,
    query_error: Option<String>,
    connect_error: Option<String>,
    stats: Arc<ConnectionStats>,
}

impl MockConnector {
    /// Connections serve `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            query_error: None,
            connect_error: None,
            stats: Arc::new(ConnectionStats::default()),
        }
    }

    /// Connections open, but every query fails with `message`.
    pub fn failing_queries(message: impl Into<String>) -> Self {
        Self {
            query_error: Some(message.into()),
            ..Self::with_rows(Vec::new())
        }
    }

    /// Every connection attempt fails with `message`.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Self::with_rows(Vec::new())
        }
    }

    /// Lifecycle counters for every connection this connector opened.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        address: &str,
        _credentials: &Credentials,
    ) -> Result<Box<dyn DatabaseClient>> {
        if let Some(message) = &self.connect_error {
            return Err(WikiError::connection(message.clone()));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut addresses) = self.stats.addresses.lock() {
            addresses.push(address.to_string());
        }

        Ok(Box::new(MockDatabaseClient {
            rows: self.rows.clone(),
            query_error: self.query_error.clone(),
            stats: Arc::clone(&self.stats),
            closed: false,
        }))
    }
}
