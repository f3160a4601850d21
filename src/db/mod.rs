//! Database abstraction layer for the wiki assistant.
//!
//! Provides a trait-based interface for a single database connection, and
//! for opening one, so the MySQL backend and in-memory mocks can be used
//! interchangeably.

mod mock;
mod mysql;
mod types;

pub use mock::{ConnectionStats, MockConnector, MockDatabaseClient};
pub use mysql::{MySqlClient, MySqlConnector};
pub use types::{format_iso_datetime, QueryResult, Row, Value};

use crate::config::Credentials;
use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for one open database connection.
///
/// All database operations are async and return Results with WikiError.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a SQL query and returns all of its rows.
    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Executes a parameterized query and returns its first row, if any.
    async fn fetch_optional(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Closes the database connection.
    ///
    /// Calling this more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens database connections to a resolved address.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a fresh connection to `address` with `credentials`.
    async fn open(&self, address: &str, credentials: &Credentials)
        -> Result<Box<dyn DatabaseClient>>;
}
