//! Query execution with statement validation.
//!
//! Every operation opens its own connection and closes it before returning,
//! on success and on failure alike.

use std::sync::Arc;

use tracing::{debug, info};

use crate::connection::ConnectionProvider;
use crate::db::{Row, Value};
use crate::error::{WikiError, Result};
use crate::query::normalize::{normalize_row, normalize_rows};
use crate::safety::SqlValidator;

/// Looks up the outdated page recorded for a category.
pub const OUTDATED_PAGE_SQL: &str = "SELECT * FROM categoryoutdated WHERE category = ?";

/// Runs read-only queries against the wiki database.
pub struct QueryExecutor {
    validator: SqlValidator,
    provider: Arc<ConnectionProvider>,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self {
            validator: SqlValidator::new(),
            provider,
        }
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Runs a caller-supplied statement if it is a single SELECT.
    ///
    /// Rejected statements never reach the database: no address lookup and
    /// no connection happen for them.
    pub async fn execute_sql(&self, sql: &str) -> Result<Vec<Row>> {
        let query = self.validator.validate(sql).map_err(|rejection| {
            info!("Rejected query: {}", rejection);
            WikiError::from(rejection)
        })?;

        let mut conn = self.provider.acquire().await?;
        let outcome = conn.execute_query(query.sql()).await;
        self.provider.release(conn).await;

        let result = outcome?;
        debug!(
            "Query returned {} rows in {:?}",
            result.row_count(),
            result.execution_time
        );

        Ok(normalize_rows(result.rows))
    }

    /// Returns the first outdated-page row for `category`.
    pub async fn outdated_page(&self, category: &str) -> Result<Row> {
        let params = [Value::Bytes(category.as_bytes().to_vec())];

        let mut conn = self.provider.acquire().await?;
        let outcome = conn.fetch_optional(OUTDATED_PAGE_SQL, &params).await;
        self.provider.release(conn).await;

        match outcome? {
            Some(row) => Ok(normalize_row(row)),
            None => Err(WikiError::not_found(category)),
        }
    }
}
