//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::db::Row;

/// Body of `POST /execute-sql`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteSqlRequest {
    pub query: String,
}

/// Query string of `GET /outdated-page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutdatedPageQuery {
    pub category: String,
}

/// Every row of a query, in order.
#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub result: Vec<Row>,
}

/// A single row.
#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub result: Row,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
