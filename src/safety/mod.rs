//! Query admission module.
//!
//! Parses submitted SQL and decides whether it may reach the database:
//! only a single, top-level SELECT statement is admitted.

mod lexer;
mod parser;

pub use parser::{validate_sql, SqlValidator};

use std::fmt;

use crate::error::WikiError;

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Replace,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    Values,
    Table,
    /// Statement type could not be determined.
    Unknown,
}

impl StatementType {
    /// Returns true for statements that only read rows.
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Values => write!(f, "VALUES"),
            Self::Table => write!(f, "TABLE"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Why a query was refused admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    /// No statement could be read from the input.
    Invalid,
    /// More than one statement was submitted.
    MultipleStatements(usize),
    /// The single statement is not a SELECT.
    NotSelect(StatementType),
}

impl QueryRejection {
    /// Returns the client-facing message for this rejection.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Invalid => "Invalid SQL query.",
            Self::MultipleStatements(_) | Self::NotSelect(_) => "Only SELECT queries are allowed.",
        }
    }
}

impl fmt::Display for QueryRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "no SQL statement found"),
            Self::MultipleStatements(count) => write!(f, "{count} statements submitted"),
            Self::NotSelect(kind) => write!(f, "{kind} statement submitted"),
        }
    }
}

impl From<QueryRejection> for WikiError {
    fn from(rejection: QueryRejection) -> Self {
        match rejection {
            QueryRejection::Invalid => WikiError::InvalidQuery,
            other => WikiError::not_select(other.to_string()),
        }
    }
}

/// A query that passed admission: exactly one SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    sql: String,
}

impl ValidatedQuery {
    pub(crate) fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// The statement text to send to the database, without trailing terminators.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}
