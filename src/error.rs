//! Error types for the wiki assistant.
//!
//! Defines the main error enum used throughout the service.

use thiserror::Error;

/// Main error type for wiki assistant operations.
#[derive(Error, Debug)]
pub enum WikiError {
    /// The submitted text is not SQL, or contains no statement at all.
    #[error("Invalid SQL query")]
    InvalidQuery,

    /// The submitted SQL is more than one statement, or not a SELECT.
    #[error("Rejected statement: {0}")]
    NotSelect(String),

    /// A lookup matched no row.
    #[error("No outdated page found for category: {category}")]
    NotFound { category: String },

    /// The database endpoint could not be discovered.
    #[error("Address resolution error: {0}")]
    AddressResolution(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (unknown table, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (missing required settings, invalid config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WikiError {
    /// Creates a rejection for a statement that is not a single SELECT.
    pub fn not_select(msg: impl Into<String>) -> Self {
        Self::NotSelect(msg.into())
    }

    /// Creates a not-found error for the given category.
    pub fn not_found(category: impl Into<String>) -> Self {
        Self::NotFound {
            category: category.into(),
        }
    }

    /// Creates an address resolution error with the given message.
    pub fn address_resolution(msg: impl Into<String>) -> Self {
        Self::AddressResolution(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidQuery | Self::NotSelect(_) => "Validation Error",
            Self::NotFound { .. } => "Not Found",
            Self::AddressResolution(_) => "Address Resolution Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery | Self::NotSelect(_) | Self::NotFound { .. }
        )
    }
}

/// Result type alias using WikiError.
pub type Result<T> = std::result::Result<T, WikiError>;
