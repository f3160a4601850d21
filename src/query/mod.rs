//! Query execution for the HTTP endpoints.
//!
//! Validates submitted SQL, runs it on a per-request connection, and
//! normalizes the rows for JSON output.

pub mod executor;
pub mod normalize;

pub use executor::{QueryExecutor, OUTDATED_PAGE_SQL};
pub use normalize::{normalize_row, normalize_rows, normalize_value};
