//! Wiki assistant - read-only SQL access to the wiki database over HTTP.
//!
//! This library exposes the core modules for use in integration tests.

pub mod api;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod safety;
