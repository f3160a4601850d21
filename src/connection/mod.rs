//! Database connection acquisition.
//!
//! Discovers the database address once per process and opens a fresh
//! connection for every request.

mod provider;
mod resolver;

pub use provider::ConnectionProvider;
pub use resolver::{AddressResolver, CommandResolver, FailingResolver, StaticResolver};
