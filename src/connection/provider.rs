//! Per-request connection provider with a lazily resolved address.

use super::{AddressResolver, CommandResolver, StaticResolver};
use crate::config::{Config, Credentials};
use crate::db::{Connector, DatabaseClient, MySqlConnector};
use crate::error::{WikiError, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Opens one database connection per request.
///
/// The address is resolved on first use and shared by every later request.
/// A failed resolution is not remembered, so the next request tries again.
pub struct ConnectionProvider {
    resolver: Arc<dyn AddressResolver>,
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    address: OnceCell<String>,
}

impl ConnectionProvider {
    pub fn new(
        resolver: Arc<dyn AddressResolver>,
        connector: Arc<dyn Connector>,
        credentials: Credentials,
    ) -> Self {
        Self {
            resolver,
            connector,
            credentials,
            address: OnceCell::new(),
        }
    }

    /// Builds the MySQL provider described by `config`.
    ///
    /// A configured IP address is used as-is; otherwise the address of the
    /// named Cloud SQL instance is looked up.
    pub fn from_config(config: &Config) -> Self {
        let database = &config.database;

        let resolver: Arc<dyn AddressResolver> = match &database.ip_address {
            Some(address) if !address.trim().is_empty() => {
                Arc::new(StaticResolver::new(address.trim()))
            }
            _ => Arc::new(CommandResolver::gcloud(
                database.hostname.as_deref().unwrap_or_default(),
                database.resolve_timeout(),
            )),
        };
        let connector = Arc::new(MySqlConnector::new(
            database.connect_timeout(),
            database.query_timeout(),
        ));

        Self::new(resolver, connector, database.credentials())
    }

    /// Returns the database address, resolving it on first use.
    pub async fn address(&self) -> Result<&str> {
        let address = self
            .address
            .get_or_try_init(|| async {
                info!("Resolving database address");
                let address = self.resolver.resolve().await.map_err(|e| match e {
                    WikiError::AddressResolution(_) => e,
                    other => WikiError::address_resolution(other.to_string()),
                })?;
                info!("Database address resolved to {}", address);
                Ok::<_, WikiError>(address)
            })
            .await?;

        Ok(address.as_str())
    }

    /// The address, if it has been resolved.
    pub fn cached_address(&self) -> Option<&str> {
        self.address.get().map(String::as_str)
    }

    /// Opens a fresh connection. Pair every call with [`release`].
    ///
    /// [`release`]: ConnectionProvider::release
    pub async fn acquire(&self) -> Result<Box<dyn DatabaseClient>> {
        let address = self.address().await?;
        debug!("Opening connection to {}", self.credentials.display_string(address));

        self.connector
            .open(address, &self.credentials)
            .await
            .map_err(|e| match e {
                WikiError::Connection(_) => e,
                other => WikiError::connection(other.to_string()),
            })
    }

    /// Closes a connection obtained from [`acquire`]. Close failures are
    /// logged, never returned.
    ///
    /// [`acquire`]: ConnectionProvider::acquire
    pub async fn release(&self, mut conn: Box<dyn DatabaseClient>) {
        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection: {}", e);
        }
    }
}
