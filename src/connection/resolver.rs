//! Database address discovery.

use crate::error::{WikiError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Discovers the network address of the database server.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Returns the address to connect to.
    async fn resolve(&self) -> Result<String>;
}

/// Always resolves to a fixed address.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    address: String,
}

impl StaticResolver {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl AddressResolver for StaticResolver {
    async fn resolve(&self) -> Result<String> {
        Ok(self.address.clone())
    }
}

/// Resolves the address by running an external command and reading its
/// standard output.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Asks the Cloud SQL admin API for the IP address of `instance`.
    pub fn gcloud(instance: &str, timeout: Duration) -> Self {
        Self::new(
            "gcloud",
            vec![
                "sql".to_string(),
                "instances".to_string(),
                "describe".to_string(),
                instance.to_string(),
                "--format=value(ipAddresses.ipAddress)".to_string(),
            ],
            timeout,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl AddressResolver for CommandResolver {
    async fn resolve(&self) -> Result<String> {
        debug!("Running {} {}", self.program, self.args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            WikiError::address_resolution(format!(
                "{} timed out after {} seconds",
                self.program,
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| WikiError::address_resolution(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WikiError::address_resolution(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        parse_address(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            WikiError::address_resolution(format!("{} returned no address", self.program))
        })
    }
}

/// Takes the first address from command output.
///
/// Multiple addresses are separated by `;`.
fn parse_address(output: &str) -> Option<String> {
    output
        .trim()
        .split(';')
        .map(str::trim)
        .find(|address| !address.is_empty())
        .map(String::from)
}

/// A resolver that always fails. Used in tests.
#[derive(Debug, Clone)]
pub struct FailingResolver {
    message: String,
}

impl FailingResolver {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl AddressResolver for FailingResolver {
    async fn resolve(&self) -> Result<String> {
        Err(WikiError::address_resolution(self.message.clone()))
    }
}
