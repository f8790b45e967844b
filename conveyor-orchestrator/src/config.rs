//! Orchestrator configuration
//!
//! Everything the binary reads from its environment at start-up.

use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// PostgreSQL connection string. Without one the in-memory store is used.
    pub database_url: Option<String>,

    pub db_max_connections: u32,

    /// How long a deploy waits for an instance to acknowledge its restart
    pub restart_ack_timeout: Duration,

    /// Per-target command queue depth in the dispatch gateway
    pub mailbox_capacity: usize,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CONVEYOR_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - DATABASE_URL (optional)
    /// - CONVEYOR_DB_MAX_CONNECTIONS (optional, default: 10)
    /// - CONVEYOR_RESTART_ACK_TIMEOUT (optional, seconds, default: 30)
    /// - CONVEYOR_MAILBOX_CAPACITY (optional, default: 32)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = lookup("CONVEYOR_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let db_max_connections = match lookup("CONVEYOR_DB_MAX_CONNECTIONS") {
            Some(value) => value.parse::<u32>().map_err(|_| {
                anyhow::anyhow!("CONVEYOR_DB_MAX_CONNECTIONS must be a number, got {}", value)
            })?,
            None => defaults.db_max_connections,
        };

        let restart_ack_timeout = match lookup("CONVEYOR_RESTART_ACK_TIMEOUT") {
            Some(value) => value.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                anyhow::anyhow!(
                    "CONVEYOR_RESTART_ACK_TIMEOUT must be a number of seconds, got {}",
                    value
                )
            })?,
            None => defaults.restart_ack_timeout,
        };

        let mailbox_capacity = match lookup("CONVEYOR_MAILBOX_CAPACITY") {
            Some(value) => value.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("CONVEYOR_MAILBOX_CAPACITY must be a number, got {}", value)
            })?,
            None => defaults.mailbox_capacity,
        };

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            restart_ack_timeout,
            mailbox_capacity,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
            }
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("db_max_connections must be greater than 0");
        }

        if self.restart_ack_timeout.is_zero() {
            anyhow::bail!("restart_ack_timeout must be greater than 0");
        }

        // tokio's mpsc::channel panics on a zero capacity
        if self.mailbox_capacity == 0 {
            anyhow::bail!("mailbox_capacity must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            db_max_connections: 10,
            restart_ack_timeout: Duration::from_secs(30),
            mailbox_capacity: 32,
        }
    }
}
