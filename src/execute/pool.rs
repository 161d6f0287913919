//! Connection pool (§5 "one pool per application, bounded, shared across
//! requests"). Grounded on the pool/connect shape in
//! `flowscope-cli/src/metadata/sqlx_provider.rs`: an `sqlx::AnyPool` behind
//! `AnyPoolOptions`, one-time driver installation, and credential-redacted
//! error messages.

use std::sync::Once;
use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error::{Error, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

static INSTALL_DRIVERS: Once = Once::new();

/// Credential-bearing connection handle for one application (§5). Cheaply
/// cloneable; every clone shares the same underlying pool.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: AnyPool,
}

impl ConnectionPool {
    pub async fn connect(url: &str) -> Result<ConnectionPool> {
        Self::connect_with(url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect_with(url: &str, max_connections: u32) -> Result<ConnectionPool> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .connect(url)
            .await
            .map_err(|e| Error::engine(format!("failed to connect to {}: {e}", redact_url(url))))?;
        Ok(ConnectionPool { pool })
    }

    pub(crate) fn inner(&self) -> &AnyPool {
        &self.pool
    }
}

/// Redacts user:password from a connection URL so pool errors never leak
/// credentials (mirrors the teacher's `redact_url`).
pub fn redact_url(url: &str) -> String {
    if let Some((scheme, rest)) = url.split_once("://") {
        if let Some(at_pos) = rest.rfind('@') {
            return format!("{scheme}://<redacted>@{}", &rest[at_pos + 1..]);
        }
        if scheme == "sqlite" {
            return format!("{scheme}://<path>");
        }
        return format!("{scheme}://{rest}");
    }
    if url.starts_with("sqlite:") {
        return "sqlite:<path>".to_string();
    }
    url.split("://").next().unwrap_or("unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_hides_credentials() {
        assert_eq!(redact_url("postgres://user:pw@host/db"), "postgres://<redacted>@host/db");
    }

    #[test]
    fn redact_url_hides_sqlite_paths() {
        assert_eq!(redact_url("sqlite:///secret/path.db"), "sqlite://<path>");
        assert_eq!(redact_url("sqlite::memory:"), "sqlite:<path>");
    }
}
