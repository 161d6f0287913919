//! Write-capability gate and transaction wrapper (SPEC_FULL.md SUPPLEMENTAL
//! — ETL commands): the original's `etl` addon runs every write step inside
//! one transaction-scoped connection and refuses to start unless the active
//! application was granted write access. This crate carries that seam —
//! the gate and the transaction wrapper — without the command language
//! (`clone`/`copy`/`insert`/`merge`/`update`/`summon`) itself.

use sqlx::Any;

use crate::error::{Error, Result};
use crate::execute::pool::ConnectionPool;

/// What an application is allowed to do against its pool. Read access is
/// implicit; write access must be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capability {
    pub can_write: bool,
}

impl Capability {
    pub fn read_only() -> Capability {
        Capability { can_write: false }
    }

    pub fn read_write() -> Capability {
        Capability { can_write: true }
    }

    fn require_write(self) -> Result<()> {
        if self.can_write {
            Ok(())
        } else {
            Err(Error::permission("write access is not enabled for this application"))
        }
    }
}

/// A single-transaction write scope. Every statement run through `execute`
/// shares the same underlying connection and commits or rolls back as one
/// unit, matching the "all steps inside one transaction" rule.
pub struct Transaction<'a> {
    inner: sqlx::Transaction<'a, Any>,
}

impl<'a> Transaction<'a> {
    /// Begins a transaction, refusing up front if `capability` lacks write
    /// access.
    pub async fn begin(pool: &'a ConnectionPool, capability: Capability) -> Result<Transaction<'a>> {
        capability.require_write()?;
        let inner = pool
            .inner()
            .begin()
            .await
            .map_err(|e| Error::engine(format!("failed to begin transaction: {e}")))?;
        Ok(Transaction { inner })
    }

    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&mut *self.inner)
            .await
            .map_err(|e| Error::engine(format!("write statement failed: {e}")))?;
        Ok(result.rows_affected())
    }

    pub async fn commit(self) -> Result<()> {
        self.inner
            .commit()
            .await
            .map_err(|e| Error::engine(format!("failed to commit transaction: {e}")))
    }

    pub async fn rollback(self) -> Result<()> {
        self.inner
            .rollback()
            .await
            .map_err(|e| Error::engine(format!("failed to roll back transaction: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_capability_refuses_writes() {
        assert!(Capability::read_only().require_write().is_err());
    }

    #[test]
    fn read_write_capability_allows_writes() {
        assert!(Capability::read_write().require_write().is_ok());
    }
}
