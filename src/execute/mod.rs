//! Executor (§4.9, §9 step 9): runs a [`crate::plan::Plan`]'s SQL against a
//! pooled connection, decodes each column through the domain-aware
//! normalizer in [`value`], and returns a [`Product`].
//!
//! Grounded on `flowscope-cli/src/metadata/sqlx_provider.rs`'s pool/connect
//! pattern (see [`pool::ConnectionPool`]); the write-transaction seam in
//! [`transaction`] is this crate's minimal stand-in for the original's `etl`
//! addon (SPEC_FULL.md SUPPLEMENTAL — ETL commands).

mod pool;
mod transaction;
mod value;

pub use pool::{redact_url, ConnectionPool};
pub use transaction::{Capability, Transaction};
pub use value::{RowValues, Value};

use crate::error::{Error, Result};
use crate::plan::{Plan, Profile};
use crate::serializer::SqlDialect;

/// The executor's result (§6 "Product (exposed)"): a profile describing the
/// row shape, and the rows themselves. `records` is `None` only for plans
/// that were compiled but never run; `execute_plan` always fills it in.
#[derive(Debug, Clone)]
pub struct Product {
    pub profile: Profile,
    pub records: Option<Vec<RowValues>>,
}

/// Runs `plan` against `pool` (§4.9):
/// 1. refuse up front if `dialect` can't execute at all (MSSQL/Oracle);
/// 2. execute the rendered SQL;
/// 3. on driver error, translate to a typed [`Error`] — the connection
///    itself is owned by the pool, so there is nothing further to
///    invalidate on this side of the `sqlx::Any` abstraction;
/// 4. decode every row's columns per `plan.output_columns` and return a
///    [`Product`].
pub async fn execute_plan(plan: &Plan, pool: &ConnectionPool, dialect: &dyn SqlDialect) -> Result<Product> {
    if !dialect.supports_execution() {
        return Err(Error::engine(format!(
            "the {} dialect does not support direct execution",
            dialect.name()
        )));
    }

    let rows = sqlx::query(&plan.sql)
        .fetch_all(pool.inner())
        .await
        .map_err(|e| Error::engine(format!("query execution failed: {e}")).with_frame("while executing the plan", None))?;

    let records = rows
        .iter()
        .map(|row| value::decode_row(row, &plan.output_columns))
        .collect::<Result<Vec<_>>>()?;

    Ok(Product {
        profile: plan.meta.clone(),
        records: Some(records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn product_carries_the_plans_profile() {
        let plan = Plan::new("SELECT 1".to_string(), vec![Domain::Integer], vec!["x".to_string()]);
        let product = Product { profile: plan.meta.clone(), records: Some(Vec::new()) };
        assert_eq!(product.profile.header, vec!["x".to_string()]);
    }
}
