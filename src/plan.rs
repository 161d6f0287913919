//! [`Plan`] (§6): the compile entry point's output — rendered SQL, the
//! output row shape, and a [`Profile`] describing it.
//!
//! `Profile` here carries `domain` and `header` (the field names, in
//! order) but not the original's `tag`/`path` decorations — those come
//! from a `decorate` utility threaded through binding that this
//! implementation doesn't carry (see DESIGN.md); `header` is enough to
//! label a `Product`'s records.

use crate::domain::Domain;
use crate::error::Result;
use crate::execute::Product;
use crate::serializer::SqlDialect;

#[derive(Debug, Clone)]
pub struct Profile {
    pub domain: Domain,
    pub header: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub sql: String,
    pub output_columns: Vec<Domain>,
    pub meta: Profile,
}

impl Plan {
    pub fn new(sql: String, output_columns: Vec<Domain>, header: Vec<String>) -> Plan {
        let domain = Domain::list(Domain::record(
            header
                .iter()
                .zip(output_columns.iter())
                .map(|(name, domain)| crate::domain::RecordField { name: name.clone(), domain: domain.clone() })
                .collect(),
        ));
        Plan { sql, output_columns, meta: Profile { domain, header } }
    }

    /// Executes this plan against `pool`, per §4.9. `dialect` only gates
    /// whether execution is allowed (MSSQL/Oracle plans serialize fine but
    /// refuse to run, per the dialect-surface supplement).
    pub async fn execute(&self, pool: &crate::execute::ConnectionPool, dialect: &dyn SqlDialect) -> Result<Product> {
        crate::execute::execute_plan(self, pool, dialect).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_domain_is_a_list_of_records_shaped_by_header() {
        let plan = Plan::new("SELECT 1".to_string(), vec![Domain::Integer], vec!["x".to_string()]);
        match &plan.meta.domain {
            Domain::List { item } => match item.as_ref() {
                Domain::Record { fields } => {
                    assert_eq!(fields.len(), 1);
                    assert_eq!(fields[0].name, "x");
                }
                other => panic!("expected Record domain, got {other:?}"),
            },
            other => panic!("expected List domain, got {other:?}"),
        }
    }
}
