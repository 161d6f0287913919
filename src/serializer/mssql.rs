//! SQL Server dialect: square-bracket identifiers, `OFFSET ... FETCH NEXT`
//! pagination, `FOR JSON PATH` for nested list selections.
//!
//! Serializes correctly but `execute` (§4.9) refuses to run against it —
//! this crate carries no T-SQL driver (SPEC_FULL.md's dialect-surface
//! supplement).

use super::SqlDialect;
use crate::domain::Domain;

#[derive(Debug, Default)]
pub struct Mssql;

impl SqlDialect for Mssql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn supports_execution(&self) -> bool {
        false
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn format_literal(&self, text: &str, domain: &Domain) -> String {
        match domain {
            Domain::Boolean => if text == "true" { "1".to_string() } else { "0".to_string() },
            Domain::Integer | Domain::Float | Domain::Decimal => text.to_string(),
            Domain::Void => "NULL".to_string(),
            _ => format!("'{}'", text.replace('\'', "''")),
        }
    }

    fn limit_offset_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        if limit.is_none() && offset.is_none() {
            return String::new();
        }
        let offset = offset.unwrap_or(0);
        let mut clause = format!(" OFFSET {offset} ROWS");
        if let Some(limit) = limit {
            clause.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
        clause
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let fields: Vec<String> = pairs.iter().map(|(k, v)| format!("{v} AS {k}")).collect();
        format!("(SELECT {} FOR JSON PATH, WITHOUT_ARRAY_WRAPPER)", fields.join(", "))
    }

    fn json_array_agg(&self, object_sql: &str) -> String {
        // MSSQL builds the whole array through `FOR JSON PATH` over the
        // derived rowset rather than a per-row aggregate function; the row
        // object itself is already the SELECT's shape; still, callers go
        // through this dialect's rendering as a scalar select.
        object_sql.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_is_not_supported() {
        assert!(!Mssql.supports_execution());
    }

    #[test]
    fn identifiers_are_bracket_quoted() {
        assert_eq!(Mssql.quote_ident("school"), "[school]");
    }

    #[test]
    fn pagination_uses_offset_fetch() {
        assert_eq!(Mssql.limit_offset_clause(Some(5), Some(10)), " OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY");
    }
}
