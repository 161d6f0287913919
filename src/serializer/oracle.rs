//! Oracle dialect: `FETCH FIRST ... ROWS ONLY` pagination, `JSON_OBJECT`/
//! `JSON_ARRAYAGG` for nested list selections. Oracle has no native boolean
//! literal; `1`/`0` stand in, matching the common Oracle convention.
//!
//! Serializes correctly but `execute` (§4.9) refuses to run against it —
//! this crate carries no OCI driver (SPEC_FULL.md's dialect-surface
//! supplement).

use super::SqlDialect;
use crate::domain::Domain;

#[derive(Debug, Default)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn supports_execution(&self) -> bool {
        false
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
        let fields: Vec<String> = pairs.iter().map(|(k, v)| format!("KEY '{k}' VALUE {v}")).collect();
        format!("JSON_OBJECT({})", fields.join(", "))
    }

    fn json_array_agg(&self, object_sql: &str) -> String {
        format!("JSON_ARRAYAGG({object_sql})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_is_not_supported() {
        assert!(!Oracle.supports_execution());
    }

    #[test]
    fn json_object_uses_key_value_syntax() {
        let sql = Oracle.json_object(&[("code".to_string(), "\"d\".\"code\"".to_string())]);
        assert_eq!(sql, "JSON_OBJECT(KEY 'code' VALUE \"d\".\"code\")");
    }
}
