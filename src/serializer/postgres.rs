//! PostgreSQL dialect: `json_agg(json_build_object(...))` for nested list
//! selections, `DECIMAL`/`DOUBLE PRECISION` type names shared with the
//! default `sql_type_name`.

use super::SqlDialect;

#[derive(Debug, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let args: Vec<String> = pairs.iter().map(|(k, v)| format!("'{k}', {v}")).collect();
        format!("json_build_object({})", args.join(", "))
    }

    fn json_array_agg(&self, object_sql: &str) -> String {
        format!("json_agg({object_sql})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_array_agg_wraps_in_json_agg() {
        let dialect = Postgres;
        assert_eq!(dialect.json_array_agg("x"), "json_agg(x)");
    }
}
