//! SQLite dialect: the default, the one the seeded §8 scenarios run
//! against. `json_group_array`/`json_object` back nested list selections.

use super::SqlDialect;

#[derive(Debug, Default)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let args: Vec<String> = pairs.iter().map(|(k, v)| format!("'{k}', {v}")).collect();
        format!("json_object({})", args.join(", "))
    }

    fn json_array_agg(&self, object_sql: &str) -> String {
        format!("json_group_array({object_sql})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn boolean_literals_render_as_sqlite_words() {
        let dialect = Sqlite;
        assert_eq!(dialect.format_literal("true", &Domain::Boolean), "TRUE");
    }

    #[test]
    fn json_object_quotes_keys_as_string_literals() {
        let dialect = Sqlite;
        let sql = dialect.json_object(&[("code".to_string(), "\"d\".\"code\"".to_string())]);
        assert_eq!(sql, "json_object('code', \"d\".\"code\")");
    }
}
