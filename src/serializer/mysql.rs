//! MySQL dialect: backtick identifiers, `JSON_ARRAYAGG(JSON_OBJECT(...))`
//! for nested list selections.

use super::SqlDialect;
use crate::domain::Domain;

#[derive(Debug, Default)]
pub struct Mysql;

impl SqlDialect for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn format_literal(&self, text: &str, domain: &Domain) -> String {
        match domain {
            Domain::Boolean => if text == "true" { "1".to_string() } else { "0".to_string() },
            Domain::Integer | Domain::Float | Domain::Decimal => text.to_string(),
            Domain::Void => "NULL".to_string(),
            _ => format!("'{}'", text.replace('\'', "''")),
        }
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let args: Vec<String> = pairs.iter().map(|(k, v)| format!("'{k}', {v}")).collect();
        format!("JSON_OBJECT({})", args.join(", "))
    }

    fn json_array_agg(&self, object_sql: &str) -> String {
        format!("JSON_ARRAYAGG({object_sql})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_literals_render_as_zero_and_one() {
        let dialect = Mysql;
        assert_eq!(dialect.format_literal("true", &Domain::Boolean), "1");
        assert_eq!(dialect.format_literal("false", &Domain::Boolean), "0");
    }

    #[test]
    fn identifiers_are_backtick_quoted() {
        let dialect = Mysql;
        assert_eq!(dialect.quote_ident("school"), "`school`");
    }
}
