//! Table/column wildcard patterns backing `tweak.override`'s
//! `unlabeled_tables`/`unlabeled_columns`/`included_tables`/`excluded_tables`
//! /`class_labels`/`field_labels` options (§6, SPEC_FULL supplemental).
//!
//! Grounded on `original_source/src/htsql/tweak/override/pattern.py`'s
//! `TablePattern`/`ColumnPattern`: a dotted `schema.table` or
//! `schema.table.column` path where any segment may itself be a `fnmatch`
//! glob (`*`/`?`). The schema segment is always optional.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::normalize_name;

/// A `schema.table` pattern, e.g. `public.dep*` or bare `school`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TablePattern {
    pub schema: Option<String>,
    pub table: String,
}

/// A `schema.table.column` pattern; `schema`/`table` may be omitted to
/// match any schema/table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnPattern {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: String,
}

impl TablePattern {
    pub fn matches(&self, schema: &str, table: &str) -> bool {
        segment_matches(self.schema.as_deref(), schema) && glob_match(&self.table, table)
    }
}

impl ColumnPattern {
    pub fn matches(&self, schema: &str, table: &str, column: &str) -> bool {
        segment_matches(self.schema.as_deref(), schema)
            && segment_matches(self.table.as_deref(), table)
            && glob_match(&self.column, column)
    }
}

fn segment_matches(pattern: Option<&str>, name: &str) -> bool {
    match pattern {
        None => true,
        Some(pattern) => glob_match(pattern, name),
    }
}

/// `fnmatch`-style glob match (`*` any run of characters, `?` any single
/// character), case-insensitive against the catalog's normalized names —
/// matching the original's `normalize(entity.name)` before comparison.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern = normalize_name(pattern);
    let name = normalize_name(name);
    let mut regex = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(&ch.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).map(|re| re.is_match(&name)).unwrap_or(false)
}

/// Parses `[schema.]table`, same grammar as the original's
/// `TablePatternVal`.
pub fn parse_table_pattern(text: &str) -> Result<TablePattern> {
    let parts: Vec<&str> = text.trim().split('.').collect();
    match parts.as_slice() {
        [table] if !table.is_empty() => Ok(TablePattern { schema: None, table: table.to_string() }),
        [schema, table] if !schema.is_empty() && !table.is_empty() => {
            Ok(TablePattern { schema: Some(schema.to_string()), table: table.to_string() })
        }
        _ => Err(Error::compile(format!("expected a table pattern, got {text:?}"))),
    }
}

/// Parses `[schema.][table.]column`, same grammar as the original's
/// `ColumnPatternVal`.
pub fn parse_column_pattern(text: &str) -> Result<ColumnPattern> {
    let parts: Vec<&str> = text.trim().split('.').collect();
    match parts.as_slice() {
        [column] if !column.is_empty() => Ok(ColumnPattern { schema: None, table: None, column: column.to_string() }),
        [table, column] if !table.is_empty() && !column.is_empty() => {
            Ok(ColumnPattern { schema: None, table: Some(table.to_string()), column: column.to_string() })
        }
        [schema, table, column] if !schema.is_empty() && !table.is_empty() && !column.is_empty() => Ok(ColumnPattern {
            schema: Some(schema.to_string()),
            table: Some(table.to_string()),
            column: column.to_string(),
        }),
        _ => Err(Error::compile(format!("expected a column pattern, got {text:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_table_pattern_has_no_schema() {
        let pattern = parse_table_pattern("department").unwrap();
        assert_eq!(pattern, TablePattern { schema: None, table: "department".to_string() });
    }

    #[test]
    fn qualified_table_pattern_splits_on_dot() {
        let pattern = parse_table_pattern("public.department").unwrap();
        assert_eq!(pattern.schema.as_deref(), Some("public"));
        assert_eq!(pattern.table, "department");
    }

    #[test]
    fn star_glob_matches_any_suffix() {
        let pattern = parse_table_pattern("dep*").unwrap();
        assert!(pattern.matches("public", "department"));
        assert!(!pattern.matches("public", "school"));
    }

    #[test]
    fn question_mark_glob_matches_one_character() {
        let pattern = TablePattern { schema: None, table: "t?st".to_string() };
        assert!(pattern.matches("public", "test"));
        assert!(!pattern.matches("public", "tst"));
    }

    #[test]
    fn column_pattern_with_no_table_matches_any_table() {
        let pattern = parse_column_pattern("code").unwrap();
        assert!(pattern.matches("public", "school", "code"));
        assert!(pattern.matches("public", "department", "code"));
    }

    #[test]
    fn fully_qualified_column_pattern_requires_all_segments() {
        let pattern = parse_column_pattern("public.school.code").unwrap();
        assert!(pattern.matches("public", "school", "code"));
        assert!(!pattern.matches("public", "department", "code"));
    }
}
