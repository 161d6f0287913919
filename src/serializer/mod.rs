//! Serializer (§4.8): a pre-order traversal of a [`Frame`] tree emitting SQL
//! text in a target dialect.
//!
//! The five dialects from SPEC_FULL.md's "dialect surface" supplement each
//! implement [`SqlDialect`]; only the pieces that actually diverge across
//! them are virtual (identifier quoting, literal formatting, `CAST` target
//! names, `LIMIT`/`OFFSET` syntax, and JSON-array construction for a nested
//! list selection) — everything else (clause ordering, join rendering,
//! operator spelling) is shared in [`render_segment`].
//!
//! `count`/`sum`/`min`/`max`/`avg` all render as `FUNC(*)`: the encoder
//! (§4.6) resolves an aggregate's argument to the *plural space* it ranges
//! over rather than a specific column inside it (see DESIGN.md), so by the
//! time a `Code::Aggregate` reaches here there is no column left to name —
//! this is an accepted scope reduction, not something the serializer can
//! recover.

pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

use std::sync::OnceLock;

use crate::catalog::Catalog;
use crate::dispatch::{Component, Registry};
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameJoin, Phrase};

pub trait SqlDialect {
    fn name(&self) -> &'static str;

    /// Whether `execute` (§4.9) may run SQL this dialect produces. MSSQL
    /// and Oracle serialize correctly (useful for "show me the SQL") but
    /// this implementation carries no driver for either, so execution
    /// against them is refused (SPEC_FULL.md's dialect-surface note).
    fn supports_execution(&self) -> bool {
        true
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn format_literal(&self, text: &str, domain: &Domain) -> String {
        match domain {
            Domain::Integer | Domain::Float | Domain::Decimal => text.to_string(),
            Domain::Boolean => if text == "true" { "TRUE".to_string() } else { "FALSE".to_string() },
            Domain::Void => "NULL".to_string(),
            _ => format!("'{}'", text.replace('\'', "''")),
        }
    }

    fn cast_sql(&self, base_sql: &str, target: &Domain) -> String {
        format!("CAST({base_sql} AS {})", self.sql_type_name(target))
    }

    fn sql_type_name(&self, domain: &Domain) -> String {
        match domain {
            Domain::Integer => "INTEGER".to_string(),
            Domain::Float => "DOUBLE PRECISION".to_string(),
            Domain::Decimal => "DECIMAL".to_string(),
            Domain::Text | Domain::Enum { .. } | Domain::Identity { .. } | Domain::Untyped => "TEXT".to_string(),
            Domain::Boolean => "BOOLEAN".to_string(),
            Domain::Date => "DATE".to_string(),
            Domain::Time => "TIME".to_string(),
            Domain::DateTime => "TIMESTAMP".to_string(),
            Domain::Void | Domain::List { .. } | Domain::Record { .. } => "TEXT".to_string(),
        }
    }

    fn limit_offset_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        let mut clause = String::new();
        if let Some(limit) = limit {
            clause.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            clause.push_str(&format!(" OFFSET {offset}"));
        }
        clause
    }

    /// Builds the JSON-object expression for one row of a nested list
    /// selection, from `(key, column_sql)` pairs.
    fn json_object(&self, pairs: &[(String, String)]) -> String;

    /// Wraps a per-row `json_object` expression in this dialect's
    /// array-aggregate function.
    fn json_array_agg(&self, object_sql: &str) -> String;
}

/// Renders a complete, top-level segment's `Frame` to SQL text plus its
/// output domains, in declaration order.
pub fn render_segment(catalog: &Catalog, frame: &Frame, dialect: &dyn SqlDialect) -> Result<(String, Vec<Domain>)> {
    match frame {
        Frame::Segment { base, fields, .. } => {
            let select_sql = fields
                .iter()
                .map(|(name, phrase)| format!("{} AS {}", render_phrase(catalog, phrase, dialect), dialect.quote_ident(name)))
                .collect::<Vec<_>>()
                .join(", ");
            let domains = fields.iter().map(|(_, phrase)| phrase_domain(phrase)).collect();
            let sql = render_query(catalog, &select_sql, base, &[], None, &[], None, &[], None, None, dialect);
            Ok((sql, domains))
        }
        other => Err(Error::compile(format!("expected a Segment frame at the root, got {other:?}"))),
    }
}

fn phrase_domain(phrase: &Phrase) -> Domain {
    match phrase {
        Phrase::Literal { domain, .. } | Phrase::Column { domain, .. } | Phrase::Formula { domain, .. } => domain.clone(),
        Phrase::Cast { target, .. } => target.clone(),
        Phrase::AggregateSubquery { .. } => Domain::Integer,
        Phrase::JsonListSubquery { fields, .. } => Domain::list(Domain::record(
            fields.iter().map(|(name, _)| crate::domain::RecordField { name: name.clone(), domain: Domain::Untyped }).collect(),
        )),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_query(
    catalog: &Catalog,
    select_sql: &str,
    base: &Frame,
    joins: &[FrameJoin],
    filter: Option<&Phrase>,
    group: &[Phrase],
    group_filter: Option<&Phrase>,
    order: &[(Phrase, bool)],
    limit: Option<usize>,
    offset: Option<usize>,
    dialect: &dyn SqlDialect,
) -> String {
    let mut sql = format!("SELECT {select_sql}");
    match base {
        Frame::Scalar { .. } => {}
        Frame::Leaf { alias, table } => {
            sql.push_str(&format!(
                " FROM {} AS {}",
                dialect.quote_ident(&catalog.table(*table).name),
                dialect.quote_ident(alias)
            ));
        }
        other => {
            sql.push_str(&format!(" FROM ({}) AS {}", render_frame(catalog, other, dialect), dialect.quote_ident(other.alias())));
        }
    }
    for join in joins {
        let keyword = if join.is_outer { "LEFT JOIN" } else { "JOIN" };
        let from = match &join.frame {
            Frame::Leaf { alias, table } => {
                format!("{} AS {}", dialect.quote_ident(&catalog.table(*table).name), dialect.quote_ident(alias))
            }
            other => format!("({}) AS {}", render_frame(catalog, other, dialect), dialect.quote_ident(other.alias())),
        };
        sql.push_str(&format!(" {keyword} {from} ON {}", render_phrase(catalog, &join.condition, dialect)));
    }
    if let Some(predicate) = filter {
        sql.push_str(&format!(" WHERE {}", render_phrase(catalog, predicate, dialect)));
    }
    if !group.is_empty() {
        let items: Vec<String> = group.iter().map(|g| render_phrase(catalog, g, dialect)).collect();
        sql.push_str(&format!(" GROUP BY {}", items.join(", ")));
    }
    if let Some(predicate) = group_filter {
        sql.push_str(&format!(" HAVING {}", render_phrase(catalog, predicate, dialect)));
    }
    if !order.is_empty() {
        let items: Vec<String> = order
            .iter()
            .map(|(p, asc)| format!("{} {}", render_phrase(catalog, p, dialect), if *asc { "ASC" } else { "DESC" }))
            .collect();
        sql.push_str(&format!(" ORDER BY {}", items.join(", ")));
    }
    sql.push_str(&dialect.limit_offset_clause(limit, offset));
    sql
}

fn render_frame(catalog: &Catalog, frame: &Frame, dialect: &dyn SqlDialect) -> String {
    match frame {
        Frame::Scalar { .. } => "SELECT 1".to_string(),
        Frame::Leaf { alias, table } => render_query(
            catalog,
            "*",
            &Frame::Leaf { alias: alias.clone(), table: *table },
            &[],
            None,
            &[],
            None,
            &[],
            None,
            None,
            dialect,
        ),
        Frame::Branch { base, joins, select, filter, group, group_filter, order, limit, offset, .. } => {
            let select_sql = if select.is_empty() {
                "*".to_string()
            } else {
                select
                    .iter()
                    .map(|(name, phrase)| format!("{} AS {}", render_phrase(catalog, phrase, dialect), dialect.quote_ident(name)))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            render_query(catalog, &select_sql, base, joins, filter.as_ref(), group, group_filter.as_ref(), order, *limit, *offset, dialect)
        }
        Frame::Segment { base, fields, .. } => {
            let select_sql = fields
                .iter()
                .map(|(name, phrase)| format!("{} AS {}", render_phrase(catalog, phrase, dialect), dialect.quote_ident(name)))
                .collect::<Vec<_>>()
                .join(", ");
            render_query(catalog, &select_sql, base, &[], None, &[], None, &[], None, None, dialect)
        }
    }
}

fn render_phrase(catalog: &Catalog, phrase: &Phrase, dialect: &dyn SqlDialect) -> String {
    match phrase {
        Phrase::Literal { text, domain } => dialect.format_literal(text, domain),
        Phrase::Column { frame_alias, column, .. } => {
            format!("{}.{}", dialect.quote_ident(frame_alias), dialect.quote_ident(&catalog.column(*column).name))
        }
        Phrase::Formula { name, args, .. } => render_formula(catalog, name, args, dialect),
        Phrase::Cast { base, target } => dialect.cast_sql(&render_phrase(catalog, base, dialect), target),
        Phrase::AggregateSubquery { name, frame } => render_aggregate_subquery(catalog, name, frame, dialect),
        Phrase::JsonListSubquery { frame, fields } => render_json_list_subquery(catalog, frame, fields, dialect),
    }
}

/// An operator's rendering implementation, registered against the §4.1
/// Protocol dispatch by `(name, arity)` — fixed-arity operator spellings are
/// themselves realized through [`crate::dispatch::Registry`] rather than a
/// bespoke match, matching "Adapter dispatch... used to implement every
/// transformation pass" (§4.1). Names absent from the registry still render
/// as a generic pass-through SQL call (this is the documented fallback for
/// names the registry doesn't know, not a second dispatch path).
type FormulaRenderer = fn(&[String]) -> String;

fn render_and(a: &[String]) -> String {
    format!("({} AND {})", a[0], a[1])
}
fn render_or(a: &[String]) -> String {
    format!("({} OR {})", a[0], a[1])
}
fn render_not(a: &[String]) -> String {
    format!("(NOT {})", a[0])
}
fn render_eq(a: &[String]) -> String {
    format!("({} = {})", a[0], a[1])
}
fn render_ne(a: &[String]) -> String {
    format!("({} <> {})", a[0], a[1])
}
fn render_lt(a: &[String]) -> String {
    format!("({} < {})", a[0], a[1])
}
fn render_le(a: &[String]) -> String {
    format!("({} <= {})", a[0], a[1])
}
fn render_gt(a: &[String]) -> String {
    format!("({} > {})", a[0], a[1])
}
fn render_ge(a: &[String]) -> String {
    format!("({} >= {})", a[0], a[1])
}
fn render_add(a: &[String]) -> String {
    format!("({} + {})", a[0], a[1])
}
fn render_sub(a: &[String]) -> String {
    format!("({} - {})", a[0], a[1])
}
fn render_mul(a: &[String]) -> String {
    format!("({} * {})", a[0], a[1])
}
fn render_div(a: &[String]) -> String {
    format!("({} / {})", a[0], a[1])
}
fn render_neg(a: &[String]) -> String {
    format!("(-{})", a[0])
}
fn render_pos(a: &[String]) -> String {
    format!("(+{})", a[0])
}

fn formula_registry() -> &'static Registry<FormulaRenderer> {
    static REGISTRY: OnceLock<Registry<FormulaRenderer>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry: Registry<FormulaRenderer> = Registry::new();
        let entries: &[(&'static str, &'static str, usize, FormulaRenderer)] = &[
            ("and", "&", 2, render_and),
            ("or", "|", 2, render_or),
            ("not", "!", 1, render_not),
            ("eq", "=", 2, render_eq),
            ("ne", "!=", 2, render_ne),
            ("lt", "<", 2, render_lt),
            ("le", "<=", 2, render_le),
            ("gt", ">", 2, render_gt),
            ("ge", ">=", 2, render_ge),
            ("add", "+", 2, render_add),
            ("sub", "-", 2, render_sub),
            ("mul", "*", 2, render_mul),
            ("div", "/", 2, render_div),
            ("neg", "unary-", 1, render_neg),
            ("pos", "unary+", 1, render_pos),
        ];
        for &(component_name, operator, arity, renderer) in entries {
            registry.register(Component {
                name: component_name,
                keys: vec![],
                protocol_keys: vec![(operator.to_string(), Some(arity))],
                value: renderer,
            });
        }
        registry
    })
}

fn render_formula(catalog: &Catalog, name: &str, args: &[Phrase], dialect: &dyn SqlDialect) -> String {
    let rendered: Vec<String> = args.iter().map(|a| render_phrase(catalog, a, dialect)).collect();
    match formula_registry().realize_protocol(name, rendered.len()) {
        Ok(realization) => (realization.value())(&rendered),
        Err(_) => format!("{}({})", name.to_uppercase(), rendered.join(", ")),
    }
}

fn render_aggregate_subquery(catalog: &Catalog, name: &str, frame: &Frame, dialect: &dyn SqlDialect) -> String {
    let Frame::Branch { base, joins, filter, .. } = frame else {
        return "(SELECT 1)".to_string();
    };
    if name == "exists" {
        let body = render_query(catalog, "1", base, joins, filter.as_ref(), &[], None, &[], None, None, dialect);
        format!("EXISTS ({body})")
    } else {
        let select_sql = format!("{}(*)", name.to_uppercase());
        let body = render_query(catalog, &select_sql, base, joins, filter.as_ref(), &[], None, &[], None, None, dialect);
        format!("({body})")
    }
}

fn render_json_list_subquery(
    catalog: &Catalog,
    frame: &Frame,
    fields: &[(String, crate::catalog::ColumnId)],
    dialect: &dyn SqlDialect,
) -> String {
    let Frame::Branch { base, joins, filter, .. } = frame else {
        return "(SELECT NULL)".to_string();
    };
    let row_alias = frame.alias();
    let pairs: Vec<(String, String)> = fields
        .iter()
        .map(|(name, column)| {
            let column_sql = format!("{}.{}", dialect.quote_ident(row_alias), dialect.quote_ident(&catalog.column(*column).name));
            (name.clone(), column_sql)
        })
        .collect();
    let object_sql = dialect.json_object(&pairs);
    let select_sql = dialect.json_array_agg(&object_sql);
    let body = render_query(catalog, &select_sql, base, joins, filter.as_ref(), &[], None, &[], None, None, dialect);
    format!("({body})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::syntax::parse;

    fn school_department_catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let school = b.add_table(sch, "school");
        let school_id = b.add_column(school, "id", Domain::Integer, false, false);
        b.add_column(school, "code", Domain::Text, false, false);
        b.add_column(school, "name", Domain::Text, true, false);
        b.add_unique_key(school, vec![school_id], true, false);

        let department = b.add_table(sch, "department");
        let dept_id = b.add_column(department, "id", Domain::Integer, false, false);
        b.add_column(department, "code", Domain::Text, false, false);
        let dept_school_id = b.add_column(department, "school_id", Domain::Integer, true, false);
        b.add_column(department, "name", Domain::Text, true, false);
        b.add_unique_key(department, vec![dept_id], true, false);
        b.add_foreign_key(department, vec![dept_school_id], school, vec![school_id], true);
        b.freeze()
    }

    fn render_query_str(catalog: &Catalog, query: &str, dialect: &dyn SqlDialect) -> String {
        let syntax = parse(query).unwrap();
        let binding = crate::binder::bind_query(catalog, &syntax).unwrap();
        let (space, fields) = crate::encoder::encode_segment(catalog, &binding).unwrap();
        let space = crate::rewrite::rewrite_space(space);
        let term = crate::compile::compile_segment(space, fields);
        let frame = crate::assemble::assemble(catalog, term, None, true);
        let frame = crate::reduce::reduce_frame(frame);
        render_segment(catalog, &frame, dialect).unwrap().0
    }

    #[test]
    fn bare_table_renders_a_plain_select() {
        let catalog = school_department_catalog();
        let sql = render_query_str(&catalog, "/school", &sqlite::Sqlite);
        assert!(sql.starts_with("SELECT "));
        assert!(sql.contains("FROM \"school\" AS \"school\""));
    }

    #[test]
    fn count_renders_a_correlated_scalar_subquery() {
        let catalog = school_department_catalog();
        let sql = render_query_str(&catalog, "/school{code, count(department)}", &sqlite::Sqlite);
        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("FROM \"department\" AS \"department\""));
        assert!(sql.contains("WHERE"));
    }

    #[test]
    fn nested_segment_renders_a_json_group_array_subquery() {
        let catalog = school_department_catalog();
        let sql = render_query_str(&catalog, "/school{code, /department{code}}", &sqlite::Sqlite);
        assert!(sql.contains("json_group_array(json_object("));
    }

    #[test]
    fn mysql_nested_segment_renders_json_arrayagg() {
        let catalog = school_department_catalog();
        let sql = render_query_str(&catalog, "/school{code, /department{code}}", &mysql::Mysql);
        assert!(sql.contains("JSON_ARRAYAGG(JSON_OBJECT("));
        assert!(sql.contains("`school`"));
    }
}
