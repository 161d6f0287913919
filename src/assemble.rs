//! Assemble (§4.7): lowers a [`Term`] tree to a [`Frame`] tree, assigning
//! deterministic aliases and turning [`Code`] into frame-qualified
//! [`Phrase`]s. Also applies the safe-patch row cap (§9 "safe_patch",
//! decided in DESIGN.md): a non-root segment not already carrying its own
//! `ORDER BY`/`LIMIT` gets wrapped in one when the caller asked for a
//! `max_rows` cap.
//!
//! Grounded on spec.md §4.7 "turns the term tree into a Frame tree by
//! choosing, for each unit, which frame owns its expression; assigns column
//! aliases and select lists."

use std::collections::HashMap;

use crate::catalog::join::Join;
use crate::catalog::{Catalog, ColumnId, TableId};
use crate::code::Code;
use crate::domain::Domain;
use crate::frame::{Frame, FrameJoin, Phrase};
use crate::graph::normalize_name;
use crate::space::Space;
use crate::term::Term;

/// Deterministic alias allocation: name-from-table, then numeric suffixes
/// to dodge collisions with any alias already handed out in this
/// assembly — including ones from an enclosing correlated subquery, when
/// `used` is seeded from the outer scope (§4.8 "Alias assignment is
/// deterministic").
#[derive(Default)]
struct AliasAllocator {
    used: Vec<String>,
}

impl AliasAllocator {
    fn seeded(seed: impl IntoIterator<Item = String>) -> AliasAllocator {
        AliasAllocator { used: seed.into_iter().collect() }
    }

    fn alloc(&mut self, base_name: &str) -> String {
        if !self.used.iter().any(|a| a == base_name) {
            self.used.push(base_name.to_string());
            return base_name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base_name}_{n}");
            if !self.used.iter().any(|a| a == &candidate) {
                self.used.push(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }
}

fn table_name(catalog: &Catalog, table: TableId) -> String {
    normalize_name(&catalog.table(table).name)
}

/// Assembles a top-level or nested segment. `is_root` and `max_rows`
/// together gate the safe-patch wrap described above.
pub fn assemble(catalog: &Catalog, term: Term, max_rows: Option<usize>, is_root: bool) -> Frame {
    let term = apply_safe_patch(term, max_rows, is_root);
    let mut aliases = HashMap::new();
    let mut allocator = AliasAllocator::default();
    assemble_term(catalog, &term, &mut aliases, &mut allocator).0
}

fn apply_safe_patch(term: Term, max_rows: Option<usize>, is_root: bool) -> Term {
    let Some(max_rows) = max_rows else { return term };
    if is_root {
        return term;
    }
    match term {
        Term::Segment { ordinal, base, fields } => {
            let wrapped = if matches!(*base, Term::Order { .. }) {
                *base
            } else {
                let ordinal = base.ordinal();
                Term::Order { ordinal, base, order: Vec::new(), limit: Some(max_rows), offset: None }
            };
            Term::Segment { ordinal, base: Box::new(wrapped), fields }
        }
        other => other,
    }
}

/// Returns the assembled frame plus the table this term's rows currently
/// come from, if any (`None` for `Scalar` and `Segment`, which close off
/// the row space).
fn assemble_term(
    catalog: &Catalog,
    term: &Term,
    aliases: &mut HashMap<TableId, String>,
    allocator: &mut AliasAllocator,
) -> (Frame, Option<TableId>) {
    match term {
        Term::Scalar { .. } => (Frame::Scalar { alias: allocator.alloc("scalar") }, None),
        Term::Table { table, .. } => {
            let alias = allocator.alloc(&table_name(catalog, *table));
            aliases.insert(*table, alias.clone());
            (Frame::Leaf { alias, table: *table }, Some(*table))
        }
        Term::Join { base, joins, .. } => {
            let (base_frame, base_table) = assemble_term(catalog, base, aliases, allocator);
            let base_table = base_table.expect("a join's base must range over a table");
            let (frame, current_table) =
                extend_join_chain(catalog, base_frame, base_table, joins, aliases, allocator);
            (frame, Some(current_table))
        }
        Term::Filter { base, predicate, .. } => {
            let (base_frame, base_table) = assemble_term(catalog, base, aliases, allocator);
            let phrase = encode_phrase(catalog, predicate, aliases, allocator);
            (with_filter(base_frame, phrase), base_table)
        }
        Term::Order { base, order, limit, offset, .. } => {
            let (base_frame, base_table) = assemble_term(catalog, base, aliases, allocator);
            let phrases = order
                .iter()
                .map(|(code, asc)| (encode_phrase(catalog, code, aliases, allocator), *asc))
                .collect();
            (with_order(base_frame, phrases, *limit, *offset), base_table)
        }
        Term::Projection { base, kernel, .. } => {
            let (base_frame, base_table) = assemble_term(catalog, base, aliases, allocator);
            let phrases = kernel.iter().map(|c| encode_phrase(catalog, c, aliases, allocator)).collect();
            (with_group(base_frame, phrases), base_table)
        }
        Term::Segment { base, fields, .. } => {
            let (base_frame, _) = assemble_term(catalog, base, aliases, allocator);
            let select = fields
                .iter()
                .map(|(name, code)| (name.clone(), encode_phrase(catalog, code, aliases, allocator)))
                .collect();
            let alias = allocator.alloc("segment");
            (Frame::Segment { alias, base: Box::new(base_frame), fields: select }, None)
        }
    }
}

fn extend_join_chain(
    catalog: &Catalog,
    mut frame: Frame,
    mut current_table: TableId,
    joins: &[Join],
    aliases: &mut HashMap<TableId, String>,
    allocator: &mut AliasAllocator,
) -> (Frame, TableId) {
    for join in joins {
        let next_table = join.target(catalog);
        let next_alias = allocator.alloc(&table_name(catalog, next_table));
        let current_alias = aliases[&current_table].clone();
        aliases.insert(next_table, next_alias.clone());
        let condition = join_condition(catalog, join, &current_alias, &next_alias);
        let leaf = Frame::Leaf { alias: next_alias, table: next_table };
        let is_outer = !join.is_expanding(catalog);
        frame = with_join(frame, FrameJoin { frame: leaf, condition, is_outer });
        current_table = next_table;
    }
    (frame, current_table)
}

/// Builds a join chain whose first hop is *not* materialized as a `FROM`
/// entry — the anchor table is the enclosing query's current row, supplied
/// as `anchor_alias` from the outer assembly's alias map. The first hop's
/// join condition becomes a `WHERE` filter on the new subquery instead of a
/// `JOIN ... ON` clause (§8 scenario 2/5's correlation).
fn assemble_correlated_chain(
    catalog: &Catalog,
    anchor_alias: &str,
    joins: &[Join],
    aliases: &mut HashMap<TableId, String>,
    allocator: &mut AliasAllocator,
) -> (Frame, TableId) {
    let mut joins_iter = joins.iter();
    let first = joins_iter.next().expect("a correlated chain has at least one join");
    let first_table = first.target(catalog);
    let first_alias = allocator.alloc(&table_name(catalog, first_table));
    aliases.insert(first_table, first_alias.clone());
    let correlation = join_condition(catalog, first, anchor_alias, &first_alias);
    let mut frame = with_filter(Frame::Leaf { alias: first_alias, table: first_table }, correlation);
    let mut current_table = first_table;
    for join in joins_iter {
        let next_table = join.target(catalog);
        let next_alias = allocator.alloc(&table_name(catalog, next_table));
        let current_alias = aliases[&current_table].clone();
        aliases.insert(next_table, next_alias.clone());
        let condition = join_condition(catalog, join, &current_alias, &next_alias);
        let leaf = Frame::Leaf { alias: next_alias, table: next_table };
        frame = with_join(frame, FrameJoin { frame: leaf, condition, is_outer: !join.is_expanding(catalog) });
        current_table = next_table;
    }
    (frame, current_table)
}

/// The equality pairs a join imposes, in `(left_column, right_column)`
/// order where `left` is `join.origin(catalog)` and `right` is
/// `join.target(catalog)`.
fn join_equalities(catalog: &Catalog, join: &Join) -> Vec<(ColumnId, ColumnId)> {
    let fk = catalog.foreign_key(join.foreign_key());
    match join {
        Join::Direct(_) => fk.origin_columns.iter().copied().zip(fk.target_columns.iter().copied()).collect(),
        Join::Reverse(_) => fk.target_columns.iter().copied().zip(fk.origin_columns.iter().copied()).collect(),
    }
}

fn join_condition(catalog: &Catalog, join: &Join, left_alias: &str, right_alias: &str) -> Phrase {
    let pairs = join_equalities(catalog, join);
    let mut terms = pairs.into_iter().map(|(left_col, right_col)| Phrase::Formula {
        name: "=".to_string(),
        args: vec![
            Phrase::Column { frame_alias: left_alias.to_string(), column: left_col, domain: catalog.column(left_col).domain.clone() },
            Phrase::Column { frame_alias: right_alias.to_string(), column: right_col, domain: catalog.column(right_col).domain.clone() },
        ],
        domain: Domain::Boolean,
    });
    let first = terms.next().expect("a foreign key has at least one column pair");
    terms.fold(first, |acc, next| Phrase::Formula { name: "&".to_string(), args: vec![acc, next], domain: Domain::Boolean })
}

/// Wraps a non-`Branch` frame into an empty-bodied `Branch` over itself, so
/// the `with_*` helpers below have a single shape to extend. The wrapped
/// frame's own alias is reused since this doesn't introduce a new query
/// boundary, just attaches clauses to the existing one.
fn as_branch(frame: Frame) -> (String, Box<Frame>, Vec<FrameJoin>, Vec<(String, Phrase)>, Option<Phrase>, Vec<Phrase>, Option<Phrase>, Vec<(Phrase, bool)>, Option<usize>, Option<usize>) {
    match frame {
        Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset } => {
            (alias, base, joins, select, filter, group, group_filter, order, limit, offset)
        }
        other => {
            let alias = other.alias().to_string();
            (alias, Box::new(other), Vec::new(), Vec::new(), None, Vec::new(), None, Vec::new(), None, None)
        }
    }
}

fn with_join(frame: Frame, join: FrameJoin) -> Frame {
    let (alias, base, mut joins, select, filter, group, group_filter, order, limit, offset) = as_branch(frame);
    joins.push(join);
    Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset }
}

fn with_filter(frame: Frame, predicate: Phrase) -> Frame {
    let (alias, base, joins, select, filter, group, group_filter, order, limit, offset) = as_branch(frame);
    let filter = Some(conjoin(filter, predicate));
    Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset }
}

fn with_order(frame: Frame, order: Vec<(Phrase, bool)>, limit: Option<usize>, offset: Option<usize>) -> Frame {
    let (alias, base, joins, select, filter, group, group_filter, existing_order, existing_limit, existing_offset) = as_branch(frame);
    let order = if order.is_empty() { existing_order } else { order };
    Frame::Branch {
        alias,
        base,
        joins,
        select,
        filter,
        group,
        group_filter,
        order,
        limit: limit.or(existing_limit),
        offset: offset.or(existing_offset),
    }
}

fn with_group(frame: Frame, group: Vec<Phrase>) -> Frame {
    let (alias, base, joins, select, filter, _, group_filter, order, limit, offset) = as_branch(frame);
    Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset }
}

fn conjoin(existing: Option<Phrase>, next: Phrase) -> Phrase {
    match existing {
        Some(existing) => Phrase::Formula { name: "&".to_string(), args: vec![existing, next], domain: Domain::Boolean },
        None => next,
    }
}

fn encode_phrase(catalog: &Catalog, code: &Code, aliases: &mut HashMap<TableId, String>, allocator: &mut AliasAllocator) -> Phrase {
    match code {
        Code::Literal { text, domain } => Phrase::Literal { text: text.clone(), domain: domain.clone() },
        Code::Column { column, domain } => {
            let table = catalog.column(*column).table;
            let frame_alias = aliases
                .get(&table)
                .cloned()
                .unwrap_or_else(|| table_name(catalog, table));
            Phrase::Column { frame_alias, column: *column, domain: domain.clone() }
        }
        Code::Formula { name, args, domain } => Phrase::Formula {
            name: name.clone(),
            args: args.iter().map(|a| encode_phrase(catalog, a, aliases, allocator)).collect(),
            domain: domain.clone(),
        },
        Code::Cast { base, target } => {
            Phrase::Cast { base: Box::new(encode_phrase(catalog, base, aliases, allocator)), target: target.clone() }
        }
        Code::Aggregate { name, plural_space } => assemble_aggregate_subquery(catalog, name, plural_space, aliases, allocator),
        Code::NestedList { outer_table, inner_table, foreign_key, correlate_from_inner, fields } => {
            assemble_nested_list_subquery(
                catalog,
                *outer_table,
                *inner_table,
                *foreign_key,
                *correlate_from_inner,
                fields,
                aliases,
                allocator,
            )
        }
    }
}

fn assemble_aggregate_subquery(
    catalog: &Catalog,
    name: &str,
    plural_space: &Space,
    outer_aliases: &HashMap<TableId, String>,
    allocator: &mut AliasAllocator,
) -> Phrase {
    let Space::JoinProduct { base, joins } = plural_space else {
        panic!("an aggregate's plural space must be a join chain off the enclosing row");
    };
    let Space::Table { table: anchor_table } = base.as_ref() else {
        panic!("an aggregate's plural space must chain directly off a table scope");
    };
    let anchor_alias = outer_aliases
        .get(anchor_table)
        .cloned()
        .unwrap_or_else(|| table_name(catalog, *anchor_table));
    let mut sub_aliases = HashMap::new();
    let mut sub_allocator = AliasAllocator::seeded(allocator.used.iter().cloned());
    let (frame, _) = assemble_correlated_chain(catalog, &anchor_alias, joins, &mut sub_aliases, &mut sub_allocator);
    for alias in &sub_allocator.used {
        allocator.alloc(alias);
    }
    Phrase::AggregateSubquery { name: name.to_string(), frame: Box::new(frame) }
}

fn assemble_nested_list_subquery(
    catalog: &Catalog,
    outer_table: TableId,
    inner_table: TableId,
    foreign_key: crate::catalog::ForeignKeyId,
    _correlate_from_inner: bool,
    fields: &[(String, ColumnId)],
    outer_aliases: &HashMap<TableId, String>,
    allocator: &mut AliasAllocator,
) -> Phrase {
    let anchor_alias = outer_aliases
        .get(&outer_table)
        .cloned()
        .unwrap_or_else(|| table_name(catalog, outer_table));
    let mut sub_allocator = AliasAllocator::seeded(allocator.used.iter().cloned());
    let inner_alias = sub_allocator.alloc(&table_name(catalog, inner_table));

    // `foreign_key` owns `inner_table` when the child lists the parent
    // (correlate_from_inner), otherwise it owns `outer_table`; either way
    // `Join::direct` walks it origin -> target, so the alias on each side
    // is picked by matching table id rather than assuming a fixed order.
    let fk = catalog.foreign_key(foreign_key);
    let join = Join::direct(foreign_key);
    let (origin_alias, target_alias) = if fk.origin == inner_table {
        (&inner_alias, &anchor_alias)
    } else {
        (&anchor_alias, &inner_alias)
    };
    let condition = join_condition(catalog, &join, origin_alias, target_alias);

    let frame = with_filter(Frame::Leaf { alias: inner_alias.clone(), table: inner_table }, condition);
    for alias in &sub_allocator.used {
        allocator.alloc(alias);
    }
    Phrase::JsonListSubquery { frame: Box::new(frame), fields: fields.to_vec() }
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

    fn assemble_query(catalog: &Catalog, query: &str, max_rows: Option<usize>) -> Frame {
        let syntax = parse(query).unwrap();
        let binding = crate::binder::bind_query(catalog, &syntax).unwrap();
        let (space, fields) = crate::encoder::encode_segment(catalog, &binding).unwrap();
        let space = crate::rewrite::rewrite_space(space);
        let term = crate::compile::compile_segment(space, fields);
        assemble(catalog, term, max_rows, true)
    }

    #[test]
    fn bare_table_assembles_to_a_leaf_segment() {
        let catalog = school_department_catalog();
        let frame = assemble_query(&catalog, "/school", None);
        match frame {
            Frame::Segment { base, fields, .. } => {
                assert!(matches!(*base, Frame::Leaf { .. }));
                assert_eq!(fields.len(), 3);
            }
            other => panic!("expected Segment frame, got {other:?}"),
        }
    }

    #[test]
    fn count_aggregate_assembles_to_a_correlated_subquery() {
        let catalog = school_department_catalog();
        let frame = assemble_query(&catalog, "/school{code, count(department)}", None);
        match frame {
            Frame::Segment { fields, .. } => {
                assert!(matches!(fields[1].1, Phrase::AggregateSubquery { .. }));
            }
            other => panic!("expected Segment frame, got {other:?}"),
        }
    }

    #[test]
    fn nested_segment_assembles_to_a_json_list_subquery() {
        let catalog = school_department_catalog();
        let frame = assemble_query(&catalog, "/school{code, /department{code}}", None);
        match frame {
            Frame::Segment { fields, .. } => {
                assert!(matches!(fields[1].1, Phrase::JsonListSubquery { .. }));
            }
            other => panic!("expected Segment frame, got {other:?}"),
        }
    }

    #[test]
    fn safe_patch_wraps_a_non_root_unordered_segment_but_not_the_root() {
        let catalog = school_department_catalog();
        let root = assemble_query(&catalog, "/school", Some(10));
        match root {
            Frame::Segment { base, .. } => assert!(matches!(*base, Frame::Leaf { .. })),
            other => panic!("expected Segment frame, got {other:?}"),
        }

        let syntax = parse("/school").unwrap();
        let binding = crate::binder::bind_query(&catalog, &syntax).unwrap();
        let (space, fields) = crate::encoder::encode_segment(&catalog, &binding).unwrap();
        let term = crate::compile::compile_segment(space, fields);
        let nested = assemble(&catalog, term, Some(10), false);
        match nested {
            Frame::Segment { base, .. } => assert!(matches!(*base, Frame::Branch { limit: Some(10), .. })),
            other => panic!("expected Segment frame, got {other:?}"),
        }
    }
}
