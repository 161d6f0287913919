//! The encoder (§4.6): turns a bound [`Binding`] tree into the [`Space`]/
//! [`Code`] pair `compile` lowers to [`crate::term::Term`]s.
//!
//! Grounded on `original_source/src/htsql/core/tr/encode.py`'s `Encode`
//! adapter, collapsed the same way `bind`/`use_recipe` were: one function
//! per IR half instead of one class per binding subtype. `relate` walks a
//! binding's scope chain to the [`Space`] its rows come from; `encode` turns
//! a scalar-typed binding into a [`Code`] evaluated against that space.
//! `encode_segment` is the entry point, producing the output row shape for
//! one `/`-rooted segment (top-level or nested, §8 scenario 5).

use crate::binding::{Binding, BindingKind};
use crate::catalog::{Catalog, ForeignKeyId, TableId};
use crate::code::Code;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::space::Space;

/// Aggregate-style calls: the sole argument names a plural (one-to-many)
/// sub-flow rather than a scalar expression, so it's `relate`d into a
/// correlated [`Space`] instead of `encode`d into a [`Code`] (§4.6
/// "Aggregates"). Backed by the generated function signature table's
/// `is_aggregate` flag rather than a second hardcoded name list.
fn is_aggregate_call(name: &str) -> bool {
    crate::generated::lookup(name).is_some_and(|sig| sig.is_aggregate)
}

/// Encodes one `/`-rooted segment: its row [`Space`] plus the named
/// [`Code`]s it projects. `binding` must be a [`BindingKind::Collect`] (the
/// top-level query binding, or a nested segment bound inside a selection).
pub fn encode_segment(catalog: &Catalog, binding: &Binding) -> Result<(Space, Vec<(String, Code)>)> {
    let seed = match &binding.kind {
        BindingKind::Collect { seed } => seed.as_ref(),
        _ => {
            return Err(Error::encode("expected a segment binding")
                .with_frame("encoding a segment", Some(binding.span)))
        }
    };
    match &seed.kind {
        BindingKind::Selection { base, elements } => {
            let row_space = relate(catalog, base)?;
            let mut fields = Vec::with_capacity(elements.len());
            for element in elements {
                let code = if matches!(element.binding.kind, BindingKind::Collect { .. }) {
                    encode_nested_list(catalog, &element.binding, &row_space)?
                } else {
                    encode(catalog, &element.binding, &row_space)?
                };
                fields.push((element.name.clone(), code));
            }
            Ok((row_space, fields))
        }
        // A bare scalar segment, e.g. `/count(school)` with no selection:
        // one unnamed field over the scalar space.
        _ => {
            let row_space = Space::Scalar;
            let code = encode(catalog, seed, &row_space)?;
            Ok((row_space, vec![("value".to_string(), code)]))
        }
    }
}

/// `Relate(binding)`: the [`Space`] whose rows `binding`'s scope ranges
/// over. Decorating bindings (`Sieve`, `Sort`, `Direction`, `Cast`,
/// `Selection`) fold their effect into the space and recurse on `base`;
/// `Table`/`Chain`/`Quotient` introduce the space variants that carry it.
pub fn relate(catalog: &Catalog, binding: &Binding) -> Result<Space> {
    match &binding.kind {
        BindingKind::Root | BindingKind::Home { .. } => Ok(Space::Scalar),
        BindingKind::Table { table, .. } => Ok(Space::Table { table: *table }),
        BindingKind::Chain { base, joins, table: _ } => {
            let base_space = relate(catalog, base)?;
            Ok(Space::JoinProduct { base: Box::new(base_space), joins: joins.clone() })
        }
        BindingKind::Column { base, .. } => relate(catalog, base),
        BindingKind::Sieve { base, filter } => {
            let base_space = relate(catalog, base)?;
            let predicate = encode(catalog, filter, &base_space)?;
            Ok(Space::Filtered { base: Box::new(base_space), predicate })
        }
        BindingKind::Sort { base, order, limit, offset } => {
            let base_space = relate(catalog, base)?;
            let mut encoded_order = Vec::with_capacity(order.len());
            for (key, is_ascending) in order {
                encoded_order.push((encode(catalog, key, &base_space)?, *is_ascending));
            }
            Ok(Space::Ordered {
                base: Box::new(base_space),
                order: encoded_order,
                limit: *limit,
                offset: *offset,
            })
        }
        BindingKind::Quotient { base, kernel } => {
            let base_space = relate(catalog, base)?;
            let mut encoded_kernel = Vec::with_capacity(kernel.len());
            for k in kernel {
                encoded_kernel.push(encode(catalog, k, &base_space)?);
            }
            Ok(Space::Quotient { base: Box::new(base_space), kernel: encoded_kernel })
        }
        BindingKind::Selection { base, .. } => relate(catalog, base),
        BindingKind::Direction { base, .. } => relate(catalog, base),
        BindingKind::Cast { base, .. } => relate(catalog, base),
        BindingKind::Reroute { target } => relate(catalog, target),
        BindingKind::Collect { seed } => relate(catalog, seed),
        BindingKind::Literal { .. } | BindingKind::Formula { .. } => Ok(Space::Scalar),
    }
}

/// `Encode(binding, space)`: the scalar [`Code`] `binding` evaluates to
/// against the row space `space` established by an enclosing `relate`.
pub fn encode(catalog: &Catalog, binding: &Binding, row_space: &Space) -> Result<Code> {
    match &binding.kind {
        BindingKind::Literal { text } => Ok(Code::Literal { text: text.clone(), domain: binding.domain.clone() }),
        BindingKind::Column { column, .. } => {
            Ok(Code::Column { column: *column, domain: binding.domain.clone() })
        }
        BindingKind::Formula { name, args } => encode_formula(catalog, name, args, row_space, binding),
        BindingKind::Cast { base, target } => Ok(Code::Cast {
            base: Box::new(encode(catalog, base, row_space)?),
            target: target.clone(),
        }),
        BindingKind::Direction { base, .. } => encode(catalog, base, row_space),
        BindingKind::Reroute { target } => encode(catalog, target, row_space),
        // A table/chain reference used as a scalar value (e.g. bare
        // `department` inside `count(department)`) has no direct Code
        // rendering on its own — `encode_formula` intercepts these before
        // reaching here for the aggregate functions that accept them.
        other => Err(Error::encode(format!("{other:?} cannot be encoded as a scalar expression"))
            .with_frame("encoding a value", Some(binding.span))),
    }
}

fn encode_formula(
    catalog: &Catalog,
    name: &str,
    args: &[Binding],
    row_space: &Space,
    binding: &Binding,
) -> Result<Code> {
    if is_aggregate_call(name) && args.len() == 1 {
        let plural_space = relate(catalog, &args[0])?;
        return Ok(Code::Aggregate { name: name.to_string(), plural_space: Box::new(plural_space) });
    }
    let mut encoded_args = Vec::with_capacity(args.len());
    for arg in args {
        encoded_args.push(encode(catalog, arg, row_space)?);
    }
    Ok(Code::Formula { name: name.to_string(), args: encoded_args, domain: binding.domain.clone() })
}

/// Encodes a nested segment inside a selection (§8 scenario 5) as a
/// correlated [`Code::NestedList`]: finds the foreign key connecting the
/// outer row's table to the inner segment's table, rather than
/// implementing the original's general space-masking correlation
/// algorithm (see DESIGN.md).
fn encode_nested_list(catalog: &Catalog, nested: &Binding, outer_space: &Space) -> Result<Code> {
    let seed = match &nested.kind {
        BindingKind::Collect { seed } => seed.as_ref(),
        _ => {
            return Err(Error::encode("expected a nested segment binding")
                .with_frame("encoding a nested segment", Some(nested.span)))
        }
    };
    let (inner_base, elements) = match &seed.kind {
        BindingKind::Selection { base, elements } => (base.as_ref(), elements.as_slice()),
        _ => {
            return Err(Error::encode("a nested segment must select an explicit record")
                .with_frame("encoding a nested segment", Some(nested.span)))
        }
    };
    let inner_space = relate(catalog, inner_base)?;
    let outer_table = outer_space
        .table_of(catalog)
        .ok_or_else(|| Error::encode("a nested segment's outer row must come from a table")
            .with_frame("encoding a nested segment", Some(nested.span)))?;
    let inner_table = inner_space
        .table_of(catalog)
        .ok_or_else(|| Error::encode("a nested segment must itself come from a table")
            .with_frame("encoding a nested segment", Some(nested.span)))?;

    let (foreign_key, correlate_from_inner) = find_connecting_key(catalog, outer_table, inner_table)
        .ok_or_else(|| {
            Error::encode(format!(
                "no foreign key connects table {inner_table} to table {outer_table} for this nested segment"
            ))
            .with_frame("encoding a nested segment", Some(nested.span))
        })?;

    let mut fields = Vec::with_capacity(elements.len());
    for element in elements {
        match &element.binding.kind {
            BindingKind::Column { column, .. } => fields.push((element.name.clone(), *column)),
            _ => {
                return Err(Error::encode("a nested segment's fields must be plain columns")
                    .with_frame("encoding a nested segment", Some(element.binding.span)))
            }
        }
    }

    Ok(Code::NestedList { outer_table, inner_table, foreign_key, correlate_from_inner, fields })
}

/// The foreign key linking `outer_table` and `inner_table`, whichever way
/// it runs, plus `correlate_from_inner`: `true` when `inner_table` owns the
/// key (it has a column referencing `outer_table`'s primary key — the
/// common "child lists parent" shape); `false` when `outer_table` owns it.
fn find_connecting_key(
    catalog: &Catalog,
    outer_table: TableId,
    inner_table: TableId,
) -> Option<(ForeignKeyId, bool)> {
    for &fk_id in &catalog.table(inner_table).foreign_keys {
        if catalog.foreign_key(fk_id).target == outer_table {
            return Some((fk_id, true));
        }
    }
    for &fk_id in &catalog.table(outer_table).foreign_keys {
        if catalog.foreign_key(fk_id).target == inner_table {
            return Some((fk_id, false));
        }
    }
    None
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

    fn encode_query(catalog: &Catalog, query: &str) -> (Space, Vec<(String, Code)>) {
        let syntax = parse(query).unwrap();
        let binding = crate::binder::bind_query(catalog, &syntax).unwrap();
        encode_segment(catalog, &binding).unwrap()
    }

    #[test]
    fn bare_table_reference_selects_every_column_as_code() {
        let catalog = school_department_catalog();
        let (space, fields) = encode_query(&catalog, "/school");
        assert!(matches!(space, Space::Table { .. }));
        assert_eq!(fields.len(), 3);
        assert!(matches!(fields[0].1, Code::Column { .. }));
    }

    #[test]
    fn filter_then_select_wraps_a_filtered_space() {
        let catalog = school_department_catalog();
        let (space, fields) = encode_query(&catalog, "/school?code='eng'{code, name}");
        assert!(matches!(space, Space::Filtered { .. }));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn project_by_kernel_produces_a_quotient_space() {
        let catalog = school_department_catalog();
        let (space, fields) = encode_query(&catalog, "/school^code");
        assert!(matches!(space, Space::Quotient { .. }));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn count_of_reverse_chain_produces_an_aggregate_code() {
        let catalog = school_department_catalog();
        let (_, fields) = encode_query(&catalog, "/school{code, count(department)}");
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[1].1, Code::Aggregate { .. }));
    }

    #[test]
    fn sort_and_limit_produce_an_ordered_space() {
        let catalog = school_department_catalog();
        let (space, _) = encode_query(&catalog, "/school.sort(code).limit(5)");
        match space {
            Space::Ordered { limit, order, .. } => {
                assert_eq!(limit, Some(5));
                assert_eq!(order.len(), 1);
            }
            other => panic!("expected Ordered space, got {other:?}"),
        }
    }

    #[test]
    fn nested_segment_is_encoded_as_a_correlated_nested_list() {
        let catalog = school_department_catalog();
        let (_, fields) = encode_query(&catalog, "/school{code, /department{code}}");
        assert_eq!(fields.len(), 2);
        match &fields[1].1 {
            Code::NestedList { outer_table, inner_table, correlate_from_inner, fields, .. } => {
                assert!(correlate_from_inner);
                assert_eq!(fields.len(), 1);
                let school = catalog.schema_by_name("public").unwrap().tables["school"];
                let department = catalog.schema_by_name("public").unwrap().tables["department"];
                assert_eq!(*outer_table, school);
                assert_eq!(*inner_table, department);
            }
            other => panic!("expected NestedList code, got {other:?}"),
        }
    }
}
