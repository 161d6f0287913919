//! The binder (§4.4): `bind`/`use_recipe`/`call`, coercion, and segment
//! construction. A stateful recursive traversal of [`Syntax`] that threads a
//! `Binding` scope stack (modeled here as explicit `scope: &Binding`
//! parameters rather than a mutable stack, since the traversal never needs
//! to pop past where it started — each recursive call just passes a more
//! specific scope down).
//!
//! Grounded on `original_source/src/htsql/core/tr/bind.py`. The full
//! original dispatches `bind` by syntax-node *class* through the adapter
//! system (§4.1); here it's a single `match` on [`SyntaxKind`], which is the
//! same "Recipe + bind-by-recipe double dispatch ... model as a sum type
//! and implement as a single match" simplification §9 recommends.

use crate::binding::{Binding, BindingKind, SelectionElement};
use crate::catalog::Catalog;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::lookup;
use crate::recipe::Recipe;
use crate::syntax::{Syntax, SyntaxKind};

/// Binds a full query: wraps the top-level expression in a `Collect`
/// binding rooted at the `Home` scope (§4.4 "Segment construction").
pub fn bind_query(catalog: &Catalog, syntax: &Syntax) -> Result<Binding> {
    let root = Binding::new(BindingKind::Root, Domain::Void, syntax.span);
    let home = Binding::new(BindingKind::Home { base: Box::new(root) }, Domain::Void, syntax.span);
    let body = match &syntax.kind {
        SyntaxKind::Collect { base } => base.as_ref(),
        _ => syntax,
    };
    let seed = bind(catalog, body, &home)?;
    collect(catalog, seed, syntax)
}

/// Wraps `seed` in a `Collect` binding, applying the implicit wildcard
/// expansion a plain table/quotient flow gets when it isn't followed by an
/// explicit `{...}` selection (§4.4 "Segment construction").
fn collect(catalog: &Catalog, seed: Binding, syntax: &Syntax) -> Result<Binding> {
    let seed = if matches!(seed.domain, Domain::Untyped) {
        expand_default_selection(catalog, seed, syntax)?
    } else {
        seed
    };
    let domain = Domain::list(seed.domain.clone());
    Ok(Binding::new(BindingKind::Collect { seed: Box::new(seed) }, domain, syntax.span))
}

/// Finds the innermost table/quotient scope underneath chaining/decorating
/// wrappers (`Sieve`, `Sort`, `Direction`, `Cast`) that don't change what a
/// bare flow expression ultimately selects.
fn resolve_scope(binding: &Binding) -> &Binding {
    match &binding.kind {
        BindingKind::Sieve { base, .. }
        | BindingKind::Sort { base, .. }
        | BindingKind::Direction { base, .. }
        | BindingKind::Cast { base, .. } => resolve_scope(base),
        _ => binding,
    }
}

fn expand_default_selection(catalog: &Catalog, seed: Binding, syntax: &Syntax) -> Result<Binding> {
    let scope = resolve_scope(&seed).clone();
    let elements = match &scope.kind {
        BindingKind::Table { table, .. } | BindingKind::Chain { table, .. } => catalog
            .table(*table)
            .column_order
            .iter()
            .map(|&column| {
                let col = catalog.column(column);
                SelectionElement {
                    name: crate::graph::normalize_name(&col.name),
                    binding: Binding::new(
                        BindingKind::Column { base: Box::new(scope.clone()), column },
                        col.domain.clone(),
                        syntax.span,
                    ),
                }
            })
            .collect::<Vec<_>>(),
        BindingKind::Quotient { kernel, .. } => kernel
            .iter()
            .enumerate()
            .map(|(idx, k)| SelectionElement {
                name: kernel_column_name(catalog, k).unwrap_or_else(|| format!("kernel{idx}")),
                binding: k.clone(),
            })
            .collect::<Vec<_>>(),
        _ => {
            return Err(Error::bind("a flow expression must resolve to a table or quotient to be selected")
                .with_frame("binding a segment", Some(syntax.span)))
        }
    };
    let fields = elements
        .iter()
        .map(|e| crate::domain::RecordField { name: e.name.clone(), domain: e.binding.domain.clone() })
        .collect();
    Ok(Binding::new(
        BindingKind::Selection { base: Box::new(seed), elements },
        Domain::record(fields),
        syntax.span,
    ))
}

fn kernel_column_name(catalog: &Catalog, binding: &Binding) -> Option<String> {
    match &binding.kind {
        BindingKind::Column { column, .. } => Some(crate::graph::normalize_name(&catalog.column(*column).name)),
        _ => None,
    }
}

pub fn bind(catalog: &Catalog, syntax: &Syntax, scope: &Binding) -> Result<Binding> {
    match &syntax.kind {
        SyntaxKind::Void => Ok(scope.clone()),
        SyntaxKind::Group { base } => bind(catalog, base, scope),
        SyntaxKind::Identifier { text } => bind_identifier(catalog, syntax, text, scope),
        SyntaxKind::Function { id, args } => bind_function(catalog, syntax, id, args, scope),
        SyntaxKind::Compose { left, right } => bind_compose(catalog, syntax, left, right, scope),
        SyntaxKind::Filter { base, predicate } => bind_filter(catalog, syntax, base, predicate, scope),
        SyntaxKind::Project { base, kernel } => bind_project(catalog, syntax, base, kernel, scope),
        SyntaxKind::Select { base, record } => bind_select(catalog, syntax, base, record, scope),
        SyntaxKind::Direction { base, is_ascending } => {
            let inner = bind(catalog, base, scope)?;
            let domain = inner.domain.clone();
            Ok(Binding::new(
                BindingKind::Direction { base: Box::new(inner), is_ascending: *is_ascending },
                domain,
                syntax.span,
            ))
        }
        SyntaxKind::Operator { sym, left, right } => bind_operator(catalog, syntax, sym, left, right, scope),
        SyntaxKind::Prefix { sym, arm } => bind_prefix(catalog, syntax, sym, arm, scope),
        SyntaxKind::Collect { base } => {
            // A nested segment (§8 scenario 5): re-bound from `Home`, not
            // from the enclosing scope — leading `/` always restarts
            // navigation at the database root. Correlation to the
            // enclosing row is established later, at encode time, via the
            // foreign key the encoder finds between the two tables.
            let root = Binding::new(BindingKind::Root, Domain::Void, syntax.span);
            let home = Binding::new(BindingKind::Home { base: Box::new(root) }, Domain::Void, syntax.span);
            let seed = bind(catalog, base, &home)?;
            collect(catalog, seed, syntax)
        }
        SyntaxKind::Integer { text } => {
            Ok(Binding::new(BindingKind::Literal { text: text.clone() }, Domain::Integer, syntax.span))
        }
        SyntaxKind::Decimal { text } => {
            Ok(Binding::new(BindingKind::Literal { text: text.clone() }, Domain::Decimal, syntax.span))
        }
        SyntaxKind::Float { text } => {
            Ok(Binding::new(BindingKind::Literal { text: text.clone() }, Domain::Float, syntax.span))
        }
        SyntaxKind::String { text } => {
            Ok(Binding::new(BindingKind::Literal { text: text.clone() }, Domain::Text, syntax.span))
        }
        SyntaxKind::Reference { id } => Err(Error::bind(format!(
            "reference parameters ('${id}') are not supported"
        ))
        .with_frame("binding a reference", Some(syntax.span))),
        other => Err(Error::bind(format!("unsupported syntax node {other:?}"))
            .with_frame("binding", Some(syntax.span))),
    }
}

fn bind_identifier(catalog: &Catalog, syntax: &Syntax, text: &str, scope: &Binding) -> Result<Binding> {
    let name = crate::graph::normalize_name(text);
    match lookup::lookup_attribute(catalog, scope, &name, None) {
        Some(recipe) => use_recipe(catalog, recipe, syntax, scope),
        None => {
            let alternatives = suggest(&name, &lookup::attribute_set(catalog, scope));
            Err(Error::bind(format!("Found unknown attribute '{text}'"))
                .with_alternatives(alternatives)
                .with_frame("binding an identifier", Some(syntax.span)))
        }
    }
}

/// Converts a resolved [`Recipe`] into a concrete [`Binding`] (§4.4 "the
/// binder converts each recipe to a concrete binding via a second
/// dispatch").
pub fn use_recipe(catalog: &Catalog, recipe: Recipe, syntax: &Syntax, scope: &Binding) -> Result<Binding> {
    match recipe {
        Recipe::FreeTable { table } => Ok(Binding::new(
            BindingKind::Table { base: Box::new(scope.clone()), table },
            Domain::Untyped,
            syntax.span,
        )),
        Recipe::AttachedTable { table, joins } => Ok(Binding::new(
            BindingKind::Chain { base: Box::new(scope.clone()), joins, table },
            Domain::Untyped,
            syntax.span,
        )),
        Recipe::Column { column, .. } => {
            let domain = catalog.column(column).domain.clone();
            Ok(Binding::new(
                BindingKind::Column { base: Box::new(scope.clone()), column },
                domain,
                syntax.span,
            ))
        }
        Recipe::Kernel { idx } => match &scope.kind {
            BindingKind::Quotient { kernel, .. } => Ok(kernel[idx].clone()),
            _ => Err(Error::compile("kernel recipe used outside a quotient scope")
                .with_frame("binding a kernel reference", Some(syntax.span))),
        },
        Recipe::Ambiguous { alternatives } => Err(Error::bind("ambiguous name")
            .with_alternatives(alternatives)
            .with_frame("binding an ambiguous name", Some(syntax.span))),
        Recipe::Binding { binding } => Ok(*binding),
        Recipe::Closed { recipe } => use_recipe(catalog, *recipe, syntax, scope),
        Recipe::Literal | Recipe::Identity { .. } | Recipe::Chain { .. } | Recipe::Substitution { .. }
        | Recipe::Complement | Recipe::Invalid => Err(Error::bind("name resolves to an unsupported recipe kind")
            .with_frame("binding", Some(syntax.span))),
    }
}

/// Binds a call-syntax function reference (`count(x)`, `sum(x)`, `null()`,
/// ...), consulting the generated signature table (§4.4 "call(syntax,
/// scope?) -> Binding: invokes the global function/identifier protocol by
/// name + arity") for every name it recognizes. A name the table doesn't
/// carry still binds, falling back to the first-argument-domain heuristic,
/// so scalar SQL functions with no HTSQL-level signature (e.g. `upper`)
/// still pass through to the serializer unchanged.
fn bind_function(catalog: &Catalog, syntax: &Syntax, id: &str, args: &[Syntax], scope: &Binding) -> Result<Binding> {
    let mut bound_args = Vec::with_capacity(args.len());
    for arg in args {
        bound_args.push(bind(catalog, arg, scope)?);
    }
    let domain = match crate::generated::lookup(id) {
        Some(signature) => {
            if !signature.accepts_arity(bound_args.len()) {
                return Err(Error::bind(format!(
                    "'{id}' takes {arity_desc}, got {given}",
                    arity_desc = arity_description(signature.min_arity, signature.max_arity),
                    given = bound_args.len(),
                ))
                .with_frame(format!("binding a call to '{id}'"), Some(syntax.span)));
            }
            match signature.result {
                crate::generated::ResultDomain::Boolean => Domain::Boolean,
                crate::generated::ResultDomain::Integer => Domain::Integer,
                crate::generated::ResultDomain::SameAsFirst => {
                    bound_args.first().map(|a| a.domain.clone()).unwrap_or(Domain::Untyped)
                }
                crate::generated::ResultDomain::Untyped => Domain::Untyped,
            }
        }
        None => bound_args.first().map(|a| a.domain.clone()).unwrap_or(Domain::Untyped),
    };
    Ok(Binding::new(
        BindingKind::Formula { name: id.to_string(), args: bound_args },
        domain,
        syntax.span,
    ))
}

fn arity_description(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{min} argument{}", if min == 1 { "" } else { "s" }),
        Some(max) => format!("{min}-{max} arguments"),
        None => format!("at least {min} argument{}", if min == 1 { "" } else { "s" }),
    }
}

fn bind_compose(catalog: &Catalog, syntax: &Syntax, left: &Syntax, right: &Syntax, scope: &Binding) -> Result<Binding> {
    let left_binding = bind(catalog, left, scope)?;
    if let SyntaxKind::Function { id, args } = &right.kind {
        match id.as_str() {
            "limit" | "offset" => {
                let n = parse_usize_arg(args, syntax)?;
                return Ok(wrap_sort(left_binding, id == "limit", n, syntax.span));
            }
            "sort" => {
                let mut order = Vec::with_capacity(args.len());
                for arg in args {
                    let bound = bind(catalog, arg, &left_binding)?;
                    let (sign, base) = lookup::direction(&bound);
                    order.push((base.clone(), sign >= 0));
                }
                let domain = left_binding.domain.clone();
                return Ok(Binding::new(
                    BindingKind::Sort { base: Box::new(left_binding), order, limit: None, offset: None },
                    domain,
                    syntax.span,
                ));
            }
            _ => {}
        }
    }
    bind(catalog, right, &left_binding)
}

fn wrap_sort(base: Binding, is_limit: bool, n: usize, span: crate::syntax::Span) -> Binding {
    let domain = base.domain.clone();
    if let BindingKind::Sort { base: inner, order, mut limit, mut offset } = base.kind {
        if is_limit {
            limit = Some(n);
        } else {
            offset = Some(n);
        }
        return Binding::new(BindingKind::Sort { base: inner, order, limit, offset }, domain, span);
    }
    let (limit, offset) = if is_limit { (Some(n), None) } else { (None, Some(n)) };
    Binding::new(
        BindingKind::Sort { base: Box::new(base), order: Vec::new(), limit, offset },
        domain,
        span,
    )
}

fn parse_usize_arg(args: &[Syntax], syntax: &Syntax) -> Result<usize> {
    match args.first().map(|a| &a.kind) {
        Some(SyntaxKind::Integer { text }) => text
            .parse::<usize>()
            .map_err(|_| Error::bind(format!("invalid integer literal '{text}'")).with_frame("binding", Some(syntax.span))),
        _ => Err(Error::bind("expected a single integer argument").with_frame("binding", Some(syntax.span))),
    }
}

fn bind_filter(catalog: &Catalog, syntax: &Syntax, base: &Syntax, predicate: &Syntax, scope: &Binding) -> Result<Binding> {
    let base_binding = bind(catalog, base, scope)?;
    let predicate_binding = bind(catalog, predicate, &base_binding)?;
    let predicate_binding = coerce_to(predicate_binding, &Domain::Boolean, syntax)?;
    let domain = base_binding.domain.clone();
    Ok(Binding::new(
        BindingKind::Sieve { base: Box::new(base_binding), filter: Box::new(predicate_binding) },
        domain,
        syntax.span,
    ))
}

fn bind_project(catalog: &Catalog, syntax: &Syntax, base: &Syntax, kernel: &Syntax, scope: &Binding) -> Result<Binding> {
    let base_binding = bind(catalog, base, scope)?;
    let kernel_binding = bind(catalog, kernel, &base_binding)?;
    let domain = base_binding.domain.clone();
    Ok(Binding::new(
        BindingKind::Quotient { base: Box::new(base_binding), kernel: vec![kernel_binding] },
        domain,
        syntax.span,
    ))
}

fn bind_select(catalog: &Catalog, syntax: &Syntax, base: &Syntax, record: &Syntax, scope: &Binding) -> Result<Binding> {
    let base_binding = bind(catalog, base, scope)?;
    let arms = match &record.kind {
        SyntaxKind::Record { arms } => arms.as_slice(),
        _ => std::slice::from_ref(record),
    };
    let mut elements = Vec::with_capacity(arms.len());
    for arm in arms {
        let (name, bound) = bind_selection_element(catalog, arm, &base_binding)?;
        elements.push(SelectionElement { name, binding: bound });
    }
    let fields = elements
        .iter()
        .map(|e| crate::domain::RecordField { name: e.name.clone(), domain: e.binding.domain.clone() })
        .collect();
    Ok(Binding::new(
        BindingKind::Selection { base: Box::new(base_binding), elements },
        Domain::record(fields),
        syntax.span,
    ))
}

fn bind_selection_element(catalog: &Catalog, arm: &Syntax, scope: &Binding) -> Result<(String, Binding)> {
    match &arm.kind {
        SyntaxKind::Assign { lhs, rhs } => {
            let name = element_name(lhs);
            Ok((name, bind(catalog, rhs, scope)?))
        }
        SyntaxKind::Identifier { text } => Ok((crate::graph::normalize_name(text), bind(catalog, arm, scope)?)),
        SyntaxKind::Function { id, .. } => Ok((crate::graph::normalize_name(id), bind(catalog, arm, scope)?)),
        SyntaxKind::Collect { base } => Ok((element_name(base), bind(catalog, arm, scope)?)),
        SyntaxKind::Direction { base, .. } => bind_selection_element(catalog, base, scope),
        _ => Ok(("column".to_string(), bind(catalog, arm, scope)?)),
    }
}

fn element_name(syntax: &Syntax) -> String {
    match &syntax.kind {
        SyntaxKind::Identifier { text } => crate::graph::normalize_name(text),
        SyntaxKind::Function { id, .. } => crate::graph::normalize_name(id),
        _ => "column".to_string(),
    }
}

fn bind_operator(catalog: &Catalog, syntax: &Syntax, sym: &str, left: &Syntax, right: &Syntax, scope: &Binding) -> Result<Binding> {
    let left_binding = bind(catalog, left, scope)?;
    let right_binding = bind(catalog, right, scope)?;
    const COMPARISONS: &[&str] = &["=", "!=", "==", "!==", "<", "<=", ">", ">=", "~", "!~"];
    const LOGICAL: &[&str] = &["|", "&"];
    let (left_binding, right_binding, domain) = if COMPARISONS.contains(&sym) {
        let common = left_binding
            .domain
            .coerce(&right_binding.domain)
            .ok_or_else(|| {
                Error::bind(format!(
                    "cannot compare incompatible types {:?} and {:?}",
                    left_binding.domain, right_binding.domain
                ))
                .with_frame("binding a comparison", Some(syntax.span))
            })?;
        (
            coerce_to(left_binding, &common, syntax)?,
            coerce_to(right_binding, &common, syntax)?,
            Domain::Boolean,
        )
    } else if LOGICAL.contains(&sym) {
        (
            coerce_to(left_binding, &Domain::Boolean, syntax)?,
            coerce_to(right_binding, &Domain::Boolean, syntax)?,
            Domain::Boolean,
        )
    } else {
        let common = left_binding
            .domain
            .coerce(&right_binding.domain)
            .ok_or_else(|| {
                Error::bind(format!(
                    "cannot apply '{sym}' to incompatible types {:?} and {:?}",
                    left_binding.domain, right_binding.domain
                ))
                .with_frame("binding an arithmetic expression", Some(syntax.span))
            })?;
        (
            coerce_to(left_binding, &common, syntax)?,
            coerce_to(right_binding, &common, syntax)?,
            common,
        )
    };
    Ok(Binding::new(
        BindingKind::Formula { name: sym.to_string(), args: vec![left_binding, right_binding] },
        domain,
        syntax.span,
    ))
}

fn bind_prefix(catalog: &Catalog, syntax: &Syntax, sym: &str, arm: &Syntax, scope: &Binding) -> Result<Binding> {
    let arm_binding = bind(catalog, arm, scope)?;
    let domain = if sym == "!" {
        Domain::Boolean
    } else {
        arm_binding.domain.clone()
    };
    let arm_binding = if sym == "!" { coerce_to(arm_binding, &Domain::Boolean, syntax)? } else { arm_binding };
    Ok(Binding::new(
        BindingKind::Formula { name: format!("unary{sym}"), args: vec![arm_binding] },
        domain,
        syntax.span,
    ))
}

/// Inserts an implicit cast when `binding`'s domain isn't already `target`
/// (§4.4 "Type coercion").
fn coerce_to(binding: Binding, target: &Domain, syntax: &Syntax) -> Result<Binding> {
    if &binding.domain == target {
        return Ok(binding);
    }
    if binding.domain.coerce(target).as_ref() != Some(target) {
        return Err(Error::bind(format!(
            "cannot coerce {:?} to {:?}",
            binding.domain, target
        ))
        .with_frame("binding a cast", Some(syntax.span)));
    }
    let span = binding.span;
    Ok(Binding::new(
        BindingKind::Cast { base: Box::new(binding), target: target.clone() },
        target.clone(),
        span,
    ))
}

/// Levenshtein-nearest-name suggestion for "did you mean?" hints (§8
/// scenario 6).
fn suggest(name: &str, candidates: &[String]) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = candidates.iter().map(|c| (edit_distance(name, c), c)).collect();
    scored.sort_by_key(|(d, _)| *d);
    scored
        .into_iter()
        .filter(|(d, _)| *d <= 2)
        .take(3)
        .map(|(_, c)| c.clone())
        .collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let cur = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = cur;
        }
    }
    row[b.len()]
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

    #[test]
    fn binds_a_bare_table_reference() {
        let catalog = school_department_catalog();
        let syntax = parse("/school").unwrap();
        let binding = bind_query(&catalog, &syntax).unwrap();
        assert!(matches!(binding.domain, Domain::List { .. }));
    }

    #[test]
    fn binds_filter_with_coerced_comparison() {
        let catalog = school_department_catalog();
        let syntax = parse("/school?code='eng'").unwrap();
        let binding = bind_query(&catalog, &syntax).unwrap();
        assert!(matches!(binding.domain, Domain::List { .. }));
    }

    #[test]
    fn unknown_attribute_reports_did_you_mean() {
        let catalog = school_department_catalog();
        let syntax = parse("/schoool").unwrap();
        let err = bind_query(&catalog, &syntax).unwrap_err();
        assert!(err.to_string().contains("unknown attribute"));
        assert!(err.did_you_mean.contains(&"school".to_string()));
    }

    #[test]
    fn selection_builds_a_record_domain() {
        let catalog = school_department_catalog();
        let syntax = parse("/school{code, name}").unwrap();
        let binding = bind_query(&catalog, &syntax).unwrap();
        match &binding.domain {
            Domain::List { item } => assert!(matches!(&**item, Domain::Record { fields } if fields.len() == 2)),
            other => panic!("expected List(Record), got {other:?}"),
        }
    }
}
