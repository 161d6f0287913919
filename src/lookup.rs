//! Lookup (§4.5): a family of probes dispatched against binding nodes,
//! resolving by walking the scope chain through `base` when a binding
//! doesn't answer directly.
//!
//! Grounded on `original_source/src/htsql/core/tr/lookup.py`'s probe
//! classes; reduced to the probes the binder actually issues for the
//! operations SPEC_FULL.md names: `AttributeProbe`, `AttributeSetProbe`,
//! `ExpansionProbe`, `DirectionProbe`, `IdentityProbe`. `ReferenceProbe`/
//! `ReferenceSetProbe` ($-references) and the `Guess*Probe` display-metadata
//! family are declared but not wired into `bind` (no `$name` syntax node
//! reaches lookup given the parser's current grammar, and header/tag/path
//! decoration is synthesized directly in `execute::Profile` instead of via
//! a probe round-trip) — see DESIGN.md.

use crate::binding::{Binding, BindingKind};
use crate::catalog::Catalog;
use crate::classify;
use crate::graph::{ArcKind, Node};
use crate::recipe::Recipe;

/// Resolves a kernel element's display name, if it is a bare column
/// reference. Used by both [`attribute_probe`] and [`attribute_set`] so a
/// quotient's kernel can be addressed by its real column name (e.g.
/// `school^code` exposes `code`, matching [`crate::binder::kernel_column_name`]).
fn kernel_display_name(catalog: &Catalog, binding: &Binding) -> Option<String> {
    match &binding.kind {
        BindingKind::Column { column, .. } => Some(catalog.column(*column).name.clone()),
        _ => None,
    }
}

/// `AttributeProbe(name, arity)`: the recipe bound to `name` in `scope`,
/// or `None` if unresolved here (the caller then tries `scope.base()`).
pub fn attribute_probe(catalog: &Catalog, scope: &Binding, name: &str, arity: Option<usize>) -> Option<Recipe> {
    match &scope.kind {
        BindingKind::Home { .. } => {
            let labels = classify::classify_home(catalog);
            resolve_table_label(&labels, name, arity)
        }
        BindingKind::Table { table, .. } | BindingKind::Chain { table, .. } => {
            let labels = classify::classify_table(catalog, *table);
            resolve_column_label(&labels, name, arity)
        }
        BindingKind::Quotient { kernel, .. } => kernel.iter().enumerate().find_map(|(idx, k)| {
            kernel_display_name(catalog, k)
                .filter(|n| n == name)
                .map(|_| Recipe::Kernel { idx })
        }),
        BindingKind::Reroute { target } => attribute_probe(catalog, target, name, arity),
        _ => None,
    }
}

/// Walks `base` pointers until a scope answers, or returns `None`.
pub fn lookup_attribute(catalog: &Catalog, scope: &Binding, name: &str, arity: Option<usize>) -> Option<Recipe> {
    let mut current = Some(scope);
    while let Some(node) = current {
        if let Some(recipe) = attribute_probe(catalog, node, name, arity) {
            return Some(recipe);
        }
        current = node.base();
    }
    None
}

/// `AttributeSetProbe`: every `(name, arity)` visible from `scope`, used to
/// build "did you mean?" hints (§4.5, §8 scenario 6).
pub fn attribute_set(catalog: &Catalog, scope: &Binding) -> Vec<String> {
    let mut current = Some(scope);
    let mut names = Vec::new();
    while let Some(node) = current {
        match &node.kind {
            BindingKind::Home { .. } => {
                names.extend(classify::classify_home(catalog).into_iter().map(|l| l.name));
            }
            BindingKind::Table { table, .. } | BindingKind::Chain { table, .. } => {
                names.extend(classify::classify_table(catalog, *table).into_iter().map(|l| l.name));
            }
            BindingKind::Quotient { kernel, .. } => {
                names.extend(kernel.iter().filter_map(|k| kernel_display_name(catalog, k)));
            }
            _ => {}
        }
        current = node.base();
    }
    names.sort_unstable();
    names.dedup();
    names
}

/// `ExpansionProbe`: the ordered list of public `(name, binding)` pairs a
/// wild selection `*` expands to (§4.4 "Wild-selection").
pub fn expansion(catalog: &Catalog, scope: &Binding) -> Vec<String> {
    match &scope.kind {
        BindingKind::Home { .. } => classify::classify_home(catalog)
            .into_iter()
            .filter(|l| l.is_public)
            .map(|l| l.name)
            .collect(),
        BindingKind::Table { table, .. } | BindingKind::Chain { table, .. } => {
            classify::classify_table(catalog, *table)
                .into_iter()
                .filter(|l| l.is_public)
                .map(|l| l.name)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// `DirectionProbe`: unwraps a (possibly absent) direction decoration.
pub fn direction(binding: &Binding) -> (i32, &Binding) {
    match &binding.kind {
        BindingKind::Direction { base, is_ascending } => (if *is_ascending { 1 } else { -1 }, base),
        _ => (1, binding),
    }
}

fn resolve_table_label(labels: &[crate::graph::Label], name: &str, _arity: Option<usize>) -> Option<Recipe> {
    let matches: Vec<_> = labels.iter().filter(|l| l.name == name).collect();
    match matches.as_slice() {
        [] => None,
        [one] => match &one.arc.kind {
            ArcKind::Table { table } => Some(Recipe::FreeTable { table: *table }),
            ArcKind::Ambiguous { alternatives } => Some(Recipe::Ambiguous {
                alternatives: alternatives.iter().map(|a| format!("{a:?}")).collect(),
            }),
            _ => Some(Recipe::Invalid),
        },
        many => Some(Recipe::Ambiguous {
            alternatives: many.iter().map(|l| l.name.clone()).collect(),
        }),
    }
}

fn resolve_column_label(labels: &[crate::graph::Label], name: &str, _arity: Option<usize>) -> Option<Recipe> {
    let matches: Vec<_> = labels.iter().filter(|l| l.name == name).collect();
    match matches.as_slice() {
        [] => None,
        [one] => match &one.arc.kind {
            ArcKind::Column { column, link, .. } => Some(Recipe::Column {
                column: *column,
                link: link.clone(),
            }),
            ArcKind::Chain { joins } => match one.arc.target {
                Node::Table(table) => Some(Recipe::AttachedTable {
                    table,
                    joins: joins.clone(),
                }),
                _ => Some(Recipe::Invalid),
            },
            ArcKind::Ambiguous { alternatives } => Some(Recipe::Ambiguous {
                alternatives: alternatives.iter().map(|a| format!("{a:?}")).collect(),
            }),
            _ => Some(Recipe::Invalid),
        },
        many => Some(Recipe::Ambiguous {
            alternatives: many.iter().map(|l| l.name.clone()).collect(),
        }),
    }
}

/// Node a given binding scope's classify labels are computed against,
/// for probes that want to go through `classify` directly.
pub fn scope_node(binding: &Binding) -> Node {
    match &binding.kind {
        BindingKind::Home { .. } => Node::Home,
        BindingKind::Table { table, .. } | BindingKind::Chain { table, .. } => Node::Table(*table),
        _ => Node::Unknown,
    }
}
