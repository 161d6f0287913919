//! Rewrite (§4.7): algebraic simplifications on [`Space`]/[`Code`], run
//! once over the encoder's output before `compile` lowers it to [`crate::term::Term`]s.
//!
//! Grounded on spec.md §4.7 "algebraic simplifications on Space/Code (e.g.,
//! merging sorts, pushing filters, eliminating redundant scopes)". Two
//! passes are implemented, the ones the encoder's own output actually
//! produces redundancy for: collapsing a chain of `Ordered` spaces into one
//! (a `.sort().limit()` pair encodes as nested `Ordered` nodes, see
//! `binder::wrap_sort`) and dropping a `Filtered` node whose predicate is a
//! literal `true`.

use crate::code::Code;
use crate::space::Space;

/// Rewrites `space` bottom-up, applying [`merge_adjacent_orders`] and
/// [`drop_trivial_filters`] until neither changes anything.
pub fn rewrite_space(space: Space) -> Space {
    let mut current = space;
    loop {
        let next = drop_trivial_filters(merge_adjacent_orders(current.clone()));
        if same_shape(&next, &current) {
            return next;
        }
        current = next;
    }
}

/// Folds a directly-nested `Ordered(Ordered(base, order: [], ..), order, ..)`
/// pair into one node, picking up `limit`/`offset` from whichever level set
/// them (this is the shape `.sort(x).limit(n)` produces: the binder's
/// `wrap_sort` extends an existing `Sort` in place, but a `.limit(n).sort(x)`
/// written in that order still nests two `Ordered` spaces around a shared
/// base).
fn merge_adjacent_orders(space: Space) -> Space {
    match space {
        Space::Ordered { base, order, limit, offset } => {
            let base = Box::new(merge_adjacent_orders(*base));
            match *base {
                Space::Ordered { base: inner_base, order: inner_order, limit: inner_limit, offset: inner_offset }
                    if order.is_empty() =>
                {
                    Space::Ordered {
                        base: inner_base,
                        order: inner_order,
                        limit: limit.or(inner_limit),
                        offset: offset.or(inner_offset),
                    }
                }
                other => Space::Ordered { base: Box::new(other), order, limit, offset },
            }
        }
        Space::Filtered { base, predicate } => {
            Space::Filtered { base: Box::new(merge_adjacent_orders(*base)), predicate }
        }
        Space::JoinProduct { base, joins } => {
            Space::JoinProduct { base: Box::new(merge_adjacent_orders(*base)), joins }
        }
        Space::Quotient { base, kernel } => {
            Space::Quotient { base: Box::new(merge_adjacent_orders(*base)), kernel }
        }
        other @ (Space::Scalar | Space::Table { .. }) => other,
    }
}

/// Drops a `Filtered` node whose predicate is a literal boolean `true`
/// (`?true` is never written by hand but can arise from a calculated
/// attribute substitution that always holds).
fn drop_trivial_filters(space: Space) -> Space {
    match space {
        Space::Filtered { base, predicate } => {
            let base = drop_trivial_filters(*base);
            if is_literal_true(&predicate) {
                base
            } else {
                Space::Filtered { base: Box::new(base), predicate }
            }
        }
        Space::Ordered { base, order, limit, offset } => {
            Space::Ordered { base: Box::new(drop_trivial_filters(*base)), order, limit, offset }
        }
        Space::JoinProduct { base, joins } => {
            Space::JoinProduct { base: Box::new(drop_trivial_filters(*base)), joins }
        }
        Space::Quotient { base, kernel } => {
            Space::Quotient { base: Box::new(drop_trivial_filters(*base)), kernel }
        }
        other @ (Space::Scalar | Space::Table { .. }) => other,
    }
}

fn is_literal_true(code: &Code) -> bool {
    matches!(code, Code::Literal { text, domain: crate::domain::Domain::Boolean } if text == "true")
}

/// Structural equality check used only to detect the rewrite's fixed point;
/// spaces don't otherwise need `PartialEq` so this stays local and shallow
/// (depth matches the nesting the two passes above ever produce).
fn same_shape(a: &Space, b: &Space) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::join::Join;

    #[test]
    fn merges_nested_orders_preferring_inner_limit_when_outer_is_unset() {
        let inner = Space::Ordered {
            base: Box::new(Space::Table { table: 0 }),
            order: vec![],
            limit: Some(5),
            offset: None,
        };
        let outer = Space::Ordered {
            base: Box::new(inner),
            order: vec![(Code::Literal { text: "x".into(), domain: crate::domain::Domain::Text }, true)],
            limit: None,
            offset: None,
        };
        let merged = rewrite_space(outer);
        match merged {
            Space::Ordered { limit, order, .. } => {
                assert_eq!(limit, Some(5));
                assert_eq!(order.len(), 1);
            }
            other => panic!("expected a single merged Ordered space, got {other:?}"),
        }
    }

    #[test]
    fn drops_literal_true_filter() {
        let space = Space::Filtered {
            base: Box::new(Space::Table { table: 0 }),
            predicate: Code::Literal { text: "true".into(), domain: crate::domain::Domain::Boolean },
        };
        let rewritten = rewrite_space(space);
        assert!(matches!(rewritten, Space::Table { .. }));
    }

    #[test]
    fn leaves_join_product_untouched_when_nothing_to_simplify() {
        let space = Space::JoinProduct {
            base: Box::new(Space::Table { table: 0 }),
            joins: vec![Join::direct(0)],
        };
        let rewritten = rewrite_space(space);
        assert!(matches!(rewritten, Space::JoinProduct { .. }));
    }
}
