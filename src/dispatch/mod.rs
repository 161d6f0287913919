//! Adapter dispatch (§4.1): the polymorphism substrate every transformation
//! pass in the pipeline is built on.
//!
//! Grounded on `original_source/src/htsql/adapter.py`'s `Component.realize`:
//! components register against an interface, dispatch keys select a matching
//! subset, a dominance relation orders that subset, and `realize` returns the
//! most-specific implementation plus the rest of the chain for
//! `super`-style delegation.
//!
//! Three dispatch-key shapes are supported, matching §4.1:
//! - [`Utility`]: key `()`  — one implementation per [`Registry`].
//! - [`Adapter`]: key a type tuple, matched by "is a supertype of" and
//!   dominated by "subclass or strictly more specific in every position".
//! - [`Protocol`]: key `(name, Option<arity>)`, case-insensitive names,
//!   fixed-arity dominates variadic.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A type tuple used as an adapter dispatch key. We model "supertype of"
/// with an explicit, registrar-supplied supertype table rather than Rust's
/// (nonexistent) runtime subtyping, since the domain hierarchy here is a
/// handful of closed enums, not open class inheritance.
pub type TypeKey = Vec<TypeId>;

/// A single registered implementation of an interface.
pub struct Component<T> {
    pub name: &'static str,
    /// For adapters: the declared type tuple this component matches
    /// against (by supertype-of, via `supertypes`). Empty for utilities.
    pub keys: Vec<TypeKey>,
    /// For protocols: `(name, arity)` pairs this component handles.
    pub protocol_keys: Vec<(String, Option<usize>)>,
    pub value: T,
}

/// A registry of components for one interface, scoped to an application
/// (§4.1 "lookups are application-scoped").
pub struct Registry<T> {
    components: Vec<Component<T>>,
    /// `key_a` dominates `key_b` (both type tuples of equal length) when
    /// `key_a`'s entries are each at least as specific, and strictly more
    /// specific in at least one position. The registrar supplies a
    /// supertype oracle because we have no runtime reflection over
    /// user-defined subtyping.
    supertypes: HashMap<TypeId, Vec<TypeId>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            components: Vec::new(),
            supertypes: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `sub` is in the (reflexive, transitive) subtype set of
    /// `sup` — i.e. `sup` matches wherever `sub` is asked for.
    pub fn declare_supertype(&mut self, sub: TypeId, sup: TypeId) {
        self.supertypes.entry(sub).or_default().push(sup);
    }

    fn is_supertype_of(&self, candidate: TypeId, concrete: TypeId) -> bool {
        if candidate == concrete {
            return true;
        }
        let mut stack = vec![concrete];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(sups) = self.supertypes.get(&current) {
                for &sup in sups {
                    if sup == candidate {
                        return true;
                    }
                    stack.push(sup);
                }
            }
        }
        false
    }

    pub fn register(&mut self, component: Component<T>) {
        self.components.push(component);
    }

    fn matches_adapter(&self, declared: &[TypeKey], key: &[TypeId]) -> bool {
        declared.iter().any(|tuple| {
            tuple.len() == key.len()
                && tuple
                    .iter()
                    .zip(key.iter())
                    .all(|(&d, &k)| self.is_supertype_of(d, k))
        })
    }

    fn dominates_adapter(&self, a: &[TypeKey], b: &[TypeKey]) -> bool {
        // `a` dominates `b` if some declared tuple of `a` is at least as
        // specific as some declared tuple of `b` in every position, and
        // strictly more specific in at least one (§4.1 "Dominance").
        a.iter().any(|ta| {
            b.iter().any(|tb| {
                ta.len() == tb.len()
                    && ta
                        .iter()
                        .zip(tb.iter())
                        .all(|(&x, &y)| x == y || self.is_supertype_of(y, x))
                    && ta.iter().zip(tb.iter()).any(|(&x, &y)| x != y)
            })
        })
    }

    fn matches_protocol(&self, declared: &[(String, Option<usize>)], name: &str, arity: usize) -> bool {
        let name_lower = name.to_lowercase();
        declared.iter().any(|(n, a)| {
            n.to_lowercase() == name_lower && a.map(|a| a == arity).unwrap_or(true)
        })
    }

    fn dominates_protocol(&self, a: &[(String, Option<usize>)], b: &[(String, Option<usize>)]) -> bool {
        // Fixed-arity entries dominate variadic entries of the same name.
        a.iter().any(|(na, aa)| {
            b.iter().any(|(nb, ab)| {
                na.to_lowercase() == nb.to_lowercase() && aa.is_some() && ab.is_none()
            })
        })
    }

    /// Realizes the interface for an adapter-style dispatch key: the
    /// dominance-maximal matching implementation, plus the MRO chain for
    /// `super`-style delegation (§4.1 step 5).
    pub fn realize_adapter(&self, key: &[TypeId]) -> Result<Realization<'_, T>> {
        let matching: Vec<&Component<T>> = self
            .components
            .iter()
            .filter(|c| self.matches_adapter(&c.keys, key))
            .collect();
        self.realize_from(matching, |a, b| self.dominates_adapter(&a.keys, &b.keys))
    }

    /// Realizes the interface for a protocol-style dispatch key:
    /// `(name, arity)` (§4.1).
    pub fn realize_protocol(&self, name: &str, arity: usize) -> Result<Realization<'_, T>> {
        let matching: Vec<&Component<T>> = self
            .components
            .iter()
            .filter(|c| self.matches_protocol(&c.protocol_keys, name, arity))
            .collect();
        self.realize_from(matching, |a, b| {
            self.dominates_protocol(&a.protocol_keys, &b.protocol_keys)
        })
    }

    /// Realizes a utility (dispatch key `()`): there must be at most one
    /// registered component; more than one with no dominance relation is
    /// an `AmbiguousDispatch`.
    pub fn realize_utility(&self) -> Result<Realization<'_, T>> {
        let matching: Vec<&Component<T>> = self.components.iter().collect();
        self.realize_from(matching, |_, _| false)
    }

    fn realize_from<'a>(
        &'a self,
        matching: Vec<&'a Component<T>>,
        dominates: impl Fn(&Component<T>, &Component<T>) -> bool,
    ) -> Result<Realization<'a, T>> {
        if matching.is_empty() {
            return Err(Error::dispatch("no implementation found".to_string()));
        }
        // Topological sort by dominance; dominating components sort first.
        let n = matching.len();
        let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in 0..n {
                if i != j && dominates(matching[i], matching[j]) {
                    dominated_by[i].push(j);
                }
            }
        }
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let a_dominates_b = dominated_by[a].contains(&b);
            let b_dominates_a = dominated_by[b].contains(&a);
            match (a_dominates_b, b_dominates_a) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => std::cmp::Ordering::Equal,
            }
        });
        // Detect genuine ambiguity: two maximally-specific, mutually
        // incomparable components at the front.
        if n > 1 {
            let top = order[0];
            let runner_up = order[1];
            let top_dominates_runner = dominated_by[top].contains(&runner_up);
            let runner_dominates_top = dominated_by[runner_up].contains(&top);
            if !top_dominates_runner && !runner_dominates_top {
                return Err(Error::dispatch(format!(
                    "ambiguous dispatch between '{}' and '{}'",
                    matching[top].name, matching[runner_up].name
                )));
            }
        }
        let chain = order.into_iter().map(|i| matching[i]).collect();
        Ok(Realization { chain, index: 0 })
    }
}

/// The result of a successful `realize`: the full most-specific-first chain,
/// with cheap `next()` access for `super`-like delegation (§4.1 step 5).
pub struct Realization<'a, T> {
    chain: Vec<&'a Component<T>>,
    index: usize,
}

impl<'a, T> Realization<'a, T> {
    pub fn value(&self) -> &'a T {
        &self.chain[self.index].value
    }

    pub fn name(&self) -> &'static str {
        self.chain[self.index].name
    }

    /// Advances to the next-most-specific implementation, or `None` if this
    /// was the last one in the chain.
    pub fn next(&self) -> Option<Realization<'a, T>> {
        if self.index + 1 < self.chain.len() {
            Some(Realization {
                chain: self.chain.clone(),
                index: self.index + 1,
            })
        } else {
            None
        }
    }
}

impl<'a, T> Clone for Realization<'a, T> {
    fn clone(&self) -> Self {
        Realization {
            chain: self.chain.clone(),
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct MarkerA;
    #[derive(Debug, PartialEq, Eq)]
    struct MarkerB;

    fn type_id_of<X: 'static>() -> TypeId {
        TypeId::of::<X>()
    }

    #[test]
    fn utility_realizes_the_sole_component() {
        let mut registry: Registry<i32> = Registry::new();
        registry.register(Component {
            name: "only",
            keys: vec![],
            protocol_keys: vec![],
            value: 42,
        });
        let r = registry.realize_utility().unwrap();
        assert_eq!(*r.value(), 42);
    }

    #[test]
    fn utility_with_two_incomparable_components_is_ambiguous() {
        let mut registry: Registry<i32> = Registry::new();
        registry.register(Component {
            name: "a",
            keys: vec![],
            protocol_keys: vec![],
            value: 1,
        });
        registry.register(Component {
            name: "b",
            keys: vec![],
            protocol_keys: vec![],
            value: 2,
        });
        assert!(registry.realize_utility().is_err());
    }

    #[test]
    fn adapter_dominance_prefers_more_specific_subclass() {
        let mut registry: Registry<&'static str> = Registry::new();
        let a = type_id_of::<MarkerA>();
        let b = type_id_of::<MarkerB>();
        registry.declare_supertype(b, a); // B <: A
        registry.register(Component {
            name: "generic",
            keys: vec![vec![a]],
            protocol_keys: vec![],
            value: "generic",
        });
        registry.register(Component {
            name: "specific",
            keys: vec![vec![b]],
            protocol_keys: vec![],
            value: "specific",
        });
        let r = registry.realize_adapter(&[b]).unwrap();
        assert_eq!(*r.value(), "specific");
        let next = r.next().unwrap();
        assert_eq!(*next.value(), "generic");
    }

    #[test]
    fn protocol_fixed_arity_dominates_variadic() {
        let mut registry: Registry<&'static str> = Registry::new();
        registry.register(Component {
            name: "variadic",
            keys: vec![],
            protocol_keys: vec![("concat".to_string(), None)],
            value: "variadic",
        });
        registry.register(Component {
            name: "binary",
            keys: vec![],
            protocol_keys: vec![("concat".to_string(), Some(2))],
            value: "binary",
        });
        let r = registry.realize_protocol("CONCAT", 2).unwrap();
        assert_eq!(*r.value(), "binary");
    }

    #[test]
    fn protocol_dispatch_is_case_insensitive() {
        let mut registry: Registry<&'static str> = Registry::new();
        registry.register(Component {
            name: "upper",
            keys: vec![],
            protocol_keys: vec![("Upper".to_string(), Some(1))],
            value: "upper",
        });
        assert!(registry.realize_protocol("upper", 1).is_ok());
    }

    #[test]
    fn no_match_is_no_implementation_error() {
        let registry: Registry<i32> = Registry::new();
        assert!(registry.realize_protocol("missing", 0).is_err());
    }
}
