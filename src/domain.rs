//! The [`Domain`] type: HTSQL's value types, exposed across the
//! binder/encoder/serializer boundary and to consumers of a [`crate::Product`]
//! (§3.7, §6).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The HTSQL type of a value.
///
/// `Untyped` is the domain of a literal before a context forces a cast
/// (§4.4 "Type coercion"); it never survives to the output profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    Boolean,
    Integer,
    Float,
    Decimal,
    Text,
    Date,
    Time,
    DateTime,
    Enum { labels: Vec<String> },
    Identity { labels: Vec<String> },
    List { item: Box<Domain> },
    Record { fields: Vec<RecordField> },
    Void,
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecordField {
    pub name: String,
    pub domain: Domain,
}

impl Domain {
    pub fn list(item: Domain) -> Domain {
        Domain::List {
            item: Box::new(item),
        }
    }

    pub fn record(fields: Vec<RecordField>) -> Domain {
        Domain::Record { fields }
    }

    /// Scalar domains are comparable and orderable in `ORDER BY`/kernels;
    /// `Record`/`List`/`Void`/`Untyped` are not.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Domain::Record { .. } | Domain::List { .. } | Domain::Void | Domain::Untyped
        )
    }

    /// Rank in the numeric-widening lattice; non-numeric domains have no
    /// rank. Used by [`crate::binder::coerce`].
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Domain::Integer => Some(0),
            Domain::Float => Some(1),
            Domain::Decimal => Some(2),
            _ => None,
        }
    }

    /// The coercion lattice join: the least domain that both `self` and
    /// `other` can be cast to without loss, or `None` if incompatible
    /// (§8 "`coerce` is associative and commutative ... `coerce(d) = d`").
    pub fn coerce(&self, other: &Domain) -> Option<Domain> {
        if self == other {
            return Some(self.clone());
        }
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => {
                let winner = if a >= b { self } else { other };
                return Some(winner.clone());
            }
            _ => {}
        }
        match (self, other) {
            (Domain::Untyped, d) | (d, Domain::Untyped) => Some(d.clone()),
            (Domain::Identity { .. }, Domain::Text) | (Domain::Text, Domain::Identity { .. }) => {
                Some(Domain::Text)
            }
            (Domain::Enum { .. }, Domain::Text) | (Domain::Text, Domain::Enum { .. }) => {
                Some(Domain::Text)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_is_reflexive() {
        assert_eq!(Domain::Integer.coerce(&Domain::Integer), Some(Domain::Integer));
        assert_eq!(Domain::Text.coerce(&Domain::Text), Some(Domain::Text));
    }

    #[test]
    fn coerce_widens_numerics() {
        assert_eq!(Domain::Integer.coerce(&Domain::Float), Some(Domain::Float));
        assert_eq!(Domain::Float.coerce(&Domain::Decimal), Some(Domain::Decimal));
    }

    #[test]
    fn coerce_is_commutative() {
        assert_eq!(
            Domain::Integer.coerce(&Domain::Decimal),
            Domain::Decimal.coerce(&Domain::Integer)
        );
    }

    #[test]
    fn coerce_rejects_incompatible() {
        assert_eq!(Domain::Boolean.coerce(&Domain::Date), None);
    }

    #[test]
    fn untyped_coerces_to_anything() {
        assert_eq!(Domain::Untyped.coerce(&Domain::Text), Some(Domain::Text));
    }
}
