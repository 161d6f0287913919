//! [`Code`]: the scalar-expression half of the encoder's output IR (§3.7).
//!
//! Reduced, like [`crate::space::Space`], to the variants the binder's
//! output actually needs: literals, column references, scalar/boolean
//! formulas, count aggregates, casts, and correlated nested-list
//! sub-selections (the mechanism behind §8 scenario 5's nested segment).

use crate::catalog::ColumnId;
use crate::domain::Domain;
use crate::space::Space;

#[derive(Debug, Clone)]
pub enum Code {
    Literal { text: String, domain: Domain },
    /// A column reference against the table `relate` resolved for the
    /// enclosing space (`ColumnUnit`).
    Column { column: ColumnId, domain: Domain },
    /// A scalar or boolean function application (`FormulaCode`).
    Formula { name: String, args: Vec<Code>, domain: Domain },
    /// `COUNT(*)`-style aggregate over a plural (one-to-many) correlated
    /// space (`AggregateUnit`: expression, plural_space, scope_space —
    /// `scope_space` is implicit here since the correlation is expressed
    /// directly as a `JoinProduct` rooted at the enclosing row).
    Aggregate { name: String, plural_space: Box<Space> },
    Cast { base: Box<Code>, target: Domain },
    /// A correlated nested selection rendered as a dialect-specific JSON
    /// aggregate subquery (not in the original's Code lattice — see
    /// DESIGN.md's note on nested-segment correlation).
    NestedList {
        outer_table: crate::catalog::TableId,
        inner_table: crate::catalog::TableId,
        foreign_key: crate::catalog::ForeignKeyId,
        correlate_from_inner: bool,
        fields: Vec<(String, ColumnId)>,
    },
}

impl Code {
    pub fn domain(&self) -> Domain {
        match self {
            Code::Literal { domain, .. } => domain.clone(),
            Code::Column { domain, .. } => domain.clone(),
            Code::Formula { domain, .. } => domain.clone(),
            Code::Aggregate { .. } => Domain::Integer,
            Code::Cast { target, .. } => target.clone(),
            Code::NestedList { fields, .. } => Domain::list(Domain::record(
                fields
                    .iter()
                    .map(|(name, _)| crate::domain::RecordField { name: name.clone(), domain: Domain::Untyped })
                    .collect(),
            )),
        }
    }
}
