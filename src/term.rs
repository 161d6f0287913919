//! [`Term`]: the logical relational-algebra IR `compile` lowers [`Space`]/
//! [`Code`] to (§3.7). Deliberately near-isomorphic to [`Space`] given the
//! reduced variant set this implementation carries end to end — kept as a
//! distinct type (not a type alias) because the assembler attaches
//! provenance (`ordinal`, used to generate stable frame aliases) that has
//! no place on `Space` itself, and because a future rewrite pass operating
//! on `Term` shouldn't have to reason about `Space`'s scope-lookup-facing
//! shape.

use crate::catalog::join::Join;
use crate::catalog::TableId;
use crate::code::Code;

#[derive(Debug, Clone)]
pub enum Term {
    /// The one-row universe (`ScalarTerm`).
    Scalar { ordinal: usize },
    /// A table scan (`TableTerm`).
    Table { ordinal: usize, table: TableId },
    /// `base` joined through `joins` (`JoinTerm`).
    Join {
        ordinal: usize,
        base: Box<Term>,
        joins: Vec<Join>,
    },
    /// `base` restricted by `predicate` (`FilterTerm`).
    Filter {
        ordinal: usize,
        base: Box<Term>,
        predicate: Code,
    },
    /// `base` ordered/limited/offset (`OrderTerm`).
    Order {
        ordinal: usize,
        base: Box<Term>,
        order: Vec<(Code, bool)>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    /// `base` grouped by `kernel` (`ProjectionTerm`).
    Projection {
        ordinal: usize,
        base: Box<Term>,
        kernel: Vec<Code>,
    },
    /// The output row shape for one segment: `base`'s rows, projected
    /// through `fields` (`SegmentTerm`).
    Segment {
        ordinal: usize,
        base: Box<Term>,
        fields: Vec<(String, Code)>,
    },
}

impl Term {
    pub fn ordinal(&self) -> usize {
        match self {
            Term::Scalar { ordinal }
            | Term::Table { ordinal, .. }
            | Term::Join { ordinal, .. }
            | Term::Filter { ordinal, .. }
            | Term::Order { ordinal, .. }
            | Term::Projection { ordinal, .. }
            | Term::Segment { ordinal, .. } => *ordinal,
        }
    }
}
