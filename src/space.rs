//! [`Space`]: the relational-shape half of the encoder's output IR (§3.7).
//!
//! Reduced from the original's full space lattice (`ScalarSpace`,
//! `CrossProductSpace`, `JoinProductSpace`, `FilteredSpace`, `OrderedSpace`,
//! `QuotientSpace`, `ComplementSpace`, ...) to the variants `encode`/
//! `compile` actually produce for the operations SPEC_FULL.md names:
//! table scan, FK-chained join, filter, order/limit/offset, and quotient
//! (distinct-by-kernel). Each space wraps a `base`; `table_of` walks down to
//! the table a space ultimately rows over, the way the assembler needs to
//! know which table's columns a `Code::ColumnUnit` refers to.

use crate::catalog::{Catalog, TableId};
use crate::catalog::join::Join;
use crate::code::Code;

#[derive(Debug, Clone)]
pub enum Space {
    /// The one-row universe above every table (`ScalarSpace`).
    Scalar,
    /// A plain table scan (`TableSpace`, reached directly from `Home`).
    Table { table: TableId },
    /// `base` joined through one or more foreign keys (`JoinProductSpace`).
    JoinProduct { base: Box<Space>, joins: Vec<Join> },
    /// `base` restricted by a boolean predicate (`FilteredSpace`).
    Filtered { base: Box<Space>, predicate: Code },
    /// `base` ordered/limited/offset (`OrderedSpace`).
    Ordered {
        base: Box<Space>,
        order: Vec<(Code, bool)>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    /// `base` grouped by `kernel`, one row per distinct kernel tuple
    /// (`QuotientSpace`).
    Quotient { base: Box<Space>, kernel: Vec<Code> },
}

impl Space {
    /// The table this space's rows ultimately come from, or `None` for a
    /// pure `Scalar` space. `JoinProduct` needs the catalog to walk its
    /// join chain, so it's threaded through here rather than cached on the
    /// space itself.
    pub fn table_of(&self, catalog: &Catalog) -> Option<TableId> {
        match self {
            Space::Scalar => None,
            Space::Table { table } => Some(*table),
            Space::JoinProduct { base, joins } => {
                let start = base.table_of(catalog)?;
                Some(chain_target(catalog, start, joins))
            }
            Space::Filtered { base, .. } | Space::Ordered { base, .. } | Space::Quotient { base, .. } => {
                base.table_of(catalog)
            }
        }
    }

    /// Whether this space is already sorted — used by `assemble`'s
    /// safe-patch rule (§9 "safe_patch").
    pub fn is_ordered(&self) -> bool {
        matches!(self, Space::Ordered { .. })
    }
}

/// Resolves the table a join chain lands on, given the catalog (needed
/// because a `Join`'s own target lookup takes the catalog, not just
/// itself).
pub fn chain_target(catalog: &Catalog, base_table: TableId, joins: &[Join]) -> TableId {
    let mut current = base_table;
    for join in joins {
        current = join.target(catalog);
    }
    current
}
