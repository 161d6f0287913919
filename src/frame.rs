//! [`Frame`]/[`Phrase`]: the near-SQL IR `assemble` produces from a [`crate::term::Term`]
//! tree and `reduce` simplifies before the serializer renders it (§3.7).
//!
//! `Phrase` is `Code` re-expressed against frame-qualified column
//! references (an alias plus a column) instead of the encoder's bare
//! `ColumnId`s, since by this stage a query may scan the same table twice
//! under different aliases (self-joins, correlated subqueries) and the
//! column alone no longer identifies where to read it from.

use crate::catalog::{ColumnId, TableId};
use crate::domain::Domain;

#[derive(Debug, Clone)]
pub enum Phrase {
    Literal { text: String, domain: Domain },
    /// A column read through a specific frame alias.
    Column { frame_alias: String, column: ColumnId, domain: Domain },
    Formula { name: String, args: Vec<Phrase>, domain: Domain },
    Cast { base: Box<Phrase>, target: Domain },
    /// A correlated scalar subquery backing an aggregate Code
    /// (`COUNT`/`EXISTS`/...): `(SELECT <name>(*) FROM <frame> WHERE
    /// <correlation>)`.
    AggregateSubquery { name: String, frame: Box<Frame> },
    /// A correlated subquery producing a dialect-specific JSON array, one
    /// object per row of `frame`, backing a nested-list selection element
    /// (§8 scenario 5).
    JsonListSubquery { frame: Box<Frame>, fields: Vec<(String, ColumnId)> },
}

/// The join linking a `Branch` frame's base to one more table, carrying the
/// correlation condition in its already-encoded `Phrase` form.
#[derive(Debug, Clone)]
pub struct FrameJoin {
    pub frame: Frame,
    pub condition: Phrase,
    /// `LEFT JOIN` when the underlying model join isn't guaranteed to match
    /// a row (`!Join::is_expanding`); `INNER JOIN` otherwise.
    pub is_outer: bool,
}

#[derive(Debug, Clone)]
pub enum Frame {
    /// `SELECT 1` — the one-row universe (`ScalarFrame`).
    Scalar { alias: String },
    /// A single table scan (`LeafFrame`).
    Leaf { alias: String, table: TableId },
    /// A `SELECT ... FROM base JOIN ... WHERE ... GROUP BY ... ORDER BY ...`
    /// shape (`BranchFrame`).
    Branch {
        alias: String,
        base: Box<Frame>,
        joins: Vec<FrameJoin>,
        select: Vec<(String, Phrase)>,
        filter: Option<Phrase>,
        group: Vec<Phrase>,
        group_filter: Option<Phrase>,
        order: Vec<(Phrase, bool)>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    /// The outermost frame of a compiled segment — structurally a `Branch`
    /// without its own further nesting concerns, kept distinct to match
    /// §3.7's `SegmentFrame` naming and as the serializer's sole entry
    /// point.
    Segment {
        alias: String,
        base: Box<Frame>,
        fields: Vec<(String, Phrase)>,
    },
}

impl Frame {
    pub fn alias(&self) -> &str {
        match self {
            Frame::Scalar { alias }
            | Frame::Leaf { alias, .. }
            | Frame::Branch { alias, .. }
            | Frame::Segment { alias, .. } => alias,
        }
    }
}
