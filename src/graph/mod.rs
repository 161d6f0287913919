//! The model graph: [`Node`]s, [`Arc`]s out of them, and the [`Label`]s
//! classify assigns to those arcs (§3.3, §3.4).

use crate::catalog::join::Join;
use crate::catalog::{Catalog, ColumnId, TableId};
use crate::domain::Domain;
use crate::syntax::Syntax;

/// A point in the model graph that attributes can be looked up against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Home,
    Table(TableId),
    /// A scalar domain node — e.g. the target of a column arc, used as the
    /// origin for domain-level calculated attributes.
    Domain(DomainKey),
    Unknown,
    Invalid,
}

/// `Domain` isn't `Hash`/`Eq` (it nests `Vec<RecordField>`); `DomainKey` is
/// the subset of domain identity the model graph needs to key nodes on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DomainKey {
    Boolean,
    Integer,
    Float,
    Decimal,
    Text,
    Date,
    Time,
    DateTime,
    Other,
}

impl DomainKey {
    pub fn of(domain: &Domain) -> DomainKey {
        match domain {
            Domain::Boolean => DomainKey::Boolean,
            Domain::Integer => DomainKey::Integer,
            Domain::Float => DomainKey::Float,
            Domain::Decimal => DomainKey::Decimal,
            Domain::Text => DomainKey::Text,
            Domain::Date => DomainKey::Date,
            Domain::Time => DomainKey::Time,
            Domain::DateTime => DomainKey::DateTime,
            _ => DomainKey::Other,
        }
    }
}

/// Arc-kind-specific payload. The common `origin`/`target`/`arity`/
/// `is_expanding`/`is_contracting` fields live on [`Arc`] itself, matching
/// §3.3's "Arcs (have origin, target, arity, is_expanding, is_contracting)".
#[derive(Debug, Clone)]
pub enum ArcKind {
    /// `home -> table`.
    Table { table: TableId },
    /// `table -> domain`; `link` means the column doubles as a link (the FK
    /// column also exposes the referenced entity).
    Column {
        table: TableId,
        column: ColumnId,
        link: Option<Vec<Join>>,
    },
    /// `table -> table`, composed of one or more joins.
    Chain { joins: Vec<Join> },
    /// A calculated attribute whose value is an HTSQL fragment; `parameters
    /// = None` means a plain attribute (arity `None`), `Some(names)` gives
    /// its formal parameter names (arity = `names.len()`).
    Syntax {
        parameters: Option<Vec<String>>,
        syntax: Syntax,
    },
    /// An error carrier: more than one arc bid the same `(name, arity)`
    /// signature (§4.2 step 3).
    Ambiguous { alternatives: Vec<Arc> },
    /// An error carrier produced when classification itself failed.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct Arc {
    pub origin: Node,
    pub target: Node,
    pub arity: Option<usize>,
    pub is_expanding: bool,
    pub is_contracting: bool,
    pub kind: ArcKind,
}

impl Arc {
    pub fn table(catalog: &Catalog, table: TableId) -> Arc {
        Arc {
            origin: Node::Home,
            target: Node::Table(table),
            arity: None,
            is_expanding: true,
            is_contracting: false,
            kind: ArcKind::Table { table },
        }
        .with_catalog_noop(catalog)
    }

    pub fn column(catalog: &Catalog, table: TableId, column: ColumnId) -> Arc {
        let col = catalog.column(column);
        Arc {
            origin: Node::Table(table),
            target: Node::Domain(DomainKey::of(&col.domain)),
            arity: None,
            is_expanding: true,
            is_contracting: true,
            kind: ArcKind::Column {
                table,
                column,
                link: None,
            },
        }
    }

    pub fn chain(catalog: &Catalog, table: TableId, joins: Vec<Join>) -> Arc {
        let target_table = joins
            .last()
            .map(|j| j.target(catalog))
            .unwrap_or(table);
        let is_expanding = joins.iter().all(|j| j.is_expanding(catalog));
        let is_contracting = joins.iter().all(|j| j.is_contracting(catalog));
        Arc {
            origin: Node::Table(table),
            target: Node::Table(target_table),
            arity: None,
            is_expanding,
            is_contracting,
            kind: ArcKind::Chain { joins },
        }
    }

    pub fn syntax(origin: Node, parameters: Option<Vec<String>>, syntax: Syntax) -> Arc {
        Arc {
            origin,
            target: Node::Unknown,
            arity: parameters.as_ref().map(|p| p.len()),
            is_expanding: false,
            is_contracting: false,
            kind: ArcKind::Syntax { parameters, syntax },
        }
    }

    pub fn ambiguous(origin: Node, alternatives: Vec<Arc>) -> Arc {
        Arc {
            origin,
            target: Node::Invalid,
            arity: None,
            is_expanding: false,
            is_contracting: false,
            kind: ArcKind::Ambiguous { alternatives },
        }
    }

    pub fn invalid(origin: Node) -> Arc {
        Arc {
            origin,
            target: Node::Invalid,
            arity: None,
            is_expanding: false,
            is_contracting: false,
            kind: ArcKind::Invalid,
        }
    }

    fn with_catalog_noop(self, _catalog: &Catalog) -> Arc {
        self
    }

    pub fn is_direct_chain(&self) -> bool {
        match &self.kind {
            ArcKind::Chain { joins } => {
                !joins.is_empty() && joins.iter().all(|j| matches!(j, Join::Direct(_)))
            }
            _ => false,
        }
    }

    pub fn is_reverse_chain(&self) -> bool {
        match &self.kind {
            ArcKind::Chain { joins } => {
                !joins.is_empty() && joins.iter().all(|j| matches!(j, Join::Reverse(_)))
            }
            _ => false,
        }
    }
}

/// A `(name, arc, visibility)` triple assigned by classify (§3.4).
#[derive(Debug, Clone)]
pub struct Label {
    pub name: String,
    pub arc: Arc,
    pub is_public: bool,
}

impl Label {
    pub fn new(name: impl Into<String>, arc: Arc, is_public: bool) -> Label {
        Label {
            name: name.into(),
            arc,
            is_public,
        }
    }
}

/// Normalizes a user-visible name: NFC, lowercase, non-alphanumerics to
/// underscore, and a leading digit gets an underscore prefix (§3.4).
pub fn normalize_name(raw: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    let nfc: String = raw.nfc().collect();
    let mut out = String::with_capacity(nfc.len() + 1);
    for ch in nfc.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;

    #[test]
    fn normalizes_case_and_punctuation() {
        assert_eq!(normalize_name("School Code"), "school_code");
        assert_eq!(normalize_name("2nd-try"), "_2nd_try");
    }

    #[test]
    fn chain_arc_polarity() {
        let arc = Arc {
            origin: Node::Table(0),
            target: Node::Table(1),
            arity: None,
            is_expanding: false,
            is_contracting: false,
            kind: ArcKind::Chain {
                joins: vec![Join::direct(0), Join::direct(1)],
            },
        };
        assert!(arc.is_direct_chain());
        assert!(!arc.is_reverse_chain());
    }

    #[test]
    fn every_arc_originates_at_its_declared_node() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let t = b.add_table(sch, "school");
        let c = b.add_column(t, "id", Domain::Integer, false, false);
        let catalog = b.freeze();
        let arc = Arc::column(&catalog, t, c);
        assert_eq!(arc.origin, Node::Table(t));
    }
}
