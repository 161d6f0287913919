//! Derived [`Join`]s between tables (§3.2), computed from a [`ForeignKey`].

use super::{Catalog, ForeignKey, ForeignKeyId, TableId};

/// A join attaching two table nodes, derived from a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    Direct(DirectJoin),
    Reverse(ReverseJoin),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectJoin {
    pub foreign_key: ForeignKeyId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseJoin {
    pub foreign_key: ForeignKeyId,
}

impl Join {
    pub fn direct(foreign_key: ForeignKeyId) -> Join {
        Join::Direct(DirectJoin { foreign_key })
    }

    pub fn reverse(foreign_key: ForeignKeyId) -> Join {
        Join::Reverse(ReverseJoin { foreign_key })
    }

    pub fn foreign_key(&self) -> ForeignKeyId {
        match self {
            Join::Direct(j) => j.foreign_key,
            Join::Reverse(j) => j.foreign_key,
        }
    }

    pub fn origin(&self, catalog: &Catalog) -> TableId {
        let fk = catalog.foreign_key(self.foreign_key());
        match self {
            Join::Direct(_) => fk.origin,
            Join::Reverse(_) => fk.target,
        }
    }

    pub fn target(&self, catalog: &Catalog) -> TableId {
        let fk = catalog.foreign_key(self.foreign_key());
        match self {
            Join::Direct(_) => fk.target,
            Join::Reverse(_) => fk.origin,
        }
    }

    /// `(origin_columns, target_columns)` in join direction.
    fn columns(&self, fk: &ForeignKey) -> (Vec<super::ColumnId>, Vec<super::ColumnId>) {
        match self {
            Join::Direct(_) => (fk.origin_columns.clone(), fk.target_columns.clone()),
            Join::Reverse(_) => (fk.target_columns.clone(), fk.origin_columns.clone()),
        }
    }

    /// True if every origin row has at least one matching target row.
    ///
    /// Direct: expanding iff the FK is total (non-partial) and all origin
    /// columns are non-nullable. Reverse: unknown, conservatively `false`
    /// (§3.2).
    pub fn is_expanding(&self, catalog: &Catalog) -> bool {
        let fk = catalog.foreign_key(self.foreign_key());
        match self {
            Join::Direct(_) => {
                !fk.is_partial
                    && fk
                        .origin_columns
                        .iter()
                        .all(|&c| !catalog.column(c).is_nullable)
            }
            Join::Reverse(_) => false,
        }
    }

    /// True if every origin row has at most one matching target row.
    ///
    /// Direct: contracting iff the target columns cover a unique key of the
    /// target table. Reverse: contracting iff the origin columns (which are
    /// the FK's own origin columns) cover a unique key of the origin table
    /// of the *reverse* join, i.e. the FK's target table (§3.2).
    pub fn is_contracting(&self, catalog: &Catalog) -> bool {
        let fk = catalog.foreign_key(self.foreign_key());
        let (_, target_side_columns) = self.columns(fk);
        let target_table = self.target(catalog);
        catalog
            .table(target_table)
            .unique_keys
            .iter()
            .any(|&k| catalog.key(k).covers(&target_side_columns))
    }

    pub fn reverse_of(&self) -> Join {
        match self {
            Join::Direct(j) => Join::Reverse(ReverseJoin {
                foreign_key: j.foreign_key,
            }),
            Join::Reverse(j) => Join::Direct(DirectJoin {
                foreign_key: j.foreign_key,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::domain::Domain;

    fn fixture() -> (Catalog, ForeignKeyId) {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let school = b.add_table(sch, "school");
        let school_id = b.add_column(school, "id", Domain::Integer, false, false);
        b.add_unique_key(school, vec![school_id], true, false);

        let department = b.add_table(sch, "department");
        let dept_school_id =
            b.add_column(department, "school_id", Domain::Integer, false, false);
        let fk = b.add_foreign_key(
            department,
            vec![dept_school_id],
            school,
            vec![school_id],
            false,
        );
        (b.freeze(), fk)
    }

    #[test]
    fn direct_join_is_expanding_and_contracting() {
        let (catalog, fk) = fixture();
        let join = Join::direct(fk);
        assert!(join.is_expanding(&catalog));
        assert!(join.is_contracting(&catalog));
    }

    #[test]
    fn reverse_is_never_expanding() {
        let (catalog, fk) = fixture();
        let join = Join::reverse(fk);
        assert!(!join.is_expanding(&catalog));
    }

    #[test]
    fn reverse_of_direct_equals_reverse_and_back() {
        let (_, fk) = fixture();
        let direct = Join::direct(fk);
        let reverse = Join::reverse(fk);
        assert_eq!(direct.reverse_of(), reverse);
        assert_eq!(reverse.reverse_of(), direct);
    }
}
