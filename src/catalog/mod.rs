//! The introspected database catalog (§3.1).
//!
//! A [`Catalog`] is built through a mutable builder phase and transitions to
//! a read-only structure with a single [`Catalog::freeze`] call, mirroring
//! `flowscope-core`'s `SchemaRegistry` two-phase (imported/implied then
//! resolved) lifecycle, but with a hard compile-time-enforced freeze instead
//! of a runtime mutability flag: a frozen `Catalog` simply has no mutating
//! methods reachable — `freeze` consumes the builder and returns a `Catalog`
//! that only exposes readers.

pub mod introspect;
pub mod join;

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::domain::Domain;
pub use join::{DirectJoin, Join, ReverseJoin};

/// Opaque, cheaply-cloneable identifiers into the catalog's arenas. Stable
/// for the lifetime of a frozen catalog.
pub type SchemaId = usize;
pub type TableId = usize;
pub type ColumnId = usize;
pub type KeyId = usize;
pub type ForeignKeyId = usize;

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub table: TableId,
    pub domain: Domain,
    pub is_nullable: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct UniqueKey {
    pub id: KeyId,
    pub table: TableId,
    /// Ordered list of columns; order matters for display, not for the
    /// `covers` set-membership check used by `Join::is_contracting`.
    pub columns: Vec<ColumnId>,
    pub is_primary: bool,
    pub is_partial: bool,
}

impl UniqueKey {
    /// True if `columns` (order-independent) is exactly this key's column
    /// set — the "target columns cover a unique key" test from §3.2,
    /// resolved against `original_source/src/htsql/core/entity.py` as an
    /// unordered set match.
    pub fn covers(&self, columns: &[ColumnId]) -> bool {
        if self.columns.len() != columns.len() {
            return false;
        }
        let mut a: Vec<ColumnId> = self.columns.clone();
        let mut b: Vec<ColumnId> = columns.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub id: ForeignKeyId,
    pub origin: TableId,
    pub origin_columns: Vec<ColumnId>,
    pub target: TableId,
    pub target_columns: Vec<ColumnId>,
    pub is_partial: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub schema: SchemaId,
    pub name: String,
    pub columns: IndexMap<String, ColumnId>,
    pub column_order: Vec<ColumnId>,
    pub primary_key: Option<KeyId>,
    pub unique_keys: Vec<KeyId>,
    pub foreign_keys: Vec<ForeignKeyId>,
    pub referring_foreign_keys: Vec<ForeignKeyId>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub priority: i64,
    pub tables: IndexMap<String, TableId>,
}

/// An immutable, frozen catalog: schemas → tables → columns, unique keys,
/// foreign keys.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: IndexMap<String, SchemaId>,
    schema_arena: Vec<Schema>,
    table_arena: Vec<Table>,
    column_arena: Vec<Column>,
    key_arena: Vec<UniqueKey>,
    fk_arena: Vec<ForeignKey>,
    frozen: bool,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values().map(move |&id| &self.schema_arena[id])
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schema_arena[id]
    }

    pub fn schema_by_name(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name).map(|&id| &self.schema_arena[id])
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.table_arena[id]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.column_arena[id]
    }

    pub fn key(&self, id: KeyId) -> &UniqueKey {
        &self.key_arena[id]
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        &self.fk_arena[id]
    }

    /// Enumerates tables through the schema's name index rather than the
    /// raw arena, so a table removed via [`CatalogBuilder::remove_table`]
    /// (unlinked from `schema.tables` but left in the arena as a dead slot)
    /// stays invisible to every consumer, not just name lookups.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schema_arena
            .iter()
            .flat_map(|schema| schema.tables.values().map(|&id| &self.table_arena[id]))
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Mutable construction phase for a [`Catalog`]. Every entity-creating call
/// cascades removal correctly isn't needed here since the builder only ever
/// grows; removal (§3.1 invariant) is exercised by [`CatalogBuilder::remove_table`]
/// and [`CatalogBuilder::remove_column`] for callers that build a catalog
/// incrementally from introspection batches that can be re-run.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    schemas: IndexMap<String, SchemaId>,
    schema_arena: Vec<Schema>,
    table_arena: Vec<Table>,
    column_arena: Vec<Column>,
    key_arena: Vec<UniqueKey>,
    fk_arena: Vec<ForeignKey>,
    removed_tables: BTreeMap<TableId, ()>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readers mirroring [`Catalog`]'s, for config-stage passes (e.g.
    /// [`crate::config::TweakOverrideConfig::apply`]) that need to inspect
    /// the catalog mid-construction. Enumerates through the schema index so
    /// an already-removed table doesn't resurface mid-build either.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schema_arena
            .iter()
            .flat_map(|schema| schema.tables.values().map(|&id| &self.table_arena[id]))
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schema_arena[id]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.column_arena[id]
    }

    pub fn add_schema(&mut self, name: impl Into<String>, priority: i64) -> SchemaId {
        let name = name.into();
        if let Some(&id) = self.schemas.get(&name) {
            return id;
        }
        let id = self.schema_arena.len();
        self.schema_arena.push(Schema {
            id,
            name: name.clone(),
            priority,
            tables: IndexMap::new(),
        });
        self.schemas.insert(name, id);
        id
    }

    pub fn add_table(&mut self, schema: SchemaId, name: impl Into<String>) -> TableId {
        let name = name.into();
        let id = self.table_arena.len();
        self.table_arena.push(Table {
            id,
            schema,
            name: name.clone(),
            columns: IndexMap::new(),
            column_order: Vec::new(),
            primary_key: None,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
            referring_foreign_keys: Vec::new(),
        });
        self.schema_arena[schema].tables.insert(name, id);
        id
    }

    pub fn add_column(
        &mut self,
        table: TableId,
        name: impl Into<String>,
        domain: Domain,
        is_nullable: bool,
        has_default: bool,
    ) -> ColumnId {
        let name = name.into();
        let id = self.column_arena.len();
        self.column_arena.push(Column {
            name: name.clone(),
            table,
            domain,
            is_nullable,
            has_default,
        });
        self.table_arena[table].columns.insert(name, id);
        self.table_arena[table].column_order.push(id);
        id
    }

    /// Registers a unique key. Enforces the §3.1 invariant: a primary key
    /// has all-non-nullable columns and is unique per table.
    pub fn add_unique_key(
        &mut self,
        table: TableId,
        columns: Vec<ColumnId>,
        is_primary: bool,
        is_partial: bool,
    ) -> KeyId {
        if is_primary {
            assert!(
                self.table_arena[table].primary_key.is_none(),
                "table already has a primary key"
            );
            assert!(
                !is_partial,
                "a primary key is never partial (§3.1 invariant)"
            );
            assert!(
                columns
                    .iter()
                    .all(|&c| !self.column_arena[c].is_nullable),
                "primary key columns must be non-nullable (§3.1 invariant)"
            );
        }
        let id = self.key_arena.len();
        self.key_arena.push(UniqueKey {
            id,
            table,
            columns,
            is_primary,
            is_partial,
        });
        if is_primary {
            self.table_arena[table].primary_key = Some(id);
        }
        self.table_arena[table].unique_keys.push(id);
        id
    }

    /// Registers a foreign key. Enforces that the column counts match on
    /// both sides (§3.1 invariant) and appears in both
    /// `origin.foreign_keys` and `target.referring_foreign_keys`.
    pub fn add_foreign_key(
        &mut self,
        origin: TableId,
        origin_columns: Vec<ColumnId>,
        target: TableId,
        target_columns: Vec<ColumnId>,
        is_partial: bool,
    ) -> ForeignKeyId {
        assert_eq!(
            origin_columns.len(),
            target_columns.len(),
            "foreign key column counts must match on both sides (§3.1 invariant)"
        );
        let id = self.fk_arena.len();
        self.fk_arena.push(ForeignKey {
            id,
            origin,
            origin_columns,
            target,
            target_columns,
            is_partial,
        });
        self.table_arena[origin].foreign_keys.push(id);
        self.table_arena[target].referring_foreign_keys.push(id);
        id
    }

    /// Removes a table, cascading to its columns and every key mentioning
    /// it (§3.1 invariant: "removing a table removes its columns and
    /// keys").
    pub fn remove_table(&mut self, table: TableId) {
        self.removed_tables.insert(table, ());
        let column_ids: Vec<ColumnId> = self.table_arena[table].column_order.clone();
        for column in column_ids {
            self.remove_column(column);
        }
        let schema = self.table_arena[table].schema;
        let name = self.table_arena[table].name.clone();
        self.schema_arena[schema].tables.shift_remove(&name);
    }

    /// Renames a table, e.g. to apply a `tweak.override` `class_labels`
    /// entry. Updates the owning schema's name index alongside the table's
    /// own `name` field.
    pub fn rename_table(&mut self, table: TableId, name: impl Into<String>) {
        let name = name.into();
        let schema = self.table_arena[table].schema;
        let old_name = self.table_arena[table].name.clone();
        self.schema_arena[schema].tables.shift_remove(&old_name);
        self.schema_arena[schema].tables.insert(name.clone(), table);
        self.table_arena[table].name = name;
    }

    /// Renames a column, e.g. to apply a `tweak.override` `field_labels`
    /// entry. Updates the owning table's name index alongside the column's
    /// own `name` field.
    pub fn rename_column(&mut self, column: ColumnId, name: impl Into<String>) {
        let name = name.into();
        let table = self.column_arena[column].table;
        let old_name = self.column_arena[column].name.clone();
        let index = self.table_arena[table].columns.get_index_of(&old_name);
        self.table_arena[table].columns.shift_remove(&old_name);
        if let Some(index) = index {
            self.table_arena[table].columns.shift_insert(index, name.clone(), column);
        } else {
            self.table_arena[table].columns.insert(name.clone(), column);
        }
        self.column_arena[column].name = name;
    }

    /// Removes a column, cascading to every key mentioning it (§3.1
    /// invariant: "removing a column removes every key mentioning it") —
    /// including foreign keys that reference it as a *target* column, not
    /// just ones originating from it, so no [`ForeignKey`] is left pointing
    /// at a column no longer in `column_order`.
    pub fn remove_column(&mut self, column: ColumnId) {
        let table = self.column_arena[column].table;
        self.table_arena[table]
            .unique_keys
            .retain(|&k| !self.key_arena[k].columns.contains(&column));
        if let Some(pk) = self.table_arena[table].primary_key {
            if self.key_arena[pk].columns.contains(&column) {
                self.table_arena[table].primary_key = None;
            }
        }
        self.table_arena[table]
            .foreign_keys
            .retain(|&fk| !self.fk_arena[fk].origin_columns.contains(&column));

        let dangling: Vec<ForeignKeyId> = self.table_arena[table]
            .referring_foreign_keys
            .iter()
            .copied()
            .filter(|&fk| self.fk_arena[fk].target_columns.contains(&column))
            .collect();
        for &fk in &dangling {
            let origin = self.fk_arena[fk].origin;
            self.table_arena[origin].foreign_keys.retain(|&id| id != fk);
        }
        self.table_arena[table]
            .referring_foreign_keys
            .retain(|fk| !dangling.contains(fk));

        let name = self.column_arena[column].name.clone();
        self.table_arena[table].columns.shift_remove(&name);
        self.table_arena[table].column_order.retain(|&c| c != column);
    }

    /// Consumes the builder, producing an immutable [`Catalog`].
    pub fn freeze(self) -> Catalog {
        Catalog {
            schemas: self.schemas,
            schema_arena: self.schema_arena,
            table_arena: self.table_arena,
            column_arena: self.column_arena,
            key_arena: self.key_arena,
            fk_arena: self.fk_arena,
            frozen: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let school = b.add_table(sch, "school");
        let id = b.add_column(school, "id", Domain::Integer, false, false);
        b.add_column(school, "code", Domain::Text, false, false);
        b.add_column(school, "name", Domain::Text, true, false);
        b.add_unique_key(school, vec![id], true, false);

        let department = b.add_table(sch, "department");
        let dept_id = b.add_column(department, "id", Domain::Integer, false, false);
        b.add_column(department, "code", Domain::Text, false, false);
        let school_id = b.add_column(department, "school_id", Domain::Integer, true, false);
        b.add_column(department, "name", Domain::Text, true, false);
        b.add_unique_key(department, vec![dept_id], true, false);
        b.add_foreign_key(department, vec![school_id], school, vec![id], true);
        b.freeze()
    }

    #[test]
    fn freeze_yields_read_only_structure() {
        let catalog = sample();
        assert!(catalog.is_frozen());
        assert_eq!(catalog.schemas().count(), 1);
    }

    #[test]
    fn foreign_key_appears_on_both_sides() {
        let catalog = sample();
        let department = catalog
            .schema_by_name("public")
            .unwrap()
            .tables
            .get("department")
            .copied()
            .unwrap();
        let school = catalog
            .schema_by_name("public")
            .unwrap()
            .tables
            .get("school")
            .copied()
            .unwrap();
        assert_eq!(catalog.table(department).foreign_keys.len(), 1);
        assert_eq!(catalog.table(school).referring_foreign_keys.len(), 1);
    }

    #[test]
    fn remove_table_cascades() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let t = b.add_table(sch, "t");
        let c = b.add_column(t, "id", Domain::Integer, false, false);
        b.add_unique_key(t, vec![c], true, false);
        b.remove_table(t);
        assert!(b.table_arena[t].columns.is_empty());
        assert!(b.table_arena[t].primary_key.is_none());
    }

    #[test]
    fn remove_table_drops_it_from_tables() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let school = b.add_table(sch, "school");
        b.add_column(school, "id", Domain::Integer, false, false);
        let department = b.add_table(sch, "department");
        b.add_column(department, "id", Domain::Integer, false, false);
        b.remove_table(school);

        let remaining: Vec<&str> = b.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(remaining, vec!["department"]);

        let catalog = b.freeze();
        let remaining: Vec<&str> = catalog.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(remaining, vec!["department"]);
    }

    #[test]
    fn remove_column_drops_foreign_keys_that_target_it() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let school = b.add_table(sch, "school");
        let school_id = b.add_column(school, "id", Domain::Integer, false, false);
        b.add_unique_key(school, vec![school_id], true, false);

        let department = b.add_table(sch, "department");
        let dept_school_id = b.add_column(department, "school_id", Domain::Integer, true, false);
        b.add_foreign_key(department, vec![dept_school_id], school, vec![school_id], true);

        // Removing the *target* column must drop the foreign key from both
        // sides, not just unlink it from `school.referring_foreign_keys`.
        b.remove_column(school_id);
        assert!(b.table_arena[school].referring_foreign_keys.is_empty());
        assert!(b.table_arena[department].foreign_keys.is_empty());
    }

    #[test]
    fn rename_table_updates_the_schema_index() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let t = b.add_table(sch, "t");
        b.rename_table(t, "renamed");
        assert_eq!(b.table_arena[t].name, "renamed");
        assert_eq!(b.schema_arena[sch].tables.get("renamed").copied(), Some(t));
        assert!(!b.schema_arena[sch].tables.contains_key("t"));
    }

    #[test]
    fn rename_column_updates_the_table_index() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let t = b.add_table(sch, "t");
        let c = b.add_column(t, "id", Domain::Integer, false, false);
        b.rename_column(c, "renamed_id");
        assert_eq!(b.column_arena[c].name, "renamed_id");
        assert_eq!(b.table_arena[t].columns.get("renamed_id").copied(), Some(c));
        assert!(!b.table_arena[t].columns.contains_key("id"));
    }

    #[test]
    #[should_panic(expected = "non-nullable")]
    fn primary_key_columns_must_be_non_nullable() {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("public", 0);
        let t = b.add_table(sch, "t");
        let c = b.add_column(t, "id", Domain::Integer, true, false);
        b.add_unique_key(t, vec![c], true, false);
    }
}
