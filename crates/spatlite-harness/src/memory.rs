//! The in-memory host.

use std::collections::BTreeMap;

use spatlite_codec::encode;
use spatlite_error::{Result, SpatError};
use spatlite_host::{GeometryRow, IndexRow, SchemaView, SpatialHost};
use spatlite_types::{DimensionModel, Geometry, GeometryColumn, GeometryKind, IndexMode};

#[derive(Debug, Clone, Default)]
struct Store {
    /// table name → column names (schema introspection view)
    schemas: BTreeMap<String, Vec<String>>,
    /// (table, column) → rowid → stored value (None = SQL NULL)
    rows: BTreeMap<(String, String), BTreeMap<i64, Option<Vec<u8>>>>,
    /// (table, column) → catalog entry
    catalog: BTreeMap<(String, String), GeometryColumn>,
    /// side-car name → rowid → stored rectangle
    indexes: BTreeMap<String, BTreeMap<i64, IndexRow>>,
}

/// An in-memory stand-in for the host storage engine.
///
/// Mutators outside the [`SpatialHost`] surface (`corrupt_index_row`,
/// `delete_index_row`, `rekey_index_row`, raw inserts) model an external
/// actor damaging the database behind the extension's back.
#[derive(Debug, Default)]
pub struct MemoryHost {
    store: Store,
    snapshot: Option<Store>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the Current-dialect catalog tables.
    pub fn seed_current_metadata(&mut self) {
        self.register_table(
            "geometry_columns",
            &[
                "f_table_name",
                "f_geometry_column",
                "geometry_type",
                "coord_dimension",
                "srid",
                "spatial_index_enabled",
            ],
        );
        self.register_table(
            "spatial_ref_sys",
            &[
                "srid",
                "auth_name",
                "auth_srid",
                "ref_sys_name",
                "proj4text",
                "srtext",
            ],
        );
    }

    /// Register the Legacy-dialect catalog tables (without the optional
    /// WKT column, i.e. the "relaxed" flavor).
    pub fn seed_legacy_metadata(&mut self) {
        self.register_table(
            "geometry_columns",
            &[
                "f_table_name",
                "f_geometry_column",
                "type",
                "coord_dimension",
                "srid",
                "spatial_index_enabled",
            ],
        );
        self.register_table(
            "spatial_ref_sys",
            &["srid", "auth_name", "auth_srid", "ref_sys_name", "proj4text"],
        );
    }

    /// Register the FDO-dialect catalog tables.
    pub fn seed_fdo_metadata(&mut self) {
        self.register_table(
            "geometry_columns",
            &[
                "f_table_name",
                "f_geometry_column",
                "geometry_type",
                "coord_dimension",
                "srid",
                "geometry_format",
            ],
        );
        self.register_table(
            "spatial_ref_sys",
            &["srid", "auth_name", "auth_srid", "srtext"],
        );
    }

    /// Register an arbitrary table schema (introspection view only).
    pub fn register_table(&mut self, table: &str, columns: &[&str]) {
        self.store.schemas.insert(
            table.to_owned(),
            columns.iter().map(|c| (*c).to_owned()).collect(),
        );
    }

    /// Create a data table with one geometry column and register it in the
    /// geometry-columns catalog.
    pub fn create_geometry_table(
        &mut self,
        table: &str,
        column: &str,
        kind: GeometryKind,
        dims: DimensionModel,
        srid: i32,
    ) {
        self.register_table(table, &["id", column]);
        self.store
            .rows
            .insert(key(table, column), BTreeMap::new());
        self.store.catalog.insert(
            key(table, column),
            GeometryColumn::new(table, column, kind, dims, srid),
        );
    }

    /// Insert or overwrite a row, encoding `geom` into a BLOB (`None`
    /// stores SQL NULL).
    pub fn insert_geometry(&mut self, table: &str, rowid: i64, geom: Option<&Geometry>) {
        self.insert_raw(table, rowid, geom.map(encode));
    }

    /// Insert a row with arbitrary (possibly malformed) BLOB bytes.
    pub fn insert_raw_geometry(&mut self, table: &str, rowid: i64, blob: Vec<u8>) {
        self.insert_raw(table, rowid, Some(blob));
    }

    fn insert_raw(&mut self, table: &str, rowid: i64, value: Option<Vec<u8>>) {
        let slot = self
            .store
            .rows
            .iter_mut()
            .find(|(key, _)| key.0 == table)
            .map(|(_, rows)| rows)
            .unwrap_or_else(|| panic!("geometry table {table} was never created"));
        slot.insert(rowid, value);
    }

    /// Mutate one stored side-car rectangle in place.
    pub fn corrupt_index_row(&mut self, name: &str, rowid: i64, f: impl FnOnce(&mut IndexRow)) {
        let row = self
            .store
            .indexes
            .get_mut(name)
            .and_then(|rows| rows.get_mut(&rowid))
            .unwrap_or_else(|| panic!("no side-car row {rowid} in {name}"));
        f(row);
    }

    /// Remove one side-car row behind the engine's back.
    pub fn delete_index_row(&mut self, name: &str, rowid: i64) {
        let removed = self
            .store
            .indexes
            .get_mut(name)
            .and_then(|rows| rows.remove(&rowid));
        assert!(removed.is_some(), "no side-car row {rowid} in {name}");
    }

    /// Move one side-car row to a different rowid, keeping the count.
    pub fn rekey_index_row(&mut self, name: &str, from: i64, to: i64) {
        let rows = self
            .store
            .indexes
            .get_mut(name)
            .unwrap_or_else(|| panic!("no side-car table {name}"));
        let mut row = rows.remove(&from).expect("source row exists");
        row.rowid = to;
        rows.insert(to, row);
    }

    fn geometry_rows_of(&self, table: &str, column: &str) -> Result<&BTreeMap<i64, Option<Vec<u8>>>> {
        self.store
            .rows
            .get(&key(table, column))
            .ok_or_else(|| SpatError::storage(format!("no geometry store for {table}.{column}")))
    }

    fn index_of(&self, name: &str) -> Result<&BTreeMap<i64, IndexRow>> {
        self.store
            .indexes
            .get(name)
            .ok_or_else(|| SpatError::storage(format!("no such side-car table: {name}")))
    }

    fn index_of_mut(&mut self, name: &str) -> Result<&mut BTreeMap<i64, IndexRow>> {
        self.store
            .indexes
            .get_mut(name)
            .ok_or_else(|| SpatError::storage(format!("no such side-car table: {name}")))
    }
}

fn key(table: &str, column: &str) -> (String, String) {
    (table.to_owned(), column.to_owned())
}

/// Round to the reduced precision the real index machinery stores.
#[allow(clippy::cast_possible_truncation)]
fn narrow(value: f64) -> f64 {
    f64::from(value as f32)
}

impl SchemaView for MemoryHost {
    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>> {
        Ok(self.store.schemas.get(table).cloned())
    }
}

impl SpatialHost for MemoryHost {
    fn geometry_column(&self, table: &str, column: &str) -> Result<Option<GeometryColumn>> {
        Ok(self.store.catalog.get(&key(table, column)).cloned())
    }

    fn set_index_mode(&mut self, table: &str, column: &str, mode: IndexMode) -> Result<()> {
        let entry = self
            .store
            .catalog
            .get_mut(&key(table, column))
            .ok_or_else(|| {
                SpatError::storage(format!("no catalog entry for {table}.{column}"))
            })?;
        entry.index = mode;
        Ok(())
    }

    fn non_null_count(&self, table: &str, column: &str) -> Result<u64> {
        let rows = self.geometry_rows_of(table, column)?;
        Ok(rows.values().filter(|v| v.is_some()).count() as u64)
    }

    fn geometry_rows(&self, table: &str, column: &str) -> Result<Vec<GeometryRow>> {
        let rows = self.geometry_rows_of(table, column)?;
        Ok(rows
            .iter()
            .filter_map(|(&rowid, value)| {
                value.as_ref().map(|blob| GeometryRow {
                    rowid,
                    blob: blob.clone(),
                })
            })
            .collect())
    }

    fn create_index_table(&mut self, name: &str) -> Result<()> {
        if self.store.indexes.contains_key(name) {
            return Err(SpatError::storage(format!(
                "side-car table already exists: {name}"
            )));
        }
        self.store.indexes.insert(name.to_owned(), BTreeMap::new());
        Ok(())
    }

    fn drop_index_table(&mut self, name: &str) -> Result<()> {
        self.store
            .indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SpatError::storage(format!("no such side-car table: {name}")))
    }

    fn index_table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.store.indexes.contains_key(name))
    }

    fn index_row_count(&self, name: &str) -> Result<u64> {
        Ok(self.index_of(name)?.len() as u64)
    }

    fn index_rows(&self, name: &str) -> Result<Vec<IndexRow>> {
        Ok(self.index_of(name)?.values().copied().collect())
    }

    fn clear_index_table(&mut self, name: &str) -> Result<()> {
        self.index_of_mut(name)?.clear();
        Ok(())
    }

    fn insert_index_rows(&mut self, name: &str, rows: &[IndexRow]) -> Result<()> {
        let table = self.index_of_mut(name)?;
        for row in rows {
            table.insert(
                row.rowid,
                IndexRow {
                    rowid: row.rowid,
                    min_x: narrow(row.min_x),
                    min_y: narrow(row.min_y),
                    max_x: narrow(row.max_x),
                    max_y: narrow(row.max_y),
                },
            );
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(SpatError::storage("transaction already open"));
        }
        self.snapshot = Some(self.store.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.snapshot.take().is_none() {
            return Err(SpatError::storage("no open transaction to commit"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        match self.snapshot.take() {
            Some(saved) => {
                self.store = saved;
                Ok(())
            }
            None => Err(SpatError::storage("no open transaction to roll back")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatlite_host::index_table_name;
    use spatlite_types::Geometry;

    fn seeded() -> MemoryHost {
        let mut host = MemoryHost::new();
        host.seed_current_metadata();
        host.create_geometry_table("t", "g", GeometryKind::Point, DimensionModel::Xy, 0);
        host.insert_geometry("t", 1, Some(&Geometry::point_xy(0, 1.0, 2.0)));
        host.insert_geometry("t", 2, None);
        host
    }

    #[test]
    fn schema_view_reports_registered_tables() {
        let host = seeded();
        assert!(host.table_columns("geometry_columns").unwrap().is_some());
        assert!(host.table_columns("missing").unwrap().is_none());
        assert_eq!(
            host.table_columns("t").unwrap().unwrap(),
            vec!["id".to_owned(), "g".to_owned()]
        );
    }

    #[test]
    fn null_rows_are_invisible_to_scans() {
        let host = seeded();
        assert_eq!(host.non_null_count("t", "g").unwrap(), 1);
        let rows = host.geometry_rows("t", "g").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rowid, 1);
    }

    #[test]
    fn index_rows_are_float32_narrowed() {
        let mut host = seeded();
        let name = index_table_name("t", "g");
        host.create_index_table(&name).unwrap();
        host.insert_index_rows(
            &name,
            &[IndexRow {
                rowid: 1,
                min_x: 1.1,
                min_y: 2.2,
                max_x: 3.3,
                max_y: 4.4,
            }],
        )
        .unwrap();
        let stored = host.index_rows(&name).unwrap()[0];
        assert_eq!(stored.min_x, f64::from(1.1_f32));
        assert_eq!(stored.max_y, f64::from(4.4_f32));
        assert_ne!(stored.min_x, 1.1);
    }

    #[test]
    fn rollback_restores_the_snapshot() {
        let mut host = seeded();
        host.create_index_table("idx_t_g").unwrap();
        host.begin().unwrap();
        host.clear_index_table("idx_t_g").unwrap();
        host.drop_index_table("idx_t_g").unwrap();
        host.rollback().unwrap();
        assert!(host.index_table_exists("idx_t_g").unwrap());
    }

    #[test]
    fn transaction_misuse_is_a_storage_error() {
        let mut host = seeded();
        assert!(host.commit().unwrap_err().is_storage());
        assert!(host.rollback().unwrap_err().is_storage());
        host.begin().unwrap();
        assert!(host.begin().unwrap_err().is_storage());
        host.commit().unwrap();
    }

    #[test]
    fn missing_side_car_is_a_storage_error() {
        let host = seeded();
        assert!(host.index_row_count("idx_t_g").unwrap_err().is_storage());
        assert!(host.index_rows("idx_t_g").unwrap_err().is_storage());
    }
}
