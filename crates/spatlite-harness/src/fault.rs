//! Deterministic storage fault injection.
//!
//! [`FaultHost`] wraps any [`SpatialHost`], counts every operation, and
//! fails the configured ones with a storage error. Same configuration →
//! same failure behaviour, so Unknown/Failed paths are reproducible.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use spatlite_error::{Result, SpatError};
use spatlite_host::{GeometryRow, IndexRow, SchemaView, SpatialHost};
use spatlite_types::{GeometryColumn, IndexMode};

/// One operation of the [`SpatialHost`] surface, for fault targeting and
/// call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    TableColumns,
    GeometryColumn,
    SetIndexMode,
    NonNullCount,
    GeometryRows,
    CreateIndexTable,
    DropIndexTable,
    IndexTableExists,
    IndexRowCount,
    IndexRows,
    ClearIndexTable,
    InsertIndexRows,
    Begin,
    Commit,
    Rollback,
}

/// A [`SpatialHost`] wrapper that injects storage failures.
#[derive(Debug)]
pub struct FaultHost<H> {
    inner: H,
    failing: BTreeSet<Op>,
    calls: RefCell<BTreeMap<Op, u64>>,
}

impl<H: SpatialHost> FaultHost<H> {
    #[must_use]
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            failing: BTreeSet::new(),
            calls: RefCell::new(BTreeMap::new()),
        }
    }

    /// Fail every call to `op` with a storage error.
    #[must_use]
    pub fn failing(mut self, op: Op) -> Self {
        self.failing.insert(op);
        self
    }

    /// How many times `op` has been invoked (including failed calls).
    #[must_use]
    pub fn calls(&self, op: Op) -> u64 {
        self.calls.borrow().get(&op).copied().unwrap_or(0)
    }

    /// Unwrap the inner host, e.g. to inspect state after a rollback.
    #[must_use]
    pub fn into_inner(self) -> H {
        self.inner
    }

    fn enter(&self, op: Op) -> Result<()> {
        *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
        if self.failing.contains(&op) {
            return Err(SpatError::storage(format!("injected fault at {op:?}")));
        }
        Ok(())
    }
}

impl<H: SpatialHost> SchemaView for FaultHost<H> {
    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>> {
        self.enter(Op::TableColumns)?;
        self.inner.table_columns(table)
    }
}

impl<H: SpatialHost> SpatialHost for FaultHost<H> {
    fn geometry_column(&self, table: &str, column: &str) -> Result<Option<GeometryColumn>> {
        self.enter(Op::GeometryColumn)?;
        self.inner.geometry_column(table, column)
    }

    fn set_index_mode(&mut self, table: &str, column: &str, mode: IndexMode) -> Result<()> {
        self.enter(Op::SetIndexMode)?;
        self.inner.set_index_mode(table, column, mode)
    }

    fn non_null_count(&self, table: &str, column: &str) -> Result<u64> {
        self.enter(Op::NonNullCount)?;
        self.inner.non_null_count(table, column)
    }

    fn geometry_rows(&self, table: &str, column: &str) -> Result<Vec<GeometryRow>> {
        self.enter(Op::GeometryRows)?;
        self.inner.geometry_rows(table, column)
    }

    fn create_index_table(&mut self, name: &str) -> Result<()> {
        self.enter(Op::CreateIndexTable)?;
        self.inner.create_index_table(name)
    }

    fn drop_index_table(&mut self, name: &str) -> Result<()> {
        self.enter(Op::DropIndexTable)?;
        self.inner.drop_index_table(name)
    }

    fn index_table_exists(&self, name: &str) -> Result<bool> {
        self.enter(Op::IndexTableExists)?;
        self.inner.index_table_exists(name)
    }

    fn index_row_count(&self, name: &str) -> Result<u64> {
        self.enter(Op::IndexRowCount)?;
        self.inner.index_row_count(name)
    }

    fn index_rows(&self, name: &str) -> Result<Vec<IndexRow>> {
        self.enter(Op::IndexRows)?;
        self.inner.index_rows(name)
    }

    fn clear_index_table(&mut self, name: &str) -> Result<()> {
        self.enter(Op::ClearIndexTable)?;
        self.inner.clear_index_table(name)
    }

    fn insert_index_rows(&mut self, name: &str, rows: &[IndexRow]) -> Result<()> {
        self.enter(Op::InsertIndexRows)?;
        self.inner.insert_index_rows(name, rows)
    }

    fn begin(&mut self) -> Result<()> {
        self.enter(Op::Begin)?;
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        self.enter(Op::Commit)?;
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.enter(Op::Rollback)?;
        self.inner.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryHost;
    use spatlite_types::{DimensionModel, Geometry, GeometryKind};

    fn seeded() -> MemoryHost {
        let mut host = MemoryHost::new();
        host.seed_current_metadata();
        host.create_geometry_table("t", "g", GeometryKind::Point, DimensionModel::Xy, 0);
        host.insert_geometry("t", 1, Some(&Geometry::point_xy(0, 1.0, 2.0)));
        host
    }

    #[test]
    fn passthrough_counts_calls() {
        let host = FaultHost::new(seeded());
        assert_eq!(host.calls(Op::NonNullCount), 0);
        assert_eq!(host.non_null_count("t", "g").unwrap(), 1);
        assert_eq!(host.non_null_count("t", "g").unwrap(), 1);
        assert_eq!(host.calls(Op::NonNullCount), 2);
    }

    #[test]
    fn configured_op_fails_with_storage_error() {
        let host = FaultHost::new(seeded()).failing(Op::GeometryRows);
        let err = host.geometry_rows("t", "g").unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("injected fault"));
        assert_eq!(host.calls(Op::GeometryRows), 1);
        // Untargeted operations keep working.
        assert_eq!(host.non_null_count("t", "g").unwrap(), 1);
    }

    #[test]
    fn into_inner_returns_the_wrapped_host() {
        let mut host = FaultHost::new(seeded());
        host.set_index_mode("t", "g", IndexMode::RTree).unwrap();
        let inner = host.into_inner();
        assert_eq!(
            inner.geometry_column("t", "g").unwrap().unwrap().index,
            IndexMode::RTree
        );
    }
}
