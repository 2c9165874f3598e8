//! The seam between spatlite and its host storage engine.
//!
//! The dialect detector and the consistency engine never talk to a
//! database directly; they issue synchronous calls through [`SpatialHost`].
//! A production implementation wraps the real engine's catalog and table
//! access; the test harness provides an in-memory one. Implementations may
//! block on I/O and inherit whatever locking discipline the host provides
//! (per-table writer serialization is assumed).
//!
//! Every fallible method reports host failures as
//! [`spatlite_error::SpatError::Storage`]; the engine folds those into its
//! Unknown/Failed outcomes rather than misreading them as corruption.

use spatlite_error::Result;
use spatlite_types::{GeometryColumn, IndexMode};

/// One owning-table row with a non-NULL geometry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRow {
    pub rowid: i64,
    pub blob: Vec<u8>,
}

/// One side-car index row: the stored bounding rectangle for `rowid`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexRow {
    pub rowid: i64,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// The canonical side-car table name for an indexed geometry column.
#[must_use]
pub fn index_table_name(table: &str, column: &str) -> String {
    format!("idx_{table}_{column}")
}

/// Schema introspection: the only access the dialect detector is allowed.
///
/// Row data is never read through this trait.
pub trait SchemaView {
    /// Column names of `table` in declaration order, or `None` when the
    /// table does not exist.
    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>>;
}

/// Synchronous access to the host storage engine.
///
/// Read methods are plain queries; write methods take effect immediately
/// unless bracketed by [`begin`](Self::begin)/[`commit`](Self::commit).
/// The engine brackets every write path with the transaction hooks so a
/// failure cannot leave the catalog flag and the side-car disagreeing.
pub trait SpatialHost: SchemaView {
    /// The catalog entry for (table, column), if registered.
    fn geometry_column(&self, table: &str, column: &str) -> Result<Option<GeometryColumn>>;

    /// Update the index-enabled flag of a registered catalog entry.
    fn set_index_mode(&mut self, table: &str, column: &str, mode: IndexMode) -> Result<()>;

    /// Number of rows in `table` whose `column` value is non-NULL.
    fn non_null_count(&self, table: &str, column: &str) -> Result<u64>;

    /// Every row of `table` with a non-NULL `column` value, as raw BLOBs.
    fn geometry_rows(&self, table: &str, column: &str) -> Result<Vec<GeometryRow>>;

    /// Create an empty side-car table named `name`.
    fn create_index_table(&mut self, name: &str) -> Result<()>;

    /// Drop the side-car table named `name`.
    fn drop_index_table(&mut self, name: &str) -> Result<()>;

    /// Whether a side-car table named `name` exists.
    fn index_table_exists(&self, name: &str) -> Result<bool>;

    /// Number of rows in the side-car table.
    fn index_row_count(&self, name: &str) -> Result<u64>;

    /// Every row of the side-car table.
    fn index_rows(&self, name: &str) -> Result<Vec<IndexRow>>;

    /// Delete every row of the side-car table, keeping the table itself.
    fn clear_index_table(&mut self, name: &str) -> Result<()>;

    /// Append rows to the side-car table.
    fn insert_index_rows(&mut self, name: &str, rows: &[IndexRow]) -> Result<()>;

    /// Open a transaction. Writes until `commit`/`rollback` are atomic.
    fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Abandon the open transaction, restoring the pre-`begin` state.
    fn rollback(&mut self) -> Result<()>;
}
