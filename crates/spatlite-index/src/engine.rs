//! The four maintenance operations.
//!
//! Every operation consults the dialect detector first and refuses to
//! proceed when the catalog layout is unknown or has no index-enabled flag
//! (FDO); guessing against the wrong catalog would be worse than failing.

use std::collections::BTreeMap;

use spatlite_catalog::{detect, Dialect};
use spatlite_codec::decode;
use spatlite_error::{Result, SpatError};
use spatlite_host::{index_table_name, IndexRow, SpatialHost};
use spatlite_types::{GeometryColumn, IndexMode, Mbr};
use tracing::{debug, info, warn};

use crate::tolerance::rect_matches;
use crate::{CheckOutcome, RecoverOutcome};

/// Create and populate the side-car index for a registered geometry
/// column, then flip the catalog flag. Atomic: either the side-car exists
/// fully populated and the flag is set, or nothing changed.
pub fn enable_indexing<H: SpatialHost>(host: &mut H, table: &str, column: &str) -> Result<()> {
    require_supported_dialect(host)?;
    let entry = require_entry(host, table, column)?;
    if entry.index.is_indexed() {
        return Err(SpatError::AlreadyIndexed {
            table: table.to_owned(),
            column: column.to_owned(),
        });
    }

    let name = index_table_name(table, column);
    host.begin()?;
    match populate_new_index(host, table, column, &name) {
        Ok(rows) => {
            host.commit()?;
            info!(table, column, rows, "spatial index created");
            Ok(())
        }
        Err(e) => {
            abort(host);
            Err(e)
        }
    }
}

fn populate_new_index<H: SpatialHost>(
    host: &mut H,
    table: &str,
    column: &str,
    name: &str,
) -> Result<usize> {
    host.create_index_table(name)?;
    let rows = build_index_rows(host, table, column)?;
    host.insert_index_rows(name, &rows)?;
    host.set_index_mode(table, column, IndexMode::RTree)?;
    Ok(rows.len())
}

/// Drop the side-car index and clear the catalog flag.
pub fn disable_indexing<H: SpatialHost>(host: &mut H, table: &str, column: &str) -> Result<()> {
    require_supported_dialect(host)?;
    let entry = require_entry(host, table, column)?;
    if !entry.index.is_indexed() {
        return Err(SpatError::NotIndexed {
            table: table.to_owned(),
            column: column.to_owned(),
        });
    }

    let name = index_table_name(table, column);
    host.begin()?;
    let result = host
        .drop_index_table(&name)
        .and_then(|()| host.set_index_mode(table, column, IndexMode::Disabled));
    match result {
        Ok(()) => {
            host.commit()?;
            info!(table, column, "spatial index dropped");
            Ok(())
        }
        Err(e) => {
            abort(host);
            Err(e)
        }
    }
}

/// Compare the side-car against the geometry data.
///
/// Read-only: no state is mutated, whatever the verdict. A storage error
/// yields [`CheckOutcome::Unknown`] — distinct from a detected mismatch.
pub fn check_consistency<H: SpatialHost>(
    host: &H,
    table: &str,
    column: &str,
) -> Result<CheckOutcome> {
    require_supported_dialect(host)?;
    let entry = require_entry(host, table, column)?;
    if !entry.index.is_indexed() {
        return Err(SpatError::NotIndexed {
            table: table.to_owned(),
            column: column.to_owned(),
        });
    }

    let name = index_table_name(table, column);
    match run_check(host, table, column, &name) {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_storage() => {
            warn!(table, column, error = %e, "consistency check aborted by storage failure");
            Ok(CheckOutcome::Unknown {
                detail: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

fn run_check<H: SpatialHost>(
    host: &H,
    table: &str,
    column: &str,
    name: &str,
) -> Result<CheckOutcome> {
    // Phase 1: row counts. A mismatch proves divergence without decoding
    // a single geometry.
    let expected = host.non_null_count(table, column)?;
    let actual = host.index_row_count(name)?;
    if expected != actual {
        debug!(table, column, expected, actual, "index row count mismatch");
        return Ok(CheckOutcome::Inconsistent);
    }

    let geom_rows = host.geometry_rows(table, column)?;
    let index_rows = host.index_rows(name)?;
    let stored: BTreeMap<i64, IndexRow> = index_rows.iter().map(|r| (r.rowid, *r)).collect();

    // Phase 2: owning rows against the side-car.
    let mut recomputed: BTreeMap<i64, Mbr> = BTreeMap::new();
    for row in &geom_rows {
        let rect = stored_rect(&row.blob);
        if !rect_matches(Some(rect), stored.get(&row.rowid)) {
            debug!(table, column, rowid = row.rowid, "stored bounds diverge");
            return Ok(CheckOutcome::Inconsistent);
        }
        recomputed.insert(row.rowid, rect);
    }

    // Phase 3: the symmetric direction, to catch orphaned side-car rows
    // that identical counts could hide if row ids were shuffled.
    for idx in &index_rows {
        if !rect_matches(recomputed.get(&idx.rowid).copied(), Some(idx)) {
            debug!(table, column, rowid = idx.rowid, "orphaned side-car row");
            return Ok(CheckOutcome::Inconsistent);
        }
    }

    Ok(CheckOutcome::Consistent)
}

/// Rebuild the side-car unless a requested pre-check finds it healthy.
///
/// The delete+repopulate runs inside a single transaction; on failure the
/// transaction is rolled back and the side-car is left as it was.
pub fn recover<H: SpatialHost>(
    host: &mut H,
    table: &str,
    column: &str,
    skip_check: bool,
) -> Result<RecoverOutcome> {
    require_supported_dialect(host)?;
    let entry = require_entry(host, table, column)?;
    if !entry.index.is_indexed() {
        return Err(SpatError::NotIndexed {
            table: table.to_owned(),
            column: column.to_owned(),
        });
    }

    let name = index_table_name(table, column);
    if !skip_check {
        match run_check(host, table, column, &name) {
            Ok(CheckOutcome::Consistent) => return Ok(RecoverOutcome::AlreadyConsistent),
            Ok(CheckOutcome::Inconsistent) => {}
            Ok(CheckOutcome::Unknown { detail }) => {
                return Ok(RecoverOutcome::Unknown { detail })
            }
            Err(e) if e.is_storage() => {
                return Ok(RecoverOutcome::Unknown {
                    detail: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        }
    }

    host.begin()?;
    match rebuild(host, table, column, &name) {
        Ok(rows) => match host.commit() {
            Ok(()) => {
                info!(table, column, rows, "spatial index rebuilt");
                Ok(RecoverOutcome::Recovered)
            }
            Err(e) => Ok(RecoverOutcome::Failed {
                detail: e.to_string(),
            }),
        },
        Err(e) if e.is_storage() => {
            abort(host);
            warn!(table, column, error = %e, "spatial index rebuild failed");
            Ok(RecoverOutcome::Failed {
                detail: e.to_string(),
            })
        }
        Err(e) => {
            abort(host);
            Err(e)
        }
    }
}

fn rebuild<H: SpatialHost>(host: &mut H, table: &str, column: &str, name: &str) -> Result<usize> {
    host.clear_index_table(name)?;
    let rows = build_index_rows(host, table, column)?;
    host.insert_index_rows(name, &rows)?;
    Ok(rows.len())
}

/// One side-car row per non-null geometry row.
fn build_index_rows<H: SpatialHost>(
    host: &H,
    table: &str,
    column: &str,
) -> Result<Vec<IndexRow>> {
    let geom_rows = host.geometry_rows(table, column)?;
    let mut rows = Vec::with_capacity(geom_rows.len());
    for row in &geom_rows {
        let rect = stored_rect(&row.blob);
        rows.push(IndexRow {
            rowid: row.rowid,
            min_x: rect.min_x,
            min_y: rect.min_y,
            max_x: rect.max_x,
            max_y: rect.max_y,
        });
    }
    Ok(rows)
}

/// The rectangle the side-car is expected to hold for a stored value.
///
/// A value that does not decode, or decodes to an empty geometry, maps to
/// the zero rectangle — the same convention the BLOB header uses for empty
/// bounds. This keeps the side-car a strict bijection with non-null rows.
fn stored_rect(blob: &[u8]) -> Mbr {
    decode(blob)
        .and_then(|g| g.compute_mbr())
        .unwrap_or(Mbr {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        })
}

fn require_supported_dialect<H: SpatialHost>(host: &H) -> Result<Dialect> {
    match detect(host)? {
        Dialect::None => Err(SpatError::DialectUnknown),
        Dialect::Fdo => Err(SpatError::DialectUnsupported { dialect: "fdo" }),
        dialect => Ok(dialect),
    }
}

fn require_entry<H: SpatialHost>(host: &H, table: &str, column: &str) -> Result<GeometryColumn> {
    if host.table_columns(table)?.is_none() {
        return Err(SpatError::NoSuchTable {
            name: table.to_owned(),
        });
    }
    host.geometry_column(table, column)?
        .ok_or_else(|| SpatError::ColumnNotRegistered {
            table: table.to_owned(),
            column: column.to_owned(),
        })
}

/// Best-effort rollback after a failed write path; the original error is
/// the one worth surfacing.
fn abort<H: SpatialHost>(host: &mut H) {
    if let Err(e) = host.rollback() {
        warn!(error = %e, "rollback after failed operation also failed");
    }
}
