//! Metadata dialect detection.
//!
//! Three historically compatible catalog conventions describe geometry
//! columns; which one a database uses is determined purely from the column
//! names of its `geometry_columns` and `spatial_ref_sys` tables — never
//! from row data. Detection is pure, read-only, idempotent, and cheap
//! enough to run before every maintenance operation; callers that want to
//! skip repeat introspection pass an explicit [`DialectCache`], there is no
//! hidden global.
//!
//! The column-set tests are not mutually exclusive (extra columns are
//! forward-compatible noise, so one physical schema can satisfy several
//! tests at once). The deterministic precedence is **Current > Legacy >
//! FDO**: the newest native convention wins over the older native one,
//! and the foreign-interop convention is only reported when nothing native
//! matches. The fixture tests below pin this order.

use std::collections::BTreeSet;

use spatlite_error::Result;
use spatlite_host::SchemaView;
use tracing::debug;

/// Name of the geometry-columns catalog table.
pub const GEOMETRY_COLUMNS: &str = "geometry_columns";
/// Name of the reference-systems catalog table.
pub const SPATIAL_REF_SYS: &str = "spatial_ref_sys";

const LEGACY_GEOMETRY_COLUMNS: [&str; 6] = [
    "f_table_name",
    "f_geometry_column",
    "type",
    "coord_dimension",
    "srid",
    "spatial_index_enabled",
];
const CURRENT_GEOMETRY_COLUMNS: [&str; 6] = [
    "f_table_name",
    "f_geometry_column",
    "geometry_type",
    "coord_dimension",
    "srid",
    "spatial_index_enabled",
];
const FDO_GEOMETRY_COLUMNS: [&str; 6] = [
    "f_table_name",
    "f_geometry_column",
    "geometry_type",
    "coord_dimension",
    "srid",
    "geometry_format",
];
const LEGACY_SPATIAL_REF_SYS: [&str; 5] =
    ["srid", "auth_name", "auth_srid", "ref_sys_name", "proj4text"];
const FDO_SPATIAL_REF_SYS: [&str; 4] = ["srid", "auth_name", "auth_srid", "srtext"];

/// Column carrying the reference-system WKT definition.
const WKT_COLUMN: &str = "srtext";
/// Column carrying the proj parameter string; its absence distinguishes FDO.
const PROJ_PARAMS_COLUMN: &str = "proj4text";

/// The detected catalog convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// No supported convention matched.
    None,
    /// Textual geometry type plus separate dimension column. Accepted with
    /// or without a WKT column on the reference-systems side ("relaxed").
    Legacy,
    /// Foreign-interop convention: numeric type code, format-name column,
    /// no proj parameter string.
    Fdo,
    /// Single numeric type+dimension code; WKT column required.
    Current,
}

impl Dialect {
    /// Stable lowercase label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Legacy => "legacy",
            Self::Fdo => "fdo",
            Self::Current => "current",
        }
    }
}

/// Everything detection can say about a catalog, beyond the bare verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSurvey {
    pub dialect: Dialect,
    /// Legacy matched without the optional WKT column.
    pub legacy_relaxed: bool,
    /// The Current dialect's auxiliary companion tables.
    pub has_auth_table: bool,
    pub has_statistics_table: bool,
    pub has_time_table: bool,
}

/// Case-folded column-name set of a table, or `None` if the table is
/// missing.
fn column_set(host: &impl SchemaView, table: &str) -> Result<Option<BTreeSet<String>>> {
    Ok(host
        .table_columns(table)?
        .map(|cols| cols.iter().map(|c| c.to_lowercase()).collect()))
}

fn has_all(set: &BTreeSet<String>, required: &[&str]) -> bool {
    required.iter().all(|c| set.contains(*c))
}

/// Determine which catalog convention is in effect.
///
/// Precedence on overlapping matches: Current > Legacy > FDO.
pub fn detect(host: &impl SchemaView) -> Result<Dialect> {
    let Some(gc) = column_set(host, GEOMETRY_COLUMNS)? else {
        return Ok(Dialect::None);
    };
    let Some(srs) = column_set(host, SPATIAL_REF_SYS)? else {
        return Ok(Dialect::None);
    };

    let dialect = if has_all(&gc, &CURRENT_GEOMETRY_COLUMNS)
        && has_all(&srs, &LEGACY_SPATIAL_REF_SYS)
        && srs.contains(WKT_COLUMN)
    {
        Dialect::Current
    } else if has_all(&gc, &LEGACY_GEOMETRY_COLUMNS) && has_all(&srs, &LEGACY_SPATIAL_REF_SYS) {
        Dialect::Legacy
    } else if has_all(&gc, &FDO_GEOMETRY_COLUMNS)
        && has_all(&srs, &FDO_SPATIAL_REF_SYS)
        && !srs.contains(PROJ_PARAMS_COLUMN)
    {
        Dialect::Fdo
    } else {
        Dialect::None
    };

    debug!(dialect = dialect.label(), "spatial metadata detected");
    Ok(dialect)
}

/// Like [`detect`], with the auxiliary detail a maintenance UI wants.
pub fn survey(host: &impl SchemaView) -> Result<CatalogSurvey> {
    let dialect = detect(host)?;
    let legacy_relaxed = if dialect == Dialect::Legacy {
        match column_set(host, SPATIAL_REF_SYS)? {
            Some(srs) => !srs.contains(WKT_COLUMN),
            None => false,
        }
    } else {
        false
    };
    Ok(CatalogSurvey {
        dialect,
        legacy_relaxed,
        has_auth_table: host.table_columns("geometry_columns_auth")?.is_some(),
        has_statistics_table: host
            .table_columns("geometry_columns_statistics")?
            .is_some(),
        has_time_table: host.table_columns("geometry_columns_time")?.is_some(),
    })
}

/// Explicit memoization for [`detect`].
///
/// Owned by the caller and passed where repeated detection would be
/// wasteful; invalidation is the caller's responsibility after any schema
/// change.
#[derive(Debug, Default)]
pub struct DialectCache {
    cached: Option<Dialect>,
}

impl DialectCache {
    #[must_use]
    pub const fn new() -> Self {
        Self { cached: None }
    }

    /// The cached verdict, detecting on first use.
    pub fn get(&mut self, host: &impl SchemaView) -> Result<Dialect> {
        if let Some(dialect) = self.cached {
            return Ok(dialect);
        }
        let dialect = detect(host)?;
        self.cached = Some(dialect);
        Ok(dialect)
    }

    /// Drop the memoized verdict, forcing re-detection on the next `get`.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
