//! Geometry-column catalog entry types.
//!
//! One entry per (table, column) pair, as recorded in the host's
//! geometry-columns catalog table. How the entry is physically stored
//! differs per metadata dialect; this is the dialect-independent view the
//! maintenance operations work with.

use crate::geometry::{DimensionModel, GeometryKind};

/// The index-enabled tri-state carried by a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IndexMode {
    /// No derived index is maintained for the column.
    Disabled,
    /// A side-car bounding-rectangle index table is maintained.
    RTree,
    /// A cached-rectangle variant of the side-car, same table shape.
    MbrCache,
}

impl IndexMode {
    /// The flag value stored in the catalog row.
    #[must_use]
    pub const fn flag(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::RTree => 1,
            Self::MbrCache => 2,
        }
    }

    /// Parse the stored flag value.
    #[must_use]
    pub const fn from_flag(flag: i32) -> Option<Self> {
        match flag {
            0 => Some(Self::Disabled),
            1 => Some(Self::RTree),
            2 => Some(Self::MbrCache),
            _ => None,
        }
    }

    /// Whether any side-car index is expected to exist.
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// A geometry-column registration: what the catalog promises about the
/// values stored in (table, column).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeometryColumn {
    pub table: String,
    pub column: String,
    pub kind: GeometryKind,
    pub dims: DimensionModel,
    pub srid: i32,
    pub index: IndexMode,
}

impl GeometryColumn {
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        kind: GeometryKind,
        dims: DimensionModel,
        srid: i32,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            kind,
            dims,
            srid,
            index: IndexMode::Disabled,
        }
    }
}
