//! Core value types for the spatlite extension.
//!
//! Pure data: the geometry value model, bounding-rectangle arithmetic, and
//! the geometry-column catalog entry. No I/O, no storage access, no global
//! state. Everything downstream (codec, catalog detector, index engine)
//! builds on these types.

pub mod catalog;
pub mod geometry;
pub mod mbr;

pub use catalog::{GeometryColumn, IndexMode};
pub use geometry::{
    DimensionModel, Geometry, GeometryData, GeometryKind, LineString, Polygon, Primitive, Ring,
    Vertex,
};
pub use mbr::Mbr;

/// Sentinel SRID meaning "no reference system declared".
pub const SRID_NONE: i32 = -1;
