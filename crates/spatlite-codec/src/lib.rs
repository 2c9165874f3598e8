//! Binary geometry BLOB codec.
//!
//! A geometry BLOB is self-describing and portable across host byte
//! orders. Layout:
//!
//! | Offset      | Size | Content                                    |
//! |-------------|------|--------------------------------------------|
//! | 0           | 1    | start marker `0x00`                        |
//! | 1           | 1    | endianness: `0x01` little, `0x00` big      |
//! | 2           | 4    | SRID (signed)                              |
//! | 6           | 32   | MBR: minX, minY, maxX, maxY as doubles     |
//! | 38          | 1    | MBR marker `0x7C`                          |
//! | 39          | 4    | class code (kind × dimension × compressed) |
//! | 43          | …    | type-specific payload                      |
//! | last        | 1    | end marker `0xFE`                          |
//!
//! Every multi-byte field after byte 1 is interpreted in the endianness the
//! BLOB itself declares, never the host's. The minimum valid length is 45
//! bytes; any length or marker violation means "not a valid geometry" —
//! [`decode`] returns `None`, it never panics.
//!
//! Class codes on the wire: base kinds 1–7 (Point, LineString, Polygon,
//! MultiPoint, MultiLineString, MultiPolygon, GeometryCollection), +1000
//! for XYZ, +2000 for XYM, +3000 for XYZM, and +1000000 for the compressed
//! LineString/Polygon sub-range. The numeric codes live only here, at the
//! serialization boundary; everything else works with [`GeometryClass`].

mod decode;
mod encode;
mod wire;

pub use decode::decode;
pub use encode::{encode, encode_compressed};
pub use wire::Endian;

use spatlite_types::{DimensionModel, GeometryKind};

/// Leading byte of every geometry BLOB.
pub const MARK_START: u8 = 0x00;
/// Trailing byte of every geometry BLOB.
pub const MARK_END: u8 = 0xFE;
/// Byte framing the packed MBR, at [`MBR_MARKER_OFFSET`].
pub const MARK_MBR: u8 = 0x7C;
/// Byte introducing each sub-geometry inside a collection payload.
pub const MARK_ENTITY: u8 = 0x69;
/// Fixed offset of the MBR marker byte.
pub const MBR_MARKER_OFFSET: usize = 38;
/// Shortest possible valid BLOB.
pub const MIN_BLOB_LEN: usize = 45;

const COMPRESSED_OFFSET: i32 = 1_000_000;

/// The decoded form of a wire class code: kind × dimension model ×
/// compressed flag.
///
/// `compressed` marks the delta vertex layout; it exists only for
/// LineString and Polygon payloads. [`canonical`](Self::canonical) strips
/// it for type comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryClass {
    pub kind: GeometryKind,
    pub dims: DimensionModel,
    pub compressed: bool,
}

impl GeometryClass {
    #[must_use]
    pub const fn new(kind: GeometryKind, dims: DimensionModel) -> Self {
        Self {
            kind,
            dims,
            compressed: false,
        }
    }

    /// The same class with the compressed layout flag cleared.
    #[must_use]
    pub const fn canonical(self) -> Self {
        Self {
            compressed: false,
            ..self
        }
    }

    /// The numeric wire code for this class.
    #[must_use]
    pub const fn code(self) -> i32 {
        let base = match self.kind {
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
            GeometryKind::MultiPoint => 4,
            GeometryKind::MultiLineString => 5,
            GeometryKind::MultiPolygon => 6,
            GeometryKind::GeometryCollection => 7,
        };
        let dims = match self.dims {
            DimensionModel::Xy => 0,
            DimensionModel::Xyz => 1000,
            DimensionModel::Xym => 2000,
            DimensionModel::Xyzm => 3000,
        };
        let compressed = if self.compressed {
            COMPRESSED_OFFSET
        } else {
            0
        };
        compressed + dims + base
    }

    /// Parse a numeric wire code.
    ///
    /// Returns `None` for unknown codes and for compressed codes outside
    /// the LineString/Polygon sub-range.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        let (compressed, rest) = if code >= COMPRESSED_OFFSET {
            (true, code - COMPRESSED_OFFSET)
        } else {
            (false, code)
        };
        let (dims, base) = match rest {
            1..=7 => (DimensionModel::Xy, rest),
            1001..=1007 => (DimensionModel::Xyz, rest - 1000),
            2001..=2007 => (DimensionModel::Xym, rest - 2000),
            3001..=3007 => (DimensionModel::Xyzm, rest - 3000),
            _ => return None,
        };
        let kind = match base {
            1 => GeometryKind::Point,
            2 => GeometryKind::LineString,
            3 => GeometryKind::Polygon,
            4 => GeometryKind::MultiPoint,
            5 => GeometryKind::MultiLineString,
            6 => GeometryKind::MultiPolygon,
            7 => GeometryKind::GeometryCollection,
            _ => return None,
        };
        if compressed && !matches!(kind, GeometryKind::LineString | GeometryKind::Polygon) {
            return None;
        }
        Some(Self {
            kind,
            dims,
            compressed,
        })
    }
}

/// Bytes of one full-precision vertex under `dims`.
const fn full_vertex_len(dims: DimensionModel) -> usize {
    8 * dims.ordinate_count() as usize
}

/// Bytes of one delta-compressed vertex under `dims`. X, y, and z shrink to
/// float32 deltas; m stays a full double.
const fn delta_vertex_len(dims: DimensionModel) -> usize {
    match dims {
        DimensionModel::Xy => 8,
        DimensionModel::Xyz => 12,
        DimensionModel::Xym => 16,
        DimensionModel::Xyzm => 20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_code_roundtrip_every_combination() {
        let kinds = [
            GeometryKind::Point,
            GeometryKind::LineString,
            GeometryKind::Polygon,
            GeometryKind::MultiPoint,
            GeometryKind::MultiLineString,
            GeometryKind::MultiPolygon,
            GeometryKind::GeometryCollection,
        ];
        let dims = [
            DimensionModel::Xy,
            DimensionModel::Xyz,
            DimensionModel::Xym,
            DimensionModel::Xyzm,
        ];
        for kind in kinds {
            for d in dims {
                let class = GeometryClass::new(kind, d);
                assert_eq!(GeometryClass::from_code(class.code()), Some(class));
            }
        }
    }

    #[test]
    fn wire_codes_are_pinned() {
        // The numeric values are a compatibility contract with existing
        // on-disk databases.
        let cases = [
            (GeometryKind::Point, DimensionModel::Xy, false, 1),
            (GeometryKind::LineString, DimensionModel::Xy, false, 2),
            (GeometryKind::Polygon, DimensionModel::Xy, false, 3),
            (GeometryKind::MultiPoint, DimensionModel::Xy, false, 4),
            (GeometryKind::MultiLineString, DimensionModel::Xy, false, 5),
            (GeometryKind::MultiPolygon, DimensionModel::Xy, false, 6),
            (
                GeometryKind::GeometryCollection,
                DimensionModel::Xy,
                false,
                7,
            ),
            (GeometryKind::Point, DimensionModel::Xyz, false, 1001),
            (GeometryKind::Point, DimensionModel::Xym, false, 2001),
            (GeometryKind::Point, DimensionModel::Xyzm, false, 3001),
            (GeometryKind::LineString, DimensionModel::Xy, true, 1_000_002),
            (GeometryKind::Polygon, DimensionModel::Xy, true, 1_000_003),
            (
                GeometryKind::LineString,
                DimensionModel::Xyz,
                true,
                1_001_002,
            ),
            (
                GeometryKind::Polygon,
                DimensionModel::Xyzm,
                true,
                1_003_003,
            ),
        ];
        for (kind, dims, compressed, code) in cases {
            let class = GeometryClass {
                kind,
                dims,
                compressed,
            };
            assert_eq!(class.code(), code, "code for {kind:?} {dims:?}");
            assert_eq!(GeometryClass::from_code(code), Some(class));
        }
    }

    #[test]
    fn compressed_codes_limited_to_line_and_polygon() {
        // compressed point / multi* / collection codes are invalid
        for base in [1, 4, 5, 6, 7] {
            assert_eq!(GeometryClass::from_code(COMPRESSED_OFFSET + base), None);
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        for code in [0, -1, 8, 999, 1000, 1008, 2008, 3008, 4001, 2_000_002] {
            assert_eq!(GeometryClass::from_code(code), None, "code {code}");
        }
    }

    #[test]
    fn canonical_strips_compression_only() {
        let class = GeometryClass {
            kind: GeometryKind::LineString,
            dims: DimensionModel::Xyz,
            compressed: true,
        };
        let canonical = class.canonical();
        assert_eq!(canonical.kind, class.kind);
        assert_eq!(canonical.dims, class.dims);
        assert!(!canonical.compressed);
    }

    #[test]
    fn vertex_sizes() {
        assert_eq!(full_vertex_len(DimensionModel::Xy), 16);
        assert_eq!(full_vertex_len(DimensionModel::Xyz), 24);
        assert_eq!(full_vertex_len(DimensionModel::Xym), 24);
        assert_eq!(full_vertex_len(DimensionModel::Xyzm), 32);
        assert_eq!(delta_vertex_len(DimensionModel::Xy), 8);
        assert_eq!(delta_vertex_len(DimensionModel::Xyz), 12);
        assert_eq!(delta_vertex_len(DimensionModel::Xym), 16);
        assert_eq!(delta_vertex_len(DimensionModel::Xyzm), 20);
    }
}
