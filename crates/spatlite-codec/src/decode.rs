//! BLOB → geometry value.
//!
//! Decoding never fails loudly: anything structurally wrong — bad length,
//! bad marker, unknown class, truncated payload, stray trailing bytes —
//! yields `None`, and callers translate that into an absent/null result.

use spatlite_types::{
    DimensionModel, Geometry, GeometryData, GeometryKind, LineString, Polygon, Primitive, Vertex,
};

use crate::wire::{Cursor, Endian};
use crate::{
    delta_vertex_len, full_vertex_len, GeometryClass, MARK_END, MARK_ENTITY, MARK_MBR, MARK_START,
    MBR_MARKER_OFFSET, MIN_BLOB_LEN,
};

/// Decode a geometry BLOB.
///
/// The endianness byte of the BLOB — not the host's byte order — governs
/// every multi-byte field. Returns `None` for anything malformed; never
/// panics, never returns a partial value.
#[must_use]
pub fn decode(blob: &[u8]) -> Option<Geometry> {
    if blob.len() < MIN_BLOB_LEN {
        return None;
    }
    if blob[0] != MARK_START || blob[blob.len() - 1] != MARK_END {
        return None;
    }
    let endian = Endian::from_byte(blob[1])?;
    if blob[MBR_MARKER_OFFSET] != MARK_MBR {
        return None;
    }

    // Parse the body without the end marker so exact payload consumption
    // can be verified afterwards.
    let body = &blob[..blob.len() - 1];
    let mut cur = Cursor::new(body, 2, endian);
    let srid = cur.take_i32()?;
    // The packed header rectangle is only validated as readable; bounds
    // are recomputed from coordinates on demand rather than adopted.
    for _ in 0..4 {
        cur.take_f64()?;
    }
    cur.take_u8()?; // MBR marker, verified above
    let class = GeometryClass::from_code(cur.take_i32()?)?;
    let data = read_payload(&mut cur, class)?;
    if cur.remaining() != 0 {
        return None;
    }
    Some(Geometry::new(srid, class.dims, data))
}

fn read_payload(cur: &mut Cursor<'_>, class: GeometryClass) -> Option<GeometryData> {
    let dims = class.dims;
    match class.kind {
        GeometryKind::Point => Some(GeometryData::Point(read_vertex(cur, dims)?)),
        GeometryKind::LineString => Some(GeometryData::LineString(read_sequence(
            cur,
            dims,
            class.compressed,
        )?)),
        GeometryKind::Polygon => Some(GeometryData::Polygon(read_polygon(
            cur,
            dims,
            class.compressed,
        )?)),
        GeometryKind::MultiPoint => {
            let count = read_count(cur)?;
            let mut points = Vec::new();
            for _ in 0..count {
                let entity = read_entity_class(cur, dims)?;
                if entity.kind != GeometryKind::Point {
                    return None;
                }
                points.push(read_vertex(cur, dims)?);
            }
            Some(GeometryData::MultiPoint(points))
        }
        GeometryKind::MultiLineString => {
            let count = read_count(cur)?;
            let mut lines = Vec::new();
            for _ in 0..count {
                let entity = read_entity_class(cur, dims)?;
                if entity.kind != GeometryKind::LineString {
                    return None;
                }
                lines.push(read_sequence(cur, dims, entity.compressed)?);
            }
            Some(GeometryData::MultiLineString(lines))
        }
        GeometryKind::MultiPolygon => {
            let count = read_count(cur)?;
            let mut polygons = Vec::new();
            for _ in 0..count {
                let entity = read_entity_class(cur, dims)?;
                if entity.kind != GeometryKind::Polygon {
                    return None;
                }
                polygons.push(read_polygon(cur, dims, entity.compressed)?);
            }
            Some(GeometryData::MultiPolygon(polygons))
        }
        GeometryKind::GeometryCollection => {
            let count = read_count(cur)?;
            let mut entries = Vec::new();
            for _ in 0..count {
                let entity = read_entity_class(cur, dims)?;
                let entry = match entity.kind {
                    GeometryKind::Point => Primitive::Point(read_vertex(cur, dims)?),
                    GeometryKind::LineString => {
                        Primitive::LineString(read_sequence(cur, dims, entity.compressed)?)
                    }
                    GeometryKind::Polygon => {
                        Primitive::Polygon(read_polygon(cur, dims, entity.compressed)?)
                    }
                    _ => return None,
                };
                entries.push(entry);
            }
            Some(GeometryData::GeometryCollection(entries))
        }
    }
}

/// Read the one-byte entity tag and class code of a collection entry.
///
/// Entities must be primitives (no nested containers) and must share the
/// parent's dimension model.
fn read_entity_class(cur: &mut Cursor<'_>, parent_dims: DimensionModel) -> Option<GeometryClass> {
    if cur.take_u8()? != MARK_ENTITY {
        return None;
    }
    let class = GeometryClass::from_code(cur.take_i32()?)?;
    if class.dims != parent_dims {
        return None;
    }
    if !matches!(
        class.kind,
        GeometryKind::Point | GeometryKind::LineString | GeometryKind::Polygon
    ) {
        return None;
    }
    Some(class)
}

fn read_count(cur: &mut Cursor<'_>) -> Option<usize> {
    usize::try_from(cur.take_i32()?).ok()
}

fn read_vertex(cur: &mut Cursor<'_>, dims: DimensionModel) -> Option<Vertex> {
    let x = cur.take_f64()?;
    let y = cur.take_f64()?;
    let z = if dims.has_z() {
        Some(cur.take_f64()?)
    } else {
        None
    };
    let m = if dims.has_m() {
        Some(cur.take_f64()?)
    } else {
        None
    };
    Some(Vertex { x, y, z, m })
}

/// Read a vertex sequence, expanding delta-compressed tuples.
///
/// Compressed tuples after the first accumulate float32 deltas onto the
/// previously *reconstructed* vertex — the historical on-disk behavior —
/// so reconstruction error grows along the sequence. M measures are never
/// compressed.
fn read_sequence(
    cur: &mut Cursor<'_>,
    dims: DimensionModel,
    compressed: bool,
) -> Option<LineString> {
    let count = read_count(cur)?;
    if sequence_byte_len(dims, compressed, count)? > cur.remaining() {
        return None;
    }
    let mut points = Vec::with_capacity(count);
    let mut prev_x = 0.0_f64;
    let mut prev_y = 0.0_f64;
    let mut prev_z = 0.0_f64;
    for i in 0..count {
        let v = if i == 0 || !compressed {
            read_vertex(cur, dims)?
        } else {
            let x = prev_x + f64::from(cur.take_f32()?);
            let y = prev_y + f64::from(cur.take_f32()?);
            let z = if dims.has_z() {
                Some(prev_z + f64::from(cur.take_f32()?))
            } else {
                None
            };
            let m = if dims.has_m() {
                Some(cur.take_f64()?)
            } else {
                None
            };
            Vertex { x, y, z, m }
        };
        prev_x = v.x;
        prev_y = v.y;
        prev_z = v.z.unwrap_or(0.0);
        points.push(v);
    }
    Some(LineString::new(points))
}

/// Total payload bytes a sequence of `count` vertices occupies.
fn sequence_byte_len(dims: DimensionModel, compressed: bool, count: usize) -> Option<usize> {
    if count == 0 {
        return Some(0);
    }
    let full = full_vertex_len(dims);
    if compressed {
        full.checked_add(delta_vertex_len(dims).checked_mul(count - 1)?)
    } else {
        full.checked_mul(count)
    }
}

fn read_polygon(cur: &mut Cursor<'_>, dims: DimensionModel, compressed: bool) -> Option<Polygon> {
    let exterior = read_sequence(cur, dims, compressed)?;
    let hole_count = read_count(cur)?;
    let mut interiors = Vec::new();
    for _ in 0..hole_count {
        interiors.push(read_sequence(cur, dims, compressed)?);
    }
    Some(Polygon::new(exterior, interiors))
}
