//! Geometry value → BLOB.

use spatlite_types::{
    DimensionModel, Geometry, GeometryData, GeometryKind, LineString, Polygon, Primitive, Vertex,
};

use crate::wire::{Endian, Writer};
use crate::{GeometryClass, MARK_END, MARK_ENTITY, MARK_MBR, MARK_START};

/// Encode a geometry into the uncompressed BLOB layout.
///
/// Byte 1 carries the host's native endianness; the result decodes on any
/// host regardless. The MBR header is always recomputed from coordinates —
/// a stale cached rectangle never reaches the wire.
#[must_use]
pub fn encode(geom: &Geometry) -> Vec<u8> {
    encode_as(geom, false, Endian::native())
}

/// Encode a geometry with delta-compressed LineString/Polygon payloads.
///
/// Compression only changes vertex storage for line and polygon data
/// (including entities inside containers); a point-only geometry encodes
/// byte-identically to [`encode`].
#[must_use]
pub fn encode_compressed(geom: &Geometry) -> Vec<u8> {
    encode_as(geom, true, Endian::native())
}

fn encode_as(geom: &Geometry, compressed: bool, endian: Endian) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.put_u8(MARK_START);
    w.put_u8(endian.byte());
    w.put_i32(geom.srid);
    match geom.compute_mbr() {
        Some(m) => {
            w.put_f64(m.min_x);
            w.put_f64(m.min_y);
            w.put_f64(m.max_x);
            w.put_f64(m.max_y);
        }
        None => {
            // Empty geometry: the header rectangle is all zeros.
            for _ in 0..4 {
                w.put_f64(0.0);
            }
        }
    }
    w.put_u8(MARK_MBR);
    let kind = geom.effective_kind();
    let class = GeometryClass {
        kind,
        dims: geom.dims,
        compressed: compressed
            && matches!(kind, GeometryKind::LineString | GeometryKind::Polygon),
    };
    w.put_i32(class.code());
    write_payload(&mut w, geom, compressed);
    w.put_u8(MARK_END);
    w.into_bytes()
}

fn write_payload(w: &mut Writer, geom: &Geometry, compressed: bool) {
    let dims = geom.dims;
    match (&geom.data, geom.effective_kind()) {
        (GeometryData::Point(v), GeometryKind::Point) => write_vertex(w, *v, dims),
        // A declared Multi* override wraps the single payload as one entity.
        (GeometryData::Point(v), _) => {
            w.put_i32(1);
            write_point_entity(w, *v, dims);
        }
        (GeometryData::LineString(ls), GeometryKind::LineString) => {
            write_sequence(w, &ls.points, dims, compressed);
        }
        (GeometryData::LineString(ls), _) => {
            w.put_i32(1);
            write_linestring_entity(w, ls, dims, compressed);
        }
        (GeometryData::Polygon(p), GeometryKind::Polygon) => {
            write_polygon(w, p, dims, compressed);
        }
        (GeometryData::Polygon(p), _) => {
            w.put_i32(1);
            write_polygon_entity(w, p, dims, compressed);
        }
        (GeometryData::MultiPoint(vs), _) => {
            w.put_i32(count_i32(vs.len()));
            for &v in vs {
                write_point_entity(w, v, dims);
            }
        }
        (GeometryData::MultiLineString(lss), _) => {
            w.put_i32(count_i32(lss.len()));
            for ls in lss {
                write_linestring_entity(w, ls, dims, compressed);
            }
        }
        (GeometryData::MultiPolygon(ps), _) => {
            w.put_i32(count_i32(ps.len()));
            for p in ps {
                write_polygon_entity(w, p, dims, compressed);
            }
        }
        (GeometryData::GeometryCollection(entries), _) => {
            w.put_i32(count_i32(entries.len()));
            for entry in entries {
                match entry {
                    Primitive::Point(v) => write_point_entity(w, *v, dims),
                    Primitive::LineString(ls) => write_linestring_entity(w, ls, dims, compressed),
                    Primitive::Polygon(p) => write_polygon_entity(w, p, dims, compressed),
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn count_i32(len: usize) -> i32 {
    len as i32
}

fn write_point_entity(w: &mut Writer, v: Vertex, dims: DimensionModel) {
    w.put_u8(MARK_ENTITY);
    w.put_i32(GeometryClass::new(GeometryKind::Point, dims).code());
    write_vertex(w, v, dims);
}

fn write_linestring_entity(
    w: &mut Writer,
    ls: &LineString,
    dims: DimensionModel,
    compressed: bool,
) {
    w.put_u8(MARK_ENTITY);
    let class = GeometryClass {
        kind: GeometryKind::LineString,
        dims,
        compressed,
    };
    w.put_i32(class.code());
    write_sequence(w, &ls.points, dims, compressed);
}

fn write_polygon_entity(w: &mut Writer, p: &Polygon, dims: DimensionModel, compressed: bool) {
    w.put_u8(MARK_ENTITY);
    let class = GeometryClass {
        kind: GeometryKind::Polygon,
        dims,
        compressed,
    };
    w.put_i32(class.code());
    write_polygon(w, p, dims, compressed);
}

fn write_vertex(w: &mut Writer, v: Vertex, dims: DimensionModel) {
    w.put_f64(v.x);
    w.put_f64(v.y);
    if dims.has_z() {
        w.put_f64(v.z.unwrap_or(0.0));
    }
    if dims.has_m() {
        w.put_f64(v.m.unwrap_or(0.0));
    }
}

/// Write a vertex sequence, delta-compressing when requested.
///
/// Deltas are taken against the previous vertex's true coordinates and
/// rounded to float32; m measures always stay full doubles.
#[allow(clippy::cast_possible_truncation)]
fn write_sequence(w: &mut Writer, points: &[Vertex], dims: DimensionModel, compressed: bool) {
    w.put_i32(count_i32(points.len()));
    if compressed {
        let mut prev_x = 0.0_f64;
        let mut prev_y = 0.0_f64;
        let mut prev_z = 0.0_f64;
        for (i, &v) in points.iter().enumerate() {
            if i == 0 {
                write_vertex(w, v, dims);
            } else {
                w.put_f32((v.x - prev_x) as f32);
                w.put_f32((v.y - prev_y) as f32);
                if dims.has_z() {
                    w.put_f32((v.z.unwrap_or(0.0) - prev_z) as f32);
                }
                if dims.has_m() {
                    w.put_f64(v.m.unwrap_or(0.0));
                }
            }
            prev_x = v.x;
            prev_y = v.y;
            prev_z = v.z.unwrap_or(0.0);
        }
    } else {
        for &v in points {
            write_vertex(w, v, dims);
        }
    }
}

fn write_polygon(w: &mut Writer, p: &Polygon, dims: DimensionModel, compressed: bool) {
    write_sequence(w, &p.exterior.points, dims, compressed);
    w.put_i32(count_i32(p.interiors.len()));
    for ring in &p.interiors {
        write_sequence(w, &ring.points, dims, compressed);
    }
}
