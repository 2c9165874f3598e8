//! The geometry value model.
//!
//! A [`Geometry`] is a tagged union over seven kinds and four dimension
//! models, carrying an SRID and a lazily computed bounding rectangle. A
//! decoded value is an independent owned tree; nothing here is cached
//! globally.

use std::cell::OnceCell;

use crate::mbr::Mbr;

/// The seven geometry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// Whether this kind is a homogeneous container.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        matches!(
            self,
            Self::MultiPoint | Self::MultiLineString | Self::MultiPolygon
        )
    }

    /// The element kind of a homogeneous container, `None` otherwise.
    #[must_use]
    pub const fn element_kind(self) -> Option<Self> {
        match self {
            Self::MultiPoint => Some(Self::Point),
            Self::MultiLineString => Some(Self::LineString),
            Self::MultiPolygon => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// The coordinate dimension model of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DimensionModel {
    Xy,
    Xyz,
    Xym,
    Xyzm,
}

impl DimensionModel {
    /// Whether vertices carry a Z ordinate.
    #[must_use]
    pub const fn has_z(self) -> bool {
        matches!(self, Self::Xyz | Self::Xyzm)
    }

    /// Whether vertices carry an M measure.
    #[must_use]
    pub const fn has_m(self) -> bool {
        matches!(self, Self::Xym | Self::Xyzm)
    }

    /// The number of ordinates per vertex.
    #[must_use]
    pub const fn ordinate_count(self) -> u32 {
        match self {
            Self::Xy => 2,
            Self::Xyz | Self::Xym => 3,
            Self::Xyzm => 4,
        }
    }
}

/// A single coordinate tuple.
///
/// The `z`/`m` option pattern is fixed by the owning geometry's
/// [`DimensionModel`]; mixing patterns within one geometry is invalid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Vertex {
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    #[must_use]
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    #[must_use]
    pub const fn xym(x: f64, y: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: Some(m),
        }
    }

    #[must_use]
    pub const fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: Some(m),
        }
    }

    /// Whether this vertex carries exactly the ordinates `dims` prescribes.
    #[must_use]
    pub const fn conforms_to(self, dims: DimensionModel) -> bool {
        self.z.is_some() == dims.has_z() && self.m.is_some() == dims.has_m()
    }
}

/// An open or closed vertex sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString {
    pub points: Vec<Vertex>,
}

impl LineString {
    #[must_use]
    pub fn new(points: Vec<Vertex>) -> Self {
        Self { points }
    }
}

/// Polygon rings are vertex sequences; the first and last vertex coincide
/// in well-formed data, but the codec does not enforce closure.
pub type Ring = LineString;

/// A polygon: one exterior ring plus zero or more interior rings (holes).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

impl Polygon {
    #[must_use]
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    fn each_vertex(&self, f: &mut impl FnMut(Vertex)) {
        for &v in &self.exterior.points {
            f(v);
        }
        for ring in &self.interiors {
            for &v in &ring.points {
                f(v);
            }
        }
    }
}

/// A single non-container geometry, as stored inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Point(Vertex),
    LineString(LineString),
    Polygon(Polygon),
}

impl Primitive {
    /// The kind tag of this primitive.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    fn each_vertex(&self, f: &mut impl FnMut(Vertex)) {
        match self {
            Self::Point(v) => f(*v),
            Self::LineString(ls) => {
                for &v in &ls.points {
                    f(v);
                }
            }
            Self::Polygon(p) => p.each_vertex(f),
        }
    }
}

/// The payload of a geometry value.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryData {
    Point(Vertex),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(Vec<Vertex>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
    GeometryCollection(Vec<Primitive>),
}

impl GeometryData {
    /// The kind tag of this payload.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Self::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Visit every vertex in the payload, in storage order.
    pub fn each_vertex(&self, f: &mut impl FnMut(Vertex)) {
        match self {
            Self::Point(v) => f(*v),
            Self::LineString(ls) => {
                for &v in &ls.points {
                    f(v);
                }
            }
            Self::Polygon(p) => p.each_vertex(f),
            Self::MultiPoint(vs) => {
                for &v in vs {
                    f(v);
                }
            }
            Self::MultiLineString(lss) => {
                for ls in lss {
                    for &v in &ls.points {
                        f(v);
                    }
                }
            }
            Self::MultiPolygon(ps) => {
                for p in ps {
                    p.each_vertex(f);
                }
            }
            Self::GeometryCollection(entries) => {
                for e in entries {
                    e.each_vertex(f);
                }
            }
        }
    }
}

/// A geometry value: payload, dimension model, SRID, optional declared-type
/// override, and a lazily computed bounding rectangle.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub srid: i32,
    pub dims: DimensionModel,
    pub data: GeometryData,
    declared: Option<GeometryKind>,
    bounds: OnceCell<Option<Mbr>>,
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        // The bounds cache is derived state and excluded from equality.
        self.srid == other.srid
            && self.dims == other.dims
            && self.declared == other.declared
            && self.data == other.data
    }
}

impl Geometry {
    #[must_use]
    pub fn new(srid: i32, dims: DimensionModel, data: GeometryData) -> Self {
        Self {
            srid,
            dims,
            data,
            declared: None,
            bounds: OnceCell::new(),
        }
    }

    /// Convenience constructor for a 2-D point.
    #[must_use]
    pub fn point_xy(srid: i32, x: f64, y: f64) -> Self {
        Self::new(srid, DimensionModel::Xy, GeometryData::Point(Vertex::xy(x, y)))
    }

    /// The kind tag of the stored payload.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        self.data.kind()
    }

    /// The declared-type override, if any.
    #[must_use]
    pub const fn declared(&self) -> Option<GeometryKind> {
        self.declared
    }

    /// The kind this value presents to type comparisons and to the encoder:
    /// the declared override when set, otherwise the payload's own kind.
    #[must_use]
    pub fn effective_kind(&self) -> GeometryKind {
        self.declared.unwrap_or_else(|| self.kind())
    }

    /// Attach a declared-type override.
    ///
    /// Only a Multi* declaration over homogeneous contents of the matching
    /// element kind is meaningful; anything else returns `None` and the
    /// value is dropped.
    #[must_use]
    pub fn declare(mut self, kind: GeometryKind) -> Option<Self> {
        let element = kind.element_kind()?;
        let compatible = match &self.data {
            GeometryData::Point(_) => element == GeometryKind::Point,
            GeometryData::LineString(_) => element == GeometryKind::LineString,
            GeometryData::Polygon(_) => element == GeometryKind::Polygon,
            GeometryData::MultiPoint(_) => kind == GeometryKind::MultiPoint,
            GeometryData::MultiLineString(_) => kind == GeometryKind::MultiLineString,
            GeometryData::MultiPolygon(_) => kind == GeometryKind::MultiPolygon,
            GeometryData::GeometryCollection(entries) => {
                entries.iter().all(|e| e.kind() == element)
            }
        };
        if !compatible {
            return None;
        }
        self.declared = Some(kind);
        Some(self)
    }

    /// Whether the payload contains no vertices at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let mut any = false;
        self.data.each_vertex(&mut |_| any = true);
        !any
    }

    /// Whether every vertex carries exactly the ordinates `dims` prescribes.
    #[must_use]
    pub fn vertices_conform(&self) -> bool {
        let mut ok = true;
        self.data.each_vertex(&mut |v| ok &= v.conforms_to(self.dims));
        ok
    }

    /// The bounding rectangle, computed once and cached.
    ///
    /// `None` for empty geometries.
    #[must_use]
    pub fn mbr(&self) -> Option<Mbr> {
        *self.bounds.get_or_init(|| self.compute_mbr())
    }

    /// Recompute the bounding rectangle from the coordinates, ignoring any
    /// cached value. The encoder uses this; a stale cache must never reach
    /// the wire.
    #[must_use]
    pub fn compute_mbr(&self) -> Option<Mbr> {
        let mut bounds: Option<Mbr> = None;
        self.data.each_vertex(&mut |v| match &mut bounds {
            Some(b) => b.expand(v),
            none => *none = Some(Mbr::of_vertex(v)),
        });
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_ring() -> Ring {
        LineString::new(vec![
            Vertex::xy(0.0, 0.0),
            Vertex::xy(4.0, 0.0),
            Vertex::xy(4.0, 4.0),
            Vertex::xy(0.0, 4.0),
            Vertex::xy(0.0, 0.0),
        ])
    }

    #[test]
    fn point_mbr_is_degenerate() {
        let g = Geometry::point_xy(4326, 1.5, -2.5);
        let m = g.mbr().expect("point has bounds");
        assert_eq!(m.min_x, 1.5);
        assert_eq!(m.max_x, 1.5);
        assert_eq!(m.min_y, -2.5);
        assert_eq!(m.max_y, -2.5);
    }

    #[test]
    fn polygon_mbr_covers_holes() {
        let hole = LineString::new(vec![
            Vertex::xy(1.0, 1.0),
            Vertex::xy(2.0, 1.0),
            Vertex::xy(2.0, 2.0),
            Vertex::xy(1.0, 1.0),
        ]);
        let g = Geometry::new(
            0,
            DimensionModel::Xy,
            GeometryData::Polygon(Polygon::new(square_ring(), vec![hole])),
        );
        let m = g.mbr().unwrap();
        assert_eq!((m.min_x, m.min_y, m.max_x, m.max_y), (0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn empty_linestring_has_no_mbr() {
        let g = Geometry::new(
            0,
            DimensionModel::Xy,
            GeometryData::LineString(LineString::default()),
        );
        assert!(g.is_empty());
        assert!(g.mbr().is_none());
    }

    #[test]
    fn mbr_is_cached_but_ignored_by_equality() {
        let a = Geometry::point_xy(0, 1.0, 2.0);
        let b = Geometry::point_xy(0, 1.0, 2.0);
        let _ = a.mbr();
        assert_eq!(a, b);
    }

    #[test]
    fn declare_multi_over_single_element() {
        let g = Geometry::point_xy(0, 1.0, 1.0)
            .declare(GeometryKind::MultiPoint)
            .expect("point may be declared multipoint");
        assert_eq!(g.kind(), GeometryKind::Point);
        assert_eq!(g.effective_kind(), GeometryKind::MultiPoint);
    }

    #[test]
    fn declare_rejects_mismatched_kind() {
        assert!(Geometry::point_xy(0, 1.0, 1.0)
            .declare(GeometryKind::MultiPolygon)
            .is_none());
        // A plain kind is not a valid override target.
        assert!(Geometry::point_xy(0, 1.0, 1.0)
            .declare(GeometryKind::Point)
            .is_none());
    }

    #[test]
    fn declare_collection_requires_homogeneous_contents() {
        let homogeneous = Geometry::new(
            0,
            DimensionModel::Xy,
            GeometryData::GeometryCollection(vec![
                Primitive::Point(Vertex::xy(0.0, 0.0)),
                Primitive::Point(Vertex::xy(1.0, 1.0)),
            ]),
        );
        assert!(homogeneous.declare(GeometryKind::MultiPoint).is_some());

        let mixed = Geometry::new(
            0,
            DimensionModel::Xy,
            GeometryData::GeometryCollection(vec![
                Primitive::Point(Vertex::xy(0.0, 0.0)),
                Primitive::LineString(LineString::new(vec![
                    Vertex::xy(0.0, 0.0),
                    Vertex::xy(1.0, 0.0),
                ])),
            ]),
        );
        assert!(mixed.declare(GeometryKind::MultiPoint).is_none());
    }

    #[test]
    fn vertex_conformance_tracks_dimension_model() {
        assert!(Vertex::xyz(0.0, 0.0, 1.0).conforms_to(DimensionModel::Xyz));
        assert!(!Vertex::xyz(0.0, 0.0, 1.0).conforms_to(DimensionModel::Xy));
        assert!(!Vertex::xy(0.0, 0.0).conforms_to(DimensionModel::Xym));

        let g = Geometry::new(
            0,
            DimensionModel::Xyz,
            GeometryData::MultiPoint(vec![
                Vertex::xyz(0.0, 0.0, 1.0),
                Vertex::xyz(1.0, 1.0, 2.0),
            ]),
        );
        assert!(g.vertices_conform());

        let bad = Geometry::new(
            0,
            DimensionModel::Xyz,
            GeometryData::MultiPoint(vec![Vertex::xyz(0.0, 0.0, 1.0), Vertex::xy(1.0, 1.0)]),
        );
        assert!(!bad.vertices_conform());
    }

    #[test]
    fn ordinate_counts() {
        assert_eq!(DimensionModel::Xy.ordinate_count(), 2);
        assert_eq!(DimensionModel::Xyz.ordinate_count(), 3);
        assert_eq!(DimensionModel::Xym.ordinate_count(), 3);
        assert_eq!(DimensionModel::Xyzm.ordinate_count(), 4);
    }
}
