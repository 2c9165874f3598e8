//! Public API facade for spatlite.
//!
//! Re-exports the stable surface of the member crates: the geometry value
//! model and codec, the metadata dialect detector, and the spatial index
//! maintenance operations. Integration tests for the whole stack live
//! here.

pub use spatlite_catalog::{detect, survey, CatalogSurvey, Dialect, DialectCache};
pub use spatlite_codec::{decode, encode, encode_compressed, GeometryClass};
pub use spatlite_error::{Result, SpatError};
pub use spatlite_host::{index_table_name, GeometryRow, IndexRow, SchemaView, SpatialHost};
pub use spatlite_index::{
    bound_matches, check_consistency, disable_indexing, enable_indexing, recover, rect_matches,
    CheckOutcome, IndexState, RecoverOutcome,
};
pub use spatlite_types::{
    DimensionModel, Geometry, GeometryColumn, GeometryData, GeometryKind, IndexMode, LineString,
    Mbr, Polygon, Primitive, Ring, Vertex, SRID_NONE,
};

#[must_use]
pub const fn extension_name() -> &'static str {
    "spatial"
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatlite_harness::{FaultHost, MemoryHost, Op};

    /// A table with one geometry column and three rows: two populated,
    /// one NULL.
    fn seeded_host() -> MemoryHost {
        let mut host = MemoryHost::new();
        host.seed_current_metadata();
        host.create_geometry_table(
            "parcels",
            "boundary",
            GeometryKind::Polygon,
            DimensionModel::Xy,
            4326,
        );
        let square = Geometry::new(
            4326,
            DimensionModel::Xy,
            GeometryData::Polygon(Polygon::new(
                LineString::new(vec![
                    Vertex::xy(0.0, 0.0),
                    Vertex::xy(10.5, 0.0),
                    Vertex::xy(10.5, 8.25),
                    Vertex::xy(0.0, 8.25),
                    Vertex::xy(0.0, 0.0),
                ]),
                vec![],
            )),
        );
        host.insert_geometry("parcels", 1, Some(&square));
        host.insert_geometry("parcels", 2, Some(&Geometry::point_xy(4326, -7.7, 3.3)));
        host.insert_geometry("parcels", 3, None);
        host
    }

    #[test]
    fn test_extension_name() {
        assert_eq!(extension_name(), "spatial");
    }

    #[test]
    fn test_end_to_end_enable_corrupt_recover() {
        let mut host = seeded_host();
        assert_eq!(detect(&host).expect("detect"), Dialect::Current);

        enable_indexing(&mut host, "parcels", "boundary").expect("enable");
        assert_eq!(
            check_consistency(&host, "parcels", "boundary").expect("check"),
            CheckOutcome::Consistent
        );

        host.corrupt_index_row("idx_parcels_boundary", 1, |row| row.max_x += 1.0);
        assert_eq!(
            check_consistency(&host, "parcels", "boundary").expect("check"),
            CheckOutcome::Inconsistent
        );

        assert_eq!(
            recover(&mut host, "parcels", "boundary", false).expect("recover"),
            RecoverOutcome::Recovered
        );
        assert_eq!(
            check_consistency(&host, "parcels", "boundary").expect("check"),
            CheckOutcome::Consistent
        );
    }

    #[test]
    fn test_count_mismatch_skips_geometry_decoding() {
        let mut host = seeded_host();
        enable_indexing(&mut host, "parcels", "boundary").expect("enable");
        host.delete_index_row("idx_parcels_boundary", 2);

        let counting = FaultHost::new(host);
        assert_eq!(
            check_consistency(&counting, "parcels", "boundary").expect("check"),
            CheckOutcome::Inconsistent
        );
        // The row-count short-circuit never requests the geometry rows,
        // so no BLOB was decoded.
        assert_eq!(counting.calls(Op::GeometryRows), 0);
        assert_eq!(counting.calls(Op::NonNullCount), 1);
        assert_eq!(counting.calls(Op::IndexRowCount), 1);
    }

    #[test]
    fn test_full_lifecycle_under_legacy_metadata() {
        let mut host = MemoryHost::new();
        host.seed_legacy_metadata();
        host.create_geometry_table(
            "poi",
            "location",
            GeometryKind::Point,
            DimensionModel::Xy,
            4326,
        );
        for (rowid, x, y) in [(1, 1.25, 2.5), (2, -40.0, 81.5), (3, 0.1, 0.2)] {
            host.insert_geometry("poi", rowid, Some(&Geometry::point_xy(4326, x, y)));
        }

        assert_eq!(detect(&host).expect("detect"), Dialect::Legacy);
        enable_indexing(&mut host, "poi", "location").expect("enable");
        assert_eq!(
            check_consistency(&host, "poi", "location").expect("check"),
            CheckOutcome::Consistent
        );
        disable_indexing(&mut host, "poi", "location").expect("disable");
        assert!(!host.index_table_exists("idx_poi_location").unwrap());
        assert!(matches!(
            check_consistency(&host, "poi", "location").unwrap_err(),
            SpatError::NotIndexed { .. }
        ));
    }

    #[test]
    fn test_round_trip_through_host_storage() {
        let mut host = seeded_host();
        let rows = host.geometry_rows("parcels", "boundary").expect("rows");
        let decoded: Vec<Geometry> = rows
            .iter()
            .filter_map(|row| decode(&row.blob))
            .collect();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].kind(), GeometryKind::Polygon);
        assert_eq!(decoded[0].srid, 4326);

        // The stored side-car rectangle survives a rebuild cycle too.
        enable_indexing(&mut host, "parcels", "boundary").expect("enable");
        let idx = host.index_rows("idx_parcels_boundary").expect("idx");
        let mbr = decoded[0].mbr().expect("bounds");
        assert!(rect_matches(Some(mbr), Some(&idx[0])));
    }

    #[test]
    fn test_dialect_cache_is_caller_owned() {
        let host = seeded_host();
        let mut cache = DialectCache::new();
        assert_eq!(cache.get(&host).expect("detect"), Dialect::Current);
        assert_eq!(cache.get(&host).expect("cached"), Dialect::Current);
        cache.invalidate();
        assert_eq!(cache.get(&host).expect("redetect"), Dialect::Current);
    }
}
