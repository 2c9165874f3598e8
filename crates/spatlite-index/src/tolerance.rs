//! The comparison tolerance between true and stored bounds.
//!
//! The side-car's index machinery stores rectangle bounds at float32
//! precision while the geometry data carries doubles. A bound therefore
//! reads back slightly off even when the index is perfectly healthy, and a
//! naive equality (or a generic epsilon) would misclassify existing
//! databases. The historical rule compares at float32 resolution and
//! allows twice the float32 quantization error of the geometry-side value.

use spatlite_host::IndexRow;
use spatlite_types::Mbr;

/// Compare one bound of a recomputed rectangle (`geom`) against the stored
/// side-car value (`index`), either of which may be absent.
///
/// - both absent: pass;
/// - exactly one present: fail;
/// - both present: pass iff the float32-rounded values differ by no more
///   than twice the float32 quantization error of `geom`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bound_matches(geom: Option<f64>, index: Option<f64>) -> bool {
    match (geom, index) {
        (None, None) => true,
        (Some(g), Some(i)) => {
            let tic = (g - f64::from(g as f32)).abs() * 2.0;
            let diff = (f64::from(g as f32) - f64::from(i as f32)).abs();
            diff <= tic
        }
        _ => false,
    }
}

/// Apply [`bound_matches`] to all four scalars of a rectangle pair.
#[must_use]
pub fn rect_matches(geom: Option<Mbr>, index: Option<&IndexRow>) -> bool {
    bound_matches(geom.map(|m| m.min_x), index.map(|r| r.min_x))
        && bound_matches(geom.map(|m| m.min_y), index.map(|r| r.min_y))
        && bound_matches(geom.map(|m| m.max_x), index.map(|r| r.max_x))
        && bound_matches(geom.map(|m| m.max_y), index.map(|r| r.max_y))
}
