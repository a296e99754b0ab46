//! Numerical conditioning for DLT-style solvers.
//!
//! Normalizing points before building the design matrix centers the data and
//! scales it to a mean distance of `√2` from the origin. Gaze samples live in
//! the unit square while screen targets are in pixels, so without this the
//! design matrix mixes magnitudes three orders apart.
//!
//! ```
//! use gaze_linear::math::normalize_points_2d;
//! use gaze_core::Pt2;
//!
//! let points = vec![
//!     Pt2::new(100.0, 200.0),
//!     Pt2::new(150.0, 250.0),
//!     Pt2::new(120.0, 220.0),
//! ];
//! let (normalized, t) = normalize_points_2d(&points).unwrap();
//! assert_eq!(normalized.len(), 3);
//! assert!((t[(2, 2)] - 1.0).abs() < 1e-12);
//! ```

use gaze_core::{centroid, Mat3, Pt2, Real};

/// Hartley normalization for 2D points.
///
/// Returns the normalized points and the 3x3 transform `T` such that
/// `p_norm = T * p_homogeneous`, or `None` if the input is empty or all
/// points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    let c = centroid(points)?;

    let mean_dist =
        points.iter().map(|p| (p - c).norm()).sum::<Real>() / points.len() as Real;
    if mean_dist <= f64::EPSILON {
        return None;
    }

    let scale = (2.0_f64).sqrt() / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * c.x,
        0.0,
        scale,
        -scale * c.y,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - c.x) * scale, (p.y - c.y) * scale))
        .collect();

    Some((norm, t))
}

/// Twice the signed area of the triangle `(a, b, c)`.
pub fn signed_area2(a: &Pt2, b: &Pt2, c: &Pt2) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether any three of `points` are (nearly) collinear.
///
/// The tolerance is relative to the squared extent of the set, so the check
/// behaves the same for unit-square gaze samples and pixel coordinates.
pub fn has_collinear_triple(points: &[Pt2], rel_tol: Real) -> bool {
    let extent2 = points
        .iter()
        .flat_map(|a| points.iter().map(move |b| (a - b).norm_squared()))
        .fold(0.0, Real::max);
    if extent2 <= f64::EPSILON {
        return true;
    }
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if signed_area2(&points[i], &points[j], &points[k]).abs() <= rel_tol * extent2 {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_points_are_centered_with_sqrt2_spread() {
        let pts = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1920.0, 0.0),
            Pt2::new(1920.0, 1080.0),
            Pt2::new(0.0, 1080.0),
        ];
        let (norm, t) = normalize_points_2d(&pts).unwrap();
        let c = centroid(&norm).unwrap();
        assert!(c.coords.norm() < 1e-12);
        let mean = norm.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert!((mean - 2.0_f64.sqrt()).abs() < 1e-12);

        let mapped = t * gaze_core::to_homogeneous(&pts[2]);
        assert!((gaze_core::from_homogeneous(&mapped) - norm[2]).norm() < 1e-12);
    }

    #[test]
    fn coincident_points_cannot_be_normalized() {
        let pts = vec![Pt2::new(0.5, 0.5); 4];
        assert!(normalize_points_2d(&pts).is_none());
        assert!(normalize_points_2d(&[]).is_none());
    }

    #[test]
    fn collinear_triples_are_detected() {
        let diagonal = [
            Pt2::new(0.3, 0.3),
            Pt2::new(0.5, 0.5),
            Pt2::new(0.7, 0.7),
            Pt2::new(0.7, 0.3),
        ];
        assert!(has_collinear_triple(&diagonal, 1e-6));

        let corners = [
            Pt2::new(0.3, 0.3),
            Pt2::new(0.7, 0.3),
            Pt2::new(0.3, 0.7),
            Pt2::new(0.7, 0.7),
        ];
        assert!(!has_collinear_triple(&corners, 1e-6));
    }
}
