use nalgebra::{Matrix3, Point2, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
pub type Mat3 = Matrix3<Real>;

/// Homogeneous weights closer to zero than this are treated as points at infinity.
pub const HOMOGENEOUS_EPS: Real = 1e-12;

pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Dehomogenize, returning `None` for points at (or numerically near) infinity.
pub fn try_from_homogeneous(v: &Vec3) -> Option<Pt2> {
    if v.z.abs() <= HOMOGENEOUS_EPS {
        return None;
    }
    let p = from_homogeneous(v);
    (p.x.is_finite() && p.y.is_finite()).then_some(p)
}

/// Apply a projective transform `H` to a 2D point: `p' ~ H p`.
pub fn apply_homography(h: &Mat3, p: &Pt2) -> Option<Pt2> {
    try_from_homogeneous(&(h * to_homogeneous(p)))
}

/// Centroid of a set of points, `None` when empty.
pub fn centroid(points: &[Pt2]) -> Option<Pt2> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vec2::zeros(), |acc, p| acc + p.coords);
    Some(Pt2::from(sum / points.len() as Real))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_homography_keeps_points() {
        let p = Pt2::new(0.25, 0.75);
        let q = apply_homography(&Mat3::identity(), &p).unwrap();
        assert!((q - p).norm() < 1e-12);
    }

    #[test]
    fn point_at_infinity_is_rejected() {
        assert!(try_from_homogeneous(&Vec3::new(1.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn centroid_of_square() {
        let pts = [
            Pt2::new(0.0, 0.0),
            Pt2::new(2.0, 0.0),
            Pt2::new(2.0, 2.0),
            Pt2::new(0.0, 2.0),
        ];
        let c = centroid(&pts).unwrap();
        assert!((c - Pt2::new(1.0, 1.0)).norm() < 1e-12);
        assert!(centroid(&[]).is_none());
    }
}
