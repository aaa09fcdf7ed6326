#![warn(missing_docs)]

//! Math types for the stratum slicer.
//!
//! Thin wrappers around nalgebra providing the point and vector types used
//! throughout the slicer, tolerance constants, and the handful of small
//! geometric kernels the slicing pipeline needs (plane projection,
//! barycentric coordinates, point-to-line distance, distance unions).

use nalgebra::{Vector2, Vector3};

pub mod union;

pub use union::{
    blend_union, blend_union_list, chamfer_union, chamfer_union_list, stairs_union,
    stairs_union_list,
};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A point in the XY plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default slicing tolerances (1e-9 mm linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An infinite plane given by a point on it and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3,
    /// Unit normal.
    pub normal: Vec3,
}

impl Plane {
    /// Create a plane, normalizing `normal`. Returns `None` for a zero normal.
    pub fn new(origin: Point3, normal: Vec3) -> Option<Self> {
        let len = normal.norm();
        if len < Tolerance::DEFAULT.linear {
            return None;
        }
        Some(Self {
            origin,
            normal: normal / len,
        })
    }

    /// Signed distance from `p` to the plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    /// Orthogonal projection of `p` onto the plane.
    pub fn project(&self, p: &Point3) -> Point3 {
        p - self.normal * self.signed_distance(p)
    }
}

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`.
///
/// `p` is assumed to lie in the triangle's plane (project it first). For a
/// degenerate triangle the weight is put entirely on `a`.
pub fn barycentric(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> [f64; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < f64::EPSILON {
        return [1.0, 0.0, 0.0];
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    [1.0 - v - w, v, w]
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
///
/// Falls back to the point distance `|p - a|` when `a` and `b` coincide.
pub fn distance_point_line(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len < Tolerance::DEFAULT.linear {
        return (p - a).norm();
    }
    ab.cross(&(a - p)).norm() / len
}

/// Distance from `p` to the closed segment `[a, b]`, with the closest point.
pub fn closest_point_on_segment(p: &Point3, a: &Point3, b: &Point3) -> (Point3, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return (*a, (p - a).norm());
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (closest, (p - closest).norm())
}

/// Unsigned angle between two vectors in radians, in `[0, π]`.
///
/// Returns 0 when either vector has zero length.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let na = a.norm();
    let nb = b.norm();
    if na < f64::EPSILON || nb < f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / (na * nb)).clamp(-1.0, 1.0).acos()
}

/// Arithmetic mean of a set of points, or `None` if the set is empty.
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Linear remap of `value` from `[in_from, in_to]` to `[out_from, out_to]`,
/// without clamping. A zero-width input range maps everything to `out_from`.
pub fn remap_unbound(value: f64, in_from: f64, in_to: f64, out_from: f64, out_to: f64) -> f64 {
    let in_range = in_to - in_from;
    if in_range.abs() < f64::EPSILON {
        return out_from;
    }
    out_from + (value - in_from) / in_range * (out_to - out_from)
}

/// Linear remap clamped to the output range.
pub fn remap(value: f64, in_from: f64, in_to: f64, out_from: f64, out_to: f64) -> f64 {
    let v = remap_unbound(value, in_from, in_to, out_from, out_to);
    let (lo, hi) = if out_from <= out_to {
        (out_from, out_to)
    } else {
        (out_to, out_from)
    };
    v.clamp(lo, hi)
}

/// Round to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_plane_projection() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, 5.0)).unwrap();
        let p = plane.project(&Point3::new(1.0, 3.0, 7.0));
        assert_relative_eq!(p.z, 2.0);
        assert_relative_eq!(p.x, 1.0);
        assert!(Plane::new(Point3::origin(), Vec3::zeros()).is_none());
    }

    #[test]
    fn test_barycentric_vertices_and_centroid() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let w = barycentric(&b, &a, &b, &c);
        assert_relative_eq!(w[1], 1.0, epsilon = 1e-12);
        let g = Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0);
        let w = barycentric(&g, &a, &b, &c);
        for wi in w {
            assert_relative_eq!(wi, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_distance_point_line() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 0.0, 0.0);
        assert_relative_eq!(distance_point_line(&Point3::new(20.0, 3.0, 0.0), &a, &b), 3.0);
        assert_relative_eq!(distance_point_line(&Point3::new(0.0, 4.0, 3.0), &a, &a), 5.0);
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let (c, d) = closest_point_on_segment(&Point3::new(3.0, 4.0, 0.0), &a, &b);
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(d, (4.0f64 + 16.0).sqrt());
    }

    #[test]
    fn test_angle_between() {
        assert_relative_eq!(angle_between(&Vec3::x(), &Vec3::y()), PI / 2.0);
        assert_relative_eq!(angle_between(&Vec3::x(), &-Vec3::x()), PI);
        assert_relative_eq!(angle_between(&Vec3::zeros(), &Vec3::x()), 0.0);
    }

    #[test]
    fn test_remap() {
        assert_relative_eq!(remap_unbound(0.5, 0.0, 0.25, 0.0, 1.0), 2.0);
        assert_relative_eq!(remap(0.5, 0.0, 0.25, 0.0, 1.0), 1.0);
        assert_relative_eq!(remap_unbound(3.0, 1.0, 1.0, 7.0, 9.0), 7.0);
    }

    #[test]
    fn test_round_to() {
        assert_relative_eq!(round_to(1.234_567_89, 5), 1.23457);
    }
}
