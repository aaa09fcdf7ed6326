use serde::{Deserialize, Serialize};
use stratum_math::{centroid, Point3};

/// An ordered chain of points.
///
/// A closed path does not repeat its first point at the end; the closing
/// segment from the last point back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Points in print order.
    pub points: Vec<Point3>,
    /// Whether the last point connects back to the first.
    pub is_closed: bool,
}

impl Path {
    /// Create a path from points.
    pub fn new(points: Vec<Point3>, is_closed: bool) -> Self {
        Self { points, is_closed }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point (the seam of a closed path).
    pub fn first(&self) -> Option<&Point3> {
        self.points.first()
    }

    /// Last point.
    pub fn last(&self) -> Option<&Point3> {
        self.points.last()
    }

    /// Mean of the path's points.
    pub fn centroid(&self) -> Option<Point3> {
        centroid(&self.points)
    }

    /// Polyline length, including the closing segment of a closed path.
    pub fn length(&self) -> f64 {
        let open: f64 = self
            .points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum();
        match (self.is_closed, self.points.first(), self.points.last()) {
            (true, Some(a), Some(b)) if self.points.len() > 2 => open + (a - b).norm(),
            _ => open,
        }
    }

    /// Reverse the point order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Rotate the points so that index `start` becomes index 0.
    ///
    /// Only meaningful for closed paths; for open paths it would change the
    /// geometry, so it is a no-op.
    pub fn rotate_to(&mut self, start: usize) {
        if self.is_closed && start < self.points.len() {
            self.points.rotate_left(start);
        }
    }

    /// Lowest and highest z of the path's points.
    pub fn z_bounds(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.z, p.z)),
            Some((lo, hi)) => Some((lo.min(p.z), hi.max(p.z))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(closed: bool) -> Path {
        Path::new(
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(2.0, 0.0, 1.0),
                Point3::new(2.0, 2.0, 1.0),
                Point3::new(0.0, 2.0, 1.0),
            ],
            closed,
        )
    }

    #[test]
    fn test_length_counts_closing_segment() {
        assert_relative_eq!(square(true).length(), 8.0);
        assert_relative_eq!(square(false).length(), 6.0);
    }

    #[test]
    fn test_rotate_to() {
        let mut path = square(true);
        path.rotate_to(2);
        assert_eq!(path.points[0], Point3::new(2.0, 2.0, 1.0));
        assert_eq!(path.len(), 4);

        let mut open = square(false);
        open.rotate_to(2);
        assert_eq!(open, square(false));
    }

    #[test]
    fn test_centroid_and_bounds() {
        let c = square(true).centroid().unwrap();
        assert_relative_eq!(c.x, 1.0);
        assert_eq!(square(true).z_bounds(), Some((1.0, 1.0)));
        assert!(Path::new(Vec::new(), true).centroid().is_none());
    }
}
