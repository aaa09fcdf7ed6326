//! Polyline simplification.
//!
//! Ramer-Douglas-Peucker point reduction with a perpendicular-distance
//! tolerance. Simplification only removes points, so every kept point lies
//! on the original polyline; it must run before printpoints are derived.

use std::sync::atomic::{AtomicUsize, Ordering};

use stratum_math::{distance_point_line, Point3};
use tracing::{debug, info};

use crate::geometry::Path;
use crate::slicer::SliceResult;

/// Indices of the points kept by Douglas-Peucker. The first and last
/// indices are always kept.
fn douglas_peucker_mask(points: &[Point3], tolerance: f64) -> Vec<bool> {
    let n = points.len();
    let mut keep = vec![n <= 2; n];
    if n <= 2 {
        return keep;
    }
    keep[0] = true;
    keep[n - 1] = true;

    // Explicit stack instead of recursion.
    let mut stack = vec![(0, n - 1)];
    while let Some((anchor, floater)) = stack.pop() {
        if anchor + 1 >= floater {
            continue;
        }
        let (a, b) = (&points[anchor], &points[floater]);
        let mut max_dist = 0.0;
        let mut furthest = anchor;
        for (i, p) in points.iter().enumerate().take(floater).skip(anchor + 1) {
            let d = distance_point_line(p, a, b);
            if d > max_dist {
                max_dist = d;
                furthest = i;
            }
        }
        if max_dist > tolerance {
            keep[furthest] = true;
            stack.push((anchor, furthest));
            stack.push((furthest, floater));
        }
    }
    keep
}

/// Simplify an open polyline. Endpoints are preserved.
pub fn douglas_peucker(points: &[Point3], tolerance: f64) -> Vec<Point3> {
    let keep = douglas_peucker_mask(points, tolerance);
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplify a closed ring.
///
/// The ring is cut open at the point farthest from its centroid, closed
/// again by repeating that point, and simplified as a polyline. Kept points
/// stay in their original cyclic order and starting point.
pub fn douglas_peucker_ring(points: &[Point3], tolerance: f64) -> Vec<Point3> {
    let n = points.len();
    if n <= 3 {
        return points.to_vec();
    }
    let Some(center) = stratum_math::centroid(points) else {
        return points.to_vec();
    };
    let mut anchor = 0;
    let mut best = f64::MIN;
    for (i, p) in points.iter().enumerate() {
        let d = (p - center).norm();
        if d > best {
            best = d;
            anchor = i;
        }
    }

    let ring: Vec<Point3> = (0..=n).map(|k| points[(anchor + k) % n]).collect();
    let ring_keep = douglas_peucker_mask(&ring, tolerance);
    let mut keep = vec![false; n];
    for (k, kept) in ring_keep.into_iter().take(n).enumerate() {
        keep[(anchor + k) % n] = kept;
    }

    let simplified: Vec<Point3> = points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect();
    if simplified.len() < 3 {
        return points.to_vec();
    }
    simplified
}

/// Simplify one path in place. Returns the number of removed points.
pub fn simplify_path(path: &mut Path, tolerance: f64) -> usize {
    let before = path.len();
    path.points = if path.is_closed {
        douglas_peucker_ring(&path.points, tolerance)
    } else {
        douglas_peucker(&path.points, tolerance)
    };
    before - path.len()
}

/// Simplify every path of a slice result in parallel.
pub fn simplify_paths_rdp(result: &mut SliceResult, tolerance: f64) {
    info!(tolerance, "simplifying paths");
    let removed = AtomicUsize::new(0);
    result.par_for_each_path(|path| {
        let n = simplify_path(path, tolerance);
        removed.fetch_add(n, Ordering::Relaxed);
    });
    debug!(removed = removed.into_inner(), "points removed by simplification");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Layer;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    #[test]
    fn test_collinear_points_removed() {
        let points = vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)];
        assert_eq!(douglas_peucker(&points, 0.01), vec![p(0.0, 0.0), p(3.0, 0.0)]);
    }

    #[test]
    fn test_large_deviation_kept() {
        let points = vec![p(0.0, 0.0), p(1.0, 0.1), p(2.0, 2.0), p(3.0, 0.0)];
        let out = douglas_peucker(&points, 0.7);
        assert_eq!(out, vec![p(0.0, 0.0), p(2.0, 2.0), p(3.0, 0.0)]);
        assert_eq!(douglas_peucker(&points, 0.5).len(), 4);
    }

    #[test]
    fn test_simplified_points_lie_near_original() {
        let points: Vec<Point3> = (0..50)
            .map(|i| {
                let x = f64::from(i) * 0.2;
                p(x, (x * 1.3).sin())
            })
            .collect();
        for tolerance in [0.01, 0.1, 0.5] {
            let out = douglas_peucker(&points, tolerance);
            assert_eq!(out.first(), points.first());
            assert_eq!(out.last(), points.last());
            assert!(out.len() < points.len());

            let keep = douglas_peucker_mask(&points, tolerance);
            let kept: Vec<usize> = (0..points.len()).filter(|&i| keep[i]).collect();
            for w in kept.windows(2) {
                for q in &points[w[0] + 1..w[1]] {
                    let d = distance_point_line(q, &points[w[0]], &points[w[1]]);
                    assert!(d <= tolerance, "deviation {d} > {tolerance}");
                }
            }
        }
    }

    #[test]
    fn test_ring_reduces_to_corners() {
        // Square with edge midpoints, starting at a midpoint.
        let points = vec![
            p(1.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(2.0, 2.0),
            p(1.0, 2.0),
            p(0.0, 2.0),
            p(0.0, 1.0),
            p(0.0, 0.0),
        ];
        let out = douglas_peucker_ring(&points, 0.01);
        assert_eq!(out, vec![p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(0.0, 0.0)]);
    }

    #[test]
    fn test_simplify_keeps_closed_flag() {
        let mut result = SliceResult::Horizontal(vec![Layer::new(vec![
            Path::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)], false),
            Path::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)], true),
        ])]);
        simplify_paths_rdp(&mut result, 0.1);
        let paths = result.groups()[0];
        assert_eq!(paths[0].len(), 2);
        assert!(!paths[0].is_closed);
        assert_eq!(paths[1].len(), 3);
        assert!(paths[1].is_closed);
    }
}
