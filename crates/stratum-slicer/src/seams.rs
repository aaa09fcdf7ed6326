//! Seam placement and path direction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stratum_math::{Point3, Vec3};
use tracing::info;

use crate::error::{Result, SlicerError};
use crate::geometry::Path;
use crate::slicer::SliceResult;

/// Far point used for the axis-aligned seam references.
const AXIS_REFERENCE: f64 = 4_294_967_296.0;

/// Reference used to choose where each path starts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamOrientation {
    /// Closest to the end point of the previously printed path.
    #[default]
    NextPath,
    /// Closest to the seam of the previously printed path.
    NextContour,
    /// Closest to the origin.
    Origin,
    /// Toward +x.
    XAxis,
    /// Toward +y.
    YAxis,
    /// Closest to an explicit point.
    Point([f64; 3]),
}

impl FromStr for SeamOrientation {
    type Err = SlicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "next_path" => Ok(Self::NextPath),
            "next_contour" => Ok(Self::NextContour),
            "origin" => Ok(Self::Origin),
            "x_axis" => Ok(Self::XAxis),
            "y_axis" => Ok(Self::YAxis),
            other => Err(SlicerError::UnknownOption {
                kind: "seam orientation",
                value: other.to_string(),
            }),
        }
    }
}

impl SeamOrientation {
    /// Fixed reference point, or `None` for the modes that follow the
    /// previous path.
    pub fn fixed_point(&self) -> Option<Point3> {
        match self {
            Self::NextPath | Self::NextContour => None,
            Self::Origin => Some(Point3::origin()),
            Self::XAxis => Some(Point3::new(AXIS_REFERENCE, 0.0, 0.0)),
            Self::YAxis => Some(Point3::new(0.0, AXIS_REFERENCE, 0.0)),
            Self::Point([x, y, z]) => Some(Point3::new(*x, *y, *z)),
        }
    }

    fn reference_after(&self, previous: &Path) -> Option<Point3> {
        match self {
            Self::NextPath => previous.last().copied(),
            Self::NextContour => previous.first().copied(),
            fixed => fixed.fixed_point(),
        }
    }
}

/// Start `path` as close as possible to `reference`.
///
/// A closed path is rotated so its closest point comes first (the earliest
/// one on ties). An open path is reversed only when its last point is
/// strictly closer than its first. Aligning twice to the same reference
/// changes nothing.
pub fn align_seam(path: &mut Path, reference: &Point3) {
    if path.is_closed {
        let start = path
            .points
            .iter()
            .map(|p| (p - reference).norm())
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best });
        path.rotate_to(start.0);
    } else if let (Some(first), Some(last)) = (path.first(), path.last()) {
        if (last - reference).norm() < (first - reference).norm() {
            path.reverse();
        }
    }
}

/// Align the seams of every path in print order.
///
/// Fixed orientations use the same point for all paths. `NextPath` and
/// `NextContour` use the previously aligned path, so the pass is
/// sequential; the first path of the print keeps its seam.
pub fn align_seams(result: &mut SliceResult, orientation: SeamOrientation) {
    info!(?orientation, "aligning seams");
    let mut previous: Option<Path> = None;
    result.for_each_group_mut(|_, paths| {
        for path in paths.iter_mut() {
            let reference = match (&previous, orientation.fixed_point()) {
                (_, Some(fixed)) => Some(fixed),
                (Some(prev), None) => orientation.reference_after(prev),
                (None, None) => None,
            };
            if let Some(reference) = reference {
                align_seam(path, &reference);
            }
            if orientation.fixed_point().is_none() {
                previous = Some(path.clone());
            }
        }
    });
}

fn travel_direction(points: &[Point3], use_third: bool) -> Option<Vec3> {
    let step = if use_third { 2 } else { 1 };
    let v = points.get(step)? - points.first()?;
    let n = v.norm();
    (n > 1e-12).then(|| v / n)
}

/// Reverse `path` if it runs against `reference`. A closed path keeps its
/// seam and reverses the remaining points.
pub fn match_orientation(path: &mut Path, reference: &Path) {
    let long = path.len() > 2 && reference.len() > 2;
    let (Some(v1), Some(v2)) = (
        travel_direction(&path.points, long),
        travel_direction(&reference.points, long),
    ) else {
        return;
    };
    if v1.dot(&v2) >= 0.0 {
        return;
    }
    if path.is_closed {
        path.points[1..].reverse();
    } else {
        path.reverse();
    }
}

/// Make every path run in the same direction as its predecessor: the
/// previous path of its layer or segment, or, for the first path of a
/// horizontal layer, the first path of the layer below.
pub fn unify_paths_orientation(result: &mut SliceResult) {
    let horizontal = result.is_horizontal();
    let mut layer_head: Option<Path> = None;
    result.for_each_group_mut(|_, paths| {
        for j in 0..paths.len() {
            let reference = if j > 0 {
                Some(paths[j - 1].clone())
            } else if horizontal {
                layer_head.clone()
            } else {
                None
            };
            if let Some(reference) = reference {
                match_orientation(&mut paths[j], &reference);
            }
        }
        layer_head = paths.first().cloned();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Layer;

    fn square(z: f64) -> Path {
        Path::new(
            vec![
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(0.0, 1.0, z),
            ],
            true,
        )
    }

    #[test]
    fn test_closed_path_rotates_to_closest() {
        let mut path = square(0.0);
        align_seam(&mut path, &Point3::new(2.0, 2.0, 0.0));
        assert_eq!(path.points[0], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(path.points[1], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_align_is_idempotent() {
        let reference = Point3::new(5.0, -3.0, 1.0);
        let mut path = square(0.0);
        align_seam(&mut path, &reference);
        let once = path.clone();
        align_seam(&mut path, &reference);
        assert_eq!(path, once);
    }

    #[test]
    fn test_ties_pick_first_occurrence() {
        let mut path = square(0.0);
        // (0,0) and (1,0) are equally far from (0.5, -1).
        align_seam(&mut path, &Point3::new(0.5, -1.0, 0.0));
        assert_eq!(path.points[0], Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_open_path_reversed_only_when_strictly_closer() {
        let mut path = Path::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)], false);
        align_seam(&mut path, &Point3::new(2.0, 1.0, 0.0));
        assert_eq!(path.points[0].x, 0.0);
        align_seam(&mut path, &Point3::new(5.0, 0.0, 0.0));
        assert_eq!(path.points[0].x, 4.0);
    }

    #[test]
    fn test_next_contour_follows_previous_seam() {
        let mut first = square(0.0);
        first.rotate_to(2);
        let mut result = SliceResult::Horizontal(vec![
            Layer::new(vec![first]),
            Layer::new(vec![square(1.0)]),
        ]);
        align_seams(&mut result, SeamOrientation::NextContour);
        let groups = result.groups();
        assert_eq!(groups[0][0].points[0], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(groups[1][0].points[0], Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_fixed_orientation() {
        let mut result = SliceResult::Horizontal(vec![Layer::new(vec![square(0.0), square(1.0)])]);
        align_seams(&mut result, SeamOrientation::XAxis);
        assert!(result.groups()[0].iter().all(|p| p.points[0].x == 1.0 && p.points[0].y == 0.0));
        assert_eq!(
            "y_axis".parse::<SeamOrientation>().unwrap().fixed_point(),
            Some(Point3::new(0.0, AXIS_REFERENCE, 0.0))
        );
        assert!("random".parse::<SeamOrientation>().is_err());
    }

    fn circle(z: f64) -> Path {
        let points = (0..12)
            .map(|i| {
                let a = std::f64::consts::TAU * f64::from(i) / 12.0;
                Point3::new(a.cos(), a.sin(), z)
            })
            .collect();
        Path::new(points, true)
    }

    #[test]
    fn test_unify_orientation_reverses_closed_path_keeping_seam() {
        let mut reversed = circle(1.0);
        reversed.points[1..].reverse();
        let mut result = SliceResult::Horizontal(vec![
            Layer::new(vec![circle(0.0)]),
            Layer::new(vec![reversed]),
        ]);
        unify_paths_orientation(&mut result);
        assert_eq!(result.groups()[1][0], circle(1.0));
    }

    #[test]
    fn test_unify_orientation_reverses_open_path() {
        let a = Path::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)], false);
        let b = Path::new(vec![Point3::new(3.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0)], false);
        let mut result = SliceResult::Horizontal(vec![Layer::new(vec![a, b])]);
        unify_paths_orientation(&mut result);
        assert_eq!(result.groups()[0][1].points[0].x, 0.0);
    }
}
