//! Extruder on/off state.

use tracing::{info, warn};

use super::OrganizedPrint;
use crate::error::{Result, SlicerError};
use crate::geometry::PathKey;
use crate::slicer::SliceResult;

/// Set the extruder toggle of every printpoint.
///
/// A path is interrupted at its end when it is open, when it shares a
/// horizontal layer with other paths, or when it is the last path of a
/// vertical segment. The last point of an interrupted path is off, every
/// other point is on. The last point of the whole print is always off.
pub fn set_extruder_toggle(print: &mut OrganizedPrint, result: &SliceResult) {
    info!("setting extruder toggle");
    let horizontal = result.is_horizontal();

    for (i, paths) in result.groups().into_iter().enumerate() {
        for (j, path) in paths.iter().enumerate() {
            let interrupted = !path.is_closed
                || (horizontal && paths.len() > 1)
                || (!horizontal && j + 1 == paths.len());

            let Some(points) = print.get_mut(PathKey::new(i, j)) else {
                warn!(layer = i, path = j, "no printpoints for path");
                continue;
            };
            let last = points.len().saturating_sub(1);
            for (k, p) in points.iter_mut().enumerate() {
                p.extruder_toggle = Some(!(interrupted && k == last));
            }
        }
    }

    if let Some(p) = print.last_point_mut() {
        p.extruder_toggle = Some(false);
    }
}

/// Set every printpoint's toggle to `value`.
pub fn override_extruder_toggle(print: &mut OrganizedPrint, value: bool) {
    for p in print.points_mut() {
        p.extruder_toggle = Some(value);
    }
}

/// Whether every printpoint has a toggle assigned.
pub fn check_assigned_extruder_toggle(print: &OrganizedPrint) -> bool {
    print.points().all(|p| p.extruder_toggle.is_some())
}

/// Error naming the first printpoint without a toggle.
pub(crate) fn require_extruder_toggle(print: &OrganizedPrint) -> Result<()> {
    for (key, points) in print.paths() {
        if let Some(index) = points.iter().position(|p| p.extruder_toggle.is_none()) {
            return Err(SlicerError::IncompleteAttributes {
                layer: key.layer,
                path: key.path,
                index,
                attribute: "extruder_toggle",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Layer, Path, PrintPoint, Segment};
    use stratum_math::{Point3, Vec3};

    fn path(closed: bool, n: usize) -> Path {
        let points = (0..n).map(|i| Point3::new(i as f64, (i % 2) as f64, 0.0)).collect();
        Path::new(points, closed)
    }

    fn organized(result: &SliceResult) -> OrganizedPrint {
        let mut print = OrganizedPrint::new();
        for (i, paths) in result.groups().into_iter().enumerate() {
            for (j, path) in paths.iter().enumerate() {
                let key = PathKey::new(i, j);
                let points = path
                    .points
                    .iter()
                    .map(|p| PrintPoint::new(*p, 1.0, Vec3::z(), key))
                    .collect();
                print.insert(key, points);
            }
        }
        print
    }

    fn toggles(print: &OrganizedPrint, layer: usize, path: usize) -> Vec<bool> {
        print
            .get(PathKey::new(layer, path))
            .unwrap()
            .iter()
            .map(|p| p.extruder_toggle.unwrap())
            .collect()
    }

    #[test]
    fn test_two_closed_paths_in_layer() {
        let result = SliceResult::Horizontal(vec![
            Layer::new(vec![path(true, 4), path(true, 4)]),
            Layer::new(vec![path(true, 4)]),
        ]);
        let mut print = organized(&result);
        set_extruder_toggle(&mut print, &result);
        assert_eq!(toggles(&print, 0, 0), vec![true, true, true, false]);
        assert_eq!(toggles(&print, 0, 1), vec![true, true, true, false]);
        assert_eq!(toggles(&print, 1, 0), vec![true, true, true, false]);
    }

    #[test]
    fn test_single_closed_path_is_continuous() {
        let result = SliceResult::Horizontal(vec![
            Layer::new(vec![path(true, 3)]),
            Layer::new(vec![path(true, 3)]),
        ]);
        let mut print = organized(&result);
        set_extruder_toggle(&mut print, &result);
        assert_eq!(toggles(&print, 0, 0), vec![true, true, true]);
        assert_eq!(toggles(&print, 1, 0), vec![true, true, false]);
    }

    #[test]
    fn test_open_path_and_segment_end() {
        let result = SliceResult::Vertical(vec![
            Segment::from_paths(vec![path(true, 3), path(true, 3)]),
            Segment::from_paths(vec![path(false, 2), path(true, 3)]),
        ]);
        let mut print = organized(&result);
        set_extruder_toggle(&mut print, &result);
        assert_eq!(toggles(&print, 0, 0), vec![true, true, true]);
        assert_eq!(toggles(&print, 0, 1), vec![true, true, false]);
        assert_eq!(toggles(&print, 1, 0), vec![true, false]);
        assert_eq!(toggles(&print, 1, 1), vec![true, true, false]);
    }

    #[test]
    fn test_override_and_check() {
        let result = SliceResult::Horizontal(vec![Layer::new(vec![path(true, 3)])]);
        let mut print = organized(&result);
        assert!(!check_assigned_extruder_toggle(&print));
        assert!(matches!(
            require_extruder_toggle(&print),
            Err(SlicerError::IncompleteAttributes { index: 0, .. })
        ));
        override_extruder_toggle(&mut print, true);
        assert!(check_assigned_extruder_toggle(&print));
        assert!(require_extruder_toggle(&print).is_ok());
    }
}
