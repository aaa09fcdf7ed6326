use serde::{Deserialize, Serialize};
use stratum_math::Point3;

use super::OrganizedPrint;

/// Summary numbers of an organized print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintStats {
    /// Number of layers (or segments).
    pub layer_count: usize,
    /// Number of paths.
    pub path_count: usize,
    /// Number of printpoints.
    pub point_count: usize,
    /// Length of all moves with the extruder on.
    pub extrusion_length: f64,
    /// Length of all moves with the extruder off, including travel between
    /// paths.
    pub travel_length: f64,
    /// Sum of move durations and dwell times. `None` while any printpoint
    /// has no velocity.
    pub print_time_seconds: Option<f64>,
    /// Bounding box minimum corner.
    pub bounds_min: [f64; 3],
    /// Bounding box maximum corner.
    pub bounds_max: [f64; 3],
}

impl PrintStats {
    /// Gather statistics by walking every printpoint in print order.
    ///
    /// A move ends at a printpoint; its extruder state is the toggle of the
    /// point it ends at.
    pub fn from_print(print: &OrganizedPrint) -> Self {
        let mut extrusion_length = 0.0;
        let mut travel_length = 0.0;
        let mut time = Some(0.0);
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut previous: Option<Point3> = None;

        for p in print.points() {
            for axis in 0..3 {
                min[axis] = min[axis].min(p.point[axis]);
                max[axis] = max[axis].max(p.point[axis]);
            }
            let length = previous.map_or(0.0, |q| (p.point - q).norm());
            if p.extruder_toggle == Some(true) {
                extrusion_length += length;
            } else {
                travel_length += length;
            }
            time = match (time, p.velocity) {
                (Some(t), Some(v)) if v > 0.0 => Some(t + length / v + p.wait_time),
                _ => None,
            };
            previous = Some(p.point);
        }

        if previous.is_none() {
            min = [0.0; 3];
            max = [0.0; 3];
            time = None;
        }

        Self {
            layer_count: print.number_of_layers(),
            path_count: print.number_of_paths(),
            point_count: print.number_of_points(),
            extrusion_length,
            travel_length,
            print_time_seconds: time,
            bounds_min: min,
            bounds_max: max,
        }
    }

    /// Total length of all moves.
    pub fn total_length(&self) -> f64 {
        self.extrusion_length + self.travel_length
    }
}
