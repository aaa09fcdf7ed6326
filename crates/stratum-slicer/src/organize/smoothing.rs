//! Neighbor averaging of printpoint attributes and duplicate cleanup.

use std::ops::{Add, Mul};

use tracing::{info, warn};

use super::OrganizedPrint;
use crate::error::{Result, SlicerError};
use crate::geometry::PrintPoint;

/// Smooth one attribute over the flattened printpoint sequence.
///
/// Each iteration moves every interior value towards the midpoint of its
/// two neighbors by `strength`, reading the neighbors from the previous
/// iteration. The first and last printpoint keep their values.
pub fn smooth_printpoint_attribute<T, G, S>(
    print: &mut OrganizedPrint,
    iterations: usize,
    strength: f64,
    get: G,
    set: S,
) -> Result<()>
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
    G: Fn(&PrintPoint) -> T,
    S: Fn(&mut PrintPoint, T),
{
    if !(0.0..=1.0).contains(&strength) {
        return Err(SlicerError::InvalidSettings(format!(
            "smoothing strength must be in [0, 1], got {strength}"
        )));
    }

    let mut values: Vec<T> = print.points().map(&get).collect();
    if values.len() < 3 {
        return Ok(());
    }
    for _ in 0..iterations {
        let previous = values.clone();
        for i in 1..previous.len() - 1 {
            let mid = (previous[i - 1] + previous[i + 1]) * 0.5;
            values[i] = mid * strength + previous[i] * (1.0 - strength);
        }
    }

    for (p, v) in print.points_mut().zip(values) {
        set(p, v);
    }
    Ok(())
}

/// Smooth layer heights across neighboring printpoints.
pub fn smooth_layer_heights(print: &mut OrganizedPrint, iterations: usize, strength: f64) -> Result<()> {
    info!(iterations, strength, "smoothing layer heights");
    smooth_printpoint_attribute(
        print,
        iterations,
        strength,
        |p| p.layer_height,
        |p, v| p.layer_height = v,
    )
}

/// Smooth up vectors across neighboring printpoints. Results are
/// renormalized.
pub fn smooth_up_vectors(print: &mut OrganizedPrint, iterations: usize, strength: f64) -> Result<()> {
    info!(iterations, strength, "smoothing up vectors");
    smooth_printpoint_attribute(
        print,
        iterations,
        strength,
        |p| p.up_vector,
        |p, v| {
            if let Some(unit) = v.try_normalize(1e-12) {
                p.up_vector = unit;
            }
        },
    )
}

/// Remove printpoints closer than `tolerance` to their predecessor in the
/// same path. Returns the number removed.
pub fn remove_duplicate_points(print: &mut OrganizedPrint, tolerance: f64) -> usize {
    let mut removed = 0;
    for (key, points) in print.paths_mut() {
        let before = points.len();
        points.dedup_by(|p, prev| p.distance(prev) < tolerance);
        let n = before - points.len();
        if n > 0 {
            warn!(layer = key.layer, path = key.path, removed = n, "duplicate printpoints removed");
        }
        removed += n;
    }
    removed
}
