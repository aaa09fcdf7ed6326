//! Corner blending and dwell times.

use stratum_math::{angle_between, round_to, Point3};
use tracing::{debug, info};

use super::OrganizedPrint;

/// Blend radius at `point`: `d_fillet`, reduced to `buffer` times the
/// distance to each existing neighbor, rounded to 5 decimals.
pub fn blend_radius(
    point: &Point3,
    prev: Option<&Point3>,
    next: Option<&Point3>,
    d_fillet: f64,
    buffer: f64,
) -> f64 {
    let radius = [prev, next]
        .into_iter()
        .flatten()
        .fold(d_fillet, |r, n| r.min((n - point).norm() * buffer));
    round_to(radius, 5)
}

/// Set the blend radius of every printpoint from its neighbors within the
/// same path. Points with a dwell time get 0.
pub fn set_blend_radius(print: &mut OrganizedPrint, d_fillet: f64, buffer: f64) {
    info!(d_fillet, buffer, "setting blend radius");
    for (_, points) in print.paths_mut() {
        let positions: Vec<Point3> = points.iter().map(|p| p.point).collect();
        for (k, p) in points.iter_mut().enumerate() {
            p.blend_radius = if p.wait_time > 0.0 {
                0.0
            } else {
                let prev = k.checked_sub(1).map(|i| &positions[i]);
                blend_radius(&positions[k], prev, positions.get(k + 1), d_fillet, buffer)
            };
        }
    }
}

/// Dwell at corners sharper than `threshold` (radians between the
/// directions to the two neighbors). Those points also lose their blend.
pub fn wait_at_sharp_corners(print: &mut OrganizedPrint, threshold: f64, wait_time: f64) {
    let mut corners = 0;
    for (_, points) in print.paths_mut() {
        for k in 1..points.len().saturating_sub(1) {
            let p = points[k].point;
            let to_prev = points[k - 1].point - p;
            let to_next = points[k + 1].point - p;
            if to_prev.norm() < 1e-12 || to_next.norm() < 1e-12 {
                continue;
            }
            if angle_between(&to_prev, &to_next) < threshold {
                points[k].wait_time = wait_time;
                points[k].blend_radius = 0.0;
                corners += 1;
            }
        }
    }
    debug!(corners, threshold, "sharp corners marked");
}

/// Set the same dwell time on every printpoint.
pub fn set_wait_time(print: &mut OrganizedPrint, wait_time: f64) {
    for p in print.points_mut() {
        p.wait_time = wait_time;
    }
}
