//! Z-hop safety points around travel moves.

use stratum_math::Vec3;
use tracing::info;

use super::toggle::require_extruder_toggle;
use super::OrganizedPrint;
use crate::error::Result;
use crate::geometry::PrintPoint;

/// Copy of `printpoint` raised by `z_hop` with the extruder off.
pub fn create_safety_printpoint(printpoint: &PrintPoint, z_hop: f64) -> PrintPoint {
    let mut safety = printpoint.clone();
    safety.point += Vec3::new(0.0, 0.0, z_hop);
    safety.extruder_toggle = Some(false);
    safety
}

/// Insert z-hop points so the tool lifts before every travel move.
///
/// A raised copy follows every point with the extruder off. A path that
/// resumes printing after such a point starts with a raised copy of its
/// first point, and so does the first path of the print. Extruder toggles
/// must already be assigned.
pub fn add_safety_printpoints(print: &mut OrganizedPrint, z_hop: f64) -> Result<()> {
    require_extruder_toggle(print)?;
    info!(z_hop, "adding safety printpoints");

    let mut first_path = true;
    let mut previous_off = false;
    for (_, points) in print.paths_mut() {
        let Some(first) = points.first() else {
            continue;
        };

        let mut out = Vec::with_capacity(points.len() * 2);
        let resumes = previous_off && first.extruder_toggle == Some(true);
        if first_path || resumes {
            out.push(create_safety_printpoint(first, z_hop));
        }
        for p in points.drain(..) {
            let off = p.extruder_toggle == Some(false);
            let safety = off.then(|| create_safety_printpoint(&p, z_hop));
            out.push(p);
            out.extend(safety);
            previous_off = off;
        }
        *points = out;
        first_path = false;
    }
    Ok(())
}
