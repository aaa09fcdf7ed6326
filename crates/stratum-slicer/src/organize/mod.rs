//! Print organization.
//!
//! Turns the final ordered layers or segments into [`OrganizedPrint`]:
//! one sequence of [`PrintPoint`](crate::geometry::PrintPoint)s per path,
//! keyed by `(layer, path)`, with the fabrication attributes derived by a
//! fixed sequence of passes:
//!
//! 1. extruder toggle
//! 2. linear velocity
//! 3. blend radius and dwell at sharp corners
//! 4. z-hop safety points (optional)
//! 5. mesh attribute transfer (when the mesh carries any)
//!
//! Every pass is also available as a free function for callers that want a
//! different order.

mod motion;
mod print;
mod printpoints;
mod safety;
mod smoothing;
mod stats;
mod toggle;
mod velocity;

pub use motion::{blend_radius, set_blend_radius, set_wait_time, wait_at_sharp_corners};
pub use print::OrganizedPrint;
pub use printpoints::{closest_point_on_path, create_printpoints};
pub use safety::{add_safety_printpoints, create_safety_printpoint};
pub use smoothing::{
    remove_duplicate_points, smooth_layer_heights, smooth_printpoint_attribute, smooth_up_vectors,
};
pub use stats::PrintStats;
pub use toggle::{check_assigned_extruder_toggle, override_extruder_toggle, set_extruder_toggle};
pub use velocity::{
    calculate_linear_velocity, set_linear_velocity, set_linear_velocity_by_range,
    set_linear_velocity_constant, set_linear_velocity_matching_layer_height,
    set_linear_velocity_per_layer, VelocityType,
};

use stratum_mesh::SurfaceMesh;
use tracing::info;

use crate::config::{PrintSettings, SlicingSettings};
use crate::error::Result;
use crate::slicer::SliceResult;
use crate::transfer;

/// Builds and decorates the printpoints of one slice result.
#[derive(Debug)]
pub struct PrintOrganizer<'a> {
    result: &'a SliceResult,
    mesh: &'a SurfaceMesh,
    print: OrganizedPrint,
}

impl<'a> PrintOrganizer<'a> {
    /// Create the printpoints of every path in `result`.
    pub fn new(result: &'a SliceResult, mesh: &'a SurfaceMesh, slicing: &SlicingSettings) -> Self {
        Self {
            result,
            mesh,
            print: create_printpoints(result, mesh, slicing),
        }
    }

    /// The slice result being organized.
    pub fn result(&self) -> &SliceResult {
        self.result
    }

    /// Printpoints built so far.
    pub fn print(&self) -> &OrganizedPrint {
        &self.print
    }

    /// Mutable printpoints, for passes run outside the organizer.
    pub fn print_mut(&mut self) -> &mut OrganizedPrint {
        &mut self.print
    }

    /// Finish and take the printpoints.
    pub fn into_print(self) -> OrganizedPrint {
        self.print
    }

    /// Assign extruder toggles from the layer structure.
    pub fn set_extruder_toggle(&mut self) {
        set_extruder_toggle(&mut self.print, self.result);
    }

    /// Copy the mesh attributes onto every printpoint.
    pub fn transfer_mesh_attributes(&mut self) {
        transfer::transfer_mesh_attributes(&mut self.print, self.mesh);
    }

    /// Summary numbers of the current printpoints.
    pub fn stats(&self) -> PrintStats {
        PrintStats::from_print(&self.print)
    }

    /// Run every derivation pass configured in `settings`.
    pub fn organize(&mut self, settings: &PrintSettings) -> Result<()> {
        let org = &settings.organization;
        info!(paths = self.print.number_of_paths(), "organizing print");

        self.set_extruder_toggle();
        set_linear_velocity(&mut self.print, &settings.velocity)?;
        set_blend_radius(&mut self.print, org.d_fillet, org.blend_buffer);
        wait_at_sharp_corners(&mut self.print, org.corner_angle_threshold, org.corner_wait_time);
        if org.add_safety_points {
            add_safety_printpoints(&mut self.print, org.z_hop)?;
        }
        if transfer::has_transferable_attributes(self.mesh) {
            self.transfer_mesh_attributes();
        }
        Ok(())
    }
}
