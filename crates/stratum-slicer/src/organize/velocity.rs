//! Linear velocity assignment.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stratum_math::{remap, remap_unbound};
use tracing::info;

use super::OrganizedPrint;
use crate::config::VelocitySettings;
use crate::error::{Result, SlicerError};
use crate::geometry::PrintPoint;

/// How printpoint velocities are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityType {
    /// One value everywhere.
    #[default]
    Constant,
    /// One value per layer.
    PerLayer,
    /// Extrusion volume matched to the local layer height.
    MatchingLayerHeight,
    /// Slower on overhangs. Not implemented.
    MatchingOverhang,
}

impl FromStr for VelocityType {
    type Err = SlicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(Self::Constant),
            "per_layer" => Ok(Self::PerLayer),
            "matching_layer_height" => Ok(Self::MatchingLayerHeight),
            "matching_overhang" => Ok(Self::MatchingOverhang),
            other => Err(SlicerError::UnknownOption {
                kind: "velocity type",
                value: other.to_string(),
            }),
        }
    }
}

/// Velocity at which the deposited bead cross-section matches the filament
/// feed: `filament_area · motor_speed / path_area · multiplier`, where the
/// path area is `max(layer_height, min_bead_width) · layer_height`.
pub fn calculate_linear_velocity(layer_height: f64, settings: &VelocitySettings) -> f64 {
    let filament_area = PI * (settings.filament_diameter / 2.0).powi(2);
    let motor_speed = settings.motor_omega * settings.motor_radius;
    let path_area = layer_height.max(settings.min_bead_width) * layer_height;
    filament_area * motor_speed / path_area * settings.multiplier
}

/// Same velocity for every printpoint.
pub fn set_linear_velocity_constant(print: &mut OrganizedPrint, v: f64) {
    info!(v, "setting constant linear velocity");
    for p in print.points_mut() {
        p.velocity = Some(v);
    }
}

/// One velocity per layer, in layer order.
pub fn set_linear_velocity_per_layer(print: &mut OrganizedPrint, velocities: &[f64]) -> Result<()> {
    let layers = print.number_of_layers();
    if velocities.len() != layers {
        return Err(SlicerError::CountMismatch {
            what: "per-layer velocities",
            expected: layers,
            got: velocities.len(),
        });
    }
    info!(layers, "setting per-layer linear velocity");

    let mut ordinal = 0;
    let mut current = None;
    for (key, points) in print.paths_mut() {
        match current {
            Some(layer) if layer != key.layer => ordinal += 1,
            _ => {}
        }
        current = Some(key.layer);
        for p in points.iter_mut() {
            p.velocity = Some(velocities[ordinal]);
        }
    }
    Ok(())
}

/// Velocity matched to each printpoint's layer height.
pub fn set_linear_velocity_matching_layer_height(
    print: &mut OrganizedPrint,
    settings: &VelocitySettings,
) -> Result<()> {
    if let Some(p) = print.points().find(|p| p.layer_height <= 0.0) {
        return Err(SlicerError::InvalidSettings(format!(
            "printpoint at {:?} has non-positive layer height {}",
            p.point, p.layer_height
        )));
    }
    info!("setting linear velocity matching layer height");
    for p in print.points_mut() {
        p.velocity = Some(calculate_linear_velocity(p.layer_height, settings));
    }
    Ok(())
}

/// Remap a per-point parameter from `parameter_range` into
/// `velocity_range`, clamped when `bounded`.
pub fn set_linear_velocity_by_range<F>(
    print: &mut OrganizedPrint,
    param: F,
    parameter_range: (f64, f64),
    velocity_range: (f64, f64),
    bounded: bool,
) where
    F: Fn(&PrintPoint) -> f64,
{
    info!("setting linear velocity by parameter range");
    let map = if bounded { remap } else { remap_unbound };
    for p in print.points_mut() {
        let v = map(
            param(p),
            parameter_range.0,
            parameter_range.1,
            velocity_range.0,
            velocity_range.1,
        );
        p.velocity = Some(v);
    }
}

/// Assign velocities with the mode selected in `settings`.
pub fn set_linear_velocity(print: &mut OrganizedPrint, settings: &VelocitySettings) -> Result<()> {
    match settings.velocity_type {
        VelocityType::Constant => {
            set_linear_velocity_constant(print, settings.constant);
            Ok(())
        }
        VelocityType::PerLayer => {
            let velocities = settings.per_layer.as_deref().ok_or_else(|| {
                SlicerError::MissingParameter("per_layer velocities are required".into())
            })?;
            set_linear_velocity_per_layer(print, velocities)
        }
        VelocityType::MatchingLayerHeight => set_linear_velocity_matching_layer_height(print, settings),
        VelocityType::MatchingOverhang => Err(SlicerError::NotImplemented(
            "overhang-matching velocity".into(),
        )),
    }
}
