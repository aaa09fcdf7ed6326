//! Pipeline settings.
//!
//! [`PrintSettings`] groups the parameters of every stage. All fields have
//! defaults, so a settings file only needs to name what it changes:
//!
//! ```
//! use stratum_slicer::PrintSettings;
//!
//! let settings = PrintSettings::from_toml_str(
//!     r#"
//!     [slicing]
//!     layer_height = 0.5
//!
//!     [sort]
//!     method = "per_segment"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(settings.slicing.layer_height, 0.5);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};
use crate::geodesics::GeodesicsMethod;
use crate::organize::VelocityType;
use crate::seams::SeamOrientation;
use crate::sort::SortMethod;
use crate::target::UnionMethod;

/// Settings for the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintSettings {
    /// Contour extraction and grouping.
    pub slicing: SlicingSettings,
    /// Boundary targets for curved slicing.
    pub targets: TargetSettings,
    /// Polyline simplification.
    pub simplify: SimplifySettings,
    /// Path ordering.
    pub sort: SortSettings,
    /// Seam placement.
    pub seams: SeamSettings,
    /// Printpoint derivation.
    pub organization: OrganizationSettings,
    /// Velocity assignment.
    pub velocity: VelocitySettings,
}

impl PrintSettings {
    /// Parse settings from a TOML document and validate them.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SlicerError::InvalidSettings(format!("cannot serialize settings: {e}")))
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        self.slicing.validate()?;
        self.targets.validate()?;
        self.simplify.validate()?;
        self.sort.validate()?;
        self.organization.validate()?;
        self.velocity.validate()
    }
}

/// Contour extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingSettings {
    /// Distance between planar layers.
    pub layer_height: f64,
    /// Target distance between curved layers.
    pub avg_layer_height: f64,
    /// Lower clamp for measured curved layer heights.
    pub min_layer_height: f64,
    /// Upper clamp for measured curved layer heights.
    pub max_layer_height: f64,
    /// Number of iso-curves for scalar-field slicing.
    pub no_of_isocurves: usize,
    /// Maximum distance between successive path centroids in one segment.
    pub vertical_layers_max_centroid_dist: f64,
    /// Maximum number of paths per segment (unbounded if unset).
    pub max_paths_per_segment: Option<usize>,
    /// Optional `(start, end)` z range for planar slicing, relative to the
    /// bottom of the mesh.
    pub slice_height_range: Option<(f64, f64)>,
}

impl Default for SlicingSettings {
    fn default() -> Self {
        Self {
            layer_height: 2.0,
            avg_layer_height: 5.0,
            min_layer_height: 0.5,
            max_layer_height: 10.0,
            no_of_isocurves: 10,
            vertical_layers_max_centroid_dist: 25.0,
            max_paths_per_segment: None,
            slice_height_range: None,
        }
    }
}

impl SlicingSettings {
    fn validate(&self) -> Result<()> {
        if self.layer_height <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "layer_height must be positive".into(),
            ));
        }
        if self.avg_layer_height <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "avg_layer_height must be positive".into(),
            ));
        }
        if self.min_layer_height <= 0.0 || self.min_layer_height > self.max_layer_height {
            return Err(SlicerError::InvalidSettings(
                "layer height bounds must satisfy 0 < min <= max".into(),
            ));
        }
        if self.vertical_layers_max_centroid_dist <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "vertical_layers_max_centroid_dist must be positive".into(),
            ));
        }
        if self.max_paths_per_segment == Some(0) {
            return Err(SlicerError::InvalidSettings(
                "max_paths_per_segment must be at least 1".into(),
            ));
        }
        if let Some((start, end)) = self.slice_height_range {
            if end < start {
                return Err(SlicerError::InvalidSettings(
                    "slice_height_range end is below its start".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Boundary target parameters for interpolation slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    /// Distance solver for the LOW target.
    pub low_geodesics: GeodesicsMethod,
    /// Distance solver for the HIGH target.
    pub high_geodesics: GeodesicsMethod,
    /// How the HIGH target's clusters are combined.
    pub high_union: UnionMethod,
    /// Weight the HIGH clusters by their distance to LOW.
    pub uneven_weights: bool,
    /// Offset added to all but the farthest cluster when weighting.
    pub uneven_upper_targets_offset: f64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            low_geodesics: GeodesicsMethod::EdgeGraph,
            high_geodesics: GeodesicsMethod::EdgeGraph,
            high_union: UnionMethod::Min,
            uneven_weights: false,
            uneven_upper_targets_offset: 0.0,
        }
    }
}

impl TargetSettings {
    fn validate(&self) -> Result<()> {
        match self.high_union {
            UnionMethod::Min => Ok(()),
            UnionMethod::Smooth { radius } | UnionMethod::Chamfer { radius } if radius > 0.0 => {
                Ok(())
            }
            UnionMethod::Stairs { radius, steps } if radius > 0.0 && steps > 0 => Ok(()),
            _ => Err(SlicerError::InvalidSettings(
                "union radius and step count must be positive".into(),
            )),
        }
    }
}

/// Polyline simplification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifySettings {
    /// Run simplification.
    pub enabled: bool,
    /// Maximum deviation from the original polyline.
    pub threshold: f64,
}

impl Default for SimplifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.25,
        }
    }
}

impl SimplifySettings {
    fn validate(&self) -> Result<()> {
        if self.threshold < 0.0 {
            return Err(SlicerError::InvalidSettings(
                "simplify threshold must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Path ordering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    /// Ordering strategy.
    pub method: SortMethod,
    /// Generations without improvement before the tour search stops.
    pub max_attempts: usize,
    /// Hard cap on tour search generations.
    pub max_iterations: usize,
    /// Tour search population size.
    pub population_size: usize,
    /// Probability of mutating a child tour.
    pub mutation_probability: f64,
    /// Random seed for the tour search.
    pub seed: u64,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            method: SortMethod::ShortestPath,
            max_attempts: 10,
            max_iterations: 1000,
            population_size: 200,
            mutation_probability: 0.1,
            seed: 0,
        }
    }
}

impl SortSettings {
    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(SlicerError::InvalidSettings(
                "population_size must be at least 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(SlicerError::InvalidSettings(
                "mutation_probability must be between 0 and 1".into(),
            ));
        }
        if self.max_attempts == 0 || self.max_iterations == 0 {
            return Err(SlicerError::InvalidSettings(
                "tour search budget must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Seam placement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamSettings {
    /// Reference used to place each path's seam.
    pub orientation: SeamOrientation,
    /// Reverse paths whose direction disagrees with the previous path.
    pub unify_orientation: bool,
}

impl Default for SeamSettings {
    fn default() -> Self {
        Self {
            orientation: SeamOrientation::NextPath,
            unify_orientation: false,
        }
    }
}

/// Printpoint derivation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSettings {
    /// Largest allowed blend radius.
    pub d_fillet: f64,
    /// Fraction of the neighbor distance a blend may use.
    pub blend_buffer: f64,
    /// Corners with an angle below this (radians) become full stops.
    pub corner_angle_threshold: f64,
    /// Dwell time at sharp corners.
    pub corner_wait_time: f64,
    /// Height of z-hop safety points.
    pub z_hop: f64,
    /// Insert z-hop safety points around travel moves.
    pub add_safety_points: bool,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            d_fillet: 10.0,
            blend_buffer: 0.3,
            corner_angle_threshold: 0.4 * PI,
            corner_wait_time: 0.3,
            z_hop: 10.0,
            add_safety_points: true,
        }
    }
}

impl OrganizationSettings {
    fn validate(&self) -> Result<()> {
        if self.d_fillet < 0.0 || self.blend_buffer < 0.0 {
            return Err(SlicerError::InvalidSettings(
                "blend parameters must not be negative".into(),
            ));
        }
        if self.corner_wait_time < 0.0 {
            return Err(SlicerError::InvalidSettings(
                "corner_wait_time must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Velocity parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocitySettings {
    /// Assignment mode.
    pub velocity_type: VelocityType,
    /// Velocity for constant mode.
    pub constant: f64,
    /// One velocity per layer for per-layer mode.
    pub per_layer: Option<Vec<f64>>,
    /// Extruder motor angular speed (rad/s).
    pub motor_omega: f64,
    /// Extruder motor drive radius.
    pub motor_radius: f64,
    /// Filament diameter.
    pub filament_diameter: f64,
    /// Narrowest bead the nozzle lays down.
    pub min_bead_width: f64,
    /// Flow tuning multiplier.
    pub multiplier: f64,
}

impl Default for VelocitySettings {
    fn default() -> Self {
        Self {
            velocity_type: VelocityType::Constant,
            constant: 25.0,
            per_layer: None,
            motor_omega: 2.0 * PI,
            motor_radius: 4.0,
            filament_diameter: 2.75,
            min_bead_width: 0.4,
            multiplier: 0.25,
        }
    }
}

impl VelocitySettings {
    fn validate(&self) -> Result<()> {
        if self.constant <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "constant velocity must be positive".into(),
            ));
        }
        if self.filament_diameter <= 0.0 || self.min_bead_width <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "filament_diameter and min_bead_width must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PrintSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.slicing.avg_layer_height, 5.0);
        assert_eq!(settings.sort.population_size, 200);
        assert_eq!(settings.organization.d_fillet, 10.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = PrintSettings::from_toml_str(
            r#"
            [velocity]
            velocity_type = "per_layer"
            per_layer = [10.0, 20.0]

            [seams]
            orientation = "next_contour"

            [targets]
            high_union = { method = "smooth", radius = 5.0 }
            "#,
        )
        .unwrap();
        assert_eq!(settings.velocity.velocity_type, VelocityType::PerLayer);
        assert_eq!(settings.velocity.per_layer, Some(vec![10.0, 20.0]));
        assert_eq!(settings.seams.orientation, SeamOrientation::NextContour);
        assert_eq!(settings.targets.high_union, UnionMethod::Smooth { radius: 5.0 });
        assert_eq!(settings.slicing.layer_height, 2.0);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = PrintSettings::from_toml_str(
            r#"
            [sort]
            method = "random"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SlicerError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = PrintSettings::default();
        settings.slicing.layer_height = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(SlicerError::InvalidSettings(_))
        ));

        let mut settings = PrintSettings::default();
        settings.targets.high_union = UnionMethod::Stairs {
            radius: 2.0,
            steps: 0,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = PrintSettings::default();
        settings.sort.seed = 42;
        settings.slicing.max_paths_per_segment = Some(4);
        let text = settings.to_toml_string().unwrap();
        assert_eq!(PrintSettings::from_toml_str(&text).unwrap(), settings);
    }
}
