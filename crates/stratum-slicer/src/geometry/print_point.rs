use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratum_math::{Point3, Vec3};

/// Position of a path in organized print data: horizontal layer (or
/// vertical segment) index and path index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PathKey {
    /// Layer or segment index.
    pub layer: usize,
    /// Path index within the layer.
    pub path: usize,
}

impl PathKey {
    /// Create a key.
    pub fn new(layer: usize, path: usize) -> Self {
        Self { layer, path }
    }
}

/// Local coordinate frame of a printpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame origin (the printpoint position).
    pub origin: Point3,
    /// Unit x axis.
    pub x_axis: Vec3,
    /// Unit y axis.
    pub y_axis: Vec3,
}

impl Frame {
    /// Unit z axis, `x × y`.
    pub fn z_axis(&self) -> Vec3 {
        self.x_axis.cross(&self.y_axis)
    }
}

/// A single fabrication point with its derived attributes.
///
/// `extruder_toggle` and `velocity` start unset and must be assigned before
/// the point leaves the organizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintPoint {
    /// Position.
    pub point: Point3,
    /// Local layer height at this point.
    pub layer_height: f64,
    /// Normal of the closest mesh face.
    pub mesh_normal: Vec3,
    /// Tool up direction.
    pub up_vector: Vec3,
    /// Whether material is deposited while moving to this point.
    pub extruder_toggle: Option<bool>,
    /// Travel velocity.
    pub velocity: Option<f64>,
    /// Corner blend radius; 0 means a full stop.
    #[serde(default)]
    pub blend_radius: f64,
    /// Dwell time at this point.
    #[serde(default)]
    pub wait_time: f64,
    /// Scalars transferred from the mesh.
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    /// The path this point was generated from.
    #[serde(skip)]
    pub parent: PathKey,
}

impl PrintPoint {
    /// Create a point with a vertical up vector and no derived attributes.
    pub fn new(point: Point3, layer_height: f64, mesh_normal: Vec3, parent: PathKey) -> Self {
        Self {
            point,
            layer_height,
            mesh_normal,
            up_vector: Vec3::z(),
            extruder_toggle: None,
            velocity: None,
            blend_radius: 0.0,
            wait_time: 0.0,
            attributes: BTreeMap::new(),
            parent,
        }
    }

    /// Frame with the x axis `up × normal` and the y axis along the mesh
    /// normal. Falls back to the world XY frame when the up vector and
    /// normal are parallel.
    pub fn frame(&self) -> Frame {
        let world = Frame {
            origin: self.point,
            x_axis: Vec3::x(),
            y_axis: Vec3::y(),
        };
        let x = self.up_vector.cross(&self.mesh_normal);
        let normal_len = self.mesh_normal.norm();
        if x.norm() < 1e-9 || normal_len < 1e-9 {
            return world;
        }
        Frame {
            origin: self.point,
            x_axis: x.normalize(),
            y_axis: self.mesh_normal / normal_len,
        }
    }

    /// Distance to another printpoint.
    pub fn distance(&self, other: &PrintPoint) -> f64 {
        (self.point - other.point).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_axes_are_orthonormal() {
        let mut pp = PrintPoint::new(
            Point3::new(1.0, 2.0, 3.0),
            0.5,
            Vec3::new(1.0, 0.0, 0.2),
            PathKey::default(),
        );
        pp.up_vector = Vec3::z();
        let frame = pp.frame();
        assert_relative_eq!(frame.x_axis.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.y_axis.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.x_axis.dot(&frame.y_axis), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.z_axis().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_falls_back_when_parallel() {
        let pp = PrintPoint::new(Point3::origin(), 0.5, Vec3::z(), PathKey::default());
        let frame = pp.frame();
        assert_eq!(frame.x_axis, Vec3::x());
        assert_eq!(frame.y_axis, Vec3::y());
    }

    #[test]
    fn test_new_point_has_unset_toggle_and_velocity() {
        let pp = PrintPoint::new(Point3::origin(), 1.0, Vec3::x(), PathKey::new(2, 3));
        assert!(pp.extruder_toggle.is_none());
        assert!(pp.velocity.is_none());
        assert_eq!(pp.parent, PathKey::new(2, 3));
    }
}
