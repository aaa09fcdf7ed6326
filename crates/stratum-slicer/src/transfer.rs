//! Mesh attribute transfer onto arbitrary points.
//!
//! A point is projected onto the plane of the face with the nearest
//! centroid. Vertex attributes are interpolated with the barycentric
//! coordinates of the projection and face attributes are copied, replacing
//! vertex attributes of the same name.

use std::collections::BTreeMap;

use stratum_math::{barycentric, Point3};
use stratum_mesh::{FaceId, SurfaceMesh};
use tracing::info;

use crate::contour::SCALAR_FIELD;
use crate::organize::OrganizedPrint;

/// Attribute names that describe geometry or slicer state and are never
/// transferred.
pub const RESERVED_ATTRIBUTES: [&str; 5] = ["x", "y", "z", "uv", SCALAR_FIELD];

/// Whether `name` is a reserved attribute name.
pub fn is_reserved_attribute(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name)
}

/// Attribute lookup over a mesh with precomputed face centroids.
#[derive(Debug)]
pub struct AttributeTransfer<'a> {
    mesh: &'a SurfaceMesh,
    centroids: Vec<Point3>,
}

impl<'a> AttributeTransfer<'a> {
    /// Prepare lookups on `mesh`.
    pub fn new(mesh: &'a SurfaceMesh) -> Self {
        let centroids = (0..mesh.num_faces()).map(|f| mesh.face_centroid(f)).collect();
        Self { mesh, centroids }
    }

    /// Face whose centroid is closest to `point`.
    pub fn closest_face(&self, point: &Point3) -> Option<FaceId> {
        self.centroids
            .iter()
            .map(|c| (c - point).norm_squared())
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f)
    }

    /// Interpolated attributes at `point`. Empty when the mesh has no faces
    /// or no transferable attributes.
    pub fn attributes_at(&self, point: &Point3) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        let Some(face) = self.closest_face(point) else {
            return out;
        };

        let projected = self
            .mesh
            .face_plane(face)
            .map_or(*point, |plane| plane.project(point));
        let [a, b, c] = self.mesh.face_points(face);
        let weights = barycentric(&projected, &a, &b, &c);
        let vertices = self.mesh.face(face);

        for (name, values) in self.mesh.vertex_attributes() {
            if is_reserved_attribute(name) {
                continue;
            }
            let value: f64 = vertices
                .iter()
                .zip(weights)
                .map(|(&v, w)| w * values[v])
                .sum();
            out.insert(name.to_string(), value);
        }
        for (name, values) in self.mesh.face_attributes() {
            if !is_reserved_attribute(name) {
                out.insert(name.to_string(), values[face]);
            }
        }
        out
    }
}

/// Interpolated mesh attributes at a single point.
pub fn transfer_mesh_attributes_to_point(mesh: &SurfaceMesh, point: &Point3) -> BTreeMap<String, f64> {
    AttributeTransfer::new(mesh).attributes_at(point)
}

/// Transfer mesh attributes onto every printpoint in parallel. Existing
/// entries with the same names are replaced.
pub fn transfer_mesh_attributes(print: &mut OrganizedPrint, mesh: &SurfaceMesh) {
    info!(points = print.number_of_points(), "transferring mesh attributes");
    let lookup = AttributeTransfer::new(mesh);
    print.par_for_each_point(|p| {
        let attrs = lookup.attributes_at(&p.point);
        p.attributes.extend(attrs);
    });
}

/// Whether `mesh` carries any attribute that would be transferred.
pub fn has_transferable_attributes(mesh: &SurfaceMesh) -> bool {
    mesh.vertex_attributes()
        .chain(mesh.face_attributes())
        .any(|(name, _)| !is_reserved_attribute(name))
}
