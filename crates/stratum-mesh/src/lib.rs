#![warn(missing_docs)]

//! Triangle mesh with explicit adjacency for the stratum slicer.
//!
//! [`SurfaceMesh`] stores vertex positions and triangle faces like a
//! tessellated mesh buffer, plus the indices the slicer walks during contour
//! tracing: one entry per undirected edge, the (up to two) faces of every
//! edge, and the three edges of every face. Named scalar attribute columns
//! can be attached to vertices and faces; the slicer only ever writes
//! attribute values, never topology.
//!
//! # Example
//!
//! ```
//! use stratum_mesh::SurfaceMesh;
//!
//! let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
//! let mesh = SurfaceMesh::from_buffers(&vertices, &[0, 1, 2]).unwrap();
//! assert_eq!(mesh.num_edges(), 3);
//! assert!(!mesh.is_closed());
//! ```

pub mod error;

pub use error::{MeshError, Result};

use std::collections::{BTreeMap, HashMap};

use stratum_math::{Plane, Point3, Vec3};
use tracing::warn;

/// Index of a vertex.
pub type VertexId = usize;
/// Index of a triangle face.
pub type FaceId = usize;
/// Index of an undirected edge.
pub type EdgeId = usize;

/// Triangle mesh with edge/face adjacency and attribute columns.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    positions: Vec<Point3>,
    faces: Vec<[VertexId; 3]>,
    /// Undirected edges, endpoints sorted ascending.
    edges: Vec<[VertexId; 2]>,
    edge_faces: Vec<[Option<FaceId>; 2]>,
    /// `face_edges[f][k]` joins `faces[f][k]` and `faces[f][(k + 1) % 3]`.
    face_edges: Vec<[EdgeId; 3]>,
    neighbors: Vec<Vec<VertexId>>,
    vertex_attributes: BTreeMap<String, Vec<f64>>,
    face_attributes: BTreeMap<String, Vec<f64>>,
}

impl SurfaceMesh {
    /// Build a mesh from positions and vertex-index triples.
    pub fn new(positions: Vec<Point3>, faces: Vec<[VertexId; 3]>) -> Result<Self> {
        if positions.is_empty() || faces.is_empty() {
            return Err(MeshError::Empty);
        }
        for (f, face) in faces.iter().enumerate() {
            for &index in face {
                if index >= positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        face: f,
                        index,
                        count: positions.len(),
                    });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::DegenerateFace(f));
            }
        }

        let mut lookup: HashMap<[VertexId; 2], EdgeId> = HashMap::new();
        let mut edges: Vec<[VertexId; 2]> = Vec::new();
        let mut edge_faces: Vec<[Option<FaceId>; 2]> = Vec::new();
        let mut face_edges: Vec<[EdgeId; 3]> = Vec::with_capacity(faces.len());
        let mut neighbors: Vec<Vec<VertexId>> = vec![Vec::new(); positions.len()];

        for (f, face) in faces.iter().enumerate() {
            let mut ids = [0; 3];
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                let key = if a < b { [a, b] } else { [b, a] };
                let e = *lookup.entry(key).or_insert_with(|| {
                    edges.push(key);
                    edge_faces.push([None, None]);
                    neighbors[a].push(b);
                    neighbors[b].push(a);
                    edges.len() - 1
                });
                match edge_faces[e] {
                    [None, _] => edge_faces[e][0] = Some(f),
                    [Some(_), None] => edge_faces[e][1] = Some(f),
                    [Some(_), Some(_)] => {
                        warn!(edge = e, face = f, "non-manifold edge, extra face ignored");
                    }
                }
                ids[k] = e;
            }
            face_edges.push(ids);
        }

        Ok(Self {
            positions,
            faces,
            edges,
            edge_faces,
            face_edges,
            neighbors,
            vertex_attributes: BTreeMap::new(),
            face_attributes: BTreeMap::new(),
        })
    }

    /// Build a mesh from flat buffers: `[x0, y0, z0, x1, ...]` and
    /// `[i0, i1, i2, ...]`, the layout produced by a mesh tessellator.
    pub fn from_buffers(vertices: &[f32], indices: &[u32]) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(MeshError::MalformedBuffer(format!(
                "vertex buffer length {} is not a multiple of 3",
                vertices.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::MalformedBuffer(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        let positions = vertices
            .chunks_exact(3)
            .map(|c| Point3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2])))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
            .collect();
        Self::new(positions, faces)
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Position of vertex `v`.
    pub fn position(&self, v: VertexId) -> Point3 {
        self.positions[v]
    }

    /// All vertex positions.
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Vertex triple of face `f`.
    pub fn face(&self, f: FaceId) -> [VertexId; 3] {
        self.faces[f]
    }

    /// All faces.
    pub fn faces(&self) -> &[[VertexId; 3]] {
        &self.faces
    }

    /// Endpoints of edge `e` (ascending).
    pub fn edge(&self, e: EdgeId) -> [VertexId; 2] {
        self.edges[e]
    }

    /// Faces on either side of edge `e`. The second slot is `None` on a
    /// boundary edge.
    pub fn edge_faces(&self, e: EdgeId) -> [Option<FaceId>; 2] {
        self.edge_faces[e]
    }

    /// The three edges of face `f`.
    pub fn face_edges(&self, f: FaceId) -> [EdgeId; 3] {
        self.face_edges[f]
    }

    /// Edge joining `a` and `b`, if there is one.
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let key = if a < b { [a, b] } else { [b, a] };
        self.edges.iter().position(|&e| e == key)
    }

    /// Vertices sharing an edge with `v`.
    pub fn vertex_neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.neighbors[v]
    }

    /// True if edge `e` has only one adjacent face.
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.edge_faces[e][1].is_none()
    }

    /// True if the mesh has no boundary edges.
    pub fn is_closed(&self) -> bool {
        (0..self.edges.len()).all(|e| !self.is_boundary_edge(e))
    }

    /// Corner positions of face `f`.
    pub fn face_points(&self, f: FaceId) -> [Point3; 3] {
        let [a, b, c] = self.faces[f];
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Centroid of face `f`.
    pub fn face_centroid(&self, f: FaceId) -> Point3 {
        let [a, b, c] = self.face_points(f);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Unnormalized face normal; its length is twice the face area.
    fn face_cross(&self, f: FaceId) -> Vec3 {
        let [a, b, c] = self.face_points(f);
        (b - a).cross(&(c - a))
    }

    /// Unit normal of face `f` (zero for a sliver face).
    pub fn face_normal(&self, f: FaceId) -> Vec3 {
        let n = self.face_cross(f);
        let len = n.norm();
        if len < f64::EPSILON {
            Vec3::zeros()
        } else {
            n / len
        }
    }

    /// Area of face `f`.
    pub fn face_area(&self, f: FaceId) -> f64 {
        self.face_cross(f).norm() * 0.5
    }

    /// Plane through the centroid of face `f`, or `None` for a sliver face.
    pub fn face_plane(&self, f: FaceId) -> Option<Plane> {
        Plane::new(self.face_centroid(f), self.face_cross(f))
    }

    /// Area-weighted vertex normal.
    pub fn vertex_normal(&self, v: VertexId) -> Vec3 {
        let sum = self
            .faces
            .iter()
            .enumerate()
            .filter(|(_, face)| face.contains(&v))
            .fold(Vec3::zeros(), |acc, (f, _)| acc + self.face_cross(f));
        let len = sum.norm();
        if len < f64::EPSILON {
            Vec3::zeros()
        } else {
            sum / len
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Point3, Point3) {
        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        (min, max)
    }

    /// Z coordinate of every vertex, usable as an elevation scalar field.
    pub fn elevation(&self) -> Vec<f64> {
        self.positions.iter().map(|p| p.z).collect()
    }

    /// Install (or replace) a vertex attribute column.
    pub fn set_vertex_attribute(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        check_len(&name, self.positions.len(), values.len())?;
        self.vertex_attributes.insert(name, values);
        Ok(())
    }

    /// Vertex attribute column by name.
    pub fn vertex_attribute(&self, name: &str) -> Option<&[f64]> {
        self.vertex_attributes.get(name).map(Vec::as_slice)
    }

    /// Remove a vertex attribute column, returning it.
    pub fn remove_vertex_attribute(&mut self, name: &str) -> Option<Vec<f64>> {
        self.vertex_attributes.remove(name)
    }

    /// Vertex attribute columns in name order.
    pub fn vertex_attributes(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.vertex_attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Install (or replace) a face attribute column.
    pub fn set_face_attribute(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        check_len(&name, self.faces.len(), values.len())?;
        self.face_attributes.insert(name, values);
        Ok(())
    }

    /// Face attribute column by name.
    pub fn face_attribute(&self, name: &str) -> Option<&[f64]> {
        self.face_attributes.get(name).map(Vec::as_slice)
    }

    /// Face attribute columns in name order.
    pub fn face_attributes(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.face_attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn check_len(name: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(MeshError::AttributeLength {
            name: name.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_cube_mesh() -> SurfaceMesh {
        let size = 10.0f32;
        #[rustfmt::skip]
        let vertices = vec![
            0.0, 0.0, 0.0, size, 0.0, 0.0, size, size, 0.0, 0.0, size, 0.0,
            0.0, 0.0, size, size, 0.0, size, size, size, size, 0.0, size, size,
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2,
            4, 5, 6, 4, 6, 7,
            0, 1, 5, 0, 5, 4,
            2, 3, 7, 2, 7, 6,
            0, 4, 7, 0, 7, 3,
            1, 2, 6, 1, 6, 5,
        ];
        SurfaceMesh::from_buffers(&vertices, &indices).unwrap()
    }

    #[test]
    fn test_cube_topology() {
        let mesh = make_cube_mesh();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 12);
        // V - E + F = 2
        assert_eq!(mesh.num_edges(), 18);
        assert!(mesh.is_closed());
        for e in 0..mesh.num_edges() {
            let [f0, f1] = mesh.edge_faces(e);
            assert!(f0.is_some() && f1.is_some());
        }
    }

    #[test]
    fn test_face_edges_match_vertices() {
        let mesh = make_cube_mesh();
        for f in 0..mesh.num_faces() {
            let face = mesh.face(f);
            for (k, &e) in mesh.face_edges(f).iter().enumerate() {
                let [a, b] = mesh.edge(e);
                let (u, v) = (face[k], face[(k + 1) % 3]);
                assert!((a == u && b == v) || (a == v && b == u));
            }
        }
    }

    #[test]
    fn test_single_triangle_is_open() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mesh = SurfaceMesh::from_buffers(&vertices, &[0, 1, 2]).unwrap();
        assert!(!mesh.is_closed());
        assert!(mesh.is_boundary_edge(0));
        assert_relative_eq!(mesh.face_area(0), 0.5);
        assert_relative_eq!(mesh.face_normal(0).z, 1.0);
        assert_eq!(mesh.edge_between(2, 1), Some(mesh.face_edges(0)[1]));
    }

    #[test]
    fn test_invalid_input() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            SurfaceMesh::from_buffers(&vertices, &[0, 1, 5]),
            Err(MeshError::IndexOutOfRange { index: 5, .. })
        ));
        assert!(matches!(
            SurfaceMesh::from_buffers(&vertices, &[0, 1, 1]),
            Err(MeshError::DegenerateFace(0))
        ));
        assert!(matches!(
            SurfaceMesh::from_buffers(&vertices[..4], &[0, 1, 2]),
            Err(MeshError::MalformedBuffer(_))
        ));
        assert_eq!(SurfaceMesh::new(Vec::new(), Vec::new()).unwrap_err(), MeshError::Empty);
    }

    #[test]
    fn test_attributes() {
        let mut mesh = make_cube_mesh();
        mesh.set_vertex_attribute("temperature", vec![1.0; 8]).unwrap();
        assert_eq!(mesh.vertex_attribute("temperature").map(<[f64]>::len), Some(8));
        assert!(mesh.set_face_attribute("bad", vec![0.0; 3]).is_err());
        mesh.set_face_attribute("region", vec![2.0; 12]).unwrap();
        assert_eq!(mesh.face_attributes().count(), 1);
        assert!(mesh.remove_vertex_attribute("temperature").is_some());
        assert!(mesh.vertex_attribute("temperature").is_none());
    }

    #[test]
    fn test_bounds_and_normals() {
        let mesh = make_cube_mesh();
        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.z, 0.0);
        assert_relative_eq!(max.x, 10.0);
        let n = mesh.vertex_normal(6);
        // corner (10,10,10) points outward along the diagonal
        assert!(n.x > 0.0 && n.y > 0.0 && n.z > 0.0);
        assert_eq!(mesh.vertex_neighbors(0).len(), 6);
    }
}
