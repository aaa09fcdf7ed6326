//! Iso-contour tracing over a per-vertex scalar field.
//!
//! The tracer works on the mesh edge graph: an edge is crossed when exactly
//! one of its ends lies below the iso-value. A vertex exactly on the level
//! counts as above it, so a level through a ring of vertices is crossed only
//! by the band of faces underneath and yields a single loop. Crossing points are chained face by face, each face connecting the
//! two crossed edges on its boundary, until the chain returns to its first
//! edge (a closed path) or runs off the mesh boundary (an open path).

use rayon::prelude::*;
use stratum_math::{Point3, Tolerance};
use stratum_mesh::{EdgeId, FaceId, SurfaceMesh};
use tracing::{debug, warn};

use crate::error::{Result, SlicerError};
use crate::geometry::Path;

/// Name of the vertex attribute holding the working scalar field.
pub const SCALAR_FIELD: &str = "scalar_field";

/// Extracts the level set of a scalar field as paths.
pub trait ContourKernel: Send + Sync {
    /// Paths where `field` crosses `iso`. `field` has one value per vertex.
    fn contours(&self, mesh: &SurfaceMesh, field: &[f64], iso: f64) -> Result<Vec<Path>>;
}

/// Built-in contour kernel that walks crossed edges across adjacent faces.
#[derive(Debug, Clone, Copy)]
pub struct EdgeWalkTracer {
    /// Consecutive crossing points closer than this are merged.
    pub tolerance: Tolerance,
}

impl Default for EdgeWalkTracer {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::DEFAULT,
        }
    }
}

impl EdgeWalkTracer {
    /// Trace the level set of a named vertex attribute.
    pub fn trace_attribute(&self, mesh: &SurfaceMesh, name: &str, iso: f64) -> Result<Vec<Path>> {
        let field = mesh
            .vertex_attribute(name)
            .ok_or_else(|| SlicerError::MissingParameter(format!("vertex attribute '{name}'")))?;
        self.contours(mesh, field, iso)
    }
}

impl ContourKernel for EdgeWalkTracer {
    fn contours(&self, mesh: &SurfaceMesh, field: &[f64], iso: f64) -> Result<Vec<Path>> {
        if field.len() != mesh.num_vertices() {
            return Err(SlicerError::CountMismatch {
                what: "scalar field",
                expected: mesh.num_vertices(),
                got: field.len(),
            });
        }

        let on_level = field.iter().filter(|&&v| v == iso).count();
        if on_level > 0 {
            warn!(iso, vertices = on_level, "level passes through vertices");
        }

        let crossings = edge_crossings(mesh, field, iso);
        let passable = passable_faces(mesh, &crossings, iso);
        let mut visited = vec![false; mesh.num_edges()];
        let mut paths = Vec::new();

        for start in 0..mesh.num_edges() {
            if visited[start] || crossings[start].is_none() {
                continue;
            }
            let (chain, is_closed) = walk_chain(mesh, &crossings, &passable, &mut visited, start);
            if let Some(path) = self.finish_chain(chain, is_closed, iso) {
                paths.push(path);
            }
        }

        debug!(iso, paths = paths.len(), "traced contours");
        Ok(paths)
    }
}

impl EdgeWalkTracer {
    /// Merge coincident neighbors and drop chains too short to print.
    fn finish_chain(&self, chain: Vec<Point3>, is_closed: bool, iso: f64) -> Option<Path> {
        let mut points: Vec<Point3> = Vec::with_capacity(chain.len());
        for p in chain {
            if points
                .last()
                .map_or(true, |last| !self.tolerance.points_equal(last, &p))
            {
                points.push(p);
            }
        }
        if is_closed && points.len() > 1 {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                if self.tolerance.points_equal(first, last) {
                    points.pop();
                }
            }
        }

        let min_len = if is_closed { 3 } else { 2 };
        if points.len() < min_len {
            warn!(iso, points = points.len(), is_closed, "dropped degenerate chain");
            return None;
        }
        Some(Path::new(points, is_closed))
    }
}

/// Trace several iso-values in parallel. Output order follows `isos`.
pub fn trace_many(
    kernel: &dyn ContourKernel,
    mesh: &SurfaceMesh,
    field: &[f64],
    isos: &[f64],
) -> Result<Vec<Vec<Path>>> {
    isos.par_iter()
        .map(|&iso| kernel.contours(mesh, field, iso))
        .collect()
}

/// Crossing point of every edge, `None` where the field does not cross.
/// An end exactly on the level is on the upper side.
fn edge_crossings(mesh: &SurfaceMesh, field: &[f64], iso: f64) -> Vec<Option<Point3>> {
    (0..mesh.num_edges())
        .map(|e| {
            let [u, v] = mesh.edge(e);
            let du = field[u] - iso;
            let dv = field[v] - iso;
            if (du < 0.0) == (dv < 0.0) {
                return None;
            }
            let t = du.abs() / (du.abs() + dv.abs());
            let pu = mesh.position(u);
            Some(pu + (mesh.position(v) - pu) * t)
        })
        .collect()
}

/// Faces that connect exactly two crossed edges.
fn passable_faces(mesh: &SurfaceMesh, crossings: &[Option<Point3>], iso: f64) -> Vec<bool> {
    let mut ambiguous = 0usize;
    let passable = (0..mesh.num_faces())
        .map(|f| {
            let count = mesh
                .face_edges(f)
                .iter()
                .filter(|&&e| crossings[e].is_some())
                .count();
            if count > 2 {
                ambiguous += 1;
            }
            count == 2
        })
        .collect();
    if ambiguous > 0 {
        warn!(iso, faces = ambiguous, "skipped faces crossed on all three edges");
    }
    passable
}

/// The other crossed edge of a passable face.
fn exit_edge(
    mesh: &SurfaceMesh,
    crossings: &[Option<Point3>],
    face: FaceId,
    entry: EdgeId,
) -> Option<EdgeId> {
    mesh.face_edges(face)
        .into_iter()
        .find(|&e| e != entry && crossings[e].is_some())
}

fn other_face(mesh: &SurfaceMesh, edge: EdgeId, face: FaceId) -> Option<FaceId> {
    match mesh.edge_faces(edge) {
        [Some(a), b] if a == face => b,
        [a, _] => a,
    }
}

/// Walk from `start` through `face` until the chain closes, hits the
/// boundary, or reaches an impassable face.
///
/// Returns the crossing points after `start` and whether the walk came back
/// to `start`.
fn walk(
    mesh: &SurfaceMesh,
    crossings: &[Option<Point3>],
    passable: &[bool],
    visited: &mut [bool],
    start: EdgeId,
    mut face: Option<FaceId>,
) -> (Vec<Point3>, bool) {
    let mut points = Vec::new();
    let mut edge = start;
    while let Some(f) = face {
        if !passable[f] {
            break;
        }
        let Some(next) = exit_edge(mesh, crossings, f, edge) else {
            break;
        };
        if next == start {
            return (points, true);
        }
        if visited[next] {
            break;
        }
        visited[next] = true;
        if let Some(p) = crossings[next] {
            points.push(p);
        }
        edge = next;
        face = other_face(mesh, next, f);
    }
    (points, false)
}

fn walk_chain(
    mesh: &SurfaceMesh,
    crossings: &[Option<Point3>],
    passable: &[bool],
    visited: &mut [bool],
    start: EdgeId,
) -> (Vec<Point3>, bool) {
    visited[start] = true;
    let [first_face, second_face] = mesh.edge_faces(start);
    let mut chain: Vec<Point3> = crossings[start].into_iter().collect();

    let (forward, closed) = walk(mesh, crossings, passable, visited, start, first_face);
    chain.extend(forward);
    if closed {
        return (chain, true);
    }

    let (mut backward, _) = walk(mesh, crossings, passable, visited, start, second_face);
    backward.reverse();
    backward.extend(chain);
    (backward, false)
}
