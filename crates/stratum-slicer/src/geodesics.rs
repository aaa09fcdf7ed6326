//! Distance fields over the mesh surface.
//!
//! Curved slicing needs the distance from every vertex to a set of boundary
//! vertices. [`EdgeGraphGeodesics`] approximates it with shortest paths along
//! mesh edges; exact or heat-method solvers can be plugged in through
//! [`GeodesicSolver`].

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use stratum_mesh::{SurfaceMesh, VertexId};
use tracing::{debug, warn};

use crate::error::{Result, SlicerError};

/// Computes per-vertex distances to a set of source vertices.
pub trait GeodesicSolver: Send + Sync {
    /// Distance from every vertex to the nearest vertex in `sources`.
    fn distances(&self, mesh: &SurfaceMesh, sources: &[VertexId]) -> Result<Vec<f64>>;
}

/// Which solver computes a target's distance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeodesicsMethod {
    /// Shortest paths along mesh edges.
    #[default]
    EdgeGraph,
    /// A caller-supplied solver.
    External,
}

impl GeodesicsMethod {
    /// Pick the solver for this method. `External` requires `external`.
    pub fn solver<'a>(
        self,
        external: Option<&'a dyn GeodesicSolver>,
    ) -> Result<&'a dyn GeodesicSolver> {
        match self {
            Self::EdgeGraph => Ok(&EdgeGraphGeodesics),
            Self::External => {
                external.ok_or_else(|| SlicerError::NotInstalled("external geodesic solver".into()))
            }
        }
    }
}

/// Multi-source Dijkstra over the mesh edge graph, weighted by edge length.
///
/// Vertices not connected to any source get `f64::INFINITY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeGraphGeodesics;

impl GeodesicSolver for EdgeGraphGeodesics {
    fn distances(&self, mesh: &SurfaceMesh, sources: &[VertexId]) -> Result<Vec<f64>> {
        if sources.is_empty() {
            return Err(SlicerError::MissingParameter(
                "geodesic sources are empty".into(),
            ));
        }

        let mut dist = vec![f64::INFINITY; mesh.num_vertices()];
        let mut heap = BinaryHeap::new();
        for &s in sources {
            if s >= dist.len() {
                return Err(SlicerError::InvalidSettings(format!(
                    "geodesic source {s} is not a mesh vertex"
                )));
            }
            dist[s] = 0.0;
            heap.push(Reverse((OrderedFloat(0.0), s)));
        }

        while let Some(Reverse((OrderedFloat(d), v))) = heap.pop() {
            if d > dist[v] {
                continue;
            }
            let p = mesh.position(v);
            for &n in mesh.vertex_neighbors(v) {
                let nd = d + (mesh.position(n) - p).norm();
                if nd < dist[n] {
                    dist[n] = nd;
                    heap.push(Reverse((OrderedFloat(nd), n)));
                }
            }
        }

        let unreachable = dist.iter().filter(|d| d.is_infinite()).count();
        if unreachable > 0 {
            warn!(unreachable, "vertices are not connected to any geodesic source");
        }
        debug!(sources = sources.len(), "edge graph geodesics computed");
        Ok(dist)
    }
}
