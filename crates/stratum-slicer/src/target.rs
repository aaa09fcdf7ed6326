//! Boundary targets for curved (interpolation) slicing.
//!
//! A [`CompoundTarget`] is a set of marked mesh vertices, split into
//! connected clusters, together with the distance from every vertex to each
//! cluster. Two targets, LOW and HIGH, are blended by
//! [`weighted_distances`] into the scalar field whose zero level set is one
//! curved layer.

use std::collections::VecDeque;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stratum_math::{blend_union_list, chamfer_union_list, remap_unbound, stairs_union_list};
use stratum_mesh::{SurfaceMesh, VertexId};
use tracing::{debug, info, warn};

use crate::error::{Result, SlicerError};
use crate::geodesics::GeodesicSolver;

/// How per-cluster distances are merged into one distance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum UnionMethod {
    /// Plain minimum.
    #[default]
    Min,
    /// Quadratic smooth minimum.
    Smooth {
        /// Blend radius.
        radius: f64,
    },
    /// Chamfered minimum.
    Chamfer {
        /// Chamfer size.
        radius: f64,
    },
    /// Stepped minimum.
    Stairs {
        /// Blend radius.
        radius: f64,
        /// Number of steps.
        steps: u32,
    },
}

impl UnionMethod {
    /// Merge `values`, folding left to right.
    pub fn combine(&self, values: &[f64]) -> f64 {
        match *self {
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Smooth { radius } => blend_union_list(values, radius),
            Self::Chamfer { radius } => chamfer_union_list(values, radius),
            Self::Stairs { radius, steps } => stairs_union_list(values, radius, steps),
        }
    }
}

/// Marked boundary vertices with per-cluster distance fields.
#[derive(Debug, Clone)]
pub struct CompoundTarget {
    clusters: Vec<Vec<VertexId>>,
    /// `distances[c][v]`: distance from vertex `v` to cluster `c`.
    distances: Vec<Vec<f64>>,
    union: UnionMethod,
    offset: f64,
    weight_max_per_cluster: Vec<f64>,
    max_dist: f64,
}

impl CompoundTarget {
    /// Target made of the vertices whose attribute `name` equals `value`.
    pub fn from_attribute(
        mesh: &SurfaceMesh,
        name: &str,
        value: f64,
        union: UnionMethod,
        solver: &dyn GeodesicSolver,
    ) -> Result<Self> {
        let column = mesh
            .vertex_attribute(name)
            .ok_or_else(|| SlicerError::MissingParameter(format!("vertex attribute '{name}'")))?;
        let vertices: Vec<VertexId> = column
            .iter()
            .enumerate()
            .filter(|(_, &x)| x == value)
            .map(|(v, _)| v)
            .collect();
        if vertices.is_empty() {
            return Err(SlicerError::MissingParameter(format!(
                "no vertices with '{name}' = {value}"
            )));
        }
        info!(attribute = name, value, "creating target");
        Self::from_vertices(mesh, &vertices, union, solver)
    }

    /// Target made of the given vertices.
    pub fn from_vertices(
        mesh: &SurfaceMesh,
        vertices: &[VertexId],
        union: UnionMethod,
        solver: &dyn GeodesicSolver,
    ) -> Result<Self> {
        if vertices.is_empty() {
            return Err(SlicerError::MissingParameter("target has no vertices".into()));
        }
        if let Some(&v) = vertices.iter().find(|&&v| v >= mesh.num_vertices()) {
            return Err(SlicerError::InvalidSettings(format!(
                "target vertex {v} is not a mesh vertex"
            )));
        }

        let clusters = connected_clusters(mesh, vertices);
        let distances = clusters
            .iter()
            .map(|cluster| solver.distances(mesh, cluster))
            .collect::<Result<Vec<_>>>()?;
        let max_dist = distances
            .iter()
            .flatten()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);

        debug!(clusters = clusters.len(), max_dist, "target distances computed");
        Ok(Self {
            clusters,
            distances,
            union,
            offset: 0.0,
            weight_max_per_cluster: Vec::new(),
            max_dist,
        })
    }

    /// Offset added to all but the farthest cluster by
    /// [`compute_uneven_weights`](Self::compute_uneven_weights).
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Number of connected clusters.
    pub fn number_of_boundaries(&self) -> usize {
        self.clusters.len()
    }

    /// Vertices of each cluster.
    pub fn clusters(&self) -> &[Vec<VertexId>] {
        &self.clusters
    }

    /// All target vertices, cluster by cluster.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.clusters.iter().flatten().copied()
    }

    /// Union method used to merge cluster distances.
    pub fn union(&self) -> UnionMethod {
        self.union
    }

    /// Distance from `v` to each cluster.
    pub fn cluster_distances(&self, v: VertexId) -> Vec<f64> {
        self.distances.iter().map(|d| d[v]).collect()
    }

    /// Distance from `v` to the target.
    pub fn distance(&self, v: VertexId) -> f64 {
        self.union.combine(&self.cluster_distances(v))
    }

    /// Distance from every vertex to the target.
    pub fn all_distances(&self) -> Vec<f64> {
        let n = self.distances.first().map_or(0, Vec::len);
        (0..n).into_par_iter().map(|v| self.distance(v)).collect()
    }

    /// Largest distance of any vertex to any cluster.
    pub fn max_dist(&self) -> f64 {
        self.max_dist
    }

    /// Per-cluster weight limits, empty unless uneven weights were computed.
    pub fn weight_max_per_cluster(&self) -> &[f64] {
        &self.weight_max_per_cluster
    }

    /// Whether uneven weights were computed.
    pub fn has_uneven_weights(&self) -> bool {
        !self.weight_max_per_cluster.is_empty()
    }

    /// Mean distance of `other`'s vertices from this target.
    pub fn avg_distance_from(&self, other: &CompoundTarget) -> f64 {
        let ds: Vec<f64> = other.vertices().map(|v| self.distance(v)).collect();
        if ds.is_empty() {
            return 0.0;
        }
        ds.iter().sum::<f64>() / ds.len() as f64
    }

    /// Median distance of each cluster's vertices from `other`.
    pub fn cluster_distances_from(&self, other: &CompoundTarget) -> Vec<f64> {
        self.clusters
            .iter()
            .map(|cluster| median(cluster.iter().map(|&v| other.distance(v)).collect()))
            .collect()
    }

    /// Weight each cluster by its distance from `other`, so clusters closer
    /// to `other` are reached earlier during interpolation.
    ///
    /// Does nothing for a single-cluster target.
    pub fn compute_uneven_weights(&mut self, other: &CompoundTarget) {
        if self.clusters.len() < 2 {
            info!("target has a single cluster, weights stay even");
            return;
        }
        let mut ds = self.cluster_distances_from(other);
        let max_param = ds.iter().copied().fold(f64::MIN, f64::max);
        if max_param <= 0.0 {
            warn!(max_param, "clusters are not separated from the other target, weights stay even");
            return;
        }
        for d in &mut ds {
            if (*d - max_param).abs() > 0.01 {
                *d += self.offset;
            }
        }
        self.weight_max_per_cluster = ds.iter().map(|d| d / max_param).collect();
        info!(weights = ?self.weight_max_per_cluster, "uneven cluster weights");
    }
}

/// Connected components of `vertices` over mesh edges, ordered by their
/// smallest vertex. Each component is sorted ascending.
fn connected_clusters(mesh: &SurfaceMesh, vertices: &[VertexId]) -> Vec<Vec<VertexId>> {
    let mut member = vec![false; mesh.num_vertices()];
    for &v in vertices {
        member[v] = true;
    }
    let mut seen = vec![false; mesh.num_vertices()];
    let mut sorted = vertices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut clusters = Vec::new();
    for start in sorted {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut cluster = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            cluster.push(v);
            for &n in mesh.vertex_neighbors(v) {
                if member[n] && !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
        cluster.sort_unstable();
        clusters.push(cluster);
    }
    clusters
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Blended distance of vertex `v` for interpolation parameter `t`.
///
/// With both targets and even weights this is `d_low·(1−t) − d_high·t`.
/// With uneven HIGH weights each cluster contributes
/// `(w−1)·d_low + w·d_high`, where `w` is `t` remapped from
/// `[0, weight_max]` to `[0, 1]`. The contributions are merged in cluster
/// order with the quadratic smooth minimum when the HIGH union is
/// [`UnionMethod::Smooth`], and with the plain minimum for every other
/// union. With only a LOW target the field is
/// `d_low − t·max_dist`.
pub fn weighted_distance(
    v: VertexId,
    t: f64,
    low: &CompoundTarget,
    high: Option<&CompoundTarget>,
) -> f64 {
    let d_low = low.distance(v);
    let Some(high) = high else {
        return d_low - t * low.max_dist();
    };
    if !high.has_uneven_weights() {
        return d_low * (1.0 - t) - high.distance(v) * t;
    }

    let contributions: Vec<f64> = high
        .cluster_distances(v)
        .iter()
        .zip(high.weight_max_per_cluster())
        .map(|(&d_high, &weight_max)| {
            let w = remap_unbound(t, 0.0, weight_max, 0.0, 1.0);
            (w - 1.0) * d_low + w * d_high
        })
        .collect();
    match high.union() {
        UnionMethod::Smooth { radius } => blend_union_list(&contributions, radius),
        _ => contributions.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

/// [`weighted_distance`] for every vertex.
pub fn weighted_distances(
    num_vertices: usize,
    t: f64,
    low: &CompoundTarget,
    high: Option<&CompoundTarget>,
) -> Vec<f64> {
    (0..num_vertices)
        .into_par_iter()
        .map(|v| weighted_distance(v, t, low, high))
        .collect()
}
