//! Slicers: turn a mesh and a scalar field into layers of paths.
//!
//! - [`PlanarSlicer`] cuts at evenly spaced heights and yields horizontal
//!   [`Layer`]s.
//! - [`ScalarFieldSlicer`] traces evenly spaced levels of a user field and
//!   groups the contours into vertical [`Segment`]s.
//! - [`InterpolationSlicer`] blends the distance fields of two boundary
//!   targets and traces the zero level of each blend, also into segments.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stratum_mesh::SurfaceMesh;
use tracing::{info, warn};

use crate::config::SlicingSettings;
use crate::contour::{trace_many, ContourKernel, EdgeWalkTracer, SCALAR_FIELD};
use crate::error::{Result, SlicerError};
use crate::geometry::{Layer, Path, Segment, VerticalLayersManager};
use crate::target::{weighted_distances, CompoundTarget};

/// Output of a slicer. The variant fixes the grouping mode for every later
/// stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer_type", content = "layers", rename_all = "snake_case")]
pub enum SliceResult {
    /// One layer per height band.
    Horizontal(Vec<Layer>),
    /// Vertically continuous segments.
    Vertical(Vec<Segment>),
}

impl SliceResult {
    /// Number of layers or segments.
    pub fn len(&self) -> usize {
        match self {
            Self::Horizontal(layers) => layers.len(),
            Self::Vertical(segments) => segments.len(),
        }
    }

    /// Check if there are no layers or segments.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is a horizontal (layered) result.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Horizontal(_))
    }

    /// Paths of each layer or segment, in order.
    pub fn groups(&self) -> Vec<&[Path]> {
        match self {
            Self::Horizontal(layers) => layers.iter().map(|l| l.paths.as_slice()).collect(),
            Self::Vertical(segments) => segments.iter().map(Segment::paths).collect(),
        }
    }

    /// Total number of paths.
    pub fn num_paths(&self) -> usize {
        self.groups().iter().map(|g| g.len()).sum()
    }

    /// Visit each group's paths mutably, in order.
    pub fn for_each_group_mut(&mut self, mut f: impl FnMut(usize, &mut Vec<Path>)) {
        match self {
            Self::Horizontal(layers) => {
                for (i, layer) in layers.iter_mut().enumerate() {
                    f(i, &mut layer.paths);
                }
            }
            Self::Vertical(segments) => {
                for (i, segment) in segments.iter_mut().enumerate() {
                    f(i, &mut *segment.paths_mut());
                }
            }
        }
    }

    /// Apply `f` to every path in parallel.
    pub fn par_for_each_path<F>(&mut self, f: F)
    where
        F: Fn(&mut Path) + Sync + Send,
    {
        match self {
            Self::Horizontal(layers) => layers
                .par_iter_mut()
                .for_each(|layer| layer.paths.par_iter_mut().for_each(&f)),
            Self::Vertical(segments) => segments
                .par_iter_mut()
                .for_each(|segment| segment.paths_mut().par_iter_mut().for_each(&f)),
        }
    }
}

/// Evenly spaced slice heights: `z_min + layer_height/2 + i·layer_height`
/// while the height stays at or below `z_max`.
pub fn generate_layer_heights(z_min: f64, z_max: f64, layer_height: f64) -> Vec<f64> {
    if z_max <= z_min || layer_height <= 0.0 {
        return Vec::new();
    }
    (0..)
        .map(|i| z_min + layer_height * (f64::from(i) + 0.5))
        .take_while(|&z| z <= z_max)
        .collect()
}

/// Cuts the mesh with horizontal planes.
pub struct PlanarSlicer {
    /// Distance between planes.
    pub layer_height: f64,
    /// Restrict slicing to `(start, end)` above the mesh bottom.
    pub slice_height_range: Option<(f64, f64)>,
    kernel: Box<dyn ContourKernel>,
}

impl PlanarSlicer {
    /// Planar slicer with the built-in tracer.
    pub fn new(layer_height: f64) -> Self {
        Self {
            layer_height,
            slice_height_range: None,
            kernel: Box::new(EdgeWalkTracer::default()),
        }
    }

    /// Planar slicer configured from settings.
    pub fn from_settings(settings: &SlicingSettings) -> Self {
        Self {
            slice_height_range: settings.slice_height_range,
            ..Self::new(settings.layer_height)
        }
    }

    /// Use a different contour kernel.
    pub fn with_kernel(mut self, kernel: Box<dyn ContourKernel>) -> Self {
        self.kernel = kernel;
        self
    }

    /// Heights at which the mesh will be cut.
    pub fn heights(&self, mesh: &SurfaceMesh) -> Vec<f64> {
        let (min, max) = mesh.bounds();
        let (mut z_min, mut z_max) = (min.z, max.z);
        if let Some((start, end)) = self.slice_height_range {
            if start >= 0.0 && z_min + end <= z_max {
                info!(start, end, "slicing within height range");
                z_max = z_min + end;
                z_min += start;
            } else {
                warn!(start, end, "slice height range is outside the mesh, ignoring it");
            }
        }
        generate_layer_heights(z_min, z_max, self.layer_height)
    }

    /// Slice the mesh into horizontal layers. Heights that produce no
    /// contours are skipped.
    pub fn slice(&self, mesh: &SurfaceMesh) -> Result<SliceResult> {
        if self.layer_height <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "layer_height must be positive".into(),
            ));
        }
        let heights = self.heights(mesh);
        info!(layers = heights.len(), layer_height = self.layer_height, "planar slicing");

        let elevation = mesh.elevation();
        let layers: Vec<Layer> = trace_many(self.kernel.as_ref(), mesh, &elevation, &heights)?
            .into_iter()
            .filter(|paths| !paths.is_empty())
            .map(Layer::new)
            .collect();
        Ok(SliceResult::Horizontal(layers))
    }
}

/// Traces evenly spaced levels of a per-vertex scalar field.
pub struct ScalarFieldSlicer {
    /// Number of interior levels; `n + 1` levels are traced in total.
    pub no_of_isocurves: usize,
    /// Segment grouping distance.
    pub max_centroid_dist: f64,
    /// Segment length limit.
    pub max_paths_per_segment: Option<usize>,
    kernel: Box<dyn ContourKernel>,
}

impl ScalarFieldSlicer {
    /// Scalar field slicer with the built-in tracer.
    pub fn new(no_of_isocurves: usize, max_centroid_dist: f64) -> Self {
        Self {
            no_of_isocurves,
            max_centroid_dist,
            max_paths_per_segment: None,
            kernel: Box::new(EdgeWalkTracer::default()),
        }
    }

    /// Scalar field slicer configured from settings.
    pub fn from_settings(settings: &SlicingSettings) -> Self {
        Self {
            max_paths_per_segment: settings.max_paths_per_segment,
            ..Self::new(settings.no_of_isocurves, settings.vertical_layers_max_centroid_dist)
        }
    }

    /// Use a different contour kernel.
    pub fn with_kernel(mut self, kernel: Box<dyn ContourKernel>) -> Self {
        self.kernel = kernel;
        self
    }

    /// Iso-values for a field shifted to start at 0 and ending at `max`.
    /// The lowest level is lifted to `0.05·step` off the field minimum.
    pub fn iso_values(&self, max: f64) -> Vec<f64> {
        let step = max / (self.no_of_isocurves + 1) as f64;
        (0..=self.no_of_isocurves)
            .map(|i| if i == 0 { 0.05 * step } else { i as f64 * step })
            .collect()
    }

    /// Slice `field` (one value per vertex). The shifted field is installed
    /// on the mesh as the `scalar_field` vertex attribute.
    pub fn slice(&self, mesh: &mut SurfaceMesh, field: &[f64]) -> Result<SliceResult> {
        let min = field.iter().copied().fold(f64::INFINITY, f64::min);
        if !min.is_finite() {
            return Err(SlicerError::EmptyMesh);
        }
        let shifted: Vec<f64> = field.iter().map(|v| v - min).collect();
        let max = shifted.iter().copied().fold(0.0, f64::max);
        mesh.set_vertex_attribute(SCALAR_FIELD, shifted.clone())?;
        if max <= 0.0 {
            warn!("scalar field is constant, nothing to slice");
            return Ok(SliceResult::Vertical(Vec::new()));
        }

        let isos = self.iso_values(max);
        info!(isocurves = isos.len(), "scalar field slicing");
        let mut manager = VerticalLayersManager::new(self.max_centroid_dist, self.max_paths_per_segment);
        for paths in trace_many(self.kernel.as_ref(), mesh, &shifted, &isos)? {
            for path in paths {
                manager.add(path);
            }
        }
        Ok(SliceResult::Vertical(manager.into_segments()))
    }
}

/// Number of curves needed to cover the gap between two targets at the
/// given average layer height.
///
/// Fails when the targets cannot reach each other, e.g. when they sit on
/// separate components of the mesh.
pub fn find_no_of_isocurves(
    low: &CompoundTarget,
    high: &CompoundTarget,
    avg_layer_height: f64,
) -> Result<usize> {
    let avg_ds0 = low.avg_distance_from(high);
    let avg_ds1 = high.avg_distance_from(low);
    let curves = ((avg_ds0 + avg_ds1) * 0.5) / avg_layer_height;
    if !curves.is_finite() {
        return Err(SlicerError::InvalidSettings(
            "LOW and HIGH targets are not connected on the mesh".into(),
        ));
    }
    Ok((curves as usize).max(1))
}

/// Interpolation parameters `i/(n+1)` for `i = 1..=n`, followed by `0.997`.
pub fn interpolation_parameters(n: usize) -> Vec<f64> {
    let mut params: Vec<f64> = (1..=n).map(|i| i as f64 / (n + 1) as f64).collect();
    params.push(0.997);
    params
}

/// Curved slicer driven by LOW and (optionally) HIGH boundary targets.
#[derive(Debug, Clone)]
pub struct InterpolationSlicer {
    /// Target spacing between curves.
    pub avg_layer_height: f64,
    /// Segment grouping distance.
    pub max_centroid_dist: f64,
    /// Segment length limit.
    pub max_paths_per_segment: Option<usize>,
    tracer: EdgeWalkTracer,
}

impl InterpolationSlicer {
    /// Interpolation slicer with the given spacing and grouping distance.
    pub fn new(avg_layer_height: f64, max_centroid_dist: f64) -> Self {
        Self {
            avg_layer_height,
            max_centroid_dist,
            max_paths_per_segment: None,
            tracer: EdgeWalkTracer::default(),
        }
    }

    /// Interpolation slicer configured from settings.
    pub fn from_settings(settings: &SlicingSettings) -> Self {
        Self {
            max_paths_per_segment: settings.max_paths_per_segment,
            ..Self::new(
                settings.avg_layer_height,
                settings.vertical_layers_max_centroid_dist,
            )
        }
    }

    /// Generate curved paths. Each interpolation parameter installs the
    /// blended distance as the `scalar_field` vertex attribute and traces
    /// its zero level.
    pub fn slice(
        &self,
        mesh: &mut SurfaceMesh,
        low: &CompoundTarget,
        high: Option<&CompoundTarget>,
    ) -> Result<SliceResult> {
        if self.avg_layer_height <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "avg_layer_height must be positive".into(),
            ));
        }
        let n = match high {
            Some(high) => find_no_of_isocurves(low, high, self.avg_layer_height)?,
            None => ((low.max_dist() / self.avg_layer_height) as usize).max(1),
        };
        let params = interpolation_parameters(n);
        info!(paths = params.len(), "interpolation slicing");

        let mut manager = VerticalLayersManager::new(self.max_centroid_dist, self.max_paths_per_segment);
        for t in params {
            let field = weighted_distances(mesh.num_vertices(), t, low, high);
            mesh.set_vertex_attribute(SCALAR_FIELD, field)?;
            for path in self.tracer.trace_attribute(mesh, SCALAR_FIELD, 0.0)? {
                manager.add(path);
            }
        }
        Ok(SliceResult::Vertical(manager.into_segments()))
    }
}
