#![warn(missing_docs)]

//! Non-planar slicing and print organization.
//!
//! This crate cuts a triangle mesh into paths along the level sets of a
//! scalar field, post-processes those paths (simplification, ordering, seam
//! alignment) and turns them into printpoints carrying everything a
//! fabrication backend needs: extruder state, velocity, blend radius, dwell
//! time, z-hop safety moves and transferred mesh attributes.
//!
//! # Example
//!
//! ```ignore
//! use stratum_slicer::{slice_planar, PrintSettings};
//! use stratum_mesh::SurfaceMesh;
//!
//! let mesh: SurfaceMesh = // ... load a mesh
//! let settings = PrintSettings::from_toml_str(&std::fs::read_to_string("print.toml")?)?;
//! let output = slice_planar(&mesh, &settings)?;
//!
//! println!("Layers: {}", output.stats.layer_count);
//! std::fs::write("out_printpoints.json", output.print.to_json()?)?;
//! ```

pub mod config;
pub mod contour;
pub mod error;
pub mod geodesics;
pub mod geometry;
pub mod organize;
pub mod output;
pub mod seams;
pub mod simplify;
pub mod slicer;
pub mod sort;
pub mod target;
pub mod transfer;

pub use config::{
    OrganizationSettings, PrintSettings, SeamSettings, SimplifySettings, SlicingSettings,
    SortSettings, TargetSettings, VelocitySettings,
};
pub use contour::{ContourKernel, EdgeWalkTracer, SCALAR_FIELD};
pub use error::{Result, SlicerError};
pub use geodesics::{EdgeGraphGeodesics, GeodesicSolver, GeodesicsMethod};
pub use geometry::{Layer, Path, PathKey, PrintPoint, Segment};
pub use organize::{OrganizedPrint, PrintOrganizer, PrintStats, VelocityType};
pub use seams::SeamOrientation;
pub use slicer::{InterpolationSlicer, PlanarSlicer, ScalarFieldSlicer, SliceResult};
pub use sort::{GeneticTour, NearestNeighborTour, SortMethod, TourSolver};
pub use target::{CompoundTarget, UnionMethod};

use stratum_mesh::{SurfaceMesh, VertexId};
use tracing::info;

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PrintOutput {
    /// Post-processed paths.
    pub slices: SliceResult,
    /// Organized printpoints.
    pub print: OrganizedPrint,
    /// Print statistics.
    pub stats: PrintStats,
}

/// Simplify, sort and align the seams of freshly sliced paths.
///
/// Sorting may turn a horizontal result into segments, so the result is
/// returned by value.
pub fn post_process(mut result: SliceResult, settings: &PrintSettings) -> Result<SliceResult> {
    if settings.simplify.enabled {
        simplify::simplify_paths_rdp(&mut result, settings.simplify.threshold);
    }
    let mut result = sort::sort_paths(result, &settings.sort, &settings.slicing)?;
    seams::align_seams(&mut result, settings.seams.orientation);
    if settings.seams.unify_orientation {
        seams::unify_paths_orientation(&mut result);
    }
    Ok(result)
}

/// Create and organize the printpoints of a post-processed result.
pub fn organize_print(
    result: &SliceResult,
    mesh: &SurfaceMesh,
    settings: &PrintSettings,
) -> Result<OrganizedPrint> {
    let mut organizer = PrintOrganizer::new(result, mesh, &settings.slicing);
    organizer.organize(settings)?;
    let print = organizer.into_print();
    print.check_complete()?;
    Ok(print)
}

/// Run a full pipeline on an already sliced result.
pub fn process(result: SliceResult, mesh: &SurfaceMesh, settings: &PrintSettings) -> Result<PrintOutput> {
    settings.validate()?;
    let slices = post_process(result, settings)?;
    let print = organize_print(&slices, mesh, settings)?;
    let stats = PrintStats::from_print(&print);
    info!(
        layers = stats.layer_count,
        paths = stats.path_count,
        points = stats.point_count,
        "print organized"
    );
    Ok(PrintOutput { slices, print, stats })
}

/// Slice a mesh with horizontal planes and organize the print.
///
/// This is the main entry point for planar printing. It:
/// 1. Cuts the mesh at evenly spaced heights
/// 2. Simplifies, sorts and aligns the paths
/// 3. Builds printpoints and derives their fabrication attributes
/// 4. Computes print statistics
pub fn slice_planar(mesh: &SurfaceMesh, settings: &PrintSettings) -> Result<PrintOutput> {
    if mesh.num_faces() == 0 {
        return Err(SlicerError::EmptyMesh);
    }
    settings.validate()?;
    let result = PlanarSlicer::from_settings(&settings.slicing).slice(mesh)?;
    process(result, mesh, settings)
}

/// Slice a mesh along curves that interpolate between LOW and HIGH boundary
/// vertices, then organize the print.
///
/// The `[targets]` settings pick the distance solver of each target, the
/// union of the HIGH clusters, and whether those clusters are weighted
/// unevenly. `external` is the solver used where a target asks for
/// [`GeodesicsMethod::External`].
pub fn slice_interpolation(
    mesh: &mut SurfaceMesh,
    low_vertices: &[VertexId],
    high_vertices: Option<&[VertexId]>,
    settings: &PrintSettings,
    external: Option<&dyn GeodesicSolver>,
) -> Result<PrintOutput> {
    if mesh.num_faces() == 0 {
        return Err(SlicerError::EmptyMesh);
    }
    settings.validate()?;
    let targets = &settings.targets;

    let low = CompoundTarget::from_vertices(
        mesh,
        low_vertices,
        UnionMethod::Min,
        targets.low_geodesics.solver(external)?,
    )?;
    let high = match high_vertices {
        Some(vertices) => {
            let mut high = CompoundTarget::from_vertices(
                mesh,
                vertices,
                targets.high_union,
                targets.high_geodesics.solver(external)?,
            )?
            .with_offset(targets.uneven_upper_targets_offset);
            if targets.uneven_weights {
                high.compute_uneven_weights(&low);
            }
            Some(high)
        }
        None => None,
    };

    let result =
        InterpolationSlicer::from_settings(&settings.slicing).slice(mesh, &low, high.as_ref())?;
    process(result, mesh, settings)
}
