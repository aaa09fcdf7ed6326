//! Printpoint creation from sliced paths.

use rayon::prelude::*;
use stratum_math::{closest_point_on_segment, Point3, Vec3};
use stratum_mesh::SurfaceMesh;
use tracing::{debug, info};

use super::OrganizedPrint;
use crate::config::SlicingSettings;
use crate::geometry::{Path, PathKey, PrintPoint};
use crate::slicer::SliceResult;
use crate::transfer::AttributeTransfer;

/// Closest point to `p` on the polyline of `path`, including the closing
/// segment of a closed path.
pub fn closest_point_on_path(p: &Point3, path: &Path) -> Option<Point3> {
    let pts = &path.points;
    match pts.len() {
        0 => None,
        1 => Some(pts[0]),
        n => {
            let closing = (path.is_closed && n > 2).then(|| (pts[n - 1], pts[0]));
            pts.windows(2)
                .map(|w| (w[0], w[1]))
                .chain(closing)
                .map(|(a, b)| closest_point_on_segment(p, &a, &b))
                .min_by(|x, y| x.1.total_cmp(&y.1))
                .map(|(c, _)| c)
        }
    }
}

struct PrintpointBuilder<'a> {
    mesh: &'a SurfaceMesh,
    faces: AttributeTransfer<'a>,
    slicing: &'a SlicingSettings,
    horizontal: bool,
}

impl PrintpointBuilder<'_> {
    fn mesh_normal(&self, p: &Point3) -> Vec3 {
        self.faces
            .closest_face(p)
            .map(|f| self.mesh.face_normal(f))
            .filter(|n| n.norm() > 0.5)
            .unwrap_or_else(Vec3::z)
    }

    /// Horizontal paths use the configured layer height and a vertical up
    /// vector. Paths of a segment measure their distance to the previous
    /// path of the segment; the first path uses the average layer height.
    fn build(&self, path: &Path, previous: Option<&Path>, key: PathKey) -> Vec<PrintPoint> {
        let (min, max) = (self.slicing.min_layer_height, self.slicing.max_layer_height);
        path.points
            .iter()
            .map(|p| {
                let mut ppt = PrintPoint::new(*p, self.slicing.layer_height, self.mesh_normal(p), key);
                if self.horizontal {
                    return ppt;
                }
                match previous.and_then(|prev| closest_point_on_path(p, prev)) {
                    Some(cp) => {
                        let offset = p - cp;
                        let d = offset.norm();
                        ppt.layer_height = d.max(min).min(max);
                        if d > 1e-12 {
                            ppt.up_vector = offset / d;
                        }
                    }
                    None => ppt.layer_height = self.slicing.avg_layer_height,
                }
                ppt
            })
            .collect()
    }
}

/// Create the printpoints of every path. Each point gets the normal of the
/// closest mesh face, a layer height and an up vector; toggles and
/// velocities are left unset.
pub fn create_printpoints(
    result: &SliceResult,
    mesh: &SurfaceMesh,
    slicing: &SlicingSettings,
) -> OrganizedPrint {
    let builder = PrintpointBuilder {
        mesh,
        faces: AttributeTransfer::new(mesh),
        slicing,
        horizontal: result.is_horizontal(),
    };

    let groups = result.groups();
    let entries: Vec<(PathKey, Vec<PrintPoint>)> = groups
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, paths)| {
            let paths: &[Path] = paths;
            let builder = &builder;
            paths.iter().enumerate().map(move |(j, path)| {
                let key = PathKey::new(i, j);
                let previous = j.checked_sub(1).map(|k| &paths[k]);
                (key, builder.build(path, previous, key))
            })
        })
        .collect();

    let mut print = OrganizedPrint::new();
    for (key, points) in entries {
        print.insert(key, points);
    }
    info!(
        layers = print.number_of_layers(),
        paths = print.number_of_paths(),
        "printpoints created"
    );
    debug!(points = print.number_of_points(), "printpoint count");
    print
}
