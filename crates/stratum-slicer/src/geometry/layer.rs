use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use stratum_math::Point3;

use super::Path;

/// Paths sharing one height or iso-value band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Paths in print order.
    pub paths: Vec<Path>,
}

impl Layer {
    /// Create a layer from paths.
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the layer has no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Lowest and highest z over all paths.
    pub fn z_bounds(&self) -> Option<(f64, f64)> {
        z_bounds(&self.paths)
    }
}

/// Spatially contiguous paths drawn from successive heights, printed as one
/// vertical pass.
///
/// The head centroid (centroid of the last path) is derived from the paths
/// and refreshed by every mutation; it cannot be set directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentData")]
pub struct Segment {
    paths: Vec<Path>,
    #[serde(skip)]
    head_centroid: Option<Point3>,
}

#[derive(Deserialize)]
struct SegmentData {
    paths: Vec<Path>,
}

impl From<SegmentData> for Segment {
    fn from(data: SegmentData) -> Self {
        Self::from_paths(data.paths)
    }
}

impl Segment {
    /// Create an empty segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segment holding `paths` in order.
    pub fn from_paths(paths: Vec<Path>) -> Self {
        let mut segment = Self {
            paths,
            head_centroid: None,
        };
        segment.refresh();
        segment
    }

    /// Append a path and move the head to it.
    pub fn push(&mut self, path: Path) {
        self.head_centroid = path.centroid();
        self.paths.push(path);
    }

    /// Paths in print order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Mutable access to the paths. The head centroid is recomputed when the
    /// returned guard is dropped.
    pub fn paths_mut(&mut self) -> PathsMut<'_> {
        PathsMut { segment: self }
    }

    /// Take the paths out of the segment.
    pub fn into_paths(self) -> Vec<Path> {
        self.paths
    }

    /// Centroid of the last path, `None` for an empty segment.
    pub fn head_centroid(&self) -> Option<Point3> {
        self.head_centroid
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the segment has no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Lowest and highest z over all paths.
    pub fn z_bounds(&self) -> Option<(f64, f64)> {
        z_bounds(&self.paths)
    }

    fn refresh(&mut self) {
        self.head_centroid = self.paths.last().and_then(Path::centroid);
    }
}

/// Mutable view of a segment's paths; see [`Segment::paths_mut`].
pub struct PathsMut<'a> {
    segment: &'a mut Segment,
}

impl Deref for PathsMut<'_> {
    type Target = Vec<Path>;

    fn deref(&self) -> &Vec<Path> {
        &self.segment.paths
    }
}

impl DerefMut for PathsMut<'_> {
    fn deref_mut(&mut self) -> &mut Vec<Path> {
        &mut self.segment.paths
    }
}

impl Drop for PathsMut<'_> {
    fn drop(&mut self) {
        self.segment.refresh();
    }
}

fn z_bounds(paths: &[Path]) -> Option<(f64, f64)> {
    paths
        .iter()
        .filter_map(Path::z_bounds)
        .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
}

/// Groups paths into [`Segment`]s by proximity of their centroids.
///
/// Each incoming path joins the segment whose head centroid is closest, if
/// that head is nearer than `max_centroid_dist` and the segment is below
/// `max_paths_per_segment`. Otherwise it starts a new segment.
#[derive(Debug, Clone)]
pub struct VerticalLayersManager {
    segments: Vec<Segment>,
    max_centroid_dist: f64,
    max_paths_per_segment: Option<usize>,
}

impl VerticalLayersManager {
    /// Create a manager with the given grouping limits.
    pub fn new(max_centroid_dist: f64, max_paths_per_segment: Option<usize>) -> Self {
        Self {
            segments: Vec::new(),
            max_centroid_dist,
            max_paths_per_segment,
        }
    }

    /// Assign `path` to a segment.
    pub fn add(&mut self, path: Path) {
        let Some(centroid) = path.centroid() else {
            return;
        };

        let candidate = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.head_centroid().map(|h| (i, (h - centroid).norm())))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let selected = candidate.and_then(|(i, dist)| {
            let room = self
                .max_paths_per_segment
                .map_or(true, |max| self.segments[i].len() < max);
            (dist < self.max_centroid_dist && room).then_some(i)
        });

        match selected {
            Some(i) => self.segments[i].push(path),
            None => {
                let mut segment = Segment::new();
                segment.push(path);
                self.segments.push(segment);
            }
        }
    }

    /// Segments created so far.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Finish grouping and return the segments in creation order.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}
