use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::geometry::{PathKey, PrintPoint};

/// Printpoints of every path, keyed by `(layer, path)` in print order.
///
/// For vertical results the layer index is the segment index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizedPrint {
    paths: BTreeMap<PathKey, Vec<PrintPoint>>,
}

impl OrganizedPrint {
    /// Empty print.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the printpoints of one path. Each point's parent is set to
    /// `key`.
    pub fn insert(&mut self, key: PathKey, mut points: Vec<PrintPoint>) {
        for p in &mut points {
            p.parent = key;
        }
        self.paths.insert(key, points);
    }

    /// Printpoints of one path.
    pub fn get(&self, key: PathKey) -> Option<&[PrintPoint]> {
        self.paths.get(&key).map(Vec::as_slice)
    }

    /// Mutable printpoints of one path.
    pub fn get_mut(&mut self, key: PathKey) -> Option<&mut Vec<PrintPoint>> {
        self.paths.get_mut(&key)
    }

    /// Paths in print order.
    pub fn paths(&self) -> impl Iterator<Item = (PathKey, &[PrintPoint])> {
        self.paths.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Mutable paths in print order.
    pub fn paths_mut(&mut self) -> impl Iterator<Item = (PathKey, &mut Vec<PrintPoint>)> {
        self.paths.iter_mut().map(|(k, v)| (*k, v))
    }

    /// Number of distinct layers.
    pub fn number_of_layers(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for key in self.paths.keys() {
            if last != Some(key.layer) {
                count += 1;
                last = Some(key.layer);
            }
        }
        count
    }

    /// Number of paths.
    pub fn number_of_paths(&self) -> usize {
        self.paths.len()
    }

    /// Number of paths on `layer`.
    pub fn number_of_paths_on_layer(&self, layer: usize) -> usize {
        self.paths.keys().filter(|k| k.layer == layer).count()
    }

    /// Total number of printpoints.
    pub fn number_of_points(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    /// Check if there are no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All printpoints in print order.
    pub fn points(&self) -> impl Iterator<Item = &PrintPoint> {
        self.paths.values().flatten()
    }

    /// All printpoints in print order, mutably.
    pub fn points_mut(&mut self) -> impl Iterator<Item = &mut PrintPoint> {
        self.paths.values_mut().flatten()
    }

    /// Apply `f` to every printpoint in parallel.
    pub fn par_for_each_point<F>(&mut self, f: F)
    where
        F: Fn(&mut PrintPoint) + Sync + Send,
    {
        self.paths
            .par_iter_mut()
            .for_each(|(_, points)| points.par_iter_mut().for_each(&f));
    }

    /// The very last printpoint of the print, skipping empty paths.
    pub fn last_point_mut(&mut self) -> Option<&mut PrintPoint> {
        self.paths.values_mut().rev().find_map(|p| p.last_mut())
    }
}
