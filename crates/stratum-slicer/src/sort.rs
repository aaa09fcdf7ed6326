//! Path ordering.
//!
//! Paths are either reordered within each layer to shorten travel
//! ([`SortMethod::ShortestPath`]) or regrouped into vertically continuous
//! segments ([`SortMethod::PerSegment`]). Tour search sits behind
//! [`TourSolver`] so a cheap greedy order can replace the genetic search.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stratum_math::{Point2, Point3};
use tracing::{debug, info};

use crate::config::{SlicingSettings, SortSettings};
use crate::error::{Result, SlicerError};
use crate::geometry::{Path, Segment, VerticalLayersManager};
use crate::slicer::SliceResult;

/// How paths are ordered after slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMethod {
    /// Shortest travel tour inside each layer.
    #[default]
    ShortestPath,
    /// Group paths of successive layers into vertical segments.
    PerSegment,
}

impl FromStr for SortMethod {
    type Err = SlicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shortest_path" => Ok(Self::ShortestPath),
            "per_segment" => Ok(Self::PerSegment),
            other => Err(SlicerError::UnknownOption {
                kind: "sort method",
                value: other.to_string(),
            }),
        }
    }
}

/// Iteration limits for a tour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourBudget {
    /// Generations without improvement before stopping.
    pub max_attempts: usize,
    /// Hard cap on generations.
    pub max_iterations: usize,
}

impl TourBudget {
    /// Budget taken from sort settings.
    pub fn from_settings(settings: &SortSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            max_iterations: settings.max_iterations,
        }
    }
}

/// Orders points into an open tour.
pub trait TourSolver: Send + Sync {
    /// Return a permutation of `0..points.len()`. The result is the best
    /// tour found within `budget`, not necessarily the optimum.
    fn order(&self, points: &[Point2], budget: TourBudget) -> Vec<usize>;
}

/// Length of the open tour visiting `points` in `order`.
pub fn tour_length(points: &[Point2], order: &[usize]) -> f64 {
    order
        .windows(2)
        .map(|w| (points[w[1]] - points[w[0]]).norm())
        .sum()
}

/// Greedy tour: always go to the closest unvisited point, starting at the
/// first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborTour;

impl TourSolver for NearestNeighborTour {
    fn order(&self, points: &[Point2], _budget: TourBudget) -> Vec<usize> {
        nearest_neighbor_order(points)
    }
}

fn nearest_neighbor_order(points: &[Point2]) -> Vec<usize> {
    if points.len() < 2 {
        return (0..points.len()).collect();
    }

    let mut current = points[0];
    let mut remaining: Vec<usize> = (1..points.len()).collect();
    let mut order = Vec::with_capacity(points.len());
    order.push(0);

    while !remaining.is_empty() {
        let best = remaining
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                let da = (points[a] - current).norm();
                let db = (points[b] - current).norm();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let idx = remaining.remove(best);
        current = points[idx];
        order.push(idx);
    }
    order
}

/// Genetic tour search with order crossover, swap mutation and elitism.
///
/// Deterministic for a given seed. The population is seeded with the
/// input order and the greedy tour, so the result is never longer than
/// either.
#[derive(Debug, Clone)]
pub struct GeneticTour {
    /// Tours per generation.
    pub population_size: usize,
    /// Probability of a swap mutation per child.
    pub mutation_probability: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for GeneticTour {
    fn default() -> Self {
        Self::from_settings(&SortSettings::default())
    }
}

impl GeneticTour {
    /// Tour search configured from sort settings.
    pub fn from_settings(settings: &SortSettings) -> Self {
        Self {
            population_size: settings.population_size.max(2),
            mutation_probability: settings.mutation_probability,
            seed: settings.seed,
        }
    }

    fn tournament<'a>(&self, ranked: &'a [(f64, Vec<usize>)], rng: &mut StdRng) -> &'a [usize] {
        let mut best = rng.gen_range(0..ranked.len());
        for _ in 0..2 {
            let other = rng.gen_range(0..ranked.len());
            if ranked[other].0 < ranked[best].0 {
                best = other;
            }
        }
        &ranked[best].1
    }
}

/// Order crossover: copy a slice of `a`, fill the rest with `b`'s genes in
/// `b`'s order.
fn order_crossover(a: &[usize], b: &[usize], rng: &mut StdRng) -> Vec<usize> {
    let n = a.len();
    let (mut i, mut j) = (rng.gen_range(0..n), rng.gen_range(0..n));
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }

    let mut child = vec![0; n];
    let mut used = vec![false; n];
    for k in i..=j {
        child[k] = a[k];
        used[a[k]] = true;
    }
    let rest = b.iter().filter(|&&g| !used[g]);
    for (k, &g) in (0..i).chain(j + 1..n).zip(rest) {
        child[k] = g;
    }
    child
}

impl TourSolver for GeneticTour {
    fn order(&self, points: &[Point2], budget: TourBudget) -> Vec<usize> {
        let n = points.len();
        if n < 3 {
            return (0..n).collect();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut population: Vec<Vec<usize>> = Vec::with_capacity(self.population_size);
        population.push((0..n).collect());
        population.push(nearest_neighbor_order(points));
        while population.len() < self.population_size {
            let mut tour: Vec<usize> = (0..n).collect();
            tour.shuffle(&mut rng);
            population.push(tour);
        }

        let elite = (self.population_size / 10).max(1);
        let mut best_len = f64::INFINITY;
        let mut best = population[0].clone();
        let mut stagnant = 0;
        let mut generations = 0;

        while generations < budget.max_iterations {
            generations += 1;
            let mut ranked: Vec<(f64, Vec<usize>)> = population
                .into_par_iter()
                .map(|tour| (tour_length(points, &tour), tour))
                .collect();
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

            if ranked[0].0 < best_len - 1e-12 {
                best_len = ranked[0].0;
                best.clone_from(&ranked[0].1);
                stagnant = 0;
            } else {
                stagnant += 1;
                if stagnant >= budget.max_attempts {
                    break;
                }
            }

            let mut next: Vec<Vec<usize>> =
                ranked.iter().take(elite).map(|(_, t)| t.clone()).collect();
            while next.len() < self.population_size {
                let a = self.tournament(&ranked, &mut rng);
                let b = self.tournament(&ranked, &mut rng);
                let mut child = order_crossover(a, b, &mut rng);
                if rng.gen_bool(self.mutation_probability.clamp(0.0, 1.0)) {
                    let (x, y) = (rng.gen_range(0..n), rng.gen_range(0..n));
                    child.swap(x, y);
                }
                next.push(child);
            }
            population = next;
        }

        debug!(points = n, generations, length = best_len, "tour search finished");
        best
    }
}

fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    order
        .iter()
        .all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
}

/// Reorder the paths of every layer or segment along a shortest tour of
/// their first points (x, y). Empty input is left unchanged.
pub fn sort_shortest_path(
    result: &mut SliceResult,
    solver: &dyn TourSolver,
    budget: TourBudget,
) -> Result<()> {
    info!(groups = result.len(), "sorting paths by shortest travel");
    let mut outcome = Ok(());
    result.for_each_group_mut(|i, paths| {
        if outcome.is_err() || paths.len() < 2 {
            return;
        }
        let points: Vec<Point2> = paths
            .iter()
            .map(|p| p.first().map_or_else(Point2::origin, |q| Point2::new(q.x, q.y)))
            .collect();
        let order = solver.order(&points, budget);
        if !is_permutation(&order, paths.len()) {
            outcome = Err(SlicerError::InvalidSettings(format!(
                "tour solver returned an invalid order for group {i}"
            )));
            return;
        }
        let mut slots: Vec<Option<Path>> = paths.drain(..).map(Some).collect();
        paths.extend(order.iter().filter_map(|&k| slots[k].take()));
    });
    outcome
}

/// Regroup a horizontal result into vertical segments by centroid
/// proximity of successive layers. Vertical results pass through.
pub fn sort_into_segments(
    result: SliceResult,
    max_centroid_dist: f64,
    max_paths_per_segment: Option<usize>,
) -> SliceResult {
    match result {
        SliceResult::Horizontal(layers) => {
            let mut manager = VerticalLayersManager::new(max_centroid_dist, max_paths_per_segment);
            for path in layers.into_iter().flat_map(|l| l.paths) {
                manager.add(path);
            }
            let segments = manager.into_segments();
            info!(segments = segments.len(), "grouped paths into segments");
            SliceResult::Vertical(segments)
        }
        vertical => vertical,
    }
}

/// Within each run of consecutive segments that start at the same height,
/// order the segments by distance of their head centroid to `align_with`.
/// The sort is stable.
pub fn reorder_vertical_layers(segments: &mut [Segment], align_with: Point3) {
    let start_z = |s: &Segment| s.z_bounds().map_or(f64::NAN, |(lo, _)| lo);
    let distance = |s: &Segment| {
        s.head_centroid()
            .map_or(f64::INFINITY, |c| (c - align_with).norm())
    };

    let mut begin = 0;
    while begin < segments.len() {
        let z = start_z(&segments[begin]);
        let mut end = begin + 1;
        while end < segments.len() && (start_z(&segments[end]) - z).abs() < 1e-9 {
            end += 1;
        }
        segments[begin..end].sort_by(|a, b| distance(a).total_cmp(&distance(b)));
        begin = end;
    }
}

/// Apply the configured ordering strategy.
pub fn sort_paths(
    result: SliceResult,
    settings: &SortSettings,
    slicing: &SlicingSettings,
) -> Result<SliceResult> {
    match settings.method {
        SortMethod::ShortestPath => {
            let mut result = result;
            let solver = GeneticTour::from_settings(settings);
            sort_shortest_path(&mut result, &solver, TourBudget::from_settings(settings))?;
            Ok(result)
        }
        SortMethod::PerSegment => Ok(sort_into_segments(
            result,
            slicing.vertical_layers_max_centroid_dist,
            slicing.max_paths_per_segment,
        )),
    }
}
