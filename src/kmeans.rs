use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Initializer;

/// A colour in 0–255 RGB space, fractional while clustering.
pub(crate) type Point = [f64; 3];

/// How a clustering run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Convergence {
    /// Centroid movement dropped below the tolerance.
    Converged { iterations: usize },
    /// The iteration cap was reached first; the last centroids are used as-is.
    IterationCap { iterations: usize },
    /// The engine does not report convergence.
    Delegated,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }
}

/// Final state of one clustering run.
#[derive(Debug, Clone)]
pub(crate) struct ClusterRun {
    pub centroids: Vec<Point>,
    pub counts: Vec<usize>,
    pub inertia: f64,
    pub convergence: Convergence,
}

#[inline(always)]
pub(crate) fn squared_distance(a: &Point, b: &Point) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

/// Index of the closest centroid and its squared distance. Ties go to the
/// lower index.
#[inline]
pub(crate) fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    (best_idx, best_dist)
}

fn assign(points: &[Point], centroids: &[Point]) -> Vec<(usize, f64)> {
    points.par_iter().map(|p| nearest(p, centroids)).collect()
}

/// Member counts and inertia for a fixed set of centroids.
pub(crate) fn tally(points: &[Point], centroids: &[Point]) -> (Vec<usize>, f64) {
    let mut counts = vec![0usize; centroids.len()];
    let mut inertia = 0.0;
    for (idx, dist) in assign(points, centroids) {
        counts[idx] += 1;
        inertia += dist;
    }
    (counts, inertia)
}

/// Move each empty cluster onto the sample farthest from its nearest
/// centroid (lowest sample index on ties), then tally.
///
/// Bounded to one reseed per cluster; anything still empty afterwards keeps
/// its centroid.
pub(crate) fn reseed_empty(points: &[Point], centroids: &mut [Point]) -> (Vec<usize>, f64) {
    for _ in 0..centroids.len() {
        let labels = assign(points, centroids);
        let mut counts = vec![0usize; centroids.len()];
        for &(idx, _) in &labels {
            counts[idx] += 1;
        }
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            break;
        };

        let mut far = 0;
        let mut far_dist = 0.0;
        for (i, &(_, d)) in labels.iter().enumerate() {
            if d > far_dist {
                far_dist = d;
                far = i;
            }
        }
        // Every sample already sits on a centroid.
        if far_dist <= 0.0 {
            break;
        }
        centroids[empty] = points[far];
    }
    tally(points, centroids)
}

// ------------------------------------------------------------
// Initialisation
// ------------------------------------------------------------

fn init_random(points: &[Point], k: usize, rng: &mut ChaCha8Rng) -> Vec<Point> {
    rand::seq::index::sample(rng, points.len(), k)
        .iter()
        .map(|i| points[i])
        .collect()
}

/// k-means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn init_plus_plus(points: &[Point], k: usize, rng: &mut ChaCha8Rng) -> Vec<Point> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)]);

    let mut dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dist.iter().sum();

        // Every sample already sits on a centroid: fewer distinct colours than k.
        let chosen = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = n - 1;
            for (i, d) in dist.iter().enumerate() {
                acc += d;
                if acc > target {
                    pick = i;
                    break;
                }
            }
            pick
        };

        let c = points[chosen];
        for (d, p) in dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &c));
        }
        centroids.push(c);
    }

    centroids
}

// ------------------------------------------------------------
// Lloyd iteration
// ------------------------------------------------------------

/// Run Lloyd's algorithm once with a seeded initialisation.
///
/// Always terminates after at most `max_iterations` rounds. A cluster that
/// receives no members in a round keeps its previous centroid.
pub(crate) fn lloyd(
    points: &[Point],
    k: usize,
    initializer: Initializer,
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
) -> ClusterRun {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = match initializer {
        Initializer::KMeansPlusPlus => init_plus_plus(points, k, &mut rng),
        Initializer::RandomSamples => init_random(points, k, &mut rng),
    };

    let mut convergence = Convergence::IterationCap {
        iterations: max_iterations,
    };

    for iteration in 1..=max_iterations {
        let labels = assign(points, &centroids);

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &(idx, _)) in points.iter().zip(&labels) {
            sums[idx][0] += p[0];
            sums[idx][1] += p[1];
            sums[idx][2] += p[2];
            counts[idx] += 1;
        }

        let mut shift = 0.0;
        for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count == 0 {
                continue;
            }
            let n = count as f64;
            let updated = [sum[0] / n, sum[1] / n, sum[2] / n];
            shift += squared_distance(centroid, &updated);
            *centroid = updated;
        }

        if shift <= tolerance {
            convergence = Convergence::Converged {
                iterations: iteration,
            };
            break;
        }
    }

    let (counts, inertia) = tally(points, &centroids);
    debug!(seed, ?convergence, inertia, "lloyd run finished");

    ClusterRun {
        centroids,
        counts,
        inertia,
        convergence,
    }
}
