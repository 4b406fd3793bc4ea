//! Dispatch between the built-in Lloyd iteration and `kmeans_colors`.

use std::collections::HashSet;

use kmeans_colors::get_kmeans;
use palette::Srgb;
use tracing::{debug, warn};

use crate::config::{Engine, ExtractorConfig};
use crate::kmeans::{self, ClusterRun, Convergence, Point};
use crate::sampler::ColorSample;

const CHANNEL_MAX: f64 = 255.0;

pub(crate) fn to_points(samples: &[ColorSample]) -> Vec<Point> {
    samples
        .iter()
        .map(|s| [s.red as f64, s.green as f64, s.blue as f64])
        .collect()
}

/// True once `k` distinct colours have been seen.
fn has_distinct_colors(samples: &[ColorSample], k: usize) -> bool {
    let mut seen = HashSet::with_capacity(k);
    for s in samples {
        seen.insert((s.red, s.green, s.blue));
        if seen.len() >= k {
            return true;
        }
    }
    false
}

/// Cluster `samples` into `config.num_colors` groups.
///
/// `config` must already be validated and `num_colors` must not exceed the
/// number of samples.
pub(crate) fn cluster(samples: &[ColorSample], config: &ExtractorConfig) -> ClusterRun {
    let k = config.num_colors;
    let points = to_points(samples);

    let engine = match config.engine {
        Engine::KmeansColors if !has_distinct_colors(samples, k) => {
            warn!(
                k,
                "fewer distinct colours than clusters, using the built-in engine"
            );
            Engine::Lloyd
        }
        engine => engine,
    };

    best_of(config.runs, config.seed, |seed| match engine {
        Engine::Lloyd => kmeans::lloyd(
            &points,
            k,
            config.initializer,
            config.max_iterations,
            config.tolerance,
            seed,
        ),
        Engine::KmeansColors => kmeans_colors_run(samples, &points, config, seed),
    })
}

/// Run `runs` restarts and keep the one with the lowest inertia. The earliest
/// run wins on ties.
fn best_of(runs: usize, seed: u64, mut run: impl FnMut(u64) -> ClusterRun) -> ClusterRun {
    let mut best = run(seed);
    for i in 1..runs {
        let candidate = run(seed.wrapping_add(i as u64));
        debug!(
            run = i,
            inertia = candidate.inertia,
            best = best.inertia,
            "restart finished"
        );
        if candidate.inertia < best.inertia {
            best = candidate;
        }
    }
    best
}

// ------------------------------------------------------------
// kmeans_colors backend
// ------------------------------------------------------------

/// One `get_kmeans` run on `Srgb<f32>` (channels in 0–1).
///
/// The crate assigns before it recalculates, so its labels belong to the
/// previous centroids; counts are re-tallied against the returned ones. Any
/// cluster left empty is moved onto the farthest sample instead of keeping
/// the crate's random replacement colour. The tolerance is rescaled from
/// 0–255 units to the crate's 0–1 space, and the cap is lowered by one
/// because `get_kmeans` runs one round before checking it.
fn kmeans_colors_run(
    samples: &[ColorSample],
    points: &[Point],
    config: &ExtractorConfig,
    seed: u64,
) -> ClusterRun {
    let buf: Vec<Srgb<f32>> = samples.iter().map(|s| s.into_format::<f32>()).collect();
    let converge = (config.tolerance / (CHANNEL_MAX * CHANNEL_MAX)) as f32;

    let result = get_kmeans(
        config.num_colors,
        config.max_iterations.saturating_sub(1),
        converge,
        false,
        &buf,
        seed,
    );

    let mut centroids: Vec<Point> = result
        .centroids
        .iter()
        .map(|c| {
            [
                c.red as f64 * CHANNEL_MAX,
                c.green as f64 * CHANNEL_MAX,
                c.blue as f64 * CHANNEL_MAX,
            ]
        })
        .collect();

    let (counts, inertia) = kmeans::reseed_empty(points, &mut centroids);

    debug!(seed, score = result.score, inertia, "kmeans_colors run finished");

    ClusterRun {
        centroids,
        counts,
        inertia,
        convergence: Convergence::Delegated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(dark: usize, light: usize) -> Vec<ColorSample> {
        std::iter::repeat_n(Srgb::new(20, 30, 40), dark)
            .chain(std::iter::repeat_n(Srgb::new(220, 210, 200), light))
            .collect()
    }

    #[test]
    fn distinct_colour_check() {
        let samples = two_tone(3, 3);
        assert!(has_distinct_colors(&samples, 2));
        assert!(!has_distinct_colors(&samples, 3));
    }

    #[test]
    fn lloyd_engine_counts_cover_all_samples() {
        let samples = two_tone(12, 4);
        let config = ExtractorConfig::default().with_num_colors(2);
        let run = cluster(&samples, &config);

        let mut counts = run.counts.clone();
        counts.sort_unstable();
        assert_eq!(counts, vec![4, 12]);
    }

    #[test]
    fn kmeans_colors_engine_recovers_two_tones() {
        let samples = two_tone(12, 4);
        let config = ExtractorConfig::default()
            .with_num_colors(2)
            .with_engine(Engine::KmeansColors);
        let run = cluster(&samples, &config);

        assert_eq!(run.convergence, Convergence::Delegated);
        assert_eq!(run.counts.iter().sum::<usize>(), 16);
        for (centroid, &count) in run.centroids.iter().zip(&run.counts) {
            let expected = if count == 12 {
                [20.0, 30.0, 40.0]
            } else {
                [220.0, 210.0, 200.0]
            };
            assert!(kmeans::squared_distance(centroid, &expected) < 1.0);
        }
    }

    #[test]
    fn kmeans_colors_counts_belong_to_returned_centroids() {
        let samples: Vec<ColorSample> = (0..1600u32)
            .map(|i| {
                Srgb::new(
                    (i % 40 * 6) as u8,
                    (i / 40 * 6) as u8,
                    ((i * 7) % 256) as u8,
                )
            })
            .collect();
        let config = ExtractorConfig::default()
            .with_num_colors(8)
            .with_max_iterations(1)
            .with_engine(Engine::KmeansColors);
        let run = cluster(&samples, &config);

        let (counts, inertia) = kmeans::tally(&to_points(&samples), &run.centroids);
        assert_eq!(run.counts, counts);
        assert!((run.inertia - inertia).abs() < 1e-6);
        assert_eq!(run.counts.iter().sum::<usize>(), 1600);
    }

    #[test]
    fn kmeans_colors_engine_falls_back_on_solid_input() {
        let samples = two_tone(10, 0);
        let config = ExtractorConfig::default()
            .with_num_colors(3)
            .with_engine(Engine::KmeansColors);
        let run = cluster(&samples, &config);

        assert_ne!(run.convergence, Convergence::Delegated);
        assert_eq!(run.counts.iter().sum::<usize>(), 10);
    }

    #[test]
    fn more_runs_never_worsen_inertia() {
        let samples: Vec<ColorSample> = (0..=255u8)
            .map(|v| Srgb::new(v, v.wrapping_mul(3), 255 - v))
            .collect();
        let single = cluster(&samples, &ExtractorConfig::default().with_num_colors(6));
        let many = cluster(
            &samples,
            &ExtractorConfig::default().with_num_colors(6).with_runs(5),
        );
        assert!(many.inertia <= single.inertia);
    }
}
