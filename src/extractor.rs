use palette::Srgb;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::engine;
use crate::error::{ExtractionError, Result};
use crate::kmeans::{Convergence, Point};
use crate::sampler::ColorSample;

/// One ranked palette colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// `#rrggbb`, lowercase
    pub color_code: String,
    /// Share of the samples in this cluster, 0–100
    pub percentage: f64,
    /// Number of member samples
    pub count: usize,
}

impl PaletteEntry {
    /// Parse the colour code back into an sRGB triple.
    pub fn color(&self) -> Option<Srgb<u8>> {
        self.color_code.parse().ok()
    }
}

/// Ranked palette plus clustering diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub entries: Vec<PaletteEntry>,
    pub convergence: Convergence,
    /// Sum of squared distances from each sample to its centroid
    pub inertia: f64,
    pub sample_count: usize,
}

/// Round, clamp and format a centroid as `#rrggbb`.
pub fn encode_color(centroid: [f64; 3]) -> String {
    let [r, g, b] = centroid.map(|c| {
        let c = if c.is_nan() { 0.0 } else { c };
        c.round().clamp(0.0, 255.0) as u8
    });
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Order cluster indices by descending member count; equal counts keep
/// ascending cluster index.
fn rank(counts: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    order
}

fn build_entries(centroids: &[Point], counts: &[usize], total: usize) -> Vec<PaletteEntry> {
    rank(counts)
        .into_iter()
        .map(|idx| PaletteEntry {
            color_code: encode_color(centroids[idx]),
            percentage: counts[idx] as f64 / total as f64 * 100.0,
            count: counts[idx],
        })
        .collect()
}

/// Clusters colour samples into a ranked palette.
#[derive(Debug, Clone, Default)]
pub struct PaletteExtractor {
    config: ExtractorConfig,
}

impl PaletteExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Ranked palette only.
    pub fn extract(&self, samples: &[ColorSample]) -> Result<Vec<PaletteEntry>> {
        self.extract_detailed(samples).map(|e| e.entries)
    }

    /// Cluster `samples` into `num_colors` entries sorted by descending share.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the configuration is invalid or `num_colors`
    /// exceeds the number of samples.
    pub fn extract_detailed(&self, samples: &[ColorSample]) -> Result<Extraction> {
        self.config.validate()?;

        let k = self.config.num_colors;
        if k > samples.len() {
            return Err(ExtractionError::invalid_parameter(
                "num_colors",
                k,
                format!("only {} samples are available", samples.len()),
            ));
        }

        let run = engine::cluster(samples, &self.config);

        match run.convergence {
            Convergence::IterationCap { iterations } => warn!(
                iterations,
                "clustering hit the iteration cap before converging"
            ),
            Convergence::Converged { iterations } => debug!(iterations, "clustering converged"),
            Convergence::Delegated => {}
        }

        Ok(Extraction {
            entries: build_entries(&run.centroids, &run.counts, samples.len()),
            convergence: run.convergence,
            inertia: run.inertia,
            sample_count: samples.len(),
        })
    }
}

/// Cluster `samples` into `k` colours with the default configuration.
pub fn extract(samples: &[ColorSample], k: usize) -> Result<Vec<PaletteEntry>> {
    PaletteExtractor::new(ExtractorConfig::default().with_num_colors(k)).extract(samples)
}
