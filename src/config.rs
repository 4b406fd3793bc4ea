//! Tunable parameters for sampling and clustering.
//!
//! The defaults reproduce the classic behaviour: a 200×200 sample grid,
//! ten colours, k-means++ seeding and a 300 iteration cap. A configuration
//! can also be loaded from JSON; missing fields fall back to the defaults.
//!
//! ```no_run
//! use image_palette::ExtractorConfig;
//! use std::path::Path;
//!
//! let config = ExtractorConfig::from_json_file(Path::new("palette.json"))?
//!     .with_seed(7);
//! # Ok::<(), image_palette::ExtractionError>(())
//! ```

use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

pub const DEFAULT_NUM_COLORS: usize = 10;
pub const DEFAULT_SAMPLE_SIZE: u32 = 200;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Resampling filter used when the sampler shrinks an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<SampleFilter> for FilterType {
    fn from(filter: SampleFilter) -> Self {
        match filter {
            SampleFilter::Nearest => FilterType::Nearest,
            SampleFilter::Triangle => FilterType::Triangle,
            SampleFilter::CatmullRom => FilterType::CatmullRom,
            SampleFilter::Gaussian => FilterType::Gaussian,
            SampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// How the initial centroids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Distance-weighted seeding (k-means++).
    KMeansPlusPlus,
    /// `k` samples at distinct random positions.
    RandomSamples,
}

/// Which clustering implementation runs the iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Built-in Lloyd iteration in 0–255 RGB space.
    Lloyd,
    /// `kmeans_colors::get_kmeans` on `Srgb<f32>`.
    KmeansColors,
}

/// Complete configuration of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Number of palette entries (k)
    pub num_colors: usize,

    /// Width of the sample grid
    pub sample_width: u32,

    /// Height of the sample grid
    pub sample_height: u32,

    /// Filter used when shrinking to the sample grid
    pub filter: SampleFilter,

    /// Iteration cap; the clustering always stops after this many rounds
    pub max_iterations: usize,

    /// Convergence threshold on the summed squared centroid shift
    pub tolerance: f64,

    /// Seed for centroid initialisation
    pub seed: u64,

    /// Independent restarts; the lowest inertia wins
    pub runs: usize,

    pub initializer: Initializer,

    pub engine: Engine,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            num_colors: DEFAULT_NUM_COLORS,
            sample_width: DEFAULT_SAMPLE_SIZE,
            sample_height: DEFAULT_SAMPLE_SIZE,
            filter: SampleFilter::Triangle,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: 0,
            runs: 1,
            initializer: Initializer::KMeansPlusPlus,
            engine: Engine::Lloyd,
        }
    }
}

impl ExtractorConfig {
    pub fn with_num_colors(mut self, num_colors: usize) -> Self {
        self.num_colors = num_colors;
        self
    }

    pub fn with_sample_size(mut self, width: u32, height: u32) -> Self {
        self.sample_width = width;
        self.sample_height = height;
        self
    }

    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = initializer;
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Number of samples the sampler will produce.
    pub fn sample_count(&self) -> usize {
        self.sample_width as usize * self.sample_height as usize
    }

    /// Check every parameter that does not depend on the samples.
    ///
    /// `num_colors` against the actual sample count is checked by the
    /// extractor, since raw samples can come from anywhere.
    pub fn validate(&self) -> Result<()> {
        if self.num_colors == 0 {
            return Err(ExtractionError::invalid_parameter(
                "num_colors",
                self.num_colors,
                "must be at least 1",
            ));
        }
        if self.sample_width == 0 || self.sample_height == 0 {
            return Err(ExtractionError::invalid_parameter(
                "sample_size",
                format!("{}x{}", self.sample_width, self.sample_height),
                "both dimensions must be at least 1",
            ));
        }
        if self.max_iterations == 0 {
            return Err(ExtractionError::invalid_parameter(
                "max_iterations",
                self.max_iterations,
                "must be at least 1",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ExtractionError::invalid_parameter(
                "tolerance",
                self.tolerance,
                "must be a finite, non-negative number",
            ));
        }
        if self.runs == 0 {
            return Err(ExtractionError::invalid_parameter(
                "runs",
                self.runs,
                "must be at least 1",
            ));
        }
        if self.engine == Engine::KmeansColors && self.num_colors > 256 {
            return Err(ExtractionError::invalid_parameter(
                "num_colors",
                self.num_colors,
                "the kmeans_colors engine supports at most 256 clusters",
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExtractionError::config("malformed configuration JSON", e))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ExtractionError::config(format!("cannot read {}", path.display()), e))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExtractionError::config("cannot serialise configuration", e))
    }
}
