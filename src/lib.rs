//! Dominant colour palette extraction.
//!
//! An image is reduced to a fixed grid of RGB samples, the samples are
//! clustered with k-means, and each cluster is reported as a `#rrggbb` code
//! with its share of the image, largest share first.
//!
//! ```no_run
//! let img = image::open("photo.jpg").expect("decodable image");
//! for entry in image_palette::extract_palette(&img, 10)? {
//!     println!("{} {:.2}%", entry.color_code, entry.percentage);
//! }
//! # Ok::<(), image_palette::ExtractionError>(())
//! ```

use image::DynamicImage;
use tracing::debug;

pub mod config;
mod engine;
pub mod error;
pub mod extractor;
mod kmeans;
pub mod sampler;

pub use config::{Engine, ExtractorConfig, Initializer, SampleFilter, DEFAULT_NUM_COLORS};
pub use error::{ExtractionError, Result};
pub use extractor::{encode_color, extract, Extraction, PaletteEntry, PaletteExtractor};
pub use kmeans::Convergence;
pub use sampler::{image_from_raw, sample, sample_with_filter, ColorSample};

// ------------------------------------------------------------
// Entry points
// ------------------------------------------------------------

/// Extract `num_colors` dominant colours from a decoded image.
///
/// Uses the default 200×200 sample grid and a fixed seed, so repeated calls
/// on the same image give identical results.
pub fn extract_palette(image: &DynamicImage, num_colors: usize) -> Result<Vec<PaletteEntry>> {
    extract_palette_with(image, &ExtractorConfig::default().with_num_colors(num_colors))
        .map(|e| e.entries)
}

/// Sample and cluster `image` according to `config`.
///
/// # Errors
///
/// - `InvalidInput` if the image has a zero dimension
/// - `InvalidParameter` if `config` is invalid or asks for more colours than
///   there are samples
pub fn extract_palette_with(image: &DynamicImage, config: &ExtractorConfig) -> Result<Extraction> {
    config.validate()?;

    // ----------------------
    // 1. Sample
    // ----------------------
    let samples = sample_with_filter(
        image,
        config.sample_width,
        config.sample_height,
        config.filter,
    )?;
    debug!(samples = samples.len(), k = config.num_colors, "sampled image");

    // ----------------------
    // 2. Cluster and rank
    // ----------------------
    PaletteExtractor::new(config.clone()).extract_detailed(&samples)
}
