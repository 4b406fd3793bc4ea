use image::{
    DynamicImage, GenericImageView, GrayAlphaImage, GrayImage, RgbImage, RgbaImage,
    imageops::{self, FilterType},
};
use palette::Srgb;
use tracing::debug;

use crate::config::SampleFilter;
use crate::error::{ExtractionError, Result};

/// One pixel's colour, 0–255 per channel.
pub type ColorSample = Srgb<u8>;

/// Build a `DynamicImage` from a raw height×width×channels grid.
///
/// Channel layouts: 1 = grey, 2 = grey + alpha, 3 = RGB, 4 = RGBA.
pub fn image_from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(ExtractionError::invalid_input(format!(
            "image has zero dimension ({width}x{height})"
        )));
    }

    let expected = width as usize * height as usize * channels as usize;
    if data.len() != expected {
        return Err(ExtractionError::invalid_input(format!(
            "pixel buffer length {} does not match {width}x{height}x{channels}",
            data.len()
        )));
    }

    let image = match channels {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        _ => {
            return Err(ExtractionError::invalid_input(format!(
                "{channels} channels cannot be mapped to RGB"
            )));
        }
    };

    image.ok_or_else(|| ExtractionError::invalid_input("pixel buffer rejected by image"))
}

/// Flatten `image` into exactly `target_width * target_height` colour samples,
/// shrinking with [`SampleFilter::Triangle`].
pub fn sample(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> Result<Vec<ColorSample>> {
    sample_with_filter(image, target_width, target_height, SampleFilter::Triangle)
}

/// Same as [`sample`] with an explicit shrinking filter.
///
/// Every pixel is first reduced to RGB (alpha is dropped, grey is expanded),
/// then the grid is resampled to the target size. Shrinking uses `filter`;
/// when the image already fits inside the target it is replicated with
/// nearest-neighbour so that no blended colours appear.
pub fn sample_with_filter(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: SampleFilter,
) -> Result<Vec<ColorSample>> {
    let (in_w, in_h) = image.dimensions();
    if in_w == 0 || in_h == 0 {
        return Err(ExtractionError::invalid_input(format!(
            "image has zero dimension ({in_w}x{in_h})"
        )));
    }
    if target_width == 0 || target_height == 0 {
        return Err(ExtractionError::invalid_parameter(
            "sample_size",
            format!("{target_width}x{target_height}"),
            "both dimensions must be at least 1",
        ));
    }

    let rgb = image.to_rgb8();

    // Fast path – no scaling required.
    let resized = if in_w == target_width && in_h == target_height {
        rgb
    } else {
        let filter_type = if in_w <= target_width && in_h <= target_height {
            FilterType::Nearest
        } else {
            filter.into()
        };
        debug!(
            from = ?(in_w, in_h),
            to = ?(target_width, target_height),
            filter = ?filter_type,
            "resampling image"
        );
        imageops::resize(&rgb, target_width, target_height, filter_type)
    };

    Ok(resized
        .pixels()
        .map(|p| Srgb::new(p.0[0], p.0[1], p.0[2]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn output_length_matches_target() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(37, 11, Rgb([1, 2, 3])));
        for (w, h) in [(200, 200), (5, 7), (37, 11), (1, 1)] {
            let samples = sample(&img, w, h).unwrap();
            assert_eq!(samples.len(), (w * h) as usize);
        }
    }

    #[test]
    fn alpha_is_dropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0])));
        let samples = sample(&img, 4, 4).unwrap();
        assert!(samples.iter().all(|s| *s == Srgb::new(10, 20, 30)));
    }

    #[test]
    fn grey_is_expanded() {
        let img = image_from_raw(2, 2, 1, vec![7; 4]).unwrap();
        let samples = sample_with_filter(&img, 2, 2, SampleFilter::Nearest).unwrap();
        assert!(samples.iter().all(|s| *s == Srgb::new(7, 7, 7)));
    }

    #[test]
    fn enlarging_keeps_source_colours_and_proportions() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let samples = sample_with_filter(&DynamicImage::ImageRgb8(img), 200, 200, SampleFilter::Lanczos3).unwrap();

        let black = samples.iter().filter(|s| **s == Srgb::new(0, 0, 0)).count();
        let white = samples.iter().filter(|s| **s == Srgb::new(255, 255, 255)).count();
        assert_eq!(black, 20_000);
        assert_eq!(white, 20_000);
    }

    #[test]
    fn default_filter_matches_triangle() {
        let mut img = RgbImage::new(9, 9);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 28) as u8, (y * 28) as u8, 90]);
        }
        let img = DynamicImage::ImageRgb8(img);
        assert_eq!(
            sample(&img, 4, 4).unwrap(),
            sample_with_filter(&img, 4, 4, SampleFilter::Triangle).unwrap()
        );
    }

    #[test]
    fn zero_dimension_is_invalid_input() {
        let img = DynamicImage::new_rgb8(0, 5);
        let err = sample(&img, 10, 10).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn zero_target_is_invalid_parameter() {
        let img = DynamicImage::new_rgb8(3, 3);
        let err = sample(&img, 0, 10).unwrap_err();
        assert!(err.is_parameter_error());
    }

    #[test]
    fn raw_buffers_are_checked() {
        assert!(image_from_raw(2, 2, 3, vec![0; 12]).is_ok());
        assert!(image_from_raw(2, 2, 4, vec![0; 16]).is_ok());
        assert!(image_from_raw(2, 2, 2, vec![0; 8]).is_ok());

        assert!(image_from_raw(2, 2, 3, vec![0; 11]).unwrap_err().is_input_error());
        assert!(image_from_raw(0, 2, 3, vec![]).unwrap_err().is_input_error());
        assert!(image_from_raw(1, 1, 5, vec![0; 5]).unwrap_err().is_input_error());
    }
}
