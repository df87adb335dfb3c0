use crate::{Result, VisualTestError};
use image::{Rgba, RgbaImage};
use image_compare::Algorithm;
use std::path::Path;

/// Result of comparing two images
pub struct CompareResult {
    /// Similarity score from 0.0 to 1.0
    pub similarity: f64,
    /// Number of pixels that differ at all
    pub differing_pixels: usize,
}

/// Compare two renders using the SSIM algorithm
pub fn compare_images(expected: &RgbaImage, actual: &RgbaImage) -> Result<CompareResult> {
    if expected.dimensions() != actual.dimensions() {
        return Err(VisualTestError::Compare(format!(
            "Image dimensions don't match: expected {:?} vs actual {:?}",
            expected.dimensions(),
            actual.dimensions()
        )));
    }

    let differing_pixels = expected
        .pixels()
        .zip(actual.pixels())
        .filter(|(a, b)| a != b)
        .count();

    // SSIM works on grayscale or RGB
    let expected_rgb = image::DynamicImage::ImageRgba8(expected.clone()).to_rgb8();
    let actual_rgb = image::DynamicImage::ImageRgba8(actual.clone()).to_rgb8();
    let result =
        image_compare::rgb_similarity_structure(&Algorithm::MSSIMSimple, &expected_rgb, &actual_rgb)
            .map_err(|e| VisualTestError::Compare(format!("SSIM comparison failed: {}", e)))?;

    Ok(CompareResult {
        similarity: result.score,
        differing_pixels,
    })
}

/// Write an image highlighting the differences between two renders
pub fn generate_diff_image(expected: &RgbaImage, actual: &RgbaImage, output: &Path) -> Result<()> {
    let (width, height) = expected.dimensions();
    let mut diff_img = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let exp_pixel = expected.get_pixel(x, y);
            let act_pixel = actual.get_pixel(x, y);

            let diff = pixel_difference(exp_pixel, act_pixel);

            if diff > 10 {
                // Highlight differences in red
                let intensity = (diff as f32 / 255.0 * 200.0 + 55.0) as u8;
                diff_img.put_pixel(x, y, Rgba([intensity, 0, 0, 255]));
            } else {
                // Show original with reduced opacity
                let r = (act_pixel[0] as u16 / 3) as u8;
                let g = (act_pixel[1] as u16 / 3) as u8;
                let b = (act_pixel[2] as u16 / 3) as u8;
                diff_img.put_pixel(x, y, Rgba([r, g, b, 255]));
            }
        }
    }

    diff_img.save(output)?;
    Ok(())
}

/// Calculate the maximum channel difference between two pixels
fn pixel_difference(a: &Rgba<u8>, b: &Rgba<u8>) -> u8 {
    let dr = (a[0] as i16 - b[0] as i16).unsigned_abs() as u8;
    let dg = (a[1] as i16 - b[1] as i16).unsigned_abs() as u8;
    let db = (a[2] as i16 - b[2] as i16).unsigned_abs() as u8;
    dr.max(dg).max(db)
}
