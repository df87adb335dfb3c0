mod compare;
mod render;

pub use compare::{compare_images, generate_diff_image, CompareResult};
pub use render::{render, render_pair, DrawFn, ScenePair};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisualTestError {
    #[error("Failed to compare images: {0}")]
    Compare(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, VisualTestError>;

/// Similarity required for a pair to count as the same picture
pub const DEFAULT_THRESHOLD: f64 = 0.999;

/// Result of a visual test
pub struct VisualTestResult {
    /// Whether the test passed (similarity >= threshold)
    pub passed: bool,
    /// The similarity score (0.0 to 1.0)
    pub similarity: f64,
    pub differing_pixels: usize,
    /// Path to diff image (if generated on failure)
    pub diff_path: Option<PathBuf>,
}

/// Get the path to the references directory
pub fn references_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("references")
}

/// Get the path to the output directory for test artifacts
pub fn output_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("output")
}

/// Get the path to a diff image
pub fn diff_path(scene_name: &str) -> PathBuf {
    output_dir().join(format!("{}_diff.png", scene_name))
}

/// Render both sides of `pair` and compare them
pub fn run_visual_test(pair: &ScenePair, similarity_threshold: f64) -> Result<VisualTestResult> {
    let (expected, actual) = render_pair(pair);

    if should_update_references() {
        save_references(pair.name, &expected, &actual)?;
    }

    let compare_result = compare_images(&expected, &actual)?;
    let passed = compare_result.similarity >= similarity_threshold;

    // Generate diff if failed
    let diff = if !passed {
        std::fs::create_dir_all(output_dir())?;
        let diff_file = diff_path(pair.name);
        generate_diff_image(&expected, &actual, &diff_file)?;
        Some(diff_file)
    } else {
        None
    };

    Ok(VisualTestResult {
        passed,
        similarity: compare_result.similarity,
        differing_pixels: compare_result.differing_pixels,
        diff_path: diff,
    })
}

/// Keep both renders of a scene for inspection
fn save_references(name: &str, expected: &image::RgbaImage, actual: &image::RgbaImage) -> Result<()> {
    std::fs::create_dir_all(references_dir())?;
    let expected_path = references_dir().join(format!("{}_expected.png", name));
    let actual_path = references_dir().join(format!("{}_actual.png", name));
    expected.save(&expected_path)?;
    actual.save(&actual_path)?;
    println!("Updated reference: {}", expected_path.display());
    Ok(())
}

/// Check if we're in update references mode
pub fn should_update_references() -> bool {
    std::env::var("UPDATE_REFERENCES").is_ok()
}
