use etcher::prelude::*;
use image::RgbaImage;

/// Drawing code run against a fresh surface.
pub type DrawFn = fn(&mut dyn GraphicsDriver);

/// Two ways of drawing the same picture.
pub struct ScenePair {
    /// Name used for the files written next to the test run
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    /// The picture as drawn through a dedicated primitive
    pub expected: DrawFn,
    /// The same picture built another way
    pub actual: DrawFn,
}

/// Render `draw` onto a white raster surface.
pub fn render(width: u32, height: u32, draw: DrawFn) -> RgbaImage {
    let mut driver = RasterDriver::new(width, height);
    draw(&mut driver);
    if let Some(err) = driver.take_error() {
        eprintln!("driver reported: {}", err);
    }
    driver.into_image()
}

/// Render both sides of a pair.
pub fn render_pair(pair: &ScenePair) -> (RgbaImage, RgbaImage) {
    (
        render(pair.width, pair.height, pair.expected),
        render(pair.width, pair.height, pair.actual),
    )
}
