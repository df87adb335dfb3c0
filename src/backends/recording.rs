//! A backend that records what reaches the device instead of drawing it.

use image::{imageops, RgbaImage};

use crate::clip::{IRect, Region};
use crate::color::Color;
use crate::driver::{DriverFeatures, DriverState, GraphicsDriver, Pixels};
use crate::font::{Font, FontDescriptor, FontMetrics};
use crate::line_style::LineStyle;
use crate::vertex::DevicePoint;

/// A single device operation, in device coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Points {
        points: Vec<DevicePoint>,
        color: Color,
    },
    Polyline {
        points: Vec<DevicePoint>,
        color: Color,
        style: LineStyle,
    },
    Polygon {
        points: Vec<DevicePoint>,
        contour_ends: Vec<usize>,
        color: Color,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        angle: f64,
        font: Font,
        size: u32,
        color: Color,
    },
    /// Copied pixels, already cut to the blitted rectangle.
    Image {
        x: i32,
        y: i32,
        pixels: RgbaImage,
    },
    /// The clip the device was switched to.
    Clip(Option<Region>),
}

#[derive(Debug, Default)]
pub struct RecordingDriver {
    state: DriverState,
    commands: Vec<DrawCommand>,
    /// Advance per character; `None` behaves like a backend without fonts.
    advance: Option<f64>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report fonts with a fixed advance per character, an ascent of 0.8
    /// and a descent of 0.2 times the size.
    pub fn with_fixed_advance(advance: f64) -> Self {
        Self {
            advance: Some(advance),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl GraphicsDriver for RecordingDriver {
    fn state(&self) -> &DriverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DriverState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "RecordingDriver"
    }

    fn features(&self) -> DriverFeatures {
        DriverFeatures::PRINTER | DriverFeatures::ALPHA_BLENDING
    }

    fn raster_points(&mut self, points: &[DevicePoint]) {
        self.commands.push(DrawCommand::Points {
            points: points.to_vec(),
            color: self.state.color(),
        });
    }

    fn raster_polyline(&mut self, points: &[DevicePoint]) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color: self.state.color(),
            style: self.state.line_style().clone(),
        });
    }

    fn raster_polygon(&mut self, points: &[DevicePoint], contour_ends: &[usize]) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            contour_ends: contour_ends.to_vec(),
            color: self.state.color(),
        });
    }

    fn apply_clip(&mut self) {
        self.commands
            .push(DrawCommand::Clip(self.state.clip_region().cloned()));
    }

    fn raster_text(&mut self, text: &str, x: f64, y: f64, angle: f64) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            angle,
            font: self.state.font(),
            size: self.state.size(),
            color: self.state.color(),
        });
    }

    fn load_font(&mut self, _face: Font, size: u32) -> Option<FontMetrics> {
        self.advance.map(|_| {
            let size = size as f64;
            FontMetrics {
                ascent: size * 0.8,
                descent: size * 0.2,
                line_height: size,
            }
        })
    }

    fn measure_text(&mut self, _descriptor: &FontDescriptor, text: &str) -> f64 {
        self.advance
            .map_or(0.0, |advance| advance * text.chars().count() as f64)
    }

    fn blit(&mut self, pixels: Pixels<'_>, src: IRect, dest_x: i32, dest_y: i32) {
        let cut = match self.state.resolve(&pixels) {
            Ok(source) => imageops::crop_imm(
                source,
                src.x as u32,
                src.y as u32,
                src.w as u32,
                src.h as u32,
            )
            .to_image(),
            Err(err) => {
                self.state.report(err);
                return;
            }
        };
        self.commands.push(DrawCommand::Image {
            x: dest_x,
            y: dest_y,
            pixels: cut,
        });
    }
}
