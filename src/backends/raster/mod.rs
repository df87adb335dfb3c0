//! Software backend drawing into an RGBA pixel buffer.

pub mod scanline;
pub mod text;

use image::{Rgba, RgbaImage};

use crate::clip::{IRect, Region};
use crate::color::Color;
use crate::driver::geometry::rect_as_path;
use crate::driver::{DriverFeatures, DriverState, GraphicsDriver, Pixels};
use crate::font::{Font, FontDescriptor, FontMetrics};
use crate::line_style::{LineCap, LineJoin, LineStyle};
use crate::vertex::DevicePoint;

use scanline::{clip_segment, dash_polyline, fill_polygon, line_pixels, DashWalker};

/// Longest miter, in half line widths, before a join falls back to a bevel.
const MITER_LIMIT: f64 = 4.0;

fn blend(dst: &mut [u8; 4], src: Color) {
    match src.a {
        0 => {}
        255 => *dst = src.to_array(),
        a => {
            let a = a as u32;
            let inv = 255 - a;
            let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;
            dst[0] = mix(src.r, dst[0]);
            dst[1] = mix(src.g, dst[1]);
            dst[2] = mix(src.b, dst[2]);
            dst[3] = (a + (dst[3] as u32 * inv + 127) / 255) as u8;
        }
    }
}

/// The pixel buffer plus clipped pixel writes.
#[derive(Debug)]
struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    fn bounds(&self) -> IRect {
        IRect::new(0, 0, self.pixels.width() as i32, self.pixels.height() as i32)
    }

    fn row_mut(&mut self, y: i32) -> &mut [[u8; 4]] {
        let width = self.pixels.width() as usize;
        let all: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut *self.pixels);
        &mut all[y as usize * width..(y as usize + 1) * width]
    }

    fn span_in(&mut self, y: i32, x0: i32, x1: i32, color: Color, rect: &IRect) {
        if y < rect.y || y >= rect.bottom() {
            return;
        }
        let (a, b) = (x0.max(rect.x), x1.min(rect.right()));
        if a >= b {
            return;
        }
        for px in &mut self.row_mut(y)[a as usize..b as usize] {
            blend(px, color);
        }
    }

    /// Blend `color` over `[x0, x1)` of row `y`, honouring the clip.
    fn span(&mut self, y: i32, x0: i32, x1: i32, color: Color, clip: Option<&Region>) {
        let bounds = self.bounds();
        match clip {
            None => self.span_in(y, x0, x1, color, &bounds),
            Some(region) => {
                for rect in region.rects() {
                    if let Some(visible) = rect.intersect(&bounds) {
                        self.span_in(y, x0, x1, color, &visible);
                    }
                }
            }
        }
    }

    fn plot(&mut self, x: i32, y: i32, color: Color, clip: Option<&Region>) {
        self.span(y, x, x.saturating_add(1), color, clip);
    }

    fn fill(&mut self, color: Color) {
        let all: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut *self.pixels);
        all.fill(color.to_array());
    }
}

/// Pixels covered by one wide stroke, so overlapping pieces blend once.
struct CoverageMask {
    area: IRect,
    bits: Vec<bool>,
}

impl CoverageMask {
    fn new(area: IRect) -> Self {
        Self {
            area,
            bits: vec![false; area.area() as usize],
        }
    }

    fn fill(&mut self, points: &[DevicePoint]) {
        let area = self.area;
        let bits = &mut self.bits;
        fill_polygon(points, &[], area.y..area.bottom(), |y, x0, x1| {
            let (a, b) = (x0.max(area.x), x1.min(area.right()));
            let row = ((y - area.y) * area.w) as usize;
            for x in a..b {
                bits[row + (x - area.x) as usize] = true;
            }
        });
    }

    fn spans(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        let area = self.area;
        (0..area.h).flat_map(move |row| {
            let bits = &self.bits[(row * area.w) as usize..((row + 1) * area.w) as usize];
            let mut runs = Vec::new();
            let mut start = None;
            for (i, &on) in bits.iter().chain(std::iter::once(&false)).enumerate() {
                match (on, start) {
                    (true, None) => start = Some(i as i32),
                    (false, Some(s)) => {
                        runs.push((area.y + row, area.x + s, area.x + i as i32));
                        start = None;
                    }
                    _ => {}
                }
            }
            runs
        })
    }
}

fn disk(cx: f64, cy: f64, r: f64) -> Vec<DevicePoint> {
    let n = ((r * 4.0).ceil() as usize).max(8);
    (0..n)
        .map(|i| {
            let t = i as f64 * std::f64::consts::TAU / n as f64;
            DevicePoint::new(cx + r * t.cos(), cy + r * t.sin())
        })
        .collect()
}

fn unit_normal((ax, ay): (f64, f64), (bx, by): (f64, f64)) -> Option<(f64, f64)> {
    let len = (bx - ax).hypot(by - ay);
    (len > 0.0).then(|| (-(by - ay) / len, (bx - ax) / len))
}

/// Outline polygons of a wide stroke along `piece`.
fn stroke_shapes(piece: &[(f64, f64)], style: &LineStyle) -> Vec<Vec<DevicePoint>> {
    let hw = style.effective_width() as f64 / 2.0;
    let mut shapes = Vec::new();
    let mut pts = piece.to_vec();
    pts.dedup();
    if pts.is_empty() {
        return shapes;
    }
    if pts.len() == 1 {
        let (x, y) = pts[0];
        if style.cap == LineCap::Round {
            shapes.push(disk(x, y, hw));
        } else {
            shapes.push(
                [(x - hw, y - hw), (x + hw, y - hw), (x + hw, y + hw), (x - hw, y + hw)]
                    .map(DevicePoint::from)
                    .to_vec(),
            );
        }
        return shapes;
    }

    if style.cap == LineCap::Square {
        let last = pts.len() - 1;
        for (end, prev) in [(0, 1), (last, last - 1)] {
            let (ex, ey) = pts[end];
            let (px, py) = pts[prev];
            let len = (ex - px).hypot(ey - py);
            pts[end] = (ex + (ex - px) / len * hw, ey + (ey - py) / len * hw);
        }
    }

    for seg in pts.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        if let Some((nx, ny)) = unit_normal(a, b) {
            let (ox, oy) = (nx * hw, ny * hw);
            shapes.push(
                [
                    (a.0 + ox, a.1 + oy),
                    (b.0 + ox, b.1 + oy),
                    (b.0 - ox, b.1 - oy),
                    (a.0 - ox, a.1 - oy),
                ]
                .map(DevicePoint::from)
                .to_vec(),
            );
        }
    }

    for joint in pts.windows(3) {
        let (a, v, b) = (joint[0], joint[1], joint[2]);
        let (Some(n1), Some(n2)) = (unit_normal(a, v), unit_normal(v, b)) else {
            continue;
        };
        match style.join {
            LineJoin::Round => shapes.push(disk(v.0, v.1, hw)),
            LineJoin::Miter | LineJoin::Bevel => {
                let (mx, my) = (n1.0 + n2.0, n1.1 + n2.1);
                let mlen = mx.hypot(my);
                let cos_half = if mlen > 0.0 {
                    (mx * n1.0 + my * n1.1) / mlen
                } else {
                    0.0
                };
                let miter = style.join == LineJoin::Miter
                    && cos_half > 0.0
                    && 1.0 / cos_half <= MITER_LIMIT;
                for side in [1.0, -1.0] {
                    let p1 = (v.0 + side * n1.0 * hw, v.1 + side * n1.1 * hw);
                    let p2 = (v.0 + side * n2.0 * hw, v.1 + side * n2.1 * hw);
                    let mut shape = vec![v, p1];
                    if miter {
                        let reach = side * hw / cos_half / mlen;
                        shape.push((v.0 + mx * reach, v.1 + my * reach));
                    }
                    shape.push(p2);
                    shapes.push(shape.into_iter().map(DevicePoint::from).collect());
                }
            }
        }
    }

    if style.cap == LineCap::Round {
        for &(x, y) in [pts[0], pts[pts.len() - 1]].iter() {
            shapes.push(disk(x, y, hw));
        }
    }
    shapes
}

/// Draws into an owned RGBA image.
#[derive(Debug)]
pub struct RasterDriver {
    state: DriverState,
    canvas: Canvas,
}

impl RasterDriver {
    /// A white `width` x `height` surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, Color::WHITE)
    }

    pub fn with_background(width: u32, height: u32, background: Color) -> Self {
        Self::from_image(RgbaImage::from_pixel(
            width,
            height,
            Rgba(background.to_array()),
        ))
    }

    /// Draw on top of existing pixels.
    pub fn from_image(pixels: RgbaImage) -> Self {
        Self {
            state: DriverState::new(),
            canvas: Canvas { pixels },
        }
    }

    /// Surface size in pixels. Not `width`/`height`: those are the text
    /// metrics of [`GraphicsDriver`].
    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.pixels.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas.pixels
    }

    /// Move the pixels out, leaving a blank surface of the same size.
    pub fn take_image(&mut self) -> RgbaImage {
        let (w, h) = self.canvas.pixels.dimensions();
        std::mem::replace(&mut self.canvas.pixels, RgbaImage::new(w, h))
    }

    /// Fill the whole surface, ignoring the clip.
    pub fn clear(&mut self, color: Color) {
        self.canvas.fill(color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.canvas
            .pixels
            .get_pixel_checked(x, y)
            .map(|p| Color::from(p.0))
    }

    fn fill_spans(&mut self, points: &[DevicePoint], contour_ends: &[usize], color: Color) {
        let rows = 0..self.canvas.pixels.height() as i32;
        let clip = self.state.clip_region();
        let canvas = &mut self.canvas;
        fill_polygon(points, contour_ends, rows, |y, x0, x1| {
            canvas.span(y, x0, x1, color, clip)
        });
    }

    fn thin_polyline(&mut self, points: &[DevicePoint], color: Color) {
        let mut dash = DashWalker::new(self.state.line_style().dash_pattern());
        // one pixel of slack so clipped ends still round like unclipped ones
        let (w, h) = self.dimensions();
        let bounds = (-1.0, -1.0, w as f64 + 1.0, h as f64 + 1.0);
        let first = points[0].round();
        let closed = points.len() > 2 && points.last().map(DevicePoint::round) == Some(first);

        let mut pixels = Vec::new();
        for seg in points.windows(2) {
            let (a, b) = ((seg[0].x, seg[0].y), (seg[1].x, seg[1].y));
            match clip_segment(a, b, bounds) {
                Some((ca, cb)) => {
                    let ra = DevicePoint::new(ca.0, ca.1).round();
                    let rb = DevicePoint::new(cb.0, cb.1).round();
                    let start = pixels.len();
                    line_pixels(ra, rb, &mut pixels);
                    // shared vertices are drawn once
                    if start > 0 && pixels.get(start - 1) == pixels.get(start) {
                        pixels.remove(start);
                    }
                }
                None => continue,
            }
        }
        if closed && pixels.len() > 1 && pixels.last() == Some(&first) {
            pixels.pop();
        }

        let clip = self.state.clip_region();
        for (x, y) in pixels {
            if dash.step() {
                self.canvas.plot(x, y, color, clip);
            }
        }
    }

    fn wide_polyline(&mut self, points: &[DevicePoint], color: Color) {
        let style = self.state.line_style().clone();
        let hw = style.effective_width() as f64 / 2.0;
        // strokes are centred on pixel centres
        let centred: Vec<(f64, f64)> = points.iter().map(|p| (p.x + 0.5, p.y + 0.5)).collect();

        let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in &centred {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let reach = hw * MITER_LIMIT + 1.0;
        let extent = IRect::new(
            (x0 - reach).floor() as i32,
            (y0 - reach).floor() as i32,
            ((x1 - x0) + 2.0 * reach).ceil() as i32 + 1,
            ((y1 - y0) + 2.0 * reach).ceil() as i32 + 1,
        );
        let Some(area) = extent.intersect(&self.canvas.bounds()) else {
            return;
        };

        let mut mask = CoverageMask::new(area);
        for piece in dash_polyline(&centred, &style.dash_pattern()) {
            if piece.is_empty() {
                continue;
            }
            for shape in stroke_shapes(&piece, &style) {
                mask.fill(&shape);
            }
        }
        let clip = self.state.clip_region();
        for (y, a, b) in mask.spans() {
            self.canvas.span(y, a, b, color, clip);
        }
    }
}

impl GraphicsDriver for RasterDriver {
    fn state(&self) -> &DriverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DriverState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "RasterDriver"
    }

    fn features(&self) -> DriverFeatures {
        DriverFeatures::NATIVE | DriverFeatures::ALPHA_BLENDING
    }

    fn raster_points(&mut self, points: &[DevicePoint]) {
        let color = self.state.color();
        let clip = self.state.clip_region();
        for p in points {
            let (x, y) = p.round();
            self.canvas.plot(x, y, color, clip);
        }
    }

    fn raster_polyline(&mut self, points: &[DevicePoint]) {
        if points.is_empty() {
            return;
        }
        let color = self.state.color();
        if self.state.line_style().effective_width() <= 1 {
            self.thin_polyline(points, color);
        } else {
            self.wide_polyline(points, color);
        }
    }

    fn raster_polygon(&mut self, points: &[DevicePoint], contour_ends: &[usize]) {
        let color = self.state.color();
        self.fill_spans(points, contour_ends, color);
    }

    fn apply_clip(&mut self) {
        // the clip is read from the state on every pixel write
        log::trace!(
            "RasterDriver clip now {:?}",
            self.state.clip_region().and_then(Region::bounding_box)
        );
    }

    fn raster_rect(&mut self, rect: IRect, filled: bool) {
        let style = self.state.line_style();
        if !filled && (style.effective_width() > 1 || !style.dash_pattern().is_empty()) {
            rect_as_path(self, rect, false);
            return;
        }
        let color = self.state.color();
        let clip = self.state.clip_region();
        if filled {
            let rows = rect.y.max(0)..rect.bottom().min(self.canvas.pixels.height() as i32);
            for y in rows {
                self.canvas.span(y, rect.x, rect.right(), color, clip);
            }
            return;
        }
        let (r, b) = (rect.right() - 1, rect.bottom() - 1);
        self.canvas.span(rect.y, rect.x, r + 1, color, clip);
        if b > rect.y {
            self.canvas.span(b, rect.x, r + 1, color, clip);
        }
        let height = self.canvas.pixels.height() as i32;
        for y in (rect.y + 1).max(0)..b.min(height) {
            self.canvas.plot(rect.x, y, color, clip);
            if r > rect.x {
                self.canvas.plot(r, y, color, clip);
            }
        }
    }

    fn raster_text(&mut self, text: &str, x: f64, y: f64, angle: f64) {
        let (face, size, color) = (self.state.font(), self.state.size(), self.state.color());
        let clip = self.state.clip_region();
        let canvas = &mut self.canvas;
        let (ox, oy) = (x.round() as i32, y.round() as i32);
        let (sin, cos) = angle.to_radians().sin_cos();
        text::with_engine(|engine| {
            engine.draw(text, face, size, color, |px, py, c| {
                if angle == 0.0 {
                    canvas.plot(ox + px, oy + py, c, clip);
                } else {
                    let (fx, fy) = (px as f64, py as f64);
                    let rx = fx * cos + fy * sin;
                    let ry = -fx * sin + fy * cos;
                    canvas.plot(ox + rx.round() as i32, oy + ry.round() as i32, c, clip);
                }
            })
        });
    }

    fn load_font(&mut self, face: Font, size: u32) -> Option<FontMetrics> {
        Some(text::with_engine(|engine| engine.metrics(face, size)))
    }

    fn measure_text(&mut self, descriptor: &FontDescriptor, text: &str) -> f64 {
        text::with_engine(|engine| engine.measure(text, descriptor.face, descriptor.size))
    }

    fn blit(&mut self, pixels: Pixels<'_>, src: IRect, dest_x: i32, dest_y: i32) {
        let source = match self.state.resolve(&pixels) {
            Ok(source) => source,
            Err(err) => {
                self.state.report(err);
                return;
            }
        };
        let clip = self.state.clip_region();
        for row in 0..src.h {
            for col in 0..src.w {
                let Some(p) = source.get_pixel_checked((src.x + col) as u32, (src.y + row) as u32)
                else {
                    continue;
                };
                self.canvas.plot(
                    dest_x.saturating_add(col),
                    dest_y.saturating_add(row),
                    Color::from(p.0),
                    clip,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_style::Dash;

    const INK: Color = Color::BLACK;

    fn count(d: &RasterDriver, color: Color) -> usize {
        d.image()
            .pixels()
            .filter(|p| Color::from(p.0) == color)
            .count()
    }

    #[test]
    fn test_rectf_covers_exactly_w_by_h() {
        let mut d = RasterDriver::new(20, 20);
        d.rectf_color(2, 3, 5, 4, INK);
        assert_eq!(count(&d, INK), 20);
        assert_eq!(d.pixel(2, 3), Some(INK));
        assert_eq!(d.pixel(6, 6), Some(INK));
        assert_eq!(d.pixel(7, 6), Some(Color::WHITE));
    }

    #[test]
    fn test_rect_outline_is_inclusive() {
        let mut d = RasterDriver::new(20, 20);
        d.rect(1, 1, 4, 3);
        // 4x3 box has 10 border pixels
        assert_eq!(count(&d, INK), 10);
        assert_eq!(d.pixel(4, 3), Some(INK));
        assert_eq!(d.pixel(5, 3), Some(Color::WHITE));
    }

    #[test]
    fn test_clip_limits_fill() {
        let mut d = RasterDriver::new(20, 20);
        d.push_clip(0, 0, 5, 5);
        d.rectf(0, 0, 20, 20);
        d.pop_clip();
        assert_eq!(count(&d, INK), 25);
    }

    #[test]
    fn test_line_draws_both_ends() {
        let mut d = RasterDriver::new(20, 20);
        d.line(2, 5, 9, 5);
        assert_eq!(count(&d, INK), 8);
    }

    #[test]
    fn test_translucent_loop_blends_each_pixel_once() {
        let mut d = RasterDriver::new(10, 10);
        d.set_color(Color::rgba(0, 0, 0, 128));
        d.loop3(1, 1, 6, 1, 6, 6);
        let first = d.pixel(1, 1).unwrap();
        let other = d.pixel(6, 1).unwrap();
        assert_eq!(first, other);
    }

    #[test]
    fn test_dotted_line_skips_pixels() {
        let mut d = RasterDriver::new(20, 5);
        d.set_line_style(LineStyle::solid().dash(Dash::Dot));
        d.xyline(0, 2, 9);
        assert_eq!(count(&d, INK), 5);
    }

    #[test]
    fn test_wide_line_has_width() {
        let mut d = RasterDriver::new(20, 20);
        d.set_line_style(LineStyle::solid().width(3));
        d.xyline(2, 10, 12);
        assert_eq!(d.pixel(7, 9), Some(INK));
        assert_eq!(d.pixel(7, 10), Some(INK));
        assert_eq!(d.pixel(7, 11), Some(INK));
        assert_eq!(d.pixel(7, 12), Some(Color::WHITE));
    }

    #[test]
    fn test_blit_respects_clip() {
        let mut d = RasterDriver::new(10, 10);
        let id = d
            .cache_image(&RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])))
            .unwrap();
        d.push_clip(0, 0, 2, 10);
        d.draw_image(id, 0, 0, 4, 4, 0, 0);
        assert_eq!(count(&d, Color::RED), 8);
    }

    #[test]
    fn test_fill_reaches_bottom_of_surface() {
        let mut d = RasterDriver::new(100, 100);
        d.polygon4(10, 40, 60, 40, 60, 90, 10, 90);
        assert_eq!(d.pixel(30, 60), Some(INK));
        assert_eq!(d.pixel(30, 89), Some(INK));
        assert_eq!(d.pixel(30, 90), Some(Color::WHITE));
    }

    #[test]
    fn test_thin_line_reaches_bottom_and_right_of_surface() {
        let mut d = RasterDriver::new(100, 100);
        d.line(10, 60, 50, 60);
        d.yxline(95, 70, 99);
        assert_eq!(d.pixel(30, 60), Some(INK));
        assert_eq!(d.pixel(95, 99), Some(INK));
        assert_eq!(count(&d, INK), 41 + 30);
    }

    #[test]
    fn test_dimensions_are_the_surface_size() {
        let mut d = RasterDriver::new(120, 80);
        d.set_font(Font::HELVETICA, 14);
        assert_eq!(d.dimensions(), (120, 80));
    }

    #[test]
    fn test_take_image_leaves_blank_surface() {
        let mut d = RasterDriver::new(3, 3);
        d.rectf(0, 0, 3, 3);
        let pixels = d.take_image();
        assert_eq!(pixels.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(d.pixel(1, 1), Some(Color::TRANSPARENT));
    }
}
