//! The graphics driver contract.
//!
//! A backend implements [`GraphicsDriver`] by supplying a small set of
//! device primitives (points, polylines, filled polygons and a clip hook)
//! and exposing its [`DriverState`]. Everything else, including transforms,
//! clipping, vertex buffering, curves, arcs, text metrics and image
//! handling, comes from default methods written against that primitive set.
//! Backends override the optional hooks only to go faster, never to change
//! what ends up on the surface.

pub mod geometry;
pub mod images;

use std::rc::Rc;

use bitflags::bitflags;
use image::RgbaImage;

use crate::clip::{ClipStack, ClipStatus, IRect, Region};
use crate::color::{Color, Palette};
use crate::error::{DriverError, Result};
use crate::font::{Font, FontDescriptor, FontDescriptorCache, FontMetrics, TextExtents};
use crate::image_source::{ImageCache, ImageId, ImageSource};
use crate::line_style::LineStyle;
use crate::offscreen::{OffscreenArena, OffscreenId};
use crate::transform::{Matrix, MatrixStack};
use crate::vertex::{DevicePoint, PrimitiveKind, VertexBuffer};

bitflags! {
    /// Capabilities a backend may advertise.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DriverFeatures: u32 {
        /// Draws to a real device surface.
        const NATIVE = 1;
        /// Draws to a print or other virtual surface.
        const PRINTER = 1 << 1;
        /// Honours the alpha channel of colours and images.
        const ALPHA_BLENDING = 1 << 2;
    }
}

/// Pixels a backend is asked to copy onto its surface.
#[derive(Debug, Clone, Copy)]
pub enum Pixels<'a> {
    Cached(ImageId),
    Offscreen(OffscreenId),
    Borrowed(&'a RgbaImage),
}

/// State shared by every backend: stacks, vertex buffer, current drawing
/// attributes and driver-owned resources.
#[derive(Debug)]
pub struct DriverState {
    matrices: MatrixStack,
    clips: ClipStack,
    vertices: VertexBuffer,
    /// Reused by the closed-form shapes so they never disturb `vertices`.
    scratch: VertexBuffer,
    font: Font,
    size: u32,
    color: Color,
    line_style: LineStyle,
    font_descriptor: Option<Rc<FontDescriptor>>,
    fonts: FontDescriptorCache,
    images: ImageCache,
    offscreens: OffscreenArena,
    palette: Palette,
    last_error: Option<DriverError>,
}

impl DriverState {
    pub fn new() -> Self {
        Self {
            matrices: MatrixStack::new(),
            clips: ClipStack::new(),
            vertices: VertexBuffer::new(),
            scratch: VertexBuffer::new(),
            font: Font::HELVETICA,
            size: 14,
            color: Color::BLACK,
            line_style: LineStyle::default(),
            font_descriptor: None,
            fonts: FontDescriptorCache::new(),
            images: ImageCache::new(),
            offscreens: OffscreenArena::new(),
            palette: Palette::new(),
            last_error: None,
        }
    }

    /// Record a contract violation or failed operation.
    pub fn report(&mut self, err: DriverError) {
        log::warn!("graphics driver: {}", err);
        self.last_error = Some(err);
    }

    fn check(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    pub fn matrix(&self) -> &Matrix {
        self.matrices.current()
    }

    pub fn matrix_depth(&self) -> usize {
        self.matrices.depth()
    }

    pub fn clip_region(&self) -> Option<&Region> {
        self.clips.region()
    }

    pub fn clip_depth(&self) -> usize {
        self.clips.depth()
    }

    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    pub fn font(&self) -> Font {
        self.font
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn line_style(&self) -> &LineStyle {
        &self.line_style
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn offscreens(&self) -> &OffscreenArena {
        &self.offscreens
    }

    pub fn offscreens_mut(&mut self) -> &mut OffscreenArena {
        &mut self.offscreens
    }

    pub fn font_cache(&self) -> &FontDescriptorCache {
        &self.fonts
    }

    /// Look up the pixels behind `pixels`.
    pub fn resolve<'a>(&'a self, pixels: &Pixels<'a>) -> Result<&'a RgbaImage> {
        match *pixels {
            Pixels::Cached(id) => self.images.get(id).map(|c| &c.pixels),
            Pixels::Offscreen(id) => self.offscreens.get(id),
            Pixels::Borrowed(img) => Ok(img),
        }
    }

    /// Drop saved matrices, clips and any half-built primitive.
    pub fn reset(&mut self) {
        self.matrices.reset();
        self.clips.reset();
        self.vertices.abort();
        self.scratch.abort();
    }
}

impl Default for DriverState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DriverState {
    fn drop(&mut self) {
        if !self.images.is_empty() || !self.offscreens.is_empty() {
            log::debug!(
                "releasing {} cached images and {} offscreens with their driver",
                self.images.len(),
                self.offscreens.len()
            );
        }
    }
}

/// The drawing interface every backend presents.
///
/// Required methods are the device primitives. All coordinates passed to
/// them are in device space; the transform has already been applied.
pub trait GraphicsDriver {
    fn state(&self) -> &DriverState;
    fn state_mut(&mut self) -> &mut DriverState;

    /// Plot individual points.
    fn raster_points(&mut self, points: &[DevicePoint]);

    /// Stroke an open polyline with the current colour and line style.
    /// Closed outlines arrive with the first point repeated at the end.
    fn raster_polyline(&mut self, points: &[DevicePoint]);

    /// Fill a polygon with the even-odd rule. `contour_ends[i]` is the
    /// exclusive end index of contour `i`.
    fn raster_polygon(&mut self, points: &[DevicePoint], contour_ends: &[usize]);

    /// Make the device honour the current clip, `state().clip_region()`.
    fn apply_clip(&mut self);

    fn name(&self) -> &'static str {
        "GraphicsDriver"
    }

    fn features(&self) -> DriverFeatures {
        DriverFeatures::empty()
    }

    /// Draw a device-space rectangle. Outlines cover the pixels from
    /// `(x, y)` to `(x + w - 1, y + h - 1)` inclusive.
    fn raster_rect(&mut self, rect: IRect, filled: bool) {
        geometry::rect_as_path(self, rect, filled);
    }

    /// Draw an axis-aligned device-space ellipse.
    fn raster_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, filled: bool) {
        geometry::ellipse_as_path(self, cx, cy, rx, ry, filled);
    }

    /// Draw text with its baseline origin at device `(x, y)`, rotated
    /// counter-clockwise by `angle` degrees. Backends without text output
    /// draw nothing.
    fn raster_text(&mut self, _text: &str, _x: f64, _y: f64, _angle: f64) {}

    /// Device metrics of a face/size pair, `None` without font support.
    fn load_font(&mut self, _face: Font, _size: u32) -> Option<FontMetrics> {
        None
    }

    /// Advance width of `text`, 0 without font support.
    fn measure_text(&mut self, _descriptor: &FontDescriptor, _text: &str) -> f64 {
        0.0
    }

    /// Copy `src` of `pixels` with its top-left corner at device
    /// `(dest_x, dest_y)`. `src` lies within the pixels' bounds.
    fn blit(&mut self, _pixels: Pixels<'_>, _src: IRect, _dest_x: i32, _dest_y: i32) {}

    fn color_changed(&mut self) {}

    fn line_style_changed(&mut self) {}

    // --- features and errors

    fn has_feature(&self, feature: DriverFeatures) -> bool {
        self.features().contains(feature)
    }

    fn can_do_alpha_blending(&self) -> bool {
        self.has_feature(DriverFeatures::ALPHA_BLENDING)
    }

    /// The most recent reported error, cleared.
    fn take_error(&mut self) -> Option<DriverError> {
        self.state_mut().last_error.take()
    }

    fn last_error(&self) -> Option<&DriverError> {
        self.state().last_error.as_ref()
    }

    // --- transforms

    fn push_matrix(&mut self) {
        let st = self.state_mut();
        let result = st.matrices.push();
        st.check(result);
    }

    fn pop_matrix(&mut self) {
        let st = self.state_mut();
        let result = st.matrices.pop();
        st.check(result);
    }

    fn mult_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, x: f64, y: f64) {
        self.state_mut()
            .matrices
            .mult(&Matrix::new(a, b, c, d, x, y));
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state_mut().matrices.translate(x, y);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state_mut().matrices.scale(sx, sy);
    }

    fn scale_uniform(&mut self, s: f64) {
        self.state_mut().matrices.scale(s, s);
    }

    /// Rotate by `degrees`, counter-clockwise on screen.
    fn rotate(&mut self, degrees: f64) {
        self.state_mut().matrices.rotate(degrees);
    }

    fn matrix(&self) -> Matrix {
        *self.state().matrix()
    }

    fn transform_x(&self, x: f64, y: f64) -> f64 {
        self.state().matrix().transform_point(x, y).0
    }

    fn transform_y(&self, x: f64, y: f64) -> f64 {
        self.state().matrix().transform_point(x, y).1
    }

    fn transform_dx(&self, x: f64, y: f64) -> f64 {
        self.state().matrix().transform_vector(x, y).0
    }

    fn transform_dy(&self, x: f64, y: f64) -> f64 {
        self.state().matrix().transform_vector(x, y).1
    }

    // --- clipping, device coordinates

    /// Intersect the current clip with a rectangle and push the result.
    fn push_clip(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let st = self.state_mut();
        let result = st.clips.push_clip(IRect::new(x, y, w, h));
        if st.check(result) {
            self.apply_clip();
        }
    }

    /// Push an entry that turns clipping off.
    fn push_no_clip(&mut self) {
        let st = self.state_mut();
        let result = st.clips.push_no_clip();
        if st.check(result) {
            self.apply_clip();
        }
    }

    fn pop_clip(&mut self) {
        let st = self.state_mut();
        let result = st.clips.pop_clip();
        if st.check(result) {
            self.apply_clip();
        }
    }

    /// Intersect a rectangle with the current clip.
    fn clip_box(&self, x: i32, y: i32, w: i32, h: i32) -> (IRect, ClipStatus) {
        self.state().clips.clip_box(IRect::new(x, y, w, h))
    }

    /// `false` only if nothing of the rectangle can be visible.
    fn not_clipped(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.state().clips.not_clipped(IRect::new(x, y, w, h))
    }

    fn clip_region(&self) -> Option<&Region> {
        self.state().clips.region()
    }

    /// Replace the current clip, releasing the old one.
    fn set_clip_region(&mut self, region: Option<Region>) {
        self.state_mut().clips.replace_region(region);
        self.apply_clip();
    }

    /// Take the current clip out of the stack, leaving drawing unclipped.
    /// Hand it back later with [`set_clip_region`](Self::set_clip_region).
    fn take_clip_region(&mut self) -> Option<Region> {
        let old = self.state_mut().clips.replace_region(None);
        self.apply_clip();
        old
    }

    /// Re-apply the current clip to the device, e.g. after the device lost
    /// its clip state.
    fn restore_clip(&mut self) {
        self.apply_clip();
    }

    fn clip_state_number(&self) -> u32 {
        self.state().clips.state_number()
    }

    // --- vertex buffer

    fn begin_points(&mut self) {
        geometry::begin(self, PrimitiveKind::Points);
    }

    fn begin_line(&mut self) {
        geometry::begin(self, PrimitiveKind::Line);
    }

    fn begin_loop(&mut self) {
        geometry::begin(self, PrimitiveKind::Loop);
    }

    fn begin_polygon(&mut self) {
        geometry::begin(self, PrimitiveKind::Polygon);
    }

    fn begin_complex_polygon(&mut self) {
        geometry::begin(self, PrimitiveKind::ComplexPolygon);
    }

    /// Add a user-space vertex to the primitive being built.
    fn vertex(&mut self, x: f64, y: f64) {
        let (dx, dy) = self.state().matrix().transform_point(x, y);
        self.transformed_vertex(dx, dy);
    }

    /// Add a vertex that is already in device space.
    fn transformed_vertex(&mut self, xf: f64, yf: f64) {
        let st = self.state_mut();
        let result = st.vertices.push(DevicePoint::new(xf, yf));
        st.check(result);
    }

    /// Start a new contour inside a complex polygon.
    fn gap(&mut self) {
        let st = self.state_mut();
        let result = st.vertices.gap();
        st.check(result);
    }

    fn end_points(&mut self) {
        geometry::end(self, PrimitiveKind::Points);
    }

    fn end_line(&mut self) {
        geometry::end(self, PrimitiveKind::Line);
    }

    fn end_loop(&mut self) {
        geometry::end(self, PrimitiveKind::Loop);
    }

    fn end_polygon(&mut self) {
        geometry::end(self, PrimitiveKind::Polygon);
    }

    fn end_complex_polygon(&mut self) {
        geometry::end(self, PrimitiveKind::ComplexPolygon);
    }

    /// A circle, filled inside a polygon bracket and outlined otherwise.
    /// It has to be the only shape of its bracket.
    fn circle(&mut self, x: f64, y: f64, r: f64) {
        geometry::circle(self, x, y, r);
    }

    /// Add the vertices of a circular arc. Angles are in degrees,
    /// counter-clockwise from 3 o'clock.
    fn arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64) {
        geometry::arc(self, x, y, r, start, end);
    }

    /// Add the vertices of a cubic Bézier curve.
    #[allow(clippy::too_many_arguments)]
    fn curve(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    ) {
        geometry::curve(self, [(x0, y0), (x1, y1), (x2, y2), (x3, y3)]);
    }

    // --- closed-form shapes

    fn point(&mut self, x: i32, y: i32) {
        let (dx, dy) = self.state().matrix().transform_point(x as f64, y as f64);
        self.raster_points(&[DevicePoint::new(dx, dy)]);
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        geometry::rect(self, x, y, w, h, false);
    }

    fn rectf(&mut self, x: i32, y: i32, w: i32, h: i32) {
        geometry::rect(self, x, y, w, h, true);
    }

    /// Fill a rectangle with `color`, leaving the current colour set to it.
    fn rectf_color(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        self.set_color(color);
        self.rectf(x, y, w, h);
    }

    /// Dotted outline marking keyboard focus.
    fn focus_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        geometry::focus_rect(self, x, y, w, h);
    }

    fn line(&mut self, x: i32, y: i32, x1: i32, y1: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x1, y1)]);
    }

    fn line2(&mut self, x: i32, y: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x1, y1), (x2, y2)]);
    }

    /// Horizontal line from `(x, y)` to `(x1, y)`.
    fn xyline(&mut self, x: i32, y: i32, x1: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x1, y)]);
    }

    /// Horizontal then vertical.
    fn xyline2(&mut self, x: i32, y: i32, x1: i32, y2: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x1, y), (x1, y2)]);
    }

    /// Horizontal, vertical, horizontal.
    fn xyline3(&mut self, x: i32, y: i32, x1: i32, y2: i32, x3: i32) {
        geometry::shape(
            self,
            PrimitiveKind::Line,
            &[(x, y), (x1, y), (x1, y2), (x3, y2)],
        );
    }

    /// Vertical line from `(x, y)` to `(x, y1)`.
    fn yxline(&mut self, x: i32, y: i32, y1: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x, y1)]);
    }

    fn yxline2(&mut self, x: i32, y: i32, y1: i32, x2: i32) {
        geometry::shape(self, PrimitiveKind::Line, &[(x, y), (x, y1), (x2, y1)]);
    }

    fn yxline3(&mut self, x: i32, y: i32, y1: i32, x2: i32, y3: i32) {
        geometry::shape(
            self,
            PrimitiveKind::Line,
            &[(x, y), (x, y1), (x2, y1), (x2, y3)],
        );
    }

    fn loop3(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        geometry::shape(self, PrimitiveKind::Loop, &[(x0, y0), (x1, y1), (x2, y2)]);
    }

    #[allow(clippy::too_many_arguments)]
    fn loop4(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32, x3: i32, y3: i32) {
        geometry::shape(
            self,
            PrimitiveKind::Loop,
            &[(x0, y0), (x1, y1), (x2, y2), (x3, y3)],
        );
    }

    fn polygon3(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        geometry::shape(self, PrimitiveKind::Polygon, &[(x0, y0), (x1, y1), (x2, y2)]);
    }

    #[allow(clippy::too_many_arguments)]
    fn polygon4(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        x3: i32,
        y3: i32,
    ) {
        geometry::shape(
            self,
            PrimitiveKind::Polygon,
            &[(x0, y0), (x1, y1), (x2, y2), (x3, y3)],
        );
    }

    /// Outline of the elliptical arc inscribed in the box, angles in degrees
    /// counter-clockwise from 3 o'clock.
    fn arc_box(&mut self, x: i32, y: i32, w: i32, h: i32, a1: f64, a2: f64) {
        geometry::arc_box(self, x, y, w, h, a1, a2, false);
    }

    /// Filled wedge of the ellipse inscribed in the box.
    fn pie(&mut self, x: i32, y: i32, w: i32, h: i32, a1: f64, a2: f64) {
        geometry::arc_box(self, x, y, w, h, a1, a2, true);
    }

    // --- colour and line style

    fn set_color(&mut self, color: Color) {
        self.state_mut().color = color;
        self.color_changed();
    }

    /// Select an entry of the colour map.
    fn set_color_index(&mut self, index: u8) {
        let color = self.state().palette.get(index);
        self.set_color(color);
    }

    fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.set_color(Color::rgb(r, g, b));
    }

    fn color(&self) -> Color {
        self.state().color
    }

    fn set_line_style(&mut self, style: LineStyle) {
        self.state_mut().line_style = style;
        self.line_style_changed();
    }

    fn line_style(&self) -> &LineStyle {
        &self.state().line_style
    }

    // --- fonts and text

    fn set_font(&mut self, face: Font, size: u32) {
        let st = self.state_mut();
        if st.font != face || st.size != size {
            st.font = face;
            st.size = size;
            st.font_descriptor = None;
        }
    }

    fn font(&self) -> Font {
        self.state().font
    }

    fn size(&self) -> u32 {
        self.state().size
    }

    /// Metrics of the current face and size, created on first use.
    fn font_descriptor(&mut self) -> Rc<FontDescriptor> {
        if let Some(descriptor) = &self.state().font_descriptor {
            return descriptor.clone();
        }
        let (face, size) = (self.state().font, self.state().size);
        let descriptor = match self.state().fonts.get(face, size) {
            Some(descriptor) => descriptor,
            None => {
                let metrics = self.load_font(face, size);
                log::debug!("{}: new font descriptor {:?}/{}", self.name(), face, size);
                self.state_mut()
                    .fonts
                    .insert(FontDescriptor::new(face, size, metrics))
            }
        };
        self.state_mut().font_descriptor = Some(descriptor.clone());
        descriptor
    }

    /// Install a descriptor obtained earlier, switching face and size to it.
    fn set_font_descriptor(&mut self, descriptor: Rc<FontDescriptor>) {
        let st = self.state_mut();
        st.font = descriptor.face;
        st.size = descriptor.size;
        st.font_descriptor = Some(descriptor);
    }

    fn width(&mut self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let descriptor = self.font_descriptor();
        self.measure_text(&descriptor, text)
    }

    fn char_width(&mut self, c: char) -> f64 {
        let mut buf = [0u8; 4];
        self.width(c.encode_utf8(&mut buf))
    }

    fn height(&mut self) -> i32 {
        self.font_descriptor().height()
    }

    fn descent(&mut self) -> i32 {
        self.font_descriptor().descent()
    }

    /// Box of `text` relative to its baseline origin: `dy` is negative,
    /// pointing up to the top of the line.
    fn text_extents(&mut self, text: &str) -> TextExtents {
        let w = self.width(text).round() as i32;
        let descriptor = self.font_descriptor();
        let h = descriptor.height();
        TextExtents {
            dx: 0,
            dy: descriptor.descent() - h,
            w,
            h,
        }
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.draw_text_at(text, x as f64, y as f64);
    }

    fn draw_text_at(&mut self, text: &str, x: f64, y: f64) {
        self.draw_text_rotated(0.0, text, x, y);
    }

    fn draw_text_rotated(&mut self, angle: f64, text: &str, x: f64, y: f64) {
        if text.is_empty() {
            return;
        }
        // make sure the backend has loaded the face before drawing with it
        self.font_descriptor();
        let (dx, dy) = self.state().matrix().transform_point(x, y);
        self.raster_text(text, dx, dy, angle);
    }

    /// Right-to-left text: `text` ends at `x`.
    fn rtl_draw(&mut self, text: &str, x: i32, y: i32) {
        let w = self.width(text);
        self.draw_text_at(text, x as f64 - w, y as f64);
    }

    // --- images

    /// Convert `source` to device form and keep it on this driver.
    fn cache_image(&mut self, source: &dyn ImageSource) -> Option<ImageId> {
        images::cache(self, source)
    }

    /// Release a cached image. Returns `false` for stale handles.
    fn uncache_image(&mut self, id: ImageId) -> bool {
        images::uncache(self, id)
    }

    fn is_cached(&self, id: ImageId) -> bool {
        self.state().images.contains(id)
    }

    /// Draw a cached image clipped to the box `(x, y, w, h)`, with image
    /// pixel `(cx, cy)` at the box origin.
    #[allow(clippy::too_many_arguments)]
    fn draw_image(&mut self, id: ImageId, x: i32, y: i32, w: i32, h: i32, cx: i32, cy: i32) {
        images::draw(self, id, x, y, w, h, cx, cy);
    }

    /// Draw a cached image resized to fill `(x, y, w, h)`.
    /// Returns `false` if nothing could be drawn.
    fn draw_scaled(&mut self, id: ImageId, x: i32, y: i32, w: i32, h: i32) -> bool {
        images::draw_scaled(self, id, x, y, w, h)
    }

    /// Draw raw pixels without caching them. `line_delta` is the row
    /// stride in bytes, 0 for tightly packed rows and negative for
    /// bottom-up buffers, as in [`BufferSource::new`].
    ///
    /// [`BufferSource::new`]: crate::image_source::BufferSource::new
    #[allow(clippy::too_many_arguments)]
    fn draw_image_buffer(
        &mut self,
        data: &[u8],
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        depth: u32,
        line_delta: isize,
    ) {
        images::draw_buffer(self, data, x, y, w, h, depth, line_delta, false);
    }

    /// Draw an image whose rows are pulled from `source` on demand.
    fn draw_image_scanlines(&mut self, source: &dyn ImageSource, x: i32, y: i32) {
        images::draw_source(self, source, x, y, false);
    }

    /// Like [`draw_image_buffer`](Self::draw_image_buffer), but only the
    /// first byte of each `depth`-byte pixel is read, as a gray level.
    #[allow(clippy::too_many_arguments)]
    fn draw_image_mono_buffer(
        &mut self,
        data: &[u8],
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        depth: u32,
        line_delta: isize,
    ) {
        images::draw_buffer(self, data, x, y, w, h, depth, line_delta, true);
    }

    /// Gray rendition of `source`, taking the first byte of every pixel.
    fn draw_image_mono_scanlines(&mut self, source: &dyn ImageSource, x: i32, y: i32) {
        images::draw_source(self, source, x, y, true);
    }

    // --- offscreen buffers

    fn create_offscreen(&mut self, w: u32, h: u32) -> OffscreenId {
        let id = self
            .state_mut()
            .offscreens
            .create(w, h, Color::WHITE);
        log::debug!("{}: created {}x{} offscreen {:?}", self.name(), w, h, id);
        id
    }

    fn delete_offscreen(&mut self, id: OffscreenId) -> bool {
        let st = self.state_mut();
        let result = st.offscreens.remove(id).map(|_| ());
        st.check(result)
    }

    /// Copy `(srcx, srcy, w, h)` of an offscreen buffer to `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    fn copy_offscreen(&mut self, x: i32, y: i32, w: i32, h: i32, id: OffscreenId, srcx: i32, srcy: i32) {
        images::copy_offscreen(self, x, y, w, h, id, srcx, srcy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::recording::{DrawCommand, RecordingDriver};

    #[test]
    fn test_identity_transform_functions() {
        let d = RecordingDriver::new();
        for &(x, y) in &[(0.0, 0.0), (3.25, -8.0), (1e6, 42.0)] {
            assert_eq!(d.transform_x(x, y), x);
            assert_eq!(d.transform_y(x, y), y);
        }
    }

    #[test]
    fn test_overflowing_push_matrix_is_reported() {
        let mut d = RecordingDriver::new();
        for _ in 0..crate::transform::MATRIX_STACK_SIZE {
            d.push_matrix();
        }
        assert!(d.take_error().is_none());
        d.translate(5.0, 0.0);
        d.push_matrix();
        assert!(matches!(
            d.take_error(),
            Some(DriverError::MatrixStackOverflow(_))
        ));
        assert_eq!(d.transform_x(0.0, 0.0), 5.0);
    }

    #[test]
    fn test_clip_changes_reach_the_device() {
        let mut d = RecordingDriver::new();
        d.push_clip(0, 0, 10, 10);
        d.pop_clip();
        let clips: Vec<_> = d
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Clip(_)))
            .collect();
        assert_eq!(clips.len(), 2);
    }

    #[test]
    fn test_font_descriptor_is_cached_per_face_and_size() {
        let mut d = RecordingDriver::new();
        d.set_font(Font::TIMES, 12);
        let a = d.font_descriptor();
        d.set_font(Font::COURIER, 12);
        let _ = d.font_descriptor();
        d.set_font(Font::TIMES, 12);
        let b = d.font_descriptor();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(d.state().font_cache().len(), 2);
    }

    #[test]
    fn test_missing_font_support_is_neutral() {
        let mut d = RecordingDriver::new();
        d.set_font(Font::HELVETICA, 18);
        assert_eq!(d.width("hello"), 0.0);
        assert_eq!(d.height(), 18);
        assert_eq!(d.descent(), 0);
        assert_eq!(
            d.text_extents("hello"),
            TextExtents {
                dx: 0,
                dy: -18,
                w: 0,
                h: 18
            }
        );
    }

    #[test]
    fn test_color_index_uses_palette() {
        let mut d = RecordingDriver::new();
        d.set_color_index(4);
        assert_eq!(d.color(), Color::BLUE);
        d.state_mut().palette_mut().set(4, Color::RED);
        d.set_color_index(4);
        assert_eq!(d.color(), Color::RED);
    }
}
