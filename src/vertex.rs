//! Vertex accumulation for multi-point primitives.
//!
//! A primitive is built between a `begin` and the matching `finish`. Points
//! arrive already in device space; the driver applies the transform before
//! handing them over.

use std::fmt;

use crate::error::{DriverError, Result};

/// First allocation of the point buffer; it doubles from there.
const INITIAL_CAPACITY: usize = 16;

/// A point in device space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DevicePoint {
    pub x: f64,
    pub y: f64,
}

impl DevicePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest pixel coordinates.
    pub fn round(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl From<(f64, f64)> for DevicePoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Points,
    Line,
    Loop,
    Polygon,
    ComplexPolygon,
}

impl PrimitiveKind {
    pub fn is_filled(self) -> bool {
        matches!(self, PrimitiveKind::Polygon | PrimitiveKind::ComplexPolygon)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::Points => "points",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Loop => "loop",
            PrimitiveKind::Polygon => "polygon",
            PrimitiveKind::ComplexPolygon => "complex_polygon",
        })
    }
}

/// What a finished primitive turned out to be, ready for rasterization.
///
/// Degenerate input degrades: a polygon with fewer than three points is
/// drawn as a line, a line with fewer than two as points.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Points(Vec<DevicePoint>),
    /// An open polyline. Loops arrive here already closed.
    Polyline(Vec<DevicePoint>),
    /// A filled polygon. `contour_ends[i]` is the exclusive end index of
    /// contour `i`; a simple polygon has a single contour.
    Polygon {
        points: Vec<DevicePoint>,
        contour_ends: Vec<usize>,
    },
}

impl Primitive {
    pub fn points(&self) -> &[DevicePoint] {
        match self {
            Primitive::Points(p) | Primitive::Polyline(p) => p,
            Primitive::Polygon { points, .. } => points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }
}

#[derive(Debug, Default)]
pub struct VertexBuffer {
    points: Vec<DevicePoint>,
    /// Start index of the contour being built (complex polygons).
    contour_start: usize,
    contour_ends: Vec<usize>,
    kind: Option<PrimitiveKind>,
}

impl VertexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The primitive being built, `None` when idle.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        self.kind
    }

    pub fn is_accumulating(&self) -> bool {
        self.kind.is_some()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DevicePoint] {
        &self.points
    }

    pub fn capacity(&self) -> usize {
        self.points.capacity()
    }

    pub fn begin(&mut self, kind: PrimitiveKind) -> Result<()> {
        if let Some(active) = self.kind {
            return Err(DriverError::NestedBegin {
                active,
                requested: kind,
            });
        }
        self.points.clear();
        self.contour_ends.clear();
        self.contour_start = 0;
        self.kind = Some(kind);
        Ok(())
    }

    /// Append a device-space point. Consecutive duplicates collapse.
    pub fn push(&mut self, point: DevicePoint) -> Result<()> {
        if self.kind.is_none() {
            return Err(DriverError::VertexOutsidePrimitive);
        }
        if self.points.len() > self.contour_start && self.points.last() == Some(&point) {
            return Ok(());
        }
        self.push_raw(point)
    }

    fn push_raw(&mut self, point: DevicePoint) -> Result<()> {
        if self.points.len() == self.points.capacity() {
            let additional = self.points.capacity().max(INITIAL_CAPACITY);
            if self.points.try_reserve_exact(additional).is_err() {
                self.abort();
                return Err(DriverError::OutOfMemory("vertex buffer"));
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Close the current contour of a complex polygon and start a new one.
    pub fn gap(&mut self) -> Result<()> {
        if self.kind != Some(PrimitiveKind::ComplexPolygon) {
            return Err(DriverError::GapOutsideComplexPolygon);
        }
        self.close_contour()
    }

    fn close_contour(&mut self) -> Result<()> {
        let start = self.contour_start;
        let first = self.points.get(start).copied();
        if let Some(first) = first {
            while self.points.len() > start + 2 && self.points.last() == Some(&first) {
                self.points.pop();
            }
        }
        match first {
            Some(first) if self.points.len() > start + 2 => {
                self.push_raw(first)?;
                self.contour_ends.push(self.points.len());
                self.contour_start = self.points.len();
            }
            // too short to enclose anything
            _ => self.points.truncate(start),
        }
        Ok(())
    }

    /// Drop trailing points that repeat the first one.
    fn fix_loop(&mut self) {
        if let Some(&first) = self.points.first() {
            while self.points.len() > 2 && self.points.last() == Some(&first) {
                self.points.pop();
            }
        }
    }

    /// Finish the primitive of `kind` and return it, leaving the buffer idle.
    ///
    /// A mismatched or unopened `finish` is refused and the buffer is left
    /// as it was.
    pub fn finish(&mut self, kind: PrimitiveKind) -> Result<Primitive> {
        match self.kind {
            None => return Err(DriverError::EndWithoutBegin(kind)),
            Some(active) if active != kind => {
                return Err(DriverError::MismatchedEnd {
                    expected: active,
                    found: kind,
                })
            }
            Some(_) => {}
        }

        let primitive = match kind {
            PrimitiveKind::Points => Primitive::Points(self.take_points()),
            PrimitiveKind::Line => self.finish_line(),
            PrimitiveKind::Loop => {
                self.fix_loop();
                if self.points.len() > 2 {
                    let first = self.points[0];
                    self.push_raw(first)?;
                }
                self.finish_line()
            }
            PrimitiveKind::Polygon => {
                self.fix_loop();
                if self.points.len() < 3 {
                    self.finish_line()
                } else {
                    let points = self.take_points();
                    let end = points.len();
                    Primitive::Polygon {
                        points,
                        contour_ends: vec![end],
                    }
                }
            }
            PrimitiveKind::ComplexPolygon => {
                self.close_contour()?;
                if self.points.len() < 3 {
                    self.finish_line()
                } else {
                    let contour_ends = std::mem::take(&mut self.contour_ends);
                    Primitive::Polygon {
                        points: self.take_points(),
                        contour_ends,
                    }
                }
            }
        };
        self.abort();
        Ok(primitive)
    }

    fn finish_line(&mut self) -> Primitive {
        let points = self.take_points();
        if points.len() < 2 {
            Primitive::Points(points)
        } else {
            Primitive::Polyline(points)
        }
    }

    /// Hand the points over while keeping the allocation for the next
    /// primitive.
    fn take_points(&mut self) -> Vec<DevicePoint> {
        let out = self.points.clone();
        self.points.clear();
        out
    }

    /// Return to idle, discarding whatever was accumulated.
    pub fn abort(&mut self) {
        self.points.clear();
        self.contour_ends.clear();
        self.contour_start = 0;
        self.kind = None;
    }
}
