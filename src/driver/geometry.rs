//! Default geometry built from the primitive set: vertex-buffer brackets,
//! closed-form shapes, arcs, circles and Bézier curves.

use std::f64::consts::PI;

use super::GraphicsDriver;
use crate::clip::IRect;
use crate::error::{DriverError, Result};
use crate::vertex::{DevicePoint, Primitive, PrimitiveKind, VertexBuffer};

/// Arc segments per radian per square root of the device radius.
const ARC_DENSITY: f64 = 0.841471;
/// Upper bound on the segments of one Bézier curve.
const MAX_CURVE_SEGMENTS: usize = 100;
/// Upper bound on the segments of one arc, reached only by spans of many
/// turns.
const MAX_ARC_SEGMENTS: usize = 4096;
const MAX_FOCUS_CAPACITY: i64 = 1 << 16;

pub(crate) fn begin<D: GraphicsDriver + ?Sized>(d: &mut D, kind: PrimitiveKind) {
    let st = d.state_mut();
    let result = st.vertices.begin(kind);
    st.check(result);
}

pub(crate) fn end<D: GraphicsDriver + ?Sized>(d: &mut D, kind: PrimitiveKind) {
    let result = d.state_mut().vertices.finish(kind);
    match result {
        Ok(primitive) => rasterize(d, primitive),
        Err(err) => d.state_mut().report(err),
    }
}

/// Hand a finished primitive to the backend.
pub(crate) fn rasterize<D: GraphicsDriver + ?Sized>(d: &mut D, primitive: Primitive) {
    match primitive {
        Primitive::Points(points) => {
            if !points.is_empty() {
                d.raster_points(&points);
            }
        }
        Primitive::Polyline(points) => d.raster_polyline(&points),
        Primitive::Polygon {
            points,
            contour_ends,
        } => d.raster_polygon(&points, &contour_ends),
    }
}

fn build(
    buf: &mut VertexBuffer,
    kind: PrimitiveKind,
    points: impl IntoIterator<Item = DevicePoint>,
) -> Result<Primitive> {
    buf.abort();
    buf.begin(kind)?;
    for p in points {
        buf.push(p)?;
    }
    buf.finish(kind)
}

/// Run device points through the same finishing rules as a
/// `begin`/`vertex`/`end` bracket, without touching the user's bracket.
pub(crate) fn device_shape<D, I>(d: &mut D, kind: PrimitiveKind, points: I)
where
    D: GraphicsDriver + ?Sized,
    I: IntoIterator<Item = DevicePoint>,
{
    let mut buf = std::mem::take(&mut d.state_mut().scratch);
    let result = build(&mut buf, kind, points);
    d.state_mut().scratch = buf;
    match result {
        Ok(primitive) => rasterize(d, primitive),
        Err(err) => d.state_mut().report(err),
    }
}

pub(crate) fn shape<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    kind: PrimitiveKind,
    points: &[(i32, i32)],
) {
    let m = *d.state().matrix();
    device_shape(
        d,
        kind,
        points
            .iter()
            .map(|&(x, y)| DevicePoint::from(m.transform_point(x as f64, y as f64))),
    );
}

/// The outline passes through `(x + w - 1, y + h - 1)` on the device fast
/// path and on the transformed loop alike.
pub(crate) fn rect<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    filled: bool,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    let inset = if filled { 0.0 } else { 1.0 };
    let (left, top) = (x as f64, y as f64);
    let (right, bottom) = (left + w as f64 - inset, top + h as f64 - inset);

    let m = *d.state().matrix();
    if m.is_axis_aligned() {
        let (x0, y0) = m.transform_point(left, top);
        let (x1, y1) = m.transform_point(right, bottom);
        let (x0, y0) = (device_coord(x0), device_coord(y0));
        let (x1, y1) = (device_coord(x1) + inset, device_coord(y1) + inset);
        let device = IRect::new(x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32);
        if !device.is_empty() {
            d.raster_rect(device, filled);
        }
    } else {
        let kind = if filled {
            PrimitiveKind::Polygon
        } else {
            PrimitiveKind::Loop
        };
        let corners = [(left, top), (right, top), (right, bottom), (left, bottom)];
        device_shape(
            d,
            kind,
            corners.map(|(px, py)| DevicePoint::from(m.transform_point(px, py))),
        );
    }
}

/// Device coordinates beyond this never reach a surface and keep rectangle
/// extents inside `i32`.
const DEVICE_LIMIT: f64 = (1 << 29) as f64;

fn device_coord(v: f64) -> f64 {
    v.round().clamp(-DEVICE_LIMIT, DEVICE_LIMIT)
}

/// `raster_rect` expressed with the required primitives.
pub fn rect_as_path<D: GraphicsDriver + ?Sized>(d: &mut D, rect: IRect, filled: bool) {
    let (x, y) = (rect.x as f64, rect.y as f64);
    if filled {
        let (r, b) = (rect.right() as f64, rect.bottom() as f64);
        device_shape(
            d,
            PrimitiveKind::Polygon,
            [(x, y), (r, y), (r, b), (x, b)].map(DevicePoint::from),
        );
    } else {
        let (r, b) = ((rect.right() - 1) as f64, (rect.bottom() - 1) as f64);
        device_shape(
            d,
            PrimitiveKind::Loop,
            [(x, y), (r, y), (r, b), (x, b)].map(DevicePoint::from),
        );
    }
}

/// Segments per radian for an arc of device radius `radius`.
fn segments_per_radian(radius: f64) -> f64 {
    ((radius.max(0.0).sqrt() * ARC_DENSITY) as i32).max(2) as f64
}

/// Points of the elliptical arc from `a1` to `a2` radians, both ends
/// included.
fn sample_arc(
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    a1: f64,
    a2: f64,
    device_radius: f64,
) -> Vec<DevicePoint> {
    let n = (((a2 - a1).abs() * segments_per_radian(device_radius)).ceil() as usize)
        .clamp(1, MAX_ARC_SEGMENTS);
    let step = (a2 - a1) / n as f64;
    (0..=n)
        .map(|i| {
            let t = if i == n { a2 } else { a1 + step * i as f64 };
            DevicePoint::new(cx + rx * t.cos(), cy - ry * t.sin())
        })
        .collect()
}

/// `raster_ellipse` expressed with the required primitives.
pub fn ellipse_as_path<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    filled: bool,
) {
    let mut points = sample_arc(cx, cy, rx, ry, 0.0, 2.0 * PI, rx.max(ry));
    if filled {
        points.pop();
        let end = points.len();
        d.raster_polygon(&points, &[end]);
    } else {
        d.raster_polyline(&points);
    }
}

pub(crate) fn circle<D: GraphicsDriver + ?Sized>(d: &mut D, x: f64, y: f64, r: f64) {
    let Some(kind) = d.state().vertices.kind() else {
        d.state_mut().report(DriverError::CircleOutsidePrimitive);
        return;
    };
    let m = *d.state().matrix();
    let (xt, yt) = m.transform_point(x, y);
    let rx = r * if m.c != 0.0 {
        m.a.hypot(m.c)
    } else {
        m.a.abs()
    };
    let ry = r * if m.b != 0.0 {
        m.b.hypot(m.d)
    } else {
        m.d.abs()
    };
    d.raster_ellipse(xt, yt, rx, ry, kind.is_filled());
}

fn ensure_accumulating<D: GraphicsDriver + ?Sized>(d: &mut D) -> bool {
    if d.state().vertices.is_accumulating() {
        true
    } else {
        d.state_mut().report(DriverError::VertexOutsidePrimitive);
        false
    }
}

pub(crate) fn arc<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    x: f64,
    y: f64,
    r: f64,
    start: f64,
    end: f64,
) {
    if !ensure_accumulating(d) {
        return;
    }
    if !start.is_finite() || !end.is_finite() {
        d.state_mut().report(DriverError::NonFiniteArc);
        return;
    }
    let m = *d.state().matrix();
    let r1 = {
        let (dx, dy) = m.transform_vector(r, 0.0);
        dx.hypot(dy)
    };
    let r2 = {
        let (dx, dy) = m.transform_vector(0.0, r);
        dx.hypot(dy)
    };
    let mut epsilon = 1.0 / segments_per_radian(r1.min(r2));

    let a = start.to_radians();
    let e = end.to_radians();
    let segments = (((e - a) / epsilon).trunc().abs() as usize).min(MAX_ARC_SEGMENTS);
    if segments > 0 {
        epsilon = (e - a) / segments as f64;
        let (sin_e, cos_e) = epsilon.sin_cos();
        let mut px = r * a.cos();
        let mut py = -r * a.sin();
        for _ in 0..segments {
            d.vertex(x + px, y + py);
            let next = cos_e * px + sin_e * py;
            py = -sin_e * px + cos_e * py;
            px = next;
        }
    }
    d.vertex(x + r * e.cos(), y - r * e.sin());
}

pub(crate) fn curve<D: GraphicsDriver + ?Sized>(d: &mut D, control: [(f64, f64); 4]) {
    if !ensure_accumulating(d) {
        return;
    }
    let m = *d.state().matrix();
    let [(mut x, mut y), (x1, y1), (x2, y2), (x3, y3)] =
        control.map(|(px, py)| m.transform_point(px, py));

    // size of the control polygon decides the segment count
    let area_a = ((x - x2) * (y3 - y1) - (y - y2) * (x3 - x1)).abs();
    let area_b = ((x - x3) * (y2 - y1) - (y - y3) * (x2 - x1)).abs();
    let n = (area_a.max(area_b).sqrt() / 4.0) as usize;

    if n > 1 {
        let n = n.min(MAX_CURVE_SEGMENTS);
        let e = 1.0 / n as f64;

        let xa = x3 - 3.0 * x2 + 3.0 * x1 - x;
        let xb = 3.0 * (x2 - 2.0 * x1 + x);
        let xc = 3.0 * (x1 - x);
        let mut dx1 = ((xa * e + xb) * e + xc) * e;
        let dx3 = 6.0 * xa * e * e * e;
        let mut dx2 = dx3 + 2.0 * xb * e * e;

        let ya = y3 - 3.0 * y2 + 3.0 * y1 - y;
        let yb = 3.0 * (y2 - 2.0 * y1 + y);
        let yc = 3.0 * (y1 - y);
        let mut dy1 = ((ya * e + yb) * e + yc) * e;
        let dy3 = 6.0 * ya * e * e * e;
        let mut dy2 = dy3 + 2.0 * yb * e * e;

        d.transformed_vertex(x, y);
        for _ in 2..n {
            x += dx1;
            dx1 += dx2;
            dx2 += dx3;
            y += dy1;
            dy1 += dy2;
            dy2 += dy3;
            d.transformed_vertex(x, y);
        }
        d.transformed_vertex(x + dx1, y + dy1);
        d.transformed_vertex(x3, y3);
    } else {
        d.transformed_vertex(x, y);
        d.transformed_vertex(x3, y3);
    }
}

/// Outline (`filled == false`) or wedge of the ellipse inscribed in a box.
/// Outlines stay inside the box's pixels, wedges cover its area.
#[allow(clippy::too_many_arguments)]
pub(crate) fn arc_box<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    a1: f64,
    a2: f64,
    filled: bool,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    if !a1.is_finite() || !a2.is_finite() {
        d.state_mut().report(DriverError::NonFiniteArc);
        return;
    }
    let inset = if filled { 0.0 } else { 1.0 };
    let rx = (w as f64 - inset) / 2.0;
    let ry = (h as f64 - inset) / 2.0;
    let (cx, cy) = (x as f64 + rx, y as f64 + ry);

    let m = *d.state().matrix();
    let device_radius = {
        let (ax, ay) = m.transform_vector(rx, 0.0);
        let (bx, by) = m.transform_vector(0.0, ry);
        ax.hypot(ay).max(bx.hypot(by))
    };
    let user = sample_arc(cx, cy, rx, ry, a1.to_radians(), a2.to_radians(), device_radius);
    let full_turn = (a2 - a1).abs() >= 360.0;
    let mut points: Vec<DevicePoint> = Vec::with_capacity(user.len() + 1);
    if filled && !full_turn {
        points.push(DevicePoint::from(m.transform_point(cx, cy)));
    }
    points.extend(user.iter().map(|p| DevicePoint::from(m.transform_point(p.x, p.y))));

    let kind = if filled {
        PrimitiveKind::Polygon
    } else {
        PrimitiveKind::Line
    };
    device_shape(d, kind, points);
}

/// Every other pixel of the outline, walking clockwise from the top-left.
pub(crate) fn focus_rect<D: GraphicsDriver + ?Sized>(d: &mut D, x: i32, y: i32, w: i32, h: i32) {
    if w <= 0 || h <= 0 {
        return;
    }
    let (x, y) = (x as i64, y as i64);
    let (r, b) = (x + w as i64 - 1, y + h as i64 - 1);
    let perimeter = 2 * (w as i64 + h as i64);
    let mut walk: Vec<(i64, i64)> =
        Vec::with_capacity(perimeter.min(MAX_FOCUS_CAPACITY) as usize);
    walk.extend((x..=r).map(|px| (px, y)));
    walk.extend((y + 1..=b).map(|py| (r, py)));
    if b > y {
        walk.extend((x..r).rev().map(|px| (px, b)));
    }
    if r > x {
        walk.extend((y + 1..b).rev().map(|py| (x, py)));
    }

    let m = *d.state().matrix();
    let dots: Vec<DevicePoint> = walk
        .iter()
        .step_by(2)
        .map(|&(px, py)| DevicePoint::from(m.transform_point(px as f64, py as f64)))
        .collect();
    d.raster_points(&dots);
}
