//! Pixel coverage of device-space geometry.
//!
//! Fills sample pixel centres (`x + 0.5`, `y + 0.5`) under the even-odd
//! rule, so a polygon from `(0, 0)` to `(w, h)` covers exactly `w * h`
//! pixels. Thin lines are Bresenham lines with both ends included.

use std::ops::Range;

use crate::vertex::DevicePoint;

#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Edge {
    fn new(a: DevicePoint, b: DevicePoint) -> Option<Self> {
        if a.y == b.y || !(a.y.is_finite() && b.y.is_finite()) {
            return None;
        }
        let (top, bottom) = if a.y < b.y { (a, b) } else { (b, a) };
        Some(Self {
            x0: top.x,
            y0: top.y,
            x1: bottom.x,
            y1: bottom.y,
        })
    }

    fn x_at(&self, y: f64) -> f64 {
        self.x0 + (y - self.y0) * (self.x1 - self.x0) / (self.y1 - self.y0)
    }
}

fn collect_edges(points: &[DevicePoint], contour_ends: &[usize]) -> Vec<Edge> {
    let whole = [points.len()];
    let ends = if contour_ends.is_empty() {
        &whole[..]
    } else {
        contour_ends
    };
    let mut edges = Vec::with_capacity(points.len());
    let mut start = 0;
    for &end in ends {
        let end = end.min(points.len());
        if end <= start {
            continue;
        }
        let contour = &points[start..end];
        for (i, &a) in contour.iter().enumerate() {
            let b = contour[(i + 1) % contour.len()];
            edges.extend(Edge::new(a, b));
        }
        start = end;
    }
    edges
}

/// Report the pixel runs covered by a polygon as `span(y, x_start, x_end)`
/// with `x_end` exclusive. Contours close implicitly. Only rows in `rows`
/// are visited.
pub fn fill_polygon(
    points: &[DevicePoint],
    contour_ends: &[usize],
    rows: Range<i32>,
    mut span: impl FnMut(i32, i32, i32),
) {
    let edges = collect_edges(points, contour_ends);
    if edges.is_empty() {
        return;
    }
    let (ymin, ymax) = edges.iter().fold((f64::MAX, f64::MIN), |(lo, hi), e| {
        (lo.min(e.y0), hi.max(e.y1))
    });
    let first = ((ymin - 0.5).ceil() as i32).max(rows.start);
    let last = ((ymax - 0.5).ceil() as i32).min(rows.end);

    let mut crossings = Vec::with_capacity(8);
    for y in first..last {
        let yc = y as f64 + 0.5;
        crossings.clear();
        crossings.extend(
            edges
                .iter()
                .filter(|e| e.y0 <= yc && yc < e.y1)
                .map(|e| e.x_at(yc)),
        );
        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let x0 = (pair[0] - 0.5).ceil() as i32;
            let x1 = (pair[1] - 0.5).ceil() as i32;
            if x1 > x0 {
                span(y, x0, x1);
            }
        }
    }
}

/// Clip a segment to a box (Liang-Barsky). `None` if nothing is inside.
pub fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (xmin, ymin, xmax, ymax): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, x0 - xmin),
        (dx, xmax - x0),
        (-dy, y0 - ymin),
        (dy, ymax - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (x0 + t0 * dx, y0 + t0 * dy),
        (x0 + t1 * dx, y0 + t1 * dy),
    ))
}

/// Pixels of the line between two pixel positions, both ends included.
pub fn line_pixels((x0, y0): (i32, i32), (x1, y1): (i32, i32), out: &mut Vec<(i32, i32)>) {
    let dx = (x1 as i64 - x0 as i64).abs();
    let dy = -(y1 as i64 - y0 as i64).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        out.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Per-pixel on/off state for thin dashed lines.
#[derive(Debug, Clone)]
pub struct DashWalker {
    pattern: Vec<u32>,
    index: usize,
    left: u32,
}

impl DashWalker {
    pub fn new(pattern: Vec<u32>) -> Self {
        let pattern = if pattern.iter().all(|&l| l == 0) {
            Vec::new()
        } else {
            pattern
        };
        let left = pattern.first().copied().unwrap_or(0);
        Self {
            pattern,
            index: 0,
            left,
        }
    }

    /// Whether the next pixel is drawn.
    pub fn step(&mut self) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        while self.left == 0 {
            self.index = (self.index + 1) % self.pattern.len();
            self.left = self.pattern[self.index];
        }
        self.left -= 1;
        self.index % 2 == 0
    }
}

/// Split a polyline into the pieces drawn by a dash pattern of on/off
/// lengths. An empty pattern yields the whole polyline.
pub fn dash_polyline(points: &[(f64, f64)], pattern: &[u32]) -> Vec<Vec<(f64, f64)>> {
    if pattern.is_empty() || pattern.iter().all(|&l| l == 0) || points.len() < 2 {
        return vec![points.to_vec()];
    }
    let mut pieces = Vec::new();
    let mut current = vec![points[0]];
    let mut index = 0;
    let mut left = pattern[0] as f64;
    let mut on = true;

    for seg in points.windows(2) {
        let ((ax, ay), (bx, by)) = (seg[0], seg[1]);
        let len = (bx - ax).hypot(by - ay);
        let mut pos = 0.0;
        while len - pos > left {
            pos += left;
            let t = pos / len;
            let p = (ax + (bx - ax) * t, ay + (by - ay) * t);
            if on {
                current.push(p);
                pieces.push(std::mem::take(&mut current));
            } else {
                current = vec![p];
            }
            on = !on;
            index = (index + 1) % pattern.len();
            left = pattern[index] as f64;
        }
        left -= len - pos;
        if on {
            current.push((bx, by));
        }
    }
    if on && current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> DevicePoint {
        DevicePoint::new(x, y)
    }

    fn covered(points: &[DevicePoint], ends: &[usize]) -> Vec<(i32, i32, i32)> {
        let mut spans = Vec::new();
        fill_polygon(points, ends, -100..100, |y, a, b| spans.push((y, a, b)));
        spans
    }

    #[test]
    fn test_rect_polygon_covers_w_by_h() {
        let spans = covered(&[p(0.0, 0.0), p(4.0, 0.0), p(4.0, 3.0), p(0.0, 3.0)], &[4]);
        assert_eq!(spans, vec![(0, 0, 4), (1, 0, 4), (2, 0, 4)]);
    }

    #[test]
    fn test_even_odd_leaves_hole() {
        let outer = [p(0.0, 0.0), p(6.0, 0.0), p(6.0, 6.0), p(0.0, 6.0)];
        let inner = [p(2.0, 2.0), p(4.0, 2.0), p(4.0, 4.0), p(2.0, 4.0)];
        let points: Vec<_> = outer.iter().chain(inner.iter()).copied().collect();
        let spans = covered(&points, &[4, 8]);
        assert!(spans.contains(&(2, 0, 2)));
        assert!(spans.contains(&(2, 4, 6)));
        assert!(spans.contains(&(0, 0, 6)));
    }

    #[test]
    fn test_rows_are_limited() {
        let mut rows = Vec::new();
        fill_polygon(
            &[p(0.0, -50.0), p(2.0, -50.0), p(2.0, 50.0), p(0.0, 50.0)],
            &[],
            0..3,
            |y, _, _| rows.push(y),
        );
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_line_includes_both_ends() {
        let mut out = Vec::new();
        line_pixels((0, 0), (3, 1), &mut out);
        assert_eq!(out.first(), Some(&(0, 0)));
        assert_eq!(out.last(), Some(&(3, 1)));
        assert_eq!(out.len(), 4);
        out.clear();
        line_pixels((2, 2), (2, 2), &mut out);
        assert_eq!(out, vec![(2, 2)]);
    }

    #[test]
    fn test_dash_walker_alternates() {
        let mut dash = DashWalker::new(vec![2, 1]);
        let drawn: Vec<bool> = (0..6).map(|_| dash.step()).collect();
        assert_eq!(drawn, vec![true, true, false, true, true, false]);
        let mut solid = DashWalker::new(Vec::new());
        assert!((0..10).all(|_| solid.step()));
    }

    #[test]
    fn test_dash_polyline_pieces() {
        let pieces = dash_polyline(&[(0.0, 0.0), (10.0, 0.0)], &[3, 2]);
        assert_eq!(
            pieces,
            vec![
                vec![(0.0, 0.0), (3.0, 0.0)],
                vec![(5.0, 0.0), (8.0, 0.0)],
            ]
        );
    }

    #[test]
    fn test_clip_segment() {
        let ((ax, ay), (bx, by)) =
            clip_segment((-10.0, 5.0), (20.0, 5.0), (0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!(ax.abs() < 1e-9 && (bx - 10.0).abs() < 1e-9);
        assert_eq!((ay, by), (5.0, 5.0));
        assert_eq!(
            clip_segment((-10.0, -5.0), (20.0, -5.0), (0.0, 0.0, 10.0, 10.0)),
            None
        );
    }
}
