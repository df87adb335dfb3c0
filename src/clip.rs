//! Clip regions and the per-driver clip stack.
//!
//! All coordinates here are device coordinates: callers transform user
//! coordinates before pushing a clip.

use crate::error::{DriverError, Result};

/// Number of entries in the clip stack, including the base entry.
pub const REGION_STACK_SIZE: usize = 10;

/// An integer device rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl IRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.w as i64 * self.h as i64
        }
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersect(&self, other: &IRect) -> Option<IRect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| IRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &IRect) -> IRect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        IRect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// The parts of `self` not covered by `cut`, as up to four disjoint
    /// rectangles.
    fn subtract(&self, cut: &IRect) -> Vec<IRect> {
        let Some(overlap) = self.intersect(cut) else {
            return vec![*self];
        };
        let mut out = Vec::with_capacity(4);
        // bands above and below the overlap span the full width
        if overlap.y > self.y {
            out.push(IRect::new(self.x, self.y, self.w, overlap.y - self.y));
        }
        if overlap.bottom() < self.bottom() {
            out.push(IRect::new(
                self.x,
                overlap.bottom(),
                self.w,
                self.bottom() - overlap.bottom(),
            ));
        }
        if overlap.x > self.x {
            out.push(IRect::new(self.x, overlap.y, overlap.x - self.x, overlap.h));
        }
        if overlap.right() < self.right() {
            out.push(IRect::new(
                overlap.right(),
                overlap.y,
                self.right() - overlap.right(),
                overlap.h,
            ));
        }
        out
    }
}

/// How a rectangle relates to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Outside,
    Inside,
    Partial,
}

/// A device clip area: a union of disjoint rectangles.
///
/// A region with no rectangles is empty and clips everything away.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    rects: Vec<IRect>,
}

impl Region {
    pub fn empty() -> Self {
        Self { rects: Vec::new() }
    }

    pub fn from_rect(rect: IRect) -> Self {
        if rect.is_empty() {
            Self::empty()
        } else {
            Self { rects: vec![rect] }
        }
    }

    /// Build a region covering the union of `rects`, which may overlap.
    pub fn from_rects(rects: impl IntoIterator<Item = IRect>) -> Self {
        let mut region = Self::empty();
        for rect in rects {
            region.add_rect(rect);
        }
        region
    }

    /// Add `rect` to the region, keeping the pieces disjoint.
    pub fn add_rect(&mut self, rect: IRect) {
        if rect.is_empty() {
            return;
        }
        let mut pieces = vec![rect];
        for existing in &self.rects {
            pieces = pieces.iter().flat_map(|p| p.subtract(existing)).collect();
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
    }

    pub fn rects(&self) -> &[IRect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn intersect_rect(&self, rect: &IRect) -> Region {
        Region {
            rects: self.rects.iter().filter_map(|r| r.intersect(rect)).collect(),
        }
    }

    pub fn bounding_box(&self) -> Option<IRect> {
        let mut iter = self.rects.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(r)))
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    pub fn coverage(&self, rect: &IRect) -> Coverage {
        if rect.is_empty() {
            return Coverage::Outside;
        }
        // the pieces are disjoint, so overlapping areas add up exactly
        let covered: i64 = self
            .rects
            .iter()
            .filter_map(|r| r.intersect(rect))
            .map(|r| r.area())
            .sum();
        if covered == 0 {
            Coverage::Outside
        } else if covered == rect.area() {
            Coverage::Inside
        } else {
            Coverage::Partial
        }
    }
}

/// Result of [`ClipStack::clip_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    /// The rectangle is returned unchanged.
    Unclipped,
    /// The rectangle was reduced to the bounding box of its visible part.
    Partial,
    /// Nothing of the rectangle is visible.
    Hidden,
}

impl ClipStatus {
    /// Numeric status: 0 unclipped, 1 partially clipped, 2 hidden.
    pub fn code(self) -> i32 {
        match self {
            ClipStatus::Unclipped => 0,
            ClipStatus::Partial => 1,
            ClipStatus::Hidden => 2,
        }
    }

    pub fn is_clipped(self) -> bool {
        self != ClipStatus::Unclipped
    }
}

/// Fixed-capacity stack of clip regions. Entry 0 starts out unclipped
/// and can only change through [`ClipStack::replace_region`].
#[derive(Debug, Clone)]
pub struct ClipStack {
    entries: [Option<Region>; REGION_STACK_SIZE],
    top: usize,
    state_number: u32,
}

impl ClipStack {
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| None),
            top: 0,
            state_number: 0,
        }
    }

    /// Number of pushed entries above the base.
    pub fn depth(&self) -> usize {
        self.top
    }

    /// Bumped every time the effective clip changes.
    pub fn state_number(&self) -> u32 {
        self.state_number
    }

    /// The current clip, `None` when drawing is unclipped.
    pub fn region(&self) -> Option<&Region> {
        self.entries[self.top].as_ref()
    }

    /// Push the intersection of `rect` with the current clip.
    pub fn push_clip(&mut self, rect: IRect) -> Result<()> {
        let region = if rect.is_empty() {
            Region::empty()
        } else {
            match self.region() {
                Some(current) => current.intersect_rect(&rect),
                None => Region::from_rect(rect),
            }
        };
        self.push_entry(Some(region))
    }

    /// Push an explicit "unclipped" entry.
    pub fn push_no_clip(&mut self) -> Result<()> {
        self.push_entry(None)
    }

    fn push_entry(&mut self, entry: Option<Region>) -> Result<()> {
        if self.top + 1 >= REGION_STACK_SIZE {
            return Err(DriverError::ClipStackOverflow(REGION_STACK_SIZE - 1));
        }
        self.top += 1;
        self.entries[self.top] = entry;
        self.state_number = self.state_number.wrapping_add(1);
        Ok(())
    }

    /// Drop the top entry, restoring the previous clip.
    pub fn pop_clip(&mut self) -> Result<()> {
        if self.top == 0 {
            return Err(DriverError::ClipStackUnderflow);
        }
        self.entries[self.top] = None;
        self.top -= 1;
        self.state_number = self.state_number.wrapping_add(1);
        Ok(())
    }

    /// Replace the top entry, handing back the previous one.
    pub fn replace_region(&mut self, region: Option<Region>) -> Option<Region> {
        self.state_number = self.state_number.wrapping_add(1);
        std::mem::replace(&mut self.entries[self.top], region)
    }

    pub fn clip_box(&self, rect: IRect) -> (IRect, ClipStatus) {
        let Some(region) = self.region() else {
            return (rect, ClipStatus::Unclipped);
        };
        match region.coverage(&rect) {
            Coverage::Inside => (rect, ClipStatus::Unclipped),
            Coverage::Outside => (IRect::new(rect.x, rect.y, 0, 0), ClipStatus::Hidden),
            Coverage::Partial => {
                let visible = region.intersect_rect(&rect);
                // Partial coverage always leaves at least one piece
                let bbox = visible.bounding_box().unwrap_or_default();
                (bbox, ClipStatus::Partial)
            }
        }
    }

    /// Conservative visibility test: `false` only when nothing of `rect`
    /// can be drawn.
    pub fn not_clipped(&self, rect: IRect) -> bool {
        if rect.is_empty() || rect.right() <= 0 || rect.bottom() <= 0 {
            return false;
        }
        match self.region() {
            None => true,
            Some(region) => region.coverage(&rect) != Coverage::Outside,
        }
    }

    /// Drop every pushed entry.
    pub fn reset(&mut self) {
        while self.top > 0 {
            self.entries[self.top] = None;
            self.top -= 1;
        }
        self.entries[0] = None;
        self.state_number = self.state_number.wrapping_add(1);
    }
}

impl Default for ClipStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_box_without_clip_is_identity() {
        let stack = ClipStack::new();
        let rect = IRect::new(-5, 3, 40, 20);
        assert_eq!(stack.clip_box(rect), (rect, ClipStatus::Unclipped));
        assert_eq!(stack.clip_box(rect).1.code(), 0);
    }

    #[test]
    fn test_push_clip_then_clip_box() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(10, 10, 50, 50)).unwrap();
        let (out, status) = stack.clip_box(IRect::new(0, 0, 100, 100));
        assert_eq!(out, IRect::new(10, 10, 50, 50));
        assert_eq!(status, ClipStatus::Partial);
        assert_ne!(status.code(), 0);
    }

    #[test]
    fn test_clip_box_inside_is_unchanged() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(0, 0, 100, 100)).unwrap();
        let rect = IRect::new(10, 10, 5, 5);
        assert_eq!(stack.clip_box(rect), (rect, ClipStatus::Unclipped));
    }

    #[test]
    fn test_clip_box_disjoint_is_empty() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(0, 0, 10, 10)).unwrap();
        let (out, status) = stack.clip_box(IRect::new(50, 50, 10, 10));
        assert_eq!(status, ClipStatus::Hidden);
        assert!(out.is_empty());
        assert!(!stack.not_clipped(IRect::new(50, 50, 10, 10)));
    }

    #[test]
    fn test_nested_clips_intersect() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(0, 0, 100, 100)).unwrap();
        stack.push_clip(IRect::new(50, 50, 100, 100)).unwrap();
        assert_eq!(
            stack.region().unwrap().bounding_box(),
            Some(IRect::new(50, 50, 50, 50))
        );
        stack.pop_clip().unwrap();
        assert_eq!(
            stack.region().unwrap().bounding_box(),
            Some(IRect::new(0, 0, 100, 100))
        );
    }

    #[test]
    fn test_push_no_clip_and_empty_clip() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(0, 0, 10, 10)).unwrap();
        stack.push_no_clip().unwrap();
        assert!(stack.region().is_none());
        assert!(stack.not_clipped(IRect::new(500, 500, 1, 1)));
        stack.pop_clip().unwrap();

        stack.push_clip(IRect::new(0, 0, 0, 10)).unwrap();
        assert!(stack.region().unwrap().is_empty());
        assert!(!stack.not_clipped(IRect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_overflow_leaves_top_unchanged() {
        let mut stack = ClipStack::new();
        for i in 0..REGION_STACK_SIZE - 1 {
            stack.push_clip(IRect::new(i as i32, 0, 100, 100)).unwrap();
        }
        let top = stack.region().cloned();
        assert_eq!(
            stack.push_clip(IRect::new(0, 0, 1, 1)),
            Err(DriverError::ClipStackOverflow(REGION_STACK_SIZE - 1))
        );
        assert_eq!(stack.region().cloned(), top);
        for _ in 0..REGION_STACK_SIZE - 1 {
            stack.pop_clip().unwrap();
        }
        assert!(stack.region().is_none());
        assert_eq!(stack.pop_clip(), Err(DriverError::ClipStackUnderflow));
    }

    #[test]
    fn test_not_clipped_rejects_offscreen_and_empty() {
        let stack = ClipStack::new();
        assert!(!stack.not_clipped(IRect::new(-20, 0, 20, 5)));
        assert!(!stack.not_clipped(IRect::new(0, 0, 0, 5)));
        assert!(stack.not_clipped(IRect::new(-20, 0, 21, 5)));
    }

    #[test]
    fn test_region_from_overlapping_rects_is_disjoint() {
        let region = Region::from_rects([IRect::new(0, 0, 10, 10), IRect::new(5, 5, 10, 10)]);
        let total: i64 = region.rects().iter().map(|r| r.area()).sum();
        assert_eq!(total, 100 + 100 - 25);
        assert_eq!(region.coverage(&IRect::new(0, 0, 15, 15)), Coverage::Partial);
        assert_eq!(region.coverage(&IRect::new(5, 5, 10, 10)), Coverage::Inside);
        assert!(region.contains_point(12, 12));
        assert!(!region.contains_point(12, 2));
    }

    #[test]
    fn test_replace_region_returns_previous() {
        let mut stack = ClipStack::new();
        stack.push_clip(IRect::new(0, 0, 10, 10)).unwrap();
        let before = stack.state_number();
        let old = stack.replace_region(None);
        assert_eq!(old, Some(Region::from_rect(IRect::new(0, 0, 10, 10))));
        assert!(stack.region().is_none());
        assert_ne!(stack.state_number(), before);
        stack.replace_region(old);
        assert!(stack.region().is_some());
    }
}
