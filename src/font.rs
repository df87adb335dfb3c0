//! Font faces, per-size device metrics and the descriptor cache.

use std::collections::HashMap;
use std::rc::Rc;

/// A font face index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Font(pub u32);

impl Font {
    pub const HELVETICA: Font = Font(0);
    pub const HELVETICA_BOLD: Font = Font(1);
    pub const HELVETICA_ITALIC: Font = Font(2);
    pub const HELVETICA_BOLD_ITALIC: Font = Font(3);
    pub const COURIER: Font = Font(4);
    pub const COURIER_BOLD: Font = Font(5);
    pub const COURIER_ITALIC: Font = Font(6);
    pub const COURIER_BOLD_ITALIC: Font = Font(7);
    pub const TIMES: Font = Font(8);
    pub const TIMES_BOLD: Font = Font(9);
    pub const TIMES_ITALIC: Font = Font(10);
    pub const TIMES_BOLD_ITALIC: Font = Font(11);
    pub const SYMBOL: Font = Font(12);
    pub const SCREEN: Font = Font(13);
    pub const SCREEN_BOLD: Font = Font(14);
    pub const ZAPF_DINGBATS: Font = Font(15);

    pub fn family(self) -> FontFamily {
        match self.0 {
            4..=7 | 13 | 14 => FontFamily::Monospace,
            8..=11 => FontFamily::Serif,
            12 | 15 => FontFamily::Symbol,
            _ => FontFamily::SansSerif,
        }
    }

    pub fn is_bold(self) -> bool {
        match self.0 {
            0..=11 => self.0 & 1 == 1,
            14 => true,
            _ => false,
        }
    }

    pub fn is_italic(self) -> bool {
        self.0 <= 11 && self.0 & 2 == 2
    }
}

impl Default for Font {
    fn default() -> Self {
        Font::HELVETICA
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    SansSerif,
    Serif,
    Monospace,
    Symbol,
}

/// Device metrics a backend reports for one face at one size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
    /// Distance between baselines.
    pub line_height: f64,
}

/// Cached metrics for a face/size pair.
///
/// Built lazily the first time the pair is used on a driver. When the
/// backend has no font support the metrics fall back to the nominal size
/// with no descent.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub face: Font,
    pub size: u32,
    pub metrics: Option<FontMetrics>,
}

impl FontDescriptor {
    pub fn new(face: Font, size: u32, metrics: Option<FontMetrics>) -> Self {
        Self {
            face,
            size,
            metrics,
        }
    }

    pub fn height(&self) -> i32 {
        match self.metrics {
            Some(m) => m.line_height.round() as i32,
            None => self.size as i32,
        }
    }

    pub fn descent(&self) -> i32 {
        self.metrics.map_or(0, |m| m.descent.round() as i32)
    }
}

/// Bounding box of drawn text relative to the drawing origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtents {
    pub dx: i32,
    pub dy: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Default)]
pub struct FontDescriptorCache {
    entries: HashMap<(Font, u32), Rc<FontDescriptor>>,
}

impl FontDescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, face: Font, size: u32) -> Option<Rc<FontDescriptor>> {
        self.entries.get(&(face, size)).cloned()
    }

    pub fn insert(&mut self, descriptor: FontDescriptor) -> Rc<FontDescriptor> {
        let key = (descriptor.face, descriptor.size);
        let descriptor = Rc::new(descriptor);
        self.entries.insert(key, descriptor.clone());
        descriptor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
