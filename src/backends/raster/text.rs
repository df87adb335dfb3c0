use std::cell::RefCell;

use cosmic_text::{
    Attrs, Buffer, Color as TextColor, Family, FontSystem, Metrics, Shaping, Style, SwashCache,
    Weight,
};

use crate::color::Color;
use crate::font::{Font, FontFamily, FontMetrics};

/// Shapes, measures and rasterizes text for the raster backend.
pub struct TextEngine {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    fn attrs(face: Font) -> Attrs<'static> {
        let family = match face {
            Font::SYMBOL => Family::Name("Symbol"),
            Font::ZAPF_DINGBATS => Family::Name("Zapf Dingbats"),
            _ => match face.family() {
                FontFamily::SansSerif | FontFamily::Symbol => Family::SansSerif,
                FontFamily::Serif => Family::Serif,
                FontFamily::Monospace => Family::Monospace,
            },
        };
        let mut attrs = Attrs::new().family(family);
        if face.is_bold() {
            attrs = attrs.weight(Weight::BOLD);
        }
        if face.is_italic() {
            attrs = attrs.style(Style::Italic);
        }
        attrs
    }

    fn layout(&mut self, text: &str, face: Font, size: u32) -> Buffer {
        let font_size = size.max(1) as f32;
        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);

        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(
            &mut self.font_system,
            text,
            &Self::attrs(face),
            Shaping::Advanced,
            None,
        );
        buffer.shape_until_scroll(&mut self.font_system, true);
        buffer
    }

    pub fn metrics(&mut self, face: Font, size: u32) -> FontMetrics {
        let buffer = self.layout("Xg", face, size);
        match buffer.layout_runs().next() {
            Some(run) => {
                let ascent = (run.line_y - run.line_top) as f64;
                FontMetrics {
                    ascent,
                    descent: run.line_height as f64 - ascent,
                    line_height: run.line_height as f64,
                }
            }
            None => {
                let size = size as f64;
                FontMetrics {
                    ascent: size * 0.8,
                    descent: size * 0.2,
                    line_height: size * 1.2,
                }
            }
        }
    }

    pub fn measure(&mut self, text: &str, face: Font, size: u32) -> f64 {
        let buffer = self.layout(text, face, size);
        buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0f32, f32::max) as f64
    }

    /// Rasterize `text` with its first baseline at the origin, reporting
    /// every covered pixel as `plot(x, y, color)` with coverage folded into
    /// the alpha channel.
    pub fn draw(
        &mut self,
        text: &str,
        face: Font,
        size: u32,
        color: Color,
        mut plot: impl FnMut(i32, i32, Color),
    ) {
        let buffer = self.layout(text, face, size);
        let baseline = buffer
            .layout_runs()
            .next()
            .map_or(0.0, |run| run.line_y)
            .round() as i32;
        let [r, g, b, a] = color.to_array();
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            TextColor::rgba(r, g, b, a),
            |x, y, w, h, c| {
                let pixel = Color::rgba(c.r(), c.g(), c.b(), c.a());
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        plot(x + dx, y + dy - baseline, pixel);
                    }
                }
            },
        );
    }
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static TEXT_ENGINE: RefCell<TextEngine> = RefCell::new(TextEngine::new());
}

/// Run `f` with this thread's text engine. Loading the system fonts is
/// expensive, so every raster driver on a thread shares one engine.
pub fn with_engine<R>(f: impl FnOnce(&mut TextEngine) -> R) -> R {
    TEXT_ENGINE.with_borrow_mut(f)
}
