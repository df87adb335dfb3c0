//! Image sources handed to the driver and the per-driver image cache.
//!
//! Decoding is not the driver's business: anything that can report its
//! size and depth and fill scan lines on request can be drawn. Caching turns
//! a source into the device-ready RGBA form once, so repeated draws skip
//! the conversion.

use image::{GrayImage, RgbImage, RgbaImage};

use crate::error::{DriverError, Result};
use crate::handle::{Handle, Slots};

/// Pixel data the driver can pull scan line by scan line.
pub trait ImageSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Bytes per pixel: 1 gray, 2 gray+alpha, 3 RGB, 4 RGBA.
    fn depth(&self) -> u32;
    fn frame_count(&self) -> u32 {
        1
    }
    /// Copy `w` pixels of row `y`, starting at column `x`, into `buf`
    /// (`buf.len() == w * depth`).
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]);
}

fn copy_row(raw: &[u8], width: u32, depth: u32, x: u32, y: u32, w: u32, buf: &mut [u8]) {
    let stride = (width * depth) as usize;
    let start = y as usize * stride + (x * depth) as usize;
    let len = (w * depth) as usize;
    buf[..len].copy_from_slice(&raw[start..start + len]);
}

impl ImageSource for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }
    fn height(&self) -> u32 {
        self.dimensions().1
    }
    fn depth(&self) -> u32 {
        4
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        copy_row(self.as_raw(), self.dimensions().0, 4, x, y, w, buf);
    }
}

impl ImageSource for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }
    fn height(&self) -> u32 {
        self.dimensions().1
    }
    fn depth(&self) -> u32 {
        3
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        copy_row(self.as_raw(), self.dimensions().0, 3, x, y, w, buf);
    }
}

impl ImageSource for GrayImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }
    fn height(&self) -> u32 {
        self.dimensions().1
    }
    fn depth(&self) -> u32 {
        1
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        copy_row(self.as_raw(), self.dimensions().0, 1, x, y, w, buf);
    }
}

/// An image whose pixels come from a callback, generated on demand.
pub struct ScanlineSource<F> {
    width: u32,
    height: u32,
    depth: u32,
    generate: F,
}

impl<F> ScanlineSource<F>
where
    F: Fn(u32, u32, u32, &mut [u8]),
{
    /// `generate(x, y, w, buf)` must fill `w` pixels of row `y` from column `x`.
    pub fn new(width: u32, height: u32, depth: u32, generate: F) -> Self {
        Self {
            width,
            height,
            depth,
            generate,
        }
    }
}

impl<F> ImageSource for ScanlineSource<F>
where
    F: Fn(u32, u32, u32, &mut [u8]),
{
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn depth(&self) -> u32 {
        self.depth
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        (self.generate)(x, y, w, buf)
    }
}

/// A raw pixel buffer with an explicit line stride, as handed to
/// `draw_image_buffer`.
pub struct BufferSource<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    depth: u32,
    /// Signed bytes from one row to the next.
    line_delta: isize,
    /// Offset of the top row in `data`.
    first_row: usize,
}

impl<'a> BufferSource<'a> {
    /// `line_delta` is the row stride in bytes, 0 for tightly packed rows.
    /// A negative stride describes a bottom-up buffer: `data` then starts
    /// with the bottom row and the top row is the last one in the slice.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        depth: u32,
        line_delta: isize,
    ) -> Result<Self> {
        check_depth(depth)?;
        let row = width as usize * depth as usize;
        let line_delta = if line_delta == 0 {
            isize::try_from(row).unwrap_or(isize::MAX)
        } else {
            line_delta
        };
        let span = line_delta
            .unsigned_abs()
            .checked_mul(height.saturating_sub(1) as usize);
        let needed = match (height, span) {
            (0, _) => Some(0),
            (_, Some(span)) => span.checked_add(row),
            (_, None) => None,
        };
        let needed = needed.unwrap_or(usize::MAX);
        if data.len() < needed {
            return Err(DriverError::ShortImageData {
                needed,
                got: data.len(),
            });
        }
        let first_row = if line_delta < 0 {
            needed.saturating_sub(row)
        } else {
            0
        };
        Ok(Self {
            data,
            width,
            height,
            depth,
            line_delta,
            first_row,
        })
    }

    /// Byte offset of row `y`.
    fn row_start(&self, y: u32) -> usize {
        let step = self.line_delta.unsigned_abs() * y as usize;
        if self.line_delta < 0 {
            self.first_row - step
        } else {
            self.first_row + step
        }
    }
}

impl ImageSource for BufferSource<'_> {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn depth(&self) -> u32 {
        self.depth
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        let start = self.row_start(y) + x as usize * self.depth as usize;
        let len = w as usize * self.depth as usize;
        buf[..len].copy_from_slice(&self.data[start..start + len]);
    }
}

/// Gray view of another source: the first byte of every pixel is its gray
/// level and the other bytes are skipped.
pub struct MonoSource<'a> {
    inner: &'a dyn ImageSource,
}

impl<'a> MonoSource<'a> {
    pub fn new(inner: &'a dyn ImageSource) -> Result<Self> {
        check_depth(inner.depth())?;
        Ok(Self { inner })
    }
}

impl ImageSource for MonoSource<'_> {
    fn width(&self) -> u32 {
        self.inner.width()
    }
    fn height(&self) -> u32 {
        self.inner.height()
    }
    fn depth(&self) -> u32 {
        1
    }
    fn read_scanline(&self, x: u32, y: u32, w: u32, buf: &mut [u8]) {
        let depth = self.inner.depth() as usize;
        if depth == 1 {
            self.inner.read_scanline(x, y, w, buf);
            return;
        }
        let mut line = vec![0u8; w as usize * depth];
        self.inner.read_scanline(x, y, w, &mut line);
        for (gray, px) in buf.iter_mut().zip(line.chunks_exact(depth)) {
            *gray = px[0];
        }
    }
}

fn check_depth(depth: u32) -> Result<()> {
    if (1..=4).contains(&depth) {
        Ok(())
    } else {
        Err(DriverError::UnsupportedDepth(depth))
    }
}

/// Pull every scan line of `source` and convert it to RGBA.
pub fn to_rgba(source: &dyn ImageSource) -> Result<RgbaImage> {
    let (width, height, depth) = (source.width(), source.height(), source.depth());
    check_depth(depth)?;
    let mut out = RgbaImage::new(width, height);
    let mut line = vec![0u8; width as usize * depth as usize];
    for y in 0..height {
        source.read_scanline(0, y, width, &mut line);
        for (x, px) in line.chunks_exact(depth as usize).enumerate() {
            let rgba = match *px {
                [v] => [v, v, v, 255],
                [v, a] => [v, v, v, a],
                [r, g, b] => [r, g, b, 255],
                [r, g, b, a] => [r, g, b, a],
                _ => unreachable!("depth checked above"),
            };
            out.put_pixel(x as u32, y, image::Rgba(rgba));
        }
    }
    Ok(out)
}

/// Handle to an image cached on a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub(crate) Handle);

/// The device-ready form of a cached image.
#[derive(Debug, Clone)]
pub struct CachedImage {
    pub pixels: RgbaImage,
    /// Depth of the source the pixels came from.
    pub source_depth: u32,
}

impl CachedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

#[derive(Debug)]
pub struct ImageCache {
    slots: Slots<CachedImage>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            slots: Slots::new("image"),
        }
    }

    pub fn insert(&mut self, image: CachedImage) -> ImageId {
        ImageId(self.slots.insert(image))
    }

    pub fn get(&self, id: ImageId) -> Result<&CachedImage> {
        self.slots.get(id.0)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.slots.contains(id.0)
    }

    pub fn remove(&mut self, id: ImageId) -> Result<CachedImage> {
        self.slots.remove(id.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}
