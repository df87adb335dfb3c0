use image::{Rgba, RgbaImage};

use crate::color::Color;
use crate::error::Result;
use crate::handle::{Handle, Slots};

/// Handle to an offscreen pixel buffer owned by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffscreenId(pub(crate) Handle);

#[derive(Debug)]
pub struct OffscreenArena {
    buffers: Slots<RgbaImage>,
}

impl OffscreenArena {
    pub fn new() -> Self {
        Self {
            buffers: Slots::new("offscreen"),
        }
    }

    pub fn create(&mut self, width: u32, height: u32, background: Color) -> OffscreenId {
        let pixels = RgbaImage::from_pixel(width, height, Rgba(background.to_array()));
        OffscreenId(self.buffers.insert(pixels))
    }

    pub fn get(&self, id: OffscreenId) -> Result<&RgbaImage> {
        self.buffers.get(id.0)
    }

    pub fn get_mut(&mut self, id: OffscreenId) -> Result<&mut RgbaImage> {
        self.buffers.get_mut(id.0)
    }

    /// Move the pixels out, e.g. to draw into them with another driver.
    /// The slot keeps its handle; put the pixels back with [`Self::restore`].
    pub fn take(&mut self, id: OffscreenId) -> Result<RgbaImage> {
        let buffer = self.buffers.get_mut(id.0)?;
        let (w, h) = buffer.dimensions();
        Ok(std::mem::replace(buffer, RgbaImage::new(w, h)))
    }

    pub fn restore(&mut self, id: OffscreenId, pixels: RgbaImage) -> Result<()> {
        *self.buffers.get_mut(id.0)? = pixels;
        Ok(())
    }

    pub fn remove(&mut self, id: OffscreenId) -> Result<RgbaImage> {
        self.buffers.remove(id.0)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

impl Default for OffscreenArena {
    fn default() -> Self {
        Self::new()
    }
}
