//! Default image and offscreen operations.
//!
//! Everything funnels into the backend's `blit` hook with a source
//! rectangle already clipped to the pixels' bounds.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::{GraphicsDriver, Pixels};
use crate::clip::IRect;
use crate::error::Result;
use crate::image_source::{
    to_rgba, BufferSource, CachedImage, ImageId, ImageSource, MonoSource,
};
use crate::offscreen::OffscreenId;

/// Largest side, in device pixels, that `draw_scaled` will resample to.
const MAX_SCALED_SIDE: f64 = 16384.0;

fn device_origin<D: GraphicsDriver + ?Sized>(d: &D, x: i32, y: i32) -> (i32, i32) {
    let (dx, dy) = d.state().matrix().transform_point(x as f64, y as f64);
    (dx.round() as i32, dy.round() as i32)
}

/// Clip `src` to a `width` x `height` image and blit what is left, shifting
/// the destination by whatever was cut from the top-left.
fn blit_within<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    pixels: Pixels<'_>,
    (width, height): (u32, u32),
    src: IRect,
    dest_x: i32,
    dest_y: i32,
) {
    let bounds = IRect::new(0, 0, width as i32, height as i32);
    if let Some(visible) = src.intersect(&bounds) {
        d.blit(
            pixels,
            visible,
            dest_x.saturating_add(visible.x.saturating_sub(src.x)),
            dest_y.saturating_add(visible.y.saturating_sub(src.y)),
        );
    }
}

pub(crate) fn cache<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    source: &dyn ImageSource,
) -> Option<ImageId> {
    match to_rgba(source) {
        Ok(pixels) => {
            let (w, h) = pixels.dimensions();
            let id = d.state_mut().images.insert(CachedImage {
                pixels,
                source_depth: source.depth(),
            });
            log::debug!("{}: cached {}x{} image {:?}", d.name(), w, h, id);
            Some(id)
        }
        Err(err) => {
            d.state_mut().report(err);
            None
        }
    }
}

pub(crate) fn uncache<D: GraphicsDriver + ?Sized>(d: &mut D, id: ImageId) -> bool {
    match d.state_mut().images.remove(id) {
        Ok(_) => {
            log::debug!("{}: released image {:?}", d.name(), id);
            true
        }
        Err(err) => {
            d.state_mut().report(err);
            false
        }
    }
}

fn cached_size<D: GraphicsDriver + ?Sized>(d: &mut D, id: ImageId) -> Option<(u32, u32)> {
    match d.state().images.get(id) {
        Ok(image) => Some((image.width(), image.height())),
        Err(err) => {
            d.state_mut().report(err);
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    id: ImageId,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    cx: i32,
    cy: i32,
) {
    let Some(size) = cached_size(d, id) else {
        return;
    };
    if w <= 0 || h <= 0 {
        return;
    }
    let (dx, dy) = device_origin(d, x, y);
    blit_within(d, Pixels::Cached(id), size, IRect::new(cx, cy, w, h), dx, dy);
}

pub(crate) fn draw_scaled<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    id: ImageId,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
) -> bool {
    let Some((iw, ih)) = cached_size(d, id) else {
        return false;
    };
    if w <= 0 || h <= 0 {
        return false;
    }
    let m = *d.state().matrix();
    let (x0, y0) = m.transform_point(x as f64, y as f64);
    let (x1, y1) = m.transform_point(x as f64 + w as f64, y as f64 + h as f64);
    let left = x0.min(x1).round() as i32;
    let top = y0.min(y1).round() as i32;
    let (dw, dh) = ((x1 - x0).abs().round(), (y1 - y0).abs().round());
    if dw < 1.0 || dh < 1.0 || dw > MAX_SCALED_SIDE || dh > MAX_SCALED_SIDE {
        return false;
    }
    let (dw, dh) = (dw as u32, dh as u32);

    if (dw, dh) == (iw, ih) {
        d.blit(Pixels::Cached(id), IRect::new(0, 0, dw as i32, dh as i32), left, top);
        return true;
    }
    let scaled = match d.state().images.get(id) {
        Ok(cached) => imageops::resize(&cached.pixels, dw, dh, FilterType::Nearest),
        Err(_) => return false,
    };
    d.blit(
        Pixels::Borrowed(&scaled),
        IRect::new(0, 0, dw as i32, dh as i32),
        left,
        top,
    );
    true
}

/// Blit freshly converted pixels with their top-left at user `(x, y)`.
fn blit_converted<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    converted: Result<RgbaImage>,
    x: i32,
    y: i32,
) {
    match converted {
        Ok(pixels) => {
            let (w, h) = pixels.dimensions();
            if w == 0 || h == 0 {
                return;
            }
            let (dx, dy) = device_origin(d, x, y);
            let src = IRect::new(0, 0, clamp_side(w), clamp_side(h));
            d.blit(Pixels::Borrowed(&pixels), src, dx, dy);
        }
        Err(err) => d.state_mut().report(err),
    }
}

fn clamp_side(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_buffer<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    data: &[u8],
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    depth: u32,
    line_delta: isize,
    mono: bool,
) {
    if w == 0 || h == 0 {
        return;
    }
    let converted = BufferSource::new(data, w, h, depth, line_delta).and_then(|source| {
        if mono {
            to_rgba(&MonoSource::new(&source)?)
        } else {
            to_rgba(&source)
        }
    });
    blit_converted(d, converted, x, y);
}

pub(crate) fn draw_source<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    source: &dyn ImageSource,
    x: i32,
    y: i32,
    mono: bool,
) {
    let converted = if mono {
        MonoSource::new(source).and_then(|gray| to_rgba(&gray))
    } else {
        to_rgba(source)
    };
    blit_converted(d, converted, x, y);
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn copy_offscreen<D: GraphicsDriver + ?Sized>(
    d: &mut D,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    id: OffscreenId,
    srcx: i32,
    srcy: i32,
) {
    let size = match d.state().offscreens.get(id) {
        Ok(pixels) => pixels.dimensions(),
        Err(err) => {
            d.state_mut().report(err);
            return;
        }
    };
    if w <= 0 || h <= 0 {
        return;
    }
    let (dx, dy) = device_origin(d, x, y);
    blit_within(
        d,
        Pixels::Offscreen(id),
        size,
        IRect::new(srcx, srcy, w, h),
        dx,
        dy,
    );
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use crate::backends::recording::{DrawCommand, RecordingDriver};
    use crate::driver::GraphicsDriver;
    use crate::error::DriverError;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    fn blits(d: &RecordingDriver) -> Vec<(i32, i32, RgbaImage)> {
        d.commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Image { x, y, pixels } => Some((*x, *y, pixels.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_draw_image_clips_source_offset() {
        let mut d = RecordingDriver::new();
        let id = d.cache_image(&checker(8, 8)).unwrap();
        // box starts two pixels left of the image
        d.draw_image(id, 10, 10, 6, 3, -2, 1);
        let out = blits(&d);
        assert_eq!(out.len(), 1);
        let (x, y, pixels) = &out[0];
        assert_eq!((*x, *y), (12, 10));
        assert_eq!(pixels.dimensions(), (4, 3));
    }

    #[test]
    fn test_draw_scaled_uses_nearest_samples() {
        let mut d = RecordingDriver::new();
        let id = d.cache_image(&checker(2, 2)).unwrap();
        assert!(d.draw_scaled(id, 0, 0, 4, 4));
        let (_, _, pixels) = &blits(&d)[0];
        assert_eq!(pixels.dimensions(), (4, 4));
        assert_eq!(pixels.get_pixel(0, 0), pixels.get_pixel(1, 1));
        assert_eq!(pixels.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(pixels.get_pixel(2, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_images_near_coordinate_limit() {
        let mut d = RecordingDriver::new();
        let id = d.cache_image(&checker(4, 4)).unwrap();
        assert!(d.draw_scaled(id, i32::MAX - 1, 0, 4, 4));
        assert!(!d.draw_scaled(id, 0, 0, i32::MAX, 1));
        d.draw_image(id, 0, 0, 4, 4, i32::MIN, 0);
        d.draw_image(id, i32::MAX, 0, i32::MAX, 4, -2, 0);
        let out = blits(&d);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].0, out[0].2.dimensions()), (i32::MAX - 1, (4, 4)));
        assert_eq!((out[1].0, out[1].2.dimensions()), (i32::MAX, (4, 4)));
    }

    #[test]
    fn test_stale_image_is_reported() {
        let mut d = RecordingDriver::new();
        let id = d.cache_image(&checker(2, 2)).unwrap();
        assert!(d.uncache_image(id));
        d.draw_image(id, 0, 0, 2, 2, 0, 0);
        assert!(matches!(
            d.take_error(),
            Some(DriverError::StaleHandle { kind: "image", .. })
        ));
        assert!(!d.uncache_image(id));
        assert!(blits(&d).is_empty());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let mut d = RecordingDriver::new();
        d.draw_image_buffer(&[0u8; 10], 0, 0, 2, 2, 3, 0);
        assert_eq!(
            d.take_error(),
            Some(DriverError::ShortImageData { needed: 12, got: 10 })
        );
    }

    #[test]
    fn test_mono_buffer_reads_first_byte_bottom_up() {
        let mut d = RecordingDriver::new();
        // two RGB rows stored bottom row first
        let data = [200, 1, 1, 210, 2, 2, 50, 3, 3, 60, 4, 4];
        d.draw_image_mono_buffer(&data, 3, 4, 2, 2, 3, -6);
        assert!(d.take_error().is_none());
        let (x, y, pixels) = &blits(&d)[0];
        assert_eq!((*x, *y), (3, 4));
        assert_eq!(pixels.get_pixel(0, 0).0, [50, 50, 50, 255]);
        assert_eq!(pixels.get_pixel(1, 0).0, [60, 60, 60, 255]);
        assert_eq!(pixels.get_pixel(1, 1).0, [210, 210, 210, 255]);
    }

    #[test]
    fn test_mono_scanlines_ignore_other_channels() {
        let mut d = RecordingDriver::new();
        d.draw_image_mono_scanlines(&checker(3, 2), 0, 0);
        d.draw_image_scanlines(&checker(3, 2), 0, 0);
        let out = blits(&d);
        assert_eq!(out[0].2, out[1].2);

        let tinted = RgbaImage::from_pixel(2, 2, Rgba([30, 200, 90, 10]));
        d.draw_image_mono_scanlines(&tinted, 0, 0);
        let (_, _, gray) = &blits(&d)[2];
        assert!(gray.pixels().all(|p| p.0 == [30, 30, 30, 255]));
    }

    #[test]
    fn test_mono_buffer_with_bad_depth_is_reported() {
        let mut d = RecordingDriver::new();
        d.draw_image_mono_buffer(&[0u8; 12], 0, 0, 1, 2, 6, 0);
        assert_eq!(d.take_error(), Some(DriverError::UnsupportedDepth(6)));
        assert!(blits(&d).is_empty());
    }

    #[test]
    fn test_copy_offscreen_translates_origin() {
        let mut d = RecordingDriver::new();
        let id = d.create_offscreen(16, 16);
        d.translate(5.0, 5.0);
        d.copy_offscreen(0, 0, 20, 20, id, 8, 8);
        let (x, y, pixels) = &blits(&d)[0];
        assert_eq!((*x, *y), (5, 5));
        assert_eq!(pixels.dimensions(), (8, 8));
        assert!(d.delete_offscreen(id));
        assert!(!d.delete_offscreen(id));
    }
}
