//! Raster output: PNG previews and animated GIFs of cube cutouts.
//!
//! Pixel values are stretched to 8-bit grayscale with a linear min-max
//! mapping per frame. Non-finite samples render as black. Encoding is
//! delegated to the `image` crate.

use std::io::Cursor;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, GrayImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::pixels::{PixelBuffer, Sample};

/// Default frame delay for animated cube output, in milliseconds.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 500;

fn stretch<T: Sample>(samples: &[T]) -> Vec<u8> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in samples {
        let v = s.as_f64();
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min >= max {
        // Flat or all-NaN frame.
        return vec![0; samples.len()];
    }
    let scale = 255.0 / (max - min);
    samples
        .iter()
        .map(|s| {
            let v = s.as_f64();
            if v.is_finite() {
                ((v - min) * scale) as u8
            } else {
                0
            }
        })
        .collect()
}

fn gray_frame(data: &PixelBuffer, width: usize, height: usize) -> Result<GrayImage> {
    if data.len() != width * height {
        return Err(Error::Geometry("raster frame size mismatch"));
    }
    let luma = match data {
        PixelBuffer::U8(v) => stretch(v),
        PixelBuffer::I16(v) => stretch(v),
        PixelBuffer::I32(v) => stretch(v),
        PixelBuffer::F32(v) => stretch(v),
        PixelBuffer::F64(v) => stretch(v),
    };
    GrayImage::from_raw(width as u32, height as u32, luma)
        .ok_or(Error::Geometry("raster frame size mismatch"))
}

/// Encode a 2-D buffer as a grayscale PNG.
pub fn to_png(data: &PixelBuffer, width: usize, height: usize) -> Result<Vec<u8>> {
    let frame = gray_frame(data, width, height)?;
    let mut bytes = Vec::new();
    frame.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Encode a cube buffer as a looping animated GIF, one frame per plane.
pub fn to_animated_gif(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    depth: usize,
    delay_ms: u32,
) -> Result<Vec<u8>> {
    if depth == 0 || data.len() != width * height * depth {
        return Err(Error::Geometry("raster cube size mismatch"));
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(Cursor::new(&mut bytes));
        encoder.set_repeat(Repeat::Infinite)?;

        let plane_len = width * height;
        for p in 0..depth {
            let plane = crate::extract::extract_plane(
                data,
                width,
                height,
                depth,
                p,
                crate::region::PixelRect::new(0, 0, width as i64, height as i64),
            )?;
            debug_assert_eq!(plane.len(), plane_len);
            let gray = gray_frame(&plane, width, height)?;
            let rgba = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
                let l = gray.get_pixel(x, y)[0];
                Rgba([l, l, l, 255])
            });
            encoder.encode_frame(Frame::from_parts(
                rgba,
                0,
                0,
                Delay::from_numer_denom_ms(delay_ms, 1),
            ))?;
        }
    }
    Ok(bytes)
}
