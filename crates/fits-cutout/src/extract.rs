//! Pixel extraction from 2-D images and 3-D cubes.
//!
//! One generic row-copy loop serves all five encodings; the encoding
//! dispatch happens once per call, at the [`PixelBuffer`] match.
//! Extraction always allocates a fresh buffer and leaves the source
//! untouched.

use crate::error::{Error, Result};
use crate::pixels::{PixelBuffer, Sample};
use crate::region::PixelRect;

// Apply one generic body to whichever typed vector the buffer holds,
// rewrapping the result under the same tag.
macro_rules! per_encoding {
    ($buf:expr, |$v:ident| $body:expr) => {
        match $buf {
            PixelBuffer::U8($v) => PixelBuffer::U8($body),
            PixelBuffer::I16($v) => PixelBuffer::I16($body),
            PixelBuffer::I32($v) => PixelBuffer::I32($body),
            PixelBuffer::F32($v) => PixelBuffer::F32($body),
            PixelBuffer::F64($v) => PixelBuffer::F64($body),
        }
    };
}

/// Copy `rect` out of one `width`-by-`height` plane, optionally
/// reversing the row order. `rect` must already be validated.
fn copy_rows<T: Sample>(
    plane: &[T],
    width: usize,
    rect: PixelRect,
    flip: bool,
) -> Vec<T> {
    let (rx, ry) = (rect.x as usize, rect.y as usize);
    let (rw, rh) = (rect.width as usize, rect.height as usize);

    if rx == 0 && rw == width && !flip {
        // Full-width rows are contiguous; one slice copy.
        return plane[ry * width..(ry + rh) * width].to_vec();
    }

    let mut out = Vec::with_capacity(rw * rh);
    for row in 0..rh {
        let src_row = if flip { ry + rh - 1 - row } else { ry + row };
        let start = src_row * width + rx;
        out.extend_from_slice(&plane[start..start + rw]);
    }
    out
}

fn validate(rect: PixelRect, width: usize, height: usize) -> Result<()> {
    if rect.width <= 0 || rect.height <= 0 {
        return Err(Error::Geometry("extraction rectangle is empty"));
    }
    if rect.x < 0
        || rect.y < 0
        || rect.x + rect.width > width as i64
        || rect.y + rect.height > height as i64
    {
        return Err(Error::Geometry("extraction rectangle outside the image"));
    }
    Ok(())
}

/// Extract a rectangle from a 2-D image.
pub fn extract(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    rect: PixelRect,
) -> Result<PixelBuffer> {
    validate(rect, width, height)?;
    Ok(per_encoding!(data, |v| copy_rows(v, width, rect, false)))
}

/// Extract a rectangle from a 2-D image with the row order reversed.
pub fn extract_flipped(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    rect: PixelRect,
) -> Result<PixelBuffer> {
    validate(rect, width, height)?;
    Ok(per_encoding!(data, |v| copy_rows(v, width, rect, true)))
}

/// Extract one plane of a 3-D cube.
pub fn extract_plane(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    depth: usize,
    plane: usize,
    rect: PixelRect,
) -> Result<PixelBuffer> {
    validate(rect, width, height)?;
    if plane >= depth {
        return Err(Error::Geometry("plane index past NAXIS3"));
    }
    let plane_len = width * height;
    let offset = plane * plane_len;
    Ok(per_encoding!(data, |v| copy_rows(
        &v[offset..offset + plane_len],
        width,
        rect,
        false
    )))
}

/// Extract one plane of a 3-D cube with the row order reversed, in a
/// single pass.
pub fn extract_plane_flipped(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    depth: usize,
    plane: usize,
    rect: PixelRect,
) -> Result<PixelBuffer> {
    validate(rect, width, height)?;
    if plane >= depth {
        return Err(Error::Geometry("plane index past NAXIS3"));
    }
    let plane_len = width * height;
    let offset = plane * plane_len;
    Ok(per_encoding!(data, |v| copy_rows(
        &v[offset..offset + plane_len],
        width,
        rect,
        true
    )))
}

/// Extract the same rectangle from every plane of a 3-D cube,
/// producing a contiguous cube-shaped buffer.
pub fn extract_cube(
    data: &PixelBuffer,
    width: usize,
    height: usize,
    depth: usize,
    rect: PixelRect,
) -> Result<PixelBuffer> {
    validate(rect, width, height)?;
    let plane_len = width * height;
    Ok(per_encoding!(data, |v| {
        let mut out = Vec::with_capacity(rect.width as usize * rect.height as usize * depth);
        for p in 0..depth {
            out.extend_from_slice(&copy_rows(
                &v[p * plane_len..(p + 1) * plane_len],
                width,
                rect,
                false,
            ));
        }
        out
    }))
}

/// Reverse the row order of a 2-D buffer in place. Applying it twice
/// restores the original.
pub fn flip_rows(data: &mut PixelBuffer, width: usize, height: usize) {
    fn flip_in_place<T: Sample>(plane: &mut [T], width: usize, height: usize) {
        for row in 0..height / 2 {
            let (top, rest) = plane.split_at_mut((height - 1 - row) * width);
            top[row * width..(row + 1) * width].swap_with_slice(&mut rest[..width]);
        }
    }
    match data {
        PixelBuffer::U8(v) => flip_in_place(v, width, height),
        PixelBuffer::I16(v) => flip_in_place(v, width, height),
        PixelBuffer::I32(v) => flip_in_place(v, width, height),
        PixelBuffer::F32(v) => flip_in_place(v, width, height),
        PixelBuffer::F64(v) => flip_in_place(v, width, height),
    }
}
