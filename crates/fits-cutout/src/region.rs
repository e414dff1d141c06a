//! Region resolution and clamping.
//!
//! A request arrives either as a sky circle (ra, dec, radius in
//! degrees) or as a pixel rectangle. Both are resolved to a
//! [`PixelRect`] that may extend past the image, then clamped against
//! the image bounds, producing the reference-pixel shift the header
//! rewrite needs.

use crate::error::{Error, Result};
use crate::wcs::Wcs;

/// A rectangle in zero-based pixel coordinates. Coordinates are signed
/// so that a resolved region can extend past the image edges before
/// clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> PixelRect {
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// A clamped region together with the reference-pixel shift on each
/// axis, i.e. how far the requested origin sat outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropResult {
    pub rect: PixelRect,
    pub crpix_shift_x: i64,
    pub crpix_shift_y: i64,
}

/// Resolve a sky circle to the bounding pixel rectangle that encloses
/// it.
///
/// The angular radius widens in RA toward the poles: the half-width of
/// the spherical cap at declination `dec` is `asin(sin r / cos dec)`,
/// and a cap that contains a pole spans the full RA circle. The
/// rectangle is centered on the projected center pixel and sized from
/// the furthest of the four cardinal edge points.
pub fn resolve_sky(wcs: &dyn Wcs, ra: f64, dec: f64, radius: f64) -> Result<PixelRect> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::Geometry("radius must be non-negative"));
    }
    if !ra.is_finite() || !(0.0..360.0).contains(&ra) {
        return Err(Error::Geometry("right ascension outside [0, 360)"));
    }
    if !(-90.0..=90.0).contains(&dec) {
        return Err(Error::Geometry("declination outside [-90, 90]"));
    }
    let (cx, cy) = wcs
        .pixel_for(ra, dec)
        .ok_or(Error::Geometry("center does not project onto the image"))?;

    let ra_half = if dec.abs() + radius >= 90.0 {
        // Cap contains a pole; every RA falls inside it.
        180.0
    } else {
        libm::asin(libm::sin(radius.to_radians()) / libm::cos(dec.to_radians())).to_degrees()
    };

    let edges = [
        (ra + ra_half, dec),
        (ra - ra_half, dec),
        (ra, (dec + radius).min(90.0)),
        (ra, (dec - radius).max(-90.0)),
    ];

    let mut half_x = 0.0f64;
    let mut half_y = 0.0f64;
    for &(era, edec) in &edges {
        let (ex, ey) = wcs
            .pixel_for(era.rem_euclid(360.0), edec)
            .ok_or(Error::Geometry("region edge does not project onto the image"))?;
        half_x = half_x.max((ex - cx).abs());
        half_y = half_y.max((ey - cy).abs());
    }

    let width = (libm::ceil(2.0 * half_x) as i64).max(1);
    let height = (libm::ceil(2.0 * half_y) as i64).max(1);
    Ok(PixelRect {
        x: libm::round(cx) as i64 - width / 2,
        y: libm::round(cy) as i64 - height / 2,
        width,
        height,
    })
}

/// Validate an explicit pixel rectangle request. The origin may be
/// negative; the size must be positive.
pub fn resolve_pixels(x: i64, y: i64, width: i64, height: i64) -> Result<PixelRect> {
    if width <= 0 || height <= 0 {
        return Err(Error::Geometry("region size must be positive"));
    }
    Ok(PixelRect {
        x,
        y,
        width,
        height,
    })
}

/// Clamp one axis of a region against `[0, naxis)`.
///
/// Returns the clamped start and length plus the shift `start - start'`.
/// A region with no overlap at all is an error. A region that covers
/// the whole axis collapses to the axis itself with zero shift. A
/// partial overhang slides the window back inside, keeping the
/// requested length when it fits.
fn clamp_axis(start: i64, len: i64, naxis: i64) -> Result<(i64, i64, i64)> {
    if start >= naxis || start + len <= 0 {
        return Err(Error::RegionOutOfBounds);
    }
    if start <= 0 && start + len >= naxis {
        return Ok((0, naxis, 0));
    }
    let mut s = start.max(0);
    if s + len > naxis {
        s = (naxis - len).max(0);
    }
    let clamped_len = len.min(naxis - s);
    Ok((s, clamped_len, start - s))
}

/// Clamp a resolved region against the image bounds.
pub fn clamp(rect: PixelRect, naxis1: usize, naxis2: usize) -> Result<CropResult> {
    let (x, width, shift_x) = clamp_axis(rect.x, rect.width, naxis1 as i64)?;
    let (y, height, shift_y) = clamp_axis(rect.y, rect.height, naxis2 as i64)?;
    Ok(CropResult {
        rect: PixelRect {
            x,
            y,
            width,
            height,
        },
        crpix_shift_x: shift_x,
        crpix_shift_y: shift_y,
    })
}
