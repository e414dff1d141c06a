//! The cutout pipeline: resolve, clamp, extract, rewrite, assemble.
//!
//! [`cutout`] is the one entry point. It takes an opened source, an
//! optional projection for sky regions, and a [`CutoutRequest`], and
//! returns the finished output bytes together with the clamped
//! geometry.

use crate::assemble;
use crate::error::{Error, Result};
use crate::extract;
#[cfg(feature = "raster")]
use crate::pixels::PixelBuffer;
#[cfg(feature = "raster")]
use crate::raster;
use crate::region::{self, CropResult, PixelRect};
use crate::rewrite::rewrite_header;
use crate::source::ImageSource;
use crate::wcs::Wcs;

/// How the requested region is expressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSpec {
    /// A circle on the sky, all angles in degrees.
    Sky { ra: f64, dec: f64, radius: f64 },
    /// An explicit rectangle in zero-based pixel coordinates.
    Pixels { x: i64, y: i64, width: i64, height: i64 },
}

/// The container the cutout is assembled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Fits,
    #[cfg(feature = "raster")]
    Png,
    #[cfg(feature = "raster")]
    AnimatedGif,
}

/// One cutout request against one source HDU.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutRequest {
    pub region: RegionSpec,
    /// For cubes, select a single plane; `None` keeps every plane.
    pub plane: Option<usize>,
    pub format: OutputFormat,
    /// Animated GIF frame delay; `None` takes the default.
    pub delay_ms: Option<u32>,
}

impl CutoutRequest {
    pub fn fits(region: RegionSpec) -> CutoutRequest {
        CutoutRequest {
            region,
            plane: None,
            format: OutputFormat::Fits,
            delay_ms: None,
        }
    }
}

/// A finished cutout: the encoded bytes plus the geometry they came
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutOutput {
    pub bytes: Vec<u8>,
    pub crop: CropResult,
    /// Output axis lengths, `[width, height]` or `[width, height, depth]`.
    pub naxes: Vec<usize>,
}

/// Pick the raster container that fits the result shape: PNG for a
/// single image, animated GIF when cube planes remain.
#[cfg(feature = "raster")]
pub fn raster_format(source: &ImageSource, plane: Option<usize>) -> OutputFormat {
    if source.is_cube() && plane.is_none() {
        OutputFormat::AnimatedGif
    } else {
        OutputFormat::Png
    }
}

fn resolve(region: RegionSpec, wcs: Option<&dyn Wcs>) -> Result<PixelRect> {
    match region {
        RegionSpec::Sky { ra, dec, radius } => {
            let wcs = wcs.ok_or(Error::Geometry("sky region requires a projection"))?;
            region::resolve_sky(wcs, ra, dec, radius)
        }
        RegionSpec::Pixels {
            x,
            y,
            width,
            height,
        } => region::resolve_pixels(x, y, width, height),
    }
}

/// Run one cutout request to completion.
pub fn cutout(
    source: &ImageSource,
    wcs: Option<&dyn Wcs>,
    request: &CutoutRequest,
) -> Result<CutoutOutput> {
    let rect = resolve(request.region, wcs)?;
    let crop = region::clamp(rect, source.width(), source.height())?;
    let rect = crop.rect;

    if request.plane.is_some() && !source.is_cube() {
        return Err(Error::Geometry("plane selection on a 2-D image"));
    }

    let (w, h) = (source.width(), source.height());
    let out_w = rect.width as usize;
    let out_h = rect.height as usize;

    match request.format {
        OutputFormat::Fits => {
            let (data, naxes) = match (source.depth(), request.plane) {
                (None, _) => (
                    extract::extract(&source.data, w, h, rect)?,
                    vec![out_w, out_h],
                ),
                (Some(d), None) => (
                    extract::extract_cube(&source.data, w, h, d, rect)?,
                    vec![out_w, out_h, d],
                ),
                (Some(d), Some(p)) => (
                    extract::extract_plane(&source.data, w, h, d, p, rect)?,
                    vec![out_w, out_h],
                ),
            };
            let cards = rewrite_header(
                &source.cards,
                source.encoding,
                &naxes,
                (rect.x, rect.y),
            );
            Ok(CutoutOutput {
                bytes: assemble::to_fits(&cards, &data),
                crop,
                naxes,
            })
        }

        #[cfg(feature = "raster")]
        OutputFormat::Png => {
            // Raster rows run top-down, FITS rows bottom-up.
            let data = match (source.depth(), request.plane) {
                (None, _) => extract::extract_flipped(&source.data, w, h, rect)?,
                (Some(_), None) => {
                    return Err(Error::Geometry("PNG output needs a single plane"));
                }
                (Some(d), Some(p)) => {
                    extract::extract_plane_flipped(&source.data, w, h, d, p, rect)?
                }
            };
            Ok(CutoutOutput {
                bytes: raster::to_png(&data, out_w, out_h)?,
                crop,
                naxes: vec![out_w, out_h],
            })
        }

        #[cfg(feature = "raster")]
        OutputFormat::AnimatedGif => {
            let depth = match (source.depth(), request.plane) {
                (Some(d), None) => d,
                _ => return Err(Error::Geometry("animated output needs cube planes")),
            };
            let mut planes = Vec::with_capacity(depth);
            for p in 0..depth {
                planes.push(extract::extract_plane_flipped(
                    &source.data,
                    w,
                    h,
                    depth,
                    p,
                    rect,
                )?);
            }
            let data = PixelBuffer::concat(&planes);
            let delay = request.delay_ms.unwrap_or(raster::DEFAULT_FRAME_DELAY_MS);
            Ok(CutoutOutput {
                bytes: raster::to_animated_gif(&data, out_w, out_h, depth, delay)?,
                crop,
                naxes: vec![out_w, out_h, depth],
            })
        }
    }
}
