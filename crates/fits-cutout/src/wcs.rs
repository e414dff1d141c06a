//! Sky-to-pixel projection seam.
//!
//! Region resolution only needs to turn (ra, dec) pairs into pixel
//! coordinates, so the projection lives behind the [`Wcs`] trait and a
//! full projection library can be plugged in at the call site.
//! [`KeywordWcs`] is the built-in linear adapter for headers that carry
//! CRVAL/CRPIX/CDELT without rotation or distortion terms.

use crate::card::{float_value, Card};
use crate::error::{Error, Result};

/// A projection from celestial coordinates to zero-based pixel
/// coordinates for one image.
pub trait Wcs {
    /// Pixel position of a sky coordinate, or `None` if the coordinate
    /// does not project onto the image plane. Degrees in, pixels out.
    fn pixel_for(&self, ra: f64, dec: f64) -> Option<(f64, f64)>;

    /// Sky coordinate at a pixel position, in degrees.
    fn world_for(&self, x: f64, y: f64) -> (f64, f64);

    /// Image width in pixels.
    fn width(&self) -> usize;

    /// Image height in pixels.
    fn height(&self) -> usize;
}

/// Linear WCS built from CRVALn/CRPIXn/CDELTn header cards.
///
/// Applies the standard cos(dec) foreshortening on the RA axis around
/// the reference point. CRPIX follows the FITS convention of
/// one-based pixel centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordWcs {
    crval: (f64, f64),
    crpix: (f64, f64),
    cdelt: (f64, f64),
    width: usize,
    height: usize,
}

impl KeywordWcs {
    pub fn new(
        crval: (f64, f64),
        crpix: (f64, f64),
        cdelt: (f64, f64),
        width: usize,
        height: usize,
    ) -> Result<KeywordWcs> {
        if cdelt.0 == 0.0 || cdelt.1 == 0.0 {
            return Err(Error::InvalidHeader("zero CDELT"));
        }
        Ok(KeywordWcs {
            crval,
            crpix,
            cdelt,
            width,
            height,
        })
    }

    /// Build from header cards. All six WCS keywords must be present.
    pub fn from_cards(cards: &[Card], width: usize, height: usize) -> Result<KeywordWcs> {
        let get = |kw: &'static str| float_value(cards, kw).ok_or(Error::MissingKeyword(kw));
        KeywordWcs::new(
            (get("CRVAL1")?, get("CRVAL2")?),
            (get("CRPIX1")?, get("CRPIX2")?),
            (get("CDELT1")?, get("CDELT2")?),
            width,
            height,
        )
    }

    /// Absolute pixel scale on each axis, degrees per pixel.
    pub fn pixel_scale(&self) -> (f64, f64) {
        (self.cdelt.0.abs(), self.cdelt.1.abs())
    }
}

/// Difference `a - b` folded into (-180, 180] degrees.
pub fn wrap_diff(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

impl Wcs for KeywordWcs {
    fn pixel_for(&self, ra: f64, dec: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&dec) {
            return None;
        }
        let cos_dec = libm::cos(self.crval.1.to_radians());
        let x = self.crpix.0 - 1.0 + wrap_diff(ra, self.crval.0) * cos_dec / self.cdelt.0;
        let y = self.crpix.1 - 1.0 + (dec - self.crval.1) / self.cdelt.1;
        Some((x, y))
    }

    fn world_for(&self, x: f64, y: f64) -> (f64, f64) {
        let cos_dec = libm::cos(self.crval.1.to_radians());
        let ra = self.crval.0 + (x - (self.crpix.0 - 1.0)) * self.cdelt.0 / cos_dec;
        let dec = self.crval.1 + (y - (self.crpix.1 - 1.0)) * self.cdelt.1;
        (ra.rem_euclid(360.0), dec)
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}
