//! Region cutouts from FITS images.
//!
//! Opens one image HDU, resolves a requested region (a sky circle
//! through a pluggable [`Wcs`] projection, or an explicit pixel
//! rectangle), clamps it against the image bounds, copies the pixels
//! out, rewrites the header so the cutout stands alone, and assembles
//! the result as FITS or, with the `raster` feature, as a PNG or an
//! animated GIF of cube planes.
//!
//! ```no_run
//! use fits_cutout::{cutout, CutoutRequest, ImageSource, RegionSpec};
//!
//! # fn main() -> fits_cutout::Result<()> {
//! let source = ImageSource::open("field.fits", 0)?;
//! let request = CutoutRequest::fits(RegionSpec::Pixels {
//!     x: 100,
//!     y: 100,
//!     width: 64,
//!     height: 64,
//! });
//! let out = cutout(&source, None, &request)?;
//! std::fs::write("cutout.fits", &out.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod card;
pub mod cutout;
pub mod error;
pub mod extract;
pub mod pixels;
#[cfg(feature = "raster")]
pub mod raster;
pub mod region;
pub mod rewrite;
pub mod source;
pub mod wcs;

pub use cutout::{cutout, CutoutOutput, CutoutRequest, OutputFormat, RegionSpec};
#[cfg(feature = "raster")]
pub use cutout::raster_format;
pub use error::{Error, Result};
pub use pixels::{PixelBuffer, PixelEncoding, Sample};
pub use region::{CropResult, PixelRect};
pub use source::ImageSource;
pub use wcs::{KeywordWcs, Wcs};
