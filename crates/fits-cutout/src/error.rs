/// All errors that can occur while computing a cutout.
#[derive(Debug)]
pub enum Error {
    /// Invalid sky or pixel inputs (caller fault, not retried).
    Geometry(&'static str),
    /// The requested rectangle does not intersect the image at all.
    RegionOutOfBounds,
    /// Unrecognized BITPIX value; the source data is malformed or uses
    /// an encoding the engine does not support.
    UnsupportedEncoding(i64),
    /// Malformed FITS header block in the source.
    InvalidHeader(&'static str),
    /// Malformed keyword name in a header card.
    InvalidKeyword,
    /// A required keyword was not found in the header.
    MissingKeyword(&'static str),
    /// Premature end of data while scanning the source.
    UnexpectedEof,
    /// The requested HDU index does not exist in the source.
    NoSuchHdu(usize),
    /// The raster encoder failed to serialize a frame.
    #[cfg(feature = "raster")]
    Encoding(image::ImageError),
    /// Failure reading the FITS source itself.
    SourceAccess(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Geometry(msg) => write!(f, "invalid cutout geometry: {msg}"),
            Error::RegionOutOfBounds => write!(f, "requested region does not intersect the image"),
            Error::UnsupportedEncoding(bp) => write!(f, "unsupported pixel encoding: BITPIX {bp}"),
            Error::InvalidHeader(msg) => write!(f, "invalid FITS header: {msg}"),
            Error::InvalidKeyword => write!(f, "invalid keyword name"),
            Error::MissingKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::NoSuchHdu(n) => write!(f, "no HDU at index {n}"),
            #[cfg(feature = "raster")]
            Error::Encoding(e) => write!(f, "raster encoding failed: {e}"),
            Error::SourceAccess(e) => write!(f, "failed to read FITS source: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceAccess(e) => Some(e),
            #[cfg(feature = "raster")]
            Error::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::SourceAccess(e)
    }
}

#[cfg(feature = "raster")]
impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Encoding(e)
    }
}
