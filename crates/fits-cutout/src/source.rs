//! The opened FITS source an individual cutout request works against.
//!
//! An [`ImageSource`] is one selected HDU: its header cards, pixel
//! encoding, axis lengths, and decoded pixel data. It is created per
//! request, treated as read-only for the duration of the call, and
//! discarded afterwards.

use std::path::Path;

use crate::card::{
    header_byte_len, integer_value, padded_byte_len, parse_header_blocks, Card,
};
use crate::error::{Error, Result};
use crate::pixels::{PixelBuffer, PixelEncoding};

/// One FITS image HDU, opened for a single cutout operation.
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// All header cards of the selected HDU (END excluded).
    pub cards: Vec<Card>,
    /// The pixel encoding, from BITPIX.
    pub encoding: PixelEncoding,
    /// Axis lengths: `[NAXIS1, NAXIS2]` or `[NAXIS1, NAXIS2, NAXIS3]`.
    pub naxes: Vec<usize>,
    /// Decoded pixel data, row-major, planes contiguous for cubes.
    pub data: PixelBuffer,
}

impl ImageSource {
    /// Image width (NAXIS1).
    pub fn width(&self) -> usize {
        self.naxes[0]
    }

    /// Image height (NAXIS2).
    pub fn height(&self) -> usize {
        self.naxes[1]
    }

    /// Cube depth (NAXIS3), or `None` for a 2-D image.
    pub fn depth(&self) -> Option<usize> {
        self.naxes.get(2).copied()
    }

    /// Returns `true` if the source has a third axis.
    pub fn is_cube(&self) -> bool {
        self.naxes.len() == 3
    }

    /// Assemble a source from already-decoded parts, validating that the
    /// data length matches the declared shape.
    pub fn from_parts(cards: Vec<Card>, naxes: Vec<usize>, data: PixelBuffer) -> Result<ImageSource> {
        if naxes.len() != 2 && naxes.len() != 3 {
            return Err(Error::InvalidHeader("cutout source must be 2-D or 3-D"));
        }
        let expected: usize = naxes.iter().product();
        if data.len() != expected {
            return Err(Error::InvalidHeader("pixel count does not match NAXISn"));
        }
        Ok(ImageSource {
            cards,
            encoding: data.encoding(),
            naxes,
            data,
        })
    }

    /// Open HDU `hdu_index` of an in-memory FITS byte stream.
    ///
    /// Scans consecutive HDUs (header length from the END card, data
    /// length from BITPIX and NAXISn) until the requested index, then
    /// decodes that HDU's pixel data. The selected HDU must be a 2-D
    /// image or a 3-D cube.
    pub fn from_fits_bytes(bytes: &[u8], hdu_index: usize) -> Result<ImageSource> {
        let mut offset = 0usize;
        for index in 0.. {
            if offset >= bytes.len() {
                return Err(Error::NoSuchHdu(hdu_index));
            }
            let header_len = header_byte_len(&bytes[offset..])?;
            let cards = parse_header_blocks(&bytes[offset..offset + header_len])?;
            let data_len = hdu_data_len(&cards, index == 0)?;

            if index == hdu_index {
                return Self::decode_hdu(&bytes[offset..], header_len, cards, data_len);
            }
            offset += header_len + padded_byte_len(data_len);
        }
        unreachable!()
    }

    /// Read a FITS file from disk and open HDU `hdu_index`.
    ///
    /// I/O failures surface as [`Error::SourceAccess`].
    pub fn open<P: AsRef<Path>>(path: P, hdu_index: usize) -> Result<ImageSource> {
        let bytes = std::fs::read(path)?;
        Self::from_fits_bytes(&bytes, hdu_index)
    }

    fn decode_hdu(
        hdu_bytes: &[u8],
        header_len: usize,
        mut cards: Vec<Card>,
        data_len: usize,
    ) -> Result<ImageSource> {
        let bitpix = integer_value(&cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?;
        let encoding = PixelEncoding::from_bitpix(bitpix)?;
        let naxes = read_naxes(&cards)?;
        if naxes.len() != 2 && naxes.len() != 3 {
            return Err(Error::InvalidHeader("cutout source must be 2-D or 3-D"));
        }

        let data_end = header_len + data_len;
        if data_end > hdu_bytes.len() {
            return Err(Error::UnexpectedEof);
        }
        let data = PixelBuffer::decode_be(encoding, &hdu_bytes[header_len..data_end]);

        cards.retain(|c| !c.is_end());
        Self::from_parts(cards, naxes, data)
    }
}

fn read_naxes(cards: &[Card]) -> Result<Vec<usize>> {
    let naxis = integer_value(cards, "NAXIS").ok_or(Error::MissingKeyword("NAXIS"))?;
    if naxis < 0 {
        return Err(Error::InvalidHeader("negative NAXIS"));
    }
    let mut naxes = Vec::with_capacity(naxis as usize);
    for i in 1..=naxis {
        let kw = format!("NAXIS{i}");
        let dim = integer_value(cards, &kw).ok_or(Error::MissingKeyword("NAXISn"))?;
        if dim < 0 {
            return Err(Error::InvalidHeader("negative NAXISn"));
        }
        naxes.push(dim as usize);
    }
    Ok(naxes)
}

/// Unpadded data segment length for an HDU:
/// `|BITPIX|/8 * GCOUNT * (PCOUNT + ΠNAXISn)`, where PCOUNT counts
/// BITPIX-sized elements.
fn hdu_data_len(cards: &[Card], is_primary: bool) -> Result<usize> {
    let bitpix = integer_value(cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?;
    let naxes = read_naxes(cards)?;
    if naxes.is_empty() {
        return Ok(0);
    }

    let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
    let total_pixels: usize = naxes
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(Error::InvalidHeader("pixel count overflow"))?;

    let pcount = if is_primary {
        0
    } else {
        integer_value(cards, "PCOUNT").unwrap_or(0).max(0) as usize
    };
    let gcount = if is_primary {
        1
    } else {
        integer_value(cards, "GCOUNT").unwrap_or(1).max(1) as usize
    };

    total_pixels
        .checked_add(pcount)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or(Error::InvalidHeader("data size overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{serialize_header, Value};

    fn image_cards(bitpix: i64, dims: &[usize]) -> Vec<Card> {
        let mut cards = vec![
            Card::new(b"SIMPLE", Value::Logical(true)),
            Card::new(b"BITPIX", Value::Integer(bitpix)),
            Card::new(b"NAXIS", Value::Integer(dims.len() as i64)),
        ];
        for (i, &d) in dims.iter().enumerate() {
            cards.push(Card::new(
                format!("NAXIS{}", i + 1).as_bytes(),
                Value::Integer(d as i64),
            ));
        }
        cards
    }

    fn fits_bytes(cards: &[Card], data: &PixelBuffer) -> Vec<u8> {
        let mut out = serialize_header(cards);
        out.extend_from_slice(&data.encode_be());
        out
    }

    #[test]
    fn open_primary_2d() {
        let data = PixelBuffer::I16((0..12).collect());
        let bytes = fits_bytes(&image_cards(16, &[4, 3]), &data);
        let src = ImageSource::from_fits_bytes(&bytes, 0).unwrap();

        assert_eq!(src.width(), 4);
        assert_eq!(src.height(), 3);
        assert!(!src.is_cube());
        assert_eq!(src.encoding, PixelEncoding::I16);
        assert_eq!(src.data, data);
        assert!(src.cards.iter().all(|c| !c.is_end()));
    }

    #[test]
    fn open_cube() {
        let data = PixelBuffer::F32((0..24).map(|i| i as f32).collect());
        let bytes = fits_bytes(&image_cards(-32, &[4, 3, 2]), &data);
        let src = ImageSource::from_fits_bytes(&bytes, 0).unwrap();

        assert!(src.is_cube());
        assert_eq!(src.depth(), Some(2));
        assert_eq!(src.data.len(), 24);
    }

    #[test]
    fn open_second_hdu() {
        // Primary with no data, then an IMAGE extension.
        let primary = vec![
            Card::new(b"SIMPLE", Value::Logical(true)),
            Card::new(b"BITPIX", Value::Integer(8)),
            Card::new(b"NAXIS", Value::Integer(0)),
        ];
        let mut ext = vec![
            Card::new(b"XTENSION", Value::Text(String::from("IMAGE"))),
            Card::new(b"BITPIX", Value::Integer(8)),
            Card::new(b"NAXIS", Value::Integer(2)),
            Card::new(b"NAXIS1", Value::Integer(2)),
            Card::new(b"NAXIS2", Value::Integer(2)),
            Card::new(b"PCOUNT", Value::Integer(0)),
            Card::new(b"GCOUNT", Value::Integer(1)),
        ];
        ext.push(Card::new(b"EXTNAME", Value::Text(String::from("SCI"))));

        let mut bytes = serialize_header(&primary);
        bytes.extend_from_slice(&fits_bytes(&ext, &PixelBuffer::U8(vec![9, 8, 7, 6])));

        let src = ImageSource::from_fits_bytes(&bytes, 1).unwrap();
        assert_eq!(src.width(), 2);
        assert_eq!(src.data, PixelBuffer::U8(vec![9, 8, 7, 6]));
    }

    #[test]
    fn pcount_counts_elements_not_bytes() {
        // Middle extension: BITPIX 16, 2x2 image, PCOUNT 1441 heap
        // elements. Its data segment is (1441 + 4) * 2 = 2890 bytes,
        // two blocks; the scan must skip both to reach HDU 2.
        let primary = vec![
            Card::new(b"SIMPLE", Value::Logical(true)),
            Card::new(b"BITPIX", Value::Integer(8)),
            Card::new(b"NAXIS", Value::Integer(0)),
        ];
        let middle = vec![
            Card::new(b"XTENSION", Value::Text(String::from("IMAGE"))),
            Card::new(b"BITPIX", Value::Integer(16)),
            Card::new(b"NAXIS", Value::Integer(2)),
            Card::new(b"NAXIS1", Value::Integer(2)),
            Card::new(b"NAXIS2", Value::Integer(2)),
            Card::new(b"PCOUNT", Value::Integer(1441)),
            Card::new(b"GCOUNT", Value::Integer(1)),
        ];
        let last = vec![
            Card::new(b"XTENSION", Value::Text(String::from("IMAGE"))),
            Card::new(b"BITPIX", Value::Integer(8)),
            Card::new(b"NAXIS", Value::Integer(2)),
            Card::new(b"NAXIS1", Value::Integer(3)),
            Card::new(b"NAXIS2", Value::Integer(1)),
            Card::new(b"PCOUNT", Value::Integer(0)),
            Card::new(b"GCOUNT", Value::Integer(1)),
        ];

        let mut bytes = serialize_header(&primary);
        bytes.extend_from_slice(&serialize_header(&middle));
        bytes.resize(bytes.len() + 2 * crate::card::BLOCK_SIZE, 0);
        bytes.extend_from_slice(&fits_bytes(&last, &PixelBuffer::U8(vec![5, 6, 7])));

        let src = ImageSource::from_fits_bytes(&bytes, 2).unwrap();
        assert_eq!(src.naxes, vec![3, 1]);
        assert_eq!(src.data, PixelBuffer::U8(vec![5, 6, 7]));
    }

    #[test]
    fn missing_hdu_index() {
        let data = PixelBuffer::U8(vec![0; 4]);
        let bytes = fits_bytes(&image_cards(8, &[2, 2]), &data);
        assert!(matches!(
            ImageSource::from_fits_bytes(&bytes, 2),
            Err(Error::NoSuchHdu(2))
        ));
    }

    #[test]
    fn unsupported_bitpix_rejected() {
        let bytes = fits_bytes(&image_cards(64, &[2, 2]), &PixelBuffer::U8(vec![0; 32]));
        assert!(matches!(
            ImageSource::from_fits_bytes(&bytes, 0),
            Err(Error::UnsupportedEncoding(64))
        ));
    }

    #[test]
    fn one_dimensional_source_rejected() {
        let bytes = fits_bytes(&image_cards(8, &[16]), &PixelBuffer::U8(vec![0; 16]));
        assert!(matches!(
            ImageSource::from_fits_bytes(&bytes, 0),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn truncated_data_segment() {
        let data = PixelBuffer::I16((0..100).collect());
        let mut bytes = fits_bytes(&image_cards(16, &[10, 10]), &data);
        bytes.truncate(bytes.len() - crate::card::BLOCK_SIZE);
        assert!(matches!(
            ImageSource::from_fits_bytes(&bytes, 0),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn from_parts_validates_shape() {
        let err = ImageSource::from_parts(
            Vec::new(),
            vec![4, 4],
            PixelBuffer::U8(vec![0; 15]),
        );
        assert!(matches!(err, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn open_missing_file_is_source_access() {
        let err = ImageSource::open("/nonexistent/path/to.fits", 0);
        assert!(matches!(err, Err(Error::SourceAccess(_))));
    }

    #[test]
    fn open_from_disk() {
        let data = PixelBuffer::F64(vec![1.0, 2.0, 3.0, 4.0]);
        let bytes = fits_bytes(&image_cards(-64, &[2, 2]), &data);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.fits");
        std::fs::write(&path, &bytes).unwrap();

        let src = ImageSource::open(&path, 0).unwrap();
        assert_eq!(src.data, data);
    }
}
