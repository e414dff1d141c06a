//! Final assembly of a cutout into a standalone FITS byte stream.

use crate::card::serialize_header;
use crate::card::Card;
use crate::pixels::PixelBuffer;

/// Serialize a rewritten header and its pixel data into a complete
/// single-HDU FITS file: header blocks, then big-endian data padded to
/// a block boundary.
pub fn to_fits(cards: &[Card], data: &PixelBuffer) -> Vec<u8> {
    let mut out = serialize_header(cards);
    out.extend_from_slice(&data.encode_be());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Value, BLOCK_SIZE};
    use crate::pixels::PixelEncoding;
    use crate::rewrite::rewrite_header;
    use crate::source::ImageSource;

    #[test]
    fn output_reopens_as_a_valid_source() {
        let data = PixelBuffer::I16((0..6).collect());
        let cards = rewrite_header(&[], PixelEncoding::I16, &[3, 2], (0, 0));
        let bytes = to_fits(&cards, &data);

        assert_eq!(bytes.len() % BLOCK_SIZE, 0);
        let reopened = ImageSource::from_fits_bytes(&bytes, 0).unwrap();
        assert_eq!(reopened.width(), 3);
        assert_eq!(reopened.height(), 2);
        assert_eq!(reopened.data, data);
    }

    #[test]
    fn cube_output_roundtrips() {
        let data = PixelBuffer::F64((0..12).map(|i| i as f64).collect());
        let cards = rewrite_header(&[], PixelEncoding::F64, &[2, 3, 2], (0, 0));
        let reopened = ImageSource::from_fits_bytes(&to_fits(&cards, &data), 0).unwrap();
        assert_eq!(reopened.depth(), Some(2));
        assert_eq!(reopened.data, data);
    }

    #[test]
    fn carried_cards_survive_the_roundtrip() {
        let source_cards = vec![Card::new(b"OBJECT", Value::Text(String::from("NGC 253")))];
        let cards = rewrite_header(&source_cards, PixelEncoding::U8, &[2, 2], (0, 0));
        let reopened =
            ImageSource::from_fits_bytes(&to_fits(&cards, &PixelBuffer::U8(vec![0; 4])), 0)
                .unwrap();
        let object = crate::card::find_card(&reopened.cards, "OBJECT").unwrap();
        assert_eq!(object.value, Some(Value::Text(String::from("NGC 253"))));
    }
}
