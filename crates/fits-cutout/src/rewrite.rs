//! Header rewrite for cutout output.
//!
//! The output header is rebuilt rather than patched: the structural
//! cards are emitted fresh from the cutout's shape, every other source
//! card is carried over in its original order, CRPIX1/CRPIX2 are
//! adjusted for the moved origin, and a CREATOR card records the tool.

use crate::card::{Card, Value};
use crate::pixels::PixelEncoding;

/// Keywords owned by the container structure. These are regenerated
/// from the cutout shape instead of being copied from the source.
const STRUCTURAL: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "PCOUNT",
    "GCOUNT", "END",
];

fn is_structural(keyword: &str) -> bool {
    STRUCTURAL.contains(&keyword)
}

/// Shift a CRPIX value by the crop origin, preserving the numeric type
/// the source header used. Non-numeric values are carried verbatim.
fn shifted_crpix(value: &Option<Value>, origin: i64) -> Option<Value> {
    match value {
        Some(Value::Integer(n)) => Some(Value::Integer(n - origin)),
        Some(Value::Float(f)) => Some(Value::Float(f - origin as f64)),
        other => other.clone(),
    }
}

/// Build the header for a cutout of shape `naxes` taken at `origin`
/// from the image described by `source_cards`.
pub fn rewrite_header(
    source_cards: &[Card],
    encoding: PixelEncoding,
    naxes: &[usize],
    origin: (i64, i64),
) -> Vec<Card> {
    let mut out = vec![
        Card::new(b"SIMPLE", Value::Logical(true)),
        Card::new(b"BITPIX", Value::Integer(encoding.bitpix())),
        Card::new(b"NAXIS", Value::Integer(naxes.len() as i64)),
    ];
    for (i, &dim) in naxes.iter().enumerate() {
        out.push(Card::new(
            format!("NAXIS{}", i + 1).as_bytes(),
            Value::Integer(dim as i64),
        ));
    }

    for card in source_cards {
        let keyword = card.keyword_str();
        if is_structural(keyword) {
            continue;
        }
        match keyword {
            "CRPIX1" => out.push(Card {
                keyword: card.keyword,
                value: shifted_crpix(&card.value, origin.0),
                comment: card.comment.clone(),
            }),
            "CRPIX2" => out.push(Card {
                keyword: card.keyword,
                value: shifted_crpix(&card.value, origin.1),
                comment: card.comment.clone(),
            }),
            _ => out.push(card.clone()),
        }
    }

    out.push(Card::with_comment(
        b"CREATOR",
        Value::Text(format!("fits-cutout {}", env!("CARGO_PKG_VERSION"))),
        "cutout pipeline",
    ));
    out
}
