//! FITS header cards: 80-byte keyword records, typed values, and
//! block serialization.
//!
//! Only the subset of the FITS header grammar the cutout pipeline needs
//! is implemented: parsing cards into typed values, rewriting them, and
//! serializing a card list back into space-padded 2880-byte blocks.

use core::str;

use crate::error::{Error, Result};

/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Returns the total byte length (in whole 2880-byte blocks) required to
/// hold `num_bytes` bytes; 0 stays 0.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    if num_bytes == 0 {
        return 0;
    }
    num_bytes.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

// ── Values ──

/// A typed FITS header value.
///
/// Numeric re-typing follows a fixed priority: a value field is tried as
/// an integer first, then as a float, and only then kept as text. This
/// preserves numeric precision where possible and never fails on
/// malformed numerics.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string, or any field that failed numeric parsing.
    Text(String),
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace(['D', 'd'], "E");
    normalized.parse::<f64>().ok()
}

/// Re-type a raw value field: integer first, then float, then text.
pub fn retype(text: &str) -> Value {
    let trimmed = text.trim();
    if !trimmed.contains('.')
        && !trimmed.contains(['E', 'e', 'D', 'd'])
    {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Integer(n);
        }
    }
    if let Some(f) = parse_float_str(trimmed) {
        return Value::Float(f);
    }
    Value::Text(String::from(trimmed))
}

/// Split a non-string value field at the ` /` comment separator.
///
/// The standard separator is ` / ` but files written by IDL and friends
/// omit the trailing space; both forms are accepted.
fn split_comment(field: &[u8]) -> (&[u8], Option<&str>) {
    let len = field.len();
    let mut i = 0;
    while i + 1 < len {
        if field[i] == b' ' && field[i + 1] == b'/' {
            let mut comment_start = i + 2;
            if comment_start < len && field[comment_start] == b' ' {
                comment_start += 1;
            }
            let comment = str::from_utf8(&field[comment_start..])
                .ok()
                .map(|s| s.trim_end());
            return (&field[..i], comment.filter(|s| !s.is_empty()));
        }
        i += 1;
    }
    (field, None)
}

/// Parse a quoted FITS string value, returning the value and the byte
/// position just past the closing quote.
fn parse_quoted(field: &[u8]) -> (String, usize) {
    let mut value = String::new();
    let mut i = 1; // skip opening quote
    let len = field.len();

    loop {
        if i >= len {
            // Unterminated string, accept what we have.
            break;
        }
        if field[i] == b'\'' {
            if i + 1 < len && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            value.push(field[i] as char);
            i += 1;
        }
    }

    (String::from(value.trim_end()), i)
}

/// Parse the 70-byte value field of a card (bytes 10..80).
///
/// Returns the typed value and an optional comment. A field that is all
/// spaces yields `None`; anything else always yields a value, falling
/// back to [`Value::Text`] for unparseable numerics.
pub fn parse_value(field: &[u8]) -> (Option<Value>, Option<String>) {
    if field.is_empty() {
        return (None, None);
    }

    if field[0] == b'\'' {
        let (s, end) = parse_quoted(field);
        let (_, comment) = split_comment(&field[end..]);
        return (Some(Value::Text(s)), comment.map(String::from));
    }

    let (val_part, comment) = split_comment(field);
    let comment = comment.map(String::from);

    let val_text = match str::from_utf8(val_part) {
        Ok(s) => s.trim(),
        Err(_) => return (None, comment),
    };
    if val_text.is_empty() {
        return (None, comment);
    }

    if val_text == "T" {
        return (Some(Value::Logical(true)), comment);
    }
    if val_text == "F" {
        return (Some(Value::Logical(false)), comment);
    }

    (Some(retype(val_text)), comment)
}

fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    // Start with high precision and reduce until the result fits the
    // 20-byte fixed field.
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

/// Right-justify `src` within `dest`, padding the left with spaces.
fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..start + len].copy_from_slice(&src[..len]);
}

fn write_quoted(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.bytes() {
        if pos >= 69 {
            break; // leave room for the closing quote
        }
        if ch == b'\'' {
            if pos + 1 >= 69 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            buf[pos] = ch;
            pos += 1;
        }
    }

    // FITS strings pad to a minimum of 8 characters between quotes.
    while pos < 9 {
        buf[pos] = b' ';
        pos += 1;
    }

    if pos < 70 {
        buf[pos] = b'\'';
    }
}

/// Serialize a [`Value`] into the 70-byte field for bytes 10..80 of a card.
///
/// Numeric and logical values are right-justified in the first 20 bytes;
/// strings start at byte 0 with a single quote.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    match value {
        Value::Logical(b) => {
            buf[19] = if *b { b'T' } else { b'F' };
        }
        Value::Integer(n) => {
            right_justify(format!("{n}").as_bytes(), &mut buf[..20]);
        }
        Value::Float(f) => {
            right_justify(format_float(*f).as_bytes(), &mut buf[..20]);
        }
        Value::Text(s) => {
            write_quoted(s, &mut buf);
        }
    }
    buf
}

// ── Cards ──

/// Pad a short keyword name to 8 bytes with trailing ASCII spaces.
pub const fn kw(name: &[u8]) -> [u8; 8] {
    let mut buf = [b' '; 8];
    let mut i = 0;
    while i < name.len() && i < 8 {
        buf[i] = name[i];
        i += 1;
    }
    buf
}

/// A parsed FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, ASCII, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The parsed value, if the card has a value indicator.
    pub value: Option<Value>,
    /// An optional comment string.
    pub comment: Option<String>,
}

impl Card {
    /// Build a value card from a short keyword name.
    pub fn new(name: &[u8], value: Value) -> Card {
        Card {
            keyword: kw(name),
            value: Some(value),
            comment: None,
        }
    }

    /// Build a value card with a comment.
    pub fn with_comment(name: &[u8], value: Value, comment: &str) -> Card {
        Card {
            keyword: kw(name),
            value: Some(value),
            comment: Some(String::from(comment)),
        }
    }

    /// Return the keyword as a trimmed UTF-8 string.
    pub fn keyword_str(&self) -> &str {
        let end = self
            .keyword
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        str::from_utf8(&self.keyword[..end]).unwrap_or("")
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    /// Returns `true` if this card carries a commentary keyword
    /// (COMMENT, HISTORY, or blank).
    pub fn is_commentary(&self) -> bool {
        matches!(
            &self.keyword,
            b"COMMENT " | b"HISTORY " | b"        "
        )
    }
}

/// Parse a single 80-byte FITS header card.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&card_bytes[..8]);

    for &b in &keyword {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_' => {}
            _ => return Err(Error::InvalidKeyword),
        }
    }

    if &keyword == b"END     " {
        return Ok(Card {
            keyword,
            value: None,
            comment: None,
        });
    }

    let has_indicator = card_bytes[8] == b'=' && card_bytes[9] == b' ';
    let commentary = matches!(&keyword, b"COMMENT " | b"HISTORY " | b"        ");

    if has_indicator && !commentary {
        let (value, comment) = parse_value(&card_bytes[10..CARD_SIZE]);
        return Ok(Card {
            keyword,
            value,
            comment,
        });
    }

    // Commentary and indicator-less cards: bytes 8..80 are free-form text.
    let text = str::from_utf8(&card_bytes[8..CARD_SIZE])
        .map_err(|_| Error::InvalidHeader("non-ASCII card text"))?
        .trim_end();
    Ok(Card {
        keyword,
        value: None,
        comment: if text.is_empty() {
            None
        } else {
            Some(String::from(text))
        },
    })
}

/// Insert a ` / comment` after the value content of a 70-byte field.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        let mut i = 1;
        loop {
            if i >= 70 {
                break i;
            }
            if field[i] == b'\'' {
                if i + 1 < 70 && field[i + 1] == b'\'' {
                    i += 2;
                } else {
                    break i + 1;
                }
            } else {
                i += 1;
            }
        }
    } else {
        20
    };

    let sep_start = content_end + 1;
    if sep_start + 3 >= 70 {
        return;
    }

    field[sep_start] = b'/';
    field[sep_start + 1] = b' ';

    let comment_start = sep_start + 2;
    let comment_bytes = comment.as_bytes();
    let len = comment_bytes.len().min(70 - comment_start);
    field[comment_start..comment_start + len].copy_from_slice(&comment_bytes[..len]);
}

/// Serialize a [`Card`] into an 80-byte card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    if let Some(ref value) = card.value {
        buf[8] = b'=';
        buf[9] = b' ';
        let mut field = format_value(value);
        if let Some(ref comment) = card.comment {
            insert_comment(&mut field, comment);
        }
        buf[10..80].copy_from_slice(&field);
    } else if card.keyword != [b' '; 8] {
        if let Some(ref comment) = card.comment {
            let bytes = comment.as_bytes();
            let len = bytes.len().min(72);
            buf[8..8 + len].copy_from_slice(&bytes[..len]);
        }
    }

    buf
}

/// Serialize header cards into complete FITS header blocks.
///
/// Appends the END card and pads the final block with blank space; the
/// returned length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let total_cards = cards.len() + 1; // +1 for END
    let total_bytes = total_cards.div_ceil(CARDS_PER_BLOCK) * BLOCK_SIZE;

    let mut buf = vec![b' '; total_bytes];
    for (i, card) in cards.iter().enumerate() {
        let offset = i * CARD_SIZE;
        buf[offset..offset + CARD_SIZE].copy_from_slice(&format_card(card));
    }

    let end_offset = cards.len() * CARD_SIZE;
    buf[end_offset..end_offset + 3].copy_from_slice(b"END");
    buf
}

/// Parse consecutive 2880-byte header blocks until the END card.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    let mut cards = Vec::new();
    for block_idx in 0..data.len() / BLOCK_SIZE {
        let block_start = block_idx * BLOCK_SIZE;
        for card_idx in 0..CARDS_PER_BLOCK {
            let card_start = block_start + card_idx * CARD_SIZE;
            let card_bytes: &[u8; CARD_SIZE] = data[card_start..card_start + CARD_SIZE]
                .try_into()
                .map_err(|_| Error::InvalidHeader("short card"))?;

            let card = parse_card(card_bytes)?;
            let is_end = card.is_end();
            cards.push(card);
            if is_end {
                return Ok(cards);
            }
        }
    }

    Err(Error::UnexpectedEof)
}

/// Return the number of bytes consumed by a header (a multiple of
/// [`BLOCK_SIZE`]), found by scanning complete blocks for the END card.
pub fn header_byte_len(data: &[u8]) -> Result<usize> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    for block_idx in 0..data.len() / BLOCK_SIZE {
        let block_start = block_idx * BLOCK_SIZE;
        for card_idx in 0..CARDS_PER_BLOCK {
            let card_start = block_start + card_idx * CARD_SIZE;
            if &data[card_start..card_start + 8] == b"END     " {
                return Ok((block_idx + 1) * BLOCK_SIZE);
            }
        }
    }

    Err(Error::UnexpectedEof)
}

// ── Card lookups ──

/// Find the first card with the given keyword.
pub fn find_card<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a Card> {
    cards.iter().find(|c| c.keyword_str() == keyword)
}

/// Integer value of a keyword, if present and integer-typed.
pub fn integer_value(cards: &[Card], keyword: &str) -> Option<i64> {
    match find_card(cards, keyword)?.value {
        Some(Value::Integer(n)) => Some(n),
        _ => None,
    }
}

/// Float value of a keyword; integers are promoted to f64.
pub fn float_value(cards: &[Card], keyword: &str) -> Option<f64> {
    match find_card(cards, keyword)?.value {
        Some(Value::Float(f)) => Some(f),
        Some(Value::Integer(n)) => Some(n as f64),
        _ => None,
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    fn make_field(s: &str) -> [u8; 70] {
        let mut buf = [b' '; 70];
        let bytes = s.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    #[test]
    fn retype_integer_first() {
        assert_eq!(retype("42"), Value::Integer(42));
        assert_eq!(retype("-99"), Value::Integer(-99));
        assert_eq!(retype("0"), Value::Integer(0));
    }

    #[test]
    fn retype_float_second() {
        assert_eq!(retype("9.5"), Value::Float(9.5));
        match retype("1.234E+05") {
            Value::Float(f) => assert!((f - 1.234e5).abs() < 1e-5),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn retype_d_exponent() {
        match retype("-2.5D-03") {
            Value::Float(f) => assert!((f - (-2.5e-3)).abs() < 1e-15),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn retype_text_fallback() {
        assert_eq!(retype("12h34m"), Value::Text(String::from("12h34m")));
        assert_eq!(retype("1.2.3"), Value::Text(String::from("1.2.3")));
    }

    #[test]
    fn parse_logical() {
        let (val, comment) = parse_value(&make_field("                   T / a flag"));
        assert_eq!(val, Some(Value::Logical(true)));
        assert_eq!(comment.as_deref(), Some("a flag"));

        let (val, _) = parse_value(&make_field("                   F"));
        assert_eq!(val, Some(Value::Logical(false)));
    }

    #[test]
    fn parse_integer_with_comment() {
        let (val, comment) = parse_value(&make_field("                1024 / block count"));
        assert_eq!(val, Some(Value::Integer(1024)));
        assert_eq!(comment.as_deref(), Some("block count"));
    }

    #[test]
    fn parse_string_embedded_quotes() {
        let (val, _) = parse_value(&make_field("'it''s ok '"));
        assert_eq!(val, Some(Value::Text(String::from("it's ok"))));
    }

    #[test]
    fn parse_string_with_comment() {
        let (val, comment) = parse_value(&make_field("'Hubble  '           / telescope"));
        assert_eq!(val, Some(Value::Text(String::from("Hubble"))));
        assert_eq!(comment.as_deref(), Some("telescope"));
    }

    #[test]
    fn parse_empty_field() {
        let (val, comment) = parse_value(&[b' '; 70]);
        assert!(val.is_none());
        assert!(comment.is_none());
    }

    #[test]
    fn parse_malformed_numeric_becomes_text() {
        let (val, _) = parse_value(&make_field("2000.0.0"));
        assert_eq!(val, Some(Value::Text(String::from("2000.0.0"))));
    }

    #[test]
    fn format_integer_right_justified() {
        let field = format_value(&Value::Integer(2));
        assert_eq!(field[19], b'2');
        assert!(field[..19].iter().all(|&b| b == b' '));
    }

    #[test]
    fn format_logical_column_thirty() {
        let field = format_value(&Value::Logical(true));
        assert_eq!(field[19], b'T');
    }

    #[test]
    fn format_text_quoted() {
        let field = format_value(&Value::Text(String::from("NGC 1234")));
        assert_eq!(field[0], b'\'');
        assert_eq!(&field[1..9], b"NGC 1234");
    }

    #[test]
    fn format_parse_roundtrip() {
        for value in [
            Value::Logical(true),
            Value::Integer(-32),
            Value::Float(273.15),
            Value::Text(String::from("M31")),
        ] {
            let field = format_value(&value);
            let (parsed, _) = parse_value(&field);
            match (&value, &parsed) {
                (Value::Float(a), Some(Value::Float(b))) => assert!((a - b).abs() < 1e-10),
                _ => assert_eq!(parsed.as_ref(), Some(&value)),
            }
        }
    }
}
