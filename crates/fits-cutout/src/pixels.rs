//! Typed pixel buffers and the big-endian on-disk codec.
//!
//! The five supported encodings map to FITS BITPIX values 8, 16, 32,
//! -32 and -64. Dispatch over encodings goes through [`PixelBuffer`]
//! with one generic body per operation; no per-type loop duplication.

use bytemuck::pod_collect_to_vec;

use crate::card::padded_byte_len;
use crate::error::{Error, Result};

/// One of the five supported pixel encodings, tagged by BITPIX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    /// BITPIX 8: unsigned bytes.
    U8,
    /// BITPIX 16: big-endian signed 16-bit integers.
    I16,
    /// BITPIX 32: big-endian signed 32-bit integers.
    I32,
    /// BITPIX -32: big-endian IEEE 32-bit floats.
    F32,
    /// BITPIX -64: big-endian IEEE 64-bit floats.
    F64,
}

impl PixelEncoding {
    /// Map a BITPIX value to an encoding.
    ///
    /// Any value outside the five supported tags is a fatal
    /// [`Error::UnsupportedEncoding`]; it is never coerced to a default.
    pub fn from_bitpix(bitpix: i64) -> Result<PixelEncoding> {
        match bitpix {
            8 => Ok(PixelEncoding::U8),
            16 => Ok(PixelEncoding::I16),
            32 => Ok(PixelEncoding::I32),
            -32 => Ok(PixelEncoding::F32),
            -64 => Ok(PixelEncoding::F64),
            other => Err(Error::UnsupportedEncoding(other)),
        }
    }

    /// The BITPIX header value for this encoding.
    pub fn bitpix(self) -> i64 {
        match self {
            PixelEncoding::U8 => 8,
            PixelEncoding::I16 => 16,
            PixelEncoding::I32 => 32,
            PixelEncoding::F32 => -32,
            PixelEncoding::F64 => -64,
        }
    }

    /// Storage size of one pixel in bytes.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelEncoding::U8 => 1,
            PixelEncoding::I16 => 2,
            PixelEncoding::I32 | PixelEncoding::F32 => 4,
            PixelEncoding::F64 => 8,
        }
    }
}

/// A numeric pixel sample that can be byte-swapped and viewed as f64.
///
/// Implemented for exactly the five storage types; everything generic in
/// the extraction and raster code is written against this trait once.
pub trait Sample: bytemuck::Pod + Copy + PartialEq + core::fmt::Debug {
    fn from_be(self) -> Self;
    fn to_be(self) -> Self;
    fn as_f64(self) -> f64;
}

impl Sample for u8 {
    fn from_be(self) -> Self {
        self
    }
    fn to_be(self) -> Self {
        self
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i16 {
    fn from_be(self) -> Self {
        i16::from_be(self)
    }
    fn to_be(self) -> Self {
        self.to_be()
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i32 {
    fn from_be(self) -> Self {
        i32::from_be(self)
    }
    fn to_be(self) -> Self {
        self.to_be()
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f32 {
    fn from_be(self) -> Self {
        f32::from_bits(u32::from_be(self.to_bits()))
    }
    fn to_be(self) -> Self {
        f32::from_bits(self.to_bits().to_be())
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    fn from_be(self) -> Self {
        f64::from_bits(u64::from_be(self.to_bits()))
    }
    fn to_be(self) -> Self {
        f64::from_bits(self.to_bits().to_be())
    }
    fn as_f64(self) -> f64 {
        self
    }
}

fn decode_vec<T: Sample>(raw: &[u8]) -> Vec<T> {
    // Collect into a properly-aligned Vec, then swap each element to
    // native endianness in place.
    let mut pixels: Vec<T> = pod_collect_to_vec(raw);
    for v in &mut pixels {
        *v = v.from_be();
    }
    pixels
}

fn encode_vec<T: Sample>(pixels: &[T]) -> Vec<u8> {
    let swapped: Vec<T> = pixels.iter().map(|v| v.to_be()).collect();
    let mut bytes: Vec<u8> = pod_collect_to_vec(&swapped);
    bytes.resize(padded_byte_len(bytes.len()), 0);
    bytes
}

/// A freshly-allocated pixel array of one encoding, row-major,
/// independent of whatever source it was copied from.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelBuffer {
    /// The encoding tag of this buffer.
    pub fn encoding(&self) -> PixelEncoding {
        match self {
            PixelBuffer::U8(_) => PixelEncoding::U8,
            PixelBuffer::I16(_) => PixelEncoding::I16,
            PixelBuffer::I32(_) => PixelEncoding::I32,
            PixelBuffer::F32(_) => PixelEncoding::F32,
            PixelBuffer::F64(_) => PixelEncoding::F64,
        }
    }

    /// Number of pixels in the buffer.
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::I16(v) => v.len(),
            PixelBuffer::I32(v) => v.len(),
            PixelBuffer::F32(v) => v.len(),
            PixelBuffer::F64(v) => v.len(),
        }
    }

    /// Returns `true` if the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode big-endian on-disk bytes into a native-endian typed buffer.
    pub fn decode_be(encoding: PixelEncoding, raw: &[u8]) -> PixelBuffer {
        match encoding {
            PixelEncoding::U8 => PixelBuffer::U8(raw.to_vec()),
            PixelEncoding::I16 => PixelBuffer::I16(decode_vec(raw)),
            PixelEncoding::I32 => PixelBuffer::I32(decode_vec(raw)),
            PixelEncoding::F32 => PixelBuffer::F32(decode_vec(raw)),
            PixelEncoding::F64 => PixelBuffer::F64(decode_vec(raw)),
        }
    }

    /// Serialize the buffer into big-endian, block-padded FITS data bytes.
    pub fn encode_be(&self) -> Vec<u8> {
        match self {
            PixelBuffer::U8(v) => {
                let mut bytes = v.clone();
                bytes.resize(padded_byte_len(bytes.len()), 0);
                bytes
            }
            PixelBuffer::I16(v) => encode_vec(v),
            PixelBuffer::I32(v) => encode_vec(v),
            PixelBuffer::F32(v) => encode_vec(v),
            PixelBuffer::F64(v) => encode_vec(v),
        }
    }

    /// Append another buffer of the same encoding (cube planes back
    /// into a contiguous 3-D data segment).
    ///
    /// # Panics
    ///
    /// Panics if the encodings differ; planes of a single cube never do.
    pub fn append(&mut self, other: &PixelBuffer) {
        match (self, other) {
            (PixelBuffer::U8(a), PixelBuffer::U8(b)) => a.extend_from_slice(b),
            (PixelBuffer::I16(a), PixelBuffer::I16(b)) => a.extend_from_slice(b),
            (PixelBuffer::I32(a), PixelBuffer::I32(b)) => a.extend_from_slice(b),
            (PixelBuffer::F32(a), PixelBuffer::F32(b)) => a.extend_from_slice(b),
            (PixelBuffer::F64(a), PixelBuffer::F64(b)) => a.extend_from_slice(b),
            _ => panic!("mismatched plane encodings"),
        }
    }

    /// Concatenate cube planes into one contiguous buffer.
    ///
    /// # Panics
    ///
    /// Panics if `planes` is empty or the encodings differ.
    pub fn concat(planes: &[PixelBuffer]) -> PixelBuffer {
        let (first, rest) = planes
            .split_first()
            .expect("cannot concatenate zero planes");
        let mut out = first.clone();
        for p in rest {
            out.append(p);
        }
        out
    }
}
