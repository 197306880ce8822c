//! Consensus encoding and decoding primitives.
//!
//! Integers are little-endian, collections are compact-size prefixed and
//! bit-sets use the fixed LSB-first layout. The encoding of every wire
//! type in this crate reduces to these primitives, so their byte layout
//! is the on-disk and on-wire contract.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Maximum byte length the decoder will pre-allocate for a single
/// collection. Counts above this are rejected as malformed rather than
/// trusted.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Decoding error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("parse failed: {0}")]
    ParseFailed(&'static str),
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes the object, returning the number of bytes written.
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes the object from a reader.
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error>;
}

macro_rules! impl_int_codec {
    ($ty:ty, $size:expr) => {
        impl Encodable for $ty {
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.write_all(&self.to_le_bytes())?;
                Ok($size)
            }
        }

        impl Decodable for $ty {
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let mut buf = [0u8; $size];
                r.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    };
}

impl_int_codec!(u8, 1);
impl_int_codec!(u16, 2);
impl_int_codec!(u32, 4);
impl_int_codec!(u64, 8);
impl_int_codec!(i32, 4);
impl_int_codec!(i64, 8);

impl Encodable for bool {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as u8).consensus_encode(w)
    }
}

impl Decodable for bool {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        Ok(u8::consensus_decode(r)? != 0)
    }
}

impl Encodable for [u8; 32] {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.write_all(self)?;
        Ok(32)
    }
}

impl Decodable for [u8; 32] {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let mut buf = [0u8; 32];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = write_compact_size(w, self.len() as u64)?;
        for item in self {
            len += item.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let count = read_compact_size(r)?;
        if count > MAX_VEC_SIZE as u64 {
            return Err(Error::ParseFailed("collection length exceeds limit"));
        }
        let mut items = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            items.push(T::consensus_decode(r)?);
        }
        Ok(items)
    }
}

/// Writes a Bitcoin-style compact-size integer.
pub fn write_compact_size<W: Write + ?Sized>(w: &mut W, value: u64) -> Result<usize, io::Error> {
    if value < 0xFD {
        w.write_all(&[value as u8])?;
        Ok(1)
    } else if value <= 0xFFFF {
        w.write_all(&[0xFDu8])?;
        w.write_all(&(value as u16).to_le_bytes())?;
        Ok(3)
    } else if value <= 0xFFFF_FFFF {
        w.write_all(&[0xFEu8])?;
        w.write_all(&(value as u32).to_le_bytes())?;
        Ok(5)
    } else {
        w.write_all(&[0xFFu8])?;
        w.write_all(&value.to_le_bytes())?;
        Ok(9)
    }
}

/// Reads a Bitcoin-style compact-size integer.
pub fn read_compact_size<R: Read + ?Sized>(r: &mut R) -> Result<u64, Error> {
    let mut marker = [0u8; 1];
    r.read_exact(&mut marker)?;
    match marker[0] {
        0xFD => {
            let mut buf = [0u8; 2];
            r.read_exact(&mut buf)?;
            Ok(u16::from_le_bytes(buf) as u64)
        }
        0xFE => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            Ok(u32::from_le_bytes(buf) as u64)
        }
        0xFF => {
            let mut buf = [0u8; 8];
            r.read_exact(&mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }
        value => Ok(value as u64),
    }
}

/// Writes a fixed bit-set: `⌈len/8⌉` bytes, bit `i` stored in byte `i/8`
/// at position `i%8` (LSB first), trailing pad bits zero.
pub fn write_fixed_bitset<W: Write + ?Sized>(w: &mut W, bits: &[bool]) -> Result<usize, io::Error> {
    let num_bytes = (bits.len() + 7) / 8;
    let mut bytes = vec![0u8; num_bytes];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    w.write_all(&bytes)?;
    Ok(num_bytes)
}

/// Reads a fixed bit-set of `size` bits.
pub fn read_fixed_bitset<R: Read + ?Sized>(r: &mut R, size: usize) -> Result<Vec<bool>, Error> {
    if size > MAX_VEC_SIZE * 8 {
        return Err(Error::ParseFailed("bitset length exceeds limit"));
    }
    let num_bytes = (size + 7) / 8;
    let mut bytes = vec![0u8; num_bytes];
    r.read_exact(&mut bytes)?;
    let mut bits = Vec::with_capacity(size);
    for i in 0..size {
        bits.push((bytes[i / 8] >> (i % 8)) & 1 != 0);
    }
    Ok(bits)
}

/// Encodes a value into a fresh byte vector.
pub fn serialize<T: Encodable>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value
        .consensus_encode(&mut buf)
        .expect("writing to a Vec never fails");
    buf
}

/// Decodes a value from a byte slice, requiring that all bytes are consumed.
pub fn deserialize<T: Decodable>(bytes: &[u8]) -> Result<T, Error> {
    let mut cursor = io::Cursor::new(bytes);
    let value = T::consensus_decode(&mut cursor)?;
    if cursor.position() as usize != bytes.len() {
        return Err(Error::ParseFailed("data not consumed entirely"));
    }
    Ok(value)
}
