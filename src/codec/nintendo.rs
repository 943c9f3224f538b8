//! The 4-byte header shared by the GBA/DS BIOS formats.
//!
//! | Bits  | Description |
//! | :---: | ----------- |
//! | 0..8  | method: `0x10` LZ10, `0x11` LZ11, `0x2N` Huffman with N-bit symbols, `0x30` RLE |
//! | 8..32 | decompressed size |
//!
//! The whole word is little-endian, and the compressed stream is padded with zeros
//! to a multiple of four bytes.

use super::{check_size, ByteOrder, ByteReader};
use crate::errors::{Corruption, KompressionError, Result};

pub(crate) const LZ10: u8 = 0x10;
pub(crate) const LZ11: u8 = 0x11;
pub(crate) const HUFFMAN: u8 = 0x20;
pub(crate) const RLE: u8 = 0x30;

/// Largest input a 24-bit size field can describe.
pub const MAX_SIZE: usize = 0xFF_FFFF;

pub(crate) fn write_header(out: &mut Vec<u8>, format: &str, method: u8, size: usize) -> Result<()> {
    check_size(format, size, 24)?;
    ByteOrder::Little.put_u32(out, (size as u32) << 8 | u32::from(method));
    Ok(())
}

/// Read the header and return the decompressed size, checking the method byte.
pub(crate) fn read_header(reader: &mut ByteReader<'_>, method: u8) -> Result<usize> {
    let at = reader.offset();
    let word = reader
        .u32(ByteOrder::Little)
        .map_err(|_| KompressionError::corrupt(at, Corruption::BadMagic))?;
    let found = (word & 0xFF) as u8;
    if found != method {
        return Err(KompressionError::corrupt(at, Corruption::UnknownMethod(found)));
    }
    Ok((word >> 8) as usize)
}
