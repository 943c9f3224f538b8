//! Encoder and decoder pairs for the supported bitstream formats.
//!
//! An [`Encoder`] turns a parse of the input into bytes; a [`Decoder`] reads those
//! bytes back and replays them through a [`CircularBuffer`](crate::window::CircularBuffer).
//! Everything an encoder needs from the engine (matches, a Huffman builder, the
//! direction the input is processed in) is declared by its [`Policy`].

use crate::errors::{Corruption, KompressionError, Result};
use crate::find::{FindLimitations, Match};
use crate::huffman::HuffmanTreeBuilder;
use crate::parse::{TailGuard, Token};

pub mod blz;
pub mod crilayla;
pub mod huff;
pub mod level5;
pub mod lz10;
pub mod lz11;
pub mod lz4;
pub mod lzss;
pub mod mio0;
pub mod nintendo;
pub mod rle;
pub mod vpk0;
pub mod yay0;
pub mod yaz0;

/// Which end of the data a format starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    /// the decoder starts at the end of the stream and fills the output back to front;
    /// the engine hands such encoders their input reversed
    Backward,
}

/// What an encoder expects the engine to prepare for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Policy {
    pub direction: Direction,
    /// leading input bytes the format stores uncompressed
    pub raw_prefix: usize,
    pub needs_matches: bool,
    pub needs_huffman: bool,
    pub tail: TailGuard,
}

impl Policy {
    /// An LZ format read front to back.
    pub const fn matches() -> Self {
        Self {
            direction: Direction::Forward,
            raw_prefix: 0,
            needs_matches: true,
            needs_huffman: false,
            tail: TailGuard {
                trailing_literals: 0,
                last_match_margin: 0,
            },
        }
    }

    /// A format that stores its input without a parse, e.g. entropy coding only.
    pub const fn plain() -> Self {
        Self {
            needs_matches: false,
            ..Self::matches()
        }
    }

    pub const fn backward(self) -> Self {
        Self {
            direction: Direction::Backward,
            ..self
        }
    }

    pub const fn with_raw_prefix(self, raw_prefix: usize) -> Self {
        Self { raw_prefix, ..self }
    }

    pub const fn with_huffman(self) -> Self {
        Self {
            needs_huffman: true,
            ..self
        }
    }

    pub const fn with_tail(self, tail: TailGuard) -> Self {
        Self { tail, ..self }
    }
}

/// Everything an encoder gets for one call.
#[derive(Debug, Clone, Copy)]
pub struct EncodeInput<'a> {
    /// bytes stored verbatim, see [`Policy::raw_prefix`]
    pub prefix: &'a [u8],
    /// the rest of the input, reversed for [`Direction::Backward`] formats
    pub data: &'a [u8],
    /// a parse of `data`; empty unless the policy asks for matches
    pub tokens: &'a [Token],
    pub huffman: Option<&'a HuffmanTreeBuilder>,
}

impl<'a> EncodeInput<'a> {
    /// Total number of input bytes.
    pub fn len(&self) -> usize {
        self.prefix.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn huffman(&self) -> Result<&'a HuffmanTreeBuilder> {
        self.huffman.ok_or(KompressionError::InvalidConfiguration(
            "format requires a huffman tree builder",
        ))
    }
}

pub trait Encoder {
    /// Name used in log messages.
    fn name(&self) -> &'static str;

    fn policy(&self) -> Policy {
        Policy::matches()
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>>;
}

pub trait Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Endianness of multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    pub(crate) fn put_u16(self, out: &mut Vec<u8>, value: u16) {
        match self {
            Self::Big => out.extend_from_slice(&value.to_be_bytes()),
            Self::Little => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    pub(crate) fn put_u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            Self::Big => out.extend_from_slice(&value.to_be_bytes()),
            Self::Little => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    pub(crate) fn set_u32(self, out: &mut [u8], at: usize, value: u32) {
        let bytes = match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        };
        out[at..at + 4].copy_from_slice(&bytes);
    }
}

/// Order in which the bits of a flag byte are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

impl BitOrder {
    #[inline]
    fn mask(self, index: u32) -> u8 {
        match self {
            Self::MsbFirst => 0x80 >> index,
            Self::LsbFirst => 1 << index,
        }
    }
}

/// Bounds-checked reads that remember where they are in the compressed input.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// offset of `data[0]` in the whole stream
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub(crate) fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Position in the whole stream.
    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub(crate) fn truncated(&self) -> KompressionError {
        KompressionError::corrupt(self.offset(), Corruption::Truncated)
    }

    #[inline]
    pub(crate) fn u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.truncated())?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(self.truncated());
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u16(&mut self, order: ByteOrder) -> Result<u16> {
        let b = self.take(2)?;
        let b = [b[0], b[1]];
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        })
    }

    pub(crate) fn u32(&mut self, order: ByteOrder) -> Result<u32> {
        let b = self.take(4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        })
    }

    /// Consume `magic` or fail with [`Corruption::BadMagic`].
    pub(crate) fn magic(&mut self, magic: &[u8]) -> Result<()> {
        let at = self.offset();
        match self.take(magic.len()) {
            Ok(found) if found == magic => Ok(()),
            _ => Err(KompressionError::corrupt(at, Corruption::BadMagic)),
        }
    }
}

/// Writes blocks of one flag byte followed by the payload of up to eight tokens.
#[derive(Debug)]
pub(crate) struct BlockWriter<'o> {
    out: &'o mut Vec<u8>,
    order: BitOrder,
    flags_at: usize,
    used: u32,
}

impl<'o> BlockWriter<'o> {
    pub(crate) fn new(out: &'o mut Vec<u8>, order: BitOrder) -> Self {
        Self {
            out,
            order,
            flags_at: 0,
            used: 8,
        }
    }

    /// Start a token; its payload follows with [`push`](Self::push).
    pub(crate) fn flag(&mut self, set: bool) {
        if self.used == 8 {
            self.flags_at = self.out.len();
            self.out.push(0);
            self.used = 0;
        }
        if set {
            self.out[self.flags_at] |= self.order.mask(self.used);
        }
        self.used += 1;
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.out.push(byte);
    }
}

/// Reads the flag bits written by a [`BlockWriter`].
#[derive(Debug, Clone)]
pub(crate) struct FlagReader {
    order: BitOrder,
    flags: u8,
    used: u32,
}

impl FlagReader {
    pub(crate) fn new(order: BitOrder) -> Self {
        Self {
            order,
            flags: 0,
            used: 8,
        }
    }

    pub(crate) fn next(&mut self, reader: &mut ByteReader<'_>) -> Result<bool> {
        if self.used == 8 {
            self.flags = reader.u8()?;
            self.used = 0;
        }
        let set = self.flags & self.order.mask(self.used) != 0;
        self.used += 1;
        Ok(set)
    }
}

/// 32-bit flag words, most significant bit first, kept apart from the payload.
#[derive(Debug, Clone, Default)]
pub(crate) struct WordFlags {
    words: Vec<u32>,
    used: u32,
}

impl WordFlags {
    pub(crate) fn push(&mut self, set: bool) {
        if self.used % 32 == 0 {
            self.words.push(0);
            self.used = 0;
        }
        if set {
            if let Some(word) = self.words.last_mut() {
                *word |= 0x8000_0000 >> self.used;
            }
        }
        self.used += 1;
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.words.len() * 4
    }

    pub(crate) fn write(&self, order: ByteOrder, out: &mut Vec<u8>) {
        for &word in &self.words {
            order.put_u32(out, word);
        }
    }
}

/// Reads flags written by [`WordFlags`].
#[derive(Debug, Clone)]
pub(crate) struct WordFlagReader {
    order: ByteOrder,
    word: u32,
    used: u32,
}

impl WordFlagReader {
    pub(crate) fn new(order: ByteOrder) -> Self {
        Self {
            order,
            word: 0,
            used: 32,
        }
    }

    pub(crate) fn next(&mut self, reader: &mut ByteReader<'_>) -> Result<bool> {
        if self.used == 32 {
            self.word = reader.u32(self.order)?;
            self.used = 0;
        }
        let set = self.word & (0x8000_0000 >> self.used) != 0;
        self.used += 1;
        Ok(set)
    }
}

/// Pad `out` with zeros to a multiple of `align` bytes.
pub(crate) fn pad_to(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

/// Fail unless `len` fits in a `bits`-wide size field.
pub(crate) fn check_size(format: &str, len: usize, bits: u32) -> Result<()> {
    let max = if bits >= usize::BITS {
        usize::MAX
    } else {
        (1usize << bits) - 1
    };
    if len > max {
        Err(KompressionError::too_large(format, len, max))
    } else {
        Ok(())
    }
}

/// Fail unless an encoder can represent `m`.
///
/// Finders configured with wider limits than the format allows end up here.
pub(crate) fn check_match(m: &Match, limits: &FindLimitations) -> Result<()> {
    let length_ok = m.length >= limits.min_length && m.length <= limits.max_length;
    let displacement_ok =
        m.displacement >= limits.min_displacement && m.displacement <= limits.max_displacement;
    if length_ok && displacement_ok {
        Ok(())
    } else {
        Err(KompressionError::InvalidConfiguration(
            "match finder limits exceed what the format can store",
        ))
    }
}

/// Fail unless the decoder produced exactly the announced number of bytes.
pub(crate) fn check_output(out: &[u8], expected: usize, offset: usize) -> Result<()> {
    if out.len() == expected {
        Ok(())
    } else {
        Err(KompressionError::corrupt(
            offset,
            Corruption::SizeMismatch {
                expected,
                actual: out.len(),
            },
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_writer_starts_a_flag_byte_every_eight_tokens() {
        let mut out = Vec::new();
        let mut blocks = BlockWriter::new(&mut out, BitOrder::MsbFirst);
        for i in 0..9u8 {
            blocks.flag(i % 2 == 0);
            blocks.push(i);
        }
        assert_eq!(out, [0b1010_1010, 0, 1, 2, 3, 4, 5, 6, 7, 0x80, 8]);

        let mut reader = ByteReader::new(&out);
        let mut flags = FlagReader::new(BitOrder::MsbFirst);
        for i in 0..9u8 {
            assert_eq!(flags.next(&mut reader).unwrap(), i % 2 == 0);
            assert_eq!(reader.u8().unwrap(), i);
        }
    }

    #[test]
    fn lsb_first_flags() {
        let mut out = Vec::new();
        let mut blocks = BlockWriter::new(&mut out, BitOrder::LsbFirst);
        blocks.flag(true);
        blocks.flag(false);
        blocks.flag(true);
        assert_eq!(out, [0b101]);
    }

    #[test]
    fn word_flags_are_msb_first() {
        let mut flags = WordFlags::default();
        flags.push(true);
        flags.push(false);
        flags.push(true);
        let mut out = Vec::new();
        flags.write(ByteOrder::Big, &mut out);
        assert_eq!(out, [0xA0, 0, 0, 0]);
    }

    #[test]
    fn reader_reports_truncation_offset() {
        let mut reader = ByteReader::with_base(&[1, 2, 3], 0x10);
        assert_eq!(reader.u16(ByteOrder::Little).unwrap(), 0x0201);
        match reader.u32(ByteOrder::Big) {
            Err(KompressionError::CorruptStream {
                offset: Some(0x12),
                reason: Corruption::Truncated,
            }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn size_fields() {
        assert!(check_size("lz10", 0xFF_FFFF, 24).is_ok());
        assert!(check_size("lz10", 0x100_0000, 24).is_err());
    }
}
